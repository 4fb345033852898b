//! 永続化ストア呼び出しの時間制限

use std::{future::Future, time::Duration};

use crate::domain::RepositoryError;

/// `timeout` 以内に終わらなかったストア呼び出しを `Unavailable` として扱う
pub(crate) async fn bounded<T, F>(timeout: Duration, call: F) -> Result<T, RepositoryError>
where
    F: Future<Output = Result<T, RepositoryError>>,
{
    match tokio::time::timeout(timeout, call).await {
        Ok(result) => result,
        Err(_) => Err(RepositoryError::Unavailable(format!(
            "timed out after {}ms",
            timeout.as_millis()
        ))),
    }
}

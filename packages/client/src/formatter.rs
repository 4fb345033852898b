//! Message formatting utilities for client display.

use chatline_server::infrastructure::dto::http::ConversationSummaryDto;
use chatline_shared::time::timestamp_to_clock_label;

use crate::domain::RosterView;

const RULE: &str = "------------------------------------------------------------";

/// Message formatter for client display
pub struct MessageFormatter;

impl MessageFormatter {
    /// Format the greeting shown once the server activated the connection
    pub fn format_connected(user_id: &str, connection_id: &str, connected_at: i64) -> String {
        format!(
            "\nConnected as '{}' at {} (connection {})\n",
            user_id,
            timestamp_to_clock_label(connected_at),
            connection_id
        )
    }

    /// Format the online roster, marking the current user with "(me)"
    pub fn format_roster(roster: &RosterView, current_user_id: &str) -> String {
        let online = roster.online_user_ids();
        if online.is_empty() {
            return "\nOnline: (nobody)\n".to_string();
        }

        let names: Vec<String> = online
            .iter()
            .map(|user_id| {
                if user_id == current_user_id {
                    format!("{} (me)", user_id)
                } else {
                    user_id.clone()
                }
            })
            .collect();
        format!("\nOnline ({}): {}\n", online.len(), names.join(", "))
    }

    /// Format a message delivered from another user
    pub fn format_message_delivered(sender_id: &str, body: &str, sent_at: i64) -> String {
        format!(
            "\n\n{rule}\n@{}: {}\nsent at {}\n{rule}\n",
            sender_id,
            body,
            timestamp_to_clock_label(sent_at),
            rule = RULE
        )
    }

    /// Format the acknowledgement of a message this user sent
    pub fn format_message_sent(
        recipient_id: &str,
        sent_at: i64,
        delivered_connections: usize,
    ) -> String {
        let status = if delivered_connections == 0 {
            "offline, stored".to_string()
        } else {
            format!("delivered to {} connection(s)", delivered_connections)
        };
        format!(
            "\nsent to @{} at {} ({})\n",
            recipient_id,
            timestamp_to_clock_label(sent_at),
            status
        )
    }

    pub fn format_send_failed(recipient_id: &str, reason: &str) -> String {
        format!("\n! failed to send to @{}: {}\n", recipient_id, reason)
    }

    pub fn format_server_error(reason: &str) -> String {
        format!("\n! server: {}\n", reason)
    }

    /// Format a user's conversation list, marking online partners with `*`
    pub fn format_conversations(
        conversations: &[ConversationSummaryDto],
        roster: &RosterView,
    ) -> String {
        let mut output = String::new();
        output.push_str(&format!("\n{}\nConversations:\n", RULE));

        if conversations.is_empty() {
            output.push_str("(No conversations)\n");
        } else {
            for conversation in conversations {
                let marker = if roster.is_online(&conversation.partner_id) {
                    "*"
                } else {
                    " "
                };
                output.push_str(&format!(
                    "{} {} - matched at {}\n",
                    marker, conversation.partner_id, conversation.matched_at
                ));
            }
        }

        output.push_str(RULE);
        output.push('\n');
        output
    }

    pub fn format_help() -> String {
        [
            "",
            "  @<user> <message>  send a message",
            "  /who               show who is online",
            "  /list              show your conversations (* = online)",
            "  /quit              disconnect and exit",
            "",
        ]
        .join("\n")
    }

    /// Format a binary message notification
    pub fn format_binary_message(byte_count: usize) -> String {
        format!("\n← Received {} bytes of binary data\n", byte_count)
    }

    /// Format a raw text message (when parsing fails)
    pub fn format_raw_message(text: &str) -> String {
        format!("\n← Received: {}\n", text)
    }
}

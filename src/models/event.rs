//! Live-update message envelope
//!
//! One JSON object per logical event, tagged by `type`. Field names are
//! part of the wire contract consumed by the browser client.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::Poll;

/// Server-to-client events pushed over live channels
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum LiveEvent {
    /// A poll was created
    NewPoll { poll: Poll },

    /// An option's vote count changed
    VoteUpdate {
        #[serde(rename = "pollId")]
        poll_id: Uuid,
        #[serde(rename = "selectedOption")]
        selected_option: String,
        votes: i64,
    },
}

impl LiveEvent {
    pub fn new_poll(poll: Poll) -> Self {
        LiveEvent::NewPoll { poll }
    }

    pub fn vote_update(poll_id: Uuid, selected_option: impl Into<String>, votes: i64) -> Self {
        LiveEvent::VoteUpdate {
            poll_id,
            selected_option: selected_option.into(),
            votes,
        }
    }
}

/// Client-to-server messages received over live channels
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientMessage {
    /// The viewer casts a vote
    NewVote {
        #[serde(rename = "pollId")]
        poll_id: Uuid,
        #[serde(rename = "selectedOption")]
        selected_option: String,
    },
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::PollOption;
    use serde_json::json;

    #[test]
    fn test_new_poll_wire_format() {
        let id = Uuid::new_v4();
        let event = LiveEvent::new_poll(Poll {
            id,
            question: "Best color?".to_string(),
            options: vec![PollOption::new("Red"), PollOption::new("Blue")],
        });

        let value = serde_json::to_value(&event).unwrap();
        assert_eq!(
            value,
            json!({
                "type": "new_poll",
                "poll": {
                    "id": id,
                    "question": "Best color?",
                    "options": [
                        {"answer": "Red", "votes": 0},
                        {"answer": "Blue", "votes": 0},
                    ],
                }
            })
        );
    }

    #[test]
    fn test_vote_update_wire_format() {
        let id = Uuid::new_v4();
        let event = LiveEvent::vote_update(id, "Red", 3);

        let value = serde_json::to_value(&event).unwrap();
        assert_eq!(
            value,
            json!({
                "type": "vote_update",
                "pollId": id,
                "selectedOption": "Red",
                "votes": 3,
            })
        );
    }

    #[test]
    fn test_client_new_vote_parses() {
        let id = Uuid::new_v4();
        let raw = format!(
            r#"{{"type": "new_vote", "pollId": "{}", "selectedOption": "Blue"}}"#,
            id
        );

        let msg: ClientMessage = serde_json::from_str(&raw).unwrap();
        assert_eq!(
            msg,
            ClientMessage::NewVote {
                poll_id: id,
                selected_option: "Blue".to_string(),
            }
        );
    }

    #[test]
    fn test_unknown_client_message_rejected() {
        let raw = r#"{"type": "shutdown"}"#;
        assert!(serde_json::from_str::<ClientMessage>(raw).is_err());
    }
}

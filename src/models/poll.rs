use std::collections::HashSet;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{Result, TallyError};

/// A single voteable option within a poll
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PollOption {
    pub answer: String,
    pub votes: i64,
}

impl PollOption {
    pub fn new(answer: impl Into<String>) -> Self {
        Self {
            answer: answer.into(),
            votes: 0,
        }
    }
}

/// A poll: a question with a fixed, ordered set of options
///
/// Option order is display-significant and preserved across reads
/// and broadcasts.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Poll {
    pub id: Uuid,
    pub question: String,
    pub options: Vec<PollOption>,
}

impl Poll {
    /// Find an option by its label
    pub fn option(&self, answer: &str) -> Option<&PollOption> {
        self.options.iter().find(|o| o.answer == answer)
    }

    /// Total votes across all options
    pub fn total_votes(&self) -> i64 {
        self.options.iter().map(|o| o.votes).sum()
    }
}

/// Request body for creating a poll
#[derive(Debug, Clone, Deserialize)]
pub struct CreatePollRequest {
    pub question: String,
    pub options: Vec<String>,
}

impl CreatePollRequest {
    /// Validate the request: non-empty question, at least one option,
    /// no duplicate option labels.
    pub fn validate(&self) -> Result<()> {
        if self.question.trim().is_empty() {
            return Err(TallyError::Validation("question must not be empty".into()));
        }

        if self.options.is_empty() {
            return Err(TallyError::Validation(
                "poll must have at least one option".into(),
            ));
        }

        let mut seen = HashSet::new();
        for label in &self.options {
            if label.trim().is_empty() {
                return Err(TallyError::Validation(
                    "option labels must not be empty".into(),
                ));
            }
            if !seen.insert(label.as_str()) {
                return Err(TallyError::Validation(format!(
                    "duplicate option label: {}",
                    label
                )));
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request(question: &str, options: &[&str]) -> CreatePollRequest {
        CreatePollRequest {
            question: question.to_string(),
            options: options.iter().map(|s| s.to_string()).collect(),
        }
    }

    #[test]
    fn test_validate_accepts_well_formed_poll() {
        assert!(request("Best color?", &["Red", "Blue"]).validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_empty_question() {
        let err = request("  ", &["Red"]).validate().unwrap_err();
        assert!(matches!(err, TallyError::Validation(_)));
    }

    #[test]
    fn test_validate_rejects_empty_options() {
        let err = request("Best color?", &[]).validate().unwrap_err();
        assert!(matches!(err, TallyError::Validation(_)));
    }

    #[test]
    fn test_validate_rejects_duplicate_labels() {
        let err = request("Best color?", &["Red", "Blue", "Red"])
            .validate()
            .unwrap_err();
        assert!(matches!(err, TallyError::Validation(_)));
    }

    #[test]
    fn test_option_lookup_and_totals() {
        let poll = Poll {
            id: Uuid::new_v4(),
            question: "Best color?".to_string(),
            options: vec![
                PollOption {
                    answer: "Red".to_string(),
                    votes: 3,
                },
                PollOption {
                    answer: "Blue".to_string(),
                    votes: 2,
                },
            ],
        };

        assert_eq!(poll.option("Red").unwrap().votes, 3);
        assert!(poll.option("Green").is_none());
        assert_eq!(poll.total_votes(), 5);
    }
}

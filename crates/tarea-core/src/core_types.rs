//! Core type definitions shared across the client.
//!
//! `Task` mirrors the record shape the remote API serves; the server is
//! authoritative and assigns ids. `StatusMessage` is the single line of
//! outcome reporting every operation produces for the user, replacing any
//! message from the previous operation.

use crate::errors::ClientError;
use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Task {
    pub id: i64,
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    pub completed: bool,
}

/// Outcome of the most recent operation, in words meant for the user.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StatusMessage {
    Success(String),
    Error(String),
}

impl StatusMessage {
    pub fn success(text: impl Into<String>) -> Self {
        StatusMessage::Success(text.into())
    }

    /// Convert a failure into the message the user sees, keeping the
    /// server's detail verbatim where one exists and falling back to a
    /// generic phrasing for transport and shape problems.
    pub fn failure(context: &str, err: &ClientError) -> Self {
        let text = match err {
            ClientError::ValidationError(msg) => msg.clone(),
            ClientError::Unauthorized(_) => {
                "Session expired or not authorized. Please log in again.".to_string()
            }
            ClientError::ApiError { detail, .. } => format!("{}: {}", context, detail),
            ClientError::NetworkError(_) => {
                "Could not reach the server. Check your connection.".to_string()
            }
            ClientError::ParsingError(_) => {
                format!("{}: unexpected response from the server", context)
            }
            other => format!("{}: {}", context, other),
        };
        StatusMessage::Error(text)
    }

    pub fn text(&self) -> &str {
        match self {
            StatusMessage::Success(text) | StatusMessage::Error(text) => text,
        }
    }

    pub fn is_error(&self) -> bool {
        matches!(self, StatusMessage::Error(_))
    }
}

impl fmt::Display for StatusMessage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.text())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_failure_keeps_server_detail() {
        let err = ClientError::ApiError {
            status: 400,
            detail: "Title already exists".to_string(),
        };
        let status = StatusMessage::failure("Failed to add task", &err);
        assert!(status.is_error());
        assert_eq!(status.text(), "Failed to add task: Title already exists");
    }

    #[test]
    fn test_failure_validation_is_verbatim() {
        let err = ClientError::ValidationError("The task title cannot be empty.".to_string());
        let status = StatusMessage::failure("Failed to add task", &err);
        assert_eq!(status.text(), "The task title cannot be empty.");
    }

    #[test]
    fn test_failure_unauthorized_prompts_relogin() {
        let err = ClientError::Unauthorized("Not authenticated".to_string());
        let status = StatusMessage::failure("Failed to load tasks", &err);
        assert_eq!(
            status.text(),
            "Session expired or not authorized. Please log in again."
        );
    }

    #[test]
    fn test_task_description_defaults_to_none() {
        let task: Task =
            serde_json::from_str(r#"{"id": 1, "title": "Buy milk", "completed": false}"#).unwrap();
        assert_eq!(task.description, None);
    }
}

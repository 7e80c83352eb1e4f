use serde::{Deserialize, Serialize};

/// Body of `POST /api/ask`, after the handler has picked the string
/// `question` member out of whatever JSON was sent.
#[derive(Debug, Clone, Default)]
pub struct AskRequest {
    pub question: Option<String>,
}

impl AskRequest {
    /// The question when it is present and non-empty.
    pub fn question(&self) -> Option<&str> {
        self.question.as_deref().filter(|q| !q.is_empty())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AskResponse {
    pub answer: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ErrorResponse {
    pub error: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub model: String,
    pub device: String,
    pub available_slots: usize,
}

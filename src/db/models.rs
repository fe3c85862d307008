use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: String,
    pub username: String,
    pub created_at: String,
}

/// A prompt row as stored. `expected_output` is a path relative to the media root.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Prompt {
    pub id: String,
    pub author_id: String,
    pub text: String,
    pub tags: String,
    pub expected_output: Option<String>,
    pub created_at: String,
    pub updated_at: String,
}

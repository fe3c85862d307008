// Prompt representation - what the API exposes for a stored prompt
use serde::Serialize;
use thiserror::Error;

use crate::db::models::Prompt;
use crate::media;
use crate::repository::{PromptRepository, RepositoryError};
use crate::votes::{self, VoteError};

pub const MAX_TAGS_LEN: usize = 200;

#[derive(Debug, Error)]
pub enum RepresentError {
    #[error("Dangling reference: {0}")]
    DanglingReference(String),

    #[error(transparent)]
    Vote(#[from] VoteError),

    #[error(transparent)]
    Repository(#[from] RepositoryError),
}

/// Externally visible form of a prompt.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PromptView {
    pub id: String,
    /// Author's username
    pub author: String,
    pub prompt: String,
    pub tags: String,
    /// Net score
    pub votes: i64,
    /// Public URL of the expected-output image
    pub expected_output: Option<String>,
}

/// Build the representation of a prompt. Reads only; the score is computed
/// from the votes stored right now.
pub async fn represent(
    repo: &dyn PromptRepository,
    prompt: &Prompt,
) -> Result<PromptView, RepresentError> {
    let author = repo.get_user(&prompt.author_id).await?.ok_or_else(|| {
        RepresentError::DanglingReference(format!(
            "prompt {} has no author {}",
            prompt.id, prompt.author_id
        ))
    })?;

    let score = votes::aggregate_raw(repo.vote_values(&prompt.id).await?)?;

    Ok(PromptView {
        id: prompt.id.clone(),
        author: author.username,
        prompt: prompt.text.clone(),
        tags: prompt.tags.clone(),
        votes: score,
        expected_output: prompt.expected_output.as_deref().map(media::public_url),
    })
}

pub async fn represent_all(
    repo: &dyn PromptRepository,
    prompts: &[Prompt],
) -> Result<Vec<PromptView>, RepresentError> {
    let mut views = Vec::with_capacity(prompts.len());
    for prompt in prompts {
        views.push(represent(repo, prompt).await?);
    }
    Ok(views)
}

/// Prompt text must have something in it besides whitespace.
pub fn validate_text(text: &str) -> Result<(), String> {
    if text.trim().is_empty() {
        return Err("prompt may not be blank".to_string());
    }
    Ok(())
}

pub fn validate_tags(tags: &str) -> Result<(), String> {
    let len = tags.chars().count();
    if len > MAX_TAGS_LEN {
        return Err(format!(
            "tags may have at most {} characters (got {})",
            MAX_TAGS_LEN, len
        ));
    }
    Ok(())
}

/// Individual labels of a comma-separated tag string.
pub fn split_tags(tags: &str) -> impl Iterator<Item = &str> {
    tags.split(',').map(str::trim).filter(|t| !t.is_empty())
}

pub fn has_tag(tags: &str, wanted: &str) -> bool {
    let wanted = wanted.trim();
    split_tags(tags).any(|t| t.eq_ignore_ascii_case(wanted))
}

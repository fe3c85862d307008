// Prompt, user and vote storage. Handlers and the representation builder
// reach SQLite only through `PromptRepository`.
use async_trait::async_trait;
use rusqlite::{params, OptionalExtension, Row, TransactionBehavior};
use thiserror::Error;

use crate::config::RepeatVotePolicy;
use crate::db::models::{Prompt, User};
use crate::state::DbPool;
use crate::votes::{Vote, VoteError, VoteValue};

#[derive(Debug, Error)]
pub enum RepositoryError {
    #[error("Database error: {0}")]
    Database(#[from] r2d2::Error),

    #[error("SQL error: {0}")]
    Sql(#[from] rusqlite::Error),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    /// A write referenced a user or prompt that does not exist.
    #[error("Unknown reference: {0}")]
    UnknownReference(String),

    /// A stored row holds a value the domain types refuse.
    #[error("Corrupt row: {0}")]
    Corrupt(#[from] VoteError),
}

#[derive(Debug, Clone)]
pub struct NewPrompt {
    pub author_id: String,
    pub text: String,
    pub tags: String,
    pub expected_output: Option<String>,
}

/// Mutable fields of a prompt. `None` leaves a field untouched; the image
/// uses `Some(None)` to clear.
#[derive(Debug, Clone, Default)]
pub struct PromptChanges {
    pub text: Option<String>,
    pub tags: Option<String>,
    pub expected_output: Option<Option<String>>,
}

/// Result of an update: the new row and the image file it stopped pointing at.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UpdatedPrompt {
    pub prompt: Prompt,
    pub replaced_image: Option<String>,
}

#[derive(Debug, Clone, Default)]
pub struct PromptFilter {
    pub author_username: Option<String>,
}

/// Repository trait - all database operations
#[async_trait]
pub trait PromptRepository: Send + Sync {
    async fn create_user(&self, username: &str) -> Result<User, RepositoryError>;

    async fn get_user(&self, id: &str) -> Result<Option<User>, RepositoryError>;

    async fn list_users(&self) -> Result<Vec<User>, RepositoryError>;

    /// Delete a user and everything they own. Returns the image paths of the
    /// prompts removed by the cascade.
    async fn delete_user(&self, id: &str) -> Result<Vec<String>, RepositoryError>;

    async fn create_prompt(&self, prompt: NewPrompt) -> Result<Prompt, RepositoryError>;

    async fn get_prompt(&self, id: &str) -> Result<Option<Prompt>, RepositoryError>;

    async fn list_prompts(&self, filter: &PromptFilter) -> Result<Vec<Prompt>, RepositoryError>;

    /// Apply `changes` in one transaction. `replaced_image` is read inside
    /// that transaction, so concurrent updates each see the file they replaced.
    async fn update_prompt(
        &self,
        id: &str,
        changes: PromptChanges,
    ) -> Result<UpdatedPrompt, RepositoryError>;

    /// Delete a prompt (votes go with it). Returns the removed row.
    async fn delete_prompt(&self, id: &str) -> Result<Prompt, RepositoryError>;

    async fn cast_vote(
        &self,
        prompt_id: &str,
        voter_id: &str,
        value: VoteValue,
        policy: RepeatVotePolicy,
    ) -> Result<Vote, RepositoryError>;

    async fn votes_for(&self, prompt_id: &str) -> Result<Vec<Vote>, RepositoryError>;

    /// Raw `value` column of every vote on a prompt.
    async fn vote_values(&self, prompt_id: &str) -> Result<Vec<i64>, RepositoryError>;
}

/// SQLite implementation
pub struct SqlitePromptRepository {
    pool: DbPool,
}

impl SqlitePromptRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

const PROMPT_COLUMNS: &str =
    "p.id, p.author_id, p.body, p.tags, p.expected_output, p.created_at, p.updated_at";

fn prompt_from_row(row: &Row<'_>) -> rusqlite::Result<Prompt> {
    Ok(Prompt {
        id: row.get(0)?,
        author_id: row.get(1)?,
        text: row.get(2)?,
        tags: row.get(3)?,
        expected_output: row.get(4)?,
        created_at: row.get(5)?,
        updated_at: row.get(6)?,
    })
}

fn user_from_row(row: &Row<'_>) -> rusqlite::Result<User> {
    Ok(User {
        id: row.get(0)?,
        username: row.get(1)?,
        created_at: row.get(2)?,
    })
}

fn exists(conn: &rusqlite::Connection, table: &str, id: &str) -> rusqlite::Result<bool> {
    conn.query_row(
        &format!("SELECT COUNT(*) > 0 FROM {} WHERE id = ?1", table),
        params![id],
        |row| row.get(0),
    )
}

fn load_prompt(conn: &rusqlite::Connection, id: &str) -> rusqlite::Result<Option<Prompt>> {
    conn.query_row(
        &format!("SELECT {} FROM prompts p WHERE p.id = ?1", PROMPT_COLUMNS),
        params![id],
        prompt_from_row,
    )
    .optional()
}

#[async_trait]
impl PromptRepository for SqlitePromptRepository {
    async fn create_user(&self, username: &str) -> Result<User, RepositoryError> {
        let conn = self.pool.get()?;
        let id = uuid::Uuid::now_v7().to_string();

        let inserted = conn.execute(
            "INSERT OR IGNORE INTO users (id, username) VALUES (?1, ?2)",
            params![id, username],
        )?;
        if inserted == 0 {
            return Err(RepositoryError::Conflict(format!(
                "username '{}' is taken",
                username
            )));
        }

        let user = conn.query_row(
            "SELECT id, username, created_at FROM users WHERE id = ?1",
            params![id],
            user_from_row,
        )?;
        tracing::info!(user_id = %user.id, "Created user '{}'", user.username);
        Ok(user)
    }

    async fn get_user(&self, id: &str) -> Result<Option<User>, RepositoryError> {
        let conn = self.pool.get()?;
        let user = conn
            .query_row(
                "SELECT id, username, created_at FROM users WHERE id = ?1",
                params![id],
                user_from_row,
            )
            .optional()?;
        Ok(user)
    }

    async fn list_users(&self) -> Result<Vec<User>, RepositoryError> {
        let conn = self.pool.get()?;
        let mut stmt = conn.prepare("SELECT id, username, created_at FROM users ORDER BY id")?;
        let users = stmt
            .query_map([], user_from_row)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(users)
    }

    async fn delete_user(&self, id: &str) -> Result<Vec<String>, RepositoryError> {
        let mut conn = self.pool.get()?;
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;

        let images: Vec<String> = {
            let mut stmt = tx.prepare(
                "SELECT expected_output FROM prompts
                 WHERE author_id = ?1 AND expected_output IS NOT NULL",
            )?;
            let rows = stmt.query_map(params![id], |row| row.get(0))?;
            rows.collect::<Result<Vec<_>, _>>()?
        };

        let rows = tx.execute("DELETE FROM users WHERE id = ?1", params![id])?;
        if rows == 0 {
            return Err(RepositoryError::NotFound(format!("user {}", id)));
        }
        tx.commit()?;

        tracing::info!(user_id = %id, "Deleted user");
        Ok(images)
    }

    async fn create_prompt(&self, prompt: NewPrompt) -> Result<Prompt, RepositoryError> {
        let conn = self.pool.get()?;

        if !exists(&conn, "users", &prompt.author_id)? {
            return Err(RepositoryError::UnknownReference(format!(
                "author {}",
                prompt.author_id
            )));
        }

        let id = uuid::Uuid::now_v7().to_string();
        conn.execute(
            "INSERT INTO prompts (id, author_id, body, tags, expected_output)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![
                id,
                prompt.author_id,
                prompt.text,
                prompt.tags,
                prompt.expected_output
            ],
        )?;

        let created = load_prompt(&conn, &id)?
            .ok_or_else(|| RepositoryError::NotFound(format!("prompt {}", id)))?;
        tracing::info!(prompt_id = %created.id, author_id = %created.author_id, "Created prompt");
        Ok(created)
    }

    async fn get_prompt(&self, id: &str) -> Result<Option<Prompt>, RepositoryError> {
        let conn = self.pool.get()?;
        Ok(load_prompt(&conn, id)?)
    }

    async fn list_prompts(&self, filter: &PromptFilter) -> Result<Vec<Prompt>, RepositoryError> {
        let conn = self.pool.get()?;

        let prompts = match filter.author_username {
            Some(ref username) => {
                let mut stmt = conn.prepare(&format!(
                    "SELECT {} FROM prompts p JOIN users u ON u.id = p.author_id
                     WHERE u.username = ?1 ORDER BY p.id",
                    PROMPT_COLUMNS
                ))?;
                let rows = stmt.query_map(params![username], prompt_from_row)?;
                rows.collect::<Result<Vec<_>, _>>()?
            }
            None => {
                let mut stmt = conn.prepare(&format!(
                    "SELECT {} FROM prompts p ORDER BY p.id",
                    PROMPT_COLUMNS
                ))?;
                let rows = stmt.query_map([], prompt_from_row)?;
                rows.collect::<Result<Vec<_>, _>>()?
            }
        };

        Ok(prompts)
    }

    async fn update_prompt(
        &self,
        id: &str,
        changes: PromptChanges,
    ) -> Result<UpdatedPrompt, RepositoryError> {
        let mut conn = self.pool.get()?;
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;

        let current =
            load_prompt(&tx, id)?.ok_or_else(|| RepositoryError::NotFound(format!("prompt {}", id)))?;

        let text = changes.text.unwrap_or(current.text);
        let tags = changes.tags.unwrap_or(current.tags);
        let expected_output = changes
            .expected_output
            .unwrap_or_else(|| current.expected_output.clone());
        let replaced_image = current
            .expected_output
            .filter(|old| expected_output.as_ref() != Some(old));

        tx.execute(
            "UPDATE prompts
             SET body = ?2, tags = ?3, expected_output = ?4, updated_at = datetime('now')
             WHERE id = ?1",
            params![id, text, tags, expected_output],
        )?;

        let updated =
            load_prompt(&tx, id)?.ok_or_else(|| RepositoryError::NotFound(format!("prompt {}", id)))?;
        tx.commit()?;

        tracing::info!(prompt_id = %id, "Updated prompt");
        Ok(UpdatedPrompt {
            prompt: updated,
            replaced_image,
        })
    }

    async fn delete_prompt(&self, id: &str) -> Result<Prompt, RepositoryError> {
        let mut conn = self.pool.get()?;
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;

        let prompt =
            load_prompt(&tx, id)?.ok_or_else(|| RepositoryError::NotFound(format!("prompt {}", id)))?;
        tx.execute("DELETE FROM prompts WHERE id = ?1", params![id])?;
        tx.commit()?;

        tracing::info!(prompt_id = %id, "Deleted prompt");
        Ok(prompt)
    }

    async fn cast_vote(
        &self,
        prompt_id: &str,
        voter_id: &str,
        value: VoteValue,
        policy: RepeatVotePolicy,
    ) -> Result<Vote, RepositoryError> {
        let mut conn = self.pool.get()?;
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;

        if !exists(&tx, "prompts", prompt_id)? {
            return Err(RepositoryError::NotFound(format!("prompt {}", prompt_id)));
        }
        if !exists(&tx, "users", voter_id)? {
            return Err(RepositoryError::UnknownReference(format!("voter {}", voter_id)));
        }

        match policy {
            RepeatVotePolicy::Allow => {}
            RepeatVotePolicy::Reject => {
                let already: bool = tx.query_row(
                    "SELECT COUNT(*) > 0 FROM votes WHERE prompt_id = ?1 AND voter_id = ?2",
                    params![prompt_id, voter_id],
                    |row| row.get(0),
                )?;
                if already {
                    return Err(RepositoryError::Conflict(format!(
                        "voter {} already voted on prompt {}",
                        voter_id, prompt_id
                    )));
                }
            }
            RepeatVotePolicy::Replace => {
                let removed = tx.execute(
                    "DELETE FROM votes WHERE prompt_id = ?1 AND voter_id = ?2",
                    params![prompt_id, voter_id],
                )?;
                if removed > 0 {
                    tracing::debug!(prompt_id, voter_id, removed, "Replacing earlier votes");
                }
            }
        }

        let vote = Vote {
            id: uuid::Uuid::now_v7().to_string(),
            prompt: prompt_id.to_string(),
            voter: voter_id.to_string(),
            value,
        };
        tx.execute(
            "INSERT INTO votes (id, prompt_id, voter_id, value) VALUES (?1, ?2, ?3, ?4)",
            params![vote.id, vote.prompt, vote.voter, vote.value.as_i64()],
        )?;
        tx.commit()?;

        tracing::info!(prompt_id, voter_id, value = %value, "Vote cast");
        Ok(vote)
    }

    async fn votes_for(&self, prompt_id: &str) -> Result<Vec<Vote>, RepositoryError> {
        let conn = self.pool.get()?;
        let mut stmt = conn.prepare(
            "SELECT id, prompt_id, voter_id, value FROM votes WHERE prompt_id = ?1 ORDER BY id",
        )?;

        let rows = stmt.query_map(params![prompt_id], |row| {
            Ok((
                row.get::<_, String>(0)?,
                row.get::<_, String>(1)?,
                row.get::<_, String>(2)?,
                row.get::<_, i64>(3)?,
            ))
        })?;

        let mut votes = Vec::new();
        for row in rows {
            let (id, prompt, voter, raw) = row?;
            votes.push(Vote {
                value: VoteValue::try_from(raw)?,
                id,
                prompt,
                voter,
            });
        }
        Ok(votes)
    }

    async fn vote_values(&self, prompt_id: &str) -> Result<Vec<i64>, RepositoryError> {
        let conn = self.pool.get()?;
        let mut stmt = conn.prepare("SELECT value FROM votes WHERE prompt_id = ?1")?;
        let values = stmt
            .query_map(params![prompt_id], |row| row.get(0))?
            .collect::<Result<Vec<i64>, _>>()?;
        Ok(values)
    }
}

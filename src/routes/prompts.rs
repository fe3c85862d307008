use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::routing::get;
use axum::{Json, Router};
use serde::Deserialize;

use crate::error::{AppError, AppResult};
use crate::extractors::{ImageChange, PromptForm};
use crate::prompts::{self, PromptView};
use crate::repository::{NewPrompt, PromptChanges, PromptFilter};
use crate::routes::votes;
use crate::state::AppState;

#[derive(Deserialize, Default)]
struct ListQuery {
    tag: Option<String>,
    author: Option<String>,
}

fn check_text(text: &str) -> AppResult<()> {
    prompts::validate_text(text).map_err(AppError::BadRequest)
}

fn check_tags(tags: &str) -> AppResult<()> {
    prompts::validate_tags(tags).map_err(AppError::BadRequest)
}

/// Store an uploaded image if the request carries one.
/// Returns the change to apply to the row.
async fn store_image(state: &AppState, change: ImageChange) -> AppResult<Option<Option<String>>> {
    match change {
        ImageChange::Keep => Ok(None),
        ImageChange::Clear => Ok(Some(None)),
        ImageChange::Upload(image) => {
            let stored = state
                .media
                .save_image(&image.file_name, &image.data)
                .await?;
            Ok(Some(Some(stored)))
        }
    }
}

/// List all prompts, optionally filtered by tag or author username
async fn list(
    State(state): State<AppState>,
    Query(query): Query<ListQuery>,
) -> AppResult<Json<Vec<PromptView>>> {
    let filter = PromptFilter {
        author_username: query.author,
    };
    let mut rows = state.repo.list_prompts(&filter).await?;
    // `?tag=` with nothing in it means no tag filter
    if let Some(tag) = query.tag.as_deref().filter(|t| !t.trim().is_empty()) {
        rows.retain(|p| prompts::has_tag(&p.tags, tag));
    }

    let views = prompts::represent_all(state.repo.as_ref(), &rows).await?;
    Ok(Json(views))
}

async fn create(
    State(state): State<AppState>,
    form: PromptForm,
) -> AppResult<(StatusCode, Json<PromptView>)> {
    let text = form
        .text
        .ok_or_else(|| AppError::BadRequest("prompt is required".into()))?;
    check_text(&text)?;
    let tags = form.tags.unwrap_or_default();
    check_tags(&tags)?;

    let author_id = match form.author {
        Some(author) if !author.trim().is_empty() => author,
        _ => state.system_user_id.clone(),
    };

    let expected_output = store_image(&state, form.expected_output).await?.flatten();

    let created = state
        .repo
        .create_prompt(NewPrompt {
            author_id,
            text,
            tags,
            expected_output: expected_output.clone(),
        })
        .await;

    let prompt = match created {
        Ok(prompt) => prompt,
        Err(e) => {
            if let Some(ref stored) = expected_output {
                state.media.discard(stored).await;
            }
            return Err(e.into());
        }
    };

    let view = prompts::represent(state.repo.as_ref(), &prompt).await?;
    Ok((StatusCode::CREATED, Json(view)))
}

async fn retrieve(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> AppResult<Json<PromptView>> {
    let prompt = state.repo.get_prompt(&id).await?.ok_or(AppError::NotFound)?;
    let view = prompts::represent(state.repo.as_ref(), &prompt).await?;
    Ok(Json(view))
}

/// Shared body of PUT and PATCH. A full update needs text and tags.
async fn apply_update(
    state: &AppState,
    id: &str,
    form: PromptForm,
    partial: bool,
) -> AppResult<PromptView> {
    // Fail before storing an upload for a prompt that is not there
    if state.repo.get_prompt(id).await?.is_none() {
        return Err(AppError::NotFound);
    }

    if !partial {
        if form.text.is_none() {
            return Err(AppError::BadRequest("prompt is required".into()));
        }
        if form.tags.is_none() {
            return Err(AppError::BadRequest("tags is required".into()));
        }
    }
    if let Some(ref text) = form.text {
        check_text(text)?;
    }
    if let Some(ref tags) = form.tags {
        check_tags(tags)?;
    }
    if form.author.is_some() {
        tracing::debug!(prompt_id = %id, "Ignoring author on update");
    }

    let expected_output = store_image(state, form.expected_output).await?;
    let new_image = expected_output.clone().flatten();

    let changes = PromptChanges {
        text: form.text,
        tags: form.tags,
        expected_output,
    };
    let updated = match state.repo.update_prompt(id, changes).await {
        Ok(prompt) => prompt,
        Err(e) => {
            if let Some(ref stored) = new_image {
                state.media.discard(stored).await;
            }
            return Err(e.into());
        }
    };

    if let Some(ref old) = updated.replaced_image {
        state.media.discard(old).await;
    }

    Ok(prompts::represent(state.repo.as_ref(), &updated.prompt).await?)
}

async fn replace(
    State(state): State<AppState>,
    Path(id): Path<String>,
    form: PromptForm,
) -> AppResult<Json<PromptView>> {
    Ok(Json(apply_update(&state, &id, form, false).await?))
}

async fn partial_update(
    State(state): State<AppState>,
    Path(id): Path<String>,
    form: PromptForm,
) -> AppResult<Json<PromptView>> {
    Ok(Json(apply_update(&state, &id, form, true).await?))
}

async fn destroy(State(state): State<AppState>, Path(id): Path<String>) -> AppResult<StatusCode> {
    let deleted = state.repo.delete_prompt(&id).await?;
    if let Some(ref stored) = deleted.expected_output {
        state.media.discard(stored).await;
    }
    Ok(StatusCode::NO_CONTENT)
}

/// Prompt collection router
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/api/prompts", get(list).post(create))
        .route(
            "/api/prompts/{id}",
            get(retrieve)
                .put(replace)
                .patch(partial_update)
                .delete(destroy),
        )
        .route(
            "/api/prompts/{id}/votes",
            get(votes::list).post(votes::cast),
        )
}

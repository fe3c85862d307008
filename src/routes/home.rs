use axum::extract::State;
use axum::response::Html;

use crate::error::AppResult;
use crate::state::AppState;

pub async fn index(State(state): State<AppState>) -> AppResult<Html<String>> {
    let conn = state.db.get()?;
    let prompt_count: i64 = conn.query_row("SELECT COUNT(*) FROM prompts", [], |row| row.get(0))?;

    Ok(Html(format!(
        "<h1>promptboard</h1><p>{} prompts shared. Browse them at <a href=\"/api/prompts\">/api/prompts</a>.</p>",
        prompt_count
    )))
}

pub async fn health() -> &'static str {
    "ok"
}

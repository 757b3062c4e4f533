// rest/routes/todos.rs — thin HTTP shims over the todos pipeline.

use axum::extract::{Path, State};
use axum::Json;
use serde_json::{json, Value};
use std::sync::Arc;

use crate::auth::OptionalClaims;
use crate::error::ApiError;
use crate::todos::{self, Todo, TodoCreate, TodoUpdate};
use crate::AppContext;

pub async fn list_todos(State(ctx): State<Arc<AppContext>>) -> Result<Json<Vec<Todo>>, ApiError> {
    todos::list(&ctx).await.map(Json)
}

pub async fn create_todo(
    State(ctx): State<Arc<AppContext>>,
    claims: OptionalClaims,
    Json(input): Json<TodoCreate>,
) -> Result<Json<Todo>, ApiError> {
    todos::create(&ctx, claims.claims(), input).await.map(Json)
}

pub async fn update_todo(
    State(ctx): State<Arc<AppContext>>,
    Path(id): Path<i64>,
    claims: OptionalClaims,
    Json(patch): Json<TodoUpdate>,
) -> Result<Json<Todo>, ApiError> {
    todos::update(&ctx, claims.claims(), id, patch).await.map(Json)
}

pub async fn delete_todo(
    State(ctx): State<Arc<AppContext>>,
    Path(id): Path<i64>,
    claims: OptionalClaims,
) -> Result<Json<Value>, ApiError> {
    todos::delete(&ctx, claims.claims(), id).await?;
    Ok(Json(json!({ "ok": true })))
}

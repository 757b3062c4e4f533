// todos — task model + the mutation pipeline.
//
// Every write runs the same sequence: validate input, enforce the auth
// gate, apply the change to the store, recompute the derived overdue flag,
// broadcast to the live feed. Reads skip the gate entirely and recompute
// the overdue flag against the current clock — a flag persisted at write
// time is stale the moment "now" moves past the due date.

use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::json;
use tracing::info;

use crate::auth;
use crate::error::ApiError;
use crate::storage::{TodoDraft, TodoRow};
use crate::AppContext;
use taskcast_claims::Claims;

pub const MAX_TITLE_LEN: usize = 200;

const DEFAULT_PRIORITY: &str = "medium";

fn default_priority() -> String {
    DEFAULT_PRIORITY.to_string()
}

/// A task record as served to clients. Timestamps stay in their stored
/// RFC 3339 form; `is_overdue` is recomputed at construction.
#[derive(Debug, Clone, Serialize)]
pub struct Todo {
    pub id: i64,
    pub title: String,
    pub description: String,
    pub priority: String,
    pub assignee: String,
    pub creator: String,
    pub due_date: Option<String>,
    pub is_overdue: bool,
    pub created_at: String,
    pub updated_at: String,
}

impl Todo {
    /// Build the response view of a row, recomputing the overdue flag
    /// against `now` instead of trusting the stored snapshot.
    pub fn from_row(row: TodoRow, now: DateTime<Utc>) -> Self {
        let is_overdue = overdue(row.due_date.as_deref(), now);
        Self {
            id: row.id,
            title: row.title,
            description: row.description,
            priority: row.priority,
            assignee: row.assignee,
            creator: row.creator,
            due_date: row.due_date,
            is_overdue,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct TodoCreate {
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default = "default_priority")]
    pub priority: String,
    #[serde(default)]
    pub assignee: String,
    #[serde(default)]
    pub creator: String,
    #[serde(default)]
    pub due_date: Option<DateTime<Utc>>,
}

/// Partial update — only fields present in the request body are applied.
/// `due_date` distinguishes "absent" (leave as is) from an explicit `null`
/// (clear the due date), hence the double `Option`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct TodoUpdate {
    pub title: Option<String>,
    pub description: Option<String>,
    pub priority: Option<String>,
    pub assignee: Option<String>,
    pub creator: Option<String>,
    #[serde(default, deserialize_with = "double_option")]
    pub due_date: Option<Option<DateTime<Utc>>>,
}

fn double_option<'de, D>(de: D) -> Result<Option<Option<DateTime<Utc>>>, D::Error>
where
    D: Deserializer<'de>,
{
    // Runs only when the field is present, so `null` becomes Some(None)
    // while an absent field stays None via the serde default.
    Option::<DateTime<Utc>>::deserialize(de).map(Some)
}

/// `due_date` in the past ⇒ overdue. No due date ⇒ never overdue. The
/// stored strings are our own writes; anything unparseable is treated as
/// "no due date".
pub fn overdue(due_date: Option<&str>, now: DateTime<Utc>) -> bool {
    match due_date.and_then(|s| DateTime::parse_from_rfc3339(s).ok()) {
        Some(due) => due.with_timezone(&Utc) < now,
        None => false,
    }
}

fn validate_title(title: &str) -> Result<(), ApiError> {
    if title.trim().is_empty() {
        return Err(ApiError::Validation("title must not be empty".to_string()));
    }
    if title.chars().count() > MAX_TITLE_LEN {
        return Err(ApiError::Validation(format!(
            "title must be at most {MAX_TITLE_LEN} characters"
        )));
    }
    Ok(())
}

fn to_stored(due: &DateTime<Utc>) -> String {
    due.to_rfc3339_opts(SecondsFormat::Secs, true)
}

// ─── Pipeline ─────────────────────────────────────────────────────────────────

pub async fn create(
    ctx: &AppContext,
    claims: Option<&Claims>,
    input: TodoCreate,
) -> Result<Todo, ApiError> {
    let who = auth::require_auth(claims)?;
    validate_title(&input.title)?;

    let now = Utc::now();
    let due_date = input.due_date.as_ref().map(to_stored);
    let draft = TodoDraft {
        title: input.title,
        description: input.description,
        priority: input.priority,
        assignee: input.assignee,
        creator: input.creator,
        is_overdue: overdue(due_date.as_deref(), now),
        due_date,
    };
    let row = ctx.storage.create_todo(&draft).await?;
    info!(id = row.id, user = %who.sub, "todo created");

    let todo = Todo::from_row(row, now);
    ctx.registry.broadcast("created", serde_json::to_value(&todo)?);
    Ok(todo)
}

pub async fn update(
    ctx: &AppContext,
    claims: Option<&Claims>,
    id: i64,
    patch: TodoUpdate,
) -> Result<Todo, ApiError> {
    let who = auth::require_auth(claims)?;
    if let Some(title) = &patch.title {
        validate_title(title)?;
    }

    let row = ctx.storage.get_todo(id).await?.ok_or(ApiError::NotFound)?;
    let now = Utc::now();

    let mut draft = TodoDraft {
        title: row.title,
        description: row.description,
        priority: row.priority,
        assignee: row.assignee,
        creator: row.creator,
        due_date: row.due_date,
        is_overdue: row.is_overdue,
    };
    if let Some(title) = patch.title {
        draft.title = title;
    }
    if let Some(description) = patch.description {
        draft.description = description;
    }
    if let Some(priority) = patch.priority {
        draft.priority = priority;
    }
    if let Some(assignee) = patch.assignee {
        draft.assignee = assignee;
    }
    if let Some(creator) = patch.creator {
        draft.creator = creator;
    }
    if let Some(due_date) = patch.due_date {
        draft.due_date = due_date.as_ref().map(to_stored);
    }
    draft.is_overdue = overdue(draft.due_date.as_deref(), now);

    let row = ctx
        .storage
        .update_todo(id, &draft)
        .await?
        .ok_or(ApiError::NotFound)?;
    info!(id, user = %who.sub, "todo updated");

    let todo = Todo::from_row(row, now);
    ctx.registry.broadcast("updated", serde_json::to_value(&todo)?);
    Ok(todo)
}

pub async fn delete(ctx: &AppContext, claims: Option<&Claims>, id: i64) -> Result<(), ApiError> {
    let who = auth::require_auth(claims)?;

    if !ctx.storage.delete_todo(id).await? {
        return Err(ApiError::NotFound);
    }
    info!(id, user = %who.sub, "todo deleted");

    ctx.registry.broadcast("deleted", json!({ "id": id }));
    Ok(())
}

/// Public read path — no gate, fresh overdue flags on every call.
pub async fn list(ctx: &AppContext) -> Result<Vec<Todo>, ApiError> {
    let rows = ctx.storage.list_todos().await?;
    let now = Utc::now();
    Ok(rows.into_iter().map(|row| Todo::from_row(row, now)).collect())
}

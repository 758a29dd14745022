//! Item Commands
//!
//! CRUD plus the display list and progress for the frontend.

use crate::domain::{Item, ItemEdit, ItemId};
use crate::view::{self, Filter, Progress, SortOrder};
use crate::AppState;

/// Create a new item
pub async fn create_item(state: &AppState, title: String, category: Option<String>) -> Result<Item, String> {
    state
        .list
        .add(&title, category.as_deref().unwrap_or(""))
        .await
        .map_err(|e| e.to_string())
}

/// Items to show, pinned first
pub async fn list_items(
    state: &AppState,
    filter: Option<Filter>,
    sort: Option<SortOrder>,
) -> Result<Vec<Item>, String> {
    let items = state.list.items().await;
    Ok(view::display_list(&items, filter.unwrap_or_default(), sort))
}

pub async fn get_item(state: &AppState, id: String) -> Result<Option<Item>, String> {
    Ok(state.list.get(&ItemId::new(id)).await)
}

/// Update title and/or category as one change; `None` for an unknown id
pub async fn update_item(
    state: &AppState,
    id: String,
    title: Option<String>,
    category: Option<String>,
) -> Result<Option<Item>, String> {
    let mut edits = Vec::new();
    if let Some(title) = title {
        edits.push(ItemEdit::SetTitle(title));
    }
    if let Some(category) = category {
        edits.push(ItemEdit::SetCategory(category));
    }
    state
        .list
        .edit_all(&ItemId::new(id), edits)
        .await
        .map_err(|e| e.to_string())
}

pub async fn toggle_item(state: &AppState, id: String, done: bool) -> Result<Option<Item>, String> {
    Ok(state.list.toggle(&ItemId::new(id), done).await)
}

pub async fn toggle_pin(state: &AppState, id: String) -> Result<Option<Item>, String> {
    Ok(state.list.pin(&ItemId::new(id)).await)
}

/// Returns whether anything was removed
pub async fn delete_item(state: &AppState, id: String) -> Result<bool, String> {
    Ok(state.list.delete(&ItemId::new(id)).await.is_some())
}

pub async fn get_progress(state: &AppState) -> Result<Progress, String> {
    Ok(view::progress(&state.list.items().await))
}

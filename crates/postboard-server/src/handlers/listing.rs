//! Paginated post listings: index, group and profile pages

use axum::{
    extract::{Path, Query, State},
    response::Html,
};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::auth::Viewer;
use crate::database::{Group, PostFilter, PostView, User};
use crate::state::AppState;
use crate::utils::{AppError, Page, Paginator};

#[derive(Debug, Default, Deserialize)]
pub struct PageQuery {
    pub page: Option<String>,
}

#[derive(Serialize)]
struct IndexContext {
    page: Page<PostView>,
}

#[derive(Serialize)]
struct GroupContext {
    group: Group,
    page: Page<PostView>,
    hide_group_link: bool,
}

#[derive(Serialize)]
struct ProfileContext {
    author: User,
    posts_count: u64,
    page: Page<PostView>,
}

/// Counts the filtered posts, then fetches only the requested window.
pub async fn load_page(
    state: &AppState,
    filter: PostFilter,
    requested: Option<&str>,
) -> Result<Page<PostView>, AppError> {
    let total = state
        .repository
        .count_posts(filter)
        .await
        .map_err(AppError::database)?;

    let paginator = Paginator::new(total.max(0) as u64, state.settings.pagination.posts_per_page);
    let window = paginator.window(requested);

    let items = if window.limit == 0 {
        Vec::new()
    } else {
        state
            .repository
            .list_posts(filter, window.limit as i64, window.offset as i64)
            .await
            .map_err(AppError::database)?
    };

    debug!(
        "Page {}/{} of {:?}: {} posts",
        window.number,
        window.num_pages,
        filter,
        items.len()
    );

    Ok(Page::new(window, items))
}

/// GET / - all posts, newest first. Wrapped by the page cache.
pub async fn index(
    State(state): State<AppState>,
    viewer: Viewer,
    Query(query): Query<PageQuery>,
) -> Result<Html<String>, AppError> {
    let page = load_page(&state, PostFilter::All, query.page.as_deref()).await?;
    state.renderer.render("index", &viewer, &IndexContext { page })
}

/// GET /group/{slug}/
pub async fn group_posts(
    State(state): State<AppState>,
    viewer: Viewer,
    Path(slug): Path<String>,
    Query(query): Query<PageQuery>,
) -> Result<Html<String>, AppError> {
    let group = state
        .repository
        .find_group_by_slug(&slug)
        .await
        .map_err(AppError::database)?
        .ok_or_else(|| AppError::NotFound(format!("group {}", slug)))?;

    let page = load_page(&state, PostFilter::Group(group.id), query.page.as_deref()).await?;
    state.renderer.render(
        "group_list",
        &viewer,
        &GroupContext {
            group,
            page,
            hide_group_link: true,
        },
    )
}

/// GET /profile/{username}/
pub async fn profile(
    State(state): State<AppState>,
    viewer: Viewer,
    Path(username): Path<String>,
    Query(query): Query<PageQuery>,
) -> Result<Html<String>, AppError> {
    let author = state
        .repository
        .find_user_by_username(&username)
        .await
        .map_err(AppError::database)?
        .ok_or_else(|| AppError::NotFound(format!("user {}", username)))?;

    let page = load_page(&state, PostFilter::Author(author.id), query.page.as_deref()).await?;
    let posts_count = page.count;

    state.renderer.render(
        "profile",
        &viewer,
        &ProfileContext {
            author,
            posts_count,
            page,
        },
    )
}

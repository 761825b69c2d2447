//! Post detail, create, edit and comment handlers

use axum::{
    extract::{rejection::FormRejection, Multipart, Path, State},
    response::{Html, IntoResponse, Response},
    Form,
};
use serde::Serialize;
use tracing::debug;

use crate::auth::{AuthUser, Viewer};
use crate::database::{CommentView, PostFilter, PostView};
use crate::forms::{group_choices, CommentForm, GroupChoice, PostFormData, PostFormState};
use crate::services::{EditAccess, EditOutcome, FormOutcome};
use crate::state::AppState;
use crate::utils::{AppError, Found};

#[derive(Serialize)]
struct DetailContext {
    post: PostView,
    comments: Vec<CommentView>,
    author_posts_count: i64,
    is_author: bool,
}

#[derive(Serialize)]
struct PostFormContext {
    is_edit: bool,
    post_id: Option<i64>,
    form: PostFormState,
    groups: Vec<GroupChoice>,
}

/// Non-numeric ids cannot match a post.
fn parse_post_id(raw: &str) -> Result<i64, AppError> {
    raw.parse::<i64>()
        .map_err(|_| AppError::NotFound(format!("post {}", raw)))
}

fn post_url(post_id: i64) -> String {
    format!("/posts/{}/", post_id)
}

async fn render_form(
    state: &AppState,
    viewer: &Viewer,
    post_id: Option<i64>,
    form: PostFormState,
) -> Result<Html<String>, AppError> {
    let groups = state.posts.groups().await?;
    let context = PostFormContext {
        is_edit: post_id.is_some(),
        post_id,
        groups: group_choices(&groups, form.group),
        form,
    };
    state.renderer.render("create_post", viewer, &context)
}

/// GET /posts/{post_id}/
pub async fn post_detail(
    State(state): State<AppState>,
    viewer: Viewer,
    Path(post_id): Path<String>,
) -> Result<Html<String>, AppError> {
    let post_id = parse_post_id(&post_id)?;
    let post = state.posts.require_post(post_id).await?;

    let comments = state
        .repository
        .list_comments(post_id)
        .await
        .map_err(AppError::database)?;
    let author_posts_count = state
        .repository
        .count_posts(PostFilter::Author(post.author_id))
        .await
        .map_err(AppError::database)?;
    let is_author = viewer.user().is_some_and(|u| u.id == post.author_id);

    state.renderer.render(
        "post_detail",
        &viewer,
        &DetailContext {
            post,
            comments,
            author_posts_count,
            is_author,
        },
    )
}

/// GET /create/
pub async fn post_create_page(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
) -> Result<Html<String>, AppError> {
    let viewer = Viewer(Some(user));
    render_form(&state, &viewer, None, PostFormState::default()).await
}

/// POST /create/ - redirects to the author's profile on success.
pub async fn post_create(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    multipart: Multipart,
) -> Result<Response, AppError> {
    let data = PostFormData::from_multipart(multipart).await?;

    match state.posts.create_post(&user, data).await? {
        FormOutcome::Saved(_) => Ok(Found::to(&format!("/profile/{}/", user.username)).into_response()),
        FormOutcome::Invalid(form) => {
            debug!("Rejected new post from {}: {:?}", user.username, form.errors);
            let viewer = Viewer(Some(user));
            Ok(render_form(&state, &viewer, None, form).await?.into_response())
        }
    }
}

/// GET /posts/{post_id}/edit/
pub async fn post_edit_page(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    Path(post_id): Path<String>,
) -> Result<Response, AppError> {
    let post_id = parse_post_id(&post_id)?;

    match state.posts.edit_access(&user, post_id).await? {
        EditAccess::NotAuthor => Ok(Found::to(&post_url(post_id)).into_response()),
        EditAccess::Allowed(post) => {
            let form = PostFormState::initial(&post);
            let viewer = Viewer(Some(user));
            Ok(render_form(&state, &viewer, Some(post_id), form)
                .await?
                .into_response())
        }
    }
}

/// POST /posts/{post_id}/edit/
pub async fn post_edit(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    Path(post_id): Path<String>,
    multipart: Multipart,
) -> Result<Response, AppError> {
    let post_id = parse_post_id(&post_id)?;
    let data = PostFormData::from_multipart(multipart).await?;

    match state.posts.edit_post(&user, post_id, data).await? {
        EditOutcome::NotAuthor | EditOutcome::Saved(_) => {
            Ok(Found::to(&post_url(post_id)).into_response())
        }
        EditOutcome::Invalid(form) => {
            let viewer = Viewer(Some(user));
            Ok(render_form(&state, &viewer, Some(post_id), form)
                .await?
                .into_response())
        }
    }
}

/// POST /posts/{post_id}/comment/ - always lands back on the post.
pub async fn add_comment(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    Path(post_id): Path<String>,
    form: Result<Form<CommentForm>, FormRejection>,
) -> Result<Found, AppError> {
    let post_id = parse_post_id(&post_id)?;

    // A body that is not a comment form is an empty comment on an existing post.
    let form = match form {
        Ok(Form(form)) => form,
        Err(rejection) => {
            state.posts.require_post(post_id).await?;
            debug!("Unreadable comment body on post {}: {}", post_id, rejection);
            return Ok(Found::to(&post_url(post_id)));
        }
    };

    if state.posts.add_comment(&user, post_id, form).await?.is_none() {
        debug!("Dropped empty comment from {} on post {}", user.username, post_id);
    }

    Ok(Found::to(&post_url(post_id)))
}

//! # Postboard Server
//!
//! A small blogging site: posts with optional groups and images, comments,
//! author profiles and a cached front page.

pub mod auth;
pub mod cache;
pub mod config;
pub mod database;
pub mod forms;
pub mod handlers;
pub mod services;
pub mod state;
pub mod telemetry;
pub mod utils;
pub mod views;

#[cfg(test)]
mod test;

use axum::{
    extract::DefaultBodyLimit,
    middleware,
    routing::get,
    Router,
};
use tower_http::{
    catch_panic::CatchPanicLayer,
    services::ServeDir,
    trace::{DefaultMakeSpan, TraceLayer},
};

use crate::cache::cache_page;
use crate::handlers::{auth as auth_handlers, health, listing, posts};
use crate::state::AppState;
use crate::utils::error::not_found;

pub fn build_router(state: AppState) -> Router {
    // Only the index page is cached
    let cached_routes = Router::new()
        .route("/", get(listing::index))
        .route_layer(middleware::from_fn_with_state(state.clone(), cache_page));

    let page_routes = Router::new()
        .route("/group/{slug}/", get(listing::group_posts))
        .route("/profile/{username}/", get(listing::profile))
        .route("/posts/{post_id}/", get(posts::post_detail))
        .route("/create/", get(posts::post_create_page).post(posts::post_create))
        .route(
            "/posts/{post_id}/edit/",
            get(posts::post_edit_page).post(posts::post_edit),
        )
        .route("/posts/{post_id}/comment/", axum::routing::post(posts::add_comment));

    let auth_routes = Router::new()
        .route(
            "/auth/login/",
            get(auth_handlers::login_page).post(auth_handlers::login),
        )
        .route(
            "/auth/signup/",
            get(auth_handlers::signup_page).post(auth_handlers::signup),
        )
        .route(
            "/auth/logout/",
            get(auth_handlers::logout).post(auth_handlers::logout),
        );

    let health_routes = Router::new()
        .route("/health", get(health::health_check))
        .route("/health/ready", get(health::readiness_check));

    let media_root = state.settings.media.root.clone();
    let media_prefix = match state.settings.media.url_prefix.trim_end_matches('/') {
        "" => "/media".to_string(),
        prefix => prefix.to_string(),
    };
    let upload_limit = state.settings.media.max_upload_mb * 1024 * 1024;

    Router::new()
        .merge(cached_routes)
        .merge(page_routes)
        .merge(auth_routes)
        .merge(health_routes)
        .nest_service(&media_prefix, ServeDir::new(media_root))
        .fallback(not_found)
        .layer(DefaultBodyLimit::max(upload_limit))
        .layer(CatchPanicLayer::new())
        .layer(TraceLayer::new_for_http().make_span_with(DefaultMakeSpan::default()))
        .with_state(state)
}

//! Session cookie handling and viewer extractors

use std::convert::Infallible;

use axum::{
    extract::{FromRef, FromRequestParts},
    http::{request::Parts, HeaderMap},
};
use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};
use serde::Serialize;
use tracing::debug;

use crate::state::AppState;
use crate::utils::redirect::{login_url_with_next, Found};

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SessionUser {
    pub id: i64,
    pub username: String,
}

/// The signed-in user, if any. Never rejects.
#[derive(Debug, Clone)]
pub struct Viewer(pub Option<SessionUser>);

impl Viewer {
    pub fn user(&self) -> Option<&SessionUser> {
        self.0.as_ref()
    }

    pub fn username(&self) -> Option<&str> {
        self.0.as_ref().map(|u| u.username.as_str())
    }
}

/// A signed-in user. Anonymous requests are redirected to the login page
/// with `next` pointing back at the requested path.
#[derive(Debug, Clone)]
pub struct AuthUser(pub SessionUser);

pub fn session_user(headers: &HeaderMap, state: &AppState) -> Option<SessionUser> {
    let jar = CookieJar::from_headers(headers);
    let token = jar.get(&state.settings.auth.cookie_name)?;

    match state.jwt.validate_token(token.value()) {
        Ok(claims) => Some(SessionUser {
            id: claims.user_id,
            username: claims.username,
        }),
        Err(e) => {
            debug!("Ignoring invalid session cookie: {}", e);
            None
        }
    }
}

pub fn session_cookie(state: &AppState, token: String) -> Cookie<'static> {
    Cookie::build((state.settings.auth.cookie_name.clone(), token))
        .path("/")
        .http_only(true)
        .same_site(SameSite::Lax)
        .build()
}

pub fn clear_session_cookie(state: &AppState) -> Cookie<'static> {
    Cookie::build((state.settings.auth.cookie_name.clone(), ""))
        .path("/")
        .build()
}

impl<S> FromRequestParts<S> for Viewer
where
    AppState: FromRef<S>,
    S: Send + Sync,
{
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let state = AppState::from_ref(state);
        Ok(Viewer(session_user(&parts.headers, &state)))
    }
}

impl<S> FromRequestParts<S> for AuthUser
where
    AppState: FromRef<S>,
    S: Send + Sync,
{
    type Rejection = Found;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let state = AppState::from_ref(state);

        match session_user(&parts.headers, &state) {
            Some(user) => Ok(AuthUser(user)),
            None => {
                let next = parts
                    .uri
                    .path_and_query()
                    .map(|pq| pq.as_str())
                    .unwrap_or_else(|| parts.uri.path());
                debug!("Anonymous request to {}, redirecting to login", next);
                Err(Found::to(&login_url_with_next(
                    &state.settings.auth.login_url,
                    next,
                )))
            }
        }
    }
}

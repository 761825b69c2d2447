//! Signup, login and logout

use axum::{
    extract::{Query, State},
    response::{Html, IntoResponse, Response},
    Form,
};
use axum_extra::extract::cookie::CookieJar;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::auth::session::{clear_session_cookie, session_cookie};
use crate::auth::{PasswordService, SessionUser, Viewer};
use crate::database::AlreadyExists;
use crate::forms::{FormErrors, LoginForm, SignupForm};
use crate::state::AppState;
use crate::utils::redirect::safe_next;
use crate::utils::{AppError, Found};

const INVALID_LOGIN: &str =
    "Please enter a correct username and password. Note that both fields may be case-sensitive.";
const USERNAME_TAKEN: &str = "A user with that username already exists.";

fn username_taken() -> FormErrors {
    let mut errors = FormErrors::default();
    errors.add("username", USERNAME_TAKEN);
    errors
}

#[derive(Debug, Default, Deserialize)]
pub struct NextQuery {
    pub next: Option<String>,
}

#[derive(Serialize)]
struct LoginContext<'a> {
    username: &'a str,
    next: &'a str,
    errors: FormErrors,
}

#[derive(Serialize)]
struct SignupContext<'a> {
    username: &'a str,
    errors: FormErrors,
}

/// Issues a session token and redirects with the cookie attached.
fn sign_in(state: &AppState, jar: CookieJar, user: &SessionUser, to: &str) -> Result<Response, AppError> {
    let token = state
        .jwt
        .generate_token(user.id, &user.username)
        .map_err(|e| AppError::InternalError(format!("Failed to issue session token: {}", e)))?;

    Ok((jar.add(session_cookie(state, token)), Found::to(to)).into_response())
}

/// GET /auth/login/
pub async fn login_page(
    State(state): State<AppState>,
    viewer: Viewer,
    Query(query): Query<NextQuery>,
) -> Result<Html<String>, AppError> {
    let context = LoginContext {
        username: "",
        next: query.next.as_deref().unwrap_or(""),
        errors: FormErrors::default(),
    };
    state.renderer.render("login", &viewer, &context)
}

/// POST /auth/login/
pub async fn login(
    State(state): State<AppState>,
    viewer: Viewer,
    jar: CookieJar,
    Form(form): Form<LoginForm>,
) -> Result<Response, AppError> {
    let next = form.next.as_deref().unwrap_or("");
    let username = form.username.trim();

    let errors = match form.clean() {
        Err(errors) => errors,
        Ok(()) => {
            let user = state
                .repository
                .find_user_by_username(username)
                .await
                .map_err(AppError::database)?;

            let verified = match &user {
                Some(user) => PasswordService::verify(&form.password, &user.password_hash)
                    .map_err(|e| AppError::InternalError(e.to_string()))?,
                None => false,
            };

            match user {
                Some(user) if verified => {
                    info!("User {} logged in", user.username);
                    let session = SessionUser {
                        id: user.id,
                        username: user.username,
                    };
                    return sign_in(&state, jar, &session, safe_next(form.next.as_deref()));
                }
                _ => {
                    warn!("Failed login for {}", username);
                    let mut errors = FormErrors::default();
                    errors.add_non_field(INVALID_LOGIN);
                    errors
                }
            }
        }
    };

    let context = LoginContext {
        username,
        next,
        errors,
    };
    Ok(state.renderer.render("login", &viewer, &context)?.into_response())
}

/// GET /auth/signup/
pub async fn signup_page(
    State(state): State<AppState>,
    viewer: Viewer,
) -> Result<Html<String>, AppError> {
    let context = SignupContext {
        username: "",
        errors: FormErrors::default(),
    };
    state.renderer.render("signup", &viewer, &context)
}

/// POST /auth/signup/ - new accounts are signed in straight away.
pub async fn signup(
    State(state): State<AppState>,
    viewer: Viewer,
    jar: CookieJar,
    Form(form): Form<SignupForm>,
) -> Result<Response, AppError> {
    let errors = match form.clean() {
        Err(errors) => errors,
        Ok(username) => {
            let taken = state
                .repository
                .find_user_by_username(&username)
                .await
                .map_err(AppError::database)?
                .is_some();

            if taken {
                username_taken()
            } else {
                let hash = PasswordService::hash(&form.password1)
                    .map_err(|e| AppError::InternalError(e.to_string()))?;
                match state.repository.create_user(&username, &hash).await {
                    Ok(user) => {
                        info!("New user {} signed up", user.username);
                        let session = SessionUser {
                            id: user.id,
                            username: user.username,
                        };
                        return sign_in(&state, jar, &session, "/");
                    }
                    // Another signup took the name between the check and the insert.
                    Err(e) if e.downcast_ref::<AlreadyExists>().is_some() => {
                        warn!("Signup for {} lost to a concurrent one", username);
                        username_taken()
                    }
                    Err(e) => return Err(AppError::database(e)),
                }
            }
        }
    };

    let context = SignupContext {
        username: form.username.trim(),
        errors,
    };
    Ok(state.renderer.render("signup", &viewer, &context)?.into_response())
}

/// GET|POST /auth/logout/
pub async fn logout(State(state): State<AppState>, viewer: Viewer, jar: CookieJar) -> Response {
    if let Some(name) = viewer.username() {
        info!("User {} logged out", name);
    }
    (jar.remove(clear_session_cookie(&state)), Found::to("/")).into_response()
}

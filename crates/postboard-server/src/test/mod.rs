//! Router-level tests against an in-memory repository


use axum::{
    body::Body,
    http::{header, Request, Response},
    Router,
};
use std::sync::Arc;
use tempfile::TempDir;
use tower::ServiceExt;

use crate::auth::PasswordService;
use crate::build_router;
use crate::config::Settings;
use crate::database::{BlogRepository, Group, NewGroup, NewPost, PostView, User};
use crate::state::AppState;

pub use memory_repository::MemoryRepository;

const BOUNDARY: &str = "postboard-test-boundary";

pub struct TestApp {
    pub state: AppState,
    pub repo: Arc<MemoryRepository>,
    media: TempDir,
}

impl TestApp {
    pub fn new() -> Self {
        let media = tempfile::tempdir().unwrap();
        let mut settings = Settings::default();
        settings.media.root = media.path().to_path_buf();
        settings.auth.jwt_secret = "test-secret".to_string();

        let repo = Arc::new(MemoryRepository::new());
        let state = AppState::new(settings, repo.clone()).unwrap();

        Self {
            state,
            repo,
            media,
        }
    }

    pub fn router(&self) -> Router {
        build_router(self.state.clone())
    }

    pub fn media_root(&self) -> &std::path::Path {
        self.media.path()
    }

    /// A user who cannot log in with a password; tests use `cookie` instead.
    pub async fn user(&self, username: &str) -> User {
        self.repo.create_user(username, "!").await.unwrap()
    }

    pub async fn user_with_password(&self, username: &str, password: &str) -> User {
        let hash = PasswordService::hash(password).unwrap();
        self.repo.create_user(username, &hash).await.unwrap()
    }

    pub async fn group(&self, slug: &str) -> Group {
        self.repo
            .create_group(NewGroup {
                title: format!("Group {}", slug),
                slug: slug.to_string(),
                description: String::new(),
            })
            .await
            .unwrap()
    }

    pub async fn post(&self, author: &User, text: &str, group: Option<&Group>) -> PostView {
        self.repo
            .create_post(NewPost {
                author_id: author.id,
                text: text.to_string(),
                group_id: group.map(|g| g.id),
                image: None,
            })
            .await
            .unwrap()
    }

    pub fn cookie(&self, user: &User) -> String {
        let token = self.state.jwt.generate_token(user.id, &user.username).unwrap();
        format!("{}={}", self.state.settings.auth.cookie_name, token)
    }

    pub async fn send(&self, request: Request<Body>) -> Response<Body> {
        self.router().oneshot(request).await.unwrap()
    }

    pub async fn get(&self, uri: &str, cookie: Option<&str>) -> Response<Body> {
        let mut builder = Request::builder().uri(uri);
        if let Some(cookie) = cookie {
            builder = builder.header(header::COOKIE, cookie);
        }
        self.send(builder.body(Body::empty()).unwrap()).await
    }

    pub async fn post_form(&self, uri: &str, body: &str, cookie: Option<&str>) -> Response<Body> {
        let mut builder = Request::builder()
            .method("POST")
            .uri(uri)
            .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded");
        if let Some(cookie) = cookie {
            builder = builder.header(header::COOKIE, cookie);
        }
        self.send(builder.body(Body::from(body.to_string())).unwrap())
            .await
    }

    pub async fn post_multipart(
        &self,
        uri: &str,
        fields: &[(&str, &str)],
        file: Option<(&str, &[u8])>,
        cookie: Option<&str>,
    ) -> Response<Body> {
        let mut builder = Request::builder()
            .method("POST")
            .uri(uri)
            .header(
                header::CONTENT_TYPE,
                format!("multipart/form-data; boundary={}", BOUNDARY),
            );
        if let Some(cookie) = cookie {
            builder = builder.header(header::COOKIE, cookie);
        }
        let body = multipart_body(fields, file);
        self.send(builder.body(Body::from(body)).unwrap()).await
    }
}

fn multipart_body(fields: &[(&str, &str)], file: Option<(&str, &[u8])>) -> Vec<u8> {
    let mut body = Vec::new();
    for (name, value) in fields {
        body.extend_from_slice(
            format!(
                "--{}\r\nContent-Disposition: form-data; name=\"{}\"\r\n\r\n{}\r\n",
                BOUNDARY, name, value
            )
            .as_bytes(),
        );
    }
    if let Some((file_name, data)) = file {
        body.extend_from_slice(
            format!(
                "--{}\r\nContent-Disposition: form-data; name=\"image\"; filename=\"{}\"\r\nContent-Type: application/octet-stream\r\n\r\n",
                BOUNDARY, file_name
            )
            .as_bytes(),
        );
        body.extend_from_slice(data);
        body.extend_from_slice(b"\r\n");
    }
    body.extend_from_slice(format!("--{}--\r\n", BOUNDARY).as_bytes());
    body
}

pub async fn body_string(response: Response<Body>) -> String {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    String::from_utf8(bytes.to_vec()).unwrap()
}

pub fn location(response: &Response<Body>) -> &str {
    response.headers()[header::LOCATION].to_str().unwrap()
}

pub fn count_cards(body: &str) -> usize {
    body.matches("class=\"post-card\"").count()
}

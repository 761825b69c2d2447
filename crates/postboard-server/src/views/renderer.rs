use anyhow::Result;
use axum::response::Html;
use chrono::{DateTime, Utc};
use handlebars::{handlebars_helper, Handlebars};
use serde::Serialize;

use crate::auth::{SessionUser, Viewer};
use crate::utils::AppError;

const TEMPLATES: &[(&str, &str)] = &[
    ("base", include_str!("../../templates/base.hbs")),
    ("post_card", include_str!("../../templates/post_card.hbs")),
    ("paginator", include_str!("../../templates/paginator.hbs")),
    ("index", include_str!("../../templates/index.hbs")),
    ("group_list", include_str!("../../templates/group_list.hbs")),
    ("profile", include_str!("../../templates/profile.hbs")),
    ("post_detail", include_str!("../../templates/post_detail.hbs")),
    ("create_post", include_str!("../../templates/create_post.hbs")),
    ("login", include_str!("../../templates/login.hbs")),
    ("signup", include_str!("../../templates/signup.hbs")),
];

// "2024-03-01T10:00:00Z" -> "01 Mar 2024 10:00"
handlebars_helper!(date: |ts: str| {
    DateTime::parse_from_rfc3339(ts)
        .map(|d| d.with_timezone(&Utc).format("%d %b %Y %H:%M").to_string())
        .unwrap_or_else(|_| ts.to_string())
});

/// Context every page gets on top of its own fields.
#[derive(Serialize)]
struct PageContext<'a, T: Serialize> {
    viewer: Option<&'a SessionUser>,
    media_url: &'a str,
    #[serde(flatten)]
    page: &'a T,
}

/// Renders the embedded handlebars templates.
pub struct Renderer {
    registry: Handlebars<'static>,
    media_url: String,
}

impl Renderer {
    pub fn new(media_url: &str) -> Result<Self> {
        let mut registry = Handlebars::new();
        registry.register_helper("date", Box::new(date));

        for (name, source) in TEMPLATES {
            registry.register_template_string(name, *source)?;
        }

        Ok(Self {
            registry,
            media_url: media_url.trim_end_matches('/').to_string(),
        })
    }

    pub fn render<T: Serialize>(
        &self,
        template: &str,
        viewer: &Viewer,
        page: &T,
    ) -> Result<Html<String>, AppError> {
        let context = PageContext {
            viewer: viewer.user(),
            media_url: &self.media_url,
            page,
        };

        let body = self.registry.render(template, &context)?;
        Ok(Html(body))
    }
}

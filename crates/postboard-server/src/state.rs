use anyhow::Result;
use std::sync::Arc;

use crate::auth::JwtManager;
use crate::cache::PageCache;
use crate::config::Settings;
use crate::database::BlogRepository;
use crate::services::{MediaStorage, PostService};
use crate::views::Renderer;

#[derive(Clone)]
pub struct AppState {
    pub settings: Arc<Settings>,
    pub repository: Arc<dyn BlogRepository>,
    pub posts: Arc<PostService>,
    pub renderer: Arc<Renderer>,
    pub jwt: Arc<JwtManager>,
    pub page_cache: PageCache,
}

impl AppState {
    pub fn new(settings: Settings, repository: Arc<dyn BlogRepository>) -> Result<Self> {
        let media = Arc::new(MediaStorage::new(
            settings.media.root.clone(),
            &settings.media.url_prefix,
        ));
        let renderer = Arc::new(Renderer::new(media.url_prefix())?);
        let posts = Arc::new(PostService::new(repository.clone(), media));
        let jwt = Arc::new(JwtManager::new(
            &settings.auth.jwt_secret,
            settings.auth.session_ttl_seconds,
        ));
        let page_cache = PageCache::new(settings.cache.index_ttl());

        Ok(Self {
            settings: Arc::new(settings),
            repository,
            posts,
            renderer,
            jwt,
            page_cache,
        })
    }
}

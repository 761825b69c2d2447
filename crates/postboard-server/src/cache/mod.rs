pub mod page_cache;

pub use page_cache::{cache_page, CacheKey, PageCache};

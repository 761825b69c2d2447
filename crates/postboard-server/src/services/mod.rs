pub mod media_storage;
pub mod post_service;

pub use media_storage::MediaStorage;
pub use post_service::{EditAccess, EditOutcome, FormOutcome, PostService};

// ============================================================================
// Post Service - create, edit and comment flows
// ============================================================================
//! Business rules for writing posts and comments: form cleaning, group
//! resolution, image storage and the author-only edit check.

use std::sync::Arc;
use tracing::{info, warn};

use crate::auth::SessionUser;
use crate::database::{
    BlogRepository, CommentView, Group, NewComment, NewPost, PostChanges, PostView,
};
use crate::forms::post_form::INVALID_CHOICE;
use crate::forms::{CleanedPost, CommentForm, FormErrors, PostFormData, PostFormState};
use crate::services::MediaStorage;
use crate::utils::AppError;

/// Result of a form submission that may be rejected.
#[derive(Debug)]
pub enum FormOutcome<T> {
    Saved(T),
    Invalid(PostFormState),
}

/// Whether a signed-in user may edit a post.
#[derive(Debug)]
pub enum EditAccess {
    Allowed(PostView),
    NotAuthor,
}

#[derive(Debug)]
pub enum EditOutcome {
    NotAuthor,
    Saved(PostView),
    Invalid(PostFormState),
}

pub struct PostService {
    repository: Arc<dyn BlogRepository>,
    media: Arc<MediaStorage>,
}

impl PostService {
    pub fn new(repository: Arc<dyn BlogRepository>, media: Arc<MediaStorage>) -> Self {
        Self { repository, media }
    }

    pub async fn groups(&self) -> Result<Vec<Group>, AppError> {
        self.repository.list_groups().await.map_err(AppError::database)
    }

    pub async fn require_post(&self, post_id: i64) -> Result<PostView, AppError> {
        self.repository
            .find_post(post_id)
            .await
            .map_err(AppError::database)?
            .ok_or_else(|| AppError::NotFound(format!("post {}", post_id)))
    }

    pub async fn create_post(
        &self,
        author: &SessionUser,
        data: PostFormData,
    ) -> Result<FormOutcome<PostView>, AppError> {
        let cleaned = match self.clean(&data).await? {
            Ok(cleaned) => cleaned,
            Err(errors) => {
                return Ok(FormOutcome::Invalid(PostFormState::rejected(&data, None, errors)))
            }
        };

        let image = match &cleaned.image {
            Some(upload) => Some(self.store_image(&upload.file_name, &upload.data).await?),
            None => None,
        };

        let post = self
            .repository
            .create_post(NewPost {
                author_id: author.id,
                text: cleaned.text,
                group_id: cleaned.group_id,
                image,
            })
            .await
            .map_err(AppError::database)?;

        info!("User {} created post {}", author.username, post.id);
        Ok(FormOutcome::Saved(post))
    }

    pub async fn edit_access(
        &self,
        editor: &SessionUser,
        post_id: i64,
    ) -> Result<EditAccess, AppError> {
        let post = self.require_post(post_id).await?;

        if post.author_id != editor.id {
            warn!(
                "User {} denied edit of post {} (author {})",
                editor.username, post_id, post.author_username
            );
            return Ok(EditAccess::NotAuthor);
        }

        Ok(EditAccess::Allowed(post))
    }

    pub async fn edit_post(
        &self,
        editor: &SessionUser,
        post_id: i64,
        data: PostFormData,
    ) -> Result<EditOutcome, AppError> {
        let post = match self.edit_access(editor, post_id).await? {
            EditAccess::Allowed(post) => post,
            EditAccess::NotAuthor => return Ok(EditOutcome::NotAuthor),
        };

        let cleaned = match self.clean(&data).await? {
            Ok(cleaned) => cleaned,
            Err(errors) => {
                return Ok(EditOutcome::Invalid(PostFormState::rejected(
                    &data,
                    post.image.clone(),
                    errors,
                )))
            }
        };

        // A new upload wins over the clear checkbox; no upload keeps the image
        let image = match (&cleaned.image, cleaned.clear_image) {
            (Some(upload), _) => Some(self.store_image(&upload.file_name, &upload.data).await?),
            (None, true) => None,
            (None, false) => post.image.clone(),
        };

        let updated = self
            .repository
            .update_post(
                post_id,
                PostChanges {
                    text: cleaned.text,
                    group_id: cleaned.group_id,
                    image,
                },
            )
            .await
            .map_err(AppError::database)?;

        info!("User {} edited post {}", editor.username, post_id);
        Ok(EditOutcome::Saved(updated))
    }

    /// Invalid comments are dropped; a missing post is a 404.
    pub async fn add_comment(
        &self,
        author: &SessionUser,
        post_id: i64,
        form: CommentForm,
    ) -> Result<Option<CommentView>, AppError> {
        self.require_post(post_id).await?;

        let text = match form.clean() {
            Ok(text) => text,
            Err(_) => return Ok(None),
        };

        let comment = self
            .repository
            .create_comment(NewComment {
                post_id,
                author_id: author.id,
                text,
            })
            .await
            .map_err(AppError::database)?;

        info!("User {} commented on post {}", author.username, post_id);
        Ok(Some(comment))
    }

    /// Field validation plus the group lookup.
    async fn clean(&self, data: &PostFormData) -> Result<Result<CleanedPost, FormErrors>, AppError> {
        let cleaned = match data.clean() {
            Ok(cleaned) => cleaned,
            Err(errors) => return Ok(Err(errors)),
        };

        if let Some(group_id) = cleaned.group_id {
            let group = self
                .repository
                .find_group_by_id(group_id)
                .await
                .map_err(AppError::database)?;

            if group.is_none() {
                let mut errors = FormErrors::default();
                errors.add("group", INVALID_CHOICE);
                return Ok(Err(errors));
            }
        }

        Ok(Ok(cleaned))
    }

    async fn store_image(&self, file_name: &str, data: &[u8]) -> Result<String, AppError> {
        self.media
            .save_post_image(file_name, data)
            .await
            .map_err(|e| AppError::InternalError(format!("Failed to store upload: {}", e)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::repository::MockBlogRepository;
    use crate::forms::Upload;
    use crate::services::media_storage::SMALL_GIF;
    use chrono::Utc;
    use mockall::predicate::eq;

    fn user(id: i64, username: &str) -> SessionUser {
        SessionUser {
            id,
            username: username.to_string(),
        }
    }

    fn post(id: i64, author_id: i64, image: Option<&str>) -> PostView {
        PostView {
            id,
            text: "original".to_string(),
            pub_date: Utc::now(),
            image: image.map(str::to_string),
            author_id,
            author_username: "author".to_string(),
            group_id: None,
            group_slug: None,
            group_title: None,
        }
    }

    fn service(repo: MockBlogRepository, media_root: &std::path::Path) -> PostService {
        PostService::new(Arc::new(repo), Arc::new(MediaStorage::new(media_root, "/media")))
    }

    fn form(text: &str, group: &str) -> PostFormData {
        PostFormData {
            text: text.to_string(),
            group: group.to_string(),
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn test_non_author_edit_never_writes() {
        let mut repo = MockBlogRepository::new();
        repo.expect_find_post()
            .with(eq(7))
            .returning(|_| Ok(Some(post(7, 1, None))));
        repo.expect_update_post().never();

        let dir = tempfile::tempdir().unwrap();
        let outcome = service(repo, dir.path())
            .edit_post(&user(2, "intruder"), 7, form("hijacked", ""))
            .await
            .unwrap();

        assert!(matches!(outcome, EditOutcome::NotAuthor));
    }

    #[tokio::test]
    async fn test_edit_missing_post_is_not_found() {
        let mut repo = MockBlogRepository::new();
        repo.expect_find_post().returning(|_| Ok(None));

        let dir = tempfile::tempdir().unwrap();
        let result = service(repo, dir.path())
            .edit_post(&user(1, "author"), 99, form("text", ""))
            .await;

        assert!(matches!(result, Err(AppError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_edit_without_upload_keeps_image() {
        let mut repo = MockBlogRepository::new();
        repo.expect_find_post()
            .returning(|_| Ok(Some(post(7, 1, Some("posts/old.gif")))));
        repo.expect_update_post()
            .withf(|id, changes| {
                *id == 7 && changes.text == "edited" && changes.image.as_deref() == Some("posts/old.gif")
            })
            .times(1)
            .returning(|_, _| Ok(post(7, 1, Some("posts/old.gif"))));

        let dir = tempfile::tempdir().unwrap();
        let outcome = service(repo, dir.path())
            .edit_post(&user(1, "author"), 7, form("edited", ""))
            .await
            .unwrap();

        assert!(matches!(outcome, EditOutcome::Saved(_)));
    }

    #[tokio::test]
    async fn test_edit_clear_checkbox_drops_image() {
        let mut repo = MockBlogRepository::new();
        repo.expect_find_post()
            .returning(|_| Ok(Some(post(7, 1, Some("posts/old.gif")))));
        repo.expect_update_post()
            .withf(|_, changes| changes.image.is_none())
            .times(1)
            .returning(|_, _| Ok(post(7, 1, None)));

        let mut data = form("edited", "");
        data.clear_image = true;

        let dir = tempfile::tempdir().unwrap();
        let outcome = service(repo, dir.path())
            .edit_post(&user(1, "author"), 7, data)
            .await
            .unwrap();

        assert!(matches!(outcome, EditOutcome::Saved(_)));
    }

    #[tokio::test]
    async fn test_edit_new_upload_replaces_image() {
        let mut repo = MockBlogRepository::new();
        repo.expect_find_post()
            .returning(|_| Ok(Some(post(7, 1, Some("posts/old.gif")))));
        repo.expect_update_post()
            .withf(|_, changes| changes.image.as_deref() == Some("posts/new.gif"))
            .times(1)
            .returning(|_, _| Ok(post(7, 1, Some("posts/new.gif"))));

        // an upload wins over the clear checkbox
        let mut data = form("edited", "");
        data.clear_image = true;
        data.image = Some(Upload {
            file_name: "new.gif".to_string(),
            data: SMALL_GIF.to_vec(),
        });

        let dir = tempfile::tempdir().unwrap();
        let outcome = service(repo, dir.path())
            .edit_post(&user(1, "author"), 7, data)
            .await
            .unwrap();

        assert!(matches!(outcome, EditOutcome::Saved(_)));
        assert!(dir.path().join("posts/new.gif").exists());
    }

    #[tokio::test]
    async fn test_create_with_unknown_group_is_invalid() {
        let mut repo = MockBlogRepository::new();
        repo.expect_find_group_by_id().with(eq(5)).returning(|_| Ok(None));
        repo.expect_create_post().never();

        let dir = tempfile::tempdir().unwrap();
        let outcome = service(repo, dir.path())
            .create_post(&user(1, "author"), form("hello", "5"))
            .await
            .unwrap();

        match outcome {
            FormOutcome::Invalid(state) => {
                assert_eq!(state.text, "hello");
                assert!(state.errors.has("group"));
            }
            FormOutcome::Saved(_) => panic!("unknown group must be rejected"),
        }
    }

    #[tokio::test]
    async fn test_create_stores_image_and_sets_author() {
        let mut repo = MockBlogRepository::new();
        repo.expect_create_post()
            .withf(|p| {
                p.author_id == 1 && p.text == "with image" && p.image.as_deref() == Some("posts/small.gif")
            })
            .times(1)
            .returning(|_| Ok(post(10, 1, Some("posts/small.gif"))));

        let mut data = form("with image", "");
        data.image = Some(Upload {
            file_name: "small.gif".to_string(),
            data: SMALL_GIF.to_vec(),
        });

        let dir = tempfile::tempdir().unwrap();
        let outcome = service(repo, dir.path())
            .create_post(&user(1, "author"), data)
            .await
            .unwrap();

        assert!(matches!(outcome, FormOutcome::Saved(p) if p.id == 10));
        assert!(dir.path().join("posts/small.gif").exists());
    }

    #[tokio::test]
    async fn test_blank_comment_is_dropped() {
        let mut repo = MockBlogRepository::new();
        repo.expect_find_post().returning(|_| Ok(Some(post(3, 1, None))));
        repo.expect_create_comment().never();

        let dir = tempfile::tempdir().unwrap();
        let created = service(repo, dir.path())
            .add_comment(&user(2, "reader"), 3, CommentForm { text: "  ".to_string() })
            .await
            .unwrap();

        assert!(created.is_none());
    }

    #[tokio::test]
    async fn test_comment_on_missing_post_is_not_found() {
        let mut repo = MockBlogRepository::new();
        repo.expect_find_post().returning(|_| Ok(None));
        repo.expect_create_comment().never();

        let dir = tempfile::tempdir().unwrap();
        let result = service(repo, dir.path())
            .add_comment(&user(2, "reader"), 3, CommentForm { text: "hi".to_string() })
            .await;

        assert!(matches!(result, Err(AppError::NotFound(_))));
    }
}

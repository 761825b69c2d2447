//! Repository trait (port) over users, groups, posts and comments

use anyhow::Result;
use async_trait::async_trait;

#[cfg(test)]
use mockall::automock;

use super::models::{CommentView, Group, NewComment, NewGroup, NewPost, PostChanges, PostView, User};

/// A write collided with an existing unique value. Returned inside the
/// `anyhow::Error` so callers can `downcast_ref` it.
#[derive(Debug, thiserror::Error)]
#[error("{field} '{value}' is already taken")]
pub struct AlreadyExists {
    pub field: &'static str,
    pub value: String,
}

/// Which posts a listing covers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PostFilter {
    All,
    Group(i64),
    Author(i64),
}

/// Posts are always returned newest first (`pub_date DESC, id DESC`),
/// comments oldest first.
#[cfg_attr(test, automock)]
#[async_trait]
pub trait BlogRepository: Send + Sync {
    async fn ping(&self) -> Result<()>;

    // Users
    async fn find_user_by_username(&self, username: &str) -> Result<Option<User>>;
    async fn create_user(&self, username: &str, password_hash: &str) -> Result<User>;

    // Groups
    async fn list_groups(&self) -> Result<Vec<Group>>;
    async fn find_group_by_id(&self, id: i64) -> Result<Option<Group>>;
    async fn find_group_by_slug(&self, slug: &str) -> Result<Option<Group>>;
    async fn create_group(&self, group: NewGroup) -> Result<Group>;

    // Posts
    async fn count_posts(&self, filter: PostFilter) -> Result<i64>;
    async fn list_posts(&self, filter: PostFilter, limit: i64, offset: i64) -> Result<Vec<PostView>>;
    async fn find_post(&self, id: i64) -> Result<Option<PostView>>;
    async fn create_post(&self, post: NewPost) -> Result<PostView>;
    async fn update_post(&self, id: i64, changes: PostChanges) -> Result<PostView>;
    async fn delete_post(&self, id: i64) -> Result<bool>;

    // Comments
    async fn list_comments(&self, post_id: i64) -> Result<Vec<CommentView>>;
    async fn create_comment(&self, comment: NewComment) -> Result<CommentView>;
}

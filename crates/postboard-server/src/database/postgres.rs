use anyhow::{anyhow, Result};
use async_trait::async_trait;
use sqlx::{Postgres, QueryBuilder};
use tracing::debug;

use super::models::{CommentView, Group, NewComment, NewGroup, NewPost, PostChanges, PostView, User};
use super::repository::{AlreadyExists, BlogRepository, PostFilter};
use super::DbPool;

const POST_VIEW_SELECT: &str = r#"SELECT
        p.id,
        p.text,
        p.pub_date,
        p.image,
        p.author_id,
        u.username AS author_username,
        p.group_id,
        g.slug AS group_slug,
        g.title AS group_title
    FROM posts p
    JOIN users u ON u.id = p.author_id
    LEFT JOIN groups g ON g.id = p.group_id"#;

pub struct PgRepository {
    pub pool: DbPool,
}

impl PgRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    fn push_filter(builder: &mut QueryBuilder<'_, Postgres>, filter: PostFilter) {
        match filter {
            PostFilter::All => {}
            PostFilter::Group(group_id) => {
                builder.push(" WHERE p.group_id = ").push_bind(group_id);
            }
            PostFilter::Author(author_id) => {
                builder.push(" WHERE p.author_id = ").push_bind(author_id);
            }
        }
    }

    async fn require_post(&self, id: i64) -> Result<PostView> {
        self.find_post(id)
            .await?
            .ok_or_else(|| anyhow!("post {} vanished after write", id))
    }
}

/// Turns a unique-constraint failure into `AlreadyExists`, keeping any other
/// error as it is.
fn unique_violation(err: sqlx::Error, field: &'static str, value: &str) -> anyhow::Error {
    let is_unique = err
        .as_database_error()
        .is_some_and(|db| db.is_unique_violation());
    if is_unique {
        AlreadyExists {
            field,
            value: value.to_string(),
        }
        .into()
    } else {
        err.into()
    }
}

#[async_trait]
impl BlogRepository for PgRepository {
    async fn ping(&self) -> Result<()> {
        sqlx::query("SELECT 1").execute(self.pool.get_pool()).await?;
        Ok(())
    }

    async fn find_user_by_username(&self, username: &str) -> Result<Option<User>> {
        let user = sqlx::query_as::<_, User>(
            "SELECT id, username, password_hash, created_at FROM users WHERE username = $1",
        )
        .bind(username)
        .fetch_optional(self.pool.get_pool())
        .await?;

        Ok(user)
    }

    async fn create_user(&self, username: &str, password_hash: &str) -> Result<User> {
        let user = sqlx::query_as::<_, User>(
            r#"INSERT INTO users (username, password_hash)
               VALUES ($1, $2)
               RETURNING id, username, password_hash, created_at"#,
        )
        .bind(username)
        .bind(password_hash)
        .fetch_one(self.pool.get_pool())
        .await
        .map_err(|e| unique_violation(e, "username", username))?;

        debug!("Created user {} ({})", user.username, user.id);
        Ok(user)
    }

    async fn list_groups(&self) -> Result<Vec<Group>> {
        let groups = sqlx::query_as::<_, Group>(
            "SELECT id, title, slug, description FROM groups ORDER BY title, id",
        )
        .fetch_all(self.pool.get_pool())
        .await?;

        Ok(groups)
    }

    async fn find_group_by_id(&self, id: i64) -> Result<Option<Group>> {
        let group = sqlx::query_as::<_, Group>(
            "SELECT id, title, slug, description FROM groups WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(self.pool.get_pool())
        .await?;

        Ok(group)
    }

    async fn find_group_by_slug(&self, slug: &str) -> Result<Option<Group>> {
        let group = sqlx::query_as::<_, Group>(
            "SELECT id, title, slug, description FROM groups WHERE slug = $1",
        )
        .bind(slug)
        .fetch_optional(self.pool.get_pool())
        .await?;

        Ok(group)
    }

    async fn create_group(&self, group: NewGroup) -> Result<Group> {
        let group = sqlx::query_as::<_, Group>(
            r#"INSERT INTO groups (title, slug, description)
               VALUES ($1, $2, $3)
               RETURNING id, title, slug, description"#,
        )
        .bind(&group.title)
        .bind(&group.slug)
        .bind(&group.description)
        .fetch_one(self.pool.get_pool())
        .await
        .map_err(|e| unique_violation(e, "slug", &group.slug))?;

        Ok(group)
    }

    async fn count_posts(&self, filter: PostFilter) -> Result<i64> {
        let mut builder = QueryBuilder::<Postgres>::new("SELECT COUNT(*) FROM posts p");
        Self::push_filter(&mut builder, filter);

        let count: i64 = builder
            .build_query_scalar::<i64>()
            .fetch_one(self.pool.get_pool())
            .await?;

        Ok(count)
    }

    async fn list_posts(&self, filter: PostFilter, limit: i64, offset: i64) -> Result<Vec<PostView>> {
        let mut builder = QueryBuilder::<Postgres>::new(POST_VIEW_SELECT);
        Self::push_filter(&mut builder, filter);
        builder
            .push(" ORDER BY p.pub_date DESC, p.id DESC LIMIT ")
            .push_bind(limit)
            .push(" OFFSET ")
            .push_bind(offset);

        let posts = builder
            .build_query_as::<PostView>()
            .fetch_all(self.pool.get_pool())
            .await?;

        debug!("Listed {} posts for {:?} (offset {})", posts.len(), filter, offset);
        Ok(posts)
    }

    async fn find_post(&self, id: i64) -> Result<Option<PostView>> {
        let mut builder = QueryBuilder::<Postgres>::new(POST_VIEW_SELECT);
        builder.push(" WHERE p.id = ").push_bind(id);

        let post = builder
            .build_query_as::<PostView>()
            .fetch_optional(self.pool.get_pool())
            .await?;

        Ok(post)
    }

    async fn create_post(&self, post: NewPost) -> Result<PostView> {
        let id: i64 = sqlx::query_scalar(
            r#"INSERT INTO posts (text, author_id, group_id, image)
               VALUES ($1, $2, $3, $4)
               RETURNING id"#,
        )
        .bind(&post.text)
        .bind(post.author_id)
        .bind(post.group_id)
        .bind(&post.image)
        .fetch_one(self.pool.get_pool())
        .await?;

        self.require_post(id).await
    }

    async fn update_post(&self, id: i64, changes: PostChanges) -> Result<PostView> {
        let result = sqlx::query(
            "UPDATE posts SET text = $1, group_id = $2, image = $3 WHERE id = $4",
        )
        .bind(&changes.text)
        .bind(changes.group_id)
        .bind(&changes.image)
        .bind(id)
        .execute(self.pool.get_pool())
        .await?;

        if result.rows_affected() == 0 {
            return Err(anyhow!("post {} not found", id));
        }

        self.require_post(id).await
    }

    async fn delete_post(&self, id: i64) -> Result<bool> {
        let result = sqlx::query("DELETE FROM posts WHERE id = $1")
            .bind(id)
            .execute(self.pool.get_pool())
            .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn list_comments(&self, post_id: i64) -> Result<Vec<CommentView>> {
        let comments = sqlx::query_as::<_, CommentView>(
            r#"SELECT
                c.id,
                c.post_id,
                c.author_id,
                u.username AS author_username,
                c.text,
                c.created
               FROM comments c
               JOIN users u ON u.id = c.author_id
               WHERE c.post_id = $1
               ORDER BY c.created, c.id"#,
        )
        .bind(post_id)
        .fetch_all(self.pool.get_pool())
        .await?;

        Ok(comments)
    }

    async fn create_comment(&self, comment: NewComment) -> Result<CommentView> {
        let created = sqlx::query_as::<_, CommentView>(
            r#"WITH inserted AS (
                   INSERT INTO comments (post_id, author_id, text)
                   VALUES ($1, $2, $3)
                   RETURNING id, post_id, author_id, text, created
               )
               SELECT
                   i.id,
                   i.post_id,
                   i.author_id,
                   u.username AS author_username,
                   i.text,
                   i.created
               FROM inserted i
               JOIN users u ON u.id = i.author_id"#,
        )
        .bind(comment.post_id)
        .bind(comment.author_id)
        .bind(&comment.text)
        .fetch_one(self.pool.get_pool())
        .await?;

        Ok(created)
    }
}

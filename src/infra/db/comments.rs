use std::collections::HashMap;

use async_trait::async_trait;
use time::OffsetDateTime;
use uuid::Uuid;

use crate::application::pagination::{Page, PageRequest};
use crate::application::repos::{
    CommentThread, CommentView, CommentsRepo, CreateCommentParams, RepoError,
};
use crate::domain::entities::{CommentRecord, UserSummary};

use super::{PostgresRepositories, map_sqlx_error};

const COMMENT_VIEW_SELECT: &str = "SELECT c.id, c.post_id, c.parent_id, c.content, \
     c.created_at, c.updated_at, \
     u.id AS author_id, u.username AS author_username, u.name AS author_name, \
     u.avatar_url AS author_avatar_url, \
     (SELECT COUNT(*) FROM comment_likes cl WHERE cl.comment_id = c.id) AS like_count, \
     (SELECT COUNT(*) FROM comments r WHERE r.parent_id = c.id) AS reply_count \
     FROM comments c INNER JOIN users u ON u.id = c.author_id";

#[derive(sqlx::FromRow)]
struct CommentRow {
    id: Uuid,
    post_id: Uuid,
    author_id: Uuid,
    parent_id: Option<Uuid>,
    content: String,
    created_at: OffsetDateTime,
    updated_at: OffsetDateTime,
}

impl From<CommentRow> for CommentRecord {
    fn from(row: CommentRow) -> Self {
        Self {
            id: row.id,
            post_id: row.post_id,
            author_id: row.author_id,
            parent_id: row.parent_id,
            content: row.content,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

#[derive(sqlx::FromRow)]
struct CommentViewRow {
    id: Uuid,
    post_id: Uuid,
    parent_id: Option<Uuid>,
    content: String,
    created_at: OffsetDateTime,
    updated_at: OffsetDateTime,
    author_id: Uuid,
    author_username: String,
    author_name: String,
    author_avatar_url: Option<String>,
    like_count: i64,
    reply_count: i64,
}

impl From<CommentViewRow> for CommentView {
    fn from(row: CommentViewRow) -> Self {
        Self {
            id: row.id,
            post_id: row.post_id,
            parent_id: row.parent_id,
            author: UserSummary {
                id: row.author_id,
                username: row.author_username,
                name: row.author_name,
                avatar_url: row.author_avatar_url,
            },
            content: row.content,
            like_count: row.like_count,
            reply_count: row.reply_count,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

impl PostgresRepositories {
    async fn comment_view(&self, id: Uuid) -> Result<CommentView, RepoError> {
        let row = sqlx::query_as::<_, CommentViewRow>(&format!(
            "{COMMENT_VIEW_SELECT} WHERE c.id = $1"
        ))
        .bind(id)
        .fetch_one(self.pool())
        .await
        .map_err(map_sqlx_error)?;

        Ok(CommentView::from(row))
    }
}

#[async_trait]
impl CommentsRepo for PostgresRepositories {
    async fn find_by_id(&self, id: Uuid) -> Result<Option<CommentRecord>, RepoError> {
        let row = sqlx::query_as::<_, CommentRow>(
            "SELECT id, post_id, author_id, parent_id, content, created_at, updated_at \
             FROM comments WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(self.pool())
        .await
        .map_err(map_sqlx_error)?;

        Ok(row.map(CommentRecord::from))
    }

    async fn create_comment(&self, params: CreateCommentParams) -> Result<CommentView, RepoError> {
        let CreateCommentParams {
            post_id,
            author_id,
            parent_id,
            content,
        } = params;

        let id: Uuid = sqlx::query_scalar(
            "INSERT INTO comments (id, post_id, author_id, parent_id, content) \
             VALUES ($1, $2, $3, $4, $5) RETURNING id",
        )
        .bind(Uuid::new_v4())
        .bind(post_id)
        .bind(author_id)
        .bind(parent_id)
        .bind(content)
        .fetch_one(self.pool())
        .await
        .map_err(map_sqlx_error)?;

        self.comment_view(id).await
    }

    async fn update_comment(&self, id: Uuid, content: String) -> Result<CommentView, RepoError> {
        let updated: Option<Uuid> = sqlx::query_scalar(
            "UPDATE comments SET content = $2, updated_at = now() WHERE id = $1 RETURNING id",
        )
        .bind(id)
        .bind(content)
        .fetch_optional(self.pool())
        .await
        .map_err(map_sqlx_error)?;

        match updated {
            Some(id) => self.comment_view(id).await,
            None => Err(RepoError::NotFound),
        }
    }

    async fn delete_comment(&self, id: Uuid) -> Result<(), RepoError> {
        sqlx::query("DELETE FROM comments WHERE id = $1")
            .bind(id)
            .execute(self.pool())
            .await
            .map_err(map_sqlx_error)?;
        Ok(())
    }

    async fn list_threads(
        &self,
        post_id: Uuid,
        page: PageRequest,
        reply_preview: u32,
    ) -> Result<Page<CommentThread>, RepoError> {
        let top_level = sqlx::query_as::<_, CommentViewRow>(&format!(
            "{COMMENT_VIEW_SELECT} \
             WHERE c.post_id = $1 AND c.parent_id IS NULL \
             ORDER BY c.created_at DESC \
             LIMIT $2 OFFSET $3"
        ))
        .bind(post_id)
        .bind(page.limit())
        .bind(page.offset())
        .fetch_all(self.pool())
        .await
        .map_err(map_sqlx_error)?;

        let total: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM comments WHERE post_id = $1 AND parent_id IS NULL",
        )
        .bind(post_id)
        .fetch_one(self.pool())
        .await
        .map_err(map_sqlx_error)?;

        let parent_ids: Vec<Uuid> = top_level.iter().map(|row| row.id).collect();
        let mut replies_by_parent: HashMap<Uuid, Vec<CommentView>> = HashMap::new();

        if !parent_ids.is_empty() {
            let reply_rows = sqlx::query_as::<_, CommentViewRow>(&format!(
                "{COMMENT_VIEW_SELECT} \
                 WHERE c.parent_id = ANY($1) \
                 ORDER BY c.parent_id, c.created_at ASC"
            ))
            .bind(&parent_ids)
            .fetch_all(self.pool())
            .await
            .map_err(map_sqlx_error)?;

            for row in reply_rows {
                let parent = row
                    .parent_id
                    .expect("reply rows were selected by parent_id");
                let bucket = replies_by_parent.entry(parent).or_default();
                if bucket.len() < reply_preview as usize {
                    bucket.push(CommentView::from(row));
                }
            }
        }

        let items = top_level
            .into_iter()
            .map(|row| {
                let replies = replies_by_parent.remove(&row.id).unwrap_or_default();
                CommentThread {
                    comment: CommentView::from(row),
                    replies,
                }
            })
            .collect();

        Ok(Page::assemble(items, Self::convert_count(total)?, page))
    }

    async fn list_replies(
        &self,
        parent_id: Uuid,
        page: PageRequest,
    ) -> Result<Page<CommentView>, RepoError> {
        let rows = sqlx::query_as::<_, CommentViewRow>(&format!(
            "{COMMENT_VIEW_SELECT} \
             WHERE c.parent_id = $1 \
             ORDER BY c.created_at ASC \
             LIMIT $2 OFFSET $3"
        ))
        .bind(parent_id)
        .bind(page.limit())
        .bind(page.offset())
        .fetch_all(self.pool())
        .await
        .map_err(map_sqlx_error)?;

        let total: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM comments WHERE parent_id = $1")
            .bind(parent_id)
            .fetch_one(self.pool())
            .await
            .map_err(map_sqlx_error)?;

        Ok(Page::assemble(
            rows.into_iter().map(CommentView::from).collect(),
            Self::convert_count(total)?,
            page,
        ))
    }
}

use std::collections::HashMap;

use async_trait::async_trait;
use sqlx::QueryBuilder;
use time::OffsetDateTime;
use uuid::Uuid;

use crate::application::pagination::{Page, PageRequest};
use crate::application::repos::{
    CreatePostParams, FeedRepo, PostDetail, PostListScope, PostOverview, PostQueryFilter,
    PostsRepo, PostsWriteRepo, RepoError, UpdatePostParams,
};
use crate::domain::entities::{PostRecord, TagRecord, UserSummary};
use crate::domain::types::{PostStatus, Rating};

use super::{POST_OVERVIEW_SELECT, PostgresRepositories, map_sqlx_error};

#[derive(sqlx::FromRow)]
pub(crate) struct PostRow {
    id: Uuid,
    author_id: Uuid,
    title: String,
    content: String,
    rating: Rating,
    status: PostStatus,
    published_at: Option<OffsetDateTime>,
    view_count: i64,
    created_at: OffsetDateTime,
    updated_at: OffsetDateTime,
}

impl From<PostRow> for PostRecord {
    fn from(row: PostRow) -> Self {
        Self {
            id: row.id,
            author_id: row.author_id,
            title: row.title,
            content: row.content,
            rating: row.rating,
            status: row.status,
            published_at: row.published_at,
            view_count: row.view_count,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

/// Joined row produced by [`POST_OVERVIEW_SELECT`].
#[derive(sqlx::FromRow)]
pub(crate) struct PostOverviewRow {
    id: Uuid,
    author_id: Uuid,
    title: String,
    content: String,
    rating: Rating,
    status: PostStatus,
    published_at: Option<OffsetDateTime>,
    view_count: i64,
    created_at: OffsetDateTime,
    updated_at: OffsetDateTime,
    author_username: String,
    author_name: String,
    author_avatar_url: Option<String>,
    like_count: i64,
    collection_count: i64,
    comment_count: i64,
}

impl PostOverviewRow {
    fn into_overview(self, tags: Vec<TagRecord>) -> PostOverview {
        PostOverview {
            id: self.id,
            author: UserSummary {
                id: self.author_id,
                username: self.author_username,
                name: self.author_name,
                avatar_url: self.author_avatar_url,
            },
            title: self.title,
            content: self.content,
            rating: self.rating,
            status: self.status,
            published_at: self.published_at,
            view_count: self.view_count,
            like_count: self.like_count,
            collection_count: self.collection_count,
            comment_count: self.comment_count,
            tags,
            created_at: self.created_at,
            updated_at: self.updated_at,
        }
    }
}

#[derive(sqlx::FromRow)]
struct PostTagRow {
    post_id: Uuid,
    id: Uuid,
    name: String,
    created_at: OffsetDateTime,
}

const POST_RETURNING: &str = "RETURNING id, author_id, title, content, rating, status, \
     published_at, view_count, created_at, updated_at";

impl PostgresRepositories {
    /// Resolve tag lists for a batch of overview rows with one query.
    pub(crate) async fn collect_overviews(
        &self,
        rows: Vec<PostOverviewRow>,
    ) -> Result<Vec<PostOverview>, RepoError> {
        let ids: Vec<Uuid> = rows.iter().map(|row| row.id).collect();
        let mut tags_by_post: HashMap<Uuid, Vec<TagRecord>> = HashMap::new();

        if !ids.is_empty() {
            let tag_rows = sqlx::query_as::<_, PostTagRow>(
                "SELECT pt.post_id, t.id, t.name, t.created_at \
                 FROM post_tags pt INNER JOIN tags t ON t.id = pt.tag_id \
                 WHERE pt.post_id = ANY($1) \
                 ORDER BY LOWER(t.name)",
            )
            .bind(&ids)
            .fetch_all(self.pool())
            .await
            .map_err(map_sqlx_error)?;

            for row in tag_rows {
                tags_by_post.entry(row.post_id).or_default().push(TagRecord {
                    id: row.id,
                    name: row.name,
                    created_at: row.created_at,
                });
            }
        }

        Ok(rows
            .into_iter()
            .map(|row| {
                let tags = tags_by_post.remove(&row.id).unwrap_or_default();
                row.into_overview(tags)
            })
            .collect())
    }
}

#[async_trait]
impl PostsRepo for PostgresRepositories {
    async fn find_by_id(&self, id: Uuid) -> Result<Option<PostRecord>, RepoError> {
        let row = sqlx::query_as::<_, PostRow>(
            "SELECT id, author_id, title, content, rating, status, published_at, \
             view_count, created_at, updated_at \
             FROM posts WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(self.pool())
        .await
        .map_err(map_sqlx_error)?;

        Ok(row.map(PostRecord::from))
    }

    async fn load_detail(
        &self,
        id: Uuid,
        viewer: Option<Uuid>,
    ) -> Result<Option<PostDetail>, RepoError> {
        let mut qb = QueryBuilder::new(POST_OVERVIEW_SELECT);
        qb.push(" WHERE p.id = ");
        qb.push_bind(id);

        let row = qb
            .build_query_as::<PostOverviewRow>()
            .fetch_optional(self.pool())
            .await
            .map_err(map_sqlx_error)?;

        let Some(row) = row else {
            return Ok(None);
        };

        let mut overviews = self.collect_overviews(vec![row]).await?;
        let post = overviews
            .pop()
            .expect("one overview row was fetched for the post");

        let (viewer_liked, viewer_collected) = match viewer {
            Some(viewer_id) => {
                let flags = sqlx::query_as::<_, (bool, bool)>(
                    "SELECT \
                     EXISTS(SELECT 1 FROM post_likes WHERE user_id = $1 AND post_id = $2), \
                     EXISTS(SELECT 1 FROM post_collections WHERE user_id = $1 AND post_id = $2)",
                )
                .bind(viewer_id)
                .bind(id)
                .fetch_one(self.pool())
                .await
                .map_err(map_sqlx_error)?;
                (Some(flags.0), Some(flags.1))
            }
            None => (None, None),
        };

        Ok(Some(PostDetail {
            post,
            viewer_liked,
            viewer_collected,
        }))
    }

    async fn list_posts(
        &self,
        scope: PostListScope,
        filter: &PostQueryFilter,
        page: PageRequest,
    ) -> Result<Page<PostOverview>, RepoError> {
        let mut qb = QueryBuilder::new(POST_OVERVIEW_SELECT);
        qb.push(" WHERE 1=1");
        Self::apply_post_scope(&mut qb, scope);
        Self::apply_post_filter(&mut qb, filter);
        qb.push(" ORDER BY p.created_at DESC, p.id DESC LIMIT ");
        qb.push_bind(page.limit());
        qb.push(" OFFSET ");
        qb.push_bind(page.offset());

        let rows = qb
            .build_query_as::<PostOverviewRow>()
            .fetch_all(self.pool())
            .await
            .map_err(map_sqlx_error)?;

        let mut count_qb = QueryBuilder::new("SELECT COUNT(*) FROM posts p WHERE 1=1");
        Self::apply_post_scope(&mut count_qb, scope);
        Self::apply_post_filter(&mut count_qb, filter);
        let total: i64 = count_qb
            .build_query_scalar()
            .fetch_one(self.pool())
            .await
            .map_err(map_sqlx_error)?;

        let items = self.collect_overviews(rows).await?;
        Ok(Page::assemble(items, Self::convert_count(total)?, page))
    }
}

#[async_trait]
impl PostsWriteRepo for PostgresRepositories {
    async fn create_post(&self, params: CreatePostParams) -> Result<PostRecord, RepoError> {
        let CreatePostParams {
            author_id,
            title,
            content,
            rating,
            status,
            published_at,
        } = params;

        let id = Uuid::new_v4();
        let now = OffsetDateTime::now_utc();
        let row = sqlx::query_as::<_, PostRow>(&format!(
            "INSERT INTO posts (id, author_id, title, content, rating, status, \
             published_at, created_at, updated_at) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $8) {POST_RETURNING}"
        ))
        .bind(id)
        .bind(author_id)
        .bind(title)
        .bind(content)
        .bind(rating)
        .bind(status)
        .bind(published_at)
        .bind(now)
        .fetch_one(self.pool())
        .await
        .map_err(map_sqlx_error)?;

        Ok(PostRecord::from(row))
    }

    async fn update_post(&self, params: UpdatePostParams) -> Result<PostRecord, RepoError> {
        let UpdatePostParams {
            id,
            title,
            content,
            rating,
            status,
            published_at,
        } = params;

        let row = sqlx::query_as::<_, PostRow>(&format!(
            "UPDATE posts \
             SET title = $2, content = $3, rating = $4, status = $5, \
                 published_at = $6, updated_at = now() \
             WHERE id = $1 {POST_RETURNING}"
        ))
        .bind(id)
        .bind(title)
        .bind(content)
        .bind(rating)
        .bind(status)
        .bind(published_at)
        .fetch_one(self.pool())
        .await
        .map_err(map_sqlx_error)?;

        Ok(PostRecord::from(row))
    }

    async fn delete_post(&self, id: Uuid) -> Result<(), RepoError> {
        sqlx::query("DELETE FROM posts WHERE id = $1")
            .bind(id)
            .execute(self.pool())
            .await
            .map_err(map_sqlx_error)?;
        Ok(())
    }

    async fn replace_post_tags(
        &self,
        post_id: Uuid,
        tag_names: &[String],
    ) -> Result<Vec<TagRecord>, RepoError> {
        let mut tx = self.begin().await.map_err(map_sqlx_error)?;

        let mut tags = Vec::with_capacity(tag_names.len());
        for name in tag_names {
            let existing = sqlx::query_as::<_, (Uuid, String, OffsetDateTime)>(
                "SELECT id, name, created_at FROM tags WHERE LOWER(name) = LOWER($1)",
            )
            .bind(name)
            .fetch_optional(&mut *tx)
            .await
            .map_err(map_sqlx_error)?;

            let (id, name, created_at) = match existing {
                Some(row) => row,
                None => sqlx::query_as::<_, (Uuid, String, OffsetDateTime)>(
                    "INSERT INTO tags (id, name) VALUES ($1, $2) \
                     RETURNING id, name, created_at",
                )
                .bind(Uuid::new_v4())
                .bind(name)
                .fetch_one(&mut *tx)
                .await
                .map_err(map_sqlx_error)?,
            };
            tags.push(TagRecord {
                id,
                name,
                created_at,
            });
        }

        sqlx::query("DELETE FROM post_tags WHERE post_id = $1")
            .bind(post_id)
            .execute(&mut *tx)
            .await
            .map_err(map_sqlx_error)?;

        if !tags.is_empty() {
            let tag_ids: Vec<Uuid> = tags.iter().map(|tag| tag.id).collect();
            sqlx::query(
                "INSERT INTO post_tags (post_id, tag_id) \
                 SELECT $1, id FROM UNNEST($2::uuid[]) AS id \
                 ON CONFLICT DO NOTHING",
            )
            .bind(post_id)
            .bind(&tag_ids)
            .execute(&mut *tx)
            .await
            .map_err(map_sqlx_error)?;
        }

        tx.commit().await.map_err(map_sqlx_error)?;

        tags.sort_by(|a, b| a.name.to_lowercase().cmp(&b.name.to_lowercase()));
        Ok(tags)
    }
}

#[async_trait]
impl FeedRepo for PostgresRepositories {
    async fn list_followed_posts(
        &self,
        user_id: Uuid,
        since: OffsetDateTime,
        page: PageRequest,
    ) -> Result<Page<PostOverview>, RepoError> {
        let mut qb = QueryBuilder::new(POST_OVERVIEW_SELECT);
        qb.push(" INNER JOIN follows f ON f.following_id = p.author_id WHERE f.follower_id = ");
        qb.push_bind(user_id);
        qb.push(" AND p.status = ");
        qb.push_bind(PostStatus::Published);
        qb.push(" AND p.published_at >= ");
        qb.push_bind(since);
        qb.push(" ORDER BY p.published_at DESC, p.id DESC LIMIT ");
        qb.push_bind(page.limit());
        qb.push(" OFFSET ");
        qb.push_bind(page.offset());

        let rows = qb
            .build_query_as::<PostOverviewRow>()
            .fetch_all(self.pool())
            .await
            .map_err(map_sqlx_error)?;

        let total: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM posts p \
             INNER JOIN follows f ON f.following_id = p.author_id \
             WHERE f.follower_id = $1 AND p.status = $2 AND p.published_at >= $3",
        )
        .bind(user_id)
        .bind(PostStatus::Published)
        .bind(since)
        .fetch_one(self.pool())
        .await
        .map_err(map_sqlx_error)?;

        let items = self.collect_overviews(rows).await?;
        Ok(Page::assemble(items, Self::convert_count(total)?, page))
    }
}

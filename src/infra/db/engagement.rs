use async_trait::async_trait;
use sqlx::QueryBuilder;
use time::OffsetDateTime;
use uuid::Uuid;

use crate::application::pagination::{Page, PageRequest};
use crate::application::repos::{EngagementRepo, PostOverview, RepoError, ViewOutcome};
use crate::domain::types::PostStatus;

use super::posts::PostOverviewRow;
use super::{POST_OVERVIEW_SELECT, PostgresRepositories, map_sqlx_error};

impl PostgresRepositories {
    async fn set_edge(
        &self,
        insert_sql: &str,
        delete_sql: &str,
        left: Uuid,
        right: Uuid,
        present: bool,
    ) -> Result<bool, RepoError> {
        let sql = if present { insert_sql } else { delete_sql };
        let result = sqlx::query(sql)
            .bind(left)
            .bind(right)
            .execute(self.pool())
            .await
            .map_err(map_sqlx_error)?;
        Ok(result.rows_affected() > 0)
    }

    async fn count_edges(&self, sql: &str, id: Uuid) -> Result<i64, RepoError> {
        sqlx::query_scalar(sql)
            .bind(id)
            .fetch_one(self.pool())
            .await
            .map_err(map_sqlx_error)
    }

    async fn saved_posts_page(
        &self,
        edge_table: &str,
        user_id: Uuid,
        page: PageRequest,
    ) -> Result<Page<PostOverview>, RepoError> {
        let mut qb = QueryBuilder::new(POST_OVERVIEW_SELECT);
        qb.push(format!(
            " INNER JOIN {edge_table} e ON e.post_id = p.id WHERE e.user_id = "
        ));
        qb.push_bind(user_id);
        qb.push(" AND p.status = ");
        qb.push_bind(PostStatus::Published);
        qb.push(" ORDER BY e.created_at DESC LIMIT ");
        qb.push_bind(page.limit());
        qb.push(" OFFSET ");
        qb.push_bind(page.offset());

        let rows = qb
            .build_query_as::<PostOverviewRow>()
            .fetch_all(self.pool())
            .await
            .map_err(map_sqlx_error)?;

        let total: i64 = sqlx::query_scalar(&format!(
            "SELECT COUNT(*) FROM {edge_table} e \
             INNER JOIN posts p ON p.id = e.post_id \
             WHERE e.user_id = $1 AND p.status = $2"
        ))
        .bind(user_id)
        .bind(PostStatus::Published)
        .fetch_one(self.pool())
        .await
        .map_err(map_sqlx_error)?;

        let items = self.collect_overviews(rows).await?;
        Ok(Page::assemble(items, Self::convert_count(total)?, page))
    }
}

#[async_trait]
impl EngagementRepo for PostgresRepositories {
    async fn set_post_like(
        &self,
        user_id: Uuid,
        post_id: Uuid,
        liked: bool,
    ) -> Result<bool, RepoError> {
        self.set_edge(
            "INSERT INTO post_likes (user_id, post_id) VALUES ($1, $2) ON CONFLICT DO NOTHING",
            "DELETE FROM post_likes WHERE user_id = $1 AND post_id = $2",
            user_id,
            post_id,
            liked,
        )
        .await
    }

    async fn count_post_likes(&self, post_id: Uuid) -> Result<i64, RepoError> {
        self.count_edges("SELECT COUNT(*) FROM post_likes WHERE post_id = $1", post_id)
            .await
    }

    async fn set_post_collection(
        &self,
        user_id: Uuid,
        post_id: Uuid,
        collected: bool,
    ) -> Result<bool, RepoError> {
        self.set_edge(
            "INSERT INTO post_collections (user_id, post_id) VALUES ($1, $2) \
             ON CONFLICT DO NOTHING",
            "DELETE FROM post_collections WHERE user_id = $1 AND post_id = $2",
            user_id,
            post_id,
            collected,
        )
        .await
    }

    async fn count_post_collections(&self, post_id: Uuid) -> Result<i64, RepoError> {
        self.count_edges(
            "SELECT COUNT(*) FROM post_collections WHERE post_id = $1",
            post_id,
        )
        .await
    }

    async fn set_comment_like(
        &self,
        user_id: Uuid,
        comment_id: Uuid,
        liked: bool,
    ) -> Result<bool, RepoError> {
        self.set_edge(
            "INSERT INTO comment_likes (user_id, comment_id) VALUES ($1, $2) \
             ON CONFLICT DO NOTHING",
            "DELETE FROM comment_likes WHERE user_id = $1 AND comment_id = $2",
            user_id,
            comment_id,
            liked,
        )
        .await
    }

    async fn count_comment_likes(&self, comment_id: Uuid) -> Result<i64, RepoError> {
        self.count_edges(
            "SELECT COUNT(*) FROM comment_likes WHERE comment_id = $1",
            comment_id,
        )
        .await
    }

    async fn record_view(
        &self,
        post_id: Uuid,
        viewer: &str,
        dedup_cutoff: OffsetDateTime,
    ) -> Result<ViewOutcome, RepoError> {
        let mut tx = self.begin().await.map_err(map_sqlx_error)?;

        // Lock the fingerprint row so concurrent views of the same post by
        // the same viewer serialize on the window test.
        let last_view: Option<OffsetDateTime> = sqlx::query_scalar(
            "SELECT viewed_at FROM post_views WHERE post_id = $1 AND viewer = $2 FOR UPDATE",
        )
        .bind(post_id)
        .bind(viewer)
        .fetch_optional(&mut *tx)
        .await
        .map_err(map_sqlx_error)?;

        let inside_window = last_view.is_some_and(|viewed_at| viewed_at > dedup_cutoff);
        let outcome = if inside_window {
            let view_count: i64 = sqlx::query_scalar("SELECT view_count FROM posts WHERE id = $1")
                .bind(post_id)
                .fetch_one(&mut *tx)
                .await
                .map_err(map_sqlx_error)?;
            ViewOutcome::Deduplicated { view_count }
        } else {
            sqlx::query(
                "INSERT INTO post_views (post_id, viewer, viewed_at) VALUES ($1, $2, now()) \
                 ON CONFLICT (post_id, viewer) DO UPDATE SET viewed_at = now()",
            )
            .bind(post_id)
            .bind(viewer)
            .execute(&mut *tx)
            .await
            .map_err(map_sqlx_error)?;

            let view_count: i64 = sqlx::query_scalar(
                "UPDATE posts SET view_count = view_count + 1 WHERE id = $1 RETURNING view_count",
            )
            .bind(post_id)
            .fetch_one(&mut *tx)
            .await
            .map_err(map_sqlx_error)?;
            ViewOutcome::Counted { view_count }
        };

        tx.commit().await.map_err(map_sqlx_error)?;
        Ok(outcome)
    }

    async fn list_liked_posts(
        &self,
        user_id: Uuid,
        page: PageRequest,
    ) -> Result<Page<PostOverview>, RepoError> {
        self.saved_posts_page("post_likes", user_id, page).await
    }

    async fn list_collected_posts(
        &self,
        user_id: Uuid,
        page: PageRequest,
    ) -> Result<Page<PostOverview>, RepoError> {
        self.saved_posts_page("post_collections", user_id, page)
            .await
    }
}

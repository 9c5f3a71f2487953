use async_trait::async_trait;
use sqlx::QueryBuilder;
use time::OffsetDateTime;
use uuid::Uuid;

use crate::application::pagination::{Page, PageRequest};
use crate::application::repos::{
    PostOverview, RepoError, TagEngagement, TagWithCount, TagsRepo,
};
use crate::domain::entities::TagRecord;
use crate::domain::types::{PostSort, PostStatus, SortOrder};

use super::posts::PostOverviewRow;
use super::{POST_OVERVIEW_SELECT, PostgresRepositories, map_sqlx_error};

#[derive(sqlx::FromRow)]
struct TagRow {
    id: Uuid,
    name: String,
    created_at: OffsetDateTime,
}

impl From<TagRow> for TagRecord {
    fn from(row: TagRow) -> Self {
        Self {
            id: row.id,
            name: row.name,
            created_at: row.created_at,
        }
    }
}

#[derive(sqlx::FromRow)]
struct TagCountRow {
    id: Uuid,
    name: String,
    post_count: i64,
}

fn tag_post_order(sort: PostSort, order: SortOrder) -> String {
    let direction = order.as_sql();
    match sort {
        PostSort::Date => format!("p.published_at {direction} NULLS LAST, p.id DESC"),
        PostSort::Likes => format!("like_count {direction}, p.id DESC"),
        PostSort::Title => format!("LOWER(p.title) {direction}, p.id DESC"),
    }
}

#[async_trait]
impl TagsRepo for PostgresRepositories {
    async fn list_with_counts(&self) -> Result<Vec<TagWithCount>, RepoError> {
        let rows = sqlx::query_as::<_, TagCountRow>(
            "SELECT t.id, t.name, COUNT(p.id) AS post_count \
             FROM tags t \
             LEFT JOIN post_tags pt ON pt.tag_id = t.id \
             LEFT JOIN posts p ON p.id = pt.post_id AND p.status = 'published' \
             GROUP BY t.id, t.name \
             ORDER BY LOWER(t.name)",
        )
        .fetch_all(self.pool())
        .await
        .map_err(map_sqlx_error)?;

        Ok(rows
            .into_iter()
            .map(|row| TagWithCount {
                id: row.id,
                name: row.name,
                post_count: row.post_count,
            })
            .collect())
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<TagRecord>, RepoError> {
        let row = sqlx::query_as::<_, TagRow>(
            "SELECT id, name, created_at FROM tags WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(self.pool())
        .await
        .map_err(map_sqlx_error)?;

        Ok(row.map(TagRecord::from))
    }

    async fn find_by_name(&self, name: &str) -> Result<Option<TagRecord>, RepoError> {
        let row = sqlx::query_as::<_, TagRow>(
            "SELECT id, name, created_at FROM tags WHERE LOWER(name) = LOWER($1)",
        )
        .bind(name)
        .fetch_optional(self.pool())
        .await
        .map_err(map_sqlx_error)?;

        Ok(row.map(TagRecord::from))
    }

    async fn tag_engagement(&self, id: Uuid) -> Result<TagEngagement, RepoError> {
        let (post_count, subscriber_count) = sqlx::query_as::<_, (i64, i64)>(
            "SELECT \
             (SELECT COUNT(*) FROM post_tags pt \
              INNER JOIN posts p ON p.id = pt.post_id \
              WHERE pt.tag_id = $1 AND p.status = 'published'), \
             (SELECT COUNT(*) FROM tag_subscriptions WHERE tag_id = $1)",
        )
        .bind(id)
        .fetch_one(self.pool())
        .await
        .map_err(map_sqlx_error)?;

        Ok(TagEngagement {
            post_count: Self::convert_count(post_count)?,
            subscriber_count: Self::convert_count(subscriber_count)?,
        })
    }

    async fn list_tag_posts(
        &self,
        tag_id: Uuid,
        sort: PostSort,
        order: SortOrder,
        page: PageRequest,
    ) -> Result<Page<PostOverview>, RepoError> {
        let mut qb = QueryBuilder::new(POST_OVERVIEW_SELECT);
        qb.push(" INNER JOIN post_tags ptf ON ptf.post_id = p.id WHERE ptf.tag_id = ");
        qb.push_bind(tag_id);
        qb.push(" AND p.status = ");
        qb.push_bind(PostStatus::Published);
        qb.push(" ORDER BY ");
        qb.push(tag_post_order(sort, order));
        qb.push(" LIMIT ");
        qb.push_bind(page.limit());
        qb.push(" OFFSET ");
        qb.push_bind(page.offset());

        let rows = qb
            .build_query_as::<PostOverviewRow>()
            .fetch_all(self.pool())
            .await
            .map_err(map_sqlx_error)?;

        let total: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM post_tags pt \
             INNER JOIN posts p ON p.id = pt.post_id \
             WHERE pt.tag_id = $1 AND p.status = $2",
        )
        .bind(tag_id)
        .bind(PostStatus::Published)
        .fetch_one(self.pool())
        .await
        .map_err(map_sqlx_error)?;

        let items = self.collect_overviews(rows).await?;
        Ok(Page::assemble(items, Self::convert_count(total)?, page))
    }

    async fn set_subscription(
        &self,
        user_id: Uuid,
        tag_id: Uuid,
        subscribed: bool,
    ) -> Result<bool, RepoError> {
        let sql = if subscribed {
            "INSERT INTO tag_subscriptions (user_id, tag_id) VALUES ($1, $2) \
             ON CONFLICT DO NOTHING"
        } else {
            "DELETE FROM tag_subscriptions WHERE user_id = $1 AND tag_id = $2"
        };

        let result = sqlx::query(sql)
            .bind(user_id)
            .bind(tag_id)
            .execute(self.pool())
            .await
            .map_err(map_sqlx_error)?;

        Ok(result.rows_affected() > 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tag_post_order_covers_all_sorts() {
        assert_eq!(
            tag_post_order(PostSort::Date, SortOrder::Desc),
            "p.published_at DESC NULLS LAST, p.id DESC"
        );
        assert_eq!(
            tag_post_order(PostSort::Likes, SortOrder::Asc),
            "like_count ASC, p.id DESC"
        );
        assert_eq!(
            tag_post_order(PostSort::Title, SortOrder::Asc),
            "LOWER(p.title) ASC, p.id DESC"
        );
    }
}

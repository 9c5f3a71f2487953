use std::collections::HashMap;

use async_trait::async_trait;
use sqlx::{Postgres, QueryBuilder};
use time::OffsetDateTime;
use uuid::Uuid;

use crate::application::pagination::{Page, PageRequest};
use crate::application::repos::{
    PostHeadline, PostOverview, RepoError, SearchFilter, SearchRepo, TagWithCount, UserSearchHit,
};
use crate::domain::entities::UserSummary;
use crate::domain::types::{PostStatus, SearchSort, SortOrder};

use super::posts::PostOverviewRow;
use super::{POST_OVERVIEW_SELECT, PostgresRepositories, map_sqlx_error};

/// Latest published posts surfaced under each user hit.
const USER_HIT_POST_PREVIEW: usize = 3;

fn like_pattern(query: &str) -> String {
    format!("%{}%", query.trim())
}

fn post_order(sort: SearchSort, order: SortOrder) -> String {
    let direction = order.as_sql();
    match sort {
        // Substring search has no ranking signal; recency stands in for
        // relevance.
        SearchSort::Relevance | SearchSort::Date => {
            format!("p.published_at {direction} NULLS LAST, p.id DESC")
        }
        SearchSort::Likes => format!("like_count {direction}, p.id DESC"),
        SearchSort::Title | SearchSort::Name => format!("LOWER(p.title) {direction}, p.id DESC"),
    }
}

fn push_post_date_range<'q>(qb: &mut QueryBuilder<'q, Postgres>, filter: &'q SearchFilter) {
    if let Some(from) = filter.date_from.as_ref() {
        qb.push(" AND p.published_at >= ");
        qb.push_bind(from);
    }
    if let Some(to) = filter.date_to.as_ref() {
        qb.push(" AND p.published_at <= ");
        qb.push_bind(to);
    }
}

#[derive(sqlx::FromRow)]
struct UserHitRow {
    id: Uuid,
    username: String,
    name: String,
    avatar_url: Option<String>,
}

#[derive(sqlx::FromRow)]
struct HeadlineRow {
    id: Uuid,
    title: String,
    published_at: Option<OffsetDateTime>,
    author_id: Uuid,
}

#[derive(sqlx::FromRow)]
struct TagHitRow {
    id: Uuid,
    name: String,
    post_count: i64,
}

#[async_trait]
impl SearchRepo for PostgresRepositories {
    async fn search_posts(
        &self,
        filter: &SearchFilter,
        page: PageRequest,
    ) -> Result<Page<PostOverview>, RepoError> {
        let pattern = like_pattern(&filter.query);

        let mut qb = QueryBuilder::new(POST_OVERVIEW_SELECT);
        qb.push(" WHERE p.status = ");
        qb.push_bind(PostStatus::Published);
        qb.push(" AND (p.title ILIKE ");
        qb.push_bind(pattern.clone());
        qb.push(" OR p.content ILIKE ");
        qb.push_bind(pattern.clone());
        qb.push(")");
        push_post_date_range(&mut qb, filter);
        qb.push(" ORDER BY ");
        qb.push(post_order(filter.sort, filter.order));
        qb.push(" LIMIT ");
        qb.push_bind(page.limit());
        qb.push(" OFFSET ");
        qb.push_bind(page.offset());

        let rows = qb
            .build_query_as::<PostOverviewRow>()
            .fetch_all(self.pool())
            .await
            .map_err(map_sqlx_error)?;

        let mut count_qb = QueryBuilder::new("SELECT COUNT(*) FROM posts p WHERE p.status = ");
        count_qb.push_bind(PostStatus::Published);
        count_qb.push(" AND (p.title ILIKE ");
        count_qb.push_bind(pattern.clone());
        count_qb.push(" OR p.content ILIKE ");
        count_qb.push_bind(pattern);
        count_qb.push(")");
        push_post_date_range(&mut count_qb, filter);

        let total: i64 = count_qb
            .build_query_scalar()
            .fetch_one(self.pool())
            .await
            .map_err(map_sqlx_error)?;

        let items = self.collect_overviews(rows).await?;
        Ok(Page::assemble(items, Self::convert_count(total)?, page))
    }

    async fn search_users(
        &self,
        filter: &SearchFilter,
        page: PageRequest,
    ) -> Result<Page<UserSearchHit>, RepoError> {
        let pattern = like_pattern(&filter.query);
        let direction = filter.order.as_sql();

        let rows = sqlx::query_as::<_, UserHitRow>(&format!(
            "SELECT u.id, u.username, u.name, u.avatar_url \
             FROM users u \
             WHERE u.name ILIKE $1 OR u.username ILIKE $1 \
             ORDER BY LOWER(u.name) {direction}, u.id \
             LIMIT $2 OFFSET $3"
        ))
        .bind(pattern.clone())
        .bind(page.limit())
        .bind(page.offset())
        .fetch_all(self.pool())
        .await
        .map_err(map_sqlx_error)?;

        let total: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM users u WHERE u.name ILIKE $1 OR u.username ILIKE $1",
        )
        .bind(pattern)
        .fetch_one(self.pool())
        .await
        .map_err(map_sqlx_error)?;

        let author_ids: Vec<Uuid> = rows.iter().map(|row| row.id).collect();
        let mut posts_by_author: HashMap<Uuid, Vec<PostHeadline>> = HashMap::new();

        if !author_ids.is_empty() {
            let headline_rows = sqlx::query_as::<_, HeadlineRow>(
                "SELECT p.id, p.title, p.published_at, p.author_id \
                 FROM posts p \
                 WHERE p.author_id = ANY($1) AND p.status = 'published' \
                 ORDER BY p.published_at DESC NULLS LAST, p.id DESC",
            )
            .bind(&author_ids)
            .fetch_all(self.pool())
            .await
            .map_err(map_sqlx_error)?;

            for row in headline_rows {
                let bucket = posts_by_author.entry(row.author_id).or_default();
                if bucket.len() < USER_HIT_POST_PREVIEW {
                    bucket.push(PostHeadline {
                        id: row.id,
                        title: row.title,
                        published_at: row.published_at,
                    });
                }
            }
        }

        let items = rows
            .into_iter()
            .map(|row| UserSearchHit {
                latest_posts: posts_by_author.remove(&row.id).unwrap_or_default(),
                user: UserSummary {
                    id: row.id,
                    username: row.username,
                    name: row.name,
                    avatar_url: row.avatar_url,
                },
            })
            .collect();

        Ok(Page::assemble(items, Self::convert_count(total)?, page))
    }

    async fn search_tags(
        &self,
        filter: &SearchFilter,
        page: PageRequest,
    ) -> Result<Page<TagWithCount>, RepoError> {
        let pattern = like_pattern(&filter.query);
        let direction = filter.order.as_sql();

        let rows = sqlx::query_as::<_, TagHitRow>(&format!(
            "SELECT t.id, t.name, COUNT(p.id) AS post_count \
             FROM tags t \
             LEFT JOIN post_tags pt ON pt.tag_id = t.id \
             LEFT JOIN posts p ON p.id = pt.post_id AND p.status = 'published' \
             WHERE t.name ILIKE $1 \
             GROUP BY t.id, t.name \
             ORDER BY LOWER(t.name) {direction}, t.id \
             LIMIT $2 OFFSET $3"
        ))
        .bind(pattern.clone())
        .bind(page.limit())
        .bind(page.offset())
        .fetch_all(self.pool())
        .await
        .map_err(map_sqlx_error)?;

        let total: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM tags WHERE name ILIKE $1")
            .bind(pattern)
            .fetch_one(self.pool())
            .await
            .map_err(map_sqlx_error)?;

        let items = rows
            .into_iter()
            .map(|row| TagWithCount {
                id: row.id,
                name: row.name,
                post_count: row.post_count,
            })
            .collect();

        Ok(Page::assemble(items, Self::convert_count(total)?, page))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn relevance_falls_back_to_recency() {
        assert_eq!(
            post_order(SearchSort::Relevance, SortOrder::Desc),
            post_order(SearchSort::Date, SortOrder::Desc)
        );
    }

    #[test]
    fn like_pattern_wraps_and_trims() {
        assert_eq!(like_pattern("  reed pen "), "%reed pen%");
    }
}

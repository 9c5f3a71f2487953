//! Postgres-backed repository implementations.

mod comments;
mod engagement;
mod follows;
mod posts;
mod search;
mod tags;
mod users;
mod util;

pub use util::map_sqlx_error;

use std::sync::Arc;

use sqlx::{
    Postgres, QueryBuilder, Transaction,
    postgres::{PgPool, PgPoolOptions},
    query,
};

use crate::application::repos::{PostListScope, PostQueryFilter, RepoError};
use crate::domain::types::PostStatus;

/// Shared SELECT prelude for post listings: the post row joined with its
/// author and engagement counters. Tag lists are attached in a second batched
/// query.
const POST_OVERVIEW_SELECT: &str = "SELECT p.id, p.author_id, p.title, p.content, \
     p.rating, p.status, p.published_at, p.view_count, p.created_at, p.updated_at, \
     u.username AS author_username, u.name AS author_name, u.avatar_url AS author_avatar_url, \
     (SELECT COUNT(*) FROM post_likes pl WHERE pl.post_id = p.id) AS like_count, \
     (SELECT COUNT(*) FROM post_collections pc WHERE pc.post_id = p.id) AS collection_count, \
     (SELECT COUNT(*) FROM comments cm WHERE cm.post_id = p.id) AS comment_count \
     FROM posts p INNER JOIN users u ON u.id = p.author_id";

#[derive(Clone)]
pub struct PostgresRepositories {
    pool: Arc<PgPool>,
}

impl PostgresRepositories {
    pub fn new(pool: PgPool) -> Self {
        Self {
            pool: Arc::new(pool),
        }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    pub async fn begin(&self) -> Result<Transaction<'_, Postgres>, sqlx::Error> {
        self.pool.begin().await
    }

    pub async fn connect(url: &str, max_connections: u32) -> Result<PgPool, sqlx::Error> {
        PgPoolOptions::new()
            .max_connections(max_connections)
            .connect(url)
            .await
    }

    pub async fn run_migrations(pool: &PgPool) -> Result<(), sqlx::Error> {
        sqlx::migrate!("./migrations")
            .run(pool)
            .await
            .map_err(Into::into)
    }

    pub async fn health_check(&self) -> Result<(), sqlx::Error> {
        query("SELECT 1").execute(self.pool()).await.map(|_| ())
    }

    fn apply_post_scope<'q>(qb: &mut QueryBuilder<'q, Postgres>, scope: PostListScope) {
        if scope == PostListScope::Public {
            qb.push(" AND p.status = ");
            qb.push_bind(PostStatus::Published);
        }
    }

    fn apply_post_filter<'q>(qb: &mut QueryBuilder<'q, Postgres>, filter: &'q PostQueryFilter) {
        if let Some(author) = filter.author.as_ref() {
            qb.push(" AND p.author_id = ");
            qb.push_bind(author);
        }

        if let Some(tag) = filter.tag.as_ref() {
            qb.push(
                " AND EXISTS (SELECT 1 FROM post_tags pt INNER JOIN tags t ON t.id = pt.tag_id \
                 WHERE pt.post_id = p.id AND LOWER(t.name) = LOWER(",
            );
            qb.push_bind(tag);
            qb.push("))");
        }

        if let Some(search) = filter.search.as_ref() {
            qb.push(" AND (p.title ILIKE ");
            qb.push_bind(format!("%{search}%"));
            qb.push(" OR p.content ILIKE ");
            qb.push_bind(format!("%{search}%"));
            qb.push(")");
        }
    }

    fn convert_count(value: i64) -> Result<u64, RepoError> {
        value
            .try_into()
            .map_err(|_| RepoError::from_persistence("count exceeds supported range"))
    }
}

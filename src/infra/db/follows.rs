use async_trait::async_trait;
use uuid::Uuid;

use crate::application::pagination::{Page, PageRequest};
use crate::application::repos::{FollowState, FollowsRepo, RepoError};
use crate::domain::entities::UserSummary;

use super::{PostgresRepositories, map_sqlx_error};

#[derive(sqlx::FromRow)]
struct UserSummaryRow {
    id: Uuid,
    username: String,
    name: String,
    avatar_url: Option<String>,
}

impl From<UserSummaryRow> for UserSummary {
    fn from(row: UserSummaryRow) -> Self {
        Self {
            id: row.id,
            username: row.username,
            name: row.name,
            avatar_url: row.avatar_url,
        }
    }
}

#[async_trait]
impl FollowsRepo for PostgresRepositories {
    async fn insert_follow(&self, follower: Uuid, following: Uuid) -> Result<bool, RepoError> {
        let result = sqlx::query(
            "INSERT INTO follows (follower_id, following_id) VALUES ($1, $2) \
             ON CONFLICT DO NOTHING",
        )
        .bind(follower)
        .bind(following)
        .execute(self.pool())
        .await
        .map_err(map_sqlx_error)?;

        Ok(result.rows_affected() > 0)
    }

    async fn delete_follow(&self, follower: Uuid, following: Uuid) -> Result<bool, RepoError> {
        let result =
            sqlx::query("DELETE FROM follows WHERE follower_id = $1 AND following_id = $2")
                .bind(follower)
                .bind(following)
                .execute(self.pool())
                .await
                .map_err(map_sqlx_error)?;

        Ok(result.rows_affected() > 0)
    }

    async fn follow_state(&self, viewer: Uuid, target: Uuid) -> Result<FollowState, RepoError> {
        let (following, followed_by) = sqlx::query_as::<_, (bool, bool)>(
            "SELECT \
             EXISTS(SELECT 1 FROM follows WHERE follower_id = $1 AND following_id = $2), \
             EXISTS(SELECT 1 FROM follows WHERE follower_id = $2 AND following_id = $1)",
        )
        .bind(viewer)
        .bind(target)
        .fetch_one(self.pool())
        .await
        .map_err(map_sqlx_error)?;

        Ok(FollowState {
            following,
            followed_by,
        })
    }

    async fn list_followers(
        &self,
        user_id: Uuid,
        page: PageRequest,
    ) -> Result<Page<UserSummary>, RepoError> {
        let rows = sqlx::query_as::<_, UserSummaryRow>(
            "SELECT u.id, u.username, u.name, u.avatar_url \
             FROM follows f INNER JOIN users u ON u.id = f.follower_id \
             WHERE f.following_id = $1 \
             ORDER BY f.created_at DESC \
             LIMIT $2 OFFSET $3",
        )
        .bind(user_id)
        .bind(page.limit())
        .bind(page.offset())
        .fetch_all(self.pool())
        .await
        .map_err(map_sqlx_error)?;

        let total: i64 =
            sqlx::query_scalar("SELECT COUNT(*) FROM follows WHERE following_id = $1")
                .bind(user_id)
                .fetch_one(self.pool())
                .await
                .map_err(map_sqlx_error)?;

        Ok(Page::assemble(
            rows.into_iter().map(UserSummary::from).collect(),
            Self::convert_count(total)?,
            page,
        ))
    }

    async fn list_following(
        &self,
        user_id: Uuid,
        page: PageRequest,
    ) -> Result<Page<UserSummary>, RepoError> {
        let rows = sqlx::query_as::<_, UserSummaryRow>(
            "SELECT u.id, u.username, u.name, u.avatar_url \
             FROM follows f INNER JOIN users u ON u.id = f.following_id \
             WHERE f.follower_id = $1 \
             ORDER BY f.created_at DESC \
             LIMIT $2 OFFSET $3",
        )
        .bind(user_id)
        .bind(page.limit())
        .bind(page.offset())
        .fetch_all(self.pool())
        .await
        .map_err(map_sqlx_error)?;

        let total: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM follows WHERE follower_id = $1")
            .bind(user_id)
            .fetch_one(self.pool())
            .await
            .map_err(map_sqlx_error)?;

        Ok(Page::assemble(
            rows.into_iter().map(UserSummary::from).collect(),
            Self::convert_count(total)?,
            page,
        ))
    }
}

use async_trait::async_trait;
use time::OffsetDateTime;
use uuid::Uuid;

use crate::application::repos::{
    CreateUserParams, ProfileCounts, RepoError, UpdateProfileParams, UsersRepo,
};
use crate::domain::entities::UserRecord;

use super::{PostgresRepositories, map_sqlx_error};

#[derive(sqlx::FromRow)]
struct UserRow {
    id: Uuid,
    email: String,
    username: String,
    name: String,
    password_hash: String,
    bio: Option<String>,
    avatar_url: Option<String>,
    website: Option<String>,
    created_at: OffsetDateTime,
    updated_at: OffsetDateTime,
}

impl From<UserRow> for UserRecord {
    fn from(row: UserRow) -> Self {
        Self {
            id: row.id,
            email: row.email,
            username: row.username,
            name: row.name,
            password_hash: row.password_hash,
            bio: row.bio,
            avatar_url: row.avatar_url,
            website: row.website,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

const USER_COLUMNS: &str =
    "id, email, username, name, password_hash, bio, avatar_url, website, created_at, updated_at";

#[async_trait]
impl UsersRepo for PostgresRepositories {
    async fn create_user(&self, params: CreateUserParams) -> Result<UserRecord, RepoError> {
        let CreateUserParams {
            email,
            username,
            name,
            password_hash,
        } = params;

        let row = sqlx::query_as::<_, UserRow>(&format!(
            "INSERT INTO users (id, email, username, name, password_hash) \
             VALUES ($1, $2, $3, $4, $5) \
             RETURNING {USER_COLUMNS}"
        ))
        .bind(Uuid::new_v4())
        .bind(email)
        .bind(username)
        .bind(name)
        .bind(password_hash)
        .fetch_one(self.pool())
        .await
        .map_err(map_sqlx_error)?;

        Ok(UserRecord::from(row))
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<UserRecord>, RepoError> {
        let row = sqlx::query_as::<_, UserRow>(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(self.pool())
        .await
        .map_err(map_sqlx_error)?;

        Ok(row.map(UserRecord::from))
    }

    async fn find_by_email(&self, email: &str) -> Result<Option<UserRecord>, RepoError> {
        let row = sqlx::query_as::<_, UserRow>(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE LOWER(email) = LOWER($1)"
        ))
        .bind(email)
        .fetch_optional(self.pool())
        .await
        .map_err(map_sqlx_error)?;

        Ok(row.map(UserRecord::from))
    }

    async fn find_by_username(&self, username: &str) -> Result<Option<UserRecord>, RepoError> {
        let row = sqlx::query_as::<_, UserRow>(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE LOWER(username) = LOWER($1)"
        ))
        .bind(username)
        .fetch_optional(self.pool())
        .await
        .map_err(map_sqlx_error)?;

        Ok(row.map(UserRecord::from))
    }

    async fn update_profile(&self, params: UpdateProfileParams) -> Result<UserRecord, RepoError> {
        let UpdateProfileParams {
            id,
            name,
            username,
            bio,
            avatar_url,
            website,
        } = params;

        let row = sqlx::query_as::<_, UserRow>(&format!(
            "UPDATE users \
             SET name = COALESCE($2, name), \
                 username = COALESCE($3, username), \
                 bio = COALESCE($4, bio), \
                 avatar_url = COALESCE($5, avatar_url), \
                 website = COALESCE($6, website), \
                 updated_at = now() \
             WHERE id = $1 \
             RETURNING {USER_COLUMNS}"
        ))
        .bind(id)
        .bind(name)
        .bind(username)
        .bind(bio)
        .bind(avatar_url)
        .bind(website)
        .fetch_optional(self.pool())
        .await
        .map_err(map_sqlx_error)?;

        row.map(UserRecord::from).ok_or(RepoError::NotFound)
    }

    async fn profile_counts(&self, user_id: Uuid) -> Result<ProfileCounts, RepoError> {
        let (posts, followers, following) = sqlx::query_as::<_, (i64, i64, i64)>(
            "SELECT \
             (SELECT COUNT(*) FROM posts WHERE author_id = $1 AND status = 'published'), \
             (SELECT COUNT(*) FROM follows WHERE following_id = $1), \
             (SELECT COUNT(*) FROM follows WHERE follower_id = $1)",
        )
        .bind(user_id)
        .fetch_one(self.pool())
        .await
        .map_err(map_sqlx_error)?;

        Ok(ProfileCounts {
            posts: Self::convert_count(posts)?,
            followers: Self::convert_count(followers)?,
            following: Self::convert_count(following)?,
        })
    }
}

//! Domain entities mirrored from persistent storage.

use serde::Serialize;
use time::OffsetDateTime;
use uuid::Uuid;

use crate::domain::types::{PostStatus, Rating};

/// Full account row. The password hash stays inside the service boundary;
/// everything user-facing goes through [`UserSummary`] or profile models.
#[derive(Debug, Clone, PartialEq)]
pub struct UserRecord {
    pub id: Uuid,
    pub email: String,
    pub username: String,
    pub name: String,
    pub password_hash: String,
    pub bio: Option<String>,
    pub avatar_url: Option<String>,
    pub website: Option<String>,
    pub created_at: OffsetDateTime,
    pub updated_at: OffsetDateTime,
}

/// The public slice of a user attached to posts, comments, and follow lists.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct UserSummary {
    pub id: Uuid,
    pub username: String,
    pub name: String,
    pub avatar_url: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct PostRecord {
    pub id: Uuid,
    pub author_id: Uuid,
    pub title: String,
    pub content: String,
    pub rating: Rating,
    pub status: PostStatus,
    pub published_at: Option<OffsetDateTime>,
    pub view_count: i64,
    pub created_at: OffsetDateTime,
    pub updated_at: OffsetDateTime,
}

impl PostRecord {
    /// Whether the post is visible to an arbitrary (possibly anonymous) viewer.
    pub fn visible_to(&self, viewer: Option<Uuid>) -> bool {
        self.status == PostStatus::Published || viewer == Some(self.author_id)
    }

    /// Publication stamp after a status change: the first transition into
    /// `published` sets the clock, later changes keep the original timestamp.
    pub fn published_at_after(
        &self,
        next: PostStatus,
        now: OffsetDateTime,
    ) -> Option<OffsetDateTime> {
        match (next, self.published_at) {
            (PostStatus::Published, None) => Some(now),
            (_, existing) => existing,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TagRecord {
    pub id: Uuid,
    pub name: String,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
}

#[derive(Debug, Clone, PartialEq)]
pub struct CommentRecord {
    pub id: Uuid,
    pub post_id: Uuid,
    pub author_id: Uuid,
    pub parent_id: Option<Uuid>,
    pub content: String,
    pub created_at: OffsetDateTime,
    pub updated_at: OffsetDateTime,
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::macros::datetime;

    fn post(status: PostStatus, author: Uuid) -> PostRecord {
        PostRecord {
            id: Uuid::new_v4(),
            author_id: author,
            title: "title".into(),
            content: "content".into(),
            rating: Rating::Teen,
            status,
            published_at: None,
            view_count: 0,
            created_at: datetime!(2024-06-01 12:00 UTC),
            updated_at: datetime!(2024-06-01 12:00 UTC),
        }
    }

    #[test]
    fn published_posts_are_visible_to_everyone() {
        let author = Uuid::new_v4();
        let record = post(PostStatus::Published, author);
        assert!(record.visible_to(None));
        assert!(record.visible_to(Some(Uuid::new_v4())));
    }

    #[test]
    fn drafts_are_visible_only_to_their_author() {
        let author = Uuid::new_v4();
        let record = post(PostStatus::Draft, author);
        assert!(record.visible_to(Some(author)));
        assert!(!record.visible_to(Some(Uuid::new_v4())));
        assert!(!record.visible_to(None));
    }

    #[test]
    fn archived_posts_keep_author_access() {
        let author = Uuid::new_v4();
        let record = post(PostStatus::Archived, author);
        assert!(record.visible_to(Some(author)));
        assert!(!record.visible_to(None));
    }

    #[test]
    fn first_publish_stamps_and_later_changes_preserve() {
        let now = datetime!(2024-07-01 09:00 UTC);
        let later = datetime!(2024-07-02 09:00 UTC);

        let mut record = post(PostStatus::Draft, Uuid::new_v4());
        assert_eq!(
            record.published_at_after(PostStatus::Published, now),
            Some(now)
        );

        record.published_at = Some(now);
        assert_eq!(
            record.published_at_after(PostStatus::Archived, later),
            Some(now)
        );
        assert_eq!(
            record.published_at_after(PostStatus::Published, later),
            Some(now)
        );
    }
}

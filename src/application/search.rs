//! Search across posts, users, and tags.

use std::sync::Arc;

use serde::Serialize;
use thiserror::Error;
use tokio::try_join;

use crate::application::pagination::{Page, PageRequest};
use crate::application::repos::{
    PostOverview, RepoError, SearchFilter, SearchRepo, TagWithCount, UserSearchHit,
};
use crate::domain::types::SearchKind;

#[derive(Debug, Error)]
pub enum SearchError {
    #[error(transparent)]
    Repo(#[from] RepoError),
    #[error("search query must not be empty")]
    EmptyQuery,
}

/// Combined search document; sections absent from the requested kind are
/// omitted from the response.
#[derive(Debug, Clone, Serialize)]
pub struct SearchResults {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub posts: Option<Page<PostOverview>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub users: Option<Page<UserSearchHit>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tags: Option<Page<TagWithCount>>,
}

#[derive(Clone)]
pub struct SearchService {
    repo: Arc<dyn SearchRepo>,
}

impl SearchService {
    pub fn new(repo: Arc<dyn SearchRepo>) -> Self {
        Self { repo }
    }

    pub async fn search(
        &self,
        kind: SearchKind,
        filter: &SearchFilter,
        page: PageRequest,
    ) -> Result<SearchResults, SearchError> {
        if filter.query.trim().is_empty() {
            return Err(SearchError::EmptyQuery);
        }

        match kind {
            SearchKind::Posts => Ok(SearchResults {
                posts: Some(self.repo.search_posts(filter, page).await?),
                users: None,
                tags: None,
            }),
            SearchKind::Users => Ok(SearchResults {
                posts: None,
                users: Some(self.repo.search_users(filter, page).await?),
                tags: None,
            }),
            SearchKind::Tags => Ok(SearchResults {
                posts: None,
                users: None,
                tags: Some(self.repo.search_tags(filter, page).await?),
            }),
            SearchKind::All => {
                let (posts, users, tags) = try_join!(
                    self.repo.search_posts(filter, page),
                    self.repo.search_users(filter, page),
                    self.repo.search_tags(filter, page),
                )?;
                Ok(SearchResults {
                    posts: Some(posts),
                    users: Some(users),
                    tags: Some(tags),
                })
            }
        }
    }
}

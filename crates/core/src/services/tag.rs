//! Tag service.

use museum_common::AppResult;
use museum_db::repositories::TagRepository;

use crate::services::meme::TagSummary;

/// Tag service for business logic.
#[derive(Clone)]
pub struct TagService {
    tag_repo: TagRepository,
}

impl TagService {
    /// Create a new tag service.
    #[must_use]
    pub const fn new(tag_repo: TagRepository) -> Self {
        Self { tag_repo }
    }

    /// All tags, ordered by name.
    pub async fn list(&self) -> AppResult<Vec<TagSummary>> {
        Ok(self
            .tag_repo
            .find_all()
            .await?
            .into_iter()
            .map(TagSummary::from)
            .collect())
    }
}

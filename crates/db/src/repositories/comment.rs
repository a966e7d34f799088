//! Comment repository.

use std::collections::HashMap;
use std::sync::Arc;

use crate::entities::{Comment, comment};
use museum_common::{AppError, AppResult};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, FromQueryResult,
    PaginatorTrait, QueryFilter, QueryOrder, QuerySelect,
};

#[derive(Debug, FromQueryResult)]
struct CommentCountRow {
    meme_id: String,
    comment_count: i64,
}

/// Comment repository for database operations.
#[derive(Clone)]
pub struct CommentRepository {
    db: Arc<DatabaseConnection>,
}

impl CommentRepository {
    /// Create a new comment repository.
    #[must_use]
    pub const fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }

    /// Find a comment by ID.
    pub async fn find_by_id(&self, id: &str) -> AppResult<Option<comment::Model>> {
        Comment::find_by_id(id)
            .one(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Get a comment by ID, returning an error if not found.
    pub async fn get_by_id(&self, id: &str) -> AppResult<comment::Model> {
        self.find_by_id(id)
            .await?
            .ok_or_else(|| AppError::CommentNotFound(id.to_string()))
    }

    /// Comments on a meme, newest first.
    pub async fn find_by_meme(
        &self,
        meme_id: &str,
        limit: u64,
        offset: u64,
    ) -> AppResult<Vec<comment::Model>> {
        Comment::find()
            .filter(comment::Column::MemeId.eq(meme_id))
            .order_by_desc(comment::Column::CreatedAt)
            .order_by_desc(comment::Column::Id)
            .offset(offset)
            .limit(limit)
            .all(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Count comments on a meme.
    pub async fn count_by_meme(&self, meme_id: &str) -> AppResult<u64> {
        Comment::find()
            .filter(comment::Column::MemeId.eq(meme_id))
            .count(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Comment counts for several memes in one grouped query.
    ///
    /// Memes without comments are absent from the map.
    pub async fn count_by_memes(&self, meme_ids: &[String]) -> AppResult<HashMap<String, u64>> {
        if meme_ids.is_empty() {
            return Ok(HashMap::new());
        }

        let rows = Comment::find()
            .select_only()
            .column(comment::Column::MemeId)
            .column_as(comment::Column::Id.count(), "comment_count")
            .filter(comment::Column::MemeId.is_in(meme_ids.iter().cloned()))
            .group_by(comment::Column::MemeId)
            .into_model::<CommentCountRow>()
            .all(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        Ok(rows
            .into_iter()
            .map(|row| (row.meme_id, row.comment_count.max(0) as u64))
            .collect())
    }

    /// Create a new comment.
    pub async fn create(&self, model: comment::ActiveModel) -> AppResult<comment::Model> {
        model
            .insert(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Delete a comment. Its votes cascade.
    pub async fn delete(&self, id: &str) -> AppResult<()> {
        Comment::delete_by_id(id)
            .exec(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;
        Ok(())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use chrono::Utc;
    use sea_orm::{DatabaseBackend, MockDatabase};

    fn create_test_comment(id: &str, meme_id: &str) -> comment::Model {
        comment::Model {
            id: id.to_string(),
            meme_id: meme_id.to_string(),
            user_id: "user1".to_string(),
            content: "lol".to_string(),
            upvotes: 0,
            downvotes: 0,
            created_at: Utc::now().into(),
            updated_at: None,
        }
    }

    #[tokio::test]
    async fn test_get_by_id_not_found() {
        let db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([Vec::<comment::Model>::new()])
                .into_connection(),
        );

        let repo = CommentRepository::new(db);
        let result = repo.get_by_id("missing").await;

        assert!(matches!(result, Err(AppError::CommentNotFound(_))));
    }

    #[tokio::test]
    async fn test_find_by_meme() {
        let db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([[
                    create_test_comment("c2", "meme1"),
                    create_test_comment("c1", "meme1"),
                ]])
                .into_connection(),
        );

        let repo = CommentRepository::new(db);
        let comments = repo.find_by_meme("meme1", 20, 0).await.unwrap();

        assert_eq!(comments.len(), 2);
        assert_eq!(comments[0].id, "c2");
    }

    #[tokio::test]
    async fn test_count_by_memes() {
        let db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([[
                    maplit::btreemap! {
                        "meme_id" => sea_orm::Value::String(Some(Box::new("meme1".to_string()))),
                        "comment_count" => sea_orm::Value::BigInt(Some(3)),
                    },
                    maplit::btreemap! {
                        "meme_id" => sea_orm::Value::String(Some(Box::new("meme2".to_string()))),
                        "comment_count" => sea_orm::Value::BigInt(Some(1)),
                    },
                ]])
                .into_connection(),
        );

        let repo = CommentRepository::new(db);
        let counts = repo
            .count_by_memes(&["meme1".to_string(), "meme2".to_string(), "meme3".to_string()])
            .await
            .unwrap();

        assert_eq!(counts.get("meme1"), Some(&3));
        assert_eq!(counts.get("meme2"), Some(&1));
        assert_eq!(counts.get("meme3"), None);
    }
}

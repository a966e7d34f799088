//! Tag repository.

use std::collections::HashMap;
use std::sync::Arc;

use crate::entities::{MemeTag, Tag, meme_tag, tag};
use chrono::Utc;
use museum_common::{AppError, AppResult, IdGenerator};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DatabaseConnection, EntityTrait, QueryFilter,
    QueryOrder, Set, sea_query::OnConflict,
};

/// Tag repository for database operations.
#[derive(Clone)]
pub struct TagRepository {
    db: Arc<DatabaseConnection>,
    id_gen: IdGenerator,
}

impl TagRepository {
    /// Create a new tag repository.
    #[must_use]
    pub const fn new(db: Arc<DatabaseConnection>) -> Self {
        Self {
            db,
            id_gen: IdGenerator::new(),
        }
    }

    /// All tags ordered by name.
    pub async fn find_all(&self) -> AppResult<Vec<tag::Model>> {
        Tag::find()
            .order_by_asc(tag::Column::Name)
            .all(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Find a tag by exact name.
    pub async fn find_by_name<C: ConnectionTrait>(
        &self,
        conn: &C,
        name: &str,
    ) -> AppResult<Option<tag::Model>> {
        Tag::find()
            .filter(tag::Column::Name.eq(name))
            .one(conn)
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Get or create a tag by name, on the given connection or transaction.
    pub async fn get_or_create<C: ConnectionTrait>(
        &self,
        conn: &C,
        name: &str,
    ) -> AppResult<tag::Model> {
        if let Some(tag) = self.find_by_name(conn, name).await? {
            return Ok(tag);
        }

        let model = tag::ActiveModel {
            id: Set(self.id_gen.generate()),
            name: Set(name.to_string()),
            description: Set(None),
            color: Set(tag::DEFAULT_COLOR.to_string()),
            created_at: Set(Utc::now().into()),
        };

        // A concurrent upload may create the same tag first; keep theirs.
        Tag::insert(model)
            .on_conflict(OnConflict::column(tag::Column::Name).do_nothing().to_owned())
            .exec_without_returning(conn)
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        self.find_by_name(conn, name)
            .await?
            .ok_or_else(|| AppError::Internal(format!("Tag {name} missing after insert")))
    }

    /// Link a tag to a meme.
    pub async fn attach<C: ConnectionTrait>(
        &self,
        conn: &C,
        meme_id: &str,
        tag_id: &str,
    ) -> AppResult<()> {
        let model = meme_tag::ActiveModel {
            id: Set(self.id_gen.generate()),
            meme_id: Set(meme_id.to_string()),
            tag_id: Set(tag_id.to_string()),
            created_at: Set(Utc::now().into()),
        };

        model
            .insert(conn)
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;
        Ok(())
    }

    /// Tags of each given meme, keyed by meme ID and sorted by name.
    pub async fn find_by_meme_ids(
        &self,
        meme_ids: &[String],
    ) -> AppResult<HashMap<String, Vec<tag::Model>>> {
        if meme_ids.is_empty() {
            return Ok(HashMap::new());
        }

        let links = MemeTag::find()
            .filter(meme_tag::Column::MemeId.is_in(meme_ids.iter().cloned()))
            .find_also_related(Tag)
            .order_by_asc(tag::Column::Name)
            .all(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        let mut by_meme: HashMap<String, Vec<tag::Model>> = HashMap::new();
        for (link, tag) in links {
            if let Some(tag) = tag {
                by_meme.entry(link.meme_id).or_default().push(tag);
            }
        }
        Ok(by_meme)
    }
}

//! Meme repository.
//!
//! Besides plain CRUD this hosts the listing query builder: filters are
//! AND-combined into one [`Condition`], tag and username filters are
//! expressed as `IN (subquery)` so a meme matching several tags is still a
//! single row, and every ordering ends on `id ASC` so pages are stable.

use std::sync::Arc;

use crate::entities::{Meme, meme, meme_tag, tag, user};
use museum_common::{AppError, AppResult};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, Condition, ConnectionTrait, DatabaseConnection,
    DatabaseTransaction, EntityTrait, Order, PaginatorTrait, QueryFilter, QueryOrder, QuerySelect,
    Select, TransactionTrait,
    prelude::DateTimeWithTimeZone,
    sea_query::{Expr, Func, LikeExpr, Query},
};

/// Filters for meme listings. Every present filter must match.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MemeFilter {
    /// Inclusive lower bound on the upload date.
    pub uploaded_from: Option<DateTimeWithTimeZone>,
    /// Inclusive upper bound on the upload date.
    pub uploaded_until: Option<DateTimeWithTimeZone>,
    /// Exact uploader ID.
    pub author_id: Option<String>,
    /// Case-insensitive substring of the title.
    pub title: Option<String>,
    /// Exact uploader username.
    pub username: Option<String>,
    /// The meme must carry at least one of these tag names.
    pub tags: Vec<String>,
}

/// Listing sort key.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum MemeSortKey {
    #[default]
    UploadDate,
    /// Upvotes, then downvotes in the opposite direction.
    Score,
    Upvotes,
    Downvotes,
}

/// Sort direction.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum SortOrder {
    Asc,
    #[default]
    Desc,
}

impl SortOrder {
    #[must_use]
    pub const fn reverse(self) -> Self {
        match self {
            Self::Asc => Self::Desc,
            Self::Desc => Self::Asc,
        }
    }

    const fn to_order(self) -> Order {
        match self {
            Self::Asc => Order::Asc,
            Self::Desc => Order::Desc,
        }
    }
}

/// Listing sort specification.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MemeSort {
    pub key: MemeSortKey,
    pub order: SortOrder,
}

/// Meme repository for database operations.
#[derive(Clone)]
pub struct MemeRepository {
    db: Arc<DatabaseConnection>,
}

impl MemeRepository {
    /// Create a new meme repository.
    #[must_use]
    pub const fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }

    /// Start a transaction on the underlying connection.
    pub async fn begin(&self) -> AppResult<DatabaseTransaction> {
        self.db
            .begin()
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Find a meme by ID.
    pub async fn find_by_id(&self, id: &str) -> AppResult<Option<meme::Model>> {
        Meme::find_by_id(id)
            .one(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Get a meme by ID, returning an error if not found.
    pub async fn get_by_id(&self, id: &str) -> AppResult<meme::Model> {
        self.find_by_id(id)
            .await?
            .ok_or_else(|| AppError::MemeNotFound(id.to_string()))
    }

    /// Find an active meme by ID.
    pub async fn find_active_by_id(&self, id: &str) -> AppResult<Option<meme::Model>> {
        Meme::find_by_id(id)
            .filter(meme::Column::IsActive.eq(true))
            .one(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Create a new meme on the given connection or transaction.
    pub async fn create<C: ConnectionTrait>(
        &self,
        conn: &C,
        model: meme::ActiveModel,
    ) -> AppResult<meme::Model> {
        model
            .insert(conn)
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Delete a meme. Tag links, comments and votes cascade.
    pub async fn delete(&self, id: &str) -> AppResult<()> {
        Meme::delete_by_id(id)
            .exec(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;
        Ok(())
    }

    /// Increment the view counter in a single `UPDATE`.
    pub async fn increment_views(&self, id: &str) -> AppResult<()> {
        Meme::update_many()
            .col_expr(meme::Column::Views, Expr::col(meme::Column::Views).add(1))
            .filter(meme::Column::Id.eq(id))
            .exec(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;
        Ok(())
    }

    /// One page of memes matching `filter`, in `sort` order.
    pub async fn list(
        &self,
        filter: &MemeFilter,
        sort: MemeSort,
        limit: u64,
        offset: u64,
    ) -> AppResult<Vec<meme::Model>> {
        apply_sort(Meme::find().filter(build_condition(filter)), sort)
            .offset(offset)
            .limit(limit)
            .all(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Number of distinct memes matching `filter`.
    pub async fn count(&self, filter: &MemeFilter) -> AppResult<u64> {
        Meme::find()
            .filter(build_condition(filter))
            .count(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Best meme uploaded in `[from, until)`: most upvotes, then fewest
    /// downvotes, then lowest ID.
    pub async fn find_best_uploaded_between(
        &self,
        from: DateTimeWithTimeZone,
        until: DateTimeWithTimeZone,
    ) -> AppResult<Option<meme::Model>> {
        best_first(
            Meme::find()
                .filter(meme::Column::UploadedAt.gte(from))
                .filter(meme::Column::UploadedAt.lt(until)),
        )
        .one(self.db.as_ref())
        .await
        .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Best meme of all time, same ordering as [`Self::find_best_uploaded_between`].
    pub async fn find_best(&self) -> AppResult<Option<meme::Model>> {
        best_first(Meme::find())
            .one(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }
}

fn best_first(select: Select<Meme>) -> Select<Meme> {
    select
        .order_by_desc(meme::Column::Upvotes)
        .order_by_asc(meme::Column::Downvotes)
        .order_by_asc(meme::Column::Id)
}

fn build_condition(filter: &MemeFilter) -> Condition {
    let mut cond = Condition::all();

    if let Some(from) = filter.uploaded_from {
        cond = cond.add(meme::Column::UploadedAt.gte(from));
    }
    if let Some(until) = filter.uploaded_until {
        cond = cond.add(meme::Column::UploadedAt.lte(until));
    }
    if let Some(author_id) = &filter.author_id {
        cond = cond.add(meme::Column::UserId.eq(author_id.as_str()));
    }
    if let Some(title) = &filter.title {
        let pattern = format!("%{}%", escape_like(&title.to_lowercase()));
        cond = cond.add(
            Expr::expr(Func::lower(Expr::col((Meme, meme::Column::Title))))
                .like(LikeExpr::new(pattern).escape('\\')),
        );
    }
    if let Some(username) = &filter.username {
        cond = cond.add(
            meme::Column::UserId.in_subquery(
                Query::select()
                    .column(user::Column::Id)
                    .from(user::Entity)
                    .and_where(user::Column::Username.eq(username.as_str()))
                    .to_owned(),
            ),
        );
    }
    if !filter.tags.is_empty() {
        cond = cond.add(
            meme::Column::Id.in_subquery(
                Query::select()
                    .column((meme_tag::Entity, meme_tag::Column::MemeId))
                    .from(meme_tag::Entity)
                    .inner_join(
                        tag::Entity,
                        Expr::col((tag::Entity, tag::Column::Id))
                            .equals((meme_tag::Entity, meme_tag::Column::TagId)),
                    )
                    .and_where(
                        Expr::col((tag::Entity, tag::Column::Name))
                            .is_in(filter.tags.iter().cloned()),
                    )
                    .to_owned(),
            ),
        );
    }

    cond
}

fn apply_sort(select: Select<Meme>, sort: MemeSort) -> Select<Meme> {
    let order = sort.order.to_order();
    let select = match sort.key {
        MemeSortKey::UploadDate => select.order_by(meme::Column::UploadedAt, order),
        MemeSortKey::Score => select
            .order_by(meme::Column::Upvotes, order)
            .order_by(meme::Column::Downvotes, sort.order.reverse().to_order()),
        MemeSortKey::Upvotes => select.order_by(meme::Column::Upvotes, order),
        MemeSortKey::Downvotes => select.order_by(meme::Column::Downvotes, order),
    };
    select.order_by_asc(meme::Column::Id)
}

fn escape_like(raw: &str) -> String {
    let mut escaped = String::with_capacity(raw.len());
    for c in raw.chars() {
        if matches!(c, '%' | '_' | '\\') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}

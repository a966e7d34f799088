//! Vote repository.
//!
//! Storage for meme and comment votes. The write methods take an explicit
//! connection so the vote service can run lock, read, write and resync in a
//! single transaction.

use std::sync::Arc;

use crate::entities::{
    Comment, CommentVote, Meme, MemeVote, VoteDirection, comment, comment_vote, meme, meme_vote,
};
use chrono::Utc;
use museum_common::{AppError, AppResult};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DatabaseConnection, DatabaseTransaction,
    EntityTrait, PaginatorTrait, QueryFilter, QuerySelect, Set, TransactionTrait,
    sea_query::Expr,
};
use serde::Serialize;

/// Kind of entity a vote is cast on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum VoteTargetKind {
    Meme,
    Comment,
}

impl VoteTargetKind {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Meme => "meme",
            Self::Comment => "comment",
        }
    }

    fn not_found(self, id: &str) -> AppError {
        match self {
            Self::Meme => AppError::MemeNotFound(id.to_string()),
            Self::Comment => AppError::CommentNotFound(id.to_string()),
        }
    }
}

/// A stored vote, independent of the target kind.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VoteRecord {
    pub id: String,
    pub user_id: String,
    pub target_id: String,
    pub direction: VoteDirection,
}

impl From<meme_vote::Model> for VoteRecord {
    fn from(vote: meme_vote::Model) -> Self {
        Self {
            id: vote.id,
            user_id: vote.user_id,
            target_id: vote.meme_id,
            direction: vote.direction,
        }
    }
}

impl From<comment_vote::Model> for VoteRecord {
    fn from(vote: comment_vote::Model) -> Self {
        Self {
            id: vote.id,
            user_id: vote.user_id,
            target_id: vote.comment_id,
            direction: vote.direction,
        }
    }
}

/// Denormalized counters stored on a vote target.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct VoteCounts {
    pub upvotes: i32,
    pub downvotes: i32,
}

impl VoteCounts {
    #[must_use]
    pub const fn score(self) -> i32 {
        self.upvotes - self.downvotes
    }

    #[must_use]
    pub const fn total(self) -> i32 {
        self.upvotes + self.downvotes
    }
}

/// Vote repository for database operations.
#[derive(Clone)]
pub struct VoteRepository {
    db: Arc<DatabaseConnection>,
}

impl VoteRepository {
    /// Create a new vote repository.
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

    /// Lock the target row (`FOR UPDATE` where supported) and return its
    /// author ID.
    pub async fn lock_target<C: ConnectionTrait>(
        &self,
        conn: &C,
        kind: VoteTargetKind,
        target_id: &str,
    ) -> AppResult<String> {
        target_author(conn, kind, target_id, true).await
    }

    /// Author ID of the target, without locking. Fails with the kind's
    /// not-found error when the target is missing.
    pub async fn find_target_author(
        &self,
        kind: VoteTargetKind,
        target_id: &str,
    ) -> AppResult<String> {
        target_author(self.db.as_ref(), kind, target_id, false).await
    }

    /// Find the vote a user cast on a target.
    pub async fn find<C: ConnectionTrait>(
        &self,
        conn: &C,
        kind: VoteTargetKind,
        user_id: &str,
        target_id: &str,
    ) -> AppResult<Option<VoteRecord>> {
        let record = match kind {
            VoteTargetKind::Meme => MemeVote::find()
                .filter(meme_vote::Column::UserId.eq(user_id))
                .filter(meme_vote::Column::MemeId.eq(target_id))
                .one(conn)
                .await
                .map_err(|e| AppError::Database(e.to_string()))?
                .map(VoteRecord::from),
            VoteTargetKind::Comment => CommentVote::find()
                .filter(comment_vote::Column::UserId.eq(user_id))
                .filter(comment_vote::Column::CommentId.eq(target_id))
                .one(conn)
                .await
                .map_err(|e| AppError::Database(e.to_string()))?
                .map(VoteRecord::from),
        };
        Ok(record)
    }

    /// Find a user's vote outside of any transaction.
    pub async fn find_for_user(
        &self,
        kind: VoteTargetKind,
        user_id: &str,
        target_id: &str,
    ) -> AppResult<Option<VoteRecord>> {
        self.find(self.db.as_ref(), kind, user_id, target_id).await
    }

    /// Insert a new vote.
    pub async fn insert<C: ConnectionTrait>(
        &self,
        conn: &C,
        kind: VoteTargetKind,
        record: VoteRecord,
    ) -> AppResult<()> {
        let now = Utc::now().fixed_offset();
        match kind {
            VoteTargetKind::Meme => {
                meme_vote::ActiveModel {
                    id: Set(record.id),
                    user_id: Set(record.user_id),
                    meme_id: Set(record.target_id),
                    direction: Set(record.direction),
                    created_at: Set(now),
                    updated_at: Set(None),
                }
                .insert(conn)
                .await
                .map_err(|e| AppError::Database(e.to_string()))?;
            }
            VoteTargetKind::Comment => {
                comment_vote::ActiveModel {
                    id: Set(record.id),
                    user_id: Set(record.user_id),
                    comment_id: Set(record.target_id),
                    direction: Set(record.direction),
                    created_at: Set(now),
                    updated_at: Set(None),
                }
                .insert(conn)
                .await
                .map_err(|e| AppError::Database(e.to_string()))?;
            }
        }
        Ok(())
    }

    /// Flip the direction of an existing vote in place.
    pub async fn set_direction<C: ConnectionTrait>(
        &self,
        conn: &C,
        kind: VoteTargetKind,
        vote_id: &str,
        direction: VoteDirection,
    ) -> AppResult<()> {
        let now = Utc::now().fixed_offset();
        match kind {
            VoteTargetKind::Meme => {
                MemeVote::update_many()
                    .col_expr(meme_vote::Column::Direction, Expr::value(direction))
                    .col_expr(meme_vote::Column::UpdatedAt, Expr::value(now))
                    .filter(meme_vote::Column::Id.eq(vote_id))
                    .exec(conn)
                    .await
                    .map_err(|e| AppError::Database(e.to_string()))?;
            }
            VoteTargetKind::Comment => {
                CommentVote::update_many()
                    .col_expr(comment_vote::Column::Direction, Expr::value(direction))
                    .col_expr(comment_vote::Column::UpdatedAt, Expr::value(now))
                    .filter(comment_vote::Column::Id.eq(vote_id))
                    .exec(conn)
                    .await
                    .map_err(|e| AppError::Database(e.to_string()))?;
            }
        }
        Ok(())
    }

    /// Delete a vote.
    pub async fn delete<C: ConnectionTrait>(
        &self,
        conn: &C,
        kind: VoteTargetKind,
        vote_id: &str,
    ) -> AppResult<()> {
        match kind {
            VoteTargetKind::Meme => {
                MemeVote::delete_by_id(vote_id)
                    .exec(conn)
                    .await
                    .map_err(|e| AppError::Database(e.to_string()))?;
            }
            VoteTargetKind::Comment => {
                CommentVote::delete_by_id(vote_id)
                    .exec(conn)
                    .await
                    .map_err(|e| AppError::Database(e.to_string()))?;
            }
        }
        Ok(())
    }

    /// Count the votes on a target in one direction.
    pub async fn count<C: ConnectionTrait>(
        &self,
        conn: &C,
        kind: VoteTargetKind,
        target_id: &str,
        direction: VoteDirection,
    ) -> AppResult<u64> {
        let count = match kind {
            VoteTargetKind::Meme => MemeVote::find()
                .filter(meme_vote::Column::MemeId.eq(target_id))
                .filter(meme_vote::Column::Direction.eq(direction))
                .count(conn)
                .await,
            VoteTargetKind::Comment => CommentVote::find()
                .filter(comment_vote::Column::CommentId.eq(target_id))
                .filter(comment_vote::Column::Direction.eq(direction))
                .count(conn)
                .await,
        };
        count.map_err(|e| AppError::Database(e.to_string()))
    }

    /// Overwrite both counters of a target in a single `UPDATE`.
    pub async fn write_counters<C: ConnectionTrait>(
        &self,
        conn: &C,
        kind: VoteTargetKind,
        target_id: &str,
        counts: VoteCounts,
    ) -> AppResult<()> {
        let result = match kind {
            VoteTargetKind::Meme => Meme::update_many()
                .col_expr(meme::Column::Upvotes, Expr::value(counts.upvotes))
                .col_expr(meme::Column::Downvotes, Expr::value(counts.downvotes))
                .filter(meme::Column::Id.eq(target_id))
                .exec(conn)
                .await,
            VoteTargetKind::Comment => Comment::update_many()
                .col_expr(comment::Column::Upvotes, Expr::value(counts.upvotes))
                .col_expr(comment::Column::Downvotes, Expr::value(counts.downvotes))
                .filter(comment::Column::Id.eq(target_id))
                .exec(conn)
                .await,
        }
        .map_err(|e| AppError::Database(e.to_string()))?;

        if result.rows_affected == 0 {
            return Err(kind.not_found(target_id));
        }
        Ok(())
    }
}

async fn target_author<C: ConnectionTrait>(
    conn: &C,
    kind: VoteTargetKind,
    target_id: &str,
    lock: bool,
) -> AppResult<String> {
    let author = match kind {
        VoteTargetKind::Meme => {
            let mut select = Meme::find_by_id(target_id);
            if lock {
                select = select.lock_exclusive();
            }
            select
                .one(conn)
                .await
                .map_err(|e| AppError::Database(e.to_string()))?
                .map(|m| m.user_id)
        }
        VoteTargetKind::Comment => {
            let mut select = Comment::find_by_id(target_id);
            if lock {
                select = select.lock_exclusive();
            }
            select
                .one(conn)
                .await
                .map_err(|e| AppError::Database(e.to_string()))?
                .map(|c| c.user_id)
        }
    };

    author.ok_or_else(|| kind.not_found(target_id))
}

//! Meme vote entity.
//!
//! One row per (user, meme). The row is the source of truth for the
//! `upvotes`/`downvotes` counters stored on the meme.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Direction of a vote.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, EnumIter, DeriveActiveEnum, Serialize, Deserialize,
)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(8))")]
#[serde(rename_all = "lowercase")]
pub enum VoteDirection {
    #[sea_orm(string_value = "up")]
    Upvote,
    #[sea_orm(string_value = "down")]
    Downvote,
}

impl VoteDirection {
    /// Maps the `isUpvote` flag used by the HTTP API.
    #[must_use]
    pub const fn from_is_upvote(is_upvote: bool) -> Self {
        if is_upvote { Self::Upvote } else { Self::Downvote }
    }

    #[must_use]
    pub const fn is_upvote(self) -> bool {
        matches!(self, Self::Upvote)
    }
}

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "meme_vote")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,

    /// Voter
    #[sea_orm(indexed)]
    pub user_id: String,

    #[sea_orm(indexed)]
    pub meme_id: String,

    pub direction: VoteDirection,

    pub created_at: DateTimeWithTimeZone,

    /// Set when the direction is flipped.
    #[sea_orm(nullable)]
    pub updated_at: Option<DateTimeWithTimeZone>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::meme::Entity",
        from = "Column::MemeId",
        to = "super::meme::Column::Id",
        on_delete = "Cascade"
    )]
    Meme,

    #[sea_orm(
        belongs_to = "super::user::Entity",
        from = "Column::UserId",
        to = "super::user::Column::Id",
        on_delete = "Cascade"
    )]
    User,
}

impl Related<super::meme::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Meme.def()
    }
}

impl Related<super::user::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::User.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

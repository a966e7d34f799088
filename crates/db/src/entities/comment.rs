//! Comment entity.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// A comment on a meme. Carries the same denormalized vote counters as memes.
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "comment")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,

    #[sea_orm(indexed)]
    pub meme_id: String,

    /// Author user ID.
    #[sea_orm(indexed)]
    pub user_id: String,

    /// Comment body (1-500 chars)
    #[sea_orm(column_type = "Text")]
    pub content: String,

    #[sea_orm(default_value = 0)]
    pub upvotes: i32,

    #[sea_orm(default_value = 0)]
    pub downvotes: i32,

    #[sea_orm(indexed)]
    pub created_at: DateTimeWithTimeZone,

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

    #[sea_orm(has_many = "super::comment_vote::Entity")]
    Votes,
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

impl Related<super::comment_vote::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Votes.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

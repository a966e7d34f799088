//! User entity.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "user")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,

    #[sea_orm(unique)]
    pub username: String,

    #[sea_orm(unique)]
    pub email: String,

    /// Given name
    pub name: String,

    pub surname: String,

    /// Argon2 PHC string
    #[serde(skip_serializing)]
    pub password_hash: String,

    /// Moderators may delete any comment.
    #[sea_orm(default_value = false)]
    pub is_admin: bool,

    pub created_at: DateTimeWithTimeZone,

    #[sea_orm(nullable)]
    pub updated_at: Option<DateTimeWithTimeZone>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::meme::Entity")]
    Memes,
    #[sea_orm(has_many = "super::comment::Entity")]
    Comments,
    #[sea_orm(has_many = "super::meme_vote::Entity")]
    MemeVotes,
    #[sea_orm(has_many = "super::comment_vote::Entity")]
    CommentVotes,
}

impl Related<super::meme::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Memes.def()
    }
}

impl Related<super::comment::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Comments.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

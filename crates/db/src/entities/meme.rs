//! Meme entity.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// An uploaded meme with its denormalized vote counters.
///
/// `upvotes` and `downvotes` mirror the rows of `meme_vote` for this meme and
/// are rewritten by the vote aggregator after every vote change. The score is
/// never stored; see [`Model::score`].
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "meme")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,

    /// Uploader user ID.
    #[sea_orm(indexed)]
    pub user_id: String,

    pub title: String,

    #[sea_orm(column_type = "Text", nullable)]
    pub description: Option<String>,

    /// Absolute http(s) URL of the image.
    pub image_url: String,

    #[sea_orm(default_value = 0)]
    pub upvotes: i32,

    #[sea_orm(default_value = 0)]
    pub downvotes: i32,

    #[sea_orm(default_value = 0)]
    pub likes: i32,

    #[sea_orm(default_value = 0)]
    pub views: i32,

    #[sea_orm(default_value = 0)]
    pub download_count: i32,

    #[sea_orm(default_value = true)]
    pub is_public: bool,

    /// Inactive memes are hidden from the detail view.
    #[sea_orm(default_value = true)]
    pub is_active: bool,

    /// Upload date, used for date filters and meme of the day.
    #[sea_orm(indexed)]
    pub uploaded_at: DateTimeWithTimeZone,

    #[sea_orm(nullable)]
    pub updated_at: Option<DateTimeWithTimeZone>,
}

impl Model {
    /// Net score: upvotes minus downvotes.
    #[must_use]
    pub const fn score(&self) -> i32 {
        self.upvotes - self.downvotes
    }
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::user::Entity",
        from = "Column::UserId",
        to = "super::user::Column::Id",
        on_delete = "Cascade"
    )]
    User,
    #[sea_orm(has_many = "super::meme_tag::Entity")]
    MemeTags,
    #[sea_orm(has_many = "super::comment::Entity")]
    Comments,
    #[sea_orm(has_many = "super::meme_vote::Entity")]
    Votes,
}

impl Related<super::user::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::User.def()
    }
}

impl Related<super::meme_tag::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::MemeTags.def()
    }
}

impl Related<super::tag::Entity> for Entity {
    fn to() -> RelationDef {
        super::meme_tag::Relation::Tag.def()
    }

    fn via() -> Option<RelationDef> {
        Some(super::meme_tag::Relation::Meme.def().rev())
    }
}

impl Related<super::comment::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Comments.def()
    }
}

impl Related<super::meme_vote::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Votes.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

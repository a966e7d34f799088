//! Database entities.

#![allow(missing_docs)]

pub mod comment;
pub mod comment_vote;
pub mod meme;
pub mod meme_tag;
pub mod meme_vote;
pub mod tag;
pub mod user;

pub use comment::Entity as Comment;
pub use comment_vote::Entity as CommentVote;
pub use meme::Entity as Meme;
pub use meme_tag::Entity as MemeTag;
pub use meme_vote::{Entity as MemeVote, VoteDirection};
pub use tag::Entity as Tag;
pub use user::Entity as User;

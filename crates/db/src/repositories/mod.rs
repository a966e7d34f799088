//! Database repositories.

pub mod comment;
pub mod meme;
pub mod tag;
pub mod user;
pub mod vote;

pub use comment::CommentRepository;
pub use meme::{MemeFilter, MemeRepository, MemeSort, MemeSortKey, SortOrder};
pub use tag::TagRepository;
pub use user::UserRepository;
pub use vote::{VoteCounts, VoteRecord, VoteRepository, VoteTargetKind};

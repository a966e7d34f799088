//! Business logic services.

pub mod aggregate;
pub mod comment;
pub mod meme;
pub mod tag;
pub mod token;
pub mod user;
pub mod vote;

pub use aggregate::VoteAggregator;
pub use comment::{CommentPage, CommentResponse, CommentService, CreateCommentInput};
pub use meme::{
    CreateMemeInput, ListMemesParams, MemeDetail, MemePage, MemeService, MemeSummary, TagSummary,
};
pub use tag::TagService;
pub use token::{Claims, TokenService};
pub use user::{LoginInput, LoginResponse, SignupInput, UserResponse, UserService};
pub use vote::{VoteAction, VoteOutcome, VoteService, VoteStatus, resolve_transition};

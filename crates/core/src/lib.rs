//! Core business logic for meme-museum.
//!
//! The vote engine lives in [`services::vote`] and [`services::aggregate`];
//! everything else is request-shaped glue around the repositories.

pub mod pagination;
pub mod services;

pub use pagination::{PageRequest, Pagination};
pub use services::*;

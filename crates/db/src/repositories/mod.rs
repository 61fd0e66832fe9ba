//! Repository layer.
//!
//! Each repository is a zero-sized struct providing async methods that
//! accept `&PgPool` as the first argument.

pub mod page_repo;
pub mod revision_repo;
pub mod search_repo;
pub mod user_repo;

pub use page_repo::PageRepo;
pub use revision_repo::RevisionRepo;
pub use search_repo::SearchRepo;
pub use user_repo::UserRepo;

//! Database row structs.
//!
//! Each submodule holds `FromRow` structs matching table rows, plus the
//! conversions into `agora-core` domain types.

pub mod page;
pub mod revision;
pub mod search;
pub mod user;

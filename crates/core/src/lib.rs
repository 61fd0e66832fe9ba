pub mod content_parser;
pub mod directory;
pub mod error;
pub mod memory;
pub mod moderation;
pub mod page;
pub mod revision;
pub mod roles;
pub mod search;
pub mod store;
pub mod types;

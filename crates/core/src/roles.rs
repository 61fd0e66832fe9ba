//! Well-known role names and the acting-user record.
//!
//! Authentication happens outside this crate; callers hand the engine an
//! [`Actor`] they already trust.

use serde::{Deserialize, Serialize};

use crate::types::DbId;

pub const ROLE_ADMIN: &str = "admin";
pub const ROLE_USER: &str = "user";

/// The user performing an operation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Actor {
    pub id: DbId,
    pub role: String,
}

impl Actor {
    pub fn new(id: DbId, role: impl Into<String>) -> Self {
        Self {
            id,
            role: role.into(),
        }
    }

    pub fn admin(id: DbId) -> Self {
        Self::new(id, ROLE_ADMIN)
    }

    pub fn user(id: DbId) -> Self {
        Self::new(id, ROLE_USER)
    }

    pub fn is_admin(&self) -> bool {
        self.role == ROLE_ADMIN
    }
}

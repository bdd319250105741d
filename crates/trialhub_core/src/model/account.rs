//! Account records that owners can point at.
//!
//! Authentication is out of scope: an `Actor` is an already-authenticated
//! user handed in by the caller.

use crate::model::ids::{OrganizationId, TeamId, UserId};
use crate::model::owner::OwnerTarget;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: UserId,
    pub username: String,
    pub email: Option<String>,
}

impl User {
    pub fn owner_target(&self) -> OwnerTarget {
        OwnerTarget::User(self.id)
    }

    /// Builds the actor handle used by request-scoped service calls.
    pub fn as_actor(&self) -> Actor {
        Actor {
            user_id: self.id,
            username: self.username.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Organization {
    pub id: OrganizationId,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Team {
    pub id: TeamId,
    pub name: String,
    pub organization_id: Option<OrganizationId>,
}

/// Authenticated user performing a request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Actor {
    pub user_id: UserId,
    pub username: String,
}

//! Owner domain model.
//!
//! # Responsibility
//! - Describe who is accountable for an ownable entity.
//! - Keep the owner target a closed, typed set instead of a generic
//!   content-type/id pair.
//!
//! # Invariants
//! - `Owner.name` is globally unique (enforced by storage).
//! - At most one owner row exists per `OwnerTarget` (enforced by storage).
//! - Every persisted ownable entity points to exactly one owner.

use crate::model::ids::{OrganizationId, OwnerId, ProjectId, TeamId, UserId};
use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter};

/// Category of the party behind an owner.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OwnerKind {
    Organization,
    Team,
    User,
}

impl OwnerKind {
    /// All owner kinds in storage-tag order.
    pub const ALL: [OwnerKind; 3] = [Self::Organization, Self::Team, Self::User];

    /// Stable storage tag.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Organization => "organization",
            Self::Team => "team",
            Self::User => "user",
        }
    }

    /// Parses a storage tag.
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "organization" => Some(Self::Organization),
            "team" => Some(Self::Team),
            "user" => Some(Self::User),
            _ => None,
        }
    }
}

impl Display for OwnerKind {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Concrete record an owner points at.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", content = "id", rename_all = "snake_case")]
pub enum OwnerTarget {
    User(UserId),
    Team(TeamId),
    Organization(OrganizationId),
}

impl OwnerTarget {
    pub fn kind(&self) -> OwnerKind {
        match self {
            Self::User(_) => OwnerKind::User,
            Self::Team(_) => OwnerKind::Team,
            Self::Organization(_) => OwnerKind::Organization,
        }
    }

    /// Target id in storage form.
    pub fn id_text(&self) -> String {
        match self {
            Self::User(id) => id.to_string(),
            Self::Team(id) => id.to_string(),
            Self::Organization(id) => id.to_string(),
        }
    }
}

impl Display for OwnerTarget {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{}", self.kind(), self.id_text())
    }
}

/// Responsible party for ownable entities.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Owner {
    pub id: OwnerId,
    /// Globally unique, human-assigned handle.
    pub name: String,
    pub target: OwnerTarget,
}

impl Owner {
    pub fn new(name: impl Into<String>, target: OwnerTarget) -> Self {
        Self {
            id: OwnerId::new(),
            name: name.into(),
            target,
        }
    }

    pub fn kind(&self) -> OwnerKind {
        self.target.kind()
    }
}

/// Storage address of an ownable entity.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OwnableRef {
    Project(ProjectId),
}

/// Entity carrying exactly one owner pointer.
pub trait Ownable {
    /// Returns the storage address used when persisting the owner pointer.
    fn ownable_ref(&self) -> OwnableRef;
    /// Replaces the in-memory owner pointer.
    fn assign_owner(&mut self, owner: &Owner);
}

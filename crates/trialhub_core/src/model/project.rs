//! Project domain model.
//!
//! # Responsibility
//! - Define the ownable project record and its read projections.
//!
//! # Invariants
//! - A persisted project always carries an owner pointer; drafts may not.
//! - `(owner_id, name)` is unique in storage.
//! - `user_id` is the creating user and never changes.

use crate::model::ids::{OwnerId, ProjectId, UserId};
use crate::model::lifecycle::DependentKind;
use crate::model::owner::{Ownable, OwnableRef, Owner};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Project {
    pub id: ProjectId,
    pub name: String,
    pub description: Option<String>,
    pub is_public: bool,
    /// Creating user.
    pub user_id: UserId,
    /// `None` only for drafts that were never assigned an owner.
    pub owner_id: Option<OwnerId>,
    /// Epoch milliseconds.
    pub created_at: i64,
    /// Epoch milliseconds.
    pub updated_at: i64,
}

impl Project {
    /// Creates an unsaved, owner-less project.
    ///
    /// Timestamps are filled by storage on insert.
    pub fn draft(name: impl Into<String>, user_id: UserId) -> Self {
        Self {
            id: ProjectId::new(),
            name: name.into(),
            description: None,
            is_public: true,
            user_id,
            owner_id: None,
            created_at: 0,
            updated_at: 0,
        }
    }
}

impl Ownable for Project {
    fn ownable_ref(&self) -> OwnableRef {
        OwnableRef::Project(self.id)
    }

    fn assign_owner(&mut self, owner: &Owner) {
        self.owner_id = Some(owner.id);
    }
}

/// Detail projection: project, its owner and dependent counts.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ProjectDetail {
    pub project: Project,
    pub owner: Owner,
    pub dependent_counts: BTreeMap<DependentKind, u64>,
}

impl ProjectDetail {
    pub fn count(&self, kind: DependentKind) -> u64 {
        self.dependent_counts.get(&kind).copied().unwrap_or(0)
    }
}

/// List projection: a project plus whether the calling user bookmarked it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BookmarkedProject {
    #[serde(flatten)]
    pub project: Project,
    pub bookmarked: bool,
}

/// Fields accepted when creating a project.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct CreateProjectRequest {
    pub name: Option<String>,
    pub description: Option<String>,
    /// Defaults to public when absent.
    pub is_public: Option<bool>,
}

/// Partial update; absent fields are left unchanged.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct ProjectPatch {
    pub name: Option<String>,
    pub description: Option<String>,
    pub is_public: Option<bool>,
}

impl ProjectPatch {
    pub fn is_empty(&self) -> bool {
        self.name.is_none() && self.description.is_none() && self.is_public.is_none()
    }
}

//! Error types for `gemba-core`.

use std::fmt;

use thiserror::Error;
use uuid::Uuid;

/// The entity an error refers to, used when rendering messages.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Entity {
  Category,
  Skill,
  Prerequisite,
  Department,
  User,
  Role,
  Project,
  Attachment,
}

impl Entity {
  pub fn label(self) -> &'static str {
    match self {
      Self::Category => "category",
      Self::Skill => "skill",
      Self::Prerequisite => "prerequisite",
      Self::Department => "department",
      Self::User => "user",
      Self::Role => "role",
      Self::Project => "project",
      Self::Attachment => "attachment",
    }
  }
}

impl fmt::Display for Entity {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(self.label())
  }
}

#[derive(Debug, Error)]
pub enum Error {
  #[error("{0}")]
  Invalid(String),

  #[error("a {entity} with this {field} already exists")]
  Duplicate { entity: Entity, field: &'static str },

  #[error("cannot delete {entity} with {dependents}; remove them first")]
  DeleteBlocked {
    entity:     Entity,
    dependents: &'static str,
  },

  #[error("a skill cannot be its own prerequisite")]
  SelfPrerequisite,

  #[error("this prerequisite already exists")]
  DuplicatePrerequisite,

  #[error("{entity} not found: {id}")]
  NotFound { entity: Entity, id: Uuid },

  #[error("unknown permission token: {0:?}")]
  UnknownPermission(String),

  #[error("serialization error: {0}")]
  Serialization(#[from] serde_json::Error),

  /// Backend failure that carries no domain meaning (I/O, decode, SQL).
  #[error("storage error: {0}")]
  Storage(String),
}

impl Error {
  pub fn invalid(message: impl Into<String>) -> Self {
    Self::Invalid(message.into())
  }

  pub fn duplicate(entity: Entity, field: &'static str) -> Self {
    Self::Duplicate { entity, field }
  }

  pub fn not_found(entity: Entity, id: Uuid) -> Self {
    Self::NotFound { entity, id }
  }
}

pub type Result<T, E = Error> = std::result::Result<T, E>;

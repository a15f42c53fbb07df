//! Organizational directory — roles, departments, users.
//!
//! These are flat relational rows with natural-key uniqueness (name, code,
//! employee id, email); no hierarchy. Users are never hard-deleted, they are
//! deactivated instead, so audit history keeps resolving.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{error::Result, permission::PermissionSet, validate};

// ─── Roles ───────────────────────────────────────────────────────────────────

/// A named permission bundle. System roles are seeded and protected; the
/// HTTP surface reads them but never writes them.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Role {
  pub id:             Uuid,
  pub name:           String,
  pub description:    Option<String>,
  pub permissions:    PermissionSet,
  pub is_system_role: bool,
  pub created_at:     DateTime<Utc>,
}

/// Input for creating a role. Only seeding uses this; roles have no write
/// surface over HTTP.
#[derive(Debug, Clone)]
pub struct NewRole {
  pub name:           String,
  pub description:    Option<String>,
  pub permissions:    PermissionSet,
  pub is_system_role: bool,
}

impl NewRole {
  pub fn validate(&self) -> Result<()> {
    validate::length("name", &self.name, 1, 100)?;
    if let Some(description) = &self.description {
      validate::max_length("description", description, 500)?;
    }
    Ok(())
  }
}

// ─── Departments ─────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Department {
  pub id:          Uuid,
  pub name:        String,
  pub code:        String,
  pub description: Option<String>,
  pub manager_id:  Option<Uuid>,
  pub is_active:   bool,
  pub created_at:  DateTime<Utc>,
  pub updated_at:  DateTime<Utc>,
}

/// Input for creating a department. Code falls back to a derivation from the
/// name.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewDepartment {
  pub name:        String,
  #[serde(default)]
  pub code:        Option<String>,
  #[serde(default)]
  pub description: Option<String>,
  #[serde(default)]
  pub manager_id:  Option<Uuid>,
  #[serde(default)]
  pub is_active:   Option<bool>,
}

impl NewDepartment {
  pub fn named(name: impl Into<String>) -> Self {
    Self { name: name.into(), ..Self::default() }
  }

  pub fn validate(&self) -> Result<()> {
    validate::length("name", &self.name, 1, 100)?;
    if let Some(code) = &self.code {
      validate::code("code", code, 10, false)?;
    }
    if let Some(description) = &self.description {
      validate::max_length("description", description, 500)?;
    }
    Ok(())
  }
}

/// Partial update; an empty description clears it, `manager_id` with the nil
/// uuid clears the manager.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DepartmentUpdate {
  #[serde(default)]
  pub name:        Option<String>,
  #[serde(default)]
  pub code:        Option<String>,
  #[serde(default)]
  pub description: Option<String>,
  #[serde(default)]
  pub manager_id:  Option<Uuid>,
  #[serde(default)]
  pub is_active:   Option<bool>,
}

impl DepartmentUpdate {
  pub fn validate(&self) -> Result<()> {
    if let Some(name) = &self.name {
      validate::length("name", name, 1, 100)?;
    }
    if let Some(code) = &self.code {
      validate::code("code", code, 10, false)?;
    }
    if let Some(description) = &self.description {
      validate::max_length("description", description, 500)?;
    }
    Ok(())
  }
}

/// Listed department row plus aggregate display fields.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DepartmentSummary {
  #[serde(flatten)]
  pub department:    Department,
  pub member_count:  i64,
  pub project_count: i64,
  pub manager_name:  Option<String>,
}

/// Full department read model.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DepartmentDetail {
  #[serde(flatten)]
  pub department: Department,
  pub manager:    Option<UserSummary>,
  pub members:    Vec<UserSummary>,
}

// ─── Users ───────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
  pub id:                    Uuid,
  pub employee_id:           String,
  pub name:                  String,
  pub email:                 Option<String>,
  /// Argon2id PHC string. Never serialized.
  #[serde(skip_serializing, default)]
  pub pin_hash:              String,
  pub role_id:               Uuid,
  pub department_id:         Option<Uuid>,
  pub is_active:             bool,
  pub failed_login_attempts: i64,
  pub locked_until:          Option<DateTime<Utc>>,
  pub created_at:            DateTime<Utc>,
  pub updated_at:            DateTime<Utc>,
}

/// Input for creating a user. PINs are hashed before they get here; the raw
/// PIN never crosses the store boundary.
#[derive(Debug, Clone)]
pub struct NewUser {
  pub employee_id:   String,
  pub name:          String,
  pub email:         Option<String>,
  pub pin_hash:      String,
  pub role_id:       Uuid,
  pub department_id: Option<Uuid>,
  pub is_active:     Option<bool>,
}

impl NewUser {
  pub fn validate(&self) -> Result<()> {
    validate::code("employeeId", &self.employee_id, 20, true)?;
    validate::length("name", &self.name, 1, 100)?;
    if let Some(email) = &self.email {
      validate::email(email)?;
    }
    Ok(())
  }
}

/// Partial update; the employee id is immutable after creation. An empty
/// email clears it, `department_id` with the nil uuid clears the department.
#[derive(Debug, Clone, Default)]
pub struct UserUpdate {
  pub name:          Option<String>,
  pub email:         Option<String>,
  pub pin_hash:      Option<String>,
  pub role_id:       Option<Uuid>,
  pub department_id: Option<Uuid>,
  pub is_active:     Option<bool>,
}

impl UserUpdate {
  pub fn validate(&self) -> Result<()> {
    if let Some(name) = &self.name {
      validate::length("name", name, 1, 100)?;
    }
    if let Some(email) = &self.email {
      if !email.is_empty() {
        validate::email(email)?;
      }
    }
    Ok(())
  }
}

/// Filters for listing users.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserQuery {
  #[serde(default)]
  pub search:        Option<String>,
  #[serde(default, alias = "department")]
  pub department_id: Option<Uuid>,
  #[serde(default, alias = "role")]
  pub role_id:       Option<Uuid>,
  #[serde(default)]
  pub active:        Option<bool>,
}

/// Listed user row plus joined display fields. Carries no PIN hash at all.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UserSummary {
  pub id:              Uuid,
  pub employee_id:     String,
  pub name:            String,
  pub email:           Option<String>,
  pub role_id:         Uuid,
  pub role_name:       String,
  pub department_id:   Option<Uuid>,
  pub department_name: Option<String>,
  pub is_active:       bool,
  pub created_at:      DateTime<Utc>,
}

// ─── Tests ───────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
  use super::*;

  fn new_user() -> NewUser {
    NewUser {
      employee_id:   "EMP-100".into(),
      name:          "Pat Fitter".into(),
      email:         Some("pat@factory.local".into()),
      pin_hash:      "$argon2id$v=19$stub".into(),
      role_id:       Uuid::new_v4(),
      department_id: None,
      is_active:     None,
    }
  }

  #[test]
  fn user_validation() {
    assert!(new_user().validate().is_ok());

    let mut input = new_user();
    input.employee_id = "emp 100".into();
    assert!(input.validate().is_err());

    let mut input = new_user();
    input.email = Some("not-an-email".into());
    assert!(input.validate().is_err());
  }

  #[test]
  fn pin_hash_never_serializes() {
    let user = User {
      id:                    Uuid::new_v4(),
      employee_id:           "EMP-100".into(),
      name:                  "Pat Fitter".into(),
      email:                 None,
      pin_hash:              "$argon2id$v=19$secret".into(),
      role_id:               Uuid::new_v4(),
      department_id:         None,
      is_active:             true,
      failed_login_attempts: 0,
      locked_until:          None,
      created_at:            Utc::now(),
      updated_at:            Utc::now(),
    };
    let json = serde_json::to_string(&user).unwrap();
    assert!(!json.contains("argon2id"));
    assert!(!json.contains("pinHash"));
  }
}

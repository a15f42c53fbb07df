//! System settings, audit entries, attachment metadata.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

use crate::error::{Error, Result};

// ─── Settings ────────────────────────────────────────────────────────────────

/// The whole settings document. Stored as one JSON value; reads merge the
/// stored document over these defaults, so new fields pick up their default
/// until an admin writes them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SystemSettings {
  pub session:       SessionSettings,
  pub notifications: NotificationSettings,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SessionSettings {
  pub idle_timeout_hours: i64,
  pub max_duration_hours: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct NotificationSettings {
  pub email_enabled: bool,
}

impl Default for SessionSettings {
  fn default() -> Self {
    Self { idle_timeout_hours: 8, max_duration_hours: 24 }
  }
}

impl Default for NotificationSettings {
  fn default() -> Self { Self { email_enabled: false } }
}

impl Default for SystemSettings {
  fn default() -> Self {
    Self {
      session:       SessionSettings::default(),
      notifications: NotificationSettings::default(),
    }
  }
}

impl SystemSettings {
  pub fn validate(&self) -> Result<()> {
    crate::validate::range(
      "session.idleTimeoutHours",
      self.session.idle_timeout_hours,
      1,
      168,
    )?;
    crate::validate::range(
      "session.maxDurationHours",
      self.session.max_duration_hours,
      1,
      168,
    )?;
    Ok(())
  }
}

// ─── Audit log ───────────────────────────────────────────────────────────────

/// The entity class an audit entry or attachment refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntityKind {
  User,
  Project,
  Skill,
  SkillCategory,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuditEntry {
  pub id:          Uuid,
  pub user_id:     Option<Uuid>,
  #[serde(rename = "entityType")]
  pub entity_kind: EntityKind,
  pub entity_id:   Uuid,
  pub action:      String,
  pub details:     Option<Value>,
  pub created_at:  DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewAuditEntry {
  #[serde(default)]
  pub user_id:     Option<Uuid>,
  #[serde(rename = "entityType")]
  pub entity_kind: EntityKind,
  pub entity_id:   Uuid,
  pub action:      String,
  #[serde(default)]
  pub details:     Option<Value>,
}

/// Filters for listing audit entries, newest first.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuditQuery {
  #[serde(default, rename = "entityType")]
  pub entity_kind: Option<EntityKind>,
  #[serde(default)]
  pub entity_id:   Option<Uuid>,
  #[serde(default, alias = "user")]
  pub user_id:     Option<Uuid>,
  #[serde(default)]
  pub limit:       Option<i64>,
}

// ─── Attachments ─────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AttachmentKind {
  Avatar,
  Photo,
  Document,
}

/// Metadata record only; the binary lives in external object storage at
/// `storage_path`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Attachment {
  pub id:           Uuid,
  #[serde(rename = "entityType")]
  pub entity_kind:  EntityKind,
  pub entity_id:    Uuid,
  pub kind:         AttachmentKind,
  pub filename:     String,
  pub content_type: String,
  pub size_bytes:   i64,
  pub storage_path: String,
  pub uploaded_by:  Option<Uuid>,
  pub created_at:   DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewAttachment {
  #[serde(rename = "entityType")]
  pub entity_kind:  EntityKind,
  pub entity_id:    Uuid,
  pub kind:         AttachmentKind,
  pub filename:     String,
  pub content_type: String,
  pub size_bytes:   i64,
  pub storage_path: String,
  #[serde(default)]
  pub uploaded_by:  Option<Uuid>,
}

impl NewAttachment {
  pub fn validate(&self) -> Result<()> {
    if self.filename.is_empty() {
      return Err(Error::invalid("filename must not be empty".to_owned()));
    }
    if self.size_bytes <= 0 {
      return Err(Error::invalid("sizeBytes must be positive".to_owned()));
    }
    if self.storage_path.is_empty() {
      return Err(Error::invalid("storagePath must not be empty".to_owned()));
    }
    Ok(())
  }
}

// ─── Tests ───────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn settings_defaults() {
    let settings = SystemSettings::default();
    assert_eq!(settings.session.idle_timeout_hours, 8);
    assert_eq!(settings.session.max_duration_hours, 24);
    assert!(!settings.notifications.email_enabled);
  }

  #[test]
  fn partial_settings_merge_over_defaults() {
    let settings: SystemSettings =
      serde_json::from_str(r#"{"session":{"maxDurationHours":48}}"#).unwrap();
    assert_eq!(settings.session.max_duration_hours, 48);
    assert_eq!(settings.session.idle_timeout_hours, 8);
    assert!(!settings.notifications.email_enabled);
  }

  #[test]
  fn settings_bounds() {
    let mut settings = SystemSettings::default();
    settings.session.max_duration_hours = 0;
    assert!(settings.validate().is_err());
    settings.session.max_duration_hours = 169;
    assert!(settings.validate().is_err());
    settings.session.max_duration_hours = 24;
    assert!(settings.validate().is_ok());
  }
}

//! Projects — flat rows tying work to departments and owners.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{error::Result, validate};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProjectStatus {
  #[default]
  Draft,
  Active,
  OnHold,
  Completed,
  Cancelled,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Project {
  pub id:            Uuid,
  pub name:          String,
  pub description:   Option<String>,
  pub status:        ProjectStatus,
  pub department_id: Option<Uuid>,
  pub owner_id:      Option<Uuid>,
  pub start_date:    Option<NaiveDate>,
  pub end_date:      Option<NaiveDate>,
  pub is_active:     bool,
  pub created_at:    DateTime<Utc>,
  pub updated_at:    DateTime<Utc>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewProject {
  pub name:          String,
  #[serde(default)]
  pub description:   Option<String>,
  #[serde(default)]
  pub status:        Option<ProjectStatus>,
  #[serde(default)]
  pub department_id: Option<Uuid>,
  #[serde(default)]
  pub owner_id:      Option<Uuid>,
  #[serde(default)]
  pub start_date:    Option<NaiveDate>,
  #[serde(default)]
  pub end_date:      Option<NaiveDate>,
}

impl NewProject {
  pub fn named(name: impl Into<String>) -> Self {
    Self { name: name.into(), ..Self::default() }
  }

  pub fn validate(&self) -> Result<()> {
    validate::length("name", &self.name, 1, 200)?;
    if let Some(description) = &self.description {
      validate::max_length("description", description, 2000)?;
    }
    Ok(())
  }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProjectUpdate {
  #[serde(default)]
  pub name:          Option<String>,
  #[serde(default)]
  pub description:   Option<String>,
  #[serde(default)]
  pub status:        Option<ProjectStatus>,
  #[serde(default)]
  pub department_id: Option<Uuid>,
  #[serde(default)]
  pub owner_id:      Option<Uuid>,
  #[serde(default)]
  pub start_date:    Option<NaiveDate>,
  #[serde(default)]
  pub end_date:      Option<NaiveDate>,
  #[serde(default)]
  pub is_active:     Option<bool>,
}

impl ProjectUpdate {
  pub fn validate(&self) -> Result<()> {
    if let Some(name) = &self.name {
      validate::length("name", name, 1, 200)?;
    }
    if let Some(description) = &self.description {
      validate::max_length("description", description, 2000)?;
    }
    Ok(())
  }
}

/// Filters for listing projects.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProjectQuery {
  #[serde(default)]
  pub search:        Option<String>,
  #[serde(default)]
  pub status:        Option<ProjectStatus>,
  #[serde(default, alias = "department")]
  pub department_id: Option<Uuid>,
  #[serde(default, alias = "owner")]
  pub owner_id:      Option<Uuid>,
}

/// Listed project row plus joined display fields.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProjectSummary {
  #[serde(flatten)]
  pub project:         Project,
  pub owner_name:      Option<String>,
  pub department_name: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProjectStats {
  pub total:     i64,
  pub draft:     i64,
  pub active:    i64,
  pub completed: i64,
}

//! Skill categories — the two-level department/area tree.
//!
//! A category's kind is derived from parent presence at creation (no parent
//! means department, a parent means area) and never changes afterwards, so
//! the department/area split survives renames.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{error::Result, skill::Skill, tree::TreeRow, validate};

/// The two conceptual category levels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CategoryKind {
  Department,
  Area,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Category {
  pub id:          Uuid,
  pub name:        String,
  pub code:        String,
  pub slug:        String,
  pub description: Option<String>,
  pub color:       Option<String>,
  pub kind:        CategoryKind,
  pub parent_id:   Option<Uuid>,
  pub path:        String,
  pub depth:       i64,
  pub sort_order:  i64,
  pub is_active:   bool,
  pub created_at:  DateTime<Utc>,
  pub updated_at:  DateTime<Utc>,
}

impl TreeRow for Category {
  fn id(&self) -> Uuid { self.id }

  fn parent_id(&self) -> Option<Uuid> { self.parent_id }
}

/// Input for creating a category. Slug and code fall back to derivations
/// from the name; kind and placement are derived from the parent.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewCategory {
  pub name:        String,
  #[serde(default)]
  pub code:        Option<String>,
  #[serde(default)]
  pub slug:        Option<String>,
  #[serde(default)]
  pub description: Option<String>,
  #[serde(default)]
  pub color:       Option<String>,
  #[serde(default)]
  pub parent_id:   Option<Uuid>,
  #[serde(default)]
  pub sort_order:  Option<i64>,
  #[serde(default)]
  pub is_active:   Option<bool>,
}

impl NewCategory {
  pub fn named(name: impl Into<String>) -> Self {
    Self { name: name.into(), ..Self::default() }
  }

  pub fn under(name: impl Into<String>, parent_id: Uuid) -> Self {
    Self {
      name: name.into(),
      parent_id: Some(parent_id),
      ..Self::default()
    }
  }

  pub fn validate(&self) -> Result<()> {
    validate::length("name", &self.name, 1, 100)?;
    if let Some(code) = &self.code {
      validate::code("code", code, 10, false)?;
    }
    if let Some(slug) = &self.slug {
      validate::slug(slug)?;
    }
    if let Some(description) = &self.description {
      validate::max_length("description", description, 500)?;
    }
    if let Some(color) = &self.color {
      validate::color(color)?;
    }
    if let Some(sort_order) = self.sort_order {
      validate::non_negative("sortOrder", sort_order)?;
    }
    Ok(())
  }
}

/// Partial update. `None` leaves a field untouched; for the optional text
/// fields (description, color) an empty string clears the stored value.
/// Kind and parent are immutable, so they do not appear here.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CategoryUpdate {
  #[serde(default)]
  pub name:        Option<String>,
  #[serde(default)]
  pub code:        Option<String>,
  #[serde(default)]
  pub slug:        Option<String>,
  #[serde(default)]
  pub description: Option<String>,
  #[serde(default)]
  pub color:       Option<String>,
  #[serde(default)]
  pub sort_order:  Option<i64>,
  #[serde(default)]
  pub is_active:   Option<bool>,
}

impl CategoryUpdate {
  pub fn validate(&self) -> Result<()> {
    if let Some(name) = &self.name {
      validate::length("name", name, 1, 100)?;
    }
    if let Some(code) = &self.code {
      validate::code("code", code, 10, false)?;
    }
    if let Some(slug) = &self.slug {
      validate::slug(slug)?;
    }
    if let Some(description) = &self.description {
      validate::max_length("description", description, 500)?;
    }
    if let Some(color) = &self.color {
      if !color.is_empty() {
        validate::color(color)?;
      }
    }
    if let Some(sort_order) = self.sort_order {
      validate::non_negative("sortOrder", sort_order)?;
    }
    Ok(())
  }
}

/// Filters for listing categories.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CategoryQuery {
  #[serde(default)]
  pub kind:      Option<CategoryKind>,
  #[serde(default)]
  pub active:    Option<bool>,
  #[serde(default)]
  pub parent_id: Option<Uuid>,
}

/// Listed category row plus direct child/skill counts.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CategorySummary {
  #[serde(flatten)]
  pub category:    Category,
  pub child_count: i64,
  pub skill_count: i64,
}

impl TreeRow for CategorySummary {
  fn id(&self) -> Uuid { self.category.id }

  fn parent_id(&self) -> Option<Uuid> { self.category.parent_id }
}

/// Full category read model: the row plus its immediate tree neighborhood.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CategoryDetail {
  #[serde(flatten)]
  pub category: Category,
  pub parent:   Option<Category>,
  pub children: Vec<Category>,
  pub skills:   Vec<Skill>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CategoryStats {
  pub total:       i64,
  pub departments: i64,
  pub areas:       i64,
  pub active:      i64,
}

// ─── Tests ───────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn new_category_validation() {
    assert!(NewCategory::named("Safety").validate().is_ok());
    assert!(NewCategory::named("").validate().is_err());

    let mut input = NewCategory::named("Safety");
    input.code = Some("safety".into());
    assert!(input.validate().is_err());

    let mut input = NewCategory::named("Safety");
    input.color = Some("red".into());
    assert!(input.validate().is_err());

    let mut input = NewCategory::named("Safety");
    input.sort_order = Some(-1);
    assert!(input.validate().is_err());
  }

  #[test]
  fn update_validates_present_fields_only() {
    assert!(CategoryUpdate::default().validate().is_ok());

    let update = CategoryUpdate { name: Some(String::new()), ..Default::default() };
    assert!(update.validate().is_err());

    // Empty color means "clear", so it passes the shape check.
    let update = CategoryUpdate { color: Some(String::new()), ..Default::default() };
    assert!(update.validate().is_ok());
  }
}

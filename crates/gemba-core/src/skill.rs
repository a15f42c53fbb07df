//! Skills — the unbounded-depth training tree, plus prerequisite edges.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{error::Result, tree::TreeRow, validate};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Skill {
  pub id:                            Uuid,
  pub name:                          String,
  pub code:                          String,
  pub description:                   Option<String>,
  pub category_id:                   Option<Uuid>,
  pub parent_skill_id:               Option<Uuid>,
  pub path:                          String,
  pub depth:                         i64,
  pub has_proficiency_levels:        bool,
  pub max_proficiency_level:         i64,
  pub requires_certification:        bool,
  /// `None` means a certification never expires.
  pub certification_validity_months: Option<i64>,
  pub required_training_hours:       Option<i64>,
  pub allows_ojt:                    bool,
  pub allows_classroom:              bool,
  pub allows_online:                 bool,
  pub is_active:                     bool,
  pub created_at:                    DateTime<Utc>,
  pub updated_at:                    DateTime<Utc>,
}

impl TreeRow for Skill {
  fn id(&self) -> Uuid { self.id }

  fn parent_id(&self) -> Option<Uuid> { self.parent_skill_id }
}

/// Input for creating a skill. Unlike categories, the code is always caller
/// supplied. A skill created under a parent inherits the parent's category
/// when none is given.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewSkill {
  pub name:                          String,
  pub code:                          String,
  #[serde(default)]
  pub description:                   Option<String>,
  #[serde(default)]
  pub category_id:                   Option<Uuid>,
  #[serde(default)]
  pub parent_skill_id:               Option<Uuid>,
  #[serde(default)]
  pub has_proficiency_levels:        Option<bool>,
  #[serde(default)]
  pub max_proficiency_level:         Option<i64>,
  #[serde(default)]
  pub requires_certification:        Option<bool>,
  #[serde(default)]
  pub certification_validity_months: Option<i64>,
  #[serde(default)]
  pub required_training_hours:       Option<i64>,
  #[serde(default)]
  pub allows_ojt:                    Option<bool>,
  #[serde(default)]
  pub allows_classroom:              Option<bool>,
  #[serde(default)]
  pub allows_online:                 Option<bool>,
  #[serde(default)]
  pub is_active:                     Option<bool>,
}

impl NewSkill {
  pub fn new(name: impl Into<String>, code: impl Into<String>) -> Self {
    Self {
      name:                          name.into(),
      code:                          code.into(),
      description:                   None,
      category_id:                   None,
      parent_skill_id:               None,
      has_proficiency_levels:        None,
      max_proficiency_level:         None,
      requires_certification:        None,
      certification_validity_months: None,
      required_training_hours:       None,
      allows_ojt:                    None,
      allows_classroom:              None,
      allows_online:                 None,
      is_active:                     None,
    }
  }

  pub fn validate(&self) -> Result<()> {
    validate::length("name", &self.name, 1, 200)?;
    validate::code("code", &self.code, 20, true)?;
    if let Some(description) = &self.description {
      validate::max_length("description", description, 2000)?;
    }
    if let Some(level) = self.max_proficiency_level {
      validate::range("maxProficiencyLevel", level, 1, 10)?;
    }
    if let Some(months) = self.certification_validity_months {
      validate::range("certificationValidityMonths", months, 1, 120)?;
    }
    if let Some(hours) = self.required_training_hours {
      validate::range("requiredTrainingHours", hours, 0, 1000)?;
    }
    Ok(())
  }
}

/// Partial update. The parent is immutable; `category_id` reassigns the
/// category (clearing it is not supported over this surface).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SkillUpdate {
  #[serde(default)]
  pub name:                          Option<String>,
  #[serde(default)]
  pub code:                          Option<String>,
  #[serde(default)]
  pub description:                   Option<String>,
  #[serde(default)]
  pub category_id:                   Option<Uuid>,
  #[serde(default)]
  pub has_proficiency_levels:        Option<bool>,
  #[serde(default)]
  pub max_proficiency_level:         Option<i64>,
  #[serde(default)]
  pub requires_certification:        Option<bool>,
  #[serde(default)]
  pub certification_validity_months: Option<i64>,
  #[serde(default)]
  pub required_training_hours:       Option<i64>,
  #[serde(default)]
  pub allows_ojt:                    Option<bool>,
  #[serde(default)]
  pub allows_classroom:              Option<bool>,
  #[serde(default)]
  pub allows_online:                 Option<bool>,
  #[serde(default)]
  pub is_active:                     Option<bool>,
}

impl SkillUpdate {
  pub fn validate(&self) -> Result<()> {
    if let Some(name) = &self.name {
      validate::length("name", name, 1, 200)?;
    }
    if let Some(code) = &self.code {
      validate::code("code", code, 20, true)?;
    }
    if let Some(description) = &self.description {
      validate::max_length("description", description, 2000)?;
    }
    if let Some(level) = self.max_proficiency_level {
      validate::range("maxProficiencyLevel", level, 1, 10)?;
    }
    if let Some(months) = self.certification_validity_months {
      validate::range("certificationValidityMonths", months, 1, 120)?;
    }
    if let Some(hours) = self.required_training_hours {
      validate::range("requiredTrainingHours", hours, 0, 1000)?;
    }
    Ok(())
  }
}

/// Filters for listing skills.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SkillQuery {
  #[serde(default)]
  pub search:      Option<String>,
  #[serde(default, alias = "category")]
  pub category_id: Option<Uuid>,
  #[serde(default)]
  pub active:      Option<bool>,
  /// When true, only root skills (no parent).
  #[serde(default, alias = "root")]
  pub roots_only:  bool,
}

/// Listed skill row plus joined display fields.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SkillSummary {
  #[serde(flatten)]
  pub skill:             Skill,
  pub child_count:       i64,
  pub category_name:     Option<String>,
  pub parent_skill_name: Option<String>,
}

impl TreeRow for SkillSummary {
  fn id(&self) -> Uuid { self.skill.id }

  fn parent_id(&self) -> Option<Uuid> { self.skill.parent_skill_id }
}

/// Full skill read model.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SkillDetail {
  #[serde(flatten)]
  pub skill:         Skill,
  pub category:      Option<crate::category::Category>,
  pub parent_skill:  Option<Skill>,
  pub children:      Vec<Skill>,
  pub prerequisites: Vec<PrerequisiteDetail>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SkillStats {
  pub total:                  i64,
  pub active:                 i64,
  pub requires_certification: i64,
  pub root_skills:            i64,
  pub sub_skills:             i64,
}

// ─── Prerequisites ───────────────────────────────────────────────────────────

/// A directed edge: `skill_id` requires `prerequisite_skill_id` first.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SkillPrerequisite {
  pub id:                        Uuid,
  pub skill_id:                  Uuid,
  pub prerequisite_skill_id:     Uuid,
  pub minimum_proficiency_level: i64,
  pub created_at:                DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewPrerequisite {
  pub prerequisite_skill_id:     Uuid,
  #[serde(default)]
  pub minimum_proficiency_level: Option<i64>,
}

impl NewPrerequisite {
  pub fn validate(&self) -> Result<()> {
    if let Some(level) = self.minimum_proficiency_level {
      validate::range("minimumProficiencyLevel", level, 1, 10)?;
    }
    Ok(())
  }
}

/// A prerequisite edge joined with the prerequisite skill's display fields.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PrerequisiteDetail {
  #[serde(flatten)]
  pub edge:              SkillPrerequisite,
  pub prerequisite_name: String,
  pub prerequisite_code: String,
}

// ─── Tests ───────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn new_skill_validation() {
    assert!(NewSkill::new("Lockout Tagout", "LOTO").validate().is_ok());
    assert!(NewSkill::new("Lockout Tagout", "loto").validate().is_err());
    assert!(NewSkill::new("", "LOTO").validate().is_err());

    let mut input = NewSkill::new("Welding", "WELD-01");
    input.max_proficiency_level = Some(11);
    assert!(input.validate().is_err());

    let mut input = NewSkill::new("Welding", "WELD-01");
    input.certification_validity_months = Some(0);
    assert!(input.validate().is_err());
  }

  #[test]
  fn prerequisite_level_bounds() {
    let input = NewPrerequisite {
      prerequisite_skill_id:     Uuid::new_v4(),
      minimum_proficiency_level: Some(3),
    };
    assert!(input.validate().is_ok());

    let input = NewPrerequisite {
      prerequisite_skill_id:     Uuid::new_v4(),
      minimum_proficiency_level: Some(0),
    };
    assert!(input.validate().is_err());
  }
}

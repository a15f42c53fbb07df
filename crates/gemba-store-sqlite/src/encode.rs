//! Encoding and decoding helpers between Rust domain types and the plain-text
//! representations stored in SQLite columns.
//!
//! All timestamps are stored as RFC 3339 strings and dates as `YYYY-MM-DD`.
//! Enum columns store the same token strings the serde representations use,
//! so rows stay greppable with the sqlite3 shell. UUIDs are stored as
//! hyphenated lowercase strings.

use chrono::{DateTime, NaiveDate, Utc};
use gemba_core::{
  category::{Category, CategoryKind, CategorySummary},
  org::{Department, DepartmentSummary, Role, User, UserSummary},
  permission::PermissionSet,
  project::{Project, ProjectStatus, ProjectSummary},
  session::Caller,
  skill::{PrerequisiteDetail, Skill, SkillPrerequisite, SkillSummary},
  system::{Attachment, AttachmentKind, AuditEntry, EntityKind},
};
use uuid::Uuid;

use crate::{Error, Result};

// ─── Uuid ─────────────────────────────────────────────────────────────────────

pub fn encode_uuid(id: Uuid) -> String { id.hyphenated().to_string() }

pub fn decode_uuid(s: &str) -> Result<Uuid> { Ok(Uuid::parse_str(s)?) }

pub fn decode_opt_uuid(s: Option<&str>) -> Result<Option<Uuid>> {
  s.map(decode_uuid).transpose()
}

// ─── Timestamps and dates ─────────────────────────────────────────────────────

pub fn encode_dt(dt: DateTime<Utc>) -> String { dt.to_rfc3339() }

pub fn decode_dt(s: &str) -> Result<DateTime<Utc>> {
  DateTime::parse_from_rfc3339(s)
    .map(|dt| dt.with_timezone(&Utc))
    .map_err(|e| Error::Decode(format!("bad timestamp {s:?}: {e}")))
}

pub fn encode_date(d: NaiveDate) -> String { d.format("%Y-%m-%d").to_string() }

pub fn decode_date(s: &str) -> Result<NaiveDate> {
  NaiveDate::parse_from_str(s, "%Y-%m-%d")
    .map_err(|e| Error::Decode(format!("bad date {s:?}: {e}")))
}

// ─── CategoryKind ─────────────────────────────────────────────────────────────

pub fn encode_category_kind(k: CategoryKind) -> &'static str {
  match k {
    CategoryKind::Department => "department",
    CategoryKind::Area => "area",
  }
}

pub fn decode_category_kind(s: &str) -> Result<CategoryKind> {
  match s {
    "department" => Ok(CategoryKind::Department),
    "area" => Ok(CategoryKind::Area),
    other => Err(Error::Decode(format!("unknown category kind: {other:?}"))),
  }
}

// ─── ProjectStatus ────────────────────────────────────────────────────────────

pub fn encode_status(s: ProjectStatus) -> &'static str {
  match s {
    ProjectStatus::Draft => "draft",
    ProjectStatus::Active => "active",
    ProjectStatus::OnHold => "on_hold",
    ProjectStatus::Completed => "completed",
    ProjectStatus::Cancelled => "cancelled",
  }
}

pub fn decode_status(s: &str) -> Result<ProjectStatus> {
  match s {
    "draft" => Ok(ProjectStatus::Draft),
    "active" => Ok(ProjectStatus::Active),
    "on_hold" => Ok(ProjectStatus::OnHold),
    "completed" => Ok(ProjectStatus::Completed),
    "cancelled" => Ok(ProjectStatus::Cancelled),
    other => Err(Error::Decode(format!("unknown project status: {other:?}"))),
  }
}

// ─── EntityKind ───────────────────────────────────────────────────────────────

pub fn encode_entity_kind(k: EntityKind) -> &'static str {
  match k {
    EntityKind::User => "user",
    EntityKind::Project => "project",
    EntityKind::Skill => "skill",
    EntityKind::SkillCategory => "skill_category",
  }
}

pub fn decode_entity_kind(s: &str) -> Result<EntityKind> {
  match s {
    "user" => Ok(EntityKind::User),
    "project" => Ok(EntityKind::Project),
    "skill" => Ok(EntityKind::Skill),
    "skill_category" => Ok(EntityKind::SkillCategory),
    other => Err(Error::Decode(format!("unknown entity kind: {other:?}"))),
  }
}

// ─── AttachmentKind ───────────────────────────────────────────────────────────

pub fn encode_attachment_kind(k: AttachmentKind) -> &'static str {
  match k {
    AttachmentKind::Avatar => "avatar",
    AttachmentKind::Photo => "photo",
    AttachmentKind::Document => "document",
  }
}

pub fn decode_attachment_kind(s: &str) -> Result<AttachmentKind> {
  match s {
    "avatar" => Ok(AttachmentKind::Avatar),
    "photo" => Ok(AttachmentKind::Photo),
    "document" => Ok(AttachmentKind::Document),
    other => Err(Error::Decode(format!("unknown attachment kind: {other:?}"))),
  }
}

// ─── Permissions ──────────────────────────────────────────────────────────────

pub fn encode_permissions(set: &PermissionSet) -> Result<String> {
  Ok(serde_json::to_string(set)?)
}

pub fn decode_permissions(s: &str) -> Result<PermissionSet> {
  Ok(serde_json::from_str(s)?)
}

// ─── Row types ────────────────────────────────────────────────────────────────
//
// Each `Raw*` struct mirrors one SELECT column list; `from_row` reads columns
// by index, so the `*_COLS` constants below pin the order. Joined queries
// append their extra columns after the base list.

/// Raw strings read directly from a `skill_categories` row.
pub struct RawCategory {
  pub id:          String,
  pub name:        String,
  pub code:        String,
  pub slug:        String,
  pub description: Option<String>,
  pub color:       Option<String>,
  pub kind:        String,
  pub parent_id:   Option<String>,
  pub path:        String,
  pub depth:       i64,
  pub sort_order:  i64,
  pub is_active:   bool,
  pub created_at:  String,
  pub updated_at:  String,
}

pub const CATEGORY_COLS: &str = "id, name, code, slug, description, color, \
   kind, parent_id, path, depth, sort_order, is_active, created_at, updated_at";

impl RawCategory {
  pub fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      id:          row.get(0)?,
      name:        row.get(1)?,
      code:        row.get(2)?,
      slug:        row.get(3)?,
      description: row.get(4)?,
      color:       row.get(5)?,
      kind:        row.get(6)?,
      parent_id:   row.get(7)?,
      path:        row.get(8)?,
      depth:       row.get(9)?,
      sort_order:  row.get(10)?,
      is_active:   row.get(11)?,
      created_at:  row.get(12)?,
      updated_at:  row.get(13)?,
    })
  }

  pub fn into_category(self) -> Result<Category> {
    Ok(Category {
      id:          decode_uuid(&self.id)?,
      name:        self.name,
      code:        self.code,
      slug:        self.slug,
      description: self.description,
      color:       self.color,
      kind:        decode_category_kind(&self.kind)?,
      parent_id:   decode_opt_uuid(self.parent_id.as_deref())?,
      path:        self.path,
      depth:       self.depth,
      sort_order:  self.sort_order,
      is_active:   self.is_active,
      created_at:  decode_dt(&self.created_at)?,
      updated_at:  decode_dt(&self.updated_at)?,
    })
  }
}

/// A category row plus the direct child/skill counts.
pub struct RawCategorySummary {
  pub category:    RawCategory,
  pub child_count: i64,
  pub skill_count: i64,
}

impl RawCategorySummary {
  pub fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      category:    RawCategory::from_row(row)?,
      child_count: row.get(14)?,
      skill_count: row.get(15)?,
    })
  }

  pub fn into_summary(self) -> Result<CategorySummary> {
    Ok(CategorySummary {
      category:    self.category.into_category()?,
      child_count: self.child_count,
      skill_count: self.skill_count,
    })
  }
}

/// Raw strings read directly from a `skills` row.
pub struct RawSkill {
  pub id:                            String,
  pub name:                          String,
  pub code:                          String,
  pub description:                   Option<String>,
  pub category_id:                   Option<String>,
  pub parent_skill_id:               Option<String>,
  pub path:                          String,
  pub depth:                         i64,
  pub has_proficiency_levels:        bool,
  pub max_proficiency_level:         i64,
  pub requires_certification:        bool,
  pub certification_validity_months: Option<i64>,
  pub required_training_hours:       Option<i64>,
  pub allows_ojt:                    bool,
  pub allows_classroom:              bool,
  pub allows_online:                 bool,
  pub is_active:                     bool,
  pub created_at:                    String,
  pub updated_at:                    String,
}

pub const SKILL_COLS: &str = "id, name, code, description, category_id, \
   parent_skill_id, path, depth, has_proficiency_levels, \
   max_proficiency_level, requires_certification, \
   certification_validity_months, required_training_hours, allows_ojt, \
   allows_classroom, allows_online, is_active, created_at, updated_at";

impl RawSkill {
  pub fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      id:                            row.get(0)?,
      name:                          row.get(1)?,
      code:                          row.get(2)?,
      description:                   row.get(3)?,
      category_id:                   row.get(4)?,
      parent_skill_id:               row.get(5)?,
      path:                          row.get(6)?,
      depth:                         row.get(7)?,
      has_proficiency_levels:        row.get(8)?,
      max_proficiency_level:         row.get(9)?,
      requires_certification:        row.get(10)?,
      certification_validity_months: row.get(11)?,
      required_training_hours:       row.get(12)?,
      allows_ojt:                    row.get(13)?,
      allows_classroom:              row.get(14)?,
      allows_online:                 row.get(15)?,
      is_active:                     row.get(16)?,
      created_at:                    row.get(17)?,
      updated_at:                    row.get(18)?,
    })
  }

  pub fn into_skill(self) -> Result<Skill> {
    Ok(Skill {
      id:                            decode_uuid(&self.id)?,
      name:                          self.name,
      code:                          self.code,
      description:                   self.description,
      category_id:                   decode_opt_uuid(self.category_id.as_deref())?,
      parent_skill_id:               decode_opt_uuid(self.parent_skill_id.as_deref())?,
      path:                          self.path,
      depth:                         self.depth,
      has_proficiency_levels:        self.has_proficiency_levels,
      max_proficiency_level:         self.max_proficiency_level,
      requires_certification:        self.requires_certification,
      certification_validity_months: self.certification_validity_months,
      required_training_hours:       self.required_training_hours,
      allows_ojt:                    self.allows_ojt,
      allows_classroom:              self.allows_classroom,
      allows_online:                 self.allows_online,
      is_active:                     self.is_active,
      created_at:                    decode_dt(&self.created_at)?,
      updated_at:                    decode_dt(&self.updated_at)?,
    })
  }
}

/// A skill row plus the child count and joined display names.
pub struct RawSkillSummary {
  pub skill:             RawSkill,
  pub child_count:       i64,
  pub category_name:     Option<String>,
  pub parent_skill_name: Option<String>,
}

impl RawSkillSummary {
  pub fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      skill:             RawSkill::from_row(row)?,
      child_count:       row.get(19)?,
      category_name:     row.get(20)?,
      parent_skill_name: row.get(21)?,
    })
  }

  pub fn into_summary(self) -> Result<SkillSummary> {
    Ok(SkillSummary {
      skill:             self.skill.into_skill()?,
      child_count:       self.child_count,
      category_name:     self.category_name,
      parent_skill_name: self.parent_skill_name,
    })
  }
}

/// Raw strings read directly from a `skill_prerequisites` row.
pub struct RawPrerequisite {
  pub id:                        String,
  pub skill_id:                  String,
  pub prerequisite_skill_id:     String,
  pub minimum_proficiency_level: i64,
  pub created_at:                String,
}

impl RawPrerequisite {
  pub fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      id:                        row.get(0)?,
      skill_id:                  row.get(1)?,
      prerequisite_skill_id:     row.get(2)?,
      minimum_proficiency_level: row.get(3)?,
      created_at:                row.get(4)?,
    })
  }

  pub fn into_edge(self) -> Result<SkillPrerequisite> {
    Ok(SkillPrerequisite {
      id:                        decode_uuid(&self.id)?,
      skill_id:                  decode_uuid(&self.skill_id)?,
      prerequisite_skill_id:     decode_uuid(&self.prerequisite_skill_id)?,
      minimum_proficiency_level: self.minimum_proficiency_level,
      created_at:                decode_dt(&self.created_at)?,
    })
  }
}

/// A prerequisite edge plus the prerequisite skill's display fields.
pub struct RawPrerequisiteDetail {
  pub edge:              RawPrerequisite,
  pub prerequisite_name: String,
  pub prerequisite_code: String,
}

impl RawPrerequisiteDetail {
  pub fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      edge:              RawPrerequisite::from_row(row)?,
      prerequisite_name: row.get(5)?,
      prerequisite_code: row.get(6)?,
    })
  }

  pub fn into_detail(self) -> Result<PrerequisiteDetail> {
    Ok(PrerequisiteDetail {
      edge:              self.edge.into_edge()?,
      prerequisite_name: self.prerequisite_name,
      prerequisite_code: self.prerequisite_code,
    })
  }
}

/// Raw strings read directly from a `roles` row.
pub struct RawRole {
  pub id:             String,
  pub name:           String,
  pub description:    Option<String>,
  pub permissions:    String,
  pub is_system_role: bool,
  pub created_at:     String,
}

pub const ROLE_COLS: &str =
  "id, name, description, permissions, is_system_role, created_at";

impl RawRole {
  pub fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      id:             row.get(0)?,
      name:           row.get(1)?,
      description:    row.get(2)?,
      permissions:    row.get(3)?,
      is_system_role: row.get(4)?,
      created_at:     row.get(5)?,
    })
  }

  pub fn into_role(self) -> Result<Role> {
    Ok(Role {
      id:             decode_uuid(&self.id)?,
      name:           self.name,
      description:    self.description,
      permissions:    decode_permissions(&self.permissions)?,
      is_system_role: self.is_system_role,
      created_at:     decode_dt(&self.created_at)?,
    })
  }
}

/// Raw strings read directly from a `departments` row.
pub struct RawDepartment {
  pub id:          String,
  pub name:        String,
  pub code:        String,
  pub description: Option<String>,
  pub manager_id:  Option<String>,
  pub is_active:   bool,
  pub created_at:  String,
  pub updated_at:  String,
}

pub const DEPARTMENT_COLS: &str =
  "id, name, code, description, manager_id, is_active, created_at, updated_at";

impl RawDepartment {
  pub fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      id:          row.get(0)?,
      name:        row.get(1)?,
      code:        row.get(2)?,
      description: row.get(3)?,
      manager_id:  row.get(4)?,
      is_active:   row.get(5)?,
      created_at:  row.get(6)?,
      updated_at:  row.get(7)?,
    })
  }

  pub fn into_department(self) -> Result<Department> {
    Ok(Department {
      id:          decode_uuid(&self.id)?,
      name:        self.name,
      code:        self.code,
      description: self.description,
      manager_id:  decode_opt_uuid(self.manager_id.as_deref())?,
      is_active:   self.is_active,
      created_at:  decode_dt(&self.created_at)?,
      updated_at:  decode_dt(&self.updated_at)?,
    })
  }
}

/// A department row plus aggregate counts and the manager's name.
pub struct RawDepartmentSummary {
  pub department:    RawDepartment,
  pub member_count:  i64,
  pub project_count: i64,
  pub manager_name:  Option<String>,
}

impl RawDepartmentSummary {
  pub fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      department:    RawDepartment::from_row(row)?,
      member_count:  row.get(8)?,
      project_count: row.get(9)?,
      manager_name:  row.get(10)?,
    })
  }

  pub fn into_summary(self) -> Result<DepartmentSummary> {
    Ok(DepartmentSummary {
      department:    self.department.into_department()?,
      member_count:  self.member_count,
      project_count: self.project_count,
      manager_name:  self.manager_name,
    })
  }
}

/// Raw strings read directly from a `users` row, pin hash included.
pub struct RawUser {
  pub id:                    String,
  pub employee_id:           String,
  pub name:                  String,
  pub email:                 Option<String>,
  pub pin_hash:              String,
  pub role_id:               String,
  pub department_id:         Option<String>,
  pub is_active:             bool,
  pub failed_login_attempts: i64,
  pub locked_until:          Option<String>,
  pub created_at:            String,
  pub updated_at:            String,
}

pub const USER_COLS: &str = "id, employee_id, name, email, pin_hash, role_id, \
   department_id, is_active, failed_login_attempts, locked_until, created_at, \
   updated_at";

impl RawUser {
  pub fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      id:                    row.get(0)?,
      employee_id:           row.get(1)?,
      name:                  row.get(2)?,
      email:                 row.get(3)?,
      pin_hash:              row.get(4)?,
      role_id:               row.get(5)?,
      department_id:         row.get(6)?,
      is_active:             row.get(7)?,
      failed_login_attempts: row.get(8)?,
      locked_until:          row.get(9)?,
      created_at:            row.get(10)?,
      updated_at:            row.get(11)?,
    })
  }

  pub fn into_user(self) -> Result<User> {
    Ok(User {
      id:                    decode_uuid(&self.id)?,
      employee_id:           self.employee_id,
      name:                  self.name,
      email:                 self.email,
      pin_hash:              self.pin_hash,
      role_id:               decode_uuid(&self.role_id)?,
      department_id:         decode_opt_uuid(self.department_id.as_deref())?,
      is_active:             self.is_active,
      failed_login_attempts: self.failed_login_attempts,
      locked_until:          self
        .locked_until
        .as_deref()
        .map(decode_dt)
        .transpose()?,
      created_at:            decode_dt(&self.created_at)?,
      updated_at:            decode_dt(&self.updated_at)?,
    })
  }
}

/// The user listing projection: user columns joined with role and department
/// names, never the pin hash.
pub struct RawUserSummary {
  pub id:              String,
  pub employee_id:     String,
  pub name:            String,
  pub email:           Option<String>,
  pub role_id:         String,
  pub role_name:       String,
  pub department_id:   Option<String>,
  pub department_name: Option<String>,
  pub is_active:       bool,
  pub created_at:      String,
}

impl RawUserSummary {
  pub fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      id:              row.get(0)?,
      employee_id:     row.get(1)?,
      name:            row.get(2)?,
      email:           row.get(3)?,
      role_id:         row.get(4)?,
      role_name:       row.get(5)?,
      department_id:   row.get(6)?,
      department_name: row.get(7)?,
      is_active:       row.get(8)?,
      created_at:      row.get(9)?,
    })
  }

  pub fn into_summary(self) -> Result<UserSummary> {
    Ok(UserSummary {
      id:              decode_uuid(&self.id)?,
      employee_id:     self.employee_id,
      name:            self.name,
      email:           self.email,
      role_id:         decode_uuid(&self.role_id)?,
      role_name:       self.role_name,
      department_id:   decode_opt_uuid(self.department_id.as_deref())?,
      department_name: self.department_name,
      is_active:       self.is_active,
      created_at:      decode_dt(&self.created_at)?,
    })
  }
}

/// Raw strings read directly from a `projects` row.
pub struct RawProject {
  pub id:            String,
  pub name:          String,
  pub description:   Option<String>,
  pub status:        String,
  pub department_id: Option<String>,
  pub owner_id:      Option<String>,
  pub start_date:    Option<String>,
  pub end_date:      Option<String>,
  pub is_active:     bool,
  pub created_at:    String,
  pub updated_at:    String,
}

pub const PROJECT_COLS: &str = "id, name, description, status, department_id, \
   owner_id, start_date, end_date, is_active, created_at, updated_at";

impl RawProject {
  pub fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      id:            row.get(0)?,
      name:          row.get(1)?,
      description:   row.get(2)?,
      status:        row.get(3)?,
      department_id: row.get(4)?,
      owner_id:      row.get(5)?,
      start_date:    row.get(6)?,
      end_date:      row.get(7)?,
      is_active:     row.get(8)?,
      created_at:    row.get(9)?,
      updated_at:    row.get(10)?,
    })
  }

  pub fn into_project(self) -> Result<Project> {
    Ok(Project {
      id:            decode_uuid(&self.id)?,
      name:          self.name,
      description:   self.description,
      status:        decode_status(&self.status)?,
      department_id: decode_opt_uuid(self.department_id.as_deref())?,
      owner_id:      decode_opt_uuid(self.owner_id.as_deref())?,
      start_date:    self.start_date.as_deref().map(decode_date).transpose()?,
      end_date:      self.end_date.as_deref().map(decode_date).transpose()?,
      is_active:     self.is_active,
      created_at:    decode_dt(&self.created_at)?,
      updated_at:    decode_dt(&self.updated_at)?,
    })
  }
}

/// A project row plus the joined owner and department names.
pub struct RawProjectSummary {
  pub project:         RawProject,
  pub owner_name:      Option<String>,
  pub department_name: Option<String>,
}

impl RawProjectSummary {
  pub fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      project:         RawProject::from_row(row)?,
      owner_name:      row.get(11)?,
      department_name: row.get(12)?,
    })
  }

  pub fn into_summary(self) -> Result<ProjectSummary> {
    Ok(ProjectSummary {
      project:         self.project.into_project()?,
      owner_name:      self.owner_name,
      department_name: self.department_name,
    })
  }
}

/// The caller projection: a live session joined with its user and role.
pub struct RawCaller {
  pub user_id:     String,
  pub employee_id: String,
  pub name:        String,
  pub role_name:   String,
  pub permissions: String,
}

impl RawCaller {
  pub fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      user_id:     row.get(0)?,
      employee_id: row.get(1)?,
      name:        row.get(2)?,
      role_name:   row.get(3)?,
      permissions: row.get(4)?,
    })
  }

  pub fn into_caller(self) -> Result<Caller> {
    Ok(Caller {
      user_id:     decode_uuid(&self.user_id)?,
      employee_id: self.employee_id,
      name:        self.name,
      role_name:   self.role_name,
      permissions: decode_permissions(&self.permissions)?,
    })
  }
}

/// Raw strings read directly from an `audit_logs` row.
pub struct RawAudit {
  pub id:          String,
  pub user_id:     Option<String>,
  pub entity_kind: String,
  pub entity_id:   String,
  pub action:      String,
  pub details:     Option<String>,
  pub created_at:  String,
}

pub const AUDIT_COLS: &str =
  "id, user_id, entity_kind, entity_id, action, details, created_at";

impl RawAudit {
  pub fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      id:          row.get(0)?,
      user_id:     row.get(1)?,
      entity_kind: row.get(2)?,
      entity_id:   row.get(3)?,
      action:      row.get(4)?,
      details:     row.get(5)?,
      created_at:  row.get(6)?,
    })
  }

  pub fn into_entry(self) -> Result<AuditEntry> {
    Ok(AuditEntry {
      id:          decode_uuid(&self.id)?,
      user_id:     decode_opt_uuid(self.user_id.as_deref())?,
      entity_kind: decode_entity_kind(&self.entity_kind)?,
      entity_id:   decode_uuid(&self.entity_id)?,
      action:      self.action,
      details:     self
        .details
        .as_deref()
        .map(serde_json::from_str)
        .transpose()?,
      created_at:  decode_dt(&self.created_at)?,
    })
  }
}

/// Raw strings read directly from an `attachments` row.
pub struct RawAttachment {
  pub id:           String,
  pub entity_kind:  String,
  pub entity_id:    String,
  pub kind:         String,
  pub filename:     String,
  pub content_type: String,
  pub size_bytes:   i64,
  pub storage_path: String,
  pub uploaded_by:  Option<String>,
  pub created_at:   String,
}

pub const ATTACHMENT_COLS: &str = "id, entity_kind, entity_id, kind, filename, \
   content_type, size_bytes, storage_path, uploaded_by, created_at";

impl RawAttachment {
  pub fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      id:           row.get(0)?,
      entity_kind:  row.get(1)?,
      entity_id:    row.get(2)?,
      kind:         row.get(3)?,
      filename:     row.get(4)?,
      content_type: row.get(5)?,
      size_bytes:   row.get(6)?,
      storage_path: row.get(7)?,
      uploaded_by:  row.get(8)?,
      created_at:   row.get(9)?,
    })
  }

  pub fn into_attachment(self) -> Result<Attachment> {
    Ok(Attachment {
      id:           decode_uuid(&self.id)?,
      entity_kind:  decode_entity_kind(&self.entity_kind)?,
      entity_id:    decode_uuid(&self.entity_id)?,
      kind:         decode_attachment_kind(&self.kind)?,
      filename:     self.filename,
      content_type: self.content_type,
      size_bytes:   self.size_bytes,
      storage_path: self.storage_path,
      uploaded_by:  decode_opt_uuid(self.uploaded_by.as_deref())?,
      created_at:   decode_dt(&self.created_at)?,
    })
  }
}

//! The `FactoryStore` trait — the typed command/query interface.
//!
//! The trait is implemented by storage backends (e.g. `gemba-store-sqlite`).
//! Higher layers (`gemba-api`, `gemba-server`) depend on this abstraction,
//! not on any concrete backend, so the core logic stays transport-agnostic:
//! request structs in, typed results or taxonomy errors out.

use std::future::Future;

use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::{
  category::{
    Category, CategoryDetail, CategoryQuery, CategoryStats, CategorySummary, CategoryUpdate,
    NewCategory,
  },
  org::{
    Department, DepartmentDetail, DepartmentSummary, DepartmentUpdate, NewDepartment, NewRole,
    NewUser, Role, User, UserQuery, UserSummary, UserUpdate,
  },
  project::{NewProject, Project, ProjectQuery, ProjectStats, ProjectSummary, ProjectUpdate},
  session::{Caller, NewSession, SessionRecord},
  skill::{
    NewPrerequisite, NewSkill, PrerequisiteDetail, Skill, SkillDetail, SkillPrerequisite,
    SkillQuery, SkillStats, SkillSummary, SkillUpdate,
  },
  system::{
    Attachment, AuditEntry, AuditQuery, EntityKind, NewAttachment, NewAuditEntry, SystemSettings,
  },
  tree::{CategoryCrumb, SkillCrumb},
};

/// Abstraction over a factory-organization store backend.
///
/// Every mutation validates its input, runs its duplicate/children pre-checks
/// as best-effort early rejection, and relies on the backend's unique
/// constraints as the authoritative enforcement point — a constraint
/// violation surfaces as the same taxonomy error the pre-check would have
/// produced.
///
/// All methods return `Send` futures so the trait can be used in
/// multi-threaded async runtimes (e.g. tokio with `axum`). Backend errors
/// convert into [`crate::Error`] so transport layers can map the taxonomy
/// uniformly.
pub trait FactoryStore: Send + Sync {
  type Error: std::error::Error + Into<crate::Error> + Send + Sync + 'static;

  // ── Categories ────────────────────────────────────────────────────────

  /// Create a category. Placement (slug, path, depth) and kind are computed
  /// from the optional parent; code falls back to a derivation from the
  /// name. Fails on duplicate name/code, duplicate slug among siblings, or
  /// a missing parent.
  fn create_category(
    &self,
    input: NewCategory,
  ) -> impl Future<Output = Result<Category, Self::Error>> + Send + '_;

  /// Update a category. A name or slug change recomputes the materialized
  /// path and rewrites every descendant's path in the same transaction.
  fn update_category(
    &self,
    id: Uuid,
    update: CategoryUpdate,
  ) -> impl Future<Output = Result<Category, Self::Error>> + Send + '_;

  /// Delete a category. Fails while child categories or assigned skills
  /// remain.
  fn delete_category(
    &self,
    id: Uuid,
  ) -> impl Future<Output = Result<(), Self::Error>> + Send + '_;

  /// Category plus parent, children and assigned skills. `None` if absent.
  fn get_category(
    &self,
    id: Uuid,
  ) -> impl Future<Output = Result<Option<CategoryDetail>, Self::Error>> + Send + '_;

  /// First category with the given slug. Slugs are only unique among
  /// siblings, so this is a convenience lookup, not a guarantee.
  fn get_category_by_slug<'a>(
    &'a self,
    slug: &'a str,
  ) -> impl Future<Output = Result<Option<Category>, Self::Error>> + Send + 'a;

  /// Categories ordered by depth, sort order, name, with direct child and
  /// skill counts.
  fn list_categories<'a>(
    &'a self,
    query: &'a CategoryQuery,
  ) -> impl Future<Output = Result<Vec<CategorySummary>, Self::Error>> + Send + 'a;

  /// Root-to-node trail, one parent lookup per level. A dangling parent id
  /// terminates the walk.
  fn category_breadcrumbs(
    &self,
    id: Uuid,
  ) -> impl Future<Output = Result<Vec<CategoryCrumb>, Self::Error>> + Send + '_;

  fn category_stats(
    &self,
  ) -> impl Future<Output = Result<CategoryStats, Self::Error>> + Send + '_;

  // ── Skills ────────────────────────────────────────────────────────────

  /// Create a skill. Placement comes from the optional parent skill; the
  /// category is inherited from the parent when not given. Fails on a
  /// duplicate code (global across all skills) or a missing parent/category.
  fn create_skill(
    &self,
    input: NewSkill,
  ) -> impl Future<Output = Result<Skill, Self::Error>> + Send + '_;

  fn update_skill(
    &self,
    id: Uuid,
    update: SkillUpdate,
  ) -> impl Future<Output = Result<Skill, Self::Error>> + Send + '_;

  /// Delete a skill. Fails while sub-skills remain; removes all
  /// prerequisite edges referencing the skill (either side) in the same
  /// transaction.
  fn delete_skill(
    &self,
    id: Uuid,
  ) -> impl Future<Output = Result<(), Self::Error>> + Send + '_;

  /// Skill plus category, parent, children and prerequisites. `None` if
  /// absent.
  fn get_skill(
    &self,
    id: Uuid,
  ) -> impl Future<Output = Result<Option<SkillDetail>, Self::Error>> + Send + '_;

  fn get_skill_by_code<'a>(
    &'a self,
    code: &'a str,
  ) -> impl Future<Output = Result<Option<Skill>, Self::Error>> + Send + 'a;

  /// Skills ordered by depth then name, with child counts and joined
  /// category/parent names. Search applies a LIKE filter over name, code
  /// and description.
  fn list_skills<'a>(
    &'a self,
    query: &'a SkillQuery,
  ) -> impl Future<Output = Result<Vec<SkillSummary>, Self::Error>> + Send + 'a;

  /// Root-to-node trail: the skill's category chain (department, area),
  /// then the parent-skill chain, then the skill itself.
  fn skill_breadcrumbs(
    &self,
    id: Uuid,
  ) -> impl Future<Output = Result<Vec<SkillCrumb>, Self::Error>> + Send + '_;

  fn skill_stats(&self)
  -> impl Future<Output = Result<SkillStats, Self::Error>> + Send + '_;

  // ── Prerequisites ─────────────────────────────────────────────────────

  /// Add a prerequisite edge. Fails on a self-edge or a duplicate pair;
  /// cycles are not checked.
  fn add_prerequisite(
    &self,
    skill_id: Uuid,
    input: NewPrerequisite,
  ) -> impl Future<Output = Result<SkillPrerequisite, Self::Error>> + Send + '_;

  /// Remove one edge by id; the edge must belong to `skill_id`.
  fn remove_prerequisite(
    &self,
    skill_id: Uuid,
    prerequisite_id: Uuid,
  ) -> impl Future<Output = Result<(), Self::Error>> + Send + '_;

  fn list_prerequisites(
    &self,
    skill_id: Uuid,
  ) -> impl Future<Output = Result<Vec<PrerequisiteDetail>, Self::Error>> + Send + '_;

  // ── Departments ───────────────────────────────────────────────────────

  fn create_department(
    &self,
    input: NewDepartment,
  ) -> impl Future<Output = Result<Department, Self::Error>> + Send + '_;

  fn update_department(
    &self,
    id: Uuid,
    update: DepartmentUpdate,
  ) -> impl Future<Output = Result<Department, Self::Error>> + Send + '_;

  /// Delete a department. Fails while users are assigned to it or projects
  /// reference it.
  fn delete_department(
    &self,
    id: Uuid,
  ) -> impl Future<Output = Result<(), Self::Error>> + Send + '_;

  fn get_department(
    &self,
    id: Uuid,
  ) -> impl Future<Output = Result<Option<DepartmentDetail>, Self::Error>> + Send + '_;

  /// Departments by name with member/project counts and the manager's name.
  fn list_departments(
    &self,
    active: Option<bool>,
  ) -> impl Future<Output = Result<Vec<DepartmentSummary>, Self::Error>> + Send + '_;

  // ── Roles ─────────────────────────────────────────────────────────────

  /// Create a role. Seeding only; roles have no write surface over HTTP.
  fn add_role(
    &self,
    input: NewRole,
  ) -> impl Future<Output = Result<Role, Self::Error>> + Send + '_;

  fn get_role(
    &self,
    id: Uuid,
  ) -> impl Future<Output = Result<Option<Role>, Self::Error>> + Send + '_;

  fn get_role_by_name<'a>(
    &'a self,
    name: &'a str,
  ) -> impl Future<Output = Result<Option<Role>, Self::Error>> + Send + 'a;

  fn list_roles(&self)
  -> impl Future<Output = Result<Vec<Role>, Self::Error>> + Send + '_;

  // ── Users ─────────────────────────────────────────────────────────────

  /// Create a user. Fails on duplicate employee id or email, or a missing
  /// role/department.
  fn create_user(
    &self,
    input: NewUser,
  ) -> impl Future<Output = Result<User, Self::Error>> + Send + '_;

  fn update_user(
    &self,
    id: Uuid,
    update: UserUpdate,
  ) -> impl Future<Output = Result<User, Self::Error>> + Send + '_;

  fn get_user(
    &self,
    id: Uuid,
  ) -> impl Future<Output = Result<Option<UserSummary>, Self::Error>> + Send + '_;

  /// Full user row, PIN hash included. Login verification only.
  fn get_user_by_employee_id<'a>(
    &'a self,
    employee_id: &'a str,
  ) -> impl Future<Output = Result<Option<User>, Self::Error>> + Send + 'a;

  fn list_users<'a>(
    &'a self,
    query: &'a UserQuery,
  ) -> impl Future<Output = Result<Vec<UserSummary>, Self::Error>> + Send + 'a;

  /// Bump the failed-login counter; a caller-computed lockout deadline is
  /// stored alongside when the threshold is reached.
  fn record_login_failure(
    &self,
    user_id: Uuid,
    locked_until: Option<DateTime<Utc>>,
  ) -> impl Future<Output = Result<(), Self::Error>> + Send + '_;

  /// Reset the failed-login counter and lockout.
  fn record_login_success(
    &self,
    user_id: Uuid,
  ) -> impl Future<Output = Result<(), Self::Error>> + Send + '_;

  // ── Sessions ──────────────────────────────────────────────────────────

  fn create_session(
    &self,
    input: NewSession,
  ) -> impl Future<Output = Result<SessionRecord, Self::Error>> + Send + '_;

  /// Resolve a session token digest into the authenticated caller: the
  /// session must be unexpired and the user active. One joined lookup.
  fn resolve_caller<'a>(
    &'a self,
    token_hash: &'a str,
    now: DateTime<Utc>,
  ) -> impl Future<Output = Result<Option<Caller>, Self::Error>> + Send + 'a;

  fn delete_session<'a>(
    &'a self,
    token_hash: &'a str,
  ) -> impl Future<Output = Result<(), Self::Error>> + Send + 'a;

  /// Drop expired rows; returns how many went away.
  fn sweep_expired_sessions(
    &self,
    now: DateTime<Utc>,
  ) -> impl Future<Output = Result<u64, Self::Error>> + Send + '_;

  // ── Projects ──────────────────────────────────────────────────────────

  fn create_project(
    &self,
    input: NewProject,
  ) -> impl Future<Output = Result<Project, Self::Error>> + Send + '_;

  fn update_project(
    &self,
    id: Uuid,
    update: ProjectUpdate,
  ) -> impl Future<Output = Result<Project, Self::Error>> + Send + '_;

  fn delete_project(
    &self,
    id: Uuid,
  ) -> impl Future<Output = Result<(), Self::Error>> + Send + '_;

  fn get_project(
    &self,
    id: Uuid,
  ) -> impl Future<Output = Result<Option<ProjectSummary>, Self::Error>> + Send + '_;

  /// Projects newest first. Search applies a LIKE filter over name and
  /// description.
  fn list_projects<'a>(
    &'a self,
    query: &'a ProjectQuery,
  ) -> impl Future<Output = Result<Vec<ProjectSummary>, Self::Error>> + Send + 'a;

  fn project_stats(
    &self,
  ) -> impl Future<Output = Result<ProjectStats, Self::Error>> + Send + '_;

  // ── Settings ──────────────────────────────────────────────────────────

  /// Stored settings merged over defaults.
  fn get_settings(
    &self,
  ) -> impl Future<Output = Result<SystemSettings, Self::Error>> + Send + '_;

  fn put_settings(
    &self,
    settings: SystemSettings,
  ) -> impl Future<Output = Result<SystemSettings, Self::Error>> + Send + '_;

  // ── Audit log ─────────────────────────────────────────────────────────

  fn record_audit(
    &self,
    input: NewAuditEntry,
  ) -> impl Future<Output = Result<AuditEntry, Self::Error>> + Send + '_;

  fn list_audit<'a>(
    &'a self,
    query: &'a AuditQuery,
  ) -> impl Future<Output = Result<Vec<AuditEntry>, Self::Error>> + Send + 'a;

  // ── Attachments ───────────────────────────────────────────────────────

  fn add_attachment(
    &self,
    input: NewAttachment,
  ) -> impl Future<Output = Result<Attachment, Self::Error>> + Send + '_;

  fn list_attachments(
    &self,
    entity_kind: EntityKind,
    entity_id: Uuid,
  ) -> impl Future<Output = Result<Vec<Attachment>, Self::Error>> + Send + '_;
}

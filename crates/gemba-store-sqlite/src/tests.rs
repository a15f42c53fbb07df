//! Integration tests for `SqliteStore` against an in-memory database.

use chrono::{Duration, Utc};
use gemba_core::{
  category::{CategoryKind, CategoryQuery, CategoryUpdate, NewCategory},
  org::{
    DepartmentUpdate, NewDepartment, NewRole, NewUser, Role, User, UserQuery,
    UserUpdate,
  },
  permission::{Permission, PermissionSet},
  project::{NewProject, ProjectQuery, ProjectStatus, ProjectUpdate},
  session::NewSession,
  skill::{NewPrerequisite, NewSkill, SkillQuery, SkillUpdate},
  store::FactoryStore,
  system::{
    AttachmentKind, AuditQuery, EntityKind, NewAttachment, NewAuditEntry,
    SystemSettings,
  },
  tree::CrumbKind,
  Entity, Error as CoreError,
};
use uuid::Uuid;

use crate::{Error, SqliteStore};

async fn store() -> SqliteStore {
  SqliteStore::open_in_memory()
    .await
    .expect("in-memory store")
}

async fn employee_role(s: &SqliteStore) -> Role {
  s.add_role(NewRole {
    name:           "employee".into(),
    description:    None,
    permissions:    [Permission::SkillView, Permission::DepartmentView]
      .into_iter()
      .collect(),
    is_system_role: true,
  })
  .await
  .expect("seed role")
}

fn user_input(employee_id: &str, role_id: Uuid) -> NewUser {
  NewUser {
    employee_id: employee_id.into(),
    name: "Pat Fitter".into(),
    email: None,
    pin_hash: "$argon2id$v=19$m=19456,t=2,p=1$c3R1Yg$c3R1Yg".into(),
    role_id,
    department_id: None,
    is_active: None,
  }
}

async fn seeded_user(s: &SqliteStore) -> User {
  let role = employee_role(s).await;
  s.create_user(user_input("EMP-001", role.id))
    .await
    .expect("seed user")
}

// ─── Categories ──────────────────────────────────────────────────────────────

#[tokio::test]
async fn category_placement_derives_slug_code_and_depth() {
  let s = store().await;

  let root = s.create_category(NewCategory::named("Safety")).await.unwrap();
  assert_eq!(root.slug, "safety");
  assert_eq!(root.path, "safety");
  assert_eq!(root.depth, 0);
  assert_eq!(root.code, "SAFETY");
  assert_eq!(root.kind, CategoryKind::Department);
  assert!(root.is_active);

  let area = s
    .create_category(NewCategory::under("Press Shop", root.id))
    .await
    .unwrap();
  assert_eq!(area.slug, "press-shop");
  assert_eq!(area.path, "safety/press-shop");
  assert_eq!(area.depth, 1);
  assert_eq!(area.kind, CategoryKind::Area);
  assert_eq!(area.parent_id, Some(root.id));
}

#[tokio::test]
async fn category_creation_checks_the_parent() {
  let s = store().await;

  let err = s
    .create_category(NewCategory::under("Orphan Area", Uuid::new_v4()))
    .await
    .unwrap_err();
  assert!(matches!(
    err,
    Error::Core(CoreError::NotFound { entity: Entity::Category, .. })
  ));
}

#[tokio::test]
async fn category_natural_keys_are_enforced() {
  let s = store().await;
  let safety = s.create_category(NewCategory::named("Safety")).await.unwrap();

  let err =
    s.create_category(NewCategory::named("Safety")).await.unwrap_err();
  assert!(matches!(
    err,
    Error::Core(CoreError::Duplicate {
      entity: Entity::Category,
      field:  "name",
    })
  ));

  // Sibling slugs collide; the same slug under another parent does not.
  let mut clash = NewCategory::named("Safety Annex");
  clash.slug = Some("safety".into());
  let err = s.create_category(clash).await.unwrap_err();
  assert!(matches!(
    err,
    Error::Core(CoreError::Duplicate {
      entity: Entity::Category,
      field:  "slug",
    })
  ));

  let mut nested = NewCategory::under("Safety Bay", safety.id);
  nested.slug = Some("safety".into());
  let nested = s.create_category(nested).await.unwrap();
  assert_eq!(nested.path, "safety/safety");
}

#[tokio::test]
async fn category_rename_rewrites_descendant_paths() {
  let s = store().await;
  let root = s.create_category(NewCategory::named("Safety")).await.unwrap();
  let area = s
    .create_category(NewCategory::under("Press Shop", root.id))
    .await
    .unwrap();

  let renamed = s
    .update_category(root.id, CategoryUpdate {
      name: Some("Plant Safety".into()),
      ..Default::default()
    })
    .await
    .unwrap();
  assert_eq!(renamed.slug, "plant-safety");
  assert_eq!(renamed.path, "plant-safety");

  let detail = s.get_category(area.id).await.unwrap().unwrap();
  assert_eq!(detail.category.path, "plant-safety/press-shop");
  assert_eq!(detail.category.slug, "press-shop");
}

#[tokio::test]
async fn category_deletion_is_guarded_by_dependents() {
  let s = store().await;
  let root = s.create_category(NewCategory::named("Assembly")).await.unwrap();
  let area = s
    .create_category(NewCategory::under("Final Line", root.id))
    .await
    .unwrap();

  let err = s.delete_category(root.id).await.unwrap_err();
  assert!(matches!(
    err,
    Error::Core(CoreError::DeleteBlocked {
      entity:     Entity::Category,
      dependents: "child categories",
    })
  ));

  let mut input = NewSkill::new("Riveting", "RVT");
  input.category_id = Some(area.id);
  let skill = s.create_skill(input).await.unwrap();

  let err = s.delete_category(area.id).await.unwrap_err();
  assert!(matches!(
    err,
    Error::Core(CoreError::DeleteBlocked {
      entity:     Entity::Category,
      dependents: "assigned skills",
    })
  ));

  s.delete_skill(skill.id).await.unwrap();
  s.delete_category(area.id).await.unwrap();
  s.delete_category(root.id).await.unwrap();
  assert!(s.get_category(root.id).await.unwrap().is_none());
}

#[tokio::test]
async fn category_breadcrumbs_walk_to_the_root() {
  let s = store().await;
  let root = s.create_category(NewCategory::named("Assembly")).await.unwrap();
  let area = s
    .create_category(NewCategory::under("Final Line", root.id))
    .await
    .unwrap();

  let crumbs = s.category_breadcrumbs(area.id).await.unwrap();
  assert_eq!(crumbs.len(), 2);
  assert_eq!(crumbs[0].name, "Assembly");
  assert_eq!(crumbs[0].kind, CrumbKind::Department);
  assert_eq!(crumbs[1].name, "Final Line");
  assert_eq!(crumbs[1].kind, CrumbKind::Area);

  let err = s.category_breadcrumbs(Uuid::new_v4()).await.unwrap_err();
  assert!(matches!(
    err,
    Error::Core(CoreError::NotFound { entity: Entity::Category, .. })
  ));
}

#[tokio::test]
async fn category_lookup_by_slug_prefers_the_shallowest_match() {
  let s = store().await;
  let root = s.create_category(NewCategory::named("Safety")).await.unwrap();
  let mut nested = NewCategory::under("Safety Bay", root.id);
  nested.slug = Some("safety".into());
  s.create_category(nested).await.unwrap();

  let hit = s.get_category_by_slug("safety").await.unwrap().unwrap();
  assert_eq!(hit.id, root.id);
  assert!(s.get_category_by_slug("missing").await.unwrap().is_none());
}

#[tokio::test]
async fn category_listing_filters_and_counts() {
  let s = store().await;
  let safety = s.create_category(NewCategory::named("Safety")).await.unwrap();
  let press = s
    .create_category(NewCategory::under("Press Shop", safety.id))
    .await
    .unwrap();
  s.create_category(NewCategory::named("Assembly")).await.unwrap();

  let mut input = NewSkill::new("Lockout Tagout", "LOTO");
  input.category_id = Some(press.id);
  s.create_skill(input).await.unwrap();

  let all = s.list_categories(&CategoryQuery::default()).await.unwrap();
  assert_eq!(all.len(), 3);

  let roots = s
    .list_categories(&CategoryQuery {
      kind: Some(CategoryKind::Department),
      ..Default::default()
    })
    .await
    .unwrap();
  assert_eq!(roots.len(), 2);

  let under_safety = s
    .list_categories(&CategoryQuery {
      parent_id: Some(safety.id),
      ..Default::default()
    })
    .await
    .unwrap();
  assert_eq!(under_safety.len(), 1);
  assert_eq!(under_safety[0].child_count, 0);
  assert_eq!(under_safety[0].skill_count, 1);

  let stats = s.category_stats().await.unwrap();
  assert_eq!(stats.total, 3);
  assert_eq!(stats.departments, 2);
  assert_eq!(stats.areas, 1);
  assert_eq!(stats.active, 3);
}

// ─── Skills ──────────────────────────────────────────────────────────────────

#[tokio::test]
async fn skill_placement_and_category_inheritance() {
  let s = store().await;
  let cat = s.create_category(NewCategory::named("Assembly")).await.unwrap();

  let mut input = NewSkill::new("Riveting", "RVT");
  input.category_id = Some(cat.id);
  let root = s.create_skill(input).await.unwrap();
  assert_eq!(root.path, "riveting");
  assert_eq!(root.depth, 0);
  assert_eq!(root.max_proficiency_level, 3);
  assert!(!root.has_proficiency_levels);
  assert!(root.is_active);

  let mut input = NewSkill::new("Hand Riveting", "RVT-H");
  input.parent_skill_id = Some(root.id);
  let child = s.create_skill(input).await.unwrap();
  assert_eq!(child.path, "riveting/hand-riveting");
  assert_eq!(child.depth, 1);
  // The category came from the parent, not the input.
  assert_eq!(child.category_id, Some(cat.id));

  let mut input = NewSkill::new("Pneumatic Hand Riveting", "RVT-HP");
  input.parent_skill_id = Some(child.id);
  let leaf = s.create_skill(input).await.unwrap();
  assert_eq!(leaf.path, "riveting/hand-riveting/pneumatic-hand-riveting");
  assert_eq!(leaf.depth, 2);
}

#[tokio::test]
async fn skill_codes_are_unique_across_the_catalog() {
  let s = store().await;
  let root = s.create_skill(NewSkill::new("Riveting", "RVT")).await.unwrap();

  // Same code in a different subtree still collides.
  let mut input = NewSkill::new("Rotary Vane Training", "RVT");
  input.parent_skill_id = Some(root.id);
  let err = s.create_skill(input).await.unwrap_err();
  assert!(matches!(
    err,
    Error::Core(CoreError::Duplicate { entity: Entity::Skill, field: "code" })
  ));
}

#[tokio::test]
async fn skill_rename_rewrites_descendant_paths() {
  let s = store().await;
  let root = s.create_skill(NewSkill::new("Riveting", "RVT")).await.unwrap();
  let mut input = NewSkill::new("Hand Riveting", "RVT-H");
  input.parent_skill_id = Some(root.id);
  let child = s.create_skill(input).await.unwrap();
  let mut input = NewSkill::new("Pneumatic Hand Riveting", "RVT-HP");
  input.parent_skill_id = Some(child.id);
  let leaf = s.create_skill(input).await.unwrap();

  let renamed = s
    .update_skill(root.id, SkillUpdate {
      name: Some("Precision Riveting".into()),
      ..Default::default()
    })
    .await
    .unwrap();
  assert_eq!(renamed.path, "precision-riveting");

  let detail = s.get_skill(leaf.id).await.unwrap().unwrap();
  assert_eq!(
    detail.skill.path,
    "precision-riveting/hand-riveting/pneumatic-hand-riveting"
  );
}

#[tokio::test]
async fn skill_deletion_is_guarded_and_drops_edges() {
  let s = store().await;
  let root = s.create_skill(NewSkill::new("Welding", "WLD")).await.unwrap();
  let mut input = NewSkill::new("TIG Welding", "WLD-TIG");
  input.parent_skill_id = Some(root.id);
  let child = s.create_skill(input).await.unwrap();

  let err = s.delete_skill(root.id).await.unwrap_err();
  assert!(matches!(
    err,
    Error::Core(CoreError::DeleteBlocked {
      entity:     Entity::Skill,
      dependents: "sub-skills",
    })
  ));

  let safety = s.create_skill(NewSkill::new("Arc Safety", "ARC-S")).await.unwrap();
  s.add_prerequisite(child.id, NewPrerequisite {
    prerequisite_skill_id:     safety.id,
    minimum_proficiency_level: None,
  })
  .await
  .unwrap();

  // Deleting the prerequisite side takes its edges with it.
  s.delete_skill(safety.id).await.unwrap();
  assert!(s.list_prerequisites(child.id).await.unwrap().is_empty());

  s.delete_skill(child.id).await.unwrap();
  s.delete_skill(root.id).await.unwrap();
  assert!(s.get_skill(root.id).await.unwrap().is_none());
}

#[tokio::test]
async fn skill_breadcrumbs_cross_from_categories_into_skills() {
  let s = store().await;
  let dept = s.create_category(NewCategory::named("Assembly")).await.unwrap();
  let area = s
    .create_category(NewCategory::under("Final Line", dept.id))
    .await
    .unwrap();

  let mut input = NewSkill::new("Riveting", "RVT");
  input.category_id = Some(area.id);
  let root = s.create_skill(input).await.unwrap();
  let mut input = NewSkill::new("Hand Riveting", "RVT-H");
  input.parent_skill_id = Some(root.id);
  let child = s.create_skill(input).await.unwrap();

  let crumbs = s.skill_breadcrumbs(child.id).await.unwrap();
  let trail: Vec<_> = crumbs.iter().map(|c| (c.name.as_str(), c.kind)).collect();
  assert_eq!(trail, [
    ("Assembly", CrumbKind::Department),
    ("Final Line", CrumbKind::Area),
    ("Riveting", CrumbKind::Skill),
    ("Hand Riveting", CrumbKind::Skill),
  ]);
}

#[tokio::test]
async fn skill_listing_filters() {
  let s = store().await;
  let cat = s.create_category(NewCategory::named("Assembly")).await.unwrap();

  let mut input = NewSkill::new("Spot Welding", "WLD-SPOT");
  input.category_id = Some(cat.id);
  let welding = s.create_skill(input).await.unwrap();
  let mut input = NewSkill::new("Seam Welding", "WLD-SEAM");
  input.parent_skill_id = Some(welding.id);
  s.create_skill(input).await.unwrap();
  s.create_skill(NewSkill::new("Forklift Operation", "FORK"))
    .await
    .unwrap();

  let roots = s
    .list_skills(&SkillQuery { roots_only: true, ..Default::default() })
    .await
    .unwrap();
  assert_eq!(roots.len(), 2);

  let hits = s
    .list_skills(&SkillQuery {
      search: Some("weld".into()),
      ..Default::default()
    })
    .await
    .unwrap();
  assert_eq!(hits.len(), 2);
  assert!(hits.iter().all(|h| h.skill.name.contains("Welding")));

  let in_cat = s
    .list_skills(&SkillQuery {
      category_id: Some(cat.id),
      ..Default::default()
    })
    .await
    .unwrap();
  assert_eq!(in_cat.len(), 2);
  assert_eq!(in_cat[0].child_count, 1);
  assert_eq!(in_cat[0].category_name.as_deref(), Some("Assembly"));

  let by_code = s.get_skill_by_code("FORK").await.unwrap().unwrap();
  assert_eq!(by_code.name, "Forklift Operation");
  assert!(s.get_skill_by_code("MISSING").await.unwrap().is_none());
}

#[tokio::test]
async fn skill_stats_count_roots_and_certification() {
  let s = store().await;
  let root = s.create_skill(NewSkill::new("Welding", "WLD")).await.unwrap();
  let mut input = NewSkill::new("Crane Operation", "CRANE");
  input.requires_certification = Some(true);
  s.create_skill(input).await.unwrap();
  let mut input = NewSkill::new("TIG Welding", "WLD-TIG");
  input.parent_skill_id = Some(root.id);
  input.is_active = Some(false);
  s.create_skill(input).await.unwrap();

  let stats = s.skill_stats().await.unwrap();
  assert_eq!(stats.total, 3);
  assert_eq!(stats.active, 2);
  assert_eq!(stats.requires_certification, 1);
  assert_eq!(stats.root_skills, 2);
  assert_eq!(stats.sub_skills, 1);
}

// ─── Prerequisites ───────────────────────────────────────────────────────────

#[tokio::test]
async fn prerequisite_edges_reject_self_and_duplicates() {
  let s = store().await;
  let welding = s.create_skill(NewSkill::new("Welding", "WLD")).await.unwrap();
  let safety =
    s.create_skill(NewSkill::new("Arc Safety", "ARC-S")).await.unwrap();

  let err = s
    .add_prerequisite(welding.id, NewPrerequisite {
      prerequisite_skill_id:     welding.id,
      minimum_proficiency_level: None,
    })
    .await
    .unwrap_err();
  assert!(matches!(err, Error::Core(CoreError::SelfPrerequisite)));

  let edge = s
    .add_prerequisite(welding.id, NewPrerequisite {
      prerequisite_skill_id:     safety.id,
      minimum_proficiency_level: None,
    })
    .await
    .unwrap();
  assert_eq!(edge.minimum_proficiency_level, 1);

  let err = s
    .add_prerequisite(welding.id, NewPrerequisite {
      prerequisite_skill_id:     safety.id,
      minimum_proficiency_level: Some(2),
    })
    .await
    .unwrap_err();
  assert!(matches!(err, Error::Core(CoreError::DuplicatePrerequisite)));

  // Mutual prerequisites are allowed; only self-edges and duplicates are not.
  s.add_prerequisite(safety.id, NewPrerequisite {
    prerequisite_skill_id:     welding.id,
    minimum_proficiency_level: Some(3),
  })
  .await
  .unwrap();

  let listed = s.list_prerequisites(welding.id).await.unwrap();
  assert_eq!(listed.len(), 1);
  assert_eq!(listed[0].prerequisite_name, "Arc Safety");
  assert_eq!(listed[0].prerequisite_code, "ARC-S");
}

#[tokio::test]
async fn prerequisite_removal_checks_ownership() {
  let s = store().await;
  let a = s.create_skill(NewSkill::new("Welding", "WLD")).await.unwrap();
  let b = s.create_skill(NewSkill::new("Arc Safety", "ARC-S")).await.unwrap();
  let edge = s
    .add_prerequisite(a.id, NewPrerequisite {
      prerequisite_skill_id:     b.id,
      minimum_proficiency_level: None,
    })
    .await
    .unwrap();

  // The edge belongs to `a`; removing it through `b` is a miss.
  let err = s.remove_prerequisite(b.id, edge.id).await.unwrap_err();
  assert!(matches!(
    err,
    Error::Core(CoreError::NotFound { entity: Entity::Prerequisite, .. })
  ));

  s.remove_prerequisite(a.id, edge.id).await.unwrap();
  assert!(s.list_prerequisites(a.id).await.unwrap().is_empty());
}

// ─── Departments & roles ─────────────────────────────────────────────────────

#[tokio::test]
async fn department_codes_derive_from_names() {
  let s = store().await;
  let dept = s
    .create_department(NewDepartment::named("Quality Assurance"))
    .await
    .unwrap();
  assert_eq!(dept.code, "QUALITYASS");
  assert!(dept.is_active);

  let err = s
    .create_department(NewDepartment::named("Quality Assurance"))
    .await
    .unwrap_err();
  assert!(matches!(
    err,
    Error::Core(CoreError::Duplicate {
      entity: Entity::Department,
      field:  "name",
    })
  ));

  let mut clash = NewDepartment::named("Quality Audit Systems");
  clash.code = Some("QUALITYASS".into());
  let err = s.create_department(clash).await.unwrap_err();
  assert!(matches!(
    err,
    Error::Core(CoreError::Duplicate {
      entity: Entity::Department,
      field:  "code",
    })
  ));
}

#[tokio::test]
async fn department_deletion_is_guarded_by_assignments() {
  let s = store().await;
  let dept =
    s.create_department(NewDepartment::named("Operations")).await.unwrap();
  let role = employee_role(&s).await;
  let mut input = user_input("EMP-001", role.id);
  input.department_id = Some(dept.id);
  let user = s.create_user(input).await.unwrap();

  let err = s.delete_department(dept.id).await.unwrap_err();
  assert!(matches!(
    err,
    Error::Core(CoreError::DeleteBlocked {
      entity:     Entity::Department,
      dependents: "assigned users",
    })
  ));

  s.update_user(user.id, UserUpdate {
    department_id: Some(Uuid::nil()),
    ..Default::default()
  })
  .await
  .unwrap();
  let mut input = NewProject::named("Line 2 Retooling");
  input.department_id = Some(dept.id);
  s.create_project(input).await.unwrap();

  let err = s.delete_department(dept.id).await.unwrap_err();
  assert!(matches!(
    err,
    Error::Core(CoreError::DeleteBlocked {
      entity:     Entity::Department,
      dependents: "assigned projects",
    })
  ));
}

#[tokio::test]
async fn department_detail_carries_manager_and_members() {
  let s = store().await;
  let dept =
    s.create_department(NewDepartment::named("Operations")).await.unwrap();
  let role = employee_role(&s).await;
  let mut input = user_input("EMP-001", role.id);
  input.department_id = Some(dept.id);
  let user = s.create_user(input).await.unwrap();

  s.update_department(dept.id, DepartmentUpdate {
    manager_id: Some(user.id),
    ..Default::default()
  })
  .await
  .unwrap();

  let detail = s.get_department(dept.id).await.unwrap().unwrap();
  assert_eq!(detail.manager.as_ref().map(|m| m.id), Some(user.id));
  assert_eq!(detail.members.len(), 1);
  assert_eq!(detail.members[0].department_name.as_deref(), Some("Operations"));

  // The nil uuid clears the manager.
  s.update_department(dept.id, DepartmentUpdate {
    manager_id: Some(Uuid::nil()),
    ..Default::default()
  })
  .await
  .unwrap();
  let detail = s.get_department(dept.id).await.unwrap().unwrap();
  assert!(detail.manager.is_none());

  let listed = s.list_departments(Some(true)).await.unwrap();
  assert_eq!(listed.len(), 1);
  assert_eq!(listed[0].member_count, 1);
}

#[tokio::test]
async fn roles_round_trip_permission_sets() {
  let s = store().await;
  let admin = s
    .add_role(NewRole {
      name:           "admin".into(),
      description:    Some("Full access".into()),
      permissions:    PermissionSet::All,
      is_system_role: true,
    })
    .await
    .unwrap();
  assert!(admin.permissions.allows(Permission::UserDelete));

  let viewer = s
    .add_role(NewRole {
      name:           "viewer".into(),
      description:    None,
      permissions:    [Permission::SkillView].into_iter().collect(),
      is_system_role: false,
    })
    .await
    .unwrap();

  let err = s
    .add_role(NewRole {
      name:           "admin".into(),
      description:    None,
      permissions:    PermissionSet::empty(),
      is_system_role: false,
    })
    .await
    .unwrap_err();
  assert!(matches!(
    err,
    Error::Core(CoreError::Duplicate { entity: Entity::Role, field: "name" })
  ));

  let fetched = s.get_role_by_name("viewer").await.unwrap().unwrap();
  assert_eq!(fetched.id, viewer.id);
  assert!(fetched.permissions.allows(Permission::SkillView));
  assert!(!fetched.permissions.allows(Permission::SkillDelete));
  assert_eq!(s.list_roles().await.unwrap().len(), 2);
}

// ─── Users ───────────────────────────────────────────────────────────────────

#[tokio::test]
async fn user_natural_keys_are_enforced() {
  let s = store().await;
  let role = employee_role(&s).await;
  let mut input = user_input("EMP-001", role.id);
  input.email = Some("pat@factory.local".into());
  s.create_user(input).await.unwrap();

  let err = s.create_user(user_input("EMP-001", role.id)).await.unwrap_err();
  assert!(matches!(
    err,
    Error::Core(CoreError::Duplicate {
      entity: Entity::User,
      field:  "employee id",
    })
  ));

  let mut input = user_input("EMP-002", role.id);
  input.email = Some("pat@factory.local".into());
  let err = s.create_user(input).await.unwrap_err();
  assert!(matches!(
    err,
    Error::Core(CoreError::Duplicate { entity: Entity::User, field: "email" })
  ));

  let err =
    s.create_user(user_input("EMP-003", Uuid::new_v4())).await.unwrap_err();
  assert!(matches!(
    err,
    Error::Core(CoreError::NotFound { entity: Entity::Role, .. })
  ));
}

#[tokio::test]
async fn user_update_clears_optional_links() {
  let s = store().await;
  let dept =
    s.create_department(NewDepartment::named("Operations")).await.unwrap();
  let role = employee_role(&s).await;
  let mut input = user_input("EMP-001", role.id);
  input.email = Some("pat@factory.local".into());
  input.department_id = Some(dept.id);
  let user = s.create_user(input).await.unwrap();

  let updated = s
    .update_user(user.id, UserUpdate {
      email: Some(String::new()),
      department_id: Some(Uuid::nil()),
      ..Default::default()
    })
    .await
    .unwrap();
  assert_eq!(updated.email, None);
  assert_eq!(updated.department_id, None);
}

#[tokio::test]
async fn login_counters_track_failures_and_lockout() {
  let s = store().await;
  let user = seeded_user(&s).await;
  let deadline = Utc::now() + Duration::minutes(15);

  s.record_login_failure(user.id, None).await.unwrap();
  s.record_login_failure(user.id, Some(deadline)).await.unwrap();
  // A later failure without a deadline keeps the existing lockout.
  s.record_login_failure(user.id, None).await.unwrap();

  let current = s.get_user_by_employee_id("EMP-001").await.unwrap().unwrap();
  assert_eq!(current.failed_login_attempts, 3);
  assert_eq!(current.locked_until, Some(deadline));

  s.record_login_success(user.id).await.unwrap();
  let current = s.get_user_by_employee_id("EMP-001").await.unwrap().unwrap();
  assert_eq!(current.failed_login_attempts, 0);
  assert_eq!(current.locked_until, None);

  let err = s.record_login_failure(Uuid::new_v4(), None).await.unwrap_err();
  assert!(matches!(
    err,
    Error::Core(CoreError::NotFound { entity: Entity::User, .. })
  ));
}

#[tokio::test]
async fn user_listing_filters() {
  let s = store().await;
  let role = employee_role(&s).await;
  let mut input = user_input("EMP-001", role.id);
  input.name = "Sarah Supervisor".into();
  s.create_user(input).await.unwrap();
  let mut input = user_input("EMP-002", role.id);
  input.is_active = Some(false);
  s.create_user(input).await.unwrap();

  let active = s
    .list_users(&UserQuery { active: Some(true), ..Default::default() })
    .await
    .unwrap();
  assert_eq!(active.len(), 1);
  assert_eq!(active[0].employee_id, "EMP-001");
  assert_eq!(active[0].role_name, "employee");

  let hits = s
    .list_users(&UserQuery { search: Some("sarah".into()), ..Default::default() })
    .await
    .unwrap();
  assert_eq!(hits.len(), 1);
  assert_eq!(hits[0].name, "Sarah Supervisor");
}

// ─── Sessions ────────────────────────────────────────────────────────────────

#[tokio::test]
async fn caller_resolution_checks_expiry_and_account_state() {
  let s = store().await;
  let user = seeded_user(&s).await;
  let now = Utc::now();

  s.create_session(NewSession {
    token_hash: "live".into(),
    user_id:    user.id,
    expires_at: now + Duration::hours(8),
  })
  .await
  .unwrap();
  s.create_session(NewSession {
    token_hash: "stale".into(),
    user_id:    user.id,
    expires_at: now - Duration::hours(1),
  })
  .await
  .unwrap();

  let caller = s.resolve_caller("live", now).await.unwrap().unwrap();
  assert_eq!(caller.user_id, user.id);
  assert_eq!(caller.employee_id, "EMP-001");
  assert_eq!(caller.role_name, "employee");
  assert!(caller.can(Permission::SkillView));
  assert!(!caller.can(Permission::UserDelete));

  assert!(s.resolve_caller("stale", now).await.unwrap().is_none());
  assert!(s.resolve_caller("unknown", now).await.unwrap().is_none());

  // Deactivating the account invalidates its live sessions.
  s.update_user(user.id, UserUpdate {
    is_active: Some(false),
    ..Default::default()
  })
  .await
  .unwrap();
  assert!(s.resolve_caller("live", now).await.unwrap().is_none());
}

#[tokio::test]
async fn session_deletion_and_sweep() {
  let s = store().await;
  let user = seeded_user(&s).await;
  let now = Utc::now();

  for (hash, offset) in [("a", -2), ("b", -1), ("c", 8)] {
    s.create_session(NewSession {
      token_hash: hash.into(),
      user_id:    user.id,
      expires_at: now + Duration::hours(offset),
    })
    .await
    .unwrap();
  }

  assert_eq!(s.sweep_expired_sessions(now).await.unwrap(), 2);
  assert!(s.resolve_caller("c", now).await.unwrap().is_some());

  s.delete_session("c").await.unwrap();
  assert!(s.resolve_caller("c", now).await.unwrap().is_none());
  // Deleting an unknown token is not an error.
  s.delete_session("c").await.unwrap();
}

// ─── Projects ────────────────────────────────────────────────────────────────

#[tokio::test]
async fn project_creation_defaults_and_links() {
  let s = store().await;
  let dept =
    s.create_department(NewDepartment::named("Operations")).await.unwrap();
  let user = seeded_user(&s).await;

  let mut input = NewProject::named("Equipment Calibration");
  input.department_id = Some(dept.id);
  input.owner_id = Some(user.id);
  let project = s.create_project(input).await.unwrap();
  assert_eq!(project.status, ProjectStatus::Draft);
  assert!(project.is_active);

  let summary = s.get_project(project.id).await.unwrap().unwrap();
  assert_eq!(summary.owner_name.as_deref(), Some("Pat Fitter"));
  assert_eq!(summary.department_name.as_deref(), Some("Operations"));

  let mut input = NewProject::named("Orphan Project");
  input.department_id = Some(Uuid::new_v4());
  let err = s.create_project(input).await.unwrap_err();
  assert!(matches!(
    err,
    Error::Core(CoreError::NotFound { entity: Entity::Department, .. })
  ));
}

#[tokio::test]
async fn project_update_and_delete() {
  let s = store().await;
  let project =
    s.create_project(NewProject::named("Line 2 Retooling")).await.unwrap();

  let updated = s
    .update_project(project.id, ProjectUpdate {
      status: Some(ProjectStatus::Active),
      ..Default::default()
    })
    .await
    .unwrap();
  assert_eq!(updated.status, ProjectStatus::Active);

  s.delete_project(project.id).await.unwrap();
  let err = s.delete_project(project.id).await.unwrap_err();
  assert!(matches!(
    err,
    Error::Core(CoreError::NotFound { entity: Entity::Project, .. })
  ));
}

#[tokio::test]
async fn project_listing_filters_and_stats() {
  let s = store().await;
  s.create_project(NewProject::named("Safety Training Program"))
    .await
    .unwrap();
  let mut input = NewProject::named("Process Improvement Initiative");
  input.status = Some(ProjectStatus::Active);
  s.create_project(input).await.unwrap();
  let mut input = NewProject::named("Legacy Line Shutdown");
  input.status = Some(ProjectStatus::Completed);
  s.create_project(input).await.unwrap();

  let active = s
    .list_projects(&ProjectQuery {
      status: Some(ProjectStatus::Active),
      ..Default::default()
    })
    .await
    .unwrap();
  assert_eq!(active.len(), 1);

  let hits = s
    .list_projects(&ProjectQuery {
      search: Some("training".into()),
      ..Default::default()
    })
    .await
    .unwrap();
  assert_eq!(hits.len(), 1);

  let stats = s.project_stats().await.unwrap();
  assert_eq!(stats.total, 3);
  assert_eq!(stats.draft, 1);
  assert_eq!(stats.active, 1);
  assert_eq!(stats.completed, 1);
}

// ─── Settings, audit, attachments ────────────────────────────────────────────

#[tokio::test]
async fn settings_default_and_round_trip() {
  let s = store().await;
  assert_eq!(s.get_settings().await.unwrap(), SystemSettings::default());

  let mut settings = SystemSettings::default();
  settings.session.idle_timeout_hours = 2;
  settings.notifications.email_enabled = true;
  s.put_settings(settings.clone()).await.unwrap();
  assert_eq!(s.get_settings().await.unwrap(), settings);

  settings.session.max_duration_hours = 0;
  let err = s.put_settings(settings).await.unwrap_err();
  assert!(matches!(err, Error::Core(CoreError::Invalid(_))));
}

#[tokio::test]
async fn audit_log_records_and_filters() {
  let s = store().await;
  let user = seeded_user(&s).await;
  let skill = s.create_skill(NewSkill::new("Welding", "WLD")).await.unwrap();

  for action in ["create", "update"] {
    s.record_audit(NewAuditEntry {
      user_id:     Some(user.id),
      entity_kind: EntityKind::Skill,
      entity_id:   skill.id,
      action:      action.into(),
      details:     Some(serde_json::json!({ "code": "WLD" })),
    })
    .await
    .unwrap();
  }
  s.record_audit(NewAuditEntry {
    user_id:     None,
    entity_kind: EntityKind::User,
    entity_id:   user.id,
    action:      "login".into(),
    details:     None,
  })
  .await
  .unwrap();

  let skill_entries = s
    .list_audit(&AuditQuery {
      entity_kind: Some(EntityKind::Skill),
      ..Default::default()
    })
    .await
    .unwrap();
  assert_eq!(skill_entries.len(), 2);
  assert_eq!(
    skill_entries[0].details,
    Some(serde_json::json!({ "code": "WLD" }))
  );

  let by_user = s
    .list_audit(&AuditQuery { user_id: Some(user.id), ..Default::default() })
    .await
    .unwrap();
  assert_eq!(by_user.len(), 2);

  let capped = s
    .list_audit(&AuditQuery { limit: Some(2), ..Default::default() })
    .await
    .unwrap();
  assert_eq!(capped.len(), 2);
}

#[tokio::test]
async fn attachments_scope_to_their_entity() {
  let s = store().await;
  let user = seeded_user(&s).await;

  let attachment = s
    .add_attachment(NewAttachment {
      entity_kind:  EntityKind::User,
      entity_id:    user.id,
      kind:         AttachmentKind::Avatar,
      filename:     "avatar.png".into(),
      content_type: "image/png".into(),
      size_bytes:   2048,
      storage_path: "avatars/emp-001.png".into(),
      uploaded_by:  Some(user.id),
    })
    .await
    .unwrap();
  assert_eq!(attachment.filename, "avatar.png");

  let listed = s.list_attachments(EntityKind::User, user.id).await.unwrap();
  assert_eq!(listed.len(), 1);
  assert_eq!(listed[0].id, attachment.id);
  assert!(s
    .list_attachments(EntityKind::Project, user.id)
    .await
    .unwrap()
    .is_empty());

  let err = s
    .add_attachment(NewAttachment {
      entity_kind:  EntityKind::User,
      entity_id:    user.id,
      kind:         AttachmentKind::Photo,
      filename:     "photo.jpg".into(),
      content_type: "image/jpeg".into(),
      size_bytes:   0,
      storage_path: "photos/p.jpg".into(),
      uploaded_by:  None,
    })
    .await
    .unwrap_err();
  assert!(matches!(err, Error::Core(CoreError::Invalid(_))));
}

//! Seed data for a fresh deployment.
//!
//! Three system roles, three departments, one user per role, and a handful
//! of starter projects. Every helper checks for the row before creating it,
//! so the seeder is idempotent and safe to run on every boot.

use gemba_core::{
  org::{Department, NewDepartment, NewRole, NewUser, Role, User},
  permission::PermissionSet,
  project::{NewProject, ProjectQuery, ProjectStatus},
  store::FactoryStore,
};
use uuid::Uuid;

pub async fn run<S: FactoryStore>(store: &S) -> gemba_core::Result<()> {
  let employee = ensure_role(
    store,
    "employee",
    "Line worker with read access to the skill catalog",
    &["department:view", "skill:view", "skill_category:view"],
  )
  .await?;
  let supervisor = ensure_role(
    store,
    "supervisor",
    "Shift supervisor, additionally sees user records",
    &["department:view", "skill:view", "skill_category:view", "user:view"],
  )
  .await?;
  let admin = ensure_role(store, "admin", "Full access", &["*"]).await?;

  let operations =
    ensure_department(store, "Operations", "OPS", "Factory floor operations")
      .await?;
  let engineering = ensure_department(
    store,
    "Engineering",
    "ENG",
    "Process engineering and improvement",
  )
  .await?;
  let management =
    ensure_department(store, "Management", "MGMT", "Plant management").await?;

  ensure_user(
    store,
    "ADMIN-001",
    "Admin User",
    "admin@factory.local",
    "123456",
    admin.id,
    management.id,
  )
  .await?;
  ensure_user(
    store,
    "SUP-001",
    "Sarah Supervisor",
    "sarah@factory.local",
    "567890",
    supervisor.id,
    operations.id,
  )
  .await?;
  ensure_user(
    store,
    "EMP-001",
    "John Employee",
    "john@factory.local",
    "000000",
    employee.id,
    operations.id,
  )
  .await?;

  ensure_project(
    store,
    "Equipment Calibration Q1",
    ProjectStatus::Active,
    operations.id,
  )
  .await?;
  ensure_project(
    store,
    "Safety Training Program",
    ProjectStatus::Draft,
    operations.id,
  )
  .await?;
  ensure_project(
    store,
    "Process Improvement Initiative",
    ProjectStatus::Active,
    engineering.id,
  )
  .await?;

  tracing::info!("seed data verified");
  Ok(())
}

async fn ensure_role<S: FactoryStore>(
  store: &S,
  name: &str,
  description: &str,
  permissions: &[&str],
) -> gemba_core::Result<Role> {
  if let Some(role) = store.get_role_by_name(name).await.map_err(Into::into)? {
    return Ok(role);
  }
  store
    .add_role(NewRole {
      name:           name.to_owned(),
      description:    Some(description.to_owned()),
      permissions:    PermissionSet::parse(permissions.iter().copied())?,
      is_system_role: true,
    })
    .await
    .map_err(Into::into)
}

async fn ensure_department<S: FactoryStore>(
  store: &S,
  name: &str,
  code: &str,
  description: &str,
) -> gemba_core::Result<Department> {
  let existing = store.list_departments(None).await.map_err(Into::into)?;
  if let Some(found) = existing.into_iter().find(|d| d.department.code == code)
  {
    return Ok(found.department);
  }
  store
    .create_department(NewDepartment {
      name:        name.to_owned(),
      code:        Some(code.to_owned()),
      description: Some(description.to_owned()),
      ..NewDepartment::default()
    })
    .await
    .map_err(Into::into)
}

async fn ensure_user<S: FactoryStore>(
  store: &S,
  employee_id: &str,
  name: &str,
  email: &str,
  pin: &str,
  role_id: Uuid,
  department_id: Uuid,
) -> gemba_core::Result<User> {
  if let Some(user) = store
    .get_user_by_employee_id(employee_id)
    .await
    .map_err(Into::into)?
  {
    return Ok(user);
  }
  store
    .create_user(NewUser {
      employee_id:   employee_id.to_owned(),
      name:          name.to_owned(),
      email:         Some(email.to_owned()),
      pin_hash:      gemba_api::pin::hash_pin(pin)?,
      role_id,
      department_id: Some(department_id),
      is_active:     None,
    })
    .await
    .map_err(Into::into)
}

async fn ensure_project<S: FactoryStore>(
  store: &S,
  name: &str,
  status: ProjectStatus,
  department_id: Uuid,
) -> gemba_core::Result<()> {
  let existing = store
    .list_projects(&ProjectQuery::default())
    .await
    .map_err(Into::into)?;
  if existing.iter().any(|p| p.project.name == name) {
    return Ok(());
  }
  store
    .create_project(NewProject {
      name:          name.to_owned(),
      status:        Some(status),
      department_id: Some(department_id),
      ..NewProject::default()
    })
    .await
    .map_err(Into::into)?;
  Ok(())
}

//! [`SqliteStore`] — the SQLite implementation of [`FactoryStore`].

use std::{collections::HashSet, path::Path};

use chrono::{DateTime, Utc};
use rusqlite::OptionalExtension as _;
use uuid::Uuid;

use gemba_core::{
  category::{
    Category, CategoryDetail, CategoryKind, CategoryQuery, CategoryStats,
    CategorySummary, CategoryUpdate, NewCategory,
  },
  org::{
    Department, DepartmentDetail, DepartmentSummary, DepartmentUpdate,
    NewDepartment, NewRole, NewUser, Role, User, UserQuery, UserSummary,
    UserUpdate,
  },
  project::{
    NewProject, Project, ProjectQuery, ProjectStats, ProjectSummary,
    ProjectUpdate,
  },
  session::{Caller, NewSession, SessionRecord},
  skill::{
    NewPrerequisite, NewSkill, PrerequisiteDetail, Skill, SkillDetail,
    SkillPrerequisite, SkillQuery, SkillStats, SkillSummary, SkillUpdate,
  },
  store::FactoryStore,
  system::{
    Attachment, AuditEntry, AuditQuery, EntityKind, NewAttachment,
    NewAuditEntry, SystemSettings,
  },
  tree::{
    child_placement, derive_code, root_placement, slugify, CategoryCrumb,
    CrumbKind, SkillCrumb, CATEGORY_CODE_MAX,
  },
  validate, Entity, Error as CoreError,
};

use crate::{
  encode::{
    decode_category_kind, decode_uuid, encode_attachment_kind,
    encode_category_kind, encode_date, encode_dt, encode_entity_kind,
    encode_permissions, encode_status, encode_uuid, RawAttachment, RawAudit,
    RawCaller, RawCategory, RawCategorySummary, RawDepartment,
    RawDepartmentSummary, RawPrerequisiteDetail, RawProject,
    RawProjectSummary, RawRole, RawSkill, RawSkillSummary, RawUser,
    RawUserSummary, ATTACHMENT_COLS, AUDIT_COLS, CATEGORY_COLS,
    DEPARTMENT_COLS, PROJECT_COLS, ROLE_COLS, SKILL_COLS, USER_COLS,
  },
  schema::SCHEMA,
  Error, Result,
};

// ─── Shared projections ──────────────────────────────────────────────────────
// Column order in these joins must match the `from_row` readers in `encode`.

const USER_SUMMARY_SQL: &str = "SELECT u.id, u.employee_id, u.name, u.email, \
   u.role_id, r.name, u.department_id, d.name, u.is_active, u.created_at \
   FROM users u \
   JOIN roles r ON r.id = u.role_id \
   LEFT JOIN departments d ON d.id = u.department_id";

const PROJECT_SUMMARY_SQL: &str = "SELECT p.id, p.name, p.description, \
   p.status, p.department_id, p.owner_id, p.start_date, p.end_date, \
   p.is_active, p.created_at, p.updated_at, \
   o.name AS owner_name, d.name AS department_name \
   FROM projects p \
   LEFT JOIN users o ON o.id = p.owner_id \
   LEFT JOIN departments d ON d.id = p.department_id";

const PREREQUISITE_DETAIL_SQL: &str = "SELECT p.id, p.skill_id, \
   p.prerequisite_skill_id, p.minimum_proficiency_level, p.created_at, \
   s.name, s.code \
   FROM skill_prerequisites p \
   JOIN skills s ON s.id = p.prerequisite_skill_id \
   WHERE p.skill_id = ?1 \
   ORDER BY p.created_at";

// ─── Store ───────────────────────────────────────────────────────────────────

/// A factory-organization store backed by a single SQLite file.
///
/// Cloning is cheap — the inner connection is reference-counted.
#[derive(Clone)]
pub struct SqliteStore {
  conn: tokio_rusqlite::Connection,
}

impl SqliteStore {
  /// Open (or create) a store at `path` and run schema initialisation.
  pub async fn open(path: impl AsRef<Path>) -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open(path).await?;
    let store = Self { conn };
    store.init_schema().await?;
    Ok(store)
  }

  /// Open an in-memory store — useful for testing.
  pub async fn open_in_memory() -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open_in_memory().await?;
    let store = Self { conn };
    store.init_schema().await?;
    Ok(store)
  }

  async fn init_schema(&self) -> Result<()> {
    self
      .conn
      .call(|conn| {
        conn.execute_batch(SCHEMA)?;
        Ok(())
      })
      .await?;
    Ok(())
  }

  /// `SELECT 1` existence probe for referential pre-checks.
  async fn row_exists(&self, sql: &'static str, id: Uuid) -> Result<bool> {
    let id_str = encode_uuid(id);
    let exists = self
      .conn
      .call(move |conn| {
        Ok(
          conn
            .query_row(sql, rusqlite::params![id_str], |_| Ok(true))
            .optional()?
            .unwrap_or(false),
        )
      })
      .await?;
    Ok(exists)
  }

  async fn fetch_category(&self, id: Uuid) -> Result<Option<Category>> {
    let id_str = encode_uuid(id);
    let raw: Option<RawCategory> = self
      .conn
      .call(move |conn| {
        Ok(
          conn
            .query_row(
              &format!("SELECT {CATEGORY_COLS} FROM skill_categories WHERE id = ?1"),
              rusqlite::params![id_str],
              RawCategory::from_row,
            )
            .optional()?,
        )
      })
      .await?;
    raw.map(RawCategory::into_category).transpose()
  }

  async fn fetch_skill(&self, id: Uuid) -> Result<Option<Skill>> {
    let id_str = encode_uuid(id);
    let raw: Option<RawSkill> = self
      .conn
      .call(move |conn| {
        Ok(
          conn
            .query_row(
              &format!("SELECT {SKILL_COLS} FROM skills WHERE id = ?1"),
              rusqlite::params![id_str],
              RawSkill::from_row,
            )
            .optional()?,
        )
      })
      .await?;
    raw.map(RawSkill::into_skill).transpose()
  }

  async fn fetch_department(&self, id: Uuid) -> Result<Option<Department>> {
    let id_str = encode_uuid(id);
    let raw: Option<RawDepartment> = self
      .conn
      .call(move |conn| {
        Ok(
          conn
            .query_row(
              &format!("SELECT {DEPARTMENT_COLS} FROM departments WHERE id = ?1"),
              rusqlite::params![id_str],
              RawDepartment::from_row,
            )
            .optional()?,
        )
      })
      .await?;
    raw.map(RawDepartment::into_department).transpose()
  }

  async fn fetch_user(&self, id: Uuid) -> Result<Option<User>> {
    let id_str = encode_uuid(id);
    let raw: Option<RawUser> = self
      .conn
      .call(move |conn| {
        Ok(
          conn
            .query_row(
              &format!("SELECT {USER_COLS} FROM users WHERE id = ?1"),
              rusqlite::params![id_str],
              RawUser::from_row,
            )
            .optional()?,
        )
      })
      .await?;
    raw.map(RawUser::into_user).transpose()
  }

  async fn fetch_project(&self, id: Uuid) -> Result<Option<Project>> {
    let id_str = encode_uuid(id);
    let raw: Option<RawProject> = self
      .conn
      .call(move |conn| {
        Ok(
          conn
            .query_row(
              &format!("SELECT {PROJECT_COLS} FROM projects WHERE id = ?1"),
              rusqlite::params![id_str],
              RawProject::from_row,
            )
            .optional()?,
        )
      })
      .await?;
    raw.map(RawProject::into_project).transpose()
  }

  /// Early rejection for the three category natural keys. The UNIQUE
  /// constraints stay authoritative for the insert itself.
  async fn category_dup_check(
    &self,
    name: &str,
    code: &str,
    slug: &str,
    parent_id: Option<Uuid>,
    exclude: Option<Uuid>,
  ) -> Result<()> {
    let name_owned  = name.to_owned();
    let code_owned  = code.to_owned();
    let slug_owned  = slug.to_owned();
    let parent_str  = parent_id.map(encode_uuid);
    let exclude_str = exclude.map(encode_uuid);

    let (name_taken, code_taken, slug_taken): (bool, bool, bool) = self
      .conn
      .call(move |conn| {
        let name_taken: bool = conn
          .query_row(
            "SELECT 1 FROM skill_categories WHERE name = ?1
               AND (?2 IS NULL OR id != ?2)",
            rusqlite::params![name_owned, exclude_str],
            |_| Ok(true),
          )
          .optional()?
          .unwrap_or(false);

        let code_taken: bool = conn
          .query_row(
            "SELECT 1 FROM skill_categories WHERE code = ?1
               AND (?2 IS NULL OR id != ?2)",
            rusqlite::params![code_owned, exclude_str],
            |_| Ok(true),
          )
          .optional()?
          .unwrap_or(false);

        // Slug uniqueness is scoped to the sibling set; `IS` matches NULL
        // parents (roots) too.
        let slug_taken: bool = conn
          .query_row(
            "SELECT 1 FROM skill_categories WHERE slug = ?1 AND parent_id IS ?2
               AND (?3 IS NULL OR id != ?3)",
            rusqlite::params![slug_owned, parent_str, exclude_str],
            |_| Ok(true),
          )
          .optional()?
          .unwrap_or(false);

        Ok((name_taken, code_taken, slug_taken))
      })
      .await?;

    if name_taken {
      return Err(CoreError::duplicate(Entity::Category, "name").into());
    }
    if code_taken {
      return Err(CoreError::duplicate(Entity::Category, "code").into());
    }
    if slug_taken {
      return Err(CoreError::duplicate(Entity::Category, "slug").into());
    }
    Ok(())
  }

  /// Skill codes are unique across the whole catalog, not per subtree.
  async fn skill_code_check(&self, code: &str, exclude: Option<Uuid>) -> Result<()> {
    let code_owned  = code.to_owned();
    let exclude_str = exclude.map(encode_uuid);

    let taken: bool = self
      .conn
      .call(move |conn| {
        Ok(
          conn
            .query_row(
              "SELECT 1 FROM skills WHERE code = ?1
                 AND (?2 IS NULL OR id != ?2)",
              rusqlite::params![code_owned, exclude_str],
              |_| Ok(true),
            )
            .optional()?
            .unwrap_or(false),
        )
      })
      .await?;

    if taken {
      return Err(CoreError::duplicate(Entity::Skill, "code").into());
    }
    Ok(())
  }

  async fn department_dup_check(
    &self,
    name: &str,
    code: &str,
    exclude: Option<Uuid>,
  ) -> Result<()> {
    let name_owned  = name.to_owned();
    let code_owned  = code.to_owned();
    let exclude_str = exclude.map(encode_uuid);

    let (name_taken, code_taken): (bool, bool) = self
      .conn
      .call(move |conn| {
        let name_taken: bool = conn
          .query_row(
            "SELECT 1 FROM departments WHERE name = ?1
               AND (?2 IS NULL OR id != ?2)",
            rusqlite::params![name_owned, exclude_str],
            |_| Ok(true),
          )
          .optional()?
          .unwrap_or(false);

        let code_taken: bool = conn
          .query_row(
            "SELECT 1 FROM departments WHERE code = ?1
               AND (?2 IS NULL OR id != ?2)",
            rusqlite::params![code_owned, exclude_str],
            |_| Ok(true),
          )
          .optional()?
          .unwrap_or(false);

        Ok((name_taken, code_taken))
      })
      .await?;

    if name_taken {
      return Err(CoreError::duplicate(Entity::Department, "name").into());
    }
    if code_taken {
      return Err(CoreError::duplicate(Entity::Department, "code").into());
    }
    Ok(())
  }

  async fn user_dup_check(
    &self,
    employee_id: Option<&str>,
    email: Option<&str>,
    exclude: Option<Uuid>,
  ) -> Result<()> {
    let employee_owned = employee_id.map(str::to_owned);
    let email_owned    = email.map(str::to_owned);
    let exclude_str    = exclude.map(encode_uuid);

    let (employee_taken, email_taken): (bool, bool) = self
      .conn
      .call(move |conn| {
        let employee_taken: bool = conn
          .query_row(
            "SELECT 1 FROM users WHERE employee_id = ?1
               AND (?2 IS NULL OR id != ?2)",
            rusqlite::params![employee_owned, exclude_str],
            |_| Ok(true),
          )
          .optional()?
          .unwrap_or(false);

        let email_taken: bool = conn
          .query_row(
            "SELECT 1 FROM users WHERE email = ?1
               AND (?2 IS NULL OR id != ?2)",
            rusqlite::params![email_owned, exclude_str],
            |_| Ok(true),
          )
          .optional()?
          .unwrap_or(false);

        Ok((employee_taken, email_taken))
      })
      .await?;

    if employee_taken {
      return Err(CoreError::duplicate(Entity::User, "employee id").into());
    }
    if email_taken {
      return Err(CoreError::duplicate(Entity::User, "email").into());
    }
    Ok(())
  }
}

// ─── Constraint mapping ──────────────────────────────────────────────────────

/// Translate a SQLite constraint violation into the same taxonomy error the
/// pre-checks produce, so the read-then-write race cannot leak a raw database
/// error. Anything unrecognized passes through as a database error.
fn map_constraint(err: tokio_rusqlite::Error) -> Error {
  let tokio_rusqlite::Error::Rusqlite(rusqlite::Error::SqliteFailure(code, Some(msg))) =
    &err
  else {
    return Error::Database(err);
  };
  if code.code != rusqlite::ErrorCode::ConstraintViolation {
    return Error::Database(err);
  }

  if msg.contains("skill_prerequisites") {
    if msg.starts_with("CHECK") {
      return CoreError::SelfPrerequisite.into();
    }
    return CoreError::DuplicatePrerequisite.into();
  }

  let dup = |entity, field| CoreError::duplicate(entity, field).into();
  if msg.contains("skill_categories_root_slug_idx")
    || msg.contains("skill_categories.slug")
  {
    return dup(Entity::Category, "slug");
  }
  if msg.contains("skill_categories.name") {
    return dup(Entity::Category, "name");
  }
  if msg.contains("skill_categories.code") {
    return dup(Entity::Category, "code");
  }
  if msg.contains("skills.code") {
    return dup(Entity::Skill, "code");
  }
  if msg.contains("departments.name") {
    return dup(Entity::Department, "name");
  }
  if msg.contains("departments.code") {
    return dup(Entity::Department, "code");
  }
  if msg.contains("users.employee_id") {
    return dup(Entity::User, "employee id");
  }
  if msg.contains("users.email") {
    return dup(Entity::User, "email");
  }
  if msg.contains("roles.name") {
    return dup(Entity::Role, "name");
  }

  Error::Database(err)
}

// ─── FactoryStore impl ───────────────────────────────────────────────────────

impl FactoryStore for SqliteStore {
  type Error = Error;

  // ── Categories ────────────────────────────────────────────────────────────

  async fn create_category(&self, input: NewCategory) -> Result<Category> {
    input.validate()?;

    let parent = match input.parent_id {
      Some(pid) => Some(
        self
          .fetch_category(pid)
          .await?
          .ok_or_else(|| CoreError::not_found(Entity::Category, pid))?,
      ),
      None => None,
    };

    let placement = match &parent {
      Some(p) => child_placement(&input.name, input.slug.as_deref(), &p.path, p.depth),
      None => root_placement(&input.name, input.slug.as_deref()),
    };
    let kind = if parent.is_some() {
      CategoryKind::Area
    } else {
      CategoryKind::Department
    };

    let code = input
      .code
      .clone()
      .unwrap_or_else(|| derive_code(&input.name, CATEGORY_CODE_MAX));

    // A name made of symbols derives an empty code or slug; reject that here
    // instead of storing an unaddressable node.
    validate::code("code", &code, CATEGORY_CODE_MAX, false)?;
    validate::slug(&placement.slug)?;

    self
      .category_dup_check(&input.name, &code, &placement.slug, input.parent_id, None)
      .await?;

    let now = Utc::now();
    let category = Category {
      id:          Uuid::now_v7(),
      name:        input.name,
      code,
      slug:        placement.slug,
      description: input.description,
      color:       input.color,
      kind,
      parent_id:   input.parent_id,
      path:        placement.path,
      depth:       placement.depth,
      sort_order:  input.sort_order.unwrap_or(0),
      is_active:   input.is_active.unwrap_or(true),
      created_at:  now,
      updated_at:  now,
    };

    let id_str     = encode_uuid(category.id);
    let name_str   = category.name.clone();
    let code_str   = category.code.clone();
    let slug_str   = category.slug.clone();
    let desc       = category.description.clone();
    let color      = category.color.clone();
    let kind_str   = encode_category_kind(category.kind).to_owned();
    let parent_str = category.parent_id.map(encode_uuid);
    let path_str   = category.path.clone();
    let depth      = category.depth;
    let sort_order = category.sort_order;
    let active     = category.is_active;
    let at_str     = encode_dt(now);

    self
      .conn
      .call(move |conn| {
        conn.execute(
          "INSERT INTO skill_categories (
             id, name, code, slug, description, color, kind, parent_id,
             path, depth, sort_order, is_active, created_at, updated_at
           ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14)",
          rusqlite::params![
            id_str, name_str, code_str, slug_str, desc, color, kind_str,
            parent_str, path_str, depth, sort_order, active, at_str, at_str,
          ],
        )?;
        Ok(())
      })
      .await
      .map_err(map_constraint)?;

    Ok(category)
  }

  async fn update_category(&self, id: Uuid, update: CategoryUpdate) -> Result<Category> {
    update.validate()?;

    let current = self
      .fetch_category(id)
      .await?
      .ok_or_else(|| CoreError::not_found(Entity::Category, id))?;

    let name = update.name.unwrap_or_else(|| current.name.clone());
    let renamed = name != current.name;

    // A rename re-derives the slug unless an explicit one comes along.
    let slug = match update.slug {
      Some(slug) => slug,
      None if renamed => slugify(&name),
      None => current.slug.clone(),
    };
    validate::slug(&slug)?;

    let code = update.code.unwrap_or_else(|| current.code.clone());

    let description = match update.description {
      Some(d) if d.is_empty() => None,
      Some(d) => Some(d),
      None => current.description.clone(),
    };
    let color = match update.color {
      Some(c) if c.is_empty() => None,
      Some(c) => Some(c),
      None => current.color.clone(),
    };

    let sort_order = update.sort_order.unwrap_or(current.sort_order);
    let is_active  = update.is_active.unwrap_or(current.is_active);

    self
      .category_dup_check(&name, &code, &slug, current.parent_id, Some(id))
      .await?;

    let path = match current.path.rsplit_once('/') {
      Some((prefix, _)) => format!("{prefix}/{slug}"),
      None => slug.clone(),
    };
    let path_changed = path != current.path;
    let now = Utc::now();

    let id_str   = encode_uuid(id);
    let name_str = name.clone();
    let code_str = code.clone();
    let slug_str = slug.clone();
    let desc     = description.clone();
    let col      = color.clone();
    let new_path = path.clone();
    let old_path = current.path.clone();
    let at_str   = encode_dt(now);

    self
      .conn
      .call(move |conn| {
        let tx = conn.transaction()?;
        tx.execute(
          "UPDATE skill_categories
           SET name = ?2, code = ?3, slug = ?4, description = ?5, color = ?6,
               path = ?7, sort_order = ?8, is_active = ?9, updated_at = ?10
           WHERE id = ?1",
          rusqlite::params![
            id_str, name_str, code_str, slug_str, desc, col, new_path,
            sort_order, is_active, at_str,
          ],
        )?;
        if path_changed {
          // Descendants keep their own slugs; only the prefix moves.
          tx.execute(
            "UPDATE skill_categories
             SET path = ?1 || substr(path, length(?2) + 1), updated_at = ?3
             WHERE path LIKE ?2 || '/%'",
            rusqlite::params![new_path, old_path, at_str],
          )?;
        }
        tx.commit()?;
        Ok(())
      })
      .await
      .map_err(map_constraint)?;

    Ok(Category {
      id,
      name,
      code,
      slug,
      description,
      color,
      kind: current.kind,
      parent_id: current.parent_id,
      path,
      depth: current.depth,
      sort_order,
      is_active,
      created_at: current.created_at,
      updated_at: now,
    })
  }

  async fn delete_category(&self, id: Uuid) -> Result<()> {
    let id_str = encode_uuid(id);

    let (exists, child_count, skill_count): (bool, i64, i64) = self
      .conn
      .call(move |conn| {
        let exists: bool = conn
          .query_row(
            "SELECT 1 FROM skill_categories WHERE id = ?1",
            rusqlite::params![id_str],
            |_| Ok(true),
          )
          .optional()?
          .unwrap_or(false);

        if !exists {
          return Ok((false, 0, 0));
        }

        let child_count: i64 = conn.query_row(
          "SELECT COUNT(*) FROM skill_categories WHERE parent_id = ?1",
          rusqlite::params![id_str],
          |r| r.get(0),
        )?;

        let skill_count: i64 = conn.query_row(
          "SELECT COUNT(*) FROM skills WHERE category_id = ?1",
          rusqlite::params![id_str],
          |r| r.get(0),
        )?;

        Ok((exists, child_count, skill_count))
      })
      .await?;

    if !exists {
      return Err(CoreError::not_found(Entity::Category, id).into());
    }
    if child_count > 0 {
      return Err(
        CoreError::DeleteBlocked {
          entity:     Entity::Category,
          dependents: "child categories",
        }
        .into(),
      );
    }
    if skill_count > 0 {
      return Err(
        CoreError::DeleteBlocked {
          entity:     Entity::Category,
          dependents: "assigned skills",
        }
        .into(),
      );
    }

    let id_str = encode_uuid(id);
    self
      .conn
      .call(move |conn| {
        conn.execute(
          "DELETE FROM skill_categories WHERE id = ?1",
          rusqlite::params![id_str],
        )?;
        Ok(())
      })
      .await?;
    Ok(())
  }

  async fn get_category(&self, id: Uuid) -> Result<Option<CategoryDetail>> {
    let id_str = encode_uuid(id);

    let rows: Option<(
      RawCategory,
      Option<RawCategory>,
      Vec<RawCategory>,
      Vec<RawSkill>,
    )> = self
      .conn
      .call(move |conn| {
        let category = conn
          .query_row(
            &format!("SELECT {CATEGORY_COLS} FROM skill_categories WHERE id = ?1"),
            rusqlite::params![id_str],
            RawCategory::from_row,
          )
          .optional()?;
        let Some(category) = category else { return Ok(None) };

        let parent = match category.parent_id.clone() {
          Some(pid) => conn
            .query_row(
              &format!("SELECT {CATEGORY_COLS} FROM skill_categories WHERE id = ?1"),
              rusqlite::params![pid],
              RawCategory::from_row,
            )
            .optional()?,
          None => None,
        };

        let mut stmt = conn.prepare(&format!(
          "SELECT {CATEGORY_COLS} FROM skill_categories WHERE parent_id = ?1
           ORDER BY sort_order, name"
        ))?;
        let children = stmt
          .query_map(rusqlite::params![id_str], RawCategory::from_row)?
          .collect::<rusqlite::Result<Vec<_>>>()?;

        let mut stmt = conn.prepare(&format!(
          "SELECT {SKILL_COLS} FROM skills WHERE category_id = ?1
           ORDER BY depth, name"
        ))?;
        let skills = stmt
          .query_map(rusqlite::params![id_str], RawSkill::from_row)?
          .collect::<rusqlite::Result<Vec<_>>>()?;

        Ok(Some((category, parent, children, skills)))
      })
      .await?;

    let Some((category, parent, children, skills)) = rows else {
      return Ok(None);
    };

    Ok(Some(CategoryDetail {
      category: category.into_category()?,
      parent:   parent.map(RawCategory::into_category).transpose()?,
      children: children
        .into_iter()
        .map(RawCategory::into_category)
        .collect::<Result<_>>()?,
      skills:   skills
        .into_iter()
        .map(RawSkill::into_skill)
        .collect::<Result<_>>()?,
    }))
  }

  async fn get_category_by_slug(&self, slug: &str) -> Result<Option<Category>> {
    let slug_owned = slug.to_owned();

    let raw: Option<RawCategory> = self
      .conn
      .call(move |conn| {
        Ok(
          conn
            .query_row(
              &format!(
                "SELECT {CATEGORY_COLS} FROM skill_categories WHERE slug = ?1
                 ORDER BY depth, sort_order LIMIT 1"
              ),
              rusqlite::params![slug_owned],
              RawCategory::from_row,
            )
            .optional()?,
        )
      })
      .await?;

    raw.map(RawCategory::into_category).transpose()
  }

  async fn list_categories(&self, query: &CategoryQuery) -> Result<Vec<CategorySummary>> {
    let kind_str   = query.kind.map(encode_category_kind).map(str::to_owned);
    let active     = query.active;
    let parent_str = query.parent_id.map(encode_uuid);

    let raws: Vec<RawCategorySummary> = self
      .conn
      .call(move |conn| {
        let mut stmt = conn.prepare(&format!(
          "SELECT {CATEGORY_COLS},
             (SELECT COUNT(*) FROM skill_categories k WHERE k.parent_id = c.id)
               AS child_count,
             (SELECT COUNT(*) FROM skills s WHERE s.category_id = c.id)
               AS skill_count
           FROM skill_categories c
           WHERE (?1 IS NULL OR kind = ?1)
             AND (?2 IS NULL OR is_active = ?2)
             AND (?3 IS NULL OR parent_id = ?3)
           ORDER BY depth, sort_order, name"
        ))?;
        let rows = stmt
          .query_map(
            rusqlite::params![kind_str, active, parent_str],
            RawCategorySummary::from_row,
          )?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    raws
      .into_iter()
      .map(RawCategorySummary::into_summary)
      .collect()
  }

  async fn category_breadcrumbs(&self, id: Uuid) -> Result<Vec<CategoryCrumb>> {
    let id_str = encode_uuid(id);

    let trail: Option<Vec<RawCategory>> = self
      .conn
      .call(move |conn| {
        let start = conn
          .query_row(
            &format!("SELECT {CATEGORY_COLS} FROM skill_categories WHERE id = ?1"),
            rusqlite::params![id_str],
            RawCategory::from_row,
          )
          .optional()?;
        let Some(start) = start else { return Ok(None) };

        let mut seen = HashSet::new();
        seen.insert(start.id.clone());
        let mut trail = vec![start];

        // One lookup per level; a dangling or repeated parent ends the walk.
        loop {
          let Some(pid) = trail[0].parent_id.clone() else { break };
          if !seen.insert(pid.clone()) {
            break;
          }
          let parent = conn
            .query_row(
              &format!("SELECT {CATEGORY_COLS} FROM skill_categories WHERE id = ?1"),
              rusqlite::params![pid],
              RawCategory::from_row,
            )
            .optional()?;
          let Some(parent) = parent else { break };
          trail.insert(0, parent);
        }

        Ok(Some(trail))
      })
      .await?;

    let Some(trail) = trail else {
      return Err(CoreError::not_found(Entity::Category, id).into());
    };

    trail
      .into_iter()
      .map(|raw| {
        let kind = match decode_category_kind(&raw.kind)? {
          CategoryKind::Department => CrumbKind::Department,
          CategoryKind::Area => CrumbKind::Area,
        };
        Ok(CategoryCrumb {
          id: decode_uuid(&raw.id)?,
          name: raw.name,
          slug: raw.slug,
          kind,
        })
      })
      .collect()
  }

  async fn category_stats(&self) -> Result<CategoryStats> {
    let (total, departments, areas, active): (i64, i64, i64, i64) = self
      .conn
      .call(|conn| {
        Ok(conn.query_row(
          "SELECT COUNT(*),
             COALESCE(SUM(CASE WHEN kind = 'department' THEN 1 ELSE 0 END), 0),
             COALESCE(SUM(CASE WHEN kind = 'area' THEN 1 ELSE 0 END), 0),
             COALESCE(SUM(CASE WHEN is_active THEN 1 ELSE 0 END), 0)
           FROM skill_categories",
          [],
          |r| Ok((r.get(0)?, r.get(1)?, r.get(2)?, r.get(3)?)),
        )?)
      })
      .await?;

    Ok(CategoryStats { total, departments, areas, active })
  }

  // ── Skills ────────────────────────────────────────────────────────────────

  async fn create_skill(&self, input: NewSkill) -> Result<Skill> {
    input.validate()?;

    let parent = match input.parent_skill_id {
      Some(pid) => Some(
        self
          .fetch_skill(pid)
          .await?
          .ok_or_else(|| CoreError::not_found(Entity::Skill, pid))?,
      ),
      None => None,
    };

    // Sub-skills inherit the parent's category unless one is given.
    let category_id = input
      .category_id
      .or_else(|| parent.as_ref().and_then(|p| p.category_id));
    if let Some(cid) = category_id {
      if !self
        .row_exists("SELECT 1 FROM skill_categories WHERE id = ?1", cid)
        .await?
      {
        return Err(CoreError::not_found(Entity::Category, cid).into());
      }
    }

    let placement = match &parent {
      Some(p) => child_placement(&input.name, None, &p.path, p.depth),
      None => root_placement(&input.name, None),
    };

    self.skill_code_check(&input.code, None).await?;

    let now = Utc::now();
    let skill = Skill {
      id:                            Uuid::now_v7(),
      name:                          input.name,
      code:                          input.code,
      description:                   input.description,
      category_id,
      parent_skill_id:               input.parent_skill_id,
      path:                          placement.path,
      depth:                         placement.depth,
      has_proficiency_levels:        input.has_proficiency_levels.unwrap_or(false),
      max_proficiency_level:         input.max_proficiency_level.unwrap_or(3),
      requires_certification:        input.requires_certification.unwrap_or(false),
      certification_validity_months: input.certification_validity_months,
      required_training_hours:       input.required_training_hours,
      allows_ojt:                    input.allows_ojt.unwrap_or(true),
      allows_classroom:              input.allows_classroom.unwrap_or(true),
      allows_online:                 input.allows_online.unwrap_or(true),
      is_active:                     input.is_active.unwrap_or(true),
      created_at:                    now,
      updated_at:                    now,
    };

    let id_str       = encode_uuid(skill.id);
    let name_str     = skill.name.clone();
    let code_str     = skill.code.clone();
    let desc         = skill.description.clone();
    let category_str = skill.category_id.map(encode_uuid);
    let parent_str   = skill.parent_skill_id.map(encode_uuid);
    let path_str     = skill.path.clone();
    let depth        = skill.depth;
    let hpl          = skill.has_proficiency_levels;
    let mpl          = skill.max_proficiency_level;
    let cert         = skill.requires_certification;
    let cert_months  = skill.certification_validity_months;
    let hours        = skill.required_training_hours;
    let ojt          = skill.allows_ojt;
    let classroom    = skill.allows_classroom;
    let online       = skill.allows_online;
    let active       = skill.is_active;
    let at_str       = encode_dt(now);

    self
      .conn
      .call(move |conn| {
        conn.execute(
          "INSERT INTO skills (
             id, name, code, description, category_id, parent_skill_id, path,
             depth, has_proficiency_levels, max_proficiency_level,
             requires_certification, certification_validity_months,
             required_training_hours, allows_ojt, allows_classroom,
             allows_online, is_active, created_at, updated_at
           ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13,
                     ?14, ?15, ?16, ?17, ?18, ?19)",
          rusqlite::params![
            id_str, name_str, code_str, desc, category_str, parent_str,
            path_str, depth, hpl, mpl, cert, cert_months, hours, ojt,
            classroom, online, active, at_str, at_str,
          ],
        )?;
        Ok(())
      })
      .await
      .map_err(map_constraint)?;

    Ok(skill)
  }

  async fn update_skill(&self, id: Uuid, update: SkillUpdate) -> Result<Skill> {
    update.validate()?;

    let current = self
      .fetch_skill(id)
      .await?
      .ok_or_else(|| CoreError::not_found(Entity::Skill, id))?;

    let name = update.name.unwrap_or_else(|| current.name.clone());
    let renamed = name != current.name;
    let code = update.code.unwrap_or_else(|| current.code.clone());

    let description = match update.description {
      Some(d) if d.is_empty() => None,
      Some(d) => Some(d),
      None => current.description.clone(),
    };

    let category_id = match update.category_id {
      Some(cid) => {
        if !self
          .row_exists("SELECT 1 FROM skill_categories WHERE id = ?1", cid)
          .await?
        {
          return Err(CoreError::not_found(Entity::Category, cid).into());
        }
        Some(cid)
      }
      None => current.category_id,
    };

    self.skill_code_check(&code, Some(id)).await?;

    // A rename moves the skill's own path segment; descendants follow below.
    let path = if renamed {
      let slug = slugify(&name);
      match current.path.rsplit_once('/') {
        Some((prefix, _)) => format!("{prefix}/{slug}"),
        None => slug,
      }
    } else {
      current.path.clone()
    };
    let path_changed = path != current.path;

    let has_proficiency_levels = update
      .has_proficiency_levels
      .unwrap_or(current.has_proficiency_levels);
    let max_proficiency_level = update
      .max_proficiency_level
      .unwrap_or(current.max_proficiency_level);
    let requires_certification = update
      .requires_certification
      .unwrap_or(current.requires_certification);
    let certification_validity_months = update
      .certification_validity_months
      .or(current.certification_validity_months);
    let required_training_hours = update
      .required_training_hours
      .or(current.required_training_hours);
    let allows_ojt       = update.allows_ojt.unwrap_or(current.allows_ojt);
    let allows_classroom = update.allows_classroom.unwrap_or(current.allows_classroom);
    let allows_online    = update.allows_online.unwrap_or(current.allows_online);
    let is_active        = update.is_active.unwrap_or(current.is_active);

    let now = Utc::now();

    let id_str       = encode_uuid(id);
    let name_str     = name.clone();
    let code_str     = code.clone();
    let desc         = description.clone();
    let category_str = category_id.map(encode_uuid);
    let new_path     = path.clone();
    let old_path     = current.path.clone();
    let at_str       = encode_dt(now);

    self
      .conn
      .call(move |conn| {
        let tx = conn.transaction()?;
        tx.execute(
          "UPDATE skills
           SET name = ?2, code = ?3, description = ?4, category_id = ?5,
               path = ?6, has_proficiency_levels = ?7,
               max_proficiency_level = ?8, requires_certification = ?9,
               certification_validity_months = ?10,
               required_training_hours = ?11, allows_ojt = ?12,
               allows_classroom = ?13, allows_online = ?14, is_active = ?15,
               updated_at = ?16
           WHERE id = ?1",
          rusqlite::params![
            id_str, name_str, code_str, desc, category_str, new_path,
            has_proficiency_levels, max_proficiency_level,
            requires_certification, certification_validity_months,
            required_training_hours, allows_ojt, allows_classroom,
            allows_online, is_active, at_str,
          ],
        )?;
        if path_changed {
          tx.execute(
            "UPDATE skills
             SET path = ?1 || substr(path, length(?2) + 1), updated_at = ?3
             WHERE path LIKE ?2 || '/%'",
            rusqlite::params![new_path, old_path, at_str],
          )?;
        }
        tx.commit()?;
        Ok(())
      })
      .await
      .map_err(map_constraint)?;

    Ok(Skill {
      id,
      name,
      code,
      description,
      category_id,
      parent_skill_id: current.parent_skill_id,
      path,
      depth: current.depth,
      has_proficiency_levels,
      max_proficiency_level,
      requires_certification,
      certification_validity_months,
      required_training_hours,
      allows_ojt,
      allows_classroom,
      allows_online,
      is_active,
      created_at: current.created_at,
      updated_at: now,
    })
  }

  async fn delete_skill(&self, id: Uuid) -> Result<()> {
    let id_str = encode_uuid(id);

    let (exists, child_count): (bool, i64) = self
      .conn
      .call(move |conn| {
        let exists: bool = conn
          .query_row(
            "SELECT 1 FROM skills WHERE id = ?1",
            rusqlite::params![id_str],
            |_| Ok(true),
          )
          .optional()?
          .unwrap_or(false);

        if !exists {
          return Ok((false, 0));
        }

        let child_count: i64 = conn.query_row(
          "SELECT COUNT(*) FROM skills WHERE parent_skill_id = ?1",
          rusqlite::params![id_str],
          |r| r.get(0),
        )?;

        Ok((exists, child_count))
      })
      .await?;

    if !exists {
      return Err(CoreError::not_found(Entity::Skill, id).into());
    }
    if child_count > 0 {
      return Err(
        CoreError::DeleteBlocked {
          entity:     Entity::Skill,
          dependents: "sub-skills",
        }
        .into(),
      );
    }

    let id_str = encode_uuid(id);
    self
      .conn
      .call(move |conn| {
        let tx = conn.transaction()?;
        // Drop edges on either side before the row itself.
        tx.execute(
          "DELETE FROM skill_prerequisites
           WHERE skill_id = ?1 OR prerequisite_skill_id = ?1",
          rusqlite::params![id_str],
        )?;
        tx.execute("DELETE FROM skills WHERE id = ?1", rusqlite::params![id_str])?;
        tx.commit()?;
        Ok(())
      })
      .await?;
    Ok(())
  }

  async fn get_skill(&self, id: Uuid) -> Result<Option<SkillDetail>> {
    let id_str = encode_uuid(id);

    let rows: Option<(
      RawSkill,
      Option<RawCategory>,
      Option<RawSkill>,
      Vec<RawSkill>,
      Vec<RawPrerequisiteDetail>,
    )> = self
      .conn
      .call(move |conn| {
        let skill = conn
          .query_row(
            &format!("SELECT {SKILL_COLS} FROM skills WHERE id = ?1"),
            rusqlite::params![id_str],
            RawSkill::from_row,
          )
          .optional()?;
        let Some(skill) = skill else { return Ok(None) };

        let category = match skill.category_id.clone() {
          Some(cid) => conn
            .query_row(
              &format!("SELECT {CATEGORY_COLS} FROM skill_categories WHERE id = ?1"),
              rusqlite::params![cid],
              RawCategory::from_row,
            )
            .optional()?,
          None => None,
        };

        let parent = match skill.parent_skill_id.clone() {
          Some(pid) => conn
            .query_row(
              &format!("SELECT {SKILL_COLS} FROM skills WHERE id = ?1"),
              rusqlite::params![pid],
              RawSkill::from_row,
            )
            .optional()?,
          None => None,
        };

        let mut stmt = conn.prepare(&format!(
          "SELECT {SKILL_COLS} FROM skills WHERE parent_skill_id = ?1
           ORDER BY name"
        ))?;
        let children = stmt
          .query_map(rusqlite::params![id_str], RawSkill::from_row)?
          .collect::<rusqlite::Result<Vec<_>>>()?;

        let mut stmt = conn.prepare(PREREQUISITE_DETAIL_SQL)?;
        let prerequisites = stmt
          .query_map(rusqlite::params![id_str], RawPrerequisiteDetail::from_row)?
          .collect::<rusqlite::Result<Vec<_>>>()?;

        Ok(Some((skill, category, parent, children, prerequisites)))
      })
      .await?;

    let Some((skill, category, parent, children, prerequisites)) = rows else {
      return Ok(None);
    };

    Ok(Some(SkillDetail {
      skill:         skill.into_skill()?,
      category:      category.map(RawCategory::into_category).transpose()?,
      parent_skill:  parent.map(RawSkill::into_skill).transpose()?,
      children:      children
        .into_iter()
        .map(RawSkill::into_skill)
        .collect::<Result<_>>()?,
      prerequisites: prerequisites
        .into_iter()
        .map(RawPrerequisiteDetail::into_detail)
        .collect::<Result<_>>()?,
    }))
  }

  async fn get_skill_by_code(&self, code: &str) -> Result<Option<Skill>> {
    let code_owned = code.to_owned();

    let raw: Option<RawSkill> = self
      .conn
      .call(move |conn| {
        Ok(
          conn
            .query_row(
              &format!("SELECT {SKILL_COLS} FROM skills WHERE code = ?1"),
              rusqlite::params![code_owned],
              RawSkill::from_row,
            )
            .optional()?,
        )
      })
      .await?;

    raw.map(RawSkill::into_skill).transpose()
  }

  async fn list_skills(&self, query: &SkillQuery) -> Result<Vec<SkillSummary>> {
    let pattern      = query.search.as_deref().map(|t| format!("%{t}%"));
    let category_str = query.category_id.map(encode_uuid);
    let active       = query.active;
    let roots_only   = query.roots_only;

    let raws: Vec<RawSkillSummary> = self
      .conn
      .call(move |conn| {
        let mut stmt = conn.prepare(
          "SELECT s.id, s.name, s.code, s.description, s.category_id,
             s.parent_skill_id, s.path, s.depth, s.has_proficiency_levels,
             s.max_proficiency_level, s.requires_certification,
             s.certification_validity_months, s.required_training_hours,
             s.allows_ojt, s.allows_classroom, s.allows_online, s.is_active,
             s.created_at, s.updated_at,
             (SELECT COUNT(*) FROM skills ch WHERE ch.parent_skill_id = s.id)
               AS child_count,
             c.name AS category_name,
             p.name AS parent_skill_name
           FROM skills s
           LEFT JOIN skill_categories c ON c.id = s.category_id
           LEFT JOIN skills p ON p.id = s.parent_skill_id
           WHERE (?1 IS NULL
                  OR s.name LIKE ?1 OR s.code LIKE ?1 OR s.description LIKE ?1)
             AND (?2 IS NULL OR s.category_id = ?2)
             AND (?3 IS NULL OR s.is_active = ?3)
             AND (?4 = 0 OR s.parent_skill_id IS NULL)
           ORDER BY s.depth, s.name",
        )?;
        let rows = stmt
          .query_map(
            rusqlite::params![pattern, category_str, active, roots_only],
            RawSkillSummary::from_row,
          )?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    raws.into_iter().map(RawSkillSummary::into_summary).collect()
  }

  async fn skill_breadcrumbs(&self, id: Uuid) -> Result<Vec<SkillCrumb>> {
    let id_str = encode_uuid(id);

    let rows: Option<(Vec<RawCategory>, Vec<RawSkill>)> = self
      .conn
      .call(move |conn| {
        let start = conn
          .query_row(
            &format!("SELECT {SKILL_COLS} FROM skills WHERE id = ?1"),
            rusqlite::params![id_str],
            RawSkill::from_row,
          )
          .optional()?;
        let Some(start) = start else { return Ok(None) };

        let category_id = start.category_id.clone();

        let mut seen = HashSet::new();
        seen.insert(start.id.clone());
        let mut skills = vec![start];

        loop {
          let Some(pid) = skills[0].parent_skill_id.clone() else { break };
          if !seen.insert(pid.clone()) {
            break;
          }
          let parent = conn
            .query_row(
              &format!("SELECT {SKILL_COLS} FROM skills WHERE id = ?1"),
              rusqlite::params![pid],
              RawSkill::from_row,
            )
            .optional()?;
          let Some(parent) = parent else { break };
          skills.insert(0, parent);
        }

        // The category chain sits in front of the skill chain.
        let mut categories: Vec<RawCategory> = vec![];
        let mut cat_seen = HashSet::new();
        let mut next = category_id;
        while let Some(cid) = next {
          if !cat_seen.insert(cid.clone()) {
            break;
          }
          let category = conn
            .query_row(
              &format!("SELECT {CATEGORY_COLS} FROM skill_categories WHERE id = ?1"),
              rusqlite::params![cid],
              RawCategory::from_row,
            )
            .optional()?;
          let Some(category) = category else { break };
          next = category.parent_id.clone();
          categories.insert(0, category);
        }

        Ok(Some((categories, skills)))
      })
      .await?;

    let Some((categories, skills)) = rows else {
      return Err(CoreError::not_found(Entity::Skill, id).into());
    };

    let mut crumbs = Vec::with_capacity(categories.len() + skills.len());
    for raw in categories {
      let kind = match decode_category_kind(&raw.kind)? {
        CategoryKind::Department => CrumbKind::Department,
        CategoryKind::Area => CrumbKind::Area,
      };
      crumbs.push(SkillCrumb {
        id: decode_uuid(&raw.id)?,
        name: raw.name,
        code: raw.code,
        kind,
      });
    }
    for raw in skills {
      crumbs.push(SkillCrumb {
        id: decode_uuid(&raw.id)?,
        name: raw.name,
        code: raw.code,
        kind: CrumbKind::Skill,
      });
    }
    Ok(crumbs)
  }

  async fn skill_stats(&self) -> Result<SkillStats> {
    let (total, active, requires_certification, root_skills, sub_skills): (
      i64,
      i64,
      i64,
      i64,
      i64,
    ) = self
      .conn
      .call(|conn| {
        Ok(conn.query_row(
          "SELECT COUNT(*),
             COALESCE(SUM(CASE WHEN is_active THEN 1 ELSE 0 END), 0),
             COALESCE(SUM(CASE WHEN requires_certification THEN 1 ELSE 0 END), 0),
             COALESCE(SUM(CASE WHEN parent_skill_id IS NULL THEN 1 ELSE 0 END), 0),
             COALESCE(SUM(CASE WHEN parent_skill_id IS NOT NULL THEN 1 ELSE 0 END), 0)
           FROM skills",
          [],
          |r| Ok((r.get(0)?, r.get(1)?, r.get(2)?, r.get(3)?, r.get(4)?)),
        )?)
      })
      .await?;

    Ok(SkillStats {
      total,
      active,
      requires_certification,
      root_skills,
      sub_skills,
    })
  }

  // ── Prerequisites ─────────────────────────────────────────────────────────

  async fn add_prerequisite(
    &self,
    skill_id: Uuid,
    input: NewPrerequisite,
  ) -> Result<SkillPrerequisite> {
    input.validate()?;
    if input.prerequisite_skill_id == skill_id {
      return Err(CoreError::SelfPrerequisite.into());
    }

    let skill_str  = encode_uuid(skill_id);
    let prereq_str = encode_uuid(input.prerequisite_skill_id);

    let (skill_exists, prereq_exists, edge_exists): (bool, bool, bool) = self
      .conn
      .call(move |conn| {
        let skill_exists: bool = conn
          .query_row(
            "SELECT 1 FROM skills WHERE id = ?1",
            rusqlite::params![skill_str],
            |_| Ok(true),
          )
          .optional()?
          .unwrap_or(false);

        let prereq_exists: bool = conn
          .query_row(
            "SELECT 1 FROM skills WHERE id = ?1",
            rusqlite::params![prereq_str],
            |_| Ok(true),
          )
          .optional()?
          .unwrap_or(false);

        let edge_exists: bool = conn
          .query_row(
            "SELECT 1 FROM skill_prerequisites
             WHERE skill_id = ?1 AND prerequisite_skill_id = ?2",
            rusqlite::params![skill_str, prereq_str],
            |_| Ok(true),
          )
          .optional()?
          .unwrap_or(false);

        Ok((skill_exists, prereq_exists, edge_exists))
      })
      .await?;

    if !skill_exists {
      return Err(CoreError::not_found(Entity::Skill, skill_id).into());
    }
    if !prereq_exists {
      return Err(
        CoreError::not_found(Entity::Skill, input.prerequisite_skill_id).into(),
      );
    }
    if edge_exists {
      return Err(CoreError::DuplicatePrerequisite.into());
    }

    let edge = SkillPrerequisite {
      id:                        Uuid::now_v7(),
      skill_id,
      prerequisite_skill_id:     input.prerequisite_skill_id,
      minimum_proficiency_level: input.minimum_proficiency_level.unwrap_or(1),
      created_at:                Utc::now(),
    };

    let id_str     = encode_uuid(edge.id);
    let skill_str  = encode_uuid(edge.skill_id);
    let prereq_str = encode_uuid(edge.prerequisite_skill_id);
    let level      = edge.minimum_proficiency_level;
    let at_str     = encode_dt(edge.created_at);

    self
      .conn
      .call(move |conn| {
        conn.execute(
          "INSERT INTO skill_prerequisites (
             id, skill_id, prerequisite_skill_id, minimum_proficiency_level,
             created_at
           ) VALUES (?1, ?2, ?3, ?4, ?5)",
          rusqlite::params![id_str, skill_str, prereq_str, level, at_str],
        )?;
        Ok(())
      })
      .await
      .map_err(map_constraint)?;

    Ok(edge)
  }

  async fn remove_prerequisite(
    &self,
    skill_id: Uuid,
    prerequisite_id: Uuid,
  ) -> Result<()> {
    let skill_str = encode_uuid(skill_id);
    let edge_str  = encode_uuid(prerequisite_id);

    let affected = self
      .conn
      .call(move |conn| {
        Ok(conn.execute(
          "DELETE FROM skill_prerequisites WHERE id = ?1 AND skill_id = ?2",
          rusqlite::params![edge_str, skill_str],
        )?)
      })
      .await?;

    if affected == 0 {
      return Err(CoreError::not_found(Entity::Prerequisite, prerequisite_id).into());
    }
    Ok(())
  }

  async fn list_prerequisites(&self, skill_id: Uuid) -> Result<Vec<PrerequisiteDetail>> {
    let skill_str = encode_uuid(skill_id);

    let raws: Vec<RawPrerequisiteDetail> = self
      .conn
      .call(move |conn| {
        let mut stmt = conn.prepare(PREREQUISITE_DETAIL_SQL)?;
        let rows = stmt
          .query_map(rusqlite::params![skill_str], RawPrerequisiteDetail::from_row)?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    raws
      .into_iter()
      .map(RawPrerequisiteDetail::into_detail)
      .collect()
  }

  // ── Departments ───────────────────────────────────────────────────────────

  async fn create_department(&self, input: NewDepartment) -> Result<Department> {
    input.validate()?;

    if let Some(mid) = input.manager_id {
      if !self.row_exists("SELECT 1 FROM users WHERE id = ?1", mid).await? {
        return Err(CoreError::not_found(Entity::User, mid).into());
      }
    }

    let code = input
      .code
      .clone()
      .unwrap_or_else(|| derive_code(&input.name, CATEGORY_CODE_MAX));
    validate::code("code", &code, CATEGORY_CODE_MAX, false)?;

    self.department_dup_check(&input.name, &code, None).await?;

    let now = Utc::now();
    let department = Department {
      id:          Uuid::now_v7(),
      name:        input.name,
      code,
      description: input.description,
      manager_id:  input.manager_id,
      is_active:   input.is_active.unwrap_or(true),
      created_at:  now,
      updated_at:  now,
    };

    let id_str      = encode_uuid(department.id);
    let name_str    = department.name.clone();
    let code_str    = department.code.clone();
    let desc        = department.description.clone();
    let manager_str = department.manager_id.map(encode_uuid);
    let active      = department.is_active;
    let at_str      = encode_dt(now);

    self
      .conn
      .call(move |conn| {
        conn.execute(
          "INSERT INTO departments (
             id, name, code, description, manager_id, is_active, created_at,
             updated_at
           ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
          rusqlite::params![
            id_str, name_str, code_str, desc, manager_str, active, at_str,
            at_str,
          ],
        )?;
        Ok(())
      })
      .await
      .map_err(map_constraint)?;

    Ok(department)
  }

  async fn update_department(
    &self,
    id: Uuid,
    update: DepartmentUpdate,
  ) -> Result<Department> {
    update.validate()?;

    let current = self
      .fetch_department(id)
      .await?
      .ok_or_else(|| CoreError::not_found(Entity::Department, id))?;

    let name = update.name.unwrap_or_else(|| current.name.clone());
    let code = update.code.unwrap_or_else(|| current.code.clone());
    let description = match update.description {
      Some(d) if d.is_empty() => None,
      Some(d) => Some(d),
      None => current.description.clone(),
    };
    let manager_id = match update.manager_id {
      Some(mid) if mid.is_nil() => None,
      Some(mid) => {
        if !self.row_exists("SELECT 1 FROM users WHERE id = ?1", mid).await? {
          return Err(CoreError::not_found(Entity::User, mid).into());
        }
        Some(mid)
      }
      None => current.manager_id,
    };
    let is_active = update.is_active.unwrap_or(current.is_active);

    self.department_dup_check(&name, &code, Some(id)).await?;

    let now = Utc::now();

    let id_str      = encode_uuid(id);
    let name_str    = name.clone();
    let code_str    = code.clone();
    let desc        = description.clone();
    let manager_str = manager_id.map(encode_uuid);
    let at_str      = encode_dt(now);

    self
      .conn
      .call(move |conn| {
        conn.execute(
          "UPDATE departments
           SET name = ?2, code = ?3, description = ?4, manager_id = ?5,
               is_active = ?6, updated_at = ?7
           WHERE id = ?1",
          rusqlite::params![
            id_str, name_str, code_str, desc, manager_str, is_active, at_str,
          ],
        )?;
        Ok(())
      })
      .await
      .map_err(map_constraint)?;

    Ok(Department {
      id,
      name,
      code,
      description,
      manager_id,
      is_active,
      created_at: current.created_at,
      updated_at: now,
    })
  }

  async fn delete_department(&self, id: Uuid) -> Result<()> {
    let id_str = encode_uuid(id);

    let (exists, member_count, project_count): (bool, i64, i64) = self
      .conn
      .call(move |conn| {
        let exists: bool = conn
          .query_row(
            "SELECT 1 FROM departments WHERE id = ?1",
            rusqlite::params![id_str],
            |_| Ok(true),
          )
          .optional()?
          .unwrap_or(false);

        if !exists {
          return Ok((false, 0, 0));
        }

        let member_count: i64 = conn.query_row(
          "SELECT COUNT(*) FROM users WHERE department_id = ?1",
          rusqlite::params![id_str],
          |r| r.get(0),
        )?;

        let project_count: i64 = conn.query_row(
          "SELECT COUNT(*) FROM projects WHERE department_id = ?1",
          rusqlite::params![id_str],
          |r| r.get(0),
        )?;

        Ok((exists, member_count, project_count))
      })
      .await?;

    if !exists {
      return Err(CoreError::not_found(Entity::Department, id).into());
    }
    if member_count > 0 {
      return Err(
        CoreError::DeleteBlocked {
          entity:     Entity::Department,
          dependents: "assigned users",
        }
        .into(),
      );
    }
    if project_count > 0 {
      return Err(
        CoreError::DeleteBlocked {
          entity:     Entity::Department,
          dependents: "assigned projects",
        }
        .into(),
      );
    }

    let id_str = encode_uuid(id);
    self
      .conn
      .call(move |conn| {
        conn.execute("DELETE FROM departments WHERE id = ?1", rusqlite::params![id_str])?;
        Ok(())
      })
      .await?;
    Ok(())
  }

  async fn get_department(&self, id: Uuid) -> Result<Option<DepartmentDetail>> {
    let id_str = encode_uuid(id);

    let rows: Option<(
      RawDepartment,
      Option<RawUserSummary>,
      Vec<RawUserSummary>,
    )> = self
      .conn
      .call(move |conn| {
        let department = conn
          .query_row(
            &format!("SELECT {DEPARTMENT_COLS} FROM departments WHERE id = ?1"),
            rusqlite::params![id_str],
            RawDepartment::from_row,
          )
          .optional()?;
        let Some(department) = department else { return Ok(None) };

        let manager = match department.manager_id.clone() {
          Some(mid) => conn
            .query_row(
              &format!("{USER_SUMMARY_SQL} WHERE u.id = ?1"),
              rusqlite::params![mid],
              RawUserSummary::from_row,
            )
            .optional()?,
          None => None,
        };

        let mut stmt = conn.prepare(&format!(
          "{USER_SUMMARY_SQL} WHERE u.department_id = ?1 ORDER BY u.name"
        ))?;
        let members = stmt
          .query_map(rusqlite::params![id_str], RawUserSummary::from_row)?
          .collect::<rusqlite::Result<Vec<_>>>()?;

        Ok(Some((department, manager, members)))
      })
      .await?;

    let Some((department, manager, members)) = rows else { return Ok(None) };

    Ok(Some(DepartmentDetail {
      department: department.into_department()?,
      manager:    manager.map(RawUserSummary::into_summary).transpose()?,
      members:    members
        .into_iter()
        .map(RawUserSummary::into_summary)
        .collect::<Result<_>>()?,
    }))
  }

  async fn list_departments(&self, active: Option<bool>) -> Result<Vec<DepartmentSummary>> {
    let raws: Vec<RawDepartmentSummary> = self
      .conn
      .call(move |conn| {
        let mut stmt = conn.prepare(
          "SELECT d.id, d.name, d.code, d.description, d.manager_id,
             d.is_active, d.created_at, d.updated_at,
             (SELECT COUNT(*) FROM users u WHERE u.department_id = d.id)
               AS member_count,
             (SELECT COUNT(*) FROM projects p WHERE p.department_id = d.id)
               AS project_count,
             m.name AS manager_name
           FROM departments d
           LEFT JOIN users m ON m.id = d.manager_id
           WHERE (?1 IS NULL OR d.is_active = ?1)
           ORDER BY d.name",
        )?;
        let rows = stmt
          .query_map(rusqlite::params![active], RawDepartmentSummary::from_row)?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    raws
      .into_iter()
      .map(RawDepartmentSummary::into_summary)
      .collect()
  }

  // ── Roles ─────────────────────────────────────────────────────────────────

  async fn add_role(&self, input: NewRole) -> Result<Role> {
    input.validate()?;

    let name_owned = input.name.clone();
    let taken: bool = self
      .conn
      .call(move |conn| {
        Ok(
          conn
            .query_row(
              "SELECT 1 FROM roles WHERE name = ?1",
              rusqlite::params![name_owned],
              |_| Ok(true),
            )
            .optional()?
            .unwrap_or(false),
        )
      })
      .await?;
    if taken {
      return Err(CoreError::duplicate(Entity::Role, "name").into());
    }

    let role = Role {
      id:             Uuid::now_v7(),
      name:           input.name,
      description:    input.description,
      permissions:    input.permissions,
      is_system_role: input.is_system_role,
      created_at:     Utc::now(),
    };

    let id_str    = encode_uuid(role.id);
    let name_str  = role.name.clone();
    let desc      = role.description.clone();
    let perms_str = encode_permissions(&role.permissions)?;
    let system    = role.is_system_role;
    let at_str    = encode_dt(role.created_at);

    self
      .conn
      .call(move |conn| {
        conn.execute(
          "INSERT INTO roles (
             id, name, description, permissions, is_system_role, created_at
           ) VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
          rusqlite::params![id_str, name_str, desc, perms_str, system, at_str],
        )?;
        Ok(())
      })
      .await
      .map_err(map_constraint)?;

    Ok(role)
  }

  async fn get_role(&self, id: Uuid) -> Result<Option<Role>> {
    let id_str = encode_uuid(id);

    let raw: Option<RawRole> = self
      .conn
      .call(move |conn| {
        Ok(
          conn
            .query_row(
              &format!("SELECT {ROLE_COLS} FROM roles WHERE id = ?1"),
              rusqlite::params![id_str],
              RawRole::from_row,
            )
            .optional()?,
        )
      })
      .await?;

    raw.map(RawRole::into_role).transpose()
  }

  async fn get_role_by_name(&self, name: &str) -> Result<Option<Role>> {
    let name_owned = name.to_owned();

    let raw: Option<RawRole> = self
      .conn
      .call(move |conn| {
        Ok(
          conn
            .query_row(
              &format!("SELECT {ROLE_COLS} FROM roles WHERE name = ?1"),
              rusqlite::params![name_owned],
              RawRole::from_row,
            )
            .optional()?,
        )
      })
      .await?;

    raw.map(RawRole::into_role).transpose()
  }

  async fn list_roles(&self) -> Result<Vec<Role>> {
    let raws: Vec<RawRole> = self
      .conn
      .call(|conn| {
        let mut stmt =
          conn.prepare(&format!("SELECT {ROLE_COLS} FROM roles ORDER BY name"))?;
        let rows = stmt
          .query_map([], RawRole::from_row)?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    raws.into_iter().map(RawRole::into_role).collect()
  }

  // ── Users ─────────────────────────────────────────────────────────────────

  async fn create_user(&self, input: NewUser) -> Result<User> {
    input.validate()?;

    if !self.row_exists("SELECT 1 FROM roles WHERE id = ?1", input.role_id).await? {
      return Err(CoreError::not_found(Entity::Role, input.role_id).into());
    }
    if let Some(did) = input.department_id {
      if !self.row_exists("SELECT 1 FROM departments WHERE id = ?1", did).await? {
        return Err(CoreError::not_found(Entity::Department, did).into());
      }
    }

    self
      .user_dup_check(Some(&input.employee_id), input.email.as_deref(), None)
      .await?;

    let now = Utc::now();
    let user = User {
      id:                    Uuid::now_v7(),
      employee_id:           input.employee_id,
      name:                  input.name,
      email:                 input.email,
      pin_hash:              input.pin_hash,
      role_id:               input.role_id,
      department_id:         input.department_id,
      is_active:             input.is_active.unwrap_or(true),
      failed_login_attempts: 0,
      locked_until:          None,
      created_at:            now,
      updated_at:            now,
    };

    let id_str       = encode_uuid(user.id);
    let employee_str = user.employee_id.clone();
    let name_str     = user.name.clone();
    let email        = user.email.clone();
    let pin_hash     = user.pin_hash.clone();
    let role_str     = encode_uuid(user.role_id);
    let dept_str     = user.department_id.map(encode_uuid);
    let active       = user.is_active;
    let at_str       = encode_dt(now);

    self
      .conn
      .call(move |conn| {
        conn.execute(
          "INSERT INTO users (
             id, employee_id, name, email, pin_hash, role_id, department_id,
             is_active, failed_login_attempts, locked_until, created_at,
             updated_at
           ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, 0, NULL, ?9, ?10)",
          rusqlite::params![
            id_str, employee_str, name_str, email, pin_hash, role_str,
            dept_str, active, at_str, at_str,
          ],
        )?;
        Ok(())
      })
      .await
      .map_err(map_constraint)?;

    Ok(user)
  }

  async fn update_user(&self, id: Uuid, update: UserUpdate) -> Result<User> {
    update.validate()?;

    let current = self
      .fetch_user(id)
      .await?
      .ok_or_else(|| CoreError::not_found(Entity::User, id))?;

    let name = update.name.unwrap_or_else(|| current.name.clone());
    let email = match update.email {
      Some(e) if e.is_empty() => None,
      Some(e) => Some(e),
      None => current.email.clone(),
    };
    let pin_hash = update.pin_hash.unwrap_or_else(|| current.pin_hash.clone());
    let role_id = match update.role_id {
      Some(rid) => {
        if !self.row_exists("SELECT 1 FROM roles WHERE id = ?1", rid).await? {
          return Err(CoreError::not_found(Entity::Role, rid).into());
        }
        rid
      }
      None => current.role_id,
    };
    let department_id = match update.department_id {
      Some(did) if did.is_nil() => None,
      Some(did) => {
        if !self.row_exists("SELECT 1 FROM departments WHERE id = ?1", did).await? {
          return Err(CoreError::not_found(Entity::Department, did).into());
        }
        Some(did)
      }
      None => current.department_id,
    };
    let is_active = update.is_active.unwrap_or(current.is_active);

    self.user_dup_check(None, email.as_deref(), Some(id)).await?;

    let now = Utc::now();

    let id_str   = encode_uuid(id);
    let name_str = name.clone();
    let email_cl = email.clone();
    let pin_cl   = pin_hash.clone();
    let role_str = encode_uuid(role_id);
    let dept_str = department_id.map(encode_uuid);
    let at_str   = encode_dt(now);

    self
      .conn
      .call(move |conn| {
        conn.execute(
          "UPDATE users
           SET name = ?2, email = ?3, pin_hash = ?4, role_id = ?5,
               department_id = ?6, is_active = ?7, updated_at = ?8
           WHERE id = ?1",
          rusqlite::params![
            id_str, name_str, email_cl, pin_cl, role_str, dept_str, is_active,
            at_str,
          ],
        )?;
        Ok(())
      })
      .await
      .map_err(map_constraint)?;

    Ok(User {
      id,
      employee_id: current.employee_id,
      name,
      email,
      pin_hash,
      role_id,
      department_id,
      is_active,
      failed_login_attempts: current.failed_login_attempts,
      locked_until: current.locked_until,
      created_at: current.created_at,
      updated_at: now,
    })
  }

  async fn get_user(&self, id: Uuid) -> Result<Option<UserSummary>> {
    let id_str = encode_uuid(id);

    let raw: Option<RawUserSummary> = self
      .conn
      .call(move |conn| {
        Ok(
          conn
            .query_row(
              &format!("{USER_SUMMARY_SQL} WHERE u.id = ?1"),
              rusqlite::params![id_str],
              RawUserSummary::from_row,
            )
            .optional()?,
        )
      })
      .await?;

    raw.map(RawUserSummary::into_summary).transpose()
  }

  async fn get_user_by_employee_id(&self, employee_id: &str) -> Result<Option<User>> {
    let employee_owned = employee_id.to_owned();

    let raw: Option<RawUser> = self
      .conn
      .call(move |conn| {
        Ok(
          conn
            .query_row(
              &format!("SELECT {USER_COLS} FROM users WHERE employee_id = ?1"),
              rusqlite::params![employee_owned],
              RawUser::from_row,
            )
            .optional()?,
        )
      })
      .await?;

    raw.map(RawUser::into_user).transpose()
  }

  async fn list_users(&self, query: &UserQuery) -> Result<Vec<UserSummary>> {
    let pattern  = query.search.as_deref().map(|t| format!("%{t}%"));
    let dept_str = query.department_id.map(encode_uuid);
    let role_str = query.role_id.map(encode_uuid);
    let active   = query.active;

    let raws: Vec<RawUserSummary> = self
      .conn
      .call(move |conn| {
        let mut stmt = conn.prepare(&format!(
          "{USER_SUMMARY_SQL}
           WHERE (?1 IS NULL
                  OR u.name LIKE ?1 OR u.employee_id LIKE ?1 OR u.email LIKE ?1)
             AND (?2 IS NULL OR u.department_id = ?2)
             AND (?3 IS NULL OR u.role_id = ?3)
             AND (?4 IS NULL OR u.is_active = ?4)
           ORDER BY u.name"
        ))?;
        let rows = stmt
          .query_map(
            rusqlite::params![pattern, dept_str, role_str, active],
            RawUserSummary::from_row,
          )?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    raws.into_iter().map(RawUserSummary::into_summary).collect()
  }

  async fn record_login_failure(
    &self,
    user_id: Uuid,
    locked_until: Option<DateTime<Utc>>,
  ) -> Result<()> {
    let id_str     = encode_uuid(user_id);
    let locked_str = locked_until.map(encode_dt);
    let at_str     = encode_dt(Utc::now());

    let affected = self
      .conn
      .call(move |conn| {
        Ok(conn.execute(
          "UPDATE users
           SET failed_login_attempts = failed_login_attempts + 1,
               locked_until = COALESCE(?2, locked_until),
               updated_at = ?3
           WHERE id = ?1",
          rusqlite::params![id_str, locked_str, at_str],
        )?)
      })
      .await?;

    if affected == 0 {
      return Err(CoreError::not_found(Entity::User, user_id).into());
    }
    Ok(())
  }

  async fn record_login_success(&self, user_id: Uuid) -> Result<()> {
    let id_str = encode_uuid(user_id);
    let at_str = encode_dt(Utc::now());

    let affected = self
      .conn
      .call(move |conn| {
        Ok(conn.execute(
          "UPDATE users
           SET failed_login_attempts = 0, locked_until = NULL, updated_at = ?2
           WHERE id = ?1",
          rusqlite::params![id_str, at_str],
        )?)
      })
      .await?;

    if affected == 0 {
      return Err(CoreError::not_found(Entity::User, user_id).into());
    }
    Ok(())
  }

  // ── Sessions ──────────────────────────────────────────────────────────────

  async fn create_session(&self, input: NewSession) -> Result<SessionRecord> {
    let record = SessionRecord {
      token_hash: input.token_hash,
      user_id:    input.user_id,
      created_at: Utc::now(),
      expires_at: input.expires_at,
    };

    let hash_str    = record.token_hash.clone();
    let user_str    = encode_uuid(record.user_id);
    let created_str = encode_dt(record.created_at);
    let expires_str = encode_dt(record.expires_at);

    self
      .conn
      .call(move |conn| {
        conn.execute(
          "INSERT INTO sessions (token_hash, user_id, created_at, expires_at)
           VALUES (?1, ?2, ?3, ?4)",
          rusqlite::params![hash_str, user_str, created_str, expires_str],
        )?;
        Ok(())
      })
      .await?;

    Ok(record)
  }

  async fn resolve_caller(
    &self,
    token_hash: &str,
    now: DateTime<Utc>,
  ) -> Result<Option<Caller>> {
    let hash_str = token_hash.to_owned();
    let now_str  = encode_dt(now);

    let raw: Option<RawCaller> = self
      .conn
      .call(move |conn| {
        Ok(
          conn
            .query_row(
              "SELECT u.id, u.employee_id, u.name, r.name, r.permissions
               FROM sessions s
               JOIN users u ON u.id = s.user_id
               JOIN roles r ON r.id = u.role_id
               WHERE s.token_hash = ?1 AND s.expires_at > ?2
                 AND u.is_active = 1",
              rusqlite::params![hash_str, now_str],
              RawCaller::from_row,
            )
            .optional()?,
        )
      })
      .await?;

    raw.map(RawCaller::into_caller).transpose()
  }

  async fn delete_session(&self, token_hash: &str) -> Result<()> {
    let hash_str = token_hash.to_owned();

    self
      .conn
      .call(move |conn| {
        conn.execute(
          "DELETE FROM sessions WHERE token_hash = ?1",
          rusqlite::params![hash_str],
        )?;
        Ok(())
      })
      .await?;
    Ok(())
  }

  async fn sweep_expired_sessions(&self, now: DateTime<Utc>) -> Result<u64> {
    let now_str = encode_dt(now);

    let affected = self
      .conn
      .call(move |conn| {
        Ok(conn.execute(
          "DELETE FROM sessions WHERE expires_at <= ?1",
          rusqlite::params![now_str],
        )?)
      })
      .await?;

    Ok(affected as u64)
  }

  // ── Projects ──────────────────────────────────────────────────────────────

  async fn create_project(&self, input: NewProject) -> Result<Project> {
    input.validate()?;

    if let Some(did) = input.department_id {
      if !self.row_exists("SELECT 1 FROM departments WHERE id = ?1", did).await? {
        return Err(CoreError::not_found(Entity::Department, did).into());
      }
    }
    if let Some(oid) = input.owner_id {
      if !self.row_exists("SELECT 1 FROM users WHERE id = ?1", oid).await? {
        return Err(CoreError::not_found(Entity::User, oid).into());
      }
    }

    let now = Utc::now();
    let project = Project {
      id:            Uuid::now_v7(),
      name:          input.name,
      description:   input.description,
      status:        input.status.unwrap_or_default(),
      department_id: input.department_id,
      owner_id:      input.owner_id,
      start_date:    input.start_date,
      end_date:      input.end_date,
      is_active:     true,
      created_at:    now,
      updated_at:    now,
    };

    let id_str     = encode_uuid(project.id);
    let name_str   = project.name.clone();
    let desc       = project.description.clone();
    let status_str = encode_status(project.status).to_owned();
    let dept_str   = project.department_id.map(encode_uuid);
    let owner_str  = project.owner_id.map(encode_uuid);
    let start_str  = project.start_date.map(encode_date);
    let end_str    = project.end_date.map(encode_date);
    let at_str     = encode_dt(now);

    self
      .conn
      .call(move |conn| {
        conn.execute(
          "INSERT INTO projects (
             id, name, description, status, department_id, owner_id,
             start_date, end_date, is_active, created_at, updated_at
           ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, 1, ?9, ?10)",
          rusqlite::params![
            id_str, name_str, desc, status_str, dept_str, owner_str,
            start_str, end_str, at_str, at_str,
          ],
        )?;
        Ok(())
      })
      .await?;

    Ok(project)
  }

  async fn update_project(&self, id: Uuid, update: ProjectUpdate) -> Result<Project> {
    update.validate()?;

    let current = self
      .fetch_project(id)
      .await?
      .ok_or_else(|| CoreError::not_found(Entity::Project, id))?;

    let name = update.name.unwrap_or_else(|| current.name.clone());
    let description = match update.description {
      Some(d) if d.is_empty() => None,
      Some(d) => Some(d),
      None => current.description.clone(),
    };
    let status = update.status.unwrap_or(current.status);
    let department_id = match update.department_id {
      Some(did) => {
        if !self.row_exists("SELECT 1 FROM departments WHERE id = ?1", did).await? {
          return Err(CoreError::not_found(Entity::Department, did).into());
        }
        Some(did)
      }
      None => current.department_id,
    };
    let owner_id = match update.owner_id {
      Some(oid) => {
        if !self.row_exists("SELECT 1 FROM users WHERE id = ?1", oid).await? {
          return Err(CoreError::not_found(Entity::User, oid).into());
        }
        Some(oid)
      }
      None => current.owner_id,
    };
    let start_date = update.start_date.or(current.start_date);
    let end_date   = update.end_date.or(current.end_date);
    let is_active  = update.is_active.unwrap_or(current.is_active);

    let now = Utc::now();

    let id_str     = encode_uuid(id);
    let name_str   = name.clone();
    let desc       = description.clone();
    let status_str = encode_status(status).to_owned();
    let dept_str   = department_id.map(encode_uuid);
    let owner_str  = owner_id.map(encode_uuid);
    let start_str  = start_date.map(encode_date);
    let end_str    = end_date.map(encode_date);
    let at_str     = encode_dt(now);

    self
      .conn
      .call(move |conn| {
        conn.execute(
          "UPDATE projects
           SET name = ?2, description = ?3, status = ?4, department_id = ?5,
               owner_id = ?6, start_date = ?7, end_date = ?8, is_active = ?9,
               updated_at = ?10
           WHERE id = ?1",
          rusqlite::params![
            id_str, name_str, desc, status_str, dept_str, owner_str,
            start_str, end_str, is_active, at_str,
          ],
        )?;
        Ok(())
      })
      .await?;

    Ok(Project {
      id,
      name,
      description,
      status,
      department_id,
      owner_id,
      start_date,
      end_date,
      is_active,
      created_at: current.created_at,
      updated_at: now,
    })
  }

  async fn delete_project(&self, id: Uuid) -> Result<()> {
    let id_str = encode_uuid(id);

    let affected = self
      .conn
      .call(move |conn| {
        Ok(conn.execute(
          "DELETE FROM projects WHERE id = ?1",
          rusqlite::params![id_str],
        )?)
      })
      .await?;

    if affected == 0 {
      return Err(CoreError::not_found(Entity::Project, id).into());
    }
    Ok(())
  }

  async fn get_project(&self, id: Uuid) -> Result<Option<ProjectSummary>> {
    let id_str = encode_uuid(id);

    let raw: Option<RawProjectSummary> = self
      .conn
      .call(move |conn| {
        Ok(
          conn
            .query_row(
              &format!("{PROJECT_SUMMARY_SQL} WHERE p.id = ?1"),
              rusqlite::params![id_str],
              RawProjectSummary::from_row,
            )
            .optional()?,
        )
      })
      .await?;

    raw.map(RawProjectSummary::into_summary).transpose()
  }

  async fn list_projects(&self, query: &ProjectQuery) -> Result<Vec<ProjectSummary>> {
    let pattern    = query.search.as_deref().map(|t| format!("%{t}%"));
    let status_str = query.status.map(encode_status).map(str::to_owned);
    let dept_str   = query.department_id.map(encode_uuid);
    let owner_str  = query.owner_id.map(encode_uuid);

    let raws: Vec<RawProjectSummary> = self
      .conn
      .call(move |conn| {
        let mut stmt = conn.prepare(&format!(
          "{PROJECT_SUMMARY_SQL}
           WHERE (?1 IS NULL OR p.name LIKE ?1 OR p.description LIKE ?1)
             AND (?2 IS NULL OR p.status = ?2)
             AND (?3 IS NULL OR p.department_id = ?3)
             AND (?4 IS NULL OR p.owner_id = ?4)
           ORDER BY p.created_at DESC"
        ))?;
        let rows = stmt
          .query_map(
            rusqlite::params![pattern, status_str, dept_str, owner_str],
            RawProjectSummary::from_row,
          )?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    raws
      .into_iter()
      .map(RawProjectSummary::into_summary)
      .collect()
  }

  async fn project_stats(&self) -> Result<ProjectStats> {
    let (total, draft, active, completed): (i64, i64, i64, i64) = self
      .conn
      .call(|conn| {
        Ok(conn.query_row(
          "SELECT COUNT(*),
             COALESCE(SUM(CASE WHEN status = 'draft' THEN 1 ELSE 0 END), 0),
             COALESCE(SUM(CASE WHEN status = 'active' THEN 1 ELSE 0 END), 0),
             COALESCE(SUM(CASE WHEN status = 'completed' THEN 1 ELSE 0 END), 0)
           FROM projects",
          [],
          |r| Ok((r.get(0)?, r.get(1)?, r.get(2)?, r.get(3)?)),
        )?)
      })
      .await?;

    Ok(ProjectStats { total, draft, active, completed })
  }

  // ── Settings ──────────────────────────────────────────────────────────────

  async fn get_settings(&self) -> Result<SystemSettings> {
    let stored: Option<String> = self
      .conn
      .call(|conn| {
        Ok(
          conn
            .query_row(
              "SELECT value FROM system_settings WHERE key = 'config'",
              [],
              |r| r.get(0),
            )
            .optional()?,
        )
      })
      .await?;

    match stored {
      // Serde defaults fill whatever the stored document does not carry.
      Some(json) => Ok(serde_json::from_str(&json)?),
      None => Ok(SystemSettings::default()),
    }
  }

  async fn put_settings(&self, settings: SystemSettings) -> Result<SystemSettings> {
    settings.validate()?;

    let value_str = serde_json::to_string(&settings)?;
    let at_str    = encode_dt(Utc::now());

    self
      .conn
      .call(move |conn| {
        conn.execute(
          "INSERT INTO system_settings (key, value, updated_at)
           VALUES ('config', ?1, ?2)
           ON CONFLICT(key) DO UPDATE
           SET value = excluded.value, updated_at = excluded.updated_at",
          rusqlite::params![value_str, at_str],
        )?;
        Ok(())
      })
      .await?;

    Ok(settings)
  }

  // ── Audit log ─────────────────────────────────────────────────────────────

  async fn record_audit(&self, input: NewAuditEntry) -> Result<AuditEntry> {
    let entry = AuditEntry {
      id:          Uuid::now_v7(),
      user_id:     input.user_id,
      entity_kind: input.entity_kind,
      entity_id:   input.entity_id,
      action:      input.action,
      details:     input.details,
      created_at:  Utc::now(),
    };

    let id_str      = encode_uuid(entry.id);
    let user_str    = entry.user_id.map(encode_uuid);
    let kind_str    = encode_entity_kind(entry.entity_kind).to_owned();
    let entity_str  = encode_uuid(entry.entity_id);
    let action_str  = entry.action.clone();
    let details_str = entry.details.as_ref().map(serde_json::Value::to_string);
    let at_str      = encode_dt(entry.created_at);

    self
      .conn
      .call(move |conn| {
        conn.execute(
          "INSERT INTO audit_logs (
             id, user_id, entity_kind, entity_id, action, details, created_at
           ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
          rusqlite::params![
            id_str, user_str, kind_str, entity_str, action_str, details_str,
            at_str,
          ],
        )?;
        Ok(())
      })
      .await?;

    Ok(entry)
  }

  async fn list_audit(&self, query: &AuditQuery) -> Result<Vec<AuditEntry>> {
    let kind_str   = query.entity_kind.map(encode_entity_kind).map(str::to_owned);
    let entity_str = query.entity_id.map(encode_uuid);
    let user_str   = query.user_id.map(encode_uuid);
    let limit      = query.limit.unwrap_or(100);

    let raws: Vec<RawAudit> = self
      .conn
      .call(move |conn| {
        let mut stmt = conn.prepare(&format!(
          "SELECT {AUDIT_COLS} FROM audit_logs
           WHERE (?1 IS NULL OR entity_kind = ?1)
             AND (?2 IS NULL OR entity_id = ?2)
             AND (?3 IS NULL OR user_id = ?3)
           ORDER BY created_at DESC
           LIMIT ?4"
        ))?;
        let rows = stmt
          .query_map(
            rusqlite::params![kind_str, entity_str, user_str, limit],
            RawAudit::from_row,
          )?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    raws.into_iter().map(RawAudit::into_entry).collect()
  }

  // ── Attachments ───────────────────────────────────────────────────────────

  async fn add_attachment(&self, input: NewAttachment) -> Result<Attachment> {
    input.validate()?;

    let attachment = Attachment {
      id:           Uuid::now_v7(),
      entity_kind:  input.entity_kind,
      entity_id:    input.entity_id,
      kind:         input.kind,
      filename:     input.filename,
      content_type: input.content_type,
      size_bytes:   input.size_bytes,
      storage_path: input.storage_path,
      uploaded_by:  input.uploaded_by,
      created_at:   Utc::now(),
    };

    let id_str       = encode_uuid(attachment.id);
    let entity_kind  = encode_entity_kind(attachment.entity_kind).to_owned();
    let entity_str   = encode_uuid(attachment.entity_id);
    let kind_str     = encode_attachment_kind(attachment.kind).to_owned();
    let filename     = attachment.filename.clone();
    let content_type = attachment.content_type.clone();
    let size_bytes   = attachment.size_bytes;
    let storage_path = attachment.storage_path.clone();
    let uploader_str = attachment.uploaded_by.map(encode_uuid);
    let at_str       = encode_dt(attachment.created_at);

    self
      .conn
      .call(move |conn| {
        conn.execute(
          "INSERT INTO attachments (
             id, entity_kind, entity_id, kind, filename, content_type,
             size_bytes, storage_path, uploaded_by, created_at
           ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)",
          rusqlite::params![
            id_str, entity_kind, entity_str, kind_str, filename, content_type,
            size_bytes, storage_path, uploader_str, at_str,
          ],
        )?;
        Ok(())
      })
      .await?;

    Ok(attachment)
  }

  async fn list_attachments(
    &self,
    entity_kind: EntityKind,
    entity_id: Uuid,
  ) -> Result<Vec<Attachment>> {
    let kind_str   = encode_entity_kind(entity_kind).to_owned();
    let entity_str = encode_uuid(entity_id);

    let raws: Vec<RawAttachment> = self
      .conn
      .call(move |conn| {
        let mut stmt = conn.prepare(&format!(
          "SELECT {ATTACHMENT_COLS} FROM attachments
           WHERE entity_kind = ?1 AND entity_id = ?2
           ORDER BY created_at DESC"
        ))?;
        let rows = stmt
          .query_map(
            rusqlite::params![kind_str, entity_str],
            RawAttachment::from_row,
          )?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    raws.into_iter().map(RawAttachment::into_attachment).collect()
  }
}

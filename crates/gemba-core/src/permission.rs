//! Permission tokens and the capability set attached to a caller.
//!
//! Tokens are `resource:action` strings on the wire and in role rows; the
//! wildcard token `*` grants everything. Membership checks short-circuit on
//! the wildcard before touching the set.

use std::{collections::BTreeSet, fmt};

use serde::{Deserialize, Deserializer, Serialize, Serializer, de};

use crate::error::{Error, Result};

/// One allowed action, identified on the wire as `resource:action`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Permission {
  UserView,
  UserCreate,
  UserUpdate,
  UserDelete,
  DepartmentView,
  DepartmentManage,
  SystemSettings,
  SkillView,
  SkillCreate,
  SkillUpdate,
  SkillDelete,
  SkillCategoryView,
  SkillCategoryManage,
  ProjectView,
  ProjectCreate,
  ProjectUpdate,
  ProjectDelete,
}

impl Permission {
  pub const ALL: [Permission; 17] = [
    Self::UserView,
    Self::UserCreate,
    Self::UserUpdate,
    Self::UserDelete,
    Self::DepartmentView,
    Self::DepartmentManage,
    Self::SystemSettings,
    Self::SkillView,
    Self::SkillCreate,
    Self::SkillUpdate,
    Self::SkillDelete,
    Self::SkillCategoryView,
    Self::SkillCategoryManage,
    Self::ProjectView,
    Self::ProjectCreate,
    Self::ProjectUpdate,
    Self::ProjectDelete,
  ];

  pub fn as_token(self) -> &'static str {
    match self {
      Self::UserView => "user:view",
      Self::UserCreate => "user:create",
      Self::UserUpdate => "user:update",
      Self::UserDelete => "user:delete",
      Self::DepartmentView => "department:view",
      Self::DepartmentManage => "department:manage",
      Self::SystemSettings => "system:settings",
      Self::SkillView => "skill:view",
      Self::SkillCreate => "skill:create",
      Self::SkillUpdate => "skill:update",
      Self::SkillDelete => "skill:delete",
      Self::SkillCategoryView => "skill_category:view",
      Self::SkillCategoryManage => "skill_category:manage",
      Self::ProjectView => "project:view",
      Self::ProjectCreate => "project:create",
      Self::ProjectUpdate => "project:update",
      Self::ProjectDelete => "project:delete",
    }
  }

  pub fn from_token(token: &str) -> Result<Self> {
    Ok(match token {
      "user:view" => Self::UserView,
      "user:create" => Self::UserCreate,
      "user:update" => Self::UserUpdate,
      "user:delete" => Self::UserDelete,
      "department:view" => Self::DepartmentView,
      "department:manage" => Self::DepartmentManage,
      "system:settings" => Self::SystemSettings,
      "skill:view" => Self::SkillView,
      "skill:create" => Self::SkillCreate,
      "skill:update" => Self::SkillUpdate,
      "skill:delete" => Self::SkillDelete,
      "skill_category:view" => Self::SkillCategoryView,
      "skill_category:manage" => Self::SkillCategoryManage,
      "project:view" => Self::ProjectView,
      "project:create" => Self::ProjectCreate,
      "project:update" => Self::ProjectUpdate,
      "project:delete" => Self::ProjectDelete,
      other => return Err(Error::UnknownPermission(other.to_owned())),
    })
  }
}

impl fmt::Display for Permission {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(self.as_token())
  }
}

impl Serialize for Permission {
  fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_str(self.as_token())
  }
}

impl<'de> Deserialize<'de> for Permission {
  fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
    let token = String::deserialize(deserializer)?;
    Self::from_token(&token).map_err(de::Error::custom)
  }
}

/// A caller's granted permissions: either the `*` wildcard sentinel or an
/// explicit token set.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PermissionSet {
  All,
  Tokens(BTreeSet<Permission>),
}

impl PermissionSet {
  pub fn empty() -> Self { Self::Tokens(BTreeSet::new()) }

  pub fn allows(&self, permission: Permission) -> bool {
    match self {
      Self::All => true,
      Self::Tokens(set) => set.contains(&permission),
    }
  }

  /// Wire/storage form: token strings, `["*"]` for the wildcard.
  pub fn tokens(&self) -> Vec<String> {
    match self {
      Self::All => vec!["*".to_owned()],
      Self::Tokens(set) => set.iter().map(|p| p.as_token().to_owned()).collect(),
    }
  }

  /// Strict parse of stored token strings. A `*` anywhere in the list makes
  /// the whole set the wildcard; any unknown token is an error.
  pub fn parse<I, S>(tokens: I) -> Result<Self>
  where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
  {
    let mut set = BTreeSet::new();
    let mut all = false;
    for token in tokens {
      let token = token.as_ref();
      if token == "*" {
        all = true;
        continue;
      }
      set.insert(Permission::from_token(token)?);
    }
    Ok(if all { Self::All } else { Self::Tokens(set) })
  }
}

impl FromIterator<Permission> for PermissionSet {
  fn from_iter<I: IntoIterator<Item = Permission>>(iter: I) -> Self {
    Self::Tokens(iter.into_iter().collect())
  }
}

impl Serialize for PermissionSet {
  fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
    self.tokens().serialize(serializer)
  }
}

impl<'de> Deserialize<'de> for PermissionSet {
  fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
    let tokens = Vec::<String>::deserialize(deserializer)?;
    Self::parse(tokens).map_err(de::Error::custom)
  }
}

// ─── Tests ───────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn tokens_round_trip() {
    for p in Permission::ALL {
      assert_eq!(Permission::from_token(p.as_token()).unwrap(), p);
    }
    assert!(matches!(
      Permission::from_token("skill:fly"),
      Err(Error::UnknownPermission(_))
    ));
  }

  #[test]
  fn wildcard_short_circuits() {
    let all = PermissionSet::All;
    for p in Permission::ALL {
      assert!(all.allows(p));
    }
  }

  #[test]
  fn explicit_set_membership() {
    let set: PermissionSet =
      [Permission::SkillView, Permission::DepartmentView].into_iter().collect();
    assert!(set.allows(Permission::SkillView));
    assert!(!set.allows(Permission::SkillCreate));
    assert!(!set.allows(Permission::SystemSettings));
  }

  #[test]
  fn parse_wildcard_anywhere() {
    let set = PermissionSet::parse(["skill:view", "*"]).unwrap();
    assert_eq!(set, PermissionSet::All);
    assert_eq!(set.tokens(), vec!["*"]);
  }

  #[test]
  fn parse_rejects_unknown() {
    assert!(PermissionSet::parse(["skill:view", "bogus"]).is_err());
  }

  #[test]
  fn serde_round_trip() {
    let set = PermissionSet::parse(["skill:view", "department:view"]).unwrap();
    let json = serde_json::to_string(&set).unwrap();
    assert_eq!(json, r#"["department:view","skill:view"]"#);
    let back: PermissionSet = serde_json::from_str(&json).unwrap();
    assert_eq!(back, set);
  }
}

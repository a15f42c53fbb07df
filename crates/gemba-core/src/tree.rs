//! Tree-integrity engine for the hierarchical catalog.
//!
//! Categories and skills are self-referential trees persisted as rows with a
//! parent pointer plus a materialized path and a depth counter. This module
//! computes placement for new nodes, walks parent pointers into breadcrumb
//! trails, and assembles nested views from flat row lists through an
//! id-indexed arena rather than stored child pointers.

use std::collections::{HashMap, HashSet};

use serde::Serialize;
use uuid::Uuid;

/// Maximum derived code length for categories and departments.
pub const CATEGORY_CODE_MAX: usize = 10;
/// Maximum code length for skills.
pub const SKILL_CODE_MAX: usize = 20;

// ─── Slug and code derivation ────────────────────────────────────────────────

/// Derives a URL slug from a display name: lowercase, strip anything outside
/// `[a-z0-9 -]`, collapse whitespace runs to single hyphens, collapse repeated
/// hyphens, trim leading/trailing hyphens.
pub fn slugify(name: &str) -> String {
  let mut out = String::with_capacity(name.len());
  let mut last_hyphen = true;
  for c in name.chars() {
    let c = match c {
      'A'..='Z' => c.to_ascii_lowercase(),
      'a'..='z' | '0'..='9' => c,
      c if c.is_whitespace() => '-',
      '-' => '-',
      _ => continue,
    };
    if c == '-' {
      if !last_hyphen {
        out.push('-');
        last_hyphen = true;
      }
    } else {
      out.push(c);
      last_hyphen = false;
    }
  }
  while out.ends_with('-') {
    out.pop();
  }
  out
}

/// Derives a code from a display name: uppercase, strip anything outside
/// `[A-Z0-9]`, truncate to `max` characters.
pub fn derive_code(name: &str, max: usize) -> String {
  name
    .chars()
    .filter_map(|c| match c {
      'a'..='z' => Some(c.to_ascii_uppercase()),
      'A'..='Z' | '0'..='9' => Some(c),
      _ => None,
    })
    .take(max)
    .collect()
}

// ─── Placement ───────────────────────────────────────────────────────────────

/// Computed position of a node within its tree.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Placement {
  pub slug:  String,
  pub path:  String,
  pub depth: i64,
}

/// Placement for a root node. An explicit slug wins over derivation.
pub fn root_placement(name: &str, explicit_slug: Option<&str>) -> Placement {
  let slug = explicit_slug.map_or_else(|| slugify(name), str::to_owned);
  Placement { path: slug.clone(), slug, depth: 0 }
}

/// Placement for a node created under a parent with the given path and depth.
pub fn child_placement(
  name: &str,
  explicit_slug: Option<&str>,
  parent_path: &str,
  parent_depth: i64,
) -> Placement {
  let slug = explicit_slug.map_or_else(|| slugify(name), str::to_owned);
  Placement {
    path:  format!("{parent_path}/{slug}"),
    slug,
    depth: parent_depth + 1,
  }
}

// ─── Breadcrumbs ─────────────────────────────────────────────────────────────

/// What a breadcrumb entry points at.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum CrumbKind {
  Department,
  Area,
  Skill,
}

/// One entry of a root-to-node breadcrumb trail for categories.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CategoryCrumb {
  pub id:   Uuid,
  pub name: String,
  pub slug: String,
  pub kind: CrumbKind,
}

/// One entry of a root-to-node breadcrumb trail for skills.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SkillCrumb {
  pub id:   Uuid,
  pub name: String,
  pub code: String,
  pub kind: CrumbKind,
}

/// A row that participates in a parent-pointer tree.
pub trait TreeRow {
  fn id(&self) -> Uuid;
  fn parent_id(&self) -> Option<Uuid>;
}

// ─── Arena index ─────────────────────────────────────────────────────────────

/// Id-indexed arena over a flat row list. Children are derived by index, and
/// rows whose parent id resolves to no loaded row are treated as roots.
/// Sibling order follows the input order, so callers pass rows already sorted
/// for display.
#[derive(Debug)]
pub struct TreeIndex<T> {
  nodes:    HashMap<Uuid, T>,
  children: HashMap<Uuid, Vec<Uuid>>,
  roots:    Vec<Uuid>,
}

impl<T: TreeRow> TreeIndex<T> {
  pub fn build(rows: Vec<T>) -> Self {
    let ids: HashSet<Uuid> = rows.iter().map(TreeRow::id).collect();
    let mut nodes = HashMap::with_capacity(rows.len());
    let mut children: HashMap<Uuid, Vec<Uuid>> = HashMap::new();
    let mut roots = Vec::new();
    for row in rows {
      let id = row.id();
      match row.parent_id().filter(|p| ids.contains(p)) {
        Some(parent) => children.entry(parent).or_default().push(id),
        None => roots.push(id),
      }
      nodes.insert(id, row);
    }
    Self { nodes, children, roots }
  }

  pub fn len(&self) -> usize { self.nodes.len() }

  pub fn is_empty(&self) -> bool { self.nodes.is_empty() }

  pub fn get(&self, id: Uuid) -> Option<&T> { self.nodes.get(&id) }

  pub fn roots(&self) -> impl Iterator<Item = &T> {
    self.roots.iter().filter_map(|id| self.nodes.get(id))
  }

  pub fn children(&self, id: Uuid) -> impl Iterator<Item = &T> {
    self
      .children
      .get(&id)
      .into_iter()
      .flatten()
      .filter_map(|child| self.nodes.get(child))
  }

  /// Sums `f` over the subtree rooted at `id`, the node itself included.
  pub fn subtree_sum<F>(&self, id: Uuid, f: &F) -> i64
  where
    F: Fn(&T) -> i64,
  {
    let own = self.nodes.get(&id).map(f).unwrap_or(0);
    let below: i64 = self
      .children
      .get(&id)
      .into_iter()
      .flatten()
      .map(|child| self.subtree_sum(*child, f))
      .sum();
    own + below
  }
}

// ─── Tests ───────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
  use super::*;

  #[derive(Debug, Clone, PartialEq)]
  struct Node {
    id:     Uuid,
    parent: Option<Uuid>,
    weight: i64,
  }

  impl TreeRow for Node {
    fn id(&self) -> Uuid { self.id }

    fn parent_id(&self) -> Option<Uuid> { self.parent }
  }

  fn node(parent: Option<Uuid>, weight: i64) -> Node {
    Node { id: Uuid::new_v4(), parent, weight }
  }

  #[test]
  fn slugify_basic() {
    assert_eq!(slugify("Safety"), "safety");
    assert_eq!(slugify("Area A"), "area-a");
    assert_eq!(slugify("Hand Riveting"), "hand-riveting");
  }

  #[test]
  fn slugify_strips_and_collapses() {
    assert_eq!(slugify("  Forklift  --  Ops!  "), "forklift-ops");
    assert_eq!(slugify("Crane & Hoist (2024)"), "crane-hoist-2024");
    assert_eq!(slugify("---"), "");
  }

  #[test]
  fn derive_code_basic() {
    assert_eq!(derive_code("Operations", CATEGORY_CODE_MAX), "OPERATIONS");
    assert_eq!(derive_code("Assembly Line 3", CATEGORY_CODE_MAX), "ASSEMBLYLI");
    assert_eq!(derive_code("weld-01", SKILL_CODE_MAX), "WELD01");
  }

  #[test]
  fn root_placement_uses_slug() {
    let p = root_placement("Safety", None);
    assert_eq!(p, Placement { slug: "safety".into(), path: "safety".into(), depth: 0 });

    let p = root_placement("Safety", Some("safe"));
    assert_eq!(p.path, "safe");
  }

  #[test]
  fn child_placement_extends_parent() {
    let parent = root_placement("Safety", None);
    let p = child_placement("Area A", None, &parent.path, parent.depth);
    assert_eq!(p.slug, "area-a");
    assert_eq!(p.path, "safety/area-a");
    assert_eq!(p.depth, 1);
  }

  #[test]
  fn tree_index_derives_children_and_roots() {
    let root = node(None, 1);
    let child_a = node(Some(root.id), 2);
    let child_b = node(Some(root.id), 3);
    let grandchild = node(Some(child_a.id), 4);
    let idx = TreeIndex::build(vec![
      root.clone(),
      child_a.clone(),
      child_b.clone(),
      grandchild.clone(),
    ]);

    assert_eq!(idx.len(), 4);
    assert_eq!(idx.roots().map(|n| n.id).collect::<Vec<_>>(), vec![root.id]);
    assert_eq!(
      idx.children(root.id).map(|n| n.id).collect::<Vec<_>>(),
      vec![child_a.id, child_b.id]
    );
    assert_eq!(idx.subtree_sum(root.id, &|n| n.weight), 10);
    assert_eq!(idx.subtree_sum(child_a.id, &|n| n.weight), 6);
  }

  #[test]
  fn tree_index_orphans_become_roots() {
    let orphan = node(Some(Uuid::new_v4()), 1);
    let idx = TreeIndex::build(vec![orphan.clone()]);
    assert_eq!(idx.roots().map(|n| n.id).collect::<Vec<_>>(), vec![orphan.id]);
  }
}

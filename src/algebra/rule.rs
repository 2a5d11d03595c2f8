use std::collections::{BTreeSet, VecDeque};

use slotmap::{new_key_type, SlotMap};

use crate::error::{ConstructionError, Result};
use crate::math::{Point3, SURFACE_TOL};
use crate::model::SurfaceRegistry;

use super::{SignedSurface, SurfaceId};

new_key_type! {
    /// Arena key of a rule-tree node.
    pub struct RuleId;
}

/// Boolean operator of an internal rule node.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BoolOp {
    Intersection,
    Union,
}

#[derive(Debug, Clone, Copy)]
pub(crate) enum RuleKind {
    Op(BoolOp, RuleId, RuleId),
    Leaf(SignedSurface),
}

#[derive(Debug, Clone)]
struct RuleNode {
    parent: Option<RuleId>,
    kind: RuleKind,
}

/// A binary Boolean expression tree over signed surfaces.
///
/// Nodes live in a slotmap arena; the parent link is a lookup used by the
/// insertion search, never an ownership edge, so structural edits are key
/// rewrites. Every operator node has exactly two children by construction.
#[derive(Debug, Clone)]
pub struct RuleTree {
    nodes: SlotMap<RuleId, RuleNode>,
    root: RuleId,
}

impl RuleTree {
    /// Creates a single-leaf tree.
    ///
    /// # Errors
    ///
    /// Returns an error for surface id 0.
    pub fn leaf(surface: SignedSurface) -> Result<Self> {
        if surface == 0 {
            return Err(ConstructionError::ZeroSurfaceId.into());
        }
        let mut nodes = SlotMap::with_key();
        let root = nodes.insert(RuleNode {
            parent: None,
            kind: RuleKind::Leaf(surface),
        });
        Ok(Self { nodes, root })
    }

    /// Joins two trees under a new operator root.
    #[must_use]
    pub fn combine(op: BoolOp, left: RuleTree, right: RuleTree) -> RuleTree {
        let mut tree = left;
        let grafted = tree.graft(&right, right.root);
        let root = tree.nodes.insert(RuleNode {
            parent: None,
            kind: RuleKind::Op(op, tree.root, grafted),
        });
        tree.nodes[tree.root].parent = Some(root);
        tree.nodes[grafted].parent = Some(root);
        tree.root = root;
        tree
    }

    /// Copies the subtree rooted at `node` from `other` into this arena,
    /// returning the new key of its root.
    fn graft(&mut self, other: &RuleTree, node: RuleId) -> RuleId {
        match other.nodes[node].kind {
            RuleKind::Leaf(surface) => self.nodes.insert(RuleNode {
                parent: None,
                kind: RuleKind::Leaf(surface),
            }),
            RuleKind::Op(op, a, b) => {
                let left = self.graft(other, a);
                let right = self.graft(other, b);
                let id = self.nodes.insert(RuleNode {
                    parent: None,
                    kind: RuleKind::Op(op, left, right),
                });
                self.nodes[left].parent = Some(id);
                self.nodes[right].parent = Some(id);
                id
            }
        }
    }

    fn node(&self, id: RuleId) -> Result<&RuleNode> {
        self.nodes
            .get(id)
            .ok_or_else(|| ConstructionError::MalformedTree("dangling node reference".into()).into())
    }

    pub(crate) fn root(&self) -> RuleId {
        self.root
    }

    pub(crate) fn kind_of(&self, id: RuleId) -> Result<RuleKind> {
        Ok(self.node(id)?.kind)
    }

    /// Intersects an extra signed surface into the tree at the first node
    /// (breadth-first) that is not already an intersection.
    ///
    /// # Errors
    ///
    /// Returns an error for surface id 0 or a corrupt arena.
    pub fn add_intersection(&mut self, surface: SignedSurface) -> Result<()> {
        self.insert_first_mismatch(BoolOp::Intersection, surface)
    }

    /// Unions an extra signed surface into the tree at the first node
    /// (breadth-first) that is not already a union.
    ///
    /// # Errors
    ///
    /// Returns an error for surface id 0 or a corrupt arena.
    pub fn add_union(&mut self, surface: SignedSurface) -> Result<()> {
        self.insert_first_mismatch(BoolOp::Union, surface)
    }

    /// Breadth-first search (left child before right) for the first node
    /// whose operator differs from `op`; that node is replaced by
    /// `op(old, leaf)`. Falls back to wrapping the root if every visited
    /// node matches.
    fn insert_first_mismatch(&mut self, op: BoolOp, surface: SignedSurface) -> Result<()> {
        if surface == 0 {
            return Err(ConstructionError::ZeroSurfaceId.into());
        }

        let mut target = self.root;
        let mut queue = VecDeque::from([self.root]);
        let mut found = false;
        while let Some(id) = queue.pop_front() {
            match self.node(id)?.kind {
                RuleKind::Op(node_op, a, b) if node_op == op => {
                    queue.push_back(a);
                    queue.push_back(b);
                }
                _ => {
                    target = id;
                    found = true;
                    break;
                }
            }
        }
        // A tree made entirely of `op` nodes terminates in leaves, which
        // always mismatch; the fallback wraps the root anyway.
        if !found {
            target = self.root;
        }

        let parent = self.node(target)?.parent;
        let leaf = self.nodes.insert(RuleNode {
            parent: None,
            kind: RuleKind::Leaf(surface),
        });
        let joint = self.nodes.insert(RuleNode {
            parent,
            kind: RuleKind::Op(op, target, leaf),
        });
        self.nodes[target].parent = Some(joint);
        self.nodes[leaf].parent = Some(joint);

        match parent {
            None => self.root = joint,
            Some(p) => {
                let RuleKind::Op(pop, a, b) = self.node(p)?.kind else {
                    return Err(
                        ConstructionError::MalformedTree("leaf node used as a parent".into())
                            .into(),
                    );
                };
                let (na, nb) = if a == target { (joint, b) } else { (a, joint) };
                self.nodes[p].kind = RuleKind::Op(pop, na, nb);
            }
        }
        Ok(())
    }

    /// De Morgan complement: operators swapped, leaf signs flipped.
    /// Non-destructive; returns a new tree.
    ///
    /// # Errors
    ///
    /// Returns an error for a corrupt arena.
    pub fn complement(&self) -> Result<RuleTree> {
        let mut nodes = SlotMap::with_key();
        let root = self.complement_node(self.root, &mut nodes)?;
        Ok(RuleTree { nodes, root })
    }

    fn complement_node(
        &self,
        id: RuleId,
        out: &mut SlotMap<RuleId, RuleNode>,
    ) -> Result<RuleId> {
        match self.node(id)?.kind {
            RuleKind::Leaf(surface) => Ok(out.insert(RuleNode {
                parent: None,
                kind: RuleKind::Leaf(-surface),
            })),
            RuleKind::Op(op, a, b) => {
                let swapped = match op {
                    BoolOp::Intersection => BoolOp::Union,
                    BoolOp::Union => BoolOp::Intersection,
                };
                let left = self.complement_node(a, out)?;
                let right = self.complement_node(b, out)?;
                let node = out.insert(RuleNode {
                    parent: None,
                    kind: RuleKind::Op(swapped, left, right),
                });
                out[left].parent = Some(node);
                out[right].parent = Some(node);
                Ok(node)
            }
        }
    }

    fn eval_node<F>(&self, id: RuleId, leaf: &F) -> Result<bool>
    where
        F: Fn(SignedSurface) -> Result<bool>,
    {
        match self.node(id)?.kind {
            RuleKind::Leaf(surface) => leaf(surface),
            RuleKind::Op(BoolOp::Intersection, a, b) => {
                Ok(self.eval_node(a, leaf)? && self.eval_node(b, leaf)?)
            }
            RuleKind::Op(BoolOp::Union, a, b) => {
                Ok(self.eval_node(a, leaf)? || self.eval_node(b, leaf)?)
            }
        }
    }

    /// Half-space test for one signed leaf. Points within the surface
    /// tolerance band count as valid for either sign.
    fn half_space(
        registry: &SurfaceRegistry,
        point: &Point3,
        surface: SignedSurface,
    ) -> Result<bool> {
        let value = registry.get(surface.unsigned_abs())?.side_value(point);
        Ok(if surface > 0 {
            value >= -SURFACE_TOL
        } else {
            value <= SURFACE_TOL
        })
    }

    /// Evaluates the tree at a point with short-circuiting.
    ///
    /// # Errors
    ///
    /// Returns an error for an unknown surface or a corrupt arena.
    pub fn evaluate(&self, registry: &SurfaceRegistry, point: &Point3) -> Result<bool> {
        self.eval_node(self.root, &|s| Self::half_space(registry, point, s))
    }

    /// Evaluates the tree with the listed surfaces treated as valid,
    /// regardless of sign. Used for points lying exactly on a boundary.
    ///
    /// # Errors
    ///
    /// Returns an error for an unknown surface or a corrupt arena.
    pub fn evaluate_excluding(
        &self,
        registry: &SurfaceRegistry,
        point: &Point3,
        excluded: &[SurfaceId],
    ) -> Result<bool> {
        self.eval_node(self.root, &|s| {
            if excluded.contains(&s.unsigned_abs()) {
                Ok(true)
            } else {
                Self::half_space(registry, point, s)
            }
        })
    }

    /// Evaluates the tree with the named surface forced to a side:
    /// `state` is the truth of the positive literal.
    ///
    /// # Errors
    ///
    /// Returns an error for an unknown surface or a corrupt arena.
    pub fn evaluate_forced(
        &self,
        registry: &SurfaceRegistry,
        point: &Point3,
        surface: SurfaceId,
        state: bool,
    ) -> Result<bool> {
        self.eval_node(self.root, &|s| {
            if s.unsigned_abs() == surface {
                Ok((s > 0) == state)
            } else {
                Self::half_space(registry, point, s)
            }
        })
    }

    /// Evaluates the tree over an abstract truth assignment of surface ids.
    ///
    /// # Errors
    ///
    /// Returns an error for a corrupt arena.
    pub fn evaluate_map<F>(&self, assign: F) -> Result<bool>
    where
        F: Fn(SurfaceId) -> bool,
    {
        self.eval_node(self.root, &|s| Ok((s > 0) == assign(s.unsigned_abs())))
    }

    /// All signed surfaces referenced by the leaves.
    ///
    /// # Errors
    ///
    /// Returns an error for a corrupt arena.
    pub fn collect_signed(&self) -> Result<BTreeSet<SignedSurface>> {
        let mut out = BTreeSet::new();
        self.collect_node(self.root, &mut out)?;
        Ok(out)
    }

    /// All surface ids referenced by the leaves, signs stripped.
    ///
    /// # Errors
    ///
    /// Returns an error for a corrupt arena.
    pub fn collect_surfaces(&self) -> Result<BTreeSet<SurfaceId>> {
        Ok(self
            .collect_signed()?
            .into_iter()
            .map(SignedSurface::unsigned_abs)
            .collect())
    }

    fn collect_node(&self, id: RuleId, out: &mut BTreeSet<SignedSurface>) -> Result<()> {
        match self.node(id)?.kind {
            RuleKind::Leaf(surface) => {
                out.insert(surface);
            }
            RuleKind::Op(_, a, b) => {
                self.collect_node(a, out)?;
                self.collect_node(b, out)?;
            }
        }
        Ok(())
    }

    /// Renders the tree in the algebra text syntax: space for intersection,
    /// `:` for union, parentheses around unions inside intersections.
    ///
    /// # Errors
    ///
    /// Returns an error for a corrupt arena.
    pub fn display(&self) -> Result<String> {
        self.display_node(self.root, false)
    }

    fn display_node(&self, id: RuleId, under_intersection: bool) -> Result<String> {
        match self.node(id)?.kind {
            RuleKind::Leaf(surface) => Ok(surface.to_string()),
            RuleKind::Op(BoolOp::Intersection, a, b) => Ok(format!(
                "{} {}",
                self.display_node(a, true)?,
                self.display_node(b, true)?
            )),
            RuleKind::Op(BoolOp::Union, a, b) => {
                let body = format!(
                    "{} : {}",
                    self.display_node(a, false)?,
                    self.display_node(b, false)?
                );
                Ok(if under_intersection {
                    format!("({body})")
                } else {
                    body
                })
            }
        }
    }
}

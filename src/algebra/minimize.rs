//! Boolean minimization to canonical prime-implicant sum-of-products.
//!
//! The expression is expanded to a sum of products, then closed under
//! consensus (merging product pairs that oppose in exactly one literal)
//! with absorption after every round. The fixed point is the set of all
//! prime implicants in a deterministic order, so minimization is
//! idempotent and two equivalent inputs render to the same string.

use std::collections::{BTreeMap, BTreeSet};

use crate::error::{ConstructionError, Result};

use super::rule::{BoolOp, RuleKind, RuleId, RuleTree};
use super::{with_sign, SurfaceId};

/// One product term: surface id to literal polarity. An absent id is a
/// don't-care; the empty term is the constant true.
type Term = BTreeMap<SurfaceId, bool>;

/// A rule tree reduced to canonical minimal sum-of-products.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CanonicalForm {
    terms: Vec<Term>,
}

/// Reduces a rule tree to its canonical minimal form.
///
/// # Errors
///
/// Returns an error for a corrupt arena.
pub fn minimize(tree: &RuleTree) -> Result<CanonicalForm> {
    let mut set: BTreeSet<Term> = expand(tree, tree.root())?.into_iter().collect();
    absorb(&mut set);

    loop {
        let terms: Vec<Term> = set.iter().cloned().collect();
        let mut added = false;
        for (i, a) in terms.iter().enumerate() {
            for b in &terms[i + 1..] {
                let Some(c) = consensus(a, b) else { continue };
                if !set.iter().any(|t| subsumes(t, &c)) {
                    set.insert(c);
                    added = true;
                }
            }
        }
        if !added {
            break;
        }
        absorb(&mut set);
    }
    absorb(&mut set);

    Ok(CanonicalForm {
        terms: set.into_iter().collect(),
    })
}

/// Sum-of-products expansion; contradictory products are dropped.
fn expand(tree: &RuleTree, id: RuleId) -> Result<Vec<Term>> {
    match tree.kind_of(id)? {
        RuleKind::Leaf(surface) => Ok(vec![Term::from([(
            surface.unsigned_abs(),
            surface > 0,
        )])]),
        RuleKind::Op(BoolOp::Union, a, b) => {
            let mut out = expand(tree, a)?;
            out.extend(expand(tree, b)?);
            Ok(out)
        }
        RuleKind::Op(BoolOp::Intersection, a, b) => {
            let left = expand(tree, a)?;
            let right = expand(tree, b)?;
            let mut out = Vec::new();
            for t1 in &left {
                'product: for t2 in &right {
                    let mut merged = t1.clone();
                    for (&k, &v) in t2 {
                        if *merged.entry(k).or_insert(v) != v {
                            continue 'product;
                        }
                    }
                    out.push(merged);
                }
            }
            Ok(out)
        }
    }
}

/// Consensus of two products opposing in exactly one literal: the union of
/// the rest. `None` when no (or more than one) literal opposes.
fn consensus(a: &Term, b: &Term) -> Option<Term> {
    let mut pivot = None;
    for (k, v) in a {
        if b.get(k).is_some_and(|w| w != v) {
            if pivot.is_some() {
                return None;
            }
            pivot = Some(*k);
        }
    }
    let pivot = pivot?;
    let mut out: Term = a.iter().filter(|(&k, _)| k != pivot).map(|(&k, &v)| (k, v)).collect();
    out.extend(b.iter().filter(|(&k, _)| k != pivot).map(|(&k, &v)| (k, v)));
    Some(out)
}

/// True when `a` covers `b` (every literal of `a` appears in `b`).
fn subsumes(a: &Term, b: &Term) -> bool {
    a.iter().all(|(k, v)| b.get(k) == Some(v))
}

/// Removes every term strictly covered by another.
fn absorb(set: &mut BTreeSet<Term>) {
    let terms: Vec<Term> = set.iter().cloned().collect();
    set.retain(|t| !terms.iter().any(|s| s != t && subsumes(s, t)));
}

impl CanonicalForm {
    /// True when the form reduced to the constant true.
    #[must_use]
    pub fn is_always_true(&self) -> bool {
        self.terms.iter().any(BTreeMap::is_empty)
    }

    /// True when the form reduced to the constant false.
    #[must_use]
    pub fn is_always_false(&self) -> bool {
        self.terms.is_empty()
    }

    /// Number of product terms.
    #[must_use]
    pub fn term_count(&self) -> usize {
        self.terms.len()
    }

    /// Renders the form in the algebra text syntax.
    ///
    /// # Errors
    ///
    /// A tautology or contradiction has no textual form and errors.
    pub fn render(&self) -> Result<String> {
        if self.is_always_true() {
            return Err(ConstructionError::UnrepresentableForm("a tautology").into());
        }
        if self.is_always_false() {
            return Err(ConstructionError::UnrepresentableForm("a contradiction").into());
        }
        let products: Vec<String> = self
            .terms
            .iter()
            .map(|term| {
                term.iter()
                    .map(|(&id, &pos)| with_sign(id, pos).to_string())
                    .collect::<Vec<_>>()
                    .join(" ")
            })
            .collect();
        Ok(products.join(" : "))
    }

    /// Rebuilds a rule tree from the canonical form.
    ///
    /// # Errors
    ///
    /// A tautology or contradiction cannot be expressed as a tree.
    pub fn to_tree(&self) -> Result<RuleTree> {
        let mut union: Option<RuleTree> = None;
        for term in &self.terms {
            if term.is_empty() {
                return Err(ConstructionError::UnrepresentableForm("a tautology").into());
            }
            let mut product: Option<RuleTree> = None;
            for (&id, &pos) in term {
                let leaf = RuleTree::leaf(with_sign(id, pos))?;
                product = Some(match product {
                    None => leaf,
                    Some(t) => RuleTree::combine(BoolOp::Intersection, t, leaf),
                });
            }
            // Terms are non-empty here, so the product always exists.
            if let Some(p) = product {
                union = Some(match union {
                    None => p,
                    Some(t) => RuleTree::combine(BoolOp::Union, t, p),
                });
            }
        }
        union.ok_or_else(|| ConstructionError::UnrepresentableForm("a contradiction").into())
    }

    /// Evaluates the form over an abstract truth assignment.
    #[must_use]
    pub fn evaluate_map<F>(&self, assign: F) -> bool
    where
        F: Fn(SurfaceId) -> bool,
    {
        self.terms
            .iter()
            .any(|term| term.iter().all(|(&id, &pos)| assign(id) == pos))
    }
}

pub mod minimize;
pub mod rule;
pub mod text;

pub use minimize::{minimize, CanonicalForm};
pub use rule::{BoolOp, RuleTree};
pub use text::parse;

/// Registry identifier of a surface (always non-zero and positive).
pub type SurfaceId = u32;

/// A surface id with the half-space sign folded in. Never zero; the sign
/// selects the side of the surface on which the literal holds.
pub type SignedSurface = i32;

/// Folds a sign onto a surface id.
#[allow(clippy::cast_possible_wrap)]
#[must_use]
pub fn with_sign(id: SurfaceId, positive: bool) -> SignedSurface {
    let s = id as i32;
    if positive {
        s
    } else {
        -s
    }
}

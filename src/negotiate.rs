//! Preview and picture size negotiation.
//!
//! The candidate whose aspect ratio is closest to the target wins. Ratios are
//! compared by integer cross-multiplication so equal ratios tie exactly. Ties
//! go to the smallest width difference, and after that to the first candidate
//! in the order the device reported them. That last rule makes the result
//! depend on driver ordering, but it is still deterministic for a given list.

use crate::invariant::NEGOTIATE_NON_EMPTY;
use crate::types::Size;
use std::cmp::Ordering;

/// Clamp a requested size to the preferred maximum. Each side stays >= 1.
pub fn clamp_to_preferred(requested: Size, preferred: Size) -> Size {
    Size::new(
        requested.width.min(preferred.width).max(1),
        requested.height.min(preferred.height).max(1),
    )
}

/// Pick the candidate closest to `target`.
///
/// # Panics
/// Panics if `candidates` is empty; callers check capability presence first.
pub fn select_optimal(candidates: &[Size], target: Size) -> Size {
    crate::assert_invariant!(!candidates.is_empty(), NEGOTIATE_NON_EMPTY);

    let mut best = candidates[0];
    for candidate in &candidates[1..] {
        if compare(candidate, &best, target) == Ordering::Less {
            best = *candidate;
        }
    }

    log::debug!("Negotiated {} for target {} from {} candidates", best, target, candidates.len());
    best
}

/// `Less` when `a` is strictly closer to `target` than `b`.
fn compare(a: &Size, b: &Size, target: Size) -> Ordering {
    compare_aspect(a, b, target).then_with(|| width_distance(a, target).cmp(&width_distance(b, target)))
}

/// Orders by `|w/h - tw/th|`.
///
/// With `d(s) = |s.w * th - s.h * tw| / (s.h * th)` the common `th` cancels,
/// so `d(a) < d(b)` iff `num(a) * b.h < num(b) * a.h`. A zero-height
/// candidate has an unbounded deviation and never wins against a valid one.
fn compare_aspect(a: &Size, b: &Size, target: Size) -> Ordering {
    match (a.height, b.height) {
        (0, 0) => return Ordering::Equal,
        (0, _) => return Ordering::Greater,
        (_, 0) => return Ordering::Less,
        _ => {}
    }

    let lhs = aspect_numerator(a, target) * u128::from(b.height);
    let rhs = aspect_numerator(b, target) * u128::from(a.height);
    lhs.cmp(&rhs)
}

fn aspect_numerator(size: &Size, target: Size) -> u128 {
    let cross = u128::from(size.width) * u128::from(target.height);
    let target_cross = u128::from(size.height) * u128::from(target.width);
    cross.abs_diff(target_cross)
}

fn width_distance(size: &Size, target: Size) -> u32 {
    size.width.abs_diff(target.width)
}

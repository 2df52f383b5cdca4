//! Precondition invariants with contract-test bookkeeping.
//!
//! Logic errors in this crate (opening a session that already holds a device,
//! negotiating against an empty candidate list) are bugs in the command
//! serialization, not runtime conditions, so they panic through
//! [`assert_invariant!`]. Each check is recorded per thread so tests can prove
//! a code path actually exercised the invariant:
//!
//! ```rust,ignore
//! use crabpreview::invariant::{contract_test, NEGOTIATE_NON_EMPTY};
//!
//! crabpreview::negotiate::select_optimal(&sizes, target);
//! contract_test("negotiator", &[NEGOTIATE_NON_EMPTY]);
//! ```

use std::cell::RefCell;
use std::collections::HashSet;

/// A session only opens a device while it holds none.
pub const SESSION_OPEN_WHILE_CLOSED: &str = "session must be closed before open";
/// The size negotiator never runs on an empty candidate list.
pub const NEGOTIATE_NON_EMPTY: &str = "size candidates must be non-empty";
/// Configure and surface binding need an opened device.
pub const SESSION_HOLDS_DEVICE: &str = "session must hold an open device";
/// A streaming session is never started twice.
pub const SESSION_START_ONCE: &str = "session must not already be streaming";
/// Parameters are only negotiated between open and start.
pub const SESSION_CONFIGURE_UNSTARTED: &str = "session must not be streaming to configure";

thread_local! {
    static CHECKED: RefCell<HashSet<&'static str>> = RefCell::new(HashSet::new());
}

/// Assert an invariant and record that it was checked.
///
/// Panics with the invariant message when the condition is false.
#[macro_export]
macro_rules! assert_invariant {
    ($condition:expr, $invariant:expr) => {
        $crate::invariant::__check($condition, $invariant, module_path!())
    };
}

#[doc(hidden)]
pub fn __check(condition: bool, invariant: &'static str, context: &str) {
    CHECKED.with(|checked| {
        checked.borrow_mut().insert(invariant);
    });

    if !condition {
        panic!("INVARIANT VIOLATION [{}]: {}", context, invariant);
    }
}

/// Panics unless every listed invariant was checked on this thread.
pub fn contract_test(name: &str, required: &[&'static str]) {
    let missing: Vec<&str> = CHECKED.with(|checked| {
        let checked = checked.borrow();
        required
            .iter()
            .copied()
            .filter(|inv| !checked.contains(inv))
            .collect()
    });

    if !missing.is_empty() {
        panic!(
            "CONTRACT FAILURE [{}]: invariants never checked:\n  - {}",
            name,
            missing.join("\n  - ")
        );
    }
}

/// Forget everything recorded on this thread.
pub fn clear_checked() {
    CHECKED.with(|checked| checked.borrow_mut().clear());
}

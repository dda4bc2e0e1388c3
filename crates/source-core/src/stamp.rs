//! Modification stamps.
//!
//! A [`Stamp`] is drawn from one process-wide monotonic counter, so a stamp is never reused:
//! two distinct contents (of the same or of different handles) never share a stamp, and
//! comparing a cached value's stamp with the current one is enough to detect staleness.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

static LAST_STAMP: AtomicU64 = AtomicU64::new(0);

/// Monotonic modification stamp.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct Stamp(u64);

impl Stamp {
    /// The "never modified" stamp. [`Stamp::next`] never returns it.
    pub const ZERO: Stamp = Stamp(0);

    /// Allocate a fresh stamp, strictly greater than every stamp allocated before it.
    pub fn next() -> Self {
        Stamp(LAST_STAMP.fetch_add(1, Ordering::AcqRel) + 1)
    }

    /// Get the underlying numeric value.
    pub fn get(self) -> u64 {
        self.0
    }

    pub(crate) fn from_raw(raw: u64) -> Self {
        Stamp(raw)
    }
}

impl fmt::Display for Stamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "@{}", self.0)
    }
}

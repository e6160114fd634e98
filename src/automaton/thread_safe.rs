//! Concurrent sharing of a compiled pattern.
//!
//! A compiled [`Regex`] is immutable, so any number of threads may match
//! against it through an `Arc`. [`SharedRegex`] adds lock-free
//! replacement on top: readers load the current automaton through an
//! [`ArcSwap`] snapshot while a mutex serializes writers recompiling it.
//! In-flight matches keep running against the automaton they loaded.

use std::sync::Arc;

use arc_swap::ArcSwap;
use parking_lot::Mutex;

use crate::error::RegexError;
use crate::{MatchResult, Regex};

/// A compiled pattern that can be swapped for a recompiled one while
/// other threads keep matching.
pub struct SharedRegex {
    current: ArcSwap<Regex>,
    swap_lock: Mutex<()>,
}

impl SharedRegex {
    /// Wrap an already compiled pattern.
    pub fn new(regex: Regex) -> Self {
        Self {
            current: ArcSwap::from_pointee(regex),
            swap_lock: Mutex::new(()),
        }
    }

    /// Compile `pattern` and wrap the result.
    pub fn compile(pattern: &str) -> Result<Self, RegexError> {
        Ok(Self::new(Regex::compile(pattern)?))
    }

    /// Snapshot of the current automaton. The snapshot stays valid after
    /// a concurrent [`swap`](Self::swap).
    pub fn load(&self) -> Arc<Regex> {
        self.current.load_full()
    }

    /// Recompile and publish a new pattern. On a compile error the
    /// current automaton stays in place.
    pub fn swap(&self, pattern: &str) -> Result<(), RegexError> {
        let _guard = self.swap_lock.lock();
        let fresh = Regex::compile(pattern)?;
        self.current.store(Arc::new(fresh));
        Ok(())
    }

    /// Match against the current automaton.
    pub fn test(&self, input: &str) -> MatchResult {
        self.current.load().test(input)
    }
}

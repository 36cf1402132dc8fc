//! Rate-limit warnings to once per (source, condition) pair.
//!
//! A small hand-rolled set rather than a logging rate-limiter crate — the
//! bookkeeping here is a handful of string pairs, not a general facility.

use std::collections::HashSet;
use std::hash::Hash;

#[derive(Debug, Default)]
pub struct WarnOnce<K: Eq + Hash> {
    seen: HashSet<K>,
}

impl<K: Eq + Hash> WarnOnce<K> {
    pub fn new() -> Self {
        Self {
            seen: HashSet::new(),
        }
    }

    /// Returns `true` the first time `key` is seen, `false` on every
    /// subsequent call with an equal key.
    pub fn should_warn(&mut self, key: K) -> bool {
        self.seen.insert(key)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn warns_once_per_key() {
        let mut w = WarnOnce::new();
        assert!(w.should_warn(("src1", "missing_audio")));
        assert!(!w.should_warn(("src1", "missing_audio")));
        assert!(w.should_warn(("src2", "missing_audio")));
    }
}

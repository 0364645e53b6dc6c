//! Debug-only reentrancy guard.
//!
//! Detects a nested call into the arena tree while one of its methods is
//! still running, which can only happen through a user `Ord` impl. In debug
//! builds a second `enter` panics; in release builds the guard is a no-op.

#[cfg(debug_assertions)]
use core::cell::Cell;
use core::marker::PhantomData;

/// Per-tree depth tracker. Public tree methods start with
/// `let _g = self.reentrancy.enter();`.
///
/// Holds a `Cell` in debug builds, so the owning tree is `Send` but not `Sync`.
#[derive(Debug, Default)]
pub struct DebugReentrancy {
    #[cfg(debug_assertions)]
    depth: Cell<u32>,
}

impl DebugReentrancy {
    pub const fn new() -> Self {
        Self {
            #[cfg(debug_assertions)]
            depth: Cell::new(0),
        }
    }

    /// Enter a guarded section. Panics in debug builds if already inside one.
    #[inline]
    pub fn enter(&self) -> ReentrancyGuard<'_> {
        #[cfg(debug_assertions)]
        {
            let d = self.depth.get();
            assert!(d == 0, "reentrancy detected: nested call into arena tree");
            self.depth.set(d + 1);
            return ReentrancyGuard {
                owner: self,
                _lt: PhantomData,
            };
        }

        #[cfg(not(debug_assertions))]
        {
            return ReentrancyGuard { _lt: PhantomData };
        }
    }

    #[cfg(all(test, debug_assertions))]
    pub(crate) fn is_entered(&self) -> bool {
        self.depth.get() > 0
    }
}

/// RAII guard returned by [`DebugReentrancy::enter`].
pub struct ReentrancyGuard<'a> {
    #[cfg(debug_assertions)]
    owner: &'a DebugReentrancy,
    _lt: PhantomData<&'a ()>,
}

impl Drop for ReentrancyGuard<'_> {
    fn drop(&mut self) {
        #[cfg(debug_assertions)]
        {
            let d = self.owner.depth.get();
            debug_assert!(d > 0);
            self.owner.depth.set(d - 1);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::DebugReentrancy;

    #[test]
    fn sequential_sections_are_ok() {
        let r = DebugReentrancy::new();
        {
            let _g = r.enter();
        }
        let _g = r.enter();
    }

    #[cfg(debug_assertions)]
    #[test]
    fn guard_releases_on_drop() {
        let r = DebugReentrancy::new();
        let g = r.enter();
        assert!(r.is_entered());
        drop(g);
        assert!(!r.is_entered());
    }

    #[cfg(debug_assertions)]
    #[test]
    fn nested_enter_panics_in_debug() {
        let r = DebugReentrancy::new();
        let res = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
            let _outer = r.enter();
            let _inner = r.enter();
        }));
        assert!(res.is_err(), "expected nested enter to panic in debug builds");
        // The outer guard unwound and restored the depth.
        assert!(!r.is_entered());
    }

    #[cfg(not(debug_assertions))]
    #[test]
    fn nested_enter_is_noop_in_release() {
        let r = DebugReentrancy::new();
        let _outer = r.enter();
        let _inner = r.enter();
    }
}

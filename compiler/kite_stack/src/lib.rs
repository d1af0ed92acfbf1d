//! Stack growth for recursive plan evaluation.
//!
//! The evaluator recurses once per plan node, and user code can recurse
//! through `call` without bound other than `EvalConfig::max_depth`. Wrapping
//! each node evaluation in [`ensure_sufficient_stack`] lets deep plans run on
//! the default thread stack, including the smaller stacks of worker threads.

/// Grow when less than this much stack remains.
const RED_ZONE: usize = 128 * 1024;

/// Size of each freshly allocated stack segment.
const STACK_PER_RECURSION: usize = 2 * 1024 * 1024;

/// Run `f`, first switching to a new stack segment if the current one is
/// nearly exhausted.
#[inline]
#[cfg(not(target_arch = "wasm32"))]
pub fn ensure_sufficient_stack<R>(f: impl FnOnce() -> R) -> R {
    stacker::maybe_grow(RED_ZONE, STACK_PER_RECURSION, f)
}

/// WASM manages its own stack.
#[inline]
#[cfg(target_arch = "wasm32")]
pub fn ensure_sufficient_stack<R>(f: impl FnOnce() -> R) -> R {
    f()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn nest(depth: u64) -> u64 {
        ensure_sufficient_stack(|| if depth == 0 { 0 } else { nest(depth - 1) + 1 })
    }

    #[test]
    fn shallow_nesting() {
        assert_eq!(nest(16), 16);
    }

    #[test]
    fn deep_nesting_on_worker_thread() {
        // Worker threads default to a 2MB stack; this would overflow it.
        let depth = std::thread::spawn(|| nest(200_000)).join();
        assert_eq!(depth.ok(), Some(200_000));
    }

    #[test]
    fn passes_results_through() {
        let result: Result<i32, &str> = ensure_sufficient_stack(|| Err("boom"));
        assert_eq!(result, Err("boom"));
    }
}

//! Notification batching.
//!
//! Inside [`batch`], signals queue instead of firing. When the outermost
//! batch closes, every queued signal fires exactly once, so observers see
//! the final state of a multi-cell update instead of each intermediate step.

use std::cell::RefCell;

use super::Signal;

#[derive(Default)]
struct BatchState {
    depth: usize,
    queued: Vec<Signal>,
}

// Batches are scoped to a synchronous call, so per-thread state is enough.
thread_local! {
    static BATCH: RefCell<BatchState> = RefCell::new(BatchState::default());
}

/// Run `f` with notifications deferred until it returns.
///
/// Batches nest; only the outermost one flushes.
pub fn batch<R>(f: impl FnOnce() -> R) -> R {
    BATCH.with(|b| b.borrow_mut().depth += 1);
    let guard = FlushGuard;
    let result = f();
    drop(guard);
    result
}

/// Whether a batch is open on this thread
pub fn in_batch() -> bool {
    BATCH.with(|b| b.borrow().depth > 0)
}

/// Queue `signal` if a batch is open. Returns `false` when the caller
/// should fire immediately.
pub(crate) fn defer(signal: &Signal) -> bool {
    BATCH.with(|b| {
        let mut state = b.borrow_mut();
        if state.depth == 0 {
            return false;
        }
        if !state.queued.iter().any(|queued| queued.same_as(signal)) {
            state.queued.push(signal.clone());
        }
        true
    })
}

/// Closes the batch even if `f` panics.
struct FlushGuard;

impl Drop for FlushGuard {
    fn drop(&mut self) {
        let outermost = BATCH.with(|b| {
            let mut state = b.borrow_mut();
            state.depth -= 1;
            state.depth == 0
        });
        if !outermost {
            return;
        }

        // Notifications raised by listeners while flushing (forwarded child
        // signals included) are queued again, one round per level.
        loop {
            let queued = BATCH.with(|b| std::mem::take(&mut b.borrow_mut().queued));
            if queued.is_empty() {
                break;
            }
            log::trace!("flushing {} batched signals", queued.len());

            BATCH.with(|b| b.borrow_mut().depth += 1);
            let _round = RoundGuard;
            for signal in queued {
                signal.fire();
            }
        }
    }
}

struct RoundGuard;

impl Drop for RoundGuard {
    fn drop(&mut self) {
        BATCH.with(|b| b.borrow_mut().depth -= 1);
    }
}

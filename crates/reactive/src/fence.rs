//! Write fences.
//!
//! A `WriteFence` counts writes that observers still have to process. Once
//! the fence is armed and every write has been committed, it runs its
//! before-fire callbacks (which may add more writes), then fires: the
//! all-committed callbacks run and `arm_and_wait` futures resolve.

use docket_core::{Error, Result};
use std::cell::RefCell;
use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::rc::Rc;
use std::task::{Context, Poll, Waker};

type BeforeFireFn = Box<dyn FnOnce(&WriteFence)>;
type CommittedFn = Box<dyn FnOnce()>;

#[derive(Default)]
struct FenceState {
    armed: bool,
    fired: bool,
    retired: bool,
    outstanding: usize,
    before_fire: Vec<BeforeFireFn>,
    on_committed: Vec<CommittedFn>,
    wakers: Vec<Waker>,
}

/// A barrier that fires once every write made under it has been processed.
#[derive(Clone, Default)]
pub struct WriteFence {
    state: Rc<RefCell<FenceState>>,
}

impl WriteFence {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers an outstanding write. The fence cannot fire until the
    /// returned guard is committed or dropped.
    pub fn begin_write(&self) -> Result<FenceWrite> {
        let mut state = self.state.borrow_mut();
        if state.retired {
            return Err(Error::invalid_operation("write fence has been retired"));
        }
        if state.fired {
            return Err(Error::invalid_operation(
                "write fence has already fired; too late to add writes",
            ));
        }
        state.outstanding += 1;
        Ok(FenceWrite {
            fence: Some(self.clone()),
        })
    }

    /// Allows the fence to fire once it has no outstanding writes.
    pub fn arm(&self) -> Result<()> {
        {
            let mut state = self.state.borrow_mut();
            if state.armed {
                return Err(Error::invalid_operation("write fence is already armed"));
            }
            state.armed = true;
        }
        self.maybe_fire();
        Ok(())
    }

    /// Arms the fence and returns a future that resolves when it fires.
    pub fn arm_and_wait(&self) -> Result<FenceWait> {
        self.arm()?;
        Ok(FenceWait { fence: self.clone() })
    }

    /// Runs `f` right before the fence fires. `f` may begin new writes, which
    /// then delay firing until they are committed.
    pub fn on_before_fire(&self, f: impl FnOnce(&WriteFence) + 'static) -> Result<()> {
        let mut state = self.state.borrow_mut();
        if state.fired {
            return Err(Error::invalid_operation(
                "write fence has already fired; too late to add a callback",
            ));
        }
        state.before_fire.push(Box::new(f));
        Ok(())
    }

    /// Runs `f` when the fence fires.
    pub fn on_all_committed(&self, f: impl FnOnce() + 'static) -> Result<()> {
        let mut state = self.state.borrow_mut();
        if state.fired {
            return Err(Error::invalid_operation(
                "write fence has already fired; too late to add a callback",
            ));
        }
        state.on_committed.push(Box::new(f));
        Ok(())
    }

    /// Marks a fired fence as finished with.
    pub fn retire(&self) -> Result<()> {
        let mut state = self.state.borrow_mut();
        if !state.fired {
            return Err(Error::invalid_operation("cannot retire a write fence that has not fired"));
        }
        state.retired = true;
        Ok(())
    }

    pub fn is_armed(&self) -> bool {
        self.state.borrow().armed
    }

    pub fn is_fired(&self) -> bool {
        self.state.borrow().fired
    }

    pub fn is_retired(&self) -> bool {
        self.state.borrow().retired
    }

    /// Returns the number of writes begun but not yet committed.
    pub fn outstanding_writes(&self) -> usize {
        self.state.borrow().outstanding
    }

    fn commit_write(&self) {
        {
            let mut state = self.state.borrow_mut();
            state.outstanding = state.outstanding.saturating_sub(1);
        }
        self.maybe_fire();
    }

    fn maybe_fire(&self) {
        loop {
            let callbacks = {
                let mut state = self.state.borrow_mut();
                if state.fired || !state.armed || state.outstanding > 0 {
                    return;
                }
                if state.before_fire.is_empty() {
                    break;
                }
                // Held open while the callbacks run so their commits cannot
                // fire the fence underneath us.
                state.outstanding += 1;
                std::mem::take(&mut state.before_fire)
            };
            for callback in callbacks {
                callback(self);
            }
            let mut state = self.state.borrow_mut();
            state.outstanding -= 1;
        }

        let (callbacks, wakers) = {
            let mut state = self.state.borrow_mut();
            state.fired = true;
            (
                std::mem::take(&mut state.on_committed),
                std::mem::take(&mut state.wakers),
            )
        };
        log::debug!("write fence fired ({} callbacks)", callbacks.len());
        for callback in callbacks {
            callback();
        }
        for waker in wakers {
            waker.wake();
        }
    }
}

impl fmt::Debug for WriteFence {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.state.borrow();
        f.debug_struct("WriteFence")
            .field("armed", &state.armed)
            .field("fired", &state.fired)
            .field("retired", &state.retired)
            .field("outstanding", &state.outstanding)
            .finish()
    }
}

/// An outstanding write on a fence. Committed on drop.
#[must_use = "a write is committed as soon as it is dropped"]
pub struct FenceWrite {
    fence: Option<WriteFence>,
}

impl FenceWrite {
    /// Commits the write.
    pub fn committed(mut self) {
        if let Some(fence) = self.fence.take() {
            fence.commit_write();
        }
    }
}

impl Drop for FenceWrite {
    fn drop(&mut self) {
        if let Some(fence) = self.fence.take() {
            fence.commit_write();
        }
    }
}

impl fmt::Debug for FenceWrite {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FenceWrite").finish_non_exhaustive()
    }
}

/// Resolves when its fence fires.
#[must_use = "futures do nothing unless polled"]
#[derive(Debug)]
pub struct FenceWait {
    fence: WriteFence,
}

impl Future for FenceWait {
    type Output = ();

    fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<()> {
        let mut state = self.fence.state.borrow_mut();
        if state.fired {
            return Poll::Ready(());
        }
        if !state.wakers.iter().any(|w| w.will_wake(cx.waker())) {
            state.wakers.push(cx.waker().clone());
        }
        Poll::Pending
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures_util::FutureExt;
    use std::cell::Cell;

    #[test]
    fn test_fires_after_last_commit() {
        let fence = WriteFence::new();
        let w1 = fence.begin_write().unwrap();
        let w2 = fence.begin_write().unwrap();
        let mut wait = fence.arm_and_wait().unwrap();
        assert!((&mut wait).now_or_never().is_none());

        w1.committed();
        assert!(!fence.is_fired());
        drop(w2);
        assert!(fence.is_fired());
        assert_eq!(wait.now_or_never(), Some(()));
    }

    #[test]
    fn test_unwritten_fence_fires_on_arm() {
        let fence = WriteFence::new();
        let committed = Rc::new(Cell::new(false));
        let c = committed.clone();
        fence.on_all_committed(move || c.set(true)).unwrap();
        assert!(!committed.get());
        fence.arm().unwrap();
        assert!(committed.get());
        assert!(fence.arm().is_err());
    }

    #[test]
    fn test_before_fire_can_add_writes() {
        let fence = WriteFence::new();
        let held: Rc<RefCell<Option<FenceWrite>>> = Rc::new(RefCell::new(None));
        let h = held.clone();
        fence
            .on_before_fire(move |f| *h.borrow_mut() = Some(f.begin_write().unwrap()))
            .unwrap();

        fence.arm().unwrap();
        assert!(!fence.is_fired());
        assert_eq!(fence.outstanding_writes(), 1);

        let write = held.borrow_mut().take();
        drop(write);
        assert!(fence.is_fired());
    }

    #[test]
    fn test_misuse_is_rejected() {
        let fence = WriteFence::new();
        assert!(matches!(fence.retire(), Err(Error::InvalidOperation { .. })));
        fence.arm().unwrap();
        assert!(fence.is_fired());

        assert!(fence.begin_write().is_err());
        assert!(fence.on_before_fire(|_| {}).is_err());
        assert!(fence.on_all_committed(|| {}).is_err());

        fence.retire().unwrap();
        assert!(fence.is_retired());
        assert!(fence.begin_write().is_err());
    }
}

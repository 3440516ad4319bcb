#![forbid(unsafe_code)]

//! Completion signals for queued operations.
//!
//! Every navigation call returns a [`Completion`]: a cheap, clonable handle
//! that can be polled with [`Completion::is_resolved`] from a frame loop or
//! awaited as a `Future`. The matching [`Completer`] stays with the queued
//! operation and fires exactly once, explicitly or when dropped, so no
//! caller can be left waiting on an operation that was discarded.
//!
//! # Invariants
//!
//! 1. Resolution is monotonic: once resolved, always resolved.
//! 2. A `Completer` resolves on drop if it was not resolved explicitly.
//! 3. Clones of a `Completion` observe the same resolution.

use std::cell::{Cell, RefCell};
use std::future::Future;
use std::pin::Pin;
use std::rc::Rc;
use std::task::{Context, Poll, Waker};

#[derive(Default)]
struct Signal {
    resolved: Cell<bool>,
    wakers: RefCell<Vec<Waker>>,
}

impl Signal {
    fn fire(&self) {
        if self.resolved.replace(true) {
            return;
        }
        for waker in self.wakers.take() {
            waker.wake();
        }
    }
}

/// Handle to the outcome of a queued operation.
#[derive(Clone)]
pub struct Completion {
    signal: Rc<Signal>,
}

impl std::fmt::Debug for Completion {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Completion")
            .field("resolved", &self.is_resolved())
            .finish()
    }
}

impl Completion {
    /// A fresh pending completion and the completer that resolves it.
    #[must_use]
    pub fn pair() -> (Self, Completer) {
        let signal = Rc::new(Signal::default());
        (
            Self {
                signal: Rc::clone(&signal),
            },
            Completer {
                signal: Some(signal),
            },
        )
    }

    /// A completion that is already resolved.
    #[must_use]
    pub fn resolved() -> Self {
        let signal = Rc::new(Signal::default());
        signal.fire();
        Self { signal }
    }

    #[must_use]
    pub fn is_resolved(&self) -> bool {
        self.signal.resolved.get()
    }
}

impl Future for Completion {
    type Output = ();

    fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<()> {
        if self.is_resolved() {
            return Poll::Ready(());
        }
        let mut wakers = self.signal.wakers.borrow_mut();
        if !wakers.iter().any(|w| w.will_wake(cx.waker())) {
            wakers.push(cx.waker().clone());
        }
        Poll::Pending
    }
}

/// Resolving side of a [`Completion`].
pub struct Completer {
    signal: Option<Rc<Signal>>,
}

impl std::fmt::Debug for Completer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Completer")
            .field("pending", &self.signal.is_some())
            .finish()
    }
}

impl Completer {
    /// Resolve now.
    pub fn resolve(mut self) {
        if let Some(signal) = self.signal.take() {
            signal.fire();
        }
    }
}

impl Drop for Completer {
    fn drop(&mut self) {
        if let Some(signal) = self.signal.take() {
            signal.fire();
        }
    }
}

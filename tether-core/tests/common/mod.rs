//! Shared fixtures for the integration tests.

#![allow(dead_code)]

use std::cell::{Cell, RefCell};
use std::rc::Rc;

use tether_core::{Environment, Listener, RootConfig, Slice, Unsubscribe};

/// An observable counter, the kind of source a component would own.
pub struct Counter {
    value: Cell<i32>,
    changes: Slice,
}

impl Counter {
    pub fn new(value: i32) -> Rc<Self> {
        Rc::new(Self {
            value: Cell::new(value),
            changes: Slice::new(),
        })
    }

    pub fn get(&self) -> i32 {
        self.value.get()
    }

    /// Store `value` and notify, even if it did not change.
    pub fn set(&self, value: i32) {
        self.value.set(value);
        self.changes.update();
    }

    pub fn listen(&self, listener: Listener) -> Option<Unsubscribe> {
        Some(self.changes.subscribe(listener))
    }

    pub fn listener_count(&self) -> usize {
        self.changes.listener_count()
    }
}

/// Fallback-consistent snapshot of an optional counter.
pub fn count(counter: Option<&Rc<Counter>>, _previous: Option<&i32>) -> i32 {
    counter.map_or(0, |counter| counter.get())
}

/// Subscribe step for the ad-hoc family.
pub fn listen(counter: &Rc<Counter>, listener: Listener) -> Option<Unsubscribe> {
    counter.listen(listener)
}

/// Ordered record of what happened.
pub type Log = Rc<RefCell<Vec<String>>>;

pub fn log() -> Log {
    Rc::default()
}

pub fn push(log: &Log, entry: impl Into<String>) {
    log.borrow_mut().push(entry.into());
}

pub fn entries(log: &Log) -> Vec<String> {
    log.borrow().clone()
}

/// Where a test can reach a source created inside a component.
pub type Handle<S> = Rc<RefCell<Option<S>>>;

pub fn take<S: Clone>(handle: &Handle<S>) -> S {
    handle.borrow().clone().expect("source was never created")
}

pub fn interactive() -> RootConfig {
    RootConfig::default().environment(Environment::Interactive)
}

pub fn strict() -> RootConfig {
    interactive().strict(true)
}

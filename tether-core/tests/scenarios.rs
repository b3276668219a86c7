//! End-to-end Scenarios
//!
//! Each test mounts a component on a [`Root`] and drives a source from the
//! outside, the way an application would.

mod common;

use std::cell::{Cell, RefCell};
use std::panic::{self, AssertUnwindSafe};
use std::rc::Rc;

use tether_core::{contract, deps, subscription, Created, Cx, Environment, Root, RootConfig, Unsubscribe};

use common::{count, entries, interactive, listen, log, push, strict, take, Counter, Handle};

/// Init that records the counter where the test can reach it.
fn create(handle: &Handle<Rc<Counter>>, value: i32) -> impl Fn() -> Created<Rc<Counter>> + Clone + 'static {
    let handle = handle.clone();
    move || {
        let counter = Counter::new(value);
        *handle.borrow_mut() = Some(counter.clone());
        Created::new(counter)
    }
}

/// Test that a strict-mode counter renders each change exactly once per pass.
#[test]
fn general_counter_under_strict_mode() {
    let handle: Handle<Rc<Counter>> = Rc::default();
    let renders: Rc<RefCell<Vec<i32>>> = Rc::default();
    let root = Root::new(strict());

    let init = create(&handle, 0);
    let seen = renders.clone();
    root.render(move |cx| {
        let (hook, _) = subscription::use_source(cx, init.clone(), deps![]);
        let value = hook.use_snapshot(cx, count, None, listen, None);
        seen.borrow_mut().push(value);
        value
    })
    .unwrap();
    assert_eq!(*renders.borrow(), vec![0, 0]);

    let counter = take(&handle);
    counter.set(1);
    assert_eq!(*renders.borrow(), vec![0, 0, 1, 1]);

    // Same value again: re-derived, compared equal, no render.
    counter.set(1);
    assert_eq!(*renders.borrow(), vec![0, 0, 1, 1]);
    assert_eq!(root.output(), Some(1));
}

/// Test that an atomic source sees a change dispatched from a passive effect.
#[test]
fn atomic_source_follows_effect_dispatch() {
    let handle: Handle<Rc<Counter>> = Rc::default();
    let renders: Rc<RefCell<Vec<i32>>> = Rc::default();
    let root = Root::new(strict());

    let init = create(&handle, 0);
    let seen = renders.clone();
    root.render(move |cx| {
        let (value, lazy) = subscription::use_atomic_source(
            cx,
            init.clone(),
            listen,
            |counter: Option<&Rc<Counter>>| counter.map_or(0, |counter| counter.get()),
        );
        seen.borrow_mut().push(value);

        cx.use_effect(Some(deps![value]), move || {
            if value == 2 {
                lazy.get().set(3);
            }
            None
        });
        value
    })
    .unwrap();

    // Mount renders twice, then once more after reconciling with the source.
    assert_eq!(*renders.borrow(), vec![0, 0, 0, 0]);
    renders.borrow_mut().clear();

    take(&handle).set(2);
    assert_eq!(*renders.borrow(), vec![2, 2, 3, 3]);
    assert_eq!(root.output(), Some(3));
}

/// Test that a contract-backed atomic source sees a change dispatched from a passive effect.
#[test]
fn contract_atomic_source_follows_effect_dispatch() {
    let handle: Handle<Rc<Counter>> = Rc::default();
    let renders: Rc<RefCell<Vec<i32>>> = Rc::default();
    let root = Root::new(strict());

    let init = create(&handle, 0);
    let seen = renders.clone();
    root.render(move |cx| {
        let (value, lazy) = contract::use_atomic_source(
            cx,
            init.clone(),
            listen,
            |counter: Option<&Rc<Counter>>| counter.map_or(0, |counter| counter.get()),
        );
        seen.borrow_mut().push(value);

        cx.use_effect(Some(deps![value]), move || {
            if value == 2 {
                lazy.get().set(3);
            }
            None
        });
        value
    })
    .unwrap();

    assert_eq!(*renders.borrow(), vec![0, 0, 0, 0]);
    renders.borrow_mut().clear();

    let counter = take(&handle);
    counter.set(2);
    assert_eq!(*renders.borrow(), vec![2, 2, 3, 3]);
    assert_eq!(root.output(), Some(3));
    assert_eq!(counter.listener_count(), 1);
}

/// Test that two reads of one source see a change together, in one render.
#[test]
fn one_change_renders_all_reads_once() {
    let handle: Handle<Rc<Counter>> = Rc::default();
    let renders: Rc<RefCell<Vec<(i32, i32)>>> = Rc::default();
    let root = Root::new(interactive());

    let init = create(&handle, 0);
    let seen = renders.clone();
    root.render(move |cx| {
        let (hook, _) = subscription::use_source(cx, init.clone(), deps![]);
        let value = hook.use_snapshot(cx, count, None, listen, None);
        let scaled = hook.use_snapshot(
            cx,
            |counter: Option<&Rc<Counter>>, _| count(counter, None) * 10,
            None,
            listen,
            None,
        );
        seen.borrow_mut().push((value, scaled));
        (value, scaled)
    })
    .unwrap();
    assert_eq!(root.output(), Some((0, 0)));
    renders.borrow_mut().clear();

    let counter = take(&handle);
    counter.set(1);
    assert_eq!(*renders.borrow(), vec![(1, 10)]);

    counter.set(2);
    assert_eq!(*renders.borrow(), vec![(1, 10), (2, 20)]);
}

/// Test that a panicking `init` reaches the caller and the root keeps working.
#[test]
fn panicking_init_leaves_root_usable() {
    let attempts = Rc::new(Cell::new(0));
    let root = Root::new(interactive());

    let tries = attempts.clone();
    let render = move |cx: &mut Cx| {
        let tries = tries.clone();
        let (hook, _) = subscription::use_source(
            cx,
            move || {
                tries.set(tries.get() + 1);
                if tries.get() == 1 {
                    panic!("source unavailable");
                }
                Created::new(Counter::new(4))
            },
            deps![],
        );
        hook.use_snapshot(cx, count, None, listen, None)
    };

    let result = panic::catch_unwind(AssertUnwindSafe(|| root.render(render)));
    assert!(result.is_err());

    root.rerender().unwrap();
    assert_eq!(attempts.get(), 2);
    assert_eq!(root.output(), Some(4));
}

/// Test that a dependency change tears the old source down before creating the new one.
#[test]
fn dependency_change_replaces_source() {
    let events = log();
    let handle: Handle<Rc<Counter>> = Rc::default();
    let root = Root::new(interactive());

    for name in ["A", "A", "B"] {
        let events = events.clone();
        let render_handle = handle.clone();
        root.render(move |cx| {
            let init = {
                let events = events.clone();
                let handle = render_handle.clone();
                move || {
                    push(&events, format!("init {name}"));
                    let counter = Counter::new(0);
                    *handle.borrow_mut() = Some(counter.clone());
                    let events = events.clone();
                    Created::new(counter).with_destroy(move |_| push(&events, format!("destroy {name}")))
                }
            };
            let (hook, _) = subscription::use_source(cx, init, deps![name]);

            let subscribe = {
                let events = events.clone();
                move |counter: &Rc<Counter>, listener| {
                    push(&events, format!("subscribe {name}"));
                    let inner = counter.listen(listener);
                    let events = events.clone();
                    Some(Unsubscribe::new(move || {
                        push(&events, format!("unsubscribe {name}"));
                        if let Some(inner) = inner {
                            inner.unsubscribe();
                        }
                    }))
                }
            };
            hook.use_snapshot(cx, count, None, subscribe, None)
        })
        .unwrap();

        // Only the old source is ever mutated.
        if name == "A" {
            take(&handle).set(9);
        }
    }

    assert_eq!(
        entries(&events),
        vec!["init A", "subscribe A", "unsubscribe A", "destroy A", "init B", "subscribe B"]
    );
    assert_eq!(root.output(), Some(0));
}

/// Test that a change landing between creation and subscription is not lost.
#[test]
fn contract_survives_registration_race() {
    let handle: Handle<Rc<Counter>> = Rc::default();
    let renders: Rc<RefCell<Vec<Option<i32>>>> = Rc::default();
    let root = Root::new(interactive());

    let init = create(&handle, 0);
    let seen = renders.clone();
    root.render(move |cx| {
        let (snapshots, lazy) = contract::use_source(cx, init.clone(), deps![], listen);
        let value = snapshots.use_snapshot(
            cx,
            |counter: Option<&Rc<Counter>>, _| counter.map(|counter| counter.get()),
            None,
        );
        seen.borrow_mut().push(value);

        // Changes the source after it exists but before anything subscribed.
        cx.use_layout_effect(Some(deps![]), move || {
            lazy.get().set(5);
            None
        });
        value
    })
    .unwrap();

    assert_eq!(root.output(), Some(Some(5)));
    assert!(!renders.borrow().contains(&Some(0)));
    assert_eq!(take(&handle).listener_count(), 1);
}

/// Test that every subscription is gone before the source is destroyed.
#[test]
fn unmount_unsubscribes_before_destroy() {
    let events = log();
    let handle: Handle<Rc<Counter>> = Rc::default();
    let root = Root::new(interactive());

    let events_clone = events.clone();
    let handle_clone = handle.clone();
    root.render(move |cx| {
        let init = {
            let events = events_clone.clone();
            let handle = handle_clone.clone();
            move || {
                let counter = Counter::new(0);
                *handle.borrow_mut() = Some(counter.clone());
                let events = events.clone();
                Created::new(counter).with_destroy(move |counter: &Rc<Counter>| {
                    push(&events, format!("destroy with {} listeners", counter.listener_count()));
                })
            }
        };
        let contract = {
            let events = events_clone.clone();
            move |counter: &Rc<Counter>, listener| {
                let inner = counter.listen(listener);
                let events = events.clone();
                Some(Unsubscribe::new(move || {
                    push(&events, "contract detached");
                    if let Some(inner) = inner {
                        inner.unsubscribe();
                    }
                }))
            }
        };
        let (snapshots, _) = contract::use_source(cx, init, deps![], contract);
        let a = snapshots.use_snapshot(cx, count, None);
        let b = snapshots.use_snapshot(cx, count, None);
        (a, b, snapshots.slice().listener_count())
    })
    .unwrap();

    root.rerender().unwrap();
    assert_eq!(root.output().map(|(_, _, listeners)| listeners), Some(2));

    root.unmount();
    assert_eq!(entries(&events), vec!["contract detached", "destroy with 0 listeners"]);
}

/// Test that a source is created once no matter how often the component renders.
#[test]
fn source_is_created_once() {
    let created = Rc::new(Cell::new(0));
    let root = Root::new(strict());

    let counter = created.clone();
    let render = move |cx: &mut Cx| {
        let counter = counter.clone();
        let (hook, _) = subscription::use_source(
            cx,
            move || {
                counter.set(counter.get() + 1);
                Created::new(Counter::new(7))
            },
            deps![],
        );
        hook.use_snapshot(cx, count, None, listen, None)
    };
    root.render(render.clone()).unwrap();
    for _ in 0..5 {
        root.render(render.clone()).unwrap();
    }

    assert_eq!(created.get(), 1);
    assert_eq!(root.output(), Some(7));
}

/// Test that the static environment never creates side-effecting sources.
#[test]
fn static_environment_reads_fallback() {
    let created = Rc::new(Cell::new(false));
    let root = Root::new(RootConfig::default().environment(Environment::Static));

    let flag = created.clone();
    root.render(move |cx| {
        let flag = flag.clone();
        let (hook, _) = subscription::use_source(
            cx,
            move || {
                flag.set(true);
                Created::new(Counter::new(3))
            },
            deps![],
        );
        hook.use_snapshot(cx, count, None, listen, None)
    })
    .unwrap();

    assert_eq!(root.output(), Some(0));
    assert!(!created.get());
}

/// Test that several components can share one externally owned source.
#[test]
fn components_share_a_pure_source() {
    let counter = Counter::new(1);
    let roots: Vec<Root<i32>> = (0..3).map(|_| Root::new(interactive())).collect();

    for (offset, root) in roots.iter().enumerate() {
        let counter = counter.clone();
        root.render(move |cx| {
            let counter = counter.clone();
            let (hook, _) = subscription::use_pure_source(cx, move || counter, deps![]);
            hook.use_snapshot(cx, count, None, listen, None) + offset as i32
        })
        .unwrap();
    }

    counter.set(10);
    let outputs: Vec<Option<i32>> = roots.iter().map(Root::output).collect();
    assert_eq!(outputs, vec![Some(10), Some(11), Some(12)]);

    drop(roots);
    assert_eq!(counter.listener_count(), 0);
}

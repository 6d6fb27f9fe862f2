use std::cell::{Cell, RefCell};
use std::rc::Rc;

use coroutine::{Cid, CoroutineStatus, DEFAULT_STACK_SIZE, Error, MIN_STACK_SIZE, Scheduler};

type Trace = Rc<RefCell<Vec<String>>>;

fn record(trace: &Trace, event: impl Into<String>) {
    trace.borrow_mut().push(event.into());
}

fn events(trace: &Trace) -> Vec<String> {
    trace.borrow().clone()
}

#[test]
fn run_starts_coroutines_in_spawn_order() {
    let scheduler = Scheduler::new();
    let order = Rc::new(RefCell::new(Vec::new()));

    let mut cids = Vec::new();
    for code in 0..3 {
        let order = order.clone();
        let cid = scheduler
            .spawn(move |s| {
                order.borrow_mut().push(s.current());
                code * 10
            })
            .unwrap();
        cids.push(cid);
    }
    assert_eq!(vec![0, 1, 2], cids);
    assert_eq!(3, scheduler.len());
    assert_eq!(3, scheduler.ready_count());

    scheduler.run().unwrap();

    assert_eq!(vec![Some(0), Some(1), Some(2)], *order.borrow());
    assert_eq!(0, scheduler.ready_count());
    assert_eq!(None, scheduler.current());
    for (code, &cid) in cids.iter().enumerate() {
        assert_eq!(Some(CoroutineStatus::Exited), scheduler.status(cid));
        assert_eq!(Some(code as i32 * 10), scheduler.exit_code(cid));
    }
}

#[test]
fn yield_interleaves_in_fifo_order() {
    let scheduler = Scheduler::new();
    let trace = Trace::default();

    for (name, iterations) in [("A", 2), ("B", 3)] {
        let trace = trace.clone();
        scheduler
            .spawn(move |s| {
                for i in 0..iterations {
                    record(&trace, format!("{name}{i}"));
                    s.yield_now().unwrap();
                }
                0
            })
            .unwrap();
    }

    scheduler.run().unwrap();

    assert_eq!(["A0", "B0", "A1", "B1", "B2"].as_slice(), events(&trace));
}

#[test]
fn alternating_resume_until_both_exit() {
    let scheduler = Scheduler::new();
    let trace = Trace::default();

    let worker = |name: &'static str, iterations: usize| {
        let trace = trace.clone();
        move |s: &Scheduler| {
            for i in 0..iterations {
                record(&trace, format!("{name}{i}"));
                s.yield_now().unwrap();
            }
            record(&trace, format!("{name} done"));
            0
        }
    };
    let a = scheduler.spawn(worker("a", 3)).unwrap();
    let b = scheduler.spawn(worker("b", 5)).unwrap();

    for round in 0..10 {
        let expected = |iterations| match round {
            r if r < iterations => Ok(CoroutineStatus::Ready),
            r if r == iterations => Ok(CoroutineStatus::Exited),
            _ => Err(()),
        };
        assert_eq!(
            expected(3).map_err(|_| Error::NotReady(a)),
            scheduler.resume(a)
        );
        assert_eq!(
            expected(5).map_err(|_| Error::NotReady(b)),
            scheduler.resume(b)
        );
    }

    assert_eq!(
        [
            "a0", "b0", "a1", "b1", "a2", "b2", "a done", "b3", "b4", "b done"
        ]
        .as_slice(),
        events(&trace)
    );
    assert_eq!(Some(0), scheduler.reap(a));
    assert_eq!(Some(0), scheduler.reap(b));
    assert!(scheduler.is_empty());
}

#[test]
fn blocked_coroutine_waits_for_wake() {
    let scheduler = Scheduler::new();
    let trace = Trace::default();

    let a = scheduler
        .spawn({
            let trace = trace.clone();
            move |s| {
                record(&trace, "a blocked");
                s.block_current().unwrap();
                record(&trace, "a woken");
                1
            }
        })
        .unwrap();
    scheduler
        .spawn({
            let trace = trace.clone();
            move |s| {
                record(&trace, format!("b sees a {:?}", s.status(a)));
                record(&trace, format!("b wakes a: {}", s.wake(a)));
                2
            }
        })
        .unwrap();

    scheduler.run().unwrap();

    assert_eq!(
        [
            "a blocked",
            "b sees a Some(Blocked)",
            "b wakes a: true",
            "a woken"
        ]
        .as_slice(),
        events(&trace)
    );
    assert_eq!(Some(1), scheduler.exit_code(a));
    assert!(!scheduler.wake(a));
    assert!(!scheduler.wake(99));
}

#[test]
fn resume_runs_blocked_coroutine() {
    let scheduler = Scheduler::new();
    let a = scheduler
        .spawn(|s| {
            s.block_current().unwrap();
            7
        })
        .unwrap();

    scheduler.run().unwrap();
    assert_eq!(Some(CoroutineStatus::Blocked), scheduler.status(a));
    assert_eq!(0, scheduler.ready_count());

    assert_eq!(Ok(CoroutineStatus::Exited), scheduler.resume(a));
    assert_eq!(Some(7), scheduler.exit_code(a));
    assert_eq!(Some(7), scheduler.reap(a));
}

#[test]
fn switch_to_runs_target_directly() {
    let scheduler = Scheduler::new();
    let trace = Trace::default();
    let b_cid = Rc::new(Cell::new(Cid::MAX));

    let a = scheduler
        .spawn({
            let trace = trace.clone();
            let b_cid = b_cid.clone();
            move |s| {
                record(&trace, "a before");
                s.switch_to(b_cid.get()).unwrap();
                record(&trace, "a after");
                0
            }
        })
        .unwrap();
    let b = scheduler
        .spawn({
            let trace = trace.clone();
            move |s| {
                record(&trace, format!("b, a is {:?}", s.status(a)));
                0
            }
        })
        .unwrap();
    b_cid.set(b);

    scheduler.run().unwrap();

    assert_eq!(
        ["a before", "b, a is Some(Ready)", "a after"].as_slice(),
        events(&trace)
    );
    assert_eq!(Some(CoroutineStatus::Exited), scheduler.status(a));
    assert_eq!(Some(CoroutineStatus::Exited), scheduler.status(b));
}

#[test]
fn switch_to_rejects_unavailable_targets() {
    let scheduler = Scheduler::new();
    let results = Rc::new(RefCell::new(Vec::new()));

    let exited = scheduler.spawn(|_| 0).unwrap();
    let blocked = scheduler
        .spawn(|s| {
            s.block_current().unwrap();
            0
        })
        .unwrap();
    scheduler
        .spawn({
            let results = results.clone();
            move |s| {
                let mut results = results.borrow_mut();
                results.push(s.switch_to(exited));
                results.push(s.switch_to(blocked));
                results.push(s.switch_to(99));
                0
            }
        })
        .unwrap();

    scheduler.run().unwrap();

    assert_eq!(
        vec![
            Err(Error::NotReady(exited)),
            Err(Error::NotReady(blocked)),
            Err(Error::NotFound(99)),
        ],
        *results.borrow()
    );
}

#[test]
fn switch_to_self_keeps_running() {
    let scheduler = Scheduler::new();
    let seen = Rc::new(RefCell::new(Vec::new()));

    let a = scheduler
        .spawn({
            let seen = seen.clone();
            move |s| {
                let me = s.current().unwrap();
                let result = s.switch_to(me);
                seen.borrow_mut().push((result, s.current(), s.status(me)));
                3
            }
        })
        .unwrap();

    scheduler.run().unwrap();

    assert_eq!(
        vec![(Ok(()), Some(a), Some(CoroutineStatus::Running))],
        *seen.borrow()
    );
    assert_eq!(Some(3), scheduler.exit_code(a));
}

fn finish(s: &Scheduler, code: i32) -> ! {
    s.exit(code)
}

#[test]
fn exit_from_nested_call() {
    let scheduler = Scheduler::new();
    let trace = Trace::default();

    let a = scheduler
        .spawn({
            let trace = trace.clone();
            move |s| {
                record(&trace, "before exit");
                finish(s, 42);
            }
        })
        .unwrap();

    assert_eq!(Ok(CoroutineStatus::Exited), scheduler.resume(a));
    assert_eq!(["before exit"].as_slice(), events(&trace));
    assert_eq!(Some(42), scheduler.exit_code(a));
    assert_eq!(None, scheduler.stack_range(a));
}

#[test]
fn reap_recycles_cid() {
    let scheduler = Scheduler::new();
    let a = scheduler.spawn(|_| 5).unwrap();
    let blocked = scheduler
        .spawn(|s| {
            s.block_current().unwrap();
            0
        })
        .unwrap();

    scheduler.run().unwrap();

    assert_eq!(None, scheduler.reap(blocked));
    assert_eq!(None, scheduler.reap(99));
    assert_eq!(Some(5), scheduler.reap(a));
    assert_eq!(None, scheduler.reap(a));
    assert_eq!(None, scheduler.status(a));
    assert_eq!(1, scheduler.len());

    let again = scheduler.spawn(|_| 6).unwrap();
    assert_eq!(a, again);
}

#[test]
fn stack_range_covers_requested_size() {
    let scheduler = Scheduler::new();
    let a = scheduler.spawn(|_| 0).unwrap();
    let b = scheduler.spawn_with_stack_size(|_| 0, 8000).unwrap();

    let range = scheduler.stack_range(a).unwrap();
    assert_eq!(DEFAULT_STACK_SIZE, range.len());
    assert_eq!(0, range.start % 16);
    assert_eq!(8000, scheduler.stack_range(b).unwrap().len());
    assert_eq!(None, scheduler.stack_range(99));

    scheduler.run().unwrap();
    assert_eq!(None, scheduler.stack_range(a));
}

#[test]
fn coroutine_operations_rejected_on_driver() {
    let scheduler = Scheduler::new();

    assert_eq!(Err(Error::NotInCoroutine), scheduler.yield_now());
    assert_eq!(Err(Error::NotInCoroutine), scheduler.block_current());
    assert_eq!(Err(Error::NotInCoroutine), scheduler.switch_to(0));
    assert_eq!(Err(Error::NotFound(99)), scheduler.resume(99));

    let a = scheduler.spawn(|_| 0).unwrap();
    assert_eq!(Err(Error::NotInCoroutine), scheduler.switch_to(a));
    assert_eq!(Ok(CoroutineStatus::Exited), scheduler.resume(a));
    assert_eq!(Err(Error::NotReady(a)), scheduler.resume(a));

    assert_eq!("coroutine 99 not found", Error::NotFound(99).to_string());
    assert_eq!("coroutine 0 is not ready", Error::NotReady(a).to_string());
}

#[test]
fn driver_operations_rejected_inside_coroutine() {
    let scheduler = Scheduler::new();
    let results = Rc::new(RefCell::new(Vec::new()));
    let other = Rc::new(Cell::new(Cid::MAX));

    scheduler
        .spawn({
            let results = results.clone();
            let other = other.clone();
            move |s| {
                let run = s.run().err();
                let resume = s.resume(other.get()).err();
                results.borrow_mut().extend([run, resume]);
                0
            }
        })
        .unwrap();
    let b = scheduler.spawn(|_| 1).unwrap();
    other.set(b);

    scheduler.run().unwrap();

    assert_eq!(
        vec![Some(Error::InCoroutine), Some(Error::InCoroutine)],
        *results.borrow()
    );
    assert_eq!(Some(1), scheduler.exit_code(b));
}

#[test]
#[should_panic(expected = "exit must be called from a coroutine")]
fn exit_outside_coroutine_panics() {
    let scheduler = Scheduler::new();
    scheduler.exit(0);
}

#[test]
fn stack_size_is_validated() {
    let scheduler = Scheduler::new();

    assert_eq!(
        Err(Error::StackTooSmall(MIN_STACK_SIZE - 1)),
        scheduler.spawn_with_stack_size(|_| 0, MIN_STACK_SIZE - 1)
    );
    assert_eq!(
        Err(Error::StackTooLarge(usize::MAX)),
        scheduler.spawn_with_stack_size(|_| 0, usize::MAX)
    );
    assert!(scheduler.is_empty());
}

#[test]
fn smallest_stack_yields_and_exits() {
    let scheduler = Scheduler::new();
    let a = scheduler
        .spawn_with_stack_size(
            |s| {
                s.yield_now().unwrap();
                s.exit(5)
            },
            MIN_STACK_SIZE,
        )
        .unwrap();
    assert_eq!(MIN_STACK_SIZE, scheduler.stack_range(a).unwrap().len());

    assert_eq!(Ok(CoroutineStatus::Ready), scheduler.resume(a));
    assert_eq!(Ok(CoroutineStatus::Exited), scheduler.resume(a));
    assert_eq!(Some(5), scheduler.reap(a));
}

fn sum_with_yields(s: &Scheduler, n: i32) -> i32 {
    if n == 0 {
        return 0;
    }
    s.yield_now().unwrap();
    n + sum_with_yields(s, n - 1)
}

#[test]
fn many_coroutines_keep_their_own_stacks() {
    const COUNT: i32 = 32;
    let scheduler = Scheduler::new();

    let cids: Vec<Cid> = (1..=COUNT)
        .map(|n| scheduler.spawn(move |s| sum_with_yields(s, n)).unwrap())
        .collect();

    scheduler.run().unwrap();

    for (n, cid) in (1..=COUNT).zip(cids) {
        assert_eq!(Some(n * (n + 1) / 2), scheduler.reap(cid));
    }
    assert!(scheduler.is_empty());
}

#[test]
fn nested_scheduler_inside_coroutine() {
    let outer = Scheduler::new();
    let trace = Trace::default();

    outer
        .spawn({
            let trace = trace.clone();
            move |s| {
                let inner = Scheduler::new();
                for name in ["x", "y"] {
                    let trace = trace.clone();
                    inner
                        .spawn(move |s| {
                            record(&trace, format!("{name}0"));
                            s.yield_now().unwrap();
                            record(&trace, format!("{name}1"));
                            1
                        })
                        .unwrap();
                }
                s.yield_now().unwrap();
                inner.run().unwrap();
                (0..2).filter_map(|cid| inner.reap(cid)).sum()
            }
        })
        .unwrap();
    outer
        .spawn({
            let trace = trace.clone();
            move |_| {
                record(&trace, "outer");
                0
            }
        })
        .unwrap();

    outer.run().unwrap();

    assert_eq!(["outer", "x0", "y0", "x1", "y1"].as_slice(), events(&trace));
    assert_eq!(Some(2), outer.exit_code(0));
}

#[cfg(debug_assertions)]
#[test]
#[should_panic(expected = "stack overflow")]
fn corrupted_canary_is_detected() {
    let scheduler = Scheduler::new();
    let a = scheduler
        .spawn(|s| {
            s.yield_now().unwrap();
            0
        })
        .unwrap();
    assert_eq!(Ok(CoroutineStatus::Ready), scheduler.resume(a));

    let bottom = scheduler.stack_range(a).unwrap().start;
    unsafe {
        (bottom as *mut u64).write_volatile(0);
    }

    let _ = scheduler.resume(a);
}

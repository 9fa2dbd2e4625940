#![cfg(not(loom))]

use super::*;
use crate::test_util::trace_init;
use std::{
    sync::{
        atomic::{AtomicBool, Ordering},
        mpsc, Arc,
    },
    thread,
    time::Duration,
};

/// A stack size that no platform can actually provide, for forcing
/// thread creation to fail.
#[cfg(target_pointer_width = "64")]
const IMPOSSIBLE_STACK: usize = 1 << 60;

struct Double;

impl TaskFn for Double {
    type Args = u64;
    type Output = u64;

    fn run(io: Io<u64, u64>) -> Completed {
        let n = *io.args();
        io.complete(n * 2)
    }
}

#[test]
fn spawn_and_join() {
    let _trace = trace_init();
    let mut handle = spawn::<Double>(21);
    assert!(handle.spawn_status().is_ok());
    assert_eq!(handle.join(), Ok(&42));
    assert!(handle.is_complete());
    assert_eq!(handle.try_output(), Some(&42));
}

#[test]
fn builder_spawn() {
    let _trace = trace_init();
    let mut handle = Builder::new()
        .name("doubler")
        .kind("test")
        .spawn::<Double>(4);
    assert_eq!(handle.join(), Ok(&8));
}

#[test]
fn named_thread() {
    let _trace = trace_init();
    let mut handle = Builder::new().name("hello-thread").spawn_fn((), |io| {
        let name = thread::current().name().map(String::from);
        io.complete(name)
    });
    assert_eq!(handle.join(), Ok(&Some(String::from("hello-thread"))));
}

#[test]
fn not_complete_until_completed() {
    let _trace = trace_init();
    let (tx, rx) = mpsc::channel::<()>();
    let mut handle = spawn_fn(rx, |io| {
        let _ = io.args().recv();
        io.complete("done")
    });

    assert!(!handle.is_complete());
    assert_eq!(handle.try_output(), None);
    assert!(!handle.is_joined());

    tx.send(()).unwrap();

    // polling never blocks; spin until the task has published.
    while !test_dbg!(handle.is_complete()) {
        thread::yield_now();
    }
    assert_eq!(handle.try_output(), Some(&"done"));

    assert_eq!(handle.join(), Ok(&"done"));
    assert!(handle.is_joined());
}

#[test]
fn join_returns_the_same_result() {
    let _trace = trace_init();
    let mut handle = spawn_fn(vec![1u32, 2, 3], |io| {
        let sum = io.args().iter().sum::<u32>();
        io.complete(sum)
    });

    let first = handle.join().copied().map_err(Clone::clone);
    for _ in 0..16 {
        assert_eq!(handle.join().copied().map_err(Clone::clone), first.clone());
    }
    assert_eq!(first, Ok(6));
}

#[test]
fn into_output_moves_value() {
    let _trace = trace_init();
    let handle = spawn_fn(3usize, |io| {
        let s = "ha".repeat(*io.args());
        io.complete(s)
    });
    assert_eq!(handle.into_output(), Ok(String::from("hahaha")));
}

#[test]
fn into_output_after_join() {
    let _trace = trace_init();
    let mut handle = spawn::<Double>(50);
    assert_eq!(handle.join(), Ok(&100));
    assert_eq!(handle.into_output(), Ok(100));
}

#[test]
fn split_takes_args() {
    let _trace = trace_init();
    let mut handle = spawn_fn(vec![String::from("a"), String::from("b")], |io| {
        let (args, completer) = io.split();
        assert_eq!(completer.mode(), Mode::Attached);
        completer.complete(args.concat())
    });
    assert_eq!(handle.join().map(String::as_str), Ok("ab"));
}

#[test]
fn io_reports_id_and_mode() {
    let _trace = trace_init();
    let mut handle = spawn_fn((), |io| {
        let id = io.id();
        let mode = io.mode();
        io.complete((id, mode))
    });
    let id = handle.id();
    assert_eq!(handle.join(), Ok(&(id, Mode::Attached)));

    let (tx, rx) = mpsc::channel();
    let detached_id = spawn_detached_fn(tx, |io| {
        let _ = io.args().send((io.id(), io.mode()));
        io.complete(())
    })
    .unwrap();
    assert_eq!(rx.recv(), Ok((detached_id, Mode::Detached)));
}

#[test]
fn completed_token_carries_id() {
    let _trace = trace_init();
    let mut handle = spawn_fn((), |io| {
        let id = io.id();
        let completed = io.complete(());
        assert_eq!(completed.id(), id);
        completed
    });
    // the assertion inside the task would surface as a panic here.
    assert_eq!(handle.join(), Ok(&()));
}

#[test]
fn panicking_task() {
    let _trace = trace_init();
    let mut handle = spawn_fn((), |_io: Io<(), u32>| panic!("oh no"));

    let id = handle.id();
    let expected = JoinError::Panicked {
        id,
        completed: false,
        message: String::from("oh no"),
    };
    assert_eq!(handle.join(), Err(&expected));
    assert_eq!(handle.join(), Err(&expected));
    assert!(!handle.is_complete());
    assert_eq!(handle.into_output(), Err(expected));
}

#[test]
fn panic_after_completing() {
    struct PanicOnDrop;
    impl Drop for PanicOnDrop {
        fn drop(&mut self) {
            panic!("dropped");
        }
    }

    let _trace = trace_init();
    let mut handle = spawn_fn((), |io| {
        let _guard = PanicOnDrop;
        io.complete(5u8)
    });

    let error = handle.join().unwrap_err().clone();
    assert!(error.is_panic());
    assert!(error.is_completed(), "{error:?}");
    // the output was published before the panic, so it's still readable.
    assert_eq!(handle.try_output(), Some(&5));
}

#[test]
fn self_join_is_refused() {
    let _trace = trace_init();
    let (handle_tx, handle_rx) = mpsc::channel::<Handle<()>>();
    let (error_tx, error_rx) = mpsc::channel();

    let handle = spawn_fn((handle_rx, error_tx), |io| {
        let (handles, errors) = io.args();
        if let Ok(mut me) = handles.recv() {
            let _ = errors.send(me.join().map(|_| ()).map_err(Clone::clone));
        }
        io.complete(())
    });
    let id = handle.id();
    handle_tx.send(handle).unwrap();

    assert_eq!(error_rx.recv(), Ok(Err(JoinError::Deadlock { id })));
}

#[test]
fn dropping_an_unjoined_handle_detaches() {
    let _trace = trace_init();
    let (go_tx, go_rx) = mpsc::channel::<()>();
    let (done_tx, done_rx) = mpsc::channel();

    let handle = spawn_fn((go_rx, done_tx), |io| {
        let (go, done) = io.args();
        let _ = go.recv();
        let _ = done.send("still ran");
        io.complete(())
    });
    // dropping the handle must not block on the task.
    drop(handle);

    go_tx.send(()).unwrap();
    assert_eq!(done_rx.recv(), Ok("still ran"));
}

#[test]
fn detached_task_signals_flag() {
    let _trace = trace_init();
    let flag = Arc::new(AtomicBool::new(false));
    let (tx, rx) = mpsc::channel::<()>();

    let id = spawn_detached_fn((flag.clone(), rx), |io| {
        let (flag, go) = io.args();
        let _ = go.recv();
        flag.store(true, Ordering::Release);
        io.complete(())
    });
    assert!(id.is_ok(), "{id:?}");

    // the task can't have set the flag yet; it's waiting for us.
    assert!(!flag.load(Ordering::Acquire));
    tx.send(()).unwrap();

    while !flag.load(Ordering::Acquire) {
        thread::sleep(Duration::from_millis(1));
    }
}

#[test]
fn detached_task_drops_its_descriptor() {
    let _trace = trace_init();
    let (tx, rx) = mpsc::channel::<()>();
    spawn_detached_fn(tx, |io| io.complete(String::from("nobody reads this"))).unwrap();

    // `recv` returns an error only once the task has dropped the sender it
    // was given as its argument.
    assert!(rx.recv().is_err());
}

#[test]
fn detached_task_fn() {
    struct Notify;

    impl TaskFn for Notify {
        type Args = mpsc::Sender<&'static str>;
        type Output = ();

        fn run(io: Io<Self::Args, ()>) -> Completed {
            let _ = io.args().send("notified");
            io.complete(())
        }
    }

    let _trace = trace_init();
    let (tx, rx) = mpsc::channel();
    let id = spawn_detached::<Notify>(tx);
    assert!(id.is_ok());
    assert_eq!(rx.recv(), Ok("notified"));
}

#[test]
#[cfg(target_pointer_width = "64")]
fn spawn_failure() {
    let _trace = trace_init();
    let (tx, rx) = mpsc::channel::<()>();
    let mut handle = Builder::new()
        .stack_size(IMPOSSIBLE_STACK)
        .spawn_fn(tx, |io| io.complete(1u8));

    let id = handle.id();
    let error = handle.spawn_status().unwrap_err();
    assert_eq!(error.id(), id);
    assert!(error.raw_os_error().is_some(), "{error:?}");
    tracing::info!(%error, kind = ?error.kind(), code = ?error.raw_os_error());

    // the arguments were dropped along with the thread that never started.
    assert_eq!(rx.try_recv(), Err(mpsc::TryRecvError::Disconnected));

    // joining doesn't block, and the result is cached like any other.
    assert_eq!(handle.join(), Err(&JoinError::NotSpawned { id }));
    assert_eq!(handle.join(), Err(&JoinError::NotSpawned { id }));
    assert!(handle.is_joined());
    assert!(!handle.is_complete());
    assert_eq!(handle.try_output(), None);
}

#[test]
#[cfg(target_pointer_width = "64")]
fn detached_spawn_failure() {
    let _trace = trace_init();
    let (tx, rx) = mpsc::channel::<()>();
    let error = Builder::new()
        .stack_size(IMPOSSIBLE_STACK)
        .spawn_detached_fn(tx, |io| io.complete(()))
        .unwrap_err();
    tracing::info!(%error);

    assert_eq!(rx.try_recv(), Err(mpsc::TryRecvError::Disconnected));
    let io_error = error.into_io_error();
    assert!(io_error.raw_os_error().is_some(), "{io_error:?}");
}

#[test]
fn many_independent_tasks() {
    let _trace = trace_init();
    let mut handles = (0..32u64).map(spawn::<Double>).collect::<Vec<_>>();
    for (i, handle) in handles.iter_mut().enumerate().rev() {
        assert_eq!(handle.join(), Ok(&(i as u64 * 2)));
    }
}

mod prop {
    use super::*;
    use proptest::prelude::*;

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(64))]

        #[test]
        fn join_is_idempotent(value: u64, joins in 1usize..16) {
            let mut handle = spawn_fn(value, |io| {
                let value = *io.args();
                io.complete(value)
            });

            let first = handle.join().copied().map_err(Clone::clone);
            prop_assert_eq!(&first, &Ok(value));
            for _ in 1..joins {
                prop_assert_eq!(handle.join().copied().map_err(Clone::clone), first.clone());
            }
        }
    }
}

//! End-to-end scheduling behaviour against a live timer thread.

use std::sync::{mpsc, Arc};
use std::thread;
use std::time::{Duration, Instant};

use frugal_deadline::time::MonotonicClock;
use frugal_deadline::{
    checkpoint, sleep, ContextHandle, DeadlineExceeded, RequestScheduler, RequestState, SignalKind,
};

mod common;

fn ms(n: u64) -> Duration {
    Duration::from_millis(n)
}

fn collect(rx: &mpsc::Receiver<common::Finished>, n: usize) -> Vec<common::Finished> {
    (0..n)
        .map(|_| rx.recv_timeout(Duration::from_secs(10)).expect("call should finish"))
        .collect()
}

#[test]
fn test_two_threads_fire_in_deadline_order() {
    let engine = common::leaked_engine();
    let (tx, rx) = mpsc::channel();

    common::spawn_blocked_call(engine, ms(400), tx.clone());
    common::spawn_blocked_call(engine, ms(100), tx);

    let done = collect(&rx, 2);
    assert_eq!(done[0].delay, ms(100));
    assert_eq!(done[1].delay, ms(400));
    for f in &done {
        assert!(f.expired);
        assert!(f.elapsed >= f.delay);
    }
}

#[test]
fn test_lowering_timeouts() {
    let engine = common::leaked_engine();
    let (tx, rx) = mpsc::channel();
    for n in (1..=5).rev() {
        common::spawn_blocked_call(engine, ms(n * 100), tx.clone());
    }

    let order: Vec<_> = collect(&rx, 5).into_iter().map(|f| f.delay).collect();
    assert_eq!(order, (1..=5).map(|n| ms(n * 100)).collect::<Vec<_>>());
}

#[test]
fn test_growing_timeouts() {
    let engine = common::leaked_engine();
    let (tx, rx) = mpsc::channel();
    for n in 1..=5 {
        common::spawn_blocked_call(engine, ms(n * 100), tx.clone());
    }

    let order: Vec<_> = collect(&rx, 5).into_iter().map(|f| f.delay).collect();
    assert_eq!(order, (1..=5).map(|n| ms(n * 100)).collect::<Vec<_>>());
}

#[test]
fn test_nearer_deadline_registered_while_timer_sleeps() {
    let engine = common::leaked_engine();
    let (tx, rx) = mpsc::channel();

    common::spawn_blocked_call(engine, ms(800), tx.clone());
    thread::sleep(ms(100));
    common::spawn_blocked_call(engine, ms(200), tx);

    let done = collect(&rx, 2);
    assert_eq!(done[0].delay, ms(200));
    assert!(done[0].elapsed < ms(700), "nearer deadline waited for the farther one");
    assert_eq!(done[1].delay, ms(800));
}

#[test]
fn test_far_arm_survives_immediate_request() {
    let engine = common::start_engine();
    let far_ctx = ContextHandle::detached();
    let near_ctx = ContextHandle::detached();

    let far = engine
        .scheduler()
        .enqueue_for(far_ctx.clone(), Duration::from_secs(10), SignalKind::Timeout);
    let start = Instant::now();
    let near = engine
        .scheduler()
        .enqueue_for(near_ctx.clone(), Duration::ZERO, SignalKind::Timeout);

    assert!(common::wait_until(Duration::from_secs(2), || near.enforced()));
    assert!(start.elapsed() < Duration::from_secs(2));
    assert_eq!(near_ctx.signals_delivered(), 1);

    // After firing, the timer is armed for the far deadline again.
    assert!(common::wait_until(Duration::from_secs(2), || {
        engine.timer().armed() == Some(far.deadline())
    }));
    assert_eq!(far.state(), RequestState::Pending);
    assert_eq!(far_ctx.signals_delivered(), 0);
    engine.shutdown();
}

#[test]
fn test_many_expired_requests_on_one_context_signal_once() {
    let scheduler = RequestScheduler::new(Arc::new(MonotonicClock), Arc::new(()));
    let ctx = ContextHandle::detached();
    let past = Instant::now() - Duration::from_secs(1);

    for _ in 0..5 {
        scheduler.enqueue_at(ctx.clone(), past, SignalKind::Timeout);
    }
    scheduler.process_expired();

    assert_eq!(ctx.signals_delivered(), 1);
    assert_eq!(scheduler.size(), 0);
}

#[test]
fn test_defuse_race_has_single_outcome() {
    let engine = common::start_engine();

    for i in 0..200u32 {
        let ctx = ContextHandle::detached();
        let request = engine.scheduler().enqueue_for(ctx.clone(), ms(1), SignalKind::Timeout);
        thread::sleep(Duration::from_micros(500 + u64::from(i % 5) * 250));
        request.defuse();

        thread::sleep(ms(3));
        match request.state() {
            RequestState::Defused => assert_eq!(ctx.signals_delivered(), 0),
            RequestState::Enforced => assert_eq!(ctx.signals_delivered(), 1),
            RequestState::Pending => panic!("defuse left the request pending"),
        }
    }
    engine.shutdown();
}

#[test]
fn test_many_concurrent_timeouts() {
    let engine = common::leaked_engine();
    let (tx, rx) = mpsc::channel();

    for _ in 0..50 {
        let tx = tx.clone();
        thread::spawn(move || {
            for _ in 0..3 {
                let start = Instant::now();
                let res: Result<(), DeadlineExceeded> =
                    engine.timeout(ms(100), |_| sleep(Duration::from_secs(3600)));
                let _ = tx.send((res.is_err(), start.elapsed()));
            }
        });
    }

    for _ in 0..150 {
        let (expired, elapsed) = rx.recv_timeout(Duration::from_secs(20)).unwrap();
        assert!(expired);
        assert!(elapsed >= ms(100));
        assert!(elapsed < Duration::from_secs(5));
    }
    assert!(common::wait_until(Duration::from_secs(2), || engine.pending() == 0));
}

#[test]
fn test_zero_delay_fires_without_waiting() {
    let engine = common::start_engine();
    let start = Instant::now();
    let res: Result<(), DeadlineExceeded> =
        engine.timeout(Duration::ZERO, |_| sleep(Duration::from_secs(3600)));

    assert_eq!(res, Err(DeadlineExceeded { kind: SignalKind::Timeout }));
    assert!(start.elapsed() < Duration::from_secs(2));
    engine.shutdown();
}

#[test]
fn test_finished_call_is_never_signalled_later() {
    let engine = common::start_engine();
    let before = ContextHandle::current().signals_delivered();
    let res: Result<u32, DeadlineExceeded> = engine.timeout(ms(100), |_| Ok(20));
    assert_eq!(res, Ok(20));

    thread::sleep(ms(300));
    assert!(checkpoint().is_ok());
    assert_eq!(ContextHandle::current().signals_delivered(), before);
    engine.shutdown();
}

#[test]
fn test_error_inside_guarded_call_passes_through() {
    #[derive(Debug, PartialEq)]
    enum AppError {
        Boom,
        Expired,
    }
    impl From<DeadlineExceeded> for AppError {
        fn from(_: DeadlineExceeded) -> Self {
            AppError::Expired
        }
    }

    let engine = common::start_engine();
    let res: Result<(), AppError> = engine.timeout(ms(100), |_| Err(AppError::Boom));
    assert_eq!(res, Err(AppError::Boom));

    let res: Result<(), AppError> = engine.timeout(ms(20), |_| {
        sleep(Duration::from_secs(3600))?;
        Ok(())
    });
    assert_eq!(res, Err(AppError::Expired));
    engine.shutdown();
}

#[test]
fn test_nested_timeouts_signal_thread_once() {
    let engine = common::start_engine();
    let before = ContextHandle::current().signals_delivered();

    let res: Result<(), DeadlineExceeded> = engine.timeout(ms(50), |_| {
        engine.timeout(ms(60), |_| {
            engine.timeout(ms(70), |_| sleep(Duration::from_secs(3600)))
        })
    });

    assert!(res.is_err());
    assert!(common::wait_until(Duration::from_secs(2), || engine.pending() == 0));
    assert_eq!(ContextHandle::current().signals_delivered(), before + 1);
    assert!(ContextHandle::current().pending_signal().is_none());
    engine.shutdown();
}

#[test]
fn test_inner_deadline_fires_first_outer_keeps_running() {
    let engine = common::start_engine();

    let res: Result<&str, DeadlineExceeded> = engine.timeout(Duration::from_secs(10), |_| {
        let inner: Result<(), DeadlineExceeded> =
            engine.timeout(ms(30), |_| sleep(Duration::from_secs(3600)));
        assert!(inner.is_err());
        checkpoint()?;
        Ok("outer finished")
    });

    assert_eq!(res, Ok("outer finished"));
    engine.shutdown();
}

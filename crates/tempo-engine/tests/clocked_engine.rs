//! Integration tests for the clocked (timer-driven) engine.
//!
//! Timing assertions use generous deadlines and polling rather than
//! exact sleeps, to stay stable on slow CI runners.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use serde_json::json;
use tempo_core::{handler_fn, EngineOp, Lifecycle, LifecycleError};
use tempo_engine::{
    ClockedEngine, ConfigError, EngineConfig, EngineError, MiddlewareSet, TICK_INTERVAL_KEY,
};
use tempo_test_utils::{shared_log, CountingHandler, EchoHandler, FailingHandler, RecordingHandler};

fn counting_config(interval_ms: u64, count: &Arc<AtomicUsize>) -> EngineConfig {
    EngineConfig {
        tick_interval: Some(interval_ms),
        middlewares: MiddlewareSet {
            tick: vec![Arc::new(CountingHandler::new(count))],
            ..MiddlewareSet::default()
        },
        ..EngineConfig::default()
    }
}

/// Poll until `count` reaches `target` or the deadline passes.
fn wait_for_count(count: &Arc<AtomicUsize>, target: usize, deadline: Duration) {
    let end = Instant::now() + deadline;
    while count.load(Ordering::SeqCst) < target {
        if Instant::now() > end {
            panic!(
                "count stuck at {} (wanted {target})",
                count.load(Ordering::SeqCst)
            );
        }
        std::thread::sleep(Duration::from_millis(5));
    }
}

#[test]
fn start_runs_start_chain_then_ticks() {
    let log = shared_log();
    let count = Arc::new(AtomicUsize::new(0));
    let config = EngineConfig {
        tick_interval: Some(0),
        middlewares: MiddlewareSet {
            start: vec![Arc::new(RecordingHandler::new("start", &log))],
            tick: vec![Arc::new(CountingHandler::new(&count))],
            ..MiddlewareSet::default()
        },
        ..EngineConfig::default()
    };
    let mut engine = ClockedEngine::new(config).unwrap();

    engine.start().unwrap();
    assert_eq!(*log.lock().unwrap(), vec!["start".to_string()]);
    assert_eq!(count.load(Ordering::SeqCst), 1, "one immediate tick");
    assert_eq!(engine.lifecycle(), Lifecycle::Running);
}

#[test]
fn timer_fires_ticks_at_interval() {
    let count = Arc::new(AtomicUsize::new(0));
    let mut engine = ClockedEngine::new(counting_config(10, &count)).unwrap();

    engine.start().unwrap();
    wait_for_count(&count, 5, Duration::from_secs(2));
    engine.stop().unwrap();
}

#[test]
fn zero_interval_means_manual_ticks_only() {
    let count = Arc::new(AtomicUsize::new(0));
    let mut engine = ClockedEngine::new(counting_config(0, &count)).unwrap();

    engine.start().unwrap();
    assert_eq!(count.load(Ordering::SeqCst), 1);

    std::thread::sleep(Duration::from_millis(60));
    assert_eq!(count.load(Ordering::SeqCst), 1, "no automatic ticks");

    engine.input(json!("poke")).unwrap();
    assert_eq!(count.load(Ordering::SeqCst), 2, "input performs one tick");
}

#[test]
fn pending_settings_change_the_cadence() {
    let count = Arc::new(AtomicUsize::new(0));
    let mut config = counting_config(60_000, &count);
    config.middlewares.input = vec![handler_fn(|ctx, chain| {
        ctx.pending_settings
            .insert(TICK_INTERVAL_KEY.to_string(), json!(10));
        chain.handle(ctx)
    })];
    let mut engine = ClockedEngine::new(config).unwrap();

    engine.start().unwrap();
    assert_eq!(count.load(Ordering::SeqCst), 1);

    // The input's own tick drains the request; afterwards the timer must
    // run at 10ms — at the old 60s cadence the target is unreachable.
    engine.input(json!("faster")).unwrap();
    wait_for_count(&count, 8, Duration::from_secs(2));
    engine.stop().unwrap();
}

#[test]
fn input_echo_sets_state_and_clears_input() {
    let config = EngineConfig {
        tick_interval: Some(0),
        middlewares: MiddlewareSet {
            input: vec![Arc::new(EchoHandler::new("echo"))],
            ..MiddlewareSet::default()
        },
        ..EngineConfig::default()
    };
    let mut engine = ClockedEngine::new(config).unwrap();

    engine.start().unwrap();
    engine.input(json!("ping")).unwrap();

    let ctx = engine.snapshot().unwrap();
    assert_eq!(ctx.state_data.get("echo"), Some(&json!("ping")));
    assert!(ctx.last_input.is_none(), "input cleared after the operation");
    assert!(ctx.pending_settings.is_empty());
}

#[test]
fn double_start_fails_with_lifecycle_error() {
    let mut engine = ClockedEngine::new(EngineConfig {
        tick_interval: Some(0),
        ..EngineConfig::default()
    })
    .unwrap();

    engine.start().unwrap();
    assert_eq!(
        engine.start(),
        Err(EngineError::Lifecycle(LifecycleError {
            op: EngineOp::Start,
            current: Lifecycle::Running,
        }))
    );
}

#[test]
fn pause_keeps_the_timer_ticking() {
    let count = Arc::new(AtomicUsize::new(0));
    let mut engine = ClockedEngine::new(counting_config(10, &count)).unwrap();

    engine.start().unwrap();
    engine.pause().unwrap();
    assert_eq!(engine.lifecycle(), Lifecycle::Paused);

    let at_pause = count.load(Ordering::SeqCst);
    wait_for_count(&count, at_pause + 3, Duration::from_secs(2));

    engine.resume().unwrap();
    assert_eq!(engine.lifecycle(), Lifecycle::Running);
    engine.stop().unwrap();
}

#[test]
fn stop_is_terminal_and_later_calls_fail_locally() {
    let count = Arc::new(AtomicUsize::new(0));
    let mut engine = ClockedEngine::new(counting_config(10, &count)).unwrap();

    engine.start().unwrap();
    engine.stop().unwrap();
    assert_eq!(engine.lifecycle(), Lifecycle::Stopped);

    let frozen = count.load(Ordering::SeqCst);
    std::thread::sleep(Duration::from_millis(50));
    assert_eq!(count.load(Ordering::SeqCst), frozen, "no ticks after stop");

    assert_eq!(
        engine.pause(),
        Err(EngineError::Lifecycle(LifecycleError {
            op: EngineOp::Pause,
            current: Lifecycle::Stopped,
        }))
    );
    assert_eq!(
        engine.input(json!("late")),
        Err(EngineError::Lifecycle(LifecycleError {
            op: EngineOp::Input,
            current: Lifecycle::Stopped,
        }))
    );
    assert_eq!(
        engine.stop(),
        Err(EngineError::Lifecycle(LifecycleError {
            op: EngineOp::Stop,
            current: Lifecycle::Stopped,
        }))
    );
}

#[test]
fn handler_can_stop_the_engine_through_the_context() {
    let config = EngineConfig {
        tick_interval: Some(0),
        middlewares: MiddlewareSet {
            input: vec![handler_fn(|ctx, chain| {
                ctx.request_stop();
                chain.handle(ctx)
            })],
            ..MiddlewareSet::default()
        },
        ..EngineConfig::default()
    };
    let mut engine = ClockedEngine::new(config).unwrap();

    engine.start().unwrap();
    engine.input(json!("quit")).unwrap();
    assert_eq!(engine.lifecycle(), Lifecycle::Stopped);

    // The engine is stopped; the state machine rejects another stop.
    assert!(matches!(
        engine.stop(),
        Err(EngineError::Lifecycle(LifecycleError {
            op: EngineOp::Stop,
            current: Lifecycle::Stopped,
        }))
    ));
}

#[test]
fn failing_input_handler_rejects_the_operation() {
    let config = EngineConfig {
        tick_interval: Some(0),
        middlewares: MiddlewareSet {
            input: vec![Arc::new(FailingHandler::new("bad payload"))],
            ..MiddlewareSet::default()
        },
        ..EngineConfig::default()
    };
    let mut engine = ClockedEngine::new(config).unwrap();

    engine.start().unwrap();
    let err = engine.input(json!("x")).unwrap_err();
    assert!(matches!(err, EngineError::Handler(_)));
    // The engine survives the failure.
    assert_eq!(engine.lifecycle(), Lifecycle::Running);
}

#[test]
fn into_core_recovers_the_context_after_stop() {
    let config = EngineConfig {
        tick_interval: Some(0),
        middlewares: MiddlewareSet {
            input: vec![Arc::new(EchoHandler::new("echo"))],
            ..MiddlewareSet::default()
        },
        ..EngineConfig::default()
    };
    let mut engine = ClockedEngine::new(config).unwrap();

    engine.start().unwrap();
    engine.input(json!("kept")).unwrap();
    engine.stop().unwrap();

    let core = engine.into_core().expect("core recovered after stop");
    assert_eq!(core.lifecycle(), Lifecycle::Stopped);
    assert_eq!(core.context().state_data.get("echo"), Some(&json!("kept")));
}

#[test]
fn gated_config_is_rejected() {
    let config = EngineConfig {
        gate: Some(tempo_engine::gate_fn(|| true)),
        ..EngineConfig::default()
    };
    assert!(matches!(
        ClockedEngine::new(config),
        Err(ConfigError::GateInClockedMode)
    ));
}

#[test]
fn zero_request_queue_is_rejected() {
    let config = EngineConfig {
        request_queue_capacity: 0,
        ..EngineConfig::default()
    };
    assert!(matches!(
        ClockedEngine::new(config),
        Err(ConfigError::RequestQueueZero)
    ));
}

#[test]
fn drop_shuts_the_loop_thread_down() {
    let count = Arc::new(AtomicUsize::new(0));
    let mut engine = ClockedEngine::new(counting_config(10, &count)).unwrap();
    engine.start().unwrap();
    std::thread::sleep(Duration::from_millis(30));
    drop(engine);
    // If this test returns, the loop thread exited.
}

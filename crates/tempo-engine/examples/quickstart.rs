//! Tempo quickstart — a clocked engine whose cadence is adjusted by
//! input middlewares at runtime.
//!
//! Demonstrates:
//!   1. Building an `EngineConfig` with start/input/tick middlewares
//!   2. Starting the timer-driven loop
//!   3. Changing the tick interval from an input handler via
//!      `pending_settings` (the only interval-mutation channel)
//!   4. Stopping the engine from inside a handler
//!
//! Run with:
//!   cargo run --example quickstart

use std::thread;
use std::time::Duration;

use serde_json::json;
use tempo_core::handler_fn;
use tempo_engine::{ClockedEngine, EngineConfig, MiddlewareSet, TICK_INTERVAL_KEY};

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let config = EngineConfig {
        tick_interval: Some(200),
        middlewares: MiddlewareSet {
            start: vec![handler_fn(|_ctx, _chain| {
                println!("engine launched");
                Ok(())
            })],
            input: vec![handler_fn(|ctx, chain| {
                let key = ctx
                    .last_input
                    .as_ref()
                    .and_then(|input| input.get("key"))
                    .and_then(|key| key.as_str())
                    .unwrap_or_default()
                    .to_string();
                match key.as_str() {
                    "+" => {
                        println!("speeding up to 50ms ticks");
                        ctx.pending_settings
                            .insert(TICK_INTERVAL_KEY.to_string(), json!(50));
                    }
                    "-" => {
                        println!("slowing down to 400ms ticks");
                        ctx.pending_settings
                            .insert(TICK_INTERVAL_KEY.to_string(), json!(400));
                    }
                    "q" => {
                        println!("stop requested");
                        ctx.request_stop();
                    }
                    other => println!("ignoring input {other:?}"),
                }
                chain.handle(ctx)
            })],
            tick: vec![handler_fn(|ctx, chain| {
                println!("tick ({})", ctx.lifecycle());
                chain.handle(ctx)
            })],
        },
        ..EngineConfig::default()
    };

    let mut engine = ClockedEngine::new(config).expect("valid clocked config");
    engine.start().expect("fresh engine starts");

    thread::sleep(Duration::from_millis(600));
    engine.input(json!({ "key": "+" })).expect("input accepted");

    thread::sleep(Duration::from_millis(300));
    engine.input(json!({ "key": "-" })).expect("input accepted");

    thread::sleep(Duration::from_millis(900));
    engine.input(json!({ "key": "q" })).expect("input accepted");

    println!("engine is {}", engine.lifecycle());
}

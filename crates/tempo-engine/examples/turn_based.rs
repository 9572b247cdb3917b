//! A turn-based loop: the gated engine renders only after something
//! changed.
//!
//! The gate reads (and clears) a dirty flag that the input handler
//! sets, so the tick chain — the "renderer" here — runs exactly once
//! per accepted move and never in between.
//!
//! Run with:
//!   cargo run --example turn_based

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use serde_json::json;
use tempo_core::handler_fn;
use tempo_engine::{gate_fn, EngineConfig, GatedEngine, MiddlewareSet};

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let dirty = Arc::new(AtomicBool::new(true));
    let gate_dirty = Arc::clone(&dirty);
    let input_dirty = Arc::clone(&dirty);

    let config = EngineConfig {
        // Tick only when the board changed since the last render.
        gate: Some(gate_fn(move || gate_dirty.swap(false, Ordering::AcqRel))),
        middlewares: MiddlewareSet {
            input: vec![handler_fn(move |ctx, chain| {
                let mover = ctx.last_input.clone().unwrap_or(json!("?"));
                ctx.state_data.insert("last_move".to_string(), mover);
                input_dirty.store(true, Ordering::Release);
                chain.handle(ctx)
            })],
            tick: vec![handler_fn(|ctx, chain| {
                println!(
                    "rendering board, last move: {}",
                    ctx.state_data
                        .get("last_move")
                        .cloned()
                        .unwrap_or(json!("none"))
                );
                chain.handle(ctx)
            })],
            ..MiddlewareSet::default()
        },
        ..EngineConfig::default()
    };

    let mut engine = GatedEngine::new(config).expect("valid gated config");

    engine.start().expect("fresh engine starts");
    engine.input(json!("e4")).expect("move accepted");
    engine.input(json!("e5")).expect("move accepted");

    engine.pause().expect("pause from running");
    // Ignored: the gated engine only accepts input while running.
    engine.input(json!("Nf3")).expect("silently ignored");
    engine.resume().expect("resume from paused");

    engine.stop().expect("stop once");
    println!("engine is {}", engine.lifecycle());
}

// SPDX-License-Identifier: MIT OR Apache-2.0

//! Shared helpers for the state machine integration tests

#![allow(dead_code)]

use eventflux_state::core::config::PoolConfig;
use eventflux_state::core::event::state::StateEvent;
use eventflux_state::core::event::stream::StreamEvent;
use eventflux_state::core::event::value::AttributeValue;
use eventflux_state::core::query::input::stream::state::{
    EventPools, PatternChainBuilder, PatternChainTemplate, PatternStepConfig, StateStreamRuntime,
    StateType,
};
use eventflux_state::core::query::output::CollectingMatchCallback;

/// Stock tick with `[symbol, price]` payload
pub fn tick(symbol: &str, price: f64, timestamp: i64) -> StreamEvent {
    StreamEvent::new(
        timestamp,
        vec![AttributeValue::from(symbol), AttributeValue::from(price)],
    )
}

/// Condition on the symbol bound at `position`
pub fn symbol_is(position: usize, expected: &'static str) -> impl Fn(&StateEvent) -> bool {
    move |event: &StateEvent| {
        event.attribute(position, 0).and_then(AttributeValue::as_str) == Some(expected)
    }
}

/// Step `alias` at `position` accepting only ticks of `symbol`
pub fn step(alias: &str, position: usize, symbol: &'static str) -> PatternStepConfig {
    PatternStepConfig::new(alias).with_condition(symbol_is(position, symbol))
}

pub fn symbol_at(event: &StateEvent, position: usize) -> Option<&str> {
    event.attribute(position, 0).and_then(AttributeValue::as_str)
}

/// `A -> B` over ticks, in the given mode
pub fn a_then_b(state_type: StateType) -> PatternChainTemplate {
    let mut builder = PatternChainBuilder::new(state_type);
    builder.add_step(step("e1", 0, "A")).add_step(step("e2", 1, "B"));
    builder.build().expect("A -> B is a valid chain")
}

/// Started runtime for `template` with a collector attached
pub fn started_runtime(
    template: &PatternChainTemplate,
    pool: &PoolConfig,
) -> (StateStreamRuntime, CollectingMatchCallback, EventPools) {
    let pools = EventPools::new(pool);
    let collector = CollectingMatchCallback::new();
    let mut runtime = template.create_runtime(&pools, Box::new(collector.clone()));
    runtime.start().expect("runtime starts");
    (runtime, collector, pools)
}

pub fn send_all(runtime: &mut StateStreamRuntime, events: impl IntoIterator<Item = StreamEvent>) {
    for event in events {
        runtime.send(event).expect("event processed");
    }
}

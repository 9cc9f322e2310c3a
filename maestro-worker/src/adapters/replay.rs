//! Tick-replay engine.
//!
//! Walks a fixed sequence of prices supplied in the spec parameters,
//! one tick per poll, then idles until stopped. Used for reproducing
//! recorded sessions.
//!
//! Recognized parameters:
//!
//! - `ticks` (array of f64): prices to replay, default a short fixture
//! - `poll_interval_ms` (u64): loop cadence, default 100

use std::time::Duration;

use async_trait::async_trait;
use serde_json::json;

use maestro_core::error::EngineError;

use crate::engine::{EngineContext, Stats, StrategyEngine};

/// Replays a fixed tick sequence.
pub struct ReplayEngine {
    class: String,
    ticks: Vec<f64>,
    cursor: usize,
    poll_interval: Duration,
}

impl ReplayEngine {
    /// Builds the engine from spec parameters.
    #[must_use]
    pub fn new(class: &str, params: &Stats) -> Self {
        let ticks = params
            .get("ticks")
            .and_then(|v| v.as_array())
            .map(|arr| arr.iter().filter_map(serde_json::Value::as_f64).collect())
            .unwrap_or_else(|| vec![100.0, 100.5, 101.0]);
        let interval_ms = params
            .get("poll_interval_ms")
            .and_then(|v| v.as_u64())
            .unwrap_or(100);
        Self {
            class: class.to_string(),
            ticks,
            cursor: 0,
            poll_interval: Duration::from_millis(interval_ms),
        }
    }

    /// True once every tick has been replayed.
    #[must_use]
    pub fn exhausted(&self) -> bool {
        self.cursor >= self.ticks.len()
    }
}

#[async_trait]
impl StrategyEngine for ReplayEngine {
    fn name(&self) -> &str {
        "replay"
    }

    async fn init(&mut self, ctx: &EngineContext) -> Result<(), EngineError> {
        if let Some(saved) = ctx.persister().load(ctx.key()).await? {
            if let Some(cursor) = saved.get("cursor").and_then(|v| v.as_u64()) {
                self.cursor = (cursor as usize).min(self.ticks.len());
            }
        }
        ctx.log().info(
            "init",
            format!(
                "replay ready | class={} ticks={} cursor={}",
                self.class,
                self.ticks.len(),
                self.cursor
            ),
        );
        Ok(())
    }

    async fn poll(&mut self, ctx: &EngineContext) -> Result<(), EngineError> {
        if let Some(price) = self.ticks.get(self.cursor) {
            ctx.log()
                .info("poll", format!("tick {} price {:.2}", self.cursor, price));
            self.cursor += 1;
            if self.exhausted() {
                ctx.log().info("poll", "replay exhausted, idling");
            }
        }
        Ok(())
    }

    async fn shutdown(
        &mut self,
        ctx: &EngineContext,
        persist_state: bool,
    ) -> Result<(), EngineError> {
        if persist_state {
            ctx.persister()
                .save(ctx.key(), &json!({"cursor": self.cursor}))
                .await?;
        }
        ctx.log().info("shutdown", "replay stopped");
        Ok(())
    }

    fn stats(&self) -> Stats {
        let mut stats = Stats::new();
        stats.insert("class".to_string(), json!(self.class));
        stats.insert("ticks_total".to_string(), json!(self.ticks.len()));
        stats.insert("ticks_replayed".to_string(), json!(self.cursor));
        stats
    }

    fn poll_interval(&self) -> Duration {
        self.poll_interval
    }
}

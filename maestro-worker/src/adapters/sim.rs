//! Simulated execution engine.
//!
//! Generates a deterministic price walk and runs a toy momentum rule
//! over it. Useful as the default engine for local runs and as the
//! workhorse of integration tests.
//!
//! Recognized parameters:
//!
//! - `fail_init` (bool): make `init` fail, for exercising error paths
//! - `start_price` (f64): opening price of the walk, default 100.0
//! - `poll_interval_ms` (u64): loop cadence, default 250
//! - `position_size` (u64): shares taken when the rule fires, default 100

use std::time::Duration;

use async_trait::async_trait;
use serde_json::json;

use maestro_core::error::EngineError;

use crate::engine::{EngineContext, Stats, StrategyEngine};

/// Deterministic simulated engine.
pub struct SimEngine {
    class: String,
    start_price: f64,
    last_price: f64,
    position: i64,
    position_size: i64,
    bars_processed: u64,
    poll_interval: Duration,
    fail_init: bool,
    rng_state: u64,
}

impl SimEngine {
    /// Builds the engine from spec parameters.
    #[must_use]
    pub fn new(key: &str, class: &str, params: &Stats) -> Self {
        let get_f64 = |name: &str, default: f64| {
            params.get(name).and_then(|v| v.as_f64()).unwrap_or(default)
        };
        let get_u64 = |name: &str, default: u64| {
            params.get(name).and_then(|v| v.as_u64()).unwrap_or(default)
        };
        let start_price = get_f64("start_price", 100.0);
        // Seed from the worker key so distinct workers walk differently
        // but a given worker is reproducible.
        let seed = key
            .bytes()
            .fold(0xcbf2_9ce4_8422_2325u64, |h, b| {
                (h ^ u64::from(b)).wrapping_mul(0x0100_0000_01b3)
            });
        Self {
            class: class.to_string(),
            start_price,
            last_price: start_price,
            position: 0,
            position_size: get_u64("position_size", 100) as i64,
            bars_processed: 0,
            poll_interval: Duration::from_millis(get_u64("poll_interval_ms", 250)),
            fail_init: params
                .get("fail_init")
                .and_then(|v| v.as_bool())
                .unwrap_or(false),
            rng_state: seed.max(1),
        }
    }

    fn next_price(&mut self) -> f64 {
        // xorshift64
        let mut x = self.rng_state;
        x ^= x << 13;
        x ^= x >> 7;
        x ^= x << 17;
        self.rng_state = x;
        let step = ((x % 200) as f64 - 100.0) / 100.0;
        self.last_price = (self.last_price + step).max(0.01);
        self.last_price
    }
}

#[async_trait]
impl StrategyEngine for SimEngine {
    fn name(&self) -> &str {
        "sim"
    }

    async fn init(&mut self, ctx: &EngineContext) -> Result<(), EngineError> {
        if self.fail_init {
            return Err(EngineError::InitFailed {
                reason: "fail_init requested by params".to_string(),
            });
        }
        if let Some(saved) = ctx.persister().load(ctx.key()).await? {
            if let Some(position) = saved.get("position").and_then(|v| v.as_i64()) {
                self.position = position;
            }
            if let Some(bars) = saved.get("bars_processed").and_then(|v| v.as_u64()) {
                self.bars_processed = bars;
            }
            if let Some(price) = saved.get("last_price").and_then(|v| v.as_f64()) {
                self.last_price = price;
            }
            ctx.log()
                .info("init", format!("restored state at bar {}", self.bars_processed));
        }
        ctx.log()
            .info("init", format!("engine initialized | class={}", self.class));
        Ok(())
    }

    async fn poll(&mut self, ctx: &EngineContext) -> Result<(), EngineError> {
        let price = self.next_price();
        self.bars_processed += 1;

        // Toy momentum rule: long above open, flat below.
        let want = if price > self.start_price {
            self.position_size
        } else {
            0
        };
        if want != self.position {
            ctx.log().info(
                "poll",
                format!("position {} -> {} at {:.2}", self.position, want, price),
            );
            self.position = want;
        } else {
            ctx.log()
                .debug("poll", format!("bar {} price {:.2}", self.bars_processed, price));
        }
        Ok(())
    }

    async fn shutdown(
        &mut self,
        ctx: &EngineContext,
        persist_state: bool,
    ) -> Result<(), EngineError> {
        if persist_state {
            let state = json!({
                "position": self.position,
                "bars_processed": self.bars_processed,
                "last_price": self.last_price,
            });
            ctx.persister().save(ctx.key(), &state).await?;
            ctx.log().info("shutdown", "state persisted");
        }
        ctx.log().info("shutdown", "engine stopped");
        Ok(())
    }

    fn stats(&self) -> Stats {
        let mut stats = Stats::new();
        stats.insert("class".to_string(), json!(self.class));
        stats.insert("position".to_string(), json!(self.position));
        stats.insert("bars_processed".to_string(), json!(self.bars_processed));
        stats.insert("last_price".to_string(), json!(self.last_price));
        stats
    }

    fn poll_interval(&self) -> Duration {
        self.poll_interval
    }
}

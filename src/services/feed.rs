//! Status feed - proposes seat availability changes over time
//!
//! A feed never touches the inventory. It pushes `StatusChange` proposals
//! into the session, which routes them through the selection controller's
//! `reconcile`. The simulated feed stands in for a live backend; any push
//! source (see `io::mqtt_feed`) plugs in behind the same `StatusFeed` trait.
//!
//! Feed tasks are owned by a `FeedTask` guard: dropping it signals shutdown
//! and aborts the task, so no timer outlives its session on any exit path.

use crate::domain::types::{SeatId, SeatStatus};
use crate::infra::config::{Config, FeedMode};
use crate::io::mqtt_feed::{MqttFeedSettings, MqttStatusFeed};
use crate::services::selection::StatusChange;
use anyhow::Context;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, info};

/// Eligible seats snapshot: available and not selected, layout order
pub type EligibleSeats = Arc<[SeatId]>;

/// What a feed receives when subscribed
pub struct FeedContext {
    /// Proposal sink; closed when the session goes away
    pub proposals: mpsc::Sender<StatusChange>,
    /// Republished by the session after every state change
    pub eligible: watch::Receiver<EligibleSeats>,
}

/// A source of seat status proposals
pub trait StatusFeed: Send {
    fn name(&self) -> &'static str;

    /// Start delivering proposals into `ctx`
    fn subscribe(&mut self, ctx: FeedContext) -> anyhow::Result<()>;

    /// Stop delivering proposals. Idempotent.
    fn dispose(&mut self);
}

/// Owned background task with guaranteed cancellation
pub struct FeedTask {
    shutdown_tx: watch::Sender<bool>,
    handle: JoinHandle<()>,
}

impl FeedTask {
    /// Spawn `task` on the current runtime. The task receives a shutdown
    /// signal it should select on.
    pub fn spawn<F, Fut>(task: F) -> anyhow::Result<Self>
    where
        F: FnOnce(watch::Receiver<bool>) -> Fut,
        Fut: Future<Output = ()> + Send + 'static,
    {
        let runtime = tokio::runtime::Handle::try_current()
            .context("status feed requires a running tokio runtime")?;
        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let handle = runtime.spawn(task(shutdown_rx));
        Ok(Self { shutdown_tx, handle })
    }

    pub fn is_finished(&self) -> bool {
        self.handle.is_finished()
    }
}

impl Drop for FeedTask {
    fn drop(&mut self) {
        let _ = self.shutdown_tx.send(true);
        self.handle.abort();
    }
}

/// Resolves when shutdown is signalled or the signal sender is gone
pub async fn shutdown_requested(shutdown: &mut watch::Receiver<bool>) {
    loop {
        if *shutdown.borrow() {
            return;
        }
        if shutdown.changed().await.is_err() {
            return;
        }
    }
}

/// Random proposal source: with `flip_probability` per tick, pick one
/// eligible seat uniformly and propose occupied (`occupied_weight`) or
/// reserved (the rest).
pub struct ProposalGenerator {
    rng: StdRng,
    flip_probability: f64,
    occupied_weight: f64,
}

impl ProposalGenerator {
    pub fn new(flip_probability: f64, occupied_weight: f64, seed: Option<u64>) -> Self {
        let rng = match seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        Self {
            rng,
            flip_probability: flip_probability.clamp(0.0, 1.0),
            occupied_weight: occupied_weight.clamp(0.0, 1.0),
        }
    }

    pub fn propose(&mut self, eligible: &[SeatId]) -> Option<StatusChange> {
        if eligible.is_empty() || !self.rng.gen_bool(self.flip_probability) {
            return None;
        }
        let seat_id = eligible[self.rng.gen_range(0..eligible.len())].clone();
        let status = if self.rng.gen_bool(self.occupied_weight) {
            SeatStatus::Occupied
        } else {
            SeatStatus::Reserved
        };
        Some(StatusChange { seat_id, status })
    }
}

/// Timer-driven local stand-in for a live occupancy feed
pub struct SimulatedFeed {
    interval: Duration,
    generator: Option<ProposalGenerator>,
    task: Option<FeedTask>,
}

impl SimulatedFeed {
    pub fn new(interval: Duration, generator: ProposalGenerator) -> Self {
        Self { interval, generator: Some(generator), task: None }
    }

    pub fn is_running(&self) -> bool {
        self.task.as_ref().is_some_and(|t| !t.is_finished())
    }
}

impl StatusFeed for SimulatedFeed {
    fn name(&self) -> &'static str {
        "simulated"
    }

    fn subscribe(&mut self, ctx: FeedContext) -> anyhow::Result<()> {
        let mut generator = self
            .generator
            .take()
            .context("simulated feed was already subscribed")?;
        let period = self.interval;

        let task = FeedTask::spawn(move |mut shutdown| async move {
            let FeedContext { proposals, eligible } = ctx;
            let mut ticker = tokio::time::interval(period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            // First tick completes immediately
            ticker.tick().await;

            loop {
                tokio::select! {
                    _ = shutdown_requested(&mut shutdown) => break,
                    _ = ticker.tick() => {
                        let snapshot = eligible.borrow().clone();
                        let Some(change) = generator.propose(&snapshot) else {
                            continue;
                        };
                        debug!(
                            seat_id = %change.seat_id,
                            status = %change.status.as_str(),
                            "feed_proposal"
                        );
                        if proposals.send(change).await.is_err() {
                            break;
                        }
                    }
                }
            }
            debug!("simulated_feed_stopped");
        })?;

        info!(interval_ms = %period.as_millis(), "simulated_feed_started");
        self.task = Some(task);
        Ok(())
    }

    fn dispose(&mut self) {
        if self.task.take().is_some() {
            info!("simulated_feed_disposed");
        }
    }
}

/// Feed that never proposes anything
#[derive(Debug, Default)]
pub struct NullFeed;

impl StatusFeed for NullFeed {
    fn name(&self) -> &'static str {
        "off"
    }

    fn subscribe(&mut self, _ctx: FeedContext) -> anyhow::Result<()> {
        Ok(())
    }

    fn dispose(&mut self) {}
}

/// Feed selected by `feed.mode`
pub fn build_feed(config: &Config) -> Box<dyn StatusFeed> {
    match config.feed_mode() {
        FeedMode::Simulated => Box::new(SimulatedFeed::new(
            Duration::from_millis(config.feed_interval_ms()),
            ProposalGenerator::new(
                config.flip_probability(),
                config.occupied_weight(),
                config.feed_seed(),
            ),
        )),
        FeedMode::Mqtt => Box::new(MqttStatusFeed::new(MqttFeedSettings::from_config(config))),
        FeedMode::Off => Box::new(NullFeed),
    }
}

//! Lock-free metrics collection and periodic reporting
//!
//! Counters are bumped from the session loop and read by the reporter task.
//! All counter updates are lock-free; reporting is the only operation that
//! needs synchronization (atomic swap plus the last-report timestamp).
//!
//! NOTE: All atomics use Relaxed ordering intentionally. These are
//! statistical counters only; never use them for coordination.

use crate::domain::error::SelectionError;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Instant;
use tracing::info;

/// Exponential bucket boundaries (microseconds)
/// Buckets: ≤5, ≤10, ≤20, ≤40, ≤80, ≤160, ≤320, ≤640, ≤1280, ≤2560, >2560
const BUCKET_BOUNDS: [u64; 10] = [5, 10, 20, 40, 80, 160, 320, 640, 1280, 2560];
const NUM_BUCKETS: usize = 11;

/// Upper bound reported for each bucket (last bucket uses 2x the previous)
const BUCKET_UPPER_BOUNDS: [u64; NUM_BUCKETS] =
    [5, 10, 20, 40, 80, 160, 320, 640, 1280, 2560, 5120];

#[inline]
fn bucket_index(latency_us: u64) -> usize {
    BUCKET_BOUNDS.partition_point(|&bound| bound < latency_us)
}

/// Update an atomic max value using compare-and-swap loop
#[inline]
fn update_atomic_max(atomic_max: &AtomicU64, new_value: u64) {
    let mut current_max = atomic_max.load(Ordering::Relaxed);
    while new_value > current_max {
        match atomic_max.compare_exchange_weak(
            current_max,
            new_value,
            Ordering::Relaxed,
            Ordering::Relaxed,
        ) {
            Ok(_) => break,
            Err(actual) => current_max = actual,
        }
    }
}

#[inline]
fn swap_buckets(buckets: &[AtomicU64; NUM_BUCKETS]) -> [u64; NUM_BUCKETS] {
    std::array::from_fn(|i| buckets[i].swap(0, Ordering::Relaxed))
}

/// Upper bound of the bucket containing `percentile`
fn percentile_from_buckets(buckets: &[u64; NUM_BUCKETS], percentile: f64) -> u64 {
    let total: u64 = buckets.iter().sum();
    if total == 0 {
        return 0;
    }

    let target = (total as f64 * percentile) as u64;
    let mut cumulative = 0u64;
    for (i, &count) in buckets.iter().enumerate() {
        cumulative += count;
        if cumulative >= target {
            return BUCKET_UPPER_BOUNDS[i];
        }
    }
    BUCKET_UPPER_BOUNDS[NUM_BUCKETS - 1]
}

/// Lock-free metrics collector shared between the session and reporters
pub struct Metrics {
    /// Session events processed (monotonic)
    events_total: AtomicU64,
    /// Events since last report (reset on report)
    events_since_report: AtomicU64,
    /// Sum of handling latencies in microseconds (reset on report)
    latency_sum_us: AtomicU64,
    /// Max handling latency in microseconds (reset on report)
    latency_max_us: AtomicU64,
    /// Handling latency histogram (reset on report)
    latency_buckets: [AtomicU64; NUM_BUCKETS],
    seats_selected: AtomicU64,
    seats_deselected: AtomicU64,
    rejected_unavailable: AtomicU64,
    rejected_limit: AtomicU64,
    rejected_unknown: AtomicU64,
    selections_revoked: AtomicU64,
    proposals_received: AtomicU64,
    proposals_applied: AtomicU64,
    /// Proposals that arrived after close and were dropped
    proposals_ignored: AtomicU64,
    camera_updates: AtomicU64,
    viewpoint_changes: AtomicU64,
    bookings_submitted: AtomicU64,
    bookings_failed: AtomicU64,
    updates_sent: AtomicU64,
    /// Presentation messages dropped due to a full channel
    updates_dropped: AtomicU64,
    last_report_time: parking_lot::Mutex<Instant>,
}

impl Metrics {
    pub fn new() -> Self {
        Self {
            events_total: AtomicU64::new(0),
            events_since_report: AtomicU64::new(0),
            latency_sum_us: AtomicU64::new(0),
            latency_max_us: AtomicU64::new(0),
            latency_buckets: std::array::from_fn(|_| AtomicU64::new(0)),
            seats_selected: AtomicU64::new(0),
            seats_deselected: AtomicU64::new(0),
            rejected_unavailable: AtomicU64::new(0),
            rejected_limit: AtomicU64::new(0),
            rejected_unknown: AtomicU64::new(0),
            selections_revoked: AtomicU64::new(0),
            proposals_received: AtomicU64::new(0),
            proposals_applied: AtomicU64::new(0),
            proposals_ignored: AtomicU64::new(0),
            camera_updates: AtomicU64::new(0),
            viewpoint_changes: AtomicU64::new(0),
            bookings_submitted: AtomicU64::new(0),
            bookings_failed: AtomicU64::new(0),
            updates_sent: AtomicU64::new(0),
            updates_dropped: AtomicU64::new(0),
            last_report_time: parking_lot::Mutex::new(Instant::now()),
        }
    }

    /// Record one session event with its handling latency
    #[inline]
    pub fn record_event_processed(&self, latency_us: u64) {
        self.events_total.fetch_add(1, Ordering::Relaxed);
        self.events_since_report.fetch_add(1, Ordering::Relaxed);
        self.latency_sum_us.fetch_add(latency_us, Ordering::Relaxed);
        self.latency_buckets[bucket_index(latency_us)].fetch_add(1, Ordering::Relaxed);
        update_atomic_max(&self.latency_max_us, latency_us);
    }

    #[inline]
    pub fn record_select(&self) {
        self.seats_selected.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub fn record_deselect(&self) {
        self.seats_deselected.fetch_add(1, Ordering::Relaxed);
    }

    /// Count a rejected select by cause
    pub fn record_select_rejected(&self, err: &SelectionError) {
        let counter = match err {
            SelectionError::SeatUnavailable { .. } => &self.rejected_unavailable,
            SelectionError::SelectionLimitReached { .. } => &self.rejected_limit,
            SelectionError::UnknownSeat(_) => &self.rejected_unknown,
        };
        counter.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub fn record_revocation(&self) {
        self.selections_revoked.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub fn record_proposal(&self, applied: bool) {
        self.proposals_received.fetch_add(1, Ordering::Relaxed);
        if applied {
            self.proposals_applied.fetch_add(1, Ordering::Relaxed);
        }
    }

    #[inline]
    pub fn record_proposal_ignored(&self) {
        self.proposals_ignored.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub fn record_camera_update(&self) {
        self.camera_updates.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub fn record_viewpoint_change(&self) {
        self.viewpoint_changes.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_booking(&self, submitted: bool) {
        let counter = if submitted { &self.bookings_submitted } else { &self.bookings_failed };
        counter.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub fn record_update_sent(&self) {
        self.updates_sent.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub fn record_update_dropped(&self) {
        self.updates_dropped.fetch_add(1, Ordering::Relaxed);
    }

    pub fn events_total(&self) -> u64 {
        self.events_total.load(Ordering::Relaxed)
    }

    pub fn selections_revoked(&self) -> u64 {
        self.selections_revoked.load(Ordering::Relaxed)
    }

    pub fn proposals_ignored(&self) -> u64 {
        self.proposals_ignored.load(Ordering::Relaxed)
    }

    pub fn updates_dropped(&self) -> u64 {
        self.updates_dropped.load(Ordering::Relaxed)
    }

    /// Snapshot counters and reset the periodic ones.
    ///
    /// This is the only method that resets anything; it uses atomic swap so
    /// concurrent updates are never lost.
    pub fn report(&self) -> MetricsSummary {
        let events_count = self.events_since_report.swap(0, Ordering::Relaxed);
        let latency_sum = self.latency_sum_us.swap(0, Ordering::Relaxed);
        let max_latency = self.latency_max_us.swap(0, Ordering::Relaxed);
        let lat_buckets = swap_buckets(&self.latency_buckets);

        let elapsed = {
            let mut last = self.last_report_time.lock();
            let elapsed = last.elapsed();
            *last = Instant::now();
            elapsed
        };

        let events_per_sec = if elapsed.as_secs_f64() > 0.0 {
            events_count as f64 / elapsed.as_secs_f64()
        } else {
            0.0
        };
        let avg_latency = if events_count > 0 { latency_sum / events_count } else { 0 };

        let load = |c: &AtomicU64| c.load(Ordering::Relaxed);
        MetricsSummary {
            events_total: load(&self.events_total),
            events_per_sec,
            avg_latency_us: avg_latency,
            max_latency_us: max_latency,
            lat_p50_us: percentile_from_buckets(&lat_buckets, 0.50),
            lat_p95_us: percentile_from_buckets(&lat_buckets, 0.95),
            lat_p99_us: percentile_from_buckets(&lat_buckets, 0.99),
            lat_buckets,
            seats_selected: load(&self.seats_selected),
            seats_deselected: load(&self.seats_deselected),
            rejected_unavailable: load(&self.rejected_unavailable),
            rejected_limit: load(&self.rejected_limit),
            rejected_unknown: load(&self.rejected_unknown),
            selections_revoked: load(&self.selections_revoked),
            proposals_received: load(&self.proposals_received),
            proposals_applied: load(&self.proposals_applied),
            proposals_ignored: load(&self.proposals_ignored),
            camera_updates: load(&self.camera_updates),
            viewpoint_changes: load(&self.viewpoint_changes),
            bookings_submitted: load(&self.bookings_submitted),
            bookings_failed: load(&self.bookings_failed),
            updates_sent: load(&self.updates_sent),
            updates_dropped: load(&self.updates_dropped),
        }
    }
}

impl Default for Metrics {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Debug, Clone)]
pub struct MetricsSummary {
    pub events_total: u64,
    pub events_per_sec: f64,
    pub avg_latency_us: u64,
    pub max_latency_us: u64,
    /// Bounds: ≤5, ≤10, ≤20, ≤40, ≤80, ≤160, ≤320, ≤640, ≤1280, ≤2560, >2560 µs
    pub lat_buckets: [u64; NUM_BUCKETS],
    pub lat_p50_us: u64,
    pub lat_p95_us: u64,
    pub lat_p99_us: u64,
    pub seats_selected: u64,
    pub seats_deselected: u64,
    pub rejected_unavailable: u64,
    pub rejected_limit: u64,
    pub rejected_unknown: u64,
    pub selections_revoked: u64,
    pub proposals_received: u64,
    pub proposals_applied: u64,
    pub proposals_ignored: u64,
    pub camera_updates: u64,
    pub viewpoint_changes: u64,
    pub bookings_submitted: u64,
    pub bookings_failed: u64,
    pub updates_sent: u64,
    pub updates_dropped: u64,
}

impl MetricsSummary {
    pub fn log(&self) {
        info!(
            events_total = %self.events_total,
            events_per_sec = format!("{:.1}", self.events_per_sec),
            avg_latency_us = %self.avg_latency_us,
            max_latency_us = %self.max_latency_us,
            p50_us = %self.lat_p50_us,
            p99_us = %self.lat_p99_us,
            selected = %self.seats_selected,
            deselected = %self.seats_deselected,
            rejected = %(self.rejected_unavailable + self.rejected_limit + self.rejected_unknown),
            revoked = %self.selections_revoked,
            proposals = %self.proposals_received,
            proposals_applied = %self.proposals_applied,
            camera_updates = %self.camera_updates,
            bookings = %self.bookings_submitted,
            updates_dropped = %self.updates_dropped,
            "metrics"
        );
    }
}

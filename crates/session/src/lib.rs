//! The scatter-gather session behind the broker filter.
//!
//! One [`FilterSession`] owns the filter switch and the single in-flight
//! [`BatchCycle`]. All three event kinds (listing batch, detail response,
//! filter command) funnel through its `&mut self` entry points from one
//! event-processing task, so no locking is needed. Outbound detail requests
//! go through a paced queue drained by [`PacedDispatcher`]; everything else
//! is emitted directly on the outbound channel.

use broker_filter::{verdict, FilterCommand, FilterState, PassiveIndex};
use broker_protocol::{DetailRequest, DetailResponse, ListingBatch, Outbound, TOOLTIP_KIND};
use log::{debug, info, warn};
use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::time::Instant;

mod pacer;

pub use pacer::PacedDispatcher;

#[derive(Debug, Clone)]
pub struct SessionConfig {
    /// Character name stamped on outbound tooltip requests.
    pub owner: String,
    /// Discard a cycle that has not completed within this window and forward
    /// the original batch unfiltered. `None` disables expiry.
    pub stale_after: Option<Duration>,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            owner: String::new(),
            stale_after: Some(Duration::from_secs(10)),
        }
    }
}

/// One in-flight scatter-gather pass over a single listing batch.
struct BatchCycle {
    generation: u64,
    expected: usize,
    processed: usize,
    keep: HashSet<u64>,
    batch: ListingBatch,
    started_at: Instant,
}

pub struct FilterSession {
    state: FilterState,
    index: Arc<PassiveIndex>,
    config: SessionConfig,
    cycle: Option<BatchCycle>,
    /// Monotonic cycle counter; stamped on every outbound request and checked
    /// against every inbound response, so responses from a superseded cycle
    /// can never leak into the current one.
    generation: u64,
    paced_tx: mpsc::UnboundedSender<DetailRequest>,
    outbound_tx: mpsc::UnboundedSender<Outbound>,
}

impl FilterSession {
    pub fn new(
        index: Arc<PassiveIndex>,
        config: SessionConfig,
        paced_tx: mpsc::UnboundedSender<DetailRequest>,
        outbound_tx: mpsc::UnboundedSender<Outbound>,
    ) -> Self {
        Self {
            state: FilterState::default(),
            index,
            config,
            cycle: None,
            generation: 0,
            paced_tx,
            outbound_tx,
        }
    }

    pub fn state(&self) -> &FilterState {
        &self.state
    }

    pub fn cycle_active(&self) -> bool {
        self.cycle.is_some()
    }

    /// Apply a validated `filter` command. `off` also discards any in-flight
    /// cycle so a half-gathered batch cannot fire later against fresh state.
    pub fn apply_command(&mut self, command: FilterCommand) -> String {
        if matches!(command, FilterCommand::Off) && self.cycle.take().is_some() {
            debug!("filter off: discarded in-flight cycle");
        }
        self.state.apply(command)
    }

    /// Inbound batch-listing event.
    ///
    /// Disabled filter: pass the event straight through, no requests. Enabled:
    /// suppress the raw event, start a fresh cycle (overwriting any incomplete
    /// one) and enqueue one paced tooltip request per listing.
    pub fn handle_listing(&mut self, batch: ListingBatch) {
        if !self.state.enabled {
            self.forward(batch);
            return;
        }
        if batch.is_empty() {
            // Nothing to scatter over; an empty batch needs no rewrite.
            self.forward(batch);
            return;
        }

        if let Some(old) = &self.cycle {
            warn!(
                "new listing batch supersedes incomplete cycle {} ({}/{} gathered)",
                old.generation, old.processed, old.expected
            );
        }

        self.generation += 1;
        let generation = self.generation;
        info!(
            "cycle {generation}: scattering {} detail requests",
            batch.len()
        );

        for listing in &batch.listings {
            let request = DetailRequest::new(generation, listing, self.config.owner.clone());
            if self.paced_tx.send(request).is_err() {
                warn!("paced dispatcher gone; dropping detail request");
            }
        }

        self.cycle = Some(BatchCycle {
            generation,
            expected: batch.len(),
            processed: 0,
            keep: HashSet::new(),
            batch,
            started_at: Instant::now(),
        });
    }

    /// Inbound detail-response event.
    ///
    /// A response is a correlation miss (ignored, no state change) when no
    /// cycle is active, when its kind is not the tooltip kind, or when its
    /// generation is not the active cycle's. Every correlated response counts
    /// toward completion whether kept or dropped.
    pub fn handle_detail(&mut self, response: DetailResponse) {
        let Some(cycle) = self.cycle.as_mut() else {
            debug!("detail response with no active cycle; ignored");
            return;
        };
        if response.kind != TOOLTIP_KIND {
            debug!("detail response of kind {}; ignored", response.kind);
            return;
        }
        if response.generation != cycle.generation {
            debug!(
                "detail response for stale cycle {} (active {}); ignored",
                response.generation, cycle.generation
            );
            return;
        }

        if verdict::keep(&response, &self.index, &self.state) {
            cycle.keep.insert(response.item_id);
        }
        cycle.processed += 1;

        if cycle.processed >= cycle.expected {
            if let Some(done) = self.cycle.take() {
                self.finish(done);
            }
        }
    }

    /// Discard a cycle that has sat incomplete past the configured window,
    /// forwarding the original batch unfiltered (fail open). Called from the
    /// event loop's housekeeping tick.
    pub fn expire_stale(&mut self, now: Instant) {
        let Some(stale_after) = self.config.stale_after else {
            return;
        };
        let expired = self
            .cycle
            .as_ref()
            .is_some_and(|c| now.duration_since(c.started_at) >= stale_after);
        if expired {
            if let Some(cycle) = self.cycle.take() {
                warn!(
                    "cycle {} stalled at {}/{} responses; forwarding batch unfiltered",
                    cycle.generation, cycle.processed, cycle.expected
                );
                self.forward(cycle.batch);
            }
        }
    }

    /// Rewrite-and-forward: keep matching listings in original order and emit
    /// the rewritten batch in place of the suppressed raw event.
    fn finish(&mut self, mut cycle: BatchCycle) {
        cycle
            .batch
            .listings
            .retain(|listing| cycle.keep.contains(&listing.item_id));
        info!(
            "cycle {}: forwarding {} of {} listings",
            cycle.generation,
            cycle.batch.len(),
            cycle.expected
        );
        self.forward(cycle.batch);
    }

    fn forward(&self, batch: ListingBatch) {
        if self.outbound_tx.send(Outbound::ListingBatch(batch)).is_err() {
            warn!("outbound channel closed; dropping listing batch");
        }
    }
}

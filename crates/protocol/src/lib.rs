//! Wire data model for the broker listing filter.
//!
//! The filter sits between an upstream game server and a downstream client.
//! Three inbound event shapes reach it (listing batch, item detail response,
//! user command) and three outbound shapes leave it (rewritten listing batch,
//! paced detail request, user-facing message). Everything crosses the
//! transport as one newline-delimited JSON envelope per event.

use serde::{Deserialize, Serialize};

/// Request/response "kind" tag for item tooltip (detail) exchanges. Detail
/// responses carrying any other kind belong to someone else's query and are
/// ignored by the correlator.
pub const TOOLTIP_KIND: u32 = 13;

/// Default inter-request delay for paced detail dispatch, in milliseconds.
pub const DEFAULT_PACING_MS: u64 = 20;

/// One broker listing as announced by the listing batch event.
///
/// `payload` is opaque to the filter: whatever extra fields the real protocol
/// attaches (price, duration, seller) ride along untouched so the rewritten
/// batch re-serializes faithfully.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Listing {
    pub listing_id: u64,
    pub item_id: u64,
    #[serde(default, skip_serializing_if = "serde_json::Value::is_null")]
    pub payload: serde_json::Value,
}

/// The batch-listing event: the ordered set of broker offers the client is
/// about to be shown.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ListingBatch {
    pub listings: Vec<Listing>,
}

impl ListingBatch {
    pub fn len(&self) -> usize {
        self.listings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.listings.is_empty()
    }
}

/// Outbound per-item tooltip query.
///
/// `generation` tags the scatter-gather cycle that issued the request; the
/// transport echoes it in the matching [`DetailResponse`] so late responses
/// from a superseded cycle are provably ignorable. The zeroed fields are
/// required by the upstream protocol but carry no meaning here.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DetailRequest {
    pub kind: u32,
    pub generation: u64,
    pub item_id: u64,
    pub listing_id: u64,
    #[serde(default)]
    pub server_id: u32,
    #[serde(default = "default_player_id")]
    pub player_id: i64,
    #[serde(default)]
    pub owner: String,
}

fn default_player_id() -> i64 {
    -1
}

impl DetailRequest {
    pub fn new(generation: u64, listing: &Listing, owner: impl Into<String>) -> Self {
        Self {
            kind: TOOLTIP_KIND,
            generation,
            item_id: listing.item_id,
            listing_id: listing.listing_id,
            server_id: 0,
            player_id: -1,
            owner: owner.into(),
        }
    }
}

/// Inbound per-item tooltip answer.
///
/// Correlation is by value: the embedded `item_id` plus the echoed
/// `generation`, never by arrival order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DetailResponse {
    pub kind: u32,
    #[serde(default)]
    pub generation: u64,
    pub item_id: u64,
    /// Passivity roll identifiers attached to the item. Empty means the item
    /// has no roll data at all.
    #[serde(default)]
    pub passivities: Vec<u32>,
}

/// Everything the transport can deliver to the filter core.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", content = "data", rename_all = "snake_case")]
pub enum Inbound {
    ListingBatch(ListingBatch),
    DetailResponse(DetailResponse),
    /// A raw user command line, e.g. `filter pamp 2`.
    Command { line: String },
}

/// Everything the filter core can emit toward the transport.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", content = "data", rename_all = "snake_case")]
pub enum Outbound {
    /// A (possibly rewritten) listing batch bound for the client.
    ListingBatch(ListingBatch),
    /// A paced tooltip query bound for the server.
    DetailRequest(DetailRequest),
    /// User-facing text from the command surface.
    Message { text: String },
}

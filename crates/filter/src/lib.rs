//! # Broker Filter
//!
//! Match logic for broker listings: which passivity rolls the user cares
//! about, and whether a given item's rolls clear the bar.
//!
//! - **Passive index** - category key -> member passivity ids, resolved once
//!   at startup against an external lookup service
//! - **Filter spec** - alias group table, `filter` command parsing, the
//!   enabled/categories/threshold state
//! - **Verdict** - the pure keep/drop decision for one detail response

mod error;
mod index;
mod spec;
pub mod verdict;

pub use error::{FilterError, Result};
pub use index::{
    PassiveCategory, PassiveId, PassiveIndex, PassiveLookup, StaticLookup, PASSIVE_CATEGORIES,
};
pub use spec::{
    expand_alias, known_aliases, parse_filter_args, FilterCommand, FilterState, DEFAULT_THRESHOLD,
};

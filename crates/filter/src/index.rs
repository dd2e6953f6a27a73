use crate::{FilterError, Result};
use async_trait::async_trait;
use log::{info, warn};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};

/// Integer code identifying one passivity roll category (amplification,
/// piercing, crit power, ...).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PassiveCategory(pub u32);

/// Identifier of one concrete passivity roll.
pub type PassiveId = u32;

/// The fixed set of roll categories the filter understands:
/// Max HP, Max MP, Crit Factor, then the 1001..1008 amp/res/crit/pierce block.
pub const PASSIVE_CATEGORIES: [PassiveCategory; 11] = [
    PassiveCategory(1),
    PassiveCategory(2),
    PassiveCategory(6),
    PassiveCategory(1001),
    PassiveCategory(1002),
    PassiveCategory(1003),
    PassiveCategory(1004),
    PassiveCategory(1005),
    PassiveCategory(1006),
    PassiveCategory(1007),
    PassiveCategory(1008),
];

/// External lookup service resolving a roll category to its member passivity
/// ids. Queried once per category at startup.
#[async_trait]
pub trait PassiveLookup: Send + Sync {
    async fn members(&self, category: PassiveCategory) -> Result<Vec<PassiveId>>;
}

/// Category-to-members index. Populated once at startup, immutable after;
/// share via `Arc`. A category whose lookup failed (or never ran) reads as an
/// empty member set.
#[derive(Debug, Default)]
pub struct PassiveIndex {
    members: HashMap<PassiveCategory, HashSet<PassiveId>>,
}

impl PassiveIndex {
    /// Resolve every category in `categories` against `lookup`. A failed
    /// query is logged and skipped; it never aborts the remaining categories.
    pub async fn populate(lookup: &dyn PassiveLookup, categories: &[PassiveCategory]) -> Self {
        let mut members = HashMap::new();
        for &category in categories {
            match lookup.members(category).await {
                Ok(ids) => {
                    info!(
                        "passive category {} resolved to {} members",
                        category.0,
                        ids.len()
                    );
                    members.insert(category, ids.into_iter().collect());
                }
                Err(e) => {
                    warn!("passive category {} lookup failed: {e}", category.0);
                }
            }
        }
        Self { members }
    }

    /// Build directly from resolved sets. Test and fixture constructor.
    pub fn from_members(
        entries: impl IntoIterator<Item = (PassiveCategory, Vec<PassiveId>)>,
    ) -> Self {
        Self {
            members: entries
                .into_iter()
                .map(|(c, ids)| (c, ids.into_iter().collect()))
                .collect(),
        }
    }

    /// Does `passive_id` belong to `category`? Unresolved categories match
    /// nothing.
    pub fn contains(&self, category: PassiveCategory, passive_id: PassiveId) -> bool {
        self.members
            .get(&category)
            .is_some_and(|set| set.contains(&passive_id))
    }

    pub fn resolved_categories(&self) -> usize {
        self.members.len()
    }
}

/// In-memory [`PassiveLookup`] backed by a fixed table. Used by tests and by
/// the server's JSON fixture loader.
#[derive(Debug, Default)]
pub struct StaticLookup {
    table: HashMap<PassiveCategory, Vec<PassiveId>>,
    failing: HashSet<PassiveCategory>,
}

impl StaticLookup {
    pub fn new(entries: impl IntoIterator<Item = (PassiveCategory, Vec<PassiveId>)>) -> Self {
        Self {
            table: entries.into_iter().collect(),
            failing: HashSet::new(),
        }
    }

    /// Make `category` queries fail, for exercising partial population.
    pub fn failing(mut self, category: PassiveCategory) -> Self {
        self.failing.insert(category);
        self
    }
}

#[async_trait]
impl PassiveLookup for StaticLookup {
    async fn members(&self, category: PassiveCategory) -> Result<Vec<PassiveId>> {
        if self.failing.contains(&category) {
            return Err(FilterError::Lookup(format!(
                "category {} unavailable",
                category.0
            )));
        }
        Ok(self.table.get(&category).cloned().unwrap_or_default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn populate_skips_failed_category_and_keeps_others() {
        let lookup = StaticLookup::new([
            (PassiveCategory(1001), vec![10, 11]),
            (PassiveCategory(1002), vec![20]),
        ])
        .failing(PassiveCategory(1002));

        let index = PassiveIndex::populate(
            &lookup,
            &[PassiveCategory(1001), PassiveCategory(1002)],
        )
        .await;

        assert!(index.contains(PassiveCategory(1001), 10));
        assert!(!index.contains(PassiveCategory(1002), 20));
        assert_eq!(index.resolved_categories(), 1);
    }

    #[tokio::test]
    async fn unresolved_category_reads_as_empty() {
        let index = PassiveIndex::populate(&StaticLookup::default(), &[]).await;
        assert!(!index.contains(PassiveCategory(1), 1));
    }
}

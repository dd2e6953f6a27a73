use crate::{FilterState, PassiveIndex};
use broker_protocol::DetailResponse;

/// Keep/drop decision for one item's detail response.
///
/// Counts the distinct passivity entries that belong to at least one active
/// category's member set; an entry contributes once even when it matches
/// several categories. Keep iff the count reaches the threshold. A response
/// with no passivity data never matches.
pub fn keep(response: &DetailResponse, index: &PassiveIndex, state: &FilterState) -> bool {
    if !state.enabled {
        return false;
    }

    let mut matched = 0u32;
    for &passivity in &response.passivities {
        if state
            .categories
            .iter()
            .any(|&category| index.contains(category, passivity))
        {
            matched += 1;
            if matched >= state.threshold {
                return true;
            }
        }
    }
    false
}

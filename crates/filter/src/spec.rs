use crate::{FilterError, PassiveCategory, Result};
use once_cell::sync::Lazy;
use std::collections::{BTreeMap, HashSet};

/// Built-in alias table: user-facing roll shorthand to category keys.
/// 13 aliases over the 11 fixed categories; `phys` and `mag` fan out to
/// three categories each.
static GROUPS: Lazy<BTreeMap<&'static str, &'static [u32]>> = Lazy::new(|| {
    BTreeMap::from([
        ("hp", &[1u32][..]),
        ("mp", &[2][..]),
        ("cf", &[6][..]),
        ("phys", &[1001, 1005, 1007][..]),
        ("mag", &[1002, 1006, 1008][..]),
        ("pamp", &[1001][..]),
        ("mamp", &[1002][..]),
        ("pcp", &[1005][..]),
        ("mcp", &[1006][..]),
        ("pres", &[1003][..]),
        ("mres", &[1004][..]),
        ("ppier", &[1007][..]),
        ("mpier", &[1008][..]),
    ])
});

/// Expand one alias (case-insensitive) to its category keys.
pub fn expand_alias(alias: &str) -> Option<Vec<PassiveCategory>> {
    GROUPS
        .get(alias.to_ascii_lowercase().as_str())
        .map(|keys| keys.iter().map(|&k| PassiveCategory(k)).collect())
}

/// All known aliases, in stable order, for help text.
pub fn known_aliases() -> impl Iterator<Item = &'static str> {
    GROUPS.keys().copied()
}

pub const DEFAULT_THRESHOLD: u32 = 1;

/// The process-wide filter switch plus the active match criteria.
///
/// Mutated only through [`FilterState::apply`]; read by the scatter
/// dispatcher and the verdict evaluator. While `enabled` is false the
/// categories and threshold are inert.
#[derive(Debug, Clone, PartialEq)]
pub struct FilterState {
    pub enabled: bool,
    pub categories: HashSet<PassiveCategory>,
    pub threshold: u32,
}

impl Default for FilterState {
    fn default() -> Self {
        Self {
            enabled: false,
            categories: HashSet::new(),
            threshold: DEFAULT_THRESHOLD,
        }
    }
}

/// A fully validated `filter` command, ready to apply.
#[derive(Debug, Clone, PartialEq)]
pub enum FilterCommand {
    Off,
    Set {
        aliases: Vec<String>,
        categories: HashSet<PassiveCategory>,
        threshold: u32,
    },
}

/// Parse the argument tokens of a `filter` command.
///
/// The trailing token is taken as the minimum-roll threshold when it parses
/// as an integer; otherwise it is one more alias and the threshold defaults
/// to 1. Non-positive thresholds clamp to 1. Any unknown alias rejects the
/// whole command; prior state is never partially updated.
pub fn parse_filter_args(tokens: &[String]) -> Result<FilterCommand> {
    let Some(first) = tokens.first() else {
        return Err(FilterError::Other(
            "Usage: filter <type>... [count], or 'filter off'.".into(),
        ));
    };

    if tokens.len() == 1 && first.eq_ignore_ascii_case("off") {
        return Ok(FilterCommand::Off);
    }

    let (alias_tokens, threshold) = match tokens.last().and_then(|t| t.parse::<i64>().ok()) {
        Some(n) => (
            &tokens[..tokens.len() - 1],
            n.clamp(1, i64::from(u32::MAX)) as u32,
        ),
        None => (tokens, DEFAULT_THRESHOLD),
    };

    if alias_tokens.is_empty() {
        return Err(FilterError::Other(
            "Usage: filter <type>... [count], or 'filter off'.".into(),
        ));
    }

    let mut aliases = Vec::with_capacity(alias_tokens.len());
    let mut categories = HashSet::new();
    for token in alias_tokens {
        let Some(keys) = expand_alias(token) else {
            return Err(FilterError::UnknownAlias(token.clone()));
        };
        categories.extend(keys);
        aliases.push(token.to_ascii_lowercase());
    }

    Ok(FilterCommand::Set {
        aliases,
        categories,
        threshold,
    })
}

impl FilterState {
    /// Apply a validated command. Returns the user-facing confirmation line.
    pub fn apply(&mut self, command: FilterCommand) -> String {
        match command {
            FilterCommand::Off => {
                *self = FilterState::default();
                "Broker filter turned off.".to_string()
            }
            FilterCommand::Set {
                aliases,
                categories,
                threshold,
            } => {
                self.enabled = true;
                self.categories = categories;
                self.threshold = threshold;
                format!(
                    "Filtering broker offers for {} ({}) line{}.",
                    threshold,
                    aliases.join(", "),
                    if threshold > 1 { "s" } else { "" }
                )
            }
        }
    }
}

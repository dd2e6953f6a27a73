use anyhow::{Context, Result};
use broker_filter::{PassiveCategory, PassiveId, StaticLookup};
use log::warn;
use std::collections::HashMap;
use std::path::Path;

/// Load the passivity lookup table from a JSON file mapping category keys to
/// member id lists, e.g. `{"1001": [101, 202], "1002": [305]}`.
///
/// Standing in for the live game-data query service; the filter core only
/// sees the [`broker_filter::PassiveLookup`] trait either way. Without a
/// table every category resolves empty and the filter matches nothing.
pub fn load_lookup(path: Option<&Path>) -> Result<StaticLookup> {
    let Some(path) = path else {
        warn!("no passivity table given; all categories will resolve empty");
        return Ok(StaticLookup::default());
    };

    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("reading passivity table {}", path.display()))?;
    let table: HashMap<String, Vec<PassiveId>> = serde_json::from_str(&raw)
        .with_context(|| format!("parsing passivity table {}", path.display()))?;

    let mut entries = Vec::with_capacity(table.len());
    for (key, members) in table {
        let code: u32 = key
            .parse()
            .with_context(|| format!("non-numeric category key '{key}'"))?;
        entries.push((PassiveCategory(code), members));
    }
    Ok(StaticLookup::new(entries))
}

#[cfg(test)]
mod tests {
    use super::*;
    use broker_filter::PassiveIndex;
    use tempfile::TempDir;

    #[tokio::test]
    async fn parses_table_and_serves_members() {
        let temp = TempDir::new().expect("tempdir");
        let path = temp.path().join("passives.json");
        std::fs::write(&path, r#"{"1001": [101, 202], "6": []}"#).unwrap();

        let lookup = load_lookup(Some(&path)).unwrap();
        let index =
            PassiveIndex::populate(&lookup, &[PassiveCategory(1001), PassiveCategory(6)]).await;
        assert!(index.contains(PassiveCategory(1001), 202));
        assert!(!index.contains(PassiveCategory(6), 202));
    }

    #[test]
    fn missing_path_yields_empty_lookup() {
        assert!(load_lookup(None).is_ok());
    }

    #[test]
    fn bad_json_is_an_error() {
        let temp = TempDir::new().expect("tempdir");
        let path = temp.path().join("passives.json");
        std::fs::write(&path, "not json").unwrap();
        assert!(load_lookup(Some(&path)).is_err());
    }
}

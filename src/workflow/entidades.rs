//! Full-replace sync of the entities tab from the legacy portal.
use crate::error::RunError;
use crate::model::EntityRecord;
use crate::portal::legacy::EntitySource;
use crate::sheets::{Rows, SheetStore};
use anyhow::{anyhow, Context};

pub const ENTITY_HEADER: [&str; 3] = ["entidad", "valor", "ciudad"];

pub fn entity_rows(records: &[EntityRecord]) -> Rows {
    let mut rows: Rows = vec![ENTITY_HEADER.iter().map(|h| h.to_string()).collect()];
    rows.extend(records.iter().map(|record| {
        vec![
            record.entity_name.clone(),
            record.entity_code.clone(),
            record.jurisdiction.clone(),
        ]
    }));
    rows
}

/// Scrape every entity, then overwrite `tab` with the complete list.
///
/// Nothing is written unless extraction succeeded for every city and
/// produced at least one entity.
pub fn sync_entities(
    source: &dyn EntitySource,
    store: &dyn SheetStore,
    tab: &str,
) -> Result<usize, RunError> {
    let records = source
        .extract()
        .context("extract entities from legacy portal")
        .map_err(RunError::SourceUnavailable)?;
    if records.is_empty() {
        return Err(RunError::SourceUnavailable(anyhow!(
            "legacy portal listed no entities; leaving {tab} untouched"
        )));
    }
    store
        .replace_tab(tab, &entity_rows(&records))
        .with_context(|| format!("write {tab} tab"))
        .map_err(RunError::SinkWriteFailure)?;
    tracing::info!(entities = records.len(), tab, "entities tab replaced");
    Ok(records.len())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sheets::{patch_rows, CellUpdate};
    use anyhow::Result;
    use std::cell::RefCell;
    use std::collections::BTreeMap;

    struct FixedSource(Result<Vec<EntityRecord>, String>);

    impl EntitySource for FixedSource {
        fn extract(&self) -> Result<Vec<EntityRecord>> {
            self.0.clone().map_err(|err| anyhow!(err))
        }
    }

    #[derive(Default)]
    struct MemoryStore {
        tabs: RefCell<BTreeMap<String, Rows>>,
    }

    impl SheetStore for MemoryStore {
        fn read_tab(&self, tab: &str) -> Result<Rows> {
            Ok(self.tabs.borrow().get(tab).cloned().unwrap_or_default())
        }

        fn replace_tab(&self, tab: &str, rows: &[Vec<String>]) -> Result<()> {
            self.tabs.borrow_mut().insert(tab.to_string(), rows.to_vec());
            Ok(())
        }

        fn update_cells(&self, tab: &str, updates: &[CellUpdate]) -> Result<()> {
            patch_rows(self.tabs.borrow_mut().entry(tab.to_string()).or_default(), updates);
            Ok(())
        }
    }

    fn existing() -> MemoryStore {
        let store = MemoryStore::default();
        store
            .replace_tab("Entidades", &[vec!["entidad".to_string()], vec!["vieja".to_string()]])
            .expect("seed");
        store
    }

    #[test]
    fn replaces_tab_with_every_entity() {
        let store = existing();
        let source = FixedSource(Ok(vec![EntityRecord {
            entity_name: "JUZGADO 001 CIVIL".to_string(),
            entity_code: "310-1".to_string(),
            jurisdiction: "MEDELLIN".to_string(),
        }]));

        assert_eq!(sync_entities(&source, &store, "Entidades").expect("sync"), 1);
        let rows = store.read_tab("Entidades").expect("read");
        assert_eq!(rows[0], ENTITY_HEADER.map(String::from).to_vec());
        assert_eq!(rows[1], vec!["JUZGADO 001 CIVIL", "310-1", "MEDELLIN"]);
    }

    #[test]
    fn failed_extraction_leaves_tab_untouched() {
        let store = existing();
        let source = FixedSource(Err("city 05001 failed".to_string()));

        assert!(matches!(
            sync_entities(&source, &store, "Entidades"),
            Err(RunError::SourceUnavailable(_))
        ));
        assert_eq!(store.read_tab("Entidades").expect("read")[1], vec!["vieja"]);
    }

    #[test]
    fn empty_extraction_leaves_tab_untouched() {
        let store = existing();
        let source = FixedSource(Ok(Vec::new()));

        assert!(sync_entities(&source, &store, "Entidades").is_err());
        assert_eq!(store.read_tab("Entidades").expect("read").len(), 2);
    }
}

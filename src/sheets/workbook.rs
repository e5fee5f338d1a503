//! Local JSON workbook standing in for the shared spreadsheet.
//!
//! File layout: `{ "tabs": { "<name>": [["header", ...], ["cell", ...]] } }`.
use super::{patch_rows, CellUpdate, Rows, SheetStore};
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::PathBuf;

#[derive(Debug, Default, Serialize, Deserialize)]
struct WorkbookFile {
    #[serde(default)]
    tabs: BTreeMap<String, Rows>,
}

pub struct Workbook {
    path: PathBuf,
}

impl Workbook {
    pub fn open(path: PathBuf) -> Self {
        Self { path }
    }

    fn load(&self) -> Result<WorkbookFile> {
        let bytes = fs::read(&self.path)
            .with_context(|| format!("read workbook {}", self.path.display()))?;
        serde_json::from_slice(&bytes).context("parse workbook JSON")
    }

    fn store(&self, book: &WorkbookFile) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent).context("create workbook dir")?;
            }
        }
        let text = serde_json::to_string_pretty(book).context("serialize workbook")?;
        let tmp = self.path.with_extension("json.tmp");
        fs::write(&tmp, text.as_bytes()).with_context(|| format!("write {}", tmp.display()))?;
        fs::rename(&tmp, &self.path)
            .with_context(|| format!("replace {}", self.path.display()))?;
        Ok(())
    }
}

impl SheetStore for Workbook {
    fn read_tab(&self, tab: &str) -> Result<Rows> {
        Ok(self.load()?.tabs.remove(tab).unwrap_or_default())
    }

    fn replace_tab(&self, tab: &str, rows: &[Vec<String>]) -> Result<()> {
        let mut book = if self.path.exists() {
            self.load()?
        } else {
            WorkbookFile::default()
        };
        book.tabs.insert(tab.to_string(), rows.to_vec());
        self.store(&book)
    }

    fn update_cells(&self, tab: &str, updates: &[CellUpdate]) -> Result<()> {
        if updates.is_empty() {
            return Ok(());
        }
        let mut book = self.load()?;
        patch_rows(book.tabs.entry(tab.to_string()).or_default(), updates);
        self.store(&book)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(cells: &[&str]) -> Vec<String> {
        cells.iter().map(|c| c.to_string()).collect()
    }

    #[test]
    fn missing_file_is_an_error_on_read() {
        let temp = tempfile::tempdir().expect("tempdir");
        let book = Workbook::open(temp.path().join("absent.json"));
        assert!(book.read_tab("Procesos").is_err());
    }

    #[test]
    fn replace_keeps_other_tabs() {
        let temp = tempfile::tempdir().expect("tempdir");
        let book = Workbook::open(temp.path().join("book.json"));

        book.replace_tab("Procesos", &[row(&["radicado"]), row(&["1"])])
            .expect("write procesos");
        book.replace_tab("Entidades", &[row(&["entidad", "valor"])])
            .expect("write entidades");
        book.replace_tab("Procesos", &[row(&["radicado"]), row(&["2"])])
            .expect("rewrite procesos");

        assert_eq!(
            book.read_tab("Procesos").expect("read"),
            vec![row(&["radicado"]), row(&["2"])]
        );
        assert_eq!(book.read_tab("Entidades").expect("read").len(), 1);
        assert!(book.read_tab("Reporte").expect("read").is_empty());
    }

    #[test]
    fn cell_updates_rewrite_only_the_named_cells() {
        let temp = tempfile::tempdir().expect("tempdir");
        let book = Workbook::open(temp.path().join("book.json"));
        book.replace_tab(
            "Procesos",
            &[row(&["radicado", "cliente"]), row(&["A", "Ana"]), row(&["B", "Beto"])],
        )
        .expect("seed");

        book.update_cells(
            "Procesos",
            &[CellUpdate::new(0, 2, "estado"), CellUpdate::new(2, 2, "Auto")],
        )
        .expect("update");

        assert_eq!(
            book.read_tab("Procesos").expect("read"),
            vec![
                row(&["radicado", "cliente", "estado"]),
                row(&["A", "Ana"]),
                row(&["B", "Beto", "Auto"]),
            ]
        );
    }
}

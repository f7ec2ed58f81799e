// Native spreadsheet format (JSON)
//
// {"version": "default", "cells": [{"name": "A1", "contents": "=B1+2"}, ...]}
//
// `contents` is the raw textual form of each nonempty cell, formulas with a
// leading '='. Cells are written sorted by name and replayed in file order.

use std::fs::{self, File};
use std::io::{BufReader, BufWriter, Write};
use std::path::Path;

use serde::{Deserialize, Serialize};

use gridcalc_engine::{SheetConfig, Spreadsheet};

use crate::error::{PersistError, Result};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SheetFile {
    pub version: String,
    pub cells: Vec<CellRecord>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CellRecord {
    pub name: String,
    pub contents: String,
}

impl SheetFile {
    /// Snapshot every nonempty cell of `sheet`.
    pub fn capture(sheet: &Spreadsheet) -> Result<Self> {
        let mut cells = Vec::new();
        for name in sheet.all_nonempty_cell_names() {
            let content = sheet.get_content(&name).map_err(|source| PersistError::Cell {
                name: name.clone(),
                source,
            })?;
            cells.push(CellRecord {
                contents: content.to_string(),
                name,
            });
        }
        Ok(Self {
            version: sheet.version().to_string(),
            cells,
        })
    }

    /// Replay the saved cells into `sheet`, which should be empty.
    ///
    /// Fails if the file's version differs from the sheet's. The returned sheet
    /// reports no unsaved changes.
    pub fn restore_into(self, mut sheet: Spreadsheet) -> Result<Spreadsheet> {
        if self.version != sheet.version() {
            return Err(PersistError::VersionMismatch {
                expected: sheet.version().to_string(),
                found: self.version,
            });
        }
        for record in self.cells {
            sheet
                .set_content(&record.name, &record.contents)
                .map_err(|source| PersistError::Cell {
                    name: record.name,
                    source,
                })?;
        }
        sheet.mark_saved();
        Ok(sheet)
    }
}

pub fn to_json(sheet: &Spreadsheet) -> Result<String> {
    Ok(serde_json::to_string_pretty(&SheetFile::capture(sheet)?)?)
}

/// Build a sheet from `config` and fill it from `json`.
pub fn from_json(json: &str, config: &SheetConfig) -> Result<Spreadsheet> {
    from_json_into(json, Spreadsheet::from_config(config))
}

pub fn from_json_into(json: &str, sheet: Spreadsheet) -> Result<Spreadsheet> {
    let file: SheetFile = serde_json::from_str(json)?;
    file.restore_into(sheet)
}

/// Write `sheet` to `path` and clear its changed flag.
///
/// The file is written next to `path` as `*.json.tmp` and renamed into place,
/// so a failed save leaves any previous file intact and the sheet still
/// marked as changed.
pub fn save(sheet: &mut Spreadsheet, path: &Path) -> Result<()> {
    let file = SheetFile::capture(sheet)?;

    let temp_path = path.with_extension("json.tmp");
    if let Err(e) = write_file(&temp_path, &file) {
        let _ = fs::remove_file(&temp_path);
        return Err(e);
    }
    if let Err(e) = fs::rename(&temp_path, path) {
        let _ = fs::remove_file(&temp_path);
        return Err(e.into());
    }

    sheet.mark_saved();
    log::info!(
        "Saved {} cells to {} (version {})",
        file.cells.len(),
        path.display(),
        file.version
    );
    Ok(())
}

fn write_file(path: &Path, file: &SheetFile) -> Result<()> {
    write_json(BufWriter::new(File::create(path)?), file)
}

/// Serialize and flush; a flush error is reported, not dropped.
fn write_json<W: Write>(mut writer: W, file: &SheetFile) -> Result<()> {
    serde_json::to_writer_pretty(&mut writer, file)?;
    writer.flush()?;
    Ok(())
}

pub fn load(path: &Path, config: &SheetConfig) -> Result<Spreadsheet> {
    load_into(path, Spreadsheet::from_config(config))
}

/// Load `path` into a caller-built sheet, e.g. one with custom name rules.
pub fn load_into(path: &Path, sheet: Spreadsheet) -> Result<Spreadsheet> {
    let reader = BufReader::new(File::open(path)?);
    let file: SheetFile = serde_json::from_reader(reader)?;
    let count = file.cells.len();
    let version = file.version.clone();
    let sheet = file.restore_into(sheet)?;
    log::info!(
        "Loaded {} cells from {} (version {})",
        count,
        path.display(),
        version
    );
    Ok(sheet)
}

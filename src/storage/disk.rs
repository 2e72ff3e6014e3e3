//! One bincode file per table.
//!
//! Each file holds the schema and the live rows in order. Saving writes a
//! temporary file in the data directory and renames it over the previous
//! version, so a crash mid-write leaves the last good copy in place.

use std::{
    fs::File,
    io::{BufReader, BufWriter, ErrorKind, Write},
    path::Path,
};

use bincode::Options;
use serde::{Deserialize, Serialize};
use tempfile::NamedTempFile;

use crate::{
    config::Config,
    error::{Error, Result},
    sql::{
        schema::{Column, Schema},
        types::Row,
    },
    storage::table::Table,
};

/// On-disk layout, borrowed for writing
#[derive(Serialize)]
struct TableFileRef<'a> {
    name: &'a str,
    columns: &'a [Column],
    rows: Vec<&'a Row>,
}

/// On-disk layout, owned for reading
#[derive(Deserialize)]
struct TableFile {
    name: String,
    columns: Vec<Column>,
    rows: Vec<Row>,
}

/// Atomically replaces the persisted copy of `table`
pub fn save(config: &Config, table: &Table) -> Result<()> {
    let file = TableFileRef {
        name: table.name(),
        columns: table.schema().columns(),
        rows: table.rows().collect(),
    };

    // Dropping `tmp` on any early return deletes the temporary file
    let mut tmp = NamedTempFile::new_in(&config.data_dir)?;
    {
        let mut writer = BufWriter::new(tmp.as_file_mut());
        bincode::serialize_into(&mut writer, &file)?;
        writer.flush()?;
    }
    if config.sync_writes {
        tmp.as_file().sync_all()?;
    }
    tmp.persist(config.table_path(table.name()))?;
    Ok(())
}

/// Rebuilds a table, rows and indexes, from its file
pub fn load(path: &Path) -> Result<Table> {
    let handle = File::open(path)?;
    // Same encoding as `bincode::serialize_into`, bounded by the file size so
    // a corrupt length prefix cannot trigger a huge allocation
    let options = bincode::DefaultOptions::new()
        .with_fixint_encoding()
        .allow_trailing_bytes()
        .with_limit(handle.metadata()?.len());
    let file: TableFile = options.deserialize_from(BufReader::new(handle))?;

    let corrupt = |err: Error| Error::Io(format!("corrupt table file {}: {}", path.display(), err));
    let schema = Schema::build(file.name, file.columns).map_err(corrupt)?;
    let mut table = Table::new(schema);
    for row in file.rows {
        table.insert(row).map_err(corrupt)?;
    }
    Ok(table)
}

/// Deletes the persisted copy of `table`; a missing file is not an error
pub fn remove(config: &Config, table: &str) -> Result<()> {
    match std::fs::remove_file(config.table_path(table)) {
        Err(err) if err.kind() != ErrorKind::NotFound => Err(err.into()),
        _ => Ok(()),
    }
}

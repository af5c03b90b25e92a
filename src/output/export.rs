//! JSON Lines export of stored records

use crate::storage::Storage;
use crate::HarvestError;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

/// Writes every stored record to `path`, one JSON object per line
///
/// Returns the number of records written.
pub fn export_jsonl(storage: &dyn Storage, path: &Path) -> Result<usize, HarvestError> {
    let records = storage.load_records(None)?;
    let mut writer = BufWriter::new(File::create(path)?);

    for record in &records {
        serde_json::to_writer(&mut writer, record)?;
        writer.write_all(b"\n")?;
    }
    writer.flush()?;

    tracing::info!("Exported {} records to {}", records.len(), path.display());
    Ok(records.len())
}

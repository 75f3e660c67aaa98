//! `tidyscan export` command.

use std::path::Path;

use super::open_store;
use crate::config::Settings;
use crate::context::ServiceContext;
use crate::report::export::ExportDocument;
use crate::store::{EntryId, SnapshotStore};

/// Execute the `export` command.
///
/// # Errors
///
/// Returns an error string if the entry does not exist or the file cannot be
/// written.
pub fn run(ctx: &ServiceContext, settings: &Settings, id: i64, output: &Path) -> Result<(), String> {
    let store = open_store(settings)?;
    let document = build(ctx, &store, EntryId(id))?;
    document.write_to(ctx.fs.as_ref(), output)?;
    println!("Exported entry {id} to {}", output.display());
    Ok(())
}

pub(crate) fn build(
    ctx: &ServiceContext,
    store: &SnapshotStore,
    id: EntryId,
) -> Result<ExportDocument, String> {
    let entry = store
        .get(id)
        .map_err(|e| e.to_string())?
        .ok_or_else(|| format!("history entry {id} not found"))?;
    let statistics = store.stats().map_err(|e| e.to_string())?;
    Ok(ExportDocument { generated: ctx.clock.now(), entry, statistics })
}

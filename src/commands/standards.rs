//! `tidyscan standards` command.

use std::path::Path;

use crate::config::Settings;
use crate::context::ServiceContext;
use crate::standards::Standards;

/// Execute the `standards` command.
///
/// Writes the default standards document to `output`, or to the configured
/// standards path.
///
/// # Errors
///
/// Returns an error string if the file exists and `force` is not set, or if
/// the write fails.
pub fn run(
    ctx: &ServiceContext,
    settings: &Settings,
    output: Option<&Path>,
    force: bool,
) -> Result<(), String> {
    let path = output.unwrap_or(&settings.standards_path);
    write_default(ctx, path, force)?;
    println!("Wrote default standards to {}", path.display());
    Ok(())
}

pub(crate) fn write_default(ctx: &ServiceContext, path: &Path, force: bool) -> Result<(), String> {
    if ctx.fs.exists(path) && !force {
        return Err(format!("{} already exists; pass --force to overwrite", path.display()));
    }
    let contents = Standards::default().to_yaml()?;
    ctx.fs
        .write(path, &contents)
        .map_err(|e| format!("Failed to write standards {}: {e}", path.display()))
}

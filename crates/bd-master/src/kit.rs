//! Kit assembly from configured sample files.

use bd_formats::{check_budget, import_table, FormatError, ImportOptions, TABLE_BUDGET};
use bd_ir::{Kit, TrackId};

use crate::config::Config;

/// The built-in kit with any configured sample files swapped in.
///
/// A kit over the flash budget still loads with a warning.
pub fn load_kit(config: &Config) -> Result<Kit, FormatError> {
    let mut kit = Kit::builtin();
    for track in TrackId::ALL {
        let Some(path) = config.kit_file(track) else {
            continue;
        };
        let data = std::fs::read(&path).map_err(|e| FormatError::Io(format!("{}: {}", path.display(), e)))?;
        let table = import_table(&data, track.name(), ImportOptions::default())?;
        log::info!(target: "kit", "{}: {} bytes from {}", track.name(), table.len(), path.display());
        kit.set_table(track, table);
    }
    if let Err(e) = check_budget(kit.tables.iter()) {
        log::warn!(target: "kit", "{} (budget {} bytes)", e, TABLE_BUDGET);
    }
    Ok(kit)
}

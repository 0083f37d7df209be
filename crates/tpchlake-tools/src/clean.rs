//! Removal of generated data and lake state.

use std::fs;
use std::path::{Path, PathBuf};

use crate::config::TpchConfig;
use crate::error::Result;

/// Paths `clean` removes, in order.
pub fn clean_targets(config: &TpchConfig) -> Vec<PathBuf> {
    vec![
        config.output_dir.clone(),
        PathBuf::from(&config.lake.data_path),
        config.lake.catalog_path.clone(),
        config.lake.catalog_files_path(),
    ]
}

/// Remove every existing target and return the ones that were removed.
pub fn clean(config: &TpchConfig) -> Result<Vec<PathBuf>> {
    let mut removed = Vec::new();
    for target in clean_targets(config) {
        if remove_path(&target)? {
            tracing::debug!(path = %target.display(), "Removed");
            removed.push(target);
        }
    }
    Ok(removed)
}

fn remove_path(path: &Path) -> Result<bool> {
    if path.is_dir() {
        fs::remove_dir_all(path)?;
        Ok(true)
    } else if path.exists() {
        fs::remove_file(path)?;
        Ok(true)
    } else {
        Ok(false)
    }
}

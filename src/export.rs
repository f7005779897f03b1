//! Export packager
//!
//! Copies a completed run's cache directory verbatim to a caller-chosen
//! destination. The copy goes through a sibling staging directory and a
//! final rename, so a failed export never leaves a bundle that looks
//! valid.

use crate::cache::{RunCache, METRICS_FILE, MODEL_FILE, PREDICTIONS_FILE, SCHEMA_FILE};
use crate::error::{AutoRegressError, Result};
use std::path::{Path, PathBuf};

/// Export a published run to `dest`.
///
/// Fails with `RunNotFound` if the run was never published and `ExportIo`
/// on any destination write failure; partial output is cleaned up.
pub fn export_run(cache: &RunCache, run_id: &str, dest: &Path) -> Result<PathBuf> {
    if !cache.contains(run_id) {
        return Err(AutoRegressError::RunNotFound(run_id.to_string()));
    }
    export_dir(&cache.run_dir(run_id), dest)
}

/// Copy a run-layout directory to `dest` with all-or-nothing semantics
pub fn export_dir(src: &Path, dest: &Path) -> Result<PathBuf> {
    for required in [MODEL_FILE, METRICS_FILE, SCHEMA_FILE, PREDICTIONS_FILE] {
        if !src.join(required).exists() {
            return Err(AutoRegressError::ExportIo(format!(
                "source is missing {required}: {}",
                src.display()
            )));
        }
    }

    if dest.exists() {
        return Err(AutoRegressError::ExportIo(format!(
            "destination already exists: {}",
            dest.display()
        )));
    }

    let staging = staging_path(dest)?;
    if staging.exists() {
        std::fs::remove_dir_all(&staging)
            .map_err(|e| AutoRegressError::ExportIo(e.to_string()))?;
    }

    if let Err(e) = copy_dir_recursive(src, &staging) {
        let _ = std::fs::remove_dir_all(&staging);
        return Err(AutoRegressError::ExportIo(e.to_string()));
    }

    if let Err(e) = std::fs::rename(&staging, dest) {
        let _ = std::fs::remove_dir_all(&staging);
        return Err(AutoRegressError::ExportIo(e.to_string()));
    }

    Ok(dest.to_path_buf())
}

fn staging_path(dest: &Path) -> Result<PathBuf> {
    let name = dest
        .file_name()
        .ok_or_else(|| {
            AutoRegressError::ExportIo(format!("invalid destination: {}", dest.display()))
        })?
        .to_string_lossy();
    let parent = dest.parent().unwrap_or_else(|| Path::new("."));
    std::fs::create_dir_all(parent).map_err(|e| AutoRegressError::ExportIo(e.to_string()))?;
    Ok(parent.join(format!(".{name}.partial")))
}

fn copy_dir_recursive(src: &Path, dest: &Path) -> std::io::Result<()> {
    std::fs::create_dir_all(dest)?;
    for entry in std::fs::read_dir(src)? {
        let entry = entry?;
        let target = dest.join(entry.file_name());
        if entry.file_type()?.is_dir() {
            copy_dir_recursive(&entry.path(), &target)?;
        } else {
            std::fs::copy(entry.path(), &target)?;
        }
    }
    Ok(())
}

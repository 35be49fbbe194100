//! Command implementations for the ProMSA CLI

pub mod align;
pub mod config;
pub mod score;
pub mod tree;

use anyhow::Result;
use std::path::Path;

use promsa_core::io::read_sequences;
use promsa_core::Sequence;

use crate::error::CliError;

/// Read a sequence file, reporting a missing path as such
pub(crate) fn load_sequences(path: &Path) -> Result<Vec<Sequence>> {
    if !path.exists() {
        return Err(CliError::file_not_found(path.to_path_buf()).into());
    }
    let sequences = read_sequences(path)
        .map_err(|e| CliError::parse(path.display().to_string(), format!("{:#}", e)))?;
    log::info!("Loaded {} sequences from {}", sequences.len(), path.display());
    Ok(sequences)
}

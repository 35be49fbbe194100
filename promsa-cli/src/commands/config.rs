//! Config command implementation - print or write the example configuration

use anyhow::Result;
use std::path::PathBuf;

use crate::config::Config;

/// Print the active configuration, or write it to `output`
pub fn execute(config: &Config, output: Option<PathBuf>) -> Result<()> {
    match output {
        Some(path) => {
            config.save_to_file(&path)?;
            log::info!("Configuration written to: {}", path.display());
        }
        None => print!("{}", config.to_toml()?),
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_written_config_loads_back() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("promsa.toml");
        let mut config = Config::default();
        config.refinement.max_iterations = 7;

        execute(&config, Some(path.clone())).unwrap();
        let loaded = Config::load(Some(&path)).unwrap();
        assert_eq!(loaded.refinement.max_iterations, 7);
    }
}

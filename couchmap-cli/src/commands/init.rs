//! `couchmap init-config`: write a default config file.

use std::path::Path;

use couchmap::config::ConfigFile;

use super::resolve_config_path;
use crate::error::CliError;

pub fn run(path: Option<&Path>, force: bool) -> Result<(), CliError> {
    let path = resolve_config_path(path);
    if path.exists() && !force {
        return Err(CliError::Config(format!(
            "{} already exists (use --force to overwrite)",
            path.display()
        )));
    }

    ConfigFile::default().save_to(&path)?;
    println!("Wrote {}", path.display());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_writes_loadable_defaults() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("config.ini");

        run(Some(&path), false).unwrap();
        assert_eq!(ConfigFile::load_from(&path).unwrap(), ConfigFile::default());
    }

    #[test]
    fn test_refuses_to_overwrite_without_force() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("config.ini");
        std::fs::write(&path, "[engine]\ncoarse_threshold = 7\n").unwrap();

        assert!(matches!(run(Some(&path), false), Err(CliError::Config(_))));
        run(Some(&path), true).unwrap();
        assert_eq!(ConfigFile::load_from(&path).unwrap(), ConfigFile::default());
    }
}

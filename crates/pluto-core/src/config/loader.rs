//! Configuration file discovery and loading

use std::path::{Path, PathBuf};

use super::pluto_config::CompilerConfig;
use crate::error::PlutoError;
use crate::result::Result;

/// Config file names, in lookup priority order
pub const CONFIG_FILE_NAMES: &[&str] =
    &[".plutorc.json", ".plutorc.toml", "pluto.toml", "pluto.json"];

/// Configuration loader for discovering and loading config files
pub struct ConfigLoader;

impl ConfigLoader {
    /// Auto-discover a config file by walking up from `start_path`
    ///
    /// Each directory is searched for [`CONFIG_FILE_NAMES`] in order, until a
    /// config is found or the filesystem root is reached.
    pub fn auto_discover(start_path: &Path) -> Result<Option<PathBuf>> {
        let mut current = start_path
            .canonicalize()
            .map_err(|e| PlutoError::config_error(format!("Invalid path: {e}")))?;

        loop {
            for filename in CONFIG_FILE_NAMES {
                let config_path = current.join(filename);
                if config_path.is_file() {
                    tracing::debug!("Found config: {}", config_path.display());
                    return Ok(Some(config_path));
                }
            }

            match current.parent() {
                Some(parent) => current = parent.to_path_buf(),
                None => break,
            }
        }

        Ok(None)
    }

    /// Load configuration from a specific file
    pub fn load_from_file(path: &Path) -> Result<CompilerConfig> {
        CompilerConfig::load(path).map_err(|e| match e {
            err @ PlutoError::ConfigError { .. } => err,
            other => PlutoError::config_error(format!(
                "Failed to load config from '{}': {other}",
                path.display()
            )),
        })
    }

    /// Load config from `custom_path`, or discover one from `start_dir`
    ///
    /// An explicit path must exist. When discovery finds nothing the
    /// defaults are returned. The second element is the file the
    /// configuration came from, if any.
    pub fn load(
        custom_path: Option<&Path>,
        start_dir: Option<&Path>,
    ) -> Result<(CompilerConfig, Option<PathBuf>)> {
        let config_path = match custom_path {
            Some(path) if !path.exists() => {
                return Err(PlutoError::config_error(format!(
                    "Config file not found: {}",
                    path.display()
                )));
            }
            Some(path) => Some(path.to_path_buf()),
            None => Self::auto_discover(start_dir.unwrap_or_else(|| Path::new(".")))?,
        };

        match config_path {
            Some(path) => Ok((Self::load_from_file(&path)?, Some(path))),
            None => {
                tracing::debug!("No config file found, using defaults");
                Ok((CompilerConfig::default(), None))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn create_temp_config(dir: &Path, filename: &str, content: &str) -> PathBuf {
        let path = dir.join(filename);
        fs::write(&path, content).unwrap();
        path
    }

    #[test]
    fn test_load_from_file_toml() {
        let temp_dir = TempDir::new().unwrap();
        let config_path = create_temp_config(
            temp_dir.path(),
            "pluto.toml",
            r#"
                [compiler]
                procedureName = "heater"

                [output]
                directory = "out"
            "#,
        );

        let config = ConfigLoader::load_from_file(&config_path).unwrap();
        assert_eq!(config.procedure_name(), "heater");
        assert_eq!(config.output_directory(), Some(Path::new("out")));
    }

    #[test]
    fn test_load_from_file_json() {
        let temp_dir = TempDir::new().unwrap();
        let config_path = create_temp_config(
            temp_dir.path(),
            ".plutorc.json",
            r#"{ "output": { "extension": "txt" } }"#,
        );

        let config = ConfigLoader::load_from_file(&config_path).unwrap();
        assert_eq!(config.output_extension(), "txt");
    }

    #[test]
    fn test_auto_discover() {
        let temp_dir = TempDir::new().unwrap();
        let nested = temp_dir.path().join("procedures/nested");
        fs::create_dir_all(&nested).unwrap();
        create_temp_config(temp_dir.path(), "pluto.json", "{}");

        let found = ConfigLoader::auto_discover(&nested).unwrap();
        assert_eq!(
            found.unwrap().file_name().and_then(|n| n.to_str()),
            Some("pluto.json")
        );
    }

    #[test]
    fn test_dotfile_takes_priority() {
        let temp_dir = TempDir::new().unwrap();
        create_temp_config(temp_dir.path(), "pluto.toml", "");
        create_temp_config(temp_dir.path(), ".plutorc.toml", "");

        let found = ConfigLoader::auto_discover(temp_dir.path()).unwrap().unwrap();
        assert!(found.ends_with(".plutorc.toml"));
    }

    #[test]
    fn test_load_invalid_content() {
        let temp_dir = TempDir::new().unwrap();
        let config_path = create_temp_config(temp_dir.path(), "pluto.json", "{ not json");

        let err = ConfigLoader::load_from_file(&config_path).unwrap_err();
        assert_eq!(err.kind(), crate::error::ErrorKind::Config);
    }

    #[test]
    fn test_load_nonexistent_file() {
        let result = ConfigLoader::load(Some(Path::new("nonexistent.toml")), None);
        assert!(result.is_err());
    }

    #[test]
    fn test_load_falls_back_to_defaults() {
        let temp_dir = TempDir::new().unwrap();
        let (config, path) = ConfigLoader::load(None, Some(temp_dir.path())).unwrap();
        // A config further up the real filesystem may still be found
        if path.is_none() {
            assert_eq!(config, CompilerConfig::default());
        }
    }
}

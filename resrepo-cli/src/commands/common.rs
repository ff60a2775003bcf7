//! Common types and utilities shared across CLI commands.

use std::path::{Path, PathBuf};

use resrepo::{FolderConfiguration, RepositoryConfig, ResourceFolderRepository, ResourceType};

use crate::error::CliError;

/// Options every command that opens a repository accepts.
#[derive(Debug, Clone, Default)]
pub struct RepoOptions {
    /// INI settings file; the per-user default is used when absent.
    pub config_file: Option<PathBuf>,
    /// Disable the persistent cache for this run.
    pub no_cache: bool,
}

/// Default location of the settings file.
pub fn default_config_file() -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join("resrepo").join("config.ini"))
}

/// Load settings: explicit file > per-user default > built-in defaults.
pub fn load_config(options: &RepoOptions) -> Result<RepositoryConfig, CliError> {
    let config = match &options.config_file {
        Some(path) => RepositoryConfig::load(path)?,
        None => match default_config_file().filter(|p| p.is_file()) {
            Some(path) => RepositoryConfig::load(&path)?,
            None => RepositoryConfig::default(),
        },
    };
    Ok(if options.no_cache {
        config.with_persistent_cache(false)
    } else {
        config
    })
}

/// Open an incremental repository over `root`.
pub async fn open_repository(
    root: &Path,
    config: RepositoryConfig,
) -> Result<ResourceFolderRepository, CliError> {
    Ok(ResourceFolderRepository::open(root, config).await?)
}

/// Parse a `--type` argument.
pub fn parse_type(name: &str) -> Result<ResourceType, CliError> {
    ResourceType::from_name(name).ok_or_else(|| CliError::UnknownType(name.to_string()))
}

/// Parse a `--config` qualifier string such as `fr-rCA-land-hdpi`.
pub fn parse_qualifiers(qualifiers: &str) -> Result<FolderConfiguration, CliError> {
    FolderConfiguration::from_qualifier_string(qualifiers).map_err(|source| {
        CliError::Qualifiers {
            qualifiers: qualifiers.to_string(),
            source,
        }
    })
}

/// Print a JSON value, pretty or compact.
pub fn print_json(value: &serde_json::Value, pretty: bool) -> Result<(), CliError> {
    let text = if pretty {
        serde_json::to_string_pretty(value)?
    } else {
        serde_json::to_string(value)?
    };
    println!("{}", text);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_type() {
        assert_eq!(parse_type("string").unwrap(), ResourceType::String);
        assert!(matches!(parse_type("strings"), Err(CliError::UnknownType(_))));
    }

    #[test]
    fn test_parse_qualifiers() {
        assert!(parse_qualifiers("").unwrap().is_default());
        assert_eq!(parse_qualifiers("fr-rCA").unwrap().region(), Some("CA"));
        assert!(matches!(
            parse_qualifiers("hdpi-fr"),
            Err(CliError::Qualifiers { .. })
        ));
    }

    #[test]
    fn test_load_config_from_file() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("config.ini");
        std::fs::write(&path, "[repository]\ncode_version = test-1\n").unwrap();

        let options = RepoOptions {
            config_file: Some(path),
            no_cache: true,
        };
        let config = load_config(&options).unwrap();
        assert_eq!(config.code_version, "test-1");
        assert!(!config.persistent_cache);
    }
}

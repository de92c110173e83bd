//! Layered configuration for inkstone.
//!
//! Values are resolved from, in increasing order of precedence:
//!
//! 1. built-in defaults (platform data directories, a 30 second autosave),
//! 2. an optional configuration file, TOML, YAML or JSON by extension,
//! 3. `INKSTONE_` environment variables, with `__` separating sections
//!    (`INKSTONE_AUTOSAVE__INTERVAL=10`).

pub mod error;

use std::path::{Path, PathBuf};
use std::time::Duration;

use directories::{ProjectDirs, UserDirs};
use exn::ResultExt;
use figment::Figment;
use figment::providers::{Env, Format, Json, Serialized, Toml, Yaml};
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument};

use crate::error::{ErrorKind, Result};

/// Prefix of environment variables read into the configuration.
pub const ENV_PREFIX: &str = "INKSTONE_";
/// Seconds between autosaves unless configured otherwise.
pub const DEFAULT_AUTOSAVE_INTERVAL: i64 = 30;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Config {
    pub autosave: AutosaveConfig,
    pub library: LibraryConfig,
    pub export: ExportConfig,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AutosaveConfig {
    /// Seconds between autosaves. Zero or less turns the timer off.
    pub interval: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LibraryConfig {
    /// Directory the document store keeps works, chapters and series in.
    pub root: PathBuf,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExportConfig {
    /// Directory finished packages are written to.
    pub directory: PathBuf,
}

impl Config {
    /// Loads and validates the configuration, reading `file` if given.
    #[instrument(level = "debug")]
    pub fn load(file: Option<&Path>) -> Result<Self> {
        Self::from_figment(Self::figment(file)?)
    }

    /// The layered sources without extracting them.
    pub fn figment(file: Option<&Path>) -> Result<Figment> {
        let mut figment = Figment::new().merge(Serialized::default("autosave.interval", DEFAULT_AUTOSAVE_INTERVAL));
        if let Some(dirs) = project_dirs() {
            figment = figment
                .merge(Serialized::default("library.root", dirs.data_dir().join("library")))
                .merge(Serialized::default("export.directory", default_export_directory(&dirs)));
        }
        if let Some(path) = file {
            if !path.is_file() {
                exn::bail!(ErrorKind::NotFound(path.to_path_buf()));
            }
            let extension = path.extension().and_then(|ext| ext.to_str()).map(str::to_ascii_lowercase);
            figment = match extension.as_deref() {
                Some("toml") => figment.merge(Toml::file_exact(path)),
                Some("yaml" | "yml") => figment.merge(Yaml::file_exact(path)),
                Some("json") => figment.merge(Json::file_exact(path)),
                _ => exn::bail!(ErrorKind::UnsupportedFormat(path.to_path_buf())),
            };
        }
        Ok(figment.merge(Env::prefixed(ENV_PREFIX).split("__")))
    }

    /// Extracts and validates a configuration from arbitrary sources.
    pub fn from_figment(figment: Figment) -> Result<Self> {
        let config: Config = figment.extract().or_raise(|| ErrorKind::Parse)?;
        config.validate()?;
        debug!(?config, "configuration loaded");
        Ok(config)
    }

    fn validate(&self) -> Result<()> {
        if !self.library.root.is_absolute() {
            exn::bail!(ErrorKind::Invalid("library.root"));
        }
        if !self.export.directory.is_absolute() {
            exn::bail!(ErrorKind::Invalid("export.directory"));
        }
        Ok(())
    }

    /// The autosave period, or `None` when autosave is turned off.
    pub fn interval(&self) -> Option<Duration> {
        u64::try_from(self.autosave.interval)
            .ok()
            .filter(|secs| *secs > 0)
            .map(Duration::from_secs)
    }
}

fn project_dirs() -> Option<ProjectDirs> {
    ProjectDirs::from("", "", "inkstone")
}

fn default_export_directory(dirs: &ProjectDirs) -> PathBuf {
    UserDirs::new()
        .and_then(|user| user.document_dir().map(|docs| docs.join("inkstone")))
        .unwrap_or_else(|| dirs.data_dir().join("exports"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use figment::Jail;
    use rstest::rstest;

    const TOML: &str = r#"
[autosave]
interval = 10

[library]
root = "/srv/inkstone/library"

[export]
directory = "/srv/inkstone/exports"
"#;

    // Every test that reaches the environment provider runs in a jail, which
    // serializes them and restores the environment afterwards.

    #[test]
    fn test_load_toml() {
        Jail::expect_with(|jail| {
            jail.create_file("inkstone.toml", TOML)?;
            let config = Config::load(Some(&jail.directory().join("inkstone.toml"))).unwrap();
            assert_eq!(config.autosave.interval, 10);
            assert_eq!(config.interval(), Some(Duration::from_secs(10)));
            assert_eq!(config.library.root, PathBuf::from("/srv/inkstone/library"));
            assert_eq!(config.export.directory, PathBuf::from("/srv/inkstone/exports"));
            Ok(())
        });
    }

    #[test]
    fn test_load_yaml_and_json() {
        Jail::expect_with(|jail| {
            jail.create_file("inkstone.yml", "autosave:\n  interval: 5\nlibrary:\n  root: /a\nexport:\n  directory: /b\n")?;
            jail.create_file(
                "inkstone.json",
                r#"{"autosave": {"interval": 5}, "library": {"root": "/a"}, "export": {"directory": "/b"}}"#,
            )?;
            let from_yaml = Config::load(Some(&jail.directory().join("inkstone.yml"))).unwrap();
            let from_json = Config::load(Some(&jail.directory().join("inkstone.json"))).unwrap();
            assert_eq!(from_yaml, from_json);
            assert_eq!(from_yaml.interval(), Some(Duration::from_secs(5)));
            Ok(())
        });
    }

    #[test]
    fn test_defaults() {
        Jail::expect_with(|jail| {
            jail.set_env("INKSTONE_LIBRARY__ROOT", "/a");
            jail.set_env("INKSTONE_EXPORT__DIRECTORY", "/b");
            let config = Config::load(None).unwrap();
            assert_eq!(config.autosave.interval, DEFAULT_AUTOSAVE_INTERVAL);
            assert_eq!(config.interval(), Some(Duration::from_secs(30)));
            Ok(())
        });
    }

    #[rstest]
    #[case(30, Some(Duration::from_secs(30)))]
    #[case(1, Some(Duration::from_secs(1)))]
    #[case(0, None)]
    #[case(-1, None)]
    fn test_interval(#[case] secs: i64, #[case] expected: Option<Duration>) {
        let config = Config {
            autosave: AutosaveConfig { interval: secs },
            library: LibraryConfig { root: "/a".into() },
            export: ExportConfig { directory: "/b".into() },
        };
        assert_eq!(config.interval(), expected);
    }

    #[test]
    fn test_environment_overrides_file() {
        Jail::expect_with(|jail| {
            jail.create_file("inkstone.toml", TOML)?;
            jail.set_env("INKSTONE_AUTOSAVE__INTERVAL", "-5");
            jail.set_env("INKSTONE_EXPORT__DIRECTORY", "/tmp/out");
            let config = Config::load(Some(&jail.directory().join("inkstone.toml"))).unwrap();
            assert_eq!(config.interval(), None);
            assert_eq!(config.library.root, PathBuf::from("/srv/inkstone/library"));
            assert_eq!(config.export.directory, PathBuf::from("/tmp/out"));
            Ok(())
        });
    }

    #[test]
    fn test_relative_paths_are_rejected() {
        Jail::expect_with(|jail| {
            jail.set_env("INKSTONE_LIBRARY__ROOT", "relative/library");
            jail.set_env("INKSTONE_EXPORT__DIRECTORY", "/b");
            let err = Config::load(None).unwrap_err();
            assert_eq!(*err, ErrorKind::Invalid("library.root"));
            Ok(())
        });
    }

    #[test]
    fn test_wrong_type_fails_to_parse() {
        Jail::expect_with(|jail| {
            jail.create_file("inkstone.toml", "[autosave]\ninterval = \"soon\"\n")?;
            let err = Config::load(Some(&jail.directory().join("inkstone.toml"))).unwrap_err();
            assert_eq!(*err, ErrorKind::Parse);
            Ok(())
        });
    }

    #[test]
    fn test_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("absent.toml");
        let err = Config::load(Some(&path)).unwrap_err();
        assert_eq!(*err, ErrorKind::NotFound(path));
    }

    #[test]
    fn test_unsupported_format() {
        let file = tempfile::Builder::new().suffix(".ini").tempfile().unwrap();
        let err = Config::load(Some(file.path())).unwrap_err();
        assert!(matches!(&*err, ErrorKind::UnsupportedFormat(_)));
    }
}

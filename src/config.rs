use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use chrono::format::{Item, StrftimeItems};
use secrecy::SecretString;
use serde::{Deserialize, Deserializer, Serialize};

use crate::engine::EngineConfig;

const CONFIG_FILE_NAME: &str = "hodlbook.toml";

fn default_ledger_paths() -> Vec<PathBuf> {
    vec![PathBuf::from("transactions.json")]
}

fn default_quotes_path() -> PathBuf {
    PathBuf::from("quotes.jsonl")
}

fn default_date_format() -> String {
    "%d/%m/%Y".to_string()
}

fn deserialize_secret<'de, D>(deserializer: D) -> Result<Option<SecretString>, D::Error>
where
    D: Deserializer<'de>,
{
    let value: Option<String> = Option::deserialize(deserializer)?;
    Ok(value
        .filter(|token| !token.trim().is_empty())
        .map(SecretString::from))
}

/// Where the transaction ledger lives.
#[derive(Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct LedgerConfig {
    /// JSON files or directories of `*.json` files. Relative paths are
    /// resolved from the config file location.
    #[serde(default = "default_ledger_paths")]
    pub paths: Vec<PathBuf>,

    /// Read the ledger from this GitHub gist instead of local files.
    pub gist_id: Option<String>,

    /// Optional GitHub token for gist access.
    #[serde(deserialize_with = "deserialize_secret", skip_serializing)]
    pub github_token: Option<SecretString>,
}

impl Default for LedgerConfig {
    fn default() -> Self {
        Self {
            paths: default_ledger_paths(),
            gist_id: None,
            github_token: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct QuotesConfig {
    /// JSON array or JSONL file of daily quotes.
    #[serde(default = "default_quotes_path")]
    pub path: PathBuf,
}

impl Default for QuotesConfig {
    fn default() -> Self {
        Self {
            path: default_quotes_path(),
        }
    }
}

/// Display/output formatting configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DisplayConfig {
    /// `chrono` format string for dates in human-facing output.
    #[serde(default = "default_date_format")]
    pub date_format: String,

    /// When true, render fiat values with thousands separators.
    pub currency_grouping: bool,
}

impl Default for DisplayConfig {
    fn default() -> Self {
        Self {
            date_format: default_date_format(),
            currency_grouping: false,
        }
    }
}

/// Application configuration.
#[derive(Debug, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub engine: EngineConfig,
    pub ledger: LedgerConfig,
    pub quotes: QuotesConfig,
    pub display: DisplayConfig,
}

impl Config {
    /// Load config from a TOML file.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let config: Config = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;

        Ok(config)
    }

    /// Load config from a file, or return default config if file doesn't exist.
    pub fn load_or_default(path: &Path) -> Result<Self> {
        if path.exists() {
            Self::load(path)
        } else {
            Ok(Self::default())
        }
    }

    /// Resolve the config into concrete input locations.
    ///
    /// Relative paths are resolved against `config_dir`.
    pub fn resolve(self, config_dir: &Path) -> Result<ResolvedConfig> {
        let Config {
            engine,
            ledger,
            quotes,
            display,
        } = self;

        if StrftimeItems::new(&display.date_format).any(|item| matches!(item, Item::Error)) {
            bail!("display.date_format is not a valid format: {:?}", display.date_format);
        }

        let ledger = match ledger.gist_id {
            Some(id) if !id.trim().is_empty() => LedgerLocation::Gist {
                id: id.trim().to_string(),
                token: ledger.github_token,
            },
            _ => {
                if ledger.paths.is_empty() {
                    bail!("ledger.paths must name at least one file or directory");
                }
                LedgerLocation::Files(
                    ledger
                        .paths
                        .iter()
                        .map(|path| resolve_path(config_dir, path))
                        .collect(),
                )
            }
        };

        Ok(ResolvedConfig {
            engine,
            ledger,
            quotes_path: resolve_path(config_dir, &quotes.path),
            display,
        })
    }
}

fn resolve_path(config_dir: &Path, path: &Path) -> PathBuf {
    if path.is_absolute() {
        path.to_path_buf()
    } else {
        config_dir.join(path)
    }
}

#[derive(Debug)]
pub enum LedgerLocation {
    Files(Vec<PathBuf>),
    Gist {
        id: String,
        token: Option<SecretString>,
    },
}

/// Loaded configuration with resolved paths.
#[derive(Debug)]
pub struct ResolvedConfig {
    pub engine: EngineConfig,
    pub ledger: LedgerLocation,
    pub quotes_path: PathBuf,
    pub display: DisplayConfig,
}

impl ResolvedConfig {
    /// Load and resolve config from a file path.
    ///
    /// Paths are resolved relative to the config file's parent directory.
    pub fn load(config_path: &Path) -> Result<Self> {
        let config_path = config_path
            .canonicalize()
            .with_context(|| format!("Config file not found: {}", config_path.display()))?;

        let config_dir = config_path
            .parent()
            .context("Config file has no parent directory")?;

        Config::load(&config_path)?.resolve(config_dir)
    }

    /// Load config, falling back to defaults if the file doesn't exist.
    ///
    /// Without a file, paths resolve against the directory the config file
    /// would live in.
    pub fn load_or_default(config_path: &Path) -> Result<Self> {
        if config_path.exists() {
            return Self::load(config_path);
        }

        let config_path = if config_path.is_relative() {
            std::env::current_dir()
                .context("Failed to get current directory")?
                .join(config_path)
        } else {
            config_path.to_path_buf()
        };

        let config_dir = config_path
            .parent()
            .context("Config path has no parent directory")?;

        Config::default().resolve(config_dir)
    }
}

/// Returns the default config file path.
///
/// Resolution order:
/// 1. `./hodlbook.toml` if it exists in current directory
/// 2. `~/.config/hodlbook/hodlbook.toml` (XDG config directory)
pub fn default_config_path() -> PathBuf {
    let local_config = PathBuf::from(CONFIG_FILE_NAME);
    if local_config.exists() {
        return local_config;
    }

    if let Some(config_dir) = dirs::config_dir() {
        return config_dir.join("hodlbook").join(CONFIG_FILE_NAME);
    }

    local_config
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::quotes::PriceConvention;
    use secrecy::ExposeSecret;
    use std::io::Write;
    use tempfile::TempDir;

    #[test]
    fn test_default_paths_resolve_against_config_dir() -> Result<()> {
        let resolved = Config::default().resolve(Path::new("/home/user/crypto"))?;
        match resolved.ledger {
            LedgerLocation::Files(paths) => assert_eq!(
                paths,
                vec![PathBuf::from("/home/user/crypto/transactions.json")]
            ),
            other => panic!("unexpected ledger location: {other:?}"),
        }
        assert_eq!(
            resolved.quotes_path,
            PathBuf::from("/home/user/crypto/quotes.jsonl")
        );
        Ok(())
    }

    #[test]
    fn test_absolute_paths_are_kept() -> Result<()> {
        let config = Config {
            ledger: LedgerConfig {
                paths: vec![PathBuf::from("/var/ledger"), PathBuf::from("more")],
                ..Default::default()
            },
            ..Default::default()
        };
        let resolved = config.resolve(Path::new("/etc/hodlbook"))?;
        match resolved.ledger {
            LedgerLocation::Files(paths) => assert_eq!(
                paths,
                vec![
                    PathBuf::from("/var/ledger"),
                    PathBuf::from("/etc/hodlbook/more")
                ]
            ),
            other => panic!("unexpected ledger location: {other:?}"),
        }
        Ok(())
    }

    #[test]
    fn test_gist_takes_precedence() -> Result<()> {
        let config: Config = toml::from_str(
            r#"
[ledger]
gist_id = "abc123"
github_token = "ghp_secret"
"#,
        )?;
        match config.resolve(Path::new("/tmp"))?.ledger {
            LedgerLocation::Gist { id, token } => {
                assert_eq!(id, "abc123");
                assert_eq!(token.map(|t| t.expose_secret().to_string()), Some("ghp_secret".to_string()));
            }
            other => panic!("unexpected ledger location: {other:?}"),
        }
        Ok(())
    }

    #[test]
    fn test_empty_paths_are_rejected() {
        let config: Config = toml::from_str("[ledger]\npaths = []\n").unwrap();
        assert!(config.resolve(Path::new("/tmp")).is_err());
    }

    #[test]
    fn test_invalid_date_format_is_rejected() {
        let config: Config = toml::from_str("[display]\ndate_format = \"%d/%Q\"\n").unwrap();
        let err = config.resolve(Path::new("/tmp")).unwrap_err();
        assert!(err.to_string().contains("date_format"));

        let config: Config = toml::from_str("[display]\ndate_format = \"%Y-%m-%d\"\n").unwrap();
        assert!(config.resolve(Path::new("/tmp")).is_ok());
    }

    #[test]
    fn test_token_is_not_serialized() -> Result<()> {
        let config: Config = toml::from_str("[ledger]\ngithub_token = \"ghp_secret\"\n")?;
        let rendered = toml::to_string(&config)?;
        assert!(!rendered.contains("ghp_secret"));
        assert!(!format!("{config:?}").contains("ghp_secret"));
        Ok(())
    }

    #[test]
    fn test_load_config() -> Result<()> {
        let dir = TempDir::new()?;
        let config_path = dir.path().join("hodlbook.toml");

        let mut file = std::fs::File::create(&config_path)?;
        writeln!(file, "[engine]")?;
        writeln!(file, "price_convention = \"open_close_average\"")?;
        writeln!(file, "[quotes]")?;
        writeln!(file, "path = \"data/quotes.json\"")?;
        writeln!(file, "[display]")?;
        writeln!(file, "currency_grouping = true")?;

        let config = Config::load(&config_path)?;
        assert_eq!(
            config.engine.price_convention,
            PriceConvention::OpenCloseAverage
        );
        assert_eq!(config.quotes.path, PathBuf::from("data/quotes.json"));
        assert!(config.display.currency_grouping);
        assert_eq!(config.display.date_format, "%d/%m/%Y");

        let resolved = ResolvedConfig::load(&config_path)?;
        assert!(resolved.quotes_path.ends_with("data/quotes.json"));

        Ok(())
    }

    #[test]
    fn test_load_empty_config() -> Result<()> {
        let dir = TempDir::new()?;
        let config_path = dir.path().join("hodlbook.toml");

        std::fs::File::create(&config_path)?;

        let config = Config::load(&config_path)?;
        assert_eq!(config.engine, EngineConfig::default());
        assert_eq!(config.ledger.paths, default_ledger_paths());

        Ok(())
    }

    #[test]
    fn test_missing_config_uses_defaults() -> Result<()> {
        let dir = TempDir::new()?;
        let resolved = ResolvedConfig::load_or_default(&dir.path().join("hodlbook.toml"))?;
        assert_eq!(resolved.quotes_path, dir.path().join("quotes.jsonl"));
        Ok(())
    }
}

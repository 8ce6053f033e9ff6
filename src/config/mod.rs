//! Configuration management.
//!
//! Configuration comes from a TOML file, then environment variables (a
//! `.env` file in the working directory is loaded first), then CLI flags.
//!
//! ```toml
//! [database]
//! path = "tenders.db"
//! tender_table = "tender_data"
//! bidder_table = "bidder_list"
//!
//! [search]
//! max_rows = 10
//!
//! [bidders]
//! page_size = 20
//!
//! [llm]
//! model = "claude-3-haiku-20240307"
//! timeout_ms = 30000
//!
//! [mail]
//! from_address = "procurement@example.com"
//!
//! [logging]
//! format = "json"
//! level = "info"
//! ```

mod tables;

pub use tables::{TableNames, validate_identifier};

use crate::search::DEFAULT_MAX_ROWS;
use secrecy::SecretString;
use serde::Deserialize;
use std::path::{Path, PathBuf};

/// Main configuration for tenderscope.
#[derive(Debug, Clone)]
pub struct TenderscopeConfig {
    /// Path to the `SQLite` database.
    pub db_path: PathBuf,
    /// Tender and bidder table names.
    pub tables: TableNames,
    /// Maximum supplier rows returned by a search.
    pub search_max_rows: usize,
    /// Bidders per page.
    pub page_size: u32,
    /// LLM provider configuration.
    pub llm: LlmConfig,
    /// Outbound mail configuration.
    pub mail: MailConfig,
    /// Logging configuration.
    pub logging: LoggingSettings,
}

/// LLM provider configuration.
#[derive(Debug, Clone, Default)]
pub struct LlmConfig {
    /// Model name.
    pub model: Option<String>,
    /// API key.
    pub api_key: Option<SecretString>,
    /// Base URL override.
    pub base_url: Option<String>,
    /// Request timeout in milliseconds.
    pub timeout_ms: Option<u64>,
    /// Connect timeout in milliseconds.
    pub connect_timeout_ms: Option<u64>,
}

/// Outbound mail configuration.
#[derive(Debug, Clone)]
pub struct MailConfig {
    /// Sender address for requests for quotation.
    pub from_address: String,
    /// Subject line for requests for quotation.
    pub subject: String,
}

impl Default for MailConfig {
    fn default() -> Self {
        Self {
            from_address: "procurement@localhost".to_string(),
            subject: "Request for quotation".to_string(),
        }
    }
}

/// Logging settings as written in the config file.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct LoggingSettings {
    /// `pretty` or `json`.
    pub format: Option<String>,
    /// Default level or filter directive (e.g. `info`, `tenderscope=debug`).
    pub level: Option<String>,
    /// Append logs to this file instead of stderr.
    pub file: Option<PathBuf>,
}

/// Configuration file structure (for TOML parsing).
#[derive(Debug, Deserialize, Default)]
#[serde(deny_unknown_fields)]
pub struct ConfigFile {
    /// Database section.
    pub database: Option<ConfigFileDatabase>,
    /// Search section.
    pub search: Option<ConfigFileSearch>,
    /// Bidder browsing section.
    pub bidders: Option<ConfigFileBidders>,
    /// LLM section.
    pub llm: Option<ConfigFileLlm>,
    /// Mail section.
    pub mail: Option<ConfigFileMail>,
    /// Logging section.
    pub logging: Option<LoggingSettings>,
}

/// Database section in config file.
#[derive(Debug, Deserialize, Default)]
pub struct ConfigFileDatabase {
    /// Database path.
    pub path: Option<String>,
    /// Tender table name.
    pub tender_table: Option<String>,
    /// Bidder table name.
    pub bidder_table: Option<String>,
}

/// Search section in config file.
#[derive(Debug, Deserialize, Default)]
pub struct ConfigFileSearch {
    /// Row cap.
    pub max_rows: Option<usize>,
}

/// Bidders section in config file.
#[derive(Debug, Deserialize, Default)]
pub struct ConfigFileBidders {
    /// Page size.
    pub page_size: Option<u32>,
}

/// LLM section in config file.
#[derive(Debug, Deserialize, Default)]
pub struct ConfigFileLlm {
    /// Model name.
    pub model: Option<String>,
    /// API key.
    pub api_key: Option<String>,
    /// Base URL.
    pub base_url: Option<String>,
    /// Request timeout.
    pub timeout_ms: Option<u64>,
    /// Connect timeout.
    pub connect_timeout_ms: Option<u64>,
}

/// Mail section in config file.
#[derive(Debug, Deserialize, Default)]
pub struct ConfigFileMail {
    /// Sender address.
    pub from_address: Option<String>,
    /// Subject line.
    pub subject: Option<String>,
}

impl Default for TenderscopeConfig {
    fn default() -> Self {
        Self {
            db_path: PathBuf::from("tenderscope.db"),
            tables: TableNames::default(),
            search_max_rows: DEFAULT_MAX_ROWS,
            page_size: 20,
            llm: LlmConfig::default(),
            mail: MailConfig::default(),
            logging: LoggingSettings::default(),
        }
    }
}

impl TenderscopeConfig {
    /// Creates a new configuration with default values.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Loads configuration from a file path and applies environment overrides.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed, or if a table
    /// name is not a plain identifier.
    pub fn load_from_file(path: &Path) -> crate::Result<Self> {
        let contents =
            std::fs::read_to_string(path).map_err(|e| crate::Error::OperationFailed {
                operation: "read_config_file".to_string(),
                cause: format!("{}: {e}", path.display()),
            })?;

        Self::from_toml(&contents)?.with_env_overrides()
    }

    /// Parses configuration from TOML text.
    ///
    /// # Errors
    ///
    /// Returns an error if the text is not valid configuration.
    pub fn from_toml(contents: &str) -> crate::Result<Self> {
        let file: ConfigFile =
            toml::from_str(contents).map_err(|e| crate::Error::OperationFailed {
                operation: "parse_config_file".to_string(),
                cause: e.to_string(),
            })?;

        Self::from_config_file(file)
    }

    /// Loads configuration from the default location.
    ///
    /// Checks, in order, `TENDERSCOPE_CONFIG_PATH` and the platform config
    /// directory (`tenderscope/config.toml`). Falls back to defaults plus
    /// environment overrides when no file exists.
    ///
    /// # Errors
    ///
    /// Returns an error if a config file exists but is invalid.
    pub fn load_default() -> crate::Result<Self> {
        if let Ok(config_path) = std::env::var("TENDERSCOPE_CONFIG_PATH") {
            if !config_path.trim().is_empty() {
                return Self::load_from_file(Path::new(&config_path));
            }
        }

        if let Some(dirs) = directories::ProjectDirs::from("", "", "tenderscope") {
            let platform_config = dirs.config_dir().join("config.toml");
            if platform_config.exists() {
                return Self::load_from_file(&platform_config);
            }
        }

        Self::default().with_env_overrides()
    }

    /// Converts a `ConfigFile` to `TenderscopeConfig`.
    fn from_config_file(file: ConfigFile) -> crate::Result<Self> {
        let mut config = Self::default();

        if let Some(db) = file.database {
            if let Some(path) = db.path {
                config.db_path = PathBuf::from(path);
            }
            config.tables = TableNames::new(
                db.tender_table.as_deref().unwrap_or(&config.tables.tender),
                db.bidder_table.as_deref().unwrap_or(&config.tables.bidder),
            )?;
        }
        if let Some(max_rows) = file.search.and_then(|s| s.max_rows) {
            config.search_max_rows = max_rows;
        }
        if let Some(page_size) = file.bidders.and_then(|b| b.page_size) {
            config.page_size = page_size;
        }
        if let Some(llm) = file.llm {
            config.llm = LlmConfig {
                model: llm.model,
                api_key: llm.api_key.map(SecretString::from),
                base_url: llm.base_url,
                timeout_ms: llm.timeout_ms,
                connect_timeout_ms: llm.connect_timeout_ms,
            };
        }
        if let Some(mail) = file.mail {
            if let Some(from) = mail.from_address {
                config.mail.from_address = from;
            }
            if let Some(subject) = mail.subject {
                config.mail.subject = subject;
            }
        }
        if let Some(logging) = file.logging {
            config.logging = logging;
        }

        Ok(config)
    }

    /// Applies environment variable overrides.
    ///
    /// # Errors
    ///
    /// Returns an error if an overridden table name is not a plain identifier.
    pub fn with_env_overrides(self) -> crate::Result<Self> {
        self.with_overrides_from(|key| std::env::var(key).ok())
    }

    fn with_overrides_from(mut self, lookup: impl Fn(&str) -> Option<String>) -> crate::Result<Self> {
        let var = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        if let Some(path) = var("TENDERSCOPE_DB_PATH") {
            self.db_path = PathBuf::from(path.trim());
        }
        let tender = var("TABLE_NAME_TENDER");
        let bidder = var("TABLE_NAME_BIDDER");
        if tender.is_some() || bidder.is_some() {
            self.tables = TableNames::new(
                tender.as_deref().unwrap_or(&self.tables.tender),
                bidder.as_deref().unwrap_or(&self.tables.bidder),
            )?;
        }
        if let Some(max_rows) = var("TENDERSCOPE_SEARCH_MAX_ROWS").and_then(|v| v.trim().parse().ok())
        {
            self.search_max_rows = max_rows;
        }
        if let Some(model) = var("TENDERSCOPE_LLM_MODEL") {
            self.llm.model = Some(model);
        }
        if let Some(key) = var("ANTHROPIC_API_KEY") {
            self.llm.api_key = Some(SecretString::from(key.trim().to_string()));
        }
        if let Some(from) = var("TENDERSCOPE_MAIL_FROM") {
            self.mail.from_address = from;
        }
        Ok(self)
    }

    /// Sets the database path.
    #[must_use]
    pub fn with_db_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.db_path = path.into();
        self
    }
}

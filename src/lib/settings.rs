use config::{Config, ConfigError, Environment, File, FileFormat};
use secrecy::Secret;
use std::fs;
use thiserror::Error;

#[derive(serde::Deserialize, Debug)]
pub struct Settings {
    // Connection string for the bot database, never logged
    pub database_url: Secret<String>,
    // What environment - local, dev, prod
    #[serde(default = "default_environment")]
    pub environment: String,
    #[serde(default = "default_log_level")]
    pub log_level: String,
    // Empty disables error reporting
    #[serde(default)]
    pub sentry_dsn: String,
    #[serde(default = "default_statsd_host")]
    pub statsd_host: String,
    #[serde(default = "default_statsd_port")]
    pub statsd_port: u16,
}

fn default_environment() -> String {
    "local".to_string()
}
fn default_log_level() -> String {
    "info".to_string()
}
fn default_statsd_host() -> String {
    "127.0.0.1".to_string()
}
fn default_statsd_port() -> u16 {
    8125
}

#[derive(Debug, Error)]
pub enum SettingsError {
    #[error("Given settings file is not a file: {0}")]
    NotAFile(String),
    #[error("Unexpected error when loading metadata for {path}: {source}")]
    Metadata {
        path: String,
        source: std::io::Error,
    },
    #[error("Config couldn't be built. {0}")]
    Build(ConfigError),
    #[error("Config didn't match serialization. {0}")]
    Deserialize(ConfigError),
}

#[cfg_attr(test, mockall::automock)]
pub trait HasFile {
    fn file(&self) -> &str;
}
pub struct SettingsFile {}
impl HasFile for SettingsFile {
    fn file(&self) -> &str {
        "settings.yaml"
    }
}

fn _get_settings(settings: impl HasFile) -> Result<Settings, SettingsError> {
    let mut builder = Config::builder();
    // Either we use a settings.yaml file, or environment variables
    let settings_file = settings.file();
    builder = match fs::metadata(settings_file) {
        Ok(metadata) if metadata.is_file() => {
            builder.add_source(File::new(settings_file, FileFormat::Yaml))
        }
        Ok(_) => return Err(SettingsError::NotAFile(settings_file.to_string())),
        Err(error) => match error.kind() {
            std::io::ErrorKind::NotFound => builder.add_source(Environment::default()),
            _ => {
                return Err(SettingsError::Metadata {
                    path: settings_file.to_string(),
                    source: error,
                })
            }
        },
    };
    let config = builder.build().map_err(SettingsError::Build)?;
    config
        .try_deserialize::<Settings>()
        .map_err(SettingsError::Deserialize)
}

pub fn get_settings() -> Result<Settings, SettingsError> {
    _get_settings(SettingsFile {})
}

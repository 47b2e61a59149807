use connectors::file::csv::error::FileError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum CliError {
    #[error("Failed to read the settings file: {0}")]
    SettingsRead(#[from] std::io::Error),

    #[error("Failed to parse the settings file as JSON: {0}")]
    SettingsParse(serde_json::Error),

    #[error("Failed to serialize data to JSON: {0}")]
    JsonSerialize(serde_json::Error),

    #[error(transparent)]
    Source(#[from] FileError),

    #[error("Interrupted; resume with cursor '{0}'")]
    Interrupted(String),
}

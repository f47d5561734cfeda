use crate::config::LoggingConfig;
use thiserror::Error;
use tracing::Level;
use tracing::subscriber::SetGlobalDefaultError;
use tracing_subscriber::FmtSubscriber;

#[derive(Error, Debug)]
pub enum LoggingError {
    #[error("unknown log level: {level}")]
    UnknownLevel { level: String },

    #[error(transparent)]
    SetSubscriber(#[from] SetGlobalDefaultError),
}

/// Installs the global fmt subscriber at the configured level.
pub fn init(config: &LoggingConfig) -> Result<(), LoggingError> {
    let level = config
        .level
        .parse::<Level>()
        .map_err(|_| LoggingError::UnknownLevel { level: config.level.clone() })?;

    let subscriber = FmtSubscriber::builder().with_max_level(level).finish();
    tracing::subscriber::set_global_default(subscriber)?;
    Ok(())
}

use std::path::Path;

use serde::Deserialize;

use config::{Config, ConfigError};

#[derive(Debug, Deserialize)]
pub struct AppConfig {
    pub server: Server,
}

#[derive(Debug, Deserialize)]
pub struct Server {
    pub url: String,
}

impl AppConfig {
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        Config::builder()
            .add_source(config::File::from(path))
            .add_source(config::Environment::with_prefix("webrtsp"))
            .build()?
            .try_deserialize()
    }
}

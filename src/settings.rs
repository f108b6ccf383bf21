use std::env;

use serde::Deserialize;
use tracing::info;

#[derive(Clone, Deserialize, Debug)]
pub struct Config {
    pub env: Option<String>, // file / server
    pub host: String,
    pub port: u16,
    pub prefix: Option<String>,
    pub database_url: String,
    pub jwt_secret: String,
    pub jwt_exp: u16,
    pub jwt_refresh_exp: u16,
    pub redis_url: String,
    pub storage_path: Option<String>,
}

impl Config {
    /// Root directory of the local photo storage.
    pub fn storage_path(&self) -> String {
        self.storage_path
            .clone()
            .unwrap_or("./storage".to_string())
    }
}

pub fn get_config() -> Config {
    let env_var = env::var("ENV")
        .or_else(|_| env::var("env"))
        .unwrap_or("file".to_string());
    if env_var == "file" {
        info!("using .env file as environtment variable");
        let _ = dotenvy::dotenv();
    } else {
        info!("using server environtment as environtment variable");
    }
    envy::from_env::<Config>().expect("failed to read configuration from environment")
}

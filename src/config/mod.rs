//! Configuration module - environment variable parsing

use std::env;
use std::net::SocketAddr;

/// Application configuration loaded from environment variables
#[derive(Clone, Debug)]
pub struct Config {
    /// Server binding address
    pub server_addr: SocketAddr,
    /// Log level (trace, debug, info, warn, error)
    pub log_level: String,

    /// Allowed client origin for CORS (comma-separated for multiple)
    pub client_origin: String,

    /// Minimum connected players required to start a match
    pub min_players: usize,
    /// Countdown length before a match starts, in seconds
    pub countdown_secs: u32,
    /// Optional fixed seed for the spawn-point RNG (random if unset)
    pub game_seed: Option<u64>,
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self, ConfigError> {
        // Hosting platforms provide PORT, fall back to SERVER_ADDR or default
        let server_addr = if let Ok(port) = env::var("PORT") {
            format!("0.0.0.0:{}", port)
        } else {
            env::var("SERVER_ADDR").unwrap_or_else(|_| "0.0.0.0:8080".to_string())
        };

        let min_players = match env::var("MIN_PLAYERS") {
            Ok(v) => v
                .parse::<usize>()
                .map_err(|_| ConfigError::InvalidNumber("MIN_PLAYERS"))?,
            Err(_) => 2,
        };

        let countdown_secs = match env::var("COUNTDOWN_SECS") {
            Ok(v) => v
                .parse::<u32>()
                .map_err(|_| ConfigError::InvalidNumber("COUNTDOWN_SECS"))?,
            Err(_) => 5,
        };

        let game_seed = match env::var("GAME_SEED") {
            Ok(v) => Some(
                v.parse::<u64>()
                    .map_err(|_| ConfigError::InvalidNumber("GAME_SEED"))?,
            ),
            Err(_) => None,
        };

        Ok(Self {
            server_addr: server_addr
                .parse()
                .map_err(|_| ConfigError::InvalidAddress)?,

            log_level: env::var("LOG_LEVEL").unwrap_or_else(|_| "info".to_string()),

            client_origin: env::var("CLIENT_ORIGIN").unwrap_or_else(|_| "*".to_string()),

            min_players,
            countdown_secs,
            game_seed,
        })
    }
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid numeric value for environment variable: {0}")]
    InvalidNumber(&'static str),

    #[error("Invalid server address format")]
    InvalidAddress,
}

use std::env;
use std::net::{IpAddr, Ipv4Addr};
use std::str::FromStr;

use crate::constants::DEFAULT_EVENT_CHANNEL_CAPACITY;

#[derive(Debug, Clone)]
pub struct Config {
    pub host: IpAddr,
    pub port: u16,
    pub log_level: String,
    pub enable_file_logs: bool,
    pub log_dir: String,
    pub sled_path: String,
    pub cors_origin: String,
    /// Buffered domain events per SSE subscriber before it starts lagging.
    pub event_channel_capacity: usize,
    pub learning: LearningEnvConfig,
}

/// Learning tunables that operators commonly override.
#[derive(Debug, Clone)]
pub struct LearningEnvConfig {
    pub adjust_every: u32,
    pub difficulty_window: usize,
    pub default_batch_size: usize,
}

impl Config {
    pub fn from_env() -> Self {
        Self {
            host: env_or_parse("HOST", IpAddr::V4(Ipv4Addr::new(127, 0, 0, 1))),
            port: env_or_parse("PORT", 3000_u16),
            log_level: env_or("RUST_LOG", "info"),
            enable_file_logs: env_or_bool("ENABLE_FILE_LOGS", false),
            log_dir: env_or("LOG_DIR", "./logs"),
            sled_path: env_or("SLED_PATH", "./data/mastery.sled"),
            cors_origin: env_or("CORS_ORIGIN", "http://localhost:5173"),
            event_channel_capacity: env_or_parse(
                "EVENT_CHANNEL_CAPACITY",
                DEFAULT_EVENT_CHANNEL_CAPACITY,
            )
            .max(1),
            learning: LearningEnvConfig {
                adjust_every: env_or_parse("LEARNING_ADJUST_EVERY", 10_u32),
                difficulty_window: env_or_parse("LEARNING_DIFFICULTY_WINDOW", 20_usize).max(1),
                default_batch_size: match env_or_parse("LEARNING_DEFAULT_BATCH", 20_usize) {
                    0 => {
                        tracing::warn!("LEARNING_DEFAULT_BATCH must be positive, using default");
                        20
                    }
                    n => n,
                },
            },
        }
    }
}

pub fn env_or(key: &str, default: &str) -> String {
    env::var(key).unwrap_or_else(|_| default.to_string())
}

pub fn env_or_parse<T>(key: &str, default: T) -> T
where
    T: FromStr + Copy,
{
    match env::var(key) {
        Ok(raw) => match raw.parse::<T>() {
            Ok(v) => v,
            Err(_) => {
                tracing::warn!(
                    key,
                    value = %raw,
                    "Failed to parse env var, using default"
                );
                default
            }
        },
        Err(_) => default,
    }
}

pub fn env_or_bool(key: &str, default: bool) -> bool {
    match env::var(key) {
        Ok(raw) => match raw.trim().to_ascii_lowercase().as_str() {
            "1" | "true" | "yes" | "on" => true,
            "0" | "false" | "no" | "off" => false,
            _ => default,
        },
        Err(_) => default,
    }
}

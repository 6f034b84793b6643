//! Environment-driven configuration, loaded via `dotenvy` (.env first) then
//! the `config` crate layered over process environment variables. The
//! database setting is named `DATABASE_URL` and left optional: when unset
//! the binaries fall back to an in-memory store instead of refusing to
//! start.

use serde::Deserialize;

fn default_port() -> u16 {
    8080
}

fn default_server_url() -> String {
    "http://localhost:8080".to_string()
}

fn default_computing_power() -> usize {
    4
}

fn default_time_addition_ms() -> u64 {
    1000
}

fn default_time_subtraction_ms() -> u64 {
    1000
}

fn default_time_multiplication_ms() -> u64 {
    2000
}

fn default_time_division_ms() -> u64 {
    2000
}

fn default_shutdown_timeout_secs() -> u64 {
    10
}

fn default_jwt_secret() -> String {
    if cfg!(debug_assertions) {
        "dev-secret-do-not-use-in-production".to_string()
    } else {
        String::new()
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    #[serde(default = "default_port")]
    pub port: u16,

    #[serde(default)]
    pub database_url: Option<String>,

    #[serde(default = "default_jwt_secret")]
    pub jwt_secret: String,

    #[serde(default = "default_server_url")]
    pub server_url: String,

    #[serde(default = "default_computing_power")]
    pub computing_power: usize,

    #[serde(default = "default_time_addition_ms")]
    pub time_addition_ms: u64,
    #[serde(default = "default_time_subtraction_ms")]
    pub time_subtraction_ms: u64,
    #[serde(default = "default_time_multiplication_ms")]
    pub time_multiplication_ms: u64,
    #[serde(default = "default_time_division_ms")]
    pub time_division_ms: u64,

    #[serde(default = "default_shutdown_timeout_secs")]
    pub shutdown_timeout_secs: u64,
}

impl AppConfig {
    /// Loads `.env` (if present), then environment variables, falling
    /// back to the documented defaults for anything unset.
    pub fn load() -> Result<Self, config::ConfigError> {
        dotenvy::dotenv().ok();

        let cfg = config::Config::builder()
            .set_default("port", default_port() as i64)?
            .set_default("server_url", default_server_url())?
            .set_default("computing_power", default_computing_power() as i64)?
            .set_default("time_addition_ms", default_time_addition_ms() as i64)?
            .set_default("time_subtraction_ms", default_time_subtraction_ms() as i64)?
            .set_default(
                "time_multiplication_ms",
                default_time_multiplication_ms() as i64,
            )?
            .set_default("time_division_ms", default_time_division_ms() as i64)?
            .set_default(
                "shutdown_timeout_secs",
                default_shutdown_timeout_secs() as i64,
            )?
            .set_default("jwt_secret", default_jwt_secret())?
            .add_source(config::Environment::default())
            .build()?;

        cfg.try_deserialize()
    }

    /// Operation time for a given operator, per the configuration table.
    pub fn operation_time_ms(&self, op: crate::types::Operation) -> u64 {
        use crate::types::Operation;
        match op {
            Operation::Add => self.time_addition_ms,
            Operation::Subtract => self.time_subtraction_ms,
            Operation::Multiply => self.time_multiplication_ms,
            Operation::Divide => self.time_division_ms,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_operation_time_defaults() {
        let cfg = AppConfig {
            port: 8080,
            database_url: None,
            jwt_secret: "x".into(),
            server_url: default_server_url(),
            computing_power: 4,
            time_addition_ms: 1000,
            time_subtraction_ms: 1000,
            time_multiplication_ms: 2000,
            time_division_ms: 2000,
            shutdown_timeout_secs: 10,
        };
        assert_eq!(cfg.operation_time_ms(crate::types::Operation::Add), 1000);
        assert_eq!(
            cfg.operation_time_ms(crate::types::Operation::Multiply),
            2000
        );
    }
}

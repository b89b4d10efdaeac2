//! Server configuration module

use anyhow::{Result, anyhow};
use piispan::config::{ConfigLoader, LoggingConfig, PiiConfig, RuntimeConfig, validate_config};
use std::fmt::Display;
use std::path::PathBuf;
use std::str::FromStr;

use crate::cli::CliArgs;

pub const DEFAULT_HOST: &str = "0.0.0.0";
pub const DEFAULT_PORT: u16 = 8000;
pub const DEFAULT_MAX_REQUEST_SIZE: usize = 2 * 1024 * 1024;

/// Origins always allowed once an explicit CORS allow-list is configured
pub const DEFAULT_CORS_ORIGINS: [&str; 4] = [
    "http://localhost:3000",
    "http://127.0.0.1:3000",
    "http://localhost:5173",
    "http://127.0.0.1:5173",
];

/// Server configuration
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Address to bind
    pub host: String,

    /// Port to listen on
    pub port: u16,

    /// Maximum request body size in bytes
    pub max_request_size: usize,

    /// Maximum number of inference calls running at once
    pub inference_concurrency: usize,

    /// Extra CORS origins; empty allows any origin
    pub cors_allow_origins: Vec<String>,

    /// Model runtime options
    pub runtime: RuntimeConfig,

    /// Logging options
    pub logging: LoggingConfig,

    /// Problems that were tolerated while loading, reported on /health
    pub warnings: Vec<String>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: DEFAULT_HOST.to_string(),
            port: DEFAULT_PORT,
            max_request_size: DEFAULT_MAX_REQUEST_SIZE,
            inference_concurrency: default_concurrency(),
            cors_allow_origins: Vec::new(),
            runtime: RuntimeConfig::default(),
            logging: LoggingConfig::default(),
            warnings: Vec::new(),
        }
    }
}

impl ServerConfig {
    /// Load configuration from the process environment
    pub fn from_env(cli_args: CliArgs) -> Result<Self> {
        Self::from_cli_and_env(cli_args, |key| std::env::var(key).ok())
    }

    /// Load configuration from CLI arguments and an environment lookup
    ///
    /// CLI arguments take precedence over environment variables, which take
    /// precedence over the config file. Blank environment values count as unset.
    pub fn from_cli_and_env<F>(cli_args: CliArgs, lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let env = |key: &str| {
            lookup(key)
                .map(|value| value.trim().to_string())
                .filter(|value| !value.is_empty())
        };

        let mut warnings = Vec::new();
        let PiiConfig {
            mut runtime,
            mut logging,
        } = match &cli_args.config_file {
            Some(path) => {
                let mut loader = ConfigLoader::new();
                match loader.load_file(path).and_then(|loader| loader.extract()) {
                    Ok(config) => config,
                    Err(e) => {
                        warnings.push(format!(
                            "Failed to load config file {}: {}. Using defaults.",
                            path.display(),
                            e
                        ));
                        PiiConfig::default()
                    }
                }
            }
            None => match ConfigLoader::new().load_default_files().extract() {
                Ok(config) => config,
                Err(e) => {
                    warnings.push(format!("Ignoring default config file: {}", e));
                    PiiConfig::default()
                }
            },
        };

        let mut config = Self::default();

        if let Some(host) = cli_args.host {
            config.host = host;
        } else if let Some(host) = env("HOST") {
            config.host = host;
        }

        if let Some(port) = cli_args.port {
            config.port = port;
        } else if let Some(port) = env("PORT") {
            config.port = parse_setting("PORT", &port)?;
        }

        if let Some(max_size) = cli_args.max_request_size {
            config.max_request_size = max_size;
        } else if let Some(max_size) = env("MAX_REQUEST_SIZE") {
            config.max_request_size = parse_setting("MAX_REQUEST_SIZE", &max_size)?;
        }

        if let Some(concurrency) = cli_args.inference_concurrency {
            config.inference_concurrency = concurrency;
        } else if let Some(concurrency) = env("INFERENCE_CONCURRENCY") {
            config.inference_concurrency = parse_setting("INFERENCE_CONCURRENCY", &concurrency)?;
        }
        if config.inference_concurrency == 0 {
            warnings.push("INFERENCE_CONCURRENCY must be at least 1; using 1".to_string());
            config.inference_concurrency = 1;
        }

        if let Some(origins) = cli_args.cors_allow_origins.or_else(|| env("CORS_ALLOW_ORIGINS")) {
            config.cors_allow_origins = parse_origins(&origins);
        }

        // Model runtime
        if let Some(model_dir) = cli_args.model_dir {
            runtime.model_dir = model_dir;
        } else if let Some(model_dir) = env("MODEL_DIR") {
            runtime.model_dir = PathBuf::from(model_dir);
        }

        if let Some(device) = cli_args.device.or_else(|| env("DEVICE")) {
            runtime.device = Some(device);
        }

        if let Some(strategy) = cli_args
            .aggregation_strategy
            .or_else(|| env("AGGREGATION_STRATEGY"))
        {
            runtime.aggregation_strategy = strategy;
        }

        if let Some(raw) = cli_args.score_threshold.or_else(|| env("SCORE_THRESHOLD")) {
            runtime.score_threshold = parse_threshold(&raw);
            if runtime.score_threshold.is_none() {
                warnings.push(format!(
                    "Ignoring invalid SCORE_THRESHOLD '{}'; no threshold applied",
                    raw
                ));
            }
        }

        if let Some(warmup) = cli_args.warmup {
            runtime.warmup = warmup;
        } else if let Some(warmup) = env("WARMUP") {
            runtime.warmup = parse_warmup(&warmup);
        }

        if let Some(length) = cli_args.max_seq_length {
            runtime.max_seq_length = Some(length);
        } else if let Some(length) = env("MAX_SEQ_LENGTH") {
            runtime.max_seq_length = Some(parse_setting("MAX_SEQ_LENGTH", &length)?);
        }

        // Logging
        if let Some(level) = cli_args.log_level.or_else(|| env("LOG_LEVEL")) {
            logging.level = parse_setting("LOG_LEVEL", &level)?;
        }

        if let Some(format) = cli_args.log_format.or_else(|| env("LOG_FORMAT")) {
            logging.format = parse_setting("LOG_FORMAT", &format)?;
        }

        let pii = PiiConfig { runtime, logging };
        validate_config(&pii)?;

        config.runtime = pii.runtime;
        config.logging = pii.logging;
        config.warnings = warnings;
        Ok(config)
    }

    /// `host:port` for the listener; the host may be a name or an address
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// Device as configured, `auto` when left to detection
    pub fn configured_device(&self) -> &str {
        self.runtime.device.as_deref().unwrap_or("auto")
    }

    /// Origins to allow, or `None` for any origin
    pub fn cors_origins(&self) -> Option<Vec<String>> {
        if self.cors_allow_origins.is_empty() {
            return None;
        }

        let mut origins: Vec<String> =
            DEFAULT_CORS_ORIGINS.iter().map(|o| o.to_string()).collect();
        for origin in &self.cors_allow_origins {
            if !origins.contains(origin) {
                origins.push(origin.clone());
            }
        }
        Some(origins)
    }
}

fn default_concurrency() -> usize {
    std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(1)
}

fn parse_setting<T>(name: &str, value: &str) -> Result<T>
where
    T: FromStr,
    T::Err: Display,
{
    value
        .trim()
        .parse::<T>()
        .map_err(|e| anyhow!("Invalid {} value '{}': {}", name, value, e))
}

/// A finite float, or `None` when the value cannot be used as a threshold
pub fn parse_threshold(value: &str) -> Option<f32> {
    value.trim().parse::<f32>().ok().filter(|t| t.is_finite())
}

/// Warmup stays on unless the value is `0` or `false`
pub fn parse_warmup(value: &str) -> bool {
    !matches!(value.trim().to_lowercase().as_str(), "0" | "false")
}

/// Split a comma-separated origin list, dropping blanks
pub fn parse_origins(value: &str) -> Vec<String> {
    value
        .split(',')
        .map(str::trim)
        .filter(|origin| !origin.is_empty())
        .map(String::from)
        .collect()
}

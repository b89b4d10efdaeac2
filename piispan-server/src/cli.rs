use clap::{Arg, ArgAction, ArgMatches, Command, ValueHint};
use std::ffi::OsString;
use std::path::PathBuf;

/// CLI arguments for piispan-server
///
/// Every field is optional; unset fields fall back to environment variables,
/// then the config file, then built-in defaults.
#[derive(Debug, Clone, Default)]
pub struct CliArgs {
    pub host: Option<String>,
    pub port: Option<u16>,
    pub config_file: Option<PathBuf>,
    pub model_dir: Option<PathBuf>,
    pub device: Option<String>,
    pub aggregation_strategy: Option<String>,
    /// Kept as text so a malformed value is handled like `SCORE_THRESHOLD`
    pub score_threshold: Option<String>,
    pub warmup: Option<bool>,
    pub max_seq_length: Option<usize>,
    pub max_request_size: Option<usize>,
    pub inference_concurrency: Option<usize>,
    pub cors_allow_origins: Option<String>,
    pub log_level: Option<String>,
    pub log_format: Option<String>,
}

impl CliArgs {
    /// Parse command line arguments
    pub fn parse() -> Self {
        let matches = Self::command().get_matches();

        // Handle special help for environment variables
        if matches.get_flag("help_env") {
            Self::print_env_help();
            std::process::exit(0);
        }

        Self::from_matches(&matches)
    }

    /// Parse an explicit argument list
    pub fn try_parse_from<I, T>(args: I) -> Result<Self, clap::Error>
    where
        I: IntoIterator<Item = T>,
        T: Into<OsString> + Clone,
    {
        let matches = Self::command().try_get_matches_from(args)?;
        Ok(Self::from_matches(&matches))
    }

    fn from_matches(matches: &ArgMatches) -> Self {
        Self {
            host: matches.get_one::<String>("host").cloned(),
            port: matches.get_one::<u16>("port").copied(),
            config_file: matches.get_one::<PathBuf>("config").cloned(),
            model_dir: matches.get_one::<PathBuf>("model_dir").cloned(),
            device: matches.get_one::<String>("device").cloned(),
            aggregation_strategy: matches.get_one::<String>("aggregation_strategy").cloned(),
            score_threshold: matches.get_one::<String>("score_threshold").cloned(),
            warmup: if matches.get_flag("warmup") {
                Some(true)
            } else if matches.get_flag("no_warmup") {
                Some(false)
            } else {
                None
            },
            max_seq_length: matches.get_one::<usize>("max_seq_length").copied(),
            max_request_size: matches.get_one::<usize>("max_request_size").copied(),
            inference_concurrency: matches.get_one::<usize>("inference_concurrency").copied(),
            cors_allow_origins: matches.get_one::<String>("cors_allow_origins").cloned(),
            log_level: matches.get_one::<String>("log_level").cloned(),
            log_format: matches.get_one::<String>("log_format").cloned(),
        }
    }

    fn command() -> Command {
        Command::new("piispan-server")
            .version(piispan::VERSION)
            .about("HTTP API server for PII span detection")
            .long_about(
                r#"Piispan Server loads a local token-classification checkpoint and exposes
PII span detection over HTTP. If the checkpoint cannot be loaded the server
still starts and reports itself as not ready on /health.

Command line arguments take precedence over environment variables, which
take precedence over the configuration file.

Examples:
  piispan-server --model-dir ./models/xlm-roberta-large --device cuda:0
  piispan-server --aggregation-strategy first --score-threshold 0.5
  piispan-server --config piispan.toml --no-warmup --log-format json"#,
            )
            .arg(
                Arg::new("host")
                    .long("host")
                    .value_name("ADDR")
                    .help("Address to bind")
                    .long_help("Interface address to bind.\nEnvironment variable: HOST")
                    .value_hint(ValueHint::Hostname),
            )
            .arg(
                Arg::new("port")
                    .short('p')
                    .long("port")
                    .value_name("PORT")
                    .help("Port to listen on")
                    .long_help("Port number for the HTTP server.\nEnvironment variable: PORT")
                    .value_parser(clap::value_parser!(u16)),
            )
            .arg(
                Arg::new("config")
                    .short('c')
                    .long("config")
                    .value_name("FILE")
                    .help("Configuration file path")
                    .long_help(
                        "Path to a TOML, YAML or JSON file with [runtime] and [logging]
sections. Environment variables and CLI arguments override its values.",
                    )
                    .value_hint(ValueHint::FilePath)
                    .value_parser(clap::value_parser!(PathBuf)),
            )
            .arg(
                Arg::new("model_dir")
                    .short('m')
                    .long("model-dir")
                    .value_name("DIR")
                    .help("Checkpoint directory")
                    .long_help(
                        "Directory containing config.json, model.safetensors and tokenizer.json.
Environment variable: MODEL_DIR",
                    )
                    .value_hint(ValueHint::DirPath)
                    .value_parser(clap::value_parser!(PathBuf)),
            )
            .arg(
                Arg::new("device")
                    .long("device")
                    .value_name("DEVICE")
                    .help("Inference device (cpu, cuda, cuda:N, metal)")
                    .long_help(
                        "Device to run inference on. Auto-detected when unset: CUDA, then
Metal, else CPU.
Environment variable: DEVICE",
                    ),
            )
            .arg(
                Arg::new("aggregation_strategy")
                    .long("aggregation-strategy")
                    .value_name("STRATEGY")
                    .help("Entity aggregation strategy (simple, first, average, max)")
                    .long_help(
                        "How sub-word predictions are merged into entities. An unknown
value leaves the server running but not ready.
Environment variable: AGGREGATION_STRATEGY",
                    ),
            )
            .arg(
                Arg::new("score_threshold")
                    .long("score-threshold")
                    .value_name("SCORE")
                    .help("Drop entities scoring below this value")
                    .long_help(
                        "Minimum confidence for returned spans. Non-numeric values are
ignored with a warning.
Environment variable: SCORE_THRESHOLD",
                    ),
            )
            .arg(
                Arg::new("warmup")
                    .long("warmup")
                    .help("Run a warmup inference after loading")
                    .long_help("Run one throwaway inference after loading.\nEnvironment variable: WARMUP")
                    .action(ArgAction::SetTrue),
            )
            .arg(
                Arg::new("no_warmup")
                    .long("no-warmup")
                    .help("Skip the warmup inference")
                    .action(ArgAction::SetTrue)
                    .conflicts_with("warmup"),
            )
            .arg(
                Arg::new("max_seq_length")
                    .long("max-seq-length")
                    .value_name("TOKENS")
                    .help("Truncate inputs to this many tokens")
                    .long_help(
                        "Maximum encoded tokens per text. Defaults to the model's position
limit, capped at 512.
Environment variable: MAX_SEQ_LENGTH",
                    )
                    .value_parser(clap::value_parser!(usize)),
            )
            .arg(
                Arg::new("max_request_size")
                    .long("max-request-size")
                    .value_name("BYTES")
                    .help("Maximum request body size in bytes")
                    .long_help(
                        "Maximum size allowed for HTTP request bodies.
Larger requests will be rejected.
Environment variable: MAX_REQUEST_SIZE",
                    )
                    .value_parser(clap::value_parser!(usize)),
            )
            .arg(
                Arg::new("inference_concurrency")
                    .long("inference-concurrency")
                    .value_name("N")
                    .help("Maximum concurrent inference calls")
                    .long_help(
                        "Upper bound on inference calls running at once.
Defaults to the available CPU parallelism.
Environment variable: INFERENCE_CONCURRENCY",
                    )
                    .value_parser(clap::value_parser!(usize)),
            )
            .arg(
                Arg::new("cors_allow_origins")
                    .long("cors-allow-origins")
                    .value_name("ORIGINS")
                    .help("Comma-separated CORS origins")
                    .long_help(
                        "Extra origins allowed by CORS. When empty every origin is allowed.
Environment variable: CORS_ALLOW_ORIGINS",
                    ),
            )
            .arg(
                Arg::new("log_level")
                    .long("log-level")
                    .value_name("LEVEL")
                    .help("Logging level")
                    .long_help(
                        "Set the logging level. RUST_LOG overrides it when set.
Environment variable: LOG_LEVEL",
                    )
                    .value_parser(["error", "warn", "info", "debug", "trace"]),
            )
            .arg(
                Arg::new("log_format")
                    .long("log-format")
                    .value_name("FORMAT")
                    .help("Log output format")
                    .long_help("Log line format.\nEnvironment variable: LOG_FORMAT")
                    .value_parser(["default", "compact", "pretty", "json"]),
            )
            .arg(
                Arg::new("help_env")
                    .long("help-env")
                    .help("Show all environment variables")
                    .action(ArgAction::SetTrue),
            )
    }

    /// Print comprehensive environment variable help
    fn print_env_help() {
        println!("Piispan Server Environment Variables");
        println!("====================================");
        println!();
        println!("Model:");
        println!("  MODEL_DIR              - Checkpoint directory (default: ./models/xlm-roberta-large)");
        println!("  DEVICE                 - cpu, cuda, cuda:N, metal (default: auto)");
        println!("  AGGREGATION_STRATEGY   - simple, first, average, max (default: simple)");
        println!("  SCORE_THRESHOLD        - Minimum span score (default: none)");
        println!("  WARMUP                 - 0 or false disables warmup (default: enabled)");
        println!("  MAX_SEQ_LENGTH         - Token limit per text (default: model limit)");
        println!();
        println!("Server:");
        println!("  HOST                   - Bind address (default: 0.0.0.0)");
        println!("  PORT                   - Server port (default: 8000)");
        println!("  MAX_REQUEST_SIZE       - Max request body size in bytes (default: 2MB)");
        println!("  INFERENCE_CONCURRENCY  - Concurrent inference calls (default: CPU count)");
        println!("  CORS_ALLOW_ORIGINS     - Comma-separated origins (default: any)");
        println!();
        println!("Logging:");
        println!("  LOG_LEVEL              - error, warn, info, debug, trace (default: info)");
        println!("  LOG_FORMAT             - default, compact, pretty, json (default: default)");
        println!("  RUST_LOG               - Filter directives, overrides LOG_LEVEL");
        println!();
        println!("A .env file in the working directory is loaded if present.");
        println!("Note: Command line arguments take precedence over environment variables.");
    }
}

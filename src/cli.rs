//! Command-line interface for the `jitbench` driver.

use std::path::PathBuf;

use clap::Parser;
use jitbench_db::{Backend, BenchConfig};

/// jitbench - time an interpreted SUM against its JIT-specialized variant
#[derive(Parser, Debug)]
#[command(
    name = "jitbench",
    about = "Reference vs JIT-specialized SUM over a random 2-D grid",
    version,
    author
)]
pub struct Cli {
    /// JSON config file (flags below override its values)
    #[arg(long, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Rows of the random input grid
    #[arg(long, value_name = "N")]
    pub rows: Option<usize>,

    /// Columns of the random input grid
    #[arg(long, value_name = "N")]
    pub cols: Option<usize>,

    /// Seed for the input generator
    #[arg(long, value_name = "SEED")]
    pub seed: Option<u64>,

    /// Backend for the accelerated kernel (cost_based, simd, gpu)
    #[arg(long, value_name = "BACKEND")]
    pub backend: Option<Backend>,

    /// Output format
    #[arg(long, default_value = "text", value_name = "FORMAT")]
    pub format: OutputFormat,

    /// Verbose logging (can be repeated: -v, -vv)
    #[arg(short, action = clap::ArgAction::Count)]
    pub verbose: u8,
}

impl Cli {
    /// Merge the config file (if any) with command-line overrides
    ///
    /// # Errors
    /// Returns the config loading error for an unreadable or invalid file
    pub fn bench_config(&self) -> jitbench_db::Result<BenchConfig> {
        let mut config = match &self.config {
            Some(path) => BenchConfig::from_path(path)?,
            None => BenchConfig::default(),
        };
        if let Some(rows) = self.rows {
            config = config.rows(rows);
        }
        if let Some(cols) = self.cols {
            config = config.cols(cols);
        }
        if let Some(seed) = self.seed {
            config = config.seed(seed);
        }
        if let Some(backend) = self.backend {
            config = config.backend(backend);
        }
        config.validate()?;
        Ok(config)
    }
}

/// Output format selection
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    Json,
    Text,
}

impl std::str::FromStr for OutputFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "json" => Ok(Self::Json),
            "text" => Ok(Self::Text),
            _ => Err(format!("Unknown format: {s}. Use 'json' or 'text'")),
        }
    }
}

impl std::fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Json => write!(f, "json"),
            Self::Text => write!(f, "text"),
        }
    }
}

/// Get tracing level from verbosity
pub const fn get_log_level(verbose: u8) -> &'static str {
    match verbose {
        0 => "info",
        1 => "debug",
        _ => "trace",
    }
}

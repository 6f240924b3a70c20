use crate::json::Side;
use clap::builder::TypedValueParser;
use clap::Parser;
use std::path::PathBuf;
use std::time::Duration;

pub const DEFAULT_CONCURRENCY: usize = 16;
pub const DEFAULT_TIMEOUT_SECS: u64 = 20;

/// Unpacks a Modrinth .mrpack modpack into a .minecraft folder
#[derive(Debug, Parser)]
#[command(name = "mrpack-unpacker")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Path to the .mrpack file (prompted for when omitted)
    pub pack: Option<PathBuf>,

    /// Folder the pack is installed into
    #[arg(short, long, env = "MRPACK_OUTPUT", default_value = ".minecraft")]
    pub output: PathBuf,

    /// Folder used for staging the archive (defaults to the system temp dir)
    #[arg(long, env = "MRPACK_WORK_DIR")]
    pub work_dir: Option<PathBuf>,

    /// Maximum number of downloads in flight at once
    #[arg(
        short = 'j',
        long,
        env = "MRPACK_CONCURRENCY",
        default_value_t = DEFAULT_CONCURRENCY,
        value_parser = clap::value_parser!(u16).range(1..).map(usize::from)
    )]
    pub concurrency: usize,

    /// Connect and per-chunk timeout for downloads, in seconds
    #[arg(long, env = "MRPACK_TIMEOUT", default_value_t = DEFAULT_TIMEOUT_SECS)]
    pub timeout: u64,

    /// Only install files supported on this side (client or server)
    #[arg(long, env = "MRPACK_SIDE")]
    pub side: Option<Side>,

    /// Skip size and hash checks of downloaded files
    #[arg(long, env = "MRPACK_NO_VERIFY")]
    pub no_verify: bool,

    /// Enable debug output
    #[arg(short, long, conflicts_with = "quiet")]
    pub verbose: bool,

    /// Only print warnings and errors
    #[arg(short, long)]
    pub quiet: bool,
}

impl Cli {
    pub fn log_level(&self) -> log::LevelFilter {
        if self.verbose {
            log::LevelFilter::Debug
        } else if self.quiet {
            log::LevelFilter::Warn
        } else {
            log::LevelFilter::Info
        }
    }

    /// Builds the pipeline settings for an already resolved pack path.
    pub fn into_config(self, pack_path: PathBuf) -> UnpackConfig {
        let mut config = UnpackConfig::new(pack_path, self.output);
        if let Some(work_dir) = self.work_dir {
            config.work_dir = work_dir;
        }
        config.concurrency = self.concurrency;
        config.timeout = Duration::from_secs(self.timeout);
        config.side = self.side;
        config.verify = !self.no_verify;
        config
    }
}

#[derive(Debug, Clone)]
pub struct UnpackConfig {
    pub pack_path: PathBuf,
    pub output_dir: PathBuf,
    pub work_dir: PathBuf,
    pub concurrency: usize,
    pub timeout: Duration,
    pub side: Option<Side>,
    pub verify: bool,
}

impl UnpackConfig {
    pub fn new(pack_path: impl Into<PathBuf>, output_dir: impl Into<PathBuf>) -> Self {
        Self {
            pack_path: pack_path.into(),
            output_dir: output_dir.into(),
            work_dir: std::env::temp_dir(),
            concurrency: DEFAULT_CONCURRENCY,
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
            side: None,
            verify: true,
        }
    }
}

use clap::Parser;
use linetail::{FailurePolicy, ShrinkPolicy, TailConfig};
use std::path::PathBuf;
use std::time::Duration;

/// Immutable configuration used by the application runtime
#[derive(Debug, Clone)]
pub struct Config {
    pub tail: TailConfig,
    pub regex: Option<String>,
    pub verbose: u8,
}

/// User-facing CLI arguments (kept private to the CLI layer)
#[derive(Parser, Debug)]
#[command(name = "linetail", version, about = "Follow a file and print its new lines")]
struct Args {
    /// File to tail
    #[arg(value_name = "PATH")]
    path: PathBuf,

    /// Start at the current end of the file instead of its beginning
    #[arg(short = 'e', long = "from-end")]
    from_end: bool,

    /// Only print lines matching this regex (case-insensitive)
    #[arg(short = 'r', long = "regex")]
    regex: Option<String>,

    /// Maximum number of lines held in memory before reading pauses
    #[arg(long = "buffer-capacity", default_value_t = linetail::config::DEFAULT_BUFFER_CAPACITY)]
    buffer_capacity: usize,

    /// Maximum number of lines delivered per drain
    #[arg(long = "max-lines", default_value_t = linetail::config::DEFAULT_MAX_LINES_PER_DRAIN)]
    max_lines: usize,

    /// Delay before reopening the file after reaching its end, in milliseconds
    #[arg(long = "reopen-delay-ms", default_value_t = 1000)]
    reopen_delay_ms: u64,

    /// Pause after a drain that found nothing, in milliseconds
    #[arg(long = "idle-backoff-ms", default_value_t = 100)]
    idle_backoff_ms: u64,

    /// What to do when the reopened file is shorter than what was already read
    #[arg(long = "on-shrink", value_enum, default_value_t = ShrinkPolicy::Clamp)]
    on_shrink: ShrinkPolicy,

    /// Reopen attempts after an I/O failure before giving up (0 aborts at once)
    #[arg(long = "retries", default_value_t = 0)]
    retries: u32,

    /// Wait between reopen attempts, in milliseconds
    #[arg(long = "retry-backoff-ms", default_value_t = 1000)]
    retry_backoff_ms: u64,

    /// Increase log verbosity (-v, -vv, -vvv)
    #[arg(short = 'v', long = "verbose", action = clap::ArgAction::Count)]
    verbose: u8,
}

/// Parse CLI options into an application Config
pub fn parse() -> Config {
    Args::parse().into()
}

impl From<Args> for Config {
    fn from(args: Args) -> Self {
        let on_failure = if args.retries == 0 {
            FailurePolicy::Abort
        } else {
            FailurePolicy::Retry {
                attempts: args.retries,
                backoff: Duration::from_millis(args.retry_backoff_ms),
            }
        };
        let tail = TailConfig::new(args.path)
            .with_buffer_capacity(args.buffer_capacity)
            .with_max_lines_per_drain(args.max_lines)
            .with_reopen_delay(Duration::from_millis(args.reopen_delay_ms))
            .with_idle_backoff(Duration::from_millis(args.idle_backoff_ms))
            .with_shrink_policy(args.on_shrink)
            .with_failure_policy(on_failure)
            .from_end(args.from_end);
        Config {
            tail,
            regex: args.regex,
            verbose: args.verbose,
        }
    }
}

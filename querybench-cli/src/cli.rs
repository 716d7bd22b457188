use std::num::NonZeroUsize;
use std::path::PathBuf;
use std::time::Duration;

use anyhow::Result;
use argh::FromArgs;

use crate::config::Config;
use crate::{bench, check, observability};

/// Bounded-concurrency load generator for PostgreSQL.
#[derive(Debug, FromArgs)]
struct Args {
    /// path to the YAML configuration file
    #[argh(option, short = 'c')]
    pub config: Option<PathBuf>,

    #[argh(subcommand)]
    pub command: Command,
}

#[derive(Debug, FromArgs)]
#[argh(subcommand)]
enum Command {
    Run(RunCommand),
    Check(CheckCommand),
    Version(VersionCommand),
}

/// run the configured query for the configured duration and print the throughput
#[derive(Debug, Default, FromArgs)]
#[argh(subcommand, name = "run")]
struct RunCommand {
    /// how long to admit new queries, such as `30s` or `2m` (overrides the configuration)
    #[argh(option, short = 'd', from_str_fn(parse_duration))]
    duration: Option<Duration>,

    /// maximum number of queries in flight (overrides the configuration)
    #[argh(option, short = 'n')]
    concurrency: Option<NonZeroUsize>,

    /// the SQL statement to execute (overrides the configuration)
    #[argh(option, short = 'q')]
    query: Option<String>,

    /// do not show a progress spinner while running
    #[argh(switch)]
    no_progress: bool,
}

impl RunCommand {
    fn apply(&self, config: &mut Config) {
        if let Some(duration) = self.duration {
            config.duration = duration;
        }
        if let Some(concurrency) = self.concurrency {
            config.concurrency = concurrency;
        }
        if let Some(query) = &self.query {
            config.query = query.clone();
        }
    }
}

/// connect to the database and execute the query once
///
/// Exits with a non-zero status if the database cannot be reached or the query fails. Use this to
/// verify a configuration before a long run.
#[derive(Debug, FromArgs)]
#[argh(subcommand, name = "check")]
struct CheckCommand {}

/// print the querybench version
#[derive(Default, Debug, FromArgs)]
#[argh(subcommand, name = "version")]
struct VersionCommand {}

fn parse_duration(value: &str) -> Result<Duration, String> {
    humantime::parse_duration(value).map_err(|err| err.to_string())
}

/// Bootstrap the runtime and execute the CLI command.
pub fn execute() -> Result<()> {
    let args: Args = argh::from_env();

    // Special switch to just print the version and exit.
    if let Command::Version(_) = args.command {
        println!("querybench {}", env!("CARGO_PKG_VERSION"));
        return Ok(());
    }

    let mut config = Config::load(args.config.as_deref())?;
    if let Command::Run(ref command) = args.command {
        command.apply(&mut config);
    }
    config.validate()?;

    // Sentry should be initialized before creating the async runtime.
    let _sentry_guard = observability::init_sentry(&config);

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .thread_name("main-rt")
        .enable_all()
        .worker_threads(config.runtime.worker_threads)
        .build()?;
    let _runtime_guard = runtime.enter();

    observability::init_tracing(&config);
    tracing::debug!(?config);

    runtime.block_on(async move {
        match args.command {
            Command::Run(command) => bench::bench(config, !command.no_progress).await,
            Command::Check(CheckCommand {}) => check::check(config).await,
            Command::Version(VersionCommand {}) => unreachable!(),
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> Args {
        Args::from_args(&["querybench"], args).unwrap()
    }

    #[test]
    fn run_overrides_config() {
        let args = parse(&["-c", "bench.yml", "run", "-d", "1m", "-n", "8", "-q", "SELECT 1"]);
        assert_eq!(args.config, Some(PathBuf::from("bench.yml")));

        let Command::Run(command) = args.command else {
            panic!("expected run command");
        };

        let mut config = Config::default();
        command.apply(&mut config);

        assert_eq!(config.duration, Duration::from_secs(60));
        assert_eq!(config.concurrency.get(), 8);
        assert_eq!(config.query, "SELECT 1");
        assert!(!command.no_progress);
    }

    #[test]
    fn run_without_overrides_keeps_config() {
        let Command::Run(command) = parse(&["run", "--no-progress"]).command else {
            panic!("expected run command");
        };

        let mut config = Config::default();
        command.apply(&mut config);

        assert_eq!(config.duration, Duration::from_secs(10));
        assert_eq!(config.concurrency.get(), 100);
        assert!(command.no_progress);
    }

    #[test]
    fn rejects_invalid_overrides() {
        assert!(Args::from_args(&["querybench"], &["run", "-n", "0"]).is_err());
        assert!(Args::from_args(&["querybench"], &["run", "-d", "soon"]).is_err());
    }

    #[test]
    fn check_and_version() {
        assert!(matches!(parse(&["check"]).command, Command::Check(_)));
        assert!(matches!(parse(&["version"]).command, Command::Version(_)));
    }
}

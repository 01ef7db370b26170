//! Runtime configuration from CLI flags and environment

use std::path::PathBuf;
use std::time::Duration;

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

pub const DEFAULT_API_URL: &str = "http://localhost:3000/api";

/// Where the battle log comes from
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
pub enum LogSource {
    /// Returned by the dungeon completion endpoint
    #[default]
    Remote,
    /// A recorded log on disk
    File(PathBuf),
}

#[derive(clap::Args, Debug, Clone)]
pub struct ConfigArgs {
    /// Dungeon run to view and complete
    #[arg(long, env = "DUNGEON_RUN_ID", required_unless_present = "log_file")]
    pub run_id: Option<String>,

    /// Replay a recorded battle log instead of asking the server
    #[arg(long)]
    pub log_file: Option<PathBuf>,

    /// Base URL of the task-resolution service
    #[arg(long, env = "DUNGEON_API_URL", default_value = DEFAULT_API_URL)]
    pub api_url: String,

    /// Delay between events during playback, in milliseconds (minimum 50)
    #[arg(long, default_value = "600", value_parser = clap::value_parser!(u64).range(50..))]
    pub playback_ms: u64,

    /// Directory for diagnostic logs
    #[arg(long)]
    pub log_dir: Option<PathBuf>,
}

#[derive(Clone, Debug)]
pub struct RuntimeConfig {
    pub source: LogSource,
    pub run_id: Option<String>,
    pub api_url: String,
    pub playback_interval: Duration,
    pub log_dir: PathBuf,
}

impl From<ConfigArgs> for RuntimeConfig {
    fn from(args: ConfigArgs) -> Self {
        let source = match args.log_file {
            Some(path) => LogSource::File(path),
            None => LogSource::Remote,
        };
        Self {
            source,
            run_id: args.run_id.filter(|id| !id.trim().is_empty()),
            api_url: args.api_url,
            playback_interval: Duration::from_millis(args.playback_ms),
            log_dir: args.log_dir.unwrap_or_else(default_log_dir),
        }
    }
}

fn default_log_dir() -> PathBuf {
    dirs_next::data_local_dir()
        .map(|dir| dir.join("dungeon-log"))
        .unwrap_or_else(|| PathBuf::from("."))
        .join("logs")
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;

    #[derive(Parser, Debug)]
    struct Cli {
        #[command(flatten)]
        config: ConfigArgs,
    }

    fn parse(args: &[&str]) -> Result<RuntimeConfig, clap::Error> {
        let argv = std::iter::once("dungeon-log").chain(args.iter().copied());
        Cli::try_parse_from(argv).map(|cli| cli.config.into())
    }

    #[test]
    fn test_log_file_selects_file_source() {
        let config = parse(&["--log-file", "runs/42.json", "--log-dir", "/tmp/x"]).unwrap();
        assert_eq!(config.source, LogSource::File(PathBuf::from("runs/42.json")));
        assert_eq!(config.run_id, None);
        assert_eq!(config.log_dir, PathBuf::from("/tmp/x"));
        assert_eq!(config.playback_interval, Duration::from_millis(600));
    }

    #[test]
    fn test_run_id_selects_remote_source() {
        let config = parse(&["--run-id", "run-7", "--api-url", "http://game.test/api"]).unwrap();
        assert_eq!(config.source, LogSource::Remote);
        assert_eq!(config.run_id.as_deref(), Some("run-7"));
        assert_eq!(config.api_url, "http://game.test/api");
    }

    #[test]
    fn test_playback_interval_has_floor() {
        assert!(parse(&["--log-file", "a.json", "--playback-ms", "10"]).is_err());
        let config = parse(&["--log-file", "a.json", "--playback-ms", "50"]).unwrap();
        assert_eq!(config.playback_interval, Duration::from_millis(50));
    }

    #[test]
    fn test_blank_run_id_is_dropped() {
        let config = parse(&["--log-file", "a.json", "--run-id", "  "]).unwrap();
        assert_eq!(config.run_id, None);
    }
}

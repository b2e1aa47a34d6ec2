//! Startup configuration (§2 AMBIENT, §6 CLI flags).
//!
//! CLI parsing feeds a single [`EngineConfig`] built once at process start;
//! everything mutable afterwards (`setoption`, tuning-file reload) goes
//! through the live parameter registry instead of back into this struct
//! (§2: "`setoption`/tuning-file updates feed a live parameter registry
//! rather than mutating `EngineConfig` itself").

use clap::Parser;

use crate::board::DEFAULT_TT_MB;
use crate::cluster::DEFAULT_CLUSTER_PORT;

/// Parallel cluster chess search engine, speaking UCI on stdin/stdout.
#[derive(Parser, Debug, Clone)]
#[command(name = "chess_engine", disable_help_flag = true)]
pub struct Cli {
    /// Transposition table size in MB.
    #[arg(short = 'H', long = "hash", default_value_t = DEFAULT_TT_MB)]
    pub hash_mb: usize,

    /// Number of Lazy-SMP worker threads.
    #[arg(short = 'c', long = "threads", default_value_t = 1)]
    pub threads: usize,

    /// Enable pondering (think on the opponent's clock).
    #[arg(short = 'p', long = "ponder", default_value_t = false)]
    pub ponder: bool,

    /// Syzygy tablebase directory.
    #[arg(short = 's', long = "syzygy")]
    pub syzygy_path: Option<String>,

    /// Offline tuner: EPD file of positions to tune against, then exit.
    #[arg(short = 't', long = "tune-epd")]
    pub tune_epd: Option<String>,

    /// Tuning parameter file (`key=integer` per line) applied at startup.
    #[arg(short = 'T', long = "tune-file")]
    pub tune_file: Option<String>,

    /// Log file path. No file means no logging sink is installed.
    #[arg(short = 'l', long = "log")]
    pub log_path: Option<String>,

    /// Tag prefix for log lines.
    #[arg(short = 'x', long = "log-tag")]
    pub log_tag: Option<String>,

    /// Comma-separated `host[:port]` cluster peer list.
    #[arg(short = 'n', long = "peers")]
    pub peers: Option<String>,

    /// Run as a cluster peer, listening for search requests on this port.
    #[arg(short = 'N', long = "cluster-port")]
    pub cluster_port: Option<u16>,

    /// Also run the local interactive UCI session while serving as a
    /// cluster peer (`-N` alone only serves peer requests).
    #[arg(short = 'L', long = "also-local", default_value_t = false)]
    pub also_local: bool,

    /// Print help and exit.
    #[arg(short = 'h', long = "help", action = clap::ArgAction::Help)]
    pub help: (),
}

/// Resolved configuration for one process lifetime, built once from [`Cli`].
#[derive(Debug, Clone)]
pub struct EngineConfig {
    pub hash_mb: usize,
    pub threads: usize,
    pub ponder: bool,
    pub syzygy_path: Option<String>,
    pub tune_epd: Option<String>,
    pub tune_file: Option<String>,
    pub log_path: Option<String>,
    pub log_tag: Option<String>,
    pub peers: Vec<std::net::SocketAddr>,
    pub cluster_port: Option<u16>,
    pub also_local: bool,
}

impl EngineConfig {
    #[must_use]
    pub fn from_cli(cli: &Cli) -> Self {
        let peers = cli
            .peers
            .as_deref()
            .map(crate::cluster::parse_peer_list)
            .unwrap_or_default();

        EngineConfig {
            hash_mb: cli.hash_mb.max(1),
            threads: cli.threads.max(1),
            ponder: cli.ponder,
            syzygy_path: cli.syzygy_path.clone(),
            tune_epd: cli.tune_epd.clone(),
            tune_file: cli.tune_file.clone(),
            log_path: cli.log_path.clone(),
            log_tag: cli.log_tag.clone(),
            peers,
            cluster_port: cli.cluster_port,
            also_local: cli.also_local,
        }
    }

    /// Port this node listens on when acting as a cluster peer (`-N`),
    /// defaulting to the standard cluster port if `-N` was given with no
    /// explicit value handling beyond what clap already resolved.
    #[must_use]
    pub fn effective_cluster_port(&self) -> u16 {
        self.cluster_port.unwrap_or(DEFAULT_CLUSTER_PORT)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_spec() {
        let cli = Cli::parse_from(["chess_engine"]);
        let config = EngineConfig::from_cli(&cli);
        assert_eq!(config.hash_mb, DEFAULT_TT_MB);
        assert_eq!(config.threads, 1);
        assert!(!config.ponder);
        assert!(config.peers.is_empty());
        assert!(config.cluster_port.is_none());
    }

    #[test]
    fn parses_hash_threads_and_peers() {
        let cli = Cli::parse_from([
            "chess_engine",
            "-H",
            "256",
            "-c",
            "4",
            "-p",
            "-n",
            "127.0.0.1:6000,127.0.0.1:6001",
        ]);
        let config = EngineConfig::from_cli(&cli);
        assert_eq!(config.hash_mb, 256);
        assert_eq!(config.threads, 4);
        assert!(config.ponder);
        assert_eq!(config.peers.len(), 2);
    }

    #[test]
    fn cluster_port_defaults_when_flag_bare() {
        let cli = Cli::parse_from(["chess_engine", "-N", "7000"]);
        let config = EngineConfig::from_cli(&cli);
        assert_eq!(config.effective_cluster_port(), 7000);
    }
}

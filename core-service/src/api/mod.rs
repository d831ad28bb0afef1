//! API Module - command line surface
//!
//! Structure:
//! - mod.rs: argument types (clap derive)
//! - commands.rs: handlers behind each subcommand
//!
//! Flags are applied on top of `RunConfig::resolve`, so a flag always wins
//! over the config file and `SMARTPARK_*` env.

pub mod commands;

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

use crate::constants::DEFAULT_COLLECTOR_URL;
use crate::logic::config::RunConfig;

/// Smart parking edge node
#[derive(Parser, Debug)]
#[command(name = "smartpark-core")]
#[command(author, version, about = "Replays parking-slot features and transmits only meaningful changes")]
#[command(propagate_version = true)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Replay a features CSV through the suppression pipeline
    Run(RunArgs),

    /// Check a model manifest (and optionally a dataset header) without running
    Validate(ValidateArgs),

    /// Print the compiled-in feature layout as JSON
    Layout,
}

/// Settings shared by `run` and `validate`
#[derive(Args, Debug, Default)]
pub struct CommonArgs {
    /// JSON run config; missing fields use defaults
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Features CSV
    #[arg(short, long)]
    pub features: Option<PathBuf>,

    /// Model manifest JSON
    #[arg(short, long)]
    pub manifest: Option<PathBuf>,

    /// Decision threshold, overrides the manifest
    #[arg(long)]
    pub threshold: Option<f32>,

    /// Slot id for datasets without a slot column
    #[arg(long)]
    pub slot: Option<String>,

    /// Feature used for ground-truth occupancy
    #[arg(long)]
    pub occupancy_feature: Option<String>,

    /// Occupied when the occupancy feature reads below this (mm)
    #[arg(long)]
    pub occupancy_mm: Option<f32>,
}

#[derive(Args, Debug, Default)]
pub struct RunArgs {
    #[command(flatten)]
    pub common: CommonArgs,

    /// Pause between readings in ms (0 = as fast as possible)
    #[arg(long)]
    pub interval_ms: Option<u64>,

    /// Log counters every N readings (0 = never)
    #[arg(long)]
    pub report_every: Option<u64>,

    /// Stream the CSV in file order instead of sorting it first
    #[arg(long)]
    pub stream: bool,

    /// POST transmitted messages to this collector (bare flag: local collector)
    #[arg(long, num_args = 0..=1, default_missing_value = DEFAULT_COLLECTOR_URL)]
    pub collector_url: Option<String>,

    /// Record transmitted events as JSONL in this directory
    #[arg(long)]
    pub jsonl_dir: Option<PathBuf>,

    /// Topic prefix for published messages
    #[arg(long)]
    pub topic_prefix: Option<String>,

    /// Don't log each transmission
    #[arg(long)]
    pub quiet: bool,

    /// Abort on the first failed publish
    #[arg(long)]
    pub fail_on_publish_error: bool,

    /// Print the run report as JSON instead of the summary line
    #[arg(long)]
    pub json: bool,
}

#[derive(Args, Debug, Default)]
pub struct ValidateArgs {
    #[command(flatten)]
    pub common: CommonArgs,
}

impl CommonArgs {
    pub fn apply(&self, config: &mut RunConfig) {
        if let Some(p) = &self.features {
            config.features_path = Some(p.clone());
        }
        if let Some(p) = &self.manifest {
            config.manifest_path = Some(p.clone());
        }
        if let Some(t) = self.threshold {
            config.decision_threshold = Some(t);
        }
        if let Some(s) = &self.slot {
            config.default_slot = s.clone();
        }
        if let Some(f) = &self.occupancy_feature {
            config.occupancy_feature = f.clone();
        }
        if let Some(mm) = self.occupancy_mm {
            config.change_threshold_mm = mm;
        }
    }
}

impl RunArgs {
    pub fn apply(&self, config: &mut RunConfig) {
        self.common.apply(config);

        if let Some(ms) = self.interval_ms {
            config.send_interval_ms = ms;
        }
        if let Some(n) = self.report_every {
            config.report_interval = n;
        }
        if self.stream {
            config.sort_input = false;
        }
        if let Some(url) = &self.collector_url {
            config.sinks.collector_url = Some(url.clone());
        }
        if let Some(dir) = &self.jsonl_dir {
            config.sinks.jsonl_dir = Some(dir.clone());
        }
        if let Some(prefix) = &self.topic_prefix {
            config.topic_prefix = prefix.clone();
        }
        if self.quiet {
            config.sinks.log = false;
        }
        if self.fail_on_publish_error {
            config.fail_on_publish_error = true;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_parses_run_flags() {
        let cli = Cli::parse_from([
            "smartpark-core",
            "run",
            "--features",
            "data/features.csv",
            "--manifest",
            "models/manifest.json",
            "--threshold",
            "0.7",
            "--interval-ms",
            "0",
            "--stream",
            "--quiet",
        ]);

        let Commands::Run(args) = cli.command else {
            panic!("expected run");
        };

        let mut config = RunConfig::default();
        args.apply(&mut config);
        assert_eq!(config.decision_threshold, Some(0.7));
        assert_eq!(config.send_interval_ms, 0);
        assert!(!config.sort_input);
        assert!(!config.sinks.log);
        assert_eq!(config.features_path, Some(PathBuf::from("data/features.csv")));
    }

    #[test]
    fn test_flags_leave_unset_fields_alone() {
        let mut config = RunConfig::default();
        config.topic_prefix = "from-file".into();
        RunArgs::default().apply(&mut config);
        assert_eq!(config.topic_prefix, "from-file");
        assert!(config.sort_input);
    }

    #[test]
    fn test_bare_collector_flag_uses_local_collector() {
        let cli = Cli::parse_from(["smartpark-core", "run", "--collector-url"]);
        let Commands::Run(args) = cli.command else {
            panic!("expected run");
        };
        assert_eq!(args.collector_url.as_deref(), Some(DEFAULT_COLLECTOR_URL));

        let cli = Cli::parse_from(["smartpark-core", "run", "--collector-url", "http://collector:9000"]);
        let Commands::Run(args) = cli.command else {
            panic!("expected run");
        };
        assert_eq!(args.collector_url.as_deref(), Some("http://collector:9000"));
    }

    #[test]
    fn test_layout_subcommand() {
        let cli = Cli::parse_from(["smartpark-core", "layout"]);
        assert!(matches!(cli.command, Commands::Layout));
    }

    #[test]
    fn test_cli_definition_is_consistent() {
        use clap::CommandFactory;
        Cli::command().debug_assert();
    }
}

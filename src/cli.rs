use crate::search::RankParams;
use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "roadmap-rank")]
#[command(about = "Rank learning resources against roadmap steps", long_about = None)]
pub struct Cli {
    /// Directory holding resources.json, roadmap.json and friends
    #[arg(short, long, default_value = ".")]
    pub data_dir: PathBuf,
    /// Config file (defaults to <data-dir>/roadmap-rank.toml, then the user config dir)
    #[arg(short, long)]
    pub config: Option<PathBuf>,
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Rank resources for every step and show the suggestions
    Suggest {
        #[command(flatten)]
        ranking: RankingArgs,
        /// Write suggestions.json instead of only reporting
        #[arg(long)]
        apply: bool,
    },
    /// Merge suggestions with reviewer overrides into the roadmap
    Map {
        #[command(flatten)]
        ranking: RankingArgs,
        /// Rank now instead of reading suggestions.json
        #[arg(long)]
        fresh: bool,
        /// Write roadmap.json instead of only reporting
        #[arg(long)]
        apply: bool,
    },
    /// Collapse resources that point at the same link
    Dedup {
        /// Rewrite references and remove superseded resources
        #[arg(long)]
        apply: bool,
    },
    /// Compare rankings under two parameter sets
    Diff {
        #[command(flatten)]
        ranking: RankingArgs,
        #[arg(long)]
        alt_phrase_bonus: Option<f64>,
        #[arg(long)]
        alt_rating_boost_scale: Option<f64>,
        #[arg(long)]
        alt_efficiency_weight: Option<f64>,
    },
}

/// Ranking weight overrides on top of the config file.
#[derive(Args, Debug, Clone, Copy, Default)]
pub struct RankingArgs {
    #[arg(long)]
    pub phrase_bonus: Option<f64>,
    #[arg(long)]
    pub rating_boost_scale: Option<f64>,
    #[arg(long)]
    pub efficiency_weight: Option<f64>,
}

impl RankingArgs {
    /// `base` with every flag that was given replacing its value.
    pub fn apply_to(self, base: RankParams) -> RankParams {
        RankParams {
            phrase_bonus: self.phrase_bonus.unwrap_or(base.phrase_bonus),
            rating_boost_scale: self.rating_boost_scale.unwrap_or(base.rating_boost_scale),
            efficiency_weight: self.efficiency_weight.unwrap_or(base.efficiency_weight),
        }
    }
}

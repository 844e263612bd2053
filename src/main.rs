use clap::Parser;
use roadmap_rank::cli::{Cli, Commands};
use roadmap_rank::tools::{
    DedupRequest, DiffRequest, MapRequest, SuggestRequest, execute_dedup, execute_diff,
    execute_map, execute_suggest,
};
use roadmap_rank::{Config, DataDir, RankParams};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    roadmap_rank::tracing::init();

    let cli = Cli::parse();
    let config = Config::load(cli.config.as_deref(), &cli.data_dir)?;
    let data = DataDir::new(&cli.data_dir);

    tracing::info!("Using data directory {}", data.root().display());

    let output = match cli.command {
        Commands::Suggest { ranking, apply } => {
            let params = ranking.apply_to(config.ranking);
            execute_suggest(&data, SuggestRequest { params, apply }).await?
        }
        Commands::Map {
            ranking,
            fresh,
            apply,
        } => {
            let params = ranking.apply_to(config.ranking);
            execute_map(
                &data,
                MapRequest {
                    params,
                    fresh,
                    apply,
                },
            )
            .await?
        }
        Commands::Dedup { apply } => {
            execute_dedup(
                &data,
                DedupRequest {
                    id_fields: config.id_fields,
                    apply,
                },
            )
            .await?
        }
        Commands::Diff {
            ranking,
            alt_phrase_bonus,
            alt_rating_boost_scale,
            alt_efficiency_weight,
        } => {
            let baseline = ranking.apply_to(config.ranking);
            let alternate = RankParams {
                phrase_bonus: alt_phrase_bonus.unwrap_or(baseline.phrase_bonus),
                rating_boost_scale: alt_rating_boost_scale.unwrap_or(baseline.rating_boost_scale),
                efficiency_weight: alt_efficiency_weight.unwrap_or(baseline.efficiency_weight),
            };
            execute_diff(
                &data,
                DiffRequest {
                    baseline,
                    alternate,
                },
            )
            .await?
        }
    };

    print!("{output}");
    Ok(())
}

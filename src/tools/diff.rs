use crate::error::Result;
use crate::format::render_diff;
use crate::search::{Corpus, RankParams, diff_mappings, to_mapping};
use crate::store::DataDir;

/// Parameters for the diff command
#[derive(Debug, Clone, Copy, Default)]
pub struct DiffRequest {
    pub baseline: RankParams,
    pub alternate: RankParams,
}

/// Rank the snapshot under both parameter sets and report what moves.
pub async fn execute_diff(data: &DataDir, request: DiffRequest) -> Result<String> {
    let snapshot = data.load(&[]).await?;
    let steps = &snapshot.roadmap.steps;

    let corpus = Corpus::new(&snapshot.resources);
    let baseline = to_mapping(&corpus.rank(steps, &request.baseline));
    let alternate = to_mapping(&corpus.rank(steps, &request.alternate));

    Ok(render_diff(&diff_mappings(&baseline, &alternate)))
}

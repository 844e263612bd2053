use crate::apply::MappingPlan;
use crate::error::Result;
use crate::search::{RankParams, rank, to_mapping};
use crate::store::DataDir;

/// Parameters for the map command
#[derive(Debug, Clone, Copy, Default)]
pub struct MapRequest {
    pub params: RankParams,
    /// Rank now even if suggestions.json exists
    pub fresh: bool,
    /// Persist roadmap.json
    pub apply: bool,
}

/// Merge suggestions with overrides and write the result into the roadmap.
///
/// Uses the reviewed suggestions.json unless `fresh` is set or the file is missing.
pub async fn execute_map(data: &DataDir, request: MapRequest) -> Result<String> {
    let _lock = request.apply.then(|| data.lock()).transpose()?;
    let snapshot = data.load(&[]).await?;

    let suggested = match (&snapshot.suggestions, request.fresh) {
        (Some(stored), false) => stored.clone(),
        _ => {
            tracing::info!("Ranking a fresh suggestion set");
            to_mapping(&rank(
                &snapshot.resources,
                &snapshot.roadmap.steps,
                &request.params,
            ))
        }
    };

    let plan = MappingPlan::new(&snapshot, &suggested);
    let mut output = plan.render();

    if !request.apply {
        output.push_str("\nDry run: pass --apply to write roadmap.json\n");
    } else if !plan.is_empty() {
        data.commit(plan.writes(data)?).await?;
        output.push_str(&format!("\nUpdated {}\n", data.roadmap_path().display()));
    }

    Ok(output)
}

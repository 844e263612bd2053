use crate::error::Result;
use crate::format::render_suggestions;
use crate::search::{RankParams, rank, to_mapping};
use crate::store::{DataDir, FileWrite};
use anyhow::Context;

/// Parameters for the suggest command
#[derive(Debug, Clone, Copy, Default)]
pub struct SuggestRequest {
    pub params: RankParams,
    /// Persist suggestions.json
    pub apply: bool,
}

/// Rank every step and report the suggestions, writing them when `apply` is set.
pub async fn execute_suggest(data: &DataDir, request: SuggestRequest) -> Result<String> {
    let _lock = request.apply.then(|| data.lock()).transpose()?;
    let snapshot = data.load(&[]).await?;

    let suggestions = rank(&snapshot.resources, &snapshot.roadmap.steps, &request.params);
    let mut output = render_suggestions(&snapshot.roadmap.steps, &suggestions, &request.params);

    if request.apply {
        let write = FileWrite::json(data.suggestions_path(), &to_mapping(&suggestions))
            .context("Failed to serialize suggestions")?;
        data.commit(vec![write]).await?;
        output.push_str(&format!(
            "\nWrote {}\n",
            data.suggestions_path().display()
        ));
    } else {
        output.push_str("\nDry run: pass --apply to write suggestions.json\n");
    }

    Ok(output)
}

use crate::apply::DedupPlan;
use crate::config::IdField;
use crate::error::Result;
use crate::store::DataDir;

/// Parameters for the dedup command
#[derive(Debug, Clone, Default)]
pub struct DedupRequest {
    /// Collections and fields holding resource ids
    pub id_fields: Vec<IdField>,
    /// Rewrite references and remove superseded resources
    pub apply: bool,
}

/// Find duplicate resources and, when `apply` is set, collapse them.
///
/// The roadmap, every declared id field, and resources.json are replaced
/// together or not at all.
pub async fn execute_dedup(data: &DataDir, request: DedupRequest) -> Result<String> {
    let _lock = request.apply.then(|| data.lock()).transpose()?;
    let snapshot = data.load(&request.id_fields).await?;

    let plan = DedupPlan::new(&snapshot, &request.id_fields);
    let mut output = plan.render();

    if !request.apply {
        if !plan.is_empty() {
            output.push_str(
                "\nDry run: pass --apply to rewrite references and remove duplicates\n",
            );
        }
    } else if !plan.is_empty() {
        let writes = plan.writes(data)?;
        let files = writes.len();
        data.commit(writes).await?;
        output.push_str(&format!(
            "\nRemoved {} resources, rewrote {} files\n",
            plan.removed.len(),
            files
        ));
    }

    Ok(output)
}

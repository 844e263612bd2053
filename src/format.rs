//! Plain-text reports for ranking runs.

use crate::search::{RankParams, StepDiff, StepSuggestion};
use crate::types::RoadmapStepRecord;
use std::collections::BTreeMap;
use std::fmt::Write as _;

/// Renders per-step suggestions with their score components.
pub fn render_suggestions(
    steps: &[RoadmapStepRecord],
    suggestions: &[StepSuggestion],
    params: &RankParams,
) -> String {
    let mut output = String::new();
    let _ = writeln!(
        output,
        "Suggestions (phrase bonus {}, rating scale {}, efficiency weight {}):",
        params.phrase_bonus, params.rating_boost_scale, params.efficiency_weight
    );

    for (step, suggestion) in steps.iter().zip(suggestions) {
        let _ = writeln!(output, "\n{} — {}", step.id, step.title);
        if suggestion.resources.is_empty() {
            output.push_str("  (no relevant resources)\n");
            continue;
        }
        for (rank, ranked) in suggestion.resources.iter().enumerate() {
            let b = &ranked.breakdown;
            let _ = writeln!(
                output,
                "  {:>2}. {:<24} {:>8.3}  tfidf {:.3}  rating {:.2}  phrase {:.1}  eff {:.2}",
                rank + 1,
                ranked.id,
                b.score,
                b.tfidf_score,
                b.rating_boost,
                b.exact_phrase_bonus,
                b.efficiency_boost
            );
        }
    }

    output
}

/// Renders the difference between two ranking runs.
pub fn render_diff(diff: &BTreeMap<String, StepDiff>) -> String {
    if diff.is_empty() {
        return "No differences between the two rankings.\n".to_string();
    }

    let mut output = String::new();
    let _ = writeln!(output, "Steps that differ ({}):", diff.len());
    for (step_id, step_diff) in diff {
        let _ = writeln!(output, "  • {}", step_id);
        if !step_diff.added.is_empty() {
            let _ = writeln!(output, "      + {}", step_diff.added.join(", "));
        }
        if !step_diff.removed.is_empty() {
            let _ = writeln!(output, "      - {}", step_diff.removed.join(", "));
        }
        if step_diff.reordered {
            output.push_str("      ~ order changed\n");
        }
    }
    output
}

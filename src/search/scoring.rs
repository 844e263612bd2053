//! Relevance scoring between a roadmap step and a resource.
//!
//! The final score combines four signals:
//! - TF-IDF: occurrences of each step term in the resource, weighted by IDF (x10)
//! - rating boost: `rating / 5`, scaled by `rating_boost_scale`
//! - exact phrase bonus: the step's token phrase appears in the resource title
//! - efficiency boost: the resource's efficiency signal times `efficiency_weight`

use super::index::IdfTable;
use super::tokenize::{TokenSet, term_counts};
use crate::types::ResourceRecord;
use ahash::AHashMap;
use serde::{Deserialize, Serialize};

/// Multiplier applied to the raw TF-IDF sum.
const TFIDF_SCALE: f64 = 10.0;

/// Highest rating on the resource rating scale.
const MAX_RATING: f64 = 5.0;

/// Tunable weights for a ranking run.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RankParams {
    pub phrase_bonus: f64,
    pub rating_boost_scale: f64,
    /// Off unless explicitly enabled.
    pub efficiency_weight: f64,
}

impl Default for RankParams {
    fn default() -> Self {
        Self {
            phrase_bonus: 3.0,
            rating_boost_scale: 4.0,
            efficiency_weight: 0.0,
        }
    }
}

/// A score together with the components it was built from.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ScoreBreakdown {
    pub score: f64,
    pub tfidf_score: f64,
    pub rating_boost: f64,
    pub exact_phrase_bonus: f64,
    pub efficiency_boost: f64,
}

/// A resource tokenized once for scoring against many steps.
#[derive(Debug, Clone)]
pub struct ResourceDoc<'a> {
    pub resource: &'a ResourceRecord,
    counts: AHashMap<String, usize>,
    title_lower: String,
}

impl<'a> ResourceDoc<'a> {
    pub fn new(resource: &'a ResourceRecord) -> Self {
        Self {
            counts: term_counts(&resource.text()),
            title_lower: resource.title.to_lowercase(),
            resource,
        }
    }
}

/// Scores one resource against a step's token set.
pub fn score(
    step_tokens: &TokenSet,
    resource: &ResourceRecord,
    idf: &IdfTable,
    params: &RankParams,
) -> ScoreBreakdown {
    score_document(step_tokens, &ResourceDoc::new(resource), idf, params)
}

/// Scores a pre-tokenized resource against a step's token set.
///
/// The phrase check joins the step tokens in first-seen order and looks for that
/// string in the lowercased title. Since the step text includes description and
/// skills, this only fires when the whole deduplicated step reads as a substring
/// of the title. It is a loose heuristic, not a phrase search.
pub fn score_document(
    step_tokens: &TokenSet,
    doc: &ResourceDoc<'_>,
    idf: &IdfTable,
    params: &RankParams,
) -> ScoreBreakdown {
    let tfidf_score: f64 = step_tokens
        .iter()
        .filter_map(|term| {
            doc.counts
                .get(term)
                .map(|&count| count as f64 * idf.idf(term))
        })
        .sum();

    let rating_boost = rating_fraction(doc.resource.rating);

    let exact_phrase_bonus =
        if !step_tokens.is_empty() && doc.title_lower.contains(&step_tokens.phrase()) {
            params.phrase_bonus
        } else {
            0.0
        };

    let efficiency_boost = finite_or_zero(doc.resource.efficiency) * params.efficiency_weight;

    let score = tfidf_score.mul_add(
        TFIDF_SCALE,
        rating_boost.mul_add(params.rating_boost_scale, exact_phrase_bonus + efficiency_boost),
    );

    ScoreBreakdown {
        score,
        tfidf_score,
        rating_boost,
        exact_phrase_bonus,
        efficiency_boost,
    }
}

/// Maps a rating onto [0, 1]. Missing or out-of-range ratings are clamped.
fn rating_fraction(rating: Option<f64>) -> f64 {
    (finite_or_zero(rating) / MAX_RATING).clamp(0.0, 1.0)
}

fn finite_or_zero(value: Option<f64>) -> f64 {
    value.filter(|v| v.is_finite()).unwrap_or(0.0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::search::tokenize::tokenize;
    use assert2::check;
    use rstest::rstest;

    fn resource(title: &str, description: &str, tags: &[&str]) -> ResourceRecord {
        ResourceRecord {
            id: "r".into(),
            title: title.into(),
            description: description.into(),
            tags: tags.iter().map(|t| (*t).to_string()).collect(),
            ..Default::default()
        }
    }

    fn close(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-9
    }

    #[test]
    fn test_tfidf_counts_resource_occurrences() {
        let target = resource("grammar grammar", "grammar drills", &["vocab"]);
        let other = resource("listening", "", &[]);
        let pool = [target.clone(), other];
        let idf = IdfTable::build(&pool);

        let breakdown = score(&tokenize("grammar"), &target, &idf, &RankParams::default());

        check!(close(breakdown.tfidf_score, 3.0 * idf.idf("grammar")));
        check!(breakdown.rating_boost == 0.0);
    }

    #[test]
    fn test_final_score_formula() {
        let target = ResourceRecord {
            rating: Some(4.0),
            efficiency: Some(2.0),
            ..resource("Basic greetings", "hello", &["greeting"])
        };
        let pool = [target.clone(), resource("other", "", &[])];
        let idf = IdfTable::build(&pool);
        let params = RankParams {
            phrase_bonus: 3.0,
            rating_boost_scale: 4.0,
            efficiency_weight: 0.5,
        };

        let b = score(&tokenize("basic greetings"), &target, &idf, &params);

        let tfidf = idf.idf("basic") + idf.idf("greetings");
        check!(close(b.tfidf_score, tfidf));
        check!(close(b.rating_boost, 0.8));
        check!(b.exact_phrase_bonus == 3.0);
        check!(close(b.efficiency_boost, 1.0));
        check!(close(b.score, tfidf * 10.0 + 0.8 * 4.0 + 3.0 + 1.0));
    }

    #[rstest]
    #[case(None, 0.0)]
    #[case(Some(0.0), 0.0)]
    #[case(Some(2.5), 0.5)]
    #[case(Some(5.0), 1.0)]
    #[case(Some(7.0), 1.0)]
    #[case(Some(-1.0), 0.0)]
    #[case(Some(f64::NAN), 0.0)]
    fn test_rating_boost_in_unit_range(#[case] rating: Option<f64>, #[case] expected: f64) {
        check!(close(rating_fraction(rating), expected));
    }

    #[rstest]
    #[case("basic greetings", "Basic Greetings for Beginners", 3.0)]
    #[case("greetings basic", "Basic Greetings for Beginners", 0.0)]
    #[case("basic greetings greeting", "Basic Greetings", 0.0)]
    #[case("", "Basic Greetings", 0.0)]
    fn test_exact_phrase_bonus(#[case] step: &str, #[case] title: &str, #[case] expected: f64) {
        let target = resource(title, "", &[]);
        let idf = IdfTable::build(std::slice::from_ref(&target));
        let b = score(&tokenize(step), &target, &idf, &RankParams::default());
        check!(b.exact_phrase_bonus == expected);
    }

    #[test]
    fn test_unknown_terms_contribute_nothing() {
        let target = resource("한글 읽기", "", &[]);
        let idf = IdfTable::build(std::slice::from_ref(&target));
        let b = score(&tokenize("grammar"), &target, &idf, &RankParams::default());
        check!(b.score == 0.0);
    }

    #[test]
    fn test_efficiency_off_by_default() {
        let target = ResourceRecord {
            efficiency: Some(9.0),
            ..resource("x", "", &[])
        };
        let idf = IdfTable::build(std::slice::from_ref(&target));
        let b = score(&tokenize("y"), &target, &idf, &RankParams::default());
        check!(b.efficiency_boost == 0.0);
    }
}

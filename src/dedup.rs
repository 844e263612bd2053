//! Detection of resources that point at the same external content.
//!
//! Resources are grouped by an identity key derived from their link. Each group
//! of two or more gets one canonical survivor; every other member is mapped to it
//! in a [`RewriteTable`]. Nothing is deleted here: the table is applied to
//! referencing collections by the apply phase.

use crate::review::dedupe;
use crate::types::ResourceRecord;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::collections::BTreeMap;
use url::Url;

/// Normalizes a link to `scheme://host[:port]/path`, lowercased, with query,
/// fragment, userinfo, default ports and trailing slashes dropped. Returns
/// `None` when the link is not an absolute URL with a host.
pub fn normalize_link(link: &str) -> Option<String> {
    let url = Url::parse(link.trim()).ok()?;
    let host = url.host_str()?;
    let mut key = format!("{}://{}", url.scheme(), host);
    if let Some(port) = url.port() {
        key.push(':');
        key.push_str(&port.to_string());
    }
    key.push_str(url.path().trim_end_matches('/'));
    Some(key.to_lowercase())
}

/// The key resources are grouped by.
///
/// Falls back from the normalized link to the raw trimmed link, then to the
/// title, then to the id.
pub fn identity_key(resource: &ResourceRecord) -> String {
    let link = resource.link.trim();
    if !link.is_empty() {
        return normalize_link(link).unwrap_or_else(|| {
            tracing::warn!(
                "Resource '{}' has unparseable link '{}', keying on raw text",
                resource.id,
                link
            );
            link.to_lowercase()
        });
    }

    let title = resource.title.trim();
    if title.is_empty() {
        resource.id.trim().to_lowercase()
    } else {
        title.to_lowercase()
    }
}

/// Resources sharing one identity key.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DuplicateGroup {
    pub key: String,
    pub canonical: String,
    /// Member ids in selection order; the canonical id comes first.
    pub members: Vec<String>,
}

/// Old id → canonical id. Ids not in the table map to themselves.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RewriteTable(BTreeMap<String, String>);

impl RewriteTable {
    pub fn get(&self, id: &str) -> Option<&str> {
        self.0.get(id).map(String::as_str)
    }

    /// Maps one id to its canonical id.
    pub fn resolve<'a>(&'a self, id: &'a str) -> &'a str {
        self.get(id).unwrap_or(id)
    }

    /// Maps every id to its canonical id and drops the repeats this creates.
    pub fn rewrite(&self, ids: &[String]) -> Vec<String> {
        let mapped: Vec<String> = ids.iter().map(|id| self.resolve(id).to_owned()).collect();
        dedupe(&mapped)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }
}

impl FromIterator<(String, String)> for RewriteTable {
    fn from_iter<I: IntoIterator<Item = (String, String)>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

/// Duplicate groups found in a pool plus the resulting rewrite table.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DuplicateReport {
    /// Groups with more than one member, ordered by key.
    pub groups: Vec<DuplicateGroup>,
    pub rewrite_table: RewriteTable,
}

/// Groups the pool by identity key and picks a canonical record per group.
///
/// The canonical record has the highest rating; ties go to the earliest
/// `createdAt` (records without one lose), then to the smallest id.
pub fn find_duplicates(resources: &[ResourceRecord]) -> DuplicateReport {
    let mut by_key: BTreeMap<String, Vec<&ResourceRecord>> = BTreeMap::new();
    for resource in resources {
        by_key.entry(identity_key(resource)).or_default().push(resource);
    }

    let mut report = DuplicateReport::default();
    let mut rewrites = BTreeMap::new();

    for (key, mut members) in by_key {
        if members.len() < 2 {
            continue;
        }
        members.sort_by(|a, b| canonical_order(a, b));

        let canonical = members[0].id.clone();
        for member in &members[1..] {
            if member.id != canonical {
                rewrites.insert(member.id.clone(), canonical.clone());
            }
        }

        report.groups.push(DuplicateGroup {
            key,
            canonical,
            members: members.iter().map(|r| r.id.clone()).collect(),
        });
    }

    report.rewrite_table = RewriteTable(rewrites);

    tracing::info!(
        "Found {} duplicate groups covering {} superseded resources",
        report.groups.len(),
        report.rewrite_table.len()
    );

    report
}

/// Best candidate first: rating descending, then createdAt ascending, then id.
fn canonical_order(a: &ResourceRecord, b: &ResourceRecord) -> Ordering {
    let rating = |r: &ResourceRecord| r.rating.filter(|v| v.is_finite()).unwrap_or(0.0);
    rating(b)
        .total_cmp(&rating(a))
        .then_with(|| match (a.created_at, b.created_at) {
            (Some(x), Some(y)) => x.cmp(&y),
            (Some(_), None) => Ordering::Less,
            (None, Some(_)) => Ordering::Greater,
            (None, None) => Ordering::Equal,
        })
        .then_with(|| a.id.cmp(&b.id))
}

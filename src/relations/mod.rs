// Relationship engine
// All-pairs scoring between asset fingerprints. The pair loop is O(n^2) in
// asset count; each pair reads two fingerprints and writes two edge lists.

mod classify;
mod evidence;

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::assets::Asset;
use crate::config::ScoringConfig;
use crate::constants::BASE_REFERENCE_CONFIDENCE;
use crate::fingerprint::{build_fingerprint, MediaFingerprint};
use crate::text;

pub use classify::classify;
pub use evidence::{
    collect_evidence, duration_match, name_similarity, path_proximity, size_ratio_evidence, temporal_proximity,
    EvidenceItem, EvidenceType,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RelationshipType {
    Proxy,
    Offline,
    Online,
    Preview,
    Master,
    Alternate,
}

impl RelationshipType {
    pub fn as_str(&self) -> &'static str {
        match self {
            RelationshipType::Proxy => "proxy",
            RelationshipType::Offline => "offline",
            RelationshipType::Online => "online",
            RelationshipType::Preview => "preview",
            RelationshipType::Master => "master",
            RelationshipType::Alternate => "alternate",
        }
    }
}

impl fmt::Display for RelationshipType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Directed edge: what the owning reference is relative to `target_id`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PotentialRelationship {
    pub target_id: String,
    #[serde(rename = "type")]
    pub kind: RelationshipType,
    pub confidence: f64,
    pub evidence: Vec<EvidenceItem>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MediaReference {
    pub id: String,
    pub asset: Asset,
    pub fingerprint: MediaFingerprint,
    pub relationships: Vec<PotentialRelationship>,
    pub confidence: f64,
}

impl MediaReference {
    pub fn new(asset: &Asset, all_assets: &[Asset]) -> Self {
        Self {
            id: asset.id.clone(),
            fingerprint: build_fingerprint(asset, all_assets),
            asset: asset.clone(),
            relationships: Vec::new(),
            confidence: BASE_REFERENCE_CONFIDENCE,
        }
    }
}

/// True when a pair must not be scored at all: distinct or complete RED
/// metaclips, exact duplicates, or paths from different project trees.
pub fn should_skip(a: &MediaReference, b: &MediaReference, config: &ScoringConfig) -> bool {
    if a.asset.is_red() && b.asset.is_red() {
        if a.fingerprint.base_name != b.fingerprint.base_name {
            return true;
        }
        if a.asset.segment_count() > 1 && b.asset.segment_count() > 1 {
            return true;
        }
    }

    if a.asset.name == b.asset.name && a.asset.format == b.asset.format {
        return true;
    }

    text::shared_leading_parts(&a.asset.primary_file.path, &b.asset.primary_file.path) < config.min_shared_path_parts
}

/// Score `a` against `b`. Returns at most one edge, owned by `a`.
pub fn score_relationship(a: &MediaReference, b: &MediaReference, config: &ScoringConfig) -> Vec<PotentialRelationship> {
    if should_skip(a, b, config) {
        return Vec::new();
    }

    let evidence = collect_evidence(a, b, config);

    let either_red = a.asset.is_red() || b.asset.is_red();
    let (min_evidence, min_confidence) = if either_red {
        (config.red_min_evidence, config.red_min_confidence)
    } else {
        (config.min_evidence, config.min_confidence)
    };

    if evidence.is_empty() || evidence.len() < min_evidence {
        return Vec::new();
    }

    let confidence = evidence.iter().map(|e| e.strength).sum::<f64>() / evidence.len() as f64;
    if confidence < min_confidence {
        return Vec::new();
    }

    vec![PotentialRelationship {
        target_id: b.id.clone(),
        kind: classify(a, b, &evidence),
        confidence: confidence.clamp(0.0, 1.0),
        evidence,
    }]
}

/// Fingerprint every asset, score all pairs in both directions and fold the
/// mean edge confidence into each reference.
pub fn build_references(assets: &[Asset], config: &ScoringConfig) -> Vec<MediaReference> {
    let mut references: Vec<MediaReference> = assets.iter().map(|a| MediaReference::new(a, assets)).collect();

    let mut pairs = 0usize;
    for i in 0..references.len() {
        for j in (i + 1)..references.len() {
            let forward = score_relationship(&references[i], &references[j], config);
            let backward = score_relationship(&references[j], &references[i], config);
            references[i].relationships.extend(forward);
            references[j].relationships.extend(backward);
            pairs += 1;
        }
    }

    for reference in references.iter_mut() {
        let mean = if reference.relationships.is_empty() {
            1.0
        } else {
            reference.relationships.iter().map(|r| r.confidence).sum::<f64>() / reference.relationships.len() as f64
        };
        reference.confidence = (reference.confidence + mean) / 2.0;
    }

    let edges: usize = references.iter().map(|r| r.relationships.len()).sum();
    log::info!("Scored {} pairs across {} references, {} edges", pairs, references.len(), edges);

    references
}

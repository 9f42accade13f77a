// Evidence signals between two references
// Each signal is computed independently and kept only above its threshold.

use std::collections::{BTreeMap, BTreeSet};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::MediaReference;
use crate::config::ScoringConfig;
use crate::constants::{MASTER_SUFFIXES, PROXY_SUFFIXES};
use crate::fingerprint::MediaFingerprint;
use crate::text;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EvidenceType {
    NameSimilarity,
    PathProximity,
    DurationMatch,
    SizeRatio,
    TemporalProximity,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EvidenceItem {
    #[serde(rename = "type")]
    pub kind: EvidenceType,
    pub strength: f64,
    pub details: BTreeMap<String, f64>,
}

impl EvidenceItem {
    fn new(kind: EvidenceType, strength: f64, details: &[(&str, f64)]) -> Self {
        Self {
            kind,
            strength: strength.clamp(0.0, 1.0),
            details: details.iter().map(|(k, v)| (k.to_string(), *v)).collect(),
        }
    }

    pub fn detail(&self, key: &str) -> Option<f64> {
        self.details.get(key).copied()
    }
}

/// All evidence between `a` and `b` that clears its threshold.
pub fn collect_evidence(a: &MediaReference, b: &MediaReference, config: &ScoringConfig) -> Vec<EvidenceItem> {
    let mut evidence = Vec::new();
    let (fp1, fp2) = (&a.fingerprint, &b.fingerprint);

    let either_red = a.asset.is_red() || b.asset.is_red();
    let name_threshold = if either_red { config.red_name_threshold } else { config.name_threshold };
    let similarity = name_similarity(a, b, config);
    if similarity > name_threshold {
        evidence.push(EvidenceItem::new(EvidenceType::NameSimilarity, similarity, &[("similarity", similarity)]));
    }

    let proximity = path_proximity(fp1, fp2);
    if proximity > config.path_threshold {
        evidence.push(EvidenceItem::new(EvidenceType::PathProximity, proximity, &[("proximity", proximity)]));
    }

    if let Some(similarity) = duration_match(fp1.duration, fp2.duration) {
        if similarity > config.duration_threshold {
            evidence.push(EvidenceItem::new(EvidenceType::DurationMatch, similarity, &[("similarity", similarity)]));
        }
    }

    if fp1.size_ratio > 0.0 && fp2.size_ratio > 0.0 {
        let size = size_ratio_evidence(fp1.size_ratio, fp2.size_ratio, &config.proxy_ratios);
        if size.strength > config.size_threshold {
            evidence.push(size);
        }
    }

    if let Some((strength, hours)) = temporal_proximity(fp1.creation_time, fp2.creation_time, config.temporal_window_hours) {
        evidence.push(EvidenceItem::new(EvidenceType::TemporalProximity, strength, &[("hoursDiff", hours)]));
    }

    evidence
}

/// 1.0 for identical base names, the suffix-pair score when one asset name is
/// the other plus a proxy/master suffix, else a Jaccard/edit-distance blend.
pub fn name_similarity(a: &MediaReference, b: &MediaReference, config: &ScoringConfig) -> f64 {
    let (fp1, fp2) = (&a.fingerprint, &b.fingerprint);
    if fp1.base_name == fp2.base_name {
        return 1.0;
    }

    let name1 = text::strip_extension(&a.asset.name).to_lowercase();
    let name2 = text::strip_extension(&b.asset.name).to_lowercase();
    if is_suffix_pair(&name1, &name2) {
        return config.suffix_pair_score;
    }

    let jaccard = text::jaccard(&fp1.name_tokens, &fp2.name_tokens);
    let edit = text::edit_similarity(&fp1.base_name, &fp2.base_name);
    (jaccard * config.jaccard_weight + edit * config.edit_distance_weight).clamp(0.0, 1.0)
}

fn is_suffix_pair(name1: &str, name2: &str) -> bool {
    PROXY_SUFFIXES.iter().chain(MASTER_SUFFIXES.iter()).any(|suffix| {
        name1.strip_suffix(suffix) == Some(name2) || name2.strip_suffix(suffix) == Some(name1)
    })
}

/// Shared folder names over the union of both folder contexts.
pub fn path_proximity(fp1: &MediaFingerprint, fp2: &MediaFingerprint) -> f64 {
    let union: BTreeSet<&String> = fp1.folder_context.iter().chain(fp2.folder_context.iter()).collect();
    if union.is_empty() {
        return 0.0;
    }
    let common = fp1.folder_context.iter().filter(|f| fp2.folder_context.contains(*f)).count();
    (common as f64 / union.len() as f64).min(1.0)
}

/// `1 - |d1 - d2| / max(d1, d2)` when both durations are known and non-zero.
pub fn duration_match(d1: Option<f64>, d2: Option<f64>) -> Option<f64> {
    let (d1, d2) = (d1?, d2?);
    if d1 <= 0.0 || d2 <= 0.0 {
        return None;
    }
    Some(1.0 - (d1 - d2).abs() / d1.max(d2))
}

/// Score how close the ratio of two size ratios sits to a typical proxy
/// compression ratio.
pub fn size_ratio_evidence(ratio1: f64, ratio2: f64, proxy_ratios: &[f64]) -> EvidenceItem {
    let ratio_of_ratios = ratio1.min(ratio2) / ratio1.max(ratio2);

    let nearest = proxy_ratios
        .iter()
        .copied()
        .fold(None, |nearest: Option<f64>, candidate| match nearest {
            Some(n) if (ratio_of_ratios - n).abs() <= (ratio_of_ratios - candidate).abs() => Some(n),
            _ => Some(candidate),
        })
        .unwrap_or(1.0);

    let strength = (1.0 - (ratio_of_ratios - nearest).abs() / nearest).max(0.0);

    EvidenceItem::new(
        EvidenceType::SizeRatio,
        strength,
        &[
            ("ratio1", ratio1),
            ("ratio2", ratio2),
            ("ratioRatio", ratio_of_ratios),
            ("nearestProxyRatio", nearest),
        ],
    )
}

/// Linear decay over the window; `None` outside it or without timestamps.
pub fn temporal_proximity(
    t1: Option<DateTime<Utc>>,
    t2: Option<DateTime<Utc>>,
    window_hours: f64,
) -> Option<(f64, f64)> {
    let (t1, t2) = (t1?, t2?);
    let hours = (t1 - t2).num_milliseconds().abs() as f64 / 3_600_000.0;
    if hours < window_hours {
        Some(((1.0 - hours / window_hours).max(0.0), hours))
    } else {
        None
    }
}

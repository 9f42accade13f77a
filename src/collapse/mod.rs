// Group collapser
// Breadth-first merge of relationship edges into canonical groups.
// Order of processing:
// 1. References sorted by relationship count x confidence, strongest first
// 2. Each unprocessed reference seeds a traversal over edges above the threshold
// 3. Everything reached is claimed for good; later seeds never see it again

use std::collections::{BTreeMap, HashMap, HashSet, VecDeque};

use serde::{Deserialize, Serialize};

use crate::config::ScoringConfig;
use crate::relations::{MediaReference, RelationshipType};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CollapsedGroup {
    pub id: String,
    pub base_name: String,
    pub canonical: MediaReference,
    pub variants: Vec<MediaReference>,
    /// Variant id -> the type of the edge that pulled it into the group.
    pub relationships: BTreeMap<String, RelationshipType>,
    pub confidence: f64,
}

impl CollapsedGroup {
    /// Canonical first, then variants in traversal order.
    pub fn members(&self) -> impl Iterator<Item = &MediaReference> {
        std::iter::once(&self.canonical).chain(self.variants.iter())
    }

    /// A group always holds its canonical, so this is at least 1.
    pub fn member_count(&self) -> usize {
        1 + self.variants.len()
    }
}

fn seed_score(reference: &MediaReference) -> f64 {
    reference.relationships.len() as f64 * reference.confidence
}

fn quality(reference: &MediaReference) -> f64 {
    reference.fingerprint.size_ratio * reference.confidence
}

/// Partition `references` into disjoint groups.
pub fn collapse(references: &[MediaReference], config: &ScoringConfig) -> Vec<CollapsedGroup> {
    let index: HashMap<&str, usize> = references.iter().enumerate().map(|(i, r)| (r.id.as_str(), i)).collect();

    let mut order: Vec<usize> = (0..references.len()).collect();
    // stable sort keeps input order among equal scores
    order.sort_by(|&a, &b| seed_score(&references[b]).total_cmp(&seed_score(&references[a])));

    let mut processed: HashSet<usize> = HashSet::new();
    let mut groups = Vec::new();

    for seed in order {
        if processed.contains(&seed) {
            continue;
        }

        let (members, relationships) = traverse(references, &index, seed, &processed, config.collapse_edge_threshold);
        processed.extend(members.iter().copied());

        let mut canonical = members[0];
        for &member in &members[1..] {
            if quality(&references[member]) > quality(&references[canonical]) {
                canonical = member;
            }
        }

        let confidence = members.iter().map(|&m| references[m].confidence).sum::<f64>() / members.len() as f64;
        let canonical_ref = &references[canonical];

        groups.push(CollapsedGroup {
            id: format!("group_{}", canonical_ref.id),
            base_name: canonical_ref.fingerprint.base_name.clone(),
            canonical: canonical_ref.clone(),
            variants: members
                .iter()
                .filter(|&&m| m != canonical)
                .map(|&m| references[m].clone())
                .collect(),
            relationships,
            confidence: confidence.clamp(0.0, 1.0),
        });
    }

    let multi = groups.iter().filter(|g| !g.variants.is_empty()).count();
    log::info!(
        "Collapsed {} references into {} groups ({} with variants)",
        references.len(),
        groups.len(),
        multi
    );

    groups
}

/// BFS from `seed`. Returns reached indices in discovery order (seed first)
/// and the edge type recorded for each reached target.
fn traverse(
    references: &[MediaReference],
    index: &HashMap<&str, usize>,
    seed: usize,
    processed: &HashSet<usize>,
    threshold: f64,
) -> (Vec<usize>, BTreeMap<String, RelationshipType>) {
    let mut members = vec![seed];
    let mut relationships = BTreeMap::new();
    let mut visited: HashSet<usize> = HashSet::from([seed]);
    let mut queue = VecDeque::from([seed]);

    while let Some(current) = queue.pop_front() {
        for edge in &references[current].relationships {
            if edge.confidence <= threshold {
                continue;
            }
            let Some(&target) = index.get(edge.target_id.as_str()) else {
                continue;
            };
            if visited.contains(&target) || processed.contains(&target) {
                continue;
            }
            visited.insert(target);
            relationships.insert(edge.target_id.clone(), edge.kind);
            members.push(target);
            queue.push_back(target);
        }
    }

    (members, relationships)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::assets::group_assets;
    use crate::relations::{build_references, PotentialRelationship};
    use crate::scan::FileRecord;

    fn edge(target: &str, kind: RelationshipType, confidence: f64) -> PotentialRelationship {
        PotentialRelationship {
            target_id: target.to_string(),
            kind,
            confidence,
            evidence: Vec::new(),
        }
    }

    fn bare_references(files: &[FileRecord]) -> Vec<MediaReference> {
        let (_, assets) = group_assets(files);
        assets.iter().map(|a| MediaReference::new(a, &assets)).collect()
    }

    #[test]
    fn test_master_and_proxy_collapse_into_one_group() {
        let files = vec![
            FileRecord::file("/Projects/Shoot/clip_master.mov", 2_000_000_000),
            FileRecord::file("/Projects/Shoot/clip_proxy.mp4", 50_000_000),
        ];
        let (_, assets) = group_assets(&files);
        let refs = build_references(&assets, &ScoringConfig::default());
        let groups = collapse(&refs, &ScoringConfig::default());

        assert_eq!(groups.len(), 1);
        let group = &groups[0];
        assert_eq!(group.canonical.asset.name, "clip_master");
        assert_eq!(group.variants.len(), 1);
        assert_eq!(group.variants[0].asset.name, "clip_proxy");
        assert_eq!(group.base_name, "clip");
        assert_eq!(group.id, format!("group_{}", group.canonical.id));
        assert_eq!(group.relationships.get(&group.variants[0].id), Some(&RelationshipType::Master));
    }

    #[test]
    fn test_weak_edges_are_not_followed() {
        let mut refs = bare_references(&[
            FileRecord::file("/S/D/a.mov", 10),
            FileRecord::file("/S/D/b.mov", 10),
        ]);
        let b_id = refs[1].id.clone();
        refs[0].relationships.push(edge(&b_id, RelationshipType::Alternate, 0.5));

        let groups = collapse(&refs, &ScoringConfig::default());
        assert_eq!(groups.len(), 2);
        assert!(groups.iter().all(|g| g.variants.is_empty()));
    }

    #[test]
    fn test_traversal_is_transitive_and_partitions() {
        let mut refs = bare_references(&[
            FileRecord::file("/S/D/a.mov", 100),
            FileRecord::file("/S/D/b.mov", 50),
            FileRecord::file("/S/D/c.mov", 25),
            FileRecord::file("/S/D/d.mov", 10),
        ]);
        let ids: Vec<String> = refs.iter().map(|r| r.id.clone()).collect();
        // a -> b -> c chain, d on its own
        refs[0].relationships.push(edge(&ids[1], RelationshipType::Online, 0.9));
        refs[1].relationships.push(edge(&ids[2], RelationshipType::Online, 0.9));
        refs[2].relationships.push(edge(&ids[0], RelationshipType::Proxy, 0.9));

        let groups = collapse(&refs, &ScoringConfig::default());
        assert_eq!(groups.len(), 2);

        let mut seen = HashSet::new();
        for group in &groups {
            for member in group.members() {
                assert!(seen.insert(member.id.clone()), "{} in two groups", member.id);
            }
        }
        assert_eq!(seen.len(), 4);

        let chain = groups.iter().find(|g| g.member_count() == 3).unwrap();
        assert_eq!(chain.canonical.id, ids[0]);
    }

    #[test]
    fn test_processed_references_never_rejoin() {
        let mut refs = bare_references(&[
            FileRecord::file("/S/D/a.mov", 10),
            FileRecord::file("/S/D/b.mov", 10),
            FileRecord::file("/S/D/c.mov", 10),
        ]);
        let ids: Vec<String> = refs.iter().map(|r| r.id.clone()).collect();
        // a seeds first (two edges) and claims b; c's edge to b is then ignored
        refs[0].relationships.push(edge(&ids[1], RelationshipType::Master, 0.9));
        refs[0].relationships.push(edge(&ids[1], RelationshipType::Master, 0.9));
        refs[2].relationships.push(edge(&ids[1], RelationshipType::Proxy, 0.9));

        let groups = collapse(&refs, &ScoringConfig::default());
        assert_eq!(groups.len(), 2);
        let lone = groups.iter().find(|g| g.members().any(|m| m.id == ids[2])).unwrap();
        assert_eq!(lone.member_count(), 1);
        assert!(lone.relationships.is_empty());
    }

    #[test]
    fn test_canonical_tie_keeps_first_member() {
        let mut refs = bare_references(&[
            FileRecord::file("/S/D/a.mov", 10),
            FileRecord::file("/S/D/b.mov", 10),
        ]);
        let b_id = refs[1].id.clone();
        refs[0].relationships.push(edge(&b_id, RelationshipType::Alternate, 0.8));

        let groups = collapse(&refs, &ScoringConfig::default());
        assert_eq!(groups.len(), 1);
        assert_eq!(groups[0].canonical.id, refs[0].id);
        assert!((groups[0].confidence - 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_empty_input() {
        assert!(collapse(&[], &ScoringConfig::default()).is_empty());
    }
}

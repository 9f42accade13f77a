// Pipeline orchestrator
// One Session per scan. It owns every intermediate result, and each stage
// rebuilds what follows it from scratch.

use serde::{Deserialize, Serialize};

use crate::assets::{group_assets, Asset, MediaFormat};
use crate::collapse::{collapse, CollapsedGroup};
use crate::config::ScoringConfig;
use crate::context::{ContextDetector, ContextObservation, DetectedContext};
use crate::hierarchy::AssetHierarchy;
use crate::metadata::{enrich_assets, EnrichmentReport, MetadataExtractor};
use crate::relations::{build_references, MediaReference, RelationshipType};
use crate::representations::{create_media_groups, MediaGroup};
use crate::scan::FileRecord;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VariantSummary {
    pub name: String,
    pub path: String,
    pub relationship: Option<RelationshipType>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GroupSummary {
    pub id: String,
    pub base_name: String,
    pub canonical: String,
    pub canonical_path: String,
    pub variants: Vec<VariantSummary>,
    pub confidence: f64,
}

impl GroupSummary {
    fn from_group(group: &CollapsedGroup) -> Self {
        Self {
            id: group.id.clone(),
            base_name: group.base_name.clone(),
            canonical: group.canonical.asset.name.clone(),
            canonical_path: group.canonical.asset.primary_file.path.clone(),
            variants: group
                .variants
                .iter()
                .map(|v| VariantSummary {
                    name: v.asset.name.clone(),
                    path: v.asset.primary_file.path.clone(),
                    relationship: group.relationships.get(&v.id).copied(),
                })
                .collect(),
            confidence: group.confidence,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionSummary {
    pub format: Option<MediaFormat>,
    pub file_count: usize,
    pub directory_count: usize,
    pub asset_count: usize,
    pub relationship_count: usize,
    pub enrichment: EnrichmentReport,
    pub groups: Vec<GroupSummary>,
    pub contexts: Vec<DetectedContext>,
    pub observations: Vec<ContextObservation>,
}

pub struct Session {
    config: ScoringConfig,
    files: Vec<FileRecord>,
    format: Option<MediaFormat>,
    assets: Vec<Asset>,
    references: Vec<MediaReference>,
    groups: Vec<CollapsedGroup>,
    detector: ContextDetector,
    enrichment: EnrichmentReport,
}

impl Session {
    pub fn new(config: ScoringConfig) -> Self {
        Self {
            config,
            files: Vec::new(),
            format: None,
            assets: Vec::new(),
            references: Vec::new(),
            groups: Vec::new(),
            detector: ContextDetector::new(),
            enrichment: EnrichmentReport::default(),
        }
    }

    pub fn config(&self) -> &ScoringConfig {
        &self.config
    }

    pub fn files(&self) -> &[FileRecord] {
        &self.files
    }

    pub fn format(&self) -> Option<MediaFormat> {
        self.format
    }

    pub fn assets(&self) -> &[Asset] {
        &self.assets
    }

    pub fn references(&self) -> &[MediaReference] {
        &self.references
    }

    pub fn groups(&self) -> &[CollapsedGroup] {
        &self.groups
    }

    pub fn detector(&self) -> &ContextDetector {
        &self.detector
    }

    /// Replace the file set; everything derived from the old set is dropped.
    pub fn ingest(&mut self, records: Vec<FileRecord>) {
        self.files = records;
        self.format = None;
        self.assets.clear();
        self.references.clear();
        self.groups.clear();
        self.detector.clear();
        self.enrichment = EnrichmentReport::default();
    }

    pub fn group(&mut self) -> (MediaFormat, &[Asset]) {
        let (format, assets) = group_assets(&self.files);
        self.format = Some(format);
        self.assets = assets;
        self.references.clear();
        self.groups.clear();
        (format, &self.assets)
    }

    pub fn enrich(&mut self, extractor: &dyn MetadataExtractor) -> EnrichmentReport {
        self.enrichment = enrich_assets(&mut self.assets, extractor);
        self.enrichment.clone()
    }

    pub fn relate(&mut self) -> &[MediaReference] {
        self.references = build_references(&self.assets, &self.config);
        self.groups.clear();
        &self.references
    }

    pub fn collapse(&mut self) -> &[CollapsedGroup] {
        self.groups = collapse(&self.references, &self.config);
        &self.groups
    }

    pub fn detect_contexts(&mut self) -> Vec<DetectedContext> {
        self.detector.clear();
        let contexts = self.detector.analyze_files(&self.files);
        self.detector.generate_observations();
        contexts
    }

    pub fn media_groups(&self) -> Vec<MediaGroup> {
        create_media_groups(&self.groups)
    }

    /// Shoots and label trees over the grouped assets.
    pub fn hierarchy(&self) -> AssetHierarchy {
        AssetHierarchy::build(&self.assets)
    }

    pub fn summary(&self) -> SessionSummary {
        SessionSummary {
            format: self.format,
            file_count: self.files.iter().filter(|f| f.is_file()).count(),
            directory_count: self.files.iter().filter(|f| f.is_directory()).count(),
            asset_count: self.assets.len(),
            relationship_count: self.references.iter().map(|r| r.relationships.len()).sum(),
            enrichment: self.enrichment.clone(),
            groups: self.groups.iter().map(GroupSummary::from_group).collect(),
            contexts: self.detector.contexts().to_vec(),
            observations: self.detector.observations().to_vec(),
        }
    }

    /// Every stage in order over the current file set.
    pub fn run(&mut self, extractor: &dyn MetadataExtractor) -> SessionSummary {
        let (format, assets) = self.group();
        log::info!("Grouped {} assets as {}", assets.len(), format);
        self.enrich(extractor);
        self.relate();
        self.collapse();
        self.detect_contexts();
        self.summary()
    }
}

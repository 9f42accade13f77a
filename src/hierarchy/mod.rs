// Asset hierarchy
// Shoots above assets, plus label-driven virtual trees (project, camera,
// date...) that list one asset under several headings without copying it.

use std::collections::{BTreeMap, HashMap};
use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::assets::Asset;
use crate::constants::{
    FOLDER_LABEL_CONFIDENCE, PATH_LABEL_CONFIDENCE, RED_LABEL_CONFIDENCE, SHOOT_LABEL_CONFIDENCE, UNKNOWN_SHOOT,
};
use crate::naming::{analyze_folder_path, validate_red_name};
use crate::text::{self, LazyRegex};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LabelType {
    Project,
    Camera,
    Date,
    Status,
    Location,
    Technical,
    Content,
    Custom,
}

impl LabelType {
    pub fn as_str(&self) -> &'static str {
        match self {
            LabelType::Project => "project",
            LabelType::Camera => "camera",
            LabelType::Date => "date",
            LabelType::Status => "status",
            LabelType::Location => "location",
            LabelType::Technical => "technical",
            LabelType::Content => "content",
            LabelType::Custom => "custom",
        }
    }

    /// Display name of the type's tree.
    pub fn heading(&self) -> &'static str {
        match self {
            LabelType::Project => "Project",
            LabelType::Camera => "Camera",
            LabelType::Date => "Date",
            LabelType::Status => "Status",
            LabelType::Location => "Location",
            LabelType::Technical => "Technical",
            LabelType::Content => "Content",
            LabelType::Custom => "Custom",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum LabelSource {
    AutoDetected,
    UserAssigned,
    Inherited,
    RuleBased,
}

/// A `key = value` label and where it sits in its tree.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MetadataLabel {
    pub key: String,
    pub value: String,
    #[serde(rename = "type")]
    pub kind: LabelType,
    pub confidence: f64,
    pub source: LabelSource,
    /// Tree path, heading first, e.g. `["Cameras", "C001"]`.
    pub hierarchy: Vec<String>,
    /// Ids of the assets carrying this label.
    pub assets: Vec<String>,
}

impl MetadataLabel {
    fn detected(key: &str, value: &str, kind: LabelType, confidence: f64, hierarchy: Vec<String>) -> Self {
        Self {
            key: key.to_string(),
            value: value.to_string(),
            kind,
            confidence,
            source: LabelSource::AutoDetected,
            hierarchy,
            assets: Vec::new(),
        }
    }

    fn for_asset(mut self, asset_id: &str) -> Self {
        self.assets.push(asset_id.to_string());
        self
    }
}

static SEGMENT_TYPES: LazyLock<Vec<(LabelType, Regex)>> = LazyLock::new(|| {
    [
        (LabelType::Date, r"\d{4}[-_]\d{2}[-_]\d{2}"),
        (LabelType::Project, r"(?i)project|show|event"),
        (LabelType::Camera, r"(?i)cam|camera"),
        (LabelType::Location, r"(?i)location|venue|room"),
    ]
    .into_iter()
    .filter_map(|(kind, pattern)| Regex::new(pattern).ok().map(|re| (kind, re)))
    .collect()
});

static FOLDER_DATE: LazyRegex = LazyLock::new(|| Regex::new(r"\d{4}[-_]\d{2}[-_]\d{2}").ok());

const KEY_TYPES: [(LabelType, &[&str]); 6] = [
    (LabelType::Project, &["project", "show", "event"]),
    (LabelType::Camera, &["camera", "cam"]),
    (LabelType::Date, &["date", "shoot"]),
    (LabelType::Technical, &["reel", "roll", "card"]),
    (LabelType::Status, &["status", "state"]),
    (LabelType::Location, &["location", "venue", "room"]),
];

/// Label type of a folder name.
pub fn detect_segment_type(segment: &str) -> LabelType {
    SEGMENT_TYPES
        .iter()
        .find(|(_, re)| re.is_match(segment))
        .map(|(kind, _)| *kind)
        .unwrap_or(LabelType::Content)
}

/// Label type implied by a label key.
pub fn detect_label_type(key: &str) -> LabelType {
    let key = key.to_lowercase();
    KEY_TYPES
        .iter()
        .find(|(_, words)| words.iter().any(|w| key.contains(w)))
        .map(|(kind, _)| *kind)
        .unwrap_or(LabelType::Custom)
}

/// `20240315` becomes `2024-03-15`; other text is returned as is.
pub fn format_shoot_date(raw: &str) -> String {
    if raw.len() == 8 && raw.chars().all(|c| c.is_ascii_digit()) {
        format!("{}-{}-{}", &raw[..4], &raw[4..6], &raw[6..])
    } else {
        raw.to_string()
    }
}

/// Shoot day of an asset: the date in a standard RED clip name, otherwise
/// the dated folder it sits in. Both come out as `YYYY-MM-DD`.
pub fn shoot_date_of(asset: &Asset) -> Option<String> {
    if let Some(red) = validate_red_name(&asset.primary_file.name) {
        if red.pattern_id == "red-standard" {
            return Some(format_shoot_date(&red.stamp));
        }
    }

    let segment = analyze_folder_path(asset.primary_file.dir()).shoot_date?;
    FOLDER_DATE
        .as_ref()
        .and_then(|re| re.find(&segment))
        .map(|m| m.as_str().replace('_', "-"))
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ShootGroup {
    pub id: String,
    pub name: String,
    pub shoot_date: String,
    /// Asset ids in input order; the first is the group's primary asset.
    pub assets: Vec<String>,
    pub red_clip_count: usize,
    pub label: MetadataLabel,
}

impl ShootGroup {
    pub fn primary(&self) -> Option<&str> {
        self.assets.first().map(String::as_str)
    }
}

/// Bucket assets by shoot day. RED clips without a date land in the
/// `unknown` shoot; other undated assets belong to no shoot.
pub fn group_by_shoot(assets: &[Asset]) -> Vec<ShootGroup> {
    let mut shoots: BTreeMap<String, Vec<&Asset>> = BTreeMap::new();

    for asset in assets {
        let date = match shoot_date_of(asset) {
            Some(date) => date,
            None if asset.is_red() => UNKNOWN_SHOOT.to_string(),
            None => continue,
        };
        shoots.entry(date).or_default().push(asset);
    }

    shoots
        .into_iter()
        .map(|(date, members)| {
            let ids: Vec<String> = members.iter().map(|a| a.id.clone()).collect();
            let mut label = MetadataLabel::detected(
                "shoot-date",
                &date,
                LabelType::Date,
                SHOOT_LABEL_CONFIDENCE,
                vec!["Shoots".to_string(), date.clone()],
            );
            label.assets = ids.clone();

            ShootGroup {
                id: format!("shoot-{}", date),
                name: format!("Shoot {}", date),
                red_clip_count: members.iter().filter(|a| a.is_red()).count(),
                shoot_date: date,
                assets: ids,
                label,
            }
        })
        .collect()
}

/// Labels an asset carries by name: reel, camera and date of a RED clip,
/// plus project, camera unit and shoot day taken from its folders.
pub fn asset_labels(asset: &Asset) -> Vec<MetadataLabel> {
    let mut labels = Vec::new();

    if let Some(red) = validate_red_name(&asset.primary_file.name) {
        let heading = |parts: &[&str]| parts.iter().map(|p| p.to_string()).collect::<Vec<_>>();
        labels.push(MetadataLabel::detected(
            "reel-id",
            &red.reel,
            LabelType::Technical,
            RED_LABEL_CONFIDENCE,
            heading(&["Technical", "Reels", red.reel.as_str()]),
        ));
        labels.push(MetadataLabel::detected(
            "camera-id",
            &red.camera,
            LabelType::Camera,
            RED_LABEL_CONFIDENCE,
            heading(&["Cameras", red.camera.as_str()]),
        ));
        if red.pattern_id == "red-standard" {
            let date = format_shoot_date(&red.stamp);
            labels.push(MetadataLabel::detected(
                "shoot-date",
                &date,
                LabelType::Date,
                RED_LABEL_CONFIDENCE,
                heading(&["Dates", date.as_str()]),
            ));
        }
    }

    // a deeper folder overrides a shallower one of the same kind
    let mut from_path: BTreeMap<&str, &str> = BTreeMap::new();
    for segment in text::segments(asset.primary_file.dir()) {
        let key = match detect_segment_type(segment) {
            LabelType::Date => "shoot-date",
            LabelType::Project => "project-name",
            LabelType::Camera => "camera-unit",
            _ => continue,
        };
        from_path.insert(key, segment);
    }
    for (key, value) in from_path {
        let kind = detect_label_type(key);
        labels.push(MetadataLabel::detected(
            key,
            value,
            kind,
            PATH_LABEL_CONFIDENCE,
            vec![kind.heading().to_string(), value.to_string()],
        ));
    }

    labels.into_iter().map(|l| l.for_asset(&asset.id)).collect()
}

/// One label per folder level of `dir`, placed under `Folders`.
pub fn folder_labels(dir: &str) -> Vec<MetadataLabel> {
    let segments = text::segments(dir);
    segments
        .iter()
        .enumerate()
        .map(|(level, segment)| {
            let mut hierarchy = vec!["Folders".to_string()];
            hierarchy.extend(segments[..=level].iter().map(|s| s.to_string()));
            MetadataLabel::detected(
                &format!("level-{}", level),
                segment,
                detect_segment_type(segment),
                FOLDER_LABEL_CONFIDENCE,
                hierarchy,
            )
        })
        .collect()
}

/// Merge labels with the same key, value and tree path. The most confident
/// copy wins and the asset lists are unioned; first-seen order is kept.
pub fn consolidate_labels(labels: Vec<MetadataLabel>) -> Vec<MetadataLabel> {
    let mut merged: Vec<MetadataLabel> = Vec::new();
    let mut index: HashMap<(String, String, Vec<String>), usize> = HashMap::new();

    for label in labels {
        let key = (label.key.clone(), label.value.clone(), label.hierarchy.clone());
        match index.get(&key) {
            Some(&i) => {
                let existing = &mut merged[i];
                let mut assets = std::mem::take(&mut existing.assets);
                for id in &label.assets {
                    if !assets.contains(id) {
                        assets.push(id.clone());
                    }
                }
                if label.confidence > existing.confidence {
                    *existing = label;
                }
                existing.assets = assets;
            }
            None => {
                index.insert(key, merged.len());
                merged.push(label);
            }
        }
    }

    merged
}

/// Every label of a batch: asset labels first, then folder labels, then
/// shoot labels, consolidated.
pub fn detect_labels(assets: &[Asset], shoots: &[ShootGroup]) -> Vec<MetadataLabel> {
    let mut labels = Vec::new();

    for asset in assets {
        labels.extend(asset_labels(asset));
    }
    for asset in assets {
        labels.extend(
            folder_labels(asset.primary_file.dir())
                .into_iter()
                .map(|l| l.for_asset(&asset.id)),
        );
    }
    labels.extend(shoots.iter().map(|s| s.label.clone()));

    consolidate_labels(labels)
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HierarchyNode {
    pub id: String,
    pub key: String,
    pub value: String,
    #[serde(rename = "type")]
    pub kind: LabelType,
    pub depth: usize,
    pub children: Vec<HierarchyNode>,
    /// Assets whose label path ends here.
    pub assets: Vec<String>,
}

impl HierarchyNode {
    pub fn child(&self, value: &str) -> Option<&HierarchyNode> {
        self.children.iter().find(|c| c.value == value)
    }
}

/// Turn label paths into a forest. Labels sharing a path prefix share the
/// nodes of that prefix.
pub fn build_hierarchy_structure(labels: &[MetadataLabel]) -> Vec<HierarchyNode> {
    let mut roots = Vec::new();
    for label in labels {
        insert_label(&mut roots, label, 0);
    }
    roots
}

fn insert_label(nodes: &mut Vec<HierarchyNode>, label: &MetadataLabel, depth: usize) {
    let Some(level) = label.hierarchy.get(depth) else {
        return;
    };

    let idx = match nodes.iter().position(|n| &n.value == level) {
        Some(idx) => idx,
        None => {
            nodes.push(HierarchyNode {
                id: format!("node-{}", label.hierarchy[..=depth].join("/")),
                key: label.key.clone(),
                value: level.clone(),
                kind: label.kind,
                depth,
                children: Vec::new(),
                assets: Vec::new(),
            });
            nodes.len() - 1
        }
    };

    let node = &mut nodes[idx];
    if depth + 1 == label.hierarchy.len() {
        for id in &label.assets {
            if !node.assets.contains(id) {
                node.assets.push(id.clone());
            }
        }
    } else {
        insert_label(&mut node.children, label, depth + 1);
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VirtualHierarchy {
    pub id: String,
    pub name: String,
    #[serde(rename = "type")]
    pub kind: LabelType,
    /// Most confident label of the type (first one on a tie).
    pub root_label: MetadataLabel,
    pub structure: Vec<HierarchyNode>,
    pub labels: Vec<MetadataLabel>,
}

/// One tree per label type present, in type order.
pub fn create_virtual_hierarchies(labels: &[MetadataLabel]) -> Vec<VirtualHierarchy> {
    let mut by_type: BTreeMap<LabelType, Vec<MetadataLabel>> = BTreeMap::new();
    for label in labels {
        by_type.entry(label.kind).or_default().push(label.clone());
    }

    by_type
        .into_iter()
        .filter_map(|(kind, labels)| {
            let root_label = labels
                .iter()
                .reduce(|best, l| if l.confidence > best.confidence { l } else { best })?
                .clone();
            Some(VirtualHierarchy {
                id: format!("hierarchy-{}", kind.as_str()),
                name: kind.heading().to_string(),
                kind,
                root_label,
                structure: build_hierarchy_structure(&labels),
                labels,
            })
        })
        .collect()
}

/// Shoots, labels and virtual trees for one asset batch.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AssetHierarchy {
    pub shoots: Vec<ShootGroup>,
    pub labels: Vec<MetadataLabel>,
    pub hierarchies: Vec<VirtualHierarchy>,
}

impl AssetHierarchy {
    pub fn build(assets: &[Asset]) -> Self {
        let shoots = group_by_shoot(assets);
        let labels = detect_labels(assets, &shoots);
        let hierarchies = create_virtual_hierarchies(&labels);

        log::info!(
            "Hierarchy: {} shoots, {} labels, {} trees",
            shoots.len(),
            labels.len(),
            hierarchies.len()
        );

        Self {
            shoots,
            labels,
            hierarchies,
        }
    }

    pub fn hierarchy(&self, kind: LabelType) -> Option<&VirtualHierarchy> {
        self.hierarchies.iter().find(|h| h.kind == kind)
    }

    pub fn assets_by_label(&self, key: &str, value: &str) -> Vec<&str> {
        self.labels
            .iter()
            .filter(|l| l.key == key && l.value == value)
            .flat_map(|l| l.assets.iter().map(String::as_str))
            .collect()
    }

    /// Tree path of the first `kind` label the asset carries.
    pub fn virtual_location(&self, asset_id: &str, kind: LabelType) -> Option<&[String]> {
        self.labels
            .iter()
            .find(|l| l.kind == kind && l.assets.iter().any(|a| a == asset_id))
            .map(|l| l.hierarchy.as_slice())
    }
}

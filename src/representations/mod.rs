// Representations, automatic tags, media groups and smart collections

use std::collections::BTreeMap;
use std::fmt;
use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::assets::{Asset, MediaFormat};
use crate::collapse::CollapsedGroup;
use crate::constants::{PROXY_SIZE_LIMIT_BYTES, RECENT_COLLECTION_LIMIT};
use crate::relations::RelationshipType;
use crate::text::{self, LazyRegex};

const GB: f64 = 1024.0 * 1024.0 * 1024.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RepresentationType {
    Online,
    Master,
    Proxy,
    Offline,
    Preview,
    Alternate,
}

impl RepresentationType {
    pub fn as_str(&self) -> &'static str {
        match self {
            RepresentationType::Online => "online",
            RepresentationType::Master => "master",
            RepresentationType::Proxy => "proxy",
            RepresentationType::Offline => "offline",
            RepresentationType::Preview => "preview",
            RepresentationType::Alternate => "alternate",
        }
    }
}

impl fmt::Display for RepresentationType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl From<RelationshipType> for RepresentationType {
    fn from(kind: RelationshipType) -> Self {
        match kind {
            RelationshipType::Proxy => RepresentationType::Proxy,
            RelationshipType::Offline => RepresentationType::Offline,
            RelationshipType::Online => RepresentationType::Online,
            RelationshipType::Preview => RepresentationType::Preview,
            RelationshipType::Master => RepresentationType::Master,
            RelationshipType::Alternate => RepresentationType::Alternate,
        }
    }
}

const PROXY_MARKERS: [&str; 12] = [
    "/proxy/", "/proxies/", "/proxy_", "_proxy", "_prx", "_low", "_preview", "_thumb", "_h264", "_mp4", "_comp",
    "_compressed",
];
const OFFLINE_MARKERS: [&str; 9] = [
    "/offline/", "/edit/", "/rough_cut/", "/assembly/", "_offline", "_edit", "_cut", "_rough", "_assembly",
];
const ONLINE_MARKERS: [&str; 15] = [
    "/online/", "/master/", "/source/", "/original/", "/raw/", "/full/", "/hires/", "/hi_res/", "/uncompressed/",
    "_master", "_source", "_original", "_online", "_full", "_hires",
];
const PROXY_FILE_EXTENSIONS: [&str; 5] = ["mp4", "h264", "avi", "wmv", "webm"];
const ONLINE_FILE_EXTENSIONS: [&str; 7] = ["r3d", "braw", "mxf", "dpx", "exr", "tiff", "tif"];

/// Representation of a single asset judged from its own path, name,
/// extension and size. Markers win over extensions, extensions over size.
pub fn detect_representation_type(asset: &Asset) -> RepresentationType {
    let path = asset.primary_file.path.to_lowercase();
    let name = asset.primary_file.name.to_lowercase();
    let ext = asset.primary_file.extension().unwrap_or_default();
    let marked = |markers: &[&str]| markers.iter().any(|m| path.contains(m) || name.contains(m));

    if marked(&PROXY_MARKERS[..]) {
        return RepresentationType::Proxy;
    }
    if marked(&OFFLINE_MARKERS[..]) {
        return RepresentationType::Offline;
    }
    if marked(&ONLINE_MARKERS[..]) {
        return RepresentationType::Online;
    }
    if path.contains("/preview/") || name.contains("_preview") || name.contains("_prev") {
        return RepresentationType::Preview;
    }

    if PROXY_FILE_EXTENSIONS.contains(&ext.as_str()) {
        return RepresentationType::Proxy;
    }
    if ONLINE_FILE_EXTENSIONS.contains(&ext.as_str()) {
        return RepresentationType::Online;
    }

    if (ext == "mov" || ext == "mp4") && asset.primary_file.size < PROXY_SIZE_LIMIT_BYTES {
        return RepresentationType::Proxy;
    }

    RepresentationType::Online
}

static SCENE_FOLDER: LazyRegex = LazyLock::new(|| Regex::new(r"(?i)^(scene|sc)[\s_-]*\d+").ok());
static TAKE_FOLDER: LazyRegex = LazyLock::new(|| Regex::new(r"(?i)^(take|tk|shot)[\s_-]*\d+").ok());
static CAMERA_FOLDER: LazyRegex = LazyLock::new(|| Regex::new(r"(?i)^(cam|camera)[\s_-]*[a-z]").ok());
static DATE_FOLDER: LazyRegex = LazyLock::new(|| Regex::new(r"^\d{4}[-_]\d{2}[-_]\d{2}").ok());

/// `category:value` tags for one asset.
pub fn generate_automatic_tags(asset: &Asset) -> Vec<String> {
    let meta = &asset.metadata;
    let mut tags = vec![format!("format:{}", asset.format)];

    if let Some(codec) = &meta.codec {
        tags.push(format!("codec:{}", codec.to_lowercase()));
    }

    if let Some(resolution) = &meta.resolution {
        let res = resolution.to_lowercase();
        let tag = if res.contains("4k") || res.contains("3840") {
            "4k".to_string()
        } else if res.contains("2k") || res.contains("1920") {
            "2k".to_string()
        } else if res.contains("1080") {
            "1080p".to_string()
        } else if res.contains("720") {
            "720p".to_string()
        } else {
            res
        };
        tags.push(format!("resolution:{}", tag));
    }

    if let Some(fps) = meta.frame_rate {
        tags.push(format!("fps:{}", fps));
        if fps >= 60.0 {
            tags.push("fps:highspeed".to_string());
        }
        if fps <= 25.0 {
            tags.push("fps:cinema".to_string());
        }
    }

    for part in text::segments(asset.primary_file.dir()) {
        if text::is_match(&SCENE_FOLDER, part) {
            tags.push(format!("scene:{}", part.to_lowercase()));
        } else if text::is_match(&TAKE_FOLDER, part) {
            tags.push(format!("take:{}", part.to_lowercase()));
        } else if text::is_match(&CAMERA_FOLDER, part) {
            tags.push(format!("camera:{}", part.to_lowercase()));
        } else if text::is_match(&DATE_FOLDER, part) {
            tags.push(format!("date:{}", part));
        } else if part.chars().count() < 20 {
            tags.push(format!("folder:{}", part.to_lowercase()));
        }
    }

    if let Some(roll) = &meta.capture_roll {
        tags.push(format!("roll:{}", roll.to_lowercase()));
    }

    let size = meta.total_size.filter(|s| *s > 0).unwrap_or(asset.primary_file.size) as f64 / GB;
    tags.push(
        if size > 10.0 {
            "size:large"
        } else if size > 1.0 {
            "size:medium"
        } else {
            "size:small"
        }
        .to_string(),
    );

    tags.push(format!("type:{}", detect_representation_type(asset)));
    tags
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MediaRepresentation {
    #[serde(rename = "type")]
    pub kind: RepresentationType,
    pub resolution: Option<String>,
    pub codec: Option<String>,
    pub bitrate: Option<f64>,
    pub asset: Asset,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MediaGroup {
    pub id: String,
    pub base_name: String,
    /// Canonical first.
    pub representations: Vec<MediaRepresentation>,
    pub primary_representation: usize,
    pub tags: Vec<String>,
    pub metadata: BTreeMap<String, String>,
}

impl MediaGroup {
    pub fn primary(&self) -> Option<&MediaRepresentation> {
        self.representations.get(self.primary_representation)
    }

    pub fn has_tag(&self, tag: &str) -> bool {
        self.tags.iter().any(|t| t == tag)
    }

    pub fn has_representation(&self, kind: RepresentationType) -> bool {
        self.representations.iter().any(|r| r.kind == kind)
    }
}

/// The canonical is online; variants take the type of the edge that pulled
/// them in, or their own detected type.
pub fn create_media_group(group: &CollapsedGroup) -> MediaGroup {
    let mut representations = Vec::with_capacity(group.member_count());
    let mut tags: Vec<String> = Vec::new();

    for (i, reference) in group.members().enumerate() {
        let asset = &reference.asset;
        let kind = if i == 0 {
            RepresentationType::Online
        } else {
            group
                .relationships
                .get(&reference.id)
                .map(|&k| RepresentationType::from(k))
                .unwrap_or_else(|| detect_representation_type(asset))
        };

        for tag in generate_automatic_tags(asset) {
            if !tags.contains(&tag) {
                tags.push(tag);
            }
        }

        representations.push(MediaRepresentation {
            kind,
            resolution: asset.metadata.resolution.clone(),
            codec: asset.metadata.codec.clone(),
            bitrate: asset.metadata.bitrate,
            asset: asset.clone(),
        });
    }

    let canonical = &group.canonical.asset.metadata;
    let mut metadata = BTreeMap::new();
    if let Some(roll) = &canonical.capture_roll {
        metadata.insert("captureRoll".to_string(), roll.clone());
    }
    if let Some(camera) = &canonical.camera_model {
        metadata.insert("camera".to_string(), camera.clone());
    }
    if let Some(date) = &canonical.recording_date {
        metadata.insert("captureDate".to_string(), date.to_string());
    }

    MediaGroup {
        id: group.id.clone(),
        base_name: group.base_name.clone(),
        representations,
        primary_representation: 0,
        tags,
        metadata,
    }
}

pub fn create_media_groups(groups: &[CollapsedGroup]) -> Vec<MediaGroup> {
    let media: Vec<MediaGroup> = groups.iter().map(create_media_group).collect();
    log::debug!(
        "Built {} media groups with {} representations",
        media.len(),
        media.iter().map(|g| g.representations.len()).sum::<usize>()
    );
    media
}

/// Tag filter. Each non-empty list must be satisfied: any `include`, no
/// `exclude`, any `format:`, any `resolution:`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct TagQuery {
    pub include: Vec<String>,
    pub exclude: Vec<String>,
    pub format: Vec<String>,
    pub resolution: Vec<String>,
}

impl TagQuery {
    pub fn including(tags: &[&str]) -> Self {
        Self {
            include: tags.iter().map(|t| t.to_string()).collect(),
            ..Self::default()
        }
    }

    pub fn matches(&self, group: &MediaGroup) -> bool {
        if !self.include.is_empty() && !self.include.iter().any(|t| group.has_tag(t)) {
            return false;
        }
        if self.exclude.iter().any(|t| group.has_tag(t)) {
            return false;
        }
        if !self.format.is_empty() && !self.format.iter().any(|f| group.has_tag(&format!("format:{}", f))) {
            return false;
        }
        if !self.resolution.is_empty()
            && !self.resolution.iter().any(|r| group.has_tag(&format!("resolution:{}", r)))
        {
            return false;
        }
        true
    }
}

pub fn filter_groups_by_query<'a>(groups: &'a [MediaGroup], query: &TagQuery) -> Vec<&'a MediaGroup> {
    groups.iter().filter(|g| query.matches(g)).collect()
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SmartCollection<'a> {
    pub id: &'static str,
    pub name: &'static str,
    pub groups: Vec<&'a MediaGroup>,
}

pub fn smart_collections(groups: &[MediaGroup]) -> Vec<SmartCollection<'_>> {
    let by_query = |id: &'static str, name: &'static str, query: TagQuery| SmartCollection {
        id,
        name,
        groups: filter_groups_by_query(groups, &query),
    };

    let proxy_pairs = groups
        .iter()
        .filter(|g| {
            g.has_representation(RepresentationType::Proxy)
                && (g.has_representation(RepresentationType::Online)
                    || g.has_representation(RepresentationType::Master))
        })
        .collect();

    let mut recent: Vec<&MediaGroup> = groups.iter().collect();
    recent.sort_by_key(|g| {
        std::cmp::Reverse(g.representations.iter().filter_map(|r| r.asset.primary_file.last_modified).max())
    });
    recent.truncate(RECENT_COLLECTION_LIMIT);

    vec![
        SmartCollection { id: "all_media", name: "All Media", groups: groups.iter().collect() },
        by_query("proxies", "Proxy Media", TagQuery::including(&["type:proxy"])),
        by_query("online_clips", "Online/Master", TagQuery::including(&["type:online", "type:master"])),
        by_query("offline_clips", "Offline/Edit", TagQuery::including(&["type:offline"])),
        by_query("red_clips", "RED Clips", TagQuery { format: vec![MediaFormat::Red.to_string()], ..TagQuery::default() }),
        by_query("braw_clips", "BRAW Clips", TagQuery { format: vec![MediaFormat::Braw.to_string()], ..TagQuery::default() }),
        by_query("high_res", "4K+ Media", TagQuery::including(&["resolution:4k", "resolution:uhd"])),
        SmartCollection { id: "proxy_pairs", name: "Proxy Pairs", groups: proxy_pairs },
        SmartCollection { id: "recent", name: "Recently Added", groups: recent },
    ]
}

/// Split `category:value` tags into category -> distinct values.
pub fn tag_categories(groups: &[MediaGroup]) -> BTreeMap<String, Vec<String>> {
    let mut categories: BTreeMap<String, Vec<String>> = BTreeMap::new();
    for tag in groups.iter().flat_map(|g| g.tags.iter()) {
        let Some((category, value)) = tag.split_once(':') else {
            continue;
        };
        if category.is_empty() || value.is_empty() {
            continue;
        }
        let values = categories.entry(category.to_string()).or_default();
        if !values.iter().any(|v| v == value) {
            values.push(value.to_string());
        }
    }
    categories
}

#[cfg(test)]
mod tests {
    use chrono::{TimeZone, Utc};

    use super::*;
    use crate::assets::group_assets;
    use crate::collapse::collapse;
    use crate::config::ScoringConfig;
    use crate::relations::build_references;
    use crate::scan::FileRecord;

    fn asset(path: &str, size: u64) -> Asset {
        let (_, assets) = group_assets(&[FileRecord::file(path, size)]);
        assets.into_iter().next().unwrap()
    }

    fn media_groups(files: &[FileRecord]) -> Vec<MediaGroup> {
        let config = ScoringConfig::default();
        let (_, assets) = group_assets(files);
        let refs = build_references(&assets, &config);
        create_media_groups(&collapse(&refs, &config))
    }

    #[test]
    fn test_detection_order() {
        assert_eq!(detect_representation_type(&asset("/S/Proxies/a.mov", 5_000_000_000)), RepresentationType::Proxy);
        assert_eq!(detect_representation_type(&asset("/S/Edit/a.mov", 5_000_000_000)), RepresentationType::Offline);
        assert_eq!(detect_representation_type(&asset("/S/Raw/a_edit.mov", 5_000_000_000)), RepresentationType::Offline);
        assert_eq!(detect_representation_type(&asset("/S/D/a_master.mov", 10)), RepresentationType::Online);
        assert_eq!(detect_representation_type(&asset("/S/D/a_prev.mov", 5_000_000_000)), RepresentationType::Preview);
        assert_eq!(detect_representation_type(&asset("/S/D/a.mp4", 5_000_000_000)), RepresentationType::Proxy);
        assert_eq!(detect_representation_type(&asset("/S/D/a.mxf", 10)), RepresentationType::Online);
        assert_eq!(detect_representation_type(&asset("/S/D/a.mov", 100_000_000)), RepresentationType::Proxy);
        assert_eq!(detect_representation_type(&asset("/S/D/a.mov", 5_000_000_000)), RepresentationType::Online);
    }

    #[test]
    fn test_automatic_tags() {
        let mut a = asset("/Shoot/2024-03-15/Scene_12/CamA/Take 3/clip.mov", 2 * 1024 * 1024 * 1024);
        a.metadata.codec = Some("ProRes".to_string());
        a.metadata.resolution = Some("3840x2160".to_string());
        a.metadata.frame_rate = Some(23.976);
        a.metadata.capture_roll = Some("A001".to_string());

        let tags = generate_automatic_tags(&a);
        for expected in [
            "format:standard",
            "codec:prores",
            "resolution:4k",
            "fps:23.976",
            "fps:cinema",
            "folder:shoot",
            "date:2024-03-15",
            "scene:scene_12",
            "camera:cama",
            "take:take 3",
            "roll:a001",
            "size:medium",
            "type:online",
        ] {
            assert!(tags.contains(&expected.to_string()), "missing {} in {:?}", expected, tags);
        }
    }

    #[test]
    fn test_media_group_from_collapsed_pair() {
        let groups = media_groups(&[
            FileRecord::file("/Projects/Shoot/clip_master.mov", 2_000_000_000),
            FileRecord::file("/Projects/Shoot/clip_proxy.mp4", 50_000_000),
        ]);

        assert_eq!(groups.len(), 1);
        let group = &groups[0];
        assert_eq!(group.representations.len(), 2);
        assert_eq!(group.primary().unwrap().kind, RepresentationType::Online);
        assert_eq!(group.primary().unwrap().asset.name, "clip_master");
        // the edge from the canonical says what the canonical is, not the variant
        assert_eq!(group.representations[1].kind, RepresentationType::Master);
        assert!(group.has_tag("type:proxy"));
        assert!(group.has_tag("type:online"));
    }

    #[test]
    fn test_query_filters() {
        let groups = media_groups(&[
            FileRecord::file("/A/Day/one_proxy.mp4", 10),
            FileRecord::file("/B/Day/two.mxf", 10),
        ]);
        assert_eq!(groups.len(), 2);

        let proxies = filter_groups_by_query(&groups, &TagQuery::including(&["type:proxy"]));
        assert_eq!(proxies.len(), 1);

        let not_proxies = TagQuery { exclude: vec!["type:proxy".to_string()], ..TagQuery::default() };
        assert_eq!(filter_groups_by_query(&groups, &not_proxies).len(), 1);

        let standard = TagQuery { format: vec!["standard".to_string()], ..TagQuery::default() };
        assert_eq!(filter_groups_by_query(&groups, &standard).len(), 2);

        let red = TagQuery { format: vec!["red".to_string()], ..TagQuery::default() };
        assert!(filter_groups_by_query(&groups, &red).is_empty());

        assert_eq!(filter_groups_by_query(&groups, &TagQuery::default()).len(), 2);
    }

    #[test]
    fn test_smart_collections_and_categories() {
        let t = Utc.with_ymd_and_hms(2024, 3, 15, 8, 0, 0).unwrap();
        let groups = media_groups(&[
            FileRecord::file("/A/Day/one_proxy.mp4", 10).with_modified(t),
            FileRecord::file("/B/Day/two.mxf", 10).with_modified(t + chrono::Duration::hours(1)),
        ]);

        let collections = smart_collections(&groups);
        let get = |id: &str| collections.iter().find(|c| c.id == id).unwrap();

        assert_eq!(collections.len(), 9);
        assert_eq!(get("all_media").groups.len(), 2);
        assert_eq!(get("proxies").groups.len(), 1);
        assert!(get("red_clips").groups.is_empty());
        assert!(get("proxy_pairs").groups.is_empty());
        assert_eq!(get("recent").groups[0].base_name, "two");

        let categories = tag_categories(&groups);
        assert_eq!(categories["format"], vec!["standard"]);
        assert!(categories["type"].contains(&"proxy".to_string()));
        assert!(categories["folder"].contains(&"day".to_string()));
    }
}

// Media Hash List (MHL) export and import
// Writes the hashlist XML that camera departments hand over with offloads,
// reads it back, and matches known hashes against the current scan.

use std::collections::{BTreeMap, HashMap, HashSet};
use std::path::Path;
use std::sync::LazyLock;

use chrono::{DateTime, Utc};
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::assets::Asset;
use crate::constants::{MHL_GENERATOR, MHL_VERSION};
use crate::error::{ReelMapError, Result};
use crate::hash::{hash_file, HashAlgorithm, HashOutcome};
use crate::scan::FileRecord;
use crate::text::{self, LazyRegex};

static HASHLIST_ROOT: LazyRegex = LazyLock::new(|| Regex::new(r"<hashlist\b[^>]*>").ok());
static HASHLIST_VERSION: LazyRegex = LazyLock::new(|| Regex::new(r#"<hashlist\b[^>]*version="([^"]*)""#).ok());
static CREATOR_BLOCK: LazyRegex = LazyLock::new(|| Regex::new(r"(?s)<creatorinfo>(.*?)</creatorinfo>").ok());
static HASH_BLOCK: LazyRegex = LazyLock::new(|| Regex::new(r"(?s)<hash>(.*?)</hash>").ok());
static MEDIA_BLOCK: LazyRegex = LazyLock::new(|| Regex::new(r"(?s)<media>(.*?)</media>").ok());
static LEAF_ELEMENT: LazyRegex = LazyLock::new(|| Regex::new(r"(?s)<([A-Za-z0-9_]+)>([^<]*)</([A-Za-z0-9_]+)>").ok());

const HASH_TAGS: [&str; 5] = ["md5", "sha1", "sha256", "blake3", "xxhash"];

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MhlFileEntry {
    pub path: String,
    pub size: u64,
    pub last_modified: Option<DateTime<Utc>>,
    pub hash: String,
    pub hash_type: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MhlMediaEntry {
    pub name: String,
    pub format: String,
    #[serde(rename = "type")]
    pub kind: String,
    pub primary_file: String,
    pub file_count: usize,
    pub codec: Option<String>,
    pub frame_rate: Option<f64>,
    pub resolution: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreatorInfo {
    pub name: String,
    pub username: Option<String>,
    pub hostname: Option<String>,
    pub tool: Option<String>,
    pub start_date: Option<DateTime<Utc>>,
    pub finish_date: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MhlDocument {
    pub version: String,
    pub creator: CreatorInfo,
    pub files: Vec<MhlFileEntry>,
    pub media: Vec<MhlMediaEntry>,
}

impl MhlDocument {
    pub fn total_size(&self) -> u64 {
        self.files.iter().map(|f| f.size).sum()
    }

    /// Hash type of the first entry, as the document's nominal algorithm.
    pub fn hash_type(&self) -> Option<&str> {
        self.files.first().map(|f| f.hash_type.as_str())
    }
}

#[derive(Debug, Clone)]
pub struct MhlOptions {
    pub include_media: bool,
    pub started: DateTime<Utc>,
    pub tool: String,
}

impl Default for MhlOptions {
    fn default() -> Self {
        Self {
            include_media: true,
            started: Utc::now(),
            tool: format!("{} {}", MHL_GENERATOR, env!("CARGO_PKG_VERSION")),
        }
    }
}

pub fn escape_xml(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&apos;")
}

pub fn unescape_xml(s: &str) -> String {
    s.replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&apos;", "'")
        .replace("&amp;", "&")
}

fn current_username() -> Option<String> {
    std::env::var("USER").or_else(|_| std::env::var("USERNAME")).ok()
}

fn current_hostname() -> Option<String> {
    hostname::get().ok().map(|h| h.to_string_lossy().to_string())
}

/// "sequence" for multi-chunk camera clips, "clip" otherwise.
fn asset_kind(asset: &Asset) -> &'static str {
    if asset.segment_count() > 1 {
        "sequence"
    } else {
        "clip"
    }
}

/// Render a hashlist document.
pub fn export_mhl(entries: &[MhlFileEntry], assets: &[Asset], options: &MhlOptions) -> String {
    let mut xml = String::new();
    xml.push_str("<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n");
    xml.push_str(&format!("<hashlist version=\"{}\">\n", MHL_VERSION));

    xml.push_str("  <creatorinfo>\n");
    xml.push_str(&format!("    <name>{}</name>\n", escape_xml(MHL_GENERATOR)));
    if let Some(user) = current_username() {
        xml.push_str(&format!("    <username>{}</username>\n", escape_xml(&user)));
    }
    if let Some(host) = current_hostname() {
        xml.push_str(&format!("    <hostname>{}</hostname>\n", escape_xml(&host)));
    }
    xml.push_str(&format!("    <tool>{}</tool>\n", escape_xml(&options.tool)));
    xml.push_str(&format!("    <startdate>{}</startdate>\n", options.started.to_rfc3339()));
    xml.push_str(&format!("    <finishdate>{}</finishdate>\n", Utc::now().to_rfc3339()));
    xml.push_str("  </creatorinfo>\n");

    for entry in entries {
        let tag = hash_tag(&entry.hash_type);
        xml.push_str("  <hash>\n");
        xml.push_str(&format!("    <file>{}</file>\n", escape_xml(&entry.path)));
        xml.push_str(&format!("    <size>{}</size>\n", entry.size));
        if let Some(modified) = entry.last_modified {
            xml.push_str(&format!(
                "    <lastmodificationdate>{}</lastmodificationdate>\n",
                modified.to_rfc3339()
            ));
        }
        xml.push_str(&format!("    <{tag}>{}</{tag}>\n", escape_xml(&entry.hash)));
        xml.push_str("  </hash>\n");
    }

    if options.include_media {
        for asset in assets {
            xml.push_str("  <media>\n");
            xml.push_str(&format!("    <name>{}</name>\n", escape_xml(&asset.name)));
            xml.push_str(&format!("    <format>{}</format>\n", asset.format.as_str()));
            xml.push_str(&format!("    <type>{}</type>\n", asset_kind(asset)));
            xml.push_str(&format!(
                "    <primary_file>{}</primary_file>\n",
                escape_xml(&asset.primary_file.path)
            ));
            xml.push_str(&format!("    <file_count>{}</file_count>\n", asset.related_files.len()));
            if let Some(codec) = &asset.metadata.codec {
                xml.push_str(&format!("    <codec>{}</codec>\n", escape_xml(codec)));
            }
            if let Some(fps) = asset.metadata.frame_rate {
                xml.push_str(&format!("    <framerate>{}</framerate>\n", fps));
            }
            if let Some(resolution) = &asset.metadata.resolution {
                xml.push_str(&format!("    <resolution>{}</resolution>\n", escape_xml(resolution)));
            }
            xml.push_str("  </media>\n");
        }
    }

    xml.push_str("</hashlist>\n");
    xml
}

/// Element name for a hash type; unknown types are written as sha256.
fn hash_tag(hash_type: &str) -> &'static str {
    let lower = hash_type.to_lowercase();
    HASH_TAGS.iter().copied().find(|t| *t == lower).unwrap_or("sha256")
}

/// Leaf elements of one block, first occurrence wins.
fn leaf_fields(block: &str) -> HashMap<String, String> {
    let mut fields = HashMap::new();
    let Some(re) = LEAF_ELEMENT.as_ref() else {
        return fields;
    };
    for caps in re.captures_iter(block) {
        let open = text::group(&caps, 1);
        if open != text::group(&caps, 3) {
            continue;
        }
        fields
            .entry(open.to_lowercase())
            .or_insert_with(|| unescape_xml(text::group(&caps, 2).trim()));
    }
    fields
}

fn blocks<'t>(re: &LazyRegex, xml: &'t str) -> Vec<&'t str> {
    match re.as_ref() {
        Some(re) => re
            .captures_iter(xml)
            .filter_map(|c| c.get(1).map(|m| m.as_str()))
            .collect(),
        None => Vec::new(),
    }
}

fn parse_date(value: Option<&String>) -> Option<DateTime<Utc>> {
    value
        .and_then(|v| DateTime::parse_from_rfc3339(v).ok())
        .map(|d| d.with_timezone(&Utc))
}

/// Parse a hashlist document.
pub fn import_mhl(xml: &str) -> Result<MhlDocument> {
    if !text::is_match(&HASHLIST_ROOT, xml) {
        return Err(ReelMapError::Mhl("no <hashlist> root element".to_string()));
    }

    let version = text::captures(&HASHLIST_VERSION, xml)
        .map(|c| text::group(&c, 1).to_string())
        .unwrap_or_default();

    let creator = blocks(&CREATOR_BLOCK, xml)
        .first()
        .map(|block| {
            let fields = leaf_fields(block);
            CreatorInfo {
                name: fields.get("name").cloned().unwrap_or_else(|| "Unknown".to_string()),
                username: fields.get("username").cloned(),
                hostname: fields.get("hostname").cloned(),
                tool: fields.get("tool").cloned(),
                start_date: parse_date(fields.get("startdate")),
                finish_date: parse_date(fields.get("finishdate")),
            }
        })
        .unwrap_or_default();

    let mut files = Vec::new();
    for block in blocks(&HASH_BLOCK, xml) {
        let fields = leaf_fields(block);
        let Some(path) = fields.get("file") else {
            continue;
        };
        let (hash_type, hash) = HASH_TAGS
            .iter()
            .find_map(|tag| fields.get(*tag).map(|h| (tag.to_string(), h.clone())))
            .unwrap_or_else(|| ("unknown".to_string(), String::new()));

        files.push(MhlFileEntry {
            path: path.clone(),
            size: fields.get("size").and_then(|s| s.parse().ok()).unwrap_or(0),
            last_modified: parse_date(fields.get("lastmodificationdate")),
            hash,
            hash_type,
        });
    }

    let mut media = Vec::new();
    for block in blocks(&MEDIA_BLOCK, xml) {
        let fields = leaf_fields(block);
        let (Some(name), Some(format), Some(kind), Some(primary_file)) = (
            fields.get("name"),
            fields.get("format"),
            fields.get("type"),
            fields.get("primary_file"),
        ) else {
            continue;
        };

        media.push(MhlMediaEntry {
            name: name.clone(),
            format: format.clone(),
            kind: kind.clone(),
            primary_file: primary_file.clone(),
            file_count: fields.get("file_count").and_then(|s| s.parse().ok()).unwrap_or(0),
            codec: fields.get("codec").cloned(),
            frame_rate: fields.get("framerate").and_then(|s| s.parse().ok()),
            resolution: fields.get("resolution").cloned(),
        });
    }

    log::info!("Imported MHL with {} files and {} media entries", files.len(), media.len());

    Ok(MhlDocument {
        version,
        creator,
        files,
        media,
    })
}

fn relative_to(path: &str, base_path: &str) -> String {
    let base = base_path.trim_end_matches('/');
    if base.is_empty() {
        return path.to_string();
    }
    match path.strip_prefix(base) {
        Some(rest) if rest.is_empty() || rest.starts_with('/') => rest.trim_start_matches('/').to_string(),
        _ => path.to_string(),
    }
}

/// Hash every distinct related file of `assets` and build the entries,
/// with paths relative to `base_path`. Files that fail to hash are left out.
pub fn generate_mhl<F>(assets: &[Asset], base_path: &str, mut hasher: F) -> Vec<MhlFileEntry>
where
    F: FnMut(&FileRecord) -> Result<HashOutcome>,
{
    let mut seen = HashSet::new();
    let mut entries = Vec::new();

    for file in assets.iter().flat_map(|a| a.related_files.iter()) {
        if !seen.insert(file.path.as_str()) {
            continue;
        }
        match hasher(file) {
            Ok(outcome) => entries.push(MhlFileEntry {
                path: relative_to(&file.path, base_path),
                size: file.size,
                last_modified: file.last_modified,
                hash: outcome.hex,
                hash_type: outcome.algorithm_used.as_str().to_string(),
            }),
            Err(e) => log::error!("Error hashing {}: {}", file.path, e),
        }
    }

    entries
}

/// Trim leading/trailing slashes and unify separators.
pub fn normalize_mhl_path(path: &str) -> String {
    text::normalize_path(path)
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HashMaps {
    pub file_hashes: BTreeMap<String, String>,
    /// Media name -> hash of its primary file.
    pub asset_hashes: BTreeMap<String, String>,
}

pub fn create_hash_maps(doc: &MhlDocument) -> HashMaps {
    let file_hashes: BTreeMap<String, String> = doc
        .files
        .iter()
        .map(|f| (normalize_mhl_path(&f.path), f.hash.clone()))
        .collect();

    let asset_hashes = doc
        .media
        .iter()
        .filter_map(|m| {
            file_hashes
                .get(&normalize_mhl_path(&m.primary_file))
                .map(|h| (m.name.clone(), h.clone()))
        })
        .collect();

    HashMaps {
        file_hashes,
        asset_hashes,
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MatchedAsset {
    pub asset: Asset,
    pub existing_hash: String,
    pub checked_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MhlMatch {
    pub matched: Vec<MatchedAsset>,
    pub unmatched: Vec<Asset>,
    pub new_from_mhl: Vec<MhlMediaEntry>,
}

/// Split current assets by whether the document already knows any of
/// their files, and list media the document has that the scan lacks.
pub fn match_existing_files(doc: &MhlDocument, assets: &[Asset]) -> MhlMatch {
    let maps = create_hash_maps(doc);
    let mut result = MhlMatch::default();
    let now = Utc::now();

    for asset in assets {
        let hit = asset
            .related_files
            .iter()
            .find_map(|f| maps.file_hashes.get(&normalize_mhl_path(&f.path)));
        match hit {
            Some(hash) => result.matched.push(MatchedAsset {
                asset: asset.clone(),
                existing_hash: hash.clone(),
                checked_at: now,
            }),
            None => result.unmatched.push(asset.clone()),
        }
    }

    result.new_from_mhl = doc
        .media
        .iter()
        .filter(|m| {
            !assets
                .iter()
                .any(|a| a.name == m.name || a.primary_file.path.contains(m.name.as_str()))
        })
        .cloned()
        .collect();

    log::info!(
        "MHL match: {} matched, {} unmatched, {} new",
        result.matched.len(),
        result.unmatched.len(),
        result.new_from_mhl.len()
    );
    result
}

pub fn should_skip_hashing(record: &FileRecord, maps: &HashMaps) -> bool {
    maps.file_hashes.contains_key(&normalize_mhl_path(&record.path))
}

pub fn existing_hash<'a>(record: &FileRecord, maps: &'a HashMaps) -> Option<&'a str> {
    maps.file_hashes
        .get(&normalize_mhl_path(&record.path))
        .map(String::as_str)
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IntegrityCheck {
    pub is_valid: bool,
    pub message: String,
}

pub fn validate_hash_integrity(calculated: &str, existing: &str) -> IntegrityCheck {
    if calculated.eq_ignore_ascii_case(existing) {
        IntegrityCheck {
            is_valid: true,
            message: "Hash verified - file unchanged".to_string(),
        }
    } else {
        IntegrityCheck {
            is_valid: false,
            message: "Hash mismatch - file may have been modified".to_string(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VerifyReport {
    pub verified: usize,
    pub mismatched: Vec<String>,
    pub missing: Vec<String>,
    /// Entries whose algorithm could not be computed, so nothing was compared.
    pub substituted: Vec<String>,
}

impl VerifyReport {
    pub fn is_clean(&self) -> bool {
        self.mismatched.is_empty() && self.missing.is_empty()
    }
}

/// Re-hash each listed file under `root`. Entries are hashed with their
/// recorded algorithm; `fallback` covers unrecognised hash types.
pub fn verify_directory(doc: &MhlDocument, root: &Path, fallback: HashAlgorithm) -> VerifyReport {
    let mut report = VerifyReport::default();

    for entry in &doc.files {
        let disk = text::segments(&normalize_mhl_path(&entry.path))
            .into_iter()
            .fold(root.to_path_buf(), |acc, part| acc.join(part));

        if !disk.is_file() {
            report.missing.push(entry.path.clone());
            continue;
        }

        let algorithm = HashAlgorithm::parse(&entry.hash_type).unwrap_or(fallback);
        match hash_file(&disk, algorithm) {
            Ok(outcome) if outcome.substituted => report.substituted.push(entry.path.clone()),
            Ok(outcome) => {
                if validate_hash_integrity(&outcome.hex, &entry.hash).is_valid {
                    report.verified += 1;
                } else {
                    report.mismatched.push(entry.path.clone());
                }
            }
            Err(e) => {
                log::warn!("Could not hash {}: {}", disk.display(), e);
                report.missing.push(entry.path.clone());
            }
        }
    }

    log::info!(
        "Verified {} of {} files ({} mismatched, {} missing, {} unverifiable)",
        report.verified,
        doc.files.len(),
        report.mismatched.len(),
        report.missing.len(),
        report.substituted.len()
    );
    report
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::assets::MediaFormat;
    use crate::hash::hash_bytes;
    use chrono::TimeZone;
    use tempfile::TempDir;

    fn entry(path: &str, hash: &str) -> MhlFileEntry {
        MhlFileEntry {
            path: path.to_string(),
            size: 42,
            last_modified: Some(Utc.with_ymd_and_hms(2024, 3, 15, 8, 30, 0).unwrap()),
            hash: hash.to_string(),
            hash_type: "sha256".to_string(),
        }
    }

    fn asset(path: &str, name: &str) -> Asset {
        let mut a = Asset::new(
            format!("std:{}", path),
            name.to_string(),
            MediaFormat::Standard,
            FileRecord::file(path, 42),
        );
        a.metadata.codec = Some("H.264".to_string());
        a.metadata.frame_rate = Some(23.976);
        a
    }

    #[test]
    fn test_export_import_round_trip() {
        let entries = vec![
            entry("Day1/Tom & Jerry's <cut>.mov", "ABCDEF"),
            entry("Day1/b.mov", "123456"),
        ];
        let assets = vec![asset("/Shoot/Day1/b.mov", "b")];

        let xml = export_mhl(&entries, &assets, &MhlOptions::default());
        assert!(xml.starts_with("<?xml version=\"1.0\" encoding=\"UTF-8\"?>"));
        assert!(xml.contains("<hashlist version=\"1.1\">"));
        assert!(xml.contains("Tom &amp; Jerry&apos;s &lt;cut&gt;.mov"));

        let doc = import_mhl(&xml).unwrap();
        assert_eq!(doc.version, "1.1");
        assert_eq!(doc.creator.name, MHL_GENERATOR);
        assert!(doc.creator.start_date.is_some());
        assert_eq!(doc.files.len(), 2);
        assert_eq!(doc.files[0].path, "Day1/Tom & Jerry's <cut>.mov");
        assert_eq!(doc.files[0].size, 42);
        assert_eq!(doc.files[0].hash, "ABCDEF");
        assert_eq!(doc.files[0].hash_type, "sha256");
        assert_eq!(doc.files[0].last_modified, entries[0].last_modified);
        assert_eq!(doc.total_size(), 84);

        assert_eq!(doc.media.len(), 1);
        let media = &doc.media[0];
        assert_eq!(media.name, "b");
        assert_eq!(media.format, "standard");
        assert_eq!(media.kind, "clip");
        assert_eq!(media.primary_file, "/Shoot/Day1/b.mov");
        assert_eq!(media.file_count, 1);
        assert_eq!(media.codec.as_deref(), Some("H.264"));
        assert_eq!(media.frame_rate, Some(23.976));
        assert_eq!(media.resolution, None);
    }

    #[test]
    fn test_import_requires_hashlist_root() {
        let result = import_mhl("<?xml version=\"1.0\"?><manifest></manifest>");
        assert!(matches!(result, Err(ReelMapError::Mhl(_))));
    }

    #[test]
    fn test_import_reads_legacy_md5_lists() {
        let xml = r#"<?xml version="1.0" encoding="UTF-8"?>
<hashlist version="1.1">
  <creatorinfo><name>Offload Tool</name></creatorinfo>
  <hash>
    <file>A001/A001_C001.R3D</file>
    <size>1000</size>
    <md5>d41d8cd98f00b204e9800998ecf8427e</md5>
  </hash>
  <hash><size>5</size></hash>
</hashlist>"#;

        let doc = import_mhl(xml).unwrap();
        assert_eq!(doc.creator.name, "Offload Tool");
        assert_eq!(doc.files.len(), 1);
        assert_eq!(doc.files[0].hash_type, "md5");
        assert_eq!(doc.hash_type(), Some("md5"));
        assert!(doc.media.is_empty());
    }

    #[test]
    fn test_hash_maps_and_matching() {
        let mut doc = MhlDocument::default();
        doc.files.push(entry("/Shoot/Day1/b.mov/", "aa"));
        doc.files.push(entry("Shoot\\Day1\\c.mov", "bb"));
        doc.media.push(MhlMediaEntry {
            name: "b".to_string(),
            format: "standard".to_string(),
            kind: "clip".to_string(),
            primary_file: "/Shoot/Day1/b.mov".to_string(),
            file_count: 1,
            codec: None,
            frame_rate: None,
            resolution: None,
        });
        let template = doc.media[0].clone();
        doc.media.push(MhlMediaEntry {
            name: "gone".to_string(),
            primary_file: "/Shoot/Day1/gone.mov".to_string(),
            ..template
        });

        let maps = create_hash_maps(&doc);
        assert_eq!(maps.file_hashes.get("Shoot/Day1/b.mov").map(String::as_str), Some("aa"));
        assert_eq!(maps.file_hashes.get("Shoot/Day1/c.mov").map(String::as_str), Some("bb"));
        assert_eq!(maps.asset_hashes.get("b").map(String::as_str), Some("aa"));
        assert!(!maps.asset_hashes.contains_key("gone"));

        let known = FileRecord::file("/Shoot/Day1/c.mov", 1);
        let unknown = FileRecord::file("/Shoot/Day2/d.mov", 1);
        assert!(should_skip_hashing(&known, &maps));
        assert_eq!(existing_hash(&known, &maps), Some("bb"));
        assert!(!should_skip_hashing(&unknown, &maps));
        assert_eq!(existing_hash(&unknown, &maps), None);

        let assets = vec![asset("/Shoot/Day1/b.mov", "b"), asset("/Shoot/Day2/d.mov", "d")];
        let result = match_existing_files(&doc, &assets);
        assert_eq!(result.matched.len(), 1);
        assert_eq!(result.matched[0].asset.name, "b");
        assert_eq!(result.matched[0].existing_hash, "aa");
        assert_eq!(result.unmatched.len(), 1);
        assert_eq!(result.unmatched[0].name, "d");
        assert_eq!(result.new_from_mhl.len(), 1);
        assert_eq!(result.new_from_mhl[0].name, "gone");
    }

    #[test]
    fn test_integrity_is_case_insensitive() {
        assert!(validate_hash_integrity("ABCDEF", "abcdef").is_valid);
        let bad = validate_hash_integrity("abcdef", "abcdee");
        assert!(!bad.is_valid);
        assert!(bad.message.contains("mismatch"));
    }

    #[test]
    fn test_generate_uses_relative_unique_paths() {
        let mut a = asset("/Shoot/Day1/a.mov", "a");
        a.related_files.push(FileRecord::file("/Shoot/Day1/a.xml", 3));
        let b = asset("/Shoot/Day1/a.mov", "a_dup");

        let entries = generate_mhl(&[a, b], "/Shoot", |file| {
            if file.name.ends_with(".xml") {
                return Err(ReelMapError::Hash("unreadable".to_string()));
            }
            Ok(hash_bytes(file.path.as_bytes(), HashAlgorithm::Blake3))
        });

        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].path, "Day1/a.mov");
        assert_eq!(entries[0].hash_type, "blake3");
        assert_eq!(entries[0].size, 42);
    }

    #[test]
    fn test_verify_directory() {
        let dir = TempDir::new().unwrap();
        std::fs::create_dir(dir.path().join("Day1")).unwrap();
        std::fs::write(dir.path().join("Day1/good.mov"), b"good").unwrap();
        std::fs::write(dir.path().join("Day1/changed.mov"), b"changed").unwrap();
        std::fs::write(dir.path().join("Day1/legacy.mov"), b"legacy").unwrap();
        std::fs::write(dir.path().join("Day1/fast.mov"), b"fast").unwrap();

        let mut doc = MhlDocument::default();
        doc.files.push(entry("Day1/good.mov", &hash_bytes(b"good", HashAlgorithm::Sha256).hex.to_uppercase()));
        doc.files.push(entry("Day1/changed.mov", &hash_bytes(b"original", HashAlgorithm::Sha256).hex));
        doc.files.push(entry("Day1/missing.mov", "00"));
        doc.files.push(MhlFileEntry {
            hash_type: "md5".to_string(),
            ..entry("Day1/legacy.mov", &hash_bytes(b"legacy", HashAlgorithm::Md5).hex)
        });
        doc.files.push(MhlFileEntry {
            hash_type: "xxhash".to_string(),
            ..entry("Day1/fast.mov", "00")
        });

        let report = verify_directory(&doc, dir.path(), HashAlgorithm::Sha256);
        assert_eq!(report.verified, 2);
        assert_eq!(report.mismatched, vec!["Day1/changed.mov"]);
        assert_eq!(report.missing, vec!["Day1/missing.mov"]);
        assert_eq!(report.substituted, vec!["Day1/fast.mov"]);
        assert!(!report.is_clean());
    }
}

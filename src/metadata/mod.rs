// Metadata collaborator
// Extended technical attributes per asset, the extractor seam, and the
// built-in filename heuristics used when no probing backend is available.

use std::collections::BTreeMap;
use std::sync::LazyLock;

use chrono::NaiveDate;
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::assets::{Asset, MediaFormat};
use crate::error::Result;
use crate::text::{self, LazyRegex};

const BYTES_PER_MB: f64 = 1024.0 * 1024.0;

/// Technical attributes of an asset. Every field is optional; grouping fills
/// a few and enrichment fills the rest when it can.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExtendedMetadata {
    pub codec: Option<String>,
    pub frame_rate: Option<f64>,
    pub resolution: Option<String>,
    pub timecode: Option<String>,
    pub camera_model: Option<String>,
    /// Bits per second
    pub bitrate: Option<f64>,
    pub color_space: Option<String>,
    pub gamut: Option<String>,

    // Grouping results
    pub segments: Option<usize>,
    pub capture_roll: Option<String>,
    pub total_size: Option<u64>,

    /// Measured duration in seconds
    pub duration: Option<f64>,
    /// Size-based guess in seconds, never used for relationship evidence
    pub estimated_duration: Option<f64>,
    pub recording_date: Option<NaiveDate>,

    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub extra: BTreeMap<String, String>,
}

impl ExtendedMetadata {
    /// Overwrite fields that `other` supplies; keep everything else.
    pub fn merge(&mut self, other: ExtendedMetadata) {
        macro_rules! take {
            ($($field:ident),*) => {
                $(if other.$field.is_some() { self.$field = other.$field; })*
            };
        }
        take!(
            codec, frame_rate, resolution, timecode, camera_model, bitrate, color_space, gamut,
            segments, capture_roll, total_size, duration, estimated_duration, recording_date
        );
        self.extra.extend(other.extra);
    }
}

/// Source of extended metadata for an asset. Implementations may probe the
/// files or call a vendor SDK; failures are reported per asset.
pub trait MetadataExtractor {
    fn extract(&self, asset: &Asset) -> Result<ExtendedMetadata>;
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EnrichmentReport {
    pub enriched: usize,
    pub failed: usize,
}

/// Run `extractor` over every asset in order. A failing asset keeps the
/// metadata it had before.
pub fn enrich_assets(assets: &mut [Asset], extractor: &dyn MetadataExtractor) -> EnrichmentReport {
    let mut report = EnrichmentReport::default();

    for asset in assets.iter_mut() {
        match extractor.extract(asset) {
            Ok(extracted) => {
                asset.metadata.merge(extracted);
                report.enriched += 1;
            }
            Err(e) => {
                log::warn!("Metadata extraction failed for {}: {}", asset.name, e);
                report.failed += 1;
            }
        }
    }

    log::info!("Metadata enrichment: {} enriched, {} failed", report.enriched, report.failed);
    report
}

// ----- Filename heuristics -----

static RDC_TIMECODE: LazyRegex =
    LazyLock::new(|| Regex::new(r"(?i)([A-Z_]+)_?(\d+)_?([A-Z]\d+)?_?(.+)\.rdc$").ok());
static RED_RESOLUTION: LazyRegex = LazyLock::new(|| Regex::new(r"(?i)(2K|4K|5K|6K|8K)").ok());
static FPS: LazyRegex = LazyLock::new(|| Regex::new(r"(?i)(\d+(?:\.\d+)?)fps").ok());
static R3D_CHUNK: LazyRegex = LazyLock::new(|| Regex::new(r"(?i)_\d{3}\.r3d$").ok());
static BRAW_NAME: LazyRegex = LazyLock::new(|| Regex::new(r"(?i)([A-Z]+)_?(\d{8})?_?(\d+)\.braw$").ok());
static XDCAM_PATH: LazyRegex = LazyLock::new(|| Regex::new(r"(?i)XDROOT[/\\]CLIP").ok());

/// Heuristic extractor working from names, extensions and sizes only.
#[derive(Debug, Clone, Copy, Default)]
pub struct FilenameMetadataExtractor;

impl MetadataExtractor for FilenameMetadataExtractor {
    fn extract(&self, asset: &Asset) -> Result<ExtendedMetadata> {
        let meta = match asset.format {
            MediaFormat::Red => red_metadata(asset),
            MediaFormat::Braw => braw_metadata(asset),
            MediaFormat::Sony => sony_metadata(asset),
            MediaFormat::Canon => canon_metadata(asset),
            MediaFormat::Standard => standard_metadata(asset),
        };
        Ok(meta)
    }
}

fn red_metadata(asset: &Asset) -> ExtendedMetadata {
    let mut meta = ExtendedMetadata::default();
    let mut red_resolution = None;
    let mut frame_rate = asset.metadata.frame_rate;

    if let Some(rdc) = asset.related_files.iter().find(|f| f.has_extension(&["rdc"])) {
        if let Some(caps) = text::captures(&RDC_TIMECODE, &rdc.name) {
            meta.timecode = Some(text::group(&caps, 4).to_string());
        }
        if let Some(caps) = text::captures(&RED_RESOLUTION, &rdc.name) {
            let label = text::group(&caps, 1).to_uppercase();
            meta.resolution = Some(red_resolution_spec(&label));
            meta.extra.insert("redResolution".to_string(), label.clone());
            red_resolution = Some(label);
        }
        if let Some(fps) = text::captures(&FPS, &rdc.name).and_then(|c| text::group(&c, 1).parse::<f64>().ok()) {
            meta.frame_rate = Some(fps);
            frame_rate = Some(fps);
        }
    }

    let chunk_bytes: u64 = asset
        .related_files
        .iter()
        .filter(|f| text::is_match(&R3D_CHUNK, &f.name))
        .map(|f| f.size)
        .sum();
    if chunk_bytes > 0 {
        if let Some(bitrate) = red_resolution.as_deref().and_then(|r| estimate_red_bitrate(r, frame_rate)) {
            meta.bitrate = Some(bitrate);
            meta.estimated_duration = Some((chunk_bytes as f64 * 8.0 / bitrate).round());
        }
    }

    if asset.related_files.iter().any(|f| f.has_extension(&["rmd"])) {
        meta.camera_model = Some("RED Camera".to_string());
    }

    meta.codec = Some("REDCODE RAW".to_string());
    meta.color_space = Some("REDWideGamutRGB".to_string());
    meta.gamut = Some("REDWideGamut".to_string());
    meta
}

fn red_resolution_spec(label: &str) -> String {
    match label {
        "2K" => "2048 x 1152",
        "4K" => "4096 x 2304",
        "5K" => "5120 x 2700",
        "6K" => "6144 x 3456",
        "8K" => "8192 x 4608",
        other => other,
    }
    .to_string()
}

/// Bits per second for a RED resolution class, scaled from a 24fps base.
pub fn estimate_red_bitrate(resolution: &str, frame_rate: Option<f64>) -> Option<f64> {
    let mbps = match resolution {
        "2K" => 100.0,
        "4K" => 200.0,
        "5K" => 300.0,
        "6K" => 400.0,
        "8K" => 600.0,
        _ => return None,
    };
    let scaled = match frame_rate {
        Some(fps) if fps > 0.0 => mbps * (fps / 24.0),
        _ => mbps,
    };
    Some(scaled * 1_000_000.0)
}

fn braw_metadata(asset: &Asset) -> ExtendedMetadata {
    let mut meta = ExtendedMetadata::default();
    let file = &asset.primary_file;

    if let Some(caps) = text::captures(&BRAW_NAME, &file.name) {
        meta.camera_model = Some(blackmagic_model(text::group(&caps, 1)).to_string());
        meta.recording_date = caps
            .get(2)
            .and_then(|m| NaiveDate::parse_from_str(m.as_str(), "%Y%m%d").ok());
    }

    if file.size > 0 {
        let size_mb = file.size as f64 / BYTES_PER_MB;
        // MB/s typical for each class
        let (rate, resolution) = if size_mb > 1000.0 {
            (140.0, "6K")
        } else if size_mb < 200.0 {
            (35.0, "1080p")
        } else {
            (80.0, "4K UHD")
        };
        meta.resolution = Some(resolution.to_string());
        meta.bitrate = Some(rate * 8.0 * BYTES_PER_MB);
        meta.estimated_duration = Some((size_mb / rate).round());
    }

    meta.codec = Some("Blackmagic RAW".to_string());
    meta.color_space = Some("Blackmagic Design".to_string());
    meta.gamut = Some("Rec. 2020".to_string());
    meta
}

fn blackmagic_model(prefix: &str) -> &'static str {
    match prefix.to_uppercase().as_str() {
        "BMPCC" => "Blackmagic Pocket Cinema Camera",
        "BMPC" => "Blackmagic Production Camera",
        "BMCC" => "Blackmagic Cinema Camera",
        "URSA" => "Blackmagic URSA",
        "STUDIO" => "Blackmagic Studio Camera",
        _ => "Blackmagic Camera",
    }
}

fn sony_metadata(asset: &Asset) -> ExtendedMetadata {
    let mut meta = ExtendedMetadata::default();

    if text::is_match(&XDCAM_PATH, &asset.primary_file.path) {
        meta.extra.insert("sonyFormat".to_string(), "XDCAM".to_string());
        if asset.related_files.iter().any(|f| f.has_extension(&["xml"])) {
            meta.camera_model = Some(sony_model(&asset.primary_file.name).to_string());
        }
    }

    meta.codec = match asset.primary_file.extension().as_deref() {
        Some("mxf") | Some("mov") => Some("XAVC".to_string()),
        Some("mp4") => Some("XAVC S".to_string()),
        _ => None,
    };
    meta.color_space = Some("S-Gamut3.Cine".to_string());
    meta.gamut = Some("S-Gamut3".to_string());
    meta
}

fn sony_model(name: &str) -> &'static str {
    let lower = name.to_lowercase();
    [
        ("fx9", "Sony FX9"),
        ("fx6", "Sony FX6"),
        ("fx3", "Sony FX3"),
        ("a7s", "Sony A7S III"),
        ("fs7", "Sony FS7"),
        ("fs5", "Sony FS5"),
    ]
    .into_iter()
    .find(|(needle, _)| lower.contains(needle))
    .map(|(_, model)| model)
    .unwrap_or("Sony Camera")
}

fn canon_metadata(asset: &Asset) -> ExtendedMetadata {
    let mut meta = ExtendedMetadata::default();

    if asset.related_files.iter().any(|f| f.has_extension(&["xml"])) {
        meta.camera_model = Some("Canon Cinema Camera".to_string());
    }

    let name = asset.primary_file.name.to_lowercase();
    meta.codec = if name.contains("raw") {
        Some("Canon RAW".to_string())
    } else if name.contains("log") {
        Some("Canon Log".to_string())
    } else {
        match asset.primary_file.extension().as_deref() {
            Some("mxf") => Some("Canon XF-AVC".to_string()),
            Some("mp4") => Some("Canon MP4".to_string()),
            Some("mov") => Some("Canon Cinema RAW".to_string()),
            _ => None,
        }
    };
    meta.color_space = Some("Canon RGB".to_string());
    meta.extra.insert("canonColorGamut".to_string(), "Canon Cinema Gamut".to_string());
    meta
}

fn standard_metadata(asset: &Asset) -> ExtendedMetadata {
    let mut meta = ExtendedMetadata::default();
    let file = &asset.primary_file;

    meta.codec = match file.extension().as_deref() {
        Some("mp4") => Some("H.264/H.265".to_string()),
        Some("mov") => Some("QuickTime".to_string()),
        Some("avi") => Some("Various".to_string()),
        Some("mkv") => Some("Matroska".to_string()),
        _ => None,
    };

    if let Some(fps) = text::captures(&FPS, &file.name).and_then(|c| text::group(&c, 1).parse::<f64>().ok()) {
        meta.frame_rate = Some(fps);
    }

    if file.size > 0 {
        // 50 Mbps average, 6.25 MB/s
        meta.estimated_duration = Some((file.size as f64 / BYTES_PER_MB / 6.25).round());
    }
    meta
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::assets::group_assets;
    use crate::error::ReelMapError;
    use crate::scan::FileRecord;

    const MB: u64 = 1024 * 1024;

    struct FailingExtractor;

    impl MetadataExtractor for FailingExtractor {
        fn extract(&self, _asset: &Asset) -> Result<ExtendedMetadata> {
            Err(ReelMapError::Metadata("probe unavailable".to_string()))
        }
    }

    #[test]
    fn test_merge_keeps_unsupplied_fields() {
        let mut base = ExtendedMetadata {
            codec: Some("REDCODE".to_string()),
            segments: Some(2),
            ..Default::default()
        };
        base.merge(ExtendedMetadata {
            codec: Some("REDCODE RAW".to_string()),
            frame_rate: Some(24.0),
            ..Default::default()
        });

        assert_eq!(base.codec.as_deref(), Some("REDCODE RAW"));
        assert_eq!(base.segments, Some(2));
        assert_eq!(base.frame_rate, Some(24.0));
    }

    #[test]
    fn test_red_heuristics_from_rdc() {
        let files = vec![
            FileRecord::file("/Shoot/A001_C001_20240315_001.R3D", 100 * MB),
            FileRecord::file("/Shoot/A001_C001_20240315_002.R3D", 100 * MB),
            FileRecord::file("/Shoot/A001_C001_20240315.RDC", 0),
        ];
        let (_, assets) = group_assets(&files);
        assert_eq!(assets.len(), 1);

        let meta = FilenameMetadataExtractor.extract(&assets[0]).unwrap();
        assert_eq!(meta.codec.as_deref(), Some("REDCODE RAW"));
        assert_eq!(meta.gamut.as_deref(), Some("REDWideGamut"));
        // no resolution token, so no bitrate estimate
        assert!(meta.bitrate.is_none());
    }

    #[test]
    fn test_red_bitrate_scaling() {
        assert_eq!(estimate_red_bitrate("4K", None), Some(200_000_000.0));
        assert_eq!(estimate_red_bitrate("8K", Some(48.0)), Some(1_200_000_000.0));
        assert_eq!(estimate_red_bitrate("3K", None), None);
    }

    #[test]
    fn test_braw_size_classes() {
        let files = vec![FileRecord::file("/Card/BMPCC_20240101_001.braw", 100 * MB)];
        let (_, assets) = group_assets(&files);

        let meta = FilenameMetadataExtractor.extract(&assets[0]).unwrap();
        assert_eq!(meta.camera_model.as_deref(), Some("Blackmagic Pocket Cinema Camera"));
        assert_eq!(meta.resolution.as_deref(), Some("1080p"));
        assert_eq!(meta.recording_date, NaiveDate::from_ymd_opt(2024, 1, 1));
        assert_eq!(meta.estimated_duration, Some(3.0));
    }

    #[test]
    fn test_standard_codec_and_estimate() {
        let files = vec![FileRecord::file("/Edit/interview_25fps.mov", 625 * MB / 10)];
        let (_, assets) = group_assets(&files);

        let meta = FilenameMetadataExtractor.extract(&assets[0]).unwrap();
        assert_eq!(meta.codec.as_deref(), Some("QuickTime"));
        assert_eq!(meta.frame_rate, Some(25.0));
        assert_eq!(meta.estimated_duration, Some(10.0));
    }

    #[test]
    fn test_failed_extraction_keeps_asset() {
        let files = vec![
            FileRecord::file("/Edit/a.mov", 10),
            FileRecord::file("/Edit/b.mov", 10),
        ];
        let (_, mut assets) = group_assets(&files);
        let before = assets.clone();

        let report = enrich_assets(&mut assets, &FailingExtractor);

        assert_eq!(report, EnrichmentReport { enriched: 0, failed: 2 });
        assert_eq!(assets, before);
    }
}

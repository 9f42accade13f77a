// Fingerprint builder
// Comparison signature per asset: normalised base name, token sets, relative
// size, folder context and whatever technical metadata is known.

use std::collections::BTreeSet;
use std::sync::LazyLock;

use chrono::{DateTime, Utc};
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::assets::Asset;
use crate::constants::RED_METACLIP_PREFIX;
use crate::text::{self, LazyRegex};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MediaFingerprint {
    pub base_name: String,
    pub timecode: Option<String>,
    pub duration: Option<f64>,
    pub frame_rate: Option<f64>,
    pub resolution: Option<String>,
    pub name_tokens: BTreeSet<String>,
    pub path_tokens: BTreeSet<String>,
    /// Primary file size over the largest primary in the batch, 0 when unknown.
    pub size_ratio: f64,
    pub aspect_ratio: Option<f64>,
    pub creation_time: Option<DateTime<Utc>>,
    pub codec: Option<String>,
    pub bitrate: Option<f64>,
    pub folder_context: Vec<String>,
    pub sibling_files: Vec<String>,
}

static STANDARD_CAPTURE: LazyRegex =
    LazyLock::new(|| Regex::new(r"(?i)^([A-Z]\d{3}_[A-Z]?\d{3}_[A-F0-9]+)").ok());
static NUMERIC_CHUNK: LazyRegex = LazyLock::new(|| Regex::new(r"^(.+?)_\d{3}$").ok());
static TIMECODE_SUFFIX: LazyRegex = LazyLock::new(|| Regex::new(r"^(.+?)_\d{2}_\d{2}_\d{2}_\d{2}$").ok());
static ASPECT: LazyRegex = LazyLock::new(|| Regex::new(r"(?i)(\d+)\s*[x×]\s*(\d+)").ok());

// Ranked suffixes; the highest confidence match is stripped
static SUFFIXES: LazyLock<Vec<(Regex, f64)>> = LazyLock::new(|| {
    [
        (r"(?i)_(proxy|prx|low|edit|offline|prev|preview|thumb)$", 0.9),
        (r"(?i)_(online|master|final|hires|hi|high|source|orig|original)$", 0.8),
        (r"(?i)_(h264|prores|dnxhd|avid|mp4|mov|avi|mxf)$", 0.7),
        (r"(?i)_(1080p?|720p?|4k|uhd|2k|sd|hd)$", 0.85),
        (r"(?i)_(small|med|medium|large|xl)$", 0.6),
        (r"(?i)_v?\d{1,3}$", 0.4),
        (r"(?i)_\d{3,4}x\d{3,4}$", 0.8),
    ]
    .into_iter()
    .filter_map(|(pattern, confidence)| Some((Regex::new(pattern).ok()?, confidence)))
    .collect()
});

static TOKEN_SPLIT: LazyRegex = LazyLock::new(|| Regex::new(r"[_\-\s.]").ok());
static TOKEN_PATTERNS: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    text::compile_all(&[
        r"(?i)([a-z]+)(\d+)",
        r"(?i)(\d+)([a-z]+)",
        r"(?i)scene?\s*(\d+)",
        r"(?i)take?\s*(\d+)",
        r"(?i)shot?\s*(\d+)",
        r"(?i)cam(?:era)?\s*([a-z\d]+)",
        r"(\d{4}[\-_]\d{2}[\-_]\d{2})",
        r"(\d{2}:\d{2}:\d{2})",
        r"(?i)(proxy|offline|online|master|edit|final)",
    ])
});

/// Fingerprint `asset` against the batch it was grouped with.
pub fn build_fingerprint(asset: &Asset, all_assets: &[Asset]) -> MediaFingerprint {
    let primary = &asset.primary_file;
    let dir = primary.dir();
    let name_without_ext = primary.stem();

    let base_name = if asset.id.starts_with(RED_METACLIP_PREFIX) {
        // metaclips are already complete; never re-split them
        asset.name.clone()
    } else {
        extract_base_name(name_without_ext)
    };

    let path_tokens = primary
        .path
        .split('/')
        .flat_map(extract_tokens)
        .collect();

    let sibling_files = all_assets
        .iter()
        .filter(|a| a.primary_file.dir() == dir)
        .map(|a| a.primary_file.name.clone())
        .collect();

    MediaFingerprint {
        base_name,
        timecode: asset.metadata.timecode.clone(),
        duration: asset.metadata.duration,
        frame_rate: asset.metadata.frame_rate,
        resolution: asset.metadata.resolution.clone(),
        name_tokens: extract_tokens(name_without_ext),
        path_tokens,
        size_ratio: size_ratio(asset, all_assets),
        aspect_ratio: asset.metadata.resolution.as_deref().and_then(aspect_ratio),
        creation_time: primary.last_modified,
        codec: asset.metadata.codec.clone(),
        bitrate: asset.metadata.bitrate,
        folder_context: text::segments(dir).into_iter().map(str::to_string).collect(),
        sibling_files,
    }
}

/// Strip capture-convention, chunk, timecode and variant suffixes from a
/// name (without extension) to get the content's base name.
pub fn extract_base_name(name: &str) -> String {
    if let Some(caps) = text::captures(&STANDARD_CAPTURE, name) {
        return text::group(&caps, 1).to_string();
    }
    if let Some(caps) = text::captures(&NUMERIC_CHUNK, name) {
        return text::group(&caps, 1).to_string();
    }
    if let Some(caps) = text::captures(&TIMECODE_SUFFIX, name) {
        return text::group(&caps, 1).to_string();
    }

    let mut base = name.to_string();
    let mut best = 0.0;
    for (pattern, confidence) in SUFFIXES.iter() {
        if *confidence > best && pattern.is_match(name) {
            base = pattern.replace(name, "").to_string();
            best = *confidence;
        }
    }
    base
}

/// Separator-split words plus pattern-extracted pieces, lowercased.
pub fn extract_tokens(input: &str) -> BTreeSet<String> {
    let mut tokens = BTreeSet::new();

    if let Some(split) = TOKEN_SPLIT.as_ref() {
        tokens.extend(split.split(input).filter(|t| !t.is_empty()).map(str::to_lowercase));
    }

    for pattern in TOKEN_PATTERNS.iter() {
        for caps in pattern.captures_iter(input) {
            for group in caps.iter().skip(1).flatten() {
                tokens.insert(group.as_str().to_lowercase());
            }
        }
    }

    tokens
}

/// Primary file size relative to the largest primary in the batch.
pub fn size_ratio(asset: &Asset, all_assets: &[Asset]) -> f64 {
    let size = asset.primary_file.size;
    if size == 0 {
        return 0.0;
    }
    let max = all_assets.iter().map(|a| a.primary_file.size).max().unwrap_or(0);
    if max == 0 {
        0.0
    } else {
        size as f64 / max as f64
    }
}

/// Width over height from a `WIDTHxHEIGHT` resolution string.
pub fn aspect_ratio(resolution: &str) -> Option<f64> {
    let caps = text::captures(&ASPECT, resolution)?;
    let width: f64 = text::group(&caps, 1).parse().ok()?;
    let height: f64 = text::group(&caps, 2).parse().ok()?;
    if height == 0.0 {
        return None;
    }
    Some(width / height)
}

// BRAW, Sony, Canon and standard grouping

use std::collections::{HashMap, HashSet};

use super::{Asset, MediaFormat};
use crate::constants::{
    ASSET_EXTENSIONS, BRAW_PREFIX, CANON_CLIP_EXTENSIONS, CANON_PREFIX, CANON_SIDECAR_EXTENSIONS,
    SONY_CLIP_EXTENSIONS, SONY_PREFIX, STANDARD_PREFIX,
};
use crate::scan::FileRecord;

/// One `.braw` file per asset.
pub fn group_braw(files: &[FileRecord]) -> Vec<Asset> {
    files
        .iter()
        .filter(|f| f.is_file() && f.has_extension(&["braw"]))
        .map(|f| {
            let mut asset = Asset::new(
                format!("{}{}", BRAW_PREFIX, f.path),
                f.stem().to_string(),
                MediaFormat::Braw,
                f.clone(),
            );
            asset.metadata.codec = Some("Blackmagic RAW".to_string());
            asset
        })
        .collect()
}

/// Files sharing a directory and stem form one clip; the first video among
/// them is primary.
pub fn group_sony(files: &[FileRecord]) -> Vec<Asset> {
    let mut order: Vec<(&str, &str)> = Vec::new();
    let mut by_clip: HashMap<(&str, &str), Vec<&FileRecord>> = HashMap::new();

    for file in files.iter().filter(|f| f.is_file()) {
        let key = (file.dir(), file.stem());
        by_clip
            .entry(key)
            .or_insert_with(|| {
                order.push(key);
                Vec::new()
            })
            .push(file);
    }

    let mut processed: HashSet<&str> = HashSet::new();
    let mut assets = Vec::new();

    for key in order {
        let Some(members) = by_clip.get(&key) else {
            continue;
        };
        let Some(primary) = members.iter().find(|f| f.has_extension(&SONY_CLIP_EXTENSIONS)) else {
            continue;
        };
        if processed.contains(primary.path.as_str()) {
            continue;
        }
        processed.extend(members.iter().map(|f| f.path.as_str()));

        let mut asset = Asset::new(
            format!("{}{}", SONY_PREFIX, primary.path),
            key.1.to_string(),
            MediaFormat::Sony,
            (*primary).clone(),
        );
        asset.related_files = members.iter().map(|f| (*f).clone()).collect();
        asset.metadata.codec = primary.extension().as_deref().map(sony_codec).map(str::to_string);
        assets.push(asset);
    }

    assets
}

fn sony_codec(ext: &str) -> &'static str {
    match ext {
        "mxf" => "XAVC",
        "mp4" => "XAVC S",
        "mov" => "ProRes",
        _ => "Unknown",
    }
}

/// Each video plus same-stem XML/CIF/CPF files.
pub fn group_canon(files: &[FileRecord]) -> Vec<Asset> {
    let mut processed: HashSet<&str> = HashSet::new();
    let mut assets = Vec::new();

    for video in files.iter().filter(|f| f.is_file() && f.has_extension(&CANON_CLIP_EXTENSIONS)) {
        if processed.contains(video.path.as_str()) {
            continue;
        }
        let stem = video.stem();

        let mut related = vec![video.clone()];
        related.extend(
            files
                .iter()
                .filter(|f| {
                    f.is_file()
                        && f.stem() == stem
                        && f.has_extension(&CANON_SIDECAR_EXTENSIONS)
                        && !processed.contains(f.path.as_str())
                })
                .cloned(),
        );
        for file in files.iter().filter(|f| related.iter().any(|r| r.path == f.path)) {
            processed.insert(file.path.as_str());
        }

        let mut asset = Asset::new(
            format!("{}{}", CANON_PREFIX, video.path),
            stem.to_string(),
            MediaFormat::Canon,
            video.clone(),
        );
        asset.related_files = related;
        asset.metadata.codec = video.extension().as_deref().map(canon_codec).map(str::to_string);
        assets.push(asset);
    }

    assets
}

fn canon_codec(ext: &str) -> &'static str {
    match ext {
        "mxf" => "Canon RAW",
        "mp4" => "Canon Log",
        "mov" => "Canon Cinema RAW",
        _ => "Unknown",
    }
}

/// One asset per recognised video file.
pub fn group_standard(files: &[FileRecord]) -> Vec<Asset> {
    files
        .iter()
        .filter(|f| f.is_file() && f.has_extension(&ASSET_EXTENSIONS))
        .map(|f| {
            Asset::new(
                format!("{}{}", STANDARD_PREFIX, f.path),
                f.stem().to_string(),
                MediaFormat::Standard,
                f.clone(),
            )
        })
        .collect()
}

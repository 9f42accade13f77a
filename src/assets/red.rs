// RED metaclip grouping
// R3D chunks sharing a clip prefix become one asset; RDC/RMD/RDM sidecars
// next to the clip (or one level up) are attached.

use std::collections::{HashMap, HashSet};
use std::sync::LazyLock;

use regex::Regex;

use super::{Asset, MediaFormat};
use crate::constants::{RED_METACLIP_PREFIX, RED_SIDECAR_EXTENSIONS};
use crate::scan::FileRecord;
use crate::text::{self, LazyRegex};

static RED_CLIP: LazyRegex =
    LazyLock::new(|| Regex::new(r"(?i)^([A-Z]\d{3}_[A-Z]\d{3}_\d{8}_)(\d{3})\.R3D$").ok());
static CHUNKED_CLIP: LazyRegex = LazyLock::new(|| Regex::new(r"(?i)^(.+?_)(\d{3})\.r3d$").ok());
static CHUNK_SUFFIX: LazyRegex = LazyLock::new(|| Regex::new(r"(?i)_\d{3}\.r3d$").ok());
static ROLL_PREFIX: LazyRegex = LazyLock::new(|| Regex::new(r"(?i)^([A-Z]\d{3})").ok());
static ROLL_WORD: LazyRegex = LazyLock::new(|| Regex::new(r"(?i)ROLL[_-]([A-Z]+)").ok());
static ROLL_LEADING: LazyRegex = LazyLock::new(|| Regex::new(r"(?i)^([A-Z]+\d*)").ok());
static FPS: LazyRegex = LazyLock::new(|| Regex::new(r"(?i)(\d+)fps").ok());

pub(super) fn is_chunk_name(name: &str) -> bool {
    text::is_match(&CHUNK_SUFFIX, name)
}

/// Split an R3D name into (clip base, chunk number). Unchunked names give
/// their stem and chunk 0.
fn split_chunk(name: &str) -> (String, u32) {
    let caps = text::captures(&RED_CLIP, name).or_else(|| text::captures(&CHUNKED_CLIP, name));
    match caps {
        Some(caps) => {
            let chunk = text::group(&caps, 2).parse().unwrap_or(0);
            (text::group(&caps, 1).to_string(), chunk)
        }
        None => (text::strip_extension(name).to_string(), 0),
    }
}

pub fn group_red(files: &[FileRecord]) -> Vec<Asset> {
    let mut processed: HashSet<String> = HashSet::new();

    // Keep first-seen order of clip bases
    let mut order: Vec<String> = Vec::new();
    let mut clips: HashMap<String, Vec<(u32, &FileRecord)>> = HashMap::new();

    for file in files.iter().filter(|f| f.is_file() && f.has_extension(&["r3d"])) {
        let (base, chunk) = split_chunk(&file.name);
        clips
            .entry(base.clone())
            .or_insert_with(|| {
                order.push(base.clone());
                Vec::new()
            })
            .push((chunk, file));
    }

    let mut assets = Vec::new();

    for base in order {
        let Some(mut chunks) = clips.remove(&base) else {
            continue;
        };
        chunks.retain(|(_, f)| !processed.contains(f.path.as_str()));
        chunks.sort_by_key(|(chunk, _)| *chunk);
        let Some((_, primary)) = chunks.first().copied() else {
            continue;
        };

        let mut related: Vec<FileRecord> = chunks.iter().map(|(_, f)| (*f).clone()).collect();

        let clip_dir = primary.dir();
        let parent_dir = text::parent_dir(clip_dir);
        let clip_name = base.trim_end_matches('_');

        for candidate in files {
            if processed.contains(candidate.path.as_str())
                || !candidate.has_extension(&RED_SIDECAR_EXTENSIONS)
                || (candidate.dir() != clip_dir && candidate.dir() != parent_dir)
            {
                continue;
            }
            if candidate.stem().eq_ignore_ascii_case(clip_name) {
                related.push(candidate.clone());
            }
        }

        processed.extend(related.iter().map(|f| f.path.clone()));

        let mut asset = Asset::new(
            format!("{}{}", RED_METACLIP_PREFIX, primary.path),
            clip_name.to_string(),
            MediaFormat::Red,
            primary.clone(),
        );
        asset.metadata.codec = Some("REDCODE".to_string());
        asset.metadata.frame_rate = text::captures(&FPS, &primary.name).and_then(|c| text::group(&c, 1).parse().ok());
        asset.metadata.segments = Some(chunks.len());
        asset.metadata.capture_roll = capture_roll_from_path(&primary.path).or_else(|| capture_roll_from_name(&base));
        asset.metadata.total_size = Some(related.iter().map(|f| f.size).sum());
        asset.related_files = related;

        log::debug!("RED metaclip {} with {} chunks", base, chunks.len());
        assets.push(asset);
    }

    assets
}

/// Roll from an enclosing `<roll>.RDM` folder.
fn capture_roll_from_path(path: &str) -> Option<String> {
    text::segments(path)
        .into_iter()
        .find(|part| part.to_lowercase().ends_with(".rdm"))
        .map(|part| text::strip_extension(part).to_string())
}

fn capture_roll_from_name(base: &str) -> Option<String> {
    [&ROLL_PREFIX, &ROLL_WORD, &ROLL_LEADING]
        .into_iter()
        .find_map(|re| text::captures(re, base).map(|c| text::group(&c, 1).to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_split_chunk() {
        assert_eq!(split_chunk("A001_C001_20240315_002.R3D"), ("A001_C001_20240315_".to_string(), 2));
        assert_eq!(split_chunk("interview_take_010.r3d"), ("interview_take_".to_string(), 10));
        assert_eq!(split_chunk("loose.R3D"), ("loose".to_string(), 0));
    }

    #[test]
    fn test_capture_roll_fallbacks() {
        assert_eq!(capture_roll_from_path("/Mag/B003.RDM/clip/x.R3D").as_deref(), Some("B003"));
        assert_eq!(capture_roll_from_name("ROLL_CA_clip").as_deref(), Some("CA"));
        assert_eq!(capture_roll_from_name("abc123_x").as_deref(), Some("abc123"));
    }
}

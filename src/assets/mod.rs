// Asset grouper
// Detects the camera format of a batch and folds raw files into logical assets.

mod red;
mod vendors;

use std::collections::{BTreeMap, HashSet};
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::metadata::ExtendedMetadata;
use crate::scan::FileRecord;
use crate::text;

pub use red::group_red;
pub use vendors::{group_braw, group_canon, group_sony, group_standard};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MediaFormat {
    Red,
    Braw,
    Sony,
    Canon,
    Standard,
}

impl MediaFormat {
    pub fn as_str(&self) -> &'static str {
        match self {
            MediaFormat::Red => "red",
            MediaFormat::Braw => "braw",
            MediaFormat::Sony => "sony",
            MediaFormat::Canon => "canon",
            MediaFormat::Standard => "standard",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "red" => Some(MediaFormat::Red),
            "braw" => Some(MediaFormat::Braw),
            "sony" => Some(MediaFormat::Sony),
            "canon" => Some(MediaFormat::Canon),
            "standard" => Some(MediaFormat::Standard),
            _ => None,
        }
    }
}

impl fmt::Display for MediaFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One logical piece of captured content. `related_files` lists every file
/// of the asset in discovery order, the primary included.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Asset {
    pub id: String,
    pub name: String,
    pub format: MediaFormat,
    pub primary_file: FileRecord,
    pub related_files: Vec<FileRecord>,
    pub metadata: ExtendedMetadata,
}

impl Asset {
    pub fn new(id: String, name: String, format: MediaFormat, primary_file: FileRecord) -> Self {
        Self {
            id,
            name,
            format,
            related_files: vec![primary_file.clone()],
            primary_file,
            metadata: ExtendedMetadata::default(),
        }
    }

    /// Sum of related file sizes.
    pub fn total_size(&self) -> u64 {
        self.related_files.iter().map(|f| f.size).sum()
    }

    pub fn is_red(&self) -> bool {
        self.format == MediaFormat::Red
    }

    /// Number of camera chunks, 1 unless grouping recorded more.
    pub fn segment_count(&self) -> usize {
        self.metadata.segments.unwrap_or(1)
    }
}

/// Assets sharing a directory.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AssetGroup {
    pub id: String,
    pub name: String,
    pub path: String,
    pub assets: Vec<Asset>,
    pub total_size: u64,
    pub file_count: usize,
}

/// Pick one camera format for the whole batch.
pub fn detect_format(files: &[FileRecord]) -> MediaFormat {
    if files.iter().any(|f| f.path.to_lowercase().contains("xdroot/clip")) {
        return MediaFormat::Sony;
    }

    let names: Vec<String> = files.iter().map(|f| f.name.to_lowercase()).collect();

    if names.iter().any(|n| n.ends_with(".rdc") || red::is_chunk_name(n)) {
        return MediaFormat::Red;
    }
    if names.iter().any(|n| n.ends_with(".braw")) {
        return MediaFormat::Braw;
    }
    if names.iter().any(|n| n.ends_with(".mxf")) && names.iter().any(|n| n.ends_with(".xml")) {
        return MediaFormat::Canon;
    }

    MediaFormat::Standard
}

/// Detect the batch format and group under it.
pub fn group_assets(files: &[FileRecord]) -> (MediaFormat, Vec<Asset>) {
    let format = detect_format(files);
    log::info!("Detected {} format across {} records", format, files.len());
    (format, group_assets_with_format(files, format))
}

/// Group under a caller-chosen format. Files no rule claims are left out.
pub fn group_assets_with_format(files: &[FileRecord], format: MediaFormat) -> Vec<Asset> {
    let assets = match format {
        MediaFormat::Red => group_red(files),
        MediaFormat::Braw => group_braw(files),
        MediaFormat::Sony => group_sony(files),
        MediaFormat::Canon => group_canon(files),
        MediaFormat::Standard => group_standard(files),
    };

    let claimed: HashSet<&str> = assets
        .iter()
        .flat_map(|a| a.related_files.iter().map(|f| f.path.as_str()))
        .collect();
    for file in files.iter().filter(|f| f.is_file() && !claimed.contains(f.path.as_str())) {
        log::debug!("Skipping {} (no {} grouping rule)", file.path, format);
    }

    log::info!("Grouped {} {} assets", assets.len(), format);
    assets
}

/// Bundle assets by the directory of their primary file.
pub fn create_asset_groups(assets: &[Asset]) -> Vec<AssetGroup> {
    let mut by_dir: BTreeMap<&str, Vec<&Asset>> = BTreeMap::new();
    for asset in assets {
        by_dir.entry(asset.primary_file.dir()).or_default().push(asset);
    }

    by_dir
        .into_iter()
        .map(|(dir, members)| {
            let name = text::segments(dir).last().map(|s| s.to_string()).unwrap_or_else(|| "Root".to_string());
            AssetGroup {
                id: format!("group:{}", dir),
                name,
                path: dir.to_string(),
                total_size: members.iter().map(|a| a.total_size()).sum(),
                file_count: members.iter().map(|a| a.related_files.len()).sum(),
                assets: members.into_iter().cloned().collect(),
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::constants::RED_METACLIP_PREFIX;

    fn file(path: &str, size: u64) -> FileRecord {
        FileRecord::file(path, size)
    }

    #[test]
    fn test_detect_format_order() {
        let sony = vec![file("/Card/XDROOT/Clip/C0001.MXF", 1), file("/Card/A001_C001_20240315_001.R3D", 1)];
        assert_eq!(detect_format(&sony), MediaFormat::Sony);

        let red = vec![file("/Card/A001_C001_20240315_001.R3D", 1), file("/Card/x.braw", 1)];
        assert_eq!(detect_format(&red), MediaFormat::Red);

        let braw = vec![file("/Card/x.braw", 1)];
        assert_eq!(detect_format(&braw), MediaFormat::Braw);

        let canon = vec![file("/Card/CLIP01.MXF", 1), file("/Card/CLIP01.XML", 1)];
        assert_eq!(detect_format(&canon), MediaFormat::Canon);

        let plain = vec![file("/Edit/cut.mov", 1)];
        assert_eq!(detect_format(&plain), MediaFormat::Standard);
    }

    #[test]
    fn test_red_metaclip_scenario() {
        let files = vec![
            file("/Shoot/A001_C001_20240315_000.R3D", 4000),
            file("/Shoot/A001_C001_20240315_001.R3D", 2000),
            file("/Shoot/A001_C001_20240315.RDC", 10),
        ];

        let (format, assets) = group_assets(&files);

        assert_eq!(format, MediaFormat::Red);
        assert_eq!(assets.len(), 1);
        let asset = &assets[0];
        assert_eq!(asset.name, "A001_C001_20240315");
        assert_eq!(asset.related_files.len(), 3);
        assert_eq!(asset.metadata.segments, Some(2));
        assert_eq!(asset.primary_file.name, "A001_C001_20240315_000.R3D");
        assert_eq!(asset.metadata.total_size, Some(6010));
        assert_eq!(asset.metadata.capture_roll.as_deref(), Some("A001"));
        assert!(asset.id.starts_with(RED_METACLIP_PREFIX));
    }

    #[test]
    fn test_red_chunks_sorted_ascending() {
        let files = vec![
            file("/Shoot/B002_C004_20240316_003.R3D", 1),
            file("/Shoot/B002_C004_20240316_001.R3D", 1),
            file("/Shoot/B002_C004_20240316_002.R3D", 1),
        ];

        let assets = group_assets_with_format(&files, MediaFormat::Red);

        assert_eq!(assets.len(), 1);
        let chunks: Vec<&str> = assets[0].related_files.iter().map(|f| f.name.as_str()).collect();
        assert_eq!(
            chunks,
            vec![
                "B002_C004_20240316_001.R3D",
                "B002_C004_20240316_002.R3D",
                "B002_C004_20240316_003.R3D"
            ]
        );
        assert_eq!(assets[0].primary_file.name, "B002_C004_20240316_001.R3D");
    }

    #[test]
    fn test_red_rdc_folder_and_roll() {
        let files = vec![
            FileRecord::directory("/Mag/A002.RDM"),
            FileRecord::directory("/Mag/A002.RDM/A002_C007_20240401.RDC"),
            file("/Mag/A002.RDM/A002_C007_20240401.RDC/A002_C007_20240401_001.R3D", 5),
            file("/Mag/A002.RDM/A002_C007_20240401.RDC/A002_C007_20240401.RMD", 1),
            file("/Mag/A002.RDM/A002_C008_20240401.RDC/A002_C008_20240401_001.R3D", 5),
        ];

        let assets = group_assets_with_format(&files, MediaFormat::Red);

        assert_eq!(assets.len(), 2);
        let first = &assets[0];
        assert_eq!(first.related_files.len(), 3);
        assert!(first.related_files.iter().any(|f| f.is_directory() && f.name.ends_with(".RDC")));
        assert_eq!(first.metadata.capture_roll.as_deref(), Some("A002"));

        let mut seen = HashSet::new();
        for asset in &assets {
            for f in &asset.related_files {
                assert!(seen.insert(f.path.clone()), "{} grouped twice", f.path);
            }
        }
    }

    #[test]
    fn test_single_unchunked_r3d() {
        let files = vec![file("/Shoot/A001_C001_20240315_000.R3D", 1), file("/Shoot/loose.r3d", 1)];

        let assets = group_assets_with_format(&files, MediaFormat::Red);

        assert_eq!(assets.len(), 2);
        assert!(assets.iter().any(|a| a.name == "loose" && a.segment_count() == 1));
    }

    #[test]
    fn test_sony_groups_by_dir_and_stem() {
        let files = vec![
            file("/Card/XDROOT/Clip/C0001.MXF", 100),
            file("/Card/XDROOT/Clip/C0001M01.XML", 1),
            file("/Card/XDROOT/Clip/C0002.MXF", 100),
            file("/Card/XDROOT/Clip/C0002.XML", 1),
            file("/Card/XDROOT/Clip/C0002.BIM", 1),
        ];

        let (format, assets) = group_assets(&files);

        assert_eq!(format, MediaFormat::Sony);
        assert_eq!(assets.len(), 2);
        assert_eq!(assets[0].related_files.len(), 1);
        assert_eq!(assets[1].related_files.len(), 3);
        assert_eq!(assets[1].metadata.codec.as_deref(), Some("XAVC"));
    }

    #[test]
    fn test_canon_attaches_sidecars() {
        let files = vec![
            file("/Card/CONTENTS/CLIPS001/A001C001.MXF", 100),
            file("/Card/CONTENTS/CLIPS001/A001C001.XML", 1),
            file("/Card/CONTENTS/CLIPS001/A001C001.CIF", 1),
            file("/Card/CONTENTS/CLIPS001/notes.txt", 1),
        ];

        let (format, assets) = group_assets(&files);

        assert_eq!(format, MediaFormat::Canon);
        assert_eq!(assets.len(), 1);
        assert_eq!(assets[0].related_files.len(), 3);
        assert_eq!(assets[0].metadata.codec.as_deref(), Some("Canon RAW"));
    }

    #[test]
    fn test_standard_assets_and_groups() {
        let files = vec![
            file("/Edit/Day1/a.mov", 10),
            file("/Edit/Day1/b.mp4", 20),
            file("/Edit/Day2/c.mkv", 30),
            file("/Edit/Day2/readme.txt", 1),
            FileRecord::directory("/Edit/Day2"),
        ];

        let (format, assets) = group_assets(&files);
        assert_eq!(format, MediaFormat::Standard);
        assert_eq!(assets.len(), 3);
        assert_eq!(assets[0].name, "a");

        let groups = create_asset_groups(&assets);
        assert_eq!(groups.len(), 2);
        assert_eq!(groups[0].name, "Day1");
        assert_eq!(groups[0].total_size, 30);
        assert_eq!(groups[0].file_count, 2);
    }
}

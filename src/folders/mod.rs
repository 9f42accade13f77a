// Folder classification and scan planning
// Decides which directories hold camera media, which are caches or system
// folders to skip, and in which order the rest should be scanned.

use std::collections::HashSet;
use std::sync::LazyLock;

use chrono::{DateTime, Utc};
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::scan::{children_of, FileRecord};
use crate::text;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FolderType {
    Media,
    Cache,
    System,
    Unknown,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FlagType {
    Media,
    Ignore,
    System,
}

impl FlagType {
    pub fn as_str(&self) -> &'static str {
        match self {
            FlagType::Media => "media",
            FlagType::Ignore => "ignore",
            FlagType::System => "system",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "media" => Some(FlagType::Media),
            "ignore" => Some(FlagType::Ignore),
            "system" => Some(FlagType::System),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserFolderFlag {
    pub path: String,
    #[serde(rename = "type")]
    pub kind: FlagType,
    pub user_defined: bool,
    pub timestamp: DateTime<Utc>,
}

struct PatternDef {
    id: &'static str,
    name: &'static str,
    paths: &'static [&'static str],
    names: &'static [&'static str],
    content: &'static [&'static str],
    excludes: &'static [&'static str],
    confidence: f64,
}

const MEDIA_PATTERN_DEFS: &[PatternDef] = &[
    PatternDef {
        id: "red_camera",
        name: "RED Camera Media",
        paths: &[r"(?i)RED.*CAPTURE", r"(?i)RED.*MEDIA", r"\d{4}-\d{2}-\d{2}"],
        names: &[r"(?i)^[A-Z]\d{3}$", r"(?i)^RED_", r"(?i)^CAPTURE"],
        content: &[".rdc", ".r3d", ".rmf", ".rmd"],
        excludes: &[r"(?i)cache", r"(?i)temp", r"(?i)proxy"],
        confidence: 0.95,
    },
    PatternDef {
        id: "sony_xdcam",
        name: "Sony XDCAM Media",
        paths: &[r"(?i)XDROOT[/\\]CLIP", r"(?i)PRIVATE[/\\]M4ROOT"],
        names: &[r"(?i)^CLIP$", r"(?i)^SUB$", r"(?i)^GENERAL$"],
        content: &[".mxf", ".xml", ".bim", ".ppm"],
        excludes: &[r"(?i)thumbnail", r"(?i)cache"],
        confidence: 0.98,
    },
    PatternDef {
        id: "blackmagic_braw",
        name: "Blackmagic RAW Media",
        paths: &[r"(?i)BMPCC", r"(?i)URSA", r"(?i)Blackmagic"],
        names: &[r"(?i)^[A-Z]\d{3}$", r"(?i)BMPCC", r"^\d{4}-\d{2}-\d{2}$"],
        content: &[".braw"],
        excludes: &[r"(?i)cache", r"(?i)proxy"],
        confidence: 0.92,
    },
    PatternDef {
        id: "canon_cinema",
        name: "Canon Cinema Media",
        paths: &[r"(?i)CANON", r"(?i)DCIM", r"(?i)EOS"],
        names: &[r"(?i)^[A-Z]\d{3}CANON$", r"(?i)^\d{3}CANON$"],
        content: &[".mxf", ".mp4", ".mov", ".cif", ".cpf"],
        excludes: &[r"(?i)thumbnail", r"(?i)cache"],
        confidence: 0.90,
    },
    PatternDef {
        id: "standard_video",
        name: "Standard Video Media",
        paths: &[r"(?i)video", r"(?i)footage", r"(?i)media", r"(?i)clips"],
        names: &[r"(?i)video", r"(?i)footage", r"(?i)media", r"(?i)clips", r"(?i)rushes"],
        content: &[".mp4", ".mov", ".avi", ".mkv", ".prores"],
        excludes: &[r"(?i)cache", r"(?i)proxy", r"(?i)thumbnail", r"(?i)temp"],
        confidence: 0.75,
    },
    PatternDef {
        id: "audio_media",
        name: "Audio Media",
        paths: &[r"(?i)audio", r"(?i)sound", r"(?i)records"],
        names: &[r"(?i)audio", r"(?i)sound", r"(?i)records", r"(?i)wav"],
        content: &[".wav", ".aif", ".mp3", ".flac"],
        excludes: &[r"(?i)cache", r"(?i)temp"],
        confidence: 0.80,
    },
];

const IGNORE_PATTERN_DEFS: &[PatternDef] = &[
    PatternDef {
        id: "cache_folders",
        name: "Cache/Temp Folders",
        paths: &[r"(?i)cache", r"(?i)temp", r"(?i)tmp", r"(?i)\.cache"],
        names: &[r"(?i)cache", r"(?i)temp", r"(?i)tmp", r"(?i)\.temp", r"(?i)\.cache"],
        content: &[".tmp", ".cache", ".log"],
        excludes: &[],
        confidence: 0.95,
    },
    PatternDef {
        id: "system_folders",
        name: "System Folders",
        paths: &[r"(?i)System", r"(?i)Library", r"(?i)Windows", r"(?i)\.git"],
        names: &[r"(?i)^System$", r"(?i)^Library$", r"(?i)^Windows$", r"(?i)^\.git$", r"(?i)^\.DS_Store$"],
        content: &[".sys", ".dll", ".exe"],
        excludes: &[],
        confidence: 0.98,
    },
    PatternDef {
        id: "proxy_folders",
        name: "Proxy/Preview Folders",
        paths: &[r"(?i)proxy", r"(?i)preview", r"(?i)thumbnail", r"(?i)thumb"],
        names: &[r"(?i)proxy", r"(?i)preview", r"(?i)thumbnail", r"(?i)thumb"],
        content: &[".jpg", ".png", ".jpeg"],
        excludes: &[],
        confidence: 0.90,
    },
];

/// Compiled folder pattern.
pub struct FolderPattern {
    pub id: &'static str,
    pub name: &'static str,
    pub confidence: f64,
    paths: Vec<Regex>,
    names: Vec<Regex>,
    content: &'static [&'static str],
    excludes: Vec<Regex>,
}

fn compile(defs: &[PatternDef]) -> Vec<FolderPattern> {
    defs.iter()
        .map(|d| FolderPattern {
            id: d.id,
            name: d.name,
            confidence: d.confidence,
            paths: text::compile_all(d.paths),
            names: text::compile_all(d.names),
            content: d.content,
            excludes: text::compile_all(d.excludes),
        })
        .collect()
}

static MEDIA_PATTERNS: LazyLock<Vec<FolderPattern>> = LazyLock::new(|| compile(MEDIA_PATTERN_DEFS));
static IGNORE_PATTERNS: LazyLock<Vec<FolderPattern>> = LazyLock::new(|| compile(IGNORE_PATTERN_DEFS));

pub fn media_patterns() -> &'static [FolderPattern] {
    &MEDIA_PATTERNS
}

impl FolderPattern {
    /// +0.4 path hit, +0.3 name hit, +0.5 child content hit, -0.3 when
    /// excluded; clamped to [0, 1].
    pub fn score(&self, folder: &FileRecord, children: &[&FileRecord]) -> f64 {
        let mut score: f64 = 0.0;

        if self.paths.iter().any(|re| re.is_match(&folder.path)) {
            score += 0.4;
        }
        if self.names.iter().any(|re| re.is_match(&folder.name)) {
            score += 0.3;
        }

        let has_content = children.iter().filter(|c| c.is_file()).any(|file| {
            let name = file.name.to_lowercase();
            self.content.iter().any(|indicator| name.contains(indicator))
        });
        if has_content {
            score += 0.5;
        }

        if self
            .excludes
            .iter()
            .any(|re| re.is_match(&folder.path) || re.is_match(&folder.name))
        {
            score -= 0.3;
        }

        score.clamp(0.0, 1.0)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FolderClassification {
    #[serde(rename = "type")]
    pub kind: FolderType,
    pub confidence: f64,
    pub pattern_id: Option<String>,
    pub reasoning: Vec<String>,
    pub should_scan: bool,
    pub priority: u32,
}

/// Classify one directory from its own path and name plus its direct children.
pub fn classify_folder(folder: &FileRecord, children: &[&FileRecord], flags: &[UserFolderFlag]) -> FolderClassification {
    if let Some(flag) = flags
        .iter()
        .find(|f| folder.path.contains(f.path.as_str()) || f.path.contains(folder.path.as_str()))
    {
        let kind = match flag.kind {
            FlagType::Ignore => FolderType::Cache,
            FlagType::System => FolderType::System,
            FlagType::Media => FolderType::Media,
        };
        let media = flag.kind == FlagType::Media;
        return FolderClassification {
            kind,
            confidence: 1.0,
            pattern_id: None,
            reasoning: vec![format!("User-defined: {}", flag.kind.as_str())],
            should_scan: media,
            priority: if media { 10 } else { 0 },
        };
    }

    for pattern in IGNORE_PATTERNS.iter() {
        let score = pattern.score(folder, children);
        if score > 0.7 {
            return FolderClassification {
                kind: FolderType::Cache,
                confidence: score,
                pattern_id: Some(pattern.id.to_string()),
                reasoning: vec![format!("Matches ignore pattern: {}", pattern.name)],
                should_scan: false,
                priority: 0,
            };
        }
    }

    let mut best: Option<(&FolderPattern, f64)> = None;
    for pattern in MEDIA_PATTERNS.iter() {
        let score = pattern.score(folder, children);
        if score > 0.6 && best.map_or(true, |(_, s)| score > s) {
            best = Some((pattern, score));
        }
    }

    if let Some((pattern, score)) = best {
        return FolderClassification {
            kind: FolderType::Media,
            confidence: score,
            pattern_id: Some(pattern.id.to_string()),
            reasoning: vec![format!("Matches pattern: {} ({}%)", pattern.name, (score * 100.0).round())],
            should_scan: true,
            priority: (score * 10.0).round() as u32,
        };
    }

    FolderClassification {
        kind: FolderType::Unknown,
        confidence: 0.5,
        pattern_id: None,
        reasoning: vec!["No clear pattern match".to_string()],
        should_scan: true,
        priority: 1,
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlannedFolder {
    pub path: String,
    pub classification: FolderClassification,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ScanStats {
    pub total: usize,
    pub media: usize,
    pub cache: usize,
    pub unknown: usize,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScanPlan {
    pub scan_queue: Vec<PlannedFolder>,
    pub skip_queue: Vec<PlannedFolder>,
    pub stats: ScanStats,
}

/// Classify every directory top-down. Skipped folders prune their subtree;
/// the scan queue is ordered by priority, highest first.
pub fn generate_scan_plan(records: &[FileRecord], flags: &[UserFolderFlag]) -> ScanPlan {
    let dirs: HashSet<&str> = records.iter().filter(|r| r.is_directory()).map(|r| r.path.as_str()).collect();
    let roots: Vec<&FileRecord> = records
        .iter()
        .filter(|r| r.is_directory() && !dirs.contains(r.dir()))
        .collect();

    let mut plan = ScanPlan::default();
    let mut stack: Vec<&FileRecord> = roots.into_iter().rev().collect();

    while let Some(folder) = stack.pop() {
        let children = children_of(records, &folder.path);
        let classification = classify_folder(folder, &children, flags);
        plan.stats.total += 1;

        let entry = PlannedFolder {
            path: folder.path.clone(),
            classification,
        };
        match entry.classification.kind {
            FolderType::Cache | FolderType::System => {
                plan.stats.cache += 1;
                plan.skip_queue.push(entry);
                continue;
            }
            FolderType::Media => {
                plan.stats.media += 1;
                plan.scan_queue.push(entry);
            }
            FolderType::Unknown => {
                plan.stats.unknown += 1;
                plan.scan_queue.push(entry);
            }
        }

        stack.extend(children.into_iter().filter(|c| c.is_directory()).rev());
    }

    plan.scan_queue
        .sort_by(|a, b| b.classification.priority.cmp(&a.classification.priority));

    log::info!(
        "Scan plan: {} folders, {} media, {} skipped, {} unknown",
        plan.stats.total,
        plan.stats.media,
        plan.stats.cache,
        plan.stats.unknown
    );
    plan
}

/// Record a user decision, replacing any earlier flag on the same path.
pub fn learn_from_user_action(path: &str, action: FlagType, flags: &[UserFolderFlag]) -> Vec<UserFolderFlag> {
    let mut updated: Vec<UserFolderFlag> = flags.iter().filter(|f| f.path != path).cloned().collect();
    updated.push(UserFolderFlag {
        path: path.to_string(),
        kind: action,
        user_defined: true,
        timestamp: Utc::now(),
    });
    updated
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PatternSuggestions {
    pub suggestions: Vec<String>,
    /// Path segments to promote into a user media pattern.
    pub media_segments: Vec<String>,
    pub ignore_segments: Vec<String>,
}

/// Look for path segments shared by most flagged folders of one kind.
pub fn suggest_pattern_updates(flags: &[UserFolderFlag]) -> PatternSuggestions {
    let mut result = PatternSuggestions::default();

    let paths_of = |kind: FlagType| -> Vec<&str> {
        flags.iter().filter(|f| f.kind == kind).map(|f| f.path.as_str()).collect()
    };

    let media = paths_of(FlagType::Media);
    if media.len() >= 3 {
        result.media_segments = common_segments(&media);
        if !result.media_segments.is_empty() {
            result
                .suggestions
                .push(format!("Detected new media folder pattern: {}", result.media_segments.join(", ")));
        }
    }

    let ignore = paths_of(FlagType::Ignore);
    if ignore.len() >= 3 {
        result.ignore_segments = common_segments(&ignore);
        if !result.ignore_segments.is_empty() {
            result
                .suggestions
                .push(format!("Detected folders to always ignore: {}", result.ignore_segments.join(", ")));
        }
    }

    result
}

/// Segments present in at least 60% of `paths`, in first-seen order.
fn common_segments(paths: &[&str]) -> Vec<String> {
    if paths.len() < 2 {
        return Vec::new();
    }

    let mut counts: Vec<(&str, usize)> = Vec::new();
    for path in paths {
        let mut seen: HashSet<&str> = HashSet::new();
        for segment in text::segments(path) {
            if !seen.insert(segment) {
                continue;
            }
            match counts.iter_mut().find(|(s, _)| *s == segment) {
                Some((_, n)) => *n += 1,
                None => counts.push((segment, 1)),
            }
        }
    }

    let threshold = (paths.len() as f64 * 0.6).ceil() as usize;
    counts
        .into_iter()
        .filter(|(_, n)| *n >= threshold)
        .map(|(s, _)| s.to_string())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dir(path: &str) -> FileRecord {
        FileRecord::directory(path)
    }

    fn flag(path: &str, kind: FlagType) -> UserFolderFlag {
        UserFolderFlag {
            path: path.to_string(),
            kind,
            user_defined: true,
            timestamp: Utc::now(),
        }
    }

    #[test]
    fn test_red_card_is_media() {
        let folder = dir("/Shoot/A001");
        let clip = FileRecord::file("/Shoot/A001/A001_C001_20240315_000.R3D", 10);

        let result = classify_folder(&folder, &[&clip], &[]);
        assert_eq!(result.kind, FolderType::Media);
        assert_eq!(result.pattern_id.as_deref(), Some("red_camera"));
        assert!((result.confidence - 0.8).abs() < 1e-9);
        assert_eq!(result.priority, 8);
        assert!(result.should_scan);
    }

    #[test]
    fn test_cache_folder_is_skipped() {
        let folder = dir("/Shoot/Cache");
        let log = FileRecord::file("/Shoot/Cache/render.log", 1);

        let result = classify_folder(&folder, &[&log], &[]);
        assert_eq!(result.kind, FolderType::Cache);
        assert_eq!(result.pattern_id.as_deref(), Some("cache_folders"));
        assert!(!result.should_scan);
    }

    #[test]
    fn test_exclusion_penalty_and_unknown() {
        // name and path hit but no content: 0.7, then a proxy exclusion
        let folder = dir("/Shoot/footage_proxy");
        let result = classify_folder(&folder, &[], &[]);
        assert_ne!(result.kind, FolderType::Media);

        let plain = classify_folder(&dir("/Shoot/Day1"), &[], &[]);
        assert_eq!(plain.kind, FolderType::Unknown);
        assert_eq!(plain.priority, 1);
    }

    #[test]
    fn test_user_flag_wins() {
        let flags = vec![flag("/Shoot/Cache", FlagType::Media)];
        let result = classify_folder(&dir("/Shoot/Cache/Renders"), &[], &flags);
        assert_eq!(result.kind, FolderType::Media);
        assert_eq!(result.confidence, 1.0);
        assert_eq!(result.priority, 10);

        let flags = vec![flag("/Shoot/Day1", FlagType::System)];
        let result = classify_folder(&dir("/Shoot/Day1"), &[], &flags);
        assert_eq!(result.kind, FolderType::System);
        assert!(!result.should_scan);
    }

    #[test]
    fn test_scan_plan_prunes_and_orders() {
        let records = vec![
            dir("/Shoot"),
            dir("/Shoot/A001"),
            FileRecord::file("/Shoot/A001/A001_C001_20240315_000.R3D", 10),
            dir("/Shoot/Cache"),
            dir("/Shoot/Cache/Inner"),
            FileRecord::file("/Shoot/Cache/render.log", 1),
            dir("/Shoot/Notes"),
        ];

        let plan = generate_scan_plan(&records, &[]);

        assert_eq!(plan.stats.total, 4);
        assert_eq!(plan.stats.media, 1);
        assert_eq!(plan.stats.cache, 1);
        assert_eq!(plan.stats.unknown, 2);
        assert_eq!(plan.skip_queue[0].path, "/Shoot/Cache");
        assert_eq!(plan.scan_queue[0].path, "/Shoot/A001");
        assert!(plan.scan_queue.iter().all(|p| !p.path.starts_with("/Shoot/Cache")));
    }

    #[test]
    fn test_learning_and_suggestions() {
        let mut flags = Vec::new();
        flags = learn_from_user_action("/Vol/Footage/Day1", FlagType::Ignore, &flags);
        flags = learn_from_user_action("/Vol/Footage/Day1", FlagType::Media, &flags);
        assert_eq!(flags.len(), 1);
        assert_eq!(flags[0].kind, FlagType::Media);

        flags = learn_from_user_action("/Vol/Footage/Day2", FlagType::Media, &flags);
        flags = learn_from_user_action("/Vol/Other/Day3", FlagType::Media, &flags);

        let suggestions = suggest_pattern_updates(&flags);
        assert_eq!(suggestions.media_segments, vec!["Vol", "Footage"]);
        assert_eq!(suggestions.suggestions.len(), 1);
        assert!(suggestions.ignore_segments.is_empty());
    }
}

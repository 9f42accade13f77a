// Naming-grammar analyzer
// Ordered vendor filename grammars (first match wins) plus context sub-patterns
// that may match alongside the winning grammar.

use std::collections::{BTreeMap, HashSet};
use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::constants::{ANALYZER_CONTEXT_CONFIDENCE, CONTEXT_MIN_CONFIDENCE, CONTEXT_SKIP_TERMS};
use crate::scan::FileRecord;
use crate::text::{self, LazyRegex};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SegmentType {
    Reel,
    Camera,
    Card,
    Clip,
    Take,
    Date,
    Time,
    Project,
    Scene,
    Shot,
    Version,
    Technical,
}

/// Category of a context label found in a name or path.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ContextType {
    Project,
    Camera,
    CaptureRoll,
    ClipSequence,
    Format,
    Status,
    Location,
    Technical,
    Temporal,
    Category,
    Semantic,
}

impl ContextType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ContextType::Project => "project",
            ContextType::Camera => "camera",
            ContextType::CaptureRoll => "capture_roll",
            ContextType::ClipSequence => "clip_sequence",
            ContextType::Format => "format",
            ContextType::Status => "status",
            ContextType::Location => "location",
            ContextType::Technical => "technical",
            ContextType::Temporal => "temporal",
            ContextType::Category => "category",
            ContextType::Semantic => "semantic",
        }
    }
}

struct SegmentDescriptor {
    name: &'static str,
    kind: SegmentType,
}

const fn seg(name: &'static str, kind: SegmentType) -> SegmentDescriptor {
    SegmentDescriptor { name, kind }
}

struct GrammarDef {
    id: &'static str,
    name: &'static str,
    pattern: &'static str,
    segments: &'static [SegmentDescriptor],
    confidence: f64,
}

/// A compiled grammar from the ordered table.
pub struct Grammar {
    pub id: &'static str,
    pub name: &'static str,
    pub confidence: f64,
    pattern: Regex,
    segments: &'static [SegmentDescriptor],
}

use SegmentType as S;

const GRAMMAR_DEFS: &[GrammarDef] = &[
    GrammarDef {
        id: "red-standard",
        name: "RED Standard R3D",
        pattern: r"(?i)^([A-Z])(\d{3})_([A-Z])(\d{3})_(\d{8})_(\d{3})\.R3D$",
        segments: &[
            seg("Reel Letter", S::Reel),
            seg("Reel Number", S::Reel),
            seg("Camera Letter", S::Camera),
            seg("Camera Number", S::Camera),
            seg("Date", S::Date),
            seg("Clip Number", S::Clip),
        ],
        confidence: 0.95,
    },
    GrammarDef {
        id: "red-extended",
        name: "RED Extended Naming",
        pattern: r"(?i)^([A-Z]\d{3})_([A-Z]\d{3})_(\d{6})_(\d{4})\.R3D$",
        segments: &[
            seg("Reel ID", S::Reel),
            seg("Camera ID", S::Camera),
            seg("Time Code", S::Time),
            seg("Frame Number", S::Clip),
        ],
        confidence: 0.90,
    },
    GrammarDef {
        id: "project-scene-take",
        name: "Project Scene Take",
        pattern: r"(?i)^(.+)_S(\d+)_T(\d+)_(.+)$",
        segments: &[
            seg("Project Name", S::Project),
            seg("Scene Number", S::Scene),
            seg("Take Number", S::Take),
            seg("Additional Info", S::Version),
        ],
        confidence: 0.85,
    },
    GrammarDef {
        id: "date-sequence",
        name: "Date Sequence",
        pattern: r"(?i)^(\d{4}[-_]\d{2}[-_]\d{2}).*?(\d{3,4})$",
        segments: &[seg("Date", S::Date), seg("Sequence", S::Clip)],
        confidence: 0.80,
    },
    GrammarDef {
        id: "card-structure",
        name: "Camera Card Structure",
        pattern: r"(?i)DCIM/(\d{3}[A-Z]+)/(.+)",
        segments: &[seg("Card Directory", S::Card), seg("Filename", S::Clip)],
        confidence: 0.75,
    },
    GrammarDef {
        id: "capture-roll",
        name: "Capture Roll Identifier",
        pattern: r"(?i).*([A-Z])(\d{3}).*[_-]?.*\.(?:R3D|mov|mp4|avi)$",
        segments: &[seg("Roll Letter", S::Reel), seg("Roll Number", S::Reel)],
        confidence: 0.88,
    },
    GrammarDef {
        id: "clip-sequence",
        name: "Clip Sequence in Roll",
        pattern: r"(?i).*[A-Z]\d{3}.*?(C)(\d{3}).*\.(?:R3D|mov|mp4|avi)$",
        segments: &[seg("Clip Prefix", S::Clip), seg("Clip Number", S::Clip)],
        confidence: 0.92,
    },
    GrammarDef {
        id: "timecode-pattern",
        name: "Timecode Sequence",
        pattern: r"(?i).*(\d{2})(\d{2})(\d{2}).*\.(?:R3D|mov|mp4|avi)$",
        segments: &[seg("Hours", S::Time), seg("Minutes", S::Time), seg("Seconds", S::Time)],
        confidence: 0.85,
    },
    GrammarDef {
        id: "technical-metadata",
        name: "Technical Metadata Pattern",
        pattern: r"(?i).*(ISO)(\d+).*?(\d+)fps.*\.(?:R3D|mov|mp4)$",
        segments: &[
            seg("ISO Prefix", S::Technical),
            seg("ISO Value", S::Technical),
            seg("Frame Rate", S::Technical),
        ],
        confidence: 0.90,
    },
];

static GRAMMARS: LazyLock<Vec<Grammar>> = LazyLock::new(|| {
    GRAMMAR_DEFS
        .iter()
        .filter_map(|def| {
            let pattern = Regex::new(def.pattern).ok()?;
            Some(Grammar {
                id: def.id,
                name: def.name,
                confidence: def.confidence,
                pattern,
                segments: def.segments,
            })
        })
        .collect()
});

/// The grammar table in priority order.
pub fn grammars() -> &'static [Grammar] {
    &GRAMMARS
}

// Context sub-patterns checked alongside the primary grammar
static NAME_CONTEXT_PATTERNS: LazyLock<Vec<(ContextType, Vec<Regex>)>> = LazyLock::new(|| {
    vec![
        (ContextType::Project, text::compile_all(&[
            r"(?i)\b(easter|christmas|wedding|concert|sunday|service)\b",
            r"(?i)\b([a-z]+(?:project|prod|show))\b",
            r"(?i)\b(q[1-4]|quarter[1-4])\b",
            r"(?i)\b(commercial|documentary|narrative|corporate)\b",
        ])),
        (ContextType::Camera, text::compile_all(&[
            r"(?i)\b(cam[a-z]?|camera[a-z]?)\b",
            r"(?i)\b([a-z]\d{3})\b",
            r"(?i)\b(wide|close|medium|tight|master|establishing)\b",
            r"(?i)\b(red|arri|canon|sony|blackmagic)\b",
            r"(?i)\b(helium|monstro|komodo|venice|fx[369])\b",
        ])),
        (ContextType::CaptureRoll, text::compile_all(&[
            r"\b([A-Z])(\d{3})\b",
            r"(?i)\b(roll|reel|card)[-_]?([A-Z]?\d+)\b",
            r"\b([A-Z])\d{3}[-_][A-Z]\d{3}\b",
            r"(?i)\b(mag|magazine)[-_]?(\d+)\b",
        ])),
        (ContextType::ClipSequence, text::compile_all(&[
            r"\b[A-Z]\d{3}[-_](C)(\d{3})\b",
            r"(?i)\b(clip|take|shot)[-_]?(\d{3,4})\b",
            r"\b(C)(\d{3})[-_]",
            r"[-_](\d{3,4})(?:\.|$)",
        ])),
        (ContextType::Format, text::compile_all(&[
            r"(?i)\b(r3d|braw|arriraw|cdng|prores|dnxh[rd]|h26[45])\b",
            r"(?i)\b(8k|6k|4k|2k|hd|uhd|cinema4k)\b",
            r"(?i)\b(24p|25p|30p|50p|60p|120p|240p)\b",
            r"(?i)\b(\d+fps)\b",
            r"(?i)\b(log|rec709|rec2020|srgb|dci-p3)\b",
            r"(?i)\b(iso\d+|f\d+\.?\d*|t\d+\.?\d*)\b",
        ])),
        (ContextType::Status, text::compile_all(&[
            r"(?i)\b(final|approved|ready|draft|wip|review)\b",
            r"(?i)\b(raw|edited|color|mixed|mastered|graded)\b",
            r"(?i)\b(v\d+|version\d+|_v\d+|rev\d+)\b",
            r"(?i)\b(offline|online|conform|finish)\b",
        ])),
        (ContextType::Location, text::compile_all(&[
            r"(?i)\b(sanctuary|lobby|stage|exterior|interior)\b",
            r"(?i)\b(room\d+|studio[a-z]?|stage[a-z]?)\b",
            r"(?i)\b(backstage|balcony|floor|booth)\b",
            r"(?i)\b(location|loc)[-_]?(\d+|[a-z]+)\b",
        ])),
        (ContextType::Technical, text::compile_all(&[
            r"(?i)\b(\d+fps|\d+p|4k|hd|uhd)\b",
            r"(?i)\b(\d+bit|\d+khz|stereo|mono)\b",
            r"(?i)\b(prores|h264|raw|log)\b",
            r"(?i)\b(lut|gamma|colorspace)\b",
            r"(?i)\b(handheld|steadicam|tripod|dolly|crane)\b",
        ])),
        (ContextType::Temporal, text::compile_all(&[
            r"\b(\d{4}[-_]\d{2}[-_]\d{2})\b",
            r"\b(\d{2}:\d{2}:\d{2})\b",
            r"(?i)\b(morning|afternoon|evening|night)\b",
            r"(?i)\b(rehearsal|soundcheck|performance|setup)\b",
        ])),
    ]
});

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ParsedSegment {
    pub name: String,
    #[serde(rename = "type")]
    pub kind: SegmentType,
    pub value: String,
    /// Capture group index in the grammar (1-based).
    pub position: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContextMatch {
    #[serde(rename = "type")]
    pub kind: ContextType,
    pub value: String,
    pub confidence: f64,
}

/// Result of grammar analysis for one name. An unmatched name has no
/// pattern, no segments and zero confidence.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ParsedIdentifier {
    pub pattern_id: Option<String>,
    pub pattern_name: Option<String>,
    pub segments: Vec<ParsedSegment>,
    pub confidence: f64,
    pub additional_contexts: Vec<ContextMatch>,
}

impl ParsedIdentifier {
    pub fn is_match(&self) -> bool {
        self.pattern_id.is_some()
    }

    /// First segment value of the given type.
    pub fn segment(&self, kind: SegmentType) -> Option<&str> {
        self.segments.iter().find(|s| s.kind == kind).map(|s| s.value.as_str())
    }

    /// All segment values of the given type joined in order (e.g. "B" + "002").
    pub fn joined(&self, kind: SegmentType) -> Option<String> {
        let parts: Vec<&str> = self
            .segments
            .iter()
            .filter(|s| s.kind == kind)
            .map(|s| s.value.as_str())
            .collect();
        if parts.is_empty() {
            None
        } else {
            Some(parts.concat())
        }
    }
}

/// Parse a file name (or card-relative path) against the grammar table.
pub fn parse_filename(name: &str) -> ParsedIdentifier {
    let mut result = ParsedIdentifier::default();

    for grammar in grammars() {
        let Some(caps) = grammar.pattern.captures(name) else {
            continue;
        };
        result.pattern_id = Some(grammar.id.to_string());
        result.pattern_name = Some(grammar.name.to_string());
        result.confidence = grammar.confidence;
        for (index, descriptor) in grammar.segments.iter().enumerate() {
            let value = text::group(&caps, index + 1);
            if !value.is_empty() {
                result.segments.push(ParsedSegment {
                    name: descriptor.name.to_string(),
                    kind: descriptor.kind,
                    value: value.to_string(),
                    position: index + 1,
                });
            }
        }
        break;
    }

    result.additional_contexts = find_name_contexts(name);
    result
}

fn find_name_contexts(name: &str) -> Vec<ContextMatch> {
    let mut found: Vec<ContextMatch> = Vec::new();
    let mut seen = HashSet::new();

    for (kind, patterns) in NAME_CONTEXT_PATTERNS.iter() {
        for re in patterns {
            let Some(caps) = re.captures(name) else {
                continue;
            };
            let Some(whole) = caps.get(0) else {
                continue;
            };
            let value = caps.get(1).map(|m| m.as_str()).unwrap_or(whole.as_str()).trim();
            if is_noise(value) {
                continue;
            }
            let confidence = context_confidence(ANALYZER_CONTEXT_CONFIDENCE, name, whole.as_str());
            if confidence < CONTEXT_MIN_CONFIDENCE {
                continue;
            }
            if seen.insert((*kind, value.to_lowercase())) {
                found.push(ContextMatch {
                    kind: *kind,
                    value: value.to_string(),
                    confidence,
                });
            }
        }
    }

    found
}

/// True for values too weak to be a label: under two chars, all digits,
/// or a stop word.
pub fn is_noise(value: &str) -> bool {
    let lower = value.to_lowercase();
    value.chars().count() < 2
        || value.chars().all(|c| c.is_ascii_digit())
        || CONTEXT_SKIP_TERMS.contains(&lower.as_str())
}

/// Confidence of a context sub-pattern hit within `text`.
///
/// Starts at `base`, then +0.2 when the match is the whole text, +0.1 per
/// occurrence (at most +0.3), and +0.1 when the match sits in the last 30%
/// of the text. Capped at 1.0.
pub fn context_confidence(base: f64, text: &str, matched: &str) -> f64 {
    if matched.is_empty() {
        return base.min(1.0);
    }
    let mut confidence = base;

    if matched == text {
        confidence += 0.2;
    }

    let haystack = text.to_lowercase();
    let needle = matched.to_lowercase();
    let occurrences = haystack.matches(needle.as_str()).count();
    confidence += (occurrences as f64 * 0.1).min(0.3);

    if let Some(position) = haystack.find(needle.as_str()) {
        if position as f64 > haystack.len() as f64 * 0.7 {
            confidence += 0.1;
        }
    }

    confidence.min(1.0)
}

// ----- Path segments -----

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SegmentInference {
    pub context_type: ContextType,
    pub value: String,
    pub confidence: f64,
    pub reasoning: Vec<String>,
}

static ROLL_SEGMENT: LazyRegex = LazyLock::new(|| Regex::new(r"[A-Z]\d{3}").ok());
static CLIP_ID: LazyRegex = LazyLock::new(|| Regex::new(r"(?i)C\d{3}").ok());
static TECHNICAL_PARAMS: LazyRegex = LazyLock::new(|| Regex::new(r"(?i)\d+fps|iso\d+|f\d+\.?\d*").ok());
const FORMAT_TERMS: [&str; 7] = ["r3d", "braw", "prores", "4k", "8k", "log", "rec709"];

/// Infer what a single folder or name segment stands for. `siblings` are
/// the names of files that share the segment's folder.
pub fn parse_path_segment(segment: &str, siblings: &[&str]) -> SegmentInference {
    let mut reasoning = Vec::new();
    let mut value = segment.to_string();
    let mut context_type = ContextType::Project;
    let mut confidence: f64 = 0.5;

    for (kind, patterns) in NAME_CONTEXT_PATTERNS.iter() {
        for re in patterns {
            let Some(caps) = re.captures(segment) else {
                continue;
            };
            reasoning.push(format!("Matches {} pattern: {}", kind.as_str(), re.as_str()));

            let captured = caps.get(1).or_else(|| caps.get(0)).map(|m| m.as_str()).unwrap_or("");
            let mut pattern_confidence = 0.7;
            if siblings.len() > 10 {
                pattern_confidence += 0.1;
            }
            if caps.get(1).is_some_and(|m| m.as_str().len() > 2) {
                pattern_confidence += 0.1;
            }
            if pattern_confidence > confidence {
                confidence = pattern_confidence;
                context_type = *kind;
                value = captured.to_string();
            }
        }
    }

    if text::is_match(&ROLL_SEGMENT, segment) {
        let roll_files: Vec<&&str> = siblings.iter().filter(|name| name.contains(segment)).collect();
        if roll_files.len() > 5 {
            context_type = ContextType::CaptureRoll;
            confidence = 0.85;
            reasoning.push(format!("Strong capture roll pattern with {} files", roll_files.len()));

            let clip_count = roll_files.iter().filter(|name| text::is_match(&CLIP_ID, name)).count();
            if clip_count > 0 {
                confidence = 0.92;
                reasoning.push(format!("Contains {} sequential clips", clip_count));
            }
        }
    }

    let lower = segment.to_lowercase();
    if FORMAT_TERMS.iter().any(|term| lower.contains(term)) {
        context_type = ContextType::Format;
        confidence = 0.88;
        reasoning.push("Contains format-specific terminology".to_string());
    }

    if text::is_match(&TECHNICAL_PARAMS, segment) {
        context_type = ContextType::Technical;
        confidence = 0.90;
        reasoning.push("Contains technical shooting parameters".to_string());
    }

    SegmentInference {
        context_type,
        value,
        confidence: confidence.min(0.95),
        reasoning,
    }
}

// ----- Folder paths -----

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FolderSegmentType {
    Date,
    Camera,
    Project,
    Roll,
    Media,
    Folder,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FolderSegment {
    pub name: String,
    #[serde(rename = "type")]
    pub kind: FolderSegmentType,
    pub confidence: f64,
    pub level: usize,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FolderAnalysis {
    pub segments: Vec<FolderSegment>,
    pub project_context: Option<String>,
    pub shoot_date: Option<String>,
}

static FOLDER_RULES: LazyLock<Vec<(FolderSegmentType, f64, Regex)>> = LazyLock::new(|| {
    [
        (FolderSegmentType::Date, 0.9, r"\d{4}[-_]\d{2}[-_]\d{2}"),
        (FolderSegmentType::Camera, 0.8, r"(?i)cam|camera"),
        (FolderSegmentType::Project, 0.85, r"(?i)project|prod|show"),
        (FolderSegmentType::Roll, 0.8, r"(?i)roll|reel|card"),
        (FolderSegmentType::Media, 0.7, r"(?i)DCIM|clips?|footage"),
    ]
    .into_iter()
    .filter_map(|(kind, confidence, pattern)| Some((kind, confidence, Regex::new(pattern).ok()?)))
    .collect()
});

/// Label each folder in a `/`-separated path.
pub fn analyze_folder_path(path: &str) -> FolderAnalysis {
    let mut analysis = FolderAnalysis::default();

    for (level, segment) in text::segments(path).into_iter().enumerate() {
        let (kind, confidence) = FOLDER_RULES
            .iter()
            .find(|(_, _, re)| re.is_match(segment))
            .map(|(kind, confidence, _)| (*kind, *confidence))
            .unwrap_or((FolderSegmentType::Folder, 0.5));

        match kind {
            FolderSegmentType::Date => analysis.shoot_date = Some(segment.to_string()),
            FolderSegmentType::Project => analysis.project_context = Some(segment.to_string()),
            _ => {}
        }

        analysis.segments.push(FolderSegment {
            name: segment.to_string(),
            kind,
            confidence,
            level,
        });
    }

    analysis
}

// ----- Capture rolls -----

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CaptureRollGroup {
    pub roll_id: String,
    pub files: Vec<String>,
    /// Clip id (C001, C002...) -> file paths
    pub clips: BTreeMap<String, Vec<String>>,
}

pub const UNKNOWN_ROLL: &str = "unknown";

static ROLL_TOKEN: LazyRegex = LazyLock::new(|| Regex::new(r"[A-Z]\d{3}").ok());
static ROLL_CLIP: LazyRegex = LazyLock::new(|| Regex::new(r"(?i)[A-Z]\d{3}[-_]?(C)(\d{3})").ok());

/// Bucket files by the capture roll named in their file name.
pub fn group_by_capture_roll(files: &[FileRecord]) -> BTreeMap<String, CaptureRollGroup> {
    let mut rolls: BTreeMap<String, CaptureRollGroup> = BTreeMap::new();

    for file in files.iter().filter(|f| f.is_file()) {
        let roll_id = capture_roll_of(&file.name).unwrap_or_else(|| UNKNOWN_ROLL.to_string());
        let roll = rolls.entry(roll_id.clone()).or_insert_with(|| CaptureRollGroup {
            roll_id,
            ..Default::default()
        });
        roll.files.push(file.path.clone());

        if let Some(caps) = text::captures(&ROLL_CLIP, &file.name) {
            let clip_id = format!("{}{}", text::group(&caps, 1).to_uppercase(), text::group(&caps, 2));
            roll.clips.entry(clip_id).or_default().push(file.path.clone());
        }
    }

    rolls
}

/// Roll id from a RED grammar's reel segments, falling back to the first
/// `A001`-style token in the name.
pub fn capture_roll_of(name: &str) -> Option<String> {
    if let Some(red) = validate_red_name(name) {
        return Some(red.reel.to_uppercase());
    }
    ROLL_TOKEN
        .as_ref()
        .and_then(|re| re.find(name))
        .map(|m| m.as_str().to_string())
}

// ----- RED names -----

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RedClipName {
    pub pattern_id: String,
    pub reel: String,
    pub camera: String,
    /// Shoot date (standard) or timecode (extended)
    pub stamp: String,
    pub clip: String,
}

/// Check a name against the two RED grammars.
pub fn validate_red_name(name: &str) -> Option<RedClipName> {
    let parsed = parse_filename(name);
    let pattern_id = parsed.pattern_id.clone()?;
    if pattern_id != "red-standard" && pattern_id != "red-extended" {
        return None;
    }
    let stamp = parsed
        .segment(SegmentType::Date)
        .or_else(|| parsed.segment(SegmentType::Time))?
        .to_string();
    Some(RedClipName {
        reel: parsed.joined(SegmentType::Reel)?,
        camera: parsed.joined(SegmentType::Camera)?,
        clip: parsed.segment(SegmentType::Clip)?.to_string(),
        stamp,
        pattern_id,
    })
}

#[cfg(test)]
mod tests;

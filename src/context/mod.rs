// Context detector
// Tags files with production labels (project, status, category, format,
// technical, temporal, semantic) and derives observations from which label
// types show up together.

use std::collections::{BTreeSet, HashMap};
use std::sync::LazyLock;

use chrono::{DateTime, Utc};
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::constants::{CONTEXT_BASE_CONFIDENCE, CONTEXT_MAX_TAGS, CONTEXT_MIN_CONFIDENCE};
use crate::error::Result;
use crate::naming::{context_confidence, is_noise, ContextType};
use crate::scan::FileRecord;
use crate::text::{self, LazyRegex};

static CONTEXT_PATTERNS: LazyLock<Vec<(ContextType, Vec<Regex>)>> = LazyLock::new(|| {
    vec![
        (ContextType::Project, text::compile_all(&[
            r"(?i)(\w+)_service|(\w+)_project|(\w+)_event",
            r"(?i)\b(easter|christmas|wedding|concert|sunday)\b",
            r"(?i)\b(q[1-4]|quarter_[1-4]|fy\d{4})\b",
        ])),
        (ContextType::Status, text::compile_all(&[
            r"(?i)\b(final|approved|ready|draft|wip|review)\b",
            r"(?i)\b(mixed|mastered|edited|raw|unprocessed)\b",
            r"(?i)\b(published|archived|delivered|pending)\b",
        ])),
        (ContextType::Category, text::compile_all(&[
            r"(?i)\b(vocal|lead|backing|harmony|choir)\b",
            r"(?i)\b(instruments|drums|bass|guitar|piano|keys)\b",
            r"(?i)\b(wide|close|medium|detail|establishing)\b",
            r"(?i)\b(interior|exterior|stage|sanctuary|lobby)\b",
        ])),
        (ContextType::Format, text::compile_all(&[
            r"(?i)\b(stereo|mono|5\.1|surround)\b",
            r"(?i)\b(4k|hd|uhd|1080p|720p)\b",
            r"(?i)\b(raw|jpeg|tiff|png|r3d|mov|mp4)\b",
        ])),
        (ContextType::Technical, text::compile_all(&[
            r"(?i)\b(\d+hz|\d+khz|48khz|44\.1khz)\b",
            r"(?i)\b(\d+bit|16bit|24bit|32bit)\b",
            r"(?i)\b(\d+fps|23\.98|24|25|29\.97|30|50|59\.94|60)\b",
            r"(?i)\b(canon|sony|red|arri|blackmagic)\b",
        ])),
        (ContextType::Temporal, text::compile_all(&[
            r"(?i)\b(\d{4}[-_]\d{2}[-_]\d{2})\b",
            r"(?i)\b(morning|afternoon|evening|night)\b",
            r"(?i)\b(pre|post|during|after|before)\b",
        ])),
        (ContextType::Semantic, text::compile_all(&[
            r"(?i)\b(people|crowd|congregation|audience)\b",
            r"(?i)\b(worship|prayer|sermon|music|song)\b",
            r"(?i)\b(celebration|ceremony|ritual|service)\b",
        ])),
    ]
});

static WORD_SPLIT: LazyRegex = LazyLock::new(|| Regex::new(r"[\s_\-./]+").ok());

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DetectedContext {
    pub id: String,
    pub name: String,
    #[serde(rename = "type")]
    pub kind: ContextType,
    pub confidence: f64,
    /// Full paths of the files carrying this context.
    pub files: Vec<String>,
    pub pattern: String,
    pub description: String,
    pub hierarchy: Vec<String>,
    pub tags: Vec<String>,
    pub cross_references: Vec<String>,
    pub first_seen: DateTime<Utc>,
}

impl DetectedContext {
    pub fn key(&self) -> String {
        context_key(self.kind, &self.name)
    }

    /// Fold another sighting of the same context into this one.
    fn absorb(&mut self, other: &DetectedContext) {
        for file in &other.files {
            if !self.files.contains(file) {
                self.files.push(file.clone());
            }
        }
        self.confidence = self.confidence.max(other.confidence);
        union_into(&mut self.tags, &other.tags);
        union_into(&mut self.cross_references, &other.cross_references);
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContextObservation {
    pub id: String,
    pub title: String,
    pub description: String,
    /// Key of the context the observation is about.
    pub context: String,
    pub related_contexts: Vec<String>,
    pub suggested_actions: Vec<String>,
    pub confidence: f64,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FileContextProfile {
    pub path: String,
    pub contexts: Vec<String>,
    pub primary_context: Option<String>,
    pub tags: Vec<String>,
    pub hierarchy: Vec<String>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct ContextExport<'a> {
    contexts: &'a [DetectedContext],
    observations: &'a [ContextObservation],
}

/// Discovered contexts for one session. Every key `type:lowercased name`
/// appears once.
#[derive(Debug, Default)]
pub struct ContextDetector {
    contexts: Vec<DetectedContext>,
    index: HashMap<String, usize>,
    observations: Vec<ContextObservation>,
    profiles: HashMap<String, FileContextProfile>,
}

fn context_key(kind: ContextType, name: &str) -> String {
    format!("{}:{}", kind.as_str(), name.to_lowercase())
}

fn union_into(target: &mut Vec<String>, extra: &[String]) {
    for item in extra {
        if !target.contains(item) {
            target.push(item.clone());
        }
    }
}

impl ContextDetector {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn contexts(&self) -> &[DetectedContext] {
        &self.contexts
    }

    pub fn observations(&self) -> &[ContextObservation] {
        &self.observations
    }

    /// Analyze a batch and merge it into the session. Returns the batch's
    /// contexts, deduplicated within the batch.
    pub fn analyze_files(&mut self, files: &[FileRecord]) -> Vec<DetectedContext> {
        let mut batch: Vec<DetectedContext> = Vec::new();
        let mut batch_index: HashMap<String, usize> = HashMap::new();

        for file in files.iter().filter(|f| f.is_file()) {
            let found = analyze_file(file);

            self.profiles.insert(
                file.path.clone(),
                FileContextProfile {
                    path: file.path.clone(),
                    contexts: found.iter().map(DetectedContext::key).collect(),
                    primary_context: found.first().map(DetectedContext::key),
                    tags: file_tags(file),
                    hierarchy: std::iter::once("Root")
                        .chain(text::segments(&file.path))
                        .map(str::to_string)
                        .collect(),
                },
            );

            for context in found {
                let key = context.key();
                match batch_index.get(&key) {
                    Some(&i) => batch[i].absorb(&context),
                    None => {
                        batch_index.insert(key, batch.len());
                        batch.push(context);
                    }
                }
            }
        }

        for context in &batch {
            let key = context.key();
            match self.index.get(&key) {
                Some(&i) => self.contexts[i].absorb(context),
                None => {
                    self.index.insert(key, self.contexts.len());
                    self.contexts.push(context.clone());
                }
            }
        }

        log::info!(
            "Context pass over {} records: {} contexts in batch, {} in session",
            files.len(),
            batch.len(),
            self.contexts.len()
        );
        batch
    }

    /// Apply the combination rules to the session's contexts. Returns the
    /// observations that were not already recorded.
    pub fn generate_observations(&mut self) -> Vec<ContextObservation> {
        let mut fresh = Vec::new();
        for candidate in combination_rules(&self.contexts) {
            let known = self
                .observations
                .iter()
                .any(|o| o.title == candidate.title && o.context == candidate.context);
            if !known {
                fresh.push(candidate);
            }
        }
        self.observations.extend(fresh.iter().cloned());
        fresh
    }

    pub fn contexts_by_type(&self, kind: ContextType) -> Vec<&DetectedContext> {
        self.contexts.iter().filter(|c| c.kind == kind).collect()
    }

    /// Contexts with at least one file under `folder`.
    pub fn contexts_for_folder(&self, folder: &str) -> Vec<&DetectedContext> {
        self.contexts
            .iter()
            .filter(|c| c.files.iter().any(|f| f.starts_with(folder)))
            .collect()
    }

    pub fn file_profile(&self, path: &str) -> Option<&FileContextProfile> {
        self.profiles.get(path)
    }

    pub fn export_contexts(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(&ContextExport {
            contexts: &self.contexts,
            observations: &self.observations,
        })?)
    }

    pub fn clear(&mut self) {
        *self = Self::default();
    }
}

/// Contexts of one file. A name found by an earlier pattern is not
/// reported again under a later one.
pub fn analyze_file(file: &FileRecord) -> Vec<DetectedContext> {
    let haystack = file.path.to_lowercase();
    let now = Utc::now();
    let mut found: Vec<DetectedContext> = Vec::new();

    for (kind, patterns) in CONTEXT_PATTERNS.iter() {
        for re in patterns {
            let Some(caps) = re.captures(&haystack) else {
                continue;
            };
            let Some(whole) = caps.get(0) else {
                continue;
            };
            let name = caps
                .iter()
                .skip(1)
                .flatten()
                .next()
                .map(|m| m.as_str())
                .unwrap_or(whole.as_str())
                .trim();

            if is_noise(name) || found.iter().any(|c| c.name.eq_ignore_ascii_case(name)) {
                continue;
            }

            let confidence = context_confidence(CONTEXT_BASE_CONFIDENCE, &haystack, whole.as_str());
            if confidence < CONTEXT_MIN_CONFIDENCE {
                continue;
            }

            found.push(DetectedContext {
                id: context_key(*kind, name),
                name: name.to_string(),
                kind: *kind,
                confidence,
                files: vec![file.path.clone()],
                pattern: re.as_str().to_string(),
                description: describe(*kind, name),
                hierarchy: hierarchy(file, *kind, name),
                tags: neighbour_tags(&haystack, name),
                cross_references: Vec::new(),
                first_seen: now,
            });
        }
    }

    let names: Vec<String> = found.iter().map(|c| c.name.clone()).collect();
    for context in found.iter_mut() {
        context.cross_references = names.iter().filter(|n| **n != context.name).cloned().collect();
    }

    found
}

fn describe(kind: ContextType, name: &str) -> String {
    match kind {
        ContextType::Project => format!("Project identifier: {}", name),
        ContextType::Status => format!("Production status: {}", name),
        ContextType::Category => format!("Content category: {}", name),
        ContextType::Format => format!("Media format: {}", name),
        ContextType::Temporal => format!("Time reference: {}", name),
        ContextType::Semantic => format!("Content theme: {}", name),
        ContextType::Technical => format!("Technical specification: {}", name),
        other => format!("{}: {}", other.as_str(), name),
    }
}

fn hierarchy(file: &FileRecord, kind: ContextType, name: &str) -> Vec<String> {
    let root = match kind {
        ContextType::Project => Some("Projects"),
        ContextType::Status => Some("Production Pipeline"),
        ContextType::Category => Some("Content Categories"),
        _ => None,
    };
    root.into_iter()
        .chain(text::segments(file.dir()))
        .chain(std::iter::once(name))
        .map(str::to_string)
        .collect()
}

fn words(haystack: &str) -> Vec<&str> {
    match WORD_SPLIT.as_ref() {
        Some(split) => split.split(haystack).filter(|w| !w.is_empty()).collect(),
        None => vec![haystack],
    }
}

/// The context name plus words within two positions of its first sighting.
fn neighbour_tags(haystack: &str, name: &str) -> Vec<String> {
    let mut tags = vec![name.to_string()];
    let words = words(haystack);
    let needle = name.to_lowercase();

    if let Some(at) = words.iter().position(|w| w.contains(needle.as_str())) {
        let start = at.saturating_sub(2);
        let end = (at + 2).min(words.len() - 1);
        for word in &words[start..=end] {
            if word.chars().count() > 2 && !tags.iter().any(|t| t == word) {
                tags.push(word.to_string());
            }
        }
    }

    tags.truncate(CONTEXT_MAX_TAGS);
    tags
}

fn file_tags(file: &FileRecord) -> Vec<String> {
    let haystack = file.path.to_lowercase();
    let mut seen: BTreeSet<&str> = BTreeSet::new();
    words(&haystack)
        .into_iter()
        .filter(|w| w.chars().count() > 2 && !w.chars().all(|c| c.is_ascii_digit()))
        .filter(|w| seen.insert(*w))
        .take(10)
        .map(str::to_string)
        .collect()
}

struct Rule {
    primary: ContextType,
    related: ContextType,
    confidence: f64,
    actions: [&'static str; 3],
}

const RULES: [Rule; 3] = [
    Rule {
        primary: ContextType::Project,
        related: ContextType::Status,
        confidence: 0.85,
        actions: [
            "Create production timeline view",
            "Set up approval workflow",
            "Configure status-based filters",
        ],
    },
    Rule {
        primary: ContextType::Format,
        related: ContextType::Technical,
        confidence: 0.75,
        actions: [
            "Create technical specification views",
            "Set up quality control rules",
            "Generate format compatibility matrix",
        ],
    },
    Rule {
        primary: ContextType::Semantic,
        related: ContextType::Category,
        confidence: 0.70,
        actions: [
            "Create thematic content views",
            "Set up content type hierarchies",
            "Configure semantic search filters",
        ],
    },
];

fn combination_rules(contexts: &[DetectedContext]) -> Vec<ContextObservation> {
    let now = Utc::now();
    let mut observations = Vec::new();

    for rule in &RULES {
        let primaries: Vec<&DetectedContext> = contexts.iter().filter(|c| c.kind == rule.primary).collect();
        let related: Vec<&DetectedContext> = contexts.iter().filter(|c| c.kind == rule.related).collect();
        let Some(primary) = primaries.first() else {
            continue;
        };
        if related.is_empty() {
            continue;
        }

        let (title, description) = match rule.primary {
            ContextType::Project => (
                format!("{} Production Pipeline", primary.name),
                format!("Detected {} production stages for {} project", related.len(), primary.name),
            ),
            ContextType::Format => (
                "Technical Format Standards".to_string(),
                format!("Consistent technical specs across {} format types", primaries.len()),
            ),
            _ => (
                "Content Thematic Structure".to_string(),
                format!("Identified {} content themes across {} categories", primaries.len(), related.len()),
            ),
        };

        observations.push(ContextObservation {
            id: format!("obs-{}-{}", rule.primary.as_str(), primary.key()),
            title,
            description,
            context: primary.key(),
            related_contexts: related.iter().map(|c| c.key()).collect(),
            suggested_actions: rule.actions.iter().map(|a| a.to_string()).collect(),
            confidence: rule.confidence,
            created_at: now,
        });
    }

    observations
}

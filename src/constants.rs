// ReelMap Constants
// Thresholds and tables shared by the grouping and relationship stages.

pub const APP_NAME: &str = "reelmap";
pub const APP_QUALIFIER: &str = "io";
pub const APP_ORGANIZATION: &str = "reelmap";

// Paths
pub const PATH_SEPARATOR: char = '/';
pub const CONFIG_FILENAME: &str = "scoring.json";
pub const STORE_FILENAME: &str = "reelmap.db";

// Hashing
pub const HASH_CHUNK_SIZE: usize = 1_048_576; // 1MB
pub const DEFAULT_MHL_ALGORITHM: &str = "sha256";
pub const MHL_VERSION: &str = "1.1";
pub const MHL_GENERATOR: &str = "ReelMap";

// File classes
pub const ASSET_EXTENSIONS: [&str; 8] = ["mp4", "mov", "avi", "mkv", "mxf", "r3d", "braw", "rdc"];
pub const RED_SIDECAR_EXTENSIONS: [&str; 3] = ["rdc", "rmd", "rdm"];
pub const SONY_CLIP_EXTENSIONS: [&str; 3] = ["mxf", "mp4", "mov"];
pub const CANON_CLIP_EXTENSIONS: [&str; 3] = ["mxf", "mp4", "mov"];
pub const CANON_SIDECAR_EXTENSIONS: [&str; 3] = ["xml", "cif", "cpf"];

// Asset id prefixes (the RED one marks an already-complete metaclip)
pub const RED_METACLIP_PREFIX: &str = "red_metaclip:";
pub const BRAW_PREFIX: &str = "braw:";
pub const SONY_PREFIX: &str = "sony:";
pub const CANON_PREFIX: &str = "canon:";
pub const STANDARD_PREFIX: &str = "std:";

// Relationship engine defaults (see config::ScoringConfig)
pub const NAME_SIMILARITY_THRESHOLD: f64 = 0.2;
pub const RED_NAME_SIMILARITY_THRESHOLD: f64 = 0.7;
pub const PATH_PROXIMITY_THRESHOLD: f64 = 0.5;
pub const DURATION_MATCH_THRESHOLD: f64 = 0.8;
pub const SIZE_RATIO_THRESHOLD: f64 = 0.3;
pub const TEMPORAL_WINDOW_HOURS: f64 = 24.0;
pub const MIN_EVIDENCE: usize = 1;
pub const RED_MIN_EVIDENCE: usize = 3;
pub const MIN_CONFIDENCE: f64 = 0.4;
pub const RED_MIN_CONFIDENCE: f64 = 0.8;
pub const JACCARD_WEIGHT: f64 = 0.6;
pub const EDIT_DISTANCE_WEIGHT: f64 = 0.4;
pub const SUFFIX_PAIR_SCORE: f64 = 0.95;
pub const MIN_SHARED_PATH_PARTS: usize = 2;
pub const PROXY_RATIOS: [f64; 5] = [0.1, 0.2, 0.25, 0.3, 0.5];

// Collapse
pub const COLLAPSE_EDGE_THRESHOLD: f64 = 0.5;
pub const BASE_REFERENCE_CONFIDENCE: f64 = 1.0;

// Classification vocab
pub const PROXY_INDICATORS: [&str; 9] = ["proxy", "prx", "low", "offline", "edit", "preview", "thumb", "h264", "mp4"];
pub const MASTER_INDICATORS: [&str; 8] = ["master", "source", "original", "online", "full", "hires", "raw", "uncompressed"];
pub const PROXY_SUFFIXES: [&str; 9] = ["_proxy", "_prx", "_low", "_offline", "_edit", "_preview", "_thumb", "_h264", "_mp4"];
pub const MASTER_SUFFIXES: [&str; 6] = ["_master", "_source", "_original", "_online", "_full", "_hires"];
pub const PROXY_EXTENSIONS: [&str; 4] = ["mp4", "mov", "avi", "h264"];
pub const MASTER_EXTENSIONS: [&str; 5] = ["r3d", "braw", "mxf", "dpx", "exr"];

// Context detection
pub const CONTEXT_BASE_CONFIDENCE: f64 = 0.5;
pub const ANALYZER_CONTEXT_CONFIDENCE: f64 = 0.7;
pub const CONTEXT_MIN_CONFIDENCE: f64 = 0.3;
pub const CONTEXT_MAX_TAGS: usize = 5;
pub const CONTEXT_SKIP_TERMS: [&str; 29] = [
    "a", "an", "the", "and", "or", "but", "in", "on", "at", "to", "for", "of", "with", "by",
    "from", "up", "about", "into", "through", "during", "before", "after", "above", "below",
    "between", "among", "since", "without", "near",
];

// Representations
pub const PROXY_SIZE_LIMIT_BYTES: u64 = 512 * 1024 * 1024; // 0.5GB
pub const RECENT_COLLECTION_LIMIT: usize = 50;

// Hierarchy labels
pub const RED_LABEL_CONFIDENCE: f64 = 0.95;
pub const SHOOT_LABEL_CONFIDENCE: f64 = 0.9;
pub const PATH_LABEL_CONFIDENCE: f64 = 0.7;
pub const FOLDER_LABEL_CONFIDENCE: f64 = 0.6;
pub const UNKNOWN_SHOOT: &str = "unknown";

// Store
pub const MANUAL_TAG_CONFIDENCE: f64 = 1.0;
pub const RULE_TAG_CONFIDENCE: f64 = 0.8;
pub const DEFAULT_TAG_CATEGORIES: [(&str, &str); 10] = [
    ("Capture Roll", "Media card or reel identifiers"),
    ("Camera", "Camera units and models"),
    ("Format", "Media formats and codecs"),
    ("Resolution", "Video resolution categories"),
    ("Frame Rate", "Frames per second"),
    ("Project", "Project or production names"),
    ("Date", "Shoot dates and timelines"),
    ("Status", "Production workflow status"),
    ("Location", "Shooting locations"),
    ("Scene", "Scene and shot identifiers"),
];

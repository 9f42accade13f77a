// ReelMap CLI binary

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};

use reelmap_lib::assets::{group_assets, Asset};
use reelmap_lib::config::{self, ScoringConfig};
use reelmap_lib::constants::DEFAULT_MHL_ALGORITHM;
use reelmap_lib::folders::generate_scan_plan;
use reelmap_lib::hash::{hash_file, HashAlgorithm};
use reelmap_lib::hierarchy::HierarchyNode;
use reelmap_lib::metadata::FilenameMetadataExtractor;
use reelmap_lib::mhl::{self, MhlOptions};
use reelmap_lib::naming::{parse_filename, validate_red_name};
use reelmap_lib::pipeline::Session;
use reelmap_lib::scan::{disk_path, scan_directory};
use reelmap_lib::store::{self, NewTagRule, RulePatternType};

#[derive(Parser)]
#[command(name = "reelmap")]
#[command(about = "ReelMap - Rebuild the production hierarchy of camera footage", long_about = None)]
#[command(version)]
struct Cli {
    /// Log debug output
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Scoring config file (defaults to the user config directory)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Scan a directory and report what it holds
    Scan {
        /// Directory to scan
        dir: PathBuf,
    },

    /// Run the full grouping and relationship pipeline
    Analyze {
        /// Directory to analyze
        dir: PathBuf,
        /// Print the session summary as JSON
        #[arg(long)]
        json: bool,
    },

    /// Parse a single file name against the naming grammars
    Parse {
        /// File name to parse
        name: String,
    },

    /// Show shoots and the label trees built over the assets
    Hierarchy {
        /// Directory to analyze
        dir: PathBuf,
        /// Print the hierarchy as JSON
        #[arg(long)]
        json: bool,
    },

    /// Show the folder scan plan
    Plan {
        /// Directory to plan
        dir: PathBuf,
    },

    /// Detect contexts and observations from names and paths
    Contexts {
        /// Directory to analyze
        dir: PathBuf,
    },

    /// Media Hash List export and import
    Mhl {
        #[command(subcommand)]
        action: MhlAction,
    },

    /// Manage tagging rules
    Rules {
        /// Store database (defaults to the user data directory)
        #[arg(long, global = true)]
        db: Option<PathBuf>,
        #[command(subcommand)]
        action: RulesAction,
    },

    /// List the tags attached to a file
    Tags {
        /// File id (the scanned file's full path)
        file_id: String,
        /// Store database (defaults to the user data directory)
        #[arg(long)]
        db: Option<PathBuf>,
    },
}

#[derive(Subcommand)]
enum MhlAction {
    /// Hash every asset file under a directory and write an MHL
    Export {
        /// Directory to hash
        dir: PathBuf,
        /// Hash algorithm
        #[arg(long, default_value = DEFAULT_MHL_ALGORITHM)]
        algorithm: String,
        /// Output file (defaults to <dir>/<dir name>.mhl)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Read an MHL and optionally verify it against a directory
    Import {
        /// MHL file
        file: PathBuf,
        /// Directory to verify against
        #[arg(long)]
        verify: Option<PathBuf>,
    },
}

#[derive(Clone, Copy, ValueEnum)]
enum RuleKind {
    Path,
    Filename,
    Content,
}

impl From<RuleKind> for RulePatternType {
    fn from(kind: RuleKind) -> Self {
        match kind {
            RuleKind::Path => RulePatternType::Path,
            RuleKind::Filename => RulePatternType::Filename,
            RuleKind::Content => RulePatternType::Content,
        }
    }
}

#[derive(Subcommand)]
enum RulesAction {
    /// List all rules
    List,

    /// Add a rule
    Add {
        /// Rule name
        name: String,
        /// Regular expression (matched case-insensitively)
        pattern: String,
        /// Tag category name
        #[arg(long)]
        category: String,
        /// Tag template, `{1}` inserts the first capture group
        #[arg(long)]
        template: String,
        /// What the pattern is tested against
        #[arg(long, value_enum, default_value = "filename")]
        kind: RuleKind,
        /// Higher runs first
        #[arg(long, default_value = "0")]
        priority: i64,
    },

    /// Apply active rules to every file under a directory
    Apply {
        /// Directory to tag
        dir: PathBuf,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let default_level = if cli.verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_level)).init();

    let config_path = cli.config.clone();
    match cli.command {
        Commands::Scan { dir } => cmd_scan(&dir),
        Commands::Analyze { dir, json } => cmd_analyze(&dir, json, config_path),
        Commands::Parse { name } => cmd_parse(&name),
        Commands::Hierarchy { dir, json } => cmd_hierarchy(&dir, json),
        Commands::Plan { dir } => cmd_plan(&dir),
        Commands::Contexts { dir } => cmd_contexts(&dir, config_path),
        Commands::Mhl { action } => match action {
            MhlAction::Export { dir, algorithm, output } => cmd_mhl_export(&dir, &algorithm, output),
            MhlAction::Import { file, verify } => cmd_mhl_import(&file, verify),
        },
        Commands::Rules { db, action } => cmd_rules(db, action),
        Commands::Tags { file_id, db } => cmd_tags(&file_id, db),
    }
}

fn load_config(path: Option<PathBuf>) -> Result<ScoringConfig> {
    let path = match path {
        Some(p) => p,
        None => ScoringConfig::default_path()?,
    };
    ScoringConfig::load_or_default(&path).with_context(|| format!("Failed to load config from {}", path.display()))
}

fn open_tag_store(db: Option<PathBuf>) -> Result<rusqlite::Connection> {
    let path = match db {
        Some(p) => p,
        None => config::default_store_path()?,
    };
    let conn = store::open_store(&path).with_context(|| format!("Failed to open store at {}", path.display()))?;
    store::initialize_defaults(&conn)?;
    Ok(conn)
}

/// Record path of a scanned root, i.e. `/<dir name>`.
fn root_record_path(dir: &Path) -> String {
    let name = dir
        .file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_else(|| "root".to_string());
    format!("/{}", name)
}

/// Rewrite record paths relative to `base`, the way MHL entries are stored.
fn relative_assets(assets: Vec<Asset>, base: &str) -> Vec<Asset> {
    assets
        .into_iter()
        .map(|mut asset| {
            for file in std::iter::once(&mut asset.primary_file).chain(asset.related_files.iter_mut()) {
                if let Some(rest) = file.path.strip_prefix(base) {
                    file.path = rest.to_string();
                }
            }
            asset
        })
        .collect()
}

fn cmd_scan(dir: &Path) -> Result<()> {
    let records = scan_directory(dir)?;
    let files = records.iter().filter(|r| r.is_file()).count();
    let dirs = records.len() - files;
    let (format, assets) = group_assets(&records);

    println!("Scanned {}", dir.display());
    println!("  Files:       {}", files);
    println!("  Directories: {}", dirs);
    println!("  Assets:      {}", assets.len());
    println!("  Format:      {}", format);

    Ok(())
}

fn cmd_analyze(dir: &Path, json: bool, config_path: Option<PathBuf>) -> Result<()> {
    let config = load_config(config_path)?;
    let records = scan_directory(dir)?;

    let mut session = Session::new(config);
    session.ingest(records);
    let summary = session.run(&FilenameMetadataExtractor);

    if json {
        println!("{}", serde_json::to_string_pretty(&summary)?);
        return Ok(());
    }

    println!(
        "{} assets ({}), {} relationships, {} groups",
        summary.asset_count,
        summary.format.map(|f| f.to_string()).unwrap_or_else(|| "-".to_string()),
        summary.relationship_count,
        summary.groups.len()
    );
    println!("{}", "-".repeat(80));

    for group in &summary.groups {
        println!("{}  ({:.0}%)", group.base_name, group.confidence * 100.0);
        println!("  canonical: {}", group.canonical_path);
        for variant in &group.variants {
            let kind = variant
                .relationship
                .map(|r| r.to_string())
                .unwrap_or_else(|| "related".to_string());
            println!("  {:<10} {}", kind, variant.path);
        }
    }

    Ok(())
}

fn cmd_parse(name: &str) -> Result<()> {
    let parsed = parse_filename(name);

    match (&parsed.pattern_id, &parsed.pattern_name) {
        (Some(id), Some(pattern)) => println!("{} matches {} ({}), confidence {:.2}", name, pattern, id, parsed.confidence),
        _ => println!("{} matches no naming grammar", name),
    }
    for segment in &parsed.segments {
        println!("  {:<12} {:<10} {}", segment.name, format!("{:?}", segment.kind), segment.value);
    }
    for context in &parsed.additional_contexts {
        println!("  context: {:?}", context);
    }
    if let Some(red) = validate_red_name(name) {
        println!(
            "  RED clip: reel {} camera {} clip {} ({})",
            red.reel, red.camera, red.clip, red.stamp
        );
    }

    Ok(())
}

fn cmd_hierarchy(dir: &Path, json: bool) -> Result<()> {
    let mut session = Session::new(ScoringConfig::default());
    session.ingest(scan_directory(dir)?);
    session.group();
    let hierarchy = session.hierarchy();

    if json {
        println!("{}", serde_json::to_string_pretty(&hierarchy)?);
        return Ok(());
    }

    println!("{} shoots", hierarchy.shoots.len());
    for shoot in &hierarchy.shoots {
        println!("  {:<24} {:>4} assets  {:>4} RED", shoot.name, shoot.assets.len(), shoot.red_clip_count);
    }
    for tree in &hierarchy.hierarchies {
        println!("{} ({} labels)", tree.name, tree.labels.len());
        for node in &tree.structure {
            print_node(node);
        }
    }

    Ok(())
}

fn print_node(node: &HierarchyNode) {
    let indent = "  ".repeat(node.depth + 1);
    if node.assets.is_empty() {
        println!("{}{}", indent, node.value);
    } else {
        println!("{}{}  ({} assets)", indent, node.value, node.assets.len());
    }
    for child in &node.children {
        print_node(child);
    }
}

fn cmd_plan(dir: &Path) -> Result<()> {
    let records = scan_directory(dir)?;
    let plan = generate_scan_plan(&records, &[]);

    println!(
        "{} folders: {} media, {} skipped, {} unknown",
        plan.stats.total, plan.stats.media, plan.stats.cache, plan.stats.unknown
    );
    println!("Scan:");
    for folder in &plan.scan_queue {
        let c = &folder.classification;
        println!(
            "  [{:>2}] {:<8} {:.2} {}",
            c.priority,
            format!("{:?}", c.kind),
            c.confidence,
            folder.path
        );
    }
    println!("Skip:");
    for folder in &plan.skip_queue {
        println!("  {} ({})", folder.path, folder.classification.reasoning.join("; "));
    }

    Ok(())
}

fn cmd_contexts(dir: &Path, config_path: Option<PathBuf>) -> Result<()> {
    let records = scan_directory(dir)?;
    let mut session = Session::new(load_config(config_path)?);
    session.ingest(records);
    let mut contexts = session.detect_contexts();
    contexts.sort_by(|a, b| b.confidence.total_cmp(&a.confidence));

    println!("{} contexts", contexts.len());
    for context in &contexts {
        println!(
            "  {:<10} {:<24} {:.2}  {} files",
            context.kind.as_str(),
            context.name,
            context.confidence,
            context.files.len()
        );
    }

    let observations = session.detector().observations();
    if !observations.is_empty() {
        println!("Observations:");
        for observation in observations {
            println!("  {} - {}", observation.title, observation.description);
            for action in &observation.suggested_actions {
                println!("      * {}", action);
            }
        }
    }

    Ok(())
}

fn cmd_mhl_export(dir: &Path, algorithm: &str, output: Option<PathBuf>) -> Result<()> {
    let algorithm = HashAlgorithm::parse(algorithm)?;
    let records = scan_directory(dir)?;
    let (_, assets) = group_assets(&records);

    let base = root_record_path(dir);
    let entries = mhl::generate_mhl(&assets, &base, |file| hash_file(&disk_path(dir, &file.path), algorithm));
    let xml = mhl::export_mhl(&entries, &assets, &MhlOptions::default());

    let output = output.unwrap_or_else(|| {
        let name = dir
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_else(|| "hashlist".to_string());
        dir.join(format!("{}.mhl", name))
    });
    std::fs::write(&output, xml).with_context(|| format!("Failed to write {}", output.display()))?;

    println!("Wrote {} ({} files, {} assets)", output.display(), entries.len(), assets.len());
    Ok(())
}

fn cmd_mhl_import(file: &Path, verify: Option<PathBuf>) -> Result<()> {
    let xml = std::fs::read_to_string(file).with_context(|| format!("Failed to read {}", file.display()))?;
    let doc = mhl::import_mhl(&xml)?;

    println!(
        "{}: {} files, {} bytes, {} media entries (by {})",
        file.display(),
        doc.files.len(),
        doc.total_size(),
        doc.media.len(),
        doc.creator.name
    );

    let Some(root) = verify else {
        return Ok(());
    };

    let records = scan_directory(&root)?;
    let (_, assets) = group_assets(&records);
    let assets = relative_assets(assets, &root_record_path(&root));
    let matches = mhl::match_existing_files(&doc, &assets);
    println!(
        "Assets: {} matched, {} unmatched, {} only in MHL",
        matches.matched.len(),
        matches.unmatched.len(),
        matches.new_from_mhl.len()
    );

    let report = mhl::verify_directory(&doc, &root, HashAlgorithm::Sha256);
    println!("Verified:   {}", report.verified);
    println!("Mismatched: {}", report.mismatched.len());
    for path in &report.mismatched {
        println!("  {}", path);
    }
    println!("Missing:    {}", report.missing.len());
    for path in &report.missing {
        println!("  {}", path);
    }
    if !report.substituted.is_empty() {
        println!("Unverifiable (algorithm unavailable): {}", report.substituted.len());
    }

    if !report.is_clean() {
        anyhow::bail!("MHL verification failed");
    }
    Ok(())
}

fn cmd_rules(db: Option<PathBuf>, action: RulesAction) -> Result<()> {
    let conn = open_tag_store(db)?;

    match action {
        RulesAction::List => {
            let rules = store::list_rules(&conn, false)?;
            if rules.is_empty() {
                println!("No rules.");
                return Ok(());
            }
            println!("{:<36}  {:>4}  {:<8}  {:<6}  NAME / PATTERN", "ID", "PRI", "KIND", "ACTIVE");
            for rule in rules {
                println!(
                    "{:<36}  {:>4}  {:<8}  {:<6}  {} / {} -> {}",
                    rule.id,
                    rule.priority,
                    rule.pattern_type.as_str(),
                    rule.active,
                    rule.name,
                    rule.pattern,
                    rule.tag_template
                );
            }
        }
        RulesAction::Add { name, pattern, category, template, kind, priority } => {
            let category = match store::find_category(&conn, &category)? {
                Some(c) => c,
                None => store::create_category(&conn, &category, None, None)?,
            };
            let rule = store::create_rule(
                &conn,
                &NewTagRule {
                    name,
                    description: None,
                    pattern,
                    pattern_type: kind.into(),
                    category_id: category.id,
                    tag_template: template,
                    priority,
                },
            )?;
            println!("Added rule {} ({})", rule.name, rule.id);
        }
        RulesAction::Apply { dir } => {
            let records = scan_directory(&dir)?;
            let created = store::apply_rules_to_files(&conn, &records)?;
            println!("Tagged {} file associations", created);
        }
    }

    Ok(())
}

fn cmd_tags(file_id: &str, db: Option<PathBuf>) -> Result<()> {
    let conn = open_tag_store(db)?;
    let tags = store::tags_for_file(&conn, file_id)?;

    if tags.is_empty() {
        println!("No tags for {}", file_id);
        return Ok(());
    }
    for tag in tags {
        println!(
            "  {:<14} {:<24} {:<8} {:.2}",
            tag.category,
            tag.tag.value,
            tag.source.as_str(),
            tag.confidence
        );
    }

    Ok(())
}

// Tag/rule store
// SQLite-backed categories, tags, tagging rules and file associations.
// File ids are the scanned file's full path.

pub mod migrations;
pub mod schema;

use std::path::Path;
use std::sync::LazyLock;

use regex::{Captures, RegexBuilder};
use rusqlite::Connection;

use crate::error::Result;
use crate::scan::FileRecord;
use crate::text::{self, LazyRegex};

pub use schema::*;

static TEMPLATE_GROUP: LazyRegex = LazyLock::new(|| regex::Regex::new(r"\{(\d+)\}").ok());

fn configure(conn: &Connection) -> Result<()> {
    conn.execute_batch("PRAGMA foreign_keys = ON;")?;
    migrations::run_migrations(conn)
}

/// Open or create a store at the given path
pub fn open_store(path: &Path) -> Result<Connection> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }

    let conn = Connection::open(path)?;
    conn.execute_batch("PRAGMA journal_mode = WAL;")?;
    configure(&conn)?;
    Ok(conn)
}

pub fn open_memory_store() -> Result<Connection> {
    let conn = Connection::open_in_memory()?;
    configure(&conn)?;
    Ok(conn)
}

/// Replace `{n}` with capture group n; absent groups become empty.
pub fn expand_template(template: &str, caps: &Captures) -> String {
    let Some(re) = TEMPLATE_GROUP.as_ref() else {
        return template.to_string();
    };
    re.replace_all(template, |m: &Captures| {
        text::group(m, 1)
            .parse::<usize>()
            .ok()
            .and_then(|n| caps.get(n))
            .map(|g| g.as_str().to_string())
            .unwrap_or_default()
    })
    .into_owned()
}

/// Run every active rule over `records` and tag matching files.
/// Returns the number of new file/tag associations.
pub fn apply_rules_to_files(conn: &Connection, records: &[FileRecord]) -> Result<usize> {
    let rules = list_rules(conn, true)?;
    let mut created = 0;

    for rule in &rules {
        let re = match RegexBuilder::new(&rule.pattern).case_insensitive(true).build() {
            Ok(re) => re,
            Err(e) => {
                log::warn!("Skipping rule '{}': invalid pattern {}: {}", rule.name, rule.pattern, e);
                continue;
            }
        };

        for record in records.iter().filter(|r| r.is_file()) {
            let subject = match rule.pattern_type {
                RulePatternType::Path => record.path.as_str(),
                _ => record.name.as_str(),
            };
            let Some(caps) = re.captures(subject) else {
                continue;
            };

            let value = expand_template(&rule.tag_template, &caps);
            let value = value.trim();
            if value.is_empty() {
                continue;
            }

            let tag = find_or_create_tag(conn, &rule.category_id, value)?;
            if has_file_tag(conn, &record.path, &tag.id)? {
                continue;
            }
            tag_file(conn, &record.path, &tag.id, TagSource::Rule, Some(&rule.id))?;
            created += 1;
        }
    }

    log::info!("Applied {} rules, {} new file tags", rules.len(), created);
    Ok(created)
}

#[cfg(test)]
mod tests;

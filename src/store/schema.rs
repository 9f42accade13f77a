// Store schema types and query helpers

use chrono::Utc;
use rusqlite::types::{FromSql, FromSqlError, FromSqlResult, ToSql, ToSqlOutput, ValueRef};
use rusqlite::{params, Connection, OptionalExtension, Row};
use serde::{Deserialize, Serialize};

use crate::constants::{DEFAULT_TAG_CATEGORIES, MANUAL_TAG_CONFIDENCE, RULE_TAG_CONFIDENCE};
use crate::error::{ReelMapError, Result};

fn new_id() -> String {
    uuid::Uuid::new_v4().to_string()
}

fn now() -> String {
    Utc::now().to_rfc3339()
}

/// Enum stored as one of a fixed set of TEXT values.
macro_rules! text_enum {
    ($name:ident { $($variant:ident => $text:literal),+ $(,)? }) => {
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
        #[serde(rename_all = "lowercase")]
        pub enum $name {
            $($variant),+
        }

        impl $name {
            pub fn as_str(&self) -> &'static str {
                match self {
                    $($name::$variant => $text),+
                }
            }

            pub fn parse(s: &str) -> Option<Self> {
                match s.to_lowercase().as_str() {
                    $($text => Some($name::$variant),)+
                    _ => None,
                }
            }
        }

        impl ToSql for $name {
            fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
                Ok(ToSqlOutput::from(self.as_str()))
            }
        }

        impl FromSql for $name {
            fn column_result(value: ValueRef<'_>) -> FromSqlResult<Self> {
                let s = value.as_str()?;
                $name::parse(s).ok_or_else(|| {
                    FromSqlError::Other(format!("unknown {} '{}'", stringify!($name), s).into())
                })
            }
        }
    };
}

text_enum!(MappingType {
    Folder => "folder",
    Pattern => "pattern",
    Filename => "filename",
});

text_enum!(RulePatternType {
    Path => "path",
    Filename => "filename",
    Content => "content",
});

text_enum!(TagSource {
    Manual => "manual",
    Rule => "rule",
    Context => "context",
});

impl TagSource {
    pub fn confidence(&self) -> f64 {
        match self {
            TagSource::Manual => MANUAL_TAG_CONFIDENCE,
            _ => RULE_TAG_CONFIDENCE,
        }
    }
}

// ----- Categories -----

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TagCategory {
    pub id: String,
    pub name: String,
    pub description: Option<String>,
    pub parent_id: Option<String>,
    pub created_at: String,
    pub updated_at: String,
}

const CATEGORY_COLUMNS: &str = "id, name, description, parent_id, created_at, updated_at";

fn category_from_row(row: &Row) -> rusqlite::Result<TagCategory> {
    Ok(TagCategory {
        id: row.get(0)?,
        name: row.get(1)?,
        description: row.get(2)?,
        parent_id: row.get(3)?,
        created_at: row.get(4)?,
        updated_at: row.get(5)?,
    })
}

pub fn create_category(
    conn: &Connection,
    name: &str,
    description: Option<&str>,
    parent_id: Option<&str>,
) -> Result<TagCategory> {
    let id = new_id();
    let ts = now();
    conn.execute(
        "INSERT INTO tag_categories (id, name, description, parent_id, created_at, updated_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?5)",
        params![id, name, description, parent_id, ts],
    )?;
    Ok(TagCategory {
        id,
        name: name.to_string(),
        description: description.map(str::to_string),
        parent_id: parent_id.map(str::to_string),
        created_at: ts.clone(),
        updated_at: ts,
    })
}

pub fn list_categories(conn: &Connection) -> Result<Vec<TagCategory>> {
    let mut stmt = conn.prepare(&format!("SELECT {} FROM tag_categories ORDER BY name", CATEGORY_COLUMNS))?;
    let categories = stmt
        .query_map([], category_from_row)?
        .collect::<std::result::Result<Vec<_>, _>>()?;
    Ok(categories)
}

pub fn find_category(conn: &Connection, name: &str) -> Result<Option<TagCategory>> {
    let result = conn
        .query_row(
            &format!("SELECT {} FROM tag_categories WHERE name = ?1", CATEGORY_COLUMNS),
            params![name],
            category_from_row,
        )
        .optional()?;
    Ok(result)
}

/// Insert the default categories into an empty store. Returns how many were added.
pub fn initialize_defaults(conn: &Connection) -> Result<usize> {
    let count: i64 = conn.query_row("SELECT COUNT(*) FROM tag_categories", [], |row| row.get(0))?;
    if count > 0 {
        return Ok(0);
    }

    for (name, description) in DEFAULT_TAG_CATEGORIES {
        create_category(conn, name, Some(description), None)?;
    }
    log::info!("Created {} default tag categories", DEFAULT_TAG_CATEGORIES.len());
    Ok(DEFAULT_TAG_CATEGORIES.len())
}

// ----- Tags -----

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Tag {
    pub id: String,
    pub category_id: String,
    pub name: String,
    pub value: String,
    pub created_at: String,
}

const TAG_COLUMNS: &str = "id, category_id, name, value, created_at";

fn tag_from_row(row: &Row) -> rusqlite::Result<Tag> {
    Ok(Tag {
        id: row.get(0)?,
        category_id: row.get(1)?,
        name: row.get(2)?,
        value: row.get(3)?,
        created_at: row.get(4)?,
    })
}

pub fn create_tag(conn: &Connection, category_id: &str, name: &str, value: &str) -> Result<Tag> {
    let id = new_id();
    let ts = now();
    conn.execute(
        "INSERT INTO tags (id, category_id, name, value, created_at) VALUES (?1, ?2, ?3, ?4, ?5)",
        params![id, category_id, name, value, ts],
    )?;
    Ok(Tag {
        id,
        category_id: category_id.to_string(),
        name: name.to_string(),
        value: value.to_string(),
        created_at: ts,
    })
}

pub fn find_tag(conn: &Connection, category_id: &str, value: &str) -> Result<Option<Tag>> {
    let result = conn
        .query_row(
            &format!("SELECT {} FROM tags WHERE category_id = ?1 AND value = ?2", TAG_COLUMNS),
            params![category_id, value],
            tag_from_row,
        )
        .optional()?;
    Ok(result)
}

pub fn find_or_create_tag(conn: &Connection, category_id: &str, value: &str) -> Result<Tag> {
    match find_tag(conn, category_id, value)? {
        Some(tag) => Ok(tag),
        None => create_tag(conn, category_id, value, value),
    }
}

/// Tags of one category, or every tag.
pub fn list_tags(conn: &Connection, category_id: Option<&str>) -> Result<Vec<Tag>> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {} FROM tags WHERE ?1 IS NULL OR category_id = ?1 ORDER BY value",
        TAG_COLUMNS
    ))?;
    let tags = stmt
        .query_map(params![category_id], tag_from_row)?
        .collect::<std::result::Result<Vec<_>, _>>()?;
    Ok(tags)
}

// ----- Rules -----

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TagRule {
    pub id: String,
    pub name: String,
    pub description: Option<String>,
    pub pattern: String,
    pub pattern_type: RulePatternType,
    pub category_id: String,
    /// Tag value with `{n}` placeholders for capture groups.
    pub tag_template: String,
    pub priority: i64,
    pub active: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewTagRule {
    pub name: String,
    pub description: Option<String>,
    pub pattern: String,
    pub pattern_type: RulePatternType,
    pub category_id: String,
    pub tag_template: String,
    pub priority: i64,
}

const RULE_COLUMNS: &str = "id, name, description, pattern, pattern_type, category_id, tag_template, priority, active";

fn rule_from_row(row: &Row) -> rusqlite::Result<TagRule> {
    Ok(TagRule {
        id: row.get(0)?,
        name: row.get(1)?,
        description: row.get(2)?,
        pattern: row.get(3)?,
        pattern_type: row.get(4)?,
        category_id: row.get(5)?,
        tag_template: row.get(6)?,
        priority: row.get(7)?,
        active: row.get(8)?,
    })
}

/// Store a rule after checking that its pattern compiles.
pub fn create_rule(conn: &Connection, rule: &NewTagRule) -> Result<TagRule> {
    if let Err(e) = regex::Regex::new(&rule.pattern) {
        return Err(ReelMapError::InvalidPattern {
            pattern: rule.pattern.clone(),
            reason: e.to_string(),
        });
    }

    let id = new_id();
    let ts = now();
    conn.execute(
        "INSERT INTO tag_rules (id, name, description, pattern, pattern_type, category_id, tag_template, priority, active, created_at, updated_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, 1, ?9, ?9)",
        params![
            id,
            rule.name,
            rule.description,
            rule.pattern,
            rule.pattern_type,
            rule.category_id,
            rule.tag_template,
            rule.priority,
            ts
        ],
    )?;

    Ok(TagRule {
        id,
        name: rule.name.clone(),
        description: rule.description.clone(),
        pattern: rule.pattern.clone(),
        pattern_type: rule.pattern_type,
        category_id: rule.category_id.clone(),
        tag_template: rule.tag_template.clone(),
        priority: rule.priority,
        active: true,
    })
}

/// Rules ordered by priority, highest first.
pub fn list_rules(conn: &Connection, active_only: bool) -> Result<Vec<TagRule>> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {} FROM tag_rules WHERE active = 1 OR ?1 = 0 ORDER BY priority DESC, created_at, name",
        RULE_COLUMNS
    ))?;
    let rules = stmt
        .query_map(params![active_only], rule_from_row)?
        .collect::<std::result::Result<Vec<_>, _>>()?;
    Ok(rules)
}

pub fn set_rule_active(conn: &Connection, id: &str, active: bool) -> Result<()> {
    let changed = conn.execute(
        "UPDATE tag_rules SET active = ?1, updated_at = ?2 WHERE id = ?3",
        params![active, now(), id],
    )?;
    if changed == 0 {
        return Err(ReelMapError::NotFound(format!("rule {}", id)));
    }
    Ok(())
}

pub fn delete_rule(conn: &Connection, id: &str) -> Result<()> {
    let changed = conn.execute("DELETE FROM tag_rules WHERE id = ?1", params![id])?;
    if changed == 0 {
        return Err(ReelMapError::NotFound(format!("rule {}", id)));
    }
    Ok(())
}

// ----- Context mappings -----

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContextMapping {
    pub id: String,
    pub path: String,
    pub context_type: MappingType,
    pub context_value: String,
    pub category_id: Option<String>,
    pub tag_id: Option<String>,
    pub confidence: f64,
}

pub fn add_context_mapping(
    conn: &Connection,
    path: &str,
    context_type: MappingType,
    context_value: &str,
    category_id: Option<&str>,
    tag_id: Option<&str>,
    confidence: f64,
) -> Result<ContextMapping> {
    let id = new_id();
    conn.execute(
        "INSERT INTO context_mappings (id, path, context_type, context_value, category_id, tag_id, confidence, created_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
        params![id, path, context_type, context_value, category_id, tag_id, confidence, now()],
    )?;
    Ok(ContextMapping {
        id,
        path: path.to_string(),
        context_type,
        context_value: context_value.to_string(),
        category_id: category_id.map(str::to_string),
        tag_id: tag_id.map(str::to_string),
        confidence,
    })
}

/// Mappings whose path is a prefix of `path`, or all mappings.
pub fn list_context_mappings(conn: &Connection, path: Option<&str>) -> Result<Vec<ContextMapping>> {
    let mut stmt = conn.prepare(
        "SELECT id, path, context_type, context_value, category_id, tag_id, confidence
         FROM context_mappings
         WHERE ?1 IS NULL OR substr(?1, 1, length(path)) = path
         ORDER BY path, context_value",
    )?;
    let mappings = stmt
        .query_map(params![path], |row| {
            Ok(ContextMapping {
                id: row.get(0)?,
                path: row.get(1)?,
                context_type: row.get(2)?,
                context_value: row.get(3)?,
                category_id: row.get(4)?,
                tag_id: row.get(5)?,
                confidence: row.get(6)?,
            })
        })?
        .collect::<std::result::Result<Vec<_>, _>>()?;
    Ok(mappings)
}

// ----- File tags -----

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FileTag {
    pub file_id: String,
    pub tag: Tag,
    pub category: String,
    pub source: TagSource,
    pub rule_id: Option<String>,
    pub confidence: f64,
}

/// Attach a tag to a file, replacing any earlier association with that tag.
pub fn tag_file(
    conn: &Connection,
    file_id: &str,
    tag_id: &str,
    source: TagSource,
    rule_id: Option<&str>,
) -> Result<()> {
    conn.execute(
        "INSERT OR REPLACE INTO file_tags (file_id, tag_id, source, rule_id, confidence, created_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
        params![file_id, tag_id, source, rule_id, source.confidence(), now()],
    )?;
    Ok(())
}

/// Returns whether an association was removed.
pub fn untag_file(conn: &Connection, file_id: &str, tag_id: &str) -> Result<bool> {
    let changed = conn.execute(
        "DELETE FROM file_tags WHERE file_id = ?1 AND tag_id = ?2",
        params![file_id, tag_id],
    )?;
    Ok(changed > 0)
}

pub fn has_file_tag(conn: &Connection, file_id: &str, tag_id: &str) -> Result<bool> {
    let count: i64 = conn.query_row(
        "SELECT COUNT(*) FROM file_tags WHERE file_id = ?1 AND tag_id = ?2",
        params![file_id, tag_id],
        |row| row.get(0),
    )?;
    Ok(count > 0)
}

pub fn tags_for_file(conn: &Connection, file_id: &str) -> Result<Vec<FileTag>> {
    let mut stmt = conn.prepare(
        "SELECT t.id, t.category_id, t.name, t.value, t.created_at, c.name, ft.source, ft.rule_id, ft.confidence
         FROM file_tags ft
         JOIN tags t ON ft.tag_id = t.id
         JOIN tag_categories c ON t.category_id = c.id
         WHERE ft.file_id = ?1
         ORDER BY c.name, t.value",
    )?;
    let tags = stmt
        .query_map(params![file_id], |row| {
            Ok(FileTag {
                file_id: file_id.to_string(),
                tag: tag_from_row(row)?,
                category: row.get(5)?,
                source: row.get(6)?,
                rule_id: row.get(7)?,
                confidence: row.get(8)?,
            })
        })?
        .collect::<std::result::Result<Vec<_>, _>>()?;
    Ok(tags)
}

pub fn files_by_tag(conn: &Connection, tag_id: &str) -> Result<Vec<String>> {
    let mut stmt = conn.prepare("SELECT file_id FROM file_tags WHERE tag_id = ?1 ORDER BY file_id")?;
    let files = stmt
        .query_map(params![tag_id], |row| row.get(0))?
        .collect::<std::result::Result<Vec<String>, _>>()?;
    Ok(files)
}

pub fn files_by_category(conn: &Connection, category_id: &str) -> Result<Vec<String>> {
    let mut stmt = conn.prepare(
        "SELECT DISTINCT ft.file_id FROM file_tags ft
         JOIN tags t ON ft.tag_id = t.id
         WHERE t.category_id = ?1
         ORDER BY ft.file_id",
    )?;
    let files = stmt
        .query_map(params![category_id], |row| row.get(0))?
        .collect::<std::result::Result<Vec<String>, _>>()?;
    Ok(files)
}

use super::*;
use crate::error::ReelMapError;
use tempfile::TempDir;

fn setup_test_store() -> Connection {
    let conn = Connection::open_in_memory().unwrap();
    conn.execute_batch("PRAGMA foreign_keys = ON;").unwrap();
    migrations::run_migrations(&conn).unwrap();
    conn
}

fn rule(category_id: &str, pattern: &str, pattern_type: RulePatternType, template: &str, priority: i64) -> NewTagRule {
    NewTagRule {
        name: format!("rule {}", pattern),
        description: None,
        pattern: pattern.to_string(),
        pattern_type,
        category_id: category_id.to_string(),
        tag_template: template.to_string(),
        priority,
    }
}

#[test]
fn test_open_store_on_disk() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("nested").join("reelmap.db");

    let conn = open_store(&path).unwrap();
    assert!(path.exists());
    assert_eq!(initialize_defaults(&conn).unwrap(), 10);
    drop(conn);

    let conn = open_store(&path).unwrap();
    assert_eq!(list_categories(&conn).unwrap().len(), 10);
}

#[test]
fn test_defaults_only_fill_an_empty_store() {
    let conn = setup_test_store();
    assert_eq!(initialize_defaults(&conn).unwrap(), 10);
    assert_eq!(initialize_defaults(&conn).unwrap(), 0);

    let names: Vec<String> = list_categories(&conn).unwrap().into_iter().map(|c| c.name).collect();
    assert!(names.contains(&"Capture Roll".to_string()));
    assert!(names.contains(&"Scene".to_string()));
    assert!(find_category(&conn, "Frame Rate").unwrap().is_some());
}

#[test]
fn test_tags_are_unique_per_category() {
    let conn = setup_test_store();
    let camera = create_category(&conn, "Camera", None, None).unwrap();
    let roll = create_category(&conn, "Capture Roll", Some("cards"), None).unwrap();

    let a = create_tag(&conn, &camera.id, "A Cam", "A").unwrap();
    create_tag(&conn, &roll.id, "A", "A").unwrap();
    assert!(matches!(
        create_tag(&conn, &camera.id, "A again", "A"),
        Err(ReelMapError::Database(_))
    ));

    assert_eq!(find_tag(&conn, &camera.id, "A").unwrap(), Some(a.clone()));
    assert_eq!(find_or_create_tag(&conn, &camera.id, "A").unwrap().id, a.id);
    assert_eq!(list_tags(&conn, Some(&camera.id)).unwrap().len(), 1);
    assert_eq!(list_tags(&conn, None).unwrap().len(), 2);
}

#[test]
fn test_manual_and_rule_confidence() {
    let conn = setup_test_store();
    let status = create_category(&conn, "Status", None, None).unwrap();
    let approved = create_tag(&conn, &status.id, "approved", "approved").unwrap();
    let review = create_tag(&conn, &status.id, "review", "review").unwrap();

    tag_file(&conn, "/Shoot/a.mov", &approved.id, TagSource::Manual, None).unwrap();
    tag_file(&conn, "/Shoot/a.mov", &review.id, TagSource::Context, None).unwrap();

    let tags = tags_for_file(&conn, "/Shoot/a.mov").unwrap();
    assert_eq!(tags.len(), 2);
    assert_eq!(tags[0].tag.value, "approved");
    assert_eq!(tags[0].category, "Status");
    assert_eq!(tags[0].confidence, 1.0);
    assert_eq!(tags[1].source, TagSource::Context);
    assert_eq!(tags[1].confidence, 0.8);

    assert_eq!(files_by_tag(&conn, &approved.id).unwrap(), vec!["/Shoot/a.mov"]);
    assert_eq!(files_by_category(&conn, &status.id).unwrap(), vec!["/Shoot/a.mov"]);

    assert!(untag_file(&conn, "/Shoot/a.mov", &approved.id).unwrap());
    assert!(!untag_file(&conn, "/Shoot/a.mov", &approved.id).unwrap());
    assert_eq!(tags_for_file(&conn, "/Shoot/a.mov").unwrap().len(), 1);
}

#[test]
fn test_rule_lifecycle() {
    let conn = setup_test_store();
    let scene = create_category(&conn, "Scene", None, None).unwrap();

    let low = create_rule(&conn, &rule(&scene.id, "sc(\\d+)", RulePatternType::Filename, "scene {1}", 1)).unwrap();
    let high = create_rule(&conn, &rule(&scene.id, "/day(\\d)/", RulePatternType::Path, "day {1}", 5)).unwrap();

    let rules = list_rules(&conn, false).unwrap();
    assert_eq!(rules[0].id, high.id);
    assert_eq!(rules[1].id, low.id);

    set_rule_active(&conn, &low.id, false).unwrap();
    assert_eq!(list_rules(&conn, true).unwrap().len(), 1);
    assert_eq!(list_rules(&conn, false).unwrap().len(), 2);

    delete_rule(&conn, &low.id).unwrap();
    assert!(matches!(delete_rule(&conn, &low.id), Err(ReelMapError::NotFound(_))));
    assert!(matches!(set_rule_active(&conn, "nope", true), Err(ReelMapError::NotFound(_))));

    let bad = create_rule(&conn, &rule(&scene.id, "sc(", RulePatternType::Filename, "x", 0));
    assert!(matches!(bad, Err(ReelMapError::InvalidPattern { .. })));
}

#[test]
fn test_apply_rules_tags_matching_files_once() {
    let conn = setup_test_store();
    let scene = create_category(&conn, "Scene", None, None).unwrap();
    let camera = create_category(&conn, "Camera", None, None).unwrap();

    create_rule(&conn, &rule(&scene.id, "SC(\\d+)_T(\\d+)", RulePatternType::Filename, "scene {1} take {2}", 10)).unwrap();
    create_rule(&conn, &rule(&camera.id, "/(a|b)cam/", RulePatternType::Path, "{1}{3}", 5)).unwrap();

    let records = vec![
        FileRecord::directory("/Shoot/ACam"),
        FileRecord::file("/Shoot/ACam/sc01_t02.mov", 10),
        FileRecord::file("/Shoot/BCam/SC01_T03.mov", 10),
        FileRecord::file("/Shoot/Audio/notes.txt", 10),
    ];

    assert_eq!(apply_rules_to_files(&conn, &records).unwrap(), 4);
    assert_eq!(apply_rules_to_files(&conn, &records).unwrap(), 0);

    let tags = tags_for_file(&conn, "/Shoot/ACam/sc01_t02.mov").unwrap();
    let values: Vec<&str> = tags.iter().map(|t| t.tag.value.as_str()).collect();
    assert_eq!(values, vec!["A", "scene 01 take 02"]);
    assert!(tags.iter().all(|t| t.source == TagSource::Rule && t.confidence == 0.8));
    assert!(tags.iter().all(|t| t.rule_id.is_some()));

    assert!(tags_for_file(&conn, "/Shoot/Audio/notes.txt").unwrap().is_empty());
    assert_eq!(list_tags(&conn, Some(&camera.id)).unwrap().len(), 2);
}

#[test]
fn test_invalid_stored_rule_is_skipped() {
    let conn = setup_test_store();
    let scene = create_category(&conn, "Scene", None, None).unwrap();
    conn.execute(
        "INSERT INTO tag_rules (id, name, pattern, pattern_type, category_id, tag_template, priority, active, created_at, updated_at)
         VALUES ('r1', 'broken', 'sc(', 'filename', ?1, 'x', 0, 1, '', '')",
        rusqlite::params![scene.id],
    )
    .unwrap();

    let records = vec![FileRecord::file("/Shoot/sc01.mov", 1)];
    assert_eq!(apply_rules_to_files(&conn, &records).unwrap(), 0);
}

#[test]
fn test_context_mappings_by_prefix() {
    let conn = setup_test_store();
    let project = create_category(&conn, "Project", None, None).unwrap();

    add_context_mapping(&conn, "/Shoot/Easter", MappingType::Folder, "easter", Some(&project.id), None, 0.9).unwrap();
    add_context_mapping(&conn, "/Other", MappingType::Pattern, "other", None, None, 0.5).unwrap();

    let under = list_context_mappings(&conn, Some("/Shoot/Easter/Day1")).unwrap();
    assert_eq!(under.len(), 1);
    assert_eq!(under[0].context_type, MappingType::Folder);
    assert_eq!(under[0].category_id.as_deref(), Some(project.id.as_str()));
    assert_eq!(list_context_mappings(&conn, None).unwrap().len(), 2);
}

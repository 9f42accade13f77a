use super::*;

fn values(parsed: &ParsedIdentifier) -> Vec<(SegmentType, &str)> {
    parsed.segments.iter().map(|s| (s.kind, s.value.as_str())).collect()
}

#[test]
fn test_red_standard_segments() {
    let parsed = parse_filename("B002_A003_20240315_042.R3D");

    assert_eq!(parsed.pattern_id.as_deref(), Some("red-standard"));
    assert_eq!(parsed.confidence, 0.95);
    assert_eq!(
        values(&parsed),
        vec![
            (SegmentType::Reel, "B"),
            (SegmentType::Reel, "002"),
            (SegmentType::Camera, "A"),
            (SegmentType::Camera, "003"),
            (SegmentType::Date, "20240315"),
            (SegmentType::Clip, "042"),
        ]
    );
    let positions: Vec<usize> = parsed.segments.iter().map(|s| s.position).collect();
    assert_eq!(positions, vec![1, 2, 3, 4, 5, 6]);
    assert_eq!(parsed.joined(SegmentType::Reel).as_deref(), Some("B002"));
}

#[test]
fn test_red_extended_grammar() {
    let parsed = parse_filename("A001_B002_123456_0001.R3D");
    assert_eq!(parsed.pattern_id.as_deref(), Some("red-extended"));
    assert_eq!(parsed.segment(SegmentType::Time), Some("123456"));
    assert_eq!(parsed.segment(SegmentType::Clip), Some("0001"));
}

#[test]
fn test_first_matching_grammar_wins() {
    // Both capture-roll and clip-sequence match; capture-roll is listed first
    let parsed = parse_filename("clip_A001_C002.mov");
    assert_eq!(parsed.pattern_id.as_deref(), Some("capture-roll"));
    assert_eq!(parsed.confidence, 0.88);
}

#[test]
fn test_project_scene_take() {
    let parsed = parse_filename("Gala_S12_T3_alt");
    assert_eq!(parsed.pattern_id.as_deref(), Some("project-scene-take"));
    assert_eq!(parsed.segment(SegmentType::Project), Some("Gala"));
    assert_eq!(parsed.segment(SegmentType::Scene), Some("12"));
    assert_eq!(parsed.segment(SegmentType::Take), Some("3"));
}

#[test]
fn test_unmatched_name_is_empty() {
    let parsed = parse_filename("notes.txt");
    assert!(!parsed.is_match());
    assert!(parsed.segments.is_empty());
    assert_eq!(parsed.confidence, 0.0);
}

#[test]
fn test_additional_contexts_alongside_grammar() {
    let parsed = parse_filename("wedding-ceremony-final.mov");
    let contexts: Vec<(ContextType, &str)> = parsed
        .additional_contexts
        .iter()
        .map(|c| (c.kind, c.value.as_str()))
        .collect();

    assert!(contexts.contains(&(ContextType::Project, "wedding")));
    assert!(contexts.contains(&(ContextType::Status, "final")));
    for context in &parsed.additional_contexts {
        assert!(context.confidence >= 0.3 && context.confidence <= 1.0);
    }
}

#[test]
fn test_noise_filter() {
    assert!(is_noise("a"));
    assert!(is_noise("042"));
    assert!(is_noise("The"));
    assert!(!is_noise("wedding"));
}

#[test]
fn test_context_confidence_boosts() {
    // whole-text match plus one occurrence, capped
    assert_eq!(context_confidence(0.7, "final", "final"), 1.0);
    // repeated occurrences cap at +0.3
    assert!((context_confidence(0.5, "raw_raw_raw_raw", "raw") - 0.8).abs() < 1e-9);
    // late position adds 0.1
    assert!((context_confidence(0.5, "xxxxxxxxxx_raw", "raw") - 0.7).abs() < 1e-9);
}

#[test]
fn test_analyze_folder_path() {
    let analysis = analyze_folder_path("/Projects/2024-03-15/CamA/A001_roll/DCIM/Misc");
    let kinds: Vec<FolderSegmentType> = analysis.segments.iter().map(|s| s.kind).collect();

    assert_eq!(
        kinds,
        vec![
            FolderSegmentType::Project,
            FolderSegmentType::Date,
            FolderSegmentType::Camera,
            FolderSegmentType::Roll,
            FolderSegmentType::Media,
            FolderSegmentType::Folder,
        ]
    );
    assert_eq!(analysis.segments[5].level, 5);
    assert_eq!(analysis.segments[5].confidence, 0.5);
    assert_eq!(analysis.project_context.as_deref(), Some("Projects"));
    assert_eq!(analysis.shoot_date.as_deref(), Some("2024-03-15"));
}

#[test]
fn test_parse_path_segment_format_and_technical() {
    let format = parse_path_segment("4K_prores", &[]);
    assert_eq!(format.context_type, ContextType::Format);
    assert_eq!(format.confidence, 0.88);

    let technical = parse_path_segment("24fps", &[]);
    assert_eq!(technical.context_type, ContextType::Technical);
    assert_eq!(technical.confidence, 0.90);
}

#[test]
fn test_parse_path_segment_capture_roll_needs_siblings() {
    let names: Vec<String> = (1..=6).map(|i| format!("A001_C00{}_0001.R3D", i)).collect();
    let siblings: Vec<&str> = names.iter().map(|s| s.as_str()).collect();

    let roll = parse_path_segment("A001", &siblings);
    assert_eq!(roll.context_type, ContextType::CaptureRoll);
    assert_eq!(roll.confidence, 0.92);
    assert!(!roll.reasoning.is_empty());

    let few = parse_path_segment("A001", &siblings[..3]);
    assert_eq!(few.context_type, ContextType::Camera);
    assert!(few.confidence <= 0.95);
}

#[test]
fn test_group_by_capture_roll() {
    let files = vec![
        FileRecord::file("/Shoot/A001/A001_C001_20240315_000.R3D", 10),
        FileRecord::file("/Shoot/A001/A001_C002_20240315_000.R3D", 10),
        FileRecord::file("/Shoot/B002/B002_C001_x.mov", 10),
        FileRecord::file("/Shoot/notes.txt", 1),
        FileRecord::directory("/Shoot/A001"),
    ];

    let rolls = group_by_capture_roll(&files);

    assert_eq!(rolls.len(), 3);
    let a001 = &rolls["A001"];
    assert_eq!(a001.files.len(), 2);
    assert_eq!(a001.clips.keys().cloned().collect::<Vec<_>>(), vec!["C001", "C002"]);
    assert_eq!(rolls["B002"].clips.len(), 1);
    assert_eq!(rolls[UNKNOWN_ROLL].files, vec!["/Shoot/notes.txt".to_string()]);
}

#[test]
fn test_validate_red_name() {
    let red = validate_red_name("A001_C001_20240315_000.R3D").unwrap();
    assert_eq!(red.reel, "A001");
    assert_eq!(red.camera, "C001");
    assert_eq!(red.stamp, "20240315");
    assert_eq!(red.clip, "000");

    assert!(validate_red_name("clip_master.mov").is_none());
}

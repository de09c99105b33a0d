use std::fs;

use step_script::{discover_steps_file, load, PhraseNormalizer, RunOptions, ScriptError, StepSource};

#[test]
fn loads_a_step_file_from_disk() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("steps.txt");
    fs::write(
        &path,
        "# Phase 1\nPhase 1: Smoke\n1. Load homepage\n2. Verify HTTP status is 200\n3) Check broken images\n",
    )
    .unwrap();

    let source = StepSource::from_path(&path).unwrap();
    let lines = load(&source, &PhraseNormalizer::default(), &RunOptions::default());
    let texts: Vec<_> = lines.iter().map(|l| l.text.as_str()).collect();
    assert_eq!(
        texts,
        vec!["Phase 1: Smoke", "open homepage", "check status 200", "check broken-images"]
    );
}

#[test]
fn discovery_prefers_steps_txt() {
    let dir = tempfile::tempdir().unwrap();
    assert!(matches!(discover_steps_file(dir.path()), Err(ScriptError::NotFound(_))));

    fs::write(dir.path().join("deep_website_testing_steps.txt"), "open homepage\n").unwrap();
    assert!(discover_steps_file(dir.path()).unwrap().ends_with("deep_website_testing_steps.txt"));

    fs::write(dir.path().join("steps.txt"), "open homepage\n").unwrap();
    assert!(discover_steps_file(dir.path()).unwrap().ends_with("steps.txt"));
}

#[test]
fn missing_file_is_a_read_error() {
    let dir = tempfile::tempdir().unwrap();
    let err = StepSource::from_path(dir.path().join("nope.txt")).unwrap_err();
    assert!(matches!(err, ScriptError::Read { .. }));
}

#[test]
fn byte_order_mark_from_editor_is_ignored() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("steps.txt");
    fs::write(&path, "\u{feff}# exported from a Windows editor\r\n1. Load homepage\r\n").unwrap();

    let source = StepSource::from_path(&path).unwrap();
    let lines = load(&source, &PhraseNormalizer::standard(), &RunOptions::default());
    assert_eq!(lines.len(), 1);
    assert_eq!(lines[0].text, "open homepage");
    assert_eq!(lines[0].source_line, 2);
}

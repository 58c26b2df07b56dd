use linedupe::orchestrator::{FileOrchestrator, OrchestratorConfig};
use linedupe::reader::{detect_encoding, ChunkedReader, LineEnding, TextEncoding};
use std::fs;
use tempfile::TempDir;

fn run(path: &std::path::Path, chunk_size: usize) -> linedupe::orchestrator::FileOutcome {
    FileOrchestrator::new(OrchestratorConfig::default().with_chunk_size(chunk_size))
        .unwrap()
        .process_file(path)
        .unwrap()
}

#[test]
fn test_multibyte_characters_across_tiny_chunks() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("utf8.txt");
    fs::write(&path, "Grüße\nこんにちは\ngrüße\nこんにちは\n🦀 crab\n").unwrap();

    let outcome = run(&path, 3);
    assert_eq!(outcome.encoding, TextEncoding::Utf8 { bom: false });
    assert_eq!(outcome.stats.decode_warnings, 0);
    assert_eq!(outcome.stats.duplicates_removed, 2);
    assert_eq!(
        fs::read_to_string(&path).unwrap(),
        "Grüße\nこんにちは\n🦀 crab\n"
    );
}

#[test]
fn test_mixed_line_endings_preserved() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("mixed.txt");
    fs::write(&path, b"a\r\nb\na\nc\r\nb\r\nlast").unwrap();

    run(&path, 2);
    assert_eq!(fs::read(&path).unwrap(), b"a\r\nb\nc\r\nlast");
}

#[test]
fn test_chunk_reader_reports_endings_and_offsets() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("endings.txt");
    fs::write(&path, b"one\r\ntwo\nthree").unwrap();

    let lines: Vec<_> = ChunkedReader::open(&path, 4)
        .unwrap()
        .map(|l| l.unwrap())
        .collect();

    assert_eq!(lines.len(), 3);
    assert_eq!(lines[0].ending, LineEnding::CrLf);
    assert_eq!(lines[1].ending, LineEnding::Lf);
    assert_eq!(lines[2].ending, LineEnding::None);
    assert_eq!(lines[1].offset, 5);
    assert_eq!(lines[2].offset, 9);
    assert_eq!(lines[2].text, "three");
}

#[test]
fn test_bom_file_round_trip() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("bom.txt");
    fs::write(&path, b"\xEF\xBB\xBFkey\nKEY\nvalue\n").unwrap();

    assert_eq!(detect_encoding(&path).unwrap(), TextEncoding::Utf8 { bom: true });
    let outcome = run(&path, 1024);
    assert_eq!(outcome.stats.total_lines, 3);
    assert_eq!(fs::read(&path).unwrap(), b"\xEF\xBB\xBFkey\nvalue\n");
}

#[test]
fn test_latin1_case_folding() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("latin1.txt");
    // "Café", "CAFÉ", "thé" in Latin-1
    fs::write(&path, b"Caf\xE9\nCAF\xC9\nth\xE9\n").unwrap();

    let outcome = run(&path, 1024);
    assert_eq!(outcome.encoding, TextEncoding::Latin1);
    assert_eq!(outcome.stats.duplicates_removed, 1);
    assert_eq!(fs::read(&path).unwrap(), b"Caf\xE9\nth\xE9\n");
}

#[test]
fn test_invalid_utf8_beyond_sniff_window_is_counted() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("late_garbage.txt");
    let mut content = "clean line\n".repeat(7000).into_bytes();
    content.extend_from_slice(b"bad \xFF byte\nbad \xFF byte\n");
    fs::write(&path, &content).unwrap();

    let outcome = FileOrchestrator::new(OrchestratorConfig::default().with_dry_run(true))
        .unwrap()
        .process_file(&path)
        .unwrap();
    assert_eq!(outcome.encoding, TextEncoding::Utf8 { bom: false });
    assert_eq!(outcome.stats.decode_warnings, 2);
    assert_eq!(outcome.stats.unique_lines, 2);
}

use linedupe::dedup::{ComparisonMode, EngineConfig};
use linedupe::orchestrator::{FileError, FileOrchestrator, OrchestratorConfig};
use linedupe::output::{render, ReportFormat};
use linedupe::reader::FileAccessError;
use linedupe::error::ExitCode;
use linedupe::{exit_code_for, expand_paths};
use std::fs;
use std::path::PathBuf;
use tempfile::TempDir;

fn write(dir: &TempDir, name: &str, content: &str) -> PathBuf {
    let path = dir.path().join(name);
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).unwrap();
    }
    fs::write(&path, content).unwrap();
    path
}

fn orchestrator(config: OrchestratorConfig) -> FileOrchestrator {
    FileOrchestrator::new(config).unwrap()
}

/// A handful of files with repeated lines in every mode's sense.
fn corpus(dir: &TempDir) -> Vec<PathBuf> {
    (0..12)
        .map(|i| {
            let mut content = String::new();
            for j in 0..200 {
                let n = (j * 7 + i) % 37;
                match j % 4 {
                    0 => content.push_str(&format!("Entry {n}\n")),
                    1 => content.push_str(&format!("entry {n}\n")),
                    2 => content.push_str(&format!("  ENTRY   {n} \n")),
                    _ => content.push_str(&format!("{n} entry!\n")),
                }
            }
            write(dir, &format!("file_{i:02}.txt"), &content)
        })
        .collect()
}

#[test]
fn test_parallel_matches_sequential() {
    for mode in ComparisonMode::ALL {
        let seq_dir = TempDir::new().unwrap();
        let par_dir = TempDir::new().unwrap();
        let seq_paths = corpus(&seq_dir);
        let par_paths = corpus(&par_dir);

        let engine = EngineConfig::new(mode);
        let sequential = orchestrator(OrchestratorConfig::default().with_engine(engine.clone()))
            .run(&seq_paths);
        let parallel = orchestrator(
            OrchestratorConfig::default()
                .with_engine(engine)
                .with_parallel(true, 4),
        )
        .run(&par_paths);

        assert_eq!(sequential.files_processed(), 12, "mode {mode}");
        assert_eq!(parallel.files_processed(), 12, "mode {mode}");

        for (seq, par) in seq_paths.iter().zip(&par_paths) {
            assert_eq!(
                fs::read(seq).unwrap(),
                fs::read(par).unwrap(),
                "mode {mode}, file {}",
                seq.display()
            );
            let seq_stats = sequential.report_for(seq).unwrap().stats().unwrap();
            let par_stats = parallel.report_for(par).unwrap().stats().unwrap();
            assert!(seq_stats.same_counts(par_stats), "mode {mode}");
        }
    }
}

#[test]
fn test_reports_keep_input_order() {
    let dir = TempDir::new().unwrap();
    let paths = corpus(&dir);
    let mut reversed = paths.clone();
    reversed.reverse();

    let summary = orchestrator(OrchestratorConfig::default().with_parallel(true, 3)).run(&reversed);
    let order: Vec<PathBuf> = summary.reports.iter().map(|r| r.path.clone()).collect();
    assert_eq!(order, reversed);
}

#[test]
fn test_modes_on_one_file() {
    let content = "Hello World\nhello world\nhello   world\nworld hello\nHello, World!\n";
    let cases = [
        (ComparisonMode::CaseSensitive, 5),
        (ComparisonMode::CaseInsensitive, 4),
        (ComparisonMode::WhitespaceInsensitive, 3),
        (ComparisonMode::ContentHash, 3),
        (ComparisonMode::AlphanumericOnly, 2),
    ];

    for (mode, expected_kept) in cases {
        let dir = TempDir::new().unwrap();
        let path = write(&dir, "input.txt", content);
        let config = OrchestratorConfig::default().with_engine(EngineConfig::new(mode));

        let outcome = orchestrator(config).process_file(&path).unwrap();
        assert_eq!(outcome.stats.unique_lines, expected_kept, "mode {mode}");
        assert_eq!(
            fs::read_to_string(&path).unwrap().lines().count() as u64,
            expected_kept,
            "mode {mode}"
        );
    }
}

#[test]
fn test_fuzzy_mode_end_to_end() {
    let dir = TempDir::new().unwrap();
    let path = write(
        &dir,
        "log.txt",
        "connection refused by host alpha\nconnection refused by host alpah\nuser logged in\n",
    );
    let config = OrchestratorConfig::default()
        .with_engine(EngineConfig::new(ComparisonMode::Fuzzy).with_similarity(0.9));

    let outcome = orchestrator(config).process_file(&path).unwrap();
    assert_eq!(outcome.stats.duplicates_removed, 1);
    assert_eq!(
        fs::read_to_string(&path).unwrap(),
        "connection refused by host alpha\nuser logged in\n"
    );
}

#[test]
fn test_exclusion_keeps_every_matching_line() {
    let dir = TempDir::new().unwrap();
    let path = write(&dir, "config.ini", "# section\nkey=1\n# section\nkey=1\nother=2\n");
    let config = OrchestratorConfig::default().with_exclude_pattern("^#");

    let outcome = orchestrator(config).process_file(&path).unwrap();
    assert_eq!(outcome.stats.excluded_lines, 2);
    assert_eq!(outcome.stats.duplicates_removed, 1);
    assert_eq!(
        fs::read_to_string(&path).unwrap(),
        "# section\nkey=1\n# section\nother=2\n"
    );
}

#[test]
fn test_invalid_pattern_rejected_before_any_file_is_touched() {
    let result = FileOrchestrator::new(OrchestratorConfig::default().with_exclude_pattern("(unclosed"));
    assert!(result.is_err());
}

#[test]
fn test_partial_failure_and_exit_code() {
    let dir = TempDir::new().unwrap();
    let good = write(&dir, "good.txt", "a\na\n");
    let missing = dir.path().join("missing.txt");
    let subdir = dir.path().join("subdir");
    fs::create_dir(&subdir).unwrap();

    let summary = orchestrator(OrchestratorConfig::default().with_parallel(true, 2)).run(&[
        good.clone(),
        missing.clone(),
        subdir.clone(),
    ]);

    assert_eq!(summary.files_processed(), 1);
    assert_eq!(summary.files_failed(), 2);
    assert!(matches!(
        summary.report_for(&missing).unwrap().error(),
        Some(FileError::Access(FileAccessError::NotFound(_)))
    ));
    assert!(matches!(
        summary.report_for(&subdir).unwrap().error(),
        Some(FileError::Access(FileAccessError::NotAFile(_)))
    ));
    assert_eq!(fs::read_to_string(&good).unwrap(), "a\n");
    assert_eq!(exit_code_for(&summary), ExitCode::PartialSuccess);
}

#[test]
fn test_dry_run_reports_same_counts_as_real_run() {
    let dir = TempDir::new().unwrap();
    let paths = corpus(&dir);
    let before: Vec<Vec<u8>> = paths.iter().map(|p| fs::read(p).unwrap()).collect();

    let dry = orchestrator(OrchestratorConfig::default().with_dry_run(true)).run(&paths);
    let after_dry: Vec<Vec<u8>> = paths.iter().map(|p| fs::read(p).unwrap()).collect();
    assert_eq!(before, after_dry);

    let real = orchestrator(OrchestratorConfig::default()).run(&paths);
    assert!(dry.totals().same_counts(&real.totals()));
    assert!(dry.dry_run);
}

#[test]
fn test_backup_holds_original_content() {
    let dir = TempDir::new().unwrap();
    let original = "x\ny\nx\n";
    let path = write(&dir, "data.txt", original);

    let outcome = orchestrator(OrchestratorConfig::default().with_backup(true))
        .process_file(&path)
        .unwrap();

    let backup = outcome.backup.unwrap();
    assert_eq!(backup, dir.path().join("data.txt.bak"));
    assert_eq!(fs::read_to_string(&backup).unwrap(), original);
    assert_eq!(fs::read_to_string(&path).unwrap(), "x\ny\n");
}

#[test]
fn test_recursive_expansion_then_run() {
    let dir = TempDir::new().unwrap();
    write(&dir, "b.txt", "1\n1\n");
    write(&dir, "nested/a.txt", "2\n2\n2\n");

    let paths = expand_paths(&[dir.path().to_path_buf()], true);
    assert_eq!(paths.len(), 2);

    let summary = orchestrator(OrchestratorConfig::default()).run(&paths);
    assert_eq!(summary.totals().duplicates_removed, 3);
    assert_eq!(exit_code_for(&summary), ExitCode::Success);
}

#[test]
fn test_json_report_from_real_run() {
    let dir = TempDir::new().unwrap();
    let path = write(&dir, "a.txt", "q\nq\nr\n");
    let summary = orchestrator(OrchestratorConfig::default().with_dry_run(true)).run(&[path]);

    let json = render(&summary, ReportFormat::Json, false).unwrap();
    let value: serde_json::Value = serde_json::from_str(&json).unwrap();
    assert_eq!(value["summary"]["files_processed"], 1);
    assert_eq!(value["summary"]["duplicates_removed"], 1);
    assert_eq!(value["results"][0]["status"], "dry_run");
    assert_eq!(value["results"][0]["unique_lines"], 2);
}

#[test]
fn test_text_report_from_real_run() {
    let dir = TempDir::new().unwrap();
    let path = write(&dir, "a.txt", "q\nq\nr\nr\n");
    let summary = orchestrator(OrchestratorConfig::default()).run(&[path]);

    let text = render(&summary, ReportFormat::Text, false).unwrap();
    assert!(text.contains("=== linedupe results ==="));
    assert!(text.contains("Files processed: 1/1"));
    assert!(text.contains("Duplicates removed: 2"));
    assert!(text.contains("50.00%"));
    assert!(!text.contains('\u{1b}'), "uncolored report contains escapes");
}

use chrono::{TimeZone, Utc};
use std::fs;
use tempfile::tempdir;

use podpulse::metrics::{ErrorKind, MetricSample, SamplingRoundResult, Snapshot};
use podpulse::output::{read_snapshots, FileSink, SinkError, SnapshotSink};

fn snapshot(minute: u32, samples: Vec<MetricSample>) -> Snapshot {
    let at = Utc.with_ymd_and_hms(2024, 5, 1, 12, minute, 0).unwrap();
    Snapshot::new(at, SamplingRoundResult::new(samples))
}

#[test]
fn test_append_writes_one_line_per_snapshot() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("results.txt");
    let mut sink = FileSink::open(&path).unwrap();
    assert_eq!(sink.path(), path.as_path());

    sink.append(&snapshot(0, vec![MetricSample::Value(12.5), MetricSample::Value(3.0)]))
        .unwrap();
    sink.append(&snapshot(
        1,
        vec![MetricSample::Value(13.0), MetricSample::Failed(ErrorKind::Transport)],
    ))
    .unwrap();

    let content = fs::read_to_string(&path).unwrap();
    let lines: Vec<&str> = content.lines().collect();
    assert_eq!(lines.len(), 2);
    assert_eq!(lines[0], "2024-05-01T12:00:00.000Z: [12.5, 3]");
    assert_eq!(lines[1], "2024-05-01T12:01:00.000Z: [13, failed:transport]");
    assert!(content.ends_with('\n'));
}

#[test]
fn test_reopening_appends_instead_of_truncating() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("results.txt");
    fs::write(&path, "2024-05-01T11:59:00.000Z: [1]\n").unwrap();

    let mut sink = FileSink::open(&path).unwrap();
    sink.append(&snapshot(0, vec![MetricSample::Value(2.0)])).unwrap();
    drop(sink);

    let log = read_snapshots(&path).unwrap();
    assert_eq!(log.snapshots.len(), 2);
    assert_eq!(log.snapshots[0].round().samples(), &[MetricSample::Value(1.0)]);
    assert_eq!(log.snapshots[1].round().samples(), &[MetricSample::Value(2.0)]);
}

#[test]
fn test_open_fails_for_directory_path() {
    let dir = tempdir().unwrap();

    let err = FileSink::open(dir.path()).unwrap_err();

    let SinkError::Io { path, .. } = err;
    assert_eq!(path, dir.path());
}

#[test]
fn test_open_fails_when_parent_is_missing() {
    let dir = tempdir().unwrap();

    assert!(FileSink::open(dir.path().join("missing").join("results.txt")).is_err());
}

#[test]
fn test_read_back_matches_what_was_written() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("results.txt");
    let written = vec![
        snapshot(0, vec![MetricSample::Value(0.25), MetricSample::Failed(ErrorKind::Shape)]),
        snapshot(1, vec![MetricSample::Failed(ErrorKind::Timeout), MetricSample::Value(-4.5)]),
        snapshot(2, vec![]),
    ];

    let mut sink = FileSink::open(&path).unwrap();
    for s in &written {
        sink.append(s).unwrap();
    }

    let log = read_snapshots(&path).unwrap();
    assert_eq!(log.skipped_lines, 0);
    assert_eq!(log.snapshots, written);
}

#[test]
fn test_read_skips_blank_and_malformed_lines() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("results.txt");
    fs::write(
        &path,
        "2024-05-01T12:00:00.000Z: [1, 2]\n\
         \n\
         garbage without separator\n\
         2024-05-01T12:01:00.000Z: [1, failed:bogus]\n\
         not-a-time: [1]\n\
         2024-05-01T12:02:00.000Z: [3, failed:internal]\n",
    )
    .unwrap();

    let log = read_snapshots(&path).unwrap();

    assert_eq!(log.snapshots.len(), 2);
    assert_eq!(log.skipped_lines, 3);
    assert_eq!(
        log.snapshots[1].round().samples(),
        &[MetricSample::Value(3.0), MetricSample::Failed(ErrorKind::Internal)]
    );
}

#[test]
fn test_read_missing_file_is_error() {
    let dir = tempdir().unwrap();

    assert!(read_snapshots(dir.path().join("absent.txt")).is_err());
}

#[test]
fn test_read_skips_non_utf8_lines() {
    // Purpose: one corrupt line must not hide the rest of the log
    let dir = tempdir().unwrap();
    let path = dir.path().join("results.txt");
    let mut bytes = b"2024-05-01T12:00:00.000Z: [1]\n".to_vec();
    bytes.extend_from_slice(&[0xff, 0xfe, b'\n']);
    bytes.extend_from_slice(b"2024-05-01T12:01:00.000Z: [2, failed:timeout]\n");
    fs::write(&path, bytes).unwrap();

    let log = read_snapshots(&path).unwrap();

    assert_eq!(log.snapshots.len(), 2);
    assert_eq!(log.skipped_lines, 1);
    assert_eq!(
        log.snapshots[1].round().samples(),
        &[MetricSample::Value(2.0), MetricSample::Failed(ErrorKind::Timeout)]
    );
}

#[test]
fn test_read_accepts_crlf_and_missing_final_newline() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("results.txt");
    fs::write(&path, "2024-05-01T12:00:00.000Z: [1]\r\n2024-05-01T12:01:00.000Z: [2]").unwrap();

    let log = read_snapshots(&path).unwrap();

    assert_eq!(log.skipped_lines, 0);
    assert_eq!(log.snapshots.len(), 2);
}

mod common;
use common::*;

fn uids(stdout: &str) -> Vec<String> {
    let mut uids: Vec<String> = stdout
        .lines()
        .map(|line| line.split('\t').nth(1).unwrap_or_default().to_string())
        .collect();
    uids.sort();
    uids
}

#[test]
fn test_equals_filter() {
    let (stdout, stderr, exit_code) = run_bro_awk_with_file(&["proto=tcp"], CONN_LOG);
    assert_eq!(exit_code, 0, "stderr: {}", stderr);
    assert_eq!(uids(&stdout), vec!["C1", "C3"]);
    // Whole lines are printed unchanged
    assert!(stdout
        .lines()
        .any(|line| line == "1704067200.000001\tC1\t10.0.0.1\t50000\t10.0.0.2\t80\ttcp\thttp"));
}

#[test]
fn test_not_equals_filter() {
    let (stdout, _stderr, exit_code) = run_bro_awk_with_file(&["proto!=tcp"], CONN_LOG);
    assert_eq!(exit_code, 0);
    assert_eq!(uids(&stdout), vec!["C2", "C4"]);
}

#[test]
fn test_regex_filters() {
    let (stdout, _stderr, exit_code) = run_bro_awk_with_file(&["id.resp_h~^10\\."], CONN_LOG);
    assert_eq!(exit_code, 0);
    assert_eq!(uids(&stdout), vec!["C1", "C3", "C4"]);

    let (stdout, _stderr, exit_code) = run_bro_awk_with_file(&["service!~^(http|ssl)$"], CONN_LOG);
    assert_eq!(exit_code, 0);
    assert_eq!(uids(&stdout), vec!["C2", "C4"]);
}

#[test]
fn test_multiple_rules_are_anded() {
    let (stdout, _stderr, exit_code) =
        run_bro_awk_with_file(&["proto=tcp", "id.resp_p=443"], CONN_LOG);
    assert_eq!(exit_code, 0);
    assert_eq!(uids(&stdout), vec!["C3"]);
}

#[test]
fn test_multiple_fields_must_all_hold() {
    // Neither endpoint may be 10.0.0.1
    let (stdout, _stderr, exit_code) =
        run_bro_awk_with_file(&["id.orig_h,id.resp_h!=10.0.0.1"], CONN_LOG);
    assert_eq!(exit_code, 0);
    assert_eq!(uids(&stdout), vec!["C2"]);
}

#[test]
fn test_multiple_values_are_anded_by_default() {
    let (stdout, _stderr, exit_code) = run_bro_awk_with_file(&["proto=tcp,udp"], CONN_LOG);
    assert_eq!(exit_code, 0);
    assert!(stdout.is_empty());

    let (stdout, _stderr, exit_code) = run_bro_awk_with_file(&["proto!=tcp,udp"], CONN_LOG);
    assert_eq!(exit_code, 0);
    assert_eq!(uids(&stdout), vec!["C4"]);
}

#[test]
fn test_any_value_accepts_either() {
    let (stdout, _stderr, exit_code) =
        run_bro_awk_with_file(&["--any-value", "proto=tcp,udp"], CONN_LOG);
    assert_eq!(exit_code, 0);
    assert_eq!(uids(&stdout), vec!["C1", "C2", "C3"]);
}

#[test]
fn test_print_fields_in_requested_order() {
    let (stdout, _stderr, exit_code) =
        run_bro_awk_with_file(&["-p", "id.resp_h,uid", "proto=udp"], CONN_LOG);
    assert_eq!(exit_code, 0);
    assert_eq!(stdout, "8.8.8.8\tC2\n");
}

#[test]
fn test_comment_lines_are_never_printed() {
    let (stdout, _stderr, exit_code) = run_bro_awk_with_file(&["uid~."], CONN_LOG);
    assert_eq!(exit_code, 0);
    assert_eq!(stdout.lines().count(), 4);
    assert!(!stdout.contains('#'));
}

#[test]
fn test_blank_lines_and_short_rows_are_tolerated() {
    let content = "#fields\tts\tproto\n\n1\ttcp\n2\n\n3\ttcp\n";
    let (stdout, stderr, exit_code) = run_bro_awk_with_file(&["--stats", "proto=tcp"], content);
    assert_eq!(exit_code, 0, "stderr: {}", stderr);
    assert_eq!(sorted_lines(&stdout), vec!["1\ttcp", "3\ttcp"]);
    assert!(stderr.contains("1 malformed"), "stderr: {}", stderr);
}

#[test]
fn test_final_line_without_newline_is_kept() {
    let content = "#fields\tts\tproto\n1\ttcp\n2\ttcp";
    let (stdout, _stderr, exit_code) = run_bro_awk_with_file(&["proto=tcp"], content);
    assert_eq!(exit_code, 0);
    assert_eq!(sorted_lines(&stdout), vec!["1\ttcp", "2\ttcp"]);
}

#[test]
fn test_value_containing_operator() {
    let content = "#fields\turi\tstatus\n/a?x=1\t200\n/b\t404\n";
    let (stdout, _stderr, exit_code) = run_bro_awk_with_file(&["uri~x=1$"], content);
    assert_eq!(exit_code, 0);
    assert_eq!(stdout, "/a?x=1\t200\n");
}

#[test]
fn test_multiple_files_processed_in_order() {
    let dir = tempfile::TempDir::new().unwrap();
    let first = write_log(&dir, "first.log", "#fields\tname\tproto\nfirst\ttcp\n");
    // Columns in a different order in the second file
    let second = write_log(&dir, "second.log", "#fields\tproto\tname\ntcp\tsecond\n");

    let (stdout, stderr, exit_code) = run_bro_awk(&[
        "-p",
        "name",
        "proto=tcp",
        first.to_str().unwrap(),
        second.to_str().unwrap(),
    ]);
    assert_eq!(exit_code, 0, "stderr: {}", stderr);
    assert_eq!(stdout, "first\nsecond\n");
}

#[test]
fn test_stats_output() {
    let (_stdout, stderr, exit_code) = run_bro_awk_with_file(&["--stats", "proto=tcp"], CONN_LOG);
    assert_eq!(exit_code, 0);
    // #types and #close lines plus four rows
    assert_eq!(extract_lines_read_from_stats(&stderr), Some(6));
    assert!(stderr.contains("2 output, 2 filtered"), "stderr: {}", stderr);
    assert!(stderr.contains("1 files"), "stderr: {}", stderr);
}

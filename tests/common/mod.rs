// tests/common/mod.rs
// Shared test utilities for integration tests
#![allow(dead_code)]

use flate2::write::GzEncoder;
use flate2::Compression;
use std::fs::File;
use std::io::Write;
use std::path::PathBuf;
use std::process::{Command, Stdio};
use tempfile::TempDir;

/// A small conn.log with the usual Bro/Zeek header and footer
pub const CONN_LOG: &str = "#separator \\x09\n\
#set_separator\t,\n\
#empty_field\t(empty)\n\
#unset_field\t-\n\
#path\tconn\n\
#open\t2024-01-01-00-00-00\n\
#fields\tts\tuid\tid.orig_h\tid.orig_p\tid.resp_h\tid.resp_p\tproto\tservice\n\
#types\ttime\tstring\taddr\tport\taddr\tport\tenum\tstring\n\
1704067200.000001\tC1\t10.0.0.1\t50000\t10.0.0.2\t80\ttcp\thttp\n\
1704067200.000002\tC2\t10.0.0.3\t50001\t8.8.8.8\t53\tudp\tdns\n\
1704067200.000003\tC3\t10.0.0.1\t50002\t10.0.0.9\t443\ttcp\tssl\n\
1704067200.000004\tC4\t10.0.0.4\t0\t10.0.0.1\t0\ticmp\t-\n\
#close\t2024-01-01-01-00-00\n";

fn binary_path() -> &'static str {
    env!("CARGO_BIN_EXE_bro-awk")
}

/// Helper function to run bro-awk with the given arguments
pub fn run_bro_awk(args: &[&str]) -> (String, String, i32) {
    run_bro_awk_with_env(args, &[])
}

/// Helper function to run bro-awk with extra environment variables
pub fn run_bro_awk_with_env(args: &[&str], env: &[(&str, &str)]) -> (String, String, i32) {
    let mut cmd = Command::new(binary_path());
    cmd.args(args)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .env_remove("BRO_AWK_UNZIPPER")
        .env_remove("BRO_AWK_THREADS")
        .env_remove("BRO_AWK_BLOCK_SIZE");
    for (key, value) in env {
        cmd.env(key, value);
    }

    let output = cmd.output().expect("Failed to execute bro-awk");

    (
        String::from_utf8_lossy(&output.stdout).to_string(),
        String::from_utf8_lossy(&output.stderr).to_string(),
        output.status.code().unwrap_or(-1),
    )
}

/// Helper function to run bro-awk against one temporary log file
pub fn run_bro_awk_with_file(args: &[&str], file_content: &str) -> (String, String, i32) {
    let dir = TempDir::new().expect("Failed to create temp dir");
    let path = write_log(&dir, "conn.log", file_content);

    let mut full_args = args.to_vec();
    full_args.push(path.to_str().unwrap());
    run_bro_awk(&full_args)
}

/// Write a plain log file into `dir`
pub fn write_log(dir: &TempDir, name: &str, content: &str) -> PathBuf {
    let path = dir.path().join(name);
    std::fs::write(&path, content).expect("Failed to write log file");
    path
}

/// Write a gzip-compressed log file into `dir`
pub fn write_gzip_log(dir: &TempDir, name: &str, content: &str) -> PathBuf {
    let path = dir.path().join(name);
    let file = File::create(&path).expect("Failed to create gzip file");
    let mut encoder = GzEncoder::new(file, Compression::default());
    encoder
        .write_all(content.as_bytes())
        .expect("Failed to write gzip data");
    encoder.finish().expect("Failed to finish gzip stream");
    path
}

/// Output lines sorted, for comparing runs whose line order may differ
pub fn sorted_lines(output: &str) -> Vec<String> {
    let mut lines: Vec<String> = output.lines().map(str::to_string).collect();
    lines.sort();
    lines
}

/// Build a log with `rows` data rows cycling through a few protocols
pub fn generate_conn_log(rows: usize) -> String {
    let mut content = String::from("#separator \\x09\n#fields\tts\tid.orig_h\tid.resp_p\tproto\n");
    for i in 0..rows {
        let proto = ["tcp", "udp", "icmp", "tcp"][i % 4];
        content.push_str(&format!(
            "{}.{:06}\t10.0.{}.{}\t{}\t{}\n",
            1704067200 + i / 1000,
            i % 1000,
            (i / 256) % 256,
            i % 256,
            i % 1024,
            proto
        ));
    }
    content.push_str("#close\t2024-01-01-01-00-00\n");
    content
}

/// Extract the "N total" count from a --stats line
pub fn extract_lines_read_from_stats(stderr: &str) -> Option<usize> {
    stderr
        .lines()
        .find_map(|line| line.strip_prefix("Lines processed: "))
        .and_then(|rest| rest.split(" total").next())
        .and_then(|count| count.trim().parse().ok())
}

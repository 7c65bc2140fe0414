use std::fs;
use std::path::Path;
use std::process::{Command, Output};

fn tbtrace(args: &[&str]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_tbtrace"))
        .args(args)
        .env("RUST_LOG", "off")
        .output()
        .expect("failed to run tbtrace")
}

fn write_ops(dir: &Path, text: &str) -> String {
    let path = dir.join("ops.txt");
    fs::write(&path, text).unwrap();
    path.to_str().unwrap().to_string()
}

#[test]
fn transcodes_ops_file_into_trace() {
    let dir = tempfile::tempdir().unwrap();
    let trace = dir.path().join("out/trace.txt");
    let ops = write_ops(
        dir.path(),
        "INSERT usertable 42 field0=x\nREAD usertable 42\nDELETE usertable 42\n",
    );

    let out = tbtrace(&[
        "transcode",
        "--ops",
        &ops,
        "-p",
        &format!("tbtrace.file={}", trace.display()),
        "-p",
        "tbtrace.value.bytes=8",
    ]);
    assert!(out.status.success(), "{}", String::from_utf8_lossy(&out.stderr));

    assert_eq!(
        fs::read_to_string(&trace).unwrap(),
        "SET user42 9dfd47e10da719f9\nGET user42\nSET user42 TOMBSTONE\n"
    );

    let summary: serde_json::Value = serde_json::from_slice(&out.stdout).unwrap();
    assert_eq!(summary["lines"], 3);
    assert_eq!(summary["unsupported"], 0);
}

#[test]
fn properties_file_is_overridden_by_settings() {
    let dir = tempfile::tempdir().unwrap();
    let trace = dir.path().join("trace.txt");
    let props = dir.path().join("tb.properties");
    fs::write(
        &props,
        format!(
            "tbtrace.file={}\ntbtrace.opcase=lower\ntbtrace.keyprefix=k\n",
            trace.display()
        ),
    )
    .unwrap();
    let ops = write_ops(dir.path(), "read 1\n");

    let out = tbtrace(&[
        "transcode",
        "-P",
        props.to_str().unwrap(),
        "-p",
        "tbtrace.keyprefix=row",
        "--ops",
        &ops,
    ]);
    assert!(out.status.success(), "{}", String::from_utf8_lossy(&out.stderr));
    assert_eq!(fs::read_to_string(&trace).unwrap(), "get row1\n");
}

#[test]
fn scan_aborts_unless_skipped() {
    let dir = tempfile::tempdir().unwrap();
    let trace = dir.path().join("trace.txt");
    let file_setting = format!("tbtrace.file={}", trace.display());
    let ops = write_ops(dir.path(), "read 1\nscan usertable user1 10\nread 2\n");

    let out = tbtrace(&["transcode", "--ops", &ops, "-p", &file_setting]);
    assert!(!out.status.success());
    assert!(String::from_utf8_lossy(&out.stderr).contains("not supported"));
    // Lines before the refusal are still flushed.
    assert_eq!(fs::read_to_string(&trace).unwrap(), "GET user1\n");

    let out = tbtrace(&[
        "transcode",
        "--ops",
        &ops,
        "-p",
        &file_setting,
        "--skip-unsupported",
    ]);
    assert!(out.status.success());
    assert_eq!(fs::read_to_string(&trace).unwrap(), "GET user1\nGET user2\n");

    let summary: serde_json::Value = serde_json::from_slice(&out.stdout).unwrap();
    assert_eq!(summary["unsupported"], 1);
}

#[test]
fn missing_output_path_fails_before_touching_files() {
    let dir = tempfile::tempdir().unwrap();
    let ops = write_ops(dir.path(), "read 1\n");

    let out = tbtrace(&["transcode", "--ops", &ops]);
    assert!(!out.status.success());
    assert!(String::from_utf8_lossy(&out.stderr).contains("tbtrace.file"));

    let entries: Vec<_> = fs::read_dir(dir.path()).unwrap().collect();
    assert_eq!(entries.len(), 1, "only the ops file should exist");
}

#[test]
fn verify_reports_summary() {
    let dir = tempfile::tempdir().unwrap();
    let trace = dir.path().join("trace.txt");
    fs::write(&trace, "SET user1 ab\nGET user1\n").unwrap();

    let out = tbtrace(&["verify", trace.to_str().unwrap()]);
    assert!(out.status.success());

    let summary: serde_json::Value = serde_json::from_slice(&out.stdout).unwrap();
    assert_eq!(summary["gets"], 1);
    assert_eq!(summary["sets"], 1);
    assert_eq!(summary["verb_case"], "upper");

    fs::write(&trace, "SET user1 ab\nget user1\n").unwrap();
    let out = tbtrace(&["verify", trace.to_str().unwrap()]);
    assert!(!out.status.success());
}

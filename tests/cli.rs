//! CLI test cases.
//!
//! Everything here runs against the `replay` engine, which reads saved OCR
//! results instead of images, so no OCR engine needs to be installed. The
//! capture command in `tests/fixtures/config.toml` is plain `cat`.

use std::process::Command;

use assert_cmd::prelude::*;
use predicates::prelude::*;

/// A saved OCR result for a short shopping receipt.
static RECEIPT: &str = "tests/fixtures/receipt.json";

/// Create a new `Command` with our binary.
fn cmd() -> Command {
    let mut cmd = Command::cargo_bin("ocr-shaper").unwrap();
    cmd.env_remove("OCR_SHAPER_CONFIG");
    cmd
}

#[test]
fn test_help() {
    cmd().arg("--help").assert().success();
}

#[test]
fn test_version() {
    cmd().arg("--version").assert().success();
}

#[test]
fn test_patterns_lists_labels() {
    cmd()
        .arg("patterns")
        .assert()
        .success()
        .stdout(predicate::str::contains("1\tcontains-digits\tWith digits\n"))
        .stdout(predicate::str::contains(
            "5\telements-group-y-clustering\tElements grouped by Y Clustering\n",
        ));
}

#[test]
fn test_format_each_pattern() {
    let cases = [
        ("none", "CORNER SHOP\nMilk 1.20\nBread 2.35\nThank you"),
        ("contains-digits", "Milk 1.20\nBread 2.35\n"),
        ("text-only", "CORNER SHOP\nThank you\n"),
        (
            "elements-positions",
            "CORNER (10;5)\nSHOP (90;7)\nMilk (10;40)\n1.20 (200;40)\nBread (10;60)\n2.35 (200;62)\nThank (10;90)\nyou (70;90)\n",
        ),
        (
            "elements-group-y",
            "CORNER\nSHOP\nMilk 1.20\nBread\n2.35\nThank you\n",
        ),
        (
            "elements-group-y-clustering",
            "CORNER SHOP\nMilk 1.20\nBread 2.35\nThank you\n",
        ),
    ];
    for (pattern, expected) in cases {
        println!("Testing pattern: {}", pattern);
        cmd()
            .args(["format", RECEIPT, "--pattern", pattern])
            .assert()
            .success()
            .stdout(expected);
    }
}

#[test]
fn test_format_by_index_matches_name() {
    let by_name = cmd()
        .args(["format", RECEIPT, "-p", "text-only"])
        .output()
        .unwrap();
    let by_index = cmd().args(["format", RECEIPT, "-p", "2"]).output().unwrap();
    assert!(by_name.status.success());
    assert_eq!(by_name.stdout, by_index.stdout);
}

#[test]
fn test_format_rejects_unknown_pattern() {
    cmd()
        .args(["format", RECEIPT, "-p", "7"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("unknown pattern"));
}

#[test]
fn test_format_toml_from_stdin() {
    assert_cmd::Command::from_std(cmd())
        .args(["format", "-p", "elements-group-y-clustering"])
        .write_stdin(std::fs::read_to_string("tests/fixtures/receipt.toml").unwrap())
        .assert()
        .success()
        .stdout("CORNER SHOP\n");
}

#[test]
fn test_format_with_bad_config_regex_fails_early() {
    cmd()
        .args(["--config", "tests/fixtures/bad_regex.toml"])
        .args(["format", RECEIPT])
        .assert()
        .failure()
        .stderr(predicate::str::contains("contains-digits"));
}

#[test]
fn test_scan_file_with_replay_engine() {
    cmd()
        .args(["scan", RECEIPT, "--engine", "replay", "-p", "contains-digits"])
        .assert()
        .success()
        .stdout("Milk 1.20\nBread 2.35\n");
}

#[test]
fn test_scan_stdin_with_replay_engine() {
    assert_cmd::Command::from_std(cmd())
        .args(["scan", "-", "--engine", "replay", "-p", "text-only"])
        .write_stdin(std::fs::read_to_string(RECEIPT).unwrap())
        .assert()
        .success()
        .stdout("CORNER SHOP\nThank you\n");
}

#[test]
fn test_scan_camera_with_capture_command() {
    cmd()
        .args(["--config", "tests/fixtures/config.toml"])
        .args(["scan", "--camera", "--engine", "replay", "-p", "elements-group-y"])
        .assert()
        .success()
        .stdout("CORNER\nSHOP\nMilk 1.20\nBread\n2.35\nThank you\n");
}

#[test]
fn test_scan_camera_unsupported() {
    cmd()
        .args(["scan", "--camera", "--engine", "replay"])
        .assert()
        .failure()
        .stdout("")
        .stderr(predicate::str::contains("not supported"));
}

#[test]
fn test_scan_missing_image_fails() {
    cmd()
        .args(["scan", "tests/fixtures/missing.jpg", "--engine", "replay"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("could not acquire image"));
}

#[test]
fn test_scan_unrecognizable_input_fails() {
    cmd()
        .args(["scan", "tests/fixtures/session.txt", "--engine", "replay"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("text recognition failed"));
}

#[test]
fn test_session_keeps_result_on_failures() {
    let expected = "Waiting for results ..\n\
                    Milk 1.20\nBread 2.35\n\
                    Milk 1.20\nBread 2.35\n\
                    Milk 1.20\nBread 2.35\n\
                    CORNER SHOP\nMilk 1.20\nBread 2.35\nThank you\n\
                    Waiting for results ..\n";
    assert_cmd::Command::from_std(cmd())
        .args(["session", "--engine", "replay"])
        .write_stdin(std::fs::read_to_string("tests/fixtures/session.txt").unwrap())
        .assert()
        .success()
        .stdout(expected)
        .stderr(predicate::str::contains("Image capture is not supported"));
}

#[test]
fn test_session_rejects_stdin_image() {
    assert_cmd::Command::from_std(cmd())
        .args(["session", "--engine", "replay"])
        .write_stdin("file -\nshow\n")
        .assert()
        .success()
        .stdout("Waiting for results ..\n")
        .stderr(predicate::str::contains("cannot pick an image from stdin"));
}

#[test]
#[cfg(unix)]
fn test_session_exits_on_interrupt_while_idle() {
    use std::{
        io::{BufRead as _, BufReader, Write as _},
        process::Stdio,
        thread::sleep,
        time::{Duration, Instant},
    };

    let mut child = cmd()
        .args(["session", "--engine", "replay"])
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::null())
        .spawn()
        .unwrap();

    // Wait until the session is answering commands. We hold on to stdin, so
    // only the interrupt can end the session.
    let mut stdin = child.stdin.take().unwrap();
    writeln!(stdin, "show").unwrap();
    let mut stdout = BufReader::new(child.stdout.take().unwrap());
    let mut line = String::new();
    stdout.read_line(&mut line).unwrap();
    assert_eq!(line, "Waiting for results ..\n");
    sleep(Duration::from_millis(300));

    let status = Command::new("kill")
        .args(["-INT", &child.id().to_string()])
        .status()
        .unwrap();
    assert!(status.success());

    let deadline = Instant::now() + Duration::from_secs(10);
    let status = loop {
        if let Some(status) = child.try_wait().unwrap() {
            break status;
        }
        if Instant::now() > deadline {
            child.kill().unwrap();
            panic!("session still running after Ctrl-C");
        }
        sleep(Duration::from_millis(50));
    };
    assert!(status.success(), "{status:?}");
    drop(stdin);
}

#[test]
fn test_schema_ocr_result() {
    cmd()
        .args(["schema", "OcrResult"])
        .assert()
        .success()
        .stdout(predicate::str::contains("full_text"));
}

#[test]
#[ignore = "Needs tesseract installed, and an image at tests/fixtures/receipt.png"]
fn test_scan_with_tesseract() {
    cmd()
        .args(["scan", "tests/fixtures/receipt.png", "-p", "elements-positions"])
        .assert()
        .success();
}

use std::fs;
use std::path::PathBuf;

use assert_cmd::Command;
use predicates::prelude::PredicateBooleanExt as _;
use predicates::str::contains;

/// Write an object image (origin + payload, big-endian) to a temp file.
fn image_file(name: &str, words: &[u16]) -> PathBuf {
    let mut path = std::env::temp_dir();
    path.push(format!("lc3vm-test-{}-{}.obj", std::process::id(), name));
    let bytes: Vec<u8> = words.iter().flat_map(|word| word.to_be_bytes()).collect();
    fs::write(&path, bytes).unwrap();
    path
}

#[test]
fn no_arguments_is_a_usage_error() {
    let mut cmd = Command::cargo_bin("lc3vm").unwrap();
    cmd.assert().code(2).stderr(contains("Usage"));
}

#[test]
fn unreadable_image_exits_with_one() {
    let mut cmd = Command::cargo_bin("lc3vm").unwrap();
    cmd.arg("/nonexistent/image.obj");
    cmd.assert().code(1).stderr(contains("Failed to load image"));
}

#[test]
fn add_out_halt_writes_the_byte() {
    // AND R0, R0, #0 ; ADD R0, R0, #7 ; TRAP OUT ; TRAP HALT
    let image = image_file("add-out", &[0x3000, 0x5020, 0x1027, 0xF021, 0xF025]);
    let mut cmd = Command::cargo_bin("lc3vm").unwrap();
    cmd.arg(&image).write_stdin("c\n");

    cmd.assert()
        .success()
        .stdout(contains("\u{7}HALT"))
        .stdout(contains("single-step mode"));
}

#[test]
fn lea_puts_prints_the_string() {
    // LEA R0, #2 ; TRAP PUTS ; TRAP HALT ; "Hi\0"
    let image = image_file(
        "puts-hi",
        &[0x3000, 0xE002, 0xF022, 0xF025, 0x0048, 0x0069, 0x0000],
    );
    let mut cmd = Command::cargo_bin("lc3vm").unwrap();
    cmd.arg(&image).arg("--command").arg("continue");

    cmd.assert()
        .success()
        .stdout(contains("HiHALT"));
}

#[test]
fn reserved_opcode_reports_and_exits_cleanly() {
    let image = image_file("reserved", &[0x3000, 0xD000]);
    let mut cmd = Command::cargo_bin("lc3vm").unwrap();
    cmd.arg(&image).arg("--command").arg("step");

    cmd.assert()
        .success()
        .stderr(contains("illegal opcode: 0xD"));
}

#[test]
fn eof_at_the_first_prompt_quits() {
    let image = image_file("eof-quit", &[0x3000, 0xF025]);
    let mut cmd = Command::cargo_bin("lc3vm").unwrap();
    cmd.arg(&image);

    // stdin is closed immediately; nothing executes, nothing is printed by
    // the program itself
    cmd.assert().success().stdout(contains("single-step mode"));
}

#[test]
fn later_image_wins_at_overlapping_addresses() {
    let first = image_file("overlap-a", &[0x3000, 0x1234, 0x5678]);
    let second = image_file("overlap-b", &[0x3001, 0x9ABC]);
    let mut cmd = Command::cargo_bin("lc3vm").unwrap();
    cmd.arg(&first)
        .arg(&second)
        .arg("--command")
        .arg("memory 0x3000 2");

    cmd.assert()
        .success()
        .stderr(contains("0x3000: 0x1234"))
        .stderr(contains("0x3001: 0x9ABC"));
}

// LEA R0, #0 ; BRz #1 ; TRAP OUT ; TRAP HALT
//
// With the default LEA semantics the load sets P, the branch falls
// through, and OUT prints R0's low byte (0x01). With --no-lea-cc the
// startup Z survives and the branch skips the OUT.
const LEA_CC_PROBE: &[u16] = &[0x3000, 0xE000, 0x0401, 0xF021, 0xF025];

#[test]
fn lea_updates_cc_by_default() {
    let image = image_file("lea-cc-default", LEA_CC_PROBE);
    let mut cmd = Command::cargo_bin("lc3vm").unwrap();
    cmd.arg(&image).arg("--command").arg("c");

    cmd.assert().success().stdout(contains("\u{1}HALT"));
}

#[test]
fn no_lea_cc_skips_the_flag_update() {
    let image = image_file("lea-cc-off", LEA_CC_PROBE);
    let mut cmd = Command::cargo_bin("lc3vm").unwrap();
    cmd.arg(&image).arg("--no-lea-cc").arg("--command").arg("c");

    cmd.assert()
        .success()
        .stdout(contains("HALT"))
        .stdout(contains("\u{1}").not());
}

use std::fs;
use std::path::PathBuf;

use assert_cmd::Command;
use predicates::str::contains;

fn image_file(name: &str, words: &[u16]) -> PathBuf {
    let mut path = std::env::temp_dir();
    path.push(format!("lc3vm-dbg-{}-{}.obj", std::process::id(), name));
    let bytes: Vec<u8> = words.iter().flat_map(|word| word.to_be_bytes()).collect();
    fs::write(&path, bytes).unwrap();
    path
}

#[test]
fn banner_names_pc_and_instruction() {
    let image = image_file("banner", &[0x3000, 0xF025]);
    let mut cmd = Command::cargo_bin("lc3vm").unwrap();
    cmd.arg(&image).arg("--command").arg("continue");

    cmd.assert()
        .success()
        .stderr(contains("Fetched instruction from 0x3000, containing 0xF025."));
}

#[test]
fn reg_displays_the_register_file() {
    // AND R0, R0, #0 ; ADD R0, R0, #7 ; TRAP HALT
    let image = image_file("reg", &[0x3000, 0x5020, 0x1027, 0xF025]);
    let mut cmd = Command::cargo_bin("lc3vm").unwrap();
    cmd.arg(&image).arg("--command").arg("s;s;reg;c");

    cmd.assert()
        .success()
        .stderr(contains("R0   0x0007"))
        .stderr(contains("PC   0x3003"))
        // P flag after ADD
        .stderr(contains("COND 0x0001"));
}

#[test]
fn step_traces_name_opcode_and_result() {
    let image = image_file("trace", &[0x3000, 0x5020, 0x1027, 0xF025]);
    let mut cmd = Command::cargo_bin("lc3vm").unwrap();
    cmd.arg(&image).arg("--command").arg("s;s;s");

    cmd.assert()
        .success()
        .stderr(contains("AND: R0x0 <- R0x0 & 0x0000 = 0x0000"))
        .stderr(contains("ADD: R0x0 <- R0x0 + 0x0007 = 0x0007"));
}

#[test]
fn memory_displays_words() {
    let image = image_file("memory", &[0x3000, 0xF025, 0xBEEF]);
    let mut cmd = Command::cargo_bin("lc3vm").unwrap();
    cmd.arg(&image).arg("--command").arg("m 0x3001;c");

    cmd.assert().success().stderr(contains("0x3001: 0xBEEF"));
}

#[test]
fn unrecognized_commands_reprompt() {
    let image = image_file("unknown", &[0x3000, 0xF025]);
    let mut cmd = Command::cargo_bin("lc3vm").unwrap();
    cmd.arg(&image).arg("--command").arg("bogus;c");

    cmd.assert()
        .success()
        .stderr(contains("Unrecognized command: bogus"))
        .stdout(contains("HALT"));
}

#[test]
fn help_lists_the_commands() {
    let image = image_file("help", &[0x3000, 0xF025]);
    let mut cmd = Command::cargo_bin("lc3vm").unwrap();
    cmd.arg(&image).arg("--command").arg("h;c");

    cmd.assert()
        .success()
        .stderr(contains("lc3vm commands:"))
        .stderr(contains("continue"))
        .stderr(contains("memory"));
}

#[test]
fn piped_commands_share_stdin_with_getc() {
    // TRAP GETC ; TRAP OUT ; TRAP HALT -- echoes one byte
    let image = image_file("getc", &[0x3000, 0xF020, 0xF021, 0xF025]);
    let mut cmd = Command::cargo_bin("lc3vm").unwrap();
    // "c" goes to the debugger, "Q" to the program
    cmd.arg(&image).write_stdin("c\nQ");

    cmd.assert().success().stdout(contains("QHALT"));
}

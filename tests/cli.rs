#![cfg(feature = "cli")]

use std::fs;

use assert_cmd::{Command, cargo::cargo_bin_cmd};
use easprov::{Pipeline, READ_CAPACITY};
use predicates::{
    prelude::PredicateBooleanExt,
    str::{contains, is_empty},
};
use tempfile::TempDir;

const RECORD: &str = "MIX 2||888833336669999||MIX 2||+8618599999999||中国联通 (46001)";

fn cmd() -> Command {
    cargo_bin_cmd!("easprov")
}

fn hex(data: &[u8]) -> String {
    data.iter().map(|b| format!("{b:02x}")).collect()
}

#[test]
fn usage_without_two_arguments() {
    let cases: [&[&str]; 3] = [&[], &["decode"], &["decode", "a", "b"]];

    for args in cases {
        cmd()
            .args(args)
            .assert()
            .success()
            .stdout("easprov [encode|decode] filename\n");
    }
}

#[test]
fn encode_prints_hex() {
    let expected = hex(&fs::read("fixtures/mix2.wbxml").unwrap());

    for command in ["encode", "ENCODE", "Encode"] {
        cmd()
            .args([command, "fixtures/mix2.xml"])
            .assert()
            .success()
            .stdout(format!("{expected}\n"));
    }
}

#[test]
fn encode_reports_malformed_text() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("bad.xml");
    fs::write(&path, r#"<O:Provision xmlns:O="Provision"><O:Status>"#).unwrap();

    cmd()
        .arg("encode")
        .arg(&path)
        .assert()
        .success()
        .stdout(contains("Reached the end").or(contains("Malformed")));
}

#[test]
fn decode_logs_record() {
    for command in ["decode", "anything"] {
        cmd()
            .args([command, "fixtures/mix2.wbxml"])
            .assert()
            .success()
            .stdout(is_empty())
            .stderr(contains(RECORD));
    }
}

#[test]
fn decode_reports_malformed_data() {
    cmd()
        .args(["decode", "fixtures/truncated.wbxml"])
        .assert()
        .success()
        .stdout(is_empty())
        .stderr(contains("failed to extract record"));
}

#[test]
fn missing_file_does_nothing() {
    let dir = TempDir::new().unwrap();

    for command in ["encode", "decode"] {
        cmd()
            .arg(command)
            .arg(dir.path().join("missing"))
            .assert()
            .success()
            .stdout(is_empty());
    }
}

#[test]
fn input_beyond_capacity_is_ignored() {
    let pipeline = Pipeline::default();
    let dir = TempDir::new().unwrap();

    // Trailing bytes after the root element are never read.
    let mut data = fs::read("fixtures/mix2.wbxml").unwrap();
    data.resize(READ_CAPACITY * 2, 0xFF);
    let path = dir.path().join("padded.wbxml");
    fs::write(&path, &data).unwrap();

    cmd()
        .arg("decode")
        .arg(&path)
        .assert()
        .success()
        .stderr(contains(RECORD));

    // A document cut off by the capacity no longer decodes.
    let text = format!(
        r#"<O:Provision xmlns:O="Provision" xmlns:S="Settings"><S:DeviceInformation><S:Set>
            <S:Model>MIX 2</S:Model><S:UserAgent>{}</S:UserAgent>
        </S:Set></S:DeviceInformation></O:Provision>"#,
        "x".repeat(READ_CAPACITY)
    );
    let path = dir.path().join("long.wbxml");
    fs::write(&path, pipeline.encode(&text).unwrap()).unwrap();

    cmd()
        .arg("decode")
        .arg(&path)
        .assert()
        .success()
        .stderr(contains("failed to extract record"));
}

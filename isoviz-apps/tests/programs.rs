//! Command-line surface of each program

use std::process::Command;

fn help(exe: &str) -> String {
    let output = Command::new(exe).arg("--help").output().unwrap();
    assert!(output.status.success());
    String::from_utf8(output.stdout).unwrap()
}

#[test]
fn isogm_reads_isovalue_file_and_color_ramp() {
    let text = help(env!("CARGO_BIN_EXE_isogm"));
    assert!(text.contains("Usage: isogm"));
    assert!(text.contains("<ISOVALS_FILE>"));
    assert!(text.contains("--cmap"));
    assert!(!text.contains("--val"));
}

#[test]
fn iso2dtf_takes_single_isovalue() {
    let text = help(env!("CARGO_BIN_EXE_iso2dtf"));
    assert!(text.contains("Usage: iso2dtf"));
    assert!(text.contains("--val"));
    assert!(!text.contains("--cmap"));
    assert!(!text.contains("ISOVALS"));
}

#[test]
fn missing_volume_fails_cleanly() {
    let output = Command::new(env!("CARGO_BIN_EXE_iso2dtf"))
        .args(["/nonexistent/data.vti", "/nonexistent/grad.vti"])
        .env("RUST_LOG", "off")
        .output()
        .unwrap();
    assert!(!output.status.success());
    assert!(String::from_utf8_lossy(&output.stderr).contains("/nonexistent/data.vti"));
}

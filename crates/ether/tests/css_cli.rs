use std::fs;
use std::process::Command;

use tempfile::TempDir;

fn ether(config_dir: &TempDir) -> Command {
    let mut command = Command::new(env!("CARGO_BIN_EXE_ether"));
    command.env("ETHER_CONFIG_DIR", config_dir.path());
    command.env("RUST_LOG", "warn");
    command
}

#[test]
fn css_prints_default_stylesheet() {
    let config_dir = TempDir::new().unwrap();
    let output = ether(&config_dir)
        .arg("css")
        .output()
        .expect("failed to run ether css");
    assert!(output.status.success());

    let css = String::from_utf8(output.stdout).unwrap();
    assert!(css.contains(".liquid-ether-fallback {"));
    assert!(css.contains("rgba(82, 39, 255, 0.85)"));
    assert!(css.contains("@keyframes liquid-ether-drift"));
    assert!(css.contains("prefers-reduced-motion"));
}

#[test]
fn css_reads_config_file_and_writes_output() {
    let config_dir = TempDir::new().unwrap();
    fs::write(
        config_dir.path().join("ether.toml"),
        r##"
version = 1
colors = ["#ff0000"]
class_name = "hero"

[liquid]
flow_speed = 0.0
"##,
    )
    .unwrap();
    let target = config_dir.path().join("fallback.css");

    let output = ether(&config_dir)
        .args(["css", "--node", "--output"])
        .arg(&target)
        .output()
        .expect("failed to run ether css");
    assert!(output.status.success());

    let css = fs::read_to_string(&target).unwrap();
    assert!(css.contains("rgba(255, 0, 0, 0.85)"));
    assert!(!css.contains("@keyframes"));

    let stdout = String::from_utf8(output.stdout).unwrap();
    assert!(stdout.contains("class=\"liquid-ether-fallback hero\""));
}

#[test]
fn css_rejects_invalid_config() {
    let config_dir = TempDir::new().unwrap();
    let path = config_dir.path().join("broken.toml");
    fs::write(&path, "version = 1\ncolors = []\n").unwrap();

    let output = ether(&config_dir)
        .arg("css")
        .arg("--config")
        .arg(&path)
        .output()
        .expect("failed to run ether css");
    assert!(!output.status.success());
    let stderr = String::from_utf8(output.stderr).unwrap();
    assert!(stderr.contains("at least one color"));
}

#[test]
fn paths_honours_config_dir_override() {
    let config_dir = TempDir::new().unwrap();
    let output = ether(&config_dir)
        .arg("paths")
        .output()
        .expect("failed to run ether paths");
    assert!(output.status.success());
    let stdout = String::from_utf8(output.stdout).unwrap();
    assert!(stdout.contains(&config_dir.path().display().to_string()));
    assert!(stdout.contains("ether.toml (missing)"));
}

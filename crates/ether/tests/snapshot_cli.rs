use std::process::Command;

use tempfile::TempDir;

fn ether(config_dir: &TempDir) -> Command {
    let mut command = Command::new(env!("CARGO_BIN_EXE_ether"));
    command.env("ETHER_CONFIG_DIR", config_dir.path());
    command.env("RUST_LOG", "warn");
    command
}

#[test]
fn snapshot_writes_png_of_requested_size() {
    let dir = TempDir::new().unwrap();
    let target = dir.path().join("frame.png");

    let status = ether(&dir)
        .args(["snapshot", "--size", "24x12", "--frames", "3", "--stars", "--output"])
        .arg(&target)
        .status()
        .expect("failed to run ether snapshot");
    assert!(status.success());

    let image = image::open(&target).unwrap().to_rgba8();
    assert_eq!(image.dimensions(), (24, 12));
    assert!(image.pixels().any(|pixel| pixel.0[3] > 0));
}

#[test]
fn snapshot_is_deterministic() {
    let dir = TempDir::new().unwrap();
    let first = dir.path().join("a.png");
    let second = dir.path().join("b.png");

    for target in [&first, &second] {
        let status = ether(&dir)
            .args(["snapshot", "--size", "16x16", "--time", "2.5", "--colors", "#ff0000,#0000ff", "--output"])
            .arg(target)
            .status()
            .expect("failed to run ether snapshot");
        assert!(status.success());
    }

    let a = image::open(&first).unwrap().to_rgba8();
    let b = image::open(&second).unwrap().to_rgba8();
    assert_eq!(a.as_raw(), b.as_raw());
}

#[test]
fn snapshot_refuses_forced_fallback() {
    let dir = TempDir::new().unwrap();
    let target = dir.path().join("frame.png");

    let output = ether(&dir)
        .args(["snapshot", "--force-fallback", "--output"])
        .arg(&target)
        .output()
        .expect("failed to run ether snapshot");
    assert!(!output.status.success());
    assert!(!target.exists());
    let stderr = String::from_utf8(output.stderr).unwrap();
    assert!(stderr.contains("fallback forced"));
}

#[test]
fn snapshot_clamps_tiny_frame_rate() {
    let dir = TempDir::new().unwrap();
    let target = dir.path().join("slow.png");

    let status = ether(&dir)
        .args(["snapshot", "--fps", "1e-20", "--size", "8x8", "--output"])
        .arg(&target)
        .status()
        .expect("failed to run ether snapshot");
    assert!(status.success());
    assert!(target.exists());
}

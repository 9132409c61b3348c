use std::fs;

use anyhow::{anyhow, bail, Context, Result};
use renderer::{
    run_frames, save_png, CapabilityPolicy, CapabilityProbe, CapabilityReport, Controller,
    ControllerState, Decision, FallbackStyle, FixedStepClock, GraphicsSupport, HeadlessHost,
    WgpuProbe, WindowOptions,
};
use serde::Serialize;
use tracing::info;
use tracing_subscriber::EnvFilter;

use crate::bindings;
use crate::cli::{CssArgs, ProbeArgs, RunArgs, SnapshotArgs};
use crate::paths::AppPaths;

pub fn initialise_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

pub fn run(args: RunArgs) -> Result<()> {
    let paths = AppPaths::discover()?;
    let config = bindings::resolve(&args.config, &paths)?;
    let mut options = WindowOptions {
        fallback_css: args.fallback_css,
        ..WindowOptions::default()
    };
    if let Some(size) = args.size {
        options.size = size;
    }
    info!(
        profile = %config.profile,
        colors = config.colors.len(),
        max_fps = ?config.runtime.max_fps,
        "opening window"
    );
    renderer::run_window(config, options)
}

pub fn css(args: CssArgs) -> Result<()> {
    let paths = AppPaths::discover()?;
    let config = bindings::resolve(&args.config, &paths)?.sanitized();
    let style = FallbackStyle::from_config(&config);
    let node = style.node();

    match &args.output {
        Some(path) => {
            fs::write(path, &node.stylesheet)
                .with_context(|| format!("failed to write {}", path.display()))?;
            info!(path = %path.display(), "wrote fallback stylesheet");
        }
        None => print!("{}", node.stylesheet),
    }

    if args.node {
        println!("class=\"{}\"", node.class_list.join(" "));
        println!("style=\"{}\"", node.inline_style);
    }
    Ok(())
}

pub fn snapshot(args: SnapshotArgs) -> Result<()> {
    let paths = AppPaths::discover()?;
    let mut config = bindings::resolve(&args.config, &paths)?.sanitized();
    // The headless host shades on the CPU, so the device checks do not apply.
    config.runtime.allow_software = true;
    config.runtime.min_concurrency = 1;

    let clock = FixedStepClock::starting_at(config.runtime.time_step, args.time);
    let host = HeadlessHost::new(args.size);
    let mut controller = Controller::mount_with_clock(host, config, clock);
    if controller.state() != ControllerState::Running {
        let reason = controller
            .fallback_reason()
            .map(ToString::to_string)
            .unwrap_or_else(|| format!("controller is {:?}", controller.state()));
        bail!("snapshot needs the shader path: {reason}");
    }

    let drawn = run_frames(&mut controller, args.frames.max(1));
    let surface = controller
        .surface()
        .ok_or_else(|| anyhow!("surface was released after {drawn} frames"))?;
    save_png(surface, &args.output)?;
    info!(
        path = %args.output.display(),
        frames = drawn,
        seconds = controller.clock().seconds(),
        "wrote snapshot"
    );
    controller.unmount();
    Ok(())
}

#[derive(Serialize)]
struct ProbeOutput<'a> {
    report: &'a CapabilityReport,
    decision: &'a Decision,
}

pub fn probe(args: ProbeArgs) -> Result<()> {
    let paths = AppPaths::discover()?;
    let config = bindings::resolve(&args.config, &paths)?.sanitized();
    let report = WgpuProbe::default().probe();
    let decision = CapabilityPolicy::from_runtime(&config.runtime).decide(&report);

    if args.json {
        let output = ProbeOutput {
            report: &report,
            decision: &decision,
        };
        println!("{}", serde_json::to_string_pretty(&output)?);
        return Ok(());
    }

    match &report.graphics {
        GraphicsSupport::Available { adapter } => {
            println!("Adapter:     {} ({})", adapter.name, adapter.backend);
            println!("Device type: {}", adapter.device_type);
            if !adapter.driver.is_empty() {
                println!("Driver:      {}", adapter.driver);
            }
            println!("Max texture: {}", adapter.max_texture_dimension);
            println!("Software:    {}", adapter.software);
        }
        GraphicsSupport::Unavailable { reason } => println!("Adapter:     none ({reason})"),
    }
    println!("Threads:     {}", report.hardware_concurrency);
    match decision {
        Decision::Gpu => println!("Decision:    shader"),
        Decision::Fallback(reason) => println!("Decision:    CSS fallback ({reason})"),
    }
    Ok(())
}

pub fn paths() -> Result<()> {
    let paths = AppPaths::discover()?;
    println!("Configuration:");
    println!("  dir:  {}", paths.config_dir().display());
    let file = paths.config_file();
    let status = if file.exists() { "present" } else { "missing" };
    println!("  file: {} ({status})", file.display());
    Ok(())
}

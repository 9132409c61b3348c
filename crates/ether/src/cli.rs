use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};
use etherconfig::ProfileSetting;
use renderer::Viewport;

#[derive(Parser, Debug)]
#[command(
    name = "ether",
    author,
    version,
    about = "Liquid Ether animated background",
    args_conflicts_with_subcommands = true
)]
pub struct Cli {
    #[command(flatten)]
    pub run: RunArgs,
    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Open a desktop window hosting the background (the default).
    Run(RunArgs),
    /// Print or write the CSS fallback stylesheet for a configuration.
    Css(CssArgs),
    /// Render frames on the CPU and save the last one as a PNG.
    Snapshot(SnapshotArgs),
    /// Report the capability probe and the GPU/fallback decision.
    Probe(ProbeArgs),
    /// Print the resolved configuration directory and file.
    Paths,
}

/// Options shared by every command that builds a render configuration.
#[derive(Args, Debug, Default, Clone)]
pub struct ConfigArgs {
    /// Configuration file; defaults to `ether.toml` in the config directory.
    #[arg(long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Comma-separated palette, e.g. `#5227ff,#ff9ffc,#b19eef`.
    #[arg(long, value_name = "COLORS", value_delimiter = ',')]
    pub colors: Option<Vec<String>>,

    /// Quality profile: `simple` or `full`.
    #[arg(long, value_name = "PROFILE")]
    pub profile: Option<ProfileSetting>,

    /// Optional FPS cap (0=uncapped).
    #[arg(long, value_name = "FPS", value_parser = parse_fps)]
    pub fps: Option<f32>,

    /// Skip the GPU path and mount the CSS fallback.
    #[arg(long)]
    pub force_fallback: bool,

    /// Enable the starfield overlay.
    #[arg(long)]
    pub stars: bool,
}

#[derive(Args, Debug, Default)]
pub struct RunArgs {
    #[command(flatten)]
    pub config: ConfigArgs,

    /// Window size (e.g. `1280x720`).
    #[arg(long, value_name = "WIDTHxHEIGHT", value_parser = parse_size)]
    pub size: Option<Viewport>,

    /// Write the fallback stylesheet here if the window falls back to CSS.
    #[arg(long, value_name = "PATH")]
    pub fallback_css: Option<PathBuf>,
}

#[derive(Args, Debug)]
pub struct CssArgs {
    #[command(flatten)]
    pub config: ConfigArgs,

    /// Write the stylesheet to a file instead of stdout.
    #[arg(long, short, value_name = "PATH")]
    pub output: Option<PathBuf>,

    /// Also print the class list and inline style of the fallback node.
    #[arg(long)]
    pub node: bool,
}

#[derive(Args, Debug)]
pub struct SnapshotArgs {
    #[command(flatten)]
    pub config: ConfigArgs,

    /// PNG file to write.
    #[arg(long, short, value_name = "PATH")]
    pub output: PathBuf,

    /// Frame size.
    #[arg(long, value_name = "WIDTHxHEIGHT", value_parser = parse_size, default_value = "320x180")]
    pub size: Viewport,

    /// Number of frames to advance before saving.
    #[arg(long, value_name = "N", default_value_t = 1)]
    pub frames: u32,

    /// Clock time, in seconds, of the first rendered frame.
    #[arg(long, value_name = "SECONDS", default_value_t = 0.0)]
    pub time: f32,
}

#[derive(Args, Debug)]
pub struct ProbeArgs {
    #[command(flatten)]
    pub config: ConfigArgs,

    /// Emit the report as JSON.
    #[arg(long)]
    pub json: bool,
}

pub fn parse() -> Cli {
    Cli::parse()
}

pub fn parse_size(value: &str) -> Result<Viewport, String> {
    let (w, h) = value
        .trim()
        .split_once(['x', 'X'])
        .ok_or_else(|| "expected WIDTHxHEIGHT".to_string())?;
    let width = w
        .trim()
        .parse::<u32>()
        .map_err(|_| format!("invalid width '{w}'"))?;
    let height = h
        .trim()
        .parse::<u32>()
        .map_err(|_| format!("invalid height '{h}'"))?;
    if width == 0 || height == 0 {
        return Err("dimensions must be greater than zero".into());
    }
    Ok(Viewport::new(width, height))
}

pub fn parse_fps(value: &str) -> Result<f32, String> {
    let fps = value
        .trim()
        .parse::<f32>()
        .map_err(|_| format!("invalid FPS '{value}'"))?;
    if !fps.is_finite() || fps < 0.0 {
        return Err("FPS must be a non-negative number".into());
    }
    Ok(fps)
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn parses_sizes() {
        assert_eq!(parse_size("1920x1080").unwrap(), Viewport::new(1920, 1080));
        assert_eq!(parse_size(" 64X32 ").unwrap(), Viewport::new(64, 32));
        assert!(parse_size("1920").is_err());
        assert!(parse_size("0x10").is_err());
        assert!(parse_size("axb").is_err());
    }

    #[test]
    fn parses_fps() {
        assert_eq!(parse_fps("30").unwrap(), 30.0);
        assert_eq!(parse_fps("0").unwrap(), 0.0);
        assert!(parse_fps("-1").is_err());
        assert!(parse_fps("fast").is_err());
    }

    #[test]
    fn bare_invocation_runs_the_window() {
        let cli = Cli::try_parse_from(["ether", "--size", "800x600", "--fps", "24"]).unwrap();
        assert!(cli.command.is_none());
        assert_eq!(cli.run.size, Some(Viewport::new(800, 600)));
        assert_eq!(cli.run.config.fps, Some(24.0));
    }

    #[test]
    fn parses_snapshot_command() {
        let cli = Cli::try_parse_from([
            "ether",
            "snapshot",
            "--output",
            "out.png",
            "--colors",
            "#ff0000,#0000ff",
            "--profile",
            "simple",
            "--frames",
            "3",
        ])
        .unwrap();
        let Some(Command::Snapshot(args)) = cli.command else {
            panic!("expected snapshot command");
        };
        assert_eq!(args.output, PathBuf::from("out.png"));
        assert_eq!(args.size, Viewport::new(320, 180));
        assert_eq!(args.frames, 3);
        assert_eq!(
            args.config.colors,
            Some(vec!["#ff0000".to_string(), "#0000ff".to_string()])
        );
        assert_eq!(args.config.profile, Some(ProfileSetting::Simple));
    }

    #[test]
    fn rejects_unknown_profile() {
        assert!(Cli::try_parse_from(["ether", "css", "--profile", "ultra"]).is_err());
    }
}

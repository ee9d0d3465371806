mod config;

use std::error::Error;
use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};

use clap::{Parser, Subcommand};
use log::{info, warn};
use scan_core::codec::DecodedTree;
use scan_io::export::{read_archive, read_json, read_json_tree, ARCHIVE_FILE, JSON_FILE};
use scan_io::mock::{SimulatedArm, SyntheticCamera};
use scan_io::{ScanDriver, ScanSession, ScanSummary};

use crate::config::ScanConfig;

/// Capture and export stereo scans taken from a robotic arm.
#[derive(Debug, Parser)]
#[command(author, version, about = "Arm-mounted stereo scan capture")]
struct Cli {
    /// TOML configuration file. Defaults are used if omitted.
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Run a full grid scan against the simulated camera and arm
    Simulate {
        /// Exact output directory, overriding the configured one
        #[arg(short, long)]
        output: Option<PathBuf>,
        /// Stop after this many targets
        #[arg(long)]
        limit: Option<usize>,
    },
    /// Print the configured grid targets in millimetres
    Grid {
        /// Only print the number of targets
        #[arg(long)]
        count: bool,
    },
    /// Check an export directory for consistency
    Inspect { dir: PathBuf },
    /// Print the effective configuration as TOML
    Config,
}

fn main() {
    let cli = Cli::parse();
    let config = match &cli.config {
        Some(path) => ScanConfig::from_file(path),
        None => Ok(ScanConfig::default()),
    };
    let config = match config {
        Ok(config) => config,
        Err(err) => {
            eprintln!("error: {err}");
            std::process::exit(2);
        }
    };

    env_logger::Builder::from_env(
        env_logger::Env::default().default_filter_or(config.logging.level.as_str()),
    )
    .init();

    if let Err(err) = run(cli.command, &config) {
        eprintln!("error: {err}");
        std::process::exit(1);
    }
}

fn run(command: Command, config: &ScanConfig) -> Result<(), Box<dyn Error>> {
    match command {
        Command::Simulate { output, limit } => {
            let dir = output.unwrap_or_else(|| scan_directory(config));
            let summary = simulate(config, &dir, limit)?;
            println!(
                "{} frame pairs written to {} in {:.1}s",
                summary.frames,
                dir.display(),
                summary.elapsed.as_secs_f64()
            );
        }
        Command::Grid { count } => {
            let targets = config.grid.targets()?;
            if !count {
                for t in &targets {
                    println!("{:.0} {:.0} {:.0}", t.x, t.y, t.z);
                }
            }
            println!("{} targets", targets.len());
        }
        Command::Inspect { dir } => {
            let report = inspect(&dir)?;
            println!("{}", report);
        }
        Command::Config => print!("{}", config.to_toml()?),
    }
    Ok(())
}

fn scan_directory(config: &ScanConfig) -> PathBuf {
    if !config.session.timestamped {
        return config.session.output.clone();
    }
    let stamp = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or_default();
    config.session.output.join(format!("scan_{}", stamp))
}

fn simulate(
    config: &ScanConfig,
    dir: &Path,
    limit: Option<usize>,
) -> Result<ScanSummary, Box<dyn Error>> {
    let camera_config = &config.camera;
    let camera = SyntheticCamera::new(camera_config.width, camera_config.height)
        .with_baseline(camera_config.baseline)
        .with_auxiliary(camera_config.color, camera_config.depth);

    let mut session = ScanSession::with_options(dir, config.session.options)?;
    let mut driver = ScanDriver::with_options(camera, SimulatedArm::new(), config.driver);
    driver.prepare(&mut session)?;

    let targets = config.grid.targets()?;
    let total = limit.map_or(targets.len(), |n| n.min(targets.len()));
    info!("Scanning {} of {} grid targets", total, targets.len());

    let summary = driver.run(targets.into_iter().take(total), &mut session)?;
    session.materialize()?;
    Ok(summary)
}

/// Cross-checked contents of an export directory
#[derive(Debug)]
struct InspectReport {
    master: usize,
    views: Vec<usize>,
    dimensions: Vec<(u32, u32)>,
    missing_images: Vec<String>,
}

impl std::fmt::Display for InspectReport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "master camera: {}", self.master)?;
        for (i, (views, (w, h))) in self.views.iter().zip(&self.dimensions).enumerate() {
            writeln!(f, "camera {}: {} views, {}x{}", i, views, w, h)?;
        }
        write!(f, "missing images: {}", self.missing_images.len())
    }
}

fn inspect(dir: &Path) -> Result<InspectReport, Box<dyn Error>> {
    let json_path = dir.join(JSON_FILE);

    // untyped pass first so malformed arrays are reported by the codec
    let tree = read_json_tree(&json_path)?;
    let listed = tree
        .get("cameras")
        .and_then(DecodedTree::as_list)
        .map_or(0, <[DecodedTree]>::len);

    let document = read_json(&json_path)?;
    if listed != document.cameras.len() {
        return Err(format!(
            "{} lists {} cameras but {} parsed",
            JSON_FILE,
            listed,
            document.cameras.len()
        )
        .into());
    }

    let archive = read_archive(&dir.join(ARCHIVE_FILE))?;
    if archive != document {
        return Err(format!("{} and {} disagree", JSON_FILE, ARCHIVE_FILE).into());
    }
    if document.paired_view_count().is_none() {
        warn!("cameras have different numbers of views");
    }

    let missing_images: Vec<String> = document
        .cameras
        .iter()
        .flat_map(|c| &c.views)
        .filter(|v| !dir.join(&v.image_reference).is_file())
        .map(|v| v.image_reference.clone())
        .collect();
    for image in &missing_images {
        warn!("missing image {}", image);
    }

    Ok(InspectReport {
        master: document.master,
        views: document.cameras.iter().map(|c| c.views.len()).collect(),
        dimensions: document.cameras.iter().map(|c| c.image_dimensions).collect(),
        missing_images,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    fn small_config() -> ScanConfig {
        ScanConfig::from_toml(
            r#"
            [session]
            timestamped = false

            [grid]
            width = 20
            bottom = 690
            top = 700

            [camera]
            width = 16
            height = 12
            "#,
        )
        .unwrap()
    }

    #[test]
    fn test_cli_parses_subcommands() {
        let cli = Cli::try_parse_from(["scan", "simulate", "--limit", "3", "-o", "out"]).unwrap();
        assert!(matches!(
            cli.command,
            Command::Simulate { limit: Some(3), .. }
        ));

        let cli = Cli::try_parse_from(["scan", "inspect", "dir", "--config", "scan.toml"]).unwrap();
        assert_eq!(cli.config, Some(PathBuf::from("scan.toml")));

        let cli = Cli::try_parse_from(["scan", "config"]).unwrap();
        assert!(matches!(cli.command, Command::Config));
    }

    #[test]
    fn test_scan_directory_naming() {
        let mut config = small_config();
        config.session.output = PathBuf::from("/data");
        assert_eq!(scan_directory(&config), PathBuf::from("/data"));

        config.session.timestamped = true;
        let dir = scan_directory(&config);
        let name = dir.file_name().unwrap().to_str().unwrap();
        assert!(name.starts_with("scan_"), "{}", name);
    }

    #[test]
    fn test_simulate_then_inspect() {
        let dir = tempfile::tempdir().unwrap();
        let summary = simulate(&small_config(), dir.path(), Some(4)).unwrap();
        assert_eq!(summary.frames, 4);

        let report = inspect(dir.path()).unwrap();
        assert_eq!(report.master, 0);
        assert_eq!(report.views, vec![4, 4]);
        assert_eq!(report.dimensions, vec![(16, 12), (16, 12)]);
        assert!(report.missing_images.is_empty());
    }

    #[test]
    fn test_grid_command_rejects_edited_grid() {
        let mut config = small_config();
        config.grid.z_step = 0;
        assert!(run(Command::Grid { count: true }, &config).is_err());
    }

    #[test]
    fn test_inspect_reports_missing_images() {
        let dir = tempfile::tempdir().unwrap();
        simulate(&small_config(), dir.path(), None).unwrap();
        fs::remove_file(dir.path().join("ir2").join("00001.png")).unwrap();

        let report = inspect(dir.path()).unwrap();
        assert_eq!(report.views, vec![6, 6]);
        assert_eq!(report.missing_images, vec!["ir2/00001.png".to_string()]);
    }

    #[test]
    fn test_inspect_detects_archive_mismatch() {
        let dir = tempfile::tempdir().unwrap();
        simulate(&small_config(), dir.path(), Some(2)).unwrap();

        let other = tempfile::tempdir().unwrap();
        simulate(&small_config(), other.path(), Some(1)).unwrap();
        fs::copy(other.path().join(ARCHIVE_FILE), dir.path().join(ARCHIVE_FILE)).unwrap();

        assert!(inspect(dir.path()).is_err());
    }
}

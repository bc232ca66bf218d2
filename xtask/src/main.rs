use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::process::{exit, Command};

use clap::{Parser, Subcommand, ValueEnum};
use zip::write::FileOptions;
use zip::{CompressionMethod, ZipWriter};

/// Lambda binaries shipped by `serverless-package`, one archive each.
const LAMBDA_BINARIES: [&str; 3] = [
    "macro_lambda",
    "sequence_value_lambda",
    "s3_cleanup_lambda",
];

/// Entry name the `provided.al2023` Lambda runtime executes.
const BOOTSTRAP_ENTRY: &str = "bootstrap";

type TaskResult<T = ()> = Result<T, String>;

#[derive(Parser)]
#[command(
    name = "xtask",
    about = "Forge workspace automation: CI checks and Lambda packaging"
)]
struct Cli {
    #[command(subcommand)]
    command: Task,
}

#[derive(Subcommand)]
enum Task {
    /// Run the CI gate
    Ci {
        #[arg(value_enum, default_value_t = CiScope::All)]
        scope: CiScope,
    },
    /// Cross-build the Lambda binaries and zip each one as `bootstrap`
    ServerlessPackage {
        /// Target triple the Lambda runtime runs on
        #[arg(long, default_value = "x86_64-unknown-linux-gnu")]
        target: String,
        /// Build in debug mode instead of release
        #[arg(long)]
        debug: bool,
        /// Where the zip archives are written
        #[arg(long, default_value = "target/lambda")]
        out_dir: PathBuf,
    },
}

#[derive(Clone, Copy, ValueEnum)]
enum CiScope {
    /// rustfmt check and clippy with warnings denied
    Lint,
    /// Tests for every workspace crate
    Test,
    /// Lint, then test
    All,
}

fn cargo(label: &str, args: &[&str]) -> TaskResult {
    eprintln!("\n--- {label}: cargo {}", args.join(" "));
    let status = Command::new("cargo")
        .args(args)
        .status()
        .map_err(|error| format!("{label}: could not launch cargo: {error}"))?;
    if status.success() {
        Ok(())
    } else {
        Err(format!("{label}: cargo exited with {status}"))
    }
}

fn run_ci(scope: CiScope) -> TaskResult {
    if matches!(scope, CiScope::Lint | CiScope::All) {
        cargo("format", &["fmt", "--all", "--", "--check"])?;
        cargo(
            "clippy",
            &["clippy", "--workspace", "--all-targets", "--", "-D", "warnings"],
        )?;
    }
    if matches!(scope, CiScope::Test | CiScope::All) {
        cargo("test", &["test", "--workspace"])?;
    }
    Ok(())
}

/// `None` when rustup is unavailable; the build then reports a missing target
/// itself.
fn installed_targets() -> Option<Vec<String>> {
    let output = Command::new("rustup")
        .args(["target", "list", "--installed"])
        .output()
        .ok()
        .filter(|output| output.status.success())?;
    Some(
        String::from_utf8_lossy(&output.stdout)
            .lines()
            .map(|line| line.trim().to_string())
            .collect(),
    )
}

fn package_lambdas(target: &str, debug: bool, out_dir: &Path) -> TaskResult {
    if let Some(targets) = installed_targets() {
        if !targets.iter().any(|installed| installed == target) {
            return Err(format!(
                "rust target {target} is missing; add it with `rustup target add {target}`"
            ));
        }
    }

    let mut build = vec!["build", "-p", "forge_lambda", "--target", target];
    for binary in LAMBDA_BINARIES {
        build.extend(["--bin", binary]);
    }
    if !debug {
        build.push("--release");
    }
    cargo("build lambdas", &build)?;

    let profile = if debug { "debug" } else { "release" };
    let binaries_dir = Path::new("target").join(target).join(profile);
    fs::create_dir_all(out_dir)
        .map_err(|error| format!("cannot create {}: {error}", out_dir.display()))?;

    for binary in LAMBDA_BINARIES {
        let archive = out_dir.join(format!("{binary}.zip"));
        write_bootstrap_archive(&binaries_dir.join(binary), &archive)?;
        eprintln!("packaged {}", archive.display());
    }
    Ok(())
}

fn write_bootstrap_archive(binary: &Path, archive: &Path) -> TaskResult {
    let contents =
        fs::read(binary).map_err(|error| format!("cannot read {}: {error}", binary.display()))?;
    let zip_error = |error: &dyn std::fmt::Display| format!("{}: {error}", archive.display());

    let mut writer = ZipWriter::new(File::create(archive).map_err(|error| zip_error(&error))?);
    writer
        .start_file(
            BOOTSTRAP_ENTRY,
            FileOptions::default()
                .compression_method(CompressionMethod::Deflated)
                .unix_permissions(0o755),
        )
        .map_err(|error| zip_error(&error))?;
    writer
        .write_all(&contents)
        .map_err(|error| zip_error(&error))?;
    writer.finish().map_err(|error| zip_error(&error))?;
    Ok(())
}

fn main() {
    let result = match Cli::parse().command {
        Task::Ci { scope } => run_ci(scope),
        Task::ServerlessPackage {
            target,
            debug,
            out_dir,
        } => package_lambdas(&target, debug, &out_dir),
    };

    if let Err(message) = result {
        eprintln!("xtask failed: {message}");
        exit(1);
    }
}

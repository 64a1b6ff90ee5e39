use std::error::Error;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::process::{exit, Command, ExitStatus};

use clap::{Parser, Subcommand, ValueEnum};
use sha2::{Digest, Sha256};
use zip::write::FileOptions;
use zip::{CompressionMethod, ZipWriter};

// ── CLI definition ─────────────────────────────────────────────────

#[derive(Parser)]
#[command(
    name = "xtask",
    about = "Task runner for the signed-request canary workspace",
    long_about = "A unified CLI for synthesizing the canary stacks, packaging the\n\
                  canary Lambda, and running CI checks."
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Render the identity, storage and API stacks to CloudFormation templates
    Synth {
        /// Output directory for templates and manifest.json
        #[arg(long, default_value = "cdk.out")]
        out_dir: String,
    },
    /// Build and zip the canary Lambda as the API stack's code bundle
    LambdaPackage {
        /// Compilation target triple for the Lambda binary
        #[arg(long, default_value = "x86_64-unknown-linux-gnu")]
        target: String,
        /// Build profile used for the binary
        #[arg(value_enum, long, default_value_t = BuildProfile::Release)]
        profile: BuildProfile,
    },
    /// Run CI checks (fmt, clippy, tests, synth)
    Ci {
        /// Job to run
        #[arg(value_enum, default_value_t = CiJob::Check)]
        job: CiJob,
    },
}

#[derive(Clone, ValueEnum)]
enum CiJob {
    /// Formatting, clippy, and tests
    Check,
    /// Synthesize templates into a scratch directory
    Synth,
    /// Run check + synth
    All,
}

#[derive(Clone, Copy, ValueEnum)]
enum BuildProfile {
    Debug,
    Release,
}

impl BuildProfile {
    fn dir_name(self) -> &'static str {
        match self {
            Self::Debug => "debug",
            Self::Release => "release",
        }
    }

    fn as_cargo_flag(self) -> Option<&'static str> {
        match self {
            Self::Debug => None,
            Self::Release => Some("--release"),
        }
    }
}

// ── helpers ────────────────────────────────────────────────────────

const LAMBDA_DIST_DIR: &str = "dist/canary_lambda";
const LAMBDA_BIN: &str = "canary_lambda";
const CODE_KEY_PREFIX: &str = "canary";

type TaskResult<T> = Result<T, Box<dyn Error>>;

fn step(label: &str) {
    eprintln!("\n=== {label} ===");
}

fn cargo(args: &[&str]) -> ExitStatus {
    eprintln!("+ cargo {}", args.join(" "));
    Command::new("cargo")
        .args(args)
        .status()
        .expect("failed to execute cargo")
}

fn run_cargo(args: &[&str]) {
    let status = cargo(args);
    if !status.success() {
        exit(status.code().unwrap_or(1));
    }
}

fn synth(out_dir: &str) {
    step("Synthesize canary stacks");
    run_cargo(&[
        "run",
        "-p",
        "canary_infra_core",
        "--bin",
        "synth",
        "--",
        "--out-dir",
        out_dir,
    ]);
    eprintln!("\nTemplates written to {out_dir}");
}

/// Zip produced for the API stack's function, named by content hash so a new
/// build always lands under a new S3 key.
struct LambdaArtifact {
    zip_path: PathBuf,
    code_key: String,
}

fn package_canary_lambda(target: &str, profile: BuildProfile) -> TaskResult<LambdaArtifact> {
    require_linux_target(target)?;

    step("Build canary lambda binary");
    let mut cargo_args = vec![
        "build", "-p", LAMBDA_BIN, "--target", target, "--bin", LAMBDA_BIN,
    ];
    if let Some(flag) = profile.as_cargo_flag() {
        cargo_args.push(flag);
    }
    run_cargo(&cargo_args);

    step("Package bootstrap zip");
    let binary_path = Path::new("target")
        .join(target)
        .join(profile.dir_name())
        .join(LAMBDA_BIN);
    let binary = fs::read(&binary_path)
        .map_err(|error| format!("failed to read {}: {error}", binary_path.display()))?;

    let dist_dir = Path::new(LAMBDA_DIST_DIR);
    fs::create_dir_all(dist_dir)?;
    let zip_path = dist_dir.join("runtime.zip");
    write_bootstrap_zip(&binary, &zip_path)?;

    let digest = Sha256::digest(fs::read(&zip_path)?);
    Ok(LambdaArtifact {
        code_key: format!("{CODE_KEY_PREFIX}/{digest:x}.zip"),
        zip_path,
    })
}

// provided.al2023 only runs Linux executables.
fn require_linux_target(target: &str) -> TaskResult<()> {
    if !target.contains("-linux-") {
        return Err(format!("lambda target must be a linux triple, got `{target}`").into());
    }

    let output = Command::new("rustup")
        .args(["target", "list", "--installed"])
        .output();
    let Ok(output) = output else {
        eprintln!("warning: rustup not found; assuming `{target}` is available");
        return Ok(());
    };

    let installed = String::from_utf8_lossy(&output.stdout);
    if installed.lines().any(|line| line.trim() == target) {
        Ok(())
    } else {
        Err(format!("rust target `{target}` is missing; run `rustup target add {target}`").into())
    }
}

fn write_bootstrap_zip(binary: &[u8], zip_path: &Path) -> TaskResult<()> {
    let mut zip = ZipWriter::new(fs::File::create(zip_path)?);
    let options = FileOptions::default()
        .compression_method(CompressionMethod::Deflated)
        .unix_permissions(0o755);
    zip.start_file("bootstrap", options)?;
    zip.write_all(binary)?;
    zip.finish()?;
    Ok(())
}

// ── CI jobs ────────────────────────────────────────────────────────

fn ci_check() {
    step("Check formatting");
    run_cargo(&["fmt", "--all", "--", "--check"]);

    step("Clippy");
    run_cargo(&[
        "clippy",
        "--all-targets",
        "--all-features",
        "--",
        "-D",
        "warnings",
    ]);

    step("Test canary_infra_core");
    run_cargo(&["test", "-p", "canary_infra_core"]);

    step("Test canary_lambda");
    run_cargo(&["test", "-p", "canary_lambda"]);
}

fn ci_synth() {
    synth("target/ci-cdk.out");
}

// ── main ───────────────────────────────────────────────────────────

fn main() {
    let cli = Cli::parse();

    match cli.command {
        Commands::Synth { out_dir } => synth(&out_dir),
        Commands::LambdaPackage { target, profile } => {
            match package_canary_lambda(&target, profile) {
                Ok(artifact) => eprintln!(
                    "\nPackaged {}\nUpload it as s3://$CANARY_CODE_BUCKET/{} and synth with CANARY_CODE_KEY={}",
                    artifact.zip_path.display(),
                    artifact.code_key,
                    artifact.code_key,
                ),
                Err(error) => {
                    eprintln!("error: {error}");
                    exit(1);
                }
            }
        }
        Commands::Ci { job } => {
            match job {
                CiJob::Check => ci_check(),
                CiJob::Synth => ci_synth(),
                CiJob::All => {
                    ci_check();
                    ci_synth();
                }
            }
            eprintln!("\nCI job passed.");
        }
    }
}

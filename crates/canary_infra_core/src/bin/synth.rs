use std::path::PathBuf;

use canary_infra_core::assembly::assemble;
use canary_infra_core::config::AssemblyConfig;
use clap::Parser;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(
    name = "synth",
    about = "Render the canary stacks to CloudFormation templates"
)]
struct Args {
    /// Directory receiving `<Stack>.template.json` and `manifest.json`
    #[arg(long, default_value = "cdk.out")]
    out_dir: PathBuf,
    /// Overrides CANARY_REGION / AWS_REGION
    #[arg(long)]
    region: Option<String>,
    /// Overrides CANARY_ACCOUNT / CDK_DEFAULT_ACCOUNT
    #[arg(long)]
    account: Option<String>,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    let mut config = AssemblyConfig::from_env();
    if let Some(region) = args.region {
        config.region = region;
    }
    if let Some(account) = args.account {
        config.account = account;
    }

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_new(&config.log_level).unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let assembly = assemble(&config);
    let manifest = assembly.write_to(&args.out_dir)?;

    for entry in &manifest.stacks {
        tracing::info!(
            stack = %entry.stack_name,
            template = %entry.template_file,
            sha256 = %entry.template_sha256,
            "synthesized"
        );
    }
    Ok(())
}

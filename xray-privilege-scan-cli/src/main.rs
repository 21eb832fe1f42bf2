use std::path::{Path, PathBuf};
use std::process;

use anyhow::{Context, Result};
use chrono::Utc;
use clap::{Args, Parser, Subcommand};
use log::{info, LevelFilter};
use xray_privilege_scan_aws::AwsSources;
use xray_privilege_scan_core::{
    generate_from_traces, ExtractorRegistry, GeneratedPolicy, ScanConfig, ScanOutcome, Scanner,
    Trace, DEFAULT_TIME_RANGE_MINUTES,
};

mod output;

use output::{write_excess_permissions, write_policies, WrittenPolicy};

#[derive(Parser, Debug)]
#[command(
    name = "xray-privilege-scan",
    about = "Generate least-privilege IAM policies for Lambda functions from AWS X-Ray traces",
    version
)]
struct Cli {
    /// Output verbose logs to the console (info and above)
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Output debug logs to the console
    #[arg(long, global = true)]
    debug: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Scan X-Ray traces and write one policy file per function
    Scan(ScanArgs),

    /// Generate policies from a file of recorded traces, without calling AWS
    Generate(GenerateArgs),
}

#[derive(Args, Debug)]
struct ScanArgs {
    /// Start time as Unix timestamp (seconds since 1970-01-01 00:00:00 UTC).
    /// If left out will use: (current time - time range)
    #[arg(short, long, value_name = "TIMESTAMP", allow_negative_numbers = true)]
    start_time: Option<i64>,

    /// Time range in minutes to scan from start time
    #[arg(short = 'r', long, value_name = "MINUTES", default_value_t = DEFAULT_TIME_RANGE_MINUTES)]
    time_range: u32,

    /// Compare current role and generated roles. Output a json report
    #[arg(short, long)]
    compare: bool,

    /// Filter expression to use when scanning X-Ray
    #[arg(short, long, value_name = "EXPRESSION")]
    filter: Option<String>,

    /// Directory the policy files are written to
    #[arg(short, long, default_value = ".")]
    output_dir: PathBuf,

    /// AWS region, also used for calls whose region can't be derived from the trace
    #[arg(long, env = "AWS_REGION")]
    region: Option<String>,
}

#[derive(Args, Debug)]
struct GenerateArgs {
    /// JSON file with an array of traces in the BatchGetTraces shape
    #[arg(long, value_name = "FILE")]
    traces: PathBuf,

    /// Directory the policy files are written to
    #[arg(short, long, default_value = ".")]
    output_dir: PathBuf,

    /// Region for calls whose region can't be derived from the trace
    #[arg(long, env = "AWS_REGION")]
    region: Option<String>,
}

fn init_logging(verbose: bool, debug: bool) {
    let level = if debug {
        LevelFilter::Debug
    } else if verbose {
        LevelFilter::Info
    } else {
        LevelFilter::Error
    };
    // RUST_LOG still takes precedence when set
    env_logger::Builder::new()
        .filter_level(level)
        .parse_default_env()
        .init();
    info!("Console logging set to level: [{}]", level);
}

fn print_policies(written: &[WrittenPolicy]) {
    if written.is_empty() {
        println!("No IAM policies generated");
        return;
    }
    println!("Generated IAM policies based upon X-Ray scan:");
    for policy in written {
        println!("{} - {}", policy.arn, policy.file_name);
    }
}

fn scan_config(args: &ScanArgs) -> Result<ScanConfig> {
    let start_time = args
        .start_time
        .map(ScanConfig::start_time_from_unix)
        .transpose()?;
    let config = ScanConfig {
        start_time,
        time_range_minutes: args.time_range,
        filter_expression: args.filter.clone(),
        compare_existing_role: args.compare,
        default_region: args.region.clone(),
    };
    config.validate(Utc::now())?;
    Ok(config)
}

async fn run_scan(args: ScanArgs) -> Result<()> {
    let config = match scan_config(&args) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("\nError: {e:#}");
            process::exit(1);
        }
    };
    if config.compare_existing_role {
        info!("Enabling role comparison.");
    }

    let sources = AwsSources::from_env(args.region.clone())
        .await
        .context("Failed to load AWS configuration")?;
    let scanner = Scanner::new(ExtractorRegistry::new(), sources.traces)
        .with_comparison(sources.roles, sources.policies);
    let ScanOutcome {
        policies,
        excess_permissions,
    } = scanner
        .scan(&config, Utc::now())
        .await
        .context("Failed running scan")?;

    println!("Completed running X-Ray scan.");
    print_policies(&write_policies(&args.output_dir, &policies));

    if !excess_permissions.is_empty() {
        let path = write_excess_permissions(&args.output_dir, &excess_permissions)?;
        println!(
            "Found excessive permissions. Result written out to: {}",
            path.display()
        );
    } else if config.compare_existing_role {
        println!("No excessive permissions found.");
    }
    Ok(())
}

fn read_traces(path: &Path) -> Result<Vec<Trace>> {
    let json = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read traces file: {}", path.display()))?;
    Trace::list_from_json(&json)
        .with_context(|| format!("Failed to decode traces file: {}", path.display()))
}

fn run_generate(args: GenerateArgs) -> Result<()> {
    let traces = read_traces(&args.traces)?;
    info!("Loaded {} traces from {}", traces.len(), args.traces.display());

    let policies: Vec<GeneratedPolicy> =
        generate_from_traces(&ExtractorRegistry::new(), &traces, args.region.as_deref());
    print_policies(&write_policies(&args.output_dir, &policies));
    Ok(())
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    init_logging(cli.verbose, cli.debug);

    let result = match cli.command {
        Commands::Scan(args) => run_scan(args).await,
        Commands::Generate(args) => run_generate(args),
    };

    if let Err(e) = result {
        eprintln!("Unexpected Error: {e:#}");
        process::exit(1);
    }
}

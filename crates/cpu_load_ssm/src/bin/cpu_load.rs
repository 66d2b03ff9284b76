use anyhow::{Context, Result};
use chrono::{NaiveDate, Utc};
use clap::{Args, Parser, Subcommand};
use cpu_load_core::burn::run_load;
use cpu_load_core::contract::{prepare_send, request_fingerprint};
use cpu_load_core::cost::{render_cost_report, DateRange};
use cpu_load_core::payload::{
    render_script, LoadProfile, DEFAULT_CPU_PERCENT, DEFAULT_DURATION_SECS,
};
use cpu_load_core::report::{
    render_report, DEFAULT_ANALYSIS_FUNCTION, DEFAULT_REPORT_BUCKET, DEFAULT_REPORT_KEY,
};
use cpu_load_core::stale::render_stale_report;
use cpu_load_ssm::adapters::aws::{
    load_sdk_config, CostExplorerSource, Ec2ResourceInventory, LambdaAnalysisInvoker,
    S3ReportStore, SsmCommandSender,
};
use cpu_load_ssm::handlers::cost::fetch_cost_report;
use cpu_load_ssm::handlers::report::{fetch_idle_report, run_idle_analysis};
use cpu_load_ssm::handlers::send::handle_send;
use cpu_load_ssm::handlers::stale::scan_stale_resources;
use serde_json::json;
use tracing::info;
use tracing_subscriber::EnvFilter;

// ── CLI definition ─────────────────────────────────────────────────

#[derive(Parser)]
#[command(
    name = "cpu_load",
    version,
    about = "Push a CPU-load simulation to EC2 instances through SSM Run Command",
    long_about = "Sends a short busy-loop payload to a set of managed instances with\n\
                  AWS-RunShellScript, reads the idle-instance analysis the\n\
                  cost-optimisation Lambda publishes, and reports spend by\n\
                  service and stale EBS/EIP/snapshot resources."
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Submit the payload to the target instances (one SendCommand call)
    Send {
        /// Instance ids, comma or whitespace separated; may be repeated
        #[arg(
            long = "instance-ids",
            env = "CPU_LOAD_INSTANCE_IDS",
            num_args = 1..,
            required = true
        )]
        instance_ids: Vec<String>,
        /// Region hosting the instances
        #[arg(long, env = "AWS_REGION", default_value = "us-east-1")]
        region: String,
        #[command(flatten)]
        profile: ProfileArgs,
        /// Print the request instead of submitting it
        #[arg(long)]
        dry_run: bool,
    },
    /// Print the payload script
    Render {
        #[command(flatten)]
        profile: ProfileArgs,
    },
    /// Run the payload locally on this machine
    Burn {
        #[command(flatten)]
        profile: ProfileArgs,
    },
    /// Read the idle-instance analysis from S3
    IdleReport {
        #[arg(long, env = "IDLE_REPORT_BUCKET", default_value = DEFAULT_REPORT_BUCKET)]
        bucket: String,
        #[arg(long, env = "IDLE_REPORT_KEY", default_value = DEFAULT_REPORT_KEY)]
        key: String,
        /// Region of the bucket; defaults to the AWS provider chain
        #[arg(long, env = "AWS_REGION")]
        region: Option<String>,
    },
    /// Invoke the idle-instance analysis Lambda and print its report
    Analyze {
        #[arg(long, env = "IDLE_ANALYSIS_FUNCTION", default_value = DEFAULT_ANALYSIS_FUNCTION)]
        function_name: String,
        #[arg(long, env = "AWS_REGION")]
        region: Option<String>,
    },
    /// Print Cost Explorer spend by service over a date range
    CostReport {
        /// First day included (YYYY-MM-DD); defaults to seven days before --end
        #[arg(long)]
        start: Option<NaiveDate>,
        /// Day after the last one included (YYYY-MM-DD); defaults to today (UTC)
        #[arg(long)]
        end: Option<NaiveDate>,
        #[arg(long, env = "AWS_REGION")]
        region: Option<String>,
    },
    /// List unattached volumes, unassociated Elastic IPs and old snapshots
    StaleResources {
        #[arg(long, env = "AWS_REGION")]
        region: Option<String>,
    },
}

#[derive(Args)]
struct ProfileArgs {
    /// Length of the load window in seconds
    #[arg(long = "duration", env = "CPU_LOAD_DURATION_SECS", default_value_t = DEFAULT_DURATION_SECS)]
    duration_secs: u64,
    /// Target CPU utilisation for the busy phase
    #[arg(long, env = "CPU_LOAD_CPU_PERCENT", default_value_t = DEFAULT_CPU_PERCENT)]
    cpu_percent: u8,
}

impl ProfileArgs {
    fn profile(&self) -> Result<LoadProfile> {
        LoadProfile::new(self.duration_secs, self.cpu_percent).context("invalid load profile")
    }
}

// ── helpers ────────────────────────────────────────────────────────

fn init_tracing() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();
}

fn print_json(value: &impl serde::Serialize) -> Result<()> {
    let text = serde_json::to_string_pretty(value).context("failed to encode output")?;
    println!("{text}");
    Ok(())
}

// ── main ───────────────────────────────────────────────────────────

#[tokio::main]
async fn main() -> Result<()> {
    init_tracing();
    let cli = Cli::parse();

    match cli.command {
        Commands::Send {
            instance_ids,
            region,
            profile,
            dry_run,
        } => {
            let profile = profile.profile()?;
            let request = prepare_send(&instance_ids.join(","), &region, &profile)
                .context("refusing to build request")?;
            if dry_run {
                print_json(&json!({
                    "request": request,
                    "request_fingerprint": request_fingerprint(&request),
                }))?;
                return Ok(());
            }

            let sdk_config = load_sdk_config(Some(request.region.as_str())).await;
            let sender = SsmCommandSender::new(&sdk_config);
            let receipt = handle_send(&request, &sender)?;
            print_json(&receipt)?;
        }
        Commands::Render { profile } => {
            print!("{}", render_script(&profile.profile()?));
        }
        Commands::Burn { profile } => {
            let profile = profile.profile()?;
            info!(
                component = "burn",
                event = "burn_started",
                duration_secs = profile.duration_secs(),
                cpu_percent = profile.cpu_percent(),
            );
            let report = tokio::task::spawn_blocking(move || run_load(&profile))
                .await
                .context("local burn panicked")?;
            print_json(&report)?;
        }
        Commands::IdleReport {
            bucket,
            key,
            region,
        } => {
            let sdk_config = load_sdk_config(region.as_deref()).await;
            let store = S3ReportStore::new(&sdk_config);
            let report = fetch_idle_report(&store, &bucket, &key)?;
            print!("{}", render_report(&report, Utc::now()));
        }
        Commands::Analyze {
            function_name,
            region,
        } => {
            let sdk_config = load_sdk_config(region.as_deref()).await;
            let invoker = LambdaAnalysisInvoker::new(&sdk_config);
            let report = run_idle_analysis(&invoker, &function_name)?;
            print!("{}", render_report(&report, Utc::now()));
        }
        Commands::CostReport { start, end, region } => {
            let range = DateRange::resolve(start, end, Utc::now().date_naive())
                .context("invalid cost report range")?;
            let sdk_config = load_sdk_config(region.as_deref()).await;
            let source = CostExplorerSource::new(&sdk_config);
            let report = fetch_cost_report(&source, range)?;
            print!("{}", render_cost_report(&report));
        }
        Commands::StaleResources { region } => {
            let sdk_config = load_sdk_config(region.as_deref()).await;
            let inventory = Ec2ResourceInventory::new(&sdk_config);
            let report = scan_stale_resources(&inventory, Utc::now())?;
            print!("{}", render_stale_report(&report));
        }
    }

    Ok(())
}

use std::process::{exit, Command, ExitStatus};

use clap::{Parser, Subcommand, ValueEnum};

// ── CLI definition ─────────────────────────────────────────────────

#[derive(Parser)]
#[command(
    name = "xtask",
    about = "Task runner for the cpu-load workspace",
    long_about = "A unified CLI for CI checks, payload timing tests, and release\n\
                  builds of the cpu_load binary."
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run CI checks (fmt, clippy, tests)
    Ci {
        /// Job to run
        #[arg(value_enum, default_value_t = CiJob::Check)]
        job: CiJob,
    },
    /// Run the 30 second payload timing tests (ignored tests in cpu_load_core)
    LoadTest,
    /// Print the payload script with the default profile
    Render,
    /// Build the cpu_load binary with the release profile
    Release,
}

#[derive(Clone, ValueEnum)]
enum CiJob {
    /// Formatting, clippy, and tests
    Check,
    /// Timing tests
    Load,
    /// Run check + load
    All,
}

// ── helpers ────────────────────────────────────────────────────────

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

    step("Test cpu_load_core");
    run_cargo(&["test", "-p", "cpu_load_core"]);

    step("Test cpu_load_ssm");
    run_cargo(&["test", "-p", "cpu_load_ssm"]);
}

fn ci_load() {
    step("Run payload timing tests");
    run_cargo(&[
        "test",
        "-p",
        "cpu_load_core",
        "--test",
        "load_tests",
        "--",
        "--ignored",
    ]);
}

// ── main ───────────────────────────────────────────────────────────

fn main() {
    let cli = Cli::parse();

    match cli.command {
        Commands::Ci { job } => {
            match job {
                CiJob::Check => ci_check(),
                CiJob::Load => ci_load(),
                CiJob::All => {
                    ci_check();
                    ci_load();
                }
            }
            eprintln!("\nCI job passed.");
        }
        Commands::LoadTest => ci_load(),
        Commands::Render => {
            run_cargo(&["run", "-q", "-p", "cpu_load_ssm", "--bin", "cpu_load", "--", "render"]);
        }
        Commands::Release => {
            step("Build cpu_load binary");
            run_cargo(&["build", "--release", "-p", "cpu_load_ssm", "--bin", "cpu_load"]);
            eprintln!("\nBinary: target/release/cpu_load");
        }
    }
}

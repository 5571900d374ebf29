use anyhow::Result;
use clap::{Parser, Subcommand};
use std::process::Command;

#[derive(Parser)]
#[command(name = "xtask", about = "Workspace automation for runway")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run fmt, clippy, tests, docs and a simulation smoke run
    Check,
    /// Run cargo fmt --check on all crates
    Fmt,
    /// Run clippy on all crates
    Clippy,
    /// Run all tests
    Test,
    /// Build rustdoc for the workspace
    Doc,
    /// Run the window benchmarks in release mode
    Bench,
    /// Run a short seeded simulation through runway-cli
    Smoke {
        #[arg(long, default_value = "2000")]
        ticks: u64,
        #[arg(long, default_value = "7")]
        seed: u64,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Check => {
            cargo("fmt", &["fmt", "--all", "--", "--check"])?;
            cargo(
                "clippy",
                &["clippy", "--workspace", "--all-targets", "--", "-D", "warnings"],
            )?;
            cargo("test", &["test", "--workspace"])?;
            cargo("doc", &["doc", "--workspace", "--no-deps"])?;
            smoke(2000, 7)?;
        }
        Commands::Fmt => cargo("fmt", &["fmt", "--all", "--", "--check"])?,
        Commands::Clippy => cargo(
            "clippy",
            &["clippy", "--workspace", "--all-targets", "--", "-D", "warnings"],
        )?,
        Commands::Test => cargo("test", &["test", "--workspace"])?,
        Commands::Doc => cargo("doc", &["doc", "--workspace", "--no-deps"])?,
        Commands::Bench => cargo(
            "bench",
            &["bench", "-p", "runway-stream", "--bench", "bench_window"],
        )?,
        Commands::Smoke { ticks, seed } => smoke(ticks, seed)?,
    }

    Ok(())
}

fn smoke(ticks: u64, seed: u64) -> Result<()> {
    let ticks = ticks.to_string();
    let seed = seed.to_string();
    cargo(
        "smoke simulation",
        &[
            "run",
            "-p",
            "runway-cli",
            "--",
            "simulate",
            "--ticks",
            &ticks,
            "--seed",
            &seed,
            "--reset-every",
            "750",
        ],
    )
}

fn cargo(step: &str, args: &[&str]) -> Result<()> {
    println!("==> Running cargo {step}");
    let status = Command::new("cargo").args(args).status()?;
    if !status.success() {
        anyhow::bail!("cargo {step} failed");
    }
    Ok(())
}

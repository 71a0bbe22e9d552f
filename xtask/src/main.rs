use anyhow::Result;
use clap::{Parser, Subcommand};
use cubot_core::session::SessionConfig;
use std::path::PathBuf;
use std::process::Command;

#[derive(Parser)]
#[command(name = "xtask")]
#[command(about = "Tasks for the project", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Build the project
    Build,
    /// Run the test suite
    Test,
    /// Run the CLI
    Run {
        /// Arguments passed to the CLI
        #[arg(trailing_var_arg = true)]
        args: Vec<String>,
    },
    /// Run the terminal UI
    Tui,
    /// Write a default session configuration
    Config {
        #[arg(default_value = "cubot.toml")]
        path: PathBuf,
        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },
}

fn cargo(args: &[&str], what: &str) -> Result<()> {
    let status = Command::new("cargo").args(args).status()?;
    if !status.success() {
        anyhow::bail!("{what} failed");
    }
    Ok(())
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    match &cli.command {
        Commands::Build => {
            println!("Building project...");
            cargo(&["build", "--workspace"], "Build")?;
        }
        Commands::Test => {
            println!("Testing project...");
            cargo(&["test", "--workspace"], "Tests")?;
        }
        Commands::Run { args } => {
            println!("Running CLI...");
            let mut full = vec!["run", "-p", "cubot-cli", "--"];
            full.extend(args.iter().map(String::as_str));
            cargo(&full, "Run")?;
        }
        Commands::Tui => {
            cargo(&["run", "-p", "cubot-tui"], "TUI")?;
        }
        Commands::Config { path, force } => {
            if path.exists() && !force {
                anyhow::bail!("{} exists, use --force to overwrite", path.display());
            }
            SessionConfig::default().save_to_file(path)?;
            println!("Wrote {}", path.display());
        }
    }

    Ok(())
}

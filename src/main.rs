use std::path::PathBuf;

use clap::{Parser, Subcommand};

mod build;
mod commands;
mod config;
mod logging;

#[derive(Parser)]
#[command(version, about)]
struct Args {
    /// Increase log verbosity (-v for debug, -vv for trace)
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,

    /// The command to execute
    #[command(subcommand)]
    command: SitepipeCommand,
}

#[derive(Parser)]
struct InitArgs {
    /// The path to initialize the site in
    path: PathBuf,

    /// Whether to create the directory if it doesn't exist
    #[arg(short, long, default_value = "false")]
    create: bool,
}

#[derive(Parser)]
struct BuildArgs {
    /// The path to the configuration file
    #[arg(short, long, default_value = "sitepipe.yaml")]
    config_file: Option<PathBuf>,

    /// Override the input directory from the config file
    #[arg(short, long)]
    input: Option<PathBuf>,

    /// Override the output directory from the config file
    #[arg(short, long)]
    output: Option<PathBuf>,
}

#[derive(Parser)]
struct CleanArgs {
    /// The path to the configuration file
    #[arg(short, long, default_value = "sitepipe.yaml")]
    config_file: Option<PathBuf>,

    /// Only print what would be deleted
    #[arg(long, default_value = "false")]
    dry_run: bool,
}

#[derive(Subcommand)]
enum SitepipeCommand {
    /// Initialize a new site with sample templates and a post
    Init(InitArgs),

    /// Build the site
    Build(BuildArgs),

    /// Delete the built site
    Clean(CleanArgs),
}

#[tokio::main]
async fn main() -> Result<(), anyhow::Error> {
    let args = Args::parse();
    logging::init(args.verbose);

    match args.command {
        SitepipeCommand::Init(args) => {
            commands::init::run(&args).await?;
        }
        SitepipeCommand::Build(args) => {
            commands::build::run(&args).await?;
        }
        SitepipeCommand::Clean(args) => {
            commands::clean::run(&args).await?;
        }
    }

    Ok(())
}

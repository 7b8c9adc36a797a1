use clap::{CommandFactory, Parser, Subcommand};
use std::path::PathBuf;
use std::process::ExitCode;
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

mod commands;
mod context;
mod format;

#[cfg(test)]
#[path = "main_tests.rs"]
mod tests;

/// SaaS Herder - deployment bookkeeping for a fleet of services
///
/// Verifies that the images referenced by processed templates exist in their
/// registries and generates changelogs between revisions of the tracking
/// repository.
#[derive(Parser, Debug)]
#[command(name = "saasherder")]
#[command(version, about, long_about = None)]
struct Cli {
    /// Config file for saas herder
    #[arg(short, long, global = true, default_value = "config.yaml")]
    config: PathBuf,

    /// Context to use
    #[arg(long, global = true)]
    context: Option<String>,

    /// Verbose output (can be repeated: -v, -vv, -vvv)
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Control colored output: auto, always, never
    #[arg(long, global = true, default_value = "auto")]
    color: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Check that every image in a processed manifest exists in its registry
    CheckImage {
        /// Processed template or List manifest
        manifest: PathBuf,
        /// Only accept images matching this regular expression
        #[arg(long)]
        pattern: Option<String>,
        /// Look images up with `skopeo inspect` instead of the registry APIs
        #[arg(long)]
        skopeo: bool,
    },
    /// Generate a changelog between two revisions of the tracking repository
    Changelog {
        /// Output format: plain, markdown, html
        #[arg(short, long, default_value = "plain")]
        format: String,
        /// Directory for service clones (default: _workspace)
        #[arg(long)]
        workspace: Option<PathBuf>,
        /// Commit, branch or date
        old: String,
        /// Commit, branch or date
        new: String,
    },
    /// Print a field of the services in the current context
    Get {
        /// Field to print
        #[arg(value_parser = ["path", "url", "hash", "hash_length", "template-url"])]
        field: String,
        /// Services to query (default: all)
        services: Vec<String>,
    },
    /// Validate container resources of a template
    Validate {
        /// Template file
        template: PathBuf,
    },
    /// Extract info from the configuration file
    Config {
        #[command(subcommand)]
        command: ConfigCommands,
    },
    /// Generate shell completion scripts
    Completion {
        /// Shell to generate completion for
        #[arg(value_enum)]
        shell: clap_complete::Shell,
    },
}

#[derive(Subcommand, Debug)]
enum ConfigCommands {
    /// Print the list of contexts in the configuration file
    GetContexts,
}

fn init_tracing(verbose: u8) {
    let filter = match verbose {
        0 => EnvFilter::new("warn"),
        1 => EnvFilter::new("info"),
        2 => EnvFilter::new("debug"),
        _ => EnvFilter::new("trace"),
    };

    tracing_subscriber::registry()
        .with(fmt::layer().with_target(false).with_writer(std::io::stderr))
        .with(filter)
        .init();
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    if let Commands::Completion { shell } = cli.command {
        let mut cmd = Cli::command();
        let bin_name = cmd.get_name().to_string();
        clap_complete::generate(shell, &mut cmd, bin_name, &mut std::io::stdout());
        return ExitCode::SUCCESS;
    }

    // Build context with precedence: defaults > config file > env vars > CLI flags
    let color = format::ColorChoice::from(cli.color.as_str());
    let ctx = match context::AppContext::build(&cli.config, cli.context, color) {
        Ok(ctx) => ctx,
        Err(e) => {
            eprintln!("Error: {}", e);
            return ExitCode::FAILURE;
        }
    };
    let formatter = format::create_formatter(ctx.color);

    let result = match cli.command {
        Commands::CheckImage {
            manifest,
            pattern,
            skopeo,
        } => {
            commands::check_image::handle_check_image(
                &ctx,
                formatter.as_ref(),
                &manifest,
                pattern.as_deref(),
                skopeo,
                commands::check_image::ctrl_c(),
            )
            .await
        }
        Commands::Changelog {
            format,
            workspace,
            old,
            new,
        } => commands::changelog::handle_changelog(&ctx, &old, &new, &format, workspace)
            .await
            .map(|report| {
                print!("{}", report);
                true
            }),
        Commands::Get { field, services } => {
            commands::get::handle_get(&ctx, &field, &services).map(|()| true)
        }
        Commands::Validate { template } => {
            commands::validate::handle_validate(formatter.as_ref(), &template)
        }
        Commands::Config { command } => match command {
            ConfigCommands::GetContexts => {
                commands::config::handle_get_contexts(&ctx);
                Ok(true)
            }
        },
        Commands::Completion { .. } => Ok(true),
    };

    match result {
        Ok(true) => ExitCode::SUCCESS,
        Ok(false) => ExitCode::FAILURE,
        Err(e) => {
            eprintln!("Error: {}", e);
            ExitCode::FAILURE
        }
    }
}

//! codecell CLI
//!
//! Runs a source file through the same dispatcher the library exposes and
//! prints the result as text, JSON or HTML fragments.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use codecell::{Config, Dispatcher, EXAMPLE_CONFIG, ExecutionResult, present};
use tracing::{Level, debug, info};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "codecell")]
#[command(about = "Run code snippets and explain their failures")]
#[command(version)]
struct Cli {
    /// Path to configuration file
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Initialize a new configuration file
    Init {
        /// Output path (default: codecell.toml)
        #[arg(short, long, default_value = "codecell.toml")]
        output: PathBuf,

        /// Overwrite existing file
        #[arg(short, long)]
        force: bool,
    },

    /// Run a source file
    Run {
        /// Source file to run
        #[arg(value_name = "FILE")]
        source: PathBuf,

        /// Language ID (e.g., python, javascript, java)
        #[arg(short, long)]
        language: String,

        /// Default wall time limit in seconds
        #[arg(short, long)]
        time_limit: Option<f64>,

        #[command(flatten)]
        format: OutputFormat,
    },

    /// List available languages
    Languages,

    /// Show the effective configuration
    ShowConfig,
}

#[derive(Args)]
#[group(multiple = false)]
struct OutputFormat {
    /// Print the result as JSON
    #[arg(long)]
    json: bool,

    /// Print the rendered HTML fragments
    #[arg(long)]
    html: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let filter = if cli.verbose {
        EnvFilter::from_default_env().add_directive(Level::DEBUG.into())
    } else {
        EnvFilter::from_default_env().add_directive(Level::INFO.into())
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    if let Commands::Init { output, force } = &cli.command {
        return init_config(output, *force).await;
    }

    // Load configuration, then CODECELL_* overrides
    if let Some(ref path) = cli.config {
        info!(?path, "loading configuration");
    } else {
        debug!("using default configuration");
    }
    let config = Config::load(cli.config.as_deref()).context("failed to load configuration")?;

    match cli.command {
        Commands::Init { .. } => Ok(()),
        Commands::Run {
            source,
            language,
            time_limit,
            format,
        } => run_source(config, &source, &language, time_limit, &format).await,
        Commands::Languages => {
            list_languages(&config);
            Ok(())
        }
        Commands::ShowConfig => {
            show_config(&config);
            Ok(())
        }
    }
}

async fn run_source(
    mut config: Config,
    source: &Path,
    language: &str,
    time_limit: Option<f64>,
    format: &OutputFormat,
) -> Result<()> {
    if let Some(seconds) = time_limit {
        anyhow::ensure!(
            seconds.is_finite() && seconds > 0.0,
            "time limit must be a positive number of seconds"
        );
        config.default_limits.wall_time_limit = Some(seconds);
    }

    let source_text = tokio::fs::read_to_string(source)
        .await
        .with_context(|| format!("failed to read source file '{}'", source.display()))?;

    info!(language, "running program");
    let dispatcher = Dispatcher::new(config);
    let result = dispatcher.dispatch(language, &source_text).await;

    if format.json {
        let json = serde_json::to_string_pretty(&result).context("failed to serialize result")?;
        println!("{json}");
    } else if format.html {
        let rendered = present(&result);
        println!("{}", rendered.output);
        if let Some(error) = rendered.error {
            println!("{error}");
        }
    } else {
        print_text(&result);
    }

    info!(
        category = result.error_category.map(|c| c.as_str()).unwrap_or("none"),
        line = result.line_number,
        "execution result"
    );

    if result.is_success() {
        Ok(())
    } else {
        std::process::exit(1);
    }
}

/// Program output on stdout, failure details on stderr
fn print_text(result: &ExecutionResult) {
    print!("{}", result.stdout);

    if result.is_success() {
        if !result.stderr.is_empty() {
            eprint!("{}", result.stderr);
        }
        return;
    }

    let category = result.error_category.map(|c| c.as_str()).unwrap_or("error");
    match result.diagnostic {
        Some(ref diagnostic) => {
            eprintln!("{category} error: {}", diagnostic.header());
            for line in &diagnostic.context_lines {
                let marker = if line.is_offending { '>' } else { ' ' };
                eprintln!("{marker}{:>4} | {}", line.line_number, line.text);
            }
            if diagnostic.line == 0 {
                eprintln!("(location unknown)");
            }
        }
        None => eprintln!("{category} error: {}", result.stderr.trim_end()),
    }
}

fn list_languages(config: &Config) {
    println!("Available languages:\n");

    for id in config.language_ids() {
        if let Ok(lang) = config.get_language(id) {
            println!("  {:<15} {} ({})", id, lang.name, lang.strategy);
        }
    }
}

fn show_config(config: &Config) {
    println!("Default resource limits:");
    println!(
        "  Wall time limit: {:?} s",
        config.default_limits.wall_time_limit
    );
    println!("  Max output: {:?} KB", config.default_limits.max_output);
    println!();
    println!("Max concurrent requests: {}", config.max_concurrent);
    match config.workspace_root() {
        Some(root) => println!("Workspace root: {}", root.display()),
        None => println!("Workspace root: {}", std::env::temp_dir().display()),
    }
    println!();
    println!("Languages configured: {}", config.languages.len());
}

async fn init_config(output: &Path, force: bool) -> Result<()> {
    if output.exists() && !force {
        anyhow::bail!(
            "Configuration file already exists at '{}'. Use --force to overwrite.",
            output.display()
        );
    }

    tokio::fs::write(output, EXAMPLE_CONFIG)
        .await
        .context("failed to write configuration file")?;

    println!("Created configuration file at '{}'", output.display());
    Ok(())
}

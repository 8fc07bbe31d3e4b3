//! `tabledata` command line tool.
//!
//! Renders request plans to SQL and derives response headers, for checking
//! what a plan will do before wiring it to a data source.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing::info;
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

use tabledata::headers::response_headers;
use tabledata::{LoaderConfig, PredicateRenderer, RequestDescriptor, RequestPlan, SqlRenderer};

#[derive(Parser)]
#[command(name = "tabledata")]
#[command(about = "Render table-data request plans")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Validate a plan and print the rendered SQL with its bound values.
    Render {
        /// Path to a JSON request plan.
        #[arg(value_name = "PLAN")]
        plan: PathBuf,

        /// Inline values into the SQL text.
        #[arg(long)]
        inline: bool,
    },
    /// Print the response headers a plan would produce.
    Headers {
        /// Path to a JSON request plan.
        #[arg(value_name = "PLAN")]
        plan: PathBuf,

        /// Total entry count to report.
        #[arg(long, default_value = "0")]
        total: u64,
    },
}

fn main() -> Result<()> {
    // Load .env file if present
    dotenvy::dotenv().ok();

    init_tracing();

    let config = LoaderConfig::from_env().context("failed to load configuration")?;
    let cli = Cli::parse();

    match cli.command {
        Command::Render { plan, inline } => {
            let request = load_plan(&plan)?;
            request.validate()?;
            let rendered = SqlRenderer::new(config.master_key.as_str())
                .inline(inline)
                .render(&request)?;
            println!("{}", serde_json::to_string_pretty(&rendered)?);
        }
        Command::Headers { plan, total } => {
            let request = load_plan(&plan)?;
            let headers = response_headers(&request, total);
            println!("{}", serde_json::to_string_pretty(&headers)?);
        }
    }

    Ok(())
}

fn load_plan(path: &Path) -> Result<RequestDescriptor> {
    let text = fs::read_to_string(path)
        .with_context(|| format!("failed to read plan {}", path.display()))?;
    let plan: RequestPlan = serde_json::from_str(&text)
        .with_context(|| format!("failed to parse plan {}", path.display()))?;
    info!(path = %path.display(), steps = plan.steps.len(), "loaded plan");
    Ok(plan.into_descriptor())
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("tabledata=info"));

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_writer(std::io::stderr))
        .init();
}

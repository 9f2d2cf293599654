use anyhow::Result;
use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;
use tracing_subscriber::prelude::*;

mod cmd;

#[derive(Parser)]
#[command(name = "pagesmith")]
#[command(version, about = "Generate, publish, and report static apps for task briefs")]
pub struct Cli {
    /// Log filter used when RUST_LOG is unset (e.g. "info", "pagesmith=debug")
    #[arg(long, default_value = "info", global = true)]
    pub log: String,

    #[arg(long, value_enum, default_value_t = LogFormat::Text, global = true)]
    pub log_format: LogFormat,

    /// Optional TOML config file; environment variables take precedence
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Clone, Copy, ValueEnum)]
pub enum LogFormat {
    Text,
    Json,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Run the HTTP service
    Serve {
        #[arg(long, default_value = "0.0.0.0")]
        host: String,

        #[arg(short, long, default_value = "8000")]
        port: u16,
    },
    /// Generate the app files for a brief into a local directory
    Generate {
        #[arg(long)]
        brief: String,

        /// A check the app must satisfy (repeatable)
        #[arg(long = "check")]
        checks: Vec<String>,

        /// Attachment name to mention in the prompt (repeatable)
        #[arg(long = "attachment")]
        attachments: Vec<String>,

        /// Output directory
        #[arg(short, long, default_value = "site")]
        out: PathBuf,
    },
}

fn init_tracing(filter: &str, format: LogFormat) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(filter));
    let registry = tracing_subscriber::registry().with(filter);
    match format {
        LogFormat::Text => registry.with(tracing_subscriber::fmt::layer()).init(),
        LogFormat::Json => registry
            .with(tracing_subscriber::fmt::layer().json())
            .init(),
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();
    init_tracing(&cli.log, cli.log_format);

    match &cli.command {
        Commands::Serve { host, port } => {
            cmd::cmd_serve(cli.config.as_deref(), host, *port).await?;
        }
        Commands::Generate {
            brief,
            checks,
            attachments,
            out,
        } => {
            cmd::cmd_generate(cli.config.as_deref(), brief, checks, attachments, out).await?;
        }
    }

    Ok(())
}

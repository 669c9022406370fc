use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing::info;
use tracing_subscriber::EnvFilter;
use vidscribe::{create_router, AppState, Config, Pipeline};

#[derive(Parser)]
#[command(name = "vidscribe")]
#[command(about = "Transcribe the audio track of online videos")]
struct Args {
    /// Config file (TOML); missing file means defaults
    #[arg(short, long, default_value = "config/vidscribe")]
    config: String,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
    /// Run the HTTP API (default)
    Serve,
    /// Transcribe one URL and print the text
    Transcribe {
        /// Video URL
        url: String,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    let cfg = Config::load(&args.config)?;

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(&cfg.service.log_level)),
        )
        .init();

    let pipeline = Pipeline::from_config(&cfg);
    info!("Work directory: {}", pipeline.work_dir().display());

    match args.command.unwrap_or(Command::Serve) {
        Command::Serve => serve(&cfg, pipeline).await,
        Command::Transcribe { url } => {
            let result = pipeline.transcribe(&url).await?;
            println!("{}", result.text);
            Ok(())
        }
    }
}

async fn serve(cfg: &Config, pipeline: Pipeline) -> Result<()> {
    let addr = format!("{}:{}", cfg.service.http.bind, cfg.service.http.port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;

    info!("{} listening on {}", cfg.service.name, addr);

    axum::serve(listener, create_router(AppState::new(pipeline)))
        .await
        .context("HTTP server error")?;

    Ok(())
}

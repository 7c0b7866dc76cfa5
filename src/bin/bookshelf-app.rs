use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use clap::Parser;

use bookshelf::app::{AppState, DEFAULT_MAX_UPLOAD_BYTES, router};
use bookshelf::cache::{BookCache, DEFAULT_CAPACITY};
use bookshelf::completion::{CompletionClient, CompletionConfig};
use bookshelf::ingest::{CommandIngestor, Ingestor, UploadIntake};
use bookshelf::library::Library;

const DEFAULT_PORT: u16 = 8123;

#[derive(Debug, Parser)]
#[command(author, version, about)]
struct AppArgs {
    /// Listen address (default: 0.0.0.0:$PORT, PORT defaults to 8123).
    #[arg(long)]
    addr: Option<SocketAddr>,

    /// Book store root (default: $BOOKS_DIR, then the current directory).
    #[arg(long)]
    books_dir: Option<PathBuf>,

    /// Number of parsed books kept in memory.
    #[arg(long, default_value_t = DEFAULT_CAPACITY)]
    cache_capacity: usize,

    /// Largest accepted upload, in MiB.
    #[arg(long, default_value_t = DEFAULT_MAX_UPLOAD_BYTES / (1024 * 1024))]
    max_upload_mb: usize,
}

impl AppArgs {
    fn listen_addr(&self) -> SocketAddr {
        if let Some(addr) = self.addr {
            return addr;
        }
        let port = std::env::var("PORT")
            .ok()
            .and_then(|v| v.trim().parse::<u16>().ok())
            .unwrap_or(DEFAULT_PORT);
        SocketAddr::from(([0, 0, 0, 0], port))
    }

    fn books_dir(&self) -> PathBuf {
        self.books_dir
            .clone()
            .or_else(|| {
                std::env::var("BOOKS_DIR")
                    .ok()
                    .map(|v| v.trim().to_string())
                    .filter(|v| !v.is_empty())
                    .map(PathBuf::from)
            })
            .unwrap_or_else(|| PathBuf::from("."))
    }
}

#[tokio::main]
async fn main() -> std::process::ExitCode {
    if let Err(err) = try_main().await {
        eprintln!("{err:#}");
        return std::process::ExitCode::FAILURE;
    }
    std::process::ExitCode::SUCCESS
}

async fn try_main() -> anyhow::Result<()> {
    bookshelf::logging::init(bookshelf::logging::SERVER_DEFAULT_FILTER)?;

    let args = AppArgs::parse();
    tracing::info!(?args, "starting bookshelf-app");

    let books_dir = args.books_dir();
    if !books_dir.is_dir() {
        anyhow::bail!("books dir is not a directory: {}", books_dir.display());
    }

    let cache = Arc::new(BookCache::new(books_dir.clone(), args.cache_capacity));
    let library = Library::with_cache(Arc::clone(&cache));

    let completion_config = CompletionConfig::from_env();
    if completion_config.api_key.is_none() {
        tracing::warn!("BOOKSHELF_COMPLETION_API_KEY is not set; /api/chat will report a configuration error");
    }
    let completion = Arc::new(CompletionClient::new(completion_config)?);

    let ingestor = CommandIngestor::from_env().map(|ingestor| {
        tracing::info!(program = %ingestor.program, "using ingest command");
        Arc::new(ingestor) as Arc<dyn Ingestor>
    });
    if ingestor.is_none() {
        tracing::warn!("BOOKSHELF_INGEST_COMMAND is not set; uploads are disabled");
    }
    let uploads = UploadIntake::new(books_dir.clone(), cache, ingestor);

    let state = AppState {
        library,
        completion,
        uploads,
    };
    let app = router(state, args.max_upload_mb.saturating_mul(1024 * 1024));

    let addr = args.listen_addr();
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .map_err(|err| anyhow::anyhow!("bind {addr}: {err}"))?;
    tracing::info!(addr = %addr, books_dir = %books_dir.display(), "listening");
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;
    Ok(())
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        tracing::warn!(?err, "failed to listen for ctrl-c");
        std::future::pending::<()>().await;
    }
    tracing::info!("shutting down");
}

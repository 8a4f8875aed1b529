use std::net::SocketAddr;
use std::process;

use clap::Parser;
use tracing_subscriber::EnvFilter;

#[derive(Debug, Parser)]
#[command(name = "codesheet-server", about = "HTTP front end for code sheet generation")]
struct Args {
    /// Address the server listens on.
    #[arg(long, env = "CODESHEET_ADDR", default_value = "127.0.0.1:8080")]
    addr: SocketAddr,

    /// Log filter when RUST_LOG is not set.
    #[arg(long, env = "CODESHEET_LOG", default_value = "info")]
    log: String,
}

#[tokio::main]
async fn main() {
    let args = Args::parse();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&args.log)),
        )
        .init();

    if let Err(err) = run(args).await {
        eprintln!("server error: {err}");
        process::exit(1);
    }
}

async fn run(args: Args) -> Result<(), std::io::Error> {
    let listener = tokio::net::TcpListener::bind(args.addr).await?;
    tracing::info!(addr = %args.addr, "listening");
    axum::serve(listener, codesheet::http::router().into_make_service()).await
}

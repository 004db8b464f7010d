//! ttylink client binary entry point.

use clap::Parser;
use tracing::{error, info};

use ttylink_client::{Cli, PlainTerminal, StdioTerminal, TermKind, WsConnectionFactory};
use ttylink_core::terminal::Terminal;
use ttylink_core::{init_logging, Session};

fn main() {
    let cli = Cli::parse();

    if let Err(e) = init_logging(cli.verbose, cli.log_file.as_deref(), cli.log_format.into()) {
        eprintln!("Failed to initialize logging: {e}");
        std::process::exit(1);
    }

    info!(version = env!("CARGO_PKG_VERSION"), "ttylink client starting");

    let rt = tokio::runtime::Runtime::new().expect("Failed to create tokio runtime");
    let result = rt.block_on(run_client(cli));

    if let Err(e) = result {
        error!(error = %e, "session failed");
        eprintln!("ttylink: {e}");
        std::process::exit(1);
    }
}

async fn run_client(cli: Cli) -> ttylink_core::Result<()> {
    let endpoint = cli.endpoint_url();
    info!(endpoint, "connecting");
    let factory = WsConnectionFactory::new(endpoint);

    match cli.term {
        TermKind::Stdio => run_session(StdioTerminal::new()?, factory, &cli).await,
        TermKind::Plain => run_session(PlainTerminal::new(), factory, &cli).await,
    }
}

async fn run_session<T: Terminal + 'static>(
    terminal: T,
    factory: WsConnectionFactory,
    cli: &Cli,
) -> ttylink_core::Result<()> {
    let session = Session::new(terminal, factory, cli.args.clone(), cli.auth_token.clone());
    let handle = session.open();

    let closer = handle.closer();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("interrupt received, closing session");
            closer.close();
        }
    });

    handle.wait().await
}

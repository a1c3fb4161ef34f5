//! Entry point for the `httpfs` file server.

use std::path::PathBuf;
use std::sync::Arc;

use clap::Parser;
use httpfs_core::Config;
use httpfs_executor::LocalFsBackend;
use httpfs_gateway::server::SHUTDOWN_GRACE;
use httpfs_gateway::{shutdown_signal, FileServer};
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

/// `--cfg` value that writes a template instead of serving.
const TEMPLATE_SENTINEL: &str = "default";

/// Where the template is written.
const TEMPLATE_PATH: &str = "default.json";

#[derive(Parser, Debug)]
#[command(name = "httpfs", version, about = "Sandboxed file access over HTTP")]
struct Args {
    /// File containing program settings. If set to 'default', a template
    /// config file is written to 'default.json'.
    #[arg(long = "cfg", env = "HTTPFS_CONFIG", default_value = "config.json")]
    cfg: PathBuf,
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let args = Args::parse();

    if args.cfg.as_os_str() == TEMPLATE_SENTINEL {
        if let Err(e) = Config::default_template().save(TEMPLATE_PATH) {
            eprintln!("fatal error writing template: {e}");
            std::process::exit(1);
        }
        println!("Default template config file written to '{TEMPLATE_PATH}'.");
        return;
    }

    let config = match Config::open(&args.cfg) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("fatal error opening config '{}': {e}", args.cfg.display());
            std::process::exit(1);
        }
    };

    let server = match FileServer::new(&config, Arc::new(LocalFsBackend::new())) {
        Ok(s) => s,
        Err(e) => {
            error!(error = %e, "failed to configure server");
            std::process::exit(1);
        }
    };
    let handle = server.handle();
    let mut serving = tokio::spawn(server.serve());

    tokio::select! {
        joined = &mut serving => {
            // The server only stops on its own when it failed to start.
            match joined {
                Ok(Ok(())) => return,
                Ok(Err(_)) => std::process::exit(1),
                Err(e) => {
                    error!(error = %e, "server task panicked");
                    std::process::exit(1);
                }
            }
        }
        () = shutdown_signal() => {}
    }

    handle.shutdown(SHUTDOWN_GRACE);
    match serving.await {
        Ok(Ok(())) => info!("shutdown complete"),
        Ok(Err(e)) => error!(error = %e, "error during shutdown"),
        Err(e) => error!(error = %e, "server task panicked during shutdown"),
    }
}

use std::path::PathBuf;
use std::process;

use anyhow::Result;
use clap::Parser;
use tracing::error;

use api_gateway::rest::shutdown_signal;
use model_service::ModelService;
use service_config::ServiceConfig;

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// TOML configuration file, layered between the defaults and the environment
    #[arg(long, env = "MODEL_SERVICE_CONFIG", value_name = "FILE")]
    config: Option<PathBuf>,

    /// Overrides the configured port
    #[arg(long)]
    port: Option<u16>,

    /// Overrides the configured host
    #[arg(long)]
    host: Option<String>,
}

impl Args {
    fn apply(self, config: &mut ServiceConfig) {
        if let Some(port) = self.port {
            config.port = port;
        }
        if let Some(host) = self.host {
            config.host = host;
        }
    }
}

#[tokio::main]
async fn main() {
    let args = Args::parse();

    let mut config = match ServiceConfig::load(args.config.as_deref()) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("FATAL: {}", e);
            process::exit(1);
        }
    };
    args.apply(&mut config);

    let guard = match logging::init(&config.logging) {
        Ok(guard) => guard,
        Err(e) => {
            eprintln!("FATAL: {}", e);
            process::exit(1);
        }
    };

    let result = serve(config).await;
    if let Err(e) = &result {
        error!("FATAL: {:#}", e);
    }

    // Flush buffered log lines before exiting
    drop(guard);

    if result.is_err() {
        process::exit(1);
    }
}

async fn serve(config: ServiceConfig) -> Result<()> {
    let service = ModelService::bootstrap(config).await?;
    service.run(shutdown_signal()).await
}

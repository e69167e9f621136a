use clap::{Args, Parser};
use std::io::Read;
use std::path::{Path, PathBuf};
use std::process::ExitCode;

mod config;
mod observability;

#[derive(Args)]
struct ConfigArgs {
    /// Path to the YAML configuration file
    #[arg(long, default_value = "provisioner.yaml")]
    config: PathBuf,
}

#[derive(Parser)]
enum CliCommand {
    /// Serve upload events over HTTP
    Serve(ConfigArgs),
    /// Process one upload event and print the result as JSON
    Invoke {
        #[command(flatten)]
        config: ConfigArgs,
        /// Event document to process, `-` reads stdin
        #[arg(long)]
        event: PathBuf,
    },
}

fn main() -> ExitCode {
    let cli = CliCommand::parse();
    let config_path = match &cli {
        CliCommand::Serve(args) => &args.config,
        CliCommand::Invoke { config, .. } => &config.config,
    };

    let config = match config::Config::from_file(config_path) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Error loading {}: {e}", config_path.display());
            return ExitCode::FAILURE;
        }
    };

    // Sentry has to be set up before the runtime starts its threads
    let _sentry = observability::init_logging(&config.logging);
    if let Some(metrics_config) = &config.metrics {
        if let Err(e) = observability::init_metrics(metrics_config) {
            tracing::error!("Metrics disabled: {e}");
        }
    }

    let rt = match tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
    {
        Ok(rt) => rt,
        Err(e) => {
            tracing::error!("Failed to start runtime: {e}");
            return ExitCode::FAILURE;
        }
    };

    match cli {
        CliCommand::Serve(_) => {
            tracing::info!("Starting provisioner service");
            if let Err(e) = rt.block_on(dashboards::run(config.provisioner)) {
                tracing::error!("Service stopped: {e}");
                return ExitCode::FAILURE;
            }
            ExitCode::SUCCESS
        }
        CliCommand::Invoke { event, .. } => {
            let body = match read_event(&event) {
                Ok(body) => body,
                Err(e) => {
                    tracing::error!("Could not read event {}: {e}", event.display());
                    return ExitCode::FAILURE;
                }
            };

            let result = rt.block_on(dashboards::invoke(&config.provisioner, &body));
            match serde_json::to_string(&result) {
                Ok(json) => println!("{json}"),
                Err(e) => {
                    tracing::error!("Could not serialize result: {e}");
                    return ExitCode::FAILURE;
                }
            }

            if result.is_success() {
                ExitCode::SUCCESS
            } else {
                ExitCode::FAILURE
            }
        }
    }
}

fn read_event(path: &Path) -> std::io::Result<Vec<u8>> {
    if path.as_os_str() == "-" {
        let mut body = Vec::new();
        std::io::stdin().read_to_end(&mut body)?;
        return Ok(body);
    }
    std::fs::read(path)
}

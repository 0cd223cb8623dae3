use clap::Parser;
use labrag::cli;
use labrag::cli::print_error;
use labrag::cli::Cli;
use labrag::config::AppConfig;
use tracing::error;
use tracing::info;

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    // Load configuration
    let config = match AppConfig::load_from(cli.config.as_deref()) {
        Ok(config) => config,
        Err(e) => {
            print_error(&format!("Failed to load configuration: {e}"));
            std::process::exit(2);
        }
    };

    // Initialize logging
    let logging = if cli.verbose {
        labrag::logging::init_logging_with_level(Some(&config), "debug")
    } else {
        labrag::logging::init_logging_with_config(Some(&config))
    };
    if let Err(e) = logging {
        eprintln!("Failed to initialize logging: {e}");
    }
    info!("Configuration loaded successfully");

    if let Err(e) = cli::run(cli, &config).await {
        error!("{}", e);
        print_error(&e.to_string());
        std::process::exit(1);
    }
}

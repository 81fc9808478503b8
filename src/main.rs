//! HTTP Load Tester - Main CLI Application

use clap::Parser;
use http_load_tester::{app::App, cli::Cli, config::EnvManager, error::AppError};
use std::path::Path;
use std::process;

#[tokio::main]
async fn main() {
    std::panic::set_hook(Box::new(|panic_info| {
        eprintln!("Application panic: {}", panic_info);
        process::exit(1);
    }));

    // The .env file must be loaded before parsing so HLT_URL satisfies the url check.
    let env_loaded = EnvManager::load_env_file(Path::new(".env"));

    let cli = Cli::parse();
    let use_color = cli.use_colors();

    let result = match (env_loaded, cli.validate()) {
        (Err(e), _) => Err(e),
        (Ok(_), Err(message)) => Err(AppError::config(message)),
        (Ok(_), Ok(())) => App::new(cli).run().await,
    };

    if let Err(e) = result {
        eprintln!("{}", e.format_for_console(use_color));
        if let Some(suggestion) = e.suggestion() {
            eprintln!("  {}", suggestion);
        }
        print_error_suggestions(&e);
        process::exit(e.exit_code());
    }
}

/// Print helpful suggestions for common errors
fn print_error_suggestions(error: &AppError) {
    match error {
        AppError::Config(_) => {
            eprintln!();
            eprintln!("Configuration help:");
            eprintln!("  - Set a target with --url or HLT_URL");
            eprintln!("  - Bound the run with --requests or --duration");
            eprintln!("  - Check the HLT_* variables in your .env file");
        }
        AppError::Network(_) | AppError::DnsResolution(_) => {
            eprintln!();
            eprintln!("Network troubleshooting:");
            eprintln!("  - Check that the target is reachable");
            eprintln!("  - Try --dns-servers with a public resolver");
        }
        _ => {}
    }
}

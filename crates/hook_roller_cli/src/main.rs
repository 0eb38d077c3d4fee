use clap::Parser;
use tracing::{error, info};

use hook_roller_cli::args::Cli;
use hook_roller_cli::config::load_env_file;
use hook_roller_cli::errors::{EXIT_CONFIG_ERROR, EXIT_SUCCESS};
use hook_roller_cli::logging::init_logging;
use hook_roller_cli::{report, run};

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let env_file = match load_env_file(cli.env_file.as_deref()) {
        Ok(path) => path,
        Err(e) => {
            eprintln!("Error: {e}");
            std::process::exit(EXIT_CONFIG_ERROR);
        }
    };

    // Parse again so the env fallbacks see values from the env file.
    let cli = Cli::parse();
    init_logging(cli.log_format);

    if let Some(path) = env_file {
        info!(path = %path.display(), "Loaded settings from env file");
    }

    let code = match run(&cli).await {
        Ok(run_report) => match report::render(&run_report, cli.output) {
            Ok(output) => {
                print!("{output}");
                EXIT_SUCCESS
            }
            Err(e) => {
                error!(error = %e, "Failed to write report");
                e.exit_code()
            }
        },
        Err(e) => {
            eprintln!("Error: {e}");
            e.exit_code()
        }
    };

    std::process::exit(code);
}

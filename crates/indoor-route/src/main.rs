// The binary uses the library, not duplicate modules
use indoor_route::{Settings, logging, run, write_error};

fn main() -> std::process::ExitCode {
    let settings = Settings::from_cli();
    logging::setup_logging(settings.verbose);

    let stdout = std::io::stdout();
    let mut out = stdout.lock();
    match run(&settings, &mut out) {
        Ok(()) => std::process::ExitCode::SUCCESS,
        Err(e) => {
            tracing::debug!("Query failed: {:?}", e);
            if let Err(io) = write_error(&e, settings.json, &mut std::io::stderr()) {
                tracing::error!("Failed to report error: {}", io);
            }
            std::process::ExitCode::FAILURE
        }
    }
}

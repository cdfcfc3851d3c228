//! DiGA FHIR adapter executable
//!
//! Converts the four FHIR XML documents of a DiGA directory export into a
//! single JSON document. See the `cli` module for the available options.

use std::process::ExitCode;

use diga_fhir_adapter::cli::fallback_log_level;
use diga_fhir_adapter::{EXIT_SUCCESS, init_tracing, resolve_args, run, usage};
use tracing::error;

fn main() -> ExitCode {
    let config = match resolve_args(std::env::args_os()) {
        Ok(config) => config,
        Err(usage_error) => {
            init_tracing(&fallback_log_level());
            if usage_error.is_error() {
                error!("{}", usage_error);
            }
            print!("{}", usage());
            return ExitCode::from(EXIT_SUCCESS);
        }
    };

    init_tracing(&config.log_level);

    match run(&config) {
        Ok(()) => ExitCode::from(EXIT_SUCCESS),
        Err(e) => {
            error!("{}", e);
            ExitCode::from(e.exit_code())
        }
    }
}

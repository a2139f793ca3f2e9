use std::process::ExitCode;

use edge::cli;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

fn main() -> ExitCode {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));

    // Logs go to stderr; stdout carries query output.
    tracing_subscriber::registry()
        .with(filter)
        .with(
            fmt::layer()
                .with_writer(std::io::stderr)
                .with_file(true)
                .with_line_number(true),
        )
        .init();

    cli::start()
}

// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

use std::process::ExitCode;

use print_fulfillment::{config::AppConfig, server};

#[tokio::main]
async fn main() -> ExitCode {
    let config = match AppConfig::from_env() {
        Ok(config) => config,
        Err(e) => {
            // Tracing is configured from AppConfig, so this goes to stderr directly
            eprintln!("ERROR: {e}");
            return ExitCode::FAILURE;
        }
    };

    server::init_tracing(config.log_format);

    match server::run(config).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!(error = %e, "Print fulfillment server failed");
            ExitCode::FAILURE
        }
    }
}

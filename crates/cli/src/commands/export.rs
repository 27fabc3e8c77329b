use std::fs;
use std::path::Path;

use stairbooks_core::config::{AppConfig, LoadOptions};
use stairbooks_core::export::write_cis_csv;
use stairbooks_db::{connect_with_settings, migrations, CisLedger, SqlCisLedger};

use crate::commands::CommandResult;

pub fn run(out: Option<&Path>) -> CommandResult {
    let config = match AppConfig::load(LoadOptions::default()) {
        Ok(config) => config,
        Err(error) => {
            return CommandResult::failure(
                "cis-export",
                "config_validation",
                format!("configuration issue: {error}"),
                2,
            );
        }
    };

    let runtime = match tokio::runtime::Builder::new_current_thread().enable_all().build() {
        Ok(runtime) => runtime,
        Err(error) => {
            return CommandResult::failure(
                "cis-export",
                "runtime_init",
                format!("failed to initialize async runtime: {error}"),
                3,
            );
        }
    };

    let records = runtime.block_on(async {
        let pool = connect_with_settings(
            &config.database.url,
            config.database.max_connections,
            config.database.timeout_secs,
        )
        .await
        .map_err(|error| ("db_connectivity", error.to_string(), 4u8))?;
        migrations::run_pending(&pool)
            .await
            .map_err(|error| ("migration", error.to_string(), 5u8))?;
        let ledger = SqlCisLedger::new(pool.clone());
        let records =
            ledger.list().await.map_err(|error| ("ledger_read", error.to_string(), 5u8))?;
        pool.close().await;
        Ok::<_, (&'static str, String, u8)>(records)
    });

    let records = match records {
        Ok(records) => records,
        Err((error_class, message, exit_code)) => {
            return CommandResult::failure("cis-export", error_class, message, exit_code);
        }
    };

    let mut buffer = Vec::new();
    if let Err(error) = write_cis_csv(&records, &mut buffer) {
        return CommandResult::failure("cis-export", "csv_write", error.to_string(), 5);
    }

    match out {
        Some(path) => {
            if let Err(error) = fs::write(path, &buffer) {
                return CommandResult::failure(
                    "cis-export",
                    "write_output",
                    format!("could not write `{}`: {error}", path.display()),
                    5,
                );
            }
            CommandResult::success(
                "cis-export",
                format!("exported {} CIS record(s) to `{}`", records.len(), path.display()),
            )
        }
        // Raw CSV on stdout so the output can be piped straight into a file
        // or spreadsheet import.
        None => CommandResult {
            exit_code: 0,
            output: String::from_utf8_lossy(&buffer).trim_end().to_string(),
        },
    }
}

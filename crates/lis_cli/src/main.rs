//! CLI smoke entry point.
//!
//! # Responsibility
//! - Verify `lis_core` wiring against a real database file.
//! - Keep output deterministic for quick local sanity checks.

use lis_core::{
    core_version, init_logging, open_db, CoreConfig, PatientService, WorkOrderService,
};
use std::process::ExitCode;

fn main() -> ExitCode {
    match run() {
        Ok(()) => ExitCode::SUCCESS,
        Err(message) => {
            eprintln!("lis_cli error: {message}");
            ExitCode::FAILURE
        }
    }
}

fn run() -> Result<(), String> {
    let config = CoreConfig::from_env()?;
    if let Some(log_dir) = &config.log_dir {
        init_logging(config.log_level.as_str(), &log_dir.to_string_lossy())?;
    }

    let db = open_db(&config.db_path).map_err(|err| err.to_string())?;
    let patients = PatientService::new(db.clone())
        .get_all()
        .map_err(|err| err.to_string())?;
    let work_orders = WorkOrderService::new(db)
        .get_all()
        .map_err(|err| err.to_string())?;

    log::info!(
        "event=cli_probe module=cli status=ok patients={} work_orders={}",
        patients.len(),
        work_orders.len()
    );
    println!("lis_core version={}", core_version());
    println!("db_path={}", config.db_path.display());
    println!("patients={}", patients.len());
    println!("work_orders={}", work_orders.len());
    Ok(())
}

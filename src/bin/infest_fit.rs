use env_logger::Env;
use infest::batch::table::read_table;
use infest::config::fit::load_config;
use infest::fit::{fit_all, group_series, write_report};
use log::info;
use std::env;
use std::error::Error;
use std::path::Path;

fn main() {
    env_logger::Builder::from_env(Env::default().default_filter_or("info")).init();
    if let Err(err) = run() {
        eprintln!("Error: {err}");
        std::process::exit(1);
    }
}

fn run() -> Result<(), Box<dyn Error>> {
    let config_path = env::args().nth(1).ok_or_else(usage)?;
    let config = load_config(Path::new(&config_path))?;

    let rows = read_table(&config.table)?;
    let series = group_series(&rows);
    info!("{} rows, {} samples in {}", rows.len(), series.len(), config.table.display());
    let report = fit_all(&series, &config.params);
    for path in write_report(&config.prefix, &report)? {
        info!("wrote {}", path.display());
    }
    Ok(())
}

fn usage() -> String {
    "Usage: infest_fit <config.json>".to_string()
}

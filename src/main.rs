use env_logger::Env;
use infest::batch::{run_batch, table, FileImageSource};
use infest::config::quantify::load_config;
use infest::error::ConfigError;
use infest::fit::{fit_all, group_series, write_report};
use infest::image::io::write_json_file;
use infest::panel::Layout;
use log::{info, warn};
use std::env;
use std::error::Error;
use std::path::Path;
use std::sync::Arc;

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

    let frames = config.frames()?;
    if frames.is_empty() {
        warn!("no frames found; nothing to do");
        return Ok(());
    }
    let layout_path = config
        .layout_path(&frames)
        .ok_or(ConfigError::MissingLayout)?;
    let layout = Arc::new(Layout::load(&layout_path)?);
    info!("layout {} with {} samples", layout_path.display(), layout.len());

    let output = run_batch(&frames, layout, &FileImageSource, &config.batch)?;
    let table_path = config.table_path(&frames);
    table::write_table(&table_path, &output.rows)?;
    info!("wrote {} rows to {}", output.rows.len(), table_path.display());
    if !output.artifacts.is_empty() {
        info!("wrote review images for {} leaves", output.artifacts.len());
    }
    info!(
        "frame work {:.1} ms over {:.1} ms wall clock",
        output.timing.stage_sum_ms(),
        output.timing.total_ms
    );
    if let Some(path) = &config.output.timing_json {
        write_json_file(path, &output.timing)?;
    }

    if let Some(fit) = &config.fit {
        let report = fit_all(&group_series(&output.rows), &fit.params);
        for path in write_report(&fit.prefix, &report)? {
            info!("wrote {}", path.display());
        }
    }
    Ok(())
}

fn usage() -> String {
    "Usage: infest <config.json>".to_string()
}

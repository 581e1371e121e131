use std::path::Path;

use serde_json::json;
use tracing::info;

use deskbook::config::Config;
use deskbook::engine::BookingEngine;
use deskbook::model::ResourceRecord;

/// A missing catalogue is an empty one.
fn load_catalogue(path: &Path) -> Result<Vec<ResourceRecord>, Box<dyn std::error::Error>> {
    match std::fs::read(path) {
        Ok(bytes) => Ok(serde_json::from_slice(&bytes)?),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            tracing::warn!(path = %path.display(), "no resource catalogue, starting empty");
            Ok(Vec::new())
        }
        Err(e) => Err(e.into()),
    }
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    deskbook::observability::init_tracing();

    let config = Config::from_env();
    std::fs::create_dir_all(&config.data_dir)?;

    let records = load_catalogue(&config.resources_path())?;
    let mut engine = BookingEngine::open(&config.journal_path())?;
    engine.load_resources(records);

    info!("deskbook maintenance");
    info!("  data_dir: {}", config.data_dir.display());
    info!("  resources: {}", engine.resources().len());
    info!("  active reservations: {}", engine.allocator().active_count());
    info!("  ledger entries: {}", engine.ledger().len());

    let stale = engine.stale_journal_records();
    if stale >= config.compact_threshold {
        info!(stale, threshold = config.compact_threshold, "compacting journal");
        engine.compact()?;
    }

    let report = json!({
        "sort": config.sort,
        "ranking": engine.ranked_sites(config.sort),
        "bookings_by_site": engine.booking_counts_by_site(),
        "revenue_by_site": engine.revenue_by_site(),
        "active_reservations": engine.allocator().active_count(),
        "ledger_entries": engine.ledger().len(),
    });
    println!("{}", serde_json::to_string_pretty(&report)?);
    Ok(())
}

//! Plain-text and JSON output of a loaded dataset.

use std::fmt::Write as _;
use std::io::Write as _;
use std::path::Path;

use erb_map_analytics_models::AggregateStats;
use erb_map_ingest_models::LoadedDataset;

/// Writes the dataset as pretty JSON to `output`, or stdout.
///
/// # Errors
///
/// Returns an error if serialization or the write fails.
pub fn write_dataset(
    dataset: &LoadedDataset,
    output: Option<&Path>,
) -> Result<(), Box<dyn std::error::Error>> {
    let json = serde_json::to_string_pretty(dataset)?;
    if let Some(path) = output {
        std::fs::write(path, json)?;
        log::info!("Wrote dataset to {}", path.display());
    } else {
        let mut stdout = std::io::stdout().lock();
        stdout.write_all(json.as_bytes())?;
        stdout.write_all(b"\n")?;
    }
    Ok(())
}

/// Renders the summary statistics as a text report.
#[must_use]
pub fn render_stats(stats: &AggregateStats) -> String {
    if stats.is_empty() {
        return "No records.\n".to_string();
    }

    let mut out = String::new();
    let totals = stats.totals;
    let _ = writeln!(
        out,
        "Records: {} ({} originated, {} received)",
        totals.processed, totals.originated, totals.received
    );

    let _ = writeln!(out, "\nCalls by time of day:");
    for (label, count) in stats.hourly.labeled() {
        let _ = writeln!(out, "  {label:<8} {count}");
    }

    let _ = writeln!(
        out,
        "\nTop interlocutors (more than {:.2} calls):",
        stats.interlocutors.threshold
    );
    for entry in &stats.interlocutors.retained {
        let _ = writeln!(out, "  {:<16} {}", entry.line, entry.count);
    }

    let _ = writeln!(out, "\nCities:");
    for city in &stats.cities {
        let _ = writeln!(out, "  {:<30} {}", city.city, city.count);
    }

    let _ = writeln!(out, "\nTrips:");
    for trip in &stats.trips {
        let date = trip
            .date
            .map_or_else(|| "-".to_string(), |d| d.format("%d/%m/%Y").to_string());
        let _ = writeln!(out, "  {:<30} {date}", trip.city);
    }

    let _ = writeln!(out, "\nOvernight sectors:");
    for site in &stats.overnight {
        let address = site.representative.address.as_deref().unwrap_or("");
        let _ = writeln!(
            out,
            "  {}, Az. {} ({address}) {}",
            site.label, site.azimuth, site.count
        );
    }

    let _ = writeln!(out, "\nArea codes:");
    for group in &stats.area_codes {
        let _ = writeln!(out, "  DDD {}: {}", group.code, group.numbers.join(", "));
    }

    let skipped = stats.skipped;
    let _ = writeln!(
        out,
        "\nLeft out: {} without time, {} without interlocutor, {} without city, \
         {} overnight without sector, {} numbers without area code",
        skipped.missing_time,
        skipped.missing_interlocutor,
        skipped.missing_city,
        skipped.missing_sector,
        skipped.ineligible_number
    );

    out
}

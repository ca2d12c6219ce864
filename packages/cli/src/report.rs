//! Terminal and file output for pipeline results.

use std::fs::File;
use std::io::BufWriter;
use std::path::Path;

use geo_profile_ingest::Dataset;
use geo_profile_models::RenderPayload;

/// Rows shown in the dataset preview.
const PREVIEW_ROWS: usize = 5;

pub fn print_dataset(path: &Path, dataset: &Dataset) {
    println!(
        "Loaded '{}': {} records, {} valid, {} dropped ({} malformed)",
        path.display(),
        dataset.records,
        dataset.points.len(),
        dataset.dropped,
        dataset.malformed
    );
    println!();
    println!("Data preview");
    println!("  {:>12}  {:>12}", "latitude", "longitude");
    for c in dataset.preview(PREVIEW_ROWS) {
        println!("  {:>12.6}  {:>12.6}", c.latitude, c.longitude);
    }
    println!();
}

pub fn print_hotspots(payload: &RenderPayload) {
    println!("Top {} most probable hotspots:", payload.peaks.len());
    println!(
        "  {:>4}  {:>12}  {:>12}  Approximate address",
        "Rank", "Latitude", "Longitude"
    );
    for row in payload.hotspots() {
        println!(
            "  {:>4}  {:>12}  {:>12}  {}",
            row.rank, row.latitude, row.longitude, row.address
        );
    }
    println!();
    println!(
        "Map center: ({:.6}, {:.6})",
        payload.center.latitude, payload.center.longitude
    );
}

/// Writes the render payload as pretty-printed JSON.
///
/// # Errors
///
/// Returns an error if the file cannot be created or written.
pub fn write_payload(path: &Path, payload: &RenderPayload) -> Result<(), Box<dyn std::error::Error>> {
    serde_json::to_writer_pretty(BufWriter::new(File::create(path)?), payload)?;
    log::info!("Wrote render payload to {}", path.display());
    Ok(())
}

/// Writes the `GeoJSON` map layer.
///
/// # Errors
///
/// Returns an error if the file cannot be created or written.
pub fn write_geojson(path: &Path, payload: &RenderPayload) -> Result<(), Box<dyn std::error::Error>> {
    serde_json::to_writer_pretty(BufWriter::new(File::create(path)?), &payload.to_geojson())?;
    log::info!("Wrote GeoJSON layer to {}", path.display());
    Ok(())
}

#[cfg(test)]
mod tests {
    use geo_profile_models::{Address, Coordinate, Peak, PointSet};
    use tempfile::TempDir;

    use super::*;

    fn payload() -> RenderPayload {
        RenderPayload {
            center: Coordinate::new(-23.5505, -46.6305),
            points: PointSet::from_pairs(&[(-23.550, -46.630), (-23.551, -46.631)]).unwrap(),
            peaks: vec![Peak {
                latitude: -23.5505,
                longitude: -46.6305,
                density: 42.0,
            }],
            addresses: vec![Address::Found("Rua Augusta".to_string())],
        }
    }

    fn read_json(path: &Path) -> serde_json::Value {
        serde_json::from_reader(File::open(path).unwrap()).unwrap()
    }

    #[test]
    fn payload_file_matches_serialized_payload() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("payload.json");

        write_payload(&path, &payload()).unwrap();

        assert_eq!(read_json(&path), serde_json::to_value(payload()).unwrap());
    }

    #[test]
    fn geojson_file_holds_cases_and_hotspots() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("hotspots.geojson");

        write_geojson(&path, &payload()).unwrap();

        let json = read_json(&path);
        assert_eq!(json["type"], "FeatureCollection");
        assert_eq!(json["features"].as_array().unwrap().len(), 3);
        assert_eq!(json["zoom"], 14);
    }

    #[test]
    fn unwritable_path_is_an_error() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("missing-dir").join("payload.json");
        assert!(write_payload(&path, &payload()).is_err());
    }
}

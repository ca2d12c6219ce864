//! Render-ready output of one pipeline run.
//!
//! The map renderer is an external collaborator: it receives a
//! [`RenderPayload`] (as JSON or as a `GeoJSON` layer) and draws case
//! markers as small filled circles and hotspot markers with a popup that
//! carries the rank and resolved address.

use geojson::{Feature, FeatureCollection, Geometry, JsonObject};
use serde::Serialize;
use serde_json::json;

use crate::{Address, Coordinate, Peak, PointSet};

/// Initial zoom level suggested to the map renderer.
pub const DEFAULT_ZOOM: u8 = 14;

/// Everything the map view needs for one run.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RenderPayload {
    /// Mean of all case coordinates.
    pub center: Coordinate,
    /// Case locations for marker rendering.
    pub points: PointSet,
    /// Ranked hotspots, highest density first.
    pub peaks: Vec<Peak>,
    /// One address per peak, same order.
    pub addresses: Vec<Address>,
}

/// One row of the ranked hotspot table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HotspotRow {
    /// 1-based rank.
    pub rank: usize,
    pub latitude: String,
    pub longitude: String,
    pub address: String,
}

impl RenderPayload {
    /// The ranked `(rank, latitude, longitude, address)` table with
    /// coordinates formatted to six decimals.
    #[must_use]
    pub fn hotspots(&self) -> Vec<HotspotRow> {
        self.peaks
            .iter()
            .zip(&self.addresses)
            .enumerate()
            .map(|(i, (peak, address))| HotspotRow {
                rank: i + 1,
                latitude: format!("{:.6}", peak.latitude),
                longitude: format!("{:.6}", peak.longitude),
                address: address.to_string(),
            })
            .collect()
    }

    /// Builds a `GeoJSON` layer with one feature per case and one per
    /// hotspot, styled through feature properties.
    #[must_use]
    pub fn to_geojson(&self) -> FeatureCollection {
        let cases = self.points.iter().map(|c| {
            point_feature(
                *c,
                json!({
                    "kind": "case",
                    "marker": "circle",
                    "radius": 3,
                    "color": "red",
                    "fill": true,
                    "fillOpacity": 0.6,
                    "tooltip": "Confirmed case",
                }),
            )
        });

        let hotspots = self
            .peaks
            .iter()
            .zip(&self.addresses)
            .enumerate()
            .map(|(i, (peak, address))| {
                let rank = i + 1;
                point_feature(
                    peak.coordinate(),
                    json!({
                        "kind": "hotspot",
                        "rank": rank,
                        "density": peak.density,
                        "address": address.to_string(),
                        "color": "blue",
                        "icon": "info-sign",
                        "popup": format!("Hotspot {rank}: {address}"),
                        "tooltip": format!("Hotspot {rank}"),
                    }),
                )
            });

        let mut foreign = JsonObject::new();
        foreign.insert(
            "center".to_string(),
            json!([self.center.longitude, self.center.latitude]),
        );
        foreign.insert("zoom".to_string(), json!(DEFAULT_ZOOM));

        FeatureCollection {
            bbox: None,
            features: cases.chain(hotspots).collect(),
            foreign_members: Some(foreign),
        }
    }
}

fn point_feature(c: Coordinate, properties: serde_json::Value) -> Feature {
    let point = geo::Point::from(c);
    Feature {
        bbox: None,
        geometry: Some(Geometry::new(geojson::Value::from(&point))),
        id: None,
        properties: match properties {
            serde_json::Value::Object(map) => Some(map),
            _ => None,
        },
        foreign_members: None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn payload() -> RenderPayload {
        let points = PointSet::from_pairs(&[(-23.55, -46.63), (-23.56, -46.64)]).unwrap();
        RenderPayload {
            center: points.mean().unwrap(),
            points,
            peaks: vec![
                Peak {
                    latitude: -23.550_123_4,
                    longitude: -46.630_987_6,
                    density: 10.0,
                },
                Peak {
                    latitude: -23.56,
                    longitude: -46.64,
                    density: 5.0,
                },
            ],
            addresses: vec![
                Address::Found("Praça da Sé, São Paulo".to_string()),
                Address::NotFound,
            ],
        }
    }

    #[test]
    fn hotspot_rows_are_ranked_and_formatted() {
        let rows = payload().hotspots();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].rank, 1);
        assert_eq!(rows[0].latitude, "-23.550123");
        assert_eq!(rows[0].longitude, "-46.630988");
        assert_eq!(rows[0].address, "Praça da Sé, São Paulo");
        assert_eq!(rows[1].rank, 2);
        assert_eq!(rows[1].address, "Address not found");
    }

    #[test]
    fn geojson_has_cases_then_hotspots() {
        let fc = payload().to_geojson();
        assert_eq!(fc.features.len(), 4);

        let kinds: Vec<&str> = fc
            .features
            .iter()
            .filter_map(|f| f.properties.as_ref()?.get("kind")?.as_str())
            .collect();
        assert_eq!(kinds, vec!["case", "case", "hotspot", "hotspot"]);

        let first_hotspot = fc.features[2].properties.as_ref().unwrap();
        assert_eq!(
            first_hotspot["popup"],
            json!("Hotspot 1: Praça da Sé, São Paulo")
        );
        assert_eq!(first_hotspot["rank"], json!(1));

        let foreign = fc.foreign_members.as_ref().unwrap();
        assert_eq!(foreign["zoom"], json!(DEFAULT_ZOOM));
    }

    #[test]
    fn geojson_uses_lon_lat_order() {
        let fc = payload().to_geojson();
        let geometry = fc.features[0].geometry.as_ref().unwrap();
        let geojson::Value::Point(position) = &geometry.value else {
            panic!("expected a point geometry");
        };
        assert!((position[0] - -46.63).abs() < 1e-12);
        assert!((position[1] - -23.55).abs() < 1e-12);
    }
}

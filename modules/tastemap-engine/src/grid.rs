//! Grid partitioning of the scan region into overlapping search cells.
//!
//! The places provider caps results per query, so the region is tiled with
//! circles small enough that expected density stays under the cap. Cells that
//! still saturate get subdivided by the scanner (see `scan.rs`) via an
//! explicit depth-tagged work queue, never by unbounded recursion.

use tastemap_common::{BoundingBox, GeoCell, GeoPoint};

const METERS_PER_DEG_LAT: f64 = 111_320.0;

#[derive(Debug, Clone, Copy)]
pub struct GridConfig {
    pub cell_radius_m: f64,
    /// Fraction of each cell's radius reserved as overlap with neighbors.
    /// Guarantees no point between four adjacent centers falls outside all
    /// of their circles.
    pub overlap_fraction: f64,
    pub max_depth: u8,
}

fn meters_to_lat_deg(meters: f64) -> f64 {
    meters / METERS_PER_DEG_LAT
}

fn meters_to_lng_deg(meters: f64, lat: f64) -> f64 {
    meters / (METERS_PER_DEG_LAT * lat.to_radians().cos())
}

/// Tile `region` with depth-0 cells.
///
/// Center spacing is `radius * sqrt(2) * (1 - overlap)`: the farthest a point
/// can be from its nearest center is `spacing / sqrt(2) = radius * (1 -
/// overlap)`, so every point of the region sits inside at least one circle
/// with `overlap * radius` to spare. Centers are emitted up to and past each
/// edge so the boundary rows get the same guarantee.
pub fn partition(region: &BoundingBox, config: &GridConfig) -> Vec<GeoCell> {
    let step_m = config.cell_radius_m * std::f64::consts::SQRT_2 * (1.0 - config.overlap_fraction);
    let lat_step = meters_to_lat_deg(step_m);

    let mut cells = Vec::new();
    let mut lat = region.min_lat;
    loop {
        let lng_step = meters_to_lng_deg(step_m, lat);
        let mut lng = region.min_lng;
        loop {
            cells.push(GeoCell {
                center: GeoPoint { lat, lng },
                radius_m: config.cell_radius_m,
                depth: 0,
            });
            if lng >= region.max_lng {
                break;
            }
            lng += lng_step;
        }
        if lat >= region.max_lat {
            break;
        }
        lat += lat_step;
    }
    cells
}

/// Split a saturated cell into four children of half the linear size, one per
/// quadrant, at the next depth. Callers enforce the depth bound.
pub fn subdivide(cell: &GeoCell) -> [GeoCell; 4] {
    let offset_m = cell.radius_m / 2.0;
    let d_lat = meters_to_lat_deg(offset_m);
    let d_lng = meters_to_lng_deg(offset_m, cell.center.lat);
    let child = |lat_sign: f64, lng_sign: f64| GeoCell {
        center: GeoPoint {
            lat: cell.center.lat + lat_sign * d_lat,
            lng: cell.center.lng + lng_sign * d_lng,
        },
        radius_m: cell.radius_m / 2.0,
        depth: cell.depth + 1,
    };
    [
        child(-1.0, -1.0),
        child(-1.0, 1.0),
        child(1.0, -1.0),
        child(1.0, 1.0),
    ]
}

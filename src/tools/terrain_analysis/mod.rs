// private sub-module defined in other files
mod hillshade;
mod relative_elevation;
mod slope;
mod solar_radiation;
mod topographic_position_index;
mod wetness_index;

// exports identifiers from private sub-modules in the current module namespace
pub use self::hillshade::Hillshade;
pub use self::relative_elevation::RelativeElevation;
pub use self::slope::Slope;
pub use self::solar_radiation::SolarRadiation;
pub use self::topographic_position_index::TopographicPositionIndex;
pub use self::wetness_index::WetnessIndex;

use crate::raster::Raster;
use std::f64::consts::PI;

/// Partial derivatives (fx, fy) of Horn's 3rd-order finite difference at a
/// cell; `fx` is positive when the surface rises to the east and `fy` when it
/// rises to the north. Missing neighbours take the centre elevation. Returns
/// `None` for nodata cells.
pub(crate) fn horn_gradient(input: &Raster, row: isize, col: isize, z_factor: f64) -> Option<(f64, f64)> {
    let d_x = [1, 1, 1, 0, -1, -1, -1, 0];
    let d_y = [-1, 0, 1, 1, 1, 0, -1, -1];
    let nodata = input.configs.nodata;
    let z = input.get_value(row, col);
    if z == nodata {
        return None;
    }
    let mut n = [0f64; 8];
    for c in 0..8 {
        n[c] = input.get_value(row + d_y[c], col + d_x[c]);
        if n[c] != nodata {
            n[c] *= z_factor;
        } else {
            n[c] = z * z_factor;
        }
    }
    let fy = (n[6] - n[4] + 2.0 * (n[7] - n[3]) + n[0] - n[2]) / (8.0 * input.configs.resolution_y);
    let fx = (n[2] - n[4] + 2.0 * (n[1] - n[5]) + n[0] - n[6]) / (8.0 * input.configs.resolution_x);
    Some((fx, fy))
}

/// Slope (radians) and aspect (radians clockwise from north, facing
/// downslope) from Horn's derivatives. Flat cells get an aspect of zero.
pub(crate) fn slope_aspect(fx: f64, fy: f64) -> (f64, f64) {
    let slope = (fx * fx + fy * fy).sqrt().atan();
    let aspect = if fx == 0.0 && fy == 0.0 {
        0.0
    } else {
        (-fx).atan2(-fy).rem_euclid(2.0 * PI)
    };
    (slope, aspect)
}

/// The vertical exaggeration needed to bring elevations in metres into the
/// units of a geographic (degree) grid, based on the grid's mid latitude.
pub(crate) fn geographic_z_factor(input: &Raster) -> Option<f64> {
    if !input.is_in_geographic_coordinates() {
        return None;
    }
    let mid_lat = (input.configs.north + input.configs.south) / 2.0;
    if (-90.0..=90.0).contains(&mid_lat) {
        Some(1.0 / (111320.0 * mid_lat.to_radians().cos()))
    } else {
        None
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::raster::{DataType, RasterConfigs};

    #[test]
    fn test_aspect_faces_downslope() {
        // surface rising to the north faces south
        let (s, a) = slope_aspect(0.0, 1.0);
        assert!((s - PI / 4.0).abs() < 1e-12);
        assert!((a - PI).abs() < 1e-12);
        // rising to the east faces west
        let (_, a) = slope_aspect(1.0, 0.0);
        assert!((a - 1.5 * PI).abs() < 1e-12);
        assert_eq!(slope_aspect(0.0, 0.0), (0.0, 0.0));
    }

    #[test]
    fn test_horn_gradient_on_plane() {
        let configs = RasterConfigs {
            rows: 3,
            columns: 3,
            north: 3.0,
            south: 0.0,
            east: 3.0,
            west: 0.0,
            resolution_x: 1.0,
            resolution_y: 1.0,
            nodata: -9999.0,
            data_type: DataType::F32,
            ..Default::default()
        };
        let mut r = Raster::initialize_using_config("p.sgrd", &configs);
        for row in 0..3isize {
            for col in 0..3isize {
                // rises 2 per cell to the east and 1 per cell to the north
                r.set_value(row, col, 2.0 * col as f64 - row as f64);
            }
        }
        let (fx, fy) = horn_gradient(&r, 1, 1, 1.0).unwrap();
        assert!((fx - 2.0).abs() < 1e-12);
        assert!((fy - 1.0).abs() < 1e-12);
        r.set_value(1, 1, -9999.0);
        assert!(horn_gradient(&r, 1, 1, 1.0).is_none());
    }
}

//! Web Mercator projection and coordinate formatting.
//!
//! Converts between geographic degrees and EPSG:3857 meters, maps zoom
//! levels to resolutions, and renders coordinates as degrees-minutes-seconds.

use std::f64::consts::PI;

pub const EARTH_RADIUS_M: f64 = 6378137.0;
pub const HALF_SIZE: f64 = PI * EARTH_RADIUS_M;
pub const TILE_SIZE: f64 = 256.0;
/// Meters per pixel at zoom 0 with 256px tiles.
pub const MAX_RESOLUTION: f64 = 2.0 * HALF_SIZE / TILE_SIZE;

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct LonLat {
    pub lon: f64,
    pub lat: f64,
}

impl LonLat {
    pub const fn new(lon: f64, lat: f64) -> Self {
        Self { lon, lat }
    }
}

/// A coordinate in projected EPSG:3857 meters.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct MapPoint {
    pub x: f64,
    pub y: f64,
}

impl MapPoint {
    pub const fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    pub fn lerp(self, other: MapPoint, t: f64) -> MapPoint {
        MapPoint::new(
            self.x + (other.x - self.x) * t,
            self.y + (other.y - self.y) * t,
        )
    }
}

pub fn from_lon_lat(ll: LonLat) -> MapPoint {
    let x = EARTH_RADIUS_M * ll.lon.to_radians();
    let y = EARTH_RADIUS_M * (PI * (ll.lat + 90.0) / 360.0).tan().ln();
    MapPoint::new(x, y.clamp(-HALF_SIZE, HALF_SIZE))
}

pub fn to_lon_lat(p: MapPoint) -> LonLat {
    let mut lon = 180.0 * p.x / HALF_SIZE;
    let lat = 360.0 * (p.y / EARTH_RADIUS_M).exp().atan() / PI - 90.0;
    if !(-180.0..=180.0).contains(&lon) {
        lon = (lon + 180.0).rem_euclid(360.0) - 180.0;
    }
    LonLat::new(lon, lat)
}

pub fn resolution_for_zoom(zoom: f64) -> f64 {
    MAX_RESOLUTION / 2f64.powf(zoom)
}

pub fn zoom_for_resolution(resolution: f64) -> f64 {
    (MAX_RESOLUTION / resolution).log2()
}

fn pad_number(value: f64, width: usize, precision: usize) -> String {
    let total = if precision > 0 { width + precision + 1 } else { width };
    format!("{:0total$.precision$}", value, total = total, precision = precision)
}

/// Formats one axis as `D° MM′ SS″ H`, where `hemispheres` holds the
/// positive and negative hemisphere letters (`"NS"` or `"EW"`).
pub fn degrees_to_string_hdms(hemispheres: &str, degrees: f64, fraction_digits: usize) -> String {
    let normalized = (degrees + 180.0).rem_euclid(360.0) - 180.0;
    let x = (3600.0 * normalized).abs();
    let factor = 10f64.powi(fraction_digits as i32);

    let mut deg = (x / 3600.0).floor();
    let mut min = ((x - deg * 3600.0) / 60.0).floor();
    let mut sec = ((x - deg * 3600.0 - min * 60.0) * factor).round() / factor;
    if sec >= 60.0 {
        sec = 0.0;
        min += 1.0;
    }
    if min >= 60.0 {
        min = 0.0;
        deg += 1.0;
    }

    let mut hdms = format!(
        "{}\u{b0} {}\u{2032} {}\u{2033}",
        deg as i64,
        pad_number(min, 2, 0),
        pad_number(sec, 2, fraction_digits),
    );
    if normalized != 0.0 {
        let idx = if normalized < 0.0 { 1 } else { 0 };
        if let Some(h) = hemispheres.chars().nth(idx) {
            hdms.push(' ');
            hdms.push(h);
        }
    }
    hdms
}

/// Latitude first, then longitude.
pub fn to_string_hdms(ll: LonLat) -> String {
    format!(
        "{} {}",
        degrees_to_string_hdms("NS", ll.lat, 0),
        degrees_to_string_hdms("EW", ll.lon, 0)
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn origin_projects_to_origin() {
        let p = from_lon_lat(LonLat::new(0.0, 0.0));
        assert!(p.x.abs() < 1e-9);
        assert!(p.y.abs() < 1e-6);
    }

    #[test]
    fn antimeridian_is_half_world() {
        let p = from_lon_lat(LonLat::new(180.0, 0.0));
        assert!((p.x - HALF_SIZE).abs() < 1e-6);
        assert!((HALF_SIZE - 20037508.342789244).abs() < 1e-6);
    }

    #[test]
    fn poles_clamp_to_extent() {
        let p = from_lon_lat(LonLat::new(0.0, 89.9999));
        assert!(p.y <= HALF_SIZE);
        let q = from_lon_lat(LonLat::new(0.0, -89.9999));
        assert!(q.y >= -HALF_SIZE);
    }

    #[test]
    fn wrapped_x_normalizes_longitude() {
        let ll = to_lon_lat(MapPoint::new(HALF_SIZE * 1.5, 0.0));
        assert!((ll.lon - -90.0).abs() < 1e-9);
    }

    #[test]
    fn zoom_resolution_inverse() {
        assert!((resolution_for_zoom(0.0) - 156543.03392804097).abs() < 1e-6);
        for z in [0.0, 3.5, 12.0, 17.0, 28.0] {
            assert!((zoom_for_resolution(resolution_for_zoom(z)) - z).abs() < 1e-9);
        }
    }

    #[test]
    fn hdms_matches_reference_format() {
        let s = to_string_hdms(LonLat::new(126.978, 37.5665));
        assert_eq!(s, "37\u{b0} 33\u{2032} 59\u{2033} N 126\u{b0} 58\u{2032} 41\u{2033} E");
    }

    #[test]
    fn hdms_southern_western_hemispheres() {
        assert_eq!(
            degrees_to_string_hdms("NS", -33.5, 0),
            "33\u{b0} 30\u{2032} 00\u{2033} S"
        );
        assert_eq!(
            degrees_to_string_hdms("EW", -0.25, 0),
            "0\u{b0} 15\u{2032} 00\u{2033} W"
        );
    }

    #[test]
    fn hdms_zero_has_no_hemisphere() {
        assert_eq!(degrees_to_string_hdms("NS", 0.0, 0), "0\u{b0} 00\u{2032} 00\u{2033}");
    }

    #[test]
    fn hdms_rounding_carries_into_minutes() {
        // 10° 59′ 59.7″ rounds up to the next minute and degree
        let deg = 10.0 + 59.0 / 60.0 + 59.7 / 3600.0;
        assert_eq!(degrees_to_string_hdms("NS", deg, 0), "11\u{b0} 00\u{2032} 00\u{2033} N");
    }

    #[test]
    fn hdms_fraction_digits_pad_seconds() {
        let deg = 1.0 + 2.0 / 60.0 + 3.25 / 3600.0;
        assert_eq!(degrees_to_string_hdms("EW", deg, 2), "1\u{b0} 02\u{2032} 03.25\u{2033} E");
    }

    proptest! {
        #[test]
        fn projection_round_trips(lon in -180.0f64..180.0, lat in -85.0f64..85.0) {
            let back = to_lon_lat(from_lon_lat(LonLat::new(lon, lat)));
            prop_assert!((back.lon - lon).abs() < 1e-9);
            prop_assert!((back.lat - lat).abs() < 1e-9);
        }
    }
}

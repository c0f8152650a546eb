//! Configuration types for the map viewport and the sidebar.
//!
//! Defines ViewerConfig, MapConfig and SidebarConfig with the defaults the
//! viewer ships with: the OpenStreetMap base layer, the Seoul start view,
//! animation timings, and the locations endpoint.

use crate::projection::LonLat;

pub const LOCATIONS_URL: &str =
    "https://angelswing-frontend-test-serverless-api.vercel.app/api/locations";
pub const OSM_TILE_URL: &str = "https://tile.openstreetmap.org/{z}/{x}/{y}.png";
pub const OSM_ATTRIBUTION: &str = "\u{a9} OpenStreetMap contributors";

#[derive(Clone, Debug)]
pub struct MapConfig {
    pub tile_url: String,
    pub attribution: String,
    pub default_center: LonLat,
    pub default_zoom: f64,
    pub min_zoom: f64,
    pub max_zoom: f64,
    pub max_tile_zoom: u8,
    pub location_zoom: f64,
    pub location_animation_secs: f64,
    pub control_animation_secs: f64,
    pub autopan_animation_secs: f64,
    pub autopan_margin: f32,
    pub tile_cache_tiles: usize,
    pub tile_workers: usize,
}

impl Default for MapConfig {
    fn default() -> Self {
        Self {
            tile_url: OSM_TILE_URL.to_string(),
            attribution: OSM_ATTRIBUTION.to_string(),
            default_center: LonLat::new(126.978, 37.5665),
            default_zoom: 12.0,
            min_zoom: 0.0,
            max_zoom: 28.0,
            max_tile_zoom: 19,
            location_zoom: 17.0,
            location_animation_secs: 1.0,
            control_animation_secs: 0.25,
            autopan_animation_secs: 0.25,
            autopan_margin: 20.0,
            tile_cache_tiles: 4096,
            tile_workers: 4,
        }
    }
}

impl MapConfig {
    pub fn tile_url_for(&self, z: u8, x: u32, y: u32) -> String {
        self.tile_url
            .replace("{z}", &z.to_string())
            .replace("{x}", &x.to_string())
            .replace("{y}", &y.to_string())
    }
}

#[derive(Clone, Debug)]
pub struct SidebarConfig {
    pub locations_url: String,
    pub rail_width: f32,
    pub panel_width: f32,
    pub slide_secs: f32,
}

impl Default for SidebarConfig {
    fn default() -> Self {
        Self {
            locations_url: LOCATIONS_URL.to_string(),
            rail_width: 80.0,
            panel_width: 300.0,
            slide_secs: 0.3,
        }
    }
}

#[derive(Clone, Debug, Default)]
pub struct ViewerConfig {
    pub map: MapConfig,
    pub sidebar: SidebarConfig,
}

//! Raster tile layer: tile addressing, quadtree cache, and background fetching.
//!
//! Tiles follow the slippy-map XYZ scheme over the Web Mercator square.
//! Decoded tiles live in a quadtree with LRU eviction of leaves, so a tile
//! that has not arrived yet can be drawn from its deepest cached ancestor.
//! Native builds fetch on a small worker pool backed by a disk cache; the
//! browser build uses `fetch`.

use crate::config::MapConfig;
use crate::projection::{MapPoint, HALF_SIZE};
use crate::view::View;
use eframe::egui;
use std::collections::{HashMap, HashSet};

#[cfg(not(target_arch = "wasm32"))]
use std::sync::atomic::{AtomicU64, Ordering};
#[cfg(not(target_arch = "wasm32"))]
use std::sync::{mpsc, Arc, Mutex};

const MAX_PENDING: usize = 128;
const EPS: f64 = 1e-9;
const RETRY_BASE_SECS: f64 = 1.0;
const RETRY_MAX_SECS: f64 = 60.0;

#[derive(Clone, Copy, Hash, Eq, PartialEq, Debug)]
pub struct TileCoord {
    pub x: u32,
    pub y: u32,
    pub z: u8,
}

impl TileCoord {
    pub fn new(x: u32, y: u32, z: u8) -> Self {
        Self { x, y, z }
    }

    pub fn ancestor(&self, z: u8) -> TileCoord {
        let dz = self.z.saturating_sub(z);
        TileCoord { x: self.x >> dz, y: self.y >> dz, z: self.z - dz }
    }

    /// UV rectangle this tile covers inside its ancestor at zoom `z`.
    pub fn uv_in_ancestor(&self, z: u8) -> egui::Rect {
        let dz = self.z.saturating_sub(z);
        let scale = (1u32 << dz) as f32;
        let anc = self.ancestor(z);
        let u0 = (self.x - (anc.x << dz)) as f32 / scale;
        let v0 = (self.y - (anc.y << dz)) as f32 / scale;
        egui::Rect::from_min_size(egui::pos2(u0, v0), egui::vec2(1.0 / scale, 1.0 / scale))
    }
}

pub fn tile_span(z: u8) -> f64 {
    2.0 * HALF_SIZE / (1u64 << z) as f64
}

pub fn tile_zoom_for(view_zoom: f64, max_tile_zoom: u8) -> u8 {
    view_zoom.round().clamp(0.0, max_tile_zoom as f64) as u8
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct VisibleTile {
    pub coord: TileCoord,
    pub rect: egui::Rect,
}

fn index_range(lo: f64, hi: f64, span: f64) -> (i64, i64) {
    ((lo / span + EPS).floor() as i64, (hi / span - EPS).ceil() as i64 - 1)
}

/// Tiles at zoom `z` covering `rect`, with their screen rectangles.
/// Columns beyond the world edge repeat the wrapped tile.
pub fn visible_tiles(view: &View, rect: egui::Rect, z: u8) -> Vec<VisibleTile> {
    let n = 1i64 << z;
    let span = tile_span(z);
    let (bl, tr) = view.extent(rect);
    let (x0, x1) = index_range(bl.x + HALF_SIZE, tr.x + HALF_SIZE, span);
    let (y0, y1) = index_range(HALF_SIZE - tr.y, HALF_SIZE - bl.y, span);
    let (y0, y1) = (y0.max(0), y1.min(n - 1));
    let x1 = x1.min(x0 + 64);

    let mut tiles = Vec::new();
    for ty in y0..=y1 {
        for tx in x0..=x1 {
            let left = -HALF_SIZE + tx as f64 * span;
            let top = HALF_SIZE - ty as f64 * span;
            let min = view.map_to_screen(MapPoint::new(left, top), rect);
            let max = view.map_to_screen(MapPoint::new(left + span, top - span), rect);
            tiles.push(VisibleTile {
                coord: TileCoord::new(tx.rem_euclid(n) as u32, ty as u32, z),
                rect: egui::Rect::from_min_max(min, max),
            });
        }
    }
    tiles
}

pub struct TileNode<T> {
    pub tile: Option<T>,
    pub children: [Option<Box<TileNode<T>>>; 4],
    pub last_used: u64,
}

impl<T> TileNode<T> {
    pub fn new() -> Self {
        TileNode { tile: None, children: [None, None, None, None], last_used: 0 }
    }

    pub fn is_leaf(&self) -> bool {
        self.children.iter().all(|c| c.is_none())
    }
}

pub struct TileQuadTree<T> {
    pub root: TileNode<T>,
    pub tile_count: usize,
    pub max_tiles: usize,
    pub access_counter: u64,
}

impl<T> TileQuadTree<T> {
    pub fn new(max_tiles: usize) -> Self {
        TileQuadTree { root: TileNode::new(), tile_count: 0, max_tiles, access_counter: 0 }
    }

    pub fn child_index(x: u32, y: u32, z: u8, depth: u8) -> usize {
        let bit_x = ((x >> (z - 1 - depth)) & 1) as usize;
        let bit_y = ((y >> (z - 1 - depth)) & 1) as usize;
        bit_x | (bit_y << 1)
    }

    pub fn insert(&mut self, coord: TileCoord, entry: T) {
        self.access_counter += 1;
        let mut node = &mut self.root;
        for depth in 0..coord.z {
            let idx = Self::child_index(coord.x, coord.y, coord.z, depth);
            node = node.children[idx].get_or_insert_with(|| Box::new(TileNode::new()));
        }
        if node.tile.is_none() {
            self.tile_count += 1;
        }
        node.tile = Some(entry);
        node.last_used = self.access_counter;
        self.evict_if_needed();
    }

    /// Deepest zoom at or above `coord.z` with a cached tile on the path
    /// to `coord`. Marks every hit on the way as used.
    pub fn best_tile_zoom(&mut self, coord: &TileCoord) -> Option<u8> {
        self.access_counter += 1;
        let ac = self.access_counter;
        let mut best_z: Option<u8> = None;
        let mut node = &mut self.root;
        if node.tile.is_some() {
            node.last_used = ac;
            best_z = Some(0);
        }
        for depth in 0..coord.z {
            let idx = Self::child_index(coord.x, coord.y, coord.z, depth);
            match &mut node.children[idx] {
                Some(child) => {
                    node = child.as_mut();
                    if node.tile.is_some() {
                        node.last_used = ac;
                        best_z = Some(depth + 1);
                    }
                }
                None => break,
            }
        }
        best_z
    }

    pub fn get_tile_at(&self, coord: &TileCoord) -> Option<&T> {
        let mut node = &self.root;
        for depth in 0..coord.z {
            let idx = Self::child_index(coord.x, coord.y, coord.z, depth);
            match &node.children[idx] {
                Some(child) => node = child,
                None => return None,
            }
        }
        node.tile.as_ref()
    }

    fn evict_if_needed(&mut self) {
        if self.tile_count <= self.max_tiles {
            return;
        }
        let target = self.max_tiles * 3 / 4;
        let mut candidates: Vec<(u64, Vec<usize>)> = Vec::new();
        Self::collect_evictable(&self.root, &mut Vec::new(), &mut candidates);
        candidates.sort_by_key(|(last_used, _)| *last_used);
        let to_remove = self.tile_count.saturating_sub(target);
        for (_, path) in candidates.iter().take(to_remove) {
            Self::remove_at(&mut self.root, path);
            self.tile_count -= 1;
        }
    }

    fn collect_evictable(node: &TileNode<T>, path: &mut Vec<usize>, out: &mut Vec<(u64, Vec<usize>)>) {
        if node.is_leaf() && node.tile.is_some() {
            out.push((node.last_used, path.clone()));
            return;
        }
        for (i, child) in node.children.iter().enumerate() {
            if let Some(c) = child {
                path.push(i);
                Self::collect_evictable(c, path, out);
                path.pop();
            }
        }
    }

    fn remove_at(node: &mut TileNode<T>, path: &[usize]) {
        if path.is_empty() {
            node.tile = None;
            return;
        }
        let idx = path[0];
        if let Some(child) = &mut node.children[idx] {
            Self::remove_at(child, &path[1..]);
            if child.tile.is_none() && child.is_leaf() {
                node.children[idx] = None;
            }
        }
    }
}

/// What became of one tile request.
pub enum TileOutcome {
    Loaded(egui::ColorImage),
    Failed,
    /// The view left the request's zoom level before it ran.
    Stale,
}

pub struct TileFetchResult {
    pub coord: TileCoord,
    pub generation: u64,
    pub outcome: TileOutcome,
}

/// Seconds to wait before retrying a tile that has failed `attempts` times.
fn retry_delay(attempts: u32) -> f64 {
    let exp = attempts.saturating_sub(1).min(16) as i32;
    (RETRY_BASE_SECS * 2f64.powi(exp)).min(RETRY_MAX_SECS)
}

struct TileFailure {
    attempts: u32,
    retry_after: f64,
}

pub fn decode_tile(bytes: &[u8]) -> Option<egui::ColorImage> {
    let img = image::load_from_memory(bytes).ok()?.to_rgba8();
    let size = [img.width() as usize, img.height() as usize];
    Some(egui::ColorImage::from_rgba_unmultiplied(size, img.as_raw()))
}

#[cfg(not(target_arch = "wasm32"))]
struct TileRequest {
    coord: TileCoord,
    url: String,
    cache_path: std::path::PathBuf,
    generation: u64,
}

#[cfg(not(target_arch = "wasm32"))]
struct TileWorkers {
    fetch_tx: mpsc::Sender<TileRequest>,
    result_rx: mpsc::Receiver<TileFetchResult>,
    generation: Arc<AtomicU64>,
}

#[cfg(not(target_arch = "wasm32"))]
fn load_tile(req: &TileRequest) -> Option<egui::ColorImage> {
    if let Ok(bytes) = std::fs::read(&req.cache_path) {
        if let Some(img) = decode_tile(&bytes) {
            return Some(img);
        }
    }
    match crate::fetch::get_bytes(&req.url) {
        Ok(bytes) => {
            let img = decode_tile(&bytes)?;
            if let Some(parent) = req.cache_path.parent() {
                let _ = std::fs::create_dir_all(parent);
            }
            let _ = std::fs::write(&req.cache_path, &bytes);
            Some(img)
        }
        Err(e) => {
            log::debug!("tile {:?} failed: {}", req.coord, e);
            None
        }
    }
}

#[cfg(not(target_arch = "wasm32"))]
fn fetch_tile(req: &TileRequest, current_generation: u64) -> TileOutcome {
    if req.generation != current_generation {
        return TileOutcome::Stale;
    }
    match load_tile(req) {
        Some(image) => TileOutcome::Loaded(image),
        None => TileOutcome::Failed,
    }
}

#[cfg(not(target_arch = "wasm32"))]
fn spawn_workers(count: usize, ctx: &egui::Context) -> TileWorkers {
    let (fetch_tx, fetch_rx) = mpsc::channel::<TileRequest>();
    let (result_tx, result_rx) = mpsc::channel::<TileFetchResult>();
    let generation = Arc::new(AtomicU64::new(0));
    let fetch_rx = Arc::new(Mutex::new(fetch_rx));

    for i in 0..count.max(1) {
        let rx = fetch_rx.clone();
        let tx = result_tx.clone();
        let gen = generation.clone();
        let ctx = ctx.clone();
        let spawned = std::thread::Builder::new()
            .name(format!("tile-fetch-{}", i))
            .spawn(move || loop {
                let msg = {
                    let Ok(lock) = rx.lock() else { break };
                    lock.recv()
                };
                let Ok(req) = msg else { break };
                let outcome = fetch_tile(&req, gen.load(Ordering::Relaxed));
                let result =
                    TileFetchResult { coord: req.coord, generation: req.generation, outcome };
                if tx.send(result).is_err() {
                    break;
                }
                ctx.request_repaint();
            });
        if let Err(e) = spawned {
            log::warn!("could not start tile worker: {}", e);
        }
    }

    TileWorkers { fetch_tx, result_rx, generation }
}

#[cfg(target_arch = "wasm32")]
thread_local! {
    static TILE_RESULTS: std::cell::RefCell<Vec<TileFetchResult>> = std::cell::RefCell::new(Vec::new());
}

#[cfg(not(target_arch = "wasm32"))]
pub fn disk_cache_dir() -> std::path::PathBuf {
    std::env::var_os("HOME")
        .map(|h| std::path::PathBuf::from(h).join(".cache"))
        .unwrap_or_else(|| std::path::PathBuf::from("."))
        .join("locview")
        .join("tiles")
}

/// The single base layer of the map.
pub struct TileLayer {
    config: MapConfig,
    tree: TileQuadTree<egui::TextureHandle>,
    pending: HashSet<TileCoord>,
    failed: HashMap<TileCoord, TileFailure>,
    generation: u64,
    last_z: Option<u8>,
    #[cfg(not(target_arch = "wasm32"))]
    workers: Option<TileWorkers>,
    #[cfg(not(target_arch = "wasm32"))]
    cache_dir: std::path::PathBuf,
}

impl TileLayer {
    pub fn new(config: &MapConfig) -> Self {
        Self {
            config: config.clone(),
            tree: TileQuadTree::new(config.tile_cache_tiles),
            pending: HashSet::new(),
            failed: HashMap::new(),
            generation: 0,
            last_z: None,
            #[cfg(not(target_arch = "wasm32"))]
            workers: None,
            #[cfg(not(target_arch = "wasm32"))]
            cache_dir: disk_cache_dir(),
        }
    }

    pub fn cached_tiles(&self) -> usize {
        self.tree.tile_count
    }

    fn accept(&mut self, ctx: &egui::Context, result: TileFetchResult, now: f64) {
        let c = result.coord;
        self.pending.remove(&c);
        if result.generation != self.generation {
            log::debug!("dropping tile {:?} from an earlier zoom level", c);
            return;
        }
        match result.outcome {
            TileOutcome::Loaded(image) => {
                self.failed.remove(&c);
                let handle = ctx.load_texture(
                    format!("tile-{}-{}-{}", c.z, c.x, c.y),
                    image,
                    egui::TextureOptions::LINEAR,
                );
                self.tree.insert(c, handle);
            }
            TileOutcome::Failed => {
                let failure =
                    self.failed.entry(c).or_insert(TileFailure { attempts: 0, retry_after: now });
                failure.attempts += 1;
                let delay = retry_delay(failure.attempts);
                failure.retry_after = now + delay;
                log::debug!("tile {:?} failed {} times, next try in {}s", c, failure.attempts, delay);
            }
            TileOutcome::Stale => {}
        }
    }

    /// Moves finished fetches into the cache.
    pub fn poll(&mut self, ctx: &egui::Context, now: f64) {
        #[cfg(not(target_arch = "wasm32"))]
        {
            let mut done = Vec::new();
            if let Some(workers) = &self.workers {
                while let Ok(result) = workers.result_rx.try_recv() {
                    done.push(result);
                }
            }
            for result in done {
                self.accept(ctx, result, now);
            }
        }

        #[cfg(target_arch = "wasm32")]
        {
            let done = TILE_RESULTS.with(|cell| std::mem::take(&mut *cell.borrow_mut()));
            for result in done {
                self.accept(ctx, result, now);
            }
        }
    }

    fn set_zoom(&mut self, z: u8) {
        if self.last_z == Some(z) {
            return;
        }
        self.last_z = Some(z);
        self.generation += 1;
        self.failed.retain(|c, _| c.z == z);
        #[cfg(not(target_arch = "wasm32"))]
        if let Some(workers) = &self.workers {
            workers.generation.store(self.generation, Ordering::Relaxed);
        }
    }

    /// Marks `coord` pending unless it is already in flight, the queue is
    /// full, or it failed recently and is still backing off.
    fn begin_request(&mut self, coord: TileCoord, now: f64) -> bool {
        if self.failed.get(&coord).is_some_and(|f| now < f.retry_after) {
            return false;
        }
        self.pending.len() < MAX_PENDING && self.pending.insert(coord)
    }

    fn request(&mut self, ctx: &egui::Context, coord: TileCoord, now: f64) {
        if !self.begin_request(coord, now) {
            return;
        }
        let url = self.config.tile_url_for(coord.z, coord.x, coord.y);

        #[cfg(not(target_arch = "wasm32"))]
        {
            if self.workers.is_none() {
                let w = spawn_workers(self.config.tile_workers, ctx);
                w.generation.store(self.generation, Ordering::Relaxed);
                self.workers = Some(w);
            }
            let cache_path = self
                .cache_dir
                .join(coord.z.to_string())
                .join(coord.y.to_string())
                .join(format!("{}.png", coord.x));
            let req = TileRequest { coord, url, cache_path, generation: self.generation };
            let sent = self
                .workers
                .as_ref()
                .is_some_and(|w| w.fetch_tx.send(req).is_ok());
            if !sent {
                log::warn!("tile workers are gone; dropping {:?}", coord);
                self.pending.remove(&coord);
            }
        }

        #[cfg(target_arch = "wasm32")]
        {
            let ctx = ctx.clone();
            let generation = self.generation;
            wasm_bindgen_futures::spawn_local(async move {
                let outcome = match crate::fetch::get_bytes(&url).await {
                    Ok(bytes) => decode_tile(&bytes).map_or(TileOutcome::Failed, TileOutcome::Loaded),
                    Err(e) => {
                        log::debug!("tile {:?} failed: {}", coord, e);
                        TileOutcome::Failed
                    }
                };
                let result = TileFetchResult { coord, generation, outcome };
                TILE_RESULTS.with(|cell| cell.borrow_mut().push(result));
                ctx.request_repaint();
            });
        }
    }

    pub fn draw(
        &mut self,
        ctx: &egui::Context,
        painter: &egui::Painter,
        view: &View,
        rect: egui::Rect,
        now: f64,
    ) {
        let z = tile_zoom_for(view.zoom(), self.config.max_tile_zoom);
        self.set_zoom(z);

        let full_uv = egui::Rect::from_min_max(egui::pos2(0.0, 0.0), egui::pos2(1.0, 1.0));
        for tile in visible_tiles(view, rect, z) {
            if let Some(handle) = self.tree.get_tile_at(&tile.coord) {
                painter.image(handle.id(), tile.rect, full_uv, egui::Color32::WHITE);
                self.tree.best_tile_zoom(&tile.coord);
                continue;
            }
            self.request(ctx, tile.coord, now);
            if let Some(az) = self.tree.best_tile_zoom(&tile.coord) {
                let anc = tile.coord.ancestor(az);
                if let Some(handle) = self.tree.get_tile_at(&anc) {
                    let uv = tile.coord.uv_in_ancestor(az);
                    painter.image(handle.id(), tile.rect, uv, egui::Color32::WHITE);
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tile_at(p: MapPoint, z: u8) -> TileCoord {
        let n = 1i64 << z;
        let span = tile_span(z);
        let x = ((p.x + HALF_SIZE) / span).floor() as i64;
        let y = ((HALF_SIZE - p.y) / span).floor() as i64;
        TileCoord::new(x.rem_euclid(n) as u32, y.clamp(0, n - 1) as u32, z)
    }

    fn square(size: f32) -> egui::Rect {
        egui::Rect::from_min_size(egui::pos2(0.0, 0.0), egui::vec2(size, size))
    }

    #[test]
    fn tile_at_corners() {
        assert_eq!(tile_at(MapPoint::new(-HALF_SIZE + 1.0, HALF_SIZE - 1.0), 2), TileCoord::new(0, 0, 2));
        assert_eq!(tile_at(MapPoint::new(HALF_SIZE - 1.0, -HALF_SIZE + 1.0), 2), TileCoord::new(3, 3, 2));
        assert_eq!(tile_at(MapPoint::new(HALF_SIZE + 1.0, 0.0), 1), TileCoord::new(0, 1, 1));
    }

    #[test]
    fn seoul_tile_at_zoom_12() {
        let p = crate::projection::from_lon_lat(crate::projection::LonLat::new(126.978, 37.5665));
        assert_eq!(tile_at(p, 12), TileCoord::new(3492, 1586, 12));
    }

    #[test]
    fn tile_zoom_rounds_and_caps() {
        assert_eq!(tile_zoom_for(12.4, 19), 12);
        assert_eq!(tile_zoom_for(12.6, 19), 13);
        assert_eq!(tile_zoom_for(22.0, 19), 19);
        assert_eq!(tile_zoom_for(-1.0, 19), 0);
    }

    #[test]
    fn world_at_zoom_zero_is_one_tile() {
        let view = View::new(MapPoint::new(0.0, 0.0), 0.0, 0.0, 28.0);
        let tiles = visible_tiles(&view, square(256.0), 0);
        assert_eq!(tiles.len(), 1);
        assert_eq!(tiles[0].coord, TileCoord::new(0, 0, 0));
        assert!((tiles[0].rect.min.x).abs() < 1e-3);
        assert!((tiles[0].rect.max.y - 256.0).abs() < 1e-3);
    }

    #[test]
    fn zoom_one_quad() {
        let view = View::new(MapPoint::new(0.0, 0.0), 1.0, 0.0, 28.0);
        let tiles = visible_tiles(&view, square(512.0), 1);
        let mut coords: Vec<_> = tiles.iter().map(|t| (t.coord.x, t.coord.y)).collect();
        coords.sort();
        assert_eq!(coords, vec![(0, 0), (0, 1), (1, 0), (1, 1)]);
    }

    #[test]
    fn columns_wrap_across_antimeridian() {
        let view = View::new(MapPoint::new(HALF_SIZE, 0.0), 1.0, 0.0, 28.0);
        let tiles = visible_tiles(&view, square(512.0), 1);
        let xs: HashSet<u32> = tiles.iter().map(|t| t.coord.x).collect();
        assert_eq!(xs, HashSet::from([0, 1]));
        assert_eq!(tiles.len(), 4);
    }

    #[test]
    fn ancestor_uv() {
        let c = TileCoord::new(5, 2, 3);
        assert_eq!(c.ancestor(1), TileCoord::new(1, 0, 1));
        let uv = c.uv_in_ancestor(1);
        assert_eq!(uv.min, egui::pos2(0.25, 0.5));
        assert_eq!(uv.size(), egui::vec2(0.25, 0.25));
        assert_eq!(c.uv_in_ancestor(3).size(), egui::vec2(1.0, 1.0));
    }

    #[test]
    fn best_tile_zoom_finds_deepest_ancestor() {
        let mut tree = TileQuadTree::new(16);
        tree.insert(TileCoord::new(0, 0, 0), 0u32);
        tree.insert(TileCoord::new(1, 0, 1), 1u32);
        assert_eq!(tree.best_tile_zoom(&TileCoord::new(5, 2, 3)), Some(1));
        assert_eq!(tree.best_tile_zoom(&TileCoord::new(0, 7, 3)), Some(0));
        assert!(tree.get_tile_at(&TileCoord::new(1, 0, 1)).is_some());
        assert!(tree.get_tile_at(&TileCoord::new(5, 2, 3)).is_none());
    }

    #[test]
    fn eviction_drops_least_recently_used_leaves() {
        let mut tree = TileQuadTree::new(4);
        for x in 0..4 {
            tree.insert(TileCoord::new(x, 0, 2), x);
        }
        tree.best_tile_zoom(&TileCoord::new(0, 0, 2));
        tree.insert(TileCoord::new(0, 1, 2), 9);
        assert_eq!(tree.tile_count, 3);
        assert!(tree.get_tile_at(&TileCoord::new(0, 0, 2)).is_some());
        assert!(tree.get_tile_at(&TileCoord::new(0, 1, 2)).is_some());
        assert!(tree.get_tile_at(&TileCoord::new(1, 0, 2)).is_none());
        assert!(tree.get_tile_at(&TileCoord::new(2, 0, 2)).is_none());
    }

    #[test]
    fn decode_rejects_garbage() {
        assert!(decode_tile(b"not an image").is_none());
    }

    fn failed(layer: &TileLayer, coord: TileCoord) -> TileFetchResult {
        TileFetchResult { coord, generation: layer.generation, outcome: TileOutcome::Failed }
    }

    #[test]
    fn retry_delay_doubles_up_to_a_minute() {
        assert_eq!(retry_delay(1), 1.0);
        assert_eq!(retry_delay(2), 2.0);
        assert_eq!(retry_delay(5), 16.0);
        assert_eq!(retry_delay(7), 60.0);
        assert_eq!(retry_delay(u32::MAX), 60.0);
    }

    #[test]
    fn failing_tile_is_not_requested_every_frame() {
        let ctx = egui::Context::default();
        let mut layer = TileLayer::new(&MapConfig::default());
        layer.set_zoom(3);
        let coord = TileCoord::new(5, 2, 3);

        let mut requests = 0;
        for frame in 0..60 {
            let now = frame as f64 * 0.016;
            if layer.begin_request(coord, now) {
                requests += 1;
                layer.accept(&ctx, failed(&layer, coord), now);
            }
        }
        assert_eq!(requests, 1);

        for frame in 60..625 {
            let now = frame as f64 * 0.016;
            if layer.begin_request(coord, now) {
                requests += 1;
                layer.accept(&ctx, failed(&layer, coord), now);
            }
        }
        assert!(requests <= 5, "{} requests in 10s", requests);
    }

    #[test]
    fn loaded_tile_clears_its_failure() {
        let ctx = egui::Context::default();
        let mut layer = TileLayer::new(&MapConfig::default());
        layer.set_zoom(3);
        let coord = TileCoord::new(1, 1, 3);
        assert!(layer.begin_request(coord, 0.0));
        layer.accept(&ctx, failed(&layer, coord), 0.0);
        assert!(!layer.begin_request(coord, 0.5));
        assert!(layer.begin_request(coord, 1.5));
        let image = egui::ColorImage::new([1, 1], egui::Color32::WHITE);
        let generation = layer.generation;
        layer.accept(&ctx, TileFetchResult { coord, generation, outcome: TileOutcome::Loaded(image) }, 1.6);
        assert!(layer.failed.is_empty());
        assert_eq!(layer.cached_tiles(), 1);
    }

    #[test]
    fn zoom_change_forgets_failures_at_other_levels() {
        let ctx = egui::Context::default();
        let mut layer = TileLayer::new(&MapConfig::default());
        layer.set_zoom(3);
        let coord = TileCoord::new(1, 1, 3);
        layer.begin_request(coord, 0.0);
        layer.accept(&ctx, failed(&layer, coord), 0.0);
        layer.set_zoom(4);
        layer.set_zoom(3);
        assert!(layer.begin_request(coord, 0.1));
    }

    #[test]
    fn results_from_an_earlier_zoom_are_dropped() {
        let ctx = egui::Context::default();
        let mut layer = TileLayer::new(&MapConfig::default());
        layer.set_zoom(3);
        let coord = TileCoord::new(1, 1, 3);
        assert!(layer.begin_request(coord, 0.0));
        let old = layer.generation;
        layer.set_zoom(4);

        let image = egui::ColorImage::new([1, 1], egui::Color32::WHITE);
        layer.accept(&ctx, TileFetchResult { coord, generation: old, outcome: TileOutcome::Loaded(image) }, 0.1);
        assert_eq!(layer.cached_tiles(), 0);
        assert_eq!(layer.pending.len(), 0);

        layer.accept(&ctx, TileFetchResult { coord, generation: old, outcome: TileOutcome::Failed }, 0.1);
        assert!(layer.failed.is_empty());
    }

    #[cfg(not(target_arch = "wasm32"))]
    #[test]
    fn stale_request_skips_the_network() {
        let coord = TileCoord::new(0, 0, 0);
        let req = TileRequest {
            coord,
            url: "http://127.0.0.1:9/0/0/0.png".into(),
            cache_path: std::env::temp_dir().join("locview-missing").join("0.png"),
            generation: 1,
        };
        assert!(matches!(fetch_tile(&req, 2), TileOutcome::Stale));
    }
}

//! Map view: center, zoom, screen transforms and animated transitions.

use crate::projection::{resolution_for_zoom, zoom_for_resolution, MapPoint};
use eframe::egui;

/// Where an animation should end. Unset fields keep their current value.
#[derive(Clone, Copy, Debug, Default)]
pub struct AnimationTarget {
    pub center: Option<MapPoint>,
    pub zoom: Option<f64>,
}

#[derive(Clone, Copy, Debug)]
struct ViewAnimation {
    start_time: f64,
    duration: f64,
    from_center: MapPoint,
    to_center: MapPoint,
    from_resolution: f64,
    to_resolution: f64,
    to_zoom: f64,
}

/// Ease in, ease out: `3t² - 2t³`.
pub fn in_and_out(t: f64) -> f64 {
    let t = t.clamp(0.0, 1.0);
    t * t * (3.0 - 2.0 * t)
}

#[derive(Clone, Debug)]
pub struct View {
    center: MapPoint,
    zoom: f64,
    min_zoom: f64,
    max_zoom: f64,
    animation: Option<ViewAnimation>,
}

impl View {
    pub fn new(center: MapPoint, zoom: f64, min_zoom: f64, max_zoom: f64) -> Self {
        Self {
            center,
            zoom: zoom.clamp(min_zoom, max_zoom),
            min_zoom,
            max_zoom,
            animation: None,
        }
    }

    pub fn center(&self) -> MapPoint {
        self.center
    }

    pub fn zoom(&self) -> f64 {
        self.zoom
    }

    pub fn resolution(&self) -> f64 {
        resolution_for_zoom(self.zoom)
    }

    pub fn is_animating(&self) -> bool {
        self.animation.is_some()
    }

    /// Starts a transition to `target`. A transition already in flight is
    /// replaced, starting from wherever it had got to at `now`.
    pub fn animate(&mut self, target: AnimationTarget, duration_secs: f64, now: f64) {
        self.tick(now);
        self.animation = None;

        let to_center = target.center.unwrap_or(self.center);
        let to_zoom = target.zoom.unwrap_or(self.zoom).clamp(self.min_zoom, self.max_zoom);
        if duration_secs <= 0.0 {
            self.center = to_center;
            self.zoom = to_zoom;
            return;
        }
        self.animation = Some(ViewAnimation {
            start_time: now,
            duration: duration_secs,
            from_center: self.center,
            to_center,
            from_resolution: self.resolution(),
            to_resolution: resolution_for_zoom(to_zoom),
            to_zoom,
        });
    }

    /// Advances the running animation. Returns true while one is still active.
    pub fn tick(&mut self, now: f64) -> bool {
        let Some(anim) = self.animation else {
            return false;
        };
        let elapsed = now - anim.start_time;
        if elapsed >= anim.duration {
            self.center = anim.to_center;
            self.zoom = anim.to_zoom;
            self.animation = None;
            return false;
        }
        let progress = in_and_out(elapsed / anim.duration);
        self.center = anim.from_center.lerp(anim.to_center, progress);
        let resolution =
            anim.from_resolution + (anim.to_resolution - anim.from_resolution) * progress;
        self.zoom = zoom_for_resolution(resolution).clamp(self.min_zoom, self.max_zoom);
        true
    }

    pub fn map_to_screen(&self, p: MapPoint, rect: egui::Rect) -> egui::Pos2 {
        let res = self.resolution();
        let c = rect.center();
        egui::pos2(
            c.x + ((p.x - self.center.x) / res) as f32,
            c.y - ((p.y - self.center.y) / res) as f32,
        )
    }

    pub fn screen_to_map(&self, pos: egui::Pos2, rect: egui::Rect) -> MapPoint {
        let res = self.resolution();
        let c = rect.center();
        MapPoint::new(
            self.center.x + (pos.x - c.x) as f64 * res,
            self.center.y - (pos.y - c.y) as f64 * res,
        )
    }

    /// Moves the content by `delta` screen pixels. Cancels any animation.
    pub fn pan_by_pixels(&mut self, delta: egui::Vec2) {
        self.animation = None;
        let res = self.resolution();
        self.center.x -= delta.x as f64 * res;
        self.center.y += delta.y as f64 * res;
    }

    /// Center that keeps the map point under `anchor` fixed after zooming to `zoom`.
    pub fn center_for_anchor(&self, zoom: f64, anchor: egui::Pos2, rect: egui::Rect) -> MapPoint {
        let zoom = zoom.clamp(self.min_zoom, self.max_zoom);
        let anchored = self.screen_to_map(anchor, rect);
        let res = resolution_for_zoom(zoom);
        let c = rect.center();
        MapPoint::new(
            anchored.x - (anchor.x - c.x) as f64 * res,
            anchored.y + (anchor.y - c.y) as f64 * res,
        )
    }

    pub fn zoom_around(&mut self, delta_zoom: f64, anchor: egui::Pos2, rect: egui::Rect) {
        self.animation = None;
        let zoom = (self.zoom + delta_zoom).clamp(self.min_zoom, self.max_zoom);
        self.center = self.center_for_anchor(zoom, anchor, rect);
        self.zoom = zoom;
    }

    /// Bottom-left and top-right corners of the visible area.
    pub fn extent(&self, rect: egui::Rect) -> (MapPoint, MapPoint) {
        let a = self.screen_to_map(rect.left_bottom(), rect);
        let b = self.screen_to_map(rect.right_top(), rect);
        (a, b)
    }
}

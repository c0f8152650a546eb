//! Map instance and the viewport component that draws it.
//!
//! The [`MapInstance`] is created once at startup and outlives any viewport:
//! it keeps the base tile layer, the view, and the popup overlay. A
//! [`MapViewport`] binds it to a container on mount and releases it on
//! unmount. Only one container can be bound at a time; the latest bind wins.

use crate::config::MapConfig;
use crate::popup::{autopan_delta, Popup, PopupContent};
use crate::projection::{from_lon_lat, to_lon_lat, to_string_hdms, LonLat, MapPoint};
use crate::tile::TileLayer;
use crate::view::{AnimationTarget, View};
use eframe::egui;
use thiserror::Error;

const POPUP_OFFSET: egui::Vec2 = egui::vec2(-50.0, -12.0);
const POPUP_MIN_WIDTH: f32 = 180.0;
const POPUP_MAX_WIDTH: f32 = 280.0;
const POPUP_PADDING: f32 = 15.0;
const CONTROL_SIZE: f32 = 28.0;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum MapError {
    #[error("no popup overlay is attached")]
    MissingOverlay,
}

pub struct MapInstance {
    config: MapConfig,
    target: Option<egui::Id>,
    layers: Vec<TileLayer>,
    view: View,
    popup: Option<Popup>,
}

impl MapInstance {
    pub fn new(config: &MapConfig) -> Self {
        let center = from_lon_lat(config.default_center);
        Self {
            config: config.clone(),
            target: None,
            layers: vec![TileLayer::new(config)],
            view: View::new(center, config.default_zoom, config.min_zoom, config.max_zoom),
            popup: None,
        }
    }

    /// Binds the map to `container`. Returns the container that was
    /// released, if a different one was bound.
    pub fn bind(&mut self, container: egui::Id) -> Option<egui::Id> {
        match self.target.replace(container) {
            Some(prev) if prev != container => {
                log::info!("map rebound from {:?} to {:?}", prev, container);
                Some(prev)
            }
            _ => None,
        }
    }

    /// Clears the target if `container` holds it. The map itself stays alive.
    pub fn unbind(&mut self, container: egui::Id) -> bool {
        if self.target == Some(container) {
            self.target = None;
            true
        } else {
            false
        }
    }

    pub fn target(&self) -> Option<egui::Id> {
        self.target
    }

    pub fn layer_count(&self) -> usize {
        self.layers.len()
    }

    pub fn cached_tiles(&self) -> usize {
        self.layers.iter().map(TileLayer::cached_tiles).sum()
    }

    pub fn overlay_count(&self) -> usize {
        usize::from(self.popup.is_some())
    }

    pub fn attach_popup(&mut self) {
        self.popup = Some(Popup::new());
    }

    pub fn detach_popup(&mut self) {
        self.popup = None;
    }

    pub fn popup(&self) -> Option<&Popup> {
        self.popup.as_ref()
    }

    pub(crate) fn popup_mut(&mut self) -> Result<&mut Popup, MapError> {
        self.popup.as_mut().ok_or(MapError::MissingOverlay)
    }

    pub fn view(&self) -> &View {
        &self.view
    }

    pub fn view_mut(&mut self) -> &mut View {
        &mut self.view
    }

    /// Opens the popup at `coordinate` showing its DMS form. Ignored unless
    /// the map is bound and has a popup attached.
    pub fn handle_click(&mut self, coordinate: MapPoint) -> bool {
        if self.target.is_none() {
            return false;
        }
        let hdms = to_string_hdms(to_lon_lat(coordinate));
        match self.popup_mut() {
            Ok(popup) => {
                popup.open(coordinate, PopupContent::Clicked { hdms });
                true
            }
            Err(e) => {
                log::debug!("click ignored: {}", e);
                false
            }
        }
    }

    pub fn close_popup(&mut self) {
        if let Ok(popup) = self.popup_mut() {
            if popup.is_visible() {
                popup.close();
                log::debug!("popup closed");
            }
        }
    }

    /// Shows "Mapped to" at `(lon, lat)` and flies the view there.
    pub fn zoom_to_location(&mut self, lon: f64, lat: f64, now: f64) {
        let lon_lat = LonLat::new(lon, lat);
        let coordinate = from_lon_lat(lon_lat);
        log::debug!("flying from {:?} to {:?}", self.view.center(), coordinate);
        match self.popup_mut() {
            Ok(popup) => popup.open(
                coordinate,
                PopupContent::MappedTo { hdms: to_string_hdms(lon_lat) },
            ),
            Err(e) => log::debug!("zoom to location without popup: {}", e),
        }
        self.view.animate(
            AnimationTarget { center: Some(coordinate), zoom: Some(self.config.location_zoom) },
            self.config.location_animation_secs,
            now,
        );
    }

    pub fn zoom_by(&mut self, delta: f64, now: f64) {
        let zoom = self.view.zoom() + delta;
        self.view.animate(
            AnimationTarget { center: None, zoom: Some(zoom) },
            self.config.control_animation_secs,
            now,
        );
    }

    pub fn tick(&mut self, now: f64) -> bool {
        self.view.tick(now)
    }

    fn draw_layers(&mut self, ctx: &egui::Context, painter: &egui::Painter, rect: egui::Rect, now: f64) {
        for layer in &mut self.layers {
            layer.poll(ctx, now);
            layer.draw(ctx, painter, &self.view, rect, now);
        }
    }
}

fn popup_frame() -> egui::Frame {
    egui::Frame::default()
        .fill(egui::Color32::WHITE)
        .stroke(egui::Stroke::new(1.0, egui::Color32::from_gray(0xcc)))
        .corner_radius(10.0)
        .inner_margin(POPUP_PADDING)
}

/// UI component that mounts the shared map into one container.
pub struct MapViewport {
    container: egui::Id,
    mounted: bool,
}

impl MapViewport {
    pub fn new(container: egui::Id) -> Self {
        Self { container, mounted: false }
    }

    #[cfg(test)]
    pub fn container(&self) -> egui::Id {
        self.container
    }

    #[cfg(test)]
    pub fn is_mounted(&self) -> bool {
        self.mounted
    }

    pub fn mount(&mut self, map: &mut MapInstance) {
        if self.mounted {
            return;
        }
        map.bind(self.container);
        map.attach_popup();
        self.mounted = true;
        log::info!(
            "map viewport mounted into {:?} ({} layers, {} overlays, {} tiles cached)",
            self.container,
            map.layer_count(),
            map.overlay_count(),
            map.cached_tiles()
        );
    }

    pub fn unmount(&mut self, map: &mut MapInstance) {
        if !self.mounted {
            return;
        }
        if map.unbind(self.container) {
            map.detach_popup();
        }
        self.mounted = false;
        log::info!("map viewport unmounted from {:?}", self.container);
    }

    pub fn show(&mut self, ui: &mut egui::Ui, map: &mut MapInstance) {
        self.mount(map);
        if map.target() != Some(self.container) {
            return;
        }

        let ctx = ui.ctx().clone();
        let now = ui.input(|i| i.time);
        let (response, painter) =
            ui.allocate_painter(ui.available_size(), egui::Sense::click_and_drag());
        let rect = response.rect;
        painter.rect_filled(rect, 0.0, egui::Color32::from_rgb(0xaa, 0xd3, 0xdf));

        if response.dragged() {
            map.view_mut().pan_by_pixels(response.drag_delta());
        }
        if let Some(hover) = response.hover_pos() {
            let (scroll, pinch) = ui.input(|i| (i.smooth_scroll_delta.y, i.zoom_delta()));
            let mut dz = (scroll / 300.0) as f64;
            if pinch != 1.0 {
                dz += (pinch as f64).log2();
            }
            if dz != 0.0 {
                map.view_mut().zoom_around(dz, hover, rect);
            }
        }
        if response.double_clicked() {
            if let Some(pos) = response.interact_pointer_pos() {
                let zoom = map.view().zoom() + 1.0;
                let center = map.view().center_for_anchor(zoom, pos, rect);
                let secs = map.config.control_animation_secs;
                map.view_mut().animate(
                    AnimationTarget { center: Some(center), zoom: Some(zoom) },
                    secs,
                    now,
                );
            }
        } else if response.clicked() {
            if let Some(pos) = response.interact_pointer_pos() {
                let coordinate = map.view().screen_to_map(pos, rect);
                map.handle_click(coordinate);
            }
        }

        if map.tick(now) {
            ctx.request_repaint();
        }

        map.draw_layers(&ctx, &painter, rect, now);
        self.show_attribution(&painter, rect, &map.config.attribution);
        self.show_zoom_controls(ui, map, rect, now);
        self.show_popup(&ctx, map, rect, now);
    }

    fn show_attribution(&self, painter: &egui::Painter, rect: egui::Rect, text: &str) {
        let galley = painter.layout_no_wrap(
            text.to_string(),
            egui::FontId::proportional(11.0),
            egui::Color32::from_gray(0x33),
        );
        let pos = rect.right_bottom() - galley.size() - egui::vec2(6.0, 4.0);
        let bg = egui::Rect::from_min_size(pos, galley.size()).expand(3.0);
        painter.rect_filled(bg, 3.0, egui::Color32::from_white_alpha(200));
        painter.galley(pos, galley, egui::Color32::from_gray(0x33));
    }

    fn show_zoom_controls(&self, ui: &mut egui::Ui, map: &mut MapInstance, rect: egui::Rect, now: f64) {
        let size = egui::vec2(CONTROL_SIZE, CONTROL_SIZE);
        let zoom_in = egui::Rect::from_min_size(
            rect.right_top() + egui::vec2(-CONTROL_SIZE - 8.0, 8.0),
            size,
        );
        let zoom_out = zoom_in.translate(egui::vec2(0.0, CONTROL_SIZE + 2.0));
        if ui.put(zoom_in, egui::Button::new("+")).on_hover_text("Zoom in").clicked() {
            map.zoom_by(1.0, now);
        }
        if ui.put(zoom_out, egui::Button::new("\u{2212}")).on_hover_text("Zoom out").clicked() {
            map.zoom_by(-1.0, now);
        }
    }

    fn show_popup(&self, ctx: &egui::Context, map: &mut MapInstance, rect: egui::Rect, now: f64) {
        let Some(popup) = map.popup() else { return };
        let (Some(anchor), Some(content)) = (popup.anchor(), popup.content().cloned()) else {
            return;
        };
        let tip = map.view().map_to_screen(anchor, rect);
        let corner = tip + POPUP_OFFSET;
        let ink = egui::Color32::BLACK;

        let mut close = false;
        let inner = egui::Area::new(self.container.with("popup"))
            .order(egui::Order::Foreground)
            .pivot(egui::Align2::LEFT_BOTTOM)
            .fixed_pos(corner)
            .constrain(false)
            .show(ctx, |ui| {
                popup_frame().show(ui, |ui| {
                    ui.set_min_width(POPUP_MIN_WIDTH - 2.0 * POPUP_PADDING);
                    ui.set_max_width(POPUP_MAX_WIDTH - 2.0 * POPUP_PADDING);
                    ui.horizontal(|ui| {
                        ui.label(egui::RichText::new(content.heading()).color(ink));
                        ui.with_layout(egui::Layout::right_to_left(egui::Align::TOP), |ui| {
                            let closer = egui::Button::new(
                                egui::RichText::new("\u{2716}").strong().color(ink),
                            )
                            .frame(false);
                            if ui.add(closer).on_hover_text("Close").clicked() {
                                close = true;
                            }
                        });
                    });
                    ui.label(egui::RichText::new(content.hdms()).code().color(ink));
                });
            });

        let tip_painter = ctx.layer_painter(egui::LayerId::new(
            egui::Order::Foreground,
            self.container.with("popup_tip"),
        ));
        tip_painter.add(egui::Shape::convex_polygon(
            vec![tip + egui::vec2(-10.0, -12.0), tip + egui::vec2(10.0, -12.0), tip],
            egui::Color32::WHITE,
            egui::Stroke::new(1.0, egui::Color32::from_gray(0xcc)),
        ));

        if close {
            map.close_popup();
            return;
        }

        let wants_autopan = map.popup_mut().map(|p| p.take_autopan()).unwrap_or(false);
        if wants_autopan && !map.view().is_animating() {
            let size = inner.response.rect.size();
            let popup_rect = egui::Rect::from_min_size(corner - egui::vec2(0.0, size.y), size);
            let delta = autopan_delta(popup_rect, rect, map.config.autopan_margin);
            if delta != egui::Vec2::ZERO {
                let center = map.view().screen_to_map(rect.center() + delta, rect);
                let secs = map.config.autopan_animation_secs;
                map.view_mut().animate(
                    AnimationTarget { center: Some(center), zoom: None },
                    secs,
                    now,
                );
            }
        }
    }
}

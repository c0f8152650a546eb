//! Popup overlay: anchor, structured content, and auto-pan placement.

use crate::projection::MapPoint;
use eframe::egui;

#[derive(Clone, Debug, PartialEq)]
pub enum PopupContent {
    Clicked { hdms: String },
    MappedTo { hdms: String },
}

impl PopupContent {
    pub fn heading(&self) -> &'static str {
        match self {
            PopupContent::Clicked { .. } => "You clicked here:",
            PopupContent::MappedTo { .. } => "Mapped to:",
        }
    }

    pub fn hdms(&self) -> &str {
        match self {
            PopupContent::Clicked { hdms } | PopupContent::MappedTo { hdms } => hdms,
        }
    }
}

/// Overlay anchored to a map coordinate. Shown iff an anchor is set.
#[derive(Debug, Default)]
pub struct Popup {
    anchor: Option<MapPoint>,
    content: Option<PopupContent>,
    autopan_pending: bool,
}

impl Popup {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn open(&mut self, anchor: MapPoint, content: PopupContent) {
        self.anchor = Some(anchor);
        self.content = Some(content);
        self.autopan_pending = true;
    }

    pub fn close(&mut self) {
        self.anchor = None;
        self.autopan_pending = false;
    }

    pub fn is_visible(&self) -> bool {
        self.anchor.is_some()
    }

    pub fn anchor(&self) -> Option<MapPoint> {
        self.anchor
    }

    pub fn content(&self) -> Option<&PopupContent> {
        self.content.as_ref()
    }

    /// Returns true once after each `open`.
    pub fn take_autopan(&mut self) -> bool {
        std::mem::take(&mut self.autopan_pending)
    }
}

/// Pixel shift that brings `popup` inside `map` with `margin` to spare.
/// Zero on an axis where the popup already fits.
pub fn autopan_delta(popup: egui::Rect, map: egui::Rect, margin: f32) -> egui::Vec2 {
    let offset_left = popup.min.x - map.min.x;
    let offset_right = map.max.x - popup.max.x;
    let offset_top = popup.min.y - map.min.y;
    let offset_bottom = map.max.y - popup.max.y;

    let mut delta = egui::Vec2::ZERO;
    if offset_left < 0.0 {
        delta.x = offset_left - margin;
    } else if offset_right < 0.0 {
        delta.x = offset_right.abs() + margin;
    }
    if offset_top < 0.0 {
        delta.y = offset_top - margin;
    } else if offset_bottom < 0.0 {
        delta.y = offset_bottom.abs() + margin;
    }
    delta
}

#[cfg(test)]
mod tests {
    use super::*;

    fn map_rect() -> egui::Rect {
        egui::Rect::from_min_max(egui::pos2(0.0, 0.0), egui::pos2(800.0, 600.0))
    }

    #[test]
    fn visible_iff_anchored() {
        let mut p = Popup::new();
        assert!(!p.is_visible());
        p.open(MapPoint::new(1.0, 2.0), PopupContent::Clicked { hdms: "x".into() });
        assert!(p.is_visible());
        assert_eq!(p.anchor(), Some(MapPoint::new(1.0, 2.0)));
        p.close();
        assert!(!p.is_visible());
        assert_eq!(p.anchor(), None);
    }

    #[test]
    fn reopens_after_close() {
        let mut p = Popup::new();
        p.open(MapPoint::new(1.0, 2.0), PopupContent::Clicked { hdms: "a".into() });
        p.close();
        p.open(MapPoint::new(3.0, 4.0), PopupContent::Clicked { hdms: "b".into() });
        assert!(p.is_visible());
        assert_eq!(p.content().map(PopupContent::hdms), Some("b"));
    }

    #[test]
    fn autopan_flag_is_one_shot() {
        let mut p = Popup::new();
        p.open(MapPoint::new(0.0, 0.0), PopupContent::MappedTo { hdms: "m".into() });
        assert!(p.take_autopan());
        assert!(!p.take_autopan());
    }

    #[test]
    fn headings() {
        assert_eq!(PopupContent::Clicked { hdms: String::new() }.heading(), "You clicked here:");
        assert_eq!(PopupContent::MappedTo { hdms: String::new() }.heading(), "Mapped to:");
    }

    #[test]
    fn autopan_zero_when_inside() {
        let popup = egui::Rect::from_min_size(egui::pos2(100.0, 100.0), egui::vec2(200.0, 80.0));
        assert_eq!(autopan_delta(popup, map_rect(), 20.0), egui::Vec2::ZERO);
    }

    #[test]
    fn autopan_shifts_past_top_left() {
        let popup = egui::Rect::from_min_size(egui::pos2(-30.0, -10.0), egui::vec2(200.0, 80.0));
        assert_eq!(autopan_delta(popup, map_rect(), 20.0), egui::vec2(-50.0, -30.0));
    }

    #[test]
    fn autopan_shifts_past_bottom_right() {
        let popup = egui::Rect::from_min_size(egui::pos2(700.0, 560.0), egui::vec2(200.0, 80.0));
        assert_eq!(autopan_delta(popup, map_rect(), 20.0), egui::vec2(120.0, 60.0));
    }
}

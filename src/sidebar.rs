//! Navigation rail with a sliding panel listing saved locations.

use crate::config::SidebarConfig;
use crate::locations::{Location, LOCATIONS_QUERY};
use crate::query::{FetchTicket, QueryClient, QueryStatus};
use eframe::egui;

const RAIL_BG: egui::Color32 = egui::Color32::from_rgb(0x11, 0x11, 0x11);
const PANEL_BG: egui::Color32 = egui::Color32::from_rgb(0x1a, 0x1a, 0x1a);
const HOVER_BG: egui::Color32 = egui::Color32::from_rgb(0x33, 0x33, 0x33);
const ROW_HEIGHT: f32 = 44.0;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Panel {
    Home,
    Apps,
    Search,
}

impl Panel {
    pub const ALL: [Panel; 3] = [Panel::Home, Panel::Apps, Panel::Search];

    pub fn icon(&self) -> &'static str {
        match self {
            Panel::Home => "\u{1f3e0}",
            Panel::Apps => "\u{26a1}",
            Panel::Search => "\u{1f50d}",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Panel::Home => "Home",
            Panel::Apps => "Apps",
            Panel::Search => "Search",
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub enum SidebarAction {
    ZoomTo(Location),
}

#[derive(Clone, Debug, PartialEq)]
pub struct LocationRow {
    pub label: String,
    pub location: Location,
}

/// What the home panel shows for a given query state.
#[derive(Clone, Debug, PartialEq)]
pub enum HomeBody {
    Loading,
    Error,
    Rows(Vec<LocationRow>),
}

impl HomeBody {
    pub fn from_status(status: Option<&QueryStatus<Vec<Location>>>) -> Self {
        match status {
            None | Some(QueryStatus::Loading) => HomeBody::Loading,
            Some(QueryStatus::Error(_)) => HomeBody::Error,
            Some(QueryStatus::Success(locations)) => HomeBody::Rows(
                locations
                    .iter()
                    .enumerate()
                    .map(|(i, &location)| LocationRow {
                        label: format!("Location {}", i + 1),
                        location,
                    })
                    .collect(),
            ),
        }
    }
}

pub struct Sidebar {
    config: SidebarConfig,
    selected: Option<Panel>,
    mounted: bool,
}

impl Sidebar {
    pub fn new(config: &SidebarConfig) -> Self {
        Self { config: config.clone(), selected: Some(Panel::Home), mounted: false }
    }

    #[cfg(test)]
    pub fn selected(&self) -> Option<Panel> {
        self.selected
    }

    /// Selecting the open panel closes it; anything else switches to `panel`.
    pub fn toggle(&mut self, panel: Panel) {
        self.selected = if self.selected == Some(panel) { None } else { Some(panel) };
    }

    #[cfg(test)]
    pub fn is_mounted(&self) -> bool {
        self.mounted
    }

    /// Starts observing the locations query. Returns a ticket if the caller
    /// must start the fetch.
    pub fn mount(&mut self, client: &mut QueryClient<Vec<Location>>) -> Option<FetchTicket> {
        if self.mounted {
            return None;
        }
        self.mounted = true;
        client.subscribe(LOCATIONS_QUERY)
    }

    pub fn unmount(&mut self, client: &mut QueryClient<Vec<Location>>) {
        if !self.mounted {
            return;
        }
        self.mounted = false;
        client.unsubscribe(LOCATIONS_QUERY);
    }

    pub fn locations_url(&self) -> &str {
        &self.config.locations_url
    }

    /// Fixed-width icon rail. Must run before the central panel.
    pub fn show_rail(&mut self, ctx: &egui::Context) {
        let width = self.config.rail_width;
        egui::SidePanel::left("sidebar_rail")
            .resizable(false)
            .exact_width(width)
            .frame(egui::Frame::default().fill(RAIL_BG).inner_margin(egui::Margin::symmetric(0, 20)))
            .show(ctx, |ui| {
                ui.spacing_mut().item_spacing.y = 0.0;
                for panel in Panel::ALL {
                    let active = self.selected == Some(panel);
                    if rail_button(ui, panel, active, width).clicked() {
                        self.toggle(panel);
                    }
                }
            });
    }

    /// Sliding panel drawn over the map, right of the rail.
    pub fn show_panel(
        &mut self,
        ctx: &egui::Context,
        client: &QueryClient<Vec<Location>>,
    ) -> Option<SidebarAction> {
        let open = ctx.animate_bool_with_time_and_easing(
            egui::Id::new("sidebar_panel_open"),
            self.selected.is_some(),
            self.config.slide_secs,
            egui::emath::easing::cubic_in_out,
        );
        if open <= 0.0 {
            return None;
        }

        let screen = ctx.screen_rect();
        let rail_right = screen.min.x + self.config.rail_width;
        let width = self.config.panel_width;
        let (left, interactable) = panel_slide(rail_right, width, open);
        let clip = egui::Rect::from_min_max(egui::pos2(rail_right, screen.min.y), screen.max);

        let mut action = None;
        egui::Area::new(egui::Id::new("sidebar_panel"))
            .order(egui::Order::Middle)
            .fixed_pos(egui::pos2(left, screen.min.y))
            .constrain(false)
            .interactable(interactable)
            .show(ctx, |ui| {
                ui.set_clip_rect(clip);
                egui::Frame::default()
                    .fill(PANEL_BG)
                    .inner_margin(egui::Margin { top: 20, ..Default::default() })
                    .show(ui, |ui| {
                        ui.set_width(width);
                        ui.set_height(screen.height() - 20.0);
                        ui.spacing_mut().item_spacing.y = 0.0;
                        ui.visuals_mut().override_text_color = Some(egui::Color32::WHITE);
                        match self.selected {
                            Some(Panel::Home) => {
                                action = show_home(ui, HomeBody::from_status(client.status(LOCATIONS_QUERY)));
                            }
                            Some(Panel::Apps) => show_apps(ui),
                            Some(Panel::Search) | None => {}
                        }
                    });
            });
        if open < 1.0 {
            ctx.request_repaint();
        }
        action
    }
}

/// Left edge of the panel at slide progress `open`, and whether it takes
/// input. Mid-slide the panel overlaps the rail, so only a fully open panel
/// is interactable.
fn panel_slide(rail_right: f32, width: f32, open: f32) -> (f32, bool) {
    (rail_right - width * (1.0 - open), open >= 1.0)
}

fn rail_button(ui: &mut egui::Ui, panel: Panel, active: bool, width: f32) -> egui::Response {
    let (rect, response) =
        ui.allocate_exact_size(egui::vec2(width, 90.0), egui::Sense::click());
    if response.hovered() || active {
        ui.painter().rect_filled(rect, 0.0, HOVER_BG);
    }
    ui.painter().text(
        rect.center(),
        egui::Align2::CENTER_CENTER,
        panel.icon(),
        egui::FontId::proportional(30.0),
        egui::Color32::WHITE,
    );
    response.on_hover_text(panel.label())
}

/// Full-width clickable row. Returns the click response.
fn menu_row(ui: &mut egui::Ui, icon: Option<&str>, label: &str) -> egui::Response {
    let (rect, response) =
        ui.allocate_exact_size(egui::vec2(ui.available_width(), ROW_HEIGHT), egui::Sense::click());
    if response.hovered() {
        ui.painter().rect_filled(rect, 0.0, HOVER_BG);
    }
    let mut x = rect.min.x + 10.0;
    if let Some(icon) = icon {
        ui.painter().text(
            egui::pos2(rect.min.x + 30.0, rect.center().y),
            egui::Align2::CENTER_CENTER,
            icon,
            egui::FontId::proportional(16.0),
            egui::Color32::WHITE,
        );
        x = rect.min.x + 60.0;
    }
    ui.painter().text(
        egui::pos2(x, rect.center().y),
        egui::Align2::LEFT_CENTER,
        label,
        egui::FontId::proportional(18.0),
        egui::Color32::WHITE,
    );
    response
}

fn show_home(ui: &mut egui::Ui, body: HomeBody) -> Option<SidebarAction> {
    match body {
        HomeBody::Loading => {
            ui.label("Loading...");
            None
        }
        HomeBody::Error => {
            ui.label("Error loading locations");
            None
        }
        HomeBody::Rows(rows) => {
            let mut action = None;
            egui::ScrollArea::vertical().auto_shrink([false, false]).show(ui, |ui| {
                for row in rows {
                    if menu_row(ui, None, &row.label).clicked() {
                        action = Some(SidebarAction::ZoomTo(row.location));
                    }
                }
            });
            action
        }
    }
}

fn show_apps(ui: &mut egui::Ui) {
    for name in ["App 1", "App 2"] {
        menu_row(ui, Some(Panel::Apps.icon()), name);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fetch::FetchError;

    fn sidebar() -> Sidebar {
        Sidebar::new(&SidebarConfig::default())
    }

    #[test]
    fn sliding_panel_leaves_the_rail_clickable() {
        let (left, interactable) = panel_slide(80.0, 300.0, 0.5);
        assert_eq!(left, -70.0);
        assert!(!interactable);
        assert_eq!(panel_slide(80.0, 300.0, 1.0), (80.0, true));
    }

    #[test]
    fn starts_on_home() {
        assert_eq!(sidebar().selected(), Some(Panel::Home));
    }

    #[test]
    fn toggling_same_panel_twice_closes_it() {
        let mut s = sidebar();
        s.toggle(Panel::Apps);
        s.toggle(Panel::Apps);
        assert_eq!(s.selected(), None);
        s.toggle(Panel::Home);
        assert_eq!(s.selected(), Some(Panel::Home));
        s.toggle(Panel::Home);
        assert_eq!(s.selected(), None);
    }

    #[test]
    fn toggling_different_panels_keeps_the_last() {
        let mut s = sidebar();
        s.toggle(Panel::Search);
        s.toggle(Panel::Apps);
        assert_eq!(s.selected(), Some(Panel::Apps));
    }

    #[test]
    fn mount_fetches_once_and_toggling_never_refetches() {
        let mut s = sidebar();
        let mut client = QueryClient::new();
        assert!(s.mount(&mut client).is_some());
        assert!(s.mount(&mut client).is_none());
        for panel in Panel::ALL {
            s.toggle(panel);
        }
        assert_eq!(client.observers(LOCATIONS_QUERY), 1);
    }

    #[test]
    fn unmount_evicts_and_drops_late_results() {
        let mut s = sidebar();
        let mut client = QueryClient::new();
        let ticket = s.mount(&mut client).unwrap();
        s.unmount(&mut client);
        assert!(!s.is_mounted());
        assert!(!client.resolve(ticket, Ok(vec![])));
        assert_eq!(client.status(LOCATIONS_QUERY), None);
    }

    #[test]
    fn home_body_rows_are_numbered() {
        let locations = vec![
            Location { lat: 37.0, lon: 127.0 },
            Location { lat: 35.0, lon: 129.0 },
            Location { lat: 33.5, lon: 126.5 },
        ];
        let status = QueryStatus::Success(locations.clone());
        let HomeBody::Rows(rows) = HomeBody::from_status(Some(&status)) else {
            panic!("expected rows");
        };
        let labels: Vec<_> = rows.iter().map(|r| r.label.as_str()).collect();
        assert_eq!(labels, ["Location 1", "Location 2", "Location 3"]);
        assert_eq!(rows[2].location, locations[2]);
    }

    #[test]
    fn home_body_states() {
        assert_eq!(HomeBody::from_status(None), HomeBody::Loading);
        assert_eq!(HomeBody::from_status(Some(&QueryStatus::Loading)), HomeBody::Loading);
        for e in [
            FetchError::Network("reset".into()),
            FetchError::Status(502),
            FetchError::Decode("eof".into()),
        ] {
            assert_eq!(HomeBody::from_status(Some(&QueryStatus::Error(e))), HomeBody::Error);
        }
        assert_eq!(
            HomeBody::from_status(Some(&QueryStatus::Success(vec![]))),
            HomeBody::Rows(vec![])
        );
    }
}

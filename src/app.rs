//! Application shell and eframe integration.
//!
//! Owns the map instance, its viewport, the sidebar and the locations
//! query, and wires them together in the per-frame update loop.

use crate::config::ViewerConfig;
use crate::locations::{Location, LocationFetcher};
use crate::map::{MapInstance, MapViewport};
use crate::query::QueryClient;
use crate::sidebar::{Sidebar, SidebarAction};
use eframe::egui;

pub(crate) struct App {
    map: MapInstance,
    viewport: MapViewport,
    sidebar: Sidebar,
    queries: QueryClient<Vec<Location>>,
    fetcher: LocationFetcher,
}

impl App {
    pub(crate) fn new(cc: &eframe::CreationContext<'_>) -> Self {
        let mut app = Self::unmounted(&ViewerConfig::default());
        app.mount(&cc.egui_ctx);
        app
    }

    fn unmounted(config: &ViewerConfig) -> Self {
        Self {
            map: MapInstance::new(&config.map),
            viewport: MapViewport::new(egui::Id::new("map_viewport")),
            sidebar: Sidebar::new(&config.sidebar),
            queries: QueryClient::new(),
            fetcher: LocationFetcher::new(),
        }
    }

    fn mount(&mut self, ctx: &egui::Context) {
        if let Some(ticket) = self.sidebar.mount(&mut self.queries) {
            self.fetcher.start(ticket, self.sidebar.locations_url(), ctx);
        }
        self.viewport.mount(&mut self.map);
    }

    fn unmount(&mut self) {
        self.sidebar.unmount(&mut self.queries);
        self.viewport.unmount(&mut self.map);
    }

    fn apply(&mut self, action: SidebarAction, now: f64) {
        match action {
            SidebarAction::ZoomTo(location) => {
                log::debug!("zooming to {:?}", location);
                self.map.zoom_to_location(location.lon, location.lat, now);
            }
        }
    }
}

impl eframe::App for App {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        self.fetcher.poll(&mut self.queries);

        self.sidebar.show_rail(ctx);
        egui::CentralPanel::default()
            .frame(egui::Frame::NONE)
            .show(ctx, |ui| self.viewport.show(ui, &mut self.map));

        if let Some(action) = self.sidebar.show_panel(ctx, &self.queries) {
            let now = ctx.input(|i| i.time);
            self.apply(action, now);
        }
    }

    fn on_exit(&mut self, _gl: Option<&eframe::glow::Context>) {
        self.unmount();
        log::info!("viewer shut down");
    }
}

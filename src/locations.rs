//! Saved locations: payload parsing and the background fetch driver.

use crate::fetch::{self, FetchError};
use crate::query::{FetchTicket, QueryClient};
use eframe::egui;
use serde::Deserialize;

pub const LOCATIONS_QUERY: &str = "locations";

/// A saved point. The endpoint sends each one as `[lat, lon]`.
#[derive(Clone, Copy, Debug, PartialEq, Deserialize)]
#[serde(from = "[f64; 2]")]
pub struct Location {
    pub lat: f64,
    pub lon: f64,
}

impl From<[f64; 2]> for Location {
    fn from([lat, lon]: [f64; 2]) -> Self {
        Self { lat, lon }
    }
}

#[derive(Deserialize)]
struct LocationsResponse {
    locations: Vec<Location>,
}

pub fn parse_locations(bytes: &[u8]) -> Result<Vec<Location>, FetchError> {
    serde_json::from_slice::<LocationsResponse>(bytes)
        .map(|r| r.locations)
        .map_err(|e| FetchError::Decode(e.to_string()))
}

type FetchOutcome = (FetchTicket, Result<Vec<Location>, FetchError>);

#[cfg(not(target_arch = "wasm32"))]
pub fn fetch_locations(url: &str) -> Result<Vec<Location>, FetchError> {
    let bytes = fetch::get_bytes(url)?;
    parse_locations(&bytes)
}

#[cfg(target_arch = "wasm32")]
thread_local! {
    static LOCATION_FETCH_RESULT: std::cell::RefCell<Vec<FetchOutcome>> = std::cell::RefCell::new(Vec::new());
}

/// Runs location fetches off the UI thread and feeds them to the query cache.
pub struct LocationFetcher {
    #[cfg(not(target_arch = "wasm32"))]
    tx: std::sync::mpsc::Sender<FetchOutcome>,
    #[cfg(not(target_arch = "wasm32"))]
    rx: std::sync::mpsc::Receiver<FetchOutcome>,
}

impl Default for LocationFetcher {
    fn default() -> Self {
        Self::new()
    }
}

impl LocationFetcher {
    pub fn new() -> Self {
        #[cfg(not(target_arch = "wasm32"))]
        {
            let (tx, rx) = std::sync::mpsc::channel();
            Self { tx, rx }
        }
        #[cfg(target_arch = "wasm32")]
        {
            Self {}
        }
    }

    pub fn start(&self, ticket: FetchTicket, url: &str, ctx: &egui::Context) {
        log::info!("fetching locations from {}", url);
        let url = url.to_string();
        let ctx = ctx.clone();

        #[cfg(not(target_arch = "wasm32"))]
        {
            let tx = self.tx.clone();
            let spawned = std::thread::Builder::new()
                .name("locations-fetch".into())
                .spawn(move || {
                    let _ = tx.send((ticket, fetch_locations(&url)));
                    ctx.request_repaint();
                });
            if let Err(e) = spawned {
                let _ = self.tx.send((ticket, Err(FetchError::Network(e.to_string()))));
            }
        }

        #[cfg(target_arch = "wasm32")]
        wasm_bindgen_futures::spawn_local(async move {
            let result = match fetch::get_bytes(&url).await {
                Ok(bytes) => parse_locations(&bytes),
                Err(e) => Err(e),
            };
            LOCATION_FETCH_RESULT.with(|cell| cell.borrow_mut().push((ticket, result)));
            ctx.request_repaint();
        });
    }

    pub fn poll(&self, client: &mut QueryClient<Vec<Location>>) {
        #[cfg(not(target_arch = "wasm32"))]
        let done: Vec<FetchOutcome> = self.rx.try_iter().collect();
        #[cfg(target_arch = "wasm32")]
        let done = LOCATION_FETCH_RESULT.with(|cell| std::mem::take(&mut *cell.borrow_mut()));

        for (ticket, result) in done {
            match &result {
                Ok(locations) => log::info!("loaded {} locations", locations.len()),
                Err(e) => log::warn!("loading locations failed: {}", e),
            }
            client.resolve(ticket, result);
        }
    }
}

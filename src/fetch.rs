//! HTTP GET for the native and browser builds.

use thiserror::Error;

pub const USER_AGENT: &str = concat!("locview/", env!("CARGO_PKG_VERSION"));

#[derive(Debug, Clone, PartialEq, Error)]
pub enum FetchError {
    #[error("request failed: {0}")]
    Network(String),
    #[error("server responded with HTTP {0}")]
    Status(u16),
    #[error("malformed response: {0}")]
    Decode(String),
}

#[cfg(not(target_arch = "wasm32"))]
pub fn get_bytes(url: &str) -> Result<Vec<u8>, FetchError> {
    use std::io::Read as _;

    let response = ureq::get(url)
        .set("User-Agent", USER_AGENT)
        .call()
        .map_err(|e| match e {
            ureq::Error::Status(code, _) => FetchError::Status(code),
            other => FetchError::Network(other.to_string()),
        })?;

    let mut bytes = Vec::new();
    response
        .into_reader()
        .read_to_end(&mut bytes)
        .map_err(|e| FetchError::Network(e.to_string()))?;
    Ok(bytes)
}

#[cfg(target_arch = "wasm32")]
pub async fn get_bytes(url: &str) -> Result<Vec<u8>, FetchError> {
    use wasm_bindgen::JsCast as _;
    use web_sys::{Request, RequestInit, RequestMode, Response};

    let opts = RequestInit::new();
    opts.set_method("GET");
    opts.set_mode(RequestMode::Cors);

    let request = Request::new_with_str_and_init(url, &opts)
        .map_err(|e| FetchError::Network(format!("{:?}", e)))?;

    let window = web_sys::window().ok_or_else(|| FetchError::Network("no window".into()))?;
    let resp_value = wasm_bindgen_futures::JsFuture::from(window.fetch_with_request(&request))
        .await
        .map_err(|e| FetchError::Network(format!("{:?}", e)))?;

    let resp: Response = resp_value
        .dyn_into()
        .map_err(|_| FetchError::Network("response is not a Response".into()))?;

    if !resp.ok() {
        return Err(FetchError::Status(resp.status()));
    }

    let array_buffer = wasm_bindgen_futures::JsFuture::from(
        resp.array_buffer().map_err(|e| FetchError::Network(format!("{:?}", e)))?,
    )
    .await
    .map_err(|e| FetchError::Network(format!("{:?}", e)))?;

    Ok(js_sys::Uint8Array::new(&array_buffer).to_vec())
}

use std::time::Duration;

use reqwest::header::{HeaderMap, HeaderValue, ACCEPT_ENCODING};
use reqwest::{Client, Proxy};

pub const APP_USER_AGENT: &str = "LauncherMirror/0.1.0";

/// Client for upstream API calls and source pages.
pub fn build_http_client() -> Result<Client, reqwest::Error> {
    Client::builder()
        .user_agent(APP_USER_AGENT)
        .connect_timeout(Duration::from_secs(30))
        .build()
}

/// Client for asset transfers. Bodies are streamed to disk as-is, so ask
/// for identity encoding and route through `proxy_url` when one is set.
pub fn build_download_client(proxy_url: Option<&str>) -> Result<Client, reqwest::Error> {
    let mut default_headers = HeaderMap::new();
    default_headers.insert(ACCEPT_ENCODING, HeaderValue::from_static("identity"));

    let mut builder = Client::builder()
        .user_agent(APP_USER_AGENT)
        .default_headers(default_headers)
        .connect_timeout(Duration::from_secs(30));

    if let Some(proxy) = proxy_url.filter(|p| !p.is_empty()) {
        builder = builder.proxy(Proxy::all(proxy)?);
    }

    builder.build()
}

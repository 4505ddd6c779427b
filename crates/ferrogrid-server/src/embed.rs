use axum::http::{header, HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use ferrogrid_core::config::ServerConfig;
use rust_embed::Embed;

#[derive(Embed)]
#[folder = "$CARGO_MANIFEST_DIR/assets/"]
struct PageAssets;

/// Placeholders in `index.html` that point the page's scripts back at us.
const HOST_ADDR: &str = "HOST_ADDR";
const HOST_PORT: &str = "HOST_PORT";

/// Address and port the browser used to reach us, falling back to the
/// configured bind address.
fn advertised_host(headers: &HeaderMap, server: &ServerConfig) -> (String, String) {
    let from_header = headers
        .get(header::HOST)
        .and_then(|h| h.to_str().ok())
        .map(str::trim)
        .filter(|h| !h.is_empty());

    match from_header {
        Some(host) => match host.rsplit_once(':') {
            Some((addr, port)) if port.chars().all(|c| c.is_ascii_digit()) => {
                (addr.to_string(), port.to_string())
            }
            _ => (host.to_string(), "80".to_string()),
        },
        None => (server.bind.clone(), server.port.to_string()),
    }
}

/// Render the control page with host placeholders filled in.
pub fn render_index(headers: &HeaderMap, server: &ServerConfig) -> Option<String> {
    let content = <PageAssets as Embed>::get("index.html")?;
    let html = String::from_utf8_lossy(&content.data);
    let (addr, port) = advertised_host(headers, server);
    Some(html.replace(HOST_ADDR, &addr).replace(HOST_PORT, &port))
}

/// Serve the control page.
pub fn index_page(headers: &HeaderMap, server: &ServerConfig) -> Response {
    match render_index(headers, server) {
        Some(html) => (StatusCode::OK, [(header::CONTENT_TYPE, "text/html")], html).into_response(),
        None => (StatusCode::NOT_FOUND, "control page not bundled").into_response(),
    }
}

/// Serve an embedded asset by path. Falls back to the control page.
pub fn static_asset(path: &str, headers: &HeaderMap, server: &ServerConfig) -> Response {
    let path = path.trim_start_matches('/');

    if !path.is_empty() && path != "index.html" {
        if let Some(content) = <PageAssets as Embed>::get(path) {
            let mime = mime_guess::from_path(path).first_or_octet_stream();
            return (
                StatusCode::OK,
                [(header::CONTENT_TYPE, mime.as_ref())],
                content.data.to_vec(),
            )
                .into_response();
        }
    }

    index_page(headers, server)
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    #[test]
    fn host_header_fills_placeholders() {
        let mut headers = HeaderMap::new();
        headers.insert(header::HOST, HeaderValue::from_static("192.168.1.40:8080"));
        let html = render_index(&headers, &ServerConfig::default()).unwrap();
        assert!(html.contains("192.168.1.40"));
        assert!(!html.contains(HOST_ADDR));
        assert!(!html.contains(HOST_PORT));
    }

    #[test]
    fn host_without_port_defaults_to_80() {
        let mut headers = HeaderMap::new();
        headers.insert(header::HOST, HeaderValue::from_static("ferro.local"));
        let (addr, port) = advertised_host(&headers, &ServerConfig::default());
        assert_eq!(addr, "ferro.local");
        assert_eq!(port, "80");
    }

    #[test]
    fn missing_host_uses_config() {
        let server = ServerConfig {
            bind: "10.0.0.2".into(),
            port: 9000,
        };
        let (addr, port) = advertised_host(&HeaderMap::new(), &server);
        assert_eq!((addr.as_str(), port.as_str()), ("10.0.0.2", "9000"));
    }

    #[test]
    fn unknown_asset_falls_back_to_page() {
        let response = static_asset("/nope.png", &HeaderMap::new(), &ServerConfig::default());
        assert_eq!(response.status(), StatusCode::OK);
    }
}

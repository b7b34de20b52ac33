use may_minihttp::Request;
use std::collections::HashMap;
use tracing::debug;

/// Everything the pipeline needs from a request before any body bytes are
/// read: method, path, decoded query, headers, and cookies.
///
/// Parsed once at entry, before route resolution. The body stays on the raw
/// request so ingestion can be bounded by the matched route's limit.
#[derive(Debug, PartialEq)]
pub struct RequestHead {
    /// HTTP method (GET, POST, ...).
    pub method: String,
    /// Request path with the query string stripped.
    pub path: String,
    /// HTTP headers (lowercase names).
    pub headers: HashMap<String, String>,
    /// Cookies parsed from the Cookie header.
    pub cookies: HashMap<String, String>,
    /// Decoded query-string parameters.
    pub query_params: HashMap<String, String>,
}

/// Parse the head of an incoming request.
pub fn parse_head(req: &Request) -> RequestHead {
    let method = req.method().to_string();
    let raw_path = req.path().to_string();
    let path = raw_path.split('?').next().unwrap_or("/").to_string();

    let headers: HashMap<String, String> = req
        .headers()
        .iter()
        .map(|h| {
            (
                h.name.to_ascii_lowercase(),
                String::from_utf8_lossy(h.value).to_string(),
            )
        })
        .collect();

    let cookies = parse_cookies(&headers);
    let query_params = parse_query_params(&raw_path);

    debug!(
        method = %method,
        path = %path,
        header_count = headers.len(),
        cookie_count = cookies.len(),
        query_count = query_params.len(),
        "Request head parsed"
    );

    RequestHead {
        method,
        path,
        headers,
        cookies,
        query_params,
    }
}

/// Split the Cookie header into a name/value map.
pub fn parse_cookies(headers: &HashMap<String, String>) -> HashMap<String, String> {
    headers
        .get("cookie")
        .map(|c| {
            c.split(';')
                .filter_map(|pair| {
                    let mut parts = pair.trim().splitn(2, '=');
                    let name = parts.next()?.trim().to_string();
                    let value = parts.next().unwrap_or("").trim().to_string();
                    Some((name, value))
                })
                .collect()
        })
        .unwrap_or_default()
}

/// Decode the query string (everything after `?`) with percent-decoding.
pub fn parse_query_params(path: &str) -> HashMap<String, String> {
    match path.find('?') {
        Some(pos) => url::form_urlencoded::parse(path[pos + 1..].as_bytes())
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect(),
        None => HashMap::new(),
    }
}

//! Transport-independent view of an inbound request.

use percent_encoding::percent_decode_str;
use url::form_urlencoded;

/// The parts of an HTTP request the dispatcher cares about.
#[derive(Debug, Clone)]
pub struct GatewayRequest {
    /// Path and query exactly as received; input of the cache fingerprint.
    uri: String,
    /// Percent-decoded URL path.
    gpath: String,
    /// Keys present in the URL query, in order.
    flags: Vec<String>,
    /// Named values: body pairs first, then query pairs.
    values: Vec<(String, String)>,
    has_body_values: bool,
}

impl GatewayRequest {
    /// Build a request from its path-and-query and an optional
    /// `application/x-www-form-urlencoded` body.
    pub fn new(path_and_query: &str, form_body: Option<&[u8]>) -> Self {
        let (path, query) = match path_and_query.split_once('?') {
            Some((path, query)) => (path, query),
            None => (path_and_query, ""),
        };

        let query_pairs: Vec<(String, String)> = form_urlencoded::parse(query.as_bytes())
            .into_owned()
            .collect();
        let body_pairs: Vec<(String, String)> = form_body
            .map(|body| form_urlencoded::parse(body).into_owned().collect())
            .unwrap_or_default();

        let flags = query_pairs.iter().map(|(key, _)| key.clone()).collect();
        let has_body_values = !body_pairs.is_empty();

        let mut values = body_pairs;
        values.extend(query_pairs);

        Self {
            uri: path_and_query.to_string(),
            gpath: percent_decode_str(path).decode_utf8_lossy().into_owned(),
            flags,
            values,
            has_body_values,
        }
    }

    pub fn uri(&self) -> &str {
        &self.uri
    }

    pub fn gpath(&self) -> &str {
        &self.gpath
    }

    /// Whether `flag` appears as a key in the URL query.
    pub fn has_flag(&self, flag: &str) -> bool {
        self.flags.iter().any(|key| key == flag)
    }

    /// First value for `name`, or the empty string when absent.
    pub fn value(&self, name: &str) -> &str {
        self.values
            .iter()
            .find(|(key, _)| key == name)
            .map(|(_, value)| value.as_str())
            .unwrap_or("")
    }

    /// Whether any named value came from a request body.
    pub fn has_body_values(&self) -> bool {
        self.has_body_values
    }
}

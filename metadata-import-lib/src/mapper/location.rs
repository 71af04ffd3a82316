//! Geonames "based near" normalization.
//!
//! Location URIs arrive in their user-facing form
//! (`http://www.geonames.org/5667009/montana.html`). The repository expects
//! the indexed `based_near_attributes` structure its own forms submit, with
//! each id rewritten to the `sws` form (`http://sws.geonames.org/5667009/`).

use std::sync::OnceLock;

use regex::Regex;
use serde_json::{json, Map, Value};
use url::Url;

use crate::utils::to_title_case;

const SWS_TEMPLATE_PREFIX: &str = "http://sws.geonames.org/";

fn numeric_segment() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^\d+$").expect("valid numeric segment pattern"))
}

fn page_suffix() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?i)\.html?$").expect("valid page suffix pattern"))
}

fn separators() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"[-_+]+").expect("valid separator pattern"))
}

/// Builds `{"0": {...}, "1": {...}}`, one entry per URI in input order.
/// Returns `None` for an empty list.
pub fn based_near_attributes(uris: &[String]) -> Option<Value> {
    if uris.is_empty() {
        return None;
    }
    let mut attributes = Map::new();
    for (i, uri) in uris.iter().enumerate() {
        attributes.insert(
            i.to_string(),
            json!({
                "id": uri_to_sws(uri),
                "label": label_from_uri(uri),
                "_destroy": "",
            }),
        );
    }
    Some(Value::Object(attributes))
}

/// Rewrites a geonames URI into `http://sws.geonames.org/<id>/`.
///
/// Input that does not parse, or has no numeric path segment, is returned
/// trimmed but otherwise untouched.
pub fn uri_to_sws(uri: &str) -> String {
    let trimmed = uri.trim();
    let Ok(parsed) = Url::parse(trimmed) else {
        tracing::warn!("Could not parse location URI: {}", trimmed);
        return trimmed.to_string();
    };
    let geonames_id = parsed
        .path_segments()
        .and_then(|mut segments| segments.find(|s| numeric_segment().is_match(s)));
    match geonames_id {
        Some(id) => format!("{}{}/", SWS_TEMPLATE_PREFIX, id),
        None => {
            tracing::warn!("No geonames id found in location URI: {}", trimmed);
            trimmed.to_string()
        }
    }
}

/// Human-readable label from the last path segment:
/// `.../united-states.html` becomes `United States`.
pub fn label_from_uri(uri: &str) -> String {
    let Ok(parsed) = Url::parse(uri.trim()) else {
        return String::new();
    };
    let last = parsed
        .path_segments()
        .and_then(|segments| segments.filter(|s| !s.is_empty()).last())
        .unwrap_or_default();
    if numeric_segment().is_match(last) {
        return String::new();
    }
    let decoded = urlencoding::decode(last)
        .map(|s| s.into_owned())
        .unwrap_or_else(|_| last.to_string());
    let stem = page_suffix().replace(&decoded, "");
    let spaced = separators().replace_all(&stem, " ");
    to_title_case(spaced.trim())
}

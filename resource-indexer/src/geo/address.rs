//! Parsing of address-like cell values.

use lazy_static::lazy_static;
use regex::Regex;
use resource_indexer_shared::GeoPoint;

lazy_static! {
    static ref HOUSE_NUMBER_REGEXP: Regex = Regex::new(r"^\s*(\d+[a-zA-Z]?)\b").unwrap();
}

/// Parse a coordinate, accepting a decimal comma.
pub fn parse_coordinate(text: &str) -> Option<f64> {
    let text = text.trim();
    if text.is_empty() {
        return None;
    }
    text.replace(',', ".")
        .parse::<f64>()
        .ok()
        .filter(|value| value.is_finite())
}

/// Extract the point of a universal address.
///
/// A universal address is a `|`-separated string whose last two segments
/// are latitude and longitude, e.g. `0918123|Warszawa|Marszałkowska|1|52.23|21.01`.
pub fn parse_universal_address(text: &str) -> Option<GeoPoint> {
    let segments: Vec<&str> = text.split('|').collect();
    if segments.len() < 2 {
        return None;
    }
    let lat = parse_coordinate(segments[segments.len() - 2])?;
    let lon = parse_coordinate(segments[segments.len() - 1])?;
    Some(GeoPoint::new(lon, lat)).filter(GeoPoint::is_valid)
}

/// Reduce a house number to its building part (`12a lok. 5` to `12a`).
pub fn clean_house_number(text: &str) -> Option<String> {
    HOUSE_NUMBER_REGEXP
        .captures(text)
        .and_then(|captures| captures.get(1))
        .map(|m| m.as_str().to_string())
}

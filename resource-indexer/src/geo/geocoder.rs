//! External geocoder client.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client as ReqwestClient;
use resource_indexer_shared::GeoPoint;
use serde::Deserialize;

use super::address::parse_coordinate;

/// Default timeout of a geocoding request.
pub const DEFAULT_GEOCODER_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Debug, thiserror::Error)]
pub enum GeocodeError {
    #[error("reqwest error: {0}")]
    Reqwest(#[from] reqwest::Error),
    #[error("invalid response: {0}")]
    InvalidResponse(String),
    #[error("not found: {0}")]
    NotFound(String),
}

/// Configuration of the HTTP geocoder.
#[derive(Debug, Clone)]
pub struct GeocoderConfig {
    /// Base URL of a Nominatim-compatible service; no geocoding when unset.
    pub url: Option<String>,
    pub timeout: Duration,
}

impl Default for GeocoderConfig {
    fn default() -> Self {
        Self {
            url: None,
            timeout: DEFAULT_GEOCODER_TIMEOUT,
        }
    }
}

/// Structured address query.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct GeocodeQuery {
    pub postal_code: String,
    pub city: String,
    /// Street, suffixed with the cleaned house number when there is one.
    pub street: Option<String>,
}

impl GeocodeQuery {
    /// Text identifying the address, used to memoize lookups.
    pub fn cache_key(&self) -> String {
        format!(
            "{}|{}|{}",
            self.postal_code,
            self.city,
            self.street.as_deref().unwrap_or_default()
        )
    }
}

/// Trait for turning addresses into points.
///
/// Production code uses [`HttpGeocoder`]; tests use mock implementations.
#[async_trait]
pub trait Geocoder: Send + Sync {
    async fn geocode(&self, query: &GeocodeQuery) -> Result<GeoPoint, GeocodeError>;
}

#[derive(Debug, Deserialize)]
struct SearchResult {
    lat: String,
    lon: String,
}

/// Geocoder backed by a Nominatim-compatible `search` endpoint.
pub struct HttpGeocoder {
    url: String,
    client: ReqwestClient,
}

impl HttpGeocoder {
    pub fn new(url: &str, timeout: Duration) -> Result<Self, GeocodeError> {
        let client = ReqwestClient::builder()
            .timeout(timeout)
            .user_agent(concat!("resource-indexer/", env!("CARGO_PKG_VERSION")))
            .build()?;
        Ok(Self {
            url: format!("{}/search", url.trim_end_matches('/')),
            client,
        })
    }

    /// Build a geocoder from configuration, if a URL is configured.
    pub fn from_config(config: &GeocoderConfig) -> Result<Option<Self>, GeocodeError> {
        config
            .url
            .as_deref()
            .map(|url| Self::new(url, config.timeout))
            .transpose()
    }
}

#[async_trait]
impl Geocoder for HttpGeocoder {
    async fn geocode(&self, query: &GeocodeQuery) -> Result<GeoPoint, GeocodeError> {
        let mut params = vec![
            ("postalcode", query.postal_code.as_str()),
            ("city", query.city.as_str()),
            ("format", "jsonv2"),
            ("limit", "1"),
        ];
        if let Some(street) = query.street.as_deref() {
            params.push(("street", street));
        }

        let results: Vec<SearchResult> = self
            .client
            .get(&self.url)
            .query(&params)
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;

        let first = results
            .first()
            .ok_or_else(|| GeocodeError::NotFound(query.cache_key()))?;
        let lat = parse_coordinate(&first.lat)
            .ok_or_else(|| GeocodeError::InvalidResponse(format!("lat '{}'", first.lat)))?;
        let lon = parse_coordinate(&first.lon)
            .ok_or_else(|| GeocodeError::InvalidResponse(format!("lon '{}'", first.lon)))?;
        Ok(GeoPoint::new(lon, lat))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cache_key() {
        let query = GeocodeQuery {
            postal_code: "00-001".to_string(),
            city: "Warszawa".to_string(),
            street: Some("Marszałkowska 1".to_string()),
        };
        assert_eq!(query.cache_key(), "00-001|Warszawa|Marszałkowska 1");
    }

    #[test]
    fn test_no_url_means_no_geocoder() {
        assert!(HttpGeocoder::from_config(&GeocoderConfig::default())
            .unwrap()
            .is_none());
    }

    #[test]
    fn test_search_url() {
        let geocoder =
            HttpGeocoder::new("http://localhost:8080/", DEFAULT_GEOCODER_TIMEOUT).unwrap();
        assert_eq!(geocoder.url, "http://localhost:8080/search");
    }
}

//! Geo resolution of rows.
//!
//! A geo role selects one rule per row: a latitude/longitude pair, a
//! universal address, or a place and postal code sent to a geocoder.
//! Failures never surface as errors; the row simply gets no point.

mod address;
mod geocoder;

pub use address::{clean_house_number, parse_coordinate, parse_universal_address};
pub use geocoder::{
    GeocodeError, GeocodeQuery, Geocoder, GeocoderConfig, HttpGeocoder, DEFAULT_GEOCODER_TIMEOUT,
};

use std::collections::HashMap;
use std::sync::Arc;

use resource_indexer_shared::{GeoPoint, GeoRole, GeoRule, Schema};
use tracing::{debug, warn};

use crate::source::RawValue;

/// Resolves the point of a row.
///
/// Geocoder lookups are memoized by address text for the life of the
/// resolver, which is one indexing run.
pub struct GeoResolver {
    geocoder: Option<Arc<dyn Geocoder>>,
    memo: HashMap<String, Option<GeoPoint>>,
}

impl GeoResolver {
    pub fn new(geocoder: Option<Arc<dyn Geocoder>>) -> Self {
        Self {
            geocoder,
            memo: HashMap::new(),
        }
    }

    /// Resolver without a geocoder; the place rule never yields a point.
    pub fn offline() -> Self {
        Self::new(None)
    }

    /// Resolve the point of `row`, whose cells follow `schema` order.
    pub async fn resolve(
        &mut self,
        row: &[RawValue],
        schema: &Schema,
        role: &GeoRole,
    ) -> Option<GeoPoint> {
        let cell = |name: &str| -> Option<String> {
            schema
                .position(name)
                .and_then(|position| row.get(position))
                .and_then(RawValue::repr)
                .map(|text| text.trim().to_string())
                .filter(|text| !text.is_empty())
        };

        match role.rule()? {
            GeoRule::Coordinates { lat, lon } => {
                let lat = parse_coordinate(&cell(lat)?)?;
                let lon = parse_coordinate(&cell(lon)?)?;
                Some(GeoPoint::new(lon, lat)).filter(GeoPoint::is_valid)
            }
            GeoRule::UniversalAddress(column) => parse_universal_address(&cell(column)?),
            GeoRule::Place {
                place,
                postal_code,
                street,
                house_number,
            } => {
                let street = street.and_then(|column| cell(column)).map(|street| {
                    match house_number
                        .and_then(|column| cell(column))
                        .and_then(|number| clean_house_number(&number))
                    {
                        Some(number) => format!("{} {}", street, number),
                        None => street,
                    }
                });
                let query = GeocodeQuery {
                    postal_code: cell(postal_code)?,
                    city: cell(place)?,
                    street,
                };
                self.geocode(query).await
            }
        }
    }

    async fn geocode(&mut self, query: GeocodeQuery) -> Option<GeoPoint> {
        let geocoder = self.geocoder.as_ref()?;
        let key = query.cache_key();
        if let Some(cached) = self.memo.get(&key) {
            return *cached;
        }

        let point = match geocoder.geocode(&query).await {
            Ok(point) if point.is_valid() => Some(point),
            Ok(point) => {
                debug!(
                    address = %key,
                    lat = point.lat,
                    lon = point.lon,
                    "Geocoder returned an invalid point"
                );
                None
            }
            Err(GeocodeError::NotFound(_)) => {
                debug!(address = %key, "Address not found");
                None
            }
            Err(e) => {
                warn!(address = %key, error = %e, "Geocoding failed");
                None
            }
        };
        self.memo.insert(key, point);
        point
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use resource_indexer_shared::{Field, FieldType};
    use std::sync::Mutex;

    /// Mock geocoder recording every query it receives.
    struct MockGeocoder {
        queries: Mutex<Vec<GeocodeQuery>>,
        result: Option<GeoPoint>,
    }

    impl MockGeocoder {
        fn new(result: Option<GeoPoint>) -> Self {
            Self {
                queries: Mutex::new(Vec::new()),
                result,
            }
        }

        fn calls(&self) -> usize {
            self.queries.lock().unwrap().len()
        }
    }

    #[async_trait]
    impl Geocoder for MockGeocoder {
        async fn geocode(&self, query: &GeocodeQuery) -> Result<GeoPoint, GeocodeError> {
            self.queries.lock().unwrap().push(query.clone());
            self.result
                .ok_or_else(|| GeocodeError::NotFound(query.cache_key()))
        }
    }

    fn schema() -> Schema {
        Schema::new(
            ["nazwa", "b", "l", "adres", "miasto", "kod", "ulica", "nr"]
                .into_iter()
                .map(|name| Field::new(name, FieldType::String))
                .collect(),
        )
    }

    fn row(cells: [&str; 8]) -> Vec<RawValue> {
        cells.into_iter().map(RawValue::from_text).collect()
    }

    fn place_role() -> GeoRole {
        GeoRole {
            place: Some("miasto".to_string()),
            postal_code: Some("kod".to_string()),
            street: Some("ulica".to_string()),
            house_number: Some("nr".to_string()),
            label: Some("nazwa".to_string()),
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn test_coordinates_win_over_universal_address() {
        let role = GeoRole {
            b: Some("b".to_string()),
            l: Some("l".to_string()),
            uaddress: Some("adres".to_string()),
            label: Some("nazwa".to_string()),
            ..Default::default()
        };
        let row = row(["A", "52,2", "21.0", "x|50.0|19.9", "", "", "", ""]);

        let point = GeoResolver::offline().resolve(&row, &schema(), &role).await;
        assert_eq!(point, Some(GeoPoint::new(21.0, 52.2)));
    }

    #[tokio::test]
    async fn test_unparseable_coordinates_do_not_fall_through() {
        let role = GeoRole {
            b: Some("b".to_string()),
            l: Some("l".to_string()),
            uaddress: Some("adres".to_string()),
            label: Some("nazwa".to_string()),
            ..Default::default()
        };
        let row = row(["A", "north", "21.0", "x|50.0|19.9", "", "", "", ""]);

        assert_eq!(GeoResolver::offline().resolve(&row, &schema(), &role).await, None);
    }

    #[tokio::test]
    async fn test_universal_address() {
        let role = GeoRole {
            uaddress: Some("adres".to_string()),
            label: Some("nazwa".to_string()),
            ..Default::default()
        };
        let row = row(["A", "", "", "x|50.0|19.9", "", "", "", ""]);
        let point = GeoResolver::offline().resolve(&row, &schema(), &role).await;
        assert_eq!(point, Some(GeoPoint::new(19.9, 50.0)));
    }

    #[tokio::test]
    async fn test_place_query_and_memoization() {
        let geocoder = Arc::new(MockGeocoder::new(Some(GeoPoint::new(21.0, 52.2))));
        let mut resolver = GeoResolver::new(Some(geocoder.clone()));
        let row = row(["A", "", "", "", "Warszawa", "00-001", "Marszałkowska", "12a lok. 5"]);

        let first = resolver.resolve(&row, &schema(), &place_role()).await;
        let second = resolver.resolve(&row, &schema(), &place_role()).await;

        assert_eq!(first, Some(GeoPoint::new(21.0, 52.2)));
        assert_eq!(second, first);
        assert_eq!(geocoder.calls(), 1);

        let query = geocoder.queries.lock().unwrap()[0].clone();
        assert_eq!(query.city, "Warszawa");
        assert_eq!(query.postal_code, "00-001");
        assert_eq!(query.street.as_deref(), Some("Marszałkowska 12a"));
    }

    #[tokio::test]
    async fn test_geocoder_failure_is_no_point() {
        let geocoder = Arc::new(MockGeocoder::new(None));
        let mut resolver = GeoResolver::new(Some(geocoder.clone()));
        let row = row(["A", "", "", "", "Nigdzie", "99-999", "", ""]);

        assert_eq!(resolver.resolve(&row, &schema(), &place_role()).await, None);
        assert_eq!(geocoder.calls(), 1);
    }

    #[tokio::test]
    async fn test_place_without_geocoder() {
        let row = row(["A", "", "", "", "Warszawa", "00-001", "", ""]);
        assert_eq!(
            GeoResolver::offline()
                .resolve(&row, &schema(), &place_role())
                .await,
            None
        );
    }
}

use derive_builder::Builder;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, warn};

use crate::{
    api_interfaces::services, categories::CategoryTable, constants::DEFAULT_SERVICE_LIMIT,
    error::FetchError, location::ResolvedLocation, util::decode_html_entities,
};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrganisationSummary {
    pub name: String,
    pub slug: String,
    pub is_verified: bool,
}

/// A directory record flattened into the shape the results view works with.
///
/// `latitude`/`longitude` are `0.0` when the record had no coordinates; check
/// `has_coordinates` before treating them as a real position.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FlattenedService {
    pub id: String,
    pub name: String,
    pub description: String,
    pub category: String,
    pub category_name: String,
    pub sub_category: String,
    pub sub_category_name: String,
    pub latitude: f64,
    pub longitude: f64,
    #[serde(default)]
    pub has_coordinates: bool,
    pub organisation: OrganisationSummary,
    pub organisation_slug: String,
    pub client_groups: Vec<String>,
    pub open_times: Vec<Value>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ServiceWithDistance {
    #[serde(flatten)]
    pub service: FlattenedService,
    /// Kilometres from the queried coordinate. Only present when the query
    /// carried one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub distance: Option<f64>,
}

/// Parameters of a services search.
#[derive(Builder, Debug, Clone, PartialEq)]
#[builder(default)]
pub struct ServiceQuery {
    #[builder(setter(strip_option))]
    pub lat: Option<f64>,
    #[builder(setter(strip_option))]
    pub lng: Option<f64>,
    pub limit: u32,
}

impl Default for ServiceQuery {
    fn default() -> Self {
        Self {
            lat: None,
            lng: None,
            limit: DEFAULT_SERVICE_LIMIT,
        }
    }
}

impl ServiceQuery {
    /// A query around `location`, or an unfiltered one if it has no
    /// coordinates.
    pub fn near(location: Option<&ResolvedLocation>, limit: u32) -> Self {
        let coordinates = location.and_then(ResolvedLocation::coordinates);
        Self {
            lat: coordinates.map(|(lat, _)| lat),
            lng: coordinates.map(|(_, lng)| lng),
            limit,
        }
    }

    /// Query-string pairs. Coordinates are only sent as a pair.
    pub fn to_params(&self) -> Vec<(&'static str, String)> {
        let mut params = vec![("limit", self.limit.to_string())];
        if let (Some(lat), Some(lng)) = (self.lat, self.lng) {
            params.push(("lat", lat.to_string()));
            params.push(("lng", lng.to_string()));
        }
        params
    }
}

fn id_to_string(id: Option<&Value>) -> String {
    match id {
        Some(Value::String(s)) => s.clone(),
        Some(Value::Number(n)) => n.to_string(),
        _ => String::new(),
    }
}

fn field<T: serde::de::DeserializeOwned>(value: &Value, name: &str) -> Option<T> {
    value
        .get(name)
        .and_then(|v| serde_json::from_value(v.clone()).ok())
}

/// Read a raw record, keeping whatever fields are usable when the record as a
/// whole does not match the expected shape.
fn parse_record(value: &Value) -> services::Service {
    match services::Service::deserialize(value) {
        Ok(service) => service,
        Err(e) => {
            warn!(error = %e, "service record did not match the expected shape, using defaults");
            services::Service {
                id: value.get("_id").cloned(),
                provider_name: field(value, "ServiceProviderName"),
                provider_key: field(value, "ServiceProviderKey"),
                info: field(value, "Info"),
                category_key: field(value, "ParentCategoryKey"),
                sub_category_key: field(value, "SubCategoryKey"),
                address: field(value, "Address"),
                client_groups: field(value, "ClientGroups"),
                opening_times: field(value, "OpeningTimes"),
                organisation: field(value, "organisation"),
                distance: field(value, "distance"),
            }
        }
    }
}

/// Flatten one raw record, resolving display names through `categories`.
pub fn normalize(raw: services::Service, categories: &CategoryTable) -> ServiceWithDistance {
    let coordinates = raw
        .address
        .and_then(|address| address.location)
        .and_then(|point| point.coordinates)
        .filter(|coordinates| coordinates.len() >= 2);
    let (latitude, longitude, has_coordinates) = match coordinates {
        Some(c) => (c[1], c[0], true),
        None => (0.0, 0.0, false),
    };

    let category = raw.category_key.unwrap_or_default();
    let sub_category = raw.sub_category_key.unwrap_or_default();
    let category_name = categories
        .category_name(&category)
        .map(str::to_string)
        .unwrap_or_else(|| category.clone());
    let sub_category_name = categories
        .sub_category_name(&sub_category)
        .map(str::to_string)
        .unwrap_or_else(|| sub_category.clone());

    let provider_name = raw.provider_name.unwrap_or_default();
    let organisation = raw.organisation.unwrap_or_default();
    let organisation_slug = organisation
        .slug
        .filter(|slug| !slug.is_empty())
        .or(raw.provider_key)
        .unwrap_or_default();
    let organisation_name = organisation
        .name
        .filter(|name| !name.is_empty())
        .unwrap_or_else(|| provider_name.clone());
    let organisation = OrganisationSummary {
        name: decode_html_entities(&organisation_name),
        slug: organisation_slug.clone(),
        is_verified: organisation.is_verified.unwrap_or(false),
    };

    ServiceWithDistance {
        service: FlattenedService {
            id: id_to_string(raw.id.as_ref()),
            name: decode_html_entities(&provider_name),
            description: decode_html_entities(raw.info.as_deref().unwrap_or_default()),
            category,
            category_name,
            sub_category,
            sub_category_name,
            latitude,
            longitude,
            has_coordinates,
            organisation,
            organisation_slug,
            client_groups: raw.client_groups.unwrap_or_default(),
            open_times: raw.opening_times.unwrap_or_default(),
        },
        distance: raw.distance,
    }
}

/// Normalize every record in a services response body.
pub fn parse_response(
    body: &str,
    categories: &CategoryTable,
) -> Result<Vec<ServiceWithDistance>, FetchError> {
    let response: services::Response = serde_json::from_str(body)?;
    debug!(
        records = response.results.len(),
        total = ?response.total,
        "parsed services response"
    );
    Ok(response
        .results
        .iter()
        .map(|record| normalize(parse_record(record), categories))
        .collect())
}

/// Search the directory.
pub async fn get(
    client: &Client,
    endpoint: &str,
    query: &ServiceQuery,
    categories: &CategoryTable,
) -> Result<Vec<ServiceWithDistance>, FetchError> {
    debug!(endpoint, ?query, "fetching services");
    let response = client
        .get(endpoint)
        .query(&query.to_params())
        .send()
        .await?;
    if !response.status().is_success() {
        return Err(FetchError::ResponseError(response.status()));
    }
    let body = response.text().await.map_err(FetchError::ResponseBodyError)?;
    parse_response(&body, categories)
}

#[cfg(test)]
mod tests {
    use super::*;
    use httpmock::prelude::*;
    use serde_json::json;

    fn test_categories() -> CategoryTable {
        CategoryTable::from_json(
            r#"[
                {"key": "health", "name": "Health", "subCategories": [{"key": "gp", "name": "GP"}]},
                {"key": "support", "name": "Support", "subCategories": [{"key": "counselling", "name": "Counselling"}]}
            ]"#,
        )
        .unwrap()
    }

    fn health_record() -> Value {
        json!({
            "_id": "1",
            "ServiceProviderName": "Test Health Service",
            "Info": "A test health service &amp; drop-in",
            "ParentCategoryKey": "health",
            "SubCategoryKey": "gp",
            "ServiceProviderKey": "test-health-service",
            "Address": { "Location": { "coordinates": [-2.2426, 53.4808] } },
            "ClientGroups": ["adults"],
            "OpeningTimes": [{"Day": "Monday", "StartTime": 900, "EndTime": 1700}],
            "distance": 0.5
        })
    }

    #[test]
    fn normalize_full_record() {
        let raw = parse_record(&health_record());
        let service = normalize(raw, &test_categories());

        assert_eq!(service.distance, Some(0.5));
        let service = service.service;
        assert_eq!(service.id, "1");
        assert_eq!(service.name, "Test Health Service");
        assert_eq!(service.description, "A test health service & drop-in");
        assert_eq!(service.category_name, "Health");
        assert_eq!(service.sub_category_name, "GP");
        assert_eq!(service.latitude, 53.4808);
        assert_eq!(service.longitude, -2.2426);
        assert!(service.has_coordinates);
        assert_eq!(service.organisation.name, "Test Health Service");
        assert_eq!(service.organisation.slug, "test-health-service");
        assert!(!service.organisation.is_verified);
        assert_eq!(service.organisation_slug, "test-health-service");
        assert_eq!(service.client_groups, vec!["adults"]);
        assert_eq!(service.open_times.len(), 1);
    }

    #[test]
    fn normalize_prefers_embedded_organisation() {
        let mut record = health_record();
        record["organisation"] = json!({"name": "Mungo &#39;s", "slug": "mungos", "isVerified": true});
        let service = normalize(parse_record(&record), &test_categories()).service;

        assert_eq!(service.organisation.name, "Mungo 's");
        assert_eq!(service.organisation_slug, "mungos");
        assert!(service.organisation.is_verified);
    }

    #[test]
    fn normalize_defaults_missing_fields() {
        let service = normalize(parse_record(&json!({"_id": 42})), &test_categories());

        assert!(service.distance.is_none());
        let service = service.service;
        assert_eq!(service.id, "42");
        assert_eq!(service.name, "");
        assert_eq!((service.latitude, service.longitude), (0.0, 0.0));
        assert!(!service.has_coordinates);
        assert!(service.client_groups.is_empty());
    }

    #[test]
    fn unknown_category_keys_fall_back_to_the_key() {
        let mut record = health_record();
        record["ParentCategoryKey"] = json!("dropin");
        record["SubCategoryKey"] = json!("showers");
        let service = normalize(parse_record(&record), &test_categories()).service;

        assert_eq!(service.category_name, "dropin");
        assert_eq!(service.sub_category_name, "showers");
    }

    #[test]
    fn malformed_record_keeps_usable_fields() {
        let mut record = health_record();
        record["Info"] = json!(12);
        record["ClientGroups"] = json!("adults");
        let service = normalize(parse_record(&record), &test_categories());

        assert_eq!(service.service.name, "Test Health Service");
        assert_eq!(service.service.description, "");
        assert!(service.service.client_groups.is_empty());
        assert_eq!(service.distance, Some(0.5));
    }

    #[test]
    fn missing_or_null_results_are_empty() {
        let categories = test_categories();
        assert!(parse_response(r#"{"total": 0}"#, &categories).unwrap().is_empty());
        assert!(parse_response(r#"{"results": null}"#, &categories).unwrap().is_empty());
        assert!(parse_response(r#"{"results": [], "total": 0}"#, &categories).unwrap().is_empty());
    }

    #[test]
    fn malformed_total_keeps_the_records() {
        let body = json!({ "results": [health_record()], "total": "3" }).to_string();
        let services = parse_response(&body, &test_categories()).unwrap();
        assert_eq!(services.len(), 1);
        assert_eq!(services[0].service.name, "Test Health Service");
    }

    #[test]
    fn non_object_records_come_back_with_defaults() {
        let body = json!({ "results": [health_record(), null, 5], "total": 3 }).to_string();

        let services = parse_response(&body, &test_categories()).unwrap();

        assert_eq!(services.len(), 3);
        assert_eq!(services[0].service.id, "1");
        for service in &services[1..] {
            assert_eq!(service.service.id, "");
            assert_eq!(service.service.name, "");
            assert!(!service.service.has_coordinates);
            assert_eq!(service.distance, None);
        }
    }

    #[test]
    fn query_params_only_send_coordinate_pairs() {
        let query = ServiceQueryBuilder::default().lat(53.4808).build().unwrap();
        assert_eq!(query.to_params(), vec![("limit", "50".to_string())]);

        let query = ServiceQueryBuilder::default()
            .lat(53.4808)
            .lng(-2.2426)
            .limit(10)
            .build()
            .unwrap();
        assert_eq!(
            query.to_params(),
            vec![
                ("limit", "10".to_string()),
                ("lat", "53.4808".to_string()),
                ("lng", "-2.2426".to_string()),
            ]
        );
    }

    #[test]
    fn query_near_unknown_location_is_unfiltered() {
        let query = ServiceQuery::near(Some(&ResolvedLocation::unknown()), 50);
        assert_eq!(query, ServiceQuery::default());
        assert_eq!(ServiceQuery::near(None, 50), ServiceQuery::default());
    }

    #[tokio::test]
    async fn get_success() {
        // Arrange
        let server = MockServer::start_async().await;
        let services_mock = server
            .mock_async(|when, then| {
                when.method(GET)
                    .path("/api/services")
                    .query_param("limit", "50")
                    .query_param("lat", "53.4808")
                    .query_param("lng", "-2.2426");
                then.status(200)
                    .json_body(json!({"results": [health_record()], "total": 1}));
            })
            .await;
        let url = server.url("/api/services");
        let client = reqwest::Client::new();
        let query = ServiceQuery {
            lat: Some(53.4808),
            lng: Some(-2.2426),
            limit: 50,
        };

        // Act
        let services = get(&client, &url, &query, &test_categories()).await;

        // Assert
        assert!(
            services.is_ok(),
            "Failed to get services: {:?}",
            services.unwrap_err()
        );
        let services = services.unwrap();
        assert_eq!(services.len(), 1);
        assert_eq!(services[0].service.name, "Test Health Service");
        services_mock.assert();
    }

    #[tokio::test]
    async fn get_empty_results() {
        let server = MockServer::start_async().await;
        let services_mock = server
            .mock_async(|when, then| {
                when.path("/api/services");
                then.status(200).json_body(json!({"total": 0}));
            })
            .await;
        let url = server.url("/api/services");
        let client = reqwest::Client::new();

        let services = get(&client, &url, &ServiceQuery::default(), &test_categories()).await;

        assert!(services.unwrap().is_empty());
        services_mock.assert();
    }

    #[tokio::test]
    async fn get_invalid_url() {
        let client = reqwest::Client::new();

        let services = get(
            &client,
            "http://test.invalid",
            &ServiceQuery::default(),
            &test_categories(),
        )
        .await;

        assert!(matches!(services.unwrap_err(), FetchError::RequestError(_)));
    }

    #[tokio::test]
    async fn get_bad_status() {
        let server = MockServer::start_async().await;
        let services_mock = server
            .mock_async(|when, then| {
                when.path("/api/services");
                then.status(500).json_body(json!({"error": "Internal server error"}));
            })
            .await;
        let url = server.url("/api/services");
        let client = reqwest::Client::new();

        let services = get(&client, &url, &ServiceQuery::default(), &test_categories()).await;

        assert!(matches!(
            services.unwrap_err(),
            FetchError::ResponseError(status) if status.as_u16() == 500
        ));
        services_mock.assert();
    }

    #[tokio::test]
    async fn get_bad_json() {
        let server = MockServer::start_async().await;
        let services_mock = server
            .mock_async(|when, then| {
                when.path("/api/services");
                then.status(200)
                    .header("Content-Type", "text/html")
                    .body("<html>not json</html>");
            })
            .await;
        let url = server.url("/api/services");
        let client = reqwest::Client::new();

        let services = get(&client, &url, &ServiceQuery::default(), &test_categories()).await;

        assert!(matches!(services.unwrap_err(), FetchError::ParseError(_)));
        services_mock.assert();
    }
}

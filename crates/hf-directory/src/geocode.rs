use reqwest::{Client, StatusCode};
use tracing::debug;

use crate::{api_interfaces::geocode, error::GeocodeError, location::ResolvedLocation, postcode};

/// Resolve a UK postcode to a location.
///
/// The postcode's format is checked before any request is made, so an
/// obviously malformed postcode never reaches the geocoder.
pub async fn get(
    client: &Client,
    endpoint: &str,
    postcode: &str,
) -> Result<ResolvedLocation, GeocodeError> {
    let normalized = postcode::normalize(postcode)
        .ok_or_else(|| GeocodeError::InvalidPostcode(postcode.trim().to_string()))?;
    debug!(endpoint, postcode = %normalized, "geocoding postcode");
    let response = client
        .get(endpoint)
        .query(&[("postcode", normalized.as_str())])
        .send()
        .await?;
    match response.status() {
        status if status.is_success() => {}
        StatusCode::BAD_REQUEST => return Err(GeocodeError::InvalidPostcode(normalized)),
        StatusCode::NOT_FOUND => return Err(GeocodeError::PostcodeNotFound(normalized)),
        status => return Err(GeocodeError::Server(status)),
    }
    let body = response
        .text()
        .await
        .map_err(GeocodeError::ResponseBodyError)?;
    let parsed: geocode::Response = serde_json::from_str(&body)?;
    Ok(ResolvedLocation::from_postcode(
        parsed.location.lat,
        parsed.location.lng,
        parsed.postcode.unwrap_or(normalized),
    ))
}

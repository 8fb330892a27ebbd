use serde::{Deserialize, Serialize};

use crate::{constants::*, location::ResolvedLocation, services::ServiceWithDistance};

#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct LatLng {
    pub lat: f64,
    pub lng: f64,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MapMarker {
    pub id: String,
    pub lat: f64,
    pub lng: f64,
    pub title: String,
    pub organisation_slug: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub organisation: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub service_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub distance_km: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub icon: Option<String>,
}

/// Everything the map widget needs to draw.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct MapView {
    pub center: Option<LatLng>,
    pub markers: Vec<MapMarker>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub zoom: Option<u8>,
}

impl From<&ServiceWithDistance> for MapMarker {
    fn from(s: &ServiceWithDistance) -> Self {
        let service = &s.service;
        Self {
            id: service.id.clone(),
            lat: service.latitude,
            lng: service.longitude,
            title: service.name.clone(),
            organisation_slug: service.organisation_slug.clone(),
            organisation: Some(service.organisation.name.clone()),
            service_name: Some(service.name.clone()),
            distance_km: s.distance,
            icon: None,
        }
    }
}

fn user_marker(lat: f64, lng: f64) -> MapMarker {
    MapMarker {
        id: USER_LOCATION_MARKER_ID.to_string(),
        lat,
        lng,
        title: USER_LOCATION_MARKER_TITLE.to_string(),
        organisation_slug: USER_LOCATION_MARKER_ID.to_string(),
        organisation: None,
        service_name: None,
        distance_km: None,
        icon: Some(USER_LOCATION_MARKER_ICON.to_string()),
    }
}

/// One marker per service, preceded by the user's own marker when both of
/// their coordinates are known.
pub fn build(
    services: &[ServiceWithDistance],
    location: Option<&ResolvedLocation>,
) -> Vec<MapMarker> {
    let user = location
        .and_then(ResolvedLocation::coordinates)
        .map(|(lat, lng)| user_marker(lat, lng));
    user.into_iter()
        .chain(services.iter().map(MapMarker::from))
        .collect()
}

/// The map for a results list, centred on the user when we know where they
/// are.
pub fn view(services: &[ServiceWithDistance], location: Option<&ResolvedLocation>) -> MapView {
    MapView {
        center: location
            .and_then(ResolvedLocation::coordinates)
            .map(|(lat, lng)| LatLng { lat, lng }),
        markers: build(services, location),
        zoom: None,
    }
}

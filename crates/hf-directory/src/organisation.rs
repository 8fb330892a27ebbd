use serde_json::Value;

use crate::{
    api_interfaces::organisation::Address,
    constants::ORGANISATION_MAP_ZOOM,
    markers::{LatLng, MapMarker, MapView},
};

const FALLBACK_ORGANISATION_SLUG: &str = "org-location";

fn coordinates(address: &Address) -> Option<(f64, f64)> {
    let coordinates = address.location.as_ref()?.coordinates.as_ref()?;
    match coordinates.as_slice() {
        [Value::Number(lng), Value::Number(lat)] => Some((lat.as_f64()?, lng.as_f64()?)),
        _ => None,
    }
}

fn title(address: &Address) -> String {
    [&address.street, &address.city, &address.postcode]
        .into_iter()
        .filter_map(|part| part.as_deref())
        .filter(|part| !part.is_empty())
        .collect::<Vec<_>>()
        .join(", ")
}

/// The map of an organisation's addresses, or `None` when none of them has a
/// usable position.
pub fn locations_map(organisation_key: Option<&str>, addresses: &[Address]) -> Option<MapView> {
    let slug = organisation_key
        .filter(|key| !key.is_empty())
        .unwrap_or(FALLBACK_ORGANISATION_SLUG);
    let markers: Vec<MapMarker> = addresses
        .iter()
        .enumerate()
        .filter_map(|(index, address)| {
            let (lat, lng) = coordinates(address)?;
            let id = address
                .key
                .as_ref()
                .and_then(|key| key.binary.as_ref())
                .and_then(|binary| binary.base64.clone())
                .unwrap_or_else(|| format!("addr-{index}"));
            Some(MapMarker {
                id,
                lat,
                lng,
                title: title(address),
                organisation_slug: slug.to_string(),
                organisation: None,
                service_name: None,
                distance_km: None,
                icon: None,
            })
        })
        .collect();
    let first = markers.first()?;
    Some(MapView {
        center: Some(LatLng {
            lat: first.lat,
            lng: first.lng,
        }),
        zoom: Some(ORGANISATION_MAP_ZOOM),
        markers,
    })
}

use serde::Deserialize;

/// Raw response from the geocode endpoint.
#[derive(Deserialize)]
pub struct Response {
    pub location: LatLng,
    pub postcode: Option<String>,
}

#[derive(Deserialize)]
pub struct LatLng {
    pub lat: f64,
    pub lng: f64,
}

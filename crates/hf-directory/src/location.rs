use serde::{Deserialize, Serialize};

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LocationSource {
    Geolocation,
    Postcode,
    #[default]
    None,
}

/// Where the user is, as far as we know.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct ResolvedLocation {
    pub lat: Option<f64>,
    pub lng: Option<f64>,
    pub source: LocationSource,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub postcode: Option<String>,
}

impl ResolvedLocation {
    pub fn from_geolocation(lat: f64, lng: f64) -> Self {
        Self {
            lat: Some(lat),
            lng: Some(lng),
            source: LocationSource::Geolocation,
            postcode: None,
        }
    }

    pub fn from_postcode(lat: f64, lng: f64, postcode: String) -> Self {
        Self {
            lat: Some(lat),
            lng: Some(lng),
            source: LocationSource::Postcode,
            postcode: Some(postcode),
        }
    }

    /// A location that carries no coordinates, used to browse everything.
    pub fn unknown() -> Self {
        Self::default()
    }

    /// Both coordinates, if both are known. Anything less means "do not
    /// filter by distance".
    pub fn coordinates(&self) -> Option<(f64, f64)> {
        self.lat.zip(self.lng)
    }
}

/// Holds the session's single active location.
///
/// Every write bumps `generation`, so work started against an older location
/// can tell that it has gone stale.
#[derive(Debug, Default)]
pub struct LocationContext {
    current: Option<ResolvedLocation>,
    generation: u64,
}

impl LocationContext {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self) -> Option<&ResolvedLocation> {
        self.current.as_ref()
    }

    /// Replace the current location.
    pub fn set(&mut self, location: ResolvedLocation) {
        self.current = Some(location);
        self.generation += 1;
    }

    pub fn clear(&mut self) {
        self.current = None;
        self.generation += 1;
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }
}

/// The default base URL for the directory API
pub const DEFAULT_API_BASE_URL: &str = "http://localhost:3000";

/// Path of the services search endpoint, relative to the API base
pub const SERVICES_PATH: &str = "/api/services";

/// Path of the postcode geocoding endpoint, relative to the API base
pub const GEOCODE_PATH: &str = "/api/geocode";

/// Number of services requested when the caller does not ask for a limit
pub const DEFAULT_SERVICE_LIMIT: u32 = 50;

/// Timeout applied to every request made by the default HTTP client
pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 30;

/// Marker id used for the user's own position on the map
pub const USER_LOCATION_MARKER_ID: &str = "user-location";
pub const USER_LOCATION_MARKER_TITLE: &str = "You are here";
pub const USER_LOCATION_MARKER_ICON: &str = "http://maps.google.com/mapfiles/ms/icons/blue-dot.png";

/// Zoom level used when a map is centred on a single organisation
pub const ORGANISATION_MAP_ZOOM: u8 = 14;

use serde::Serialize;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum FetchError {
    #[error("the services request failed: {0}")]
    RequestError(#[from] reqwest::Error),
    #[error("the services request failed with status code: {0}")]
    ResponseError(reqwest::StatusCode),
    #[error("the services response body could not be read: {0}")]
    ResponseBodyError(#[source] reqwest::Error),
    #[error("unable to parse the services response body: {0}")]
    ParseError(#[from] serde_json::Error),
}

#[derive(Debug, Error)]
pub enum GeocodeError {
    #[error("`{0}` is not a valid UK postcode")]
    InvalidPostcode(String),
    #[error("postcode `{0}` could not be found")]
    PostcodeNotFound(String),
    #[error("the geocode request failed: {0}")]
    Network(#[from] reqwest::Error),
    #[error("the geocode request failed with status code: {0}")]
    Server(reqwest::StatusCode),
    #[error("the geocode response body could not be read: {0}")]
    ResponseBodyError(#[source] reqwest::Error),
    #[error("unable to parse the geocode response body: {0}")]
    ParseError(#[from] serde_json::Error),
}

#[derive(Debug, Error)]
pub enum ClientInitError {
    #[error("invalid {0} endpoint `{1}`: {2}")]
    InvalidEndpoint(&'static str, String, String),
    #[error("unable to build the HTTP client: {0}")]
    HttpClient(#[from] reqwest::Error),
}

#[derive(Debug, Error)]
pub enum LoadError {
    #[error("unable to read the file: {0}")]
    ReadError(#[from] std::io::Error),
    #[error("unable to parse the file: {0}")]
    ParseError(#[from] serde_json::Error),
}

#[derive(Debug, Error)]
pub enum SaveError {
    #[error("unable to write the file: {0}")]
    WriteError(#[from] std::io::Error),
    #[error("unable to serialize the data: {0}")]
    SerializeError(#[from] serde_json::Error),
}

/// The failure classes a user can be shown. Each one has its own message and
/// its own set of ways out.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum ErrorKind {
    InvalidPostcode,
    PostcodeNotFound,
    Network,
    Server,
    Fetch,
}

/// A recovery control offered alongside an error.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum Affordance {
    Retry,
    ReEnterPostcode,
    BrowseAll,
}

impl ErrorKind {
    pub fn message(&self) -> &'static str {
        match self {
            ErrorKind::InvalidPostcode => "Please enter a valid UK postcode (for example M1 1AE).",
            ErrorKind::PostcodeNotFound => {
                "Postcode not found. We couldn't find that postcode, check it and try again."
            }
            ErrorKind::Network => {
                "Network error. We couldn't reach the service directory, check your connection and try again."
            }
            ErrorKind::Server => {
                "Server error. The service directory is having problems, please try again later."
            }
            ErrorKind::Fetch => "Failed to fetch services. Please try again.",
        }
    }

    pub fn affordances(&self) -> &'static [Affordance] {
        match self {
            ErrorKind::InvalidPostcode => &[Affordance::ReEnterPostcode],
            ErrorKind::PostcodeNotFound => &[
                Affordance::Retry,
                Affordance::ReEnterPostcode,
                Affordance::BrowseAll,
            ],
            ErrorKind::Network | ErrorKind::Server => &[Affordance::Retry, Affordance::BrowseAll],
            ErrorKind::Fetch => &[Affordance::Retry],
        }
    }
}

impl From<&FetchError> for ErrorKind {
    fn from(err: &FetchError) -> Self {
        match err {
            FetchError::RequestError(_) | FetchError::ResponseBodyError(_) => ErrorKind::Network,
            FetchError::ResponseError(status) if status.is_server_error() => ErrorKind::Server,
            FetchError::ResponseError(_) | FetchError::ParseError(_) => ErrorKind::Fetch,
        }
    }
}

impl From<&GeocodeError> for ErrorKind {
    fn from(err: &GeocodeError) -> Self {
        match err {
            GeocodeError::InvalidPostcode(_) => ErrorKind::InvalidPostcode,
            GeocodeError::PostcodeNotFound(_) => ErrorKind::PostcodeNotFound,
            GeocodeError::Network(_) | GeocodeError::ResponseBodyError(_) => ErrorKind::Network,
            GeocodeError::Server(_) | GeocodeError::ParseError(_) => ErrorKind::Server,
        }
    }
}

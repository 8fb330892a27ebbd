use reqwest::Url;

use crate::{
    categories,
    constants::*,
    error::{ClientInitError, FetchError, GeocodeError},
    geocode,
    location::ResolvedLocation,
    services::{self, ServiceQuery, ServiceWithDistance},
    util::default_http_client,
};

#[derive(Clone, Debug)]
pub struct Client {
    http_client: reqwest::Client,
    endpoints: Option<EndpointConfig>,
}

/// Endpoint overrides. Anything left unset falls back to the default API base.
#[derive(Clone, Debug, Default)]
pub struct EndpointConfig {
    pub services: Option<String>,
    pub geocode: Option<String>,
}

impl EndpointConfig {
    /// Both endpoints under one API base URL.
    pub fn from_base(base: &str) -> Self {
        let base = base.trim_end_matches('/');
        Self {
            services: Some(format!("{base}{SERVICES_PATH}")),
            geocode: Some(format!("{base}{GEOCODE_PATH}")),
        }
    }

    pub fn validate(&self) -> Result<(), ClientInitError> {
        let endpoints = [("services", &self.services), ("geocode", &self.geocode)];
        for (name, url) in endpoints {
            let Some(url) = url else { continue };
            let parsed = Url::parse(url).map_err(|e| {
                ClientInitError::InvalidEndpoint(name, url.clone(), e.to_string())
            })?;
            if !matches!(parsed.scheme(), "http" | "https") {
                return Err(ClientInitError::InvalidEndpoint(
                    name,
                    url.clone(),
                    format!("unsupported scheme `{}`", parsed.scheme()),
                ));
            }
        }
        Ok(())
    }
}

impl Client {
    pub fn new(
        http_client: reqwest::Client,
        endpoints: Option<EndpointConfig>,
    ) -> Result<Self, ClientInitError> {
        if let Some(endpoints) = &endpoints {
            endpoints.validate()?
        }
        Ok(Self {
            http_client,
            endpoints,
        })
    }

    /// A client with the default HTTP settings talking to `base`.
    pub fn with_base(base: &str) -> Result<Self, ClientInitError> {
        Self::new(default_http_client()?, Some(EndpointConfig::from_base(base)))
    }

    fn services_url(&self) -> String {
        self.endpoints
            .as_ref()
            .and_then(|endpoints| endpoints.services.clone())
            .unwrap_or_else(|| format!("{DEFAULT_API_BASE_URL}{SERVICES_PATH}"))
    }

    fn geocode_url(&self) -> String {
        self.endpoints
            .as_ref()
            .and_then(|endpoints| endpoints.geocode.clone())
            .unwrap_or_else(|| format!("{DEFAULT_API_BASE_URL}{GEOCODE_PATH}"))
    }

    pub async fn fetch_services(
        &self,
        query: &ServiceQuery,
    ) -> Result<Vec<ServiceWithDistance>, FetchError> {
        services::get(
            &self.http_client,
            &self.services_url(),
            query,
            categories::lookup(),
        )
        .await
    }

    pub async fn geocode(&self, postcode: &str) -> Result<ResolvedLocation, GeocodeError> {
        geocode::get(&self.http_client, &self.geocode_url(), postcode).await
    }
}

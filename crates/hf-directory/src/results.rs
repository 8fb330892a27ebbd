use std::collections::BTreeMap;

use serde::Serialize;
use tracing::{debug, info};

use crate::{
    client::Client,
    constants::DEFAULT_SERVICE_LIMIT,
    error::{Affordance, ErrorKind, FetchError, GeocodeError},
    filter::{self, Filters, SortOrder},
    location::{LocationContext, LocationSource, ResolvedLocation},
    markers::{self, MapMarker, MapView},
    search_state::{NavigationSession, SearchState, SearchStateStore},
    services::{ServiceQuery, ServiceWithDistance},
};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum FetchStatus {
    Idle,
    Loading,
    Loaded,
    Failed(ErrorKind),
}

/// Handed out when a fetch starts. A response is only applied if the
/// location has not changed since its ticket was issued.
#[derive(Clone, Debug, PartialEq)]
pub struct FetchTicket {
    generation: u64,
    pub query: ServiceQuery,
}

/// One entry in the results list.
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ServiceCard {
    #[serde(flatten)]
    pub service: ServiceWithDistance,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub distance_text: Option<String>,
    pub expanded: bool,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(tag = "phase", rename_all = "kebab-case")]
pub enum Phase {
    Loading,
    Error {
        kind: ErrorKind,
        message: String,
        affordances: Vec<Affordance>,
    },
    Empty,
    Populated {
        cards: Vec<ServiceCard>,
    },
}

impl Phase {
    fn error(kind: ErrorKind) -> Self {
        Phase::Error {
            kind,
            message: kind.message().to_string(),
            affordances: kind.affordances().to_vec(),
        }
    }
}

/// Everything needed to draw the view at one instant.
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Snapshot {
    #[serde(flatten)]
    pub phase: Phase,
    pub filters: Filters,
    pub scroll_position: u32,
    pub show_map: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub location: Option<ResolvedLocation>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub map: Option<MapView>,
}

/// Distance to one decimal place, with halves rounded away from zero.
pub fn distance_text(distance_km: f64) -> String {
    let rounded = (distance_km * 10.0).round() / 10.0;
    format!("Approx. {rounded:.1} km away")
}

/// What the user sees after a search, moving between loading, error, empty
/// and populated.
#[derive(Debug)]
pub struct ResultsView {
    location: LocationContext,
    status: FetchStatus,
    services: Vec<ServiceWithDistance>,
    filters: Filters,
    show_map: bool,
    scroll_position: u32,
    open_description: Option<String>,
    search_params: BTreeMap<String, String>,
    limit: u32,
}

impl Default for ResultsView {
    fn default() -> Self {
        Self::new(DEFAULT_SERVICE_LIMIT)
    }
}

impl ResultsView {
    pub fn new(limit: u32) -> Self {
        Self {
            location: LocationContext::new(),
            status: FetchStatus::Idle,
            services: Vec::new(),
            filters: Filters::default(),
            show_map: false,
            scroll_position: 0,
            open_description: None,
            search_params: BTreeMap::new(),
            limit,
        }
    }

    pub fn location(&self) -> Option<&ResolvedLocation> {
        self.location.get()
    }

    pub fn set_location(&mut self, location: ResolvedLocation) {
        self.location.set(location);
    }

    pub fn clear_location(&mut self) {
        self.location.clear();
    }

    pub fn services(&self) -> &[ServiceWithDistance] {
        &self.services
    }

    pub fn filters(&self) -> &Filters {
        &self.filters
    }

    /// Enter the loading phase and describe the request to make.
    pub fn begin_fetch(&mut self) -> FetchTicket {
        let query = ServiceQuery::near(self.location.get(), self.limit);
        self.search_params = self.params_for(&query);
        self.status = FetchStatus::Loading;
        FetchTicket {
            generation: self.location.generation(),
            query,
        }
    }

    fn params_for(&self, query: &ServiceQuery) -> BTreeMap<String, String> {
        let mut params: BTreeMap<String, String> = query
            .to_params()
            .into_iter()
            .map(|(key, value)| (key.to_string(), value))
            .collect();
        match self.location.get() {
            Some(location) => {
                if let Some(postcode) = &location.postcode {
                    params.insert("postcode".to_string(), postcode.clone());
                }
                if location.source == LocationSource::None {
                    params.insert("browse".to_string(), "all".to_string());
                }
            }
            None => {
                params.insert("browse".to_string(), "all".to_string());
            }
        }
        params
    }

    /// Apply a fetch result. Returns `false` if the result was discarded
    /// because the location changed while the request was in flight.
    pub fn complete_fetch(
        &mut self,
        ticket: FetchTicket,
        result: Result<Vec<ServiceWithDistance>, FetchError>,
    ) -> bool {
        if ticket.generation != self.location.generation() {
            debug!(
                ticket = ticket.generation,
                current = self.location.generation(),
                "discarding response for a stale location"
            );
            return false;
        }
        match result {
            Ok(services) => {
                info!(count = services.len(), "services loaded");
                self.services = services;
                self.status = FetchStatus::Loaded;
            }
            Err(e) => {
                info!(error = %e, "services fetch failed");
                self.fail_fetch(ErrorKind::from(&e));
            }
        }
        self.scroll_position = 0;
        self.open_description = None;
        true
    }

    pub fn fail_fetch(&mut self, kind: ErrorKind) {
        self.services.clear();
        self.status = FetchStatus::Failed(kind);
    }

    /// Drop the location so the next fetch covers every service.
    pub fn browse_all(&mut self) -> FetchTicket {
        self.location.set(ResolvedLocation::unknown());
        self.begin_fetch()
    }

    /// Changing the category resets the sub-category, which belongs to it.
    pub fn set_category(&mut self, category: &str) {
        if self.filters.selected_category != category {
            self.filters.selected_sub_category.clear();
        }
        self.filters.selected_category = category.to_string();
    }

    pub fn set_sub_category(&mut self, sub_category: &str) {
        self.filters.selected_sub_category = sub_category.to_string();
    }

    pub fn set_sort_order(&mut self, order: SortOrder) {
        self.filters.sort_order = order;
    }

    pub fn set_scroll_position(&mut self, position: u32) {
        self.scroll_position = position;
    }

    pub fn toggle_map(&mut self) -> bool {
        self.show_map = !self.show_map;
        self.show_map
    }

    /// Expand a card's description, collapsing any other.
    pub fn toggle_description(&mut self, service_id: &str) {
        if self.open_description.as_deref() == Some(service_id) {
            self.open_description = None;
        } else {
            self.open_description = Some(service_id.to_string());
        }
    }

    /// The filtered and sorted list.
    pub fn visible(&self) -> Vec<ServiceWithDistance> {
        filter::apply(&self.services, &self.filters)
    }

    /// Map markers for the current filters and location.
    pub fn markers(&self) -> Vec<MapMarker> {
        markers::build(
            &filter::filter(&self.services, &self.filters),
            self.location.get(),
        )
    }

    pub fn map_view(&self) -> MapView {
        markers::view(
            &filter::filter(&self.services, &self.filters),
            self.location.get(),
        )
    }

    pub fn phase(&self) -> Phase {
        match self.status {
            FetchStatus::Loading => Phase::Loading,
            FetchStatus::Failed(kind) => Phase::error(kind),
            FetchStatus::Idle | FetchStatus::Loaded => {
                let visible = self.visible();
                if visible.is_empty() {
                    return Phase::Empty;
                }
                let cards = visible
                    .into_iter()
                    .map(|service| ServiceCard {
                        distance_text: service.distance.map(distance_text),
                        expanded: self.open_description.as_deref()
                            == Some(service.service.id.as_str()),
                        service,
                    })
                    .collect();
                Phase::Populated { cards }
            }
        }
    }

    pub fn snapshot(&self) -> Snapshot {
        Snapshot {
            phase: self.phase(),
            filters: self.filters.clone(),
            scroll_position: self.scroll_position,
            show_map: self.show_map,
            location: self.location.get().cloned(),
            map: self.show_map.then(|| self.map_view()),
        }
    }

    pub fn capture(&self) -> SearchState {
        SearchState {
            services: self.services.clone(),
            scroll_position: self.scroll_position,
            filters: self.filters.clone(),
            search_params: self.search_params.clone(),
        }
    }

    /// Save the current search before leaving for a service's detail page,
    /// returning the service if it is in the current result set.
    pub fn navigate_to_service(
        &self,
        store: &mut SearchStateStore,
        session: &NavigationSession,
        service_id: &str,
    ) -> Option<ServiceWithDistance> {
        store.save(session, self.capture());
        self.services
            .iter()
            .find(|service| service.service.id == service_id)
            .cloned()
    }

    /// Replay the session's saved search, if any. No request is made.
    pub fn restore(&mut self, store: &mut SearchStateStore, session: &NavigationSession) -> bool {
        let Some(state) = store.restore(session) else {
            return false;
        };
        self.replay(state);
        store.finish_restore(session);
        debug!(%session, "search state restored");
        true
    }

    /// Load a captured search as if it had just been fetched. The location is
    /// rebuilt from the saved parameters when none is set.
    pub fn replay(&mut self, state: SearchState) {
        if self.location.get().is_none() {
            if let Some(location) = location_from_params(&state.search_params) {
                self.location.set(location);
            }
        }
        self.services = state.services;
        self.filters = state.filters;
        self.scroll_position = state.scroll_position;
        self.search_params = state.search_params;
        self.status = FetchStatus::Loaded;
    }

    /// Fetch services for the current location.
    pub async fn refresh(&mut self, client: &Client) -> bool {
        let ticket = self.begin_fetch();
        let result = client.fetch_services(&ticket.query).await;
        self.complete_fetch(ticket, result)
    }

    /// Geocode `postcode`, then fetch services around it. A postcode that
    /// fails to geocode never triggers a services fetch.
    pub async fn search_postcode(&mut self, client: &Client, postcode: &str) -> bool {
        self.status = FetchStatus::Loading;
        match client.geocode(postcode).await {
            Ok(location) => {
                self.set_location(location);
                self.refresh(client).await
            }
            Err(e) => {
                self.fail_geocode(&e);
                false
            }
        }
    }

    pub fn fail_geocode(&mut self, err: &GeocodeError) {
        info!(error = %err, "geocoding failed");
        self.fail_fetch(ErrorKind::from(err));
    }

    /// Fetch services around a device-reported position.
    pub async fn search_coordinates(&mut self, client: &Client, lat: f64, lng: f64) -> bool {
        self.set_location(ResolvedLocation::from_geolocation(lat, lng));
        self.refresh(client).await
    }

    pub async fn browse_all_services(&mut self, client: &Client) -> bool {
        let ticket = self.browse_all();
        let result = client.fetch_services(&ticket.query).await;
        self.complete_fetch(ticket, result)
    }
}

fn location_from_params(params: &BTreeMap<String, String>) -> Option<ResolvedLocation> {
    let lat = params.get("lat")?.parse().ok()?;
    let lng = params.get("lng")?.parse().ok()?;
    Some(match params.get("postcode") {
        Some(postcode) => ResolvedLocation::from_postcode(lat, lng, postcode.clone()),
        None => ResolvedLocation::from_geolocation(lat, lng),
    })
}

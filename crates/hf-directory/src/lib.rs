mod api_interfaces;
pub mod categories;
pub mod client;
pub mod constants;
pub mod error;
pub mod filter;
pub mod geocode;
pub mod location;
pub mod markers;
pub mod organisation;
pub mod postcode;
pub mod results;
pub mod search_state;
pub mod services;
pub mod util;

pub use api_interfaces::organisation::Address as OrganisationAddress;
pub use client::{Client, EndpointConfig};
pub use location::{LocationContext, LocationSource, ResolvedLocation};
pub use results::{Phase, ResultsView, Snapshot};
pub use search_state::{NavigationSession, SearchState, SearchStateStore};

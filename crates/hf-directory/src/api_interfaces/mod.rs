pub mod geocode;
pub mod organisation;
pub mod services;

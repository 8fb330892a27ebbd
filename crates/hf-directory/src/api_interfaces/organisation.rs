use serde::Deserialize;
use serde_json::Value;

/// Raw organisation address, as stored against an organisation record.
#[derive(Deserialize, Default, Debug, Clone)]
#[serde(default)]
pub struct Address {
    #[serde(rename = "Key")]
    pub key: Option<BinaryKey>,
    #[serde(rename = "Street")]
    pub street: Option<String>,
    #[serde(rename = "City")]
    pub city: Option<String>,
    #[serde(rename = "Postcode")]
    pub postcode: Option<String>,
    #[serde(rename = "Location")]
    pub location: Option<Location>,
}

/// Extended-JSON binary key: `{ "$binary": { "base64": "..." } }`.
#[derive(Deserialize, Default, Debug, Clone)]
#[serde(default)]
pub struct BinaryKey {
    #[serde(rename = "$binary")]
    pub binary: Option<BinaryValue>,
}

#[derive(Deserialize, Default, Debug, Clone)]
#[serde(default)]
pub struct BinaryValue {
    pub base64: Option<String>,
}

/// Coordinates are left untyped; addresses with anything other than two
/// numbers are skipped by the caller.
#[derive(Deserialize, Default, Debug, Clone)]
#[serde(default)]
pub struct Location {
    pub coordinates: Option<Vec<Value>>,
}

use serde::Deserialize;
use serde_json::Value;

/// Raw envelope returned by the services endpoint. Records are kept as JSON
/// values so one malformed record cannot fail the whole batch.
#[derive(Deserialize, Default)]
pub struct Response {
    #[serde(default, deserialize_with = "null_as_empty")]
    pub results: Vec<Value>,
    #[serde(default, deserialize_with = "lenient_total")]
    pub total: Option<u64>,
}

fn lenient_total<'de, D>(deserializer: D) -> Result<Option<u64>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    Ok(Option::<Value>::deserialize(deserializer)?.and_then(|total| total.as_u64()))
}

fn null_as_empty<'de, D>(deserializer: D) -> Result<Vec<Value>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    Ok(Option::<Vec<Value>>::deserialize(deserializer)?.unwrap_or_default())
}

/// Raw service record from the directory.
#[derive(Deserialize, Default, Debug)]
#[serde(default)]
pub struct Service {
    #[serde(rename = "_id")]
    pub id: Option<Value>,
    #[serde(rename = "ServiceProviderName")]
    pub provider_name: Option<String>,
    #[serde(rename = "ServiceProviderKey")]
    pub provider_key: Option<String>,
    #[serde(rename = "Info")]
    pub info: Option<String>,
    #[serde(rename = "ParentCategoryKey")]
    pub category_key: Option<String>,
    #[serde(rename = "SubCategoryKey")]
    pub sub_category_key: Option<String>,
    #[serde(rename = "Address")]
    pub address: Option<Address>,
    #[serde(rename = "ClientGroups")]
    pub client_groups: Option<Vec<String>>,
    #[serde(rename = "OpeningTimes")]
    pub opening_times: Option<Vec<Value>>,
    pub organisation: Option<Organisation>,
    pub distance: Option<f64>,
}

/// Raw address data. Only the coordinates are used.
#[derive(Deserialize, Default, Debug)]
#[serde(default)]
pub struct Address {
    #[serde(rename = "Location")]
    pub location: Option<GeoPoint>,
}

/// GeoJSON-style point, coordinates in `[lng, lat]` order.
#[derive(Deserialize, Default, Debug)]
#[serde(default)]
pub struct GeoPoint {
    pub coordinates: Option<Vec<f64>>,
}

#[derive(Deserialize, Default, Debug)]
#[serde(default, rename_all = "camelCase")]
pub struct Organisation {
    pub name: Option<String>,
    pub slug: Option<String>,
    pub is_verified: Option<bool>,
}

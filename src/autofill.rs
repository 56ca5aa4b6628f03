//! Address autofill from a postal code or a coordinate pair.
//!
//! Lookups are best effort. Every failure is logged and reported as `None`;
//! the form leaves the affected fields blank.

use std::time::Duration;

use async_trait::async_trait;
use serde_json::{Map, Value};
use url::Url;

use crate::error::{BackofficeError, Result};

pub const DEFAULT_POSTAL_API: &str = "https://api.postalpincode.in/";
pub const DEFAULT_GEOCODER: &str = "https://nominatim.openstreetmap.org/";

const USER_AGENT: &str = concat!("backoffice/", env!("CARGO_PKG_VERSION"));

/// Address parts a lookup could resolve.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AddressFragment {
    pub address: Option<String>,
    pub city: Option<String>,
    pub district: Option<String>,
    pub state: Option<String>,
    pub pincode: Option<String>,
}

impl AddressFragment {
    pub fn is_empty(&self) -> bool {
        self.address.is_none()
            && self.city.is_none()
            && self.district.is_none()
            && self.state.is_none()
            && self.pincode.is_none()
    }

    /// The resolved parts as form fields, keyed by their field names.
    pub fn into_fields(self) -> Map<String, Value> {
        let mut fields = Map::new();
        let parts = [
            ("address", self.address),
            ("city", self.city),
            ("district", self.district),
            ("state", self.state),
            ("pincode", self.pincode),
        ];
        for (name, value) in parts {
            if let Some(value) = value {
                fields.insert(name.to_string(), Value::String(value));
            }
        }
        fields
    }
}

#[async_trait]
pub trait AddressAutofill: Send + Sync {
    async fn lookup_pincode(&self, pincode: &str) -> Option<AddressFragment>;

    async fn reverse_geocode(&self, latitude: f64, longitude: f64) -> Option<AddressFragment>;
}

fn non_empty(value: Option<&Value>) -> Option<String> {
    value
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|s| !s.is_empty() && *s != "NA")
        .map(String::from)
}

/// Parse a postal-code API response:
/// `[{"Status": "Success", "PostOffice": [{"District": .., "State": ..}]}]`.
pub fn parse_pincode_response(pincode: &str, body: &Value) -> Option<AddressFragment> {
    let entry = match body {
        Value::Array(entries) => entries.first()?,
        other => other,
    };
    if entry.get("Status").and_then(Value::as_str) != Some("Success") {
        return None;
    }
    let office = entry.get("PostOffice")?.as_array()?.first()?;
    let fragment = AddressFragment {
        address: None,
        city: non_empty(office.get("Block")).or_else(|| non_empty(office.get("Name"))),
        district: non_empty(office.get("District")),
        state: non_empty(office.get("State")),
        pincode: Some(pincode.to_string()),
    };
    (fragment.district.is_some() || fragment.state.is_some()).then_some(fragment)
}

/// Parse a Nominatim-style reverse geocoding response.
pub fn parse_reverse_response(body: &Value) -> Option<AddressFragment> {
    if body.get("error").is_some() {
        return None;
    }
    let address = body.get("address");
    let part = |keys: &[&str]| {
        keys.iter()
            .find_map(|key| non_empty(address.and_then(|a| a.get(*key))))
    };
    let fragment = AddressFragment {
        address: non_empty(body.get("display_name")),
        city: part(&["city", "town", "village", "suburb"]),
        district: part(&["state_district", "county", "district"]),
        state: part(&["state"]),
        pincode: part(&["postcode"]),
    };
    (!fragment.is_empty()).then_some(fragment)
}

/// Autofill against public postal-code and reverse-geocoding services.
pub struct PublicAutofill {
    client: reqwest::Client,
    postal_api: Url,
    geocoder: Url,
}

impl PublicAutofill {
    pub fn new(postal_api: &str, geocoder: &str, timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .user_agent(USER_AGENT)
            .build()
            .map_err(|e| BackofficeError::Config(format!("failed to build HTTP client: {e}")))?;
        Ok(Self {
            client,
            postal_api: Url::parse(postal_api)?,
            geocoder: Url::parse(geocoder)?,
        })
    }

    pub fn with_defaults(timeout: Duration) -> Result<Self> {
        Self::new(DEFAULT_POSTAL_API, DEFAULT_GEOCODER, timeout)
    }

    async fn fetch_json(&self, url: Url) -> Option<Value> {
        let response = match self.client.get(url).send().await {
            Ok(r) => r,
            Err(e) => {
                tracing::warn!("autofill lookup failed: {e}");
                return None;
            }
        };
        if !response.status().is_success() {
            tracing::debug!(status = %response.status(), "autofill lookup rejected");
            return None;
        }
        match response.json::<Value>().await {
            Ok(body) => Some(body),
            Err(e) => {
                tracing::debug!("autofill response is not JSON: {e}");
                None
            }
        }
    }
}

#[async_trait]
impl AddressAutofill for PublicAutofill {
    async fn lookup_pincode(&self, pincode: &str) -> Option<AddressFragment> {
        let pincode = pincode.trim();
        if pincode.len() != 6 || !pincode.chars().all(|c| c.is_ascii_digit()) {
            return None;
        }
        let url = self.postal_api.join(&format!("pincode/{pincode}")).ok()?;
        let body = self.fetch_json(url).await?;
        parse_pincode_response(pincode, &body)
    }

    async fn reverse_geocode(&self, latitude: f64, longitude: f64) -> Option<AddressFragment> {
        if !(-90.0..=90.0).contains(&latitude) || !(-180.0..=180.0).contains(&longitude) {
            return None;
        }
        let mut url = self.geocoder.join("reverse").ok()?;
        url.query_pairs_mut()
            .append_pair("format", "json")
            .append_pair("lat", &latitude.to_string())
            .append_pair("lon", &longitude.to_string());
        let body = self.fetch_json(url).await?;
        parse_reverse_response(&body)
    }
}

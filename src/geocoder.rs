//! Client for the Naver Maps geocoding APIs.
//!
//! Forward geocoding turns flood-damage addresses into coordinates for the
//! import tool. Reverse geocoding is proxied verbatim to the browser client,
//! which does its own formatting of the provider response.

use std::fmt;

use serde_json::Value;
use tracing::{debug, instrument, warn};

use crate::geocode_error::GeocodeError;

const API_KEY_ID_HEADER: &str = "X-NCP-APIGW-API-KEY-ID";
const API_KEY_HEADER: &str = "X-NCP-APIGW-API-KEY";

#[derive(Clone)]
pub struct NaverCredentials {
    pub client_id: String,
    pub client_secret: String,
}

impl fmt::Debug for NaverCredentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NaverCredentials")
            .field("client_id", &self.client_id)
            .field("client_secret", &"<redacted>")
            .finish()
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Coordinates {
    pub latitude: f64,
    pub longitude: f64,
}

#[derive(Clone)]
pub struct NaverMapsClient {
    client: reqwest::Client,
    base_url: String,
    credentials: Option<NaverCredentials>,
}

impl NaverMapsClient {
    pub const DEFAULT_BASE_URL: &'static str = "https://maps.apigw.ntruss.com";

    pub fn new(credentials: Option<NaverCredentials>) -> Self {
        Self::with_base_url(Self::DEFAULT_BASE_URL.to_string(), credentials)
    }

    /// Point the client at a different host (used for mocking in tests)
    pub fn with_base_url(base_url: String, credentials: Option<NaverCredentials>) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
            credentials,
        }
    }

    pub fn has_credentials(&self) -> bool {
        self.credentials.is_some()
    }

    fn credentials(&self) -> Result<&NaverCredentials, GeocodeError> {
        self.credentials.as_ref().ok_or(GeocodeError::MissingCredentials)
    }

    /// Reverse-geocode a coordinate and hand back the provider JSON untouched
    #[instrument(skip(self))]
    pub async fn reverse_geocode(&self, latitude: f64, longitude: f64) -> Result<Value, GeocodeError> {
        let credentials = self.credentials()?;
        let url = format!("{}/map-reversegeocode/v2/gc", self.base_url);
        let coords = format!("{longitude},{latitude}");

        debug!("Sending reverse geocode request for {}", coords);
        let response = self
            .client
            .get(&url)
            .query(&[
                ("coords", coords.as_str()),
                ("output", "json"),
                ("orders", "admcode,addr,roadaddr"),
            ])
            .header(API_KEY_ID_HEADER, &credentials.client_id)
            .header(API_KEY_HEADER, &credentials.client_secret)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            warn!("Reverse geocode provider returned {}", status);
            return Err(GeocodeError::Upstream {
                status: status.as_u16(),
            });
        }

        Ok(response.json::<Value>().await?)
    }

    /// Forward-geocode an address; `Ok(None)` when the provider has no match
    #[instrument(skip(self))]
    pub async fn geocode(&self, address: &str) -> Result<Option<Coordinates>, GeocodeError> {
        let credentials = self.credentials()?;
        let url = format!("{}/map-geocode/v2/geocode", self.base_url);

        let response = self
            .client
            .get(&url)
            .query(&[("query", address)])
            .header(API_KEY_ID_HEADER, &credentials.client_id)
            .header(API_KEY_HEADER, &credentials.client_secret)
            .send()
            .await?;

        let status = response.status();
        debug!("Received geocode response with status: {}", status);
        if !status.is_success() {
            return Err(GeocodeError::Upstream {
                status: status.as_u16(),
            });
        }

        let body: Value = response.json().await?;
        parse_geocode_response(&body)
    }
}

/// Pulls the first match out of a `map-geocode/v2/geocode` response.
///
/// Naver reports coordinates as strings: `x` is longitude, `y` latitude.
fn parse_geocode_response(body: &Value) -> Result<Option<Coordinates>, GeocodeError> {
    let Some(first) = body["addresses"].as_array().and_then(|a| a.first()) else {
        return Ok(None);
    };

    let longitude = coordinate_field(first, "x")?;
    let latitude = coordinate_field(first, "y")?;

    Ok(Some(Coordinates {
        latitude,
        longitude,
    }))
}

fn coordinate_field(entry: &Value, key: &str) -> Result<f64, GeocodeError> {
    let value = match &entry[key] {
        Value::String(s) => s.trim().parse::<f64>().ok(),
        Value::Number(n) => n.as_f64(),
        _ => None,
    };

    value
        .filter(|v| v.is_finite())
        .ok_or_else(|| GeocodeError::Parse(format!("missing or invalid '{key}' in geocode result")))
}

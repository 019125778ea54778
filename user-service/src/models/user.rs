use serde::{Deserialize, Serialize};
use service_core::error::AppError;
use std::fmt;
use uuid::Uuid;
use validator::ValidationError;

/// Longest key the Realtime Database accepts, in bytes.
const MAX_ID_LEN: usize = 128;
const MAX_POSTAL_CODE_LEN: usize = 10;

/// Key of a user record.
///
/// Keys follow Realtime Database rules so they can be used verbatim as a path
/// segment in every backend.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UserId(String);

impl UserId {
    pub fn generate() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    pub fn parse(raw: &str) -> Result<Self, AppError> {
        if raw.is_empty() || raw.len() > MAX_ID_LEN {
            return Err(AppError::BadRequest(anyhow::anyhow!(
                "User id must be between 1 and {} bytes",
                MAX_ID_LEN
            )));
        }
        if raw
            .chars()
            .any(|c| matches!(c, '.' | '$' | '#' | '[' | ']' | '/') || c.is_ascii_control())
        {
            return Err(AppError::BadRequest(anyhow::anyhow!(
                "User id contains forbidden characters"
            )));
        }
        Ok(Self(raw.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Postal code as the caller sent it. Numbers stay numbers on the wire.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum PostalCode {
    Numeric(u32),
    Text(String),
}

impl PostalCode {
    /// Value for the lookup API's `zip` parameter.
    ///
    /// US codes sent as JSON numbers lose their leading zeros ("02134" becomes
    /// 2134), so they are padded back to five digits.
    pub fn query_value(&self, country_code: &str) -> String {
        match self {
            PostalCode::Numeric(n) if country_code.eq_ignore_ascii_case("us") => format!("{:05}", n),
            PostalCode::Numeric(n) => n.to_string(),
            PostalCode::Text(s) => s.trim().to_string(),
        }
    }
}

impl fmt::Display for PostalCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PostalCode::Numeric(n) => write!(f, "{}", n),
            PostalCode::Text(s) => f.write_str(s),
        }
    }
}

pub fn validate_postal_code(zip: &PostalCode) -> Result<(), ValidationError> {
    let valid = match zip {
        PostalCode::Numeric(n) => *n != 0,
        PostalCode::Text(s) => {
            let s = s.trim();
            !s.is_empty()
                && s.len() <= MAX_POSTAL_CODE_LEN
                && s.chars().all(|c| c.is_ascii_alphanumeric() || c == ' ' || c == '-')
        }
    };

    if valid {
        Ok(())
    } else {
        let mut err = ValidationError::new("postal_code");
        err.message = Some("Postal code is not valid".into());
        Err(err)
    }
}

/// Result of resolving a postal code.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeoLocation {
    /// Shift from UTC in seconds.
    pub timezone: i32,
    pub lat: f64,
    pub lon: f64,
}

/// A stored user record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct User {
    pub id: UserId,
    pub name: String,
    pub zip: PostalCode,
    /// Absent on records written before timezones were resolved.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timezone: Option<i32>,
    pub lat: f64,
    pub lon: f64,
}

impl User {
    pub fn new(id: UserId, name: String, zip: PostalCode, location: GeoLocation) -> Self {
        Self {
            id,
            name,
            zip,
            timezone: Some(location.timezone),
            lat: location.lat,
            lon: location.lon,
        }
    }

    pub fn set_location(&mut self, location: GeoLocation) {
        self.timezone = Some(location.timezone);
        self.lat = location.lat;
        self.lon = location.lon;
    }
}

//! Listing data model
//!
//! A [`Listing`] is the unit the crawler extracts, deduplicates and hands off.
//! Its JSON shape is the wire format for publishers: optional fields that are
//! absent are omitted rather than serialized as `null`.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use url::Url;

/// Postal address of a listing
///
/// Every part is free text taken positionally from the page, so any of them
/// may be missing depending on which address layout the site used.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Address {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub city: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub province: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub district: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub street: Option<String>,

    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub zip_code: String,
}

/// One extracted listing
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Listing {
    /// Stable identifier taken from the detail-page URL path
    pub id: String,

    /// Absolute URL of the detail page
    #[serde(rename = "url")]
    pub source_url: String,

    /// Rent with currency glyphs and separators removed
    pub price: u64,

    /// Surface area with the unit removed
    pub area: u64,

    pub address: Address,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub interior: Option<String>,

    pub offered_at: DateTime<Utc>,

    pub crawled_at: DateTime<Utc>,
}

impl Listing {
    /// Partition key used by the by-city store layout
    pub fn city(&self) -> &str {
        self.address.city.as_deref().unwrap_or("")
    }
}

/// Raw content of one fetched detail page
#[derive(Debug, Clone)]
pub struct DetailPage {
    /// Final URL of the page after redirects
    pub url: Url,

    /// HTTP status code of the response
    pub status_code: u16,

    /// Response body
    pub body: String,
}

//! Per-field parsers
//!
//! Each parser turns one piece of page text into a typed value or a
//! [`FieldError`] carrying the offending text. They are pure functions so the
//! locale quirks (thousands separators, mis-decoded euro signs, relative
//! dates) can be tested without HTML.

use crate::listing::Address;
use chrono::{DateTime, Duration, Months, NaiveDate, TimeZone, Utc};
use thiserror::Error;
use url::Url;

/// Absolute offer dates are written day first
pub const OFFER_DATE_FORMAT: &str = "%d-%m-%Y";

/// Thousands separator removed from price tokens
const PRICE_SEPARATOR: char = ',';

/// Currency glyphs removed from price tokens
const CURRENCY_GLYPHS: &[char] = &['€', '$', '£', '¥'];

/// A euro sign decoded as Latin-1, which some pages still serve
const MOJIBAKE_EURO: &str = "â‚¬";

/// Breadcrumb positions, counted from the section crumb at index 0
const BREADCRUMB_PROVINCE: usize = 1;
const BREADCRUMB_CITY: usize = 2;
const BREADCRUMB_DISTRICT: usize = 3;
const BREADCRUMB_STREET: usize = 4;

/// A single field that could not be extracted
///
/// The display form starts with the field-kind prefix so log lines can be
/// grouped by field.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FieldError {
    #[error("id_error: {reason} (text: {text:?})")]
    Id { text: String, reason: String },

    #[error("price_error: {reason} (text: {text:?})")]
    Price { text: String, reason: String },

    #[error("address_error: {reason} (text: {text:?})")]
    Address { text: String, reason: String },

    #[error("area_error: {reason} (text: {text:?})")]
    Area { text: String, reason: String },

    #[error("offerDate_error: {reason} (text: {text:?})")]
    OfferDate { text: String, reason: String },
}

impl FieldError {
    /// Short field-kind name
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Id { .. } => "id",
            Self::Price { .. } => "price",
            Self::Address { .. } => "address",
            Self::Area { .. } => "area",
            Self::OfferDate { .. } => "offer_date",
        }
    }

    /// The page text that failed to parse
    pub fn text(&self) -> &str {
        match self {
            Self::Id { text, .. }
            | Self::Price { text, .. }
            | Self::Address { text, .. }
            | Self::Area { text, .. }
            | Self::OfferDate { text, .. } => text,
        }
    }
}

/// Derives the listing id from the detail-page URL
///
/// The path is split on `/` with the empty segment before the leading slash
/// counted, so `/apartment-for-rent/amsterdam/a1b2c3/street` yields
/// `a1b2c3`. Fewer than four segments, or an empty fourth one, is an error.
pub fn parse_id(url: &Url) -> Result<String, FieldError> {
    let segments: Vec<&str> = url.path().split('/').collect();

    if segments.len() < 4 {
        return Err(FieldError::Id {
            text: url.to_string(),
            reason: format!(
                "path must have at least 4 segments, got {}",
                segments.len()
            ),
        });
    }

    let id = segments[3].trim();
    if id.is_empty() {
        return Err(FieldError::Id {
            text: url.to_string(),
            reason: "id segment is empty".to_string(),
        });
    }

    Ok(id.to_string())
}

/// Parses a price such as `€1,250 per month` into `1250`
pub fn parse_price(text: &str) -> Result<u64, FieldError> {
    let error = |reason: String| FieldError::Price {
        text: text.to_string(),
        reason,
    };

    let token = text.split_whitespace().next().unwrap_or("");
    let cleaned: String = token
        .replace(MOJIBAKE_EURO, "")
        .chars()
        .filter(|c| *c != PRICE_SEPARATOR && !CURRENCY_GLYPHS.contains(c))
        .collect();

    if cleaned.is_empty() {
        return Err(error("no amount before the first space".to_string()));
    }

    cleaned
        .parse::<u64>()
        .map_err(|e| error(format!("'{}' is not an amount: {}", cleaned, e)))
}

/// Parses a surface area such as `85 m²` into `85`
pub fn parse_area(text: &str) -> Result<u64, FieldError> {
    let token = text.split_whitespace().next().unwrap_or("");

    token.parse::<u64>().map_err(|e| FieldError::Area {
        text: text.to_string(),
        reason: if token.is_empty() {
            "area text is empty".to_string()
        } else {
            format!("'{}' is not a number: {}", token, e)
        },
    })
}

/// Splits a composite label such as `1012 AB Amsterdam (Centrum)`
///
/// Returns `(zip_code, district)`: the part before `(` with trailing space
/// removed, and the part after it with the closing `)` removed.
pub fn parse_composite_label(text: &str) -> Result<(String, String), FieldError> {
    let parts: Vec<&str> = text.split('(').collect();

    if parts.len() < 2 {
        return Err(FieldError::Address {
            text: text.to_string(),
            reason: format!("expected 'zip (district)', got {} part(s)", parts.len()),
        });
    }

    let zip_code = parts[0].trim_end().to_string();
    let district = parts[1].trim_end().trim_end_matches(')').trim().to_string();

    Ok((zip_code, district))
}

/// Builds an address from a single composite label
pub fn parse_composite_address(text: &str) -> Result<Address, FieldError> {
    let (zip_code, district) = parse_composite_label(text)?;

    Ok(Address {
        district: non_empty(district),
        zip_code,
        ..Default::default()
    })
}

/// Builds an address from a breadcrumb trail and a separate zip-code label
///
/// Breadcrumb positions map to province, city, district and street; missing
/// positions leave the field empty. The zip-code label is split like a
/// composite label and its district is used when the trail has none.
pub fn parse_breadcrumb_address(
    crumbs: &[String],
    zip_text: &str,
) -> Result<Address, FieldError> {
    let (zip_code, label_district) = parse_composite_label(zip_text)?;
    let crumb = |index: usize| crumbs.get(index).cloned().and_then(non_empty);

    Ok(Address {
        province: crumb(BREADCRUMB_PROVINCE),
        city: crumb(BREADCRUMB_CITY),
        district: crumb(BREADCRUMB_DISTRICT).or_else(|| non_empty(label_district)),
        street: crumb(BREADCRUMB_STREET),
        zip_code,
    })
}

/// Parses the offer date relative to `now`
///
/// Accepted shapes, tried in order:
/// 1. `N weeks` / `N+ weeks` → `now` minus `7 × N` days
/// 2. `N months` / `N+ months` → `now` minus `N` calendar months
/// 3. `DD-MM-YYYY` → that date at midnight UTC
pub fn parse_offer_date(text: &str, now: DateTime<Utc>) -> Result<DateTime<Utc>, FieldError> {
    let error = |reason: String| FieldError::OfferDate {
        text: text.to_string(),
        reason,
    };
    let trimmed = text.trim();

    if trimmed.contains("week") {
        let weeks = leading_count(trimmed).map_err(error)?;
        return now
            .checked_sub_signed(Duration::days(7 * i64::from(weeks)))
            .ok_or_else(|| error(format!("{} weeks is out of range", weeks)));
    }

    if trimmed.contains("month") {
        let months = leading_count(trimmed).map_err(error)?;
        return now
            .checked_sub_months(Months::new(months))
            .ok_or_else(|| error(format!("{} months is out of range", months)));
    }

    let date = NaiveDate::parse_from_str(trimmed, OFFER_DATE_FORMAT)
        .map_err(|e| error(format!("expected DD-MM-YYYY: {}", e)))?;
    let midnight = date
        .and_hms_opt(0, 0, 0)
        .ok_or_else(|| error("date has no midnight".to_string()))?;

    Ok(Utc.from_utc_datetime(&midnight))
}

/// Reads the count at the start of `4 weeks` or `6+ months`
fn leading_count(text: &str) -> Result<u32, String> {
    let token = text
        .split_whitespace()
        .next()
        .unwrap_or("")
        .trim_end_matches('+');

    token
        .parse::<u32>()
        .map_err(|e| format!("'{}' is not a count: {}", token, e))
}

fn non_empty(value: String) -> Option<String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}

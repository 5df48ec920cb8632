//! Detail-page extraction
//!
//! The [`Extractor`] holds the compiled selectors for one site and turns a
//! fetched [`DetailPage`] into a [`Listing`]. Field parsing lives in
//! [`fields`]; this module only locates the text on the page and assembles
//! the record.
//!
//! Extraction of a page stops at the first field that fails. The id is read
//! from the URL before anything else, so a failure on a later field still
//! reports which listing it belonged to.

pub mod fields;

use crate::config::{compile_selector, AddressStrategy, Config, SelectorConfig};
use crate::listing::{DetailPage, Listing};
use crate::ConfigResult;
use chrono::{DateTime, Utc};
use scraper::{ElementRef, Html, Selector};
use thiserror::Error;

pub use fields::FieldError;

/// Why a page produced no listing
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ExtractError {
    /// The detail root selector matched nothing
    #[error("page has no listing detail section")]
    NotAListing,

    #[error(transparent)]
    Field(#[from] FieldError),
}

/// A failed extraction, with the id if it was derived before the failure
#[derive(Debug, Clone, Error)]
#[error("{url}: {error}")]
pub struct ExtractFailure {
    pub url: String,
    pub id: Option<String>,
    pub error: ExtractError,
}

/// Compiled selectors for one site
#[derive(Debug, Clone)]
struct Selectors {
    detail_root: Selector,
    price: Selector,
    address: Selector,
    area: Selector,
    offer_date: Selector,
    interior: Selector,
    breadcrumb: Selector,
    zip_code: Selector,
}

/// Turns detail pages into listings
#[derive(Debug, Clone)]
pub struct Extractor {
    selectors: Selectors,
    strategy: AddressStrategy,
}

impl Extractor {
    /// Compiles the selectors
    ///
    /// Fails with [`crate::ConfigError::InvalidSelector`] if any selector
    /// does not parse.
    pub fn new(config: &SelectorConfig, strategy: AddressStrategy) -> ConfigResult<Self> {
        Ok(Self {
            selectors: Selectors {
                detail_root: compile_selector(&config.detail_root)?,
                price: compile_selector(&config.price)?,
                address: compile_selector(&config.address)?,
                area: compile_selector(&config.area)?,
                offer_date: compile_selector(&config.offer_date)?,
                interior: compile_selector(&config.interior)?,
                breadcrumb: compile_selector(&config.breadcrumb)?,
                zip_code: compile_selector(&config.zip_code)?,
            },
            strategy,
        })
    }

    pub fn from_config(config: &Config) -> ConfigResult<Self> {
        Self::new(&config.selectors, config.extraction.address_strategy)
    }

    /// Extracts a listing, resolving relative offer dates against the current time
    ///
    /// `city` is the crawl target's city name when the pass was started for a
    /// city; it fills the address city unless the page itself supplies one.
    pub fn extract(&self, page: &DetailPage, city: Option<&str>) -> Result<Listing, ExtractFailure> {
        self.extract_at(page, city, Utc::now())
    }

    /// Extracts a listing, resolving relative offer dates against `now`
    pub fn extract_at(
        &self,
        page: &DetailPage,
        city: Option<&str>,
        now: DateTime<Utc>,
    ) -> Result<Listing, ExtractFailure> {
        let url = page.url.to_string();
        let failure = |id: Option<String>, error: ExtractError| ExtractFailure {
            url: url.clone(),
            id,
            error,
        };

        let document = Html::parse_document(&page.body);
        let root = document
            .select(&self.selectors.detail_root)
            .next()
            .ok_or_else(|| failure(None, ExtractError::NotAListing))?;

        let id = fields::parse_id(&page.url).map_err(|e| failure(None, e.into()))?;
        let with_id = |e: FieldError| failure(Some(id.clone()), e.into());

        let price = fields::parse_price(&child_text(root, &self.selectors.price)).map_err(with_id)?;

        let mut address = match self.strategy {
            AddressStrategy::Composite => {
                fields::parse_composite_address(&child_text(root, &self.selectors.address))
            }
            AddressStrategy::Breadcrumb => fields::parse_breadcrumb_address(
                &child_texts(&document, &self.selectors.breadcrumb),
                &child_text(root, &self.selectors.zip_code),
            ),
        }
        .map_err(with_id)?;

        if address.city.is_none() {
            address.city = city.map(str::to_string);
        }

        let area = fields::parse_area(&child_text(root, &self.selectors.area)).map_err(with_id)?;
        let offered_at = fields::parse_offer_date(&child_text(root, &self.selectors.offer_date), now)
            .map_err(with_id)?;

        let interior = Some(child_text(root, &self.selectors.interior)).filter(|s| !s.is_empty());

        Ok(Listing {
            id,
            source_url: url,
            price,
            area,
            address,
            interior,
            offered_at,
            crawled_at: Utc::now(),
        })
    }
}

/// Text of every element under `root` matching `selector`, whitespace collapsed
fn child_text(root: ElementRef<'_>, selector: &Selector) -> String {
    let raw: String = root
        .select(selector)
        .flat_map(|element| element.text())
        .collect();
    collapse_whitespace(&raw)
}

/// Text of each element matching `selector`, one entry per element
///
/// Breadcrumbs usually sit outside the detail section, so the whole document
/// is searched.
fn child_texts(document: &Html, selector: &Selector) -> Vec<String> {
    document
        .select(selector)
        .map(|element| collapse_whitespace(&element.text().collect::<String>()))
        .collect()
}

fn collapse_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

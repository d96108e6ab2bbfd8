//! Listing source gateway: ordered fetch strategies over the upstream rental
//! search (GraphQL API first, HTML page scrape as fallback) plus the
//! best-effort preview side channel.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use chrono_tz::America::New_York;
use fm_core::{
    bath_display, bed_display, fee_display, price_display, GeoPoint, LeadMedia, Listing, MediaKey,
    OpenHouse,
};
use scraper::{Html, Selector};
use serde::Deserialize;
use serde_json::{json, Map, Value as JsonValue};
use thiserror::Error;
use tracing::{info, warn};

pub const CRATE_NAME: &str = "fm-source";

pub const LISTING_URL_BASE: &str = "https://streeteasy.com";
pub const PHOTO_URL_PREFIX: &str = "https://photos.zillowstatic.com/fp/";
pub const PHOTO_URL_SUFFIX: &str = "-se_large_800_400.webp";

/// How many listings the preview side channel projects.
pub const PREVIEW_COUNT: usize = 5;

#[derive(Debug, Error)]
pub enum SourceError {
    #[error("request to {url} failed: {source}")]
    Transport {
        url: String,
        #[source]
        source: reqwest::Error,
    },
    #[error("{strategy} returned an unexpected payload: {detail}")]
    Payload {
        strategy: &'static str,
        detail: String,
    },
    #[error("all fetch strategies failed; last error: {last}")]
    Unavailable {
        #[source]
        last: Box<SourceError>,
    },
}

/// One way of obtaining a batch of listings, most-recent-first. A strategy
/// succeeds if it returns without a transport/parse error; an empty batch is
/// still a success.
#[async_trait]
pub trait FetchStrategy: Send + Sync {
    fn name(&self) -> &'static str;

    async fn fetch(&self, per_page: usize) -> Result<Vec<Listing>, SourceError>;
}

/// Consumer of the preview projection. Publishing is a pure side channel:
/// the gateway logs failures and never lets them surface.
#[async_trait]
pub trait PreviewPublisher: Send + Sync {
    async fn publish(&self, preview: &JsonValue) -> anyhow::Result<()>;
}

/// Tries strategies in priority order and returns the first successful batch.
pub struct ListingSourceGateway {
    strategies: Vec<Box<dyn FetchStrategy>>,
    preview: Option<Box<dyn PreviewPublisher>>,
}

impl ListingSourceGateway {
    pub fn new(strategies: Vec<Box<dyn FetchStrategy>>) -> Self {
        Self {
            strategies,
            preview: None,
        }
    }

    pub fn with_preview(mut self, preview: Box<dyn PreviewPublisher>) -> Self {
        self.preview = Some(preview);
        self
    }

    pub async fn fetch(&self, per_page: usize) -> Result<Vec<Listing>, SourceError> {
        let mut last: Option<SourceError> = None;
        for strategy in &self.strategies {
            match strategy.fetch(per_page).await {
                Ok(listings) => {
                    info!(
                        strategy = strategy.name(),
                        count = listings.len(),
                        "fetched listing batch"
                    );
                    self.publish_preview(&listings).await;
                    return Ok(listings);
                }
                Err(err) => {
                    warn!(strategy = strategy.name(), error = %err, "fetch strategy failed");
                    last = Some(err);
                }
            }
        }
        Err(SourceError::Unavailable {
            last: Box::new(last.unwrap_or(SourceError::Payload {
                strategy: "gateway",
                detail: "no fetch strategies configured".into(),
            })),
        })
    }

    async fn publish_preview(&self, listings: &[Listing]) {
        let Some(publisher) = &self.preview else {
            return;
        };
        let preview = preview_projection(listings, Utc::now());
        if let Err(err) = publisher.publish(&preview).await {
            warn!(error = %err, "preview publish failed");
        }
    }
}

pub fn listing_url(listing: &Listing) -> Option<String> {
    listing
        .url_path
        .as_deref()
        .map(|path| format!("{LISTING_URL_BASE}{path}"))
}

pub fn lead_photo_url(listing: &Listing) -> Option<String> {
    listing
        .lead_media
        .as_ref()
        .and_then(|m| m.photo.as_ref())
        .map(|p| format!("{PHOTO_URL_PREFIX}{}{PHOTO_URL_SUFFIX}", p.key))
}

/// Flattened projection of the most recent listings for the public read
/// cache: `photo0`/`url0`/`topLine0`/`bedBathDisplay0` and so on, plus an
/// Eastern-time "as of" message.
pub fn preview_projection(listings: &[Listing], now: DateTime<Utc>) -> JsonValue {
    let stamp = now
        .with_timezone(&New_York)
        .format("%-m/%-d/%y @ %-I:%M%P")
        .to_string();

    let mut flattened = Map::new();
    flattened.insert(
        "message".into(),
        json!(format!("Most recent listings as of {stamp} ET")),
    );
    for (i, listing) in listings.iter().take(PREVIEW_COUNT).enumerate() {
        let top_line = format!(
            "{} | {} | {}",
            price_display(listing.price),
            fee_display(listing.no_fee),
            listing.area_name.as_deref().unwrap_or("")
        );
        let bed_bath = format!(
            "{} | {}",
            bed_display(listing.bedroom_count),
            bath_display(listing.full_bathroom_count, listing.half_bathroom_count)
        );
        flattened.insert(format!("photo{i}"), json!(lead_photo_url(listing)));
        flattened.insert(format!("url{i}"), json!(listing_url(listing)));
        flattened.insert(format!("topLine{i}"), json!(top_line));
        flattened.insert(format!("bedBathDisplay{i}"), json!(bed_bath));
    }
    JsonValue::Object(flattened)
}

/// Publishes the preview projection to a public blob cache with a
/// read-write token, uncached so the downstream page always sees the latest
/// snapshot.
pub struct BlobPreviewPublisher {
    client: reqwest::Client,
    blob_url: String,
    token: String,
}

impl BlobPreviewPublisher {
    pub fn new(client: reqwest::Client, blob_url: impl Into<String>, token: impl Into<String>) -> Self {
        Self {
            client,
            blob_url: blob_url.into(),
            token: token.into(),
        }
    }
}

#[async_trait]
impl PreviewPublisher for BlobPreviewPublisher {
    async fn publish(&self, preview: &JsonValue) -> anyhow::Result<()> {
        self.client
            .put(&self.blob_url)
            .bearer_auth(&self.token)
            .header("x-add-random-suffix", "0")
            .header("x-cache-control-max-age", "0")
            .json(preview)
            .send()
            .await?
            .error_for_status()?;
        Ok(())
    }
}

const SEARCH_RENTALS_QUERY: &str = "\
query GetAllRentalListingDetails($input: SearchRentalsInput!) {
  searchRentals(input: $input) {
    totalCount
    edges {
      ... on OrganicRentalEdge {
        node {
          id
          areaName
          availableAt
          bedroomCount
          buildingType
          fullBathroomCount
          furnished
          geoPoint { latitude longitude }
          halfBathroomCount
          hasTour3d
          hasVideos
          isNewDevelopment
          leadMedia { photo { key } }
          leaseTerm
          livingAreaSize
          mediaAssetCount
          monthsFree
          noFee
          netEffectivePrice
          offMarketAt
          photos { key }
          price
          priceChangedAt
          priceDelta
          sourceGroupLabel
          sourceType
          state
          status
          street
          upcomingOpenHouse { startTime endTime appointmentOnly }
          unit
          zipCode
          urlPath
        }
      }
    }
  }
}";

#[derive(Debug, Deserialize)]
struct GraphqlEnvelope {
    data: Option<GraphqlData>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GraphqlData {
    search_rentals: Option<SearchRentals>,
}

#[derive(Debug, Deserialize, Default)]
struct SearchRentals {
    #[serde(default)]
    edges: Vec<RentalEdge>,
}

#[derive(Debug, Deserialize)]
struct RentalEdge {
    node: RentalNode,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RentalNode {
    id: String,
    area_name: Option<String>,
    available_at: Option<String>,
    bedroom_count: Option<i64>,
    building_type: Option<String>,
    full_bathroom_count: Option<i64>,
    half_bathroom_count: Option<i64>,
    furnished: Option<bool>,
    geo_point: Option<NodeGeoPoint>,
    has_tour3d: Option<bool>,
    has_videos: Option<bool>,
    is_new_development: Option<bool>,
    lead_media: Option<NodeLeadMedia>,
    lease_term: Option<i64>,
    living_area_size: Option<i64>,
    media_asset_count: Option<i64>,
    months_free: Option<i64>,
    no_fee: Option<bool>,
    net_effective_price: Option<i64>,
    off_market_at: Option<String>,
    #[serde(default)]
    photos: Vec<NodeMediaKey>,
    price: Option<i64>,
    price_changed_at: Option<String>,
    price_delta: Option<i64>,
    source_group_label: Option<String>,
    source_type: Option<String>,
    state: Option<String>,
    status: Option<String>,
    street: Option<String>,
    unit: Option<String>,
    upcoming_open_house: Option<NodeOpenHouse>,
    url_path: Option<String>,
    zip_code: Option<String>,
}

#[derive(Debug, Deserialize)]
struct NodeGeoPoint {
    latitude: f64,
    longitude: f64,
}

#[derive(Debug, Deserialize)]
struct NodeLeadMedia {
    photo: Option<NodeMediaKey>,
}

#[derive(Debug, Deserialize)]
struct NodeMediaKey {
    key: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct NodeOpenHouse {
    start_time: Option<String>,
    end_time: Option<String>,
    appointment_only: Option<bool>,
}

impl From<RentalNode> for Listing {
    fn from(node: RentalNode) -> Self {
        Listing {
            id: node.id,
            area_name: node.area_name,
            available_at: node.available_at,
            bedroom_count: node.bedroom_count,
            building_type: node.building_type,
            full_bathroom_count: node.full_bathroom_count,
            half_bathroom_count: node.half_bathroom_count,
            furnished: node.furnished,
            geo_point: node.geo_point.map(|g| GeoPoint {
                latitude: g.latitude,
                longitude: g.longitude,
            }),
            has_tour_3d: node.has_tour3d,
            has_videos: node.has_videos,
            is_new_development: node.is_new_development,
            lead_media: node.lead_media.map(|m| LeadMedia {
                photo: m.photo.map(|p| MediaKey { key: p.key }),
            }),
            lease_term: node.lease_term,
            living_area_size: node.living_area_size,
            media_asset_count: node.media_asset_count,
            months_free: node.months_free,
            no_fee: node.no_fee,
            net_effective_price: node.net_effective_price,
            off_market_at: node.off_market_at,
            photos: node
                .photos
                .into_iter()
                .map(|p| MediaKey { key: p.key })
                .collect(),
            price: node.price,
            price_changed_at: node.price_changed_at,
            price_delta: node.price_delta,
            source_group_label: node.source_group_label,
            source_type: node.source_type,
            state: node.state,
            status: node.status,
            street: node.street,
            unit: node.unit,
            upcoming_open_house: node.upcoming_open_house.map(|o| OpenHouse {
                start_time: o.start_time,
                end_time: o.end_time,
                appointment_only: o.appointment_only,
            }),
            url_path: node.url_path,
            zip_code: node.zip_code,
        }
    }
}

/// Primary strategy: the structured rental search API, sorted newest-first.
pub struct GraphqlSearchStrategy {
    client: reqwest::Client,
    endpoint: String,
}

impl GraphqlSearchStrategy {
    pub fn new(client: reqwest::Client, endpoint: impl Into<String>) -> Self {
        Self {
            client,
            endpoint: endpoint.into(),
        }
    }

    fn payload(per_page: usize) -> JsonValue {
        json!({
            "query": SEARCH_RENTALS_QUERY,
            "variables": {
                "input": {
                    "filters": {
                        "rentalStatus": "ACTIVE",
                        "areas": [1]
                    },
                    "page": 1,
                    "perPage": per_page,
                    "sorting": {
                        "attribute": "LISTED_AT",
                        "direction": "DESCENDING"
                    },
                    "adStrategy": "NONE"
                }
            }
        })
    }

    fn parse(body: &str) -> Result<Vec<Listing>, SourceError> {
        let envelope: GraphqlEnvelope =
            serde_json::from_str(body).map_err(|err| SourceError::Payload {
                strategy: "graphql-search",
                detail: err.to_string(),
            })?;
        let rentals = envelope
            .data
            .and_then(|d| d.search_rentals)
            .unwrap_or_default();
        Ok(rentals
            .edges
            .into_iter()
            .map(|edge| Listing::from(edge.node))
            .collect())
    }
}

#[async_trait]
impl FetchStrategy for GraphqlSearchStrategy {
    fn name(&self) -> &'static str {
        "graphql-search"
    }

    async fn fetch(&self, per_page: usize) -> Result<Vec<Listing>, SourceError> {
        let response = self
            .client
            .post(&self.endpoint)
            .header("accept", "application/json")
            .json(&Self::payload(per_page))
            .send()
            .await
            .and_then(|r| r.error_for_status())
            .map_err(|source| SourceError::Transport {
                url: self.endpoint.clone(),
                source,
            })?;
        let body = response.text().await.map_err(|source| SourceError::Transport {
            url: self.endpoint.clone(),
            source,
        })?;
        Self::parse(&body)
    }
}

/// Fallback strategy: scrape the public search results page. Yields a
/// sparser record than the API (no media or open-house data), which is fine;
/// absent fields stay unset.
pub struct HtmlSearchStrategy {
    client: reqwest::Client,
    page_url: String,
}

impl HtmlSearchStrategy {
    pub fn new(client: reqwest::Client, page_url: impl Into<String>) -> Self {
        Self {
            client,
            page_url: page_url.into(),
        }
    }

    fn parse(body: &str, per_page: usize) -> Result<Vec<Listing>, SourceError> {
        let document = Html::parse_document(body);
        let card_sel = selector("article.listingCard")?;
        let link_sel = selector("a.listingCard-globalLink")?;
        let price_sel = selector(".listingCard-priceBlock .price")?;
        let area_sel = selector(".listingCard-upperShortInfo a")?;
        let details_sel = selector(".listingCard-keyDetails span")?;

        let mut listings = Vec::new();
        for card in document.select(&card_sel).take(per_page) {
            let Some(id) = card
                .value()
                .attr("data-listing-id")
                .map(str::to_string)
            else {
                continue;
            };

            let mut listing = Listing::new(id);
            listing.url_path = card
                .select(&link_sel)
                .next()
                .and_then(|a| a.value().attr("href"))
                .map(|href| href.trim_start_matches(LISTING_URL_BASE).to_string());
            listing.price = card
                .select(&price_sel)
                .next()
                .and_then(|n| parse_price(&n.text().collect::<String>()));
            listing.area_name = card
                .select(&area_sel)
                .next()
                .map(|n| n.text().collect::<String>())
                .map(|text| strip_area_prefix(text.trim()).to_string());

            for detail in card.select(&details_sel) {
                let text = detail.text().collect::<String>();
                let text = text.trim();
                if let Some(beds) = parse_bed_count(text) {
                    listing.bedroom_count = Some(beds);
                } else if let Some((full, half)) = parse_bath_counts(text) {
                    listing.full_bathroom_count = Some(full);
                    listing.half_bathroom_count = Some(half);
                }
            }

            listings.push(listing);
        }
        Ok(listings)
    }
}

fn selector(css: &str) -> Result<Selector, SourceError> {
    Selector::parse(css).map_err(|err| SourceError::Payload {
        strategy: "html-search",
        detail: err.to_string(),
    })
}

/// "$2,600/month" -> 2600
fn parse_price(text: &str) -> Option<i64> {
    let digits: String = text.chars().filter(|c| c.is_ascii_digit()).collect();
    if digits.is_empty() {
        None
    } else {
        digits.parse().ok()
    }
}

/// The card header reads "Rental Unit in Soho"; keep only the area name.
fn strip_area_prefix(text: &str) -> &str {
    text.rsplit_once(" in ").map_or(text, |(_, area)| area.trim())
}

fn parse_bed_count(text: &str) -> Option<i64> {
    if text.eq_ignore_ascii_case("studio") {
        return Some(0);
    }
    let rest = text.strip_suffix("Beds").or_else(|| text.strip_suffix("Bed"))?;
    rest.trim().parse().ok()
}

/// "1.5 Baths" -> (1 full, 1 half); "2 Baths" -> (2 full, 0 half).
fn parse_bath_counts(text: &str) -> Option<(i64, i64)> {
    let rest = text
        .strip_suffix("Baths")
        .or_else(|| text.strip_suffix("Bath"))?;
    let value: f64 = rest.trim().parse().ok()?;
    let full = value.floor() as i64;
    let half = if (value - value.floor()).abs() > f64::EPSILON {
        1
    } else {
        0
    };
    Some((full, half))
}

#[async_trait]
impl FetchStrategy for HtmlSearchStrategy {
    fn name(&self) -> &'static str {
        "html-search"
    }

    async fn fetch(&self, per_page: usize) -> Result<Vec<Listing>, SourceError> {
        let response = self
            .client
            .get(&self.page_url)
            .send()
            .await
            .and_then(|r| r.error_for_status())
            .map_err(|source| SourceError::Transport {
                url: self.page_url.clone(),
                source,
            })?;
        let body = response.text().await.map_err(|source| SourceError::Transport {
            url: self.page_url.clone(),
            source,
        })?;
        Self::parse(&body, per_page)
    }
}

/// Canned strategy for wiring tests: returns a fixed batch or always fails.
pub struct ScriptedStrategy {
    name: &'static str,
    listings: Option<Vec<Listing>>,
}

impl ScriptedStrategy {
    pub fn ok(name: &'static str, listings: Vec<Listing>) -> Self {
        Self {
            name,
            listings: Some(listings),
        }
    }

    pub fn failing(name: &'static str) -> Self {
        Self {
            name,
            listings: None,
        }
    }
}

#[async_trait]
impl FetchStrategy for ScriptedStrategy {
    fn name(&self) -> &'static str {
        self.name
    }

    async fn fetch(&self, _per_page: usize) -> Result<Vec<Listing>, SourceError> {
        match &self.listings {
            Some(listings) => Ok(listings.clone()),
            None => Err(SourceError::Payload {
                strategy: self.name,
                detail: "scripted failure".into(),
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
    use std::sync::Arc;

    fn listing(id: &str, area: &str, price: i64) -> Listing {
        let mut listing = Listing::new(id);
        listing.area_name = Some(area.into());
        listing.price = Some(price);
        listing.bedroom_count = Some(1);
        listing
    }

    #[tokio::test]
    async fn gateway_returns_first_successful_strategy() {
        let gateway = ListingSourceGateway::new(vec![
            Box::new(ScriptedStrategy::failing("primary")),
            Box::new(ScriptedStrategy::ok(
                "fallback",
                vec![listing("A", "Soho", 2500)],
            )),
        ]);
        let batch = gateway.fetch(25).await.unwrap();
        assert_eq!(batch.len(), 1);
        assert_eq!(batch[0].id, "A");
    }

    #[tokio::test]
    async fn gateway_surfaces_unavailable_when_all_strategies_fail() {
        let gateway = ListingSourceGateway::new(vec![
            Box::new(ScriptedStrategy::failing("primary")),
            Box::new(ScriptedStrategy::failing("fallback")),
        ]);
        let err = gateway.fetch(25).await.unwrap_err();
        assert!(matches!(err, SourceError::Unavailable { .. }));
    }

    #[tokio::test]
    async fn empty_batch_is_success_not_fallthrough() {
        let gateway = ListingSourceGateway::new(vec![
            Box::new(ScriptedStrategy::ok("primary", Vec::new())),
            Box::new(ScriptedStrategy::ok(
                "fallback",
                vec![listing("A", "Soho", 2500)],
            )),
        ]);
        assert!(gateway.fetch(25).await.unwrap().is_empty());
    }

    struct RecordingPublisher {
        published: Arc<AtomicUsize>,
        fail: AtomicBool,
    }

    #[async_trait]
    impl PreviewPublisher for RecordingPublisher {
        async fn publish(&self, _preview: &JsonValue) -> anyhow::Result<()> {
            if self.fail.load(Ordering::SeqCst) {
                anyhow::bail!("blob cache down");
            }
            self.published.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }
    }

    #[tokio::test]
    async fn preview_publish_failure_does_not_fail_fetch() {
        let published = Arc::new(AtomicUsize::new(0));
        let gateway = ListingSourceGateway::new(vec![Box::new(ScriptedStrategy::ok(
            "primary",
            vec![listing("A", "Soho", 2500)],
        ))])
        .with_preview(Box::new(RecordingPublisher {
            published: published.clone(),
            fail: AtomicBool::new(true),
        }));

        assert_eq!(gateway.fetch(25).await.unwrap().len(), 1);
        assert_eq!(published.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn preview_projection_flattens_first_five() {
        let listings: Vec<Listing> = (0..7)
            .map(|i| listing(&format!("L{i}"), "Soho", 2000 + i))
            .collect();
        let now = Utc.with_ymd_and_hms(2026, 8, 30, 16, 30, 0).single().unwrap();
        let preview = preview_projection(&listings, now);

        assert!(preview.get("topLine0").is_some());
        assert!(preview.get("topLine4").is_some());
        assert!(preview.get("topLine5").is_none());
        let message = preview.get("message").unwrap().as_str().unwrap();
        assert!(message.starts_with("Most recent listings as of "));
        assert!(message.ends_with(" ET"));
        assert_eq!(
            preview.get("topLine0").unwrap().as_str().unwrap(),
            "$2,000 | Fee Likely | Soho"
        );
    }

    #[test]
    fn graphql_parse_maps_nodes_and_tolerates_missing_fields() {
        let body = r#"{
            "data": {
                "searchRentals": {
                    "totalCount": 2,
                    "edges": [
                        {
                            "node": {
                                "id": "4507289",
                                "areaName": "Soho",
                                "bedroomCount": 1,
                                "fullBathroomCount": 1,
                                "halfBathroomCount": 1,
                                "noFee": true,
                                "price": 2600,
                                "geoPoint": {"latitude": 40.72, "longitude": -74.0},
                                "leadMedia": {"photo": {"key": "abc"}},
                                "photos": [{"key": "p1"}, {"key": "p2"}],
                                "urlPath": "/building/x/1a"
                            }
                        },
                        {"node": {"id": "4507290"}}
                    ]
                }
            }
        }"#;
        let listings = GraphqlSearchStrategy::parse(body).unwrap();
        assert_eq!(listings.len(), 2);
        assert_eq!(listings[0].id, "4507289");
        assert_eq!(listings[0].area_name.as_deref(), Some("Soho"));
        assert_eq!(listings[0].photos.len(), 2);
        assert_eq!(listings[1].price, None);
        assert_eq!(
            lead_photo_url(&listings[0]).as_deref(),
            Some("https://photos.zillowstatic.com/fp/abc-se_large_800_400.webp")
        );
    }

    #[test]
    fn graphql_parse_rejects_garbage() {
        assert!(matches!(
            GraphqlSearchStrategy::parse("not json"),
            Err(SourceError::Payload { .. })
        ));
    }

    #[test]
    fn html_parse_extracts_cards() {
        let body = r#"
        <html><body>
          <article class="listingCard" data-listing-id="111">
            <a class="listingCard-globalLink" href="https://streeteasy.com/building/a/1"></a>
            <div class="listingCard-upperShortInfo"><a>Rental Unit in Gramercy Park</a></div>
            <div class="listingCard-priceBlock"><span class="price">$3,450</span></div>
            <div class="listingCard-keyDetails"><span>2 Beds</span><span>1.5 Baths</span></div>
          </article>
          <article class="listingCard" data-listing-id="222">
            <div class="listingCard-keyDetails"><span>Studio</span><span>1 Bath</span></div>
          </article>
        </body></html>"#;

        let listings = HtmlSearchStrategy::parse(body, 25).unwrap();
        assert_eq!(listings.len(), 2);
        assert_eq!(listings[0].id, "111");
        assert_eq!(listings[0].price, Some(3450));
        assert_eq!(listings[0].area_name.as_deref(), Some("Gramercy Park"));
        assert_eq!(listings[0].bedroom_count, Some(2));
        assert_eq!(listings[0].full_bathroom_count, Some(1));
        assert_eq!(listings[0].half_bathroom_count, Some(1));
        assert_eq!(listings[0].url_path.as_deref(), Some("/building/a/1"));
        assert_eq!(listings[1].bedroom_count, Some(0));
        assert_eq!(listings[1].half_bathroom_count, Some(0));
    }
}

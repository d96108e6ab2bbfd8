//! Core domain model and criteria evaluation for FirstMover.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

pub const CRATE_NAME: &str = "fm-core";

/// Latitude/longitude pair as reported by the upstream search API.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeoPoint {
    pub latitude: f64,
    pub longitude: f64,
}

/// Reference to a hosted photo asset.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MediaKey {
    pub key: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct LeadMedia {
    pub photo: Option<MediaKey>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct OpenHouse {
    pub start_time: Option<String>,
    pub end_time: Option<String>,
    pub appointment_only: Option<bool>,
}

/// One rental-unit snapshot at fetch time.
///
/// `id` is the opaque upstream identifier and is stable across fetches while
/// the unit stays listed. Every other attribute is optional; the upstream
/// search API omits fields freely and absence must never be an error here.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Listing {
    pub id: String,
    pub area_name: Option<String>,
    pub available_at: Option<String>,
    pub bedroom_count: Option<i64>,
    pub building_type: Option<String>,
    pub full_bathroom_count: Option<i64>,
    pub half_bathroom_count: Option<i64>,
    pub furnished: Option<bool>,
    pub geo_point: Option<GeoPoint>,
    pub has_tour_3d: Option<bool>,
    pub has_videos: Option<bool>,
    pub is_new_development: Option<bool>,
    pub lead_media: Option<LeadMedia>,
    pub lease_term: Option<i64>,
    pub living_area_size: Option<i64>,
    pub media_asset_count: Option<i64>,
    pub months_free: Option<i64>,
    pub no_fee: Option<bool>,
    pub net_effective_price: Option<i64>,
    pub off_market_at: Option<String>,
    #[serde(default)]
    pub photos: Vec<MediaKey>,
    pub price: Option<i64>,
    pub price_changed_at: Option<String>,
    pub price_delta: Option<i64>,
    pub source_group_label: Option<String>,
    pub source_type: Option<String>,
    pub state: Option<String>,
    pub status: Option<String>,
    pub street: Option<String>,
    pub unit: Option<String>,
    pub upcoming_open_house: Option<OpenHouse>,
    pub url_path: Option<String>,
    pub zip_code: Option<String>,
}

impl Listing {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            area_name: None,
            available_at: None,
            bedroom_count: None,
            building_type: None,
            full_bathroom_count: None,
            half_bathroom_count: None,
            furnished: None,
            geo_point: None,
            has_tour_3d: None,
            has_videos: None,
            is_new_development: None,
            lead_media: None,
            lease_term: None,
            living_area_size: None,
            media_asset_count: None,
            months_free: None,
            no_fee: None,
            net_effective_price: None,
            off_market_at: None,
            photos: Vec::new(),
            price: None,
            price_changed_at: None,
            price_delta: None,
            source_group_label: None,
            source_type: None,
            state: None,
            status: None,
            street: None,
            unit: None,
            upcoming_open_house: None,
            url_path: None,
            zip_code: None,
        }
    }
}

/// Normalized persisted shape: nested fields flattened to scalar columns,
/// photo keys joined into one comma-delimited string.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ListingRow {
    pub id: String,
    pub area_name: Option<String>,
    pub available_at: Option<String>,
    pub bedroom_count: Option<i64>,
    pub building_type: Option<String>,
    pub full_bathroom_count: Option<i64>,
    pub half_bathroom_count: Option<i64>,
    pub furnished: Option<bool>,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub has_tour_3d: Option<bool>,
    pub has_videos: Option<bool>,
    pub is_new_development: Option<bool>,
    pub lead_media_photo: Option<String>,
    pub lease_term: Option<i64>,
    pub living_area_size: Option<i64>,
    pub media_asset_count: Option<i64>,
    pub months_free: Option<i64>,
    pub no_fee: Option<bool>,
    pub net_effective_price: Option<i64>,
    pub off_market_at: Option<String>,
    pub photos: String,
    pub price: Option<i64>,
    pub price_changed_at: Option<String>,
    pub price_delta: Option<i64>,
    pub source_group_label: Option<String>,
    pub source_type: Option<String>,
    pub state: Option<String>,
    pub status: Option<String>,
    pub street: Option<String>,
    pub unit: Option<String>,
    pub upcoming_open_house_start: Option<String>,
    pub upcoming_open_house_end: Option<String>,
    pub upcoming_open_house_appointment_only: Option<bool>,
    pub url_path: Option<String>,
    pub zip_code: Option<String>,
}

impl From<&Listing> for ListingRow {
    fn from(listing: &Listing) -> Self {
        let open_house = listing.upcoming_open_house.clone().unwrap_or_default();
        Self {
            id: listing.id.clone(),
            area_name: listing.area_name.clone(),
            available_at: listing.available_at.clone(),
            bedroom_count: listing.bedroom_count,
            building_type: listing.building_type.clone(),
            full_bathroom_count: listing.full_bathroom_count,
            half_bathroom_count: listing.half_bathroom_count,
            furnished: listing.furnished,
            latitude: listing.geo_point.map(|g| g.latitude),
            longitude: listing.geo_point.map(|g| g.longitude),
            has_tour_3d: listing.has_tour_3d,
            has_videos: listing.has_videos,
            is_new_development: listing.is_new_development,
            lead_media_photo: listing
                .lead_media
                .as_ref()
                .and_then(|m| m.photo.as_ref())
                .map(|p| p.key.clone()),
            lease_term: listing.lease_term,
            living_area_size: listing.living_area_size,
            media_asset_count: listing.media_asset_count,
            months_free: listing.months_free,
            no_fee: listing.no_fee,
            net_effective_price: listing.net_effective_price,
            off_market_at: listing.off_market_at.clone(),
            photos: listing
                .photos
                .iter()
                .map(|p| p.key.as_str())
                .collect::<Vec<_>>()
                .join(","),
            price: listing.price,
            price_changed_at: listing.price_changed_at.clone(),
            price_delta: listing.price_delta,
            source_group_label: listing.source_group_label.clone(),
            source_type: listing.source_type.clone(),
            state: listing.state.clone(),
            status: listing.status.clone(),
            street: listing.street.clone(),
            unit: listing.unit.clone(),
            upcoming_open_house_start: open_house.start_time,
            upcoming_open_house_end: open_house.end_time,
            upcoming_open_house_appointment_only: open_house.appointment_only,
            url_path: listing.url_path.clone(),
            zip_code: listing.zip_code.clone(),
        }
    }
}

/// Inclusive range check where a missing listing value behaves as +infinity:
/// it satisfies any minimum but fails every finite maximum.
fn within_bounds(value: Option<i64>, min: Option<i64>, max: Option<i64>) -> bool {
    match value {
        Some(v) => min.map_or(true, |lo| v >= lo) && max.map_or(true, |hi| v <= hi),
        None => max.is_none(),
    }
}

/// A named saved search. Bounds are inclusive; `None` means open-ended.
/// Area names are matched exactly (the source pre-normalizes them).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchCriteria {
    pub name: String,
    pub areas: Vec<String>,
    #[serde(default)]
    pub min_price: Option<i64>,
    #[serde(default)]
    pub max_price: Option<i64>,
    #[serde(default)]
    pub min_bedrooms: Option<i64>,
    #[serde(default)]
    pub max_bedrooms: Option<i64>,
    /// Broadcast destination for match announcements.
    pub chat_id: String,
}

impl SearchCriteria {
    /// Strict conjunction over area membership, price bounds, and bedroom
    /// bounds. Pure; no I/O.
    pub fn matches(&self, listing: &Listing) -> bool {
        let area_ok = listing
            .area_name
            .as_deref()
            .map_or(false, |area| self.areas.iter().any(|a| a == area));
        area_ok
            && within_bounds(listing.price, self.min_price, self.max_price)
            && within_bounds(listing.bedroom_count, self.min_bedrooms, self.max_bedrooms)
    }
}

/// Parameterized evaluator form for dynamically supplied subscriber filters.
/// Same bound dimensions as [`SearchCriteria`] plus a fee-tolerance conjunct.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SubscriberCriteria {
    pub areas: Vec<String>,
    #[serde(default)]
    pub min_price: Option<i64>,
    #[serde(default)]
    pub max_price: Option<i64>,
    #[serde(default)]
    pub min_bedrooms: Option<i64>,
    #[serde(default)]
    pub max_bedrooms: Option<i64>,
    /// When set, the listing's fee status must agree exactly: `true` only
    /// accepts no-fee listings, `false` only fee-likely ones. A listing with
    /// no fee flag counts as fee-likely.
    #[serde(default)]
    pub no_fee_required: Option<bool>,
}

impl SubscriberCriteria {
    pub fn matches(&self, listing: &Listing) -> bool {
        let area_ok = listing
            .area_name
            .as_deref()
            .map_or(false, |area| self.areas.iter().any(|a| a == area));
        let fee_ok = self
            .no_fee_required
            .map_or(true, |required| listing.no_fee.unwrap_or(false) == required);
        area_ok
            && fee_ok
            && within_bounds(listing.price, self.min_price, self.max_price)
            && within_bounds(listing.bedroom_count, self.min_bedrooms, self.max_bedrooms)
    }
}

fn thousands(value: i64) -> String {
    let digits = value.unsigned_abs().to_string();
    let mut grouped = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(ch);
    }
    if value < 0 {
        format!("-{grouped}")
    } else {
        grouped
    }
}

/// "$2,600", or "Price not available" when the source omitted the price.
pub fn price_display(price: Option<i64>) -> String {
    match price {
        Some(p) => format!("${}", thousands(p)),
        None => "Price not available".to_string(),
    }
}

pub fn fee_display(no_fee: Option<bool>) -> &'static str {
    if no_fee.unwrap_or(false) {
        "No Fee"
    } else {
        "Fee Likely"
    }
}

/// "Studio" for zero (or unreported) bedrooms, otherwise "N Bed".
pub fn bed_display(bedroom_count: Option<i64>) -> String {
    match bedroom_count.unwrap_or(0) {
        0 => "Studio".to_string(),
        n => format!("{n} Bed"),
    }
}

/// Full plus half bathroom counts merged into one number.
pub fn bathroom_total(full: Option<i64>, half: Option<i64>) -> f64 {
    full.unwrap_or(0) as f64 + half.unwrap_or(0) as f64 * 0.5
}

/// Bathrooms shown as an integer when the fractional part is exactly zero,
/// otherwise with one decimal: 1 full + 1 half -> "1.5 Bath".
pub fn bath_display(full: Option<i64>, half: Option<i64>) -> String {
    let total = bathroom_total(full, half);
    if total.fract() == 0.0 {
        format!("{} Bath", total as i64)
    } else {
        format!("{total:.1} Bath")
    }
}

/// A subscriber whose saved search matched a listing, with push delivery
/// addresses, as returned by the subscriber matching source.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Subscriber {
    pub id: Uuid,
    pub push_tokens: Vec<String>,
}

/// Insert-only audit record for a dispatched match.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MatchRecord {
    pub subscriber_id: Uuid,
    pub listing_id: String,
    pub created_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn soho_listing() -> Listing {
        let mut listing = Listing::new("L1");
        listing.area_name = Some("Soho".into());
        listing.price = Some(2600);
        listing.bedroom_count = Some(1);
        listing
    }

    fn vin_criteria() -> SearchCriteria {
        SearchCriteria {
            name: "vin".into(),
            areas: vec!["Soho".into(), "Tribeca".into()],
            min_price: Some(0),
            max_price: Some(2700),
            min_bedrooms: Some(0),
            max_bedrooms: Some(1),
            chat_id: "-100".into(),
        }
    }

    #[test]
    fn conjunction_all_dimensions_hold() {
        assert!(vin_criteria().matches(&soho_listing()));
    }

    #[test]
    fn price_above_max_fails() {
        let mut listing = soho_listing();
        listing.price = Some(2800);
        assert!(!vin_criteria().matches(&listing));
    }

    #[test]
    fn area_outside_set_fails() {
        let mut listing = soho_listing();
        listing.area_name = Some("Williamsburg".into());
        assert!(!vin_criteria().matches(&listing));
    }

    #[test]
    fn missing_price_fails_bounded_max_but_passes_open_max() {
        let mut listing = soho_listing();
        listing.price = None;
        assert!(!vin_criteria().matches(&listing));

        let mut open = vin_criteria();
        open.max_price = None;
        assert!(open.matches(&listing));
    }

    #[test]
    fn missing_bedrooms_fails_bounded_max() {
        let mut listing = soho_listing();
        listing.bedroom_count = None;
        assert!(!vin_criteria().matches(&listing));
    }

    #[test]
    fn missing_area_never_matches() {
        let mut listing = soho_listing();
        listing.area_name = None;
        assert!(!vin_criteria().matches(&listing));
    }

    #[test]
    fn subscriber_fee_tolerance_is_exact_agreement() {
        let mut criteria = SubscriberCriteria {
            areas: vec!["Soho".into()],
            min_price: None,
            max_price: None,
            min_bedrooms: None,
            max_bedrooms: None,
            no_fee_required: Some(true),
        };
        let mut listing = soho_listing();

        listing.no_fee = Some(true);
        assert!(criteria.matches(&listing));
        listing.no_fee = Some(false);
        assert!(!criteria.matches(&listing));
        // an unset fee flag counts as fee-likely
        listing.no_fee = None;
        assert!(!criteria.matches(&listing));

        criteria.no_fee_required = Some(false);
        assert!(criteria.matches(&listing));
        criteria.no_fee_required = None;
        assert!(criteria.matches(&listing));
    }

    #[test]
    fn price_display_groups_thousands() {
        assert_eq!(price_display(Some(2600)), "$2,600");
        assert_eq!(price_display(Some(950)), "$950");
        assert_eq!(price_display(Some(1250000)), "$1,250,000");
        assert_eq!(price_display(None), "Price not available");
    }

    #[test]
    fn price_display_is_total_over_the_whole_range() {
        assert_eq!(price_display(Some(-2600)), "$-2,600");
        assert_eq!(price_display(Some(i64::MIN)), "$-9,223,372,036,854,775,808");
        assert_eq!(price_display(Some(i64::MAX)), "$9,223,372,036,854,775,807");
    }

    #[test]
    fn bed_bath_display_rules() {
        assert_eq!(bed_display(Some(0)), "Studio");
        assert_eq!(bed_display(None), "Studio");
        assert_eq!(bed_display(Some(2)), "2 Bed");
        assert_eq!(bath_display(Some(1), Some(0)), "1 Bath");
        assert_eq!(bath_display(Some(1), Some(1)), "1.5 Bath");
        assert_eq!(bath_display(Some(2), None), "2 Bath");
        assert_eq!(bath_display(None, Some(1)), "0.5 Bath");
    }

    #[test]
    fn normalization_flattens_nested_fields() {
        let mut listing = soho_listing();
        listing.geo_point = Some(GeoPoint {
            latitude: 40.72,
            longitude: -74.0,
        });
        listing.lead_media = Some(LeadMedia {
            photo: Some(MediaKey { key: "abc123".into() }),
        });
        listing.photos = vec![
            MediaKey { key: "p1".into() },
            MediaKey { key: "p2".into() },
        ];
        listing.upcoming_open_house = Some(OpenHouse {
            start_time: Some("2026-09-01T17:00:00Z".into()),
            end_time: Some("2026-09-01T18:00:00Z".into()),
            appointment_only: Some(false),
        });

        let row = ListingRow::from(&listing);
        assert_eq!(row.id, "L1");
        assert_eq!(row.latitude, Some(40.72));
        assert_eq!(row.longitude, Some(-74.0));
        assert_eq!(row.lead_media_photo.as_deref(), Some("abc123"));
        assert_eq!(row.photos, "p1,p2");
        assert_eq!(
            row.upcoming_open_house_start.as_deref(),
            Some("2026-09-01T17:00:00Z")
        );
        assert_eq!(row.upcoming_open_house_appointment_only, Some(false));
    }

    #[test]
    fn normalization_defaults_absent_optionals() {
        let row = ListingRow::from(&Listing::new("L2"));
        assert_eq!(row.latitude, None);
        assert_eq!(row.lead_media_photo, None);
        assert_eq!(row.photos, "");
        assert_eq!(row.upcoming_open_house_start, None);
    }
}

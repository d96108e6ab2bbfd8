//! External-service clients for FirstMover: the dedup ledger (Redis), the
//! persisted listing store (Postgres), and the subscriber matching source.
//!
//! Every collaborator sits behind a narrow trait so the pipeline takes
//! constructed handles instead of reaching for globals, and so tests can
//! inject the in-memory implementations published here.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use fm_core::{bathroom_total, Listing, ListingRow, MatchRecord, Subscriber, SubscriberCriteria};
use redis::AsyncCommands;
use sqlx::postgres::PgPool;
use sqlx::Row;
use thiserror::Error;
use tokio::time::timeout;
use uuid::Uuid;

pub const CRATE_NAME: &str = "fm-storage";

#[derive(Debug, Error)]
pub enum LedgerError {
    #[error("redis command failed: {0}")]
    Redis(#[from] redis::RedisError),
    #[error("ledger command timed out after {0:?}")]
    Timeout(Duration),
    #[error("ledger unavailable: {0}")]
    Unavailable(String),
}

#[derive(Debug, Error)]
pub enum StoreError {
    #[error(transparent)]
    Database(#[from] sqlx::Error),
    #[error("store unavailable: {0}")]
    Unavailable(String),
}

/// The dedup ledger: the stored snapshot of listing ids already processed as
/// of the last successful run.
///
/// `commit` replaces the stored list wholesale; the ledger is a sliding
/// snapshot of the latest fetch, not a permanent history. An id that leaves
/// the upstream recency window and later reappears will be treated as new
/// again (known limitation).
#[async_trait]
pub trait LedgerClient: Send + Sync {
    /// Ordered id list from the last committed run; empty if never committed.
    async fn previous_ids(&self) -> Result<Vec<String>, LedgerError>;

    /// Atomically replace the stored id list.
    async fn commit(&self, latest_ids: &[String]) -> Result<(), LedgerError>;
}

/// Batch upsert of normalized listing rows plus insert-only match audit
/// records. Upsert key is the listing id; re-upserting overwrites the row.
#[async_trait]
pub trait ListingStore: Send + Sync {
    async fn upsert_listings(&self, rows: &[ListingRow]) -> Result<(), StoreError>;

    async fn record_matches(&self, records: &[MatchRecord]) -> Result<(), StoreError>;
}

/// External query resolving which subscribers' saved searches match a
/// listing. The result contract (subscriber ids plus push delivery tokens)
/// is what the notification dispatcher consumes.
#[async_trait]
pub trait SubscriberMatcher: Send + Sync {
    async fn matching_subscribers(&self, listing: &Listing) -> Result<Vec<Subscriber>, StoreError>;
}

#[async_trait]
impl<T: LedgerClient + ?Sized> LedgerClient for std::sync::Arc<T> {
    async fn previous_ids(&self) -> Result<Vec<String>, LedgerError> {
        (**self).previous_ids().await
    }

    async fn commit(&self, latest_ids: &[String]) -> Result<(), LedgerError> {
        (**self).commit(latest_ids).await
    }
}

#[async_trait]
impl<T: ListingStore + ?Sized> ListingStore for std::sync::Arc<T> {
    async fn upsert_listings(&self, rows: &[ListingRow]) -> Result<(), StoreError> {
        (**self).upsert_listings(rows).await
    }

    async fn record_matches(&self, records: &[MatchRecord]) -> Result<(), StoreError> {
        (**self).record_matches(records).await
    }
}

#[async_trait]
impl<T: SubscriberMatcher + ?Sized> SubscriberMatcher for std::sync::Arc<T> {
    async fn matching_subscribers(&self, listing: &Listing) -> Result<Vec<Subscriber>, StoreError> {
        (**self).matching_subscribers(listing).await
    }
}

pub fn join_ids(ids: &[String]) -> String {
    ids.join(",")
}

pub fn split_ids(raw: &str) -> Vec<String> {
    raw.split(',')
        .filter(|part| !part.is_empty())
        .map(str::to_string)
        .collect()
}

/// Redis-backed ledger: one string-keyed slot holding the comma-joined id
/// list, accessed with GET/SET only. Each command is bounded by a timeout.
pub struct RedisLedger {
    client: redis::Client,
    key: String,
    command_timeout: Duration,
}

impl RedisLedger {
    pub fn new(
        redis_url: &str,
        key: impl Into<String>,
        command_timeout: Duration,
    ) -> Result<Self, LedgerError> {
        let client = redis::Client::open(redis_url)?;
        Ok(Self {
            client,
            key: key.into(),
            command_timeout,
        })
    }
}

#[async_trait]
impl LedgerClient for RedisLedger {
    async fn previous_ids(&self) -> Result<Vec<String>, LedgerError> {
        let mut conn = self.client.get_async_connection().await?;
        let raw: Option<String> = timeout(self.command_timeout, conn.get(&self.key))
            .await
            .map_err(|_| LedgerError::Timeout(self.command_timeout))??;
        Ok(raw.as_deref().map(split_ids).unwrap_or_default())
    }

    async fn commit(&self, latest_ids: &[String]) -> Result<(), LedgerError> {
        let mut conn = self.client.get_async_connection().await?;
        let joined = join_ids(latest_ids);
        timeout(self.command_timeout, conn.set::<_, _, ()>(&self.key, joined))
            .await
            .map_err(|_| LedgerError::Timeout(self.command_timeout))??;
        Ok(())
    }
}

const UPSERT_LISTING_SQL: &str = "\
INSERT INTO listings (\
 id, area_name, available_at, bedroom_count, building_type,\
 full_bathroom_count, half_bathroom_count, furnished, latitude, longitude,\
 has_tour_3d, has_videos, is_new_development, lead_media_photo, lease_term,\
 living_area_size, media_asset_count, months_free, no_fee, net_effective_price,\
 off_market_at, photos, price, price_changed_at, price_delta,\
 source_group_label, source_type, state, status, street, unit,\
 upcoming_open_house_start, upcoming_open_house_end,\
 upcoming_open_house_appointment_only, url_path, zip_code\
) VALUES (\
 $1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16, $17,\
 $18, $19, $20, $21, $22, $23, $24, $25, $26, $27, $28, $29, $30, $31, $32,\
 $33, $34, $35, $36\
) ON CONFLICT (id) DO UPDATE SET\
 area_name = EXCLUDED.area_name,\
 available_at = EXCLUDED.available_at,\
 bedroom_count = EXCLUDED.bedroom_count,\
 building_type = EXCLUDED.building_type,\
 full_bathroom_count = EXCLUDED.full_bathroom_count,\
 half_bathroom_count = EXCLUDED.half_bathroom_count,\
 furnished = EXCLUDED.furnished,\
 latitude = EXCLUDED.latitude,\
 longitude = EXCLUDED.longitude,\
 has_tour_3d = EXCLUDED.has_tour_3d,\
 has_videos = EXCLUDED.has_videos,\
 is_new_development = EXCLUDED.is_new_development,\
 lead_media_photo = EXCLUDED.lead_media_photo,\
 lease_term = EXCLUDED.lease_term,\
 living_area_size = EXCLUDED.living_area_size,\
 media_asset_count = EXCLUDED.media_asset_count,\
 months_free = EXCLUDED.months_free,\
 no_fee = EXCLUDED.no_fee,\
 net_effective_price = EXCLUDED.net_effective_price,\
 off_market_at = EXCLUDED.off_market_at,\
 photos = EXCLUDED.photos,\
 price = EXCLUDED.price,\
 price_changed_at = EXCLUDED.price_changed_at,\
 price_delta = EXCLUDED.price_delta,\
 source_group_label = EXCLUDED.source_group_label,\
 source_type = EXCLUDED.source_type,\
 state = EXCLUDED.state,\
 status = EXCLUDED.status,\
 street = EXCLUDED.street,\
 unit = EXCLUDED.unit,\
 upcoming_open_house_start = EXCLUDED.upcoming_open_house_start,\
 upcoming_open_house_end = EXCLUDED.upcoming_open_house_end,\
 upcoming_open_house_appointment_only = EXCLUDED.upcoming_open_house_appointment_only,\
 url_path = EXCLUDED.url_path,\
 zip_code = EXCLUDED.zip_code";

/// Postgres-backed listing store. The whole batch runs in one transaction so
/// a mid-batch failure leaves nothing behind for the ledger to skip.
pub struct PgListingStore {
    pool: PgPool,
}

impl PgListingStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl ListingStore for PgListingStore {
    async fn upsert_listings(&self, rows: &[ListingRow]) -> Result<(), StoreError> {
        let mut tx = self.pool.begin().await?;
        for row in rows {
            sqlx::query(UPSERT_LISTING_SQL)
                .bind(&row.id)
                .bind(&row.area_name)
                .bind(&row.available_at)
                .bind(row.bedroom_count)
                .bind(&row.building_type)
                .bind(row.full_bathroom_count)
                .bind(row.half_bathroom_count)
                .bind(row.furnished)
                .bind(row.latitude)
                .bind(row.longitude)
                .bind(row.has_tour_3d)
                .bind(row.has_videos)
                .bind(row.is_new_development)
                .bind(&row.lead_media_photo)
                .bind(row.lease_term)
                .bind(row.living_area_size)
                .bind(row.media_asset_count)
                .bind(row.months_free)
                .bind(row.no_fee)
                .bind(row.net_effective_price)
                .bind(&row.off_market_at)
                .bind(&row.photos)
                .bind(row.price)
                .bind(&row.price_changed_at)
                .bind(row.price_delta)
                .bind(&row.source_group_label)
                .bind(&row.source_type)
                .bind(&row.state)
                .bind(&row.status)
                .bind(&row.street)
                .bind(&row.unit)
                .bind(&row.upcoming_open_house_start)
                .bind(&row.upcoming_open_house_end)
                .bind(row.upcoming_open_house_appointment_only)
                .bind(&row.url_path)
                .bind(&row.zip_code)
                .execute(&mut *tx)
                .await?;
        }
        tx.commit().await?;
        Ok(())
    }

    async fn record_matches(&self, records: &[MatchRecord]) -> Result<(), StoreError> {
        let mut tx = self.pool.begin().await?;
        for record in records {
            sqlx::query(
                "INSERT INTO listing_matches (subscriber_id, listing_id, created_at) \
                 VALUES ($1, $2, $3)",
            )
            .bind(record.subscriber_id)
            .bind(&record.listing_id)
            .bind(record.created_at)
            .execute(&mut *tx)
            .await?;
        }
        tx.commit().await?;
        Ok(())
    }
}

/// Postgres-backed subscriber matching source. The heavy lifting lives in a
/// `match_subscribers` SQL function owned by the database, mirroring the
/// narrow query contract: listing attributes in, subscriber tokens out.
pub struct PgSubscriberMatcher {
    pool: PgPool,
}

impl PgSubscriberMatcher {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl SubscriberMatcher for PgSubscriberMatcher {
    async fn matching_subscribers(&self, listing: &Listing) -> Result<Vec<Subscriber>, StoreError> {
        let bathrooms = bathroom_total(listing.full_bathroom_count, listing.half_bathroom_count);
        let rows = sqlx::query(
            "SELECT subscriber_id, push_token \
             FROM match_subscribers($1, $2, $3, $4, $5)",
        )
        .bind(&listing.area_name)
        .bind(listing.bedroom_count)
        .bind(bathrooms)
        .bind(listing.price)
        .bind(listing.no_fee.unwrap_or(false))
        .fetch_all(&self.pool)
        .await?;

        let mut tokens_by_subscriber: BTreeMap<Uuid, Vec<String>> = BTreeMap::new();
        for row in rows {
            let id: Uuid = row.try_get("subscriber_id")?;
            let token: String = row.try_get("push_token")?;
            tokens_by_subscriber.entry(id).or_default().push(token);
        }

        Ok(tokens_by_subscriber
            .into_iter()
            .map(|(id, push_tokens)| Subscriber { id, push_tokens })
            .collect())
    }
}

/// In-memory ledger with failure toggles, for pipeline tests.
#[derive(Default)]
pub struct MemoryLedger {
    ids: Mutex<Vec<String>>,
    fail_reads: AtomicBool,
    fail_commits: AtomicBool,
    commits: AtomicBool,
}

impl MemoryLedger {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_ids(ids: &[&str]) -> Self {
        let ledger = Self::default();
        *ledger.ids.lock().unwrap() = ids.iter().map(|s| s.to_string()).collect();
        ledger
    }

    pub fn fail_reads(&self) {
        self.fail_reads.store(true, Ordering::SeqCst);
    }

    pub fn fail_commits(&self) {
        self.fail_commits.store(true, Ordering::SeqCst);
    }

    pub fn ids(&self) -> Vec<String> {
        self.ids.lock().unwrap().clone()
    }

    pub fn committed(&self) -> bool {
        self.commits.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl LedgerClient for MemoryLedger {
    async fn previous_ids(&self) -> Result<Vec<String>, LedgerError> {
        if self.fail_reads.load(Ordering::SeqCst) {
            return Err(LedgerError::Unavailable("simulated read failure".into()));
        }
        Ok(self.ids.lock().unwrap().clone())
    }

    async fn commit(&self, latest_ids: &[String]) -> Result<(), LedgerError> {
        if self.fail_commits.load(Ordering::SeqCst) {
            return Err(LedgerError::Unavailable("simulated commit failure".into()));
        }
        *self.ids.lock().unwrap() = latest_ids.to_vec();
        self.commits.store(true, Ordering::SeqCst);
        Ok(())
    }
}

/// In-memory listing store mirroring the upsert-by-id semantics.
#[derive(Default)]
pub struct MemoryListingStore {
    rows: Mutex<BTreeMap<String, ListingRow>>,
    matches: Mutex<Vec<MatchRecord>>,
    fail_upserts: AtomicBool,
    fail_match_inserts: AtomicBool,
}

impl MemoryListingStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn fail_upserts(&self) {
        self.fail_upserts.store(true, Ordering::SeqCst);
    }

    pub fn fail_match_inserts(&self) {
        self.fail_match_inserts.store(true, Ordering::SeqCst);
    }

    pub fn rows(&self) -> Vec<ListingRow> {
        self.rows.lock().unwrap().values().cloned().collect()
    }

    pub fn row(&self, id: &str) -> Option<ListingRow> {
        self.rows.lock().unwrap().get(id).cloned()
    }

    pub fn match_records(&self) -> Vec<MatchRecord> {
        self.matches.lock().unwrap().clone()
    }
}

#[async_trait]
impl ListingStore for MemoryListingStore {
    async fn upsert_listings(&self, rows: &[ListingRow]) -> Result<(), StoreError> {
        if self.fail_upserts.load(Ordering::SeqCst) {
            return Err(StoreError::Unavailable("simulated upsert failure".into()));
        }
        let mut map = self.rows.lock().unwrap();
        for row in rows {
            map.insert(row.id.clone(), row.clone());
        }
        Ok(())
    }

    async fn record_matches(&self, records: &[MatchRecord]) -> Result<(), StoreError> {
        if self.fail_match_inserts.load(Ordering::SeqCst) {
            return Err(StoreError::Unavailable(
                "simulated match insert failure".into(),
            ));
        }
        self.matches.lock().unwrap().extend_from_slice(records);
        Ok(())
    }
}

/// In-memory subscriber matching source seeded with parameterized criteria.
#[derive(Default)]
pub struct MemorySubscriberMatcher {
    entries: Mutex<Vec<(SubscriberCriteria, Subscriber)>>,
}

impl MemorySubscriberMatcher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&self, criteria: SubscriberCriteria, subscriber: Subscriber) {
        self.entries.lock().unwrap().push((criteria, subscriber));
    }
}

#[async_trait]
impl SubscriberMatcher for MemorySubscriberMatcher {
    async fn matching_subscribers(&self, listing: &Listing) -> Result<Vec<Subscriber>, StoreError> {
        Ok(self
            .entries
            .lock()
            .unwrap()
            .iter()
            .filter(|(criteria, _)| criteria.matches(listing))
            .map(|(_, subscriber)| subscriber.clone())
            .collect())
    }
}

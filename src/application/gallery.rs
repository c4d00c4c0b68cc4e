//! Daily gallery state: one resolved generation per calendar day.
//!
//! A generation bundles the resolved slot files for the day with the random
//! tokens minted for them. Generations are immutable and swapped wholesale,
//! so a request always observes tokens and files from the same day. The swap
//! happens at most once per day transition; an empty day (out-of-cycle date
//! or incomplete slot set) is re-resolved on every request so photos dropped
//! into the library mid-day show up without a restart.

use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, RwLock};
use std::time::Instant;

use base64::{Engine as _, engine::general_purpose::URL_SAFE_NO_PAD};
use chrono_tz::Tz;
use metrics::{counter, histogram};
use time::{Date, OffsetDateTime};
use tokio::sync::Mutex;
use tracing::{info, warn};
use uuid::Uuid;

use crate::application::catalog::PhotoCatalog;
use crate::domain::rotation::{
    ResolvedPhoto, RotationSchedule, SLOTS_PER_CATEGORY, SlotKey, select_slot_file, slot_keys,
};
use crate::util::timezone::localized_date;

const SOURCE: &str = "application::gallery";

const METRIC_ROTATION_REFRESH_TOTAL: &str = "scatto_rotation_refresh_total";
const METRIC_ROTATION_EMPTY_DAY_TOTAL: &str = "scatto_rotation_empty_day_total";
const METRIC_ROTATION_REFRESH_MS: &str = "scatto_rotation_refresh_ms";

/// One row of the daily listing, in slot order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GalleryEntry {
    pub slot: SlotKey,
    pub token: String,
    pub category: String,
    pub filename: String,
}

/// An immutable resolved day: the slot files and the tokens naming them.
///
/// `photos` and `tokens` are always built together. A day with an incomplete
/// slot set is stored with both maps empty.
#[derive(Debug)]
pub struct GalleryDay {
    date: Date,
    day_index: Option<u32>,
    photos: BTreeMap<SlotKey, ResolvedPhoto>,
    tokens: HashMap<String, SlotKey>,
}

impl GalleryDay {
    fn empty(date: Date, day_index: Option<u32>) -> Self {
        Self {
            date,
            day_index,
            photos: BTreeMap::new(),
            tokens: HashMap::new(),
        }
    }

    pub fn date(&self) -> Date {
        self.date
    }

    pub fn day_index(&self) -> Option<u32> {
        self.day_index
    }

    pub fn slot_count(&self) -> usize {
        self.photos.len()
    }

    pub fn is_empty(&self) -> bool {
        self.photos.is_empty()
    }

    /// Slot and file behind a minted token, or `None` for anything not minted
    /// for this generation.
    pub fn photo_for_token(&self, token: &str) -> Option<(SlotKey, &ResolvedPhoto)> {
        let slot = self.tokens.get(token)?;
        self.photos.get(slot).map(|photo| (*slot, photo))
    }

    /// Current token bound to a slot. Linear over the token map, which holds
    /// one entry per slot.
    pub fn token_for_slot(&self, slot: SlotKey) -> Option<&str> {
        self.tokens
            .iter()
            .find(|(_, bound)| **bound == slot)
            .map(|(token, _)| token.as_str())
    }

    /// Whether this exact category/filename pair is part of the current day.
    /// Files that exist on disk but are not in the generation must be refused.
    pub fn is_current_photo(&self, category: &str, filename: &str) -> bool {
        self.photos
            .values()
            .any(|photo| photo.category == category && photo.filename == filename)
    }

    /// Ordered projection of the day for the listing page.
    pub fn entries(&self) -> Vec<GalleryEntry> {
        self.photos
            .iter()
            .filter_map(|(slot, photo)| {
                self.token_for_slot(*slot).map(|token| GalleryEntry {
                    slot: *slot,
                    token: token.to_string(),
                    category: photo.category.clone(),
                    filename: photo.filename.clone(),
                })
            })
            .collect()
    }
}

/// Owner of the current generation and the refresh protocol.
pub struct DailyGallery {
    schedule: RotationSchedule,
    categories: Vec<String>,
    timezone: Tz,
    catalog: Arc<dyn PhotoCatalog>,
    current: RwLock<Arc<GalleryDay>>,
    refresh: Mutex<()>,
}

impl DailyGallery {
    pub fn new(
        schedule: RotationSchedule,
        categories: Vec<String>,
        timezone: Tz,
        catalog: Arc<dyn PhotoCatalog>,
    ) -> Self {
        // Date::MIN can never equal a real "today", so the first request
        // always resolves.
        let placeholder = Arc::new(GalleryDay::empty(Date::MIN, None));
        Self {
            schedule,
            categories,
            timezone,
            catalog,
            current: RwLock::new(placeholder),
            refresh: Mutex::new(()),
        }
    }

    /// Return the generation for the calendar day of `now`, resolving it
    /// first when the stored one is stale or empty. Concurrent callers across
    /// a day transition perform a single resolution: losers of the race wait
    /// on the refresh mutex and then observe the winner's snapshot.
    pub async fn ensure_fresh(&self, now: OffsetDateTime) -> Arc<GalleryDay> {
        let today = localized_date(now, self.timezone);
        if let Some(day) = self.fresh_snapshot(today) {
            return day;
        }

        let _refreshing = self.refresh.lock().await;
        if let Some(day) = self.fresh_snapshot(today) {
            return day;
        }

        let started = Instant::now();
        let rebuilt = Arc::new(self.resolve_day(today).await);
        histogram!(METRIC_ROTATION_REFRESH_MS).record(started.elapsed().as_secs_f64() * 1000.0);

        *self.current.write().unwrap_or_else(|poisoned| {
            warn!(target = SOURCE, op = "ensure_fresh", "recovered poisoned gallery lock");
            poisoned.into_inner()
        }) = Arc::clone(&rebuilt);
        rebuilt
    }

    fn fresh_snapshot(&self, today: Date) -> Option<Arc<GalleryDay>> {
        let current = self
            .current
            .read()
            .unwrap_or_else(|poisoned| {
                warn!(
                    target = SOURCE,
                    op = "fresh_snapshot",
                    "recovered poisoned gallery lock"
                );
                poisoned.into_inner()
            })
            .clone();
        (current.date == today && !current.is_empty()).then_some(current)
    }

    async fn resolve_day(&self, today: Date) -> GalleryDay {
        let Some(day_index) = self.schedule.day_index(today) else {
            counter!(METRIC_ROTATION_EMPTY_DAY_TOTAL).increment(1);
            info!(
                target = SOURCE,
                date = %today,
                "date falls outside the rotation cycle"
            );
            return GalleryDay::empty(today, None);
        };

        let mut photos = BTreeMap::new();
        for (position, category) in self.categories.iter().enumerate() {
            let names = match self.catalog.list_category(category).await {
                Ok(names) => names,
                Err(err) => {
                    warn!(
                        target = SOURCE,
                        category = %category,
                        error = %err,
                        "category listing failed, slots treated as missing"
                    );
                    continue;
                }
            };

            let ordinal = (position + 1) as u8;
            for picture in 1..=SLOTS_PER_CATEGORY {
                let slot = SlotKey::new(ordinal, picture);
                if let Some(filename) =
                    select_slot_file(names.iter().map(String::as_str), day_index, slot)
                {
                    photos.insert(
                        slot,
                        ResolvedPhoto {
                            category: category.clone(),
                            filename: filename.to_string(),
                        },
                    );
                }
            }
        }

        let expected = slot_keys(self.categories.len()).count();
        if photos.len() != expected {
            counter!(METRIC_ROTATION_EMPTY_DAY_TOTAL).increment(1);
            warn!(
                target = SOURCE,
                day_index,
                resolved = photos.len(),
                expected,
                "incomplete slot set, serving an empty day"
            );
            return GalleryDay::empty(today, Some(day_index));
        }

        let mut tokens = HashMap::with_capacity(photos.len());
        for slot in photos.keys() {
            let mut token = mint_token();
            while tokens.contains_key(&token) {
                token = mint_token();
            }
            tokens.insert(token, *slot);
        }

        counter!(METRIC_ROTATION_REFRESH_TOTAL).increment(1);
        info!(
            target = SOURCE,
            day_index,
            slots = photos.len(),
            "daily rotation refreshed"
        );

        GalleryDay {
            date: today,
            day_index: Some(day_index),
            photos,
            tokens,
        }
    }
}

/// 22 URL-safe characters over 16 random bytes.
fn mint_token() -> String {
    URL_SAFE_NO_PAD.encode(Uuid::new_v4().as_bytes())
}

use std::sync::Arc;
use std::time::Duration;

use autoscale_cuckoo_filter::CuckooFilter;
use moka::future::Cache;
use parking_lot::RwLock;
use tracing::info;

use crate::repository::{StorageResult, UserRepository};

/// Expected capacity and false-positive rate.
/// Tune these based on real user counts.
const FILTER_CAPACITY: usize = 100_000;
const FALSE_POSITIVE_RATE: f64 = 0.001;

const CACHE_CAPACITY: u64 = 500_000;
const CACHE_TTL: Duration = Duration::from_secs(86_400);

const WARMUP_BATCH: usize = 1_000;

#[inline]
fn normalize(email: &str) -> String {
    email.trim().to_lowercase()
}

/// Answers "is this login email free?" without a database round trip in the
/// common cases.
///
/// The cuckoo filter gives a fast negative (never seen: available), the
/// cache gives a fast positive (recently registered: taken). Anything else
/// falls through to the user repository.
pub struct EmailRegistry {
    filter: RwLock<CuckooFilter<String>>,
    taken: Cache<String, bool>,
}

impl Default for EmailRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl EmailRegistry {
    pub fn new() -> Self {
        Self {
            filter: RwLock::new(CuckooFilter::new(FILTER_CAPACITY, FALSE_POSITIVE_RATE)),
            taken: Cache::builder()
                .max_capacity(CACHE_CAPACITY)
                .time_to_live(CACHE_TTL)
                .build(),
        }
    }

    /// False positives possible, false negatives not.
    pub fn might_exist(&self, email: &str) -> bool {
        self.filter.read().contains(&normalize(email))
    }

    pub async fn mark_taken(&self, email: &str) {
        let email = normalize(email);
        self.filter.write().add(&email);
        self.taken.insert(email, true).await;
    }

    async fn is_cached_taken(&self, email: &str) -> bool {
        self.taken.get(&normalize(email)).await.unwrap_or(false)
    }

    pub async fn is_available(&self, email: &str, users: &dyn UserRepository) -> StorageResult<bool> {
        if !self.might_exist(email) {
            return Ok(true);
        }
        if self.is_cached_taken(email).await {
            return Ok(false);
        }

        let exists = users.email_exists(&normalize(email)).await?;
        if exists {
            self.taken.insert(normalize(email), true).await;
        }
        Ok(!exists)
    }

    /// Loads every registered email into the filter, in batches so the write
    /// lock is never held for long.
    pub async fn warmup(&self, users: Arc<dyn UserRepository>) -> StorageResult<usize> {
        let emails = users.all_emails().await?;

        for batch in emails.chunks(WARMUP_BATCH) {
            let mut filter = self.filter.write();
            for email in batch {
                filter.add(&normalize(email));
            }
        }

        info!(count = emails.len(), "Email registry warmup complete");
        Ok(emails.len())
    }
}

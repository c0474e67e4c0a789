use std::fmt;
use std::num::NonZeroUsize;
use std::time::Duration;

use serde_json::Value;
use tracing::debug;

use super::TtlCache;

/// Time-to-live for rarely changing reference data (tags, categories, server configuration).
const DEFAULT_TTL: Duration = Duration::from_secs(5 * 60);

/// Time-to-live for data that must stay fresh within one user interaction.
const SHORT_LIVED_TTL: Duration = Duration::from_secs(1);

/// Maximum number of responses held by each profile.
const PROFILE_CAPACITY: NonZeroUsize = match NonZeroUsize::new(500) {
    Some(n) => n,
    None => panic!("profile capacity must be non-zero"),
};

/// Named cache configuration a cacheable method is assigned to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CacheProfile {
    /// Long-lived reference data
    Default,
    /// Sub-second freshness window
    ShortLived,
}

impl CacheProfile {
    pub const ALL: [CacheProfile; 2] = [CacheProfile::Default, CacheProfile::ShortLived];

    pub fn ttl(&self) -> Duration {
        match self {
            CacheProfile::Default => DEFAULT_TTL,
            CacheProfile::ShortLived => SHORT_LIVED_TTL,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            CacheProfile::Default => "default",
            CacheProfile::ShortLived => "short-lived",
        }
    }
}

impl fmt::Display for CacheProfile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The two response caches shared by every call made through one client.
pub struct CacheRegistry {
    default: TtlCache<Value>,
    short_lived: TtlCache<Value>,
}

impl CacheRegistry {
    pub fn new() -> Self {
        Self {
            default: TtlCache::new(CacheProfile::Default.ttl(), PROFILE_CAPACITY),
            short_lived: TtlCache::new(CacheProfile::ShortLived.ttl(), PROFILE_CAPACITY),
        }
    }

    pub fn get(&self, profile: CacheProfile) -> &TtlCache<Value> {
        match profile {
            CacheProfile::Default => &self.default,
            CacheProfile::ShortLived => &self.short_lived,
        }
    }

    /// Drop every cached response of one profile.
    pub fn clear(&self, profile: CacheProfile) {
        debug!(profile = %profile, "Clearing response cache");
        self.get(profile).clear();
    }

    pub fn clear_all(&self) {
        for profile in CacheProfile::ALL {
            self.clear(profile);
        }
    }
}

impl Default for CacheRegistry {
    fn default() -> Self {
        Self::new()
    }
}

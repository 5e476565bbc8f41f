//! Execution context configuration

use super::resolver::MetadataResolver;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Default timeout for offloaded database operations (30 seconds)
pub const DEFAULT_OPERATION_TIMEOUT: Duration = Duration::from_secs(30);

/// Settings for an async execution context
///
/// # Example
///
/// ```
/// use std::time::Duration;
/// use theta_orm::ContextConfig;
///
/// let config = ContextConfig::new()
///     .operation_timeout(Duration::from_secs(5))
///     .cache_descriptors(false);
/// assert_eq!(config.timeout(), Duration::from_secs(5));
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContextConfig {
    operation_timeout: Duration,
    cache_descriptors: bool,
}

impl ContextConfig {
    /// Create the default configuration
    pub fn new() -> Self {
        Self {
            operation_timeout: DEFAULT_OPERATION_TIMEOUT,
            cache_descriptors: true,
        }
    }

    /// Set how long a single operation may run
    #[must_use]
    pub fn operation_timeout(mut self, timeout: Duration) -> Self {
        self.operation_timeout = timeout;
        self
    }

    /// Keep resolved entity descriptors between calls
    #[must_use]
    pub fn cache_descriptors(mut self, enabled: bool) -> Self {
        self.cache_descriptors = enabled;
        self
    }

    /// Configured operation timeout
    pub fn timeout(&self) -> Duration {
        self.operation_timeout
    }

    /// Whether descriptors are cached
    pub fn caches_descriptors(&self) -> bool {
        self.cache_descriptors
    }

    /// Build a metadata resolver matching this configuration
    pub fn build_resolver(&self) -> MetadataResolver {
        if self.cache_descriptors {
            MetadataResolver::new()
        } else {
            MetadataResolver::uncached()
        }
    }
}

impl Default for ContextConfig {
    fn default() -> Self {
        Self::new()
    }
}

//! The entry service.
//!
//! One `EntryService` owns the identity cache, the pending queue and the
//! loader lifecycle. Construct it once and pass it by reference to every
//! place that builds entries.

use std::sync::Arc;

use tracing::debug;

use crate::cache::{CacheStats, IdentityCache};
use crate::config::EntryServiceConfig;
use crate::entry::BatteryEntry;
use crate::error::BatteryResult;
use crate::platform::Platform;
use crate::queue::events::{event_channel, EntryEventHandler, EventStream};
use crate::queue::RequestQueue;
use crate::resolver::Resolver;
use crate::sipper::BatterySipper;

/// Builds battery entries and resolves their labels and icons.
#[derive(Debug)]
pub struct EntryService {
    config: EntryServiceConfig,
    resolver: Resolver,
    queue: RequestQueue,
}

impl EntryService {
    /// Creates a service.
    ///
    /// # Errors
    /// - `InvalidField`: the configuration failed validation
    pub fn new(platform: Platform, config: EntryServiceConfig) -> BatteryResult<Self> {
        config.validate()?;
        let resolver = Resolver::new(platform, Arc::new(IdentityCache::new()));
        let queue = RequestQueue::new(resolver.clone(), &config);
        Ok(Self {
            config,
            resolver,
            queue,
        })
    }

    /// Creates a service with the default configuration.
    #[must_use]
    pub fn with_defaults(platform: Platform) -> Self {
        let config = EntryServiceConfig::default();
        let resolver = Resolver::new(platform, Arc::new(IdentityCache::new()));
        let queue = RequestQueue::new(resolver.clone(), &config);
        Self {
            config,
            resolver,
            queue,
        }
    }

    /// Builds an entry for `sipper`.
    ///
    /// System categories and cached owners are resolved immediately; owners
    /// that need package labels are queued for the loader.
    pub fn create_entry(&self, sipper: BatterySipper) -> Arc<BatteryEntry> {
        let (entry, deferred) = BatteryEntry::build(sipper, &self.resolver);
        let entry = Arc::new(entry);
        if deferred {
            self.queue.enqueue(Arc::clone(&entry));
        }
        entry
    }

    /// Builds entries for every sample, in order.
    pub fn create_entries<I>(&self, sippers: I) -> Vec<Arc<BatteryEntry>>
    where
        I: IntoIterator<Item = BatterySipper>,
    {
        sippers.into_iter().map(|s| self.create_entry(s)).collect()
    }

    /// Registers the loader event handler.
    pub fn register_handler(&self, handler: Arc<dyn EntryEventHandler>) {
        self.queue.register_handler(handler);
    }

    /// Registers a channel handler and returns its stream.
    pub fn subscribe(&self) -> EventStream {
        let (handler, stream) = event_channel(self.config.event_capacity);
        self.queue.register_handler(handler);
        stream
    }

    /// Starts the loader for pending entries. See [`RequestQueue::start`].
    ///
    /// # Errors
    /// - `SpawnFailed`: the loader thread could not be created
    pub fn start_request_queue(&self) -> BatteryResult<bool> {
        self.queue.start()
    }

    /// Stops the loader. See [`RequestQueue::stop`].
    pub fn stop_request_queue(&self) -> usize {
        self.queue.stop()
    }

    /// Forgets every resolved owner. Call when packages were installed or
    /// removed.
    pub fn clear_uid_cache(&self) {
        debug!(entries = self.resolver.cache().len(), "clearing identity cache");
        self.resolver.cache().clear();
    }

    /// The identity cache.
    #[must_use]
    pub fn cache(&self) -> &IdentityCache {
        self.resolver.cache()
    }

    /// Identity cache counters.
    #[must_use]
    pub fn cache_stats(&self) -> CacheStats {
        self.resolver.cache().stats()
    }

    /// The pending queue.
    #[must_use]
    pub const fn queue(&self) -> &RequestQueue {
        &self.queue
    }

    /// The resolver shared with the loader.
    #[must_use]
    pub const fn resolver(&self) -> &Resolver {
        &self.resolver
    }

    /// The active configuration.
    #[must_use]
    pub const fn config(&self) -> &EntryServiceConfig {
        &self.config
    }
}

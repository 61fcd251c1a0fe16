//! # battery-entry - labels and icons for battery usage attribution
//!
//! A battery usage screen lists power samples ("sippers") that attribute
//! drain either to a system category or to an owner id grouping installed
//! packages. This crate turns each sample into a [`BatteryEntry`] with a
//! human-readable label and icon.
//!
//! ## Core Concepts
//!
//! - **Entry**: a sample plus its best-known label and icon
//! - **Identity cache**: owner id → resolved label, icon and canonical package
//! - **Loader**: one background thread resolving queued entries in FIFO order
//! - **Platform**: injected collaborators for resources, users and packages
//!
//! ## Usage
//!
//! ```rust,ignore
//! use battery_entry::{BatterySipper, EntryService, InMemoryPlatform, OwnerId};
//!
//! let mem = InMemoryPlatform::new();
//! mem.packages.install(OwnerId::new(10_001), "com.example.app", Some("Example"), 0x10);
//!
//! let service = EntryService::with_defaults(mem.platform());
//! let events = service.subscribe();
//! let entry = service.create_entry(BatterySipper::app(OwnerId::new(10_001)));
//! service.start_request_queue()?;
//! events.drain_until_fully_drawn(std::time::Duration::from_secs(1))?;
//! assert_eq!(entry.label().as_deref(), Some("Example"));
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod cache;
pub mod config;
pub mod entry;
pub mod error;
pub mod platform;
pub mod queue;
pub mod resolver;
pub mod resources;
pub mod service;
pub mod sipper;

// Re-export primary types at crate root for convenience
pub use cache::{CacheStats, IdentityCache, OwnerDetail};
pub use config::EntryServiceConfig;
pub use entry::{BatteryEntry, EntryId, EntrySnapshot};
pub use error::{BatteryError, BatteryResult, ConfigError, LookupError, QueueError};
pub use platform::{
    ApplicationInfo, InMemoryPlatform, PackageDirectory, PackageInfo, Platform, ResourceProvider,
    UserDirectory, UserInfo,
};
pub use queue::events::{EntryEvent, EntryEventHandler, EventStream};
pub use queue::RequestQueue;
pub use resolver::Resolver;
pub use resources::{DrawableRes, Icon, StringRes};
pub use service::EntryService;
pub use sipper::{BatterySipper, DrainType, OwnerId, UserId};

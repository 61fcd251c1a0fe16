//! Platform collaborators.
//!
//! Entry resolution never talks to the OS directly. It goes through the
//! traits defined here, bundled into a [`Platform`] handle that the service
//! and the loader thread share.

mod memory;
mod traits;

use std::sync::Arc;

pub use memory::{InMemoryPackageDirectory, InMemoryUserDirectory, StaticResources};
pub use traits::{
    ApplicationInfo, PackageDirectory, PackageInfo, ResourceProvider, UserDirectory, UserInfo,
};

/// Shared handles to the platform collaborators.
#[derive(Clone)]
pub struct Platform {
    /// Resource strings and drawables.
    pub resources: Arc<dyn ResourceProvider>,
    /// User profile records.
    pub users: Arc<dyn UserDirectory>,
    /// Installed packages.
    pub packages: Arc<dyn PackageDirectory>,
}

impl Platform {
    /// Bundles the three collaborators.
    pub fn new(
        resources: Arc<dyn ResourceProvider>,
        users: Arc<dyn UserDirectory>,
        packages: Arc<dyn PackageDirectory>,
    ) -> Self {
        Self {
            resources,
            users,
            packages,
        }
    }
}

impl std::fmt::Debug for Platform {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Platform").finish_non_exhaustive()
    }
}

/// In-memory collaborators with direct access to the concrete stores.
#[derive(Debug, Default, Clone)]
pub struct InMemoryPlatform {
    /// Resource strings.
    pub resources: Arc<StaticResources>,
    /// User records.
    pub users: Arc<InMemoryUserDirectory>,
    /// Installed packages.
    pub packages: Arc<InMemoryPackageDirectory>,
}

impl InMemoryPlatform {
    /// Creates empty in-memory collaborators.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns a [`Platform`] handle sharing these stores.
    #[must_use]
    pub fn platform(&self) -> Platform {
        Platform::new(
            Arc::clone(&self.resources) as Arc<dyn ResourceProvider>,
            Arc::clone(&self.users) as Arc<dyn UserDirectory>,
            Arc::clone(&self.packages) as Arc<dyn PackageDirectory>,
        )
    }
}

//! In-memory platform backend.
//!
//! This module provides thread-safe in-memory implementations of the
//! collaborator traits. It is intended for embedded usage, tests, and as a
//! reference implementation for real platform bindings.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use crate::error::LookupError;
use crate::resources::StringRes;
use crate::sipper::{OwnerId, UserId};

use super::traits::{
    ApplicationInfo, PackageDirectory, PackageInfo, ResourceProvider, UserDirectory, UserInfo,
};

fn read<T>(lock: &RwLock<T>) -> RwLockReadGuard<'_, T> {
    lock.read().unwrap_or_else(PoisonError::into_inner)
}

fn write<T>(lock: &RwLock<T>) -> RwLockWriteGuard<'_, T> {
    lock.write().unwrap_or_else(PoisonError::into_inner)
}

/// Resource provider backed by the built-in English strings with optional
/// per-id overrides.
#[derive(Debug, Default)]
pub struct StaticResources {
    overrides: RwLock<HashMap<StringRes, String>>,
}

impl StaticResources {
    /// Creates a provider with no overrides.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Replaces the text for `id`.
    pub fn set_string(&self, id: StringRes, text: impl Into<String>) {
        write(&self.overrides).insert(id, text.into());
    }
}

impl ResourceProvider for StaticResources {
    fn string(&self, id: StringRes) -> String {
        read(&self.overrides)
            .get(&id)
            .cloned()
            .unwrap_or_else(|| id.default_text().to_string())
    }
}

/// User directory backed by a map.
#[derive(Debug, Default)]
pub struct InMemoryUserDirectory {
    users: RwLock<HashMap<UserId, UserInfo>>,
}

impl InMemoryUserDirectory {
    /// Creates an empty directory.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds or replaces a user.
    pub fn add_user(&self, id: UserId, name: Option<&str>) {
        write(&self.users).insert(
            id,
            UserInfo {
                id,
                name: name.map(str::to_string),
            },
        );
    }

    /// Removes a user. Returns the removed record.
    pub fn remove_user(&self, id: UserId) -> Option<UserInfo> {
        write(&self.users).remove(&id)
    }
}

impl UserDirectory for InMemoryUserDirectory {
    fn user_info(&self, id: UserId) -> Option<UserInfo> {
        read(&self.users).get(&id).cloned()
    }
}

#[derive(Debug, Default)]
struct PackageState {
    by_owner: HashMap<OwnerId, Vec<String>>,
    packages: HashMap<String, PackageInfo>,
    texts: HashMap<(String, u32), String>,
}

/// Package directory backed by maps.
///
/// Call counters let tests assert which lookups resolution performed.
#[derive(Debug, Default)]
pub struct InMemoryPackageDirectory {
    state: RwLock<PackageState>,
    owner_queries: AtomicU64,
    app_queries: AtomicU64,
}

impl InMemoryPackageDirectory {
    /// Creates an empty directory.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Installs `package` under `owner`.
    ///
    /// `icon` is the declared icon resource; zero means none.
    pub fn install(&self, owner: OwnerId, package: &str, label: Option<&str>, icon: u32) {
        let app = ApplicationInfo {
            package_name: package.to_string(),
            label: label.map(str::to_string),
            icon,
        };
        let mut state = write(&self.state);
        let owned = state.by_owner.entry(owner).or_default();
        if !owned.iter().any(|p| p == package) {
            owned.push(package.to_string());
        }
        state.packages.insert(
            package.to_string(),
            PackageInfo {
                package_name: package.to_string(),
                shared_user_label: 0,
                application_info: app,
            },
        );
    }

    /// Lists `package` under `owner` without an installed record, so record
    /// lookups fail with `PackageNotFound`.
    pub fn add_dangling(&self, owner: OwnerId, package: &str) {
        let mut state = write(&self.state);
        state.by_owner.entry(owner).or_default().push(package.to_string());
    }

    /// Declares a shared-owner label on an installed package.
    ///
    /// Returns false if the package is not installed.
    pub fn set_shared_label(&self, package: &str, resource: u32, text: &str) -> bool {
        let mut state = write(&self.state);
        let Some(info) = state.packages.get_mut(package) else {
            return false;
        };
        info.shared_user_label = resource;
        state
            .texts
            .insert((package.to_string(), resource), text.to_string());
        true
    }

    /// Removes a package from every owner.
    pub fn uninstall(&self, package: &str) {
        let mut state = write(&self.state);
        state.packages.remove(package);
        for owned in state.by_owner.values_mut() {
            owned.retain(|p| p != package);
        }
        state.by_owner.retain(|_, owned| !owned.is_empty());
    }

    /// Number of `packages_for_owner` calls served.
    #[must_use]
    pub fn owner_queries(&self) -> u64 {
        self.owner_queries.load(Ordering::Relaxed)
    }

    /// Number of `application_info` calls served.
    #[must_use]
    pub fn app_queries(&self) -> u64 {
        self.app_queries.load(Ordering::Relaxed)
    }
}

impl PackageDirectory for InMemoryPackageDirectory {
    fn packages_for_owner(&self, owner: OwnerId) -> Option<Vec<String>> {
        self.owner_queries.fetch_add(1, Ordering::Relaxed);
        read(&self.state)
            .by_owner
            .get(&owner)
            .filter(|owned| !owned.is_empty())
            .cloned()
    }

    fn application_info(&self, package: &str) -> Result<ApplicationInfo, LookupError> {
        self.app_queries.fetch_add(1, Ordering::Relaxed);
        read(&self.state)
            .packages
            .get(package)
            .map(|info| info.application_info.clone())
            .ok_or_else(|| LookupError::PackageNotFound {
                package: package.to_string(),
            })
    }

    fn package_info(&self, package: &str) -> Result<PackageInfo, LookupError> {
        read(&self.state)
            .packages
            .get(package)
            .cloned()
            .ok_or_else(|| LookupError::PackageNotFound {
                package: package.to_string(),
            })
    }

    fn text(&self, package: &str, resource: u32, _app: &ApplicationInfo) -> Option<String> {
        read(&self.state)
            .texts
            .get(&(package.to_string(), resource))
            .cloned()
    }
}

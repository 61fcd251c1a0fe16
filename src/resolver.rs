//! Owner resolution.
//!
//! Turns an owner id into a display label, icon and canonical package. The
//! quick path runs on the caller thread and never loads labels or icons of
//! installed packages; the full path runs on the loader thread and writes its
//! result to the identity cache.

use std::sync::Arc;

use tracing::{debug, trace};

use crate::cache::{IdentityCache, OwnerDetail};
use crate::entry::{BatteryEntry, EntryState};
use crate::platform::{PackageDirectory, Platform};
use crate::resources::{DrawableRes, Icon, StringRes};
use crate::sipper::OwnerId;

/// Process label reported by media server samples.
const MEDIASERVER: &str = "mediaserver";

/// Result of the quick path.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum QuickOutcome {
    /// Copied from the identity cache.
    Cached,
    /// Owner has no packages; a system label and icon were assigned.
    SystemFallback,
    /// Owner has packages; the entry must be queued for the loader.
    Deferred,
}

/// Result of scanning an owner's packages in order.
#[derive(Debug)]
struct PackageScan {
    labels: Vec<String>,
    /// Index of the package whose name equals the entry's hint label.
    preferred: Option<usize>,
    /// First package declaring an icon, with that icon.
    icon_source: Option<(usize, Icon)>,
}

/// Owner resolution against the platform and the identity cache.
#[derive(Debug, Clone)]
pub struct Resolver {
    platform: Platform,
    cache: Arc<IdentityCache>,
}

impl Resolver {
    /// Creates a resolver.
    pub fn new(platform: Platform, cache: Arc<IdentityCache>) -> Self {
        Self { platform, cache }
    }

    /// The platform collaborators.
    #[must_use]
    pub const fn platform(&self) -> &Platform {
        &self.platform
    }

    /// The identity cache.
    #[must_use]
    pub const fn cache(&self) -> &Arc<IdentityCache> {
        &self.cache
    }

    pub(crate) fn quick_resolve(&self, owner: OwnerId, state: &mut EntryState) -> QuickOutcome {
        if let Some(detail) = self.cache.get(owner) {
            trace!(%owner, label = %detail.label, "identity cache hit");
            state.apply_detail(&detail);
            return QuickOutcome::Cached;
        }

        let packages = self.platform.packages.packages_for_owner(owner);
        state.icon = Some(self.platform.packages.default_activity_icon());
        if packages.map_or(false, |owned| !owned.is_empty()) {
            return QuickOutcome::Deferred;
        }

        let resources = &self.platform.resources;
        if owner.is_kernel() {
            state.label = Some(resources.string(StringRes::ProcessKernelLabel));
        } else if state.label.as_deref() == Some(MEDIASERVER) {
            state.label = Some(resources.string(StringRes::ProcessMediaserverLabel));
        } else if state.label.is_none() {
            state.label = Some(owner.to_string());
        }
        state.icon_id = Some(DrawableRes::PowerSystem);
        state.icon = Some(resources.drawable(DrawableRes::PowerSystem));
        QuickOutcome::SystemFallback
    }

    /// Resolves the entry's owner in full and writes the result back.
    ///
    /// Returns the detail written to the entry and the identity cache, or
    /// `None` when the entry has no owner or the owner has no packages (in
    /// which case the entry is labelled with the bare owner id).
    pub fn load_name_and_icon(&self, entry: &BatteryEntry) -> Option<OwnerDetail> {
        let owner = entry.sipper().owner?;

        if let Some(detail) = self.cache.get(owner) {
            trace!(%owner, entry = %entry.id(), "identity cache hit on loader");
            entry.update(|state| state.apply_detail(&detail));
            return Some(detail);
        }

        let pm = self.platform.packages.as_ref();
        let Some(packages) = pm.packages_for_owner(owner).filter(|owned| !owned.is_empty()) else {
            debug!(%owner, "owner no longer has packages");
            entry.update(|state| {
                state.packages = None;
                state.label = Some(owner.to_string());
            });
            return None;
        };

        let hint = entry.state().label;
        let scan = scan_packages(pm, owner, &packages, hint.as_deref());
        let icon_index = scan.icon_source.as_ref().map(|(i, _)| *i);
        let (mut package_name, mut icon) = match scan.icon_source {
            Some((i, icon)) => (Some(packages[i].clone()), icon),
            None => (None, pm.default_activity_icon()),
        };

        let mut labels = scan.labels;
        let label = if labels.len() == 1 {
            labels.swap_remove(0)
        } else if let Some((text, shared_icon)) = shared_owner_label(pm, owner, &packages) {
            if let Some((package, shared)) = shared_icon {
                package_name = Some(package);
                icon = shared;
            }
            text
        } else {
            let index = scan.preferred.or(icon_index).unwrap_or(0);
            labels.swap_remove(index)
        };

        let detail = OwnerDetail::new(label, icon, package_name);
        self.cache.put(owner, detail.clone());
        entry.update(|state| {
            state.packages = Some(packages);
            state.apply_detail(&detail);
        });
        debug!(%owner, entry = %entry.id(), label = %detail.label, "resolved owner");
        Some(detail)
    }
}

fn scan_packages(
    pm: &dyn PackageDirectory,
    owner: OwnerId,
    packages: &[String],
    hint: Option<&str>,
) -> PackageScan {
    let mut labels = packages.to_vec();
    let mut preferred = None;
    let mut icon_source = None;

    for (i, package) in packages.iter().enumerate() {
        if hint == Some(package.as_str()) {
            preferred = Some(i);
        }
        match pm.application_info(package) {
            Ok(app) => {
                if let Some(label) = pm.load_label(&app) {
                    labels[i] = label;
                }
                if app.icon != 0 {
                    icon_source = Some((i, pm.load_icon(&app)));
                    break;
                }
            }
            Err(err) => debug!(%owner, %err, "skipping package"),
        }
    }

    PackageScan {
        labels,
        preferred,
        icon_source,
    }
}

/// Finds a declared shared-owner label, with the declaring package's icon
/// when it has one.
fn shared_owner_label(
    pm: &dyn PackageDirectory,
    owner: OwnerId,
    packages: &[String],
) -> Option<(String, Option<(String, Icon)>)> {
    for package in packages {
        let info = match pm.package_info(package) {
            Ok(info) => info,
            Err(err) => {
                debug!(%owner, %err, "skipping package record");
                continue;
            }
        };
        if info.shared_user_label == 0 {
            continue;
        }
        let Some(text) = pm.text(package, info.shared_user_label, &info.application_info) else {
            continue;
        };
        let icon = (info.application_info.icon != 0)
            .then(|| (package.clone(), pm.load_icon(&info.application_info)));
        return Some((text, icon));
    }
    None
}

//! Battery entries: a power sample plus its resolved label and icon.
//!
//! An entry is created on the caller thread, which fills in whatever it can
//! resolve without enumerating packages. Anything left over is finished by
//! the loader thread, so `label()` and `icon()` may change after creation.

use std::fmt;
use std::sync::{Mutex, MutexGuard, PoisonError};

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::cache::OwnerDetail;
use crate::resolver::{QuickOutcome, Resolver};
use crate::resources::{DrawableRes, Icon, StringRes};
use crate::sipper::{BatterySipper, DrainType, OwnerId};

/// Unique identifier for an entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EntryId(Uuid);

impl EntryId {
    /// Creates a new random entry id.
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for EntryId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for EntryId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Mutable, resolved part of an entry.
#[derive(Debug, Clone, Default, PartialEq)]
pub(crate) struct EntryState {
    pub label: Option<String>,
    pub icon: Option<Icon>,
    pub icon_id: Option<DrawableRes>,
    pub default_package_name: Option<String>,
    pub packages: Option<Vec<String>>,
}

impl EntryState {
    pub(crate) fn apply_detail(&mut self, detail: &OwnerDetail) {
        self.label = Some(detail.label.clone());
        self.icon = Some(detail.icon.clone());
        self.default_package_name.clone_from(&detail.package_name);
    }
}

/// Serializable view of an entry, as handed to a detail screen.
#[allow(missing_docs)]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EntrySnapshot {
    pub id: EntryId,
    pub drain_type: DrainType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub owner: Option<OwnerId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub icon: Option<Icon>,
    /// Numeric drawable id; zero when the icon is not a bundled drawable.
    pub icon_id: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_package_name: Option<String>,
    pub total_power_mah: f64,
}

/// A power sample with its best-known label and icon.
#[derive(Debug)]
pub struct BatteryEntry {
    id: EntryId,
    sipper: BatterySipper,
    state: Mutex<EntryState>,
}

impl BatteryEntry {
    /// Builds an entry, running the synchronous fast path.
    ///
    /// Returns the entry and whether it still needs the loader thread.
    pub(crate) fn build(sipper: BatterySipper, resolver: &Resolver) -> (Self, bool) {
        let mut state = category_state(&sipper, resolver);

        let mut deferred = false;
        if state.label.is_none() || state.icon_id.is_none() {
            if let Some(owner) = sipper.owner {
                deferred = resolver.quick_resolve(owner, &mut state) == QuickOutcome::Deferred;
            }
        }

        let entry = Self {
            id: EntryId::new(),
            sipper,
            state: Mutex::new(state),
        };
        (entry, deferred)
    }

    fn lock(&self) -> MutexGuard<'_, EntryState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// The entry id.
    #[must_use]
    pub const fn id(&self) -> EntryId {
        self.id
    }

    /// The raw sample.
    #[must_use]
    pub const fn sipper(&self) -> &BatterySipper {
        &self.sipper
    }

    /// Current best-known label.
    #[must_use]
    pub fn label(&self) -> Option<String> {
        self.lock().label.clone()
    }

    /// Current best-known icon.
    #[must_use]
    pub fn icon(&self) -> Option<Icon> {
        self.lock().icon.clone()
    }

    /// Bundled drawable chosen for this entry, if any.
    #[must_use]
    pub fn icon_id(&self) -> Option<DrawableRes> {
        self.lock().icon_id
    }

    /// Package the icon came from.
    #[must_use]
    pub fn default_package_name(&self) -> Option<String> {
        self.lock().default_package_name.clone()
    }

    /// Packages owned by the sample's owner, once the loader has run.
    #[must_use]
    pub fn packages(&self) -> Option<Vec<String>> {
        self.lock().packages.clone()
    }

    /// Returns a consistent copy of every field.
    #[must_use]
    pub fn snapshot(&self) -> EntrySnapshot {
        let state = self.lock();
        EntrySnapshot {
            id: self.id,
            drain_type: self.sipper.drain_type,
            owner: self.sipper.owner,
            label: state.label.clone(),
            icon: state.icon.clone(),
            icon_id: state.icon_id.map_or(0, DrawableRes::id),
            default_package_name: state.default_package_name.clone(),
            total_power_mah: self.sipper.total_power_mah,
        }
    }

    pub(crate) fn state(&self) -> EntryState {
        self.lock().clone()
    }

    pub(crate) fn update(&self, f: impl FnOnce(&mut EntryState)) {
        f(&mut self.lock());
    }
}

fn category_state(sipper: &BatterySipper, resolver: &Resolver) -> EntryState {
    let resources = &resolver.platform().resources;
    let mut state = EntryState::default();

    let fixed = |label: StringRes, drawable: DrawableRes| (Some(resources.string(label)), Some(drawable));
    let (label, icon_id) = match sipper.drain_type {
        DrainType::Idle => fixed(StringRes::PowerIdle, DrawableRes::PhoneIdle),
        DrainType::Cell => fixed(StringRes::PowerCell, DrawableRes::CellStandby),
        DrainType::Phone => fixed(StringRes::PowerPhone, DrawableRes::VoiceCalls),
        DrainType::Wifi => fixed(StringRes::PowerWifi, DrawableRes::Wifi),
        DrainType::Bluetooth => fixed(StringRes::PowerBluetooth, DrawableRes::Bluetooth),
        DrainType::Screen => fixed(StringRes::PowerScreen, DrawableRes::Display),
        DrainType::Unaccounted => fixed(StringRes::PowerUnaccounted, DrawableRes::PowerSystem),
        DrainType::Overcounted => fixed(StringRes::PowerOvercounted, DrawableRes::PowerSystem),
        DrainType::App => (sipper.package_with_highest_drain.clone(), None),
        DrainType::User => {
            let users = &resolver.platform().users;
            let info = sipper.user_id.and_then(|id| users.user_info(id));
            if let Some(info) = info {
                state.icon = users.user_icon(&info);
                let name = info.name.clone().unwrap_or_else(|| info.id.to_string());
                (
                    Some(resources.format_string(StringRes::RunningProcessItemUserLabel, &name)),
                    None,
                )
            } else {
                state.icon = None;
                (
                    Some(resources.string(StringRes::RunningProcessItemRemovedUserLabel)),
                    None,
                )
            }
        }
    };

    state.label = label;
    state.icon_id = icon_id;
    if let Some(res) = icon_id {
        state.icon = Some(resources.drawable(res));
    }
    state
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::cache::IdentityCache;
    use crate::platform::InMemoryPlatform;
    use crate::sipper::UserId;

    fn resolver(mem: &InMemoryPlatform) -> Resolver {
        Resolver::new(mem.platform(), Arc::new(IdentityCache::new()))
    }

    #[test]
    fn fixed_categories_map_to_label_and_drawable() {
        let mem = InMemoryPlatform::new();
        let r = resolver(&mem);

        let cases = [
            (DrainType::Idle, "Phone idle", DrawableRes::PhoneIdle),
            (DrainType::Cell, "Cell standby", DrawableRes::CellStandby),
            (DrainType::Phone, "Voice calls", DrawableRes::VoiceCalls),
            (DrainType::Wifi, "Wi-Fi", DrawableRes::Wifi),
            (DrainType::Bluetooth, "Bluetooth", DrawableRes::Bluetooth),
            (DrainType::Screen, "Screen", DrawableRes::Display),
            (DrainType::Unaccounted, "Unaccounted", DrawableRes::PowerSystem),
            (DrainType::Overcounted, "Over-counted", DrawableRes::PowerSystem),
        ];
        for (drain, label, res) in cases {
            let (entry, deferred) = BatteryEntry::build(BatterySipper::category(drain), &r);
            assert!(!deferred, "{drain:?}");
            assert_eq!(entry.label().as_deref(), Some(label));
            assert_eq!(entry.icon_id(), Some(res));
            assert_eq!(entry.icon(), Some(Icon::Drawable { res }));
        }
        assert_eq!(mem.packages.owner_queries(), 0);
    }

    #[test]
    fn user_category_formats_name() {
        let mem = InMemoryPlatform::new();
        mem.users.add_user(UserId::new(10), Some("Ada"));
        let (entry, deferred) = BatteryEntry::build(BatterySipper::user(UserId::new(10)), &resolver(&mem));

        assert!(!deferred);
        assert_eq!(entry.label().as_deref(), Some("User: Ada"));
        assert_eq!(entry.icon(), Some(Icon::User { user: UserId::new(10) }));
        assert!(entry.icon_id().is_none());
    }

    #[test]
    fn user_without_name_uses_id() {
        let mem = InMemoryPlatform::new();
        mem.users.add_user(UserId::new(11), None);
        let (entry, _) = BatteryEntry::build(BatterySipper::user(UserId::new(11)), &resolver(&mem));
        assert_eq!(entry.label().as_deref(), Some("User: 11"));
    }

    #[test]
    fn removed_user_is_terminal() {
        let mem = InMemoryPlatform::new();
        let (entry, deferred) = BatteryEntry::build(BatterySipper::user(UserId::new(12)), &resolver(&mem));

        assert!(!deferred);
        assert_eq!(entry.label().as_deref(), Some("Removed user"));
        assert!(entry.icon().is_none());
    }

    #[test]
    fn app_with_packages_is_deferred_with_hint_label() {
        let mem = InMemoryPlatform::new();
        let owner = OwnerId::new(10_050);
        mem.packages.install(owner, "com.example.app", Some("Example"), 0x10);

        let sipper = BatterySipper::app(owner).with_highest_drain("com.example.app");
        let (entry, deferred) = BatteryEntry::build(sipper, &resolver(&mem));

        assert!(deferred);
        assert_eq!(entry.label().as_deref(), Some("com.example.app"));
        assert_eq!(entry.icon(), Some(Icon::DefaultActivity));
        assert_eq!(mem.packages.app_queries(), 0);
    }

    #[test]
    fn snapshot_reports_numeric_icon_id() {
        let mem = InMemoryPlatform::new();
        let (entry, _) = BatteryEntry::build(
            BatterySipper::category(DrainType::Screen).with_power(3.25),
            &resolver(&mem),
        );
        let snap = entry.snapshot();
        assert_eq!(snap.icon_id, DrawableRes::Display.id());
        assert_eq!(snap.id, entry.id());
        assert!((snap.total_power_mah - 3.25).abs() < f64::EPSILON);

        let json = serde_json::to_value(&snap).unwrap();
        assert_eq!(json["drain_type"], "screen");
        assert!(json.get("owner").is_none());
    }
}

//! Raw power-usage samples.
//!
//! A `BatterySipper` attributes a share of battery drain either to a fixed
//! system category (radio, screen, idle, ...) or to an owner id that groups
//! one or more installed packages.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Numeric OS identifier grouping packages under one accounting bucket.
///
/// # Examples
///
/// ```
/// use battery_entry::OwnerId;
///
/// assert!(OwnerId::KERNEL.is_kernel());
/// assert_eq!(OwnerId::new(10_042).to_string(), "10042");
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct OwnerId(u32);

impl OwnerId {
    /// The kernel / root owner.
    pub const KERNEL: Self = Self(0);

    /// Wraps a raw owner id.
    #[must_use]
    pub const fn new(raw: u32) -> Self {
        Self(raw)
    }

    /// Returns the raw id.
    #[must_use]
    pub const fn get(self) -> u32 {
        self.0
    }

    /// Returns true for the kernel owner.
    #[must_use]
    pub const fn is_kernel(self) -> bool {
        self.0 == 0
    }
}

impl fmt::Display for OwnerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<u32> for OwnerId {
    fn from(raw: u32) -> Self {
        Self(raw)
    }
}

/// OS user (profile) identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UserId(u32);

impl UserId {
    /// Wraps a raw user id.
    #[must_use]
    pub const fn new(raw: u32) -> Self {
        Self(raw)
    }

    /// Returns the raw id.
    #[must_use]
    pub const fn get(self) -> u32 {
        self.0
    }
}

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Category a sample attributes its drain to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DrainType {
    /// CPU idle / suspend.
    Idle,
    /// Cellular standby.
    Cell,
    /// Voice calls.
    Phone,
    /// Wi-Fi radio.
    Wifi,
    /// Bluetooth radio.
    Bluetooth,
    /// Display.
    Screen,
    /// An application owner.
    App,
    /// A whole OS user profile.
    User,
    /// Drain not attributed to anything.
    Unaccounted,
    /// Attributed drain exceeding the measured total.
    Overcounted,
}

/// A raw power-usage sample.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BatterySipper {
    /// Category tag.
    pub drain_type: DrainType,
    /// Owner the drain is attributed to, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub owner: Option<OwnerId>,
    /// OS user for `DrainType::User` samples.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_id: Option<UserId>,
    /// Package with the highest drain within the owner, used as a label hint.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub package_with_highest_drain: Option<String>,
    /// Total attributed power in mAh.
    #[serde(default)]
    pub total_power_mah: f64,
}

impl BatterySipper {
    /// Creates a sample for a fixed category with no owner.
    #[must_use]
    pub const fn category(drain_type: DrainType) -> Self {
        Self {
            drain_type,
            owner: None,
            user_id: None,
            package_with_highest_drain: None,
            total_power_mah: 0.0,
        }
    }

    /// Creates an application sample for `owner`.
    #[must_use]
    pub const fn app(owner: OwnerId) -> Self {
        Self {
            drain_type: DrainType::App,
            owner: Some(owner),
            user_id: None,
            package_with_highest_drain: None,
            total_power_mah: 0.0,
        }
    }

    /// Creates a sample for a whole OS user.
    #[must_use]
    pub const fn user(user_id: UserId) -> Self {
        Self {
            drain_type: DrainType::User,
            owner: None,
            user_id: Some(user_id),
            package_with_highest_drain: None,
            total_power_mah: 0.0,
        }
    }

    /// Sets the highest-drain package hint.
    #[must_use]
    pub fn with_highest_drain(mut self, package: impl Into<String>) -> Self {
        self.package_with_highest_drain = Some(package.into());
        self
    }

    /// Sets the attributed power.
    #[must_use]
    pub fn with_power(mut self, mah: f64) -> Self {
        self.total_power_mah = mah;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn owner_id_display_is_decimal() {
        assert_eq!(OwnerId::new(1013).to_string(), "1013");
        assert!(!OwnerId::new(1013).is_kernel());
        assert_eq!(OwnerId::from(7).get(), 7);
    }

    #[test]
    fn sipper_json_shape() {
        let sipper = BatterySipper::app(OwnerId::new(10_001))
            .with_highest_drain("com.example.app")
            .with_power(12.5);
        let json = serde_json::to_value(&sipper).unwrap();
        assert_eq!(json["drain_type"], "app");
        assert_eq!(json["owner"], 10_001);
        assert!(json.get("user_id").is_none());

        let back: BatterySipper = serde_json::from_value(json).unwrap();
        assert_eq!(back, sipper);
    }

    #[test]
    fn sipper_defaults_missing_fields() {
        let sipper: BatterySipper = serde_json::from_str(r#"{"drain_type":"wifi"}"#).unwrap();
        assert_eq!(sipper, BatterySipper::category(DrainType::Wifi));
    }
}

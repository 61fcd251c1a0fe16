//! Resource identifiers and icon handles.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::sipper::UserId;

/// Display strings used by entry resolution.
#[allow(missing_docs)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StringRes {
    PowerIdle,
    PowerCell,
    PowerPhone,
    PowerWifi,
    PowerBluetooth,
    PowerScreen,
    PowerUnaccounted,
    PowerOvercounted,
    /// Formatted with the user's display name.
    RunningProcessItemUserLabel,
    RunningProcessItemRemovedUserLabel,
    ProcessKernelLabel,
    ProcessMediaserverLabel,
}

impl StringRes {
    /// Built-in English text. Templates use `%1$s` for their single argument.
    #[must_use]
    pub const fn default_text(self) -> &'static str {
        match self {
            Self::PowerIdle => "Phone idle",
            Self::PowerCell => "Cell standby",
            Self::PowerPhone => "Voice calls",
            Self::PowerWifi => "Wi-Fi",
            Self::PowerBluetooth => "Bluetooth",
            Self::PowerScreen => "Screen",
            Self::PowerUnaccounted => "Unaccounted",
            Self::PowerOvercounted => "Over-counted",
            Self::RunningProcessItemUserLabel => "User: %1$s",
            Self::RunningProcessItemRemovedUserLabel => "Removed user",
            Self::ProcessKernelLabel => "Android OS",
            Self::ProcessMediaserverLabel => "Mediaserver",
        }
    }
}

/// Drawables used by entry resolution.
///
/// The numeric id is what the detail screen receives as the entry's icon id.
#[allow(missing_docs)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DrawableRes {
    PhoneIdle,
    CellStandby,
    VoiceCalls,
    Wifi,
    Bluetooth,
    Display,
    PowerSystem,
}

impl DrawableRes {
    /// Stable, non-zero resource id.
    #[must_use]
    pub const fn id(self) -> u32 {
        match self {
            Self::PhoneIdle => 0x7f02_0001,
            Self::CellStandby => 0x7f02_0002,
            Self::VoiceCalls => 0x7f02_0003,
            Self::Wifi => 0x7f02_0004,
            Self::Bluetooth => 0x7f02_0005,
            Self::Display => 0x7f02_0006,
            Self::PowerSystem => 0x7f02_0007,
        }
    }
}

/// Handle to a loaded image.
///
/// Handles are cheap to clone and compare; the actual pixels live with the
/// platform that produced them.
#[allow(missing_docs)]
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Icon {
    /// A bundled drawable.
    Drawable {
        res: DrawableRes,
    },
    /// An icon declared by an installed package.
    Package {
        package: String,
        resource: u32,
    },
    /// A user's avatar.
    User {
        user: UserId,
    },
    /// The platform's generic application icon.
    DefaultActivity,
}

impl fmt::Display for Icon {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Drawable { res } => write!(f, "drawable:{:#x}", res.id()),
            Self::Package { package, resource } => write!(f, "package:{package}/{resource:#x}"),
            Self::User { user } => write!(f, "user:{user}"),
            Self::DefaultActivity => f.write_str("default-activity"),
        }
    }
}

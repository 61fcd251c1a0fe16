//! Collaborator traits for the OS surfaces entry resolution depends on.
//!
//! These traits define the contract a platform binding must implement:
//! - resource strings and drawables
//! - user profile records
//! - installed packages grouped by owner id
//!
//! Implementations must be safe to call from the loader thread and the
//! caller thread concurrently.

use serde::{Deserialize, Serialize};

use crate::error::LookupError;
use crate::resources::{DrawableRes, Icon, StringRes};
use crate::sipper::{OwnerId, UserId};

/// An OS user profile record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserInfo {
    /// User id.
    pub id: UserId,
    /// Display name, if the profile has one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
}

/// Application record for one installed package.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApplicationInfo {
    /// Package name.
    pub package_name: String,
    /// User-visible application label.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
    /// Declared icon resource; zero when the package declares none.
    #[serde(default)]
    pub icon: u32,
}

/// Package record for one installed package.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PackageInfo {
    /// Package name.
    pub package_name: String,
    /// Shared-owner label resource; zero when none is declared.
    #[serde(default)]
    pub shared_user_label: u32,
    /// The package's application record.
    pub application_info: ApplicationInfo,
}

/// Resource strings and drawables.
pub trait ResourceProvider: Send + Sync {
    /// Returns the display text for `id`.
    fn string(&self, id: StringRes) -> String;

    /// Returns the display text for `id` with its `%1$s` placeholder replaced.
    fn format_string(&self, id: StringRes, arg: &str) -> String {
        self.string(id).replace("%1$s", arg)
    }

    /// Loads a bundled drawable.
    fn drawable(&self, id: DrawableRes) -> Icon {
        Icon::Drawable { res: id }
    }
}

/// User profile lookup.
pub trait UserDirectory: Send + Sync {
    /// Returns the user record, or `None` if the user was removed.
    fn user_info(&self, id: UserId) -> Option<UserInfo>;

    /// Returns the user's avatar.
    fn user_icon(&self, info: &UserInfo) -> Option<Icon> {
        Some(Icon::User { user: info.id })
    }
}

/// Installed package lookup.
pub trait PackageDirectory: Send + Sync {
    /// Package names owned by `owner`, or `None` for owners without packages.
    fn packages_for_owner(&self, owner: OwnerId) -> Option<Vec<String>>;

    /// Application record for `package`.
    ///
    /// # Errors
    /// - `PackageNotFound`: the package is not installed
    fn application_info(&self, package: &str) -> Result<ApplicationInfo, LookupError>;

    /// Package record for `package`.
    ///
    /// # Errors
    /// - `PackageNotFound`: the package is not installed
    fn package_info(&self, package: &str) -> Result<PackageInfo, LookupError>;

    /// Resolves a string resource declared by `package`.
    fn text(&self, package: &str, resource: u32, app: &ApplicationInfo) -> Option<String>;

    /// Loads the user-visible label of an application.
    fn load_label(&self, app: &ApplicationInfo) -> Option<String> {
        app.label.clone()
    }

    /// Loads the declared icon of an application.
    fn load_icon(&self, app: &ApplicationInfo) -> Icon {
        if app.icon == 0 {
            return self.default_activity_icon();
        }
        Icon::Package {
            package: app.package_name.clone(),
            resource: app.icon,
        }
    }

    /// The generic application icon.
    fn default_activity_icon(&self) -> Icon {
        Icon::DefaultActivity
    }
}

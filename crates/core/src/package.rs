use crate::ids::{ContentType, TitleId};
use serde::{Deserialize, Serialize};

/// Metadata for one piece of content inside a package file.
///
/// A regular package yields exactly one of these; a multi-content package
/// (for example a cartridge image bundling the base game and an update)
/// yields one per title it carries.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PackageInfo {
    pub title_id: TitleId,
    /// Revision number. Updates count up in steps of `0x10000`; base packages
    /// are revision `0`.
    pub version: u32,
    pub content_type: ContentType,
    /// Display name embedded in the package, if the introspector found one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// Human-readable version string (e.g. `"1.0.2"`), if known.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub display_version: Option<String>,
}

impl PackageInfo {
    /// Builds package metadata with the content type derived from the identifier.
    pub fn new(title_id: TitleId, version: u32) -> Self {
        let content_type = title_id.content_type();
        Self {
            title_id,
            version,
            content_type,
            name: None,
            display_version: None,
        }
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn with_display_version(mut self, display_version: impl Into<String>) -> Self {
        self.display_version = Some(display_version.into());
        self
    }
}

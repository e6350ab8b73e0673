//! Environment captured alongside a workspace history

use serde::{Deserialize, Serialize};
use std::fmt::{self, Display, Formatter};

/// Framework and host details recorded when a history is created
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EnvironmentHistory {
    framework_version: String,
    os_name: String,
    os_arch: String,
    user_name: String,
}

impl EnvironmentHistory {
    /// Capture the current process environment
    #[must_use]
    pub fn capture() -> Self {
        let user_name = std::env::var("USER")
            .or_else(|_| std::env::var("USERNAME"))
            .unwrap_or_default();
        Self {
            framework_version: crate::VERSION.to_string(),
            os_name: std::env::consts::OS.to_string(),
            os_arch: std::env::consts::ARCH.to_string(),
            user_name,
        }
    }

    /// Framework version string
    #[inline]
    #[must_use]
    pub fn framework_version(&self) -> &str {
        &self.framework_version
    }

    /// Operating system name
    #[inline]
    #[must_use]
    pub fn os_name(&self) -> &str {
        &self.os_name
    }

    /// CPU architecture
    #[inline]
    #[must_use]
    pub fn os_arch(&self) -> &str {
        &self.os_arch
    }

    /// User that created the history
    #[inline]
    #[must_use]
    pub fn user_name(&self) -> &str {
        &self.user_name
    }
}

impl Default for EnvironmentHistory {
    fn default() -> Self {
        Self::capture()
    }
}

impl Display for EnvironmentHistory {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        writeln!(f, "Framework Version: {}", self.framework_version)?;
        writeln!(f, "OS name: {}", self.os_name)?;
        writeln!(f, "OS version: {}", self.os_arch)?;
        writeln!(f, "username: {}", self.user_name)
    }
}

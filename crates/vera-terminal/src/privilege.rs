//! Elevated-privilege detection.
//!
//! The probe is consulted once per process; everything downstream receives
//! the answer as a plain `bool`. Any failure to determine the privilege
//! level counts as unprivileged.

use tracing::debug;

/// Capability that answers "are we running as root / administrator?".
pub trait PrivilegeProbe: Send + Sync {
    fn has_elevated_privilege(&self) -> bool;
}

/// Asks the operating system.
#[derive(Debug, Clone, Copy, Default)]
pub struct OsPrivilegeProbe;

impl PrivilegeProbe for OsPrivilegeProbe {
    fn has_elevated_privilege(&self) -> bool {
        let elevated = os_is_elevated();
        debug!(elevated, "privilege probe");
        elevated
    }
}

/// Fixed answer, for tests and for callers that resolved privilege elsewhere.
#[derive(Debug, Clone, Copy)]
pub struct StaticPrivilege(pub bool);

impl PrivilegeProbe for StaticPrivilege {
    fn has_elevated_privilege(&self) -> bool {
        self.0
    }
}

#[cfg(unix)]
fn os_is_elevated() -> bool {
    // Safety: geteuid has no preconditions and cannot fail.
    unsafe { libc::geteuid() == 0 }
}

#[cfg(windows)]
fn os_is_elevated() -> bool {
    // Safety: IsUserAnAdmin takes no arguments; a zero return covers both
    // "not admin" and "query failed".
    unsafe { windows_sys::Win32::UI::Shell::IsUserAnAdmin() != 0 }
}

#[cfg(not(any(unix, windows)))]
fn os_is_elevated() -> bool {
    false
}

// ---------------------------------------------------------------------------
// PrivilegeMode
// ---------------------------------------------------------------------------

/// Presentation of the resolved privilege level for the front-end banner.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PrivilegeMode {
    pub elevated: bool,
}

impl PrivilegeMode {
    pub fn new(elevated: bool) -> Self {
        Self { elevated }
    }

    pub fn detect(probe: &dyn PrivilegeProbe) -> Self {
        Self::new(probe.has_elevated_privilege())
    }

    pub fn label(&self) -> &'static str {
        if self.elevated {
            "🔓 ADMIN MODE"
        } else {
            "🔒 CLIENT MODE"
        }
    }

    pub fn message(&self) -> &'static str {
        if self.elevated {
            "Admin mode activated. I have full system access."
        } else {
            "Running in client mode. System commands require admin privileges."
        }
    }
}

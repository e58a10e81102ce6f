//! Named shared memory objects, one backend per platform
//!
//! Everything above this module is platform independent: the writer only talks
//! to a [`SegmentBackend`]. The backend owns both the OS object handle and the
//! mapping, and releases them (plus the name, for owners) when dropped.

use crate::error::{Result, SynapseError};

#[cfg(unix)]
mod posix;
#[cfg(windows)]
mod windows;

#[cfg(unix)]
pub use posix::PosixSegment;
#[cfg(windows)]
pub use windows::WindowsSegment;

/// Backend selected for the current build target
#[cfg(unix)]
pub type PlatformSegment = PosixSegment;
/// Backend selected for the current build target
#[cfg(windows)]
pub type PlatformSegment = WindowsSegment;

/// Longest accepted segment name.
///
/// POSIX allows `NAME_MAX` (255) bytes including the leading `/`.
#[cfg(all(unix, not(target_os = "macos")))]
pub const MAX_NAME_LEN: usize = 254;
/// Longest accepted segment name.
///
/// macOS caps shm names at `PSHMNAMLEN` (31) bytes including the leading `/`.
#[cfg(target_os = "macos")]
pub const MAX_NAME_LEN: usize = 30;
/// Longest accepted segment name.
#[cfg(windows)]
pub const MAX_NAME_LEN: usize = 260;

/// A validated segment name, as given by the caller (no platform prefix)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SegmentName(String);

impl SegmentName {
    pub fn new(name: &str) -> Result<Self> {
        let invalid = |reason| SynapseError::InvalidName {
            name: name.to_string(),
            reason,
        };

        if name.is_empty() {
            return Err(invalid("empty"));
        }
        if name.contains('\0') {
            return Err(invalid("contains NUL"));
        }
        if name.contains('/') {
            return Err(invalid("contains '/'"));
        }
        if name.len() > MAX_NAME_LEN {
            return Err(SynapseError::NameTooLong {
                max: MAX_NAME_LEN,
                got: name.len(),
            });
        }

        Ok(Self(name.to_string()))
    }

    #[inline]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for SegmentName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Whether dropping a handle removes the name from the OS namespace
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Ownership {
    /// Removes the name on drop
    Owner,
    /// Non-owning view, leaves the name in place
    Borrowed,
}

/// Lifecycle of one named, mapped shared memory object
///
/// Implementations map exactly `len` bytes read/write. Dropping the value
/// unmaps, closes the handle, and, for [`Ownership::Owner`], removes the name.
pub trait SegmentBackend: Sized {
    /// Create a new object of `len` bytes; fails with
    /// [`SynapseError::SegmentRemoveRace`] if the name is already taken.
    fn create_exclusive(name: &SegmentName, len: usize) -> Result<Self>;

    /// Open and map an existing object.
    ///
    /// An owner grows the object to `len` if it is smaller.
    fn open_existing(name: &SegmentName, len: usize, ownership: Ownership) -> Result<Self>;

    /// Remove the name from the OS namespace.
    ///
    /// Returns `true` if an object was removed.
    fn remove(name: &SegmentName) -> Result<bool>;

    /// Base address of the mapping
    fn as_ptr(&self) -> *mut u8;

    /// Mapped length in bytes
    fn len(&self) -> usize;
}

/// Remove a stale segment left behind by a crashed writer
///
/// Returns `true` if an object was removed. A no-op on Windows, where named
/// mappings vanish with their last handle.
pub fn remove_segment(name: &str) -> Result<bool> {
    let name = SegmentName::new(name)?;
    PlatformSegment::remove(&name)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_name_validation() {
        assert!(SegmentName::new("ArgusShm").is_ok());
        assert!(matches!(
            SegmentName::new(""),
            Err(SynapseError::InvalidName { .. })
        ));
        assert!(matches!(
            SegmentName::new("a/b"),
            Err(SynapseError::InvalidName { .. })
        ));
        assert!(matches!(
            SegmentName::new("a\0b"),
            Err(SynapseError::InvalidName { .. })
        ));

        let long = "x".repeat(MAX_NAME_LEN + 1);
        assert!(matches!(
            SegmentName::new(&long),
            Err(SynapseError::NameTooLong { got, .. }) if got == MAX_NAME_LEN + 1
        ));
        assert!(SegmentName::new(&long[1..]).is_ok());
    }

    #[cfg(target_os = "macos")]
    #[test]
    fn test_macos_short_name_limit() {
        // "/" plus 31 bytes exceeds PSHMNAMLEN
        assert!(matches!(
            SegmentName::new(&"n".repeat(31)),
            Err(SynapseError::NameTooLong { max: 30, got: 31 })
        ));
        assert!(SegmentName::new(&"n".repeat(30)).is_ok());
    }

    #[test]
    fn test_remove_missing_segment() {
        let name = format!("syn_missing_{}", std::process::id());
        assert!(!remove_segment(&name).unwrap());
    }
}

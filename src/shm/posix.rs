//! POSIX shared memory (`shm_open` + `mmap`)

use super::{Ownership, SegmentBackend, SegmentName};
use crate::error::{Result, SynapseError};
use rustix::fd::OwnedFd;
use rustix::fs::{fstat, ftruncate};
use rustix::io::Errno;
use rustix::mm::{mmap, munmap, MapFlags, ProtFlags};
use rustix::shm::{shm_open, shm_unlink, Mode, ShmOFlags};
use std::ffi::CString;
use std::io;
use std::ptr::NonNull;
use tracing::debug;

/// Object name in the POSIX namespace: `/` followed by the segment name
fn os_name(name: &SegmentName) -> Result<CString> {
    CString::new(format!("/{}", name)).map_err(|_| SynapseError::InvalidName {
        name: name.to_string(),
        reason: "contains NUL",
    })
}

/// Open descriptor, unlinking the name on drop when owned
struct NamedFd {
    fd: OwnedFd,
    os_name: CString,
    ownership: Ownership,
}

impl Drop for NamedFd {
    fn drop(&mut self) {
        if self.ownership == Ownership::Owner {
            match shm_unlink(self.os_name.as_c_str()) {
                Ok(()) | Err(Errno::NOENT) => {}
                Err(e) => debug!(name = ?self.os_name, error = %e, "shm_unlink failed"),
            }
        }
    }
}

struct Mapping {
    addr: NonNull<u8>,
    len: usize,
}

impl Mapping {
    fn new(fd: &OwnedFd, len: usize) -> Result<Self> {
        let addr = unsafe {
            mmap(
                std::ptr::null_mut(),
                len,
                ProtFlags::READ | ProtFlags::WRITE,
                MapFlags::SHARED,
                fd,
                0,
            )
            .map_err(|e| SynapseError::Mmap(e.into()))?
        };

        let addr = NonNull::new(addr.cast::<u8>()).ok_or_else(|| {
            SynapseError::Mmap(io::Error::new(io::ErrorKind::Other, "mmap returned null"))
        })?;

        Ok(Self { addr, len })
    }
}

impl Drop for Mapping {
    fn drop(&mut self) {
        unsafe {
            let _ = munmap(self.addr.as_ptr().cast(), self.len);
        }
    }
}

/// Mapped POSIX shared memory object
pub struct PosixSegment {
    // Unmapped before the descriptor is closed and the name unlinked.
    map: Mapping,
    #[allow(dead_code)]
    fd: NamedFd,
}

// SAFETY: the mapping is plain shared memory, not tied to the creating thread
unsafe impl Send for PosixSegment {}

impl SegmentBackend for PosixSegment {
    fn create_exclusive(name: &SegmentName, len: usize) -> Result<Self> {
        let os_name = os_name(name)?;

        let fd = match shm_open(
            os_name.as_c_str(),
            ShmOFlags::CREATE | ShmOFlags::EXCL | ShmOFlags::RDWR,
            Mode::RUSR | Mode::WUSR | Mode::RGRP | Mode::WGRP | Mode::ROTH,
        ) {
            Ok(fd) => fd,
            Err(Errno::EXIST) => {
                return Err(SynapseError::SegmentRemoveRace {
                    name: name.to_string(),
                })
            }
            Err(e) => {
                return Err(SynapseError::SegmentCreateFailed {
                    name: name.to_string(),
                    source: e.into(),
                })
            }
        };

        // From here on a failure unlinks the half-built object.
        let fd = NamedFd {
            fd,
            os_name,
            ownership: Ownership::Owner,
        };

        ftruncate(&fd.fd, len as u64).map_err(|e| SynapseError::Truncate(e.into()))?;
        let map = Mapping::new(&fd.fd, len)?;

        Ok(Self { map, fd })
    }

    fn open_existing(name: &SegmentName, len: usize, ownership: Ownership) -> Result<Self> {
        let os_name = os_name(name)?;
        let open_failed = |e: Errno| SynapseError::SegmentOpenFailed {
            name: name.to_string(),
            source: e.into(),
        };

        let fd = shm_open(os_name.as_c_str(), ShmOFlags::RDWR, Mode::empty())
            .map_err(open_failed)?;
        let fd = NamedFd {
            fd,
            os_name,
            ownership,
        };

        let size = fstat(&fd.fd).map_err(open_failed)?.st_size as u64;
        if size < len as u64 {
            match ownership {
                Ownership::Owner => {
                    ftruncate(&fd.fd, len as u64).map_err(|e| SynapseError::Truncate(e.into()))?
                }
                // Touching pages past the end of the object would fault.
                Ownership::Borrowed => {
                    return Err(SynapseError::SegmentOpenFailed {
                        name: name.to_string(),
                        source: io::Error::new(
                            io::ErrorKind::InvalidInput,
                            format!("object is {size} bytes, {len} requested"),
                        ),
                    })
                }
            }
        }

        let map = Mapping::new(&fd.fd, len)?;
        Ok(Self { map, fd })
    }

    fn remove(name: &SegmentName) -> Result<bool> {
        let os_name = os_name(name)?;
        match shm_unlink(os_name.as_c_str()) {
            Ok(()) => Ok(true),
            Err(Errno::NOENT) => Ok(false),
            Err(e) => Err(SynapseError::SegmentRemove {
                name: name.to_string(),
                source: e.into(),
            }),
        }
    }

    #[inline(always)]
    fn as_ptr(&self) -> *mut u8 {
        self.map.addr.as_ptr()
    }

    #[inline(always)]
    fn len(&self) -> usize {
        self.map.len
    }
}

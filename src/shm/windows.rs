//! Windows named file mappings backed by the paging file

use super::{Ownership, SegmentBackend, SegmentName};
use crate::error::{Result, SynapseError};
use std::io;
use std::ptr::NonNull;
use windows_sys::Win32::Foundation::{
    CloseHandle, GetLastError, ERROR_ALREADY_EXISTS, HANDLE, INVALID_HANDLE_VALUE,
};
use windows_sys::Win32::System::Memory::{
    CreateFileMappingW, MapViewOfFile, OpenFileMappingW, UnmapViewOfFile, FILE_MAP_ALL_ACCESS,
    MEMORY_MAPPED_VIEW_ADDRESS, PAGE_READWRITE,
};

fn wide_name(name: &SegmentName) -> Vec<u16> {
    name.as_str().encode_utf16().chain(std::iter::once(0)).collect()
}

struct MappingHandle(HANDLE);

impl Drop for MappingHandle {
    fn drop(&mut self) {
        unsafe {
            CloseHandle(self.0);
        }
    }
}

struct View {
    addr: NonNull<u8>,
    len: usize,
}

impl View {
    fn new(handle: &MappingHandle, len: usize) -> Result<Self> {
        let view = unsafe { MapViewOfFile(handle.0, FILE_MAP_ALL_ACCESS, 0, 0, len) };
        let addr = NonNull::new(view.Value.cast::<u8>())
            .ok_or_else(|| SynapseError::Mmap(io::Error::last_os_error()))?;
        Ok(Self { addr, len })
    }
}

impl Drop for View {
    fn drop(&mut self) {
        unsafe {
            UnmapViewOfFile(MEMORY_MAPPED_VIEW_ADDRESS {
                Value: self.addr.as_ptr().cast(),
            });
        }
    }
}

/// Mapped Windows file mapping object
///
/// The kernel object lives until its last handle closes, so there is no name
/// to remove and [`Ownership`] has no effect.
pub struct WindowsSegment {
    // Unmapped before the handle is closed.
    view: View,
    #[allow(dead_code)]
    handle: MappingHandle,
}

// SAFETY: the view and handle are process-wide, not tied to the creating thread
unsafe impl Send for WindowsSegment {}

impl SegmentBackend for WindowsSegment {
    fn create_exclusive(name: &SegmentName, len: usize) -> Result<Self> {
        let wide = wide_name(name);
        let size = len as u64;

        let raw = unsafe {
            CreateFileMappingW(
                INVALID_HANDLE_VALUE,
                std::ptr::null(),
                PAGE_READWRITE,
                (size >> 32) as u32,
                size as u32,
                wide.as_ptr(),
            )
        };
        if raw.is_null() {
            return Err(SynapseError::SegmentCreateFailed {
                name: name.to_string(),
                source: io::Error::last_os_error(),
            });
        }

        // CreateFileMappingW hands back the existing object instead of failing.
        let already_exists = unsafe { GetLastError() } == ERROR_ALREADY_EXISTS;
        let handle = MappingHandle(raw);
        if already_exists {
            return Err(SynapseError::SegmentRemoveRace {
                name: name.to_string(),
            });
        }

        let view = View::new(&handle, len)?;
        Ok(Self { view, handle })
    }

    fn open_existing(name: &SegmentName, len: usize, _ownership: Ownership) -> Result<Self> {
        let wide = wide_name(name);

        let raw = unsafe { OpenFileMappingW(FILE_MAP_ALL_ACCESS, 0, wide.as_ptr()) };
        if raw.is_null() {
            return Err(SynapseError::SegmentOpenFailed {
                name: name.to_string(),
                source: io::Error::last_os_error(),
            });
        }
        let handle = MappingHandle(raw);

        // A section cannot grow; mapping past its end fails here.
        let view = View::new(&handle, len)?;
        Ok(Self { view, handle })
    }

    fn remove(_name: &SegmentName) -> Result<bool> {
        Ok(false)
    }

    #[inline(always)]
    fn as_ptr(&self) -> *mut u8 {
        self.view.addr.as_ptr()
    }

    #[inline(always)]
    fn len(&self) -> usize {
        self.view.len
    }
}

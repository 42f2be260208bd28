//! Type definitions and RAII wrappers for the Windows platform

use windows::Win32::Foundation::{CloseHandle, HANDLE};
use windows::Win32::System::Com::IDispatch;

/// RAII wrapper for Windows HANDLE that ensures proper cleanup
pub(crate) struct HandleGuard(pub(crate) HANDLE);

impl Drop for HandleGuard {
    fn drop(&mut self) {
        unsafe {
            if !self.0.is_invalid() {
                let _ = CloseHandle(self.0);
            }
        }
    }
}

/// Thread-safe wrapper for a scripting object's `IDispatch`
#[derive(Clone)]
pub(crate) struct ThreadSafeDispatch(pub(crate) IDispatch);

// Safety: SAP GUI objects live in the saplogon process and every call is
// marshalled by COM; access is serialised through the owning mutex.
unsafe impl Send for ThreadSafeDispatch {}
unsafe impl Sync for ThreadSafeDispatch {}

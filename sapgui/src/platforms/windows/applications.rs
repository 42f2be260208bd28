//! Process lookup for the SAP Logon host

use super::types::HandleGuard;
use crate::errors::SapError;
use tracing::debug;
use windows::Win32::System::Diagnostics::ToolHelp::{
    CreateToolhelp32Snapshot, Process32FirstW, Process32NextW, PROCESSENTRY32W, TH32CS_SNAPPROCESS,
};

/// True when a process whose image name matches `executable` is running.
/// The comparison ignores case and a trailing `.exe`.
pub(crate) fn is_process_running(executable: &str) -> Result<bool, SapError> {
    let wanted = normalize(executable);
    unsafe {
        let snapshot = CreateToolhelp32Snapshot(TH32CS_SNAPPROCESS, 0).map_err(|e| {
            SapError::Platform(format!("Failed to create process snapshot: {e}"))
        })?;

        if snapshot.is_invalid() {
            return Err(SapError::Platform("Invalid snapshot handle".to_string()));
        }

        // Ensure we close the handle when done
        let _guard = HandleGuard(snapshot);

        let mut process_entry = PROCESSENTRY32W {
            dwSize: std::mem::size_of::<PROCESSENTRY32W>() as u32,
            ..Default::default()
        };

        if Process32FirstW(snapshot, &mut process_entry).is_err() {
            return Err(SapError::Platform(
                "Failed to get first process".to_string(),
            ));
        }

        loop {
            let name_slice = &process_entry.szExeFile;
            let name_len = name_slice
                .iter()
                .position(|&c| c == 0)
                .unwrap_or(name_slice.len());
            let process_name = String::from_utf16_lossy(&name_slice[..name_len]);

            if normalize(&process_name) == wanted {
                debug!(
                    "Found {} (PID {})",
                    process_name, process_entry.th32ProcessID
                );
                return Ok(true);
            }

            if Process32NextW(snapshot, &mut process_entry).is_err() {
                break;
            }
        }
    }
    Ok(false)
}

fn normalize(name: &str) -> String {
    let lower = name.trim().to_lowercase();
    lower
        .strip_suffix(".exe")
        .map(str::to_string)
        .unwrap_or(lower)
}

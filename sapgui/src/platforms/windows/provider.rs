use super::applications::is_process_running;
use super::dispatch::ComObject;
use crate::config::SessionConfig;
use crate::errors::SapError;
use crate::platforms::{ForeignHandle, ScriptingProvider};
use crate::utils::{poll_until, CancellationToken};
use std::process::Command;
use std::time::Duration;
use tracing::{debug, info, warn};
use windows::core::{IUnknown, Interface, GUID, HRESULT};
use windows::Win32::System::Com::{CoInitializeEx, IDispatch, COINIT_MULTITHREADED};
use windows::Win32::System::Ole::GetActiveObject;

/// Class id SAP GUI registers in the running object table.
const CLSID_SAP_GUI_APPLICATION: GUID = GUID::from_u128(0xb90f32ad_859e_4173_a04e_3f844f358ca2);
const MK_E_UNAVAILABLE: i32 = 0x8004_01E3_u32 as i32;
const RPC_E_CHANGED_MODE: HRESULT = HRESULT(0x80010106u32 as i32);

/// Scripting provider backed by the SAP GUI COM automation interface.
pub struct ComProvider {
    host_executable: String,
    startup_timeout: Duration,
    poll_interval: Duration,
}

impl ComProvider {
    pub fn new(config: &SessionConfig) -> Result<Self, SapError> {
        initialize_com()?;
        Ok(Self {
            host_executable: config.host_executable.clone(),
            startup_timeout: config.host_startup_timeout,
            poll_interval: config.poll_interval,
        })
    }

    fn running_application(&self) -> Result<Option<ForeignHandle>, SapError> {
        initialize_com()?;
        let mut unknown: Option<IUnknown> = None;
        match unsafe { GetActiveObject(&CLSID_SAP_GUI_APPLICATION, None, &mut unknown) } {
            Ok(()) => {}
            Err(e) if e.code().0 == MK_E_UNAVAILABLE => return Ok(None),
            Err(e) => {
                return Err(SapError::Platform(format!(
                    "GetActiveObject for SAP GUI failed: {e}"
                )))
            }
        }
        let Some(unknown) = unknown else {
            return Ok(None);
        };
        let dispatch: IDispatch = unknown.cast().map_err(|e| {
            SapError::Platform(format!("SAP GUI object does not support IDispatch: {e}"))
        })?;
        Ok(Some(ComObject::new(dispatch, "SAPGUI").into_handle()))
    }
}

impl ScriptingProvider for ComProvider {
    /// Attaches to a running SAP GUI, starting SAP Logon when it is not
    /// running and waiting up to the configured startup timeout.
    fn application_root(&self) -> Result<Option<ForeignHandle>, SapError> {
        if let Some(root) = self.running_application()? {
            return Ok(Some(root));
        }

        if is_process_running(&self.host_executable)? {
            debug!(
                "{} is running but scripting is not registered yet",
                self.host_executable
            );
        } else {
            info!("SAP GUI not running; starting {}", self.host_executable);
            let child = Command::new(&self.host_executable).spawn().map_err(|e| {
                SapError::Platform(format!(
                    "Failed to start {}; check PATH or configure the full path: {e}",
                    self.host_executable
                ))
            })?;
            debug!("Started {} (PID {})", self.host_executable, child.id());
        }

        match poll_until(
            self.startup_timeout,
            self.poll_interval,
            &CancellationToken::new(),
            "wait for SAP GUI scripting",
            || self.running_application(),
        ) {
            Ok(root) => Ok(Some(root)),
            Err(SapError::Timeout(message)) => {
                warn!("SAP GUI scripting unavailable: {}", message);
                Ok(None)
            }
            Err(e) => Err(e),
        }
    }
}

fn initialize_com() -> Result<(), SapError> {
    unsafe {
        let hr = CoInitializeEx(None, COINIT_MULTITHREADED);
        if hr.is_err() && hr != RPC_E_CHANGED_MODE {
            return Err(SapError::Platform(format!(
                "Failed to initialize COM: {hr}"
            )));
        }
        if hr == RPC_E_CHANGED_MODE {
            debug!("COM already initialized in this thread");
        }
    }
    Ok(())
}

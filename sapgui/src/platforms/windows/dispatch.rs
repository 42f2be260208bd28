//! `IDispatch` binding of [`ForeignObject`]

use super::types::ThreadSafeDispatch;
use crate::errors::{SapError, DISP_E_UNKNOWNNAME};
use crate::platforms::{ForeignHandle, ForeignObject, Variant};
use std::collections::HashMap;
use std::ptr::null_mut;
use std::sync::Mutex;
use tracing::{debug, trace};
use windows::core::{IUnknown, Interface, BSTR, GUID, HSTRING, PCWSTR};
use windows::Win32::System::Com::{
    IDispatch, DISPATCH_FLAGS, DISPATCH_METHOD, DISPATCH_PROPERTYGET, DISPATCH_PROPERTYPUT,
    DISPPARAMS, EXCEPINFO,
};
use windows::Win32::System::Variant::{
    VARIANT, VT_BOOL, VT_BSTR, VT_DISPATCH, VT_EMPTY, VT_NULL, VT_UNKNOWN,
};

const LOCALE_USER_DEFAULT: u32 = 0x0400;
const DISPID_PROPERTYPUT: i32 = -3;
const DISP_E_EXCEPTION: i32 = 0x8002_0009_u32 as i32;

/// A scripting object reached through late-bound `IDispatch` calls.
///
/// Member ids are resolved once per name and cached. Releasing drops the
/// interface pointer; later calls fail with [`SapError::HandleReleased`].
pub(crate) struct ComObject {
    dispatch: Mutex<Option<ThreadSafeDispatch>>,
    label: String,
    dispids: Mutex<HashMap<String, i32>>,
}

impl ComObject {
    pub(crate) fn new(dispatch: IDispatch, label: impl Into<String>) -> Self {
        Self {
            dispatch: Mutex::new(Some(ThreadSafeDispatch(dispatch))),
            label: label.into(),
            dispids: Mutex::new(HashMap::new()),
        }
    }

    pub(crate) fn into_handle(self) -> ForeignHandle {
        ForeignHandle::new(self)
    }

    fn dispatch(&self, operation: &str) -> Result<IDispatch, SapError> {
        let guard = self
            .dispatch
            .lock()
            .map_err(|_| SapError::Platform(format!("{} lock poisoned", self.label)))?;
        guard
            .as_ref()
            .map(|d| d.0.clone())
            .ok_or_else(|| SapError::HandleReleased(format!("{operation} on {}", self.label)))
    }

    fn dispid(&self, dispatch: &IDispatch, name: &str) -> Result<i32, SapError> {
        if let Some(id) = self
            .dispids
            .lock()
            .ok()
            .and_then(|ids| ids.get(name).copied())
        {
            return Ok(id);
        }

        let wide = HSTRING::from(name);
        let names = [PCWSTR(wide.as_ptr())];
        let mut id = 0i32;
        let result = unsafe {
            dispatch.GetIDsOfNames(
                &GUID::zeroed(),
                names.as_ptr(),
                1,
                LOCALE_USER_DEFAULT,
                &mut id,
            )
        };
        match result {
            Ok(()) => {
                if let Ok(mut ids) = self.dispids.lock() {
                    ids.insert(name.to_string(), id);
                }
                Ok(id)
            }
            Err(e) if e.code().0 == DISP_E_UNKNOWNNAME => Err(SapError::MemberNotFound {
                member: name.to_string(),
                target: self.label.clone(),
            }),
            Err(e) => Err(SapError::Transport {
                operation: format!("resolve {name}"),
                target: self.label.clone(),
                message: e.message().to_string(),
                code: Some(e.code().0),
            }),
        }
    }

    fn invoke(
        &self,
        name: &str,
        flags: DISPATCH_FLAGS,
        args: &[Variant],
    ) -> Result<Variant, SapError> {
        let dispatch = self.dispatch(name)?;
        let id = self.dispid(&dispatch, name)?;
        let put = flags == DISPATCH_PROPERTYPUT;

        // IDispatch takes arguments right to left.
        let mut raw = args
            .iter()
            .rev()
            .map(|arg| to_variant(name, arg))
            .collect::<Result<Vec<VARIANT>, SapError>>()?;
        let mut named = [DISPID_PROPERTYPUT];
        let params = DISPPARAMS {
            rgvarg: if raw.is_empty() {
                null_mut()
            } else {
                raw.as_mut_ptr()
            },
            rgdispidNamedArgs: if put { named.as_mut_ptr() } else { null_mut() },
            cArgs: raw.len() as u32,
            cNamedArgs: u32::from(put),
        };

        let mut result = VARIANT::default();
        let mut exception = EXCEPINFO::default();
        let mut arg_error = 0u32;
        trace!("Invoking {}.{} ({} args)", self.label, name, args.len());
        let outcome = unsafe {
            dispatch.Invoke(
                id,
                &GUID::zeroed(),
                LOCALE_USER_DEFAULT,
                flags,
                &params,
                Some(&mut result as *mut VARIANT),
                Some(&mut exception as *mut EXCEPINFO),
                Some(&mut arg_error as *mut u32),
            )
        };

        match outcome {
            Ok(()) => from_variant(&result, name, &self.label),
            Err(e) if e.code().0 == DISP_E_UNKNOWNNAME => Err(SapError::MemberNotFound {
                member: name.to_string(),
                target: self.label.clone(),
            }),
            Err(e) if e.code().0 == DISP_E_EXCEPTION => {
                let description = exception.bstrDescription.to_string();
                let code = if exception.scode != 0 {
                    exception.scode
                } else {
                    e.code().0
                };
                Err(SapError::Transport {
                    operation: name.to_string(),
                    target: self.label.clone(),
                    message: if description.is_empty() {
                        e.message().to_string()
                    } else {
                        description
                    },
                    code: Some(code),
                })
            }
            Err(e) => Err(SapError::Transport {
                operation: name.to_string(),
                target: self.label.clone(),
                message: e.message().to_string(),
                code: Some(e.code().0),
            }),
        }
    }
}

impl ForeignObject for ComObject {
    fn get(&self, name: &str) -> Result<Variant, SapError> {
        self.invoke(
            name,
            DISPATCH_FLAGS(DISPATCH_METHOD.0 | DISPATCH_PROPERTYGET.0),
            &[],
        )
    }

    fn put(&self, name: &str, value: Variant) -> Result<(), SapError> {
        self.invoke(name, DISPATCH_PROPERTYPUT, &[value]).map(|_| ())
    }

    fn call(&self, name: &str, args: &[Variant]) -> Result<Variant, SapError> {
        // Collections answer `Item(i)` style calls through the property-get path too.
        self.invoke(
            name,
            DISPATCH_FLAGS(DISPATCH_METHOD.0 | DISPATCH_PROPERTYGET.0),
            args,
        )
    }

    fn exposes(&self, name: &str) -> Result<bool, SapError> {
        let dispatch = self.dispatch(name)?;
        match self.dispid(&dispatch, name) {
            Ok(_) => Ok(true),
            Err(SapError::MemberNotFound { .. }) => Ok(false),
            Err(e) => Err(e),
        }
    }

    fn release(&self) {
        if let Ok(mut guard) = self.dispatch.lock() {
            if guard.take().is_some() {
                debug!("Released COM reference {}", self.label);
            }
        }
    }

    fn is_released(&self) -> bool {
        self.dispatch.lock().map(|g| g.is_none()).unwrap_or(true)
    }

    /// The component id when the object has one, else where it was obtained.
    fn describe(&self) -> String {
        if self.is_released() {
            return self.label.clone();
        }
        match self.get("Id") {
            Ok(Variant::Str(id)) if !id.is_empty() => id,
            _ => self.label.clone(),
        }
    }
}

fn to_variant(member: &str, value: &Variant) -> Result<VARIANT, SapError> {
    Ok(match value {
        Variant::Empty => VARIANT::default(),
        Variant::Bool(b) => VARIANT::from(*b),
        Variant::Int(i) => match i32::try_from(*i) {
            Ok(small) => VARIANT::from(small),
            Err(_) => VARIANT::from(*i),
        },
        Variant::Str(s) => VARIANT::from(BSTR::from(s.as_str())),
        Variant::Object(_) => {
            return Err(SapError::InvalidArgument(format!(
                "object arguments are not supported for '{member}'"
            )))
        }
    })
}

fn from_variant(value: &VARIANT, member: &str, owner: &str) -> Result<Variant, SapError> {
    let vt = value.vt();
    if vt == VT_EMPTY || vt == VT_NULL {
        return Ok(Variant::Empty);
    }
    if vt == VT_BOOL {
        return bool::try_from(value)
            .map(Variant::Bool)
            .map_err(|e| unexpected(member, e));
    }
    if vt == VT_BSTR {
        return BSTR::try_from(value)
            .map(|s| Variant::Str(s.to_string()))
            .map_err(|e| unexpected(member, e));
    }
    if vt == VT_DISPATCH || vt == VT_UNKNOWN {
        let unknown = IUnknown::try_from(value).map_err(|e| unexpected(member, e))?;
        let dispatch: IDispatch = unknown.cast().map_err(|e| unexpected(member, e))?;
        return Ok(Variant::Object(
            ComObject::new(dispatch, format!("{owner}.{member}")).into_handle(),
        ));
    }
    if let Ok(number) = i64::try_from(value) {
        return Ok(Variant::Int(number));
    }
    BSTR::try_from(value)
        .map(|s| Variant::Str(s.to_string()))
        .map_err(|e| unexpected(member, e))
}

fn unexpected(member: &str, error: windows::core::Error) -> SapError {
    SapError::InvalidValue(format!("'{member}' returned an unsupported value: {error}"))
}

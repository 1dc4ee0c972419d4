//! C ABI for host processes.
//!
//! ```c
//! char *parse(const uint8_t *data, size_t len);
//! void free_record(char *record);
//! ```
//!
//! [`parse`] never fails: input that cannot be decoded yields the all-empty
//! record `||||`. Every string it returns must be released with
//! [`free_record`].

use std::{
    ffi::{CString, c_char},
    slice,
};

use crate::pipeline::Pipeline;

/// Extract the device-identity record from a binary provisioning document.
///
/// Returns a NUL-terminated string owned by the caller. A null `data` is
/// treated as empty input. NUL characters within field values are dropped.
///
/// # Safety
///
/// Unless null, `data` must be valid for reads of `len` bytes.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn parse(data: *const u8, len: usize) -> *mut c_char {
    let data = if data.is_null() {
        &[][..]
    } else {
        // SAFETY: The caller guarantees `data` is readable for `len` bytes.
        unsafe { slice::from_raw_parts(data, len) }
    };

    let record = Pipeline::default().extract(data).unwrap_or_default();

    into_raw(record.to_string())
}

/// Release a string returned by [`parse`]. Null is ignored.
///
/// # Safety
///
/// `record` must be null or a pointer returned by [`parse`] that has not yet
/// been released.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn free_record(record: *mut c_char) {
    if !record.is_null() {
        // SAFETY: The caller guarantees `record` came from `parse`, which
        // produced it through `CString::into_raw`.
        drop(unsafe { CString::from_raw(record) });
    }
}

fn into_raw(mut record: String) -> *mut c_char {
    record.retain(|c| c != '\0');

    CString::new(record).unwrap_or_default().into_raw()
}

#[cfg(test)]
mod tests {
    use std::ffi::CStr;

    use super::*;

    fn call(data: &[u8]) -> String {
        unsafe {
            let record = parse(data.as_ptr(), data.len());
            assert!(!record.is_null());

            let text = CStr::from_ptr(record).to_str().unwrap().to_string();
            free_record(record);
            text
        }
    }

    #[test]
    fn parse_returns_record() {
        let pipeline = Pipeline::default();
        let data = pipeline
            .encode(
                r#"<O:Provision xmlns:O="Provision" xmlns:S="Settings">
                    <S:DeviceInformation><S:Set>
                        <S:Model>MIX 2</S:Model>
                        <S:MobileOperator>中国联通 (46001)</S:MobileOperator>
                    </S:Set></S:DeviceInformation>
                </O:Provision>"#,
            )
            .unwrap();

        assert_eq!(call(&data), "MIX 2||||||||中国联通 (46001)");
    }

    #[test]
    fn parse_suppresses_failures() {
        assert_eq!(call(b"\x03\x01\x6A"), "||||");
        assert_eq!(call(b""), "||||");
    }

    #[test]
    fn parse_accepts_null() {
        unsafe {
            let record = parse(std::ptr::null(), 10);
            assert_eq!(CStr::from_ptr(record).to_bytes(), b"||||");
            free_record(record);

            free_record(std::ptr::null_mut());
        }
    }

    #[test]
    fn interior_nul_is_dropped() {
        let raw = into_raw("a\0b||".to_string());
        let text = unsafe { CString::from_raw(raw) };
        assert_eq!(text.as_bytes(), b"ab||");
    }
}

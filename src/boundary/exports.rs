//! C ABI over [`adapter`](super::adapter). Declarations live in
//! `include/filebridge.h`.
//!
//! Strings are UTF-8 and NUL-terminated in both directions. A null or
//! malformed argument fails the call like any other error. Every non-null
//! `char*` returned here belongs to the caller and must be released with
//! [`fb_string_free`].

use std::ffi::{c_char, CStr, CString};
use std::ptr;

use super::adapter::{self, reject};
use super::BoundaryError;

unsafe fn parse_arg<'a>(name: &str, value: *const c_char) -> Result<&'a str, BoundaryError> {
    if value.is_null() {
        return Err(BoundaryError::InvalidArgument(format!(
            "{} must not be null",
            name
        )));
    }

    CStr::from_ptr(value)
        .to_str()
        .map_err(|_| BoundaryError::InvalidArgument(format!("{} is not valid UTF-8", name)))
}

unsafe fn read_arg<'a>(name: &str, value: *const c_char) -> Option<&'a str> {
    match parse_arg(name, value) {
        Ok(text) => Some(text),
        Err(e) => {
            reject(e);
            None
        }
    }
}

fn into_raw(value: Option<String>) -> *mut c_char {
    match value {
        Some(text) => match CString::new(text.replace('\0', "")) {
            Ok(owned) => owned.into_raw(),
            Err(_) => ptr::null_mut(),
        },
        None => ptr::null_mut(),
    }
}

/// Replaces the live client. A bad `base_url` still discards the old one.
///
/// # Safety
/// `base_url` must be null or point to a NUL-terminated string.
#[no_mangle]
pub unsafe extern "C" fn fb_create_client(base_url: *const c_char) {
    let _ = env_logger::try_init();

    match parse_arg("base_url", base_url) {
        Ok(base_url) => adapter::create_client(base_url),
        Err(e) => adapter::discard_session(e),
    }
}

#[no_mangle]
pub extern "C" fn fb_destroy_client() {
    adapter::destroy_client();
}

/// Returns a copy of the last error, or null when the last call succeeded.
#[no_mangle]
pub extern "C" fn fb_get_last_error() -> *mut c_char {
    into_raw(adapter::get_last_error())
}

/// # Safety
/// Both arguments must be null or point to NUL-terminated strings.
#[no_mangle]
pub unsafe extern "C" fn fb_login(username: *const c_char, password: *const c_char) -> *mut c_char {
    let (Some(username), Some(password)) =
        (read_arg("username", username), read_arg("password", password))
    else {
        return ptr::null_mut();
    };
    into_raw(adapter::login(username, password))
}

/// # Safety
/// `token` must be null or point to a NUL-terminated string.
#[no_mangle]
pub unsafe extern "C" fn fb_set_token(token: *const c_char) -> bool {
    match read_arg("token", token) {
        Some(token) => adapter::set_token(token),
        None => false,
    }
}

#[no_mangle]
pub extern "C" fn fb_logout() -> bool {
    adapter::logout()
}

#[no_mangle]
pub extern "C" fn fb_is_authenticated() -> bool {
    adapter::is_authenticated()
}

#[no_mangle]
pub extern "C" fn fb_restore_session() -> bool {
    adapter::restore_session()
}

/// # Safety
/// `path` must be null or point to a NUL-terminated string.
#[no_mangle]
pub unsafe extern "C" fn fb_get_resource(path: *const c_char) -> *mut c_char {
    match read_arg("path", path) {
        Some(path) => into_raw(adapter::get_resource(path)),
        None => ptr::null_mut(),
    }
}

/// # Safety
/// `path` must be null or point to a NUL-terminated string.
#[no_mangle]
pub unsafe extern "C" fn fb_list_directory(path: *const c_char) -> *mut c_char {
    match read_arg("path", path) {
        Some(path) => into_raw(adapter::list_directory(path)),
        None => ptr::null_mut(),
    }
}

/// # Safety
/// Both arguments must be null or point to NUL-terminated strings.
#[no_mangle]
pub unsafe extern "C" fn fb_search(query: *const c_char, path: *const c_char) -> *mut c_char {
    let (Some(query), Some(path)) = (read_arg("query", query), read_arg("path", path)) else {
        return ptr::null_mut();
    };
    into_raw(adapter::search(query, path))
}

/// JSON array of remote paths completing `partial_path`.
///
/// # Safety
/// `partial_path` must be null or point to a NUL-terminated string.
#[no_mangle]
pub unsafe extern "C" fn fb_completions(partial_path: *const c_char) -> *mut c_char {
    match read_arg("partial_path", partial_path) {
        Some(partial_path) => into_raw(adapter::completions(partial_path)),
        None => ptr::null_mut(),
    }
}

/// # Safety
/// Both arguments must be null or point to NUL-terminated strings.
#[no_mangle]
pub unsafe extern "C" fn fb_download_to_file(
    remote_path: *const c_char,
    local_path: *const c_char,
) -> bool {
    let (Some(remote_path), Some(local_path)) = (
        read_arg("remote_path", remote_path),
        read_arg("local_path", local_path),
    ) else {
        return false;
    };
    adapter::download_to_file(remote_path, local_path)
}

/// # Safety
/// Both path arguments must be null or point to NUL-terminated strings.
#[no_mangle]
pub unsafe extern "C" fn fb_upload_from_file(
    remote_path: *const c_char,
    local_path: *const c_char,
    overwrite: bool,
) -> bool {
    let (Some(remote_path), Some(local_path)) = (
        read_arg("remote_path", remote_path),
        read_arg("local_path", local_path),
    ) else {
        return false;
    };
    adapter::upload_from_file(remote_path, local_path, overwrite)
}

/// # Safety
/// `path` must be null or point to a NUL-terminated string.
#[no_mangle]
pub unsafe extern "C" fn fb_create_directory(path: *const c_char) -> bool {
    match read_arg("path", path) {
        Some(path) => adapter::create_directory(path),
        None => false,
    }
}

/// # Safety
/// `path` must be null or point to a NUL-terminated string.
#[no_mangle]
pub unsafe extern "C" fn fb_delete(path: *const c_char) -> bool {
    match read_arg("path", path) {
        Some(path) => adapter::delete(path),
        None => false,
    }
}

/// # Safety
/// Both path arguments must be null or point to NUL-terminated strings.
#[no_mangle]
pub unsafe extern "C" fn fb_rename(
    source: *const c_char,
    destination: *const c_char,
    overwrite: bool,
) -> bool {
    let (Some(source), Some(destination)) =
        (read_arg("source", source), read_arg("destination", destination))
    else {
        return false;
    };
    adapter::rename(source, destination, overwrite)
}

/// # Safety
/// Both path arguments must be null or point to NUL-terminated strings.
#[no_mangle]
pub unsafe extern "C" fn fb_copy(
    source: *const c_char,
    destination: *const c_char,
    overwrite: bool,
) -> bool {
    let (Some(source), Some(destination)) =
        (read_arg("source", source), read_arg("destination", destination))
    else {
        return false;
    };
    adapter::copy(source, destination, overwrite)
}

/// # Safety
/// `value` must be null or a pointer previously returned by one of the
/// `fb_*` functions, and must not be used afterwards.
#[no_mangle]
pub unsafe extern "C" fn fb_string_free(value: *mut c_char) {
    if !value.is_null() {
        drop(CString::from_raw(value));
    }
}

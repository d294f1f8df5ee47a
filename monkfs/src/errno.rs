//! Translation of File API failures into POSIX error numbers.
//!
//! | status | app code              | errno   |
//! |--------|-----------------------|---------|
//! | 401    | any                   | EACCES  |
//! | 403    | any                   | EPERM   |
//! | 404    | any                   | ENOENT  |
//! | 400    | NOT_A_FILE            | EISDIR  |
//! | 400    | anything else / unset | EINVAL  |
//! | 409    | any                   | EEXIST  |
//! | other  | any                   | EIO     |
//!
//! Transport failures (no status) map to EIO. Nothing here retries.

use libc::c_int;
use reqwest::StatusCode;

use crate::api::ClientError;

/// POSIX error number as returned to the filesystem caller.
pub type Errno = c_int;

pub const INVALID_PATH: &str = "INVALID_PATH";
pub const NOT_A_FILE: &str = "NOT_A_FILE";
pub const WILDCARDS_NOT_ALLOWED: &str = "WILDCARDS_NOT_ALLOWED";

pub fn to_errno(err: &ClientError) -> Errno {
    let Some(status) = err.status() else {
        return libc::EIO;
    };
    match status {
        StatusCode::UNAUTHORIZED => libc::EACCES,
        StatusCode::FORBIDDEN => libc::EPERM,
        StatusCode::NOT_FOUND => libc::ENOENT,
        StatusCode::BAD_REQUEST => match err.app_code() {
            Some(NOT_A_FILE) => libc::EISDIR,
            Some(INVALID_PATH) | Some(WILDCARDS_NOT_ALLOWED) => libc::EINVAL,
            _ => libc::EINVAL,
        },
        StatusCode::CONFLICT => libc::EEXIST,
        _ => libc::EIO,
    }
}

/// `0` on success, otherwise [`to_errno`].
pub fn result_to_errno<T>(result: &Result<T, ClientError>) -> Errno {
    match result {
        Ok(_) => 0,
        Err(err) => to_errno(err),
    }
}

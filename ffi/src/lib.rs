//! C FFI of the vcfmt crate.
//!
//! This crate exposes the format negotiation engine to the C side of a codec
//! driver, which keeps handling the ioctl dispatch and buffer queues itself.
//! Device bring-up code creates a registry with [`registry::vcfmt_registry_new`]
//! and fills it with the capabilities reported by the firmware; each opened
//! instance then gets a session from [`session::vcfmt_session_new`].
//!
//! Functions returning an `int` return 0 on success and a negative errno value
//! on failure.

pub mod registry;
pub mod session;

use std::os::raw::c_int;

use vcfmt::IntoErrno;

static INIT: std::sync::Once = std::sync::Once::new();

/// Initialize the vcfmt library. This only sets up the proper hooks for
/// logging, so although it is not a hard requirement to call this function,
/// failure to do so will result in no logs being printed.
#[no_mangle]
pub extern "C" fn vcfmt_init() {
    INIT.call_once(|| {
        #[cfg(feature = "env_logger")]
        env_logger::builder().format_timestamp(None).init();

        #[cfg(feature = "android")]
        android_logger::init_once(
            android_logger::Config::default().with_min_level(log::Level::Trace),
        );
    });
}

/// Turns `err` into the negative errno value returned to C callers.
pub(crate) fn neg_errno<E: IntoErrno>(err: E) -> c_int {
    -err.into_errno()
}

pub(crate) const EINVAL: c_int = -(nix::errno::Errno::EINVAL as c_int);

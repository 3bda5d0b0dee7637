//! Shared frame-buffer cache with explicit checkout/checkin ownership.

pub(crate) mod buffer;
pub(crate) mod fb_cache;
pub(crate) mod ledger;

//! # Vestibule (session authentication gate)
//!
//! `vestibule` guards a home/profile view behind a cookie session. Anonymous
//! visitors get a login form carrying a per-session CSRF token; a login
//! submission is checked for the token first and only then handed to the
//! credential verifier.
//!
//! ## Status Codes
//!
//! A `403 Forbidden` is reserved for forged or stale submissions (missing or
//! invalid CSRF token). Wrong usernames or passwords always receive a
//! `302 Found` redirect to `/error`, and a verifier outage is a `500`.
//!
//! ## Sessions
//!
//! Sessions live in an injected [`vestibule::auth::SessionStore`]. Each request
//! holds its session's lock for the whole decision, so two submissions carrying
//! the same token cannot both be accepted.

pub mod cli;
pub mod vestibule;

#[allow(clippy::doc_markdown, clippy::needless_raw_string_hashes)]
pub mod built_info {
    include!(concat!(env!("OUT_DIR"), "/built.rs"));
}

pub const GIT_COMMIT_HASH: &str = match built_info::GIT_COMMIT_HASH {
    Some(hash) => hash,
    None => "unknown",
};

//! HTTP handlers: the router boundary around the auth state machine.
//!
//! Handlers only extract the session cookie and form fields, call the matching
//! [`AuthMachine`](super::auth::AuthMachine) operation and turn the resulting
//! transition into a response. No auth decision is made here.

pub mod health;
pub use self::health::health;

pub mod login;
pub use self::login::{login, login_form};

pub mod pages;
pub use self::pages::{error_page, home, logout, profile};

pub(crate) mod session;
mod views;

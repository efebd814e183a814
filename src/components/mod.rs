//! Collaborators behind the web routes: the OAuth client, the calendar API
//! client and session storage.

pub mod auth;
pub mod outlook;
pub mod session;

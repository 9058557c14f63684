//! HTTP intake for scheduled notifications.
//!
//! - `POST   /notify`      create and schedule a notification
//! - `GET    /notify/{id}` read it back (cache-aside)
//! - `PATCH  /notify/{id}` change its status
//! - `DELETE /notify/{id}` remove it
//! - `GET    /health`

pub mod routes;
pub mod state;

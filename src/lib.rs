//! hostingde-webhook - ACME DNS-01 solver for the hosting.de DNS API
//!
//! Architecture:
//! - `solver` orchestrates Present/CleanUp for a challenge
//! - `client` talks JSON over HTTPS to hosting.de (reqwest, rustls)
//! - `retry` waits out zones that are not active yet
//! - `webhook` exposes the solver to the host runtime over HTTP (axum)

pub mod client;
pub mod config;
pub mod constants;
pub mod error;
pub mod metrics;
pub mod model;
pub mod registry;
pub mod retry;
pub mod secrets;
pub mod solver;
pub mod validation;
pub mod webhook;

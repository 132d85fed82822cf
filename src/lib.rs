//! # hydro-usage - Electricity usage export and time-of-use classification
//!
//! Toronto Hydro offers no API for interval usage data. This crate logs in to
//! the self-serve portal the way a browser does (login form, then a
//! script-generated token form), downloads the CSV usage export, and tags
//! every interval with the time-of-use tariff period it was billed in.
//!
//! ## Architecture
//!
//! - `config`: YAML configuration and validation
//! - `logging`: Structured logging and tracing
//! - `error`: Error taxonomy shared by all modules
//! - `trust`: Pinned certificate bundle for the provider's incomplete TLS chain
//! - `http`: Session seam (`HttpSession`) and its reqwest implementation
//! - `form`: Single-form extraction from HTML pages
//! - `submit`: Form submission that treats "no redirect" as failure
//! - `auth`: Login state machine producing the raw export
//! - `tariff`: Time-of-use classifier and holiday calendars
//! - `usage`: CSV export parsing and per-period totals

pub mod auth;
pub mod config;
pub mod error;
pub mod form;
pub mod http;
pub mod logging;
pub mod submit;
pub mod tariff;
pub mod trust;
pub mod usage;

// Re-export commonly used types
pub use auth::{Credentials, LoginFlow, LoginState};
pub use config::Config;
pub use error::{HydroError, Result};
pub use tariff::{TariffPeriod, TouClassifier};

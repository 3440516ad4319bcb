#![forbid(unsafe_code)]

//! Sample library and scripted headless session for Springstack.
//!
//! The demo browses four corpora of files: folders open into files, files
//! open into a detail card, and the sample database opens into its tables.
//! Every stack has a URL (see [`routes`]) so deep links and back/forward
//! replay through the router.

pub mod catalog;
pub mod cli;
pub mod data;
pub mod node_types;
pub mod routes;
pub mod session;

pub use cli::{Cli, DemoError, run, run_from_env};

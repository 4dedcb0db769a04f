//! Workshop back office library
//!
//! Record store for clients, orders, technicians, articles, maintenance jobs
//! and sales, with the integrity rules that keep them consistent: existence
//! checks on every reference, composite-key associations with atomic
//! reassignment, delete guards and frozen line prices.
#![forbid(unsafe_code)]
#![deny(rust_2018_idioms)]
#![allow(elided_lifetimes_in_paths)]
#![warn(clippy::all, clippy::perf, clippy::dbg_macro)]

pub mod config;
pub mod db;
pub mod entities;
pub mod errors;
pub mod migrator;
pub mod services;

pub use errors::ServiceError;
pub use services::AppServices;

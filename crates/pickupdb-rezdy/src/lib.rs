//! Client crate for the booking platform's pickups API.
//!
//! Exposes [`RezdyClient`] (retrying, envelope-checking HTTP client for
//! `GET /products/{code}/pickups`) and [`RateGate`], the single
//! minimum-interval gate every outbound request is paced through.

mod client;
mod error;
mod gate;
mod normalize;
mod retry;
mod types;

pub use client::{RezdyClient, DEFAULT_BASE_URL};
pub use error::RezdyError;
pub use gate::RateGate;

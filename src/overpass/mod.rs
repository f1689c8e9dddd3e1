//! Overpass API access: query construction, HTTP fetch, response decoding.

mod client;
pub mod query;
mod response;

pub use client::{FetchClient, OverpassClient, DEFAULT_ENDPOINT, DEFAULT_USER_AGENT};
pub use response::{parse, RawRecord};

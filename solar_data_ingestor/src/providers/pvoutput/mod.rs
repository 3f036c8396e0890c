//! PV-Output (<https://pvoutput.org>) read API.
//!
//! The service answers in delimited text: records separated by `;`, fields by
//! `,`. [`response`] turns those payloads into typed records; [`params`] builds
//! the query strings; [`provider::PvOutputProvider`] does the HTTP.

pub mod params;
pub mod provider;
pub mod response;

pub use provider::PvOutputProvider;

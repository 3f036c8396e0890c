//! Open-Meteo (<https://open-meteo.com>) daily weather API.
//!
//! History comes from the historical-forecast endpoint, which has data from
//! 2022-03-01 on; the online path reads the regular forecast endpoint. Both
//! answer in the same JSON shape, decoded in [`response`].

pub mod params;
pub mod provider;
pub mod response;

pub use provider::{Forecast, OpenMeteoProvider};

pub mod date_span;
pub mod location;
pub mod location_id;
pub mod pv_record;
pub mod weather_record;

pub use date_span::DateSpan;
pub use location::{CoordinatePrecision, Location};
pub use location_id::LocationId;
pub use pv_record::PvDailyRecord;
pub use weather_record::{DailyWeather, WeatherDailyRecord, WeatherVariable};

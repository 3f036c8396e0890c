//! End-to-end dataset build: system ids in, analysis-ready frame out.
//!
//! Stages, each persisted through the sink before the next one starts:
//! 1. system info for every id (location table),
//! 2. daily PV output over each system's extent, appended to the location sink,
//! 3. daily weather over the same extents,
//! 4. the inner join of 2 and 3, minus excluded locations,
//! 5. the cleaned and encoded join.
//!
//! [`Mode::InfoOnly`] stops after stage 1.

use std::path::{Path, PathBuf};

use tracing::{info, warn};

use crate::{
    acquire::{FailedRequest, PvOutputClient, WeatherClient},
    assemble::combine,
    errors::{Error, Result},
    frame::ToFrame,
    io::{TableSink, read_table},
    models::{Location, LocationId, PvDailyRecord, WeatherDailyRecord},
    providers::{PvProvider, WeatherProvider},
    transform::{prepare_features, remove_locations},
};

/// How far a build goes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "cli", derive(clap::ValueEnum))]
pub enum Mode {
    /// Location metadata only.
    InfoOnly,
    /// Locations, PV output, weather, combined and cleaned frames.
    #[default]
    Full,
}

/// Sink names of every stage.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SinkNames {
    pub pvoutput: String,
    pub weather: String,
    pub dataset: String,
    pub cleaned: String,
}

impl Default for SinkNames {
    fn default() -> Self {
        Self {
            pvoutput: "pvoutput.csv".to_string(),
            weather: "weather.csv".to_string(),
            dataset: "dataset.csv".to_string(),
            cleaned: "dataset_clean.csv".to_string(),
        }
    }
}

/// Where a build wrote to, and what it could not fetch.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct BuildReport {
    pub pvoutput_path: Option<PathBuf>,
    pub weather_path: Option<PathBuf>,
    pub dataset_path: Option<PathBuf>,
    pub cleaned_path: Option<PathBuf>,
    pub locations: usize,
    pub dataset_rows: usize,
    pub pv_failures: Vec<FailedRequest>,
    pub weather_failures: Vec<FailedRequest>,
}

impl BuildReport {
    /// Every requested location and sub-interval made it in.
    pub fn is_complete(&self) -> bool {
        self.pv_failures.is_empty() && self.weather_failures.is_empty()
    }
}

pub struct Pipeline<P, W, S> {
    pv: PvOutputClient<P>,
    weather: WeatherClient<W>,
    sink: S,
    names: SinkNames,
    exclude: Vec<LocationId>,
}

impl<P, W, S> Pipeline<P, W, S>
where
    P: PvProvider,
    W: WeatherProvider,
    S: TableSink<Output = PathBuf> + Sync,
{
    pub fn new(pv: PvOutputClient<P>, weather: WeatherClient<W>, sink: S) -> Self {
        Self {
            pv,
            weather,
            sink,
            names: SinkNames::default(),
            exclude: Vec::new(),
        }
    }

    pub fn with_names(mut self, names: SinkNames) -> Self {
        self.names = names;
        self
    }

    /// Locations dropped from the combined dataset.
    pub fn with_exclusions(mut self, exclude: Vec<LocationId>) -> Self {
        self.exclude = exclude;
        self
    }

    pub async fn build_dataset(&self, ids: &[LocationId], mode: Mode) -> Result<BuildReport> {
        let mut report = BuildReport::default();

        let info = self.pv.fetch_info(ids).await?;
        report.locations = info.records.len();
        report.pv_failures.extend(info.failures);
        let pv_path = self
            .sink
            .write(&Location::to_frame(&info.records)?, &self.names.pvoutput, false)
            .await?;
        report.pvoutput_path = Some(pv_path.clone());
        if mode == Mode::InfoOnly {
            info!(locations = report.locations, path = %pv_path.display(), "Wrote location info");
            return Ok(report);
        }

        let output = self.pv.fetch_outputs(&info.records).await?;
        report.pv_failures.extend(output.failures);
        let pv_frame = PvDailyRecord::to_frame(&output.records)?;
        self.sink
            .write(&pv_frame, &sibling_name(&self.names.pvoutput, &pv_path), true)
            .await?;

        let weather = self.weather.fetch(&info.records).await?;
        report.weather_failures = weather.failures;
        let weather_frame = WeatherDailyRecord::to_frame(&weather.records)?;
        report.weather_path = Some(self.sink.write(&weather_frame, &self.names.weather, false).await?);

        let dataset = remove_locations(combine(&pv_frame, &weather_frame)?, &self.exclude)?;
        report.dataset_rows = dataset.height();
        report.dataset_path = Some(self.sink.write(&dataset, &self.names.dataset, false).await?);

        let cleaned = prepare_features(dataset)?.frame;
        report.cleaned_path = Some(self.sink.write(&cleaned, &self.names.cleaned, false).await?);

        if report.is_complete() {
            info!(
                locations = report.locations,
                rows = report.dataset_rows,
                cleaned_rows = cleaned.height(),
                "Dataset built"
            );
        } else {
            warn!(
                locations = report.locations,
                rows = report.dataset_rows,
                pv_failures = report.pv_failures.len(),
                weather_failures = report.weather_failures.len(),
                "Dataset built with gaps"
            );
        }
        Ok(report)
    }
}

/// `requested` with its file name replaced by the one the sink actually used.
fn sibling_name(requested: &str, written: &Path) -> String {
    match written.file_name() {
        Some(file) => Path::new(requested).with_file_name(file).to_string_lossy().into_owned(),
        None => requested.to_string(),
    }
}

/// Joins a PV output file (the last block, for a two-block file) with a weather
/// file and writes the combined frame.
pub async fn combine_files<S>(
    sink: &S,
    pv_path: impl AsRef<Path>,
    weather_path: impl AsRef<Path>,
    name: &str,
    exclude: &[LocationId],
) -> Result<PathBuf>
where
    S: TableSink<Output = PathBuf> + Sync,
{
    let pv = read_table(pv_path)?;
    let weather = read_table(weather_path)?;
    if pv.height() == 0 || weather.height() == 0 {
        return Err(Error::InvalidInput("nothing to combine: an input file has no rows".into()));
    }
    let dataset = remove_locations(combine(&pv, &weather)?, exclude)?;
    Ok(sink.write(&dataset, name, false).await?)
}

/// Cleans and encodes a combined file.
pub async fn clean_file<S>(sink: &S, path: impl AsRef<Path>, name: &str) -> Result<PathBuf>
where
    S: TableSink<Output = PathBuf> + Sync,
{
    let cleaned = prepare_features(read_table(path)?)?.frame;
    Ok(sink.write(&cleaned, name, false).await?)
}

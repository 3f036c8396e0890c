//! Weather client: daily history for every location over its PV extent.

use chrono::NaiveDate;
use indexmap::IndexMap;
use polars::frame::DataFrame;
use tracing::{info, warn};

use crate::{
    acquire::{Acquired, FailedRequest, FailureReason},
    errors::{Error, Result},
    models::{Location, LocationId, WeatherDailyRecord, WeatherVariable, location::locations_from_frame},
    pagination::{WEATHER_MAX_SPAN_DAYS, paginate},
    providers::{WeatherProvider, WeatherRequest, open_meteo::params as open_meteo},
    scheduler::{Job, Scheduler, call_cost},
};

/// Pre-flight cost of a weather run, in upstream billing units.
#[derive(Debug, Clone, PartialEq)]
pub struct CostReport {
    /// Summed cost of every sub-interval of each location, in input order.
    pub per_location: IndexMap<LocationId, u64>,
    pub total: u64,
    pub min: u64,
    pub mean: f64,
    pub max: u64,
}

impl CostReport {
    fn from_jobs(jobs: &[Job<WeatherRequest>]) -> Self {
        let mut per_location: IndexMap<LocationId, u64> = IndexMap::new();
        for job in jobs {
            *per_location.entry(job.id.clone()).or_default() += job.cost;
        }
        let total = per_location.values().sum();
        let min = per_location.values().copied().min().unwrap_or(0);
        let max = per_location.values().copied().max().unwrap_or(0);
        let mean = if per_location.is_empty() {
            0.0
        } else {
            total as f64 / per_location.len() as f64
        };
        Self {
            per_location,
            total,
            min,
            mean,
            max,
        }
    }
}

pub struct WeatherClient<W> {
    provider: W,
    scheduler: Scheduler,
    history_start: NaiveDate,
    max_span_days: u64,
    cost_divisor: u64,
}

impl<W: WeatherProvider> WeatherClient<W> {
    pub fn new(provider: W, scheduler: Scheduler) -> Self {
        Self {
            provider,
            scheduler,
            history_start: open_meteo::history_start(),
            max_span_days: WEATHER_MAX_SPAN_DAYS,
            cost_divisor: open_meteo::COST_ROW_DIVISOR,
        }
    }

    /// Earliest date the weather source serves; extents are clamped up to it.
    pub fn with_history_start(mut self, history_start: NaiveDate) -> Self {
        self.history_start = history_start;
        self
    }

    pub fn with_max_span_days(mut self, max_span_days: u64) -> Self {
        self.max_span_days = max_span_days;
        self
    }

    pub fn with_cost_divisor(mut self, cost_divisor: u64) -> Self {
        self.cost_divisor = cost_divisor;
        self
    }

    pub fn scheduler(&self) -> &Scheduler {
        &self.scheduler
    }

    /// One job per (location, sub-interval), plus the locations left with nothing to request.
    fn plan_jobs(&self, locations: &[Location]) -> (Vec<Job<WeatherRequest>>, Vec<FailedRequest>) {
        let variables = WeatherVariable::ALL.len() as u64;
        let mut jobs = Vec::new();
        let mut excluded = Vec::new();

        for location in locations {
            let Some(span) = location.extent.and_then(|e| e.clamp_start(self.history_start)) else {
                warn!(id = %location.id, extent = ?location.extent, "No weather range left after clamping");
                excluded.push(FailedRequest {
                    id: location.id.clone(),
                    span: location.extent,
                    reason: FailureReason::NoValidRange,
                });
                continue;
            };
            for window in paginate(span, self.max_span_days) {
                jobs.push(Job {
                    id: location.id.clone(),
                    cost: call_cost(window.days(), variables, self.cost_divisor),
                    request: WeatherRequest {
                        id: location.id.clone(),
                        latitude: location.latitude,
                        longitude: location.longitude,
                        span: window,
                    },
                });
            }
        }
        (jobs, excluded)
    }

    /// Cost of fetching `locations`, computed without any network call.
    pub fn estimate_cost(&self, locations: &[Location]) -> CostReport {
        let (jobs, _) = self.plan_jobs(locations);
        CostReport::from_jobs(&jobs)
    }

    /// Daily weather for every location with a valid range.
    ///
    /// The run is refused as a whole if it does not fit the quota. Locations
    /// without a range, and sub-intervals that kept failing, are reported in
    /// [`Acquired::failures`].
    pub async fn fetch(&self, locations: &[Location]) -> Result<Acquired<WeatherDailyRecord>> {
        if locations.is_empty() {
            return Err(Error::InvalidInput("no locations provided".into()));
        }
        let (jobs, excluded) = self.plan_jobs(locations);
        let report = CostReport::from_jobs(&jobs);
        info!(
            locations = report.per_location.len(),
            excluded = excluded.len(),
            total_cost = report.total,
            min_cost = report.min,
            mean_cost = report.mean,
            max_cost = report.max,
            "Planned weather requests"
        );

        let provider = &self.provider;
        let outcome = self
            .scheduler
            .run(jobs, move |request: WeatherRequest| async move { provider.daily(&request).await })
            .await?;

        let mut acquired = Acquired {
            records: Vec::new(),
            failures: excluded,
        };
        for failure in outcome.failed {
            let span = failure.request.span;
            acquired.failures.push(FailedRequest::from_job(failure, Some(span)));
        }
        for completed in outcome.completed {
            let span = completed.request.span;
            acquired.records.extend(
                completed
                    .value
                    .into_iter()
                    .filter(|r| span.contains(r.date))
                    .map(|r| WeatherDailyRecord {
                        location_id: completed.id.clone(),
                        ..r
                    }),
            );
        }

        info!(
            rows = acquired.records.len(),
            failures = acquired.failures.len(),
            "Fetched weather"
        );
        Ok(acquired)
    }

    /// [`WeatherClient::fetch`] over a location frame, as written by the PV-Output stage.
    pub async fn fetch_frame(&self, locations: &DataFrame) -> Result<Acquired<WeatherDailyRecord>> {
        let locations = locations_from_frame(locations)?;
        self.fetch(&locations).await
    }
}

#[cfg(test)]
mod tests {
    use std::{sync::Mutex, time::Duration};

    use async_trait::async_trait;

    use super::*;
    use crate::{
        models::{DateSpan, weather_record::DailyWeather},
        providers::{ProviderError, StatusSnafu},
        scheduler::{QuotaPolicy, RetryPolicy, ScheduleError},
    };

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    /// Answers rows in reverse date order, tagged with a wrong id, to check re-association.
    #[derive(Default)]
    struct FakeWeather {
        down: Vec<LocationId>,
        requests: Mutex<Vec<WeatherRequest>>,
    }

    #[async_trait]
    impl WeatherProvider for FakeWeather {
        async fn daily(&self, request: &WeatherRequest) -> std::result::Result<Vec<WeatherDailyRecord>, ProviderError> {
            self.requests.lock().unwrap().push(request.clone());
            if self.down.contains(&request.id) {
                return StatusSnafu { status: 504u16, body: "gateway timeout" }.fail();
            }
            let mut rows = Vec::new();
            let mut day = request.span.end;
            while day >= request.span.start {
                rows.push(WeatherDailyRecord {
                    location_id: LocationId::from("wrong"),
                    date: day,
                    weather: DailyWeather::default().with(WeatherVariable::WeatherCode, 3.0),
                });
                day = day.pred_opt().unwrap();
            }
            Ok(rows)
        }
    }

    fn client(fake: FakeWeather, per_hour: u64) -> WeatherClient<FakeWeather> {
        let scheduler = Scheduler::new(
            QuotaPolicy {
                per_minute: 600,
                per_hour,
                batch_wait: Duration::from_secs(60),
            },
            RetryPolicy::default(),
        );
        WeatherClient::new(fake, scheduler)
    }

    fn location(id: u64, start: NaiveDate, end: NaiveDate) -> Location {
        Location::new(id, -27.5, 153.0).with_extent(DateSpan::new(start, end).unwrap())
    }

    #[tokio::test(start_paused = true)]
    async fn extents_are_clamped_to_history_start() {
        let weather = client(FakeWeather::default(), 5000);
        let got = weather
            .fetch(&[location(1, d(2021, 6, 1), d(2022, 3, 10))])
            .await
            .unwrap();

        assert!(got.is_complete());
        assert_eq!(got.records.len(), 10);
        assert_eq!(got.records[0].location_id, LocationId::from(1u64));
        let requests = weather.provider.requests.lock().unwrap();
        assert_eq!(requests[0].span.start, d(2022, 3, 1));
    }

    #[tokio::test(start_paused = true)]
    async fn location_frame_from_the_pv_stage_is_accepted() {
        use crate::frame::{ToFrame, read_csv, write_csv};

        let written = Location::to_frame(&[location(5242, d(2023, 1, 1), d(2023, 1, 3))]).unwrap();
        let read_back = read_csv(&String::from_utf8(write_csv(&written).unwrap()).unwrap()).unwrap();
        let weather = client(FakeWeather::default(), 5000);
        let got = weather.fetch_frame(&read_back).await.unwrap();

        assert_eq!(got.records.len(), 3);
        assert!(got.records.iter().all(|r| r.location_id == LocationId::from(5242u64)));
    }

    #[tokio::test(start_paused = true)]
    async fn location_entirely_before_history_is_excluded() {
        let weather = client(FakeWeather::default(), 5000);
        let got = weather
            .fetch(&[
                location(1, d(2020, 1, 1), d(2021, 12, 31)),
                location(2, d(2023, 1, 1), d(2023, 1, 5)),
            ])
            .await
            .unwrap();

        assert_eq!(got.records.len(), 5);
        assert_eq!(got.failures.len(), 1);
        assert_eq!(got.failures[0].id, LocationId::from(1u64));
        assert_eq!(got.failures[0].reason, FailureReason::NoValidRange);
        assert_eq!(weather.provider.requests.lock().unwrap().len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn multi_year_extent_is_split_into_yearly_windows() {
        let weather = client(FakeWeather::default(), 5000);
        let got = weather
            .fetch(&[location(1, d(2022, 3, 1), d(2024, 2, 29))])
            .await
            .unwrap();

        let requests = weather.provider.requests.lock().unwrap();
        assert_eq!(requests.len(), 3);
        assert_eq!(requests[0].span.days(), 365);
        assert_eq!(requests[1].span.start, d(2023, 3, 1));
        // leap year: the second window ends a day short of the extent
        assert_eq!(requests[2].span, DateSpan::new(d(2024, 2, 29), d(2024, 2, 29)).unwrap());
        assert_eq!(got.records.len(), 731);
    }

    #[tokio::test(start_paused = true)]
    async fn unavailable_location_is_reported_and_others_kept() {
        let weather = client(
            FakeWeather {
                down: vec![LocationId::from(2u64)],
                ..Default::default()
            },
            5000,
        );
        let got = weather
            .fetch(&[
                location(1, d(2023, 1, 1), d(2023, 1, 5)),
                location(2, d(2023, 1, 1), d(2023, 1, 5)),
            ])
            .await
            .unwrap();

        assert_eq!(got.records.len(), 5);
        assert_eq!(got.failed_ids(), vec![&LocationId::from(2u64)]);
        assert!(matches!(got.failures[0].reason, FailureReason::Upstream { attempts: 4, .. }));
    }

    #[tokio::test(start_paused = true)]
    async fn over_quota_run_is_refused_before_any_call() {
        // 365 days * 13 variables / 140 = 34 units per location
        let weather = client(FakeWeather::default(), 50);
        let locations = [
            location(1, d(2023, 1, 1), d(2023, 12, 31)),
            location(2, d(2023, 1, 1), d(2023, 12, 31)),
        ];
        assert_eq!(weather.estimate_cost(&locations).total, 68);

        let err = weather.fetch(&locations).await.unwrap_err();
        assert!(matches!(err, Error::Schedule(ScheduleError::QuotaExceeded(_))));
        assert!(weather.provider.requests.lock().unwrap().is_empty());
    }

    #[test]
    fn cost_report_summarises_per_location() {
        let weather = client(FakeWeather::default(), 5000);
        let report = weather.estimate_cost(&[
            location(1, d(2023, 1, 1), d(2023, 1, 10)),
            location(2, d(2023, 1, 1), d(2023, 12, 31)),
        ]);
        assert_eq!(report.per_location[&LocationId::from(1u64)], 1);
        assert_eq!(report.per_location[&LocationId::from(2u64)], 34);
        assert_eq!(report.total, 35);
        assert_eq!(report.min, 1);
        assert_eq!(report.max, 34);
        assert_eq!(report.mean, 17.5);
    }
}

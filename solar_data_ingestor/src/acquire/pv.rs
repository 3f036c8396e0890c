//! PV-Output client: system info and paginated daily output.

use chrono::{Local, NaiveDate};
use indexmap::IndexMap;
use tracing::{info, warn};

use crate::{
    acquire::{Acquired, FailedRequest, FailureReason},
    errors::{Error, Result},
    models::{DateSpan, Location, LocationId, PvDailyRecord},
    pagination::{PV_OUTPUT_MAX_SPAN_DAYS, paginate},
    providers::PvProvider,
    scheduler::{Job, Scheduler},
};

/// `system` + `statistic` per location.
const INFO_COST: u64 = 2;
const OUTPUT_COST: u64 = 1;

#[derive(Debug, Clone, PartialEq)]
struct OutputRequest {
    id: LocationId,
    span: DateSpan,
}

pub struct PvOutputClient<P> {
    provider: P,
    scheduler: Scheduler,
    max_span_days: u64,
    today: Option<NaiveDate>,
}

impl<P: PvProvider> PvOutputClient<P> {
    pub fn new(provider: P, scheduler: Scheduler) -> Self {
        Self {
            provider,
            scheduler,
            max_span_days: PV_OUTPUT_MAX_SPAN_DAYS,
            today: None,
        }
    }

    pub fn with_max_span_days(mut self, max_span_days: u64) -> Self {
        self.max_span_days = max_span_days;
        self
    }

    /// Pins the date treated as "today" instead of reading the local clock.
    pub fn with_today(mut self, today: NaiveDate) -> Self {
        self.today = Some(today);
        self
    }

    pub fn scheduler(&self) -> &Scheduler {
        &self.scheduler
    }

    fn today(&self) -> NaiveDate {
        self.today.unwrap_or_else(|| Local::now().date_naive())
    }

    /// Metadata and output extent for each system id, in input order.
    ///
    /// A system whose statistic is refused with the bad-request marker (no
    /// recorded output) is still returned, without an extent.
    pub async fn fetch_info(&self, ids: &[LocationId]) -> Result<Acquired<Location>> {
        if ids.is_empty() {
            return Err(Error::InvalidInput("no system ids provided".into()));
        }

        let jobs = ids
            .iter()
            .map(|id| Job {
                id: id.clone(),
                cost: INFO_COST,
                request: id.clone(),
            })
            .collect();

        let provider = &self.provider;
        let outcome = self
            .scheduler
            .run(jobs, move |id: LocationId| async move {
                let location = provider.system(&id).await?;
                match provider.statistic(&id).await {
                    Ok(extent) => Ok(location.with_extent(extent)),
                    Err(e) if e.is_bad_request() => {
                        warn!(id = %id, error = %e, "No output statistic for system");
                        Ok(location)
                    }
                    Err(e) => Err(e),
                }
            })
            .await?;

        info!(
            fetched = outcome.completed.len(),
            failed = outcome.failed.len(),
            "Fetched system info"
        );
        Ok(Acquired {
            records: outcome.completed.into_iter().map(|c| c.value).collect(),
            failures: outcome
                .failed
                .into_iter()
                .map(|f| FailedRequest::from_job(f, None))
                .collect(),
        })
    }

    /// Daily output of one system between `start` and `end`, both inclusive.
    ///
    /// If `end` is today it is moved back a day, today being incomplete.
    pub async fn fetch_output(&self, id: &LocationId, start: NaiveDate, end: NaiveDate) -> Result<Acquired<PvDailyRecord>> {
        let span = DateSpan::new(start, end)
            .ok_or_else(|| Error::InvalidInput(format!("start {start} is after end {end} for {id}")))?;
        self.fetch_spans(vec![(id.clone(), Some(span))]).await
    }

    /// Daily output of every location over its known extent, in one scheduled run.
    ///
    /// Locations without an extent are reported as failures and not requested.
    pub async fn fetch_outputs(&self, locations: &[Location]) -> Result<Acquired<PvDailyRecord>> {
        if locations.is_empty() {
            return Err(Error::InvalidInput("no locations provided".into()));
        }
        self.fetch_spans(locations.iter().map(|l| (l.id.clone(), l.extent)).collect())
            .await
    }

    async fn fetch_spans(&self, spans: Vec<(LocationId, Option<DateSpan>)>) -> Result<Acquired<PvDailyRecord>> {
        let today = self.today();
        let mut acquired = Acquired::default();
        let mut jobs = Vec::new();

        for (id, span) in spans {
            let span = match span {
                Some(span) if span.end == today => span.without_last_day(),
                other => other,
            };
            let Some(span) = span else {
                warn!(id = %id, "No output range to request");
                acquired.failures.push(FailedRequest {
                    id,
                    span: None,
                    reason: FailureReason::NoValidRange,
                });
                continue;
            };
            jobs.extend(paginate(span, self.max_span_days).map(|window| Job {
                id: id.clone(),
                cost: OUTPUT_COST,
                request: OutputRequest {
                    id: id.clone(),
                    span: window,
                },
            }));
        }

        let provider = &self.provider;
        let outcome = self
            .scheduler
            .run(jobs, move |req: OutputRequest| async move { provider.output(&req.id, req.span).await })
            .await?;

        for failure in outcome.failed {
            let span = failure.request.span;
            if failure.error.is_bad_request() {
                warn!(id = %failure.id, span = %span, "Bad request, skipping sub-interval");
            }
            acquired.failures.push(FailedRequest::from_job(failure, Some(span)));
        }

        // Per location in submission order, oldest date first, one row per date.
        let mut by_location: IndexMap<LocationId, Vec<PvDailyRecord>> = IndexMap::new();
        for completed in outcome.completed {
            let span = completed.request.span;
            let rows = by_location.entry(completed.id.clone()).or_default();
            rows.extend(
                completed
                    .value
                    .into_iter()
                    .filter(|r| span.contains(r.date))
                    .map(|r| PvDailyRecord {
                        location_id: completed.id.clone(),
                        ..r
                    }),
            );
        }
        for (_, mut rows) in by_location {
            rows.sort_by_key(|r| r.date);
            rows.dedup_by_key(|r| r.date);
            acquired.records.extend(rows);
        }

        info!(
            rows = acquired.records.len(),
            failures = acquired.failures.len(),
            "Fetched PV output"
        );
        Ok(acquired)
    }
}

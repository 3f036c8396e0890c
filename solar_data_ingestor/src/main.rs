use std::{error::Error, io::Write};

use clap::Parser;
use shared_utils::env::get_env_vars;
use solar_data_ingestor::{
    acquire::{PvOutputClient, WeatherClient},
    cli::commands::{Cli, Commands},
    config::{IngestConfig, PvCredentials, load_config_path},
    inference::fetch_forecast_features,
    io::CsvDirSink,
    frame::write_csv,
    models::{LocationId, location::locations_from_frame},
    pipeline::{self, Pipeline},
    providers::{elevation::ElevationProvider, open_meteo::OpenMeteoProvider, pvoutput::PvOutputProvider},
    scheduler::Scheduler,
};
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

fn weather_client(config: &IngestConfig, scheduler: Scheduler) -> Result<WeatherClient<OpenMeteoProvider>, Box<dyn Error>> {
    let om = &config.open_meteo;
    let provider = OpenMeteoProvider::with_urls(&om.history_url, &om.forecast_url)?.with_timezone(&om.timezone);
    Ok(WeatherClient::new(provider, scheduler)
        .with_history_start(om.history_start)
        .with_max_span_days(om.max_span_days)
        .with_cost_divisor(om.cost_divisor))
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let cli = Cli::parse();
    let config = match &cli.config {
        Some(path) => load_config_path(path)?,
        None => IngestConfig::default(),
    };
    let sink = CsvDirSink::new(&config.output_dir);

    // Ctrl-C aborts a long run at the next wait instead of killing it mid-write.
    let cancel = CancellationToken::new();
    let on_signal = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("Interrupted, cancelling at the next pause");
            on_signal.cancel();
        }
    });

    match cli.command {
        Commands::Build { ids, mode } => {
            let [system_id, api_key] = get_env_vars(["PVOUTPUT_SYSTEM_ID", "PVOUTPUT_API_KEY"])?;
            let credentials = PvCredentials::new(system_id, api_key);

            let pv_provider = PvOutputProvider::with_base_url(&credentials, &config.pvoutput.base_url)?;
            let pv = PvOutputClient::new(
                pv_provider,
                config.pvoutput.throttle().scheduler().with_cancellation(cancel.clone()),
            )
            .with_max_span_days(config.pvoutput.max_span_days);
            let weather = weather_client(
                &config,
                config.open_meteo.throttle().scheduler().with_cancellation(cancel.clone()),
            )?;

            let ids: Vec<LocationId> = ids.into_iter().map(LocationId::new).collect();
            let report = Pipeline::new(pv, weather, sink)
                .with_exclusions(config.exclude_locations.clone())
                .build_dataset(&ids, mode)
                .await?;

            for path in [
                &report.pvoutput_path,
                &report.weather_path,
                &report.dataset_path,
                &report.cleaned_path,
            ]
            .into_iter()
            .flatten()
            {
                println!("{}", path.display());
            }
            for failure in report.pv_failures.iter().chain(&report.weather_failures) {
                match failure.span {
                    Some(span) => eprintln!("ERROR: {} {} - {}", failure.id, span, failure.reason),
                    None => eprintln!("ERROR: {} - {}", failure.id, failure.reason),
                }
            }
            // Summary on stderr so stdout stays a plain list of paths
            eprintln!(
                "SUMMARY: {} locations, {} dataset rows, {} failures",
                report.locations,
                report.dataset_rows,
                report.pv_failures.len() + report.weather_failures.len()
            );
        }

        Commands::Cost { locations } => {
            let frame = solar_data_ingestor::io::read_table(&locations)?;
            let weather = weather_client(&config, config.open_meteo.throttle().scheduler())?;
            let report = weather.estimate_cost(&locations_from_frame(&frame)?);
            for (id, cost) in &report.per_location {
                println!("{id},{cost}");
            }
            eprintln!(
                "SUMMARY: total {} (min {}, mean {:.1}, max {}), hourly ceiling {}",
                report.total, report.min, report.mean, report.max, config.open_meteo.per_hour
            );
        }

        Commands::Combine {
            pvoutput,
            weather,
            output,
        } => {
            let path = pipeline::combine_files(&sink, pvoutput, weather, &output, &config.exclude_locations).await?;
            println!("{}", path.display());
        }

        Commands::Clean { input, output } => {
            let path = pipeline::clean_file(&sink, input, &output).await?;
            println!("{}", path.display());
        }

        Commands::Forecast { latitude, longitude } => {
            let om = &config.open_meteo;
            let weather = OpenMeteoProvider::with_urls(&om.history_url, &om.forecast_url)?.with_timezone(&om.timezone);
            let elevation = ElevationProvider::with_url(&config.elevation.url)?;
            let features = fetch_forecast_features(&weather, &elevation, latitude, longitude).await?;
            info!(
                latitude = features.latitude,
                longitude = features.longitude,
                "Forecast grid point"
            );

            std::io::stdout().write_all(&write_csv(&features.table)?)?;
            for condition in &features.conditions {
                eprintln!("{}", condition.unwrap_or("Unknown"));
            }
        }
    }
    Ok(())
}

use std::path::PathBuf;

use clap::{Parser, Subcommand};

use crate::pipeline::Mode;

#[derive(Parser)]
#[command(author, version, about)]
pub struct Cli {
    /// Path to the config file (solar_data.toml); defaults apply when omitted
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Fetch system info (and optionally output + weather) and build the dataset
    Build {
        /// Comma-separated PV-Output system ids (e.g. "66991,3099")
        #[arg(long, value_delimiter = ',', required = true)]
        ids: Vec<String>,

        /// How far to go: info-only writes the location table and stops
        #[arg(long, value_enum, default_value_t = Mode::Full)]
        mode: Mode,
    },

    /// Print the weather cost of a location table without fetching anything
    Cost {
        /// Location table written by `build --mode info-only`
        #[arg(long)]
        locations: PathBuf,
    },

    /// Join a PV output file with a weather file
    Combine {
        #[arg(long)]
        pvoutput: PathBuf,

        #[arg(long)]
        weather: PathBuf,

        /// Sink name of the combined table
        #[arg(long, default_value = "dataset.csv")]
        output: String,
    },

    /// Clean and encode a combined file
    Clean {
        #[arg(long)]
        input: PathBuf,

        /// Sink name of the cleaned table
        #[arg(long, default_value = "dataset_clean.csv")]
        output: String,
    },

    /// Fetch the daily forecast for a coordinate and print its model features
    Forecast {
        #[arg(long, allow_hyphen_values = true)]
        latitude: f64,

        #[arg(long, allow_hyphen_values = true)]
        longitude: f64,
    },
}

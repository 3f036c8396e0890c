use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, header};
use secrecy::ExposeSecret;
use snafu::ResultExt;
use tracing::debug;

use crate::{
    config::PvCredentials,
    models::{DateSpan, Location, LocationId, PvDailyRecord},
    providers::{
        ClientBuildSnafu, InvalidApiKeySnafu, ProviderError, ProviderInitError, PvProvider, ReqwestSnafu,
        StatusSnafu, endpoint,
        pvoutput::{
            params::{
                API_KEY_HEADER, BASE_URL, OUTPUT_ENDPOINT, QueryParams, STATISTIC_ENDPOINT, SYSTEM_ENDPOINT,
                SYSTEM_ID_HEADER, output_params, statistic_params, system_params,
            },
            response::{check_marker, parse_output, parse_statistic, parse_system},
        },
    },
};

const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

pub struct PvOutputProvider {
    client: Client,
    base_url: String,
}

impl PvOutputProvider {
    /// Creates a provider for the public PV-Output service.
    pub fn new(credentials: &PvCredentials) -> Result<Self, ProviderInitError> {
        Self::with_base_url(credentials, BASE_URL)
    }

    /// Creates a provider against another deployment (or a test server).
    ///
    /// The API key and system id are sent as default headers on every request.
    pub fn with_base_url(credentials: &PvCredentials, base_url: impl Into<String>) -> Result<Self, ProviderInitError> {
        let mut api_key =
            header::HeaderValue::from_str(credentials.api_key.expose_secret()).context(InvalidApiKeySnafu)?;
        api_key.set_sensitive(true);
        let system_id = header::HeaderValue::from_str(&credentials.system_id).context(InvalidApiKeySnafu)?;

        let mut headers = header::HeaderMap::new();
        headers.insert(API_KEY_HEADER, api_key);
        headers.insert(SYSTEM_ID_HEADER, system_id);

        let client = Client::builder()
            .default_headers(headers)
            .timeout(REQUEST_TIMEOUT)
            .build()
            .context(ClientBuildSnafu)?;

        Ok(Self {
            client,
            base_url: base_url.into(),
        })
    }

    async fn get_text(&self, path: &str, params: &QueryParams) -> Result<String, ProviderError> {
        let url = endpoint(&self.base_url, path);
        debug!(url = %url, ?params, "PV-Output request");

        let response = self.client.get(&url).query(params).send().await.context(ReqwestSnafu)?;
        let status = response.status();
        let text = response.text().await.context(ReqwestSnafu)?;

        // The refusal marker comes with a 400 status, so look for it first.
        check_marker(&text)?;
        if !status.is_success() {
            return StatusSnafu {
                status: status.as_u16(),
                body: text,
            }
            .fail();
        }
        Ok(text)
    }
}

#[async_trait]
impl PvProvider for PvOutputProvider {
    async fn system(&self, id: &LocationId) -> Result<Location, ProviderError> {
        let text = self.get_text(SYSTEM_ENDPOINT, &system_params(id)).await?;
        parse_system(id, &text)
    }

    async fn statistic(&self, id: &LocationId) -> Result<DateSpan, ProviderError> {
        let text = self.get_text(STATISTIC_ENDPOINT, &statistic_params(id)).await?;
        parse_statistic(id, &text)
    }

    async fn output(&self, id: &LocationId, span: DateSpan) -> Result<Vec<PvDailyRecord>, ProviderError> {
        let text = self.get_text(OUTPUT_ENDPOINT, &output_params(id, span)).await?;
        parse_output(id, &text)
    }
}

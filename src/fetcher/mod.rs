mod batches;
mod status;

use batches::plan_batches;
pub use status::BatchStatusLog;

use log::{error, info, warn};

use crate::artifacts::ArtifactStore;
use crate::config::ServerConfig;
use crate::error::{CollectorError, Result};
use crate::output::{BatchProgress, DiscoveryProgress};
use crate::providers::teamcity::{join_identifiers, IdsPage, Identifier, TeamCityClient};

/// Retrieves identifiers and build records from TeamCity into local artifacts.
///
/// Requests are issued one at a time; each response is fully written before
/// the next request starts, so an interrupted run leaves at most the in-flight
/// artifact incomplete.
pub struct Fetcher {
    client: TeamCityClient,
    project_id: String,
    ids_endpoint: String,
    builds_endpoint: String,
    store: ArtifactStore,
}

impl Fetcher {
    /// Creates a fetcher for the project named in `server`.
    ///
    /// # Errors
    ///
    /// Returns a configuration error if the host or project id is missing, or
    /// the host is not a valid URL.
    pub fn new(server: &ServerConfig, store: ArtifactStore) -> Result<Self> {
        let client = TeamCityClient::new(server.host()?, server.token(), server.timeout())?;

        Ok(Self {
            client,
            project_id: server.project_id()?.to_string(),
            ids_endpoint: server.ids_endpoint.clone(),
            builds_endpoint: server.builds_endpoint.clone(),
            store,
        })
    }

    /// Collects every identifier for the project and replaces the identifier
    /// artifact with them.
    ///
    /// Follows `nextHref` references until the listing has no further page or
    /// `max_pages` pages were read.
    ///
    /// # Errors
    ///
    /// Any non-success status, malformed page or transport failure aborts
    /// discovery; the identifier artifact is left untouched in that case.
    pub async fn discover_identifiers(&self, max_pages: usize) -> Result<Vec<Identifier>> {
        if max_pages == 0 {
            return Err(CollectorError::Config(
                "page limit must be greater than zero".into(),
            ));
        }

        info!("Discovering identifiers for project {}", self.project_id);

        let project_query = [("projectExternalId", self.project_id.as_str())];
        let mut next_url = Some(self.client.endpoint_url(&self.ids_endpoint)?);
        let mut identifiers = Vec::new();
        let mut pages = 0;

        let progress = DiscoveryProgress::start();

        while let Some(url) = next_url.take() {
            if pages == max_pages {
                warn!("Stopping discovery at the {max_pages} page limit; further pages were not read");
                break;
            }

            // Next-page references already carry their own query string
            let query: &[(&str, &str)] = if pages == 0 { &project_query } else { &[] };
            let response = self.client.get(url, query).await?;
            pages += 1;

            if !response.is_success() {
                return Err(CollectorError::Api {
                    status: response.status.as_u16(),
                    message: response.body_text(),
                });
            }

            let page: IdsPage = serde_json::from_slice(&response.body)?;
            let (items, next_href) = page.into_parts();
            identifiers.extend(items);
            progress.page_fetched(pages, identifiers.len());

            next_url = next_href
                .map(|href| self.client.resolve_href(&href))
                .transpose()?;
        }

        progress.finish(identifiers.len(), pages);

        self.store.write_identifiers(&identifiers)?;
        info!(
            "Saved {} identifiers to {}",
            identifiers.len(),
            self.store.ids_file().display()
        );

        Ok(identifiers)
    }

    /// Requests `identifiers[start_from..]` in chunks of `batch_size` and
    /// writes each raw response body to its batch artifact.
    ///
    /// A non-success status does not stop the run: the error body is still
    /// written, the artifact is recorded in the batch status log and the next
    /// chunk is requested. Returns the number of artifacts written.
    ///
    /// # Errors
    ///
    /// Transport failures (including timeouts) and local IO failures abort
    /// the run. Artifacts written before the failure stay valid.
    pub async fn fetch_batches(
        &self,
        identifiers: &[Identifier],
        start_from: usize,
        batch_size: usize,
    ) -> Result<usize> {
        let plan = plan_batches(identifiers.len(), start_from, batch_size)?;

        if plan.is_empty() {
            warn!(
                "Nothing to fetch: start offset {start_from} is past the {} known identifiers",
                identifiers.len()
            );
            return Ok(0);
        }

        info!(
            "Fetching {} identifiers in {} batches of {batch_size}, starting at {start_from}",
            identifiers.len() - start_from,
            plan.len()
        );

        let url = self.client.endpoint_url(&self.builds_endpoint)?;
        let mut status_log = BatchStatusLog::load(self.store.status_file());
        let progress = BatchProgress::start(plan.len());
        let mut written = 0;
        let mut failed = 0;

        for batch in &plan {
            let ids = join_identifiers(&identifiers[batch.range()]);
            let query = [
                ("projectExternalId", self.project_id.as_str()),
                ("ids", ids.as_str()),
            ];

            let response = self.client.get(url.clone(), &query).await?;

            let file_name = batch.file_name();
            let path = self.store.write_batch(&file_name, &response.body)?;
            written += 1;

            if response.is_success() {
                status_log.record_success(&file_name);
                info!(
                    "Finished batch from {} to {}",
                    batch.start,
                    batch.nominal_end()
                );
            } else {
                failed += 1;
                status_log.record_failure(&file_name, response.status.as_u16());
                error!(
                    "Batch from {} to {} failed with status {}; error body written to {}",
                    batch.start,
                    batch.nominal_end(),
                    response.status,
                    path.display()
                );
            }

            status_log.save()?;
            progress.batch_written(batch.start, batch.nominal_end());
        }

        progress.finish(written, failed);

        if failed > 0 {
            warn!(
                "{failed} batches returned errors; see {}",
                self.store.status_file().display()
            );
        }

        Ok(written)
    }
}

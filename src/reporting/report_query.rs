use std::sync::Arc;
use tracing::{debug, instrument};

use crate::config::ReportsConfig;
use crate::database::{Pagination, ReportFilter, ReportStore};
use crate::error::Result;
use crate::models::RssReport;

/// Filters, paginates and projects persisted sharing reports
pub struct ReportQueryService {
    reports: Arc<dyn ReportStore>,
    config: ReportsConfig,
}

impl ReportQueryService {
    pub fn new(reports: Arc<dyn ReportStore>, config: ReportsConfig) -> Self {
        Self { reports, config }
    }

    /// Reports matching `filter` within the `offset`/`size` window.
    ///
    /// A `size` of zero returns everything from `offset` on; sizes above the
    /// configured maximum are clamped. No match yields an empty list.
    #[instrument(skip(self))]
    pub async fn get_sharing_reports(
        &self,
        filter: &ReportFilter,
        offset: u32,
        size: u32,
    ) -> Result<Vec<RssReport>> {
        let pagination = Pagination::new(offset, size).clamped(self.config.max_page_size);

        let reports = self
            .reports
            .query(filter, pagination)
            .await?
            .unwrap_or_default();

        debug!(count = reports.len(), "Sharing reports loaded");

        Ok(reports.iter().map(RssReport::from).collect())
    }

    /// First page using the configured default window
    pub async fn first_page(&self, filter: &ReportFilter) -> Result<Vec<RssReport>> {
        self.get_sharing_reports(filter, 0, self.config.default_page_size)
            .await
    }
}

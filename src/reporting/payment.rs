use std::sync::Arc;
use tracing::{info, instrument, warn};

use crate::database::ReportStore;
use crate::models::ReportId;

/// Outcome of a paid-flag update.
///
/// "Does not exist" and "could not update" are kept apart; callers that only
/// need the old boolean contract can use [`PaymentUpdate::is_success`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PaymentUpdate {
    Updated,
    NotFound,
    Failed(String),
}

impl PaymentUpdate {
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Updated)
    }
}

pub struct PaymentFlagUpdater {
    reports: Arc<dyn ReportStore>,
}

impl PaymentFlagUpdater {
    pub fn new(reports: Arc<dyn ReportStore>) -> Self {
        Self { reports }
    }

    #[instrument(skip(self))]
    pub async fn set_pay_report(&self, id: ReportId, paid: bool) -> PaymentUpdate {
        match self.reports.set_paid(id, paid).await {
            Ok(true) => {
                info!(report_id = %id, paid, "Report payment flag updated");
                PaymentUpdate::Updated
            }
            Ok(false) => {
                warn!(report_id = %id, "Report not found for payment update");
                PaymentUpdate::NotFound
            }
            Err(e) => {
                warn!(report_id = %id, error = %e, "Report payment update failed");
                PaymentUpdate::Failed(e.to_string())
            }
        }
    }
}

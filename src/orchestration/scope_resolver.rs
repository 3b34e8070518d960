//! # Scope Resolver
//!
//! Expands the optional `(aggregator, provider, product class)` filter of a
//! settlement job into the concrete list of models to settle.
//!
//! Validation runs before resolution and only when an aggregator is named:
//!
//! - unknown aggregator: `NON_EXISTENT_RESOURCE_ID`
//! - provider not owned by the aggregator: `INVALID_PROVIDER`
//! - no model for the named scope and product class: `NON_EXISTENT_RESOURCE_ID`
//!
//! Without an aggregator the filter is applied leniently: aggregators that do
//! not own the requested provider are skipped.

use std::sync::Arc;
use tracing::{debug, instrument};

use crate::database::ModelDirectory;
use crate::error::{Result, RssError};
use crate::models::{Aggregator, Provider, RssModel, SettlementJob};

/// One model selected for settlement, with the entities it was resolved from
#[derive(Debug, Clone)]
pub struct ResolvedScope {
    pub aggregator: Aggregator,
    pub provider: Provider,
    pub model: RssModel,
}

pub struct ScopeResolver {
    directory: Arc<dyn ModelDirectory>,
}

impl ScopeResolver {
    pub fn new(directory: Arc<dyn ModelDirectory>) -> Self {
        Self { directory }
    }

    /// Reject a job whose named scope does not exist
    pub async fn validate(&self, job: &SettlementJob) -> Result<()> {
        let Some(aggregator_id) = job.aggregator_id() else {
            return Ok(());
        };

        if self.directory.get_aggregator(aggregator_id).await?.is_none() {
            return Err(RssError::non_existent_resource(aggregator_id));
        }

        let Some(provider_id) = job.provider_id() else {
            return Ok(());
        };

        if self
            .directory
            .get_provider(aggregator_id, provider_id)
            .await?
            .is_none()
        {
            return Err(RssError::invalid_provider(aggregator_id, provider_id));
        }

        if let Some(product_class) = job.product_class() {
            if !self
                .directory
                .model_exists(aggregator_id, provider_id, product_class)
                .await?
            {
                return Err(RssError::non_existent_resource(product_class));
            }
        }

        Ok(())
    }

    /// Validate `job`, then list every model in its scope.
    ///
    /// Order follows the directory: aggregators, then their providers, then
    /// the provider's models.
    #[instrument(skip(self, job), fields(job_id = %job.job_id))]
    pub async fn resolve(&self, job: &SettlementJob) -> Result<Vec<ResolvedScope>> {
        self.validate(job).await?;

        let aggregators = match job.aggregator_id() {
            Some(aggregator_id) => self
                .directory
                .get_aggregator(aggregator_id)
                .await?
                .into_iter()
                .collect(),
            None => self.directory.list_aggregators().await?,
        };

        let mut scopes = Vec::new();
        for aggregator in aggregators {
            let providers = self.providers_in_scope(&aggregator, job).await?;

            for provider in providers {
                let models = self
                    .directory
                    .list_models(
                        &aggregator.aggregator_id,
                        &provider.provider_id,
                        job.product_class(),
                    )
                    .await?;

                scopes.extend(models.into_iter().map(|model| ResolvedScope {
                    aggregator: aggregator.clone(),
                    provider: provider.clone(),
                    model,
                }));
            }
        }

        debug!(models = scopes.len(), "Settlement scope resolved");
        Ok(scopes)
    }

    async fn providers_in_scope(
        &self,
        aggregator: &Aggregator,
        job: &SettlementJob,
    ) -> Result<Vec<Provider>> {
        match job.provider_id() {
            Some(provider_id) => {
                let provider = self
                    .directory
                    .get_provider(&aggregator.aggregator_id, provider_id)
                    .await?;
                if provider.is_none() {
                    debug!(
                        aggregator_id = %aggregator.aggregator_id,
                        provider_id,
                        "Aggregator does not own provider; skipping"
                    );
                }
                Ok(provider.into_iter().collect())
            }
            None => self.directory.list_providers(&aggregator.aggregator_id).await,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::InMemoryStore;
    use crate::error::ValidationCode;
    use crate::settlement::FIXED_PERCENTAGE;
    use rust_decimal_macros::dec;

    fn model(aggregator_id: &str, provider_id: &str, product_class: &str) -> RssModel {
        RssModel {
            aggregator_id: aggregator_id.to_string(),
            owner_provider_id: provider_id.to_string(),
            product_class: product_class.to_string(),
            algorithm_type: FIXED_PERCENTAGE.to_string(),
            aggregator_value: dec!(30),
            owner_value: dec!(70),
            stakeholders: Vec::new(),
        }
    }

    fn resolver() -> ScopeResolver {
        let store = Arc::new(InMemoryStore::new());
        store
            .add_aggregator(Aggregator::new("a1", "First"))
            .add_aggregator(Aggregator::new("a2", "Second"))
            .add_provider(Provider::new("a1", "p1", "One"))
            .add_provider(Provider::new("a1", "p2", "Two"))
            .add_provider(Provider::new("a2", "p3", "Three"))
            .add_model(model("a1", "p1", "music"))
            .add_model(model("a1", "p1", "video"))
            .add_model(model("a1", "p2", "music"))
            .add_model(model("a2", "p3", "games"));
        ScopeResolver::new(store)
    }

    fn labels(scopes: &[ResolvedScope]) -> Vec<String> {
        scopes.iter().map(|s| s.model.scope_label()).collect()
    }

    #[tokio::test]
    async fn test_unfiltered_job_resolves_every_model() {
        let scopes = resolver()
            .resolve(&SettlementJob::new("cb"))
            .await
            .unwrap();

        assert_eq!(
            labels(&scopes),
            vec!["a1/p1/music", "a1/p1/video", "a1/p2/music", "a2/p3/games"]
        );
    }

    #[tokio::test]
    async fn test_product_class_filter_applies_across_aggregators() {
        let scopes = resolver()
            .resolve(&SettlementJob::new("cb").with_product_class("music"))
            .await
            .unwrap();

        assert_eq!(labels(&scopes), vec!["a1/p1/music", "a1/p2/music"]);
    }

    #[tokio::test]
    async fn test_provider_without_aggregator_skips_other_aggregators() {
        let scopes = resolver()
            .resolve(&SettlementJob::new("cb").with_provider("p3"))
            .await
            .unwrap();

        assert_eq!(labels(&scopes), vec!["a2/p3/games"]);
    }

    #[tokio::test]
    async fn test_foreign_provider_is_invalid() {
        let err = resolver()
            .resolve(&SettlementJob::new("cb").with_aggregator("a1").with_provider("p3"))
            .await
            .unwrap_err();

        assert_eq!(err.validation_code(), Some(ValidationCode::InvalidProvider));
    }

    #[tokio::test]
    async fn test_unknown_aggregator_is_non_existent() {
        let err = resolver()
            .resolve(&SettlementJob::new("cb").with_aggregator("nobody"))
            .await
            .unwrap_err();

        assert_eq!(err.validation_code(), Some(ValidationCode::NonExistentResourceId));
    }

    #[tokio::test]
    async fn test_missing_model_for_named_scope_is_non_existent() {
        let err = resolver()
            .resolve(
                &SettlementJob::new("cb")
                    .with_aggregator("a1")
                    .with_provider("p2")
                    .with_product_class("video"),
            )
            .await
            .unwrap_err();

        assert_eq!(err.validation_code(), Some(ValidationCode::NonExistentResourceId));
    }
}

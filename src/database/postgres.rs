//! # PostgreSQL Store
//!
//! SQLx implementation of the data-access traits against the schema in
//! `migrations/`. Queries are runtime-checked so the crate builds without a
//! live database.
//!
//! Every statement runs on its own pooled connection in autocommit mode, so a
//! write is durable once its statement returns and `flush` has nothing left to
//! push.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::{FromRow, PgPool, Postgres, QueryBuilder};
use tracing::{debug, error};

use super::{
    non_empty, CurrencyDirectory, ModelDirectory, Pagination, ReportFilter, ReportStore,
    TransactionStore,
};
use crate::error::{Result, RssError};
use crate::models::{
    Aggregator, Currency, NewSharingReport, Provider, ReportId, RssModel, SharingReport,
    StakeholderAllocation, StakeholderModel, Transaction,
};
use crate::state_machine::TransactionState;

#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    async fn model_stakeholders(&self, model_id: i64) -> Result<Vec<StakeholderModel>> {
        let rows = sqlx::query_as::<_, StakeholderRow>(
            r#"
            SELECT stakeholder_id, model_value
            FROM rss_model_stakeholders
            WHERE model_id = $1
            ORDER BY position
            "#,
        )
        .bind(model_id)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| RssError::database("model_stakeholders", e))?;

        Ok(rows
            .into_iter()
            .map(|row| StakeholderModel::new(row.stakeholder_id, row.model_value))
            .collect())
    }

    async fn report_allocations(&self, report_id: ReportId) -> Result<Vec<StakeholderAllocation>> {
        let rows = sqlx::query_as::<_, AllocationRow>(
            r#"
            SELECT rs.aggregator_id, rs.stakeholder_id, p.name, rs.model_value
            FROM rss_report_stakeholders rs
            JOIN rss_providers p
              ON p.aggregator_id = rs.aggregator_id AND p.provider_id = rs.stakeholder_id
            WHERE rs.report_id = $1
            ORDER BY rs.stakeholder_id
            "#,
        )
        .bind(report_id.value())
        .fetch_all(&self.pool)
        .await
        .map_err(|e| RssError::database("report_allocations", e))?;

        Ok(rows
            .into_iter()
            .map(|row| {
                StakeholderAllocation::stored(
                    report_id,
                    Provider::new(row.aggregator_id, row.stakeholder_id, row.name),
                    row.model_value,
                )
            })
            .collect())
    }

    async fn hydrate_report(&self, row: ReportRow) -> Result<SharingReport> {
        let id = ReportId::new(row.report_id);
        let mut report = SharingReport::persisted(
            id,
            NewSharingReport {
                algorithm_type: row.algorithm_type,
                product_class: row.product_class,
                generated_at: row.generated_at,
                aggregator_value: row.aggregator_value,
                owner_value: row.owner_value,
                owner: Provider::new(row.aggregator_id, row.owner_provider_id, row.owner_name),
                currency: Currency::new(row.currency_code, row.currency_name, row.currency_decimals),
                paid: row.paid,
            },
        );
        report.stakeholders = self.report_allocations(id).await?;
        Ok(report)
    }
}

const REPORT_SELECT: &str = r#"
    SELECT r.report_id, r.algorithm_type, r.product_class, r.generated_at,
           r.aggregator_value, r.owner_value, r.paid,
           r.aggregator_id, r.owner_provider_id, p.name AS owner_name,
           c.iso_code AS currency_code, c.name AS currency_name, c.decimals AS currency_decimals
    FROM rss_sharing_reports r
    JOIN rss_providers p
      ON p.aggregator_id = r.aggregator_id AND p.provider_id = r.owner_provider_id
    JOIN rss_currencies c ON c.iso_code = r.currency_code
"#;

#[async_trait]
impl ModelDirectory for PgStore {
    async fn list_aggregators(&self) -> Result<Vec<Aggregator>> {
        sqlx::query_as::<_, Aggregator>(
            "SELECT aggregator_id, name FROM rss_aggregators ORDER BY aggregator_id",
        )
        .fetch_all(&self.pool)
        .await
        .map_err(|e| RssError::database("list_aggregators", e))
    }

    async fn get_aggregator(&self, aggregator_id: &str) -> Result<Option<Aggregator>> {
        sqlx::query_as::<_, Aggregator>(
            "SELECT aggregator_id, name FROM rss_aggregators WHERE aggregator_id = $1",
        )
        .bind(aggregator_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| RssError::database("get_aggregator", e))
    }

    async fn list_providers(&self, aggregator_id: &str) -> Result<Vec<Provider>> {
        sqlx::query_as::<_, Provider>(
            r#"
            SELECT aggregator_id, provider_id, name
            FROM rss_providers
            WHERE aggregator_id = $1
            ORDER BY provider_id
            "#,
        )
        .bind(aggregator_id)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| RssError::database("list_providers", e))
    }

    async fn get_provider(
        &self,
        aggregator_id: &str,
        provider_id: &str,
    ) -> Result<Option<Provider>> {
        sqlx::query_as::<_, Provider>(
            r#"
            SELECT aggregator_id, provider_id, name
            FROM rss_providers
            WHERE aggregator_id = $1 AND provider_id = $2
            "#,
        )
        .bind(aggregator_id)
        .bind(provider_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| RssError::database("get_provider", e))
    }

    async fn list_models(
        &self,
        aggregator_id: &str,
        provider_id: &str,
        product_class: Option<&str>,
    ) -> Result<Vec<RssModel>> {
        let rows = sqlx::query_as::<_, ModelRow>(
            r#"
            SELECT model_id, aggregator_id, owner_provider_id, product_class,
                   algorithm_type, aggregator_value, owner_value
            FROM rss_models
            WHERE aggregator_id = $1
              AND owner_provider_id = $2
              AND ($3::VARCHAR IS NULL OR product_class = $3)
            ORDER BY product_class
            "#,
        )
        .bind(aggregator_id)
        .bind(provider_id)
        .bind(product_class.filter(|pc| !pc.is_empty()))
        .fetch_all(&self.pool)
        .await
        .map_err(|e| RssError::database("list_models", e))?;

        let mut models = Vec::with_capacity(rows.len());
        for row in rows {
            let stakeholders = self.model_stakeholders(row.model_id).await?;
            models.push(RssModel {
                aggregator_id: row.aggregator_id,
                owner_provider_id: row.owner_provider_id,
                product_class: row.product_class,
                algorithm_type: row.algorithm_type,
                aggregator_value: row.aggregator_value,
                owner_value: row.owner_value,
                stakeholders,
            });
        }
        Ok(models)
    }

    async fn model_exists(
        &self,
        aggregator_id: &str,
        provider_id: &str,
        product_class: &str,
    ) -> Result<bool> {
        let (exists,): (bool,) = sqlx::query_as(
            r#"
            SELECT EXISTS(
                SELECT 1 FROM rss_models
                WHERE aggregator_id = $1 AND owner_provider_id = $2 AND product_class = $3
            )
            "#,
        )
        .bind(aggregator_id)
        .bind(provider_id)
        .bind(product_class)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| RssError::database("model_exists", e))?;

        Ok(exists)
    }
}

#[async_trait]
impl TransactionStore for PgStore {
    async fn find_pending(
        &self,
        aggregator_id: &str,
        provider_id: &str,
        product_class: &str,
    ) -> Result<Vec<Transaction>> {
        let rows = sqlx::query_as::<_, TransactionRow>(
            r#"
            SELECT tx_id, aggregator_id, provider_id, product_class, transaction_type,
                   charged_amount, currency, state, created_at
            FROM rss_transactions
            WHERE aggregator_id = $1 AND provider_id = $2 AND product_class = $3
              AND state = 'pending'
            ORDER BY tx_id
            "#,
        )
        .bind(aggregator_id)
        .bind(provider_id)
        .bind(product_class)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| {
            error!("Failed to load pending transactions: {}", e);
            RssError::database("find_pending", e)
        })?;

        rows.into_iter().map(Transaction::try_from).collect()
    }

    async fn update(&self, transaction: &Transaction) -> Result<()> {
        sqlx::query("UPDATE rss_transactions SET state = $1 WHERE tx_id = $2")
            .bind(transaction.state.to_string())
            .bind(transaction.tx_id)
            .execute(&self.pool)
            .await
            .map_err(|e| RssError::database("update_transaction", e))?;
        Ok(())
    }

    async fn update_if_state(
        &self,
        transaction: &Transaction,
        expected: TransactionState,
    ) -> Result<bool> {
        let result =
            sqlx::query("UPDATE rss_transactions SET state = $1 WHERE tx_id = $2 AND state = $3")
                .bind(transaction.state.to_string())
                .bind(transaction.tx_id)
                .bind(expected.to_string())
                .execute(&self.pool)
                .await
                .map_err(|e| RssError::database("claim_transaction", e))?;

        Ok(result.rows_affected() == 1)
    }

    async fn flush(&self) -> Result<()> {
        debug!("Transaction writes are autocommitted; flush is a no-op");
        Ok(())
    }
}

#[async_trait]
impl ReportStore for PgStore {
    async fn create(&self, report: NewSharingReport) -> Result<SharingReport> {
        let (report_id,): (i64,) = sqlx::query_as(
            r#"
            INSERT INTO rss_sharing_reports (
                aggregator_id, owner_provider_id, product_class, algorithm_type,
                generated_at, aggregator_value, owner_value, currency_code, paid
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            RETURNING report_id
            "#,
        )
        .bind(&report.owner.aggregator_id)
        .bind(&report.owner.provider_id)
        .bind(&report.product_class)
        .bind(&report.algorithm_type)
        .bind(report.generated_at)
        .bind(report.aggregator_value)
        .bind(report.owner_value)
        .bind(&report.currency.iso_code)
        .bind(report.paid)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| RssError::database("create_report", e))?;

        Ok(SharingReport::persisted(ReportId::new(report_id), report))
    }

    async fn create_allocation(&self, allocation: &StakeholderAllocation) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO rss_report_stakeholders (report_id, aggregator_id, stakeholder_id, model_value)
            VALUES ($1, $2, $3, $4)
            "#,
        )
        .bind(allocation.report_id().value())
        .bind(&allocation.stakeholder.aggregator_id)
        .bind(&allocation.stakeholder.provider_id)
        .bind(allocation.model_value)
        .execute(&self.pool)
        .await
        .map_err(|e| RssError::database("create_allocation", e))?;
        Ok(())
    }

    async fn get_by_id(&self, id: ReportId) -> Result<Option<SharingReport>> {
        let sql = format!("{REPORT_SELECT} WHERE r.report_id = $1");
        let row = sqlx::query_as::<_, ReportRow>(&sql)
            .bind(id.value())
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| RssError::database("get_report", e))?;

        match row {
            Some(row) => Ok(Some(self.hydrate_report(row).await?)),
            None => Ok(None),
        }
    }

    async fn set_paid(&self, id: ReportId, paid: bool) -> Result<bool> {
        let result = sqlx::query("UPDATE rss_sharing_reports SET paid = $1 WHERE report_id = $2")
            .bind(paid)
            .bind(id.value())
            .execute(&self.pool)
            .await
            .map_err(|e| RssError::database("set_paid", e))?;

        Ok(result.rows_affected() == 1)
    }

    async fn query(
        &self,
        filter: &ReportFilter,
        pagination: Pagination,
    ) -> Result<Option<Vec<SharingReport>>> {
        let mut builder: QueryBuilder<Postgres> = QueryBuilder::new(REPORT_SELECT);
        builder.push(" WHERE 1 = 1");

        if let Some(aggregator_id) = non_empty(&filter.aggregator_id) {
            builder.push(" AND r.aggregator_id = ").push_bind(aggregator_id.to_string());
        }
        if let Some(provider_id) = non_empty(&filter.provider_id) {
            builder.push(" AND r.owner_provider_id = ").push_bind(provider_id.to_string());
        }
        if let Some(product_class) = non_empty(&filter.product_class) {
            builder.push(" AND r.product_class = ").push_bind(product_class.to_string());
        }
        if filter.only_paid {
            builder.push(" AND r.paid = TRUE");
        }
        builder.push(" ORDER BY r.report_id");
        builder.push(pagination.to_sql());

        let rows = builder
            .build_query_as::<ReportRow>()
            .fetch_all(&self.pool)
            .await
            .map_err(|e| RssError::database("query_reports", e))?;

        let mut reports = Vec::with_capacity(rows.len());
        for row in rows {
            reports.push(self.hydrate_report(row).await?);
        }
        Ok(Some(reports))
    }
}

#[async_trait]
impl CurrencyDirectory for PgStore {
    async fn get_by_iso_code(&self, iso_code: &str) -> Result<Option<Currency>> {
        sqlx::query_as::<_, Currency>(
            "SELECT iso_code, name, decimals FROM rss_currencies WHERE iso_code = $1",
        )
        .bind(iso_code)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| RssError::database("get_currency", e))
    }
}

/// Internal structs for SQL query results
#[derive(FromRow)]
struct ModelRow {
    model_id: i64,
    aggregator_id: String,
    owner_provider_id: String,
    product_class: String,
    algorithm_type: String,
    aggregator_value: Decimal,
    owner_value: Decimal,
}

#[derive(FromRow)]
struct StakeholderRow {
    stakeholder_id: String,
    model_value: Decimal,
}

#[derive(FromRow)]
struct TransactionRow {
    tx_id: i64,
    aggregator_id: String,
    provider_id: String,
    product_class: String,
    transaction_type: String,
    charged_amount: Decimal,
    currency: String,
    state: String,
    created_at: DateTime<Utc>,
}

impl TryFrom<TransactionRow> for Transaction {
    type Error = RssError;

    fn try_from(row: TransactionRow) -> Result<Self> {
        Ok(Self {
            tx_id: row.tx_id,
            aggregator_id: row.aggregator_id,
            provider_id: row.provider_id,
            product_class: row.product_class,
            transaction_type: row
                .transaction_type
                .parse()
                .map_err(|e: String| RssError::database("decode_transaction", e))?,
            charged_amount: row.charged_amount,
            currency: row.currency,
            state: row
                .state
                .parse()
                .map_err(|e: String| RssError::database("decode_transaction", e))?,
            created_at: row.created_at,
        })
    }
}

#[derive(FromRow)]
struct ReportRow {
    report_id: i64,
    algorithm_type: String,
    product_class: String,
    generated_at: DateTime<Utc>,
    aggregator_value: Decimal,
    owner_value: Decimal,
    paid: bool,
    aggregator_id: String,
    owner_provider_id: String,
    owner_name: String,
    currency_code: String,
    currency_name: String,
    currency_decimals: i16,
}

#[derive(FromRow)]
struct AllocationRow {
    aggregator_id: String,
    stakeholder_id: String,
    name: String,
    model_value: Decimal,
}

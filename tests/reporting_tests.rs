//! Report queries and payment flags over settled data.

mod common;

use common::*;
use rust_decimal_macros::dec;

use rss_core::config::{ReportsConfig, RssConfig};
use rss_core::database::{FailPoint, ReportFilter};
use rss_core::models::{ReportId, SettlementJob, StakeholderModel};
use rss_core::settlement::AllocationResult;
use rss_core::PaymentUpdate;

async fn settled_engine(config: RssConfig) -> TestEngine {
    let engine = TestEngine::with_config(seeded_store(), config);
    let mut rx = engine.completions.subscribe();
    engine
        .core
        .run_settlement(&SettlementJob::new("cb"))
        .await
        .unwrap();
    next_summary(&mut rx).await;
    engine
}

fn filter() -> ReportFilter {
    ReportFilter::default()
}

#[tokio::test]
async fn test_filters_narrow_reports() {
    let engine = settled_engine(RssConfig::default()).await;
    let core = &engine.core;

    let all = core.get_sharing_reports(&filter(), 0, 0).await.unwrap();
    assert_eq!(all.len(), 5);

    let a2 = core
        .get_sharing_reports(
            &ReportFilter {
                aggregator_id: Some(A2.to_string()),
                ..filter()
            },
            0,
            0,
        )
        .await
        .unwrap();
    assert_eq!(a2.len(), 1);
    assert_eq!(a2[0].currency, "USD");

    let p1 = core
        .get_sharing_reports(
            &ReportFilter {
                provider_id: Some("p1".to_string()),
                ..filter()
            },
            0,
            0,
        )
        .await
        .unwrap();
    assert_eq!(p1.len(), 3);

    let music = core
        .get_sharing_reports(
            &ReportFilter {
                product_class: Some("music".to_string()),
                ..filter()
            },
            0,
            0,
        )
        .await
        .unwrap();
    assert_eq!(music.len(), 3);
    assert!(music.iter().all(|r| r.product_class == "music"));

    let nothing = core
        .get_sharing_reports(
            &ReportFilter {
                aggregator_id: Some("nobody@example.com".to_string()),
                ..filter()
            },
            0,
            0,
        )
        .await
        .unwrap();
    assert!(nothing.is_empty());
}

#[tokio::test]
async fn test_paid_flag_round_trip() {
    let engine = settled_engine(RssConfig::default()).await;
    let core = &engine.core;
    let only_paid = ReportFilter {
        only_paid: true,
        ..filter()
    };

    assert!(core
        .get_sharing_reports(&only_paid, 0, 0)
        .await
        .unwrap()
        .is_empty());

    let target = core.get_sharing_reports(&filter(), 0, 0).await.unwrap()[1].id;
    assert_eq!(
        core.set_pay_report(ReportId::new(target), true).await,
        PaymentUpdate::Updated
    );

    let paid = core.get_sharing_reports(&only_paid, 0, 0).await.unwrap();
    assert_eq!(paid.len(), 1);
    assert_eq!(paid[0].id, target);
    assert!(paid[0].paid);

    assert_eq!(
        core.set_pay_report(ReportId::new(target), false).await,
        PaymentUpdate::Updated
    );
    assert!(core
        .get_sharing_reports(&only_paid, 0, 0)
        .await
        .unwrap()
        .is_empty());
}

#[tokio::test]
async fn test_paying_unknown_report_is_not_found() {
    let engine = settled_engine(RssConfig::default()).await;

    let outcome = engine.core.set_pay_report(ReportId::new(9_999), true).await;

    assert_eq!(outcome, PaymentUpdate::NotFound);
    assert!(!outcome.is_success());
}

#[tokio::test]
async fn test_offset_and_size_window_results() {
    let engine = settled_engine(RssConfig::default()).await;
    let core = &engine.core;

    let all: Vec<i64> = core
        .get_sharing_reports(&filter(), 0, 0)
        .await
        .unwrap()
        .iter()
        .map(|r| r.id)
        .collect();
    let window: Vec<i64> = core
        .get_sharing_reports(&filter(), 1, 2)
        .await
        .unwrap()
        .iter()
        .map(|r| r.id)
        .collect();
    let tail = core.get_sharing_reports(&filter(), 3, 0).await.unwrap();
    let past_end = core.get_sharing_reports(&filter(), 10, 5).await.unwrap();

    assert_eq!(window, all[1..3].to_vec());
    assert_eq!(tail.len(), 2);
    assert!(past_end.is_empty());
}

#[tokio::test]
async fn test_page_size_is_clamped() {
    let config = RssConfig {
        reports: ReportsConfig {
            default_page_size: 2,
            max_page_size: 3,
        },
        ..RssConfig::default()
    };
    let engine = settled_engine(config).await;

    let page = engine
        .core
        .get_sharing_reports(&filter(), 0, 100)
        .await
        .unwrap();

    assert_eq!(page.len(), 3);
}

#[tokio::test]
async fn test_query_failure_is_propagated() {
    let engine = settled_engine(RssConfig::default()).await;
    engine.store.inject_failure(FailPoint::QueryReports);

    assert!(engine
        .core
        .get_sharing_reports(&filter(), 0, 0)
        .await
        .is_err());
}

#[tokio::test]
async fn test_generated_report_collapses_duplicate_stakeholders() {
    let engine = TestEngine::new(reference_store());
    let result = AllocationResult {
        aggregator_value: dec!(1.00),
        owner_value: dec!(2.00),
        stakeholders: vec![
            StakeholderModel::new("partner", dec!(0.30)),
            StakeholderModel::new("partner", dec!(0.40)),
            StakeholderModel::new("p2", dec!(0.50)),
        ],
    };

    let report = engine
        .core
        .generate_report(&shared_music_model(), "EUR", &result)
        .await
        .unwrap();

    let views = engine
        .core
        .get_sharing_reports(&filter(), 0, 0)
        .await
        .unwrap();
    assert_eq!(views.len(), 1);
    assert_eq!(views[0].id, report.id.value());
    assert_eq!(
        views[0].stakeholders,
        vec![
            StakeholderModel::new("partner", dec!(0.30)),
            StakeholderModel::new("p2", dec!(0.50)),
        ]
    );
}

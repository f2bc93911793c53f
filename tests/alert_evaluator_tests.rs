mod common;

use std::time::Duration;

use common::{new_alert, Harness, NOW};
use stockalerts::{
    errors::{PassError, QuoteError, StoreError},
    models::{AlertCondition, AlertDraft},
    services::{
        alert_evaluator::{AlertOutcome, EvaluatorOptions},
        alert_store::AlertStore,
    },
};

#[tokio::test]
async fn above_alert_at_target_price_notifies_and_deactivates() {
    let h = Harness::default();
    let alert = new_alert("AAPL", 150.0, AlertCondition::Above);
    h.add(&alert).await;
    h.quotes.set("AAPL", 150.0);

    let report = h.evaluator.run_pass().await.unwrap();

    assert_eq!(
        report.outcome_for(alert.id),
        Some(&AlertOutcome::Triggered { price: 150.0 })
    );

    let notes = h.notifications.for_user(alert.user_id);
    assert_eq!(notes.len(), 1);
    assert!(notes[0].message.contains("AAPL"));
    assert!(notes[0].message.contains("150"));
    assert!(!notes[0].is_read);
    assert_eq!(notes[0].created_at, NOW);

    let stored = h.alerts.get(alert.id);
    assert!(!stored.is_active);
    assert_eq!(stored.triggered_at, Some(NOW));
}

#[tokio::test]
async fn below_alert_above_target_is_left_alone() {
    let h = Harness::default();
    let alert = new_alert("TSLA", 200.0, AlertCondition::Below);
    h.add(&alert).await;
    h.quotes.set("TSLA", 210.0);

    let report = h.evaluator.run_pass().await.unwrap();

    assert_eq!(
        report.outcome_for(alert.id),
        Some(&AlertOutcome::NotMet { price: 210.0 })
    );
    assert!(h.notifications.all().is_empty());
    assert!(h.alerts.get(alert.id).is_active);
}

#[tokio::test]
async fn below_alert_at_target_price_triggers() {
    let h = Harness::default();
    let alert = new_alert("TSLA", 200.0, AlertCondition::Below);
    h.add(&alert).await;
    h.quotes.set("TSLA", 200.0);

    let report = h.evaluator.run_pass().await.unwrap();

    assert_eq!(report.summary().triggered, 1);
    assert!(!h.alerts.get(alert.id).is_active);
}

#[tokio::test]
async fn quote_failure_keeps_alert_active_and_other_alerts_still_run() {
    let h = Harness::default();
    let bad = new_alert("BADSYM", 10.0, AlertCondition::Above);
    let hit = new_alert("AAPL", 150.0, AlertCondition::Above);
    let miss = new_alert("TSLA", 200.0, AlertCondition::Below);
    for a in [&bad, &hit, &miss] {
        h.add(a).await;
    }
    h.quotes.fail("BADSYM", QuoteError::Provider("symbol not found".into()));
    h.quotes.set("AAPL", 155.0);
    h.quotes.set("TSLA", 250.0);

    let report = h.evaluator.run_pass().await.unwrap();

    assert!(matches!(
        report.outcome_for(bad.id),
        Some(AlertOutcome::QuoteFailed(QuoteError::Provider(_)))
    ));
    assert!(h.alerts.get(bad.id).is_active);
    assert!(h.notifications.for_user(bad.user_id).is_empty());

    assert_eq!(h.notifications.for_user(hit.user_id).len(), 1);
    assert!(h.alerts.get(miss.id).is_active);

    let s = report.summary();
    assert_eq!((s.checked, s.triggered, s.not_met, s.quote_failures), (3, 1, 1, 1));
}

#[tokio::test]
async fn missing_price_is_a_failure_not_a_zero_price() {
    let h = Harness::default();
    // a zero price would satisfy "below 50"
    let alert = new_alert("AAPL", 50.0, AlertCondition::Below);
    h.add(&alert).await;
    h.quotes.fail("AAPL", QuoteError::MissingPrice("AAPL".into()));

    let report = h.evaluator.run_pass().await.unwrap();

    assert_eq!(
        report.outcome_for(alert.id),
        Some(&AlertOutcome::QuoteFailed(QuoteError::MissingPrice("AAPL".into())))
    );
    assert!(h.alerts.get(alert.id).is_active);
    assert!(h.notifications.all().is_empty());
}

#[tokio::test]
async fn back_to_back_passes_notify_once() {
    let h = Harness::default();
    let alert = new_alert("AAPL", 150.0, AlertCondition::Above);
    h.add(&alert).await;
    h.quotes.set("AAPL", 160.0);

    let first = h.evaluator.run_pass().await.unwrap();
    let second = h.evaluator.run_pass().await.unwrap();

    assert_eq!(first.summary().triggered, 1);
    assert_eq!(second.summary().checked, 0);
    assert_eq!(h.notifications.all().len(), 1);
    assert_eq!(h.quotes.calls(), 1);
}

#[tokio::test]
async fn notification_write_failure_is_isolated_to_that_alert() {
    let h = Harness::default();
    let broken = new_alert("AAPL", 100.0, AlertCondition::Above);
    let healthy = new_alert("MSFT", 100.0, AlertCondition::Above);
    h.add(&broken).await;
    h.add(&healthy).await;
    h.quotes.set("AAPL", 120.0);
    h.quotes.set("MSFT", 120.0);
    h.notifications.fail_for_user(broken.user_id);

    let report = h.evaluator.run_pass().await.unwrap();

    let outcome = report.outcome_for(broken.id).unwrap();
    assert!(outcome.is_store_failure());
    assert_eq!(
        outcome,
        &AlertOutcome::NotifyFailed {
            price: 120.0,
            error: StoreError::Database("disk full".into()),
        }
    );
    // not notified, so it must stay armed
    assert!(h.alerts.get(broken.id).is_active);

    assert_eq!(
        report.outcome_for(healthy.id),
        Some(&AlertOutcome::Triggered { price: 120.0 })
    );
    assert_eq!(h.notifications.for_user(healthy.user_id).len(), 1);
}

#[tokio::test]
async fn failed_deactivation_is_reconciled_without_a_second_notification() {
    let h = Harness::default();
    let alert = new_alert("AAPL", 150.0, AlertCondition::Above);
    h.add(&alert).await;
    h.quotes.set("AAPL", 151.0);
    h.alerts.fail_next_deactivations(alert.id, 1);

    let first = h.evaluator.run_pass().await.unwrap();
    assert!(matches!(
        first.outcome_for(alert.id),
        Some(AlertOutcome::DeactivateFailed { price, .. }) if *price == 151.0
    ));
    assert_eq!(h.notifications.all().len(), 1);
    assert!(h.alerts.get(alert.id).is_active);

    let second = h.evaluator.run_pass().await.unwrap();
    assert_eq!(
        second.outcome_for(alert.id),
        Some(&AlertOutcome::Reconciled { price: 151.0 })
    );
    assert_eq!(h.notifications.all().len(), 1);
    assert!(!h.alerts.get(alert.id).is_active);
}

#[tokio::test]
async fn failing_to_load_active_alerts_fails_the_pass() {
    let h = Harness::default();
    h.add(&new_alert("AAPL", 150.0, AlertCondition::Above)).await;
    h.quotes.set("AAPL", 150.0);
    h.alerts.fail_next_lists(1);

    let err = h.evaluator.run_pass().await.unwrap_err();

    assert_eq!(
        err,
        PassError::LoadActive(StoreError::Database("connection reset".into()))
    );
    assert_eq!(h.quotes.calls(), 0);

    // the next pass is independent
    let report = h.evaluator.run_pass().await.unwrap();
    assert_eq!(report.summary().triggered, 1);
}

#[tokio::test]
async fn malformed_alert_is_skipped() {
    let h = Harness::default();
    let blank = new_alert("   ", 10.0, AlertCondition::Above);
    let negative = new_alert("AAPL", -5.0, AlertCondition::Below);
    let good = new_alert("MSFT", 300.0, AlertCondition::Above);
    for a in [&blank, &negative, &good] {
        h.add(a).await;
    }
    h.quotes.set("AAPL", 1.0);
    h.quotes.set("MSFT", 301.0);

    let report = h.evaluator.run_pass().await.unwrap();

    assert!(matches!(report.outcome_for(blank.id), Some(AlertOutcome::Invalid(_))));
    assert!(matches!(report.outcome_for(negative.id), Some(AlertOutcome::Invalid(_))));
    assert!(h.alerts.get(negative.id).is_active);
    assert_eq!(report.summary().triggered, 1);
    assert_eq!(h.notifications.all().len(), 1);
}

#[tokio::test]
async fn alerts_on_the_same_symbol_share_one_quote() {
    let h = Harness::default();
    let low = new_alert("AAPL", 100.0, AlertCondition::Above);
    let high = new_alert("AAPL", 200.0, AlertCondition::Above);
    let floor = new_alert("aapl", 180.0, AlertCondition::Below);
    for a in [&low, &high, &floor] {
        h.add(a).await;
    }
    h.quotes.set("AAPL", 150.0);

    let report = h.evaluator.run_pass().await.unwrap();

    assert_eq!(h.quotes.calls(), 1);
    assert_eq!(report.outcome_for(low.id), Some(&AlertOutcome::Triggered { price: 150.0 }));
    assert_eq!(report.outcome_for(high.id), Some(&AlertOutcome::NotMet { price: 150.0 }));
    assert_eq!(report.outcome_for(floor.id), Some(&AlertOutcome::Triggered { price: 150.0 }));
}

#[tokio::test(start_paused = true)]
async fn hanging_quote_times_out_without_stalling_the_pass() {
    let h = Harness::new(EvaluatorOptions {
        quote_timeout: Duration::from_secs(5),
        quote_concurrency: 2,
    });
    let alert = new_alert("AAPL", 150.0, AlertCondition::Above);
    h.add(&alert).await;
    h.quotes.set("AAPL", 150.0);
    h.quotes.set_delay(Duration::from_secs(3600));

    let started = tokio::time::Instant::now();
    let report = h.evaluator.run_pass().await.unwrap();

    assert!(started.elapsed() < Duration::from_secs(60));
    assert_eq!(
        report.outcome_for(alert.id),
        Some(&AlertOutcome::QuoteFailed(QuoteError::Timeout("AAPL".into())))
    );
    assert!(h.alerts.get(alert.id).is_active);
}

#[tokio::test]
async fn rearmed_alert_can_notify_again() {
    let h = Harness::default();
    let alert = new_alert("AAPL", 150.0, AlertCondition::Above);
    h.add(&alert).await;
    h.quotes.set("AAPL", 150.0);

    h.evaluator.run_pass().await.unwrap();
    assert_eq!(h.notifications.all().len(), 1);

    let mut stored = h.alerts.get(alert.id);
    stored.apply_draft(&AlertDraft {
        symbol: "AAPL".into(),
        target_price: 150.0,
        condition: AlertCondition::Above,
        is_active: Some(true),
    });
    assert!(h.alerts.replace(&stored).await.unwrap());

    let report = h.evaluator.run_pass().await.unwrap();
    assert_eq!(report.outcome_for(alert.id), Some(&AlertOutcome::Triggered { price: 150.0 }));
    assert_eq!(h.notifications.all().len(), 2);
}

#[tokio::test]
async fn rule_edited_after_failed_deactivation_notifies_again() {
    let h = Harness::default();
    let alert = new_alert("AAPL", 150.0, AlertCondition::Above);
    h.add(&alert).await;
    h.quotes.set("AAPL", 151.0);
    h.alerts.fail_next_deactivations(alert.id, 1);

    let first = h.evaluator.run_pass().await.unwrap();
    assert!(first.outcome_for(alert.id).unwrap().is_store_failure());
    assert_eq!(h.notifications.all().len(), 1);

    // owner tightens the target before the next pass
    let mut stored = h.alerts.get(alert.id);
    stored.apply_draft(&AlertDraft {
        symbol: "AAPL".into(),
        target_price: 151.0,
        condition: AlertCondition::Above,
        is_active: None,
    });
    assert!(h.alerts.replace(&stored).await.unwrap());

    let second = h.evaluator.run_pass().await.unwrap();
    assert_eq!(
        second.outcome_for(alert.id),
        Some(&AlertOutcome::Triggered { price: 151.0 })
    );

    let notes = h.notifications.all();
    assert_eq!(notes.len(), 2);
    assert!(notes.iter().any(|n| n.message.contains("$151.")));
    assert!(!h.alerts.get(alert.id).is_active);
}

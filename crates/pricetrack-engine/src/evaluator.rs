//! Alert decision policy. Pure: given the tracking's policy, the price
//! on record before this check, and the fresh snapshot, decide which
//! notifications fire. No I/O, deterministic, at most one price event
//! and one stock event per call — price first.

use pricetrack_core::types::{
    AlertKind, NotificationEvent, ProductSnapshot, StockStatus, Tracking,
};

/// Evaluate one check result against a tracking's alert policy.
pub fn evaluate(
    tracking: &Tracking,
    old_price: Option<f64>,
    snapshot: &ProductSnapshot,
) -> Vec<NotificationEvent> {
    let mut events = Vec::new();

    if let Some(event) = evaluate_price(tracking, old_price, snapshot) {
        events.push(event);
    }
    if let Some(event) = evaluate_stock(tracking, snapshot) {
        events.push(event);
    }
    events
}

fn evaluate_price(
    tracking: &Tracking,
    old_price: Option<f64>,
    snapshot: &ProductSnapshot,
) -> Option<NotificationEvent> {
    let new_price = snapshot.price?;
    // Percent change against a zero or missing old price is undefined:
    // skip price evaluation entirely.
    let old_price = old_price.filter(|p| *p > 0.0)?;
    if new_price == old_price {
        return None;
    }

    let change_percent = ((new_price - old_price) / old_price) * 100.0;

    let fires = match tracking.alert.kind {
        AlertKind::AnyChange => true,
        // Missing required threshold means the rule never fires.
        AlertKind::PercentageDrop => tracking
            .alert
            .threshold
            .is_some_and(|t| change_percent <= -t),
        AlertKind::FixedPrice => tracking.alert.threshold.is_some_and(|t| new_price <= t),
        AlertKind::StockOnly => false,
    };

    // Increase suppression overrides any match, any-change included.
    if change_percent > 0.0 && !tracking.alert.notify_on_price_increase {
        return None;
    }

    fires.then(|| NotificationEvent::PriceAlert {
        tracking: tracking.clone(),
        old_price,
        new_price,
        change_percent,
    })
}

fn evaluate_stock(tracking: &Tracking, snapshot: &ProductSnapshot) -> Option<NotificationEvent> {
    // Alerts only when leaving stock, never on re-entry. Deliberate
    // asymmetry; see DESIGN.md before changing it.
    if snapshot.stock_status == StockStatus::InStock || !tracking.alert.notify_on_stock {
        return None;
    }
    Some(NotificationEvent::StockAlert {
        tracking: tracking.clone(),
        status: snapshot.stock_status,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use pricetrack_core::types::AlertConfig;

    fn tracking(alert: AlertConfig) -> Tracking {
        let snapshot = snapshot(Some(1000.0), StockStatus::InStock);
        let mut t = Tracking::new(1, "https://example.com/p", "amazon", &snapshot);
        t.alert = alert;
        t
    }

    fn snapshot(price: Option<f64>, stock: StockStatus) -> ProductSnapshot {
        ProductSnapshot {
            name: Some("Widget".into()),
            price,
            currency: Some("INR".into()),
            stock_status: stock,
            discount: None,
            image_url: None,
            product_id: None,
        }
    }

    fn any_change() -> AlertConfig {
        AlertConfig {
            kind: AlertKind::AnyChange,
            threshold: None,
            notify_on_stock: false,
            notify_on_price_increase: false,
        }
    }

    fn percentage_drop(threshold: f64) -> AlertConfig {
        AlertConfig {
            kind: AlertKind::PercentageDrop,
            threshold: Some(threshold),
            notify_on_stock: false,
            notify_on_price_increase: false,
        }
    }

    fn price_event(events: &[NotificationEvent]) -> Option<(f64, f64, f64)> {
        events.iter().find_map(|e| match e {
            NotificationEvent::PriceAlert {
                old_price,
                new_price,
                change_percent,
                ..
            } => Some((*old_price, *new_price, *change_percent)),
            _ => None,
        })
    }

    #[test]
    fn test_equal_price_no_event() {
        let t = tracking(any_change());
        let events = evaluate(&t, Some(1000.0), &snapshot(Some(1000.0), StockStatus::InStock));
        assert!(events.is_empty());
    }

    #[test]
    fn test_any_change_fires_on_drop() {
        let t = tracking(any_change());
        let events = evaluate(&t, Some(1000.0), &snapshot(Some(999.0), StockStatus::InStock));
        assert_eq!(events.len(), 1);
        let (old, new, _) = price_event(&events).unwrap();
        assert_eq!((old, new), (1000.0, 999.0));
    }

    #[test]
    fn test_any_change_increase_suppressed_by_default() {
        let t = tracking(any_change());
        let events = evaluate(&t, Some(1000.0), &snapshot(Some(1100.0), StockStatus::InStock));
        assert!(events.is_empty());
    }

    #[test]
    fn test_increase_fires_when_opted_in() {
        let mut config = any_change();
        config.notify_on_price_increase = true;
        let t = tracking(config);
        let events = evaluate(&t, Some(1000.0), &snapshot(Some(1100.0), StockStatus::InStock));
        let (_, _, change) = price_event(&events).unwrap();
        assert!((change - 10.0).abs() < 1e-9);
    }

    #[test]
    fn test_percentage_drop_boundary_inclusive() {
        let t = tracking(percentage_drop(5.0));
        // Exactly -5%: fires.
        let events = evaluate(&t, Some(1000.0), &snapshot(Some(950.0), StockStatus::InStock));
        assert_eq!(events.len(), 1);
        // -4%: does not.
        let events = evaluate(&t, Some(1000.0), &snapshot(Some(960.0), StockStatus::InStock));
        assert!(events.is_empty());
    }

    #[test]
    fn test_percentage_drop_six_percent_scenario() {
        let t = tracking(percentage_drop(5.0));
        let events = evaluate(&t, Some(1000.0), &snapshot(Some(940.0), StockStatus::InStock));
        let (_, _, change) = price_event(&events).unwrap();
        assert!((change + 6.0).abs() < 1e-9);
    }

    #[test]
    fn test_fixed_price_boundary_inclusive() {
        let config = AlertConfig {
            kind: AlertKind::FixedPrice,
            threshold: Some(900.0),
            notify_on_stock: false,
            notify_on_price_increase: false,
        };
        let t = tracking(config);
        let events = evaluate(&t, Some(1000.0), &snapshot(Some(900.0), StockStatus::InStock));
        assert_eq!(events.len(), 1);
        let events = evaluate(&t, Some(1000.0), &snapshot(Some(901.0), StockStatus::InStock));
        assert!(events.is_empty());
    }

    #[test]
    fn test_missing_threshold_never_fires() {
        let mut config = percentage_drop(5.0);
        config.threshold = None;
        let t = tracking(config);
        let events = evaluate(&t, Some(1000.0), &snapshot(Some(500.0), StockStatus::InStock));
        assert!(events.is_empty());
    }

    #[test]
    fn test_zero_or_missing_old_price_skips_price_rule() {
        let t = tracking(any_change());
        assert!(evaluate(&t, Some(0.0), &snapshot(Some(500.0), StockStatus::InStock)).is_empty());
        assert!(evaluate(&t, None, &snapshot(Some(500.0), StockStatus::InStock)).is_empty());
    }

    #[test]
    fn test_missing_new_price_skips_price_rule() {
        let t = tracking(any_change());
        assert!(evaluate(&t, Some(1000.0), &snapshot(None, StockStatus::InStock)).is_empty());
    }

    #[test]
    fn test_stock_only_never_fires_on_price() {
        let config = AlertConfig {
            kind: AlertKind::StockOnly,
            threshold: None,
            notify_on_stock: true,
            notify_on_price_increase: false,
        };
        let t = tracking(config);
        let events = evaluate(&t, Some(1000.0), &snapshot(Some(100.0), StockStatus::InStock));
        assert!(events.is_empty());
    }

    #[test]
    fn test_stock_alert_fires_on_leaving_stock() {
        let mut config = any_change();
        config.notify_on_stock = true;
        let t = tracking(config);
        let events = evaluate(&t, Some(1000.0), &snapshot(Some(1000.0), StockStatus::OutOfStock));
        assert_eq!(events.len(), 1);
        assert!(matches!(
            events[0],
            NotificationEvent::StockAlert { status: StockStatus::OutOfStock, .. }
        ));
    }

    #[test]
    fn test_no_stock_alert_on_return_to_stock() {
        // Re-entering stock stays quiet.
        let mut config = any_change();
        config.notify_on_stock = true;
        let t = tracking(config);
        let events = evaluate(&t, Some(1000.0), &snapshot(Some(1000.0), StockStatus::InStock));
        assert!(events.is_empty());
    }

    #[test]
    fn test_stock_alert_respects_opt_out() {
        let t = tracking(any_change()); // notify_on_stock = false
        let events = evaluate(&t, Some(1000.0), &snapshot(Some(1000.0), StockStatus::OutOfStock));
        assert!(events.is_empty());
    }

    #[test]
    fn test_both_events_price_before_stock() {
        let mut config = any_change();
        config.notify_on_stock = true;
        let t = tracking(config);
        let events = evaluate(&t, Some(1000.0), &snapshot(Some(900.0), StockStatus::OutOfStock));
        assert_eq!(events.len(), 2);
        assert!(matches!(events[0], NotificationEvent::PriceAlert { .. }));
        assert!(matches!(events[1], NotificationEvent::StockAlert { .. }));
    }

    #[test]
    fn test_unknown_stock_counts_as_not_in_stock() {
        let mut config = any_change();
        config.notify_on_stock = true;
        let t = tracking(config);
        let events = evaluate(&t, Some(1000.0), &snapshot(Some(1000.0), StockStatus::Unknown));
        assert_eq!(events.len(), 1);
    }
}

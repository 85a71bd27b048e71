//! Baseline lifecycle across process restarts: capture, persist, reload.

use chrono::{DateTime, Utc};
use pairbalance::{
    evaluate, BaselineStore, Holding, HoldingMap, MarketView, Mint, PriceMap, TokenPair,
};

fn pair() -> TokenPair {
    TokenPair::new(Mint::new("A"), Mint::new("B"))
}

fn market(price_a: f64, price_b: f64, bal_a: f64, bal_b: f64) -> (PriceMap, HoldingMap) {
    let p = pair();
    let mut prices = PriceMap::default();
    prices.insert(p.a.clone(), price_a);
    prices.insert(p.b.clone(), price_b);
    let mut holdings = HoldingMap::default();
    holdings.insert(p.a.clone(), Holding::new(bal_a, 6));
    holdings.insert(p.b.clone(), Holding::new(bal_b, 9));
    (prices, holdings)
}

fn at(ts: &str) -> DateTime<Utc> {
    ts.parse().unwrap()
}

/// Run one tick and persist whatever the engine captured, the way the
/// rebalancer does.
fn tick(store: &BaselineStore, baseline: &mut pairbalance::Baseline, market: (PriceMap, HoldingMap), now: DateTime<Utc>) {
    let p = pair();
    let view = MarketView {
        pair: &p,
        prices: &market.0,
        holdings: &market.1,
        now,
    };
    let e = evaluate(&view, baseline, 1.7).unwrap();
    if e.captured.snapshot {
        store.save_snapshot(baseline.snapshot.as_ref().unwrap()).unwrap();
    }
    if e.captured.initial_value {
        store.save_initial_value(baseline.initial_value.unwrap()).unwrap();
    }
}

#[test]
fn restart_reuses_persisted_baseline() {
    let dir = tempfile::tempdir().unwrap();
    let store = BaselineStore::in_dir(dir.path());

    let mut baseline = store.load();
    tick(&store, &mut baseline, market(1.0, 3.0, 100.0, 50.0), at("2026-02-01T00:00:00Z"));

    // New process, different market.
    let mut reloaded = store.load();
    assert_eq!(reloaded, baseline);
    tick(&store, &mut reloaded, market(5.0, 5.0, 1.0, 1.0), at("2026-02-02T00:00:00Z"));

    let on_disk = store.load();
    assert_eq!(on_disk.initial_value, Some(250.0));
    assert_eq!(
        on_disk.snapshot.unwrap().timestamp,
        at("2026-02-01T00:00:00Z")
    );
}

#[test]
fn deleted_value_file_is_recaptured_alone() {
    let dir = tempfile::tempdir().unwrap();
    let store = BaselineStore::in_dir(dir.path());

    let mut baseline = store.load();
    tick(&store, &mut baseline, market(1.0, 3.0, 100.0, 50.0), at("2026-02-01T00:00:00Z"));
    std::fs::remove_file(store.value_path()).unwrap();

    let mut reloaded = store.load();
    assert!(reloaded.initial_value.is_none());
    tick(&store, &mut reloaded, market(2.0, 3.0, 100.0, 50.0), at("2026-02-03T00:00:00Z"));

    let on_disk = store.load();
    assert_eq!(on_disk.initial_value, Some(350.0));
    let snapshot = on_disk.snapshot.unwrap();
    assert_eq!(snapshot.timestamp, at("2026-02-01T00:00:00Z"));
    assert_eq!(snapshot.token(&Mint::new("A")).unwrap().price, 1.0);
    assert_eq!(snapshot.token(&Mint::new("B")).unwrap().decimals, 9);
}

#[test]
fn corrupt_snapshot_is_replaced_on_next_tick() {
    let dir = tempfile::tempdir().unwrap();
    let store = BaselineStore::in_dir(dir.path());
    std::fs::write(store.snapshot_path(), "{\"timestamp\": 12").unwrap();

    let mut baseline = store.load();
    assert!(baseline.snapshot.is_none());
    tick(&store, &mut baseline, market(1.0, 3.0, 100.0, 50.0), at("2026-02-01T00:00:00Z"));

    assert!(store.load_snapshot().is_some());
}

use super::*;

use crate::testkit;

fn pool(spec: &[(&str, u32)]) -> EndpointPool {
    EndpointPool::new(
        testkit::domain::endpoints(spec),
        EndpointId::new(0),
        HealthSettings::default(),
    )
    .unwrap()
}

fn half_open_pool(spec: &[(&str, u32)]) -> EndpointPool {
    EndpointPool::new(
        testkit::domain::endpoints(spec),
        EndpointId::new(0),
        testkit::config::health(ExhaustionPolicy::HalfOpen),
    )
    .unwrap()
}

fn id(index: usize) -> EndpointId {
    EndpointId::new(index)
}

// -- Construction ---------------------------------------------------------

#[test]
fn test_rejects_empty_table() {
    let result = EndpointPool::new(Vec::new(), id(0), HealthSettings::default());
    assert!(result.is_err());
}

#[test]
fn test_rejects_primary_outside_table() {
    let result = EndpointPool::new(
        testkit::domain::endpoints(&[("a", 1)]),
        id(3),
        HealthSettings::default(),
    );
    assert!(result.is_err());
}

#[test]
fn test_rejects_zero_threshold() {
    let settings = HealthSettings {
        error_threshold: 0,
        ..HealthSettings::default()
    };
    let result = EndpointPool::new(testkit::domain::endpoints(&[("a", 1)]), id(0), settings);
    assert!(result.is_err());
}

#[test]
fn test_from_config_pins_lowest_priority() {
    let config = testkit::config::config(&[("a", 1), ("b", 1)]);
    let pool = EndpointPool::from_config(&config).unwrap();

    assert_eq!(pool.write_primary(), id(0));
    assert_eq!(pool.endpoints().len(), 2);
}

// -- Read selection -------------------------------------------------------

#[tokio::test]
async fn test_equal_weights_alternate_deterministically() {
    let pool = pool(&[("a", 5), ("b", 5)]);

    let picks: Vec<String> = (0..10)
        .map(|_| pool.select_for_read().unwrap().name().to_string())
        .collect();

    assert_eq!(picks, ["a", "b", "a", "b", "a", "b", "a", "b", "a", "b"]);
}

#[tokio::test]
async fn test_higher_weight_wins_ties_on_errors() {
    let pool = pool(&[("light", 1), ("heavy", 10)]);

    assert_eq!(pool.select_for_read().unwrap().name(), "heavy");
}

#[tokio::test]
async fn test_error_count_outranks_weight() {
    let pool = pool(&[("light", 1), ("heavy", 10)]);

    pool.report_error(id(1));

    assert_eq!(pool.select_for_read().unwrap().name(), "light");
    assert!(pool.is_healthy(id(1)));
}

#[tokio::test]
async fn test_success_clears_error_count() {
    let pool = pool(&[("a", 1), ("b", 1)]);

    pool.report_error(id(0));
    pool.report_error(id(0));
    pool.report_success(id(0));
    pool.report_error(id(0));

    // Two more errors would have tripped it without the reset.
    assert!(pool.is_healthy(id(0)));
    assert_eq!(pool.snapshot()[0].error_count, 1);
}

// -- Health transitions ---------------------------------------------------

#[tokio::test]
async fn test_three_errors_trip_and_reads_move_away() {
    let pool = pool(&[("a", 5), ("b", 5)]);

    pool.report_error(id(0));
    pool.report_error(id(0));
    assert!(pool.is_healthy(id(0)));
    pool.report_error(id(0));

    assert!(!pool.is_healthy(id(0)));
    for _ in 0..5 {
        assert_eq!(pool.select_for_read().unwrap().name(), "b");
    }
    assert_eq!(pool.stats().trips, 1);
}

#[tokio::test]
async fn test_unhealthy_never_selected_while_healthy_exists() {
    let pool = pool(&[("a", 100), ("b", 1), ("c", 1)]);

    for _ in 0..3 {
        pool.report_error(id(0));
    }

    for _ in 0..50 {
        assert_ne!(pool.select_for_read().unwrap().name(), "a");
    }
}

#[tokio::test]
async fn test_writes_stay_on_primary() {
    let pool = pool(&[("primary", 1), ("other", 10)]);

    for _ in 0..3 {
        pool.report_error(id(0));
    }

    assert!(!pool.is_healthy(id(0)));
    for _ in 0..3 {
        assert_eq!(pool.select_for_write().name(), "primary");
    }
}

#[tokio::test(start_paused = true)]
async fn test_recovers_after_cooldown() {
    let pool = pool(&[("a", 1), ("b", 1)]);

    for _ in 0..3 {
        pool.report_error(id(0));
    }
    assert!(!pool.is_healthy(id(0)));

    tokio::time::advance(Duration::from_secs(29)).await;
    assert!(!pool.is_healthy(id(0)));

    tokio::time::advance(Duration::from_secs(1)).await;
    tokio::task::yield_now().await;
    assert!(pool.is_healthy(id(0)));
    assert_eq!(pool.snapshot()[0].error_count, 0);
}

#[tokio::test(start_paused = true)]
async fn test_late_errors_do_not_delay_recovery() {
    let pool = pool(&[("a", 1), ("b", 1)]);

    for _ in 0..3 {
        pool.report_error(id(0));
    }
    tokio::time::advance(Duration::from_secs(20)).await;
    pool.report_error(id(0));
    pool.report_error(id(0));

    tokio::time::advance(Duration::from_secs(10)).await;
    tokio::task::yield_now().await;
    assert!(pool.is_healthy(id(0)));
}

#[test]
fn test_recovery_without_runtime_happens_on_access() {
    let settings = HealthSettings {
        recovery: Duration::from_millis(20),
        ..HealthSettings::default()
    };
    let pool = EndpointPool::new(
        testkit::domain::endpoints(&[("a", 1), ("b", 1)]),
        id(0),
        settings,
    )
    .unwrap();

    for _ in 0..3 {
        pool.report_error(id(0));
    }
    assert!(!pool.is_healthy(id(0)));

    std::thread::sleep(Duration::from_millis(40));
    assert!(pool.is_healthy(id(0)));
}

// -- Exhaustion -----------------------------------------------------------

#[tokio::test]
async fn test_reset_all_when_everything_is_unhealthy() {
    let pool = pool(&[("a", 1), ("b", 1)]);

    for index in 0..2 {
        for _ in 0..3 {
            pool.report_error(id(index));
        }
    }
    assert_eq!(pool.stats().healthy, 0);

    let picked = pool.select_for_read().unwrap();

    assert_eq!(picked.name(), "a");
    let stats = pool.stats();
    assert_eq!(stats.healthy, 2);
    assert_eq!(stats.resets, 1);
}

#[tokio::test(start_paused = true)]
async fn test_half_open_probes_nearest_recovery() {
    let pool = half_open_pool(&[("a", 1), ("b", 1)]);

    for _ in 0..3 {
        pool.report_error(id(1));
    }
    tokio::time::advance(Duration::from_secs(5)).await;
    for _ in 0..3 {
        pool.report_error(id(0));
    }

    let probe = pool.select_for_read().unwrap();

    assert_eq!(probe.name(), "b");
    let stats = pool.stats();
    assert_eq!(stats.healthy, 0);
    assert_eq!(stats.probes, 1);
    assert_eq!(stats.resets, 0);
}

#[tokio::test]
async fn test_half_open_probe_success_restores() {
    let pool = half_open_pool(&[("a", 1)]);

    for _ in 0..3 {
        pool.report_error(id(0));
    }
    let probe = pool.select_for_read().unwrap();
    pool.report_success(probe.id());

    assert!(pool.is_healthy(id(0)));
}

#[tokio::test(start_paused = true)]
async fn test_half_open_probe_failure_rearms() {
    let pool = half_open_pool(&[("a", 1)]);

    for _ in 0..3 {
        pool.report_error(id(0));
    }
    tokio::time::advance(Duration::from_secs(20)).await;

    let probe = pool.select_for_read().unwrap();
    pool.report_error(probe.id());
    assert_eq!(pool.stats().trips, 2);

    // The original deadline passes without restoring it.
    tokio::time::advance(Duration::from_secs(15)).await;
    tokio::task::yield_now().await;
    assert!(!pool.is_healthy(id(0)));

    tokio::time::advance(Duration::from_secs(15)).await;
    tokio::task::yield_now().await;
    assert!(pool.is_healthy(id(0)));
}

#[tokio::test]
async fn test_half_open_hands_out_one_probe_per_endpoint() {
    let pool = half_open_pool(&[("a", 1), ("b", 1)]);
    for index in 0..2 {
        for _ in 0..3 {
            pool.report_error(id(index));
        }
    }

    let first = pool.select_for_read().unwrap();
    let second = pool.select_for_read().unwrap();
    let err = pool.select_for_read().unwrap_err();

    assert_eq!(first.name(), "a");
    assert_eq!(second.name(), "b");
    assert!(matches!(
        err,
        crate::error::Error::Pool(crate::error::PoolError::NoHealthyEndpoint)
    ));
    assert_eq!(pool.stats().probes, 2);

    // A reported probe frees its endpoint for the next one.
    pool.report_error(first.id());
    assert_eq!(pool.select_for_read().unwrap().name(), "a");
    assert_eq!(pool.stats().probes, 3);
}

#[tokio::test]
async fn test_half_open_single_endpoint_waits_for_its_probe() {
    let pool = half_open_pool(&[("a", 1)]);
    for _ in 0..3 {
        pool.report_error(id(0));
    }

    let probe = pool.select_for_read().unwrap();
    for _ in 0..4 {
        assert!(pool.select_for_read().is_err());
    }
    assert_eq!(pool.stats().probes, 1);

    pool.report_success(probe.id());
    assert!(pool.is_healthy(id(0)));
    assert_eq!(pool.select_for_read().unwrap().name(), "a");
}

// -- Observability --------------------------------------------------------

#[tokio::test]
async fn test_snapshot_reports_usage_and_primary() {
    let pool = pool(&[("a", 2), ("b", 1)]);

    pool.select_for_read().unwrap();
    pool.select_for_write();
    pool.report_error(id(1));

    let snapshot = pool.snapshot();
    assert_eq!(snapshot.len(), 2);
    assert!(snapshot[0].is_write_primary);
    assert_eq!(snapshot[0].request_count, 2);
    assert!(snapshot[0].last_used_at.is_some());
    assert!(!snapshot[1].is_write_primary);
    assert_eq!(snapshot[1].error_count, 1);
    assert!(snapshot[1].healthy);
}

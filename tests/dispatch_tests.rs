//! End-to-end tests for reads, writes and the direct submission path
//! through a fully wired [`DispatchCore`].

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;
use serde_json::{json, Value};
use tokio::time::Instant;

use switchyard::application::DispatchCore;
use switchyard::domain::{Endpoint, EndpointId, ExecutionRoute, TransactionId, TransactionStatus};
use switchyard::error::{ErrorCode, ProviderError};
use switchyard::port::RpcTransport;
use switchyard::testkit;
use switchyard::testkit::domain::SIGNATURE;
use switchyard::testkit::transport::MockTransport;

fn core(spec: &[(&str, u32)]) -> (DispatchCore, Arc<MockTransport>) {
    let transport = Arc::new(MockTransport::new());
    let config = testkit::config::config(spec);
    let core = DispatchCore::build(config, Arc::clone(&transport) as Arc<dyn RpcTransport>)
        .expect("core builds");
    (core, transport)
}

fn endpoints_called(transport: &MockTransport) -> Vec<String> {
    transport.calls().into_iter().map(|c| c.endpoint).collect()
}

// ----------------------------------------------------------------------------
// Endpoint pool
// ----------------------------------------------------------------------------

#[tokio::test]
async fn equal_endpoints_share_reads_deterministically() {
    let (core, transport) = core(&[("a", 5), ("b", 5)]);
    core.start();

    for _ in 0..10 {
        core.get_balance("addr").await.unwrap();
    }

    assert_eq!(
        endpoints_called(&transport),
        ["a", "b", "a", "b", "a", "b", "a", "b", "a", "b"]
    );
    let counts: Vec<_> = core
        .pool()
        .snapshot()
        .into_iter()
        .map(|s| s.request_count)
        .collect();
    assert_eq!(counts, [5, 5]);
    core.shutdown().await;
}

#[tokio::test(start_paused = true)]
async fn three_errors_take_an_endpoint_out_until_recovery() {
    let (core, transport) = core(&[("a", 5), ("b", 5)]);
    core.start();
    let a = EndpointId::new(0);

    for _ in 0..3 {
        core.pool().report_error(a);
    }
    assert!(!core.pool().is_healthy(a));

    core.get_balance("addr").await.unwrap();
    assert_eq!(endpoints_called(&transport), ["b"]);

    tokio::time::sleep(Duration::from_secs(30)).await;
    assert!(core.pool().is_healthy(a));
    assert_eq!(core.status().pool.healthy, 2);
    core.shutdown().await;
}

#[tokio::test]
async fn failing_reads_move_to_the_other_endpoint() {
    let (core, transport) = core(&[("a", 5), ("b", 5)]);
    core.start();
    transport.fail_times("a", 1);

    let err = core.get_balance("addr").await.unwrap_err();
    assert_eq!(err.code(), ErrorCode::ProviderTransient);

    core.get_balance("addr").await.unwrap();
    assert_eq!(endpoints_called(&transport), ["a", "b"]);
    core.shutdown().await;
}

#[tokio::test]
async fn exhausted_pool_resets_and_keeps_serving() {
    let (core, transport) = core(&[("a", 1), ("b", 1)]);
    core.start();
    for id in [EndpointId::new(0), EndpointId::new(1)] {
        for _ in 0..3 {
            core.pool().report_error(id);
        }
    }
    assert_eq!(core.status().pool.healthy, 0);

    core.get_balance("addr").await.unwrap();

    assert_eq!(transport.calls().len(), 1);
    assert_eq!(core.status().pool.resets, 1);
    core.shutdown().await;
}

// ----------------------------------------------------------------------------
// Admission queue
// ----------------------------------------------------------------------------

/// Transport that records when each call reached it.
#[derive(Default)]
struct TimedTransport {
    seen: Mutex<Vec<Instant>>,
}

#[async_trait]
impl RpcTransport for TimedTransport {
    async fn call(
        &self,
        _endpoint: &Endpoint,
        _method: &str,
        _params: Value,
    ) -> Result<Value, ProviderError> {
        self.seen.lock().push(Instant::now());
        Ok(json!({ "value": 0 }))
    }
}

#[tokio::test(start_paused = true)]
async fn per_second_ceiling_spreads_a_burst_across_windows() {
    let transport = Arc::new(TimedTransport::default());
    let mut config = testkit::config::config(&[("a", 1)]);
    config.admission.max_requests_per_second = 5;
    let core = Arc::new(
        DispatchCore::build(config, Arc::clone(&transport) as Arc<dyn RpcTransport>).unwrap(),
    );
    core.start();
    let start = Instant::now();

    let handles: Vec<_> = (0..20)
        .map(|_| {
            let core = Arc::clone(&core);
            tokio::spawn(async move { core.get_balance("addr").await })
        })
        .collect();
    for handle in handles {
        handle.await.unwrap().unwrap();
    }

    let seen = transport.seen.lock().clone();
    let in_window = |second: u64| {
        seen.iter()
            .filter(|t| t.duration_since(start).as_secs() == second)
            .count()
    };
    assert_eq!(seen.len(), 20);
    assert_eq!(in_window(0), 5);
    assert_eq!(in_window(1), 5);
    assert_eq!(in_window(2), 5);
    assert_eq!(in_window(3), 5);
    core.shutdown().await;
}

#[tokio::test(start_paused = true)]
async fn slow_provider_never_sees_more_than_the_concurrency_ceiling() {
    let transport = Arc::new(MockTransport::new().with_delay(Duration::from_millis(200)));
    let mut config = testkit::config::config(&[("a", 1), ("b", 1)]);
    config.admission.max_concurrent_requests = 2;
    let core = Arc::new(
        DispatchCore::build(config, Arc::clone(&transport) as Arc<dyn RpcTransport>).unwrap(),
    );
    core.start();

    let handles: Vec<_> = (0..6)
        .map(|_| {
            let core = Arc::clone(&core);
            tokio::spawn(async move { core.get_balance("addr").await })
        })
        .collect();

    let mut peak = 0;
    while transport.calls().len() < 6 || core.status().admission.in_flight > 0 {
        peak = peak.max(core.status().admission.in_flight);
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    for handle in handles {
        handle.await.unwrap().unwrap();
    }

    assert_eq!(peak, 2);
    assert_eq!(core.status().admission.dispatched, 6);
    core.shutdown().await;
}

#[tokio::test(start_paused = true)]
async fn rate_limited_response_throttles_the_queue() {
    let (core, transport) = core(&[("a", 1), ("b", 1)]);
    core.start();
    transport.fail_next("a", testkit::transport::rate_limited("a"));

    let err = core.get_balance("addr").await.unwrap_err();
    assert!(err.is_rate_limited());
    assert!(core.status().admission.throttled);

    let start = Instant::now();
    core.get_balance("addr").await.unwrap();
    assert!(start.elapsed() >= Duration::from_secs(1));
    assert_eq!(core.status().admission.rate_limited, 1);
    core.shutdown().await;
}

// ----------------------------------------------------------------------------
// Direct submission path
// ----------------------------------------------------------------------------

#[tokio::test]
async fn missing_engine_still_returns_a_signature() {
    let (core, transport) = core(&[("primary", 1), ("backup", 10)]);
    core.start();
    assert_eq!(core.supervisor().route(), ExecutionRoute::Direct);

    let id = TransactionId::new("tx-1");
    let sig = core
        .submit_as(id.clone(), testkit::domain::params())
        .await
        .unwrap();

    assert!(sig.is_well_formed());
    assert_eq!(sig.as_str(), SIGNATURE);
    let sends: Vec<_> = transport
        .calls()
        .into_iter()
        .filter(|c| c.method == "sendTransaction")
        .collect();
    assert_eq!(sends.len(), 1);
    assert_eq!(sends[0].endpoint, "primary");

    let record = core.supervisor().record(&id).unwrap();
    assert_eq!(record.status, TransactionStatus::Confirmed);
    assert_eq!(record.route, Some(ExecutionRoute::Direct));
    core.shutdown().await;
}

#[tokio::test]
async fn simulation_never_sends() {
    let (core, transport) = core(&[("primary", 1)]);
    core.start();

    let sig = core
        .submit(testkit::domain::params().with_simulation(true))
        .await
        .unwrap();

    assert!(sig.is_well_formed());
    let methods: Vec<_> = transport.calls().into_iter().map(|c| c.method).collect();
    assert_eq!(methods, ["simulateTransaction"]);
    core.shutdown().await;
}

#[tokio::test]
async fn rejected_send_fails_the_transaction() {
    let (core, transport) = core(&[("primary", 1)]);
    core.start();
    transport.fail_next(
        "primary",
        ProviderError::Rpc {
            endpoint: "primary".into(),
            code: -32002,
            message: "blockhash not found".into(),
        },
    );

    let id = TransactionId::new("tx-bad");
    let err = core
        .submit_as(id.clone(), testkit::domain::params())
        .await
        .unwrap_err();

    assert_eq!(err.code(), ErrorCode::ProviderRejected);
    let record = core.supervisor().record(&id).unwrap();
    assert_eq!(record.status, TransactionStatus::Failed);
    assert!(record.error_message.unwrap().contains("blockhash not found"));
    assert!(core.pool().is_healthy(EndpointId::new(0)));
    core.shutdown().await;
}

#[tokio::test]
async fn submissions_after_shutdown_are_refused() {
    let (core, _transport) = core(&[("primary", 1)]);
    core.start();
    core.shutdown().await;

    let err = core.submit(testkit::domain::params()).await.unwrap_err();
    assert_eq!(err.code(), ErrorCode::Shutdown);
}

use super::*;

use async_trait::async_trait;

use crate::error::ErrorCode;
use crate::testkit;

/// Direct path double that settles immediately or fails with a transient
/// provider error.
struct StubPath {
    fail: bool,
    calls: Mutex<Vec<TransactionId>>,
}

impl StubPath {
    fn new(fail: bool) -> Arc<Self> {
        Arc::new(Self {
            fail,
            calls: Mutex::new(Vec::new()),
        })
    }

    fn calls(&self) -> Vec<TransactionId> {
        self.calls.lock().clone()
    }
}

#[async_trait]
impl ExecutionPath for StubPath {
    fn route(&self) -> ExecutionRoute {
        ExecutionRoute::Direct
    }

    fn is_available(&self) -> bool {
        true
    }

    async fn dispatch(&self, id: &TransactionId, _params: &SubmitParams) -> Result<Dispatched> {
        self.calls.lock().push(id.clone());
        if self.fail {
            return Err(testkit::transport::transient("primary").into());
        }
        Ok(Dispatched::Settled(testkit::domain::signature()))
    }
}

fn without_engine(direct: &Arc<StubPath>) -> TransactionSupervisor {
    let config = testkit::config::engine(testkit::config::MISSING_ENGINE.into());
    TransactionSupervisor::new(config, Arc::clone(direct) as Arc<dyn ExecutionPath>)
}

// -- Direct route ---------------------------------------------------------

#[tokio::test]
async fn test_submit_before_start_is_refused() {
    let direct = StubPath::new(false);
    let supervisor = without_engine(&direct);

    let err = supervisor
        .submit(testkit::domain::params())
        .await
        .unwrap_err();

    assert!(matches!(
        err,
        Error::Transaction(TransactionError::NotStarted)
    ));
    assert!(direct.calls().is_empty());
}

#[tokio::test]
async fn test_missing_engine_falls_back_to_direct() {
    let direct = StubPath::new(false);
    let supervisor = without_engine(&direct);
    supervisor.start();
    supervisor.start();

    assert_eq!(supervisor.route(), ExecutionRoute::Direct);
    assert_eq!(supervisor.engine_state(), EngineState::NotStarted);

    let id = TransactionId::new("tx-direct");
    let sig = supervisor
        .submit_as(id.clone(), testkit::domain::params())
        .await
        .unwrap();

    assert_eq!(sig, testkit::domain::signature());
    let record = supervisor.record(&id).unwrap();
    assert_eq!(record.status, TransactionStatus::Confirmed);
    assert_eq!(record.route, Some(ExecutionRoute::Direct));
    assert_eq!(supervisor.stats().awaiting, 0);
    supervisor.stop().await;
}

#[tokio::test]
async fn test_invalid_params_leave_no_record() {
    let direct = StubPath::new(false);
    let supervisor = without_engine(&direct);
    supervisor.start();

    let mut params = testkit::domain::params();
    params.source.clear();
    let err = supervisor.submit(params).await.unwrap_err();

    assert_eq!(err.code(), ErrorCode::InvalidInput);
    assert!(supervisor.records().is_empty());
    assert!(direct.calls().is_empty());
}

#[tokio::test]
async fn test_reused_id_is_rejected() {
    let direct = StubPath::new(false);
    let supervisor = without_engine(&direct);
    supervisor.start();
    let id = TransactionId::new("tx-same");

    supervisor
        .submit_as(id.clone(), testkit::domain::params())
        .await
        .unwrap();
    let err = supervisor
        .submit_as(id, testkit::domain::params())
        .await
        .unwrap_err();

    assert_eq!(err.code(), ErrorCode::InvalidInput);
    assert_eq!(direct.calls().len(), 1);
}

#[tokio::test]
async fn test_direct_failure_marks_record_failed() {
    let direct = StubPath::new(true);
    let supervisor = without_engine(&direct);
    supervisor.start();
    let id = TransactionId::new("tx-fail");

    let err = supervisor
        .submit_as(id.clone(), testkit::domain::params())
        .await
        .unwrap_err();

    assert_eq!(err.code(), ErrorCode::ProviderTransient);
    let record = supervisor.record(&id).unwrap();
    assert_eq!(record.status, TransactionStatus::Failed);
    assert!(record.error_message.unwrap().contains("connection reset"));
    assert_eq!(supervisor.stats().transactions.failed, 1);
}

#[tokio::test]
async fn test_stop_refuses_new_submissions() {
    let direct = StubPath::new(false);
    let supervisor = without_engine(&direct);
    supervisor.start();
    supervisor.stop().await;
    supervisor.stop().await;

    let err = supervisor
        .submit(testkit::domain::params())
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        Error::Transaction(TransactionError::NotStarted)
    ));
}

// -- Update handling ------------------------------------------------------

#[tokio::test]
async fn test_first_terminal_update_wins() {
    let registry = CompletionRegistry::new();
    let ledger = Ledger::new();
    let id = TransactionId::new("tx-1");
    ledger.insert(&id).unwrap();
    let rx = registry.register(id.clone());

    for outcome in [
        UpdateOutcome::Pending,
        UpdateOutcome::Confirmed(Signature::new("SIG")),
        UpdateOutcome::Failed("late".into()),
        UpdateOutcome::Finalized(Signature::new("OTHER")),
    ] {
        apply_update(
            &registry,
            &ledger,
            TransactionUpdate {
                id: id.clone(),
                outcome,
            },
        );
    }

    assert_eq!(rx.await.unwrap(), Ok(Signature::new("SIG")));
    let record = ledger.get(&id).unwrap();
    assert_eq!(record.status, TransactionStatus::Confirmed);
    assert_eq!(record.signature, Some(Signature::new("SIG")));
}

#[test]
fn test_update_for_unknown_id_is_dropped() {
    let registry = CompletionRegistry::new();
    let ledger = Ledger::new();

    apply_update(
        &registry,
        &ledger,
        TransactionUpdate {
            id: TransactionId::new("ghost"),
            outcome: UpdateOutcome::Confirmed(Signature::new("SIG")),
        },
    );

    assert!(ledger.get(&TransactionId::new("ghost")).is_none());
}

// -- Engine route ---------------------------------------------------------

#[cfg(unix)]
mod engine {
    use super::*;

    use std::time::Duration;

    use tokio::time::Instant;

    fn with_engine(
        script: &str,
        direct: &Arc<StubPath>,
    ) -> (tempfile::TempDir, TransactionSupervisor) {
        with_engine_timeout(script, direct, 60)
    }

    fn with_engine_timeout(
        script: &str,
        direct: &Arc<StubPath>,
        timeout_secs: u64,
    ) -> (tempfile::TempDir, TransactionSupervisor) {
        let dir = tempfile::tempdir().unwrap();
        let path = testkit::engine::write_script(dir.path(), script);
        let mut config = testkit::config::engine(path);
        config.transaction_timeout_secs = timeout_secs;
        let supervisor =
            TransactionSupervisor::new(config, Arc::clone(direct) as Arc<dyn ExecutionPath>);
        (dir, supervisor)
    }

    #[tokio::test]
    async fn test_confirmed_update_resolves_with_signature() {
        let direct = StubPath::new(false);
        let (_dir, supervisor) = with_engine(&testkit::engine::confirming(), &direct);
        supervisor.start();
        assert_eq!(supervisor.route(), ExecutionRoute::Engine);

        let id = TransactionId::new("tx-1");
        let sig = supervisor
            .submit_as(id.clone(), testkit::domain::params())
            .await
            .unwrap();

        assert_eq!(sig, testkit::domain::signature());
        assert!(direct.calls().is_empty());

        // The engine follows up with a failed duplicate; it must not stick.
        tokio::time::sleep(Duration::from_millis(100)).await;
        let record = supervisor.record(&id).unwrap();
        assert_eq!(record.status, TransactionStatus::Confirmed);
        assert_eq!(record.route, Some(ExecutionRoute::Engine));
        supervisor.stop().await;
        assert_eq!(supervisor.engine_state(), EngineState::Stopped);
    }

    #[tokio::test]
    async fn test_engine_rejection_fails_with_reason() {
        let direct = StubPath::new(false);
        let (_dir, supervisor) = with_engine(&testkit::engine::rejecting("no route"), &direct);
        supervisor.start();

        let err = supervisor
            .submit(testkit::domain::params())
            .await
            .unwrap_err();

        let Error::Transaction(TransactionError::Failed { reason, .. }) = err else {
            panic!("expected a failed transaction, got {err:?}");
        };
        assert_eq!(reason, "no route");
        supervisor.stop().await;
    }

    #[tokio::test(start_paused = true)]
    async fn test_silent_engine_times_out_at_deadline() {
        let direct = StubPath::new(false);
        let (_dir, supervisor) = with_engine(&testkit::engine::silent(), &direct);
        supervisor.start();
        let started = Instant::now();
        let id = TransactionId::new("tx-2");

        let err = supervisor
            .submit_as(id.clone(), testkit::domain::params())
            .await
            .unwrap_err();

        assert!(started.elapsed() >= Duration::from_secs(60));
        assert_eq!(err.code(), ErrorCode::Timeout);
        assert_eq!(
            supervisor.record(&id).unwrap().status,
            TransactionStatus::TimedOut
        );
        assert_eq!(supervisor.stats().awaiting, 0);
        supervisor.stop().await;
    }

    #[tokio::test(start_paused = true)]
    async fn test_timed_out_transaction_ignores_late_confirmation() {
        let direct = StubPath::new(false);
        let (_dir, supervisor) = with_engine(&testkit::engine::silent(), &direct);
        supervisor.start();
        let id = TransactionId::new("tx-late");

        let err = supervisor
            .submit_as(id.clone(), testkit::domain::params())
            .await
            .unwrap_err();
        assert_eq!(err.code(), ErrorCode::Timeout);

        apply_update(
            &supervisor.registry,
            &supervisor.ledger,
            TransactionUpdate {
                id: id.clone(),
                outcome: UpdateOutcome::Confirmed(testkit::domain::signature()),
            },
        );

        assert!(!supervisor.ledger.finish(
            &id,
            TransactionStatus::Confirmed,
            Some(testkit::domain::signature()),
            None,
        ));
        let record = supervisor.record(&id).unwrap();
        assert_eq!(record.status, TransactionStatus::TimedOut);
        assert!(record.signature.is_none());
        assert!(supervisor.registry.is_empty());
        let counts = supervisor.stats().transactions;
        assert_eq!(counts.timed_out, 1);
        assert_eq!(counts.confirmed, 0);
        supervisor.stop().await;
    }

    #[tokio::test]
    async fn test_crash_leaves_pending_to_expire_then_routes_direct() {
        let direct = StubPath::new(false);
        let (_dir, supervisor) =
            with_engine_timeout(&testkit::engine::crashing(), &direct, 1);
        supervisor.start();

        let err = supervisor
            .submit_as(TransactionId::new("tx-2"), testkit::domain::params())
            .await
            .unwrap_err();
        assert_eq!(err.code(), ErrorCode::Timeout);

        for _ in 0..200 {
            if supervisor.engine_state() == EngineState::Crashed {
                break;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        assert_eq!(supervisor.engine_state(), EngineState::Crashed);
        assert_eq!(supervisor.route(), ExecutionRoute::Direct);

        let sig = supervisor
            .submit_as(TransactionId::new("tx-3"), testkit::domain::params())
            .await
            .unwrap();
        assert_eq!(sig, testkit::domain::signature());
        assert_eq!(direct.calls(), [TransactionId::new("tx-3")]);
        supervisor.stop().await;
    }
}

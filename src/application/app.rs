//! Application root.
//!
//! [`DispatchCore`] builds the pool, the admission queue, the dispatcher and
//! the transaction supervisor from one [`Config`] and owns them for the
//! lifetime of the process. Nothing in the crate is a global; collaborators
//! get what they need from here.

use std::sync::Arc;

use serde_json::Value;
use tracing::info;

use super::direct::DirectPath;
use super::dispatch::Dispatcher;
use super::supervisor::{SupervisorStats, TransactionSupervisor};
use crate::adapter::outbound::rpc::HttpTransport;
use crate::domain::{EndpointSnapshot, Signature, SubmitParams, TransactionId};
use crate::error::Result;
use crate::infrastructure::admission::{AdmissionQueue, AdmissionStats};
use crate::infrastructure::config::Config;
use crate::infrastructure::pool::{EndpointPool, PoolStats};
use crate::port::{ExecutionPath, RpcTransport};

/// Combined status of every component.
#[derive(Debug, Clone)]
pub struct CoreStatus {
    pub endpoints: Vec<EndpointSnapshot>,
    pub pool: PoolStats,
    pub admission: AdmissionStats,
    pub supervisor: SupervisorStats,
}

pub struct DispatchCore {
    config: Config,
    pool: Arc<EndpointPool>,
    queue: Arc<AdmissionQueue>,
    dispatcher: Arc<Dispatcher>,
    supervisor: TransactionSupervisor,
}

impl DispatchCore {
    /// Wire every component over `transport`. Nothing runs until
    /// [`start`](Self::start).
    ///
    /// # Errors
    ///
    /// Returns an error if the endpoint table cannot be built.
    pub fn build(config: Config, transport: Arc<dyn RpcTransport>) -> Result<Self> {
        let pool = Arc::new(EndpointPool::from_config(&config)?);
        let queue = Arc::new(AdmissionQueue::new(config.admission.clone()));
        let dispatcher = Arc::new(Dispatcher::new(
            Arc::clone(&pool),
            Arc::clone(&queue),
            transport,
            config.pool.commitment.clone(),
        ));
        let direct: Arc<dyn ExecutionPath> =
            Arc::new(DirectPath::new(Arc::clone(&dispatcher), config.simulation));
        let supervisor = TransactionSupervisor::new(config.engine.clone(), direct);

        Ok(Self {
            config,
            pool,
            queue,
            dispatcher,
            supervisor,
        })
    }

    /// Build over the HTTP transport.
    pub fn from_config(config: Config) -> Result<Self> {
        let transport = Arc::new(HttpTransport::from_config(&config.pool)?);
        Self::build(config, transport)
    }

    /// Start the admission drain loop and the supervisor.
    ///
    /// Must be called from within a Tokio runtime.
    pub fn start(&self) {
        self.queue.start();
        self.supervisor.start();
        info!(
            endpoints = self.pool.endpoints().len(),
            route = %self.supervisor.route(),
            simulation = self.config.simulation,
            "Dispatch core started"
        );
    }

    /// Stop the supervisor, then drain the queue.
    pub async fn shutdown(&self) {
        self.supervisor.stop().await;
        self.queue.shutdown().await;
        info!("Dispatch core stopped");
    }

    pub async fn submit(&self, params: SubmitParams) -> Result<Signature> {
        self.supervisor.submit(params).await
    }

    pub async fn submit_as(&self, id: TransactionId, params: SubmitParams) -> Result<Signature> {
        self.supervisor.submit_as(id, params).await
    }

    pub async fn get_balance(&self, address: &str) -> Result<Value> {
        self.dispatcher.get_balance(address).await
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn pool(&self) -> &Arc<EndpointPool> {
        &self.pool
    }

    pub fn queue(&self) -> &Arc<AdmissionQueue> {
        &self.queue
    }

    pub fn dispatcher(&self) -> &Arc<Dispatcher> {
        &self.dispatcher
    }

    pub fn supervisor(&self) -> &TransactionSupervisor {
        &self.supervisor
    }

    pub fn status(&self) -> CoreStatus {
        CoreStatus {
            endpoints: self.pool.snapshot(),
            pool: self.pool.stats(),
            admission: self.queue.stats(),
            supervisor: self.supervisor.stats(),
        }
    }
}

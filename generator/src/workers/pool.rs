use std::ops::RangeInclusive;
use std::sync::Arc;

use tokio::sync::{Mutex, mpsc};
use tokio::task::JoinSet;
use tracing::{Instrument, debug, error};

use crate::error::{GenError, GenResult};
use crate::provisioner::UnitProvisioner;
use crate::workers::base::{BatchSummary, UnitFailure};

/// Outcome reported by a worker for one unit.
struct UnitResult {
    index: usize,
    result: GenResult<()>,
}

/// Ordinals of the units not yet picked up by a worker.
type UnitQueue = Arc<Mutex<RangeInclusive<usize>>>;

/// Provisions a batch of units with bounded parallelism.
///
/// The orchestrator starts `min(concurrency, samples)` workers. Each worker repeatedly takes the
/// next ordinal from a shared queue and provisions it, so at most `concurrency` units are in flight
/// and no task is created per queued unit. [`BatchOrchestrator::run`] returns once every worker is
/// done.
pub struct BatchOrchestrator {
    provisioner: Arc<UnitProvisioner>,
    concurrency: usize,
}

impl BatchOrchestrator {
    pub fn new(provisioner: Arc<UnitProvisioner>, concurrency: usize) -> BatchOrchestrator {
        BatchOrchestrator {
            provisioner,
            concurrency: concurrency.max(1),
        }
    }

    /// Provisions `samples` units and reports how each of them ended.
    pub async fn run(&self, samples: usize) -> BatchSummary {
        let queue: UnitQueue = Arc::new(Mutex::new(1..=samples));
        let (results_tx, mut results_rx) = mpsc::unbounded_channel();

        let workers = self.concurrency.min(samples);
        debug!(samples, workers, "starting provisioning workers");

        let mut join_set = JoinSet::new();
        for worker_id in 1..=workers {
            let span = tracing::info_span!("provisioning_worker", worker_id);
            let worker = run_worker(queue.clone(), self.provisioner.clone(), results_tx.clone());
            join_set.spawn(worker.instrument(span));
        }
        // Workers hold the only remaining senders, so the channel closes once they are all done.
        drop(results_tx);

        let mut summary = BatchSummary {
            requested: samples,
            ..BatchSummary::default()
        };
        while let Some(UnitResult { index, result }) = results_rx.recv().await {
            match result {
                Ok(()) => summary.succeeded += 1,
                Err(error) => summary.failures.push(UnitFailure { index, error }),
            }
        }

        while let Some(joined) = join_set.join_next().await {
            if let Err(err) = joined {
                error!(error = %err, "provisioning worker terminated abnormally");
            }
        }

        summary.failures.sort_by_key(|failure| failure.index);
        summary
    }
}

async fn run_worker(
    queue: UnitQueue,
    provisioner: Arc<UnitProvisioner>,
    results_tx: mpsc::UnboundedSender<UnitResult>,
) {
    loop {
        let Some(index) = queue.lock().await.next() else {
            break;
        };

        let result = provision_isolated(provisioner.clone(), index).await;
        if results_tx.send(UnitResult { index, result }).is_err() {
            break;
        }
    }
}

/// Provisions one unit on its own task so that a panic fails the unit and not its worker.
async fn provision_isolated(provisioner: Arc<UnitProvisioner>, index: usize) -> GenResult<()> {
    let handle = tokio::spawn(
        async move { provisioner.provision(index).await }.in_current_span(),
    );

    match handle.await {
        Ok(result) => result,
        Err(err) => {
            error!(unit = index, error = %err, "provisioning unit panicked");
            Err(GenError::from(err))
        }
    }
}

//! Asynchronous block-migration pipeline.
//!
//! A migration job arrives tagged with the ant it came from; the worker
//! either finds the block already pinned locally or fetches it over the
//! network via [`BlockService`], then reports a terminal [`ResultCode`]
//! through a [`MigrationNotifier`]. The two `tokio::sync::mpsc` channels
//! (`requests`, `done`), both capacity 1000, are the pipeline's only
//! synchronization primitive — no additional locking is needed because a
//! single worker task owns both ends of the `done` channel's consumer side.

use crate::error::AntResult;
use crate::proto::{BlockService, Blockstore, PinMode, Pinner, ResultCode};
use async_trait::async_trait;
use cid::Cid;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tokio_util::task::TaskTracker;

const CHANNEL_CAPACITY: usize = 1_000;
const MIGRATE_TIMEOUT: Duration = Duration::from_secs(600);

/// A migration directive, tagged with the ant that requested it.
#[derive(Debug, Clone)]
pub struct MigrationJob {
    pub from_ant: String,
    pub cid: Cid,
}

/// Terminal notification target. Implemented by the mine service; kept as
/// a narrow trait here (rather than a back-reference to `MineService`) so
/// the migrator and its owner do not form a reference cycle.
#[async_trait]
pub trait MigrationNotifier: Send + Sync {
    async fn on_done(&self, from_ant: String, cid: Cid, code: ResultCode);
}

/// Handle to the running migration worker. Cloning shares the same
/// `requests` channel; enqueueing blocks the caller when the channel is
/// full, which is the pipeline's intended backpressure mechanism.
#[derive(Clone)]
pub struct Migrator {
    requests_tx: mpsc::Sender<MigrationJob>,
}

impl Migrator {
    /// Spawns the worker task onto `task_tracker` and returns a handle for
    /// enqueueing jobs. The worker observes `cancellation_token` and exits
    /// its `select!` loop on cancellation.
    pub fn spawn(
        blockstore: Arc<dyn Blockstore>,
        pinner: Arc<dyn Pinner>,
        block_service: Arc<dyn BlockService>,
        notifier: Arc<dyn MigrationNotifier>,
        cancellation_token: CancellationToken,
        task_tracker: &TaskTracker,
    ) -> Self {
        let (requests_tx, requests_rx) = mpsc::channel(CHANNEL_CAPACITY);
        let (done_tx, done_rx) = mpsc::channel(CHANNEL_CAPACITY);
        task_tracker.spawn(Self::run(
            blockstore,
            pinner,
            block_service,
            notifier,
            requests_rx,
            done_tx,
            done_rx,
            cancellation_token,
        ));
        Self { requests_tx }
    }

    /// Enqueues a migration job. Blocks if the `requests` channel is at
    /// capacity — the mine service's `MigrateBlock` handler relies on this
    /// to apply natural backpressure on its caller.
    pub async fn enqueue(&self, job: MigrationJob) -> AntResult<()> {
        self.requests_tx
            .send(job)
            .await
            .map_err(|_| crate::error::AntError::Transport("migrator worker has shut down".into()))
    }

    #[allow(clippy::too_many_arguments)]
    async fn run(
        blockstore: Arc<dyn Blockstore>,
        pinner: Arc<dyn Pinner>,
        block_service: Arc<dyn BlockService>,
        notifier: Arc<dyn MigrationNotifier>,
        mut requests_rx: mpsc::Receiver<MigrationJob>,
        done_tx: mpsc::Sender<MigrationJob>,
        mut done_rx: mpsc::Receiver<(String, Cid, ResultCode)>,
        cancellation_token: CancellationToken,
    ) {
        loop {
            tokio::select! {
                job = requests_rx.recv() => {
                    let Some(job) = job else { break };
                    let from_ant = job.from_ant.clone();
                    let cid = job.cid;
                    let code = run_migration(&blockstore, &pinner, &block_service, &job).await;
                    if let Err(ref err) = code {
                        tracing::warn!(from_ant, %cid, %err, "migration failed");
                    }
                    let code = code.unwrap_or_else(|err| ResultCode::Failure(err.to_string()));
                    // The worker enqueues its own terminal result onto `done`
                    // and consumes it in the same loop below, decoupling the
                    // notifier call (which may itself suspend on I/O) from
                    // the job that produced it.
                    if done_tx_send(&done_tx, from_ant, cid, code).await.is_err() {
                        break;
                    }
                }
                done = done_rx.recv() => {
                    let Some((from_ant, cid, code)) = done else { break };
                    notifier.on_done(from_ant, cid, code).await;
                }
                _ = cancellation_token.cancelled() => break,
            }
        }
    }
}

async fn done_tx_send(
    done_tx: &mpsc::Sender<(String, Cid, ResultCode)>,
    from_ant: String,
    cid: Cid,
    code: ResultCode,
) -> Result<(), ()> {
    done_tx.send((from_ant, cid, code)).await.map_err(|_| ())
}

/// Runs one migration job to completion: pin-in-place if the block is
/// already local, otherwise fetch it over the network (bounded by a 10
/// minute per-job timeout) before pinning.
async fn run_migration(
    blockstore: &Arc<dyn Blockstore>,
    pinner: &Arc<dyn Pinner>,
    block_service: &Arc<dyn BlockService>,
    job: &MigrationJob,
) -> AntResult<ResultCode> {
    if blockstore.has(&job.cid).await? {
        pinner.pin(&job.cid, PinMode::Direct).await?;
        return Ok(ResultCode::Success);
    }

    tokio::time::timeout(MIGRATE_TIMEOUT, block_service.get_block(&job.cid))
        .await
        .map_err(|_| crate::error::AntError::Transport("migrate block timed out".into()))??;

    pinner.pin(&job.cid, PinMode::Direct).await?;
    Ok(ResultCode::Success)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::AntError;
    use std::collections::HashSet;
    use std::sync::Mutex;
    use tokio::sync::mpsc::UnboundedSender;

    #[derive(Default)]
    struct FakeBlockstore {
        present: Mutex<HashSet<Cid>>,
    }

    #[async_trait]
    impl Blockstore for FakeBlockstore {
        async fn has(&self, cid: &Cid) -> AntResult<bool> {
            Ok(self.present.lock().unwrap().contains(cid))
        }

        async fn add(&self, cid: Cid, _bytes: Vec<u8>) -> AntResult<()> {
            self.present.lock().unwrap().insert(cid);
            Ok(())
        }
    }

    #[derive(Default)]
    struct FakePinner {
        pinned: Mutex<Vec<Cid>>,
    }

    #[async_trait]
    impl Pinner for FakePinner {
        async fn pin(&self, cid: &Cid, _mode: PinMode) -> AntResult<()> {
            self.pinned.lock().unwrap().push(*cid);
            Ok(())
        }
    }

    #[derive(Default)]
    struct FakeBlockService {
        fetch_calls: Mutex<Vec<Cid>>,
        fail: bool,
    }

    #[async_trait]
    impl BlockService for FakeBlockService {
        async fn get_block(&self, cid: &Cid) -> AntResult<Vec<u8>> {
            self.fetch_calls.lock().unwrap().push(*cid);
            if self.fail {
                Err(AntError::Transport("no peers have this block".into()))
            } else {
                Ok(vec![1, 2, 3])
            }
        }
    }

    struct ChannelNotifier(UnboundedSender<(String, Cid, ResultCode)>);

    #[async_trait]
    impl MigrationNotifier for ChannelNotifier {
        async fn on_done(&self, from_ant: String, cid: Cid, code: ResultCode) {
            let _ = self.0.send((from_ant, cid, code));
        }
    }

    /// A raw-codec CIDv1 wrapping a sha2-256 digest of repeated `byte`,
    /// used only as a distinct opaque identifier in tests.
    fn sample_cid(byte: u8) -> Cid {
        let digest = multihash::Multihash::<64>::wrap(0x12, &[byte; 32]).unwrap();
        Cid::new_v1(0x55, digest)
    }

    #[tokio::test]
    async fn already_present_block_skips_network_fetch() {
        let cid = sample_cid(1);
        let blockstore = Arc::new(FakeBlockstore::default());
        blockstore.present.lock().unwrap().insert(cid);
        let pinner = Arc::new(FakePinner::default());
        let block_service = Arc::new(FakeBlockService::default());
        let (tx, mut rx) = mpsc::unbounded_channel();
        let notifier = Arc::new(ChannelNotifier(tx));
        let cancellation_token = CancellationToken::new();
        let task_tracker = TaskTracker::new();

        let migrator = Migrator::spawn(
            blockstore.clone(),
            pinner.clone(),
            block_service.clone(),
            notifier,
            cancellation_token.clone(),
            &task_tracker,
        );
        migrator
            .enqueue(MigrationJob { from_ant: "ant-a".into(), cid })
            .await
            .unwrap();

        let (from_ant, done_cid, code) = rx.recv().await.unwrap();
        assert_eq!(from_ant, "ant-a");
        assert_eq!(done_cid, cid);
        assert_eq!(code, ResultCode::Success);
        assert!(block_service.fetch_calls.lock().unwrap().is_empty());
        assert_eq!(pinner.pinned.lock().unwrap().as_slice(), &[cid]);

        cancellation_token.cancel();
        task_tracker.close();
        task_tracker.wait().await;
    }

    #[tokio::test]
    async fn missing_block_is_fetched_then_pinned() {
        let cid = sample_cid(2);
        let blockstore = Arc::new(FakeBlockstore::default());
        let pinner = Arc::new(FakePinner::default());
        let block_service = Arc::new(FakeBlockService::default());
        let (tx, mut rx) = mpsc::unbounded_channel();
        let notifier = Arc::new(ChannelNotifier(tx));
        let cancellation_token = CancellationToken::new();
        let task_tracker = TaskTracker::new();

        let migrator = Migrator::spawn(
            blockstore,
            pinner.clone(),
            block_service.clone(),
            notifier,
            cancellation_token.clone(),
            &task_tracker,
        );
        migrator
            .enqueue(MigrationJob { from_ant: "ant-b".into(), cid })
            .await
            .unwrap();

        let (_, _, code) = rx.recv().await.unwrap();
        assert_eq!(code, ResultCode::Success);
        assert_eq!(block_service.fetch_calls.lock().unwrap().as_slice(), &[cid]);
        assert_eq!(pinner.pinned.lock().unwrap().as_slice(), &[cid]);

        cancellation_token.cancel();
        task_tracker.close();
        task_tracker.wait().await;
    }

    #[tokio::test]
    async fn fetch_failure_reports_failure_code() {
        let cid = sample_cid(3);
        let blockstore = Arc::new(FakeBlockstore::default());
        let pinner = Arc::new(FakePinner::default());
        let block_service = Arc::new(FakeBlockService {
            fail: true,
            ..Default::default()
        });
        let (tx, mut rx) = mpsc::unbounded_channel();
        let notifier = Arc::new(ChannelNotifier(tx));
        let cancellation_token = CancellationToken::new();
        let task_tracker = TaskTracker::new();

        let migrator = Migrator::spawn(
            blockstore,
            pinner.clone(),
            block_service,
            notifier,
            cancellation_token.clone(),
            &task_tracker,
        );
        migrator
            .enqueue(MigrationJob { from_ant: "ant-c".into(), cid })
            .await
            .unwrap();

        let (_, _, code) = rx.recv().await.unwrap();
        assert!(matches!(code, ResultCode::Failure(_)));
        assert!(pinner.pinned.lock().unwrap().is_empty());

        cancellation_token.cancel();
        task_tracker.close();
        task_tracker.wait().await;
    }
}

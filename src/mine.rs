//! The mine service: composition root for message dispatch, the queen ping
//! loop, and the migration pipeline.
//!
//! A real daemon (out of this crate's scope) owns a libp2p host, decodes
//! wire messages, and calls into the `on_*` handlers below, one spawned
//! task per inbound message. This module's job is the handler logic and
//! the composition of [`QueenManager`], [`Migrator`], and the block/cheque
//! capabilities into one construct, not the transport.

use crate::cheque::ChequeStore;
use crate::error::AntResult;
use crate::migrator::{MigrationJob, MigrationNotifier, Migrator};
use crate::proto::{
    BlockService, Blockstore, Cheque, MigrateBlockRequest, MigrateBlockResponse,
    MigrateBlockResult, Messenger, PinMode, Pinner, PushBlockRequest, PushBlockResponse,
    ResultCode,
};
use crate::queen::QueenManager;
use crate::statestore::ByteStore;
use async_trait::async_trait;
use cid::Cid;
use libp2p_identity::PeerId;
use multiaddr::Multiaddr;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tokio_util::task::TaskTracker;

const PING_INTERVAL: Duration = Duration::from_secs(30);
const PING_TIMEOUT: Duration = Duration::from_secs(10);
const PONG_DEADLINE: Duration = Duration::from_secs(5);
const RESPONSE_TIMEOUT: Duration = Duration::from_secs(10);
const RESPONSE_ATTEMPTS: u32 = 3;

/// Sends a migration's terminal result to whichever queen is current at
/// the moment the migrator finishes the job. Holding only a [`QueenManager`]
/// and a [`Messenger`] (rather than a back-reference to [`MineService`])
/// avoids a reference cycle between the mine service and its migrator.
struct CompletionNotifier {
    queen: Arc<QueenManager>,
    messenger: Arc<dyn Messenger>,
}

#[async_trait]
impl MigrationNotifier for CompletionNotifier {
    async fn on_done(&self, from_ant: String, cid: Cid, code: ResultCode) {
        let Some(target) = self.queen.get_queen() else {
            tracing::warn!(%cid, "no queen available to report migration completion");
            return;
        };
        let result = MigrateBlockResult { from_ant, cid, code };
        if let Err(err) = self
            .messenger
            .send_migrate_block_result(&target, result, RESPONSE_TIMEOUT, RESPONSE_ATTEMPTS)
            .await
        {
            tracing::warn!(%err, %target, %cid, "failed to report migration completion");
        }
    }
}

pub struct MineService<S: ByteStore> {
    queen: Arc<QueenManager>,
    migrator: Migrator,
    blockstore: Arc<dyn Blockstore>,
    pinner: Arc<dyn Pinner>,
    messenger: Arc<dyn Messenger>,
    cheque_store: Arc<ChequeStore<S>>,
}

impl<S: ByteStore + 'static> MineService<S> {
    /// Builds the service and spawns its migration worker. Call
    /// [`MineService::start_ping_loop`] separately once the service is
    /// reachable by peers.
    pub fn new(
        bootstrap_queens: Vec<Multiaddr>,
        blockstore: Arc<dyn Blockstore>,
        pinner: Arc<dyn Pinner>,
        block_service: Arc<dyn BlockService>,
        messenger: Arc<dyn Messenger>,
        cheque_store: Arc<ChequeStore<S>>,
        cancellation_token: CancellationToken,
        task_tracker: &TaskTracker,
    ) -> Self {
        let queen = Arc::new(QueenManager::new(bootstrap_queens));
        let notifier = Arc::new(CompletionNotifier {
            queen: queen.clone(),
            messenger: messenger.clone(),
        });
        let migrator = Migrator::spawn(
            blockstore.clone(),
            pinner.clone(),
            block_service,
            notifier,
            cancellation_token,
            task_tracker,
        );
        Self {
            queen,
            migrator,
            blockstore,
            pinner,
            messenger,
            cheque_store,
        }
    }

    /// Starts the 30s ticker that pings the current queen with a 10s
    /// per-attempt timeout. Runs until `cancellation_token` fires.
    pub fn start_ping_loop(&self, cancellation_token: CancellationToken, task_tracker: &TaskTracker) {
        let queen = self.queen.clone();
        let messenger = self.messenger.clone();
        task_tracker.spawn(async move {
            let mut ticker = tokio::time::interval(PING_INTERVAL);
            loop {
                tokio::select! {
                    _ = ticker.tick() => {
                        let Some(target) = queen.get_queen() else { continue };
                        if let Err(err) = messenger.ping(&target, PING_TIMEOUT).await {
                            tracing::warn!(%err, %target, "ping failed");
                        }
                    }
                    _ = cancellation_token.cancelled() => break,
                }
            }
        });
    }

    /// Responds to an inbound ping with `Pong{seq}`.
    pub async fn on_ping(&self, peer: &PeerId, seq: u64) {
        if let Err(err) = self.messenger.respond_pong(peer, seq, PONG_DEADLINE).await {
            tracing::warn!(%err, %peer, "failed to respond to ping");
        }
    }

    /// Adds the pushed block to the local store, pins it, and acknowledges
    /// the sender. A storage or pin failure is reported in the response
    /// rather than propagated — a single bad push must not kill the node.
    pub async fn on_push_block(&self, peer: &PeerId, seq: u64, req: PushBlockRequest) {
        let code = match self.store_and_pin(req.cid, req.bytes).await {
            Ok(()) => ResultCode::Success,
            Err(err) => ResultCode::Failure(err.to_string()),
        };
        let response = PushBlockResponse { seq, code };
        if let Err(err) = self
            .messenger
            .respond_push_block(peer, response, RESPONSE_TIMEOUT, RESPONSE_ATTEMPTS)
            .await
        {
            tracing::warn!(%err, %peer, "failed to respond to push block");
        }
    }

    async fn store_and_pin(&self, cid: Cid, bytes: Vec<u8>) -> AntResult<()> {
        self.blockstore.add(cid, bytes).await?;
        self.pinner.pin(&cid, PinMode::Direct).await
    }

    /// Enqueues one migration job per requested cid and immediately
    /// acknowledges the sender; completions stream later via
    /// [`CompletionNotifier`].
    pub async fn on_migrate_block(&self, peer: &PeerId, seq: u64, req: MigrateBlockRequest) {
        for cid in req.cids {
            let job = MigrationJob {
                from_ant: req.from_ant.clone(),
                cid,
            };
            if let Err(err) = self.migrator.enqueue(job).await {
                tracing::warn!(%err, %cid, "failed to enqueue migration job");
            }
        }
        let response = MigrateBlockResponse {
            seq,
            code: ResultCode::Success,
        };
        if let Err(err) = self
            .messenger
            .respond_migrate_block(peer, response, RESPONSE_TIMEOUT, RESPONSE_ATTEMPTS)
            .await
        {
            tracing::warn!(%err, %peer, "failed to respond to migrate block");
        }
    }

    /// Persists a cheque received from a queen. No reply is sent.
    pub fn on_cheque(&self, cheque: Cheque) {
        if let Err(err) = self.cheque_store.save_cheque(&cheque) {
            tracing::warn!(%err, "failed to save cheque");
        }
    }

    /// Replaces the active queen set, skipping any address that fails to
    /// parse as a multiaddr.
    pub fn on_queens(&self, queens: Vec<String>) {
        let valid: Vec<Multiaddr> = queens
            .into_iter()
            .filter_map(|addr| Multiaddr::from_str(&addr).ok())
            .collect();
        self.queen.handle_queen_message(valid);
    }

    pub fn queen_manager(&self) -> &Arc<QueenManager> {
        &self.queen
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::statestore::{MemoryByteStore, StateStore};
    use alloy_primitives::{Address, U256};
    use std::sync::Mutex;
    use tokio::sync::mpsc;

    #[derive(Default)]
    struct FakeBlockstore {
        added: Mutex<Vec<(Cid, Vec<u8>)>>,
    }

    #[async_trait]
    impl Blockstore for FakeBlockstore {
        async fn has(&self, _cid: &Cid) -> AntResult<bool> {
            Ok(false)
        }

        async fn add(&self, cid: Cid, bytes: Vec<u8>) -> AntResult<()> {
            self.added.lock().unwrap().push((cid, bytes));
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
    struct FakeBlockService;

    #[async_trait]
    impl BlockService for FakeBlockService {
        async fn get_block(&self, _cid: &Cid) -> AntResult<Vec<u8>> {
            Ok(vec![])
        }
    }

    enum Sent {
        Pong { peer: PeerId, seq: u64 },
        PushBlockResponse { peer: PeerId, response: PushBlockResponse },
        MigrateBlockResponse { peer: PeerId, response: MigrateBlockResponse },
        MigrateBlockResult { peer: PeerId, result: MigrateBlockResult },
        Ping { peer: PeerId },
    }

    struct RecordingMessenger {
        tx: mpsc::UnboundedSender<Sent>,
    }

    #[async_trait]
    impl Messenger for RecordingMessenger {
        async fn ping(&self, peer: &PeerId, _timeout: Duration) -> AntResult<()> {
            let _ = self.tx.send(Sent::Ping { peer: *peer });
            Ok(())
        }

        async fn respond_pong(&self, peer: &PeerId, seq: u64, _timeout: Duration) -> AntResult<()> {
            let _ = self.tx.send(Sent::Pong { peer: *peer, seq });
            Ok(())
        }

        async fn respond_push_block(
            &self,
            peer: &PeerId,
            response: PushBlockResponse,
            _timeout: Duration,
            _attempts: u32,
        ) -> AntResult<()> {
            let _ = self.tx.send(Sent::PushBlockResponse { peer: *peer, response });
            Ok(())
        }

        async fn respond_migrate_block(
            &self,
            peer: &PeerId,
            response: MigrateBlockResponse,
            _timeout: Duration,
            _attempts: u32,
        ) -> AntResult<()> {
            let _ = self.tx.send(Sent::MigrateBlockResponse { peer: *peer, response });
            Ok(())
        }

        async fn send_migrate_block_result(
            &self,
            peer: &PeerId,
            result: MigrateBlockResult,
            _timeout: Duration,
            _attempts: u32,
        ) -> AntResult<()> {
            let _ = self.tx.send(Sent::MigrateBlockResult { peer: *peer, result });
            Ok(())
        }
    }

    fn sample_peer_id() -> PeerId {
        libp2p_identity::Keypair::generate_secp256k1()
            .public()
            .to_peer_id()
    }

    fn multiaddr_for(peer_id: PeerId) -> Multiaddr {
        Multiaddr::from_str(&format!("/ip4/127.0.0.1/tcp/4001/p2p/{peer_id}")).unwrap()
    }

    fn sample_cid(byte: u8) -> Cid {
        let digest = multihash::Multihash::<64>::wrap(0x12, &[byte; 32]).unwrap();
        Cid::new_v1(0x55, digest)
    }

    fn fixture() -> (
        MineService<MemoryByteStore>,
        mpsc::UnboundedReceiver<Sent>,
        CancellationToken,
        TaskTracker,
        PeerId,
    ) {
        let (tx, rx) = mpsc::unbounded_channel();
        let messenger = Arc::new(RecordingMessenger { tx });
        let cheque_store = Arc::new(ChequeStore::new(StateStore::new(MemoryByteStore::new())));
        let cancellation_token = CancellationToken::new();
        let task_tracker = TaskTracker::new();
        let bootstrap_peer = sample_peer_id();
        let service = MineService::new(
            vec![multiaddr_for(bootstrap_peer)],
            Arc::new(FakeBlockstore::default()),
            Arc::new(FakePinner::default()),
            Arc::new(FakeBlockService),
            messenger,
            cheque_store,
            cancellation_token.clone(),
            &task_tracker,
        );
        (service, rx, cancellation_token, task_tracker, bootstrap_peer)
    }

    #[tokio::test]
    async fn ping_gets_a_pong_with_matching_sequence() {
        let (service, mut rx, cancellation_token, task_tracker, _bootstrap) = fixture();
        let peer = sample_peer_id();
        service.on_ping(&peer, 7).await;
        match rx.recv().await.unwrap() {
            Sent::Pong { peer: got, seq } => {
                assert_eq!(got, peer);
                assert_eq!(seq, 7);
            }
            _ => panic!("expected a pong"),
        }
        cancellation_token.cancel();
        task_tracker.close();
        task_tracker.wait().await;
    }

    #[tokio::test]
    async fn push_block_stores_pins_and_reports_success() {
        let (service, mut rx, cancellation_token, task_tracker, _bootstrap) = fixture();
        let peer = sample_peer_id();
        let cid = sample_cid(1);
        service
            .on_push_block(&peer, 3, PushBlockRequest { cid, bytes: vec![9, 9] })
            .await;
        match rx.recv().await.unwrap() {
            Sent::PushBlockResponse { peer: got, response } => {
                assert_eq!(got, peer);
                assert_eq!(response.seq, 3);
                assert_eq!(response.code, ResultCode::Success);
            }
            _ => panic!("expected a push block response"),
        }
        cancellation_token.cancel();
        task_tracker.close();
        task_tracker.wait().await;
    }

    #[tokio::test]
    async fn migrate_block_acks_immediately_then_streams_completion() {
        let (service, mut rx, cancellation_token, task_tracker, bootstrap) = fixture();
        let peer = sample_peer_id();
        let cid = sample_cid(2);
        service
            .on_migrate_block(
                &peer,
                5,
                MigrateBlockRequest {
                    from_ant: "ant-x".into(),
                    cids: vec![cid],
                },
            )
            .await;

        match rx.recv().await.unwrap() {
            Sent::MigrateBlockResponse { peer: got, response } => {
                assert_eq!(got, peer);
                assert_eq!(response.seq, 5);
                assert_eq!(response.code, ResultCode::Success);
            }
            _ => panic!("expected an immediate migrate-block ack"),
        }

        match rx.recv().await.unwrap() {
            Sent::MigrateBlockResult { peer: got, result } => {
                assert_eq!(got, bootstrap);
                assert_eq!(result.from_ant, "ant-x");
                assert_eq!(result.cid, cid);
                assert_eq!(result.code, ResultCode::Success);
            }
            _ => panic!("expected a streamed migration completion"),
        }

        cancellation_token.cancel();
        task_tracker.close();
        task_tracker.wait().await;
    }

    #[tokio::test]
    async fn cheque_handler_saves_without_replying() {
        let (service, mut rx, cancellation_token, task_tracker, _bootstrap) = fixture();
        let cheque = Cheque {
            chequebook: Address::repeat_byte(1),
            beneficiary: Address::repeat_byte(2),
            cumulative_payout: U256::from(100u64),
            cumulative_reward: U256::from(100u64),
            signature: vec![0u8; 65],
        };
        service.on_cheque(cheque.clone());
        assert!(service.cheque_store.get_cheque(&cheque.chequebook).is_ok());
        assert!(rx.try_recv().is_err());
        cancellation_token.cancel();
        task_tracker.close();
        task_tracker.wait().await;
    }

    #[tokio::test]
    async fn queens_message_replaces_active_set_and_skips_invalid_addresses() {
        let (service, _rx, cancellation_token, task_tracker, _bootstrap) = fixture();
        let active_peer = sample_peer_id();
        service.on_queens(vec![
            multiaddr_for(active_peer).to_string(),
            "not-a-multiaddr".into(),
        ]);
        let first = service.queen_manager().get_queen().unwrap();
        assert_eq!(first, active_peer);
        cancellation_token.cancel();
        task_tracker.close();
        task_tracker.wait().await;
    }

    #[tokio::test(start_paused = true)]
    async fn ping_loop_pings_current_queen() {
        let (service, mut rx, cancellation_token, task_tracker, bootstrap) = fixture();
        service.start_ping_loop(cancellation_token.clone(), &task_tracker);
        tokio::time::advance(PING_INTERVAL).await;
        match rx.recv().await.unwrap() {
            Sent::Ping { peer } => assert_eq!(peer, bootstrap),
            _ => panic!("expected a ping on the first tick"),
        }
        cancellation_token.cancel();
        task_tracker.close();
        task_tracker.wait().await;
    }
}

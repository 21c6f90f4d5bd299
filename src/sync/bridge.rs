use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::monitoring::metrics::METRICS;
use crate::slip::{BetRequest, Slip, SlipMode, SlipParams, SlipStore};
use crate::storage::{RemoteSlipStore, StoreError};

enum MirrorCommand {
    Write(Slip),
    Flush(oneshot::Sender<()>),
}

/// Owns the user's slip and keeps the remote copy eventually consistent with it.
///
/// Every mutation is applied locally first and the resulting snapshot is queued
/// for a single background task that writes snapshots to the remote store in
/// mutation order. A failed remote write is logged and counted, never rolled
/// back locally. Must be created inside a Tokio runtime.
pub struct SyncBridge {
    user_id: String,
    store: SlipStore,
    remote: Arc<dyn RemoteSlipStore>,
    mirror_tx: mpsc::UnboundedSender<MirrorCommand>,
    worker: JoinHandle<()>,
    touched: bool,
    hydrated: bool,
}

impl SyncBridge {
    pub fn new(
        user_id: impl Into<String>,
        params: SlipParams,
        remote: Arc<dyn RemoteSlipStore>,
        write_timeout: Option<Duration>,
    ) -> Self {
        let user_id = user_id.into();
        let (mirror_tx, mirror_rx) = mpsc::unbounded_channel();
        let worker = tokio::spawn(run_mirror(
            user_id.clone(),
            remote.clone(),
            mirror_rx,
            write_timeout,
        ));

        Self {
            user_id,
            store: SlipStore::new(params),
            remote,
            mirror_tx,
            worker,
            touched: false,
            hydrated: false,
        }
    }

    pub fn user_id(&self) -> &str {
        &self.user_id
    }

    pub fn slip(&self) -> &Slip {
        self.store.slip()
    }

    pub fn params(&self) -> &SlipParams {
        self.store.params()
    }

    /// True once any local mutation has been applied.
    pub fn is_touched(&self) -> bool {
        self.touched
    }

    /// One-time read of the remote slip. Returns whether it was adopted.
    ///
    /// A read failure is logged and leaves the local slip in place.
    pub async fn hydrate(&mut self) -> bool {
        if self.hydrated {
            return false;
        }
        match self.remote.read(&self.user_id).await {
            Ok(remote) => self.adopt_remote(remote),
            Err(err) => {
                warn!(
                    target: "sync",
                    user = %self.user_id,
                    error = %err,
                    "failed to hydrate slip; continuing with local state"
                );
                self.hydrated = true;
                false
            }
        }
    }

    /// Apply the result of a hydration read.
    ///
    /// The remote slip only replaces a local slip that is still untouched and
    /// empty; edits made while the read was in flight win.
    pub fn adopt_remote(&mut self, remote: Option<Slip>) -> bool {
        self.hydrated = true;
        let Some(remote) = remote else {
            debug!(target: "sync", user = %self.user_id, "no remote slip to hydrate from");
            return false;
        };
        if self.touched || !self.store.slip().is_empty() {
            info!(
                target: "sync",
                user = %self.user_id,
                remote_legs = remote.len(),
                local_legs = self.store.slip().len(),
                "local slip already edited; ignoring remote copy"
            );
            return false;
        }
        let slip = self.store.replace(remote);
        info!(
            target: "sync",
            user = %self.user_id,
            legs = slip.len(),
            mode = %slip.mode(),
            "slip hydrated from remote"
        );
        true
    }

    pub fn add_bet(&mut self, req: BetRequest) -> &Slip {
        self.store.add_bet(req);
        self.commit()
    }

    pub fn remove_bet(&mut self, id: &str) -> &Slip {
        self.store.remove_bet(id);
        self.commit()
    }

    pub fn update_stake(&mut self, id: &str, stake: f64) -> &Slip {
        self.store.update_stake(id, stake);
        self.commit()
    }

    pub fn set_mode(&mut self, mode: SlipMode) -> &Slip {
        self.store.set_mode(mode);
        self.commit()
    }

    pub fn clear(&mut self) -> &Slip {
        self.store.clear();
        self.commit()
    }

    /// Wait until every snapshot queued so far has been offered to the remote store.
    pub async fn flush(&self) {
        let (ack_tx, ack_rx) = oneshot::channel();
        if self.mirror_tx.send(MirrorCommand::Flush(ack_tx)).is_ok() {
            let _ = ack_rx.await;
        }
    }

    /// Drain pending writes and stop the mirror task.
    pub async fn shutdown(self) {
        let Self {
            mirror_tx, worker, ..
        } = self;
        drop(mirror_tx);
        if let Err(err) = worker.await {
            warn!(target: "sync", error = %err, "mirror task ended abnormally");
        }
    }

    fn commit(&mut self) -> &Slip {
        self.touched = true;
        let snapshot = self.store.slip().clone();
        if self.mirror_tx.send(MirrorCommand::Write(snapshot)).is_err() {
            warn!(target: "sync", user = %self.user_id, "mirror task gone; slip kept locally only");
        }
        self.store.slip()
    }
}

async fn run_mirror(
    user_id: String,
    remote: Arc<dyn RemoteSlipStore>,
    mut rx: mpsc::UnboundedReceiver<MirrorCommand>,
    write_timeout: Option<Duration>,
) {
    while let Some(cmd) = rx.recv().await {
        match cmd {
            MirrorCommand::Write(slip) => {
                mirror_once(&user_id, remote.as_ref(), &slip, write_timeout).await;
            }
            MirrorCommand::Flush(ack) => {
                let _ = ack.send(());
            }
        }
    }
    debug!(target: "sync", user = %user_id, "mirror task stopped");
}

async fn mirror_once(
    user_id: &str,
    remote: &dyn RemoteSlipStore,
    slip: &Slip,
    write_timeout: Option<Duration>,
) {
    let result = match write_timeout {
        Some(limit) => tokio::time::timeout(limit, remote.write(user_id, slip))
            .await
            .unwrap_or(Err(StoreError::Timeout(limit))),
        None => remote.write(user_id, slip).await,
    };

    match result {
        Ok(()) => {
            METRICS.record_mirror_write(user_id);
            debug!(target: "sync", user = %user_id, legs = slip.len(), "slip mirrored to remote");
        }
        Err(err) => {
            METRICS.record_mirror_failure(user_id, &err.to_string());
            warn!(
                target: "sync",
                user = %user_id,
                error = %err,
                "failed to mirror slip; local state stays authoritative"
            );
        }
    }
}

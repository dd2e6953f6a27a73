use broker_protocol::{DetailRequest, Outbound};
use log::debug;
use std::time::Duration;
use tokio::sync::mpsc;

/// Paced drain of the scatter queue: one detail request per `interval`,
/// first request immediately. Requests queued by a superseded cycle are
/// still sent (the upstream tolerates them; their responses fail the
/// generation check in the correlator).
pub struct PacedDispatcher;

impl PacedDispatcher {
    /// Spawn the dispatch worker. Returns the queue handle the session
    /// scatters into. The worker exits when every queue handle is dropped or
    /// the outbound channel closes.
    pub fn spawn(
        interval: Duration,
        outbound_tx: mpsc::UnboundedSender<Outbound>,
    ) -> mpsc::UnboundedSender<DetailRequest> {
        let (tx, mut rx) = mpsc::unbounded_channel::<DetailRequest>();
        tokio::spawn(async move {
            while let Some(request) = rx.recv().await {
                debug!(
                    "dispatching detail request for item {} (cycle {})",
                    request.item_id, request.generation
                );
                if outbound_tx.send(Outbound::DetailRequest(request)).is_err() {
                    break;
                }
                tokio::time::sleep(interval).await;
            }
        });
        tx
    }
}

//! Dispatcher: drains the delivery queue and runs one digest cycle per task.

use metrics::counter;
use tokio::sync::mpsc;

use crate::compose::DigestComposer;
use crate::error::DigestResult;
use crate::notify::DynChannel;
use crate::scheduler::DeliveryTask;

#[derive(Clone)]
pub struct Dispatcher {
    composer: DigestComposer,
    channel: DynChannel,
}

impl Dispatcher {
    pub fn new(composer: DigestComposer, channel: DynChannel) -> Self {
        Self { composer, channel }
    }

    /// Compose and send one digest. Single delivery attempt.
    pub async fn deliver(&self, task: &DeliveryTask) -> DigestResult<()> {
        let t0 = std::time::Instant::now();
        let text = self.composer.create_digest(&task.display_name).await?;
        self.channel.send(task.subscriber_id, &text).await?;
        tracing::info!(
            target: "digest",
            subscriber = task.subscriber_id,
            reason = ?task.reason,
            channel = self.channel.channel_name(),
            ms = t0.elapsed().as_millis() as u64,
            "digest delivered"
        );
        counter!("digest_sent_total").increment(1);
        Ok(())
    }

    /// Run until the queue closes. Each task runs in its own tokio task; a
    /// failed cycle is logged and the trigger stays in place.
    pub async fn run(self, mut rx: mpsc::UnboundedReceiver<DeliveryTask>) {
        tracing::info!(target: "digest", "dispatcher started");
        while let Some(task) = rx.recv().await {
            let this = self.clone();
            tokio::spawn(async move {
                if let Err(e) = this.deliver(&task).await {
                    counter!("digest_failed_total").increment(1);
                    tracing::warn!(
                        target: "digest",
                        subscriber = task.subscriber_id,
                        reason = ?task.reason,
                        error = %e,
                        "digest cycle failed, skipping until next trigger"
                    );
                }
            });
        }
        tracing::info!(target: "digest", "delivery queue closed");
    }
}

use crate::channel::{DeliveryChannel, DeliveryError};
use crate::queue::AuditQueue;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

/// What a single tick did, for observability and tests.
#[derive(Debug)]
pub enum TickOutcome {
    /// Queue was empty; nothing attempted.
    Idle,
    /// Head record delivered and discarded.
    Delivered,
    /// Delivery failed; the record is back at the head of the queue.
    Requeued(DeliveryError),
}

/// Single consumer draining the queue at a fixed cadence.
///
/// One record per tick, popped with the queue lock released before the
/// network call so a slow downstream never stalls ingestion. A failed
/// attempt puts the record back at the head, so the same record is retried
/// on every tick until it goes through. Retry is unbounded with no backoff:
/// the drip rate sits well below the expected production rate, so a broken
/// downstream only grows the queue, it never drops from it.
pub struct Dispatcher {
    queue: Arc<AuditQueue>,
    channel: Arc<dyn DeliveryChannel>,
    drip_interval: Duration,
    delivery_timeout: Duration,
}

impl Dispatcher {
    pub fn new(
        queue: Arc<AuditQueue>,
        channel: Arc<dyn DeliveryChannel>,
        drip_interval: Duration,
        delivery_timeout: Duration,
    ) -> Self {
        Self {
            queue,
            channel,
            drip_interval,
            delivery_timeout,
        }
    }

    /// Run forever on the drip cadence. The full drip interval elapses
    /// between attempts even when one overruns it, so a slow delivery is
    /// never followed by a catch-up burst; the per-attempt timeout keeps a
    /// hung delivery from starving the schedule.
    pub async fn run(self) {
        info!(
            interval_ms = self.drip_interval.as_millis() as u64,
            "Dispatcher started"
        );

        loop {
            self.tick().await;
            tokio::time::sleep(self.drip_interval).await;
        }
    }

    /// Attempt delivery of the head record, if any.
    pub async fn tick(&self) -> TickOutcome {
        let Some(record) = self.queue.pop_front() else {
            debug!("Queue empty, nothing to deliver");
            return TickOutcome::Idle;
        };

        let attempt = tokio::time::timeout(self.delivery_timeout, self.channel.deliver(&record));
        let result = match attempt.await {
            Ok(result) => result,
            Err(_) => Err(DeliveryError::Timeout),
        };

        match result {
            Ok(()) => {
                info!(remaining = self.queue.len(), "Delivered audit record");
                TickOutcome::Delivered
            }
            Err(error) => {
                // Undo the pop so the record stays ahead of newer arrivals.
                self.queue.push_front(record);
                warn!(
                    error = %error,
                    queued = self.queue.len(),
                    "Delivery failed, record requeued"
                );
                TickOutcome::Requeued(error)
            }
        }
    }
}

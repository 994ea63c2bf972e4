/// Bounded email queue with a single delivery worker
///
/// Handlers enqueue without awaiting; a spawned worker drains the channel
/// through the configured transport. The channel has a fixed capacity, and
/// when it is full new messages are dropped with a warning rather than
/// blocking a request or growing without bound. Delivery failures are
/// logged and the worker moves on to the next message.

use std::sync::Arc;

use tokio::sync::mpsc::{self, error::TrySendError};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use super::transport::{EmailMessage, MailTransport};

/// Default queue capacity
pub const DEFAULT_QUEUE_CAPACITY: usize = 256;

/// Handle for enqueueing outbound email
///
/// Cheap to clone; all clones feed the same worker. The worker exits once
/// every handle has been dropped and the queue is drained.
#[derive(Clone)]
pub struct EmailDispatcher {
    sender: mpsc::Sender<EmailMessage>,
}

impl EmailDispatcher {
    /// Spawns the delivery worker and returns the enqueue handle
    pub fn start(
        transport: Arc<dyn MailTransport>,
        capacity: usize,
    ) -> (Self, JoinHandle<()>) {
        let (sender, mut receiver) = mpsc::channel::<EmailMessage>(capacity);

        let worker = tokio::spawn(async move {
            info!(capacity, "Email delivery worker started");

            while let Some(message) = receiver.recv().await {
                match transport.send(&message).await {
                    Ok(()) => {
                        debug!(to = %message.to, subject = %message.subject, "Email sent");
                    }
                    Err(e) => {
                        warn!(
                            to = %message.to,
                            subject = %message.subject,
                            error = %e,
                            "Email delivery failed"
                        );
                    }
                }
            }

            info!("Email delivery worker stopped");
        });

        (Self { sender }, worker)
    }

    /// Queues a message for delivery
    ///
    /// Returns `false` when the message was dropped because the queue is
    /// full or the worker has stopped. Callers never treat this as an
    /// error; email is best effort throughout.
    pub fn enqueue(&self, message: EmailMessage) -> bool {
        match self.sender.try_send(message) {
            Ok(()) => true,
            Err(TrySendError::Full(message)) => {
                warn!(to = %message.to, "Email queue full, dropping message");
                false
            }
            Err(TrySendError::Closed(message)) => {
                warn!(to = %message.to, "Email worker stopped, dropping message");
                false
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::email::transport::MockMailer;

    fn message(to: &str) -> EmailMessage {
        EmailMessage {
            to: to.to_string(),
            subject: "Test".to_string(),
            html_body: "<p>body</p>".to_string(),
        }
    }

    #[tokio::test]
    async fn test_enqueued_messages_are_delivered() {
        let mailer = Arc::new(MockMailer::new());
        let (dispatcher, worker) = EmailDispatcher::start(mailer.clone(), 8);

        assert!(dispatcher.enqueue(message("a@example.com")));
        assert!(dispatcher.enqueue(message("b@example.com")));

        drop(dispatcher);
        worker.await.unwrap();

        let sent = mailer.sent();
        assert_eq!(sent.len(), 2);
        assert_eq!(sent[0].to, "a@example.com");
        assert_eq!(sent[1].to, "b@example.com");
    }

    #[tokio::test]
    async fn test_full_queue_drops_instead_of_blocking() {
        // Worker is never started, so nothing drains the channel
        let (sender, _receiver) = mpsc::channel::<EmailMessage>(1);
        let dispatcher = EmailDispatcher { sender };

        assert!(dispatcher.enqueue(message("a@example.com")));
        assert!(!dispatcher.enqueue(message("b@example.com")));
    }

    #[tokio::test]
    async fn test_enqueue_after_worker_stop_is_dropped() {
        let (sender, receiver) = mpsc::channel::<EmailMessage>(1);
        drop(receiver);
        let dispatcher = EmailDispatcher { sender };

        assert!(!dispatcher.enqueue(message("a@example.com")));
    }
}

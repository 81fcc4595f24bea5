//! Уведомления о подтвержденных бронях.
//!
//! Бронирование только кладет сообщение в очередь и сразу отвечает клиенту.
//! Доставкой занимается фоновый воркер: его сбои логируются и на бронь не влияют.

use async_trait::async_trait;
use serde::Serialize;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BookingConfirmed {
    pub booking_id: i64,
    pub user_email: String,
}

impl BookingConfirmed {
    pub fn subject(&self) -> String {
        format!("Booking Confirmation: #{}", self.booking_id)
    }

    pub fn body(&self) -> String {
        format!(
            "Thank you for your booking! Your booking #{} has been confirmed.",
            self.booking_id
        )
    }
}

#[derive(Debug, thiserror::Error)]
pub enum NotifyError {
    #[error("webhook request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("webhook responded with status {0}")]
    Rejected(reqwest::StatusCode),
}

#[async_trait]
pub trait Notifier: Send + Sync {
    async fn booking_confirmed(&self, message: &BookingConfirmed) -> Result<(), NotifyError>;
}

/// Пишет уведомление в лог. Режим разработки.
pub struct LogNotifier;

#[async_trait]
impl Notifier for LogNotifier {
    async fn booking_confirmed(&self, message: &BookingConfirmed) -> Result<(), NotifyError> {
        info!(
            "📧 {} -> {}: {}",
            message.subject(),
            message.user_email,
            message.body()
        );
        Ok(())
    }
}

#[derive(Serialize)]
struct WebhookPayload<'a> {
    booking_id: i64,
    email: &'a str,
    subject: String,
    body: String,
}

/// Отправляет уведомление POST-запросом на внешний сервис рассылки.
pub struct WebhookNotifier {
    url: String,
    http_client: reqwest::Client,
}

impl WebhookNotifier {
    pub fn new(url: impl Into<String>, timeout: Duration) -> Result<Self, NotifyError> {
        Ok(Self {
            url: url.into(),
            http_client: reqwest::Client::builder().timeout(timeout).build()?,
        })
    }
}

#[async_trait]
impl Notifier for WebhookNotifier {
    async fn booking_confirmed(&self, message: &BookingConfirmed) -> Result<(), NotifyError> {
        let payload = WebhookPayload {
            booking_id: message.booking_id,
            email: &message.user_email,
            subject: message.subject(),
            body: message.body(),
        };

        let response = self.http_client.post(&self.url).json(&payload).send().await?;
        if !response.status().is_success() {
            return Err(NotifyError::Rejected(response.status()));
        }
        Ok(())
    }
}

enum Command {
    Confirmed(BookingConfirmed),
    Shutdown,
}

/// Очередь уведомлений с одним фоновым воркером.
pub struct NotificationDispatcher {
    sender: mpsc::UnboundedSender<Command>,
    worker: Mutex<Option<JoinHandle<()>>>,
}

impl NotificationDispatcher {
    pub fn spawn(notifier: Arc<dyn Notifier>) -> Self {
        let (sender, mut receiver) = mpsc::unbounded_channel();

        let worker = tokio::spawn(async move {
            while let Some(command) = receiver.recv().await {
                match command {
                    Command::Confirmed(message) => {
                        if let Err(e) = notifier.booking_confirmed(&message).await {
                            warn!(
                                "Failed to deliver confirmation for booking {}: {}",
                                message.booking_id, e
                            );
                        } else {
                            debug!("Confirmation for booking {} delivered", message.booking_id);
                        }
                    }
                    Command::Shutdown => break,
                }
            }
            info!("Notification worker stopped");
        });

        Self {
            sender,
            worker: Mutex::new(Some(worker)),
        }
    }

    /// Ставит уведомление в очередь. Не ждет и не возвращает ошибок.
    pub fn dispatch(&self, message: BookingConfirmed) {
        if self.sender.send(Command::Confirmed(message)).is_err() {
            error!("Notification queue is closed, confirmation dropped");
        }
    }

    /// Дожидается отправки всего, что уже в очереди, и останавливает воркер.
    pub async fn shutdown(&self) {
        let _ = self.sender.send(Command::Shutdown);
        let worker = match self.worker.lock() {
            Ok(mut guard) => guard.take(),
            Err(poisoned) => poisoned.into_inner().take(),
        };
        if let Some(worker) = worker {
            if let Err(e) = worker.await {
                error!("Notification worker panicked: {}", e);
            }
        }
    }
}

use std::sync::Arc;

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use reqwest::Client;
use serde::Serialize;
use serde_json::{json, Value};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};
use uuid::Uuid;

use directory_cell::SubjectDirectory;

use crate::models::Appointment;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TemplateKind {
    AppointmentCreated,
    AppointmentConfirmed,
    AppointmentCancelled,
    AppointmentRescheduled,
    AppointmentCompleted,
    Reminder,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Notification {
    pub facility_id: Uuid,
    pub contact_ref: String,
    pub template: TemplateKind,
    pub payload: Value,
}

/// Fire-and-forget delivery. Errors are logged by the caller and never undo
/// the state change that triggered the notification.
#[async_trait]
pub trait NotificationSink: Send + Sync {
    async fn notify(&self, notification: Notification) -> Result<()>;
}

pub struct TracingNotificationSink;

#[async_trait]
impl NotificationSink for TracingNotificationSink {
    async fn notify(&self, notification: Notification) -> Result<()> {
        info!(
            facility_id = %notification.facility_id,
            contact_ref = %notification.contact_ref,
            template = ?notification.template,
            "Notification: {}",
            notification.payload
        );
        Ok(())
    }
}

pub struct WebhookNotificationSink {
    client: Client,
    url: String,
}

impl WebhookNotificationSink {
    pub fn new(url: &str) -> Self {
        Self {
            client: Client::new(),
            url: url.to_string(),
        }
    }
}

#[async_trait]
impl NotificationSink for WebhookNotificationSink {
    async fn notify(&self, notification: Notification) -> Result<()> {
        debug!("Posting {:?} notification to {}", notification.template, self.url);

        let response = self.client.post(&self.url).json(&notification).send().await?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(anyhow!("Notification webhook returned {}: {}", status, body));
        }
        Ok(())
    }
}

/// Resolves the subject's contact and hands the message to the sink on a
/// background task.
#[derive(Clone)]
pub struct Notifier {
    sink: Arc<dyn NotificationSink>,
    subjects: Arc<dyn SubjectDirectory>,
}

impl Notifier {
    pub fn new(sink: Arc<dyn NotificationSink>, subjects: Arc<dyn SubjectDirectory>) -> Self {
        Self { sink, subjects }
    }

    pub fn dispatch(&self, template: TemplateKind, appointment: &Appointment) -> JoinHandle<()> {
        let sink = self.sink.clone();
        let subjects = self.subjects.clone();
        let appointment = appointment.clone();

        tokio::spawn(async move {
            if let Err(e) = deliver(sink.as_ref(), subjects.as_ref(), template, &appointment).await {
                warn!("Failed to send {:?} notification for appointment {}: {}", template, appointment.id, e);
            }
        })
    }
}

async fn deliver(
    sink: &dyn NotificationSink,
    subjects: &dyn SubjectDirectory,
    template: TemplateKind,
    appointment: &Appointment,
) -> Result<()> {
    let subject = subjects.subject(appointment.subject_id).await?;
    sink.notify(Notification {
        facility_id: appointment.facility_id,
        contact_ref: subject.contact_ref,
        template,
        payload: json!({
            "appointment_id": appointment.id,
            "practitioner_id": appointment.practitioner_id,
            "start_at": appointment.start_at,
            "end_at": appointment.end_at,
            "status": appointment.status,
        }),
    })
    .await
}

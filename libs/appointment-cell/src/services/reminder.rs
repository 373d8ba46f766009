use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration as StdDuration;

use chrono::{DateTime, Duration, Utc};
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};
use uuid::Uuid;

use directory_cell::FacilityDirectory;
use practitioner_cell::local_time::local_date;

use crate::error::AppointmentError;
use crate::repository::AppointmentRepo;
use crate::services::clock::Clock;
use crate::services::notification::{Notifier, TemplateKind};

/// Day-before reminders for confirmed appointments.
///
/// "Tomorrow" is judged in each facility's own zone, and each appointment is
/// reminded at most once however often the sweep runs.
pub struct ReminderSweep {
    appointments: Arc<dyn AppointmentRepo>,
    facilities: Arc<dyn FacilityDirectory>,
    notifier: Notifier,
    reminded: Mutex<HashMap<Uuid, DateTime<Utc>>>,
}

impl ReminderSweep {
    pub fn new(
        appointments: Arc<dyn AppointmentRepo>,
        facilities: Arc<dyn FacilityDirectory>,
        notifier: Notifier,
    ) -> Self {
        Self {
            appointments,
            facilities,
            notifier,
            reminded: Mutex::new(HashMap::new()),
        }
    }

    /// Returns how many reminders were handed to the sink.
    pub async fn send_reminders(&self, now: DateTime<Utc>) -> Result<usize, AppointmentError> {
        // Tomorrow in any zone starts within 48h of now.
        let candidates = self
            .appointments
            .confirmed_starting_between(now, now + Duration::hours(48))
            .await?;

        let mut reminded = self.reminded.lock().await;
        reminded.retain(|_, start_at| *start_at > now);

        let mut sent = 0;
        for appointment in candidates {
            if reminded.contains_key(&appointment.id) {
                continue;
            }
            let tz = match self.facilities.timezone(appointment.facility_id).await {
                Ok(tz) => tz,
                Err(e) => {
                    warn!("Skipping reminder for {}: {}", appointment.id, e);
                    continue;
                }
            };
            let tomorrow = local_date(&tz, now).succ_opt();
            if Some(local_date(&tz, appointment.start_at)) != tomorrow {
                continue;
            }

            self.notifier.dispatch(TemplateKind::Reminder, &appointment);
            reminded.insert(appointment.id, appointment.start_at);
            sent += 1;
        }

        if sent > 0 {
            info!("Queued {} appointment reminders", sent);
        } else {
            debug!("No reminders due");
        }
        Ok(sent)
    }

    pub fn spawn(self: Arc<Self>, every: StdDuration, clock: Arc<dyn Clock>) -> JoinHandle<()> {
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(every);
            loop {
                ticker.tick().await;
                if let Err(e) = self.send_reminders(clock.now()).await {
                    warn!("Reminder sweep failed: {}", e);
                }
            }
        })
    }
}

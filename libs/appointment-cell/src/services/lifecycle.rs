// libs/appointment-cell/src/services/lifecycle.rs
use chrono::{DateTime, Utc};
use tracing::{debug, warn};

use crate::error::AppointmentError;
use crate::models::{Appointment, AppointmentStatus};

/// The appointment state machine:
///
/// ```text
/// PENDING -> CONFIRMED -> COMPLETED
///    |           |
///    +-----------+-> CANCELLED
/// ```
///
/// CANCELLED and COMPLETED are terminal.
pub struct AppointmentLifecycle;

impl AppointmentLifecycle {
    pub fn valid_transitions(current: AppointmentStatus) -> &'static [AppointmentStatus] {
        match current {
            AppointmentStatus::Pending => &[AppointmentStatus::Confirmed, AppointmentStatus::Cancelled],
            AppointmentStatus::Confirmed => &[AppointmentStatus::Completed, AppointmentStatus::Cancelled],
            AppointmentStatus::Cancelled | AppointmentStatus::Completed => &[],
        }
    }

    pub fn can_transition(from: AppointmentStatus, to: AppointmentStatus) -> bool {
        Self::valid_transitions(from).contains(&to)
    }

    pub fn ensure_transition(appointment: &Appointment, to: AppointmentStatus) -> Result<(), AppointmentError> {
        debug!("Validating transition {} -> {} for {}", appointment.status, to, appointment.id);

        if !Self::can_transition(appointment.status, to) {
            warn!("Rejected transition {} -> {} for appointment {}", appointment.status, to, appointment.id);
            return Err(AppointmentError::InvalidTransition {
                appointment_id: appointment.id,
                from: appointment.status,
                to,
            });
        }
        Ok(())
    }

    /// Completion additionally requires the booked interval to have elapsed.
    pub fn ensure_completable(appointment: &Appointment, now: DateTime<Utc>) -> Result<(), AppointmentError> {
        Self::ensure_transition(appointment, AppointmentStatus::Completed)?;
        if now < appointment.end_at {
            return Err(AppointmentError::NotYetEnded {
                appointment_id: appointment.id,
                end_at: appointment.end_at,
            });
        }
        Ok(())
    }

    /// Practitioner or time changes are only allowed while the appointment is live.
    pub fn ensure_reschedulable(appointment: &Appointment) -> Result<(), AppointmentError> {
        if appointment.status.is_terminal() {
            return Err(AppointmentError::InvalidTransition {
                appointment_id: appointment.id,
                from: appointment.status,
                to: AppointmentStatus::Pending,
            });
        }
        Ok(())
    }
}

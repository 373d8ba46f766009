use std::sync::Arc;
use std::time::Duration;

use chrono::NaiveDate;
use chrono_tz::Tz;
use tracing::{debug, info, instrument, warn};
use uuid::Uuid;

use directory_cell::{FacilityDirectory, SubjectDirectory};
use practitioner_cell::local_time::local_date;
use practitioner_cell::{Interval, Practitioner, PractitionerRepo, RepositoryError, WorkingIntervalRepo};

use crate::error::AppointmentError;
use crate::models::{Appointment, AppointmentStatus, NewAppointment, RescheduleAppointmentRequest, Slot};
use crate::repository::AppointmentRepo;
use crate::services::clock::Clock;
use crate::services::coordinator::AllocationCoordinator;
use crate::services::lifecycle::AppointmentLifecycle;
use crate::services::notification::{NotificationSink, Notifier, TemplateKind};
use crate::services::slots::{matches_available, SlotGenerator};

/// Storage handles the booking service works against.
#[derive(Clone)]
pub struct AppointmentStores {
    pub practitioners: Arc<dyn PractitionerRepo>,
    pub intervals: Arc<dyn WorkingIntervalRepo>,
    pub appointments: Arc<dyn AppointmentRepo>,
    pub facilities: Arc<dyn FacilityDirectory>,
    pub subjects: Arc<dyn SubjectDirectory>,
}

/// Entry point for every appointment operation.
///
/// Create, confirm and reschedule run generate-verify-commit under the
/// practitioner's allocation lock. Every write is compare-and-set on the
/// appointment version so unlocked writers (cancel, complete) cannot be lost.
pub struct AppointmentService {
    practitioners: Arc<dyn PractitionerRepo>,
    appointments: Arc<dyn AppointmentRepo>,
    facilities: Arc<dyn FacilityDirectory>,
    subjects: Arc<dyn SubjectDirectory>,
    slots: SlotGenerator,
    coordinator: AllocationCoordinator,
    notifier: Notifier,
    clock: Arc<dyn Clock>,
}

impl AppointmentService {
    pub fn new(
        stores: AppointmentStores,
        sink: Arc<dyn NotificationSink>,
        clock: Arc<dyn Clock>,
        lock_timeout: Duration,
    ) -> Self {
        Self {
            slots: SlotGenerator::new(
                stores.practitioners.clone(),
                stores.intervals.clone(),
                stores.appointments.clone(),
            ),
            notifier: Notifier::new(sink, stores.subjects.clone()),
            coordinator: AllocationCoordinator::new(lock_timeout),
            practitioners: stores.practitioners,
            appointments: stores.appointments,
            facilities: stores.facilities,
            subjects: stores.subjects,
            clock,
        }
    }

    pub fn coordinator(&self) -> &AllocationCoordinator {
        &self.coordinator
    }

    pub fn notifier(&self) -> &Notifier {
        &self.notifier
    }

    pub fn clock(&self) -> &Arc<dyn Clock> {
        &self.clock
    }

    // ==========================================================================
    // AVAILABILITY
    // ==========================================================================

    /// Slots for `date` (default: today in the facility's zone). Lock-free.
    pub async fn get_availability(
        &self,
        facility_id: Uuid,
        practitioner_id: Uuid,
        date: Option<NaiveDate>,
        exclude_appointment_id: Option<Uuid>,
    ) -> Result<Vec<Slot>, AppointmentError> {
        let practitioner = self.practitioner_in(facility_id, practitioner_id).await?;
        let tz = self.facilities.timezone(facility_id).await?;
        let date = date.unwrap_or_else(|| local_date(&tz, self.clock.now()));

        self.slots
            .generate_for(&practitioner, date, &tz, exclude_appointment_id)
            .await
    }

    // ==========================================================================
    // ALLOCATING OPERATIONS
    // ==========================================================================

    #[instrument(skip(self))]
    pub async fn create_appointment(
        &self,
        facility_id: Uuid,
        request: NewAppointment,
    ) -> Result<Appointment, AppointmentError> {
        let requested = requested_interval(request.start_at, request.end_at)?;
        let practitioner = self.practitioner_in(facility_id, request.practitioner_id).await?;
        self.ensure_subject_in(facility_id, request.subject_id).await?;
        let tz = self.facilities.timezone(facility_id).await?;

        let _guard = self.coordinator.acquire(practitioner.id).await?;
        self.ensure_slot_available(&practitioner, &tz, &requested, None).await?;

        let now = self.clock.now();
        let appointment = Appointment {
            id: Uuid::new_v4(),
            facility_id,
            practitioner_id: practitioner.id,
            subject_id: request.subject_id,
            start_at: requested.start_at,
            end_at: requested.end_at,
            status: AppointmentStatus::Pending,
            version: 0,
            created_at: now,
            updated_at: now,
        };

        let stored = self
            .appointments
            .insert(appointment)
            .await
            .map_err(|e| allocation_error(e, practitioner.id, &requested))?;

        info!("Created appointment {} for practitioner {}", stored.id, stored.practitioner_id);
        self.notifier.dispatch(TemplateKind::AppointmentCreated, &stored);
        Ok(stored)
    }

    #[instrument(skip(self))]
    pub async fn confirm_appointment(
        &self,
        facility_id: Uuid,
        appointment_id: Uuid,
    ) -> Result<Appointment, AppointmentError> {
        let snapshot = self.appointment_in(facility_id, appointment_id).await?;
        AppointmentLifecycle::ensure_transition(&snapshot, AppointmentStatus::Confirmed)?;

        let practitioner = self.practitioner_in(facility_id, snapshot.practitioner_id).await?;
        let tz = self.facilities.timezone(facility_id).await?;

        let _guard = self.coordinator.acquire(practitioner.id).await?;
        // Re-read under the lock; the snapshot may be stale.
        let current = self.appointment_in(facility_id, appointment_id).await?;
        AppointmentLifecycle::ensure_transition(&current, AppointmentStatus::Confirmed)?;
        if current.practitioner_id != practitioner.id {
            return Err(AppointmentError::ConcurrentModification(appointment_id));
        }

        self.ensure_slot_available(&practitioner, &tz, &current.interval(), Some(current.id))
            .await?;

        let requested = current.interval();
        let updated = self
            .write(current, |a| a.status = AppointmentStatus::Confirmed)
            .await
            .map_err(|e| allocation_error(e, practitioner.id, &requested))?;

        info!("Confirmed appointment {}", updated.id);
        self.notifier.dispatch(TemplateKind::AppointmentConfirmed, &updated);
        Ok(updated)
    }

    #[instrument(skip(self))]
    pub async fn reschedule_appointment(
        &self,
        facility_id: Uuid,
        appointment_id: Uuid,
        request: RescheduleAppointmentRequest,
    ) -> Result<Appointment, AppointmentError> {
        let snapshot = self.appointment_in(facility_id, appointment_id).await?;
        AppointmentLifecycle::ensure_reschedulable(&snapshot)?;

        let target_practitioner = request.practitioner_id.unwrap_or(snapshot.practitioner_id);
        let start_at = request.start_at.unwrap_or(snapshot.start_at);
        // Moving only the start keeps the booked length.
        let end_at = match (request.start_at, request.end_at) {
            (_, Some(end_at)) => end_at,
            (Some(start_at), None) => start_at
                .checked_add_signed(snapshot.interval().duration())
                .ok_or_else(|| AppointmentError::InvalidTime(format!("start {} is out of range", start_at)))?,
            (None, None) => snapshot.end_at,
        };
        let requested = requested_interval(start_at, end_at)?;

        if target_practitioner == snapshot.practitioner_id && requested == snapshot.interval() {
            debug!("Reschedule of {} changes nothing", appointment_id);
            return Ok(snapshot);
        }

        let practitioner = self.practitioner_in(facility_id, target_practitioner).await?;
        let tz = self.facilities.timezone(facility_id).await?;

        // Only the destination is locked. Leaving the old slot frees capacity,
        // and the version check catches any writer that touched the row meanwhile.
        let _guard = self.coordinator.acquire(practitioner.id).await?;
        let current = self.appointment_in(facility_id, appointment_id).await?;
        if current.version != snapshot.version {
            return Err(AppointmentError::ConcurrentModification(appointment_id));
        }
        AppointmentLifecycle::ensure_reschedulable(&current)?;

        self.ensure_slot_available(&practitioner, &tz, &requested, Some(current.id))
            .await?;

        let updated = self
            .write(current, |a| {
                a.practitioner_id = practitioner.id;
                a.start_at = requested.start_at;
                a.end_at = requested.end_at;
            })
            .await
            .map_err(|e| allocation_error(e, practitioner.id, &requested))?;

        info!("Rescheduled appointment {} to {} at {}", updated.id, updated.practitioner_id, updated.start_at);
        self.notifier.dispatch(TemplateKind::AppointmentRescheduled, &updated);
        Ok(updated)
    }

    // ==========================================================================
    // NON-ALLOCATING TRANSITIONS
    // ==========================================================================

    #[instrument(skip(self))]
    pub async fn cancel_appointment(
        &self,
        facility_id: Uuid,
        appointment_id: Uuid,
    ) -> Result<Appointment, AppointmentError> {
        let current = self.appointment_in(facility_id, appointment_id).await?;
        self.cancel(current).await
    }

    /// Patients may cancel only their own appointments; others read as missing.
    pub async fn cancel_appointment_for_subject(
        &self,
        subject_id: Uuid,
        appointment_id: Uuid,
    ) -> Result<Appointment, AppointmentError> {
        let current = self.get_appointment_for_subject(subject_id, appointment_id).await?;
        self.cancel(current).await
    }

    async fn cancel(&self, current: Appointment) -> Result<Appointment, AppointmentError> {
        AppointmentLifecycle::ensure_transition(&current, AppointmentStatus::Cancelled)?;
        let updated = self.write(current, |a| a.status = AppointmentStatus::Cancelled).await?;

        info!("Cancelled appointment {}", updated.id);
        self.notifier.dispatch(TemplateKind::AppointmentCancelled, &updated);
        Ok(updated)
    }

    #[instrument(skip(self))]
    pub async fn complete_appointment(
        &self,
        facility_id: Uuid,
        appointment_id: Uuid,
    ) -> Result<Appointment, AppointmentError> {
        let current = self.appointment_in(facility_id, appointment_id).await?;
        AppointmentLifecycle::ensure_completable(&current, self.clock.now())?;

        let updated = self.write(current, |a| a.status = AppointmentStatus::Completed).await?;

        info!("Completed appointment {}", updated.id);
        self.notifier.dispatch(TemplateKind::AppointmentCompleted, &updated);
        Ok(updated)
    }

    // ==========================================================================
    // QUERIES
    // ==========================================================================

    pub async fn get_appointment(
        &self,
        facility_id: Uuid,
        appointment_id: Uuid,
    ) -> Result<Appointment, AppointmentError> {
        self.appointment_in(facility_id, appointment_id).await
    }

    pub async fn get_appointment_for_subject(
        &self,
        subject_id: Uuid,
        appointment_id: Uuid,
    ) -> Result<Appointment, AppointmentError> {
        match self.appointments.get(appointment_id).await? {
            Some(a) if a.subject_id == subject_id => Ok(a),
            _ => Err(AppointmentError::NotFound(appointment_id)),
        }
    }

    pub async fn list_for_facility(&self, facility_id: Uuid) -> Result<Vec<Appointment>, AppointmentError> {
        Ok(self.appointments.list_by_facility(facility_id).await?)
    }

    pub async fn list_for_subject(&self, subject_id: Uuid) -> Result<Vec<Appointment>, AppointmentError> {
        Ok(self.appointments.list_by_subject(subject_id).await?)
    }

    /// Live appointments starting from now, soonest first.
    pub async fn upcoming_for_subject(&self, subject_id: Uuid) -> Result<Vec<Appointment>, AppointmentError> {
        let now = self.clock.now();
        let mut upcoming: Vec<Appointment> = self
            .appointments
            .list_by_subject(subject_id)
            .await?
            .into_iter()
            .filter(|a| !a.status.is_terminal() && a.start_at >= now)
            .collect();
        upcoming.sort_by_key(|a| a.start_at);
        Ok(upcoming)
    }

    /// Subject-scoped check used by the HTTP layer before facility-scoped writes.
    pub async fn ensure_subject_in(&self, facility_id: Uuid, subject_id: Uuid) -> Result<(), AppointmentError> {
        let subject = self.subjects.subject(subject_id).await?;
        ensure_same_facility(facility_id, subject.facility_id, "subject")
    }

    // ==========================================================================
    // HELPERS
    // ==========================================================================

    async fn practitioner_in(&self, facility_id: Uuid, practitioner_id: Uuid) -> Result<Practitioner, AppointmentError> {
        let practitioner = self
            .practitioners
            .get(practitioner_id)
            .await?
            .ok_or(AppointmentError::PractitionerNotFound(practitioner_id))?;
        ensure_same_facility(facility_id, practitioner.facility_id, "practitioner")?;
        Ok(practitioner)
    }

    async fn appointment_in(&self, facility_id: Uuid, appointment_id: Uuid) -> Result<Appointment, AppointmentError> {
        let appointment = self
            .appointments
            .get(appointment_id)
            .await?
            .ok_or(AppointmentError::NotFound(appointment_id))?;
        ensure_same_facility(facility_id, appointment.facility_id, "appointment")?;
        Ok(appointment)
    }

    async fn ensure_slot_available(
        &self,
        practitioner: &Practitioner,
        tz: &Tz,
        requested: &Interval,
        exclude_appointment_id: Option<Uuid>,
    ) -> Result<(), AppointmentError> {
        let date = local_date(tz, requested.start_at);
        let slots = self
            .slots
            .generate_for(practitioner, date, tz, exclude_appointment_id)
            .await?;

        if !matches_available(&slots, requested) {
            warn!(
                "Requested {} - {} is not an available slot for practitioner {}",
                requested.start_at, requested.end_at, practitioner.id
            );
            return Err(slot_unavailable(practitioner.id, requested));
        }
        Ok(())
    }

    async fn write<F>(&self, current: Appointment, change: F) -> Result<Appointment, RepositoryError>
    where
        F: FnOnce(&mut Appointment),
    {
        let expected_version = current.version;
        let mut next = current;
        change(&mut next);
        next.updated_at = self.clock.now();
        self.appointments.update(next, expected_version).await
    }
}

fn requested_interval(
    start_at: chrono::DateTime<chrono::Utc>,
    end_at: chrono::DateTime<chrono::Utc>,
) -> Result<Interval, AppointmentError> {
    Interval::new(start_at, end_at).ok_or_else(|| {
        AppointmentError::InvalidTime(format!("start {} must be before end {}", start_at, end_at))
    })
}

/// A store-level uniqueness rejection means a concurrent writer took the slot.
fn allocation_error(err: RepositoryError, practitioner_id: Uuid, requested: &Interval) -> AppointmentError {
    match err {
        RepositoryError::UniqueViolation(_) => {
            warn!("Store rejected overlapping booking for practitioner {}", practitioner_id);
            slot_unavailable(practitioner_id, requested)
        }
        other => other.into(),
    }
}

fn slot_unavailable(practitioner_id: Uuid, requested: &Interval) -> AppointmentError {
    AppointmentError::SlotUnavailable {
        practitioner_id,
        start_at: requested.start_at,
        end_at: requested.end_at,
    }
}

fn ensure_same_facility(expected: Uuid, found: Uuid, entity: &str) -> Result<(), AppointmentError> {
    if expected != found {
        warn!("Cross-facility {} reference: expected {}, found {}", entity, expected, found);
        return Err(AppointmentError::TenantMismatch {
            expected,
            found,
            entity: entity.to_string(),
        });
    }
    Ok(())
}

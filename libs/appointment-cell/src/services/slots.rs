use std::sync::Arc;

use chrono::NaiveDate;
use chrono_tz::Tz;
use tracing::{debug, instrument};
use uuid::Uuid;

use practitioner_cell::local_time::{day_window, weekday_index};
use practitioner_cell::{Interval, Practitioner, PractitionerRepo, WorkingIntervalRepo};

use crate::error::AppointmentError;
use crate::models::Slot;
use crate::repository::AppointmentRepo;

/// Turns a practitioner's weekly working hours into the bookable slots of one
/// calendar date, marked against the live booking set.
pub struct SlotGenerator {
    practitioners: Arc<dyn PractitionerRepo>,
    intervals: Arc<dyn WorkingIntervalRepo>,
    appointments: Arc<dyn AppointmentRepo>,
}

impl SlotGenerator {
    pub fn new(
        practitioners: Arc<dyn PractitionerRepo>,
        intervals: Arc<dyn WorkingIntervalRepo>,
        appointments: Arc<dyn AppointmentRepo>,
    ) -> Self {
        Self { practitioners, intervals, appointments }
    }

    pub async fn generate(
        &self,
        practitioner_id: Uuid,
        date: NaiveDate,
        tz: &Tz,
        exclude_appointment_id: Option<Uuid>,
    ) -> Result<Vec<Slot>, AppointmentError> {
        let practitioner = self
            .practitioners
            .get(practitioner_id)
            .await?
            .ok_or(AppointmentError::PractitionerNotFound(practitioner_id))?;
        self.generate_for(&practitioner, date, tz, exclude_appointment_id).await
    }

    #[instrument(skip(self, practitioner, tz), fields(practitioner_id = %practitioner.id))]
    pub async fn generate_for(
        &self,
        practitioner: &Practitioner,
        date: NaiveDate,
        tz: &Tz,
        exclude_appointment_id: Option<Uuid>,
    ) -> Result<Vec<Slot>, AppointmentError> {
        let weekday = weekday_index(date);
        let window = day_window(tz, date);

        let (working, booked) = futures::try_join!(
            self.intervals.for_weekday(practitioner.id, weekday),
            self.appointments
                .active_starting_in(practitioner.id, window, exclude_appointment_id),
        )?;

        if working.is_empty() {
            debug!("No working hours on weekday {} for {}", weekday, practitioner.id);
            return Ok(Vec::new());
        }

        let booked: Vec<Interval> = booked.iter().map(|a| a.interval()).collect();
        let length = practitioner.slot_duration();
        let mut slots = Vec::new();

        for shift in &working {
            // A DST shift can collapse very short working hours to nothing.
            let Some(bounds) = shift.on_date(tz, date) else {
                continue;
            };
            let mut cursor = bounds.start_at;
            while let Some(candidate) = Interval::starting_at(cursor, length) {
                if candidate.end_at > bounds.end_at {
                    break;
                }
                slots.push(Slot {
                    start_at: candidate.start_at,
                    end_at: candidate.end_at,
                    available: !booked.iter().any(|b| b.overlaps(&candidate)),
                });
                cursor = candidate.end_at;
            }
        }

        slots.sort_by_key(|slot| slot.start_at);
        debug!("Generated {} slots for {} on {}", slots.len(), practitioner.id, date);
        Ok(slots)
    }
}

/// True when `requested` is exactly one of the available slots.
pub fn matches_available(slots: &[Slot], requested: &Interval) -> bool {
    slots.iter().any(|slot| slot.available && slot.interval() == *requested)
}

use std::sync::Arc;

use chrono::Utc;
use tracing::{debug, info, instrument, warn};
use uuid::Uuid;

use crate::error::CalendarError;
use crate::models::{
    ensure_ordered, parse_hhmm, validate_day_of_week, validate_slot_duration,
    CreatePractitionerRequest, Practitioner, PractitionerProfile, UpdatePractitionerRequest,
    UpdateWorkingIntervalRequest, WorkingInterval, WorkingIntervalInput,
    DEFAULT_SLOT_DURATION_MINUTES,
};
use crate::repository::{PractitionerRepo, WorkingIntervalRepo};

/// Practitioner profiles and their recurring weekly working hours.
pub struct CalendarService {
    practitioners: Arc<dyn PractitionerRepo>,
    intervals: Arc<dyn WorkingIntervalRepo>,
}

impl CalendarService {
    pub fn new(practitioners: Arc<dyn PractitionerRepo>, intervals: Arc<dyn WorkingIntervalRepo>) -> Self {
        Self { practitioners, intervals }
    }

    #[instrument(skip(self, request), fields(name = %request.name))]
    pub async fn create_practitioner(
        &self,
        facility_id: Uuid,
        request: CreatePractitionerRequest,
    ) -> Result<PractitionerProfile, CalendarError> {
        let name = validate_name(&request.name)?;
        let slot_duration_minutes = validate_slot_duration(
            request.slot_duration_minutes.unwrap_or(DEFAULT_SLOT_DURATION_MINUTES),
        )?;
        if request.working_intervals.is_empty() {
            return Err(CalendarError::MissingWorkingIntervals);
        }

        let now = Utc::now();
        let practitioner = Practitioner {
            id: Uuid::new_v4(),
            facility_id,
            name,
            specialty: request.specialty,
            slot_duration_minutes,
            created_at: now,
            updated_at: now,
        };
        let intervals = validate_all(practitioner.id, &request.working_intervals)?;
        warn_on_overlap(practitioner.id, &intervals);

        let practitioner = self.practitioners.insert(practitioner).await?;
        // A practitioner without working hours must not survive a failed write.
        let working_intervals = match self.intervals.replace_all(practitioner.id, intervals).await {
            Ok(rows) => rows,
            Err(e) => {
                warn!("Working hours for {} failed to save, removing practitioner: {}", practitioner.id, e);
                if let Err(undo) = self.practitioners.delete(practitioner.id).await {
                    warn!("Could not remove practitioner {}: {}", practitioner.id, undo);
                }
                return Err(e.into());
            }
        };

        info!("Created practitioner {} in facility {}", practitioner.id, facility_id);
        Ok(PractitionerProfile { practitioner, working_intervals })
    }

    /// Practitioners outside `facility_id` are reported as missing.
    pub async fn practitioner_in_facility(
        &self,
        facility_id: Uuid,
        practitioner_id: Uuid,
    ) -> Result<Practitioner, CalendarError> {
        match self.practitioners.get(practitioner_id).await? {
            Some(p) if p.facility_id == facility_id => Ok(p),
            Some(_) => {
                warn!("Practitioner {} requested from foreign facility {}", practitioner_id, facility_id);
                Err(CalendarError::PractitionerNotFound(practitioner_id))
            }
            None => Err(CalendarError::PractitionerNotFound(practitioner_id)),
        }
    }

    pub async fn get_practitioner(
        &self,
        facility_id: Uuid,
        practitioner_id: Uuid,
    ) -> Result<PractitionerProfile, CalendarError> {
        debug!("Fetching practitioner {}", practitioner_id);
        let practitioner = self.practitioner_in_facility(facility_id, practitioner_id).await?;
        let working_intervals = self.intervals.for_practitioner(practitioner_id).await?;
        Ok(PractitionerProfile { practitioner, working_intervals })
    }

    pub async fn list_practitioners(&self, facility_id: Uuid) -> Result<Vec<Practitioner>, CalendarError> {
        Ok(self.practitioners.list_by_facility(facility_id).await?)
    }

    #[instrument(skip(self, request))]
    pub async fn update_practitioner(
        &self,
        facility_id: Uuid,
        practitioner_id: Uuid,
        request: UpdatePractitionerRequest,
    ) -> Result<PractitionerProfile, CalendarError> {
        let previous = self.practitioner_in_facility(facility_id, practitioner_id).await?;
        let mut practitioner = previous.clone();

        if let Some(name) = request.name.as_deref() {
            practitioner.name = validate_name(name)?;
        }
        if let Some(specialty) = request.specialty {
            practitioner.specialty = Some(specialty);
        }
        if let Some(minutes) = request.slot_duration_minutes {
            practitioner.slot_duration_minutes = validate_slot_duration(minutes)?;
        }

        // Validate everything before the first write.
        let replacement = match request.working_intervals.as_deref() {
            Some([]) => return Err(CalendarError::MissingWorkingIntervals),
            Some(inputs) => Some(validate_all(practitioner_id, inputs)?),
            None => None,
        };

        practitioner.updated_at = Utc::now();
        let practitioner = self.practitioners.update(practitioner).await?;

        let working_intervals = match replacement {
            Some(intervals) => {
                warn_on_overlap(practitioner_id, &intervals);
                // Put the old profile back so a failed replacement changes nothing.
                match self.intervals.replace_all(practitioner_id, intervals).await {
                    Ok(rows) => rows,
                    Err(e) => {
                        warn!("Working hours for {} failed to save, restoring profile: {}", practitioner_id, e);
                        if let Err(undo) = self.practitioners.update(previous).await {
                            warn!("Could not restore practitioner {}: {}", practitioner_id, undo);
                        }
                        return Err(e.into());
                    }
                }
            }
            None => self.intervals.for_practitioner(practitioner_id).await?,
        };

        info!("Updated practitioner {}", practitioner_id);
        Ok(PractitionerProfile { practitioner, working_intervals })
    }

    pub async fn add_working_interval(
        &self,
        facility_id: Uuid,
        practitioner_id: Uuid,
        input: WorkingIntervalInput,
    ) -> Result<WorkingInterval, CalendarError> {
        self.practitioner_in_facility(facility_id, practitioner_id).await?;
        let interval = input.validate()?.into_interval(practitioner_id);

        let mut existing = self.intervals.for_weekday(practitioner_id, interval.day_of_week).await?;
        existing.push(interval.clone());
        warn_on_overlap(practitioner_id, &existing);

        let stored = self.intervals.insert(interval).await?;
        info!("Added working interval {} for practitioner {}", stored.id, practitioner_id);
        Ok(stored)
    }

    pub async fn list_working_intervals(
        &self,
        facility_id: Uuid,
        practitioner_id: Uuid,
    ) -> Result<Vec<WorkingInterval>, CalendarError> {
        self.practitioner_in_facility(facility_id, practitioner_id).await?;
        Ok(self.intervals.for_practitioner(practitioner_id).await?)
    }

    pub async fn update_working_interval(
        &self,
        facility_id: Uuid,
        practitioner_id: Uuid,
        interval_id: Uuid,
        request: UpdateWorkingIntervalRequest,
    ) -> Result<WorkingInterval, CalendarError> {
        self.practitioner_in_facility(facility_id, practitioner_id).await?;
        let mut interval = self.owned_interval(practitioner_id, interval_id).await?;

        if let Some(day) = request.day_of_week {
            interval.day_of_week = validate_day_of_week(day)?;
        }
        if let Some(start) = request.start_time.as_deref() {
            interval.start_local = parse_hhmm(start)?;
        }
        if let Some(end) = request.end_time.as_deref() {
            interval.end_local = parse_hhmm(end)?;
        }
        ensure_ordered(interval.start_local, interval.end_local)?;

        let mut same_day: Vec<WorkingInterval> = self
            .intervals
            .for_weekday(practitioner_id, interval.day_of_week)
            .await?
            .into_iter()
            .filter(|wi| wi.id != interval_id)
            .collect();
        same_day.push(interval.clone());
        warn_on_overlap(practitioner_id, &same_day);

        let stored = self.intervals.update(interval).await?;
        info!("Updated working interval {}", interval_id);
        Ok(stored)
    }

    pub async fn delete_working_interval(
        &self,
        facility_id: Uuid,
        practitioner_id: Uuid,
        interval_id: Uuid,
    ) -> Result<(), CalendarError> {
        self.practitioner_in_facility(facility_id, practitioner_id).await?;
        self.owned_interval(practitioner_id, interval_id).await?;
        self.intervals.delete(interval_id).await?;
        info!("Deleted working interval {}", interval_id);
        Ok(())
    }

    async fn owned_interval(&self, practitioner_id: Uuid, interval_id: Uuid) -> Result<WorkingInterval, CalendarError> {
        match self.intervals.get(interval_id).await? {
            Some(wi) if wi.practitioner_id == practitioner_id => Ok(wi),
            _ => Err(CalendarError::WorkingIntervalNotFound(interval_id)),
        }
    }
}

fn validate_name(name: &str) -> Result<String, CalendarError> {
    let trimmed = name.trim();
    if trimmed.is_empty() {
        return Err(CalendarError::Validation("Practitioner name is required".to_string()));
    }
    Ok(trimmed.to_string())
}

fn validate_all(practitioner_id: Uuid, inputs: &[WorkingIntervalInput]) -> Result<Vec<WorkingInterval>, CalendarError> {
    inputs
        .iter()
        .map(|input| input.validate().map(|hours| hours.into_interval(practitioner_id)))
        .collect()
}

/// Overlapping shifts are stored as given; the slot generator tiles each one
/// independently, so flag them for whoever maintains the calendar.
fn warn_on_overlap(practitioner_id: Uuid, intervals: &[WorkingInterval]) {
    for (i, a) in intervals.iter().enumerate() {
        for b in &intervals[i + 1..] {
            if a.overlaps_local(b) {
                warn!(
                    "Practitioner {} has overlapping working intervals on day {}: {}-{} and {}-{}",
                    practitioner_id,
                    a.day_of_week,
                    a.start_local.format("%H:%M"),
                    a.end_local.format("%H:%M"),
                    b.start_local.format("%H:%M"),
                    b.end_local.format("%H:%M"),
                );
            }
        }
    }
}

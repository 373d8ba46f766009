#![allow(dead_code)]

use std::sync::Arc;
use std::time::Duration as StdDuration;

use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, NaiveTime, TimeZone, Utc};
use chrono_tz::Tz;
use tokio::sync::Mutex;
use uuid::Uuid;

use appointment_cell::{
    AppointmentRepo, AppointmentService, AppointmentStores, FixedClock, InMemoryAppointmentRepo, Notification,
    NotificationSink,
};
use directory_cell::{Facility, InMemoryFacilityDirectory, InMemorySubjectDirectory, SubjectRecord};
use practitioner_cell::{
    InMemoryPractitionerRepo, InMemoryWorkingIntervalRepo, Practitioner, PractitionerRepo,
    WorkingInterval, WorkingIntervalRepo,
};

#[derive(Default)]
pub struct RecordingSink {
    pub sent: Mutex<Vec<Notification>>,
}

#[async_trait]
impl NotificationSink for RecordingSink {
    async fn notify(&self, notification: Notification) -> Result<()> {
        self.sent.lock().await.push(notification);
        Ok(())
    }
}

impl RecordingSink {
    /// Notifications go out on spawned tasks; give them a moment to land.
    pub async fn wait_for(&self, count: usize) -> Vec<Notification> {
        for _ in 0..100 {
            if self.sent.lock().await.len() >= count {
                break;
            }
            tokio::time::sleep(StdDuration::from_millis(5)).await;
        }
        self.sent.lock().await.clone()
    }
}

pub struct Harness {
    pub facility_id: Uuid,
    pub tz: Tz,
    pub practitioners: Arc<InMemoryPractitionerRepo>,
    pub intervals: Arc<InMemoryWorkingIntervalRepo>,
    pub appointments: Arc<InMemoryAppointmentRepo>,
    pub facilities: Arc<InMemoryFacilityDirectory>,
    pub subjects: Arc<InMemorySubjectDirectory>,
    pub sink: Arc<RecordingSink>,
    pub clock: Arc<FixedClock>,
    pub service: Arc<AppointmentService>,
}

impl Harness {
    pub async fn new(timezone: &str) -> Self {
        Self::with_lock_timeout(timezone, StdDuration::from_secs(2)).await
    }

    pub async fn with_lock_timeout(timezone: &str, lock_timeout: StdDuration) -> Self {
        let facility_id = Uuid::new_v4();
        let facilities = Arc::new(InMemoryFacilityDirectory::new("UTC"));
        facilities
            .upsert(Facility {
                id: facility_id,
                name: "Test Clinic".to_string(),
                timezone: Some(timezone.to_string()),
            })
            .await
            .unwrap();

        let practitioners = Arc::new(InMemoryPractitionerRepo::new());
        let intervals = Arc::new(InMemoryWorkingIntervalRepo::new());
        let appointments = Arc::new(InMemoryAppointmentRepo::new());
        let subjects = Arc::new(InMemorySubjectDirectory::new());
        let sink = Arc::new(RecordingSink::default());
        // Sunday 2025-10-12 08:00 UTC, well before the Monday test slots.
        let clock = Arc::new(FixedClock::new(Utc.with_ymd_and_hms(2025, 10, 12, 8, 0, 0).unwrap()));

        let stores = AppointmentStores {
            practitioners: practitioners.clone(),
            intervals: intervals.clone(),
            appointments: appointments.clone(),
            facilities: facilities.clone(),
            subjects: subjects.clone(),
        };
        let service = Arc::new(AppointmentService::new(stores, sink.clone(), clock.clone(), lock_timeout));

        Self {
            facility_id,
            tz: timezone.parse().unwrap(),
            practitioners,
            intervals,
            appointments,
            facilities,
            subjects,
            sink,
            clock,
            service,
        }
    }

    /// A second service over the same directories and calendar but another
    /// appointment store.
    pub fn service_over(&self, appointments: Arc<dyn AppointmentRepo>) -> AppointmentService {
        let stores = AppointmentStores {
            practitioners: self.practitioners.clone(),
            intervals: self.intervals.clone(),
            appointments,
            facilities: self.facilities.clone(),
            subjects: self.subjects.clone(),
        };
        AppointmentService::new(stores, self.sink.clone(), self.clock.clone(), StdDuration::from_secs(2))
    }

    pub async fn practitioner(&self, slot_minutes: i32, shifts: &[(u8, &str, &str)]) -> Practitioner {
        self.practitioner_in(self.facility_id, slot_minutes, shifts).await
    }

    pub async fn practitioner_in(&self, facility_id: Uuid, slot_minutes: i32, shifts: &[(u8, &str, &str)]) -> Practitioner {
        let practitioner = Practitioner {
            id: Uuid::new_v4(),
            facility_id,
            name: "Dr. Test".to_string(),
            specialty: None,
            slot_duration_minutes: slot_minutes,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        };
        self.practitioners.insert(practitioner.clone()).await.unwrap();
        for (day, start, end) in shifts {
            self.intervals
                .insert(WorkingInterval {
                    id: Uuid::new_v4(),
                    practitioner_id: practitioner.id,
                    day_of_week: *day,
                    start_local: NaiveTime::parse_from_str(start, "%H:%M").unwrap(),
                    end_local: NaiveTime::parse_from_str(end, "%H:%M").unwrap(),
                })
                .await
                .unwrap();
        }
        practitioner
    }

    pub async fn subject(&self) -> Uuid {
        self.subject_in(self.facility_id).await
    }

    pub async fn subject_in(&self, facility_id: Uuid) -> Uuid {
        let id = Uuid::new_v4();
        self.subjects
            .upsert(SubjectRecord {
                id,
                facility_id,
                contact_ref: format!("{}@patients.test", id),
                display_name: None,
            })
            .await;
        id
    }

    /// Facility-local wall clock to an instant.
    pub fn local(&self, date: NaiveDate, hh: u32, mm: u32) -> DateTime<Utc> {
        self.tz
            .from_local_datetime(&date.and_hms_opt(hh, mm, 0).unwrap())
            .earliest()
            .unwrap()
            .with_timezone(&Utc)
    }
}

pub fn monday() -> NaiveDate {
    NaiveDate::from_ymd_opt(2025, 10, 13).unwrap()
}

pub fn tuesday() -> NaiveDate {
    NaiveDate::from_ymd_opt(2025, 10, 14).unwrap()
}

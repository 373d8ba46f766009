use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use tracing::{debug, info};

use appointment_cell::{
    AppointmentRepo, AppointmentService, AppointmentState, AppointmentStores, Clock,
    InMemoryAppointmentRepo, NotificationSink, ReminderSweep, SupabaseAppointmentRepo,
    SystemClock, TracingNotificationSink, WebhookNotificationSink,
};
use directory_cell::{
    DirectorySeed, FacilityDirectory, InMemoryFacilityDirectory, InMemorySubjectDirectory,
    SubjectDirectory, SupabaseFacilityDirectory, SupabaseSubjectDirectory,
};
use practitioner_cell::{
    CalendarService, InMemoryPractitionerRepo, InMemoryWorkingIntervalRepo, PractitionerRepo,
    PractitionerState, SupabasePractitionerRepo, SupabaseWorkingIntervalRepo, WorkingIntervalRepo,
};
use shared_config::{AppConfig, StorageBackend};
use shared_database::supabase::SupabaseClient;

/// Everything the router and the background tasks need.
pub struct Services {
    pub practitioners: Arc<PractitionerState>,
    pub appointments: Arc<AppointmentState>,
    pub reminders: Arc<ReminderSweep>,
    pub clock: Arc<dyn Clock>,
}

struct Backends {
    practitioners: Arc<dyn PractitionerRepo>,
    intervals: Arc<dyn WorkingIntervalRepo>,
    appointments: Arc<dyn AppointmentRepo>,
    facilities: Arc<dyn FacilityDirectory>,
    subjects: Arc<dyn SubjectDirectory>,
}

async fn memory_backends(config: &AppConfig) -> anyhow::Result<Backends> {
    let facilities = Arc::new(InMemoryFacilityDirectory::new(&config.default_timezone));
    let subjects = Arc::new(InMemorySubjectDirectory::new());

    if let Some(path) = config.directory_seed_file.as_deref() {
        DirectorySeed::load(path)
            .await?
            .apply(&facilities, &subjects)
            .await
            .with_context(|| format!("cannot seed directory from {}", path))?;
    }

    Ok(Backends {
        practitioners: Arc::new(InMemoryPractitionerRepo::new()),
        intervals: Arc::new(InMemoryWorkingIntervalRepo::new()),
        appointments: Arc::new(InMemoryAppointmentRepo::new()),
        facilities,
        subjects,
    })
}

fn supabase_backends(config: &AppConfig) -> Backends {
    let supabase = Arc::new(SupabaseClient::new(config));
    Backends {
        practitioners: Arc::new(SupabasePractitionerRepo::new(supabase.clone())),
        intervals: Arc::new(SupabaseWorkingIntervalRepo::new(supabase.clone())),
        appointments: Arc::new(SupabaseAppointmentRepo::new(supabase.clone())),
        facilities: Arc::new(SupabaseFacilityDirectory::new(
            supabase.clone(),
            &config.default_timezone,
        )),
        subjects: Arc::new(SupabaseSubjectDirectory::new(supabase)),
    }
}

fn notification_sink(config: &AppConfig) -> Arc<dyn NotificationSink> {
    match config.notification_webhook_url.as_deref() {
        Some(url) => {
            info!("Delivering notifications to webhook {}", url);
            Arc::new(WebhookNotificationSink::new(url))
        }
        None => Arc::new(TracingNotificationSink),
    }
}

pub async fn build(config: Arc<AppConfig>) -> anyhow::Result<Services> {
    let backends = match config.storage_backend {
        StorageBackend::Memory => {
            info!("Using in-memory storage");
            memory_backends(&config).await?
        }
        StorageBackend::Supabase => {
            info!("Using Supabase storage at {}", config.supabase_url);
            supabase_backends(&config)
        }
    };
    let sink = notification_sink(&config);
    Ok(assemble(config, backends, sink))
}

fn assemble(config: Arc<AppConfig>, backends: Backends, sink: Arc<dyn NotificationSink>) -> Services {
    let clock: Arc<dyn Clock> = Arc::new(SystemClock);

    let calendar = Arc::new(CalendarService::new(
        backends.practitioners.clone(),
        backends.intervals.clone(),
    ));

    let service = Arc::new(AppointmentService::new(
        AppointmentStores {
            practitioners: backends.practitioners,
            intervals: backends.intervals,
            appointments: backends.appointments.clone(),
            facilities: backends.facilities.clone(),
            subjects: backends.subjects,
        },
        sink,
        clock.clone(),
        Duration::from_millis(config.allocation_lock_timeout_ms),
    ));

    let reminders = Arc::new(ReminderSweep::new(
        backends.appointments,
        backends.facilities,
        service.notifier().clone(),
    ));

    Services {
        practitioners: Arc::new(PractitionerState { config: config.clone(), calendar }),
        appointments: Arc::new(AppointmentState { config, service }),
        reminders,
        clock,
    }
}

/// Drops per-practitioner lock entries nobody is holding.
pub fn spawn_lock_pruning(state: Arc<AppointmentState>, every: Duration) {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(every);
        loop {
            ticker.tick().await;
            let coordinator = state.service.coordinator();
            coordinator.prune();
            debug!("Allocation locks tracked after prune: {}", coordinator.tracked());
        }
    });
}

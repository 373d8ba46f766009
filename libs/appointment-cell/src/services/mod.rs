pub mod booking;
pub mod clock;
pub mod coordinator;
pub mod lifecycle;
pub mod notification;
pub mod reminder;
pub mod slots;

pub use booking::{AppointmentService, AppointmentStores};
pub use clock::{Clock, FixedClock, SystemClock};
pub use coordinator::AllocationCoordinator;
pub use lifecycle::AppointmentLifecycle;
pub use notification::{
    Notification, NotificationSink, Notifier, TemplateKind, TracingNotificationSink,
    WebhookNotificationSink,
};
pub use reminder::ReminderSweep;
pub use slots::SlotGenerator;

mod common;

use chrono::{Duration, NaiveDate, Utc};
use uuid::Uuid;

use appointment_cell::{Appointment, AppointmentRepo, AppointmentStatus, SlotGenerator};
use common::{monday, tuesday, Harness};

fn generator(h: &Harness) -> SlotGenerator {
    SlotGenerator::new(h.practitioners.clone(), h.intervals.clone(), h.appointments.clone())
}

async fn book(h: &Harness, practitioner_id: Uuid, start: chrono::DateTime<Utc>, minutes: i64, status: AppointmentStatus) -> Appointment {
    h.appointments
        .insert(Appointment {
            id: Uuid::new_v4(),
            facility_id: h.facility_id,
            practitioner_id,
            subject_id: Uuid::new_v4(),
            start_at: start,
            end_at: start + Duration::minutes(minutes),
            status,
            version: 0,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        })
        .await
        .unwrap()
}

#[tokio::test]
async fn monday_morning_yields_six_half_hour_slots() {
    let h = Harness::new("Asia/Kuala_Lumpur").await;
    let p = h.practitioner(30, &[(1, "09:00", "12:00")]).await;

    let slots = generator(&h).generate(p.id, monday(), &h.tz, None).await.unwrap();

    assert_eq!(slots.len(), 6);
    for (i, slot) in slots.iter().enumerate() {
        assert_eq!(slot.start_at, h.local(monday(), 9, 0) + Duration::minutes(30 * i as i64));
        assert_eq!(slot.end_at - slot.start_at, Duration::minutes(30));
        assert!(slot.available);
    }
    // 09:00 in Kuala Lumpur is 01:00 UTC.
    assert_eq!(slots[0].start_at.to_rfc3339(), "2025-10-13T01:00:00+00:00");
}

#[tokio::test]
async fn confirmed_booking_blocks_only_its_slot() {
    let h = Harness::new("Asia/Kuala_Lumpur").await;
    let p = h.practitioner(30, &[(1, "09:00", "12:00")]).await;
    book(&h, p.id, h.local(monday(), 10, 0), 30, AppointmentStatus::Confirmed).await;

    let slots = generator(&h).generate(p.id, monday(), &h.tz, None).await.unwrap();

    let unavailable: Vec<_> = slots.iter().filter(|s| !s.available).map(|s| s.start_at).collect();
    assert_eq!(unavailable, vec![h.local(monday(), 10, 0)]);
    assert_eq!(slots.iter().filter(|s| s.available).count(), 5);
}

#[tokio::test]
async fn cancelled_bookings_do_not_block() {
    let h = Harness::new("UTC").await;
    let p = h.practitioner(30, &[(1, "09:00", "12:00")]).await;
    book(&h, p.id, h.local(monday(), 10, 0), 30, AppointmentStatus::Cancelled).await;

    let slots = generator(&h).generate(p.id, monday(), &h.tz, None).await.unwrap();

    assert!(slots.iter().all(|s| s.available));
}

#[tokio::test]
async fn misaligned_booking_blocks_every_overlapped_slot() {
    let h = Harness::new("UTC").await;
    let p = h.practitioner(30, &[(1, "09:00", "12:00")]).await;
    book(&h, p.id, h.local(monday(), 9, 45), 30, AppointmentStatus::Pending).await;

    let slots = generator(&h).generate(p.id, monday(), &h.tz, None).await.unwrap();

    let blocked: Vec<_> = slots.iter().filter(|s| !s.available).map(|s| s.start_at).collect();
    assert_eq!(blocked, vec![h.local(monday(), 9, 30), h.local(monday(), 10, 0)]);
}

#[tokio::test]
async fn non_working_day_is_empty_not_an_error() {
    let h = Harness::new("UTC").await;
    let p = h.practitioner(30, &[(1, "09:00", "12:00")]).await;

    let slots = generator(&h).generate(p.id, tuesday(), &h.tz, None).await.unwrap();

    assert!(slots.is_empty());
}

#[tokio::test]
async fn trailing_remainder_is_discarded() {
    let h = Harness::new("UTC").await;
    let p = h.practitioner(25, &[(1, "09:00", "10:00")]).await;

    let slots = generator(&h).generate(p.id, monday(), &h.tz, None).await.unwrap();

    assert_eq!(slots.len(), 2);
    assert_eq!(slots[1].end_at, h.local(monday(), 9, 50));
}

#[tokio::test]
async fn shifts_are_merged_in_start_order() {
    let h = Harness::new("UTC").await;
    let p = h.practitioner(60, &[(1, "14:00", "16:00"), (1, "09:00", "11:00")]).await;

    let slots = generator(&h).generate(p.id, monday(), &h.tz, None).await.unwrap();

    let starts: Vec<_> = slots.iter().map(|s| s.start_at).collect();
    assert_eq!(
        starts,
        vec![h.local(monday(), 9, 0), h.local(monday(), 10, 0), h.local(monday(), 14, 0), h.local(monday(), 15, 0)]
    );
    assert!(slots.windows(2).all(|w| w[0].end_at <= w[1].start_at));
}

#[tokio::test]
async fn excluded_appointment_does_not_block_its_own_slot() {
    let h = Harness::new("UTC").await;
    let p = h.practitioner(30, &[(1, "09:00", "12:00")]).await;
    let own = book(&h, p.id, h.local(monday(), 10, 0), 30, AppointmentStatus::Pending).await;

    let with_self = generator(&h).generate(p.id, monday(), &h.tz, None).await.unwrap();
    let without_self = generator(&h).generate(p.id, monday(), &h.tz, Some(own.id)).await.unwrap();

    assert_eq!(with_self.iter().filter(|s| !s.available).count(), 1);
    assert!(without_self.iter().all(|s| s.available));
}

#[tokio::test]
async fn repeated_generation_is_identical() {
    let h = Harness::new("Asia/Kuala_Lumpur").await;
    let p = h.practitioner(20, &[(1, "08:00", "12:00"), (1, "13:00", "17:00")]).await;
    book(&h, p.id, h.local(monday(), 13, 20), 20, AppointmentStatus::Confirmed).await;
    let generator = generator(&h);

    let first = generator.generate(p.id, monday(), &h.tz, None).await.unwrap();
    let second = generator.generate(p.id, monday(), &h.tz, None).await.unwrap();

    assert_eq!(first, second);
}

#[tokio::test]
async fn bookings_are_scoped_to_the_local_day() {
    // 23:30 Sunday local in Kuala Lumpur is still Sunday; it must not leak into Monday.
    let h = Harness::new("Asia/Kuala_Lumpur").await;
    let p = h.practitioner(30, &[(0, "23:00", "23:59"), (1, "00:00", "01:00")]).await;
    let sunday = monday().pred_opt().unwrap();
    book(&h, p.id, h.local(sunday, 23, 30), 30, AppointmentStatus::Confirmed).await;

    let slots = generator(&h).generate(p.id, monday(), &h.tz, None).await.unwrap();

    assert_eq!(slots.len(), 2);
    assert!(slots.iter().all(|s| s.available));
}

#[tokio::test]
async fn spring_forward_day_tiles_in_absolute_time() {
    // London skips 01:00-02:00 on Sunday 2025-03-30.
    let h = Harness::new("Europe/London").await;
    let p = h.practitioner(30, &[(0, "00:00", "03:00")]).await;
    let date = NaiveDate::from_ymd_opt(2025, 3, 30).unwrap();

    let slots = generator(&h).generate(p.id, date, &h.tz, None).await.unwrap();

    // 00:00 GMT to 03:00 BST is two real hours.
    assert_eq!(slots.len(), 4);
    assert!(slots.iter().all(|s| s.end_at - s.start_at == Duration::minutes(30)));
    assert_eq!(slots[3].end_at, h.local(date, 3, 0));
}

#[tokio::test]
async fn fall_back_day_keeps_slot_length_exact() {
    // London repeats 01:00-02:00 on Sunday 2025-10-26.
    let h = Harness::new("Europe/London").await;
    let p = h.practitioner(30, &[(0, "00:00", "03:00")]).await;
    let date = NaiveDate::from_ymd_opt(2025, 10, 26).unwrap();

    let slots = generator(&h).generate(p.id, date, &h.tz, None).await.unwrap();

    assert_eq!(slots.len(), 8);
    assert!(slots.windows(2).all(|w| !w[0].interval().overlaps(&w[1].interval())));
}

#[tokio::test]
async fn unknown_practitioner_is_reported() {
    let h = Harness::new("UTC").await;

    let result = generator(&h).generate(Uuid::new_v4(), monday(), &h.tz, None).await;

    assert!(matches!(result, Err(appointment_cell::AppointmentError::PractitionerNotFound(_))));
}

use std::sync::atomic::{AtomicU32, Ordering};

use super::*;

static NEXT_CODE: AtomicU32 = AtomicU32::new(1);

fn booking(mentor: &str, date: &str, time_slot: &str, round: &str) -> NewBooking {
    NewBooking {
        mentor: mentor.to_string(),
        date: date.to_string(),
        time_slot: time_slot.to_string(),
        user_name: "alice".to_string(),
        company_name: None,
        round: round.to_string(),
        invite_link: "https://meet.example/abc".to_string(),
        unique_code: Some(format!("CODE{:04}", NEXT_CODE.fetch_add(1, Ordering::Relaxed))),
        status: BookingStatus::Booked,
    }
}

async fn inserted(storage: &Storage, booking: &NewBooking) -> BookingId {
    match storage.insert_booking(booking).await.expect("insert") {
        InsertOutcome::Inserted(id) => id,
        other => panic!("expected insert, got {other:?}"),
    }
}

async fn stored(storage: &Storage, mentor: &str, date: &str, time_slot: &str) -> BookingSummary {
    storage
        .booking_for_slot(mentor, date, time_slot)
        .await
        .expect("lookup")
        .expect("present")
}

#[tokio::test]
async fn health_check_succeeds_for_live_pool() {
    let storage = Storage::new("sqlite::memory:").await.expect("db");
    storage.health_check().await.expect("health check");
}

#[tokio::test]
async fn creates_database_file_when_missing() {
    let suffix = std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .expect("clock")
        .as_nanos();
    let temp_root = std::env::temp_dir().join(format!("slot_booking_storage_test_{suffix}"));
    let db_path = temp_root.join("nested").join("bookings.db");
    let database_url = format!("sqlite://{}", db_path.to_string_lossy().replace('\\', "/"));

    let storage = Storage::new(&database_url).await.expect("db");
    drop(storage);

    assert!(
        db_path.exists(),
        "database file should exist: {}",
        db_path.display()
    );

    std::fs::remove_dir_all(temp_root).expect("cleanup");
}

#[tokio::test]
async fn inserts_and_reads_back_day_bookings_in_insert_order() {
    let storage = Storage::new("sqlite::memory:").await.expect("db");
    inserted(&storage, &booking("Amir Sir", "01-01-2025", "4pm-5pm", "1st")).await;
    inserted(&storage, &booking("Amir Sir", "01-01-2025", "3pm-4pm", "2nd")).await;
    inserted(&storage, &booking("Amir Sir", "02-01-2025", "3pm-4pm", "2nd")).await;

    let day = storage
        .bookings_for_day("Amir Sir", "01-01-2025")
        .await
        .expect("day");
    let slots: Vec<_> = day.iter().map(|b| b.time_slot.as_str()).collect();
    assert_eq!(slots, vec!["4pm-5pm", "3pm-4pm"]);
    assert!(day[0].is_open_for_final());
    assert!(!day[1].is_open_for_final());
}

#[tokio::test]
async fn second_booking_for_same_slot_reports_slot_taken() {
    let storage = Storage::new("sqlite::memory:").await.expect("db");
    let first = booking("Tushar Sir", "01-01-2025", "11am-12pm", "1st");
    inserted(&storage, &first).await;

    let mut second = first.clone();
    second.unique_code = Some("OTHER123".to_string());
    let outcome = storage.insert_booking(&second).await.expect("insert");
    assert_eq!(outcome, InsertOutcome::SlotTaken);
    assert_eq!(storage.list_bookings().await.expect("list").len(), 1);
}

#[tokio::test]
async fn reused_unique_code_reports_code_taken() {
    let storage = Storage::new("sqlite::memory:").await.expect("db");
    let first = booking("Amir Sir", "01-01-2025", "3pm-4pm", "1st");
    inserted(&storage, &first).await;

    let mut clash = booking("Amir Sir", "01-01-2025", "4pm-5pm", "1st");
    clash.unique_code = first.unique_code.clone();
    let outcome = storage.insert_booking(&clash).await.expect("insert");
    assert_eq!(outcome, InsertOutcome::CodeTaken);
    assert!(storage
        .booking_for_slot("Amir Sir", "01-01-2025", "4pm-5pm")
        .await
        .expect("lookup")
        .is_none());
}

#[tokio::test]
async fn bookings_without_code_do_not_collide() {
    let storage = Storage::new("sqlite::memory:").await.expect("db");
    for slot in ["3pm-4pm", "4pm-5pm"] {
        let mut final_round = booking("Amir Sir", "01-01-2025", slot, "Final");
        final_round.unique_code = None;
        inserted(&storage, &final_round).await;
    }
    assert_eq!(storage.list_bookings().await.expect("list").len(), 2);
}

#[tokio::test]
async fn concurrent_inserts_for_one_slot_yield_single_winner() {
    let suffix = std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .expect("clock")
        .as_nanos();
    let temp_root = std::env::temp_dir().join(format!("slot_booking_race_test_{suffix}"));
    let db_path = temp_root.join("bookings.db");
    let database_url = format!("sqlite://{}", db_path.to_string_lossy().replace('\\', "/"));
    let storage = Storage::new(&database_url).await.expect("db");

    let mut first = booking("Amir Sir", "01-01-2025", "3pm-4pm", "1st");
    first.unique_code = Some("RACE0001".to_string());
    let mut second = first.clone();
    second.unique_code = Some("RACE0002".to_string());

    let (a, b) = tokio::join!(storage.insert_booking(&first), storage.insert_booking(&second));
    let outcomes = [a.expect("first"), b.expect("second")];
    let winners = outcomes
        .iter()
        .filter(|outcome| matches!(outcome, InsertOutcome::Inserted(_)))
        .count();
    assert_eq!(winners, 1);
    assert!(outcomes.contains(&InsertOutcome::SlotTaken));

    drop(storage);
    std::fs::remove_dir_all(temp_root).expect("cleanup");
}

#[tokio::test]
async fn replace_booking_overwrites_round_and_keeps_slot() {
    let storage = Storage::new("sqlite::memory:").await.expect("db");
    let id = inserted(&storage, &booking("Tushar Sir", "01-01-2025", "1pm-2pm", "1st")).await;
    let current = stored(&storage, "Tushar Sir", "01-01-2025", "1pm-2pm").await;

    let mut final_round = booking("Tushar Sir", "01-01-2025", "1pm-2pm", "Final");
    final_round.user_name = "bob".to_string();
    final_round.company_name = Some("Initech".to_string());
    assert!(storage
        .replace_booking(&current, &final_round)
        .await
        .expect("replace"));

    let after = stored(&storage, "Tushar Sir", "01-01-2025", "1pm-2pm").await;
    assert_eq!(after.booking_id, id);
    assert_eq!(after.round, "Final");
    assert_eq!(after.user_name, "bob");
    assert_eq!(after.company_name.as_deref(), Some("Initech"));
}

#[tokio::test]
async fn replace_booking_refuses_stale_snapshot() {
    let storage = Storage::new("sqlite::memory:").await.expect("db");
    inserted(&storage, &booking("Tushar Sir", "01-01-2025", "1pm-2pm", "1st")).await;
    let snapshot = stored(&storage, "Tushar Sir", "01-01-2025", "1pm-2pm").await;

    let mut first_claim = booking("Tushar Sir", "01-01-2025", "1pm-2pm", "Final");
    first_claim.user_name = "bob".to_string();
    assert!(storage
        .replace_booking(&snapshot, &first_claim)
        .await
        .expect("first claim"));

    let mut second_claim = first_claim.clone();
    second_claim.user_name = "carol".to_string();
    assert!(!storage
        .replace_booking(&snapshot, &second_claim)
        .await
        .expect("second claim"));
    assert_eq!(
        stored(&storage, "Tushar Sir", "01-01-2025", "1pm-2pm")
            .await
            .user_name,
        "bob"
    );
}

#[tokio::test]
async fn status_update_round_trips_through_text_column() {
    let storage = Storage::new("sqlite::memory:").await.expect("db");
    let id = inserted(&storage, &booking("Amir Sir", "01-01-2025", "5pm-6pm", "1st")).await;
    assert!(storage
        .set_booking_status(id, BookingStatus::Available)
        .await
        .expect("status"));

    let after = stored(&storage, "Amir Sir", "01-01-2025", "5pm-6pm").await;
    assert_eq!(after.status, BookingStatus::Available);
}

#[tokio::test]
async fn delete_by_code_removes_only_matching_booking() {
    let storage = Storage::new("sqlite::memory:").await.expect("db");
    let kept = booking("Amir Sir", "01-01-2025", "3pm-4pm", "1st");
    let mut removed = booking("Amir Sir", "01-01-2025", "4pm-5pm", "1st");
    removed.unique_code = Some("ZZZZ9999".to_string());
    inserted(&storage, &kept).await;
    let removed_id = inserted(&storage, &removed).await;

    let deleted = storage
        .delete_booking_by_code("ZZZZ9999")
        .await
        .expect("delete");
    assert_eq!(deleted, Some(removed_id));
    assert_eq!(
        storage
            .delete_booking_by_code("ZZZZ9999")
            .await
            .expect("second delete"),
        None
    );
    assert_eq!(storage.list_bookings().await.expect("list").len(), 1);
}

use anyhow::anyhow;
use chrono::{Duration, NaiveDate};
use shared::{
    domain::{is_final_round, BookingStatus, BookingSummary, MentorSchedule},
    error::{ApiError, ErrorCode},
    protocol::{
        AvailableSlotsRequest, BookingRequest, BookingResponse, CancelResponse, ScheduleOverview,
    },
};
use storage::{InsertOutcome, NewBooking, Storage};
use tracing::{error, info, warn};
use uuid::Uuid;

const UNIQUE_CODE_LEN: usize = 8;
const UNIQUE_CODE_ATTEMPTS: u32 = 5;
const UPCOMING_DAYS: i64 = 8;
const DATE_FORMAT: &str = "%d-%m-%Y";

#[derive(Clone)]
pub struct ApiContext {
    pub storage: Storage,
    pub rules: BookingRules,
}

/// Mentor schedules and the company block list.
#[derive(Debug, Clone)]
pub struct BookingRules {
    pub mentors: Vec<MentorSchedule>,
    pub blocked_companies: Vec<String>,
}

impl Default for BookingRules {
    fn default() -> Self {
        Self {
            mentors: vec![
                MentorSchedule::new(
                    "Chandra Sir",
                    &[
                        "12pm-1pm", "1pm-2pm", "2pm-3pm", "3pm-4pm", "4pm-5pm", "5pm-6pm",
                        "6pm-7pm",
                    ],
                ),
                MentorSchedule::new("Tushar Sir", &["11am-12pm", "12pm-1pm", "1pm-2pm"]),
                MentorSchedule::new("Amir Sir", &["3pm-4pm", "4pm-5pm", "5pm-6pm"]),
            ],
            blocked_companies: vec!["ABC".into(), "bcd".into()],
        }
    }
}

impl BookingRules {
    pub fn schedule_for(&self, mentor: &str) -> Option<&MentorSchedule> {
        self.mentors.iter().find(|schedule| schedule.mentor == mentor)
    }

    pub fn is_blocked(&self, company_name: &str) -> bool {
        self.blocked_companies
            .iter()
            .any(|blocked| blocked == company_name)
    }
}

/// Free schedule slots followed by first-round slots a final round may claim.
pub async fn available_slots(
    ctx: &ApiContext,
    mentor: Option<&str>,
    date: Option<&str>,
) -> Result<Vec<String>, ApiError> {
    let Some(schedule) = mentor.and_then(|mentor| ctx.rules.schedule_for(mentor)) else {
        return Ok(Vec::new());
    };
    let day = day_bookings(ctx, &schedule.mentor, date).await?;

    let mut slots = free_slots(schedule, &day);
    slots.extend(
        day.iter()
            .filter(|booking| booking.is_open_for_final())
            .map(|booking| booking.time_slot.clone()),
    );
    Ok(slots)
}

pub async fn available_slots_for_round(
    ctx: &ApiContext,
    req: &AvailableSlotsRequest,
) -> Result<Vec<String>, ApiError> {
    if is_final_round(&req.round) {
        return available_slots(ctx, Some(&req.mentor), Some(&req.date)).await;
    }

    let Some(schedule) = ctx.rules.schedule_for(&req.mentor) else {
        return Ok(Vec::new());
    };
    let day = day_bookings(ctx, &schedule.mentor, Some(&req.date)).await?;
    Ok(free_slots(schedule, &day))
}

pub async fn book_slot(ctx: &ApiContext, req: &BookingRequest) -> Result<BookingResponse, ApiError> {
    if ctx.rules.is_blocked(&req.company_name) {
        return Err(ApiError::new(
            ErrorCode::Forbidden,
            "This company is blocked.",
        ));
    }

    let required = [
        &req.user_name,
        &req.technology,
        &req.company_name,
        &req.round_name,
        &req.mentor,
        &req.date,
        &req.time,
        &req.invite_link,
    ];
    if required.iter().any(|field| field.is_empty()) {
        return Err(ApiError::new(
            ErrorCode::Validation,
            "All fields are required!",
        ));
    }

    if is_final_round(&req.round_name) {
        return book_final_round(ctx, req).await;
    }

    let unique_code = insert_with_fresh_code(ctx, req, generate_unique_code).await?;
    info!(mentor = %req.mentor, date = %req.date, time_slot = %req.time, round = %req.round_name, "slot booked");

    Ok(BookingResponse {
        message: format!("Booking successful! Your unique code: {unique_code}"),
        unique_code: Some(unique_code),
    })
}

/// Inserts the booking under a freshly drawn code, drawing again while the
/// code is already held by another booking.
async fn insert_with_fresh_code(
    ctx: &ApiContext,
    req: &BookingRequest,
    mut next_code: impl FnMut() -> String,
) -> Result<String, ApiError> {
    for attempt in 1..=UNIQUE_CODE_ATTEMPTS {
        let unique_code = next_code();
        let outcome = ctx
            .storage
            .insert_booking(&new_booking(req, Some(unique_code.clone())))
            .await
            .map_err(internal)?;
        match outcome {
            InsertOutcome::Inserted(_) => return Ok(unique_code),
            InsertOutcome::SlotTaken => return Err(slot_already_booked()),
            InsertOutcome::CodeTaken => warn!(attempt, "unique code collision, drawing another"),
        }
    }
    Err(internal(anyhow!(
        "no free unique code after {UNIQUE_CODE_ATTEMPTS} attempts"
    )))
}

async fn book_final_round(ctx: &ApiContext, req: &BookingRequest) -> Result<BookingResponse, ApiError> {
    let existing = ctx
        .storage
        .booking_for_slot(&req.mentor, &req.date, &req.time)
        .await
        .map_err(internal)?;

    let claimed = match existing {
        None => matches!(
            ctx.storage
                .insert_booking(&new_booking(req, None))
                .await
                .map_err(internal)?,
            InsertOutcome::Inserted(_)
        ),
        Some(slot) if slot.status == BookingStatus::Available => ctx
            .storage
            .replace_booking(&slot, &new_booking(req, None))
            .await
            .map_err(internal)?,
        // The first-round candidate keeps the code they were issued.
        Some(slot) if slot.is_open_for_final() => ctx
            .storage
            .replace_booking(&slot, &new_booking(req, slot.unique_code.clone()))
            .await
            .map_err(internal)?,
        Some(_) => false,
    };
    if !claimed {
        return Err(ApiError::new(
            ErrorCode::Conflict,
            "This slot is not available for 'Final' round booking.",
        ));
    }
    info!(mentor = %req.mentor, date = %req.date, time_slot = %req.time, "final round booked");

    Ok(BookingResponse {
        message: "Booking successful!".to_string(),
        unique_code: None,
    })
}

pub async fn cancel_booking(ctx: &ApiContext, unique_code: &str) -> Result<CancelResponse, ApiError> {
    let deleted = ctx
        .storage
        .delete_booking_by_code(unique_code)
        .await
        .map_err(internal)?;
    match deleted {
        Some(booking_id) => {
            info!(booking_id = booking_id.0, "booking canceled");
            Ok(CancelResponse {
                message: "Booking canceled successfully!".to_string(),
            })
        }
        None => Err(ApiError::new(
            ErrorCode::NotFound,
            "Invalid unique code or booking not found!",
        )),
    }
}

pub async fn schedule_overview(
    ctx: &ApiContext,
    today: NaiveDate,
) -> Result<ScheduleOverview, ApiError> {
    let bookings = ctx.storage.list_bookings().await.map_err(internal)?;
    Ok(ScheduleOverview {
        dates: upcoming_dates(today),
        mentors: ctx
            .rules
            .mentors
            .iter()
            .map(|schedule| schedule.mentor.clone())
            .collect(),
        mentor_time_slots: ctx.rules.mentors.clone(),
        bookings,
    })
}

pub fn upcoming_dates(today: NaiveDate) -> Vec<String> {
    (0..UPCOMING_DAYS)
        .map(|offset| (today + Duration::days(offset)).format(DATE_FORMAT).to_string())
        .collect()
}

pub fn generate_unique_code() -> String {
    let mut code = Uuid::new_v4().simple().to_string();
    code.truncate(UNIQUE_CODE_LEN);
    code.to_ascii_uppercase()
}

async fn day_bookings(
    ctx: &ApiContext,
    mentor: &str,
    date: Option<&str>,
) -> Result<Vec<BookingSummary>, ApiError> {
    let Some(date) = date else {
        return Ok(Vec::new());
    };
    ctx.storage
        .bookings_for_day(mentor, date)
        .await
        .map_err(internal)
}

fn free_slots(schedule: &MentorSchedule, day: &[BookingSummary]) -> Vec<String> {
    schedule
        .slots
        .iter()
        .filter(|slot| !day.iter().any(|booking| &booking.time_slot == *slot))
        .cloned()
        .collect()
}

fn new_booking(req: &BookingRequest, unique_code: Option<String>) -> NewBooking {
    NewBooking {
        mentor: req.mentor.clone(),
        date: req.date.clone(),
        time_slot: req.time.clone(),
        user_name: req.user_name.clone(),
        company_name: Some(req.company_name.clone()),
        round: req.round_name.clone(),
        invite_link: req.invite_link.clone(),
        unique_code,
        status: BookingStatus::Booked,
    }
}

fn slot_already_booked() -> ApiError {
    ApiError::new(ErrorCode::Conflict, "This slot is already booked!")
}

/// Storage detail stays in the log; callers only see a generic message.
fn internal(err: anyhow::Error) -> ApiError {
    error!(error = ?err, "booking store request failed");
    ApiError::new(ErrorCode::Internal, "internal server error")
}

use serde::{Deserialize, Serialize};

use crate::domain::{BookingSummary, MentorSchedule};

pub const AVAILABLE_SLOTS_ROUTE: &str = "/available_slots";
pub const SCHEDULE_ROUTE: &str = "/schedule";
pub const BOOKINGS_ROUTE: &str = "/bookings";
pub const CANCEL_ROUTE: &str = "/cancel";

/// Query string of `GET /available_slots`. Either side may be absent.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AvailableSlotsQuery {
    #[serde(default)]
    pub mentor: Option<String>,
    #[serde(default)]
    pub date: Option<String>,
}

/// JSON body of `POST /available_slots`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AvailableSlotsRequest {
    #[serde(default)]
    pub mentor: String,
    #[serde(default)]
    pub date: String,
    #[serde(default)]
    pub round: String,
}

/// Slot labels in server order. The field is required on decode.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AvailableSlotsResponse {
    pub available_slots: Vec<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BookingRequest {
    #[serde(default)]
    pub user_name: String,
    #[serde(default)]
    pub technology: String,
    #[serde(default)]
    pub company_name: String,
    #[serde(default)]
    pub round_name: String,
    #[serde(default)]
    pub mentor: String,
    #[serde(default)]
    pub date: String,
    #[serde(default)]
    pub time: String,
    #[serde(default)]
    pub invite_link: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BookingResponse {
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub unique_code: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CancelRequest {
    pub unique_code: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CancelResponse {
    pub message: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScheduleOverview {
    pub dates: Vec<String>,
    pub mentors: Vec<String>,
    pub mentor_time_slots: Vec<MentorSchedule>,
    pub bookings: Vec<BookingSummary>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_request_serializes_all_three_fields() {
        let body = serde_json::to_value(AvailableSlotsRequest {
            mentor: "m2".into(),
            date: "2024-02-02".into(),
            round: "R1".into(),
        })
        .expect("json");
        assert_eq!(
            body,
            serde_json::json!({ "mentor": "m2", "date": "2024-02-02", "round": "R1" })
        );
    }

    #[test]
    fn slots_response_without_field_is_rejected() {
        let decoded = serde_json::from_str::<AvailableSlotsResponse>(r#"{"slots": []}"#);
        assert!(decoded.is_err());
    }
}

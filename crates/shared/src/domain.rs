use serde::{Deserialize, Serialize};

macro_rules! id_newtype {
    ($name:ident) => {
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
        pub struct $name(pub i64);
    };
}

id_newtype!(BookingId);

/// Round label whose bookings stay open for a later final round.
pub const FIRST_ROUND: &str = "1st";
/// Round label allowed to take over a first-round booking.
pub const FINAL_ROUND: &str = "Final";

pub fn is_final_round(round: &str) -> bool {
    round == FINAL_ROUND
}

pub fn is_first_round(round: &str) -> bool {
    round == FIRST_ROUND
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BookingStatus {
    Available,
    Booked,
}

impl BookingStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Available => "Available",
            Self::Booked => "Booked",
        }
    }

    pub fn parse(raw: &str) -> Option<Self> {
        match raw {
            "Available" => Some(Self::Available),
            "Booked" => Some(Self::Booked),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MentorSchedule {
    pub mentor: String,
    pub slots: Vec<String>,
}

impl MentorSchedule {
    pub fn new(mentor: impl Into<String>, slots: &[&str]) -> Self {
        Self {
            mentor: mentor.into(),
            slots: slots.iter().map(|slot| slot.to_string()).collect(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BookingSummary {
    pub booking_id: BookingId,
    pub mentor: String,
    pub date: String,
    pub time_slot: String,
    pub user_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub company_name: Option<String>,
    pub round: String,
    pub invite_link: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub unique_code: Option<String>,
    pub status: BookingStatus,
}

impl BookingSummary {
    /// A first-round booking can still be claimed by the final round.
    pub fn is_open_for_final(&self) -> bool {
        self.status == BookingStatus::Booked && is_first_round(&self.round)
    }
}

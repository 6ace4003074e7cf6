use async_trait::async_trait;
use reqwest::{Client, Response};
use serde::de::DeserializeOwned;
use shared::{
    error::{ApiError, ApiException, ErrorCode},
    protocol::{
        AvailableSlotsRequest, AvailableSlotsResponse, BookingRequest, BookingResponse,
        CancelRequest, CancelResponse, ScheduleOverview, AVAILABLE_SLOTS_ROUTE, BOOKINGS_ROUTE,
        CANCEL_ROUTE, SCHEDULE_ROUTE,
    },
};
use tracing::debug;
use url::Url;

pub mod controller;
pub mod error;

pub use controller::{
    FormEvent, FormField, FormView, PendingRefresh, SelectionForm, SlotController, SlotOption,
    PLACEHOLDER_LABEL,
};
pub use error::{ClientError, ControllerError};

/// Where the controller gets slot lists from.
#[async_trait]
pub trait SlotSource: Send + Sync {
    async fn slots_for_day(&self, mentor: &str, date: &str) -> Result<Vec<String>, ClientError>;
    async fn slots_for_round(
        &self,
        req: &AvailableSlotsRequest,
    ) -> Result<Vec<String>, ClientError>;
}

#[derive(Clone)]
pub struct SlotClient {
    http: Client,
    server_url: String,
}

impl SlotClient {
    pub fn new(server_url: &str) -> Result<Self, ClientError> {
        let parsed = Url::parse(server_url)?;
        Ok(Self {
            http: Client::new(),
            server_url: parsed.as_str().trim_end_matches('/').to_string(),
        })
    }

    pub fn server_url(&self) -> &str {
        &self.server_url
    }

    pub async fn available_slots(
        &self,
        mentor: &str,
        date: &str,
    ) -> Result<Vec<String>, ClientError> {
        let res = self
            .http
            .get(format!("{}{AVAILABLE_SLOTS_ROUTE}", self.server_url))
            .query(&[("mentor", mentor), ("date", date)])
            .send()
            .await?;
        let body: AvailableSlotsResponse = read_json(res).await?;
        Ok(body.available_slots)
    }

    pub async fn available_slots_for_round(
        &self,
        req: &AvailableSlotsRequest,
    ) -> Result<Vec<String>, ClientError> {
        let res = self
            .http
            .post(format!("{}{AVAILABLE_SLOTS_ROUTE}", self.server_url))
            .json(req)
            .send()
            .await?;
        let body: AvailableSlotsResponse = read_json(res).await?;
        Ok(body.available_slots)
    }

    pub async fn schedule(&self) -> Result<ScheduleOverview, ClientError> {
        let res = self
            .http
            .get(format!("{}{SCHEDULE_ROUTE}", self.server_url))
            .send()
            .await?;
        read_json(res).await
    }

    pub async fn book(&self, req: &BookingRequest) -> Result<BookingResponse, ClientError> {
        let res = self
            .http
            .post(format!("{}{BOOKINGS_ROUTE}", self.server_url))
            .json(req)
            .send()
            .await?;
        read_json(res).await
    }

    pub async fn cancel(&self, unique_code: &str) -> Result<CancelResponse, ClientError> {
        let res = self
            .http
            .post(format!("{}{CANCEL_ROUTE}", self.server_url))
            .json(&CancelRequest {
                unique_code: unique_code.to_string(),
            })
            .send()
            .await?;
        read_json(res).await
    }
}

#[async_trait]
impl SlotSource for SlotClient {
    async fn slots_for_day(&self, mentor: &str, date: &str) -> Result<Vec<String>, ClientError> {
        self.available_slots(mentor, date).await
    }

    async fn slots_for_round(
        &self,
        req: &AvailableSlotsRequest,
    ) -> Result<Vec<String>, ClientError> {
        self.available_slots_for_round(req).await
    }
}

async fn read_json<T: DeserializeOwned>(res: Response) -> Result<T, ClientError> {
    let status = res.status();
    if status.is_success() {
        return Ok(res.json().await?);
    }

    let body = res.text().await?;
    debug!(status = status.as_u16(), %body, "server rejected request");
    let source = serde_json::from_str::<ApiError>(&body)
        .map(ApiException::from)
        .unwrap_or_else(|_| ApiException::new(ErrorCode::Internal, body));
    Err(ClientError::Api {
        status: status.as_u16(),
        source,
    })
}

#[cfg(test)]
#[path = "tests/lib_tests.rs"]
mod tests;

//! Slot availability controller: keeps the time selector in step with the
//! mentor, date and round fields of a booking form.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use shared::protocol::AvailableSlotsRequest;
use tokio::{runtime::Handle, task::JoinHandle};
use tracing::{debug, error, info};

use crate::{error::ControllerError, ClientError, SlotSource};

pub const PLACEHOLDER_LABEL: &str = "-- Select a Time Slot --";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FormField {
    Mentor,
    Date,
    Time,
    Round,
}

impl FormField {
    pub const ALL: [FormField; 4] = [Self::Mentor, Self::Date, Self::Time, Self::Round];

    /// Element id the field is bound under.
    pub fn id(self) -> &'static str {
        match self {
            Self::Mentor => "mentor",
            Self::Date => "date",
            Self::Time => "time",
            Self::Round => "round",
        }
    }

    pub fn from_id(id: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|field| field.id() == id)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FormEvent {
    Changed(FormField),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SlotOption {
    pub value: String,
    pub label: String,
}

impl SlotOption {
    pub fn placeholder() -> Self {
        Self {
            value: String::new(),
            label: PLACEHOLDER_LABEL.to_string(),
        }
    }

    pub fn slot(slot: impl Into<String>) -> Self {
        let value = slot.into();
        Self {
            label: value.clone(),
            value,
        }
    }
}

/// The form surface the controller reads from and renders into.
pub trait FormView: Send + Sync {
    fn has_field(&self, field: FormField) -> bool;
    fn value(&self, field: FormField) -> String;
    fn replace_time_options(&self, options: Vec<SlotOption>);
}

#[derive(Debug, Default)]
struct FormState {
    mentor: String,
    date: String,
    round: String,
    time: String,
    time_options: Vec<SlotOption>,
}

/// In-memory form backing terminal front-ends and tests.
#[derive(Debug, Default)]
pub struct SelectionForm {
    state: Mutex<FormState>,
}

impl SelectionForm {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&self, field: FormField, value: impl Into<String>) {
        let value = value.into();
        let mut state = self.lock();
        match field {
            FormField::Mentor => state.mentor = value,
            FormField::Date => state.date = value,
            FormField::Round => state.round = value,
            FormField::Time => state.time = value,
        }
    }

    pub fn time_options(&self) -> Vec<SlotOption> {
        self.lock().time_options.clone()
    }

    fn lock(&self) -> MutexGuard<'_, FormState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl FormView for SelectionForm {
    fn has_field(&self, _field: FormField) -> bool {
        true
    }

    fn value(&self, field: FormField) -> String {
        let state = self.lock();
        match field {
            FormField::Mentor => state.mentor.clone(),
            FormField::Date => state.date.clone(),
            FormField::Round => state.round.clone(),
            FormField::Time => state.time.clone(),
        }
    }

    fn replace_time_options(&self, options: Vec<SlotOption>) {
        let mut state = self.lock();
        // A rebuilt select falls back to its first option.
        state.time = options
            .first()
            .map(|option| option.value.clone())
            .unwrap_or_default();
        state.time_options = options;
    }
}

/// In-flight refresh started by a form event.
pub enum PendingRefresh {
    Day(JoinHandle<()>),
    Round(JoinHandle<Result<(), ClientError>>),
}

impl PendingRefresh {
    /// Waits for the refresh to finish, discarding its outcome.
    pub async fn settled(self) {
        match self {
            Self::Day(handle) => {
                let _ = handle.await;
            }
            Self::Round(handle) => {
                let _ = handle.await;
            }
        }
    }
}

pub struct SlotController<S, V> {
    source: Arc<S>,
    view: Arc<V>,
    runtime: Handle,
}

impl<S, V> SlotController<S, V>
where
    S: SlotSource + 'static,
    V: FormView + 'static,
{
    /// One-time setup: checks the form exposes every field the controller touches.
    pub fn bind(source: S, view: Arc<V>) -> Result<Self, ControllerError> {
        for field in FormField::ALL {
            if !view.has_field(field) {
                return Err(ControllerError::MissingField(field.id()));
            }
        }
        let runtime = Handle::try_current().map_err(|_| ControllerError::NoRuntime)?;
        info!("slot controller bound");
        Ok(Self {
            source: Arc::new(source),
            view,
            runtime,
        })
    }

    pub fn view(&self) -> &Arc<V> {
        &self.view
    }

    pub fn dispatch(&self, event: FormEvent) -> Option<PendingRefresh> {
        match event {
            FormEvent::Changed(FormField::Mentor | FormField::Date) => {
                self.on_mentor_or_date_change().map(PendingRefresh::Day)
            }
            FormEvent::Changed(FormField::Round) => {
                Some(PendingRefresh::Round(self.on_round_change()))
            }
            FormEvent::Changed(FormField::Time) => None,
        }
    }

    /// Refreshes the selector for the chosen mentor and date, keeping the
    /// current options when the lookup fails.
    pub fn on_mentor_or_date_change(&self) -> Option<JoinHandle<()>> {
        let mentor = self.view.value(FormField::Mentor);
        let date = self.view.value(FormField::Date);
        if mentor.is_empty() || date.is_empty() {
            debug!("mentor or date unset; skipping slot lookup");
            return None;
        }

        let source = Arc::clone(&self.source);
        let view = Arc::clone(&self.view);
        Some(self.runtime.spawn(async move {
            match source.slots_for_day(&mentor, &date).await {
                Ok(slots) => {
                    let mut options = Vec::with_capacity(slots.len() + 1);
                    options.push(SlotOption::placeholder());
                    options.extend(slots.into_iter().map(SlotOption::slot));
                    view.replace_time_options(options);
                }
                Err(err) => error!(%mentor, %date, error = %err, "Error fetching available slots"),
            }
        }))
    }

    /// Always queries the round endpoint. A failure stays in the task
    /// result and is not reported.
    pub fn on_round_change(&self) -> JoinHandle<Result<(), ClientError>> {
        let req = AvailableSlotsRequest {
            mentor: self.view.value(FormField::Mentor),
            date: self.view.value(FormField::Date),
            round: self.view.value(FormField::Round),
        };

        let source = Arc::clone(&self.source);
        let view = Arc::clone(&self.view);
        self.runtime.spawn(async move {
            let slots = source.slots_for_round(&req).await?;
            view.replace_time_options(slots.into_iter().map(SlotOption::slot).collect());
            Ok(())
        })
    }
}

#[cfg(test)]
#[path = "tests/controller_tests.rs"]
mod tests;

use chrono::{NaiveDate, NaiveTime};
use percent_encoding::{utf8_percent_encode, NON_ALPHANUMERIC};

use crate::models::{Professional, Service};
use crate::services::availability::DayRules;
use crate::services::timeutil;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BookingStep {
    Professional,
    Service,
    DateTime,
    Confirm,
    Submitted,
}

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum FlowError {
    #[error("this action is not available at the current step")]
    WrongStep,
    #[error("that professional is not taking bookings")]
    ProfessionalInactive,
    #[error("that service is not available")]
    ServiceInactive,
    #[error("the selected professional does not offer that service")]
    ServiceNotOffered,
    #[error("that date is not available")]
    DateNotEligible,
    #[error("pick a date and a time first")]
    IncompleteSelection,
    #[error("name and phone are required")]
    MissingClientDetails,
}

/// The multi-step client booking flow. Owns the draft exclusively; the
/// draft is discarded with the flow on completion or abandonment and is
/// never persisted.
///
/// `submit` only validates and yields the request to persist. The caller
/// moves the flow to `Submitted` with [`BookingFlow::complete`] once the
/// store accepted the record, so a failed write leaves the user at the
/// confirmation step where submitting again is possible.
#[derive(Debug, Clone)]
pub struct BookingFlow {
    step: BookingStep,
    entry_step: BookingStep,
    professional: Option<Professional>,
    service: Option<Service>,
    date: Option<NaiveDate>,
    time: Option<NaiveTime>,
    client_name: String,
    client_phone: String,
}

/// What the flow hands over for persistence once every guard has passed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppointmentRequest {
    pub client_name: String,
    pub client_phone: String,
    pub professional_id: String,
    pub service_id: String,
    pub date: NaiveDate,
    pub time: NaiveTime,
}

impl BookingFlow {
    pub fn new() -> Self {
        BookingFlow {
            step: BookingStep::Professional,
            entry_step: BookingStep::Professional,
            professional: None,
            service: None,
            date: None,
            time: None,
            client_name: String::new(),
            client_phone: String::new(),
        }
    }

    /// Entry point used when the landing page already chose a professional:
    /// the flow starts at service selection and `back` from there exits.
    pub fn with_professional(professional: Professional) -> Result<Self, FlowError> {
        if !professional.is_active {
            return Err(FlowError::ProfessionalInactive);
        }
        let mut flow = BookingFlow::new();
        flow.professional = Some(professional);
        flow.step = BookingStep::Service;
        flow.entry_step = BookingStep::Service;
        Ok(flow)
    }

    pub fn step(&self) -> BookingStep {
        self.step
    }

    pub fn selected_time(&self) -> Option<NaiveTime> {
        self.time
    }

    pub fn select_professional(&mut self, professional: Professional) -> Result<(), FlowError> {
        if self.step != BookingStep::Professional {
            return Err(FlowError::WrongStep);
        }
        if !professional.is_active {
            return Err(FlowError::ProfessionalInactive);
        }
        self.professional = Some(professional);
        self.step = BookingStep::Service;
        Ok(())
    }

    pub fn select_service(&mut self, service: Service) -> Result<(), FlowError> {
        if self.step != BookingStep::Service {
            return Err(FlowError::WrongStep);
        }
        let professional = self.professional.as_ref().ok_or(FlowError::WrongStep)?;
        if !service.is_active {
            return Err(FlowError::ServiceInactive);
        }
        if !professional.offers(&service.id) {
            return Err(FlowError::ServiceNotOffered);
        }
        self.service = Some(service);
        self.step = BookingStep::DateTime;
        Ok(())
    }

    /// Picking a date keeps the flow at the date/time step and clears any
    /// previously chosen time, since the old time belongs to the old date's
    /// slot grid.
    pub fn select_date(&mut self, date: NaiveDate, rules: &DayRules<'_>) -> Result<(), FlowError> {
        if self.step != BookingStep::DateTime {
            return Err(FlowError::WrongStep);
        }
        let professional = self.professional.as_ref().ok_or(FlowError::WrongStep)?;
        if !rules.eligible(date, professional) {
            return Err(FlowError::DateNotEligible);
        }
        self.date = Some(date);
        self.time = None;
        Ok(())
    }

    pub fn select_time(&mut self, time: NaiveTime) -> Result<(), FlowError> {
        if self.step != BookingStep::DateTime || self.date.is_none() {
            return Err(FlowError::WrongStep);
        }
        self.time = Some(time);
        Ok(())
    }

    pub fn continue_to_confirm(&mut self) -> Result<(), FlowError> {
        if self.step != BookingStep::DateTime {
            return Err(FlowError::WrongStep);
        }
        if self.date.is_none() || self.time.is_none() {
            return Err(FlowError::IncompleteSelection);
        }
        self.step = BookingStep::Confirm;
        Ok(())
    }

    pub fn set_client_details(&mut self, name: &str, phone: &str) {
        self.client_name = name.trim().to_string();
        self.client_phone = phone.trim().to_string();
    }

    /// Validate completeness and produce the record to persist. Does not
    /// advance the step; call [`complete`](Self::complete) after the store
    /// write succeeded.
    pub fn submit(&self) -> Result<AppointmentRequest, FlowError> {
        if self.step != BookingStep::Confirm {
            return Err(FlowError::WrongStep);
        }
        if self.client_name.is_empty() || self.client_phone.is_empty() {
            return Err(FlowError::MissingClientDetails);
        }
        let professional = self.professional.as_ref().ok_or(FlowError::WrongStep)?;
        let service = self.service.as_ref().ok_or(FlowError::WrongStep)?;
        let (date, time) = match (self.date, self.time) {
            (Some(date), Some(time)) => (date, time),
            _ => return Err(FlowError::IncompleteSelection),
        };
        Ok(AppointmentRequest {
            client_name: self.client_name.clone(),
            client_phone: self.client_phone.clone(),
            professional_id: professional.id.clone(),
            service_id: service.id.clone(),
            date,
            time,
        })
    }

    pub fn complete(&mut self) {
        self.step = BookingStep::Submitted;
    }

    /// Walk one step back. Returns `false` when already at the entry step,
    /// meaning control goes back to the caller that opened the flow.
    pub fn back(&mut self) -> bool {
        if self.step == self.entry_step {
            return false;
        }
        self.step = match self.step {
            BookingStep::Service => BookingStep::Professional,
            BookingStep::DateTime => BookingStep::Service,
            BookingStep::Confirm => BookingStep::DateTime,
            BookingStep::Professional | BookingStep::Submitted => return false,
        };
        true
    }
}

impl Default for BookingFlow {
    fn default() -> Self {
        BookingFlow::new()
    }
}

/// The confirmation text relayed to the salon over WhatsApp.
pub fn confirmation_message(
    salon_name: &str,
    client_name: &str,
    service_name: &str,
    professional_name: &str,
    date: NaiveDate,
    time: NaiveTime,
) -> String {
    let date_br = timeutil::format_display(&date.format("%Y-%m-%d").to_string());
    format!(
        "Olá! Gostaria de confirmar meu agendamento no *{salon_name}*.\n\n\
         Cliente: {client_name}\n\
         Serviço: {service_name}\n\
         Profissional: {professional_name}\n\
         Data: {date_br}\n\
         Horário: {}\n\n\
         Aguardo confirmação!",
        time.format("%H:%M"),
    )
}

/// wa.me deep link opening a chat with the salon, message prefilled.
pub fn whatsapp_link(salon_phone: &str, message: &str) -> String {
    let encoded = utf8_percent_encode(message, NON_ALPHANUMERIC);
    format!("https://wa.me/{salon_phone}?text={encoded}")
}

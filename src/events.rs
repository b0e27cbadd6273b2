use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::decimal::Money;
use crate::types::{ApplicationId, ApplicationStatus};

/// all events that can be emitted by the loan desk
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Event {
    // origination events
    ApplicationSubmitted {
        application_id: ApplicationId,
        category: String,
        amount: Money,
        tenure_months: u32,
        emi: Money,
        timestamp: DateTime<Utc>,
    },
    NidVerified {
        application_id: ApplicationId,
        nid_number: String,
        timestamp: DateTime<Utc>,
    },

    // review events
    KycVerified {
        application_id: ApplicationId,
        reviewer: String,
        timestamp: DateTime<Utc>,
    },
    KycRejected {
        application_id: ApplicationId,
        reviewer: String,
        reason: String,
        timestamp: DateTime<Utc>,
    },
    ApplicationApproved {
        application_id: ApplicationId,
        reviewer: String,
        timestamp: DateTime<Utc>,
    },
    ApplicationRejected {
        application_id: ApplicationId,
        reviewer: String,
        reason: String,
        timestamp: DateTime<Utc>,
    },
    LoanDisbursed {
        application_id: ApplicationId,
        amount: Money,
        first_due_date: NaiveDate,
        timestamp: DateTime<Utc>,
    },

    // repayment events
    RepaymentRecorded {
        application_id: ApplicationId,
        installment_number: u32,
        amount: Money,
        late_fee: Money,
        timestamp: DateTime<Utc>,
    },
    LoanCompleted {
        application_id: ApplicationId,
        total_paid: Money,
        timestamp: DateTime<Utc>,
    },

    // status change events
    StatusChanged {
        application_id: ApplicationId,
        old_status: ApplicationStatus,
        new_status: ApplicationStatus,
        timestamp: DateTime<Utc>,
    },
}

/// event store for collecting events during operations
#[derive(Debug, Default)]
pub struct EventStore {
    events: Vec<Event>,
}

impl EventStore {
    pub fn new() -> Self {
        Self { events: Vec::new() }
    }

    pub fn emit(&mut self, event: Event) {
        self.events.push(event);
    }

    pub fn take_events(&mut self) -> Vec<Event> {
        std::mem::take(&mut self.events)
    }

    pub fn events(&self) -> &[Event] {
        &self.events
    }
}

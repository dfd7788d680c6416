//! A small bank account domain shared by the scenarios.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use tributary::domain::{AggregateRoot, AggregateRootState};
use tributary::events::{
    Artifact, DomainEvent, EventSourceId, EventsError, ExecutionContext, MicroserviceId, TenantId,
};

pub const ACCOUNT: Artifact = Artifact::from_u128(0xacc0);
pub const OPENED: Artifact = Artifact::from_u128(0xacc1);
pub const DEPOSITED: Artifact = Artifact::from_u128(0xacc2);

pub fn execution_context() -> ExecutionContext {
    ExecutionContext::new(MicroserviceId::new(), TenantId::new())
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum AccountEvent {
    Opened { owner: String },
    Deposited { amount: u64 },
}

impl DomainEvent for AccountEvent {
    fn artifact(&self) -> Artifact {
        match self {
            AccountEvent::Opened { .. } => OPENED,
            AccountEvent::Deposited { .. } => DEPOSITED,
        }
    }

    fn to_content(&self) -> tributary::events::Result<Value> {
        Ok(serde_json::to_value(self)?)
    }

    fn from_content(artifact: Artifact, content: &Value) -> tributary::events::Result<Self> {
        if artifact != OPENED && artifact != DEPOSITED {
            return Err(EventsError::UnknownArtifact(artifact));
        }
        Ok(serde_json::from_value(content.clone())?)
    }
}

#[derive(Debug)]
pub struct Account {
    root: AggregateRootState<AccountEvent>,
    pub balance: u64,
}

impl Account {
    pub fn open(&mut self, owner: &str) {
        self.apply(AccountEvent::Opened {
            owner: owner.to_string(),
        });
    }

    pub fn deposit(&mut self, amount: u64) {
        self.apply(AccountEvent::Deposited { amount });
    }
}

impl AggregateRoot for Account {
    type Event = AccountEvent;

    fn artifact() -> Artifact {
        ACCOUNT
    }

    fn create(event_source: EventSourceId) -> Self {
        Self {
            root: AggregateRootState::new(event_source),
            balance: 0,
        }
    }

    fn state(&self) -> &AggregateRootState<AccountEvent> {
        &self.root
    }

    fn state_mut(&mut self) -> &mut AggregateRootState<AccountEvent> {
        &mut self.root
    }

    fn on(&mut self, event: &AccountEvent) {
        if let AccountEvent::Deposited { amount } = event {
            self.balance += amount;
        }
    }
}

//! 结算领域事件

use commercium_common::{SellerId, SettlementId};
use commercium_domain_core::Decimal;
use commercium_event_core::DomainEvent;
use serde::{Deserialize, Serialize};

use super::values::SettlementPeriod;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SettlementCreated {
    pub settlement_id: SettlementId,
    pub seller_id: SellerId,
    pub period: SettlementPeriod,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SettlementCompleted {
    pub settlement_id: SettlementId,
    pub seller_id: SellerId,
    pub net_amount: Decimal,
    pub item_count: usize,
}

#[derive(Debug, Clone, Serialize)]
#[serde(untagged)]
pub enum SettlementEvent {
    Created(SettlementCreated),
    Completed(SettlementCompleted),
}

impl SettlementEvent {
    pub fn seller_id(&self) -> &SellerId {
        match self {
            Self::Created(e) => &e.seller_id,
            Self::Completed(e) => &e.seller_id,
        }
    }

    fn settlement_id(&self) -> SettlementId {
        match self {
            Self::Created(e) => e.settlement_id,
            Self::Completed(e) => e.settlement_id,
        }
    }
}

impl DomainEvent for SettlementEvent {
    fn event_type(&self) -> &'static str {
        match self {
            Self::Created(_) => "SettlementCreated",
            Self::Completed(_) => "SettlementCompleted",
        }
    }

    fn aggregate_type(&self) -> &'static str {
        "Settlement"
    }

    fn aggregate_id(&self) -> String {
        self.settlement_id().to_string()
    }
}

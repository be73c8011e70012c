use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};
use std::fmt;
use utoipa::ToSchema;
use uuid::Uuid;

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "orders")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub user_id: Uuid,
    pub status: OrderStatus,
    /// Sum of item line totals, frozen at creation. Never recomputed from
    /// live catalog prices.
    #[sea_orm(column_type = "Decimal(Some((10, 2)))")]
    pub total_price: Decimal,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::order_item::Entity")]
    OrderItems,
}

impl Related<super::order_item::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::OrderItems.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

/// Order status enumeration.
///
/// A closed enum with an explicit transition table. The wire/database
/// representation keeps the historical human-readable strings, including
/// the space in "Ready to ship".
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, EnumIter, DeriveActiveEnum, ToSchema,
)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(20))")]
pub enum OrderStatus {
    #[sea_orm(string_value = "Pending")]
    #[serde(rename = "Pending")]
    Pending,
    #[sea_orm(string_value = "Ready to ship")]
    #[serde(rename = "Ready to ship")]
    ReadyToShip,
    #[sea_orm(string_value = "Shipped")]
    #[serde(rename = "Shipped")]
    Shipped,
    #[sea_orm(string_value = "Delivered")]
    #[serde(rename = "Delivered")]
    Delivered,
    #[sea_orm(string_value = "Canceled")]
    #[serde(rename = "Canceled")]
    Canceled,
}

impl OrderStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            OrderStatus::Pending => "Pending",
            OrderStatus::ReadyToShip => "Ready to ship",
            OrderStatus::Shipped => "Shipped",
            OrderStatus::Delivered => "Delivered",
            OrderStatus::Canceled => "Canceled",
        }
    }

    /// Whether the order can still move to another status.
    pub fn is_terminal(&self) -> bool {
        matches!(self, OrderStatus::Delivered | OrderStatus::Canceled)
    }

    /// Transition table for staff-driven status updates. Self-transitions
    /// are treated as idempotent no-ops and always allowed.
    pub fn can_transition_to(&self, next: OrderStatus) -> bool {
        if *self == next {
            return true;
        }
        matches!(
            (self, next),
            (OrderStatus::Pending, OrderStatus::ReadyToShip)
                | (OrderStatus::Pending, OrderStatus::Canceled)
                | (OrderStatus::ReadyToShip, OrderStatus::Shipped)
                | (OrderStatus::ReadyToShip, OrderStatus::Canceled)
                | (OrderStatus::Shipped, OrderStatus::Delivered)
        )
    }
}

impl fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pending_can_move_to_ready_or_canceled() {
        assert!(OrderStatus::Pending.can_transition_to(OrderStatus::ReadyToShip));
        assert!(OrderStatus::Pending.can_transition_to(OrderStatus::Canceled));
        assert!(!OrderStatus::Pending.can_transition_to(OrderStatus::Shipped));
        assert!(!OrderStatus::Pending.can_transition_to(OrderStatus::Delivered));
    }

    #[test]
    fn terminal_states_reject_all_transitions() {
        for next in [
            OrderStatus::Pending,
            OrderStatus::ReadyToShip,
            OrderStatus::Shipped,
        ] {
            assert!(!OrderStatus::Canceled.can_transition_to(next));
            assert!(!OrderStatus::Delivered.can_transition_to(next));
        }
        assert!(OrderStatus::Canceled.is_terminal());
        assert!(OrderStatus::Delivered.is_terminal());
    }

    #[test]
    fn self_transition_is_idempotent() {
        assert!(OrderStatus::ReadyToShip.can_transition_to(OrderStatus::ReadyToShip));
        assert!(OrderStatus::Canceled.can_transition_to(OrderStatus::Canceled));
    }

    #[test]
    fn backward_transitions_are_rejected() {
        assert!(!OrderStatus::ReadyToShip.can_transition_to(OrderStatus::Pending));
        assert!(!OrderStatus::Shipped.can_transition_to(OrderStatus::ReadyToShip));
    }

    #[test]
    fn wire_strings_round_trip() {
        let status: OrderStatus = serde_json::from_str("\"Ready to ship\"").unwrap();
        assert_eq!(status, OrderStatus::ReadyToShip);
        assert_eq!(
            serde_json::to_string(&OrderStatus::ReadyToShip).unwrap(),
            "\"Ready to ship\""
        );
        assert_eq!(OrderStatus::ReadyToShip.to_string(), "Ready to ship");
    }
}

//! Booking entity - One customer order over one or more line items.
//!
//! `booking_status` is never written directly by callers: it is set at creation
//! and afterwards derived from the latest payment (see `core::status`), except for
//! the operational `completed` transition.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Booking database model
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "bookings")]
pub struct Model {
    /// Unique identifier for the booking
    #[sea_orm(primary_key)]
    pub id: i64,
    /// Owning user, None for internal bookings without a customer account
    pub user_id: Option<i64>,
    /// Human-facing invoice number, unique across all bookings
    #[sea_orm(unique)]
    pub invoice_number: String,
    /// Sum of line item amounts at creation time
    pub total_amount: i64,
    /// One of `waiting`, `approved`, `completed`, `rejected`, `cancelled`
    pub booking_status: String,
    /// Whether an administrator created the booking on a customer's behalf
    pub is_internal: bool,
    /// When the booking was created
    pub created_at: DateTimeUtc,
    /// When the booking was last modified
    pub updated_at: DateTimeUtc,
}

/// Defines relationships between Booking and other entities
#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    /// One booking has many line items
    #[sea_orm(has_many = "super::booking_line_item::Entity")]
    LineItems,
    /// One booking has many payments
    #[sea_orm(has_many = "super::payment::Entity")]
    Payments,
}

impl Related<super::booking_line_item::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::LineItems.def()
    }
}

impl Related<super::payment::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Payments.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

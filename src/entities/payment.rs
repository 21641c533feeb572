//! Payment entity - A payment attempt against a booking.
//!
//! The payment with the highest id is the booking's latest payment; its status
//! drives the booking status.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Payment database model
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "payments")]
pub struct Model {
    /// Unique identifier for the payment
    #[sea_orm(primary_key)]
    pub id: i64,
    /// Booking being paid for
    pub booking_id: i64,
    /// One of `unpaid`, `pending`, `paid`, `failed`, `refunded`
    pub payment_status: String,
    /// Amount the customer reports having paid
    pub amount_paid: i64,
    /// Payment method (e.g., `"transfer"`)
    pub method: String,
    /// Stored filename of the uploaded proof, if any
    pub proof_filename: Option<String>,
    /// Administrator who last verified this payment
    pub verified_by_admin_id: Option<i64>,
    /// When the payment was last verified
    pub verified_at: Option<DateTimeUtc>,
    /// Note left by the verifying administrator
    pub verifier_note: Option<String>,
    /// When the payment was recorded
    pub created_at: DateTimeUtc,
}

/// Defines relationships between Payment and other entities
#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    /// Each payment belongs to one booking
    #[sea_orm(
        belongs_to = "super::booking::Entity",
        from = "Column::BookingId",
        to = "super::booking::Column::Id",
        on_delete = "Cascade"
    )]
    Booking,
}

impl Related<super::booking::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Booking.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

//! Booking line item entity - A booked date range for one service.
//!
//! Name and unit price are snapshotted when the booking is created, so later
//! catalog changes never alter historical bookings.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Booking line item database model
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "booking_line_items")]
pub struct Model {
    /// Unique identifier for the line item
    #[sea_orm(primary_key)]
    pub id: i64,
    /// Booking this line item belongs to
    pub booking_id: i64,
    /// Service being booked
    pub service_id: i64,
    /// Service name at booking time
    pub name: String,
    /// Unit price at booking time
    pub price: i64,
    /// First booked day (inclusive)
    pub start_date: Date,
    /// Last booked day (inclusive)
    pub end_date: Date,
    /// Number of booked days
    pub qty: i64,
    /// Customer type the price was resolved for
    pub customer_type: String,
}

impl Model {
    /// Amount this line item contributes to the booking total.
    #[must_use]
    pub const fn amount(&self) -> i64 {
        self.price * self.qty
    }
}

/// Defines relationships between `BookingLineItem` and other entities
#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    /// Each line item belongs to one booking
    #[sea_orm(
        belongs_to = "super::booking::Entity",
        from = "Column::BookingId",
        to = "super::booking::Column::Id",
        on_delete = "Cascade"
    )]
    Booking,
    /// Each line item references one service
    #[sea_orm(
        belongs_to = "super::service::Entity",
        from = "Column::ServiceId",
        to = "super::service::Column::Id"
    )]
    Service,
}

impl Related<super::booking::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Booking.def()
    }
}

impl Related<super::service::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Service.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

//! Service entity - A rentable asset or facility offered for booking.
//!
//! Each service belongs to an organizational unit and carries either a flat
//! `base_price` or, when `is_price_per_type` is set, a set of price tiers keyed
//! by customer type.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Service database model
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "services")]
pub struct Model {
    /// Unique identifier for the service
    #[sea_orm(primary_key)]
    pub id: i64,
    /// Display name (e.g., "Main Auditorium")
    pub name: String,
    /// URL slug, unique across services
    #[sea_orm(unique)]
    pub slug: String,
    /// Organizational unit that owns the service
    pub unit: String,
    /// Free-text description shown on the detail page
    pub description: Option<String>,
    /// Flat price per day, used when `is_price_per_type` is false
    pub base_price: i64,
    /// Whether prices come from the `price_tiers` table
    pub is_price_per_type: bool,
    /// Inactive services are hidden and cannot be booked
    pub is_active: bool,
    /// Bumped by every booking transaction to serialize reservations
    pub reservation_seq: i64,
    /// When the service was created
    pub created_at: DateTimeUtc,
    /// When the service was last modified
    pub updated_at: DateTimeUtc,
}

/// Defines relationships between Service and other entities
#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    /// One service has many price tiers
    #[sea_orm(has_many = "super::price_tier::Entity")]
    PriceTiers,
    /// One service has many booked line items
    #[sea_orm(has_many = "super::booking_line_item::Entity")]
    LineItems,
    /// One service has many ratings
    #[sea_orm(has_many = "super::rating::Entity")]
    Ratings,
}

impl Related<super::price_tier::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::PriceTiers.def()
    }
}

impl Related<super::booking_line_item::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::LineItems.def()
    }
}

impl Related<super::rating::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Ratings.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

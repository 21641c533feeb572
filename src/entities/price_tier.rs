//! Price tier entity - Per-customer-type price for a tiered service.
//!
//! Tiers are replaced wholesale whenever the owning service is updated.
//! `(service_id, customer_type)` is unique (index created in `config::database`).

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Price tier database model
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "price_tiers")]
pub struct Model {
    /// Unique identifier for the tier
    #[sea_orm(primary_key)]
    pub id: i64,
    /// Service this tier prices
    pub service_id: i64,
    /// Customer type: `"general"`, `"affiliate"` or `"student"`
    pub customer_type: String,
    /// Price per day for this customer type
    pub price: i64,
}

/// Defines relationships between `PriceTier` and other entities
#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    /// Each tier belongs to one service
    #[sea_orm(
        belongs_to = "super::service::Entity",
        from = "Column::ServiceId",
        to = "super::service::Column::Id",
        on_delete = "Cascade"
    )]
    Service,
}

impl Related<super::service::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Service.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

//! Cart entity - A pending service selection held for a visitor.
//!
//! Exactly one of `user_id` and `session_id` is set: rows belong either to an
//! authenticated user or to an anonymous session token.
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Cart database model
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "carts")]
pub struct Model {
    /// Unique identifier for the cart row
    #[sea_orm(primary_key)]
    pub id: i64,
    /// Owning user for authenticated visitors
    pub user_id: Option<i64>,
    /// Owning session token for anonymous visitors
    pub session_id: Option<String>,
    /// Selected service
    pub service_id: i64,
    /// Customer type the visitor will be priced as
    pub customer_type: String,
    /// First requested day (inclusive)
    pub start_date: Date,
    /// Last requested day (inclusive)
    pub end_date: Date,
    /// Requested day count
    pub qty: i64,
    /// When the row was added
    pub created_at: DateTimeUtc,
}

/// Defines relationships between Cart and other entities
#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    /// Each cart row references one service
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

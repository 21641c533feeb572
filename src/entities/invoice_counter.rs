//! Invoice counter entity - Last issued sequence number per invoice prefix.
//!
//! The prefix includes the issue date (e.g., `"INV-20240110"`), so sequences
//! restart every day.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Invoice counter database model
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "invoice_counters")]
pub struct Model {
    /// Unique identifier
    #[sea_orm(primary_key)]
    pub id: i32,
    /// Date-qualified invoice prefix
    #[sea_orm(unique)]
    pub prefix: String,
    /// Last sequence number handed out for this prefix
    pub last_value: i64,
    /// When the counter last advanced
    pub updated_at: DateTime,
}

/// `InvoiceCounter` has no relationships with other entities
#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}

//! `SeaORM` Entity for purchase_orders table.
//!
//! Keyed by the order's document id; status and number live on the document.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Eq, Serialize, Deserialize)]
#[sea_orm(table_name = "purchase_orders")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub document_id: Uuid,
    pub company_id: Uuid,
    pub vendor_id: Uuid,
    pub branch_id: Option<Uuid>,
    pub currency: String,
    pub exchange_rate: Decimal,
    pub order_date: Date,
    pub total: Decimal,
    /// Vendor invoice amount, set when the bill is booked.
    pub invoiced_amount: Option<Decimal>,
    pub created_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::documents::Entity",
        from = "Column::DocumentId",
        to = "super::documents::Column::Id"
    )]
    Documents,
    #[sea_orm(has_many = "super::purchase_order_lines::Entity")]
    Lines,
}

impl Related<super::documents::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Documents.def()
    }
}

impl Related<super::purchase_order_lines::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Lines.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

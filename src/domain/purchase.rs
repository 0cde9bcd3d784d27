// ==========================================
// 劳动时间经济核算系统 - 购买记录
// ==========================================

use crate::domain::types::PurposeOfPurchase;
use chrono::NaiveDateTime;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Purchase {
    pub id: Uuid,
    pub purchase_date: NaiveDateTime,
    pub plan: Uuid,
    pub buyer: Uuid,
    pub is_buyer_a_member: bool,
    pub price_per_unit: Decimal, // 购买时的合作价
    pub amount: i64,
    pub purpose: PurposeOfPurchase,
}

impl Purchase {
    pub fn price_total(&self) -> Decimal {
        self.price_per_unit * Decimal::from(self.amount)
    }
}

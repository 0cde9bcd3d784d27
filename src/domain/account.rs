// ==========================================
// 劳动时间经济核算系统 - 账户与交易领域模型
// ==========================================
// 红线: 余额 = Σ 收到金额 − Σ 发出金额，不单独存储
// ==========================================

use crate::domain::types::AccountType;
use chrono::NaiveDateTime;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

// ==========================================
// Account - 账户
// ==========================================
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Account {
    pub id: Uuid,
    pub account_type: AccountType,
}

// ==========================================
// Transaction - 交易
// ==========================================
// amount_sent 与 amount_received 仅在合作定价时不同：
// 买方按合作价付出，卖方按个体价收入
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Transaction {
    pub id: Uuid,
    pub date: NaiveDateTime,
    pub sending_account: Uuid,
    pub receiving_account: Uuid,
    pub amount_sent: Decimal,
    pub amount_received: Decimal,
    pub purpose: String,
    pub plan_id: Option<Uuid>, // 关联计划（销售/结算/预期销售）
}

// ==========================================
// PayoutFactor - 劳动证书发放系数
// ==========================================
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PayoutFactor {
    pub calculation_date: NaiveDateTime,
    pub value: Decimal,
}

/// 交易用途中引用计划的统一格式
pub fn plan_purpose(plan_id: &Uuid) -> String {
    format!("Plan-Id: {}", plan_id)
}

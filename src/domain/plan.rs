// ==========================================
// 劳动时间经济核算系统 - 生产计划领域模型
// ==========================================
// 生命周期: 草稿 → 批准 → 激活 → 到期 → (结算完成)
// ==========================================

use chrono::{Duration, NaiveDateTime};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

// ==========================================
// ProductionCosts - 生产成本
// ==========================================
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProductionCosts {
    pub labour_cost: Decimal,   // 劳动 (a)
    pub resource_cost: Decimal, // 流动生产资料 (r)
    pub means_cost: Decimal,    // 固定生产资料 (p)
}

impl ProductionCosts {
    pub fn new(labour_cost: Decimal, resource_cost: Decimal, means_cost: Decimal) -> Self {
        Self {
            labour_cost,
            resource_cost,
            means_cost,
        }
    }

    pub fn total_cost(&self) -> Decimal {
        self.labour_cost + self.resource_cost + self.means_cost
    }

    pub fn has_negative_component(&self) -> bool {
        self.labour_cost.is_sign_negative()
            || self.resource_cost.is_sign_negative()
            || self.means_cost.is_sign_negative()
    }
}

// ==========================================
// PlanDraft - 计划草稿
// ==========================================
// 未提交、可编辑
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlanDraft {
    pub id: Uuid,
    pub creation_date: NaiveDateTime,
    pub planner: Uuid,
    pub product_name: String,
    pub unit_of_distribution: String,
    pub amount_produced: i64,
    pub description: String,
    pub timeframe_days: i64,
    pub is_public_service: bool,
    pub costs: ProductionCosts,
}

// ==========================================
// Plan - 已提交的生产计划
// ==========================================
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Plan {
    // ===== 计划内容（来自草稿）=====
    pub id: Uuid,
    pub creation_date: NaiveDateTime,
    pub planner: Uuid,
    pub product_name: String,
    pub unit_of_distribution: String,
    pub amount_produced: i64,
    pub description: String,
    pub timeframe_days: i64,
    pub is_public_service: bool,
    pub costs: ProductionCosts,

    // ===== 审批与激活 =====
    pub approval_date: Option<NaiveDateTime>,
    pub approval_reason: Option<String>,
    pub activation_date: Option<NaiveDateTime>,
    pub is_active: bool,
    pub expired: bool,

    // ===== 结算进度 =====
    pub active_days: Option<i64>,
    pub payout_count: i64,

    // ===== 合作 =====
    pub requested_cooperation: Option<Uuid>,
    pub cooperation: Option<Uuid>,

    // ===== 展示标志 =====
    pub is_available: bool,
    pub hidden_by_user: bool,
}

impl Plan {
    pub fn is_approved(&self) -> bool {
        self.approval_date.is_some()
    }

    /// 到期时间 = 激活时间 + 周期天数；未激活时为 None
    pub fn expiration_date(&self) -> Option<NaiveDateTime> {
        self.activation_date
            .map(|activation| activation + Duration::days(self.timeframe_days))
    }

    /// activation ≤ t < expiration
    pub fn is_active_as_of(&self, t: NaiveDateTime) -> bool {
        match (self.activation_date, self.expiration_date()) {
            (Some(activation), Some(expiration)) => activation <= t && t < expiration,
            _ => false,
        }
    }

    /// t ≥ expiration
    pub fn is_expired_as_of(&self, t: NaiveDateTime) -> bool {
        self.expiration_date().map(|e| t >= e).unwrap_or(false)
    }

    /// 预期销售额：生产性计划为总成本，公共服务为 0
    pub fn expected_sales_value(&self) -> Decimal {
        if self.is_public_service {
            Decimal::ZERO
        } else {
            self.costs.total_cost()
        }
    }

    /// 每日劳动成本
    pub fn daily_labour_cost(&self) -> Decimal {
        per_day(self.costs.labour_cost, self.timeframe_days)
    }

    pub fn daily_resource_cost(&self) -> Decimal {
        per_day(self.costs.resource_cost, self.timeframe_days)
    }

    pub fn daily_means_cost(&self) -> Decimal {
        per_day(self.costs.means_cost, self.timeframe_days)
    }
}

fn per_day(cost: Decimal, timeframe_days: i64) -> Decimal {
    if timeframe_days <= 0 {
        return Decimal::ZERO;
    }
    cost / Decimal::from(timeframe_days)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn at(d: u32, h: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2021, 1, d)
            .unwrap()
            .and_hms_opt(h, 0, 0)
            .unwrap()
    }

    fn sample_plan(timeframe: i64, public: bool) -> Plan {
        Plan {
            id: Uuid::new_v4(),
            creation_date: at(1, 0),
            planner: Uuid::new_v4(),
            product_name: "面包".to_string(),
            unit_of_distribution: "500 克".to_string(),
            amount_produced: 10,
            description: "".to_string(),
            timeframe_days: timeframe,
            is_public_service: public,
            costs: ProductionCosts::new(Decimal::from(3), Decimal::from(2), Decimal::from(1)),
            approval_date: Some(at(1, 10)),
            approval_reason: Some("approved".to_string()),
            activation_date: Some(at(1, 10)),
            is_active: true,
            expired: false,
            active_days: None,
            payout_count: 0,
            requested_cooperation: None,
            cooperation: None,
            is_available: true,
            hidden_by_user: false,
        }
    }

    #[test]
    fn test_到期边界() {
        let plan = sample_plan(2, false);
        assert_eq!(plan.expiration_date(), Some(at(3, 10)));
        assert!(plan.is_active_as_of(at(1, 10)));
        assert!(plan.is_active_as_of(at(3, 9)));
        assert!(!plan.is_active_as_of(at(3, 10)));
        assert!(plan.is_expired_as_of(at(3, 10)));
        assert!(!plan.is_active_as_of(at(1, 9)));
    }

    #[test]
    fn test_预期销售额_公共服务为零() {
        assert_eq!(sample_plan(2, false).expected_sales_value(), Decimal::from(6));
        assert_eq!(sample_plan(2, true).expected_sales_value(), Decimal::ZERO);
    }

    #[test]
    fn test_未激活计划不活跃() {
        let mut plan = sample_plan(2, false);
        plan.activation_date = None;
        assert!(!plan.is_active_as_of(at(2, 0)));
        assert!(!plan.is_expired_as_of(at(9, 0)));
    }
}

// ==========================================
// 计划构建器 - 用于集成测试
// ==========================================
// 通过草稿 + 批准两个用例创建计划
// ==========================================

use rust_decimal::Decimal;
use uuid::Uuid;

use labour_ledger::domain::plan::Plan;
use labour_ledger::use_cases::{ApprovePlan, CreateDraftRequest, CreatePlanDraft};

use super::test_env::TestEnv;

pub struct PlanBuilder {
    planner: Uuid,
    product_name: String,
    amount: i64,
    timeframe_days: i64,
    labour: Decimal,
    resources: Decimal,
    means: Decimal,
    is_public_service: bool,
}

impl PlanBuilder {
    pub fn new(planner: Uuid) -> Self {
        Self {
            planner,
            product_name: "Produkt".to_string(),
            amount: 1,
            timeframe_days: 1,
            labour: Decimal::ONE,
            resources: Decimal::ONE,
            means: Decimal::ONE,
            is_public_service: false,
        }
    }

    pub fn product_name(mut self, name: &str) -> Self {
        self.product_name = name.to_string();
        self
    }

    pub fn amount(mut self, amount: i64) -> Self {
        self.amount = amount;
        self
    }

    pub fn timeframe(mut self, days: i64) -> Self {
        self.timeframe_days = days;
        self
    }

    /// (劳动, 流动资料, 固定资料)
    pub fn costs(mut self, labour: i64, resources: i64, means: i64) -> Self {
        self.labour = Decimal::from(labour);
        self.resources = Decimal::from(resources);
        self.means = Decimal::from(means);
        self
    }

    pub fn public_service(mut self) -> Self {
        self.is_public_service = true;
        self
    }

    pub fn draft_request(&self) -> CreateDraftRequest {
        CreateDraftRequest {
            planner: self.planner,
            product_name: self.product_name.clone(),
            unit_of_distribution: "Stück".to_string(),
            amount_produced: self.amount,
            description: format!("{} (Testplan)", self.product_name),
            timeframe_days: self.timeframe_days,
            is_public_service: self.is_public_service,
            labour_cost: self.labour,
            resource_cost: self.resources,
            means_cost: self.means,
        }
    }

    /// 创建草稿并批准
    pub fn build(self, env: &TestEnv) -> Plan {
        let draft = CreatePlanDraft::new(env.repos(), env.state.config.clone(), env.datetime())
            .execute(self.draft_request())
            .expect("创建草稿失败");
        let response = ApprovePlan::new(env.repos(), env.state.config.clone(), env.datetime())
            .execute(self.planner, draft)
            .expect("批准计划失败");
        env.plan(&response.plan_id)
    }
}

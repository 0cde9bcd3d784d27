// ==========================================
// 劳动时间经济核算系统 - 支付
// ==========================================
// 生产资料: 企业 p/r 账户 → 计划方 prd 账户
// 消费品:   成员账户 → 计划方 prd 账户
// 发出额按合作价，收到额按个体价；购买记录按合作价
// ==========================================

use crate::config::ConfigManager;
use crate::domain::account::{plan_purpose, Transaction};
use crate::domain::plan::Plan;
use crate::domain::purchase::Purchase;
use crate::domain::types::PurposeOfPurchase;
use crate::engine::datetime::DatetimeService;
use crate::engine::error::EngineError;
use crate::engine::price_calculator::PriceCalculator;
use crate::engine::repositories::LedgerRepositories;
use crate::repository::error::RepositoryError;
use crate::repository::account_repo::account_balance;
use crate::repository::purchase_repo::insert_purchase;
use crate::repository::transaction_repo::insert_transaction;
use crate::repository::plan_repo::PlanQuery;
use crate::repository::NewTransaction;
use chrono::NaiveDateTime;
use rust_decimal::Decimal;
use serde::Serialize;
use std::collections::HashMap;
use std::sync::Arc;
use thiserror::Error;
use tracing::{info, warn};
use uuid::Uuid;

#[derive(Error, Debug)]
pub enum PaymentError {
    #[error("计划不存在: {0}")]
    PlanNotFound(Uuid),

    #[error("计划未激活: {0}")]
    PlanInactive(Uuid),

    #[error("公共服务计划不能购买")]
    PlanIsPublicService,

    #[error("企业不能购买自己的产品")]
    BuyerIsPlanner,

    #[error("生产资料购买的用途无效: {0}")]
    InvalidPurpose(PurposeOfPurchase),

    #[error("购买方不是企业: {0}")]
    BuyerIsNotCompany(Uuid),

    #[error("购买方不是成员: {0}")]
    BuyerIsNotMember(Uuid),

    #[error("购买数量必须为正: {0}")]
    NonPositiveAmount(i64),

    #[error("余额不足: 余额 {balance}, 需支付 {required}")]
    InsufficientBalance { balance: Decimal, required: Decimal },

    #[error(transparent)]
    Engine(#[from] EngineError),

    #[error(transparent)]
    Repository(#[from] RepositoryError),
}

/// 计划存在、已激活、非公共服务
fn purchasable_plan(repos: &LedgerRepositories, plan_id: &Uuid) -> Result<Plan, PaymentError> {
    let plan = repos
        .plan_repo
        .get_plan(plan_id)?
        .ok_or(PaymentError::PlanNotFound(*plan_id))?;
    if !plan.is_active {
        return Err(PaymentError::PlanInactive(plan.id));
    }
    if plan.is_public_service {
        return Err(PaymentError::PlanIsPublicService);
    }
    Ok(plan)
}

/// 一次支付的价格
struct Pricing {
    cooperative_price: Decimal,
    amount_sent: Decimal,
    amount_received: Decimal,
}

impl Pricing {
    fn of(prices: &PriceCalculator, plan: &Plan, amount: i64) -> Result<Self, PaymentError> {
        let cooperative_price = prices.calculate_cooperative_price(plan)?;
        let individual_price = PriceCalculator::calculate_individual_price(plan)?;
        let n = Decimal::from(amount);
        Ok(Self {
            cooperative_price,
            amount_sent: n * cooperative_price,
            amount_received: n * individual_price,
        })
    }
}

// ==========================================
// PayMeansOfProduction
// ==========================================
pub struct PayMeansOfProduction {
    repos: LedgerRepositories,
    prices: PriceCalculator,
    datetime: Arc<dyn DatetimeService>,
}

impl PayMeansOfProduction {
    pub fn new(repos: LedgerRepositories, datetime: Arc<dyn DatetimeService>) -> Self {
        let prices = PriceCalculator::new(repos.plan_repo.clone(), datetime.clone());
        Self {
            repos,
            prices,
            datetime,
        }
    }

    /// 返回交易 id
    pub fn execute(
        &self,
        buyer: Uuid,
        plan_id: Uuid,
        amount: i64,
        purpose: PurposeOfPurchase,
    ) -> Result<Uuid, PaymentError> {
        let plan = purchasable_plan(&self.repos, &plan_id)?;
        if plan.planner == buyer {
            return Err(PaymentError::BuyerIsPlanner);
        }
        if !purpose.is_productive() {
            return Err(PaymentError::InvalidPurpose(purpose));
        }
        let buyer_company = self
            .repos
            .company_repo
            .find_by_id(&buyer)?
            .ok_or(PaymentError::BuyerIsNotCompany(buyer))?;
        if amount <= 0 {
            return Err(PaymentError::NonPositiveAmount(amount));
        }
        let planner = self
            .repos
            .company_repo
            .find_by_id(&plan.planner)?
            .ok_or(EngineError::PlannerNotFound(plan.id))?;

        let pricing = Pricing::of(&self.prices, &plan, amount)?;
        let sending_account = match purpose {
            PurposeOfPurchase::MeansOfProduction => buyer_company.means_account,
            _ => buyer_company.raw_material_account,
        };
        let now = self.datetime.now();

        let purpose_text = plan_purpose(&plan.id);
        let tx = self.repos.in_transaction(|conn| -> Result<Transaction, PaymentError> {
            insert_purchase(
                conn,
                &Purchase {
                    id: Uuid::new_v4(),
                    purchase_date: now,
                    plan: plan.id,
                    buyer,
                    is_buyer_a_member: false,
                    price_per_unit: pricing.cooperative_price,
                    amount,
                    purpose,
                },
            )?;
            let tx = insert_transaction(
                conn,
                NewTransaction {
                    date: now,
                    sending_account,
                    receiving_account: planner.product_account,
                    amount_sent: pricing.amount_sent,
                    amount_received: pricing.amount_received,
                    purpose: &purpose_text,
                    plan_id: Some(plan.id),
                },
            )?;
            Ok(tx)
        })?;
        info!(
            plan_id = %plan.id,
            buyer = %buyer,
            amount,
            sent = %pricing.amount_sent,
            "生产资料已支付"
        );
        Ok(tx.id)
    }
}

// ==========================================
// PayConsumerProduct
// ==========================================
pub struct PayConsumerProduct {
    repos: LedgerRepositories,
    prices: PriceCalculator,
    config: Arc<ConfigManager>,
    datetime: Arc<dyn DatetimeService>,
}

impl PayConsumerProduct {
    pub fn new(
        repos: LedgerRepositories,
        config: Arc<ConfigManager>,
        datetime: Arc<dyn DatetimeService>,
    ) -> Self {
        let prices = PriceCalculator::new(repos.plan_repo.clone(), datetime.clone());
        Self {
            repos,
            prices,
            config,
            datetime,
        }
    }

    /// 返回交易 id
    pub fn execute(&self, buyer: Uuid, plan_id: Uuid, amount: i64) -> Result<Uuid, PaymentError> {
        let plan = purchasable_plan(&self.repos, &plan_id)?;
        let member = self
            .repos
            .member_repo
            .find_by_id(&buyer)?
            .ok_or(PaymentError::BuyerIsNotMember(buyer))?;
        if amount <= 0 {
            return Err(PaymentError::NonPositiveAmount(amount));
        }
        let planner = self
            .repos
            .company_repo
            .find_by_id(&plan.planner)?
            .ok_or(EngineError::PlannerNotFound(plan.id))?;

        let pricing = Pricing::of(&self.prices, &plan, amount)?;
        let allow_negative = self.config.get_allow_negative_member_balance()?;
        let now = self.datetime.now();
        let purpose_text = plan_purpose(&plan.id);

        // 余额检查与扣款在同一事务内，同一成员的并发支付不会透支
        let tx = self.repos.in_transaction(|conn| -> Result<Transaction, PaymentError> {
            if !allow_negative {
                let balance = account_balance(conn, &member.account)?;
                if balance < pricing.amount_sent {
                    warn!(member_id = %member.id, balance = %balance, required = %pricing.amount_sent, "余额不足，拒绝支付");
                    return Err(PaymentError::InsufficientBalance {
                        balance,
                        required: pricing.amount_sent,
                    });
                }
            }
            insert_purchase(
                conn,
                &Purchase {
                    id: Uuid::new_v4(),
                    purchase_date: now,
                    plan: plan.id,
                    buyer,
                    is_buyer_a_member: true,
                    price_per_unit: pricing.cooperative_price,
                    amount,
                    purpose: PurposeOfPurchase::Consumption,
                },
            )?;
            let tx = insert_transaction(
                conn,
                NewTransaction {
                    date: now,
                    sending_account: member.account,
                    receiving_account: planner.product_account,
                    amount_sent: pricing.amount_sent,
                    amount_received: pricing.amount_received,
                    purpose: &purpose_text,
                    plan_id: Some(plan.id),
                },
            )?;
            Ok(tx)
        })?;
        info!(plan_id = %plan.id, member_id = %member.id, amount, "消费品已支付");
        Ok(tx.id)
    }
}

// ==========================================
// QueryPurchases
// ==========================================
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PurchaseInfo {
    pub purchase_date: NaiveDateTime,
    pub plan_id: Uuid,
    pub product_name: String,
    pub product_description: String,
    pub purpose: PurposeOfPurchase,
    pub price_per_unit: Decimal,
    pub amount: i64,
    pub price_total: Decimal,
}

pub struct QueryPurchases {
    repos: LedgerRepositories,
}

impl QueryPurchases {
    pub fn new(repos: LedgerRepositories) -> Self {
        Self { repos }
    }

    /// 新到旧
    pub fn execute(&self, user: Uuid) -> Result<Vec<PurchaseInfo>, PaymentError> {
        let purchases = self.repos.purchase_repo.find_by_buyer(&user)?;
        let mut plan_ids: Vec<Uuid> = purchases.iter().map(|p| p.plan).collect();
        plan_ids.sort();
        plan_ids.dedup();
        let plans: HashMap<Uuid, Plan> = self
            .repos
            .plan_repo
            .query_plans(&PlanQuery::new().with_ids(&plan_ids))?
            .into_iter()
            .map(|plan| (plan.id, plan))
            .collect();

        let mut infos = Vec::with_capacity(purchases.len());
        for purchase in purchases {
            let plan = plans
                .get(&purchase.plan)
                .ok_or(PaymentError::PlanNotFound(purchase.plan))?;
            infos.push(PurchaseInfo {
                price_total: purchase.price_total(),
                purchase_date: purchase.purchase_date,
                plan_id: plan.id,
                product_name: plan.product_name.clone(),
                product_description: plan.description.clone(),
                purpose: purchase.purpose,
                price_per_unit: purchase.price_per_unit,
                amount: purchase.amount,
            });
        }
        Ok(infos)
    }
}

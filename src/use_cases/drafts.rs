// ==========================================
// 劳动时间经济核算系统 - 计划草稿
// ==========================================
// 草稿可自由修改，批准后成为计划
// 校验: 成本非负、产量为正、周期在 1..=max_timeframe_days
// ==========================================

use crate::config::ConfigManager;
use crate::domain::plan::{PlanDraft, ProductionCosts};
use crate::engine::datetime::DatetimeService;
use crate::engine::repositories::LedgerRepositories;
use crate::repository::error::{RepositoryError, RepositoryResult};
use crate::repository::DraftUpdate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use thiserror::Error;
use tracing::info;
use uuid::Uuid;

#[derive(Error, Debug)]
pub enum DraftError {
    #[error("计划方不存在: {0}")]
    PlannerNotFound(Uuid),

    #[error("草稿不存在: {0}")]
    DraftNotFound(Uuid),

    #[error("只有计划方可以操作草稿")]
    NotPlanner,

    #[error("成本不能为负")]
    NegativeCosts,

    #[error("产量必须为正: {0}")]
    NonPositiveAmount(i64),

    #[error("计划周期必须在 1 到 {max} 天之间: {value}")]
    TimeframeOutOfRange { value: i64, max: i64 },

    #[error(transparent)]
    Repository(#[from] RepositoryError),
}

/// 新建草稿请求
#[derive(Debug, Clone, Deserialize)]
pub struct CreateDraftRequest {
    pub planner: Uuid,
    pub product_name: String,
    pub unit_of_distribution: String,
    pub amount_produced: i64,
    pub description: String,
    pub timeframe_days: i64,
    pub is_public_service: bool,
    pub labour_cost: Decimal,
    pub resource_cost: Decimal,
    pub means_cost: Decimal,
}

fn validate_draft(draft: &PlanDraft, max_timeframe_days: i64) -> Result<(), DraftError> {
    if draft.costs.has_negative_component() {
        return Err(DraftError::NegativeCosts);
    }
    if draft.amount_produced <= 0 {
        return Err(DraftError::NonPositiveAmount(draft.amount_produced));
    }
    if draft.timeframe_days < 1 || draft.timeframe_days > max_timeframe_days {
        return Err(DraftError::TimeframeOutOfRange {
            value: draft.timeframe_days,
            max: max_timeframe_days,
        });
    }
    Ok(())
}

/// 读取草稿并确认请求方是计划方
fn draft_of_planner(
    repos: &LedgerRepositories,
    draft_id: &Uuid,
    requester: &Uuid,
) -> Result<PlanDraft, DraftError> {
    let draft = repos
        .plan_draft_repo
        .get_draft(draft_id)?
        .ok_or(DraftError::DraftNotFound(*draft_id))?;
    if draft.planner != *requester {
        return Err(DraftError::NotPlanner);
    }
    Ok(draft)
}

// ==========================================
// CreatePlanDraft
// ==========================================
pub struct CreatePlanDraft {
    repos: LedgerRepositories,
    config: Arc<ConfigManager>,
    datetime: Arc<dyn DatetimeService>,
}

impl CreatePlanDraft {
    pub fn new(
        repos: LedgerRepositories,
        config: Arc<ConfigManager>,
        datetime: Arc<dyn DatetimeService>,
    ) -> Self {
        Self {
            repos,
            config,
            datetime,
        }
    }

    /// 返回草稿 id
    pub fn execute(&self, request: CreateDraftRequest) -> Result<Uuid, DraftError> {
        if self.repos.company_repo.find_by_id(&request.planner)?.is_none() {
            return Err(DraftError::PlannerNotFound(request.planner));
        }
        let draft = PlanDraft {
            id: Uuid::new_v4(),
            creation_date: self.datetime.now(),
            planner: request.planner,
            product_name: request.product_name,
            unit_of_distribution: request.unit_of_distribution,
            amount_produced: request.amount_produced,
            description: request.description,
            timeframe_days: request.timeframe_days,
            is_public_service: request.is_public_service,
            costs: ProductionCosts::new(request.labour_cost, request.resource_cost, request.means_cost),
        };
        validate_draft(&draft, self.config.get_max_timeframe_days()?)?;
        self.repos.plan_draft_repo.create_plan_draft(&draft)?;
        info!(draft_id = %draft.id, planner = %draft.planner, "计划草稿已创建");
        Ok(draft.id)
    }
}

// ==========================================
// UpdatePlanDraft
// ==========================================
pub struct UpdatePlanDraft {
    repos: LedgerRepositories,
    config: Arc<ConfigManager>,
}

impl UpdatePlanDraft {
    pub fn new(repos: LedgerRepositories, config: Arc<ConfigManager>) -> Self {
        Self { repos, config }
    }

    pub fn execute(
        &self,
        requester: Uuid,
        draft_id: Uuid,
        update: &DraftUpdate,
    ) -> Result<PlanDraft, DraftError> {
        let draft = draft_of_planner(&self.repos, &draft_id, &requester)?;
        if update.is_empty() {
            return Ok(draft);
        }
        let updated = update.apply_to(&draft);
        validate_draft(&updated, self.config.get_max_timeframe_days()?)?;
        self.repos.plan_draft_repo.save_draft(&updated)?;
        info!(draft_id = %draft_id, "计划草稿已更新");
        Ok(updated)
    }
}

// ==========================================
// DeletePlanDraft
// ==========================================
pub struct DeletePlanDraft {
    repos: LedgerRepositories,
}

impl DeletePlanDraft {
    pub fn new(repos: LedgerRepositories) -> Self {
        Self { repos }
    }

    /// 返回被删除草稿的产品名
    pub fn execute(&self, requester: Uuid, draft_id: Uuid) -> Result<String, DraftError> {
        let draft = draft_of_planner(&self.repos, &draft_id, &requester)?;
        self.repos.plan_draft_repo.delete_draft(&draft_id)?;
        info!(draft_id = %draft_id, "计划草稿已删除");
        Ok(draft.product_name)
    }
}

// ==========================================
// ListDraftsOfCompany / GetDraftDetails
// ==========================================
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DraftSummary {
    pub id: Uuid,
    pub creation_date: chrono::NaiveDateTime,
    pub product_name: String,
    pub description: String,
}

pub struct ListDraftsOfCompany {
    repos: LedgerRepositories,
}

impl ListDraftsOfCompany {
    pub fn new(repos: LedgerRepositories) -> Self {
        Self { repos }
    }

    pub fn execute(&self, company: Uuid) -> RepositoryResult<Vec<DraftSummary>> {
        Ok(self
            .repos
            .plan_draft_repo
            .find_by_planner(&company)?
            .into_iter()
            .map(|d| DraftSummary {
                id: d.id,
                creation_date: d.creation_date,
                product_name: d.product_name,
                description: d.description,
            })
            .collect())
    }
}

pub struct GetDraftDetails {
    repos: LedgerRepositories,
}

impl GetDraftDetails {
    pub fn new(repos: LedgerRepositories) -> Self {
        Self { repos }
    }

    pub fn execute(&self, draft_id: Uuid) -> RepositoryResult<Option<PlanDraft>> {
        self.repos.plan_draft_repo.get_draft(&draft_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn draft(amount: i64, timeframe: i64, labour: i64) -> PlanDraft {
        PlanDraft {
            id: Uuid::new_v4(),
            creation_date: NaiveDate::from_ymd_opt(2022, 3, 1)
                .unwrap()
                .and_hms_opt(9, 0, 0)
                .unwrap(),
            planner: Uuid::new_v4(),
            product_name: "Brot".to_string(),
            unit_of_distribution: "Laib".to_string(),
            amount_produced: amount,
            description: "".to_string(),
            timeframe_days: timeframe,
            is_public_service: false,
            costs: ProductionCosts::new(Decimal::from(labour), Decimal::ONE, Decimal::ONE),
        }
    }

    #[test]
    fn test_合法草稿通过校验() {
        assert!(validate_draft(&draft(10, 7, 5), 365).is_ok());
        assert!(validate_draft(&draft(1, 365, 0), 365).is_ok());
    }

    #[test]
    fn test_负成本被拒绝() {
        assert!(matches!(
            validate_draft(&draft(10, 7, -1), 365),
            Err(DraftError::NegativeCosts)
        ));
    }

    #[test]
    fn test_产量与周期校验() {
        assert!(matches!(
            validate_draft(&draft(0, 7, 1), 365),
            Err(DraftError::NonPositiveAmount(0))
        ));
        assert!(matches!(
            validate_draft(&draft(5, 0, 1), 365),
            Err(DraftError::TimeframeOutOfRange { value: 0, max: 365 })
        ));
        assert!(matches!(
            validate_draft(&draft(5, 366, 1), 365),
            Err(DraftError::TimeframeOutOfRange { value: 366, .. })
        ));
    }
}

// ==========================================
// 劳动时间经济核算系统 - 计划草稿仓储
// ==========================================
// 红线: Repository 不含业务逻辑
// ==========================================

use crate::domain::plan::{PlanDraft, ProductionCosts};
use crate::repository::error::{RepositoryError, RepositoryResult};
use crate::repository::row_utils::{fmt_datetime, get_datetime, get_decimal, get_uuid};
use rusqlite::{params, Connection, OptionalExtension, Row};
use rust_decimal::Decimal;
use std::sync::{Arc, Mutex, MutexGuard};
use uuid::Uuid;

const SELECT_COLUMNS: &str = "SELECT draft_id, creation_date, planner, product_name, \
     unit_of_distribution, amount_produced, description, timeframe_days, is_public_service, \
     labour_cost, resource_cost, means_cost FROM plan_draft";

/// 草稿的部分更新；None 表示保持原值
#[derive(Debug, Clone, Default)]
pub struct DraftUpdate {
    pub product_name: Option<String>,
    pub unit_of_distribution: Option<String>,
    pub amount_produced: Option<i64>,
    pub description: Option<String>,
    pub timeframe_days: Option<i64>,
    pub is_public_service: Option<bool>,
    pub labour_cost: Option<Decimal>,
    pub resource_cost: Option<Decimal>,
    pub means_cost: Option<Decimal>,
}

impl DraftUpdate {
    pub fn is_empty(&self) -> bool {
        self.product_name.is_none()
            && self.unit_of_distribution.is_none()
            && self.amount_produced.is_none()
            && self.description.is_none()
            && self.timeframe_days.is_none()
            && self.is_public_service.is_none()
            && self.labour_cost.is_none()
            && self.resource_cost.is_none()
            && self.means_cost.is_none()
    }

    /// 把更新应用到草稿副本上
    pub fn apply_to(&self, draft: &PlanDraft) -> PlanDraft {
        let mut updated = draft.clone();
        if let Some(v) = &self.product_name {
            updated.product_name = v.clone();
        }
        if let Some(v) = &self.unit_of_distribution {
            updated.unit_of_distribution = v.clone();
        }
        if let Some(v) = self.amount_produced {
            updated.amount_produced = v;
        }
        if let Some(v) = &self.description {
            updated.description = v.clone();
        }
        if let Some(v) = self.timeframe_days {
            updated.timeframe_days = v;
        }
        if let Some(v) = self.is_public_service {
            updated.is_public_service = v;
        }
        if let Some(v) = self.labour_cost {
            updated.costs.labour_cost = v;
        }
        if let Some(v) = self.resource_cost {
            updated.costs.resource_cost = v;
        }
        if let Some(v) = self.means_cost {
            updated.costs.means_cost = v;
        }
        updated
    }
}

pub struct PlanDraftRepository {
    conn: Arc<Mutex<Connection>>,
}

impl PlanDraftRepository {
    pub fn new(conn: Arc<Mutex<Connection>>) -> Self {
        Self { conn }
    }

    fn get_conn(&self) -> RepositoryResult<MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|e| RepositoryError::LockError(e.to_string()))
    }

    pub fn create_plan_draft(&self, draft: &PlanDraft) -> RepositoryResult<()> {
        let conn = self.get_conn()?;
        conn.execute(
            r#"INSERT INTO plan_draft (
                draft_id, creation_date, planner, product_name, unit_of_distribution,
                amount_produced, description, timeframe_days, is_public_service,
                labour_cost, resource_cost, means_cost
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12)"#,
            params![
                draft.id.to_string(),
                fmt_datetime(&draft.creation_date),
                draft.planner.to_string(),
                draft.product_name,
                draft.unit_of_distribution,
                draft.amount_produced,
                draft.description,
                draft.timeframe_days,
                draft.is_public_service,
                draft.costs.labour_cost.to_string(),
                draft.costs.resource_cost.to_string(),
                draft.costs.means_cost.to_string(),
            ],
        )?;
        Ok(())
    }

    pub fn get_draft(&self, draft_id: &Uuid) -> RepositoryResult<Option<PlanDraft>> {
        let conn = self.get_conn()?;
        let sql = format!("{} WHERE draft_id = ?1", SELECT_COLUMNS);
        let draft = conn
            .query_row(&sql, params![draft_id.to_string()], map_draft_row)
            .optional()?;
        Ok(draft)
    }

    /// 覆写草稿内容（计划方与创建时间不变）
    pub fn save_draft(&self, draft: &PlanDraft) -> RepositoryResult<()> {
        let conn = self.get_conn()?;
        let affected = conn.execute(
            r#"UPDATE plan_draft SET
                product_name = ?1, unit_of_distribution = ?2, amount_produced = ?3,
                description = ?4, timeframe_days = ?5, is_public_service = ?6,
                labour_cost = ?7, resource_cost = ?8, means_cost = ?9
            WHERE draft_id = ?10"#,
            params![
                draft.product_name,
                draft.unit_of_distribution,
                draft.amount_produced,
                draft.description,
                draft.timeframe_days,
                draft.is_public_service,
                draft.costs.labour_cost.to_string(),
                draft.costs.resource_cost.to_string(),
                draft.costs.means_cost.to_string(),
                draft.id.to_string(),
            ],
        )?;
        if affected == 0 {
            return Err(RepositoryError::not_found("PlanDraft", draft.id));
        }
        Ok(())
    }

    /// 删除草稿，返回是否删除了记录
    pub fn delete_draft(&self, draft_id: &Uuid) -> RepositoryResult<bool> {
        let conn = self.get_conn()?;
        remove_draft(&conn, draft_id)
    }

    /// 某企业的草稿，新到旧
    pub fn find_by_planner(&self, planner: &Uuid) -> RepositoryResult<Vec<PlanDraft>> {
        let conn = self.get_conn()?;
        let sql = format!(
            "{} WHERE planner = ?1 ORDER BY creation_date DESC, rowid DESC",
            SELECT_COLUMNS
        );
        let mut stmt = conn.prepare(&sql)?;
        let drafts = stmt
            .query_map(params![planner.to_string()], map_draft_row)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(drafts)
    }
}

pub(crate) fn remove_draft(conn: &Connection, draft_id: &Uuid) -> RepositoryResult<bool> {
    let affected = conn.execute(
        "DELETE FROM plan_draft WHERE draft_id = ?1",
        params![draft_id.to_string()],
    )?;
    Ok(affected > 0)
}

fn map_draft_row(row: &Row<'_>) -> rusqlite::Result<PlanDraft> {
    Ok(PlanDraft {
        id: get_uuid(row, 0)?,
        creation_date: get_datetime(row, 1)?,
        planner: get_uuid(row, 2)?,
        product_name: row.get(3)?,
        unit_of_distribution: row.get(4)?,
        amount_produced: row.get(5)?,
        description: row.get(6)?,
        timeframe_days: row.get(7)?,
        is_public_service: row.get(8)?,
        costs: ProductionCosts::new(
            get_decimal(row, 9)?,
            get_decimal(row, 10)?,
            get_decimal(row, 11)?,
        ),
    })
}

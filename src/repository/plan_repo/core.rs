use crate::domain::plan::{Plan, PlanDraft, ProductionCosts};
use crate::repository::error::{RepositoryError, RepositoryResult};
use crate::repository::row_utils::{
    fmt_datetime, get_datetime, get_decimal, get_opt_datetime, get_opt_uuid, get_uuid,
};
use chrono::NaiveDateTime;
use rusqlite::{params, Connection, OptionalExtension, Row};
use std::sync::{Arc, Mutex, MutexGuard};
use uuid::Uuid;

pub(super) const PLAN_COLUMNS: &str = "p.plan_id, p.creation_date, p.planner, p.product_name, \
     p.unit_of_distribution, p.amount_produced, p.description, p.timeframe_days, p.is_public_service, \
     p.labour_cost, p.resource_cost, p.means_cost, p.approval_date, p.approval_reason, \
     p.activation_date, p.is_active, p.expired, p.active_days, p.payout_count, \
     p.requested_cooperation, p.cooperation, p.is_available, p.hidden_by_user";

// ==========================================
// PlanRepository - 生产计划仓储
// ==========================================
pub struct PlanRepository {
    conn: Arc<Mutex<Connection>>,
}

impl PlanRepository {
    pub fn new(conn: Arc<Mutex<Connection>>) -> Self {
        Self { conn }
    }

    pub(super) fn get_conn(&self) -> RepositoryResult<MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|e| RepositoryError::LockError(e.to_string()))
    }

    /// 由草稿生成计划（沿用草稿 id），尚未批准、未激活
    pub fn create_plan_from_draft(&self, draft: &PlanDraft) -> RepositoryResult<Plan> {
        let conn = self.get_conn()?;
        insert_plan_from_draft(&conn, draft)
    }

    pub fn get_plan(&self, plan_id: &Uuid) -> RepositoryResult<Option<Plan>> {
        let conn = self.get_conn()?;
        let sql = format!("SELECT {} FROM plan p WHERE p.plan_id = ?1", PLAN_COLUMNS);
        let plan = conn
            .query_row(&sql, params![plan_id.to_string()], map_plan_row)
            .optional()?;
        Ok(plan)
    }

    pub fn activate_plan(&self, plan_id: &Uuid, activation_date: NaiveDateTime) -> RepositoryResult<()> {
        let conn = self.get_conn()?;
        write_activation(&conn, plan_id, activation_date)
    }

    pub fn hide_plan(&self, plan_id: &Uuid) -> RepositoryResult<()> {
        self.update_one(
            "UPDATE plan SET hidden_by_user = 1 WHERE plan_id = ?1",
            params![plan_id.to_string()],
            plan_id,
        )
    }

    /// 切换产品可购买状态，返回切换后的值
    pub fn toggle_product_availability(&self, plan_id: &Uuid) -> RepositoryResult<bool> {
        let conn = self.get_conn()?;
        let affected = conn.execute(
            "UPDATE plan SET is_available = 1 - is_available WHERE plan_id = ?1",
            params![plan_id.to_string()],
        )?;
        if affected == 0 {
            return Err(RepositoryError::not_found("Plan", plan_id));
        }
        let available: bool = conn.query_row(
            "SELECT is_available FROM plan WHERE plan_id = ?1",
            params![plan_id.to_string()],
            |row| row.get(0),
        )?;
        Ok(available)
    }

    pub fn set_cooperation(&self, plan_id: &Uuid, cooperation: Option<Uuid>) -> RepositoryResult<()> {
        self.update_one(
            "UPDATE plan SET cooperation = ?1 WHERE plan_id = ?2",
            params![cooperation.map(|c| c.to_string()), plan_id.to_string()],
            plan_id,
        )
    }

    pub fn set_requested_cooperation(
        &self,
        plan_id: &Uuid,
        cooperation: Option<Uuid>,
    ) -> RepositoryResult<()> {
        self.update_one(
            "UPDATE plan SET requested_cooperation = ?1 WHERE plan_id = ?2",
            params![cooperation.map(|c| c.to_string()), plan_id.to_string()],
            plan_id,
        )
    }

    /// 加入合作并清除申请（单条语句）
    pub fn join_cooperation(&self, plan_id: &Uuid, cooperation: &Uuid) -> RepositoryResult<()> {
        self.update_one(
            "UPDATE plan SET cooperation = ?1, requested_cooperation = NULL WHERE plan_id = ?2",
            params![cooperation.to_string(), plan_id.to_string()],
            plan_id,
        )
    }

    /// 同一合作中的全部计划；无合作的计划只与自身合作
    pub fn cooperating_plans(&self, plan_id: &Uuid) -> RepositoryResult<Vec<Plan>> {
        let plan = self
            .get_plan(plan_id)?
            .ok_or_else(|| RepositoryError::not_found("Plan", plan_id))?;
        match plan.cooperation {
            Some(cooperation) => self.query_plans(
                &super::PlanQuery::new().that_are_part_of_cooperation(cooperation),
            ),
            None => Ok(vec![plan]),
        }
    }

    fn update_one(&self, sql: &str, params: impl rusqlite::Params, plan_id: &Uuid) -> RepositoryResult<()> {
        let conn = self.get_conn()?;
        update_plan(&conn, sql, params, plan_id)
    }
}

// ==========================================
// 事务内写入（由 LedgerRepositories::in_transaction 调用）
// ==========================================

fn update_plan(
    conn: &Connection,
    sql: &str,
    params: impl rusqlite::Params,
    plan_id: &Uuid,
) -> RepositoryResult<()> {
    let affected = conn.execute(sql, params)?;
    if affected == 0 {
        return Err(RepositoryError::not_found("Plan", plan_id));
    }
    Ok(())
}

pub(crate) fn insert_plan_from_draft(conn: &Connection, draft: &PlanDraft) -> RepositoryResult<Plan> {
    conn.execute(
        r#"INSERT INTO plan (
            plan_id, creation_date, planner, product_name, unit_of_distribution,
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

    Ok(Plan {
        id: draft.id,
        creation_date: draft.creation_date,
        planner: draft.planner,
        product_name: draft.product_name.clone(),
        unit_of_distribution: draft.unit_of_distribution.clone(),
        amount_produced: draft.amount_produced,
        description: draft.description.clone(),
        timeframe_days: draft.timeframe_days,
        is_public_service: draft.is_public_service,
        costs: draft.costs,
        approval_date: None,
        approval_reason: None,
        activation_date: None,
        is_active: false,
        expired: false,
        active_days: None,
        payout_count: 0,
        requested_cooperation: None,
        cooperation: None,
        is_available: true,
        hidden_by_user: false,
    })
}

pub(crate) fn write_approval(
    conn: &Connection,
    plan_id: &Uuid,
    approval_date: NaiveDateTime,
    reason: &str,
) -> RepositoryResult<()> {
    update_plan(
        conn,
        "UPDATE plan SET approval_date = ?1, approval_reason = ?2 WHERE plan_id = ?3",
        params![fmt_datetime(&approval_date), reason, plan_id.to_string()],
        plan_id,
    )
}

pub(crate) fn write_activation(
    conn: &Connection,
    plan_id: &Uuid,
    activation_date: NaiveDateTime,
) -> RepositoryResult<()> {
    update_plan(
        conn,
        "UPDATE plan SET is_active = 1, activation_date = ?1 WHERE plan_id = ?2",
        params![fmt_datetime(&activation_date), plan_id.to_string()],
        plan_id,
    )
}

pub(crate) fn write_active_days(conn: &Connection, plan_id: &Uuid, active_days: i64) -> RepositoryResult<()> {
    update_plan(
        conn,
        "UPDATE plan SET active_days = ?1 WHERE plan_id = ?2",
        params![active_days, plan_id.to_string()],
        plan_id,
    )
}

pub(crate) fn read_payout_count(conn: &Connection, plan_id: &Uuid) -> RepositoryResult<i64> {
    let count = conn
        .query_row(
            "SELECT payout_count FROM plan WHERE plan_id = ?1",
            params![plan_id.to_string()],
            |row| row.get(0),
        )
        .optional()?;
    count.ok_or_else(|| RepositoryError::not_found("Plan", plan_id))
}

/// 以 payout_count 为条件占用下一次发放；已被其他结算占用时返回 false
pub(crate) fn claim_payout(conn: &Connection, plan_id: &Uuid, expected_count: i64) -> RepositoryResult<bool> {
    let affected = conn.execute(
        "UPDATE plan SET payout_count = payout_count + 1 WHERE plan_id = ?1 AND payout_count = ?2",
        params![plan_id.to_string(), expected_count],
    )?;
    Ok(affected > 0)
}

/// 标记到期并退出合作；已到期时返回 false
pub(crate) fn mark_expired(conn: &Connection, plan_id: &Uuid) -> RepositoryResult<bool> {
    let affected = conn.execute(
        r#"UPDATE plan
           SET expired = 1, is_active = 0, cooperation = NULL, requested_cooperation = NULL
           WHERE plan_id = ?1 AND expired = 0"#,
        params![plan_id.to_string()],
    )?;
    Ok(affected > 0)
}

pub(super) fn map_plan_row(row: &Row<'_>) -> rusqlite::Result<Plan> {
    Ok(Plan {
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
        approval_date: get_opt_datetime(row, 12)?,
        approval_reason: row.get(13)?,
        activation_date: get_opt_datetime(row, 14)?,
        is_active: row.get(15)?,
        expired: row.get(16)?,
        active_days: row.get(17)?,
        payout_count: row.get(18)?,
        requested_cooperation: get_opt_uuid(row, 19)?,
        cooperation: get_opt_uuid(row, 20)?,
        is_available: row.get(21)?,
        hidden_by_user: row.get(22)?,
    })
}

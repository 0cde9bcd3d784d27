// ==========================================
// 劳动时间经济核算系统 - 合作仓储
// ==========================================
// 包含: 合作、协调者任期、协调权转移请求
// 当前协调者 = 最近一次任期（start_date 最大，同时间取后插入者）
// ==========================================

use crate::domain::cooperation::{Cooperation, CoordinationTenure, CoordinationTransferRequest};
use crate::domain::user::Company;
use crate::repository::company_repo::map_company_row;
use crate::repository::error::{RepositoryError, RepositoryResult};
use crate::repository::row_utils::{fmt_datetime, get_datetime, get_uuid};
use chrono::NaiveDateTime;
use rusqlite::{params, Connection, OptionalExtension, Row};
use std::sync::{Arc, Mutex, MutexGuard};
use uuid::Uuid;

pub struct CooperationRepository {
    conn: Arc<Mutex<Connection>>,
}

impl CooperationRepository {
    pub fn new(conn: Arc<Mutex<Connection>>) -> Self {
        Self { conn }
    }

    fn get_conn(&self) -> RepositoryResult<MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|e| RepositoryError::LockError(e.to_string()))
    }

    // ===== 合作 =====

    pub fn get_cooperation(&self, cooperation_id: &Uuid) -> RepositoryResult<Option<Cooperation>> {
        let conn = self.get_conn()?;
        let cooperation = conn
            .query_row(
                "SELECT cooperation_id, creation_date, name, definition FROM cooperation WHERE cooperation_id = ?1",
                params![cooperation_id.to_string()],
                map_cooperation_row,
            )
            .optional()?;
        Ok(cooperation)
    }

    /// 按名称查找（不区分大小写）
    pub fn find_by_name(&self, name: &str) -> RepositoryResult<Option<Cooperation>> {
        let conn = self.get_conn()?;
        let cooperation = conn
            .query_row(
                "SELECT cooperation_id, creation_date, name, definition FROM cooperation
                 WHERE LOWER(name) = LOWER(?1) LIMIT 1",
                params![name],
                map_cooperation_row,
            )
            .optional()?;
        Ok(cooperation)
    }

    pub fn count_cooperations(&self) -> RepositoryResult<i64> {
        let conn = self.get_conn()?;
        let count = conn.query_row("SELECT COUNT(*) FROM cooperation", [], |row| row.get(0))?;
        Ok(count)
    }

    // ===== 协调者任期 =====

    pub fn get_tenure(&self, tenure_id: &Uuid) -> RepositoryResult<Option<CoordinationTenure>> {
        let conn = self.get_conn()?;
        let tenure = conn
            .query_row(
                "SELECT tenure_id, company_id, cooperation_id, start_date FROM coordination_tenure WHERE tenure_id = ?1",
                params![tenure_id.to_string()],
                map_tenure_row,
            )
            .optional()?;
        Ok(tenure)
    }

    pub fn current_tenure(&self, cooperation_id: &Uuid) -> RepositoryResult<Option<CoordinationTenure>> {
        let conn = self.get_conn()?;
        let tenure = conn
            .query_row(
                "SELECT tenure_id, company_id, cooperation_id, start_date FROM coordination_tenure
                 WHERE cooperation_id = ?1
                 ORDER BY start_date DESC, rowid DESC
                 LIMIT 1",
                params![cooperation_id.to_string()],
                map_tenure_row,
            )
            .optional()?;
        Ok(tenure)
    }

    /// 当前协调者企业
    pub fn current_coordinator(&self, cooperation_id: &Uuid) -> RepositoryResult<Option<Company>> {
        let conn = self.get_conn()?;
        let company = conn
            .query_row(
                "SELECT c.company_id, c.name, c.email, c.means_account, c.raw_material_account,
                        c.work_account, c.product_account, c.registered_on, c.confirmed_on
                 FROM coordination_tenure t
                 JOIN company c ON c.company_id = t.company_id
                 WHERE t.cooperation_id = ?1
                 ORDER BY t.start_date DESC, t.rowid DESC
                 LIMIT 1",
                params![cooperation_id.to_string()],
                map_company_row,
            )
            .optional()?;
        Ok(company)
    }

    /// 企业当前协调的全部合作
    pub fn cooperations_coordinated_by(&self, company: &Uuid) -> RepositoryResult<Vec<Cooperation>> {
        let conn = self.get_conn()?;
        let mut stmt = conn.prepare(
            "SELECT co.cooperation_id, co.creation_date, co.name, co.definition
             FROM cooperation co
             JOIN coordination_tenure t ON t.cooperation_id = co.cooperation_id
             WHERE t.company_id = ?1
               AND t.tenure_id = (
                 SELECT t2.tenure_id FROM coordination_tenure t2
                 WHERE t2.cooperation_id = co.cooperation_id
                 ORDER BY t2.start_date DESC, t2.rowid DESC
                 LIMIT 1
               )
             ORDER BY co.creation_date ASC",
        )?;
        let cooperations = stmt
            .query_map(params![company.to_string()], map_cooperation_row)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(cooperations)
    }

    // ===== 协调权转移请求 =====

    pub fn create_transfer_request(
        &self,
        requesting_tenure: &Uuid,
        candidate: &Uuid,
        request_date: NaiveDateTime,
    ) -> RepositoryResult<CoordinationTransferRequest> {
        let conn = self.get_conn()?;
        let request = CoordinationTransferRequest {
            id: Uuid::new_v4(),
            requesting_tenure: *requesting_tenure,
            candidate: *candidate,
            request_date,
            is_closed: false,
        };
        conn.execute(
            "INSERT INTO coordination_transfer_request (request_id, requesting_tenure, candidate, request_date, is_closed)
             VALUES (?1, ?2, ?3, ?4, 0)",
            params![
                request.id.to_string(),
                request.requesting_tenure.to_string(),
                request.candidate.to_string(),
                fmt_datetime(&request.request_date)
            ],
        )?;
        Ok(request)
    }

    pub fn get_transfer_request(
        &self,
        request_id: &Uuid,
    ) -> RepositoryResult<Option<CoordinationTransferRequest>> {
        let conn = self.get_conn()?;
        let request = conn
            .query_row(
                "SELECT request_id, requesting_tenure, candidate, request_date, is_closed
                 FROM coordination_transfer_request WHERE request_id = ?1",
                params![request_id.to_string()],
                map_transfer_request_row,
            )
            .optional()?;
        Ok(request)
    }

    /// 合作是否存在未关闭的转移请求
    pub fn has_pending_transfer_request(&self, cooperation_id: &Uuid) -> RepositoryResult<bool> {
        let conn = self.get_conn()?;
        let found = conn
            .query_row(
                "SELECT 1 FROM coordination_transfer_request r
                 JOIN coordination_tenure t ON t.tenure_id = r.requesting_tenure
                 WHERE t.cooperation_id = ?1 AND r.is_closed = 0
                 LIMIT 1",
                params![cooperation_id.to_string()],
                |_| Ok(true),
            )
            .optional()?
            .unwrap_or(false);
        Ok(found)
    }
}

pub(crate) fn insert_cooperation(
    conn: &Connection,
    creation_date: NaiveDateTime,
    name: &str,
    definition: &str,
) -> RepositoryResult<Cooperation> {
    let cooperation = Cooperation {
        id: Uuid::new_v4(),
        creation_date,
        name: name.to_string(),
        definition: definition.to_string(),
    };
    conn.execute(
        "INSERT INTO cooperation (cooperation_id, creation_date, name, definition) VALUES (?1, ?2, ?3, ?4)",
        params![
            cooperation.id.to_string(),
            fmt_datetime(&cooperation.creation_date),
            cooperation.name,
            cooperation.definition
        ],
    )?;
    Ok(cooperation)
}

pub(crate) fn insert_coordination_tenure(
    conn: &Connection,
    company: &Uuid,
    cooperation: &Uuid,
    start_date: NaiveDateTime,
) -> RepositoryResult<CoordinationTenure> {
    let tenure = CoordinationTenure {
        id: Uuid::new_v4(),
        company: *company,
        cooperation: *cooperation,
        start_date,
    };
    conn.execute(
        "INSERT INTO coordination_tenure (tenure_id, company_id, cooperation_id, start_date) VALUES (?1, ?2, ?3, ?4)",
        params![
            tenure.id.to_string(),
            tenure.company.to_string(),
            tenure.cooperation.to_string(),
            fmt_datetime(&tenure.start_date)
        ],
    )?;
    Ok(tenure)
}

/// 关闭尚未关闭的转移请求；已关闭时返回 false
pub(crate) fn close_transfer_request(conn: &Connection, request_id: &Uuid) -> RepositoryResult<bool> {
    let affected = conn.execute(
        "UPDATE coordination_transfer_request SET is_closed = 1 WHERE request_id = ?1 AND is_closed = 0",
        params![request_id.to_string()],
    )?;
    Ok(affected > 0)
}

fn map_cooperation_row(row: &Row<'_>) -> rusqlite::Result<Cooperation> {
    Ok(Cooperation {
        id: get_uuid(row, 0)?,
        creation_date: get_datetime(row, 1)?,
        name: row.get(2)?,
        definition: row.get(3)?,
    })
}

fn map_tenure_row(row: &Row<'_>) -> rusqlite::Result<CoordinationTenure> {
    Ok(CoordinationTenure {
        id: get_uuid(row, 0)?,
        company: get_uuid(row, 1)?,
        cooperation: get_uuid(row, 2)?,
        start_date: get_datetime(row, 3)?,
    })
}

fn map_transfer_request_row(row: &Row<'_>) -> rusqlite::Result<CoordinationTransferRequest> {
    Ok(CoordinationTransferRequest {
        id: get_uuid(row, 0)?,
        requesting_tenure: get_uuid(row, 1)?,
        candidate: get_uuid(row, 2)?,
        request_date: get_datetime(row, 3)?,
        is_closed: row.get(4)?,
    })
}

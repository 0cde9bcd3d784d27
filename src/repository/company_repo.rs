// ==========================================
// 劳动时间经济核算系统 - 企业仓储
// ==========================================
// 包含: 企业主数据、员工关系、入职邀请
// 红线: Repository 不含业务逻辑
// ==========================================

use crate::domain::user::{Company, CompanyWorkInvite};
use crate::repository::error::{RepositoryError, RepositoryResult};
use crate::repository::row_utils::{fmt_datetime, get_datetime, get_opt_datetime, get_uuid};
use chrono::NaiveDateTime;
use rusqlite::{params, Connection, OptionalExtension, Row};
use std::sync::{Arc, Mutex, MutexGuard};
use uuid::Uuid;

const SELECT_COLUMNS: &str = "SELECT company_id, name, email, means_account, raw_material_account, \
     work_account, product_account, registered_on, confirmed_on FROM company";

pub struct CompanyRepository {
    conn: Arc<Mutex<Connection>>,
}

impl CompanyRepository {
    pub fn new(conn: Arc<Mutex<Connection>>) -> Self {
        Self { conn }
    }

    fn get_conn(&self) -> RepositoryResult<MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|e| RepositoryError::LockError(e.to_string()))
    }

    pub fn create_company(&self, company: &Company) -> RepositoryResult<()> {
        let conn = self.get_conn()?;
        insert_company(&conn, company)
    }

    pub fn find_by_id(&self, company_id: &Uuid) -> RepositoryResult<Option<Company>> {
        let conn = self.get_conn()?;
        let sql = format!("{} WHERE company_id = ?1", SELECT_COLUMNS);
        let company = conn
            .query_row(&sql, params![company_id.to_string()], map_company_row)
            .optional()?;
        Ok(company)
    }

    pub fn find_by_email(&self, email: &str) -> RepositoryResult<Option<Company>> {
        let conn = self.get_conn()?;
        let sql = format!("{} WHERE email = ?1", SELECT_COLUMNS);
        let company = conn.query_row(&sql, params![email], map_company_row).optional()?;
        Ok(company)
    }

    pub fn confirm_company(&self, company_id: &Uuid, confirmed_on: NaiveDateTime) -> RepositoryResult<()> {
        let conn = self.get_conn()?;
        let affected = conn.execute(
            "UPDATE company SET confirmed_on = ?1 WHERE company_id = ?2",
            params![fmt_datetime(&confirmed_on), company_id.to_string()],
        )?;
        if affected == 0 {
            return Err(RepositoryError::not_found("Company", company_id));
        }
        Ok(())
    }

    pub fn count_registered_companies(&self) -> RepositoryResult<i64> {
        let conn = self.get_conn()?;
        let count = conn.query_row("SELECT COUNT(*) FROM company", [], |row| row.get(0))?;
        Ok(count)
    }

    // ===== 员工关系 =====

    pub fn is_worker(&self, company_id: &Uuid, member_id: &Uuid) -> RepositoryResult<bool> {
        let conn = self.get_conn()?;
        let found = conn
            .query_row(
                "SELECT 1 FROM company_worker WHERE company_id = ?1 AND member_id = ?2",
                params![company_id.to_string(), member_id.to_string()],
                |_| Ok(true),
            )
            .optional()?
            .unwrap_or(false);
        Ok(found)
    }

    // ===== 入职邀请 =====

    pub fn create_work_invite(&self, company_id: &Uuid, member_id: &Uuid) -> RepositoryResult<CompanyWorkInvite> {
        let conn = self.get_conn()?;
        let invite = CompanyWorkInvite {
            id: Uuid::new_v4(),
            company: *company_id,
            member: *member_id,
        };
        conn.execute(
            "INSERT INTO company_work_invite (invite_id, company_id, member_id) VALUES (?1, ?2, ?3)",
            params![
                invite.id.to_string(),
                invite.company.to_string(),
                invite.member.to_string()
            ],
        )?;
        Ok(invite)
    }

    pub fn find_work_invite(&self, invite_id: &Uuid) -> RepositoryResult<Option<CompanyWorkInvite>> {
        let conn = self.get_conn()?;
        let invite = conn
            .query_row(
                "SELECT invite_id, company_id, member_id FROM company_work_invite WHERE invite_id = ?1",
                params![invite_id.to_string()],
                map_invite_row,
            )
            .optional()?;
        Ok(invite)
    }

    pub fn is_invited(&self, company_id: &Uuid, member_id: &Uuid) -> RepositoryResult<bool> {
        let conn = self.get_conn()?;
        let found = conn
            .query_row(
                "SELECT 1 FROM company_work_invite WHERE company_id = ?1 AND member_id = ?2",
                params![company_id.to_string(), member_id.to_string()],
                |_| Ok(true),
            )
            .optional()?
            .unwrap_or(false);
        Ok(found)
    }

    pub fn find_invites_for_member(&self, member_id: &Uuid) -> RepositoryResult<Vec<CompanyWorkInvite>> {
        let conn = self.get_conn()?;
        let mut stmt = conn.prepare(
            "SELECT invite_id, company_id, member_id FROM company_work_invite WHERE member_id = ?1 ORDER BY rowid",
        )?;
        let invites = stmt
            .query_map(params![member_id.to_string()], map_invite_row)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(invites)
    }
}

pub(crate) fn insert_worker(conn: &Connection, company_id: &Uuid, member_id: &Uuid) -> RepositoryResult<()> {
    conn.execute(
        "INSERT OR IGNORE INTO company_worker (company_id, member_id) VALUES (?1, ?2)",
        params![company_id.to_string(), member_id.to_string()],
    )?;
    Ok(())
}

pub(crate) fn remove_work_invite(conn: &Connection, invite_id: &Uuid) -> RepositoryResult<()> {
    conn.execute(
        "DELETE FROM company_work_invite WHERE invite_id = ?1",
        params![invite_id.to_string()],
    )?;
    Ok(())
}

pub(crate) fn insert_company(conn: &Connection, company: &Company) -> RepositoryResult<()> {
    conn.execute(
        r#"INSERT INTO company (
            company_id, name, email,
            means_account, raw_material_account, work_account, product_account,
            registered_on, confirmed_on
        ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)"#,
        params![
            company.id.to_string(),
            company.name,
            company.email,
            company.means_account.to_string(),
            company.raw_material_account.to_string(),
            company.work_account.to_string(),
            company.product_account.to_string(),
            fmt_datetime(&company.registered_on),
            company.confirmed_on.as_ref().map(fmt_datetime),
        ],
    )?;
    Ok(())
}

pub(crate) fn map_company_row(row: &Row<'_>) -> rusqlite::Result<Company> {
    Ok(Company {
        id: get_uuid(row, 0)?,
        name: row.get(1)?,
        email: row.get(2)?,
        means_account: get_uuid(row, 3)?,
        raw_material_account: get_uuid(row, 4)?,
        work_account: get_uuid(row, 5)?,
        product_account: get_uuid(row, 6)?,
        registered_on: get_datetime(row, 7)?,
        confirmed_on: get_opt_datetime(row, 8)?,
    })
}

fn map_invite_row(row: &Row<'_>) -> rusqlite::Result<CompanyWorkInvite> {
    Ok(CompanyWorkInvite {
        id: get_uuid(row, 0)?,
        company: get_uuid(row, 1)?,
        member: get_uuid(row, 2)?,
    })
}

// ==========================================
// 劳动时间经济核算系统 - 成员仓储
// ==========================================
// 红线: Repository 不含业务逻辑
// ==========================================

use crate::domain::user::Member;
use crate::repository::error::{RepositoryError, RepositoryResult};
use crate::repository::row_utils::{fmt_datetime, get_datetime, get_opt_datetime, get_uuid};
use chrono::NaiveDateTime;
use rusqlite::{params, Connection, OptionalExtension, Row};
use std::sync::{Arc, Mutex, MutexGuard};
use uuid::Uuid;

const SELECT_COLUMNS: &str =
    "SELECT member_id, name, email, account_id, registered_on, confirmed_on FROM member";

pub struct MemberRepository {
    conn: Arc<Mutex<Connection>>,
}

impl MemberRepository {
    pub fn new(conn: Arc<Mutex<Connection>>) -> Self {
        Self { conn }
    }

    fn get_conn(&self) -> RepositoryResult<MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|e| RepositoryError::LockError(e.to_string()))
    }

    pub fn find_by_id(&self, member_id: &Uuid) -> RepositoryResult<Option<Member>> {
        self.find_one("member_id = ?1", &member_id.to_string())
    }

    pub fn find_by_email(&self, email: &str) -> RepositoryResult<Option<Member>> {
        self.find_one("email = ?1", email)
    }

    fn find_one(&self, condition: &str, value: &str) -> RepositoryResult<Option<Member>> {
        let conn = self.get_conn()?;
        let sql = format!("{} WHERE {}", SELECT_COLUMNS, condition);
        let member = conn.query_row(&sql, params![value], map_member_row).optional()?;
        Ok(member)
    }

    /// 确认注册
    pub fn confirm_member(&self, member_id: &Uuid, confirmed_on: NaiveDateTime) -> RepositoryResult<()> {
        let conn = self.get_conn()?;
        let affected = conn.execute(
            "UPDATE member SET confirmed_on = ?1 WHERE member_id = ?2",
            params![fmt_datetime(&confirmed_on), member_id.to_string()],
        )?;
        if affected == 0 {
            return Err(RepositoryError::not_found("Member", member_id));
        }
        Ok(())
    }

    pub fn count_registered_members(&self) -> RepositoryResult<i64> {
        let conn = self.get_conn()?;
        let count = conn.query_row("SELECT COUNT(*) FROM member", [], |row| row.get(0))?;
        Ok(count)
    }

    /// 企业的全部员工，按姓名排序
    pub fn find_workers_of_company(&self, company_id: &Uuid) -> RepositoryResult<Vec<Member>> {
        let conn = self.get_conn()?;
        let mut stmt = conn.prepare(
            r#"SELECT m.member_id, m.name, m.email, m.account_id, m.registered_on, m.confirmed_on
               FROM member m
               JOIN company_worker w ON w.member_id = m.member_id
               WHERE w.company_id = ?1
               ORDER BY m.name ASC"#,
        )?;
        let members = stmt
            .query_map(params![company_id.to_string()], map_member_row)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(members)
    }
}

pub(crate) fn insert_member(conn: &Connection, member: &Member) -> RepositoryResult<()> {
    conn.execute(
        r#"INSERT INTO member (member_id, name, email, account_id, registered_on, confirmed_on)
           VALUES (?1, ?2, ?3, ?4, ?5, ?6)"#,
        params![
            member.id.to_string(),
            member.name,
            member.email,
            member.account.to_string(),
            fmt_datetime(&member.registered_on),
            member.confirmed_on.as_ref().map(fmt_datetime),
        ],
    )?;
    Ok(())
}

pub(crate) fn map_member_row(row: &Row<'_>) -> rusqlite::Result<Member> {
    Ok(Member {
        id: get_uuid(row, 0)?,
        name: row.get(1)?,
        email: row.get(2)?,
        account: get_uuid(row, 3)?,
        registered_on: get_datetime(row, 4)?,
        confirmed_on: get_opt_datetime(row, 5)?,
    })
}

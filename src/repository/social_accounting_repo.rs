// ==========================================
// 劳动时间经济核算系统 - 社会核算仓储
// ==========================================
// 每个数据库仅一个社会核算实例，首次访问时创建
// ==========================================

use crate::domain::account::Account;
use crate::domain::types::AccountType;
use crate::domain::user::SocialAccounting;
use crate::repository::account_repo::insert_account;
use crate::repository::error::{RepositoryError, RepositoryResult};
use crate::repository::row_utils::get_uuid;
use rusqlite::{params, Connection, OptionalExtension};
use std::sync::{Arc, Mutex, MutexGuard};
use uuid::Uuid;

pub struct SocialAccountingRepository {
    conn: Arc<Mutex<Connection>>,
}

impl SocialAccountingRepository {
    pub fn new(conn: Arc<Mutex<Connection>>) -> Self {
        Self { conn }
    }

    fn get_conn(&self) -> RepositoryResult<MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|e| RepositoryError::LockError(e.to_string()))
    }

    /// 获取社会核算实例，不存在则创建（账户与实体在同一事务内写入）
    pub fn get_or_create_social_accounting(&self) -> RepositoryResult<SocialAccounting> {
        let mut conn = self.get_conn()?;

        let existing = conn
            .query_row(
                "SELECT social_accounting_id, account_id FROM social_accounting LIMIT 1",
                [],
                |row| {
                    Ok(SocialAccounting {
                        id: get_uuid(row, 0)?,
                        account: get_uuid(row, 1)?,
                    })
                },
            )
            .optional()?;
        if let Some(social) = existing {
            return Ok(social);
        }

        let tx = conn
            .transaction()
            .map_err(|e| RepositoryError::DatabaseTransactionError(e.to_string()))?;
        let account = Account {
            id: Uuid::new_v4(),
            account_type: AccountType::Accounting,
        };
        insert_account(&tx, &account)?;
        let social = SocialAccounting {
            id: Uuid::new_v4(),
            account: account.id,
        };
        tx.execute(
            "INSERT INTO social_accounting (social_accounting_id, account_id) VALUES (?1, ?2)",
            params![social.id.to_string(), social.account.to_string()],
        )?;
        tx.commit()
            .map_err(|e| RepositoryError::DatabaseTransactionError(e.to_string()))?;

        tracing::info!(social_accounting_id = %social.id, "社会核算实例已创建");
        Ok(social)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::open_in_memory;

    #[test]
    fn test_单例() {
        let conn = Arc::new(Mutex::new(open_in_memory().unwrap()));
        let repo = SocialAccountingRepository::new(conn);
        let first = repo.get_or_create_social_accounting().unwrap();
        let second = repo.get_or_create_social_accounting().unwrap();
        assert_eq!(first, second);
    }
}

// ==========================================
// 劳动时间经济核算系统 - 行映射工具
// ==========================================
// 职责: TEXT 列 ↔ Uuid / Decimal / NaiveDateTime 的统一转换
// 约束: 解析失败返回 FromSqlConversionFailure，不做静默回退
// ==========================================

use crate::db::DATETIME_FORMAT;
use chrono::NaiveDateTime;
use rusqlite::types::Type;
use rusqlite::Row;
use rust_decimal::Decimal;
use std::str::FromStr;
use uuid::Uuid;

fn conversion_error<E>(idx: usize, err: E) -> rusqlite::Error
where
    E: std::error::Error + Send + Sync + 'static,
{
    rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(err))
}

pub fn fmt_datetime(t: &NaiveDateTime) -> String {
    t.format(DATETIME_FORMAT).to_string()
}

pub fn get_uuid(row: &Row<'_>, idx: usize) -> rusqlite::Result<Uuid> {
    let raw: String = row.get(idx)?;
    Uuid::parse_str(&raw).map_err(|e| conversion_error(idx, e))
}

pub fn get_opt_uuid(row: &Row<'_>, idx: usize) -> rusqlite::Result<Option<Uuid>> {
    match row.get::<_, Option<String>>(idx)? {
        Some(raw) => Uuid::parse_str(&raw)
            .map(Some)
            .map_err(|e| conversion_error(idx, e)),
        None => Ok(None),
    }
}

pub fn get_decimal(row: &Row<'_>, idx: usize) -> rusqlite::Result<Decimal> {
    let raw: String = row.get(idx)?;
    Decimal::from_str(&raw).map_err(|e| conversion_error(idx, e))
}

pub fn get_datetime(row: &Row<'_>, idx: usize) -> rusqlite::Result<NaiveDateTime> {
    let raw: String = row.get(idx)?;
    NaiveDateTime::parse_from_str(&raw, DATETIME_FORMAT).map_err(|e| conversion_error(idx, e))
}

pub fn get_opt_datetime(row: &Row<'_>, idx: usize) -> rusqlite::Result<Option<NaiveDateTime>> {
    match row.get::<_, Option<String>>(idx)? {
        Some(raw) => NaiveDateTime::parse_from_str(&raw, DATETIME_FORMAT)
            .map(Some)
            .map_err(|e| conversion_error(idx, e)),
        None => Ok(None),
    }
}

/// 构建 IN 子句的占位符片段；空列表返回永假条件
///
/// ```
/// use labour_ledger::repository::row_utils::build_in_clause;
///
/// assert_eq!(build_in_clause("account_id", 2), "account_id IN (?, ?)");
/// assert_eq!(build_in_clause("account_id", 0), "1 = 0");
/// ```
pub fn build_in_clause(column_name: &str, count: usize) -> String {
    if count == 0 {
        return "1 = 0".to_string();
    }
    let placeholders = vec!["?"; count].join(", ");
    format!("{} IN ({})", column_name, placeholders)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rusqlite::Connection;

    #[test]
    fn test_非法uuid返回转换错误() {
        let conn = Connection::open_in_memory().unwrap();
        let err = conn
            .query_row("SELECT 'not-a-uuid'", [], |row| get_uuid(row, 0))
            .unwrap_err();
        assert!(matches!(err, rusqlite::Error::FromSqlConversionFailure(0, _, _)));
    }

    #[test]
    fn test_decimal与时间解析() {
        let conn = Connection::open_in_memory().unwrap();
        let (d, t, n) = conn
            .query_row("SELECT '-0.32', '2021-01-02 10:00:00', NULL", [], |row| {
                Ok((get_decimal(row, 0)?, get_datetime(row, 1)?, get_opt_datetime(row, 2)?))
            })
            .unwrap();
        assert_eq!(d, Decimal::new(-32, 2));
        assert_eq!(fmt_datetime(&t), "2021-01-02 10:00:00");
        assert!(n.is_none());
    }
}

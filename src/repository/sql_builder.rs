// ==========================================
// 劳动时间经济核算系统 - SQL 构建工具
// ==========================================
// 职责: 动态 WHERE / ORDER BY / LIMIT 拼装，参数与占位符同步收集
// 约束: 所有值通过参数绑定传入，不拼接到 SQL 文本
// ==========================================

use rusqlite::types::Value;

/// SQL 查询构建器（流式 API）
///
/// # 示例
/// ```
/// use labour_ledger::repository::sql_builder::SqlQueryBuilder;
///
/// let builder = SqlQueryBuilder::new("SELECT * FROM plan")
///     .where_with("planner = ?", vec!["c1".to_string().into()])
///     .where_clause("is_active = 1")
///     .order_by("creation_date DESC")
///     .limit(10);
///
/// assert_eq!(
///     builder.build(),
///     "SELECT * FROM plan WHERE planner = ? AND is_active = 1 ORDER BY creation_date DESC LIMIT 10"
/// );
/// assert_eq!(builder.params().len(), 1);
/// ```
#[derive(Debug, Clone)]
pub struct SqlQueryBuilder {
    select_clause: String,
    where_clauses: Vec<String>,
    params: Vec<Value>,
    order_by_clause: Option<String>,
    limit_clause: Option<usize>,
    offset_clause: Option<usize>,
}

impl SqlQueryBuilder {
    pub fn new(select: &str) -> Self {
        Self {
            select_clause: select.to_string(),
            where_clauses: Vec::new(),
            params: Vec::new(),
            order_by_clause: None,
            limit_clause: None,
            offset_clause: None,
        }
    }

    /// 添加无参数的 WHERE 条件
    pub fn where_clause(mut self, condition: &str) -> Self {
        self.where_clauses.push(condition.to_string());
        self
    }

    /// 添加带参数的 WHERE 条件；参数个数需与占位符一致
    pub fn where_with(mut self, condition: &str, values: Vec<Value>) -> Self {
        self.where_clauses.push(condition.to_string());
        self.params.extend(values);
        self
    }

    pub fn order_by(mut self, order: &str) -> Self {
        self.order_by_clause = Some(order.to_string());
        self
    }

    pub fn limit(mut self, n: usize) -> Self {
        self.limit_clause = Some(n);
        self
    }

    pub fn offset(mut self, n: usize) -> Self {
        self.offset_clause = Some(n);
        self
    }

    pub fn params(&self) -> &[Value] {
        &self.params
    }

    /// 构建最终的 SQL 语句
    pub fn build(&self) -> String {
        let mut sql = self.select_clause.clone();

        if !self.where_clauses.is_empty() {
            sql.push_str(" WHERE ");
            sql.push_str(&self.where_clauses.join(" AND "));
        }

        if let Some(order) = &self.order_by_clause {
            sql.push_str(" ORDER BY ");
            sql.push_str(order);
        }

        // SQLite 要求 OFFSET 前必须有 LIMIT
        match (self.limit_clause, self.offset_clause) {
            (Some(limit), Some(offset)) => sql.push_str(&format!(" LIMIT {} OFFSET {}", limit, offset)),
            (Some(limit), None) => sql.push_str(&format!(" LIMIT {}", limit)),
            (None, Some(offset)) => sql.push_str(&format!(" LIMIT -1 OFFSET {}", offset)),
            (None, None) => {}
        }

        sql
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_无条件() {
        let sql = SqlQueryBuilder::new("SELECT * FROM plan").build();
        assert_eq!(sql, "SELECT * FROM plan");
    }

    #[test]
    fn test_仅offset时补limit() {
        let sql = SqlQueryBuilder::new("SELECT * FROM plan").offset(5).build();
        assert_eq!(sql, "SELECT * FROM plan LIMIT -1 OFFSET 5");
    }

    #[test]
    fn test_参数按条件顺序收集() {
        let builder = SqlQueryBuilder::new("SELECT * FROM plan")
            .where_with("a = ?", vec![Value::Integer(1)])
            .where_with("b IN (?, ?)", vec![Value::Integer(2), Value::Integer(3)]);
        assert_eq!(
            builder.params(),
            &[Value::Integer(1), Value::Integer(2), Value::Integer(3)]
        );
        assert_eq!(builder.build(), "SELECT * FROM plan WHERE a = ? AND b IN (?, ?)");
    }
}

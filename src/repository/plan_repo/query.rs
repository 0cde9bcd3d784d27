use super::core::{map_plan_row, PlanRepository, PLAN_COLUMNS};
use crate::repository::error::RepositoryResult;
use crate::repository::row_utils::{build_in_clause, fmt_datetime};
use crate::repository::sql_builder::SqlQueryBuilder;
use crate::domain::plan::Plan;
use chrono::NaiveDateTime;
use rusqlite::params_from_iter;
use rusqlite::types::Value;
use uuid::Uuid;

/// 到期时间的 SQL 表达式（与 DATETIME_FORMAT 同格式，可直接按字符串比较）
const EXPIRATION_EXPR: &str = "datetime(p.activation_date, '+' || p.timeframe_days || ' days')";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PlanOrdering {
    #[default]
    CreationDateDesc,
    ActivationDateDesc,
    PlannerNameAsc,
}

impl PlanOrdering {
    fn to_sql(self) -> &'static str {
        match self {
            PlanOrdering::CreationDateDesc => "p.creation_date DESC, p.rowid DESC",
            PlanOrdering::ActivationDateDesc => "p.activation_date DESC, p.rowid DESC",
            PlanOrdering::PlannerNameAsc => "c.name ASC, p.creation_date DESC",
        }
    }
}

/// LIKE 子串模式：小写，转义 \ % _
fn contains_pattern(text: &str) -> String {
    let mut pattern = String::with_capacity(text.len() + 2);
    pattern.push('%');
    for ch in text.to_lowercase().chars() {
        if matches!(ch, '\\' | '%' | '_') {
            pattern.push('\\');
        }
        pattern.push(ch);
    }
    pattern.push('%');
    pattern
}

// ==========================================
// PlanQuery - 计划过滤构建器
// ==========================================
// 所有条件以 AND 组合；未设置任何条件时返回全部计划
#[derive(Debug, Clone, Default)]
pub struct PlanQuery {
    filters: Vec<(String, Vec<Value>)>,
    ordering: PlanOrdering,
    limit: Option<usize>,
    offset: Option<usize>,
}

impl PlanQuery {
    pub fn new() -> Self {
        Self::default()
    }

    fn filter(mut self, condition: impl Into<String>, values: Vec<Value>) -> Self {
        self.filters.push((condition.into(), values));
        self
    }

    pub fn with_id(self, plan_id: Uuid) -> Self {
        self.filter("p.plan_id = ?", vec![Value::Text(plan_id.to_string())])
    }

    /// 空集合时不匹配任何计划
    pub fn with_ids(self, plan_ids: &[Uuid]) -> Self {
        let values = plan_ids.iter().map(|id| Value::Text(id.to_string())).collect();
        self.filter(build_in_clause("p.plan_id", plan_ids.len()), values)
    }

    pub fn planned_by(self, company: Uuid) -> Self {
        self.filter("p.planner = ?", vec![Value::Text(company.to_string())])
    }

    pub fn that_are_approved(self) -> Self {
        self.filter("p.approval_date IS NOT NULL", vec![])
    }

    pub fn that_are_productive(self) -> Self {
        self.filter("p.is_public_service = 0", vec![])
    }

    pub fn that_are_public(self) -> Self {
        self.filter("p.is_public_service = 1", vec![])
    }

    /// 按 is_active 标志过滤
    pub fn that_are_active(self) -> Self {
        self.filter("p.is_active = 1", vec![])
    }

    /// activation_date ≤ t
    pub fn that_were_activated_before(self, t: NaiveDateTime) -> Self {
        self.filter(
            "p.activation_date IS NOT NULL AND p.activation_date <= ?",
            vec![Value::Text(fmt_datetime(&t))],
        )
    }

    /// expiration_date > t
    pub fn that_will_expire_after(self, t: NaiveDateTime) -> Self {
        self.filter(
            format!("p.activation_date IS NOT NULL AND {} > ?", EXPIRATION_EXPR),
            vec![Value::Text(fmt_datetime(&t))],
        )
    }

    /// expiration_date ≤ t
    pub fn that_are_expired_as_of(self, t: NaiveDateTime) -> Self {
        self.filter(
            format!("p.activation_date IS NOT NULL AND {} <= ?", EXPIRATION_EXPR),
            vec![Value::Text(fmt_datetime(&t))],
        )
    }

    /// activation_date ≤ t < expiration_date
    pub fn that_are_active_as_of(self, t: NaiveDateTime) -> Self {
        self.that_were_activated_before(t).that_will_expire_after(t)
    }

    pub fn that_are_not_yet_activated(self) -> Self {
        self.filter("p.activation_date IS NULL", vec![])
    }

    /// 按 expired 标志过滤
    pub fn that_are_not_expired(self) -> Self {
        self.filter("p.expired = 0", vec![])
    }

    pub fn that_are_not_hidden(self) -> Self {
        self.filter("p.hidden_by_user = 0", vec![])
    }

    pub fn that_are_cooperating(self) -> Self {
        self.filter("p.cooperation IS NOT NULL", vec![])
    }

    pub fn that_are_part_of_cooperation(self, cooperation: Uuid) -> Self {
        self.filter("p.cooperation = ?", vec![Value::Text(cooperation.to_string())])
    }

    /// 请求加入由该企业当前协调的合作
    pub fn that_request_cooperation_with_coordinator(self, company: Uuid) -> Self {
        self.filter(
            r#"p.requested_cooperation IN (
                SELECT t.cooperation_id FROM coordination_tenure t
                WHERE t.company_id = ?
                  AND t.tenure_id = (
                    SELECT t2.tenure_id FROM coordination_tenure t2
                    WHERE t2.cooperation_id = t.cooperation_id
                    ORDER BY t2.start_date DESC, t2.rowid DESC
                    LIMIT 1
                  )
            )"#,
            vec![Value::Text(company.to_string())],
        )
    }

    pub fn that_are_requesting_cooperation(self) -> Self {
        self.filter("p.requested_cooperation IS NOT NULL", vec![])
    }

    /// 产品名包含（不区分大小写，% 与 _ 按字面匹配）
    pub fn with_product_name_containing(self, text: &str) -> Self {
        self.filter(
            "LOWER(p.product_name) LIKE ? ESCAPE '\\'",
            vec![Value::Text(contains_pattern(text))],
        )
    }

    pub fn with_id_containing(self, text: &str) -> Self {
        self.filter(
            "p.plan_id LIKE ? ESCAPE '\\'",
            vec![Value::Text(contains_pattern(text))],
        )
    }

    pub fn ordered_by(mut self, ordering: PlanOrdering) -> Self {
        self.ordering = ordering;
        self
    }

    pub fn limit(mut self, n: usize) -> Self {
        self.limit = Some(n);
        self
    }

    pub fn offset(mut self, n: usize) -> Self {
        self.offset = Some(n);
        self
    }

    pub(super) fn to_builder(&self, select: &str) -> SqlQueryBuilder {
        let mut builder = SqlQueryBuilder::new(select);
        for (condition, values) in &self.filters {
            builder = builder.where_with(condition, values.clone());
        }
        builder = builder.order_by(self.ordering.to_sql());
        if let Some(n) = self.limit {
            builder = builder.limit(n);
        }
        if let Some(n) = self.offset {
            builder = builder.offset(n);
        }
        builder
    }
}

impl PlanRepository {
    /// 按条件查询计划
    pub fn query_plans(&self, query: &PlanQuery) -> RepositoryResult<Vec<Plan>> {
        let select = format!(
            "SELECT {} FROM plan p LEFT JOIN company c ON c.company_id = p.planner",
            PLAN_COLUMNS
        );
        let builder = query.to_builder(&select);
        let sql = builder.build();

        let conn = self.get_conn()?;
        let mut stmt = conn.prepare(&sql)?;
        let plans = stmt
            .query_map(params_from_iter(builder.params().iter()), map_plan_row)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(plans)
    }

    /// 满足条件的计划数量（忽略 limit/offset）
    pub fn count_plans(&self, query: &PlanQuery) -> RepositoryResult<i64> {
        let mut unbounded = query.clone();
        unbounded.limit = None;
        unbounded.offset = None;
        let builder = unbounded.to_builder(
            "SELECT COUNT(*) FROM plan p LEFT JOIN company c ON c.company_id = p.planner",
        );
        let conn = self.get_conn()?;
        let count = conn.query_row(
            &builder.build(),
            params_from_iter(builder.params().iter()),
            |row| row.get(0),
        )?;
        Ok(count)
    }
}

// ==========================================
// 劳动时间经济核算系统 - 合作与协调者任期
// ==========================================
// 合作: 一组计划共享平均（合作）价格
// 协调者: 最近一次任期的企业
// ==========================================

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Cooperation {
    pub id: Uuid,
    pub creation_date: NaiveDateTime,
    pub name: String,
    pub definition: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CoordinationTenure {
    pub id: Uuid,
    pub company: Uuid,
    pub cooperation: Uuid,
    pub start_date: NaiveDateTime,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CoordinationTransferRequest {
    pub id: Uuid,
    pub requesting_tenure: Uuid,
    pub candidate: Uuid,
    pub request_date: NaiveDateTime,
    pub is_closed: bool,
}

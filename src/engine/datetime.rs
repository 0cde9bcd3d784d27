// ==========================================
// 劳动时间经济核算系统 - 时间服务
// ==========================================
// 职责: 提供"当前时间"与每日截止时间
// 说明: 引擎与用例只通过 DatetimeService 取时间，测试注入 FakeDatetimeService
// ==========================================

use chrono::{Duration, Local, NaiveDate, NaiveDateTime, NaiveTime, Timelike};
use std::sync::{Arc, Mutex};

/// 时间服务 Trait
pub trait DatetimeService: Send + Sync {
    /// 当前时间（秒精度）
    fn now(&self) -> NaiveDateTime;

    /// 每日截止时间（同步激活与结算）
    fn cutoff_time(&self) -> NaiveTime;

    fn today(&self) -> NaiveDate {
        self.now().date()
    }

    /// 当日截止时刻
    fn time_of_synchronized_plan_activation(&self) -> NaiveDateTime {
        self.today().and_time(self.cutoff_time())
    }

    /// t 之后的下一个截止时刻：t 严格早于当日截止则为当日，否则为次日
    fn next_cutoff_after(&self, t: NaiveDateTime) -> NaiveDateTime {
        let same_day = t.date().and_time(self.cutoff_time());
        if t < same_day {
            same_day
        } else {
            same_day + Duration::days(1)
        }
    }
}

fn truncate_to_seconds(t: NaiveDateTime) -> NaiveDateTime {
    t.with_nanosecond(0).unwrap_or(t)
}

// ==========================================
// SystemDatetimeService - 本地时钟
// ==========================================
#[derive(Debug, Clone)]
pub struct SystemDatetimeService {
    cutoff: NaiveTime,
}

impl SystemDatetimeService {
    pub fn new(cutoff: NaiveTime) -> Self {
        Self { cutoff }
    }
}

impl DatetimeService for SystemDatetimeService {
    fn now(&self) -> NaiveDateTime {
        truncate_to_seconds(Local::now().naive_local())
    }

    fn cutoff_time(&self) -> NaiveTime {
        self.cutoff
    }
}

// ==========================================
// FakeDatetimeService - 可冻结/可拨动的时钟
// ==========================================
// 未冻结时返回本地时钟
#[derive(Debug, Clone)]
pub struct FakeDatetimeService {
    frozen: Arc<Mutex<Option<NaiveDateTime>>>,
    cutoff: NaiveTime,
}

impl Default for FakeDatetimeService {
    fn default() -> Self {
        Self::new()
    }
}

impl FakeDatetimeService {
    pub fn new() -> Self {
        Self {
            frozen: Arc::new(Mutex::new(None)),
            cutoff: NaiveTime::from_hms_opt(2, 0, 0).unwrap_or(NaiveTime::MIN),
        }
    }

    pub fn with_cutoff(mut self, cutoff: NaiveTime) -> Self {
        self.cutoff = cutoff;
        self
    }

    pub fn freeze_time(&self, t: NaiveDateTime) {
        if let Ok(mut frozen) = self.frozen.lock() {
            *frozen = Some(truncate_to_seconds(t));
        }
    }

    /// 拨动时间；未冻结时先冻结在当前时刻
    pub fn advance_time(&self, by: Duration) -> NaiveDateTime {
        let next = self.now() + by;
        self.freeze_time(next);
        next
    }

    pub fn now_minus_one_day(&self) -> NaiveDateTime {
        self.now() - Duration::days(1)
    }
}

impl DatetimeService for FakeDatetimeService {
    fn now(&self) -> NaiveDateTime {
        let frozen = self.frozen.lock().ok().and_then(|g| *g);
        frozen.unwrap_or_else(|| truncate_to_seconds(Local::now().naive_local()))
    }

    fn cutoff_time(&self) -> NaiveTime {
        self.cutoff
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn at(d: u32, h: u32, m: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2021, 6, d)
            .unwrap()
            .and_hms_opt(h, m, 0)
            .unwrap()
    }

    #[test]
    fn test_冻结与拨动() {
        let dt = FakeDatetimeService::new();
        dt.freeze_time(at(1, 10, 0));
        assert_eq!(dt.now(), at(1, 10, 0));
        dt.advance_time(Duration::days(1));
        assert_eq!(dt.now(), at(2, 10, 0));
        assert_eq!(dt.now_minus_one_day(), at(1, 10, 0));
        assert_eq!(dt.today(), NaiveDate::from_ymd_opt(2021, 6, 2).unwrap());
    }

    #[test]
    fn test_下一个截止时刻() {
        let dt = FakeDatetimeService::new();
        assert_eq!(dt.next_cutoff_after(at(1, 1, 59)), at(1, 2, 0));
        assert_eq!(dt.next_cutoff_after(at(1, 2, 0)), at(2, 2, 0));
        assert_eq!(dt.next_cutoff_after(at(1, 23, 0)), at(2, 2, 0));
    }

    #[test]
    fn test_同步激活时刻为当日截止() {
        let dt = FakeDatetimeService::new().with_cutoff(NaiveTime::from_hms_opt(3, 30, 0).unwrap());
        dt.freeze_time(at(5, 18, 0));
        assert_eq!(dt.time_of_synchronized_plan_activation(), at(5, 3, 30));
    }
}

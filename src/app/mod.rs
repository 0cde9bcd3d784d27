// ==========================================
// 劳动时间经济核算系统 - 应用层
// ==========================================
// 职责: 组装共享状态，供命令行与守护进程使用
// ==========================================

pub mod state;

// 重导出
pub use state::{get_default_db_path, AppState};

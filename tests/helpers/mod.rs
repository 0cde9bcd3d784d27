// ==========================================
// 集成测试辅助模块
// ==========================================
// 每个测试文件只用到其中一部分
#![allow(dead_code)]

pub mod plan_builder;
pub mod test_env;

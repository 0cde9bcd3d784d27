// ==========================================
// 劳动时间经济核算系统 - 命令行入口
// ==========================================
// 用法:
//   labour-ledger payout                       立即执行一次结算
//   labour-ledger daemon                       每日截止时刻激活并结算
//   labour-ledger stats                        以 JSON 输出统计
//   labour-ledger export-statement <企业> <账户> 以 CSV 输出账户明细 (p/r/a/prd)
// 数据库路径: LABOUR_LEDGER_DB_PATH 或用户数据目录
// ==========================================

use anyhow::{anyhow, bail, Context};
use labour_ledger::app::{get_default_db_path, AppState};
use labour_ledger::domain::types::AccountType;
use labour_ledger::logging;
use std::sync::Arc;
use uuid::Uuid;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    logging::init();

    let mut args = std::env::args().skip(1);
    let command = args.next().unwrap_or_else(|| "stats".to_string());

    let db_path = get_default_db_path();
    tracing::info!("{} v{}，数据库: {}", labour_ledger::APP_NAME, labour_ledger::VERSION, db_path);
    let state = Arc::new(AppState::new(db_path).context("无法初始化AppState")?);

    match command.as_str() {
        "payout" => run_cycle(state).await,
        "daemon" => run_daemon(state).await,
        "stats" => {
            let stats = state.statistics.execute()?;
            println!("{}", serde_json::to_string_pretty(&stats)?);
            Ok(())
        }
        "export-statement" => {
            let company: Uuid = args
                .next()
                .ok_or_else(|| anyhow!("缺少企业 id"))?
                .parse()
                .context("企业 id 格式错误")?;
            let account = args.next().ok_or_else(|| anyhow!("缺少账户类型"))?;
            let account_type =
                AccountType::parse(&account).ok_or_else(|| anyhow!("未知账户类型: {}", account))?;
            export_statement(&state, company, account_type)
        }
        other => bail!("未知命令: {}", other),
    }
}

/// 同步激活（未开启批准即激活时）+ 结算；仓储是同步的，放到阻塞线程执行
async fn run_cycle(state: Arc<AppState>) -> anyhow::Result<()> {
    tokio::task::spawn_blocking(move || -> anyhow::Result<()> {
        if !state.config.get_activate_on_approval()? {
            let activated = state.plan_activation.run()?;
            tracing::info!(count = activated.len(), "同步激活完成");
        }
        let report = state.payout.run()?;
        println!("{}", serde_json::to_string_pretty(&report)?);
        Ok(())
    })
    .await?
}

async fn run_daemon(state: Arc<AppState>) -> anyhow::Result<()> {
    loop {
        let now = state.datetime.now();
        let next = state.datetime.next_cutoff_after(now);
        let wait = (next - now).to_std().unwrap_or_default();
        tracing::info!(next_run = %next, "等待下一个截止时刻");

        tokio::select! {
            _ = tokio::time::sleep(wait) => {}
            _ = tokio::signal::ctrl_c() => {
                tracing::info!("收到退出信号，守护进程停止");
                return Ok(());
            }
        }

        if let Err(e) = run_cycle(state.clone()).await {
            tracing::error!("结算失败: {:#}", e);
        }
    }
}

fn export_statement(state: &AppState, company: Uuid, account_type: AccountType) -> anyhow::Result<()> {
    let details = state.account_details.execute(company, account_type)?;

    let mut writer = csv::Writer::from_writer(std::io::stdout());
    writer.write_record(["date", "transaction_type", "volume", "purpose", "buyer"])?;
    for row in &details.transactions {
        writer.write_record([
            row.date.format(labour_ledger::db::DATETIME_FORMAT).to_string(),
            row.transaction_type.to_string(),
            row.volume.to_string(),
            row.purpose.clone(),
            row.buyer.as_ref().map(|b| b.buyer_name.clone()).unwrap_or_default(),
        ])?;
    }
    writer.flush()?;
    tracing::info!(rows = details.transactions.len(), balance = %details.account_balance, "账户明细已导出");
    Ok(())
}

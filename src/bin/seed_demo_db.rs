// Dev utility: rebuild a demo database with companies, members, plans, a cooperation,
// purchases and ten days of payouts.
//
// Usage:
//   cargo run --bin seed_demo_db -- [db_path]
//
// An existing database at db_path is backed up first.

use chrono::{Duration, Local};
use rust_decimal::Decimal;
use std::error::Error;
use std::fs;
use std::path::Path;
use std::sync::Arc;
use uuid::Uuid;

use labour_ledger::app::{get_default_db_path, AppState};
use labour_ledger::domain::types::PurposeOfPurchase;
use labour_ledger::engine::{DatetimeService, FakeDatetimeService};
use labour_ledger::use_cases::{
    AcceptCooperation, AnswerCompanyWorkInvite, ApprovePlan, CreateCooperation, CreateDraftRequest,
    CreatePlanDraft, InviteWorkerToCompany, PayConsumerProduct, PayMeansOfProduction,
    RegisterCompany, RegisterHoursWorked, RegisterMember, RequestCooperation,
};

const SIMULATED_DAYS: i64 = 10;

fn main() -> Result<(), Box<dyn Error>> {
    labour_ledger::logging::init();

    let db_path = std::env::args().nth(1).unwrap_or_else(get_default_db_path);
    backup_and_reset_db(&db_path)?;

    let clock = Arc::new(FakeDatetimeService::new());
    clock.freeze_time(Local::now().naive_local() - Duration::days(SIMULATED_DAYS));
    let state = AppState::with_datetime(db_path.clone(), clock.clone())?;

    let scenario = seed_scenario(&state)?;
    for _ in 0..SIMULATED_DAYS {
        clock.advance_time(Duration::days(1));
        simulate_day(&state, &scenario)?;
        let report = state.payout.run()?;
        eprintln!(
            "{} payout_factor={} payouts={} total={}",
            report.run_at, report.payout_factor, report.payouts, report.total_paid
        );
    }

    let stats = state.statistics.execute()?;
    println!("{}", serde_json::to_string_pretty(&stats)?);
    eprintln!("Seeded {} (clock at {})", db_path, clock.now());
    Ok(())
}

fn backup_and_reset_db(db_path: &str) -> Result<(), Box<dyn Error>> {
    let path = Path::new(db_path);
    if !path.exists() {
        return Ok(());
    }

    let ts = Local::now().format("%Y%m%d_%H%M%S").to_string();
    let backup_path = format!("{}.bak.{}", db_path, ts);
    fs::copy(path, &backup_path)?;
    fs::remove_file(path)?;

    eprintln!("Backed up {} -> {}", db_path, backup_path);
    Ok(())
}

struct Scenario {
    bakery: Uuid,
    mill: Uuid,
    workers: Vec<Uuid>,
    bread_plan: Uuid,
    flour_plan: Uuid,
}

fn seed_scenario(state: &AppState) -> Result<Scenario, Box<dyn Error>> {
    let repos = state.repos.clone();
    let dt = state.datetime.clone();

    let register_company = RegisterCompany::new(repos.clone(), dt.clone());
    let bakery = register_company.execute("Bäckerei Nord", "nord@baeckerei.example")?;
    let mill = register_company.execute("Mühle Süd", "info@muehle.example")?;
    let utility = register_company.execute("Stadtwerke", "kontakt@stadtwerke.example")?;
    let second_bakery = register_company.execute("Bäckerei Ost", "ost@baeckerei.example")?;

    let register_member = RegisterMember::new(repos.clone(), dt.clone());
    let invite = InviteWorkerToCompany::new(repos.clone());
    let answer = AnswerCompanyWorkInvite::new(repos.clone());
    let mut workers = Vec::new();
    for (i, company) in [bakery, mill, utility, bakery].iter().enumerate() {
        let member = register_member.execute(&format!("Mitglied {}", i + 1), &format!("m{}@example.org", i + 1))?;
        let invite_id = invite.execute(*company, member)?;
        answer.execute(member, invite_id, true)?;
        workers.push(member);
    }

    let create_draft = CreatePlanDraft::new(repos.clone(), state.config.clone(), dt.clone());
    let approve = ApprovePlan::new(repos.clone(), state.config.clone(), dt.clone());
    let plan = |planner: Uuid,
                name: &str,
                amount: i64,
                days: i64,
                costs: (i64, i64, i64),
                public: bool|
     -> Result<Uuid, Box<dyn Error>> {
        let draft = create_draft.execute(CreateDraftRequest {
            planner,
            product_name: name.to_string(),
            unit_of_distribution: "Stück".to_string(),
            amount_produced: amount,
            description: format!("Demo-Plan: {}", name),
            timeframe_days: days,
            is_public_service: public,
            labour_cost: Decimal::from(costs.0),
            resource_cost: Decimal::from(costs.1),
            means_cost: Decimal::from(costs.2),
        })?;
        Ok(approve.execute(planner, draft)?.plan_id)
    };
    let bread_plan = plan(bakery, "Brot", 500, 14, (120, 60, 20), false)?;
    let second_bread_plan = plan(second_bakery, "Brot", 300, 14, (90, 30, 10), false)?;
    let flour_plan = plan(mill, "Mehl", 1000, 30, (200, 80, 40), false)?;
    plan(utility, "Straßenbeleuchtung", 1, 30, (60, 30, 30), true)?;

    let coop = CreateCooperation::new(repos.clone(), dt.clone()).execute(
        bakery,
        "Brot-Kooperation",
        "Gemeinsamer Preis für Brot",
    )?;
    let request = RequestCooperation::new(repos.clone());
    let accept = AcceptCooperation::new(repos.clone());
    for (planner, plan_id) in [(bakery, bread_plan), (second_bakery, second_bread_plan)] {
        request.execute(planner, plan_id, coop)?;
        accept.execute(bakery, plan_id, coop)?;
    }

    Ok(Scenario {
        bakery,
        mill,
        workers,
        bread_plan,
        flour_plan,
    })
}

fn simulate_day(state: &AppState, scenario: &Scenario) -> Result<(), Box<dyn Error>> {
    let repos = state.repos.clone();
    let dt = state.datetime.clone();

    let hours = RegisterHoursWorked::new(repos.clone(), dt.clone());
    hours.execute(scenario.bakery, scenario.workers[0], Decimal::from(8))?;
    hours.execute(scenario.bakery, scenario.workers[3], Decimal::from(6))?;
    hours.execute(scenario.mill, scenario.workers[1], Decimal::from(8))?;

    PayMeansOfProduction::new(repos.clone(), dt.clone()).execute(
        scenario.bakery,
        scenario.flour_plan,
        20,
        PurposeOfPurchase::RawMaterials,
    )?;
    let consume = PayConsumerProduct::new(repos, state.config.clone(), dt);
    for worker in &scenario.workers {
        // 余额不足时跳过
        if let Err(e) = consume.execute(*worker, scenario.bread_plan, 2) {
            eprintln!("skip purchase for {}: {}", worker, e);
        }
    }
    Ok(())
}

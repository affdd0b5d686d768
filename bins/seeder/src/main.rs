//! Demo data seeder for Contab development.
//!
//! Builds a small organization in an in-memory store, records a year of
//! movements, restates it for inflation, closes it and opens the next year,
//! logging the balances at each step.
//!
//! Usage: cargo run --bin seeder

use anyhow::Context;
use chrono::NaiveDate;
use contab_core::chart::{AccountFlags, CreateNodeInput, CurrencyInput, NodeKind};
use contab_core::fiscal::PeriodInput;
use contab_core::inflation::IndexInput;
use contab_core::ledger::{EntryInput, PostingInput};
use contab_core::reports::BalanceQuery;
use contab_db::{
    ChartRepository, CreateOrganizationInput, CurrencyRepository, Database, FiscalRepository,
    InflationRepository, JournalRepository, OrganizationRepository, ReportRepository,
};
use contab_shared::AppConfig;
use contab_shared::types::{FiscalPeriodId, NodeId, OrganizationId, PageRequest};
use rust_decimal::Decimal;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Monthly index values for 2024, January first.
const INDEXES_2024: [i64; 12] = [
    1000, 1200, 1350, 1470, 1560, 1640, 1700, 1770, 1840, 1900, 1980, 2050,
];

struct Repositories {
    orgs: OrganizationRepository,
    currencies: CurrencyRepository,
    chart: ChartRepository,
    journal: JournalRepository,
    reports: ReportRepository,
    fiscal: FiscalRepository,
    inflation: InflationRepository,
}

impl Repositories {
    fn new(db: &Database, max_page_size: u32) -> Self {
        Self {
            orgs: OrganizationRepository::new(db.clone()),
            currencies: CurrencyRepository::new(db.clone()),
            chart: ChartRepository::new(db.clone()),
            journal: JournalRepository::new(db.clone()).with_max_page_size(max_page_size),
            reports: ReportRepository::new(db.clone()).with_max_page_size(max_page_size),
            fiscal: FiscalRepository::new(db.clone()),
            inflation: InflationRepository::new(db.clone()),
        }
    }
}

/// Accounts the demo entries post to.
struct Accounts {
    cash: NodeId,
    stock: NodeId,
    capital: NodeId,
    sales: NodeId,
    costs: NodeId,
}

fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let config = AppConfig::load().context("Failed to load configuration")?;

    let json = config.logging.json;
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| config.logging.level.clone().into()),
        )
        .with(json.then(|| tracing_subscriber::fmt::layer().json()))
        .with((!json).then(tracing_subscriber::fmt::layer))
        .init();

    let db = Database::new();
    let repos = Repositories::new(&db, config.reports.max_page_size);
    let page = PageRequest::new(1, config.reports.default_page_size);

    let org = repos
        .orgs
        .create(CreateOrganizationInput {
            tax_id: "30-71234567-8".to_string(),
            name: "ACME S.A.".to_string(),
        })?
        .id;
    info!(org_id = %org, "Seeding organization");

    let accounts = seed_chart(&repos, org)?;
    let period = repos.fiscal.create_next(org, year(2024)?, false)?;
    seed_movements(&repos, org, period.id, &accounts)?;
    log_balances(&repos, org, period.id, page, "Balances before adjustment")?;

    let adjustment = repos.fiscal.adjust_for_inflation(org, period.id)?;
    info!(
        postings = adjustment.map_or(0, |e| e.postings.len()),
        "Inflation adjustment applied"
    );
    log_balances(&repos, org, period.id, page, "Balances after adjustment")?;

    let next = repos.fiscal.create_next(org, year(2025)?, true)?;
    log_balances(&repos, org, next.id, page, "Opening balances")?;

    info!("Seeding complete");
    Ok(())
}

fn seed_chart(repos: &Repositories, org: OrganizationId) -> anyhow::Result<Accounts> {
    let ars = repos
        .currencies
        .create(
            org,
            CurrencyInput {
                name: "Peso argentino".to_string(),
                symbol: "$".to_string(),
                code: "ARS".to_string(),
                is_default: true,
                adjustable: true,
            },
        )?
        .id;

    let node = |parent: Option<NodeId>, number: u16, description: &str, kind: NodeKind| {
        repos
            .chart
            .create(
                org,
                CreateNodeInput {
                    parent_id: parent,
                    number,
                    description: description.to_string(),
                    alias: None,
                    legacy_code: None,
                    kind,
                },
            )
            .map(|created| created.node.id)
    };
    let plain = NodeKind::Account(AccountFlags::plain(ars));

    let assets = node(None, 1, "Activo", NodeKind::Category { is_result: false })?;
    let cash = node(Some(assets), 1, "Caja", plain)?;
    let stock = node(
        Some(assets),
        2,
        "Mercaderías",
        NodeKind::Account(AccountFlags {
            adjustable: true,
            ..AccountFlags::plain(ars)
        }),
    )?;

    let equity = node(None, 3, "Patrimonio neto", NodeKind::Category { is_result: false })?;
    let capital = node(Some(equity), 1, "Capital", plain)?;
    node(
        Some(equity),
        2,
        "Resultados no asignados",
        NodeKind::Account(AccountFlags {
            balances_results: true,
            ..AccountFlags::plain(ars)
        }),
    )?;
    node(
        Some(equity),
        3,
        "RECPAM",
        NodeKind::Account(AccountFlags {
            balances_adjustables: true,
            ..AccountFlags::plain(ars)
        }),
    )?;

    let results = node(None, 4, "Resultados", NodeKind::Category { is_result: true })?;
    let sales = node(Some(results), 1, "Ventas", plain)?;
    let costs = node(Some(results), 2, "Costo de ventas", plain)?;

    for (month, value) in (1..=12).zip(INDEXES_2024) {
        repos.inflation.create(
            org,
            IndexInput {
                currency_id: ars,
                month: date(2024, month, 1)?,
                value: Decimal::new(value, 1),
            },
        )?;
    }

    Ok(Accounts {
        cash,
        stock,
        capital,
        sales,
        costs,
    })
}

fn seed_movements(
    repos: &Repositories,
    org: OrganizationId,
    period_id: FiscalPeriodId,
    a: &Accounts,
) -> anyhow::Result<()> {
    let movements = [
        ((1, 2), "Aporte inicial", [(a.cash, 500_000), (a.capital, -500_000)]),
        ((2, 10), "Compra de mercaderías", [(a.stock, 300_000), (a.cash, -300_000)]),
        ((6, 18), "Venta de contado", [(a.cash, 420_000), (a.sales, -420_000)]),
        ((6, 18), "Costo de la venta", [(a.costs, 180_000), (a.stock, -180_000)]),
    ];
    for ((month, day), description, lines) in movements {
        let created = repos.journal.create(
            org,
            period_id,
            EntryInput {
                date: date(2024, month, day)?,
                description: description.to_string(),
                postings: lines
                    .iter()
                    .map(|(account, cents)| {
                        PostingInput::new(*account, Decimal::new(*cents, 2), description)
                    })
                    .collect(),
                version: 0,
            },
        )?;
        info!(number = created.entry.number, description, "Entry recorded");
    }
    Ok(())
}

fn log_balances(
    repos: &Repositories,
    org: OrganizationId,
    period_id: FiscalPeriodId,
    page: PageRequest,
    message: &str,
) -> anyhow::Result<()> {
    let balances = repos
        .reports
        .balance_page(org, period_id, &BalanceQuery::default(), page)?;
    let rendered = serde_json::to_string(&balances.data)?;
    info!(period_id = %period_id, accounts = balances.meta.total, balances = %rendered, "{message}");
    Ok(())
}

fn date(year: i32, month: u32, day: u32) -> anyhow::Result<NaiveDate> {
    NaiveDate::from_ymd_opt(year, month, day)
        .with_context(|| format!("invalid date {year}-{month}-{day}"))
}

fn year(year: i32) -> anyhow::Result<PeriodInput> {
    Ok(PeriodInput {
        start: date(year, 1, 1)?,
        end: date(year, 12, 31)?,
    })
}

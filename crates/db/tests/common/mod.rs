//! Shared fixtures for the repository integration tests.

#![allow(dead_code)]

use chrono::NaiveDate;
use contab_core::chart::{AccountFlags, CreateNodeInput, CurrencyInput, NodeKind};
use contab_core::fiscal::{FiscalPeriod, PeriodInput};
use contab_core::ledger::{EntryInput, PostingInput};
use contab_db::{
    ChartRepository, CreateOrganizationInput, CurrencyRepository, Database, FiscalRepository,
    InflationRepository, JournalRepository, OrganizationRepository, ReportRepository,
};
use contab_shared::types::{CurrencyId, NodeId, OrganizationId};
use rust_decimal::Decimal;

/// Every repository over one store.
pub struct Repos {
    pub db: Database,
    pub orgs: OrganizationRepository,
    pub currencies: CurrencyRepository,
    pub chart: ChartRepository,
    pub journal: JournalRepository,
    pub reports: ReportRepository,
    pub fiscal: FiscalRepository,
    pub inflation: InflationRepository,
}

impl Repos {
    pub fn new() -> Self {
        let db = Database::new();
        Self {
            orgs: OrganizationRepository::new(db.clone()),
            currencies: CurrencyRepository::new(db.clone()),
            chart: ChartRepository::new(db.clone()),
            journal: JournalRepository::new(db.clone()),
            reports: ReportRepository::new(db.clone()),
            fiscal: FiscalRepository::new(db.clone()),
            inflation: InflationRepository::new(db.clone()),
            db,
        }
    }
}

/// The ACME organization: `ARS` default, accounts 1.1 Caja and 1.2 Resultados
/// (balancing results) under root category 1, and the 2024 period.
pub struct Acme {
    pub repos: Repos,
    pub org: OrganizationId,
    pub ars: CurrencyId,
    pub assets: NodeId,
    pub caja: NodeId,
    pub resultados: NodeId,
    pub period: FiscalPeriod,
}

pub fn acme() -> Acme {
    let repos = Repos::new();
    let org = repos
        .orgs
        .create(CreateOrganizationInput {
            tax_id: "20-111-0".into(),
            name: "ACME".into(),
        })
        .unwrap()
        .id;
    let ars = repos
        .currencies
        .create(org, currency("ARS", "$", true))
        .unwrap()
        .id;
    let assets = category(&repos, org, None, 1, "Activo", false);
    let caja = account(&repos, org, assets, 1, "Caja", AccountFlags::plain(ars));
    let resultados = account(
        &repos,
        org,
        assets,
        2,
        "Resultados",
        AccountFlags {
            balances_results: true,
            ..AccountFlags::plain(ars)
        },
    );
    let period = repos
        .fiscal
        .create_next(org, year(2024), false)
        .unwrap();

    Acme {
        repos,
        org,
        ars,
        assets,
        caja,
        resultados,
        period,
    }
}

pub fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

pub fn year(y: i32) -> PeriodInput {
    PeriodInput {
        start: date(y, 1, 1),
        end: date(y, 12, 31),
    }
}

pub fn currency(code: &str, symbol: &str, adjustable: bool) -> CurrencyInput {
    CurrencyInput {
        name: format!("Currency {code}"),
        symbol: symbol.into(),
        code: code.into(),
        is_default: false,
        adjustable,
    }
}

pub fn category(
    repos: &Repos,
    org: OrganizationId,
    parent: Option<NodeId>,
    number: u16,
    description: &str,
    is_result: bool,
) -> NodeId {
    repos
        .chart
        .create(
            org,
            CreateNodeInput {
                parent_id: parent,
                number,
                description: description.into(),
                alias: None,
                legacy_code: None,
                kind: NodeKind::Category { is_result },
            },
        )
        .unwrap()
        .node
        .id
}

pub fn account(
    repos: &Repos,
    org: OrganizationId,
    parent: NodeId,
    number: u16,
    description: &str,
    flags: AccountFlags,
) -> NodeId {
    repos
        .chart
        .create(
            org,
            CreateNodeInput {
                parent_id: Some(parent),
                number,
                description: description.into(),
                alias: None,
                legacy_code: None,
                kind: NodeKind::Account(flags),
            },
        )
        .unwrap()
        .node
        .id
}

pub fn entry(on: NaiveDate, description: &str, lines: &[(NodeId, Decimal)]) -> EntryInput {
    EntryInput {
        date: on,
        description: description.into(),
        postings: lines
            .iter()
            .map(|(account, amount)| PostingInput::new(*account, *amount, description))
            .collect(),
        version: 0,
    }
}

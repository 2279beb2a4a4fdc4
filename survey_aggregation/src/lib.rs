//! Aggregation engine for per-leader survey favorability reports.
//!
//! The input is a survey cycle's worth of tabular extracts: the item and
//! category metadata, the raw Likert responses for the current and prior
//! cycles, the employee rosters with the flattened supervisor chain, the
//! external benchmark values and the heatmap color table. From these the
//! engine produces, for any leader in the hierarchy, a report of favorable
//! ratios per item and category, cut by demographic cohorts and colored by
//! the distance to the relevant reference population.
//!
//! The main entry points are [build_dataset], which parses and indexes the
//! extracts once, and [run_leader_report] / [run_batch], which produce
//! [LeaderReport] values from it. All small-population cells are suppressed
//! below [MIN_CELL_SIZE] respondents, at every level of the report.

use std::collections::{HashMap, HashSet};

use log::{info, warn};

mod aggregate;
mod catalog;
mod cohort;
mod config;
mod hierarchy;
mod normalize;
mod report;

pub use crate::aggregate::{aggregate_category, CategoryAggregate};
pub use crate::catalog::{
    BenchmarkEligibility, CategoryBlock, CategoryRecord, ItemCatalog, ItemRecord, PairMerge,
    SurveyItem, REPORT_ITEM_TYPE,
};
pub use crate::cohort::{partition, Cohort, CohortGroup, PERFORMANCE_ORDER};
pub use crate::config::*;
pub use crate::hierarchy::{
    resolve, supervisor_column, AffiliateMode, GmLevels, HierarchyContext, LeaderKind, LeaderSpec,
    ResolveOptions, Roster, INVITEE_FLAG, WORKER_ID, WORKER_LAST_NAME, WORKER_NAME,
};
pub use crate::normalize::{
    Bucket, RecodeScheme, ResponseTable, EXTERNAL_REFERENCE, METADATA_ROWS,
};
pub use crate::report::{
    delta_points, ColumnPlan, ColumnSource, HeatmapPalette, LeaderReport, ReportCell,
    ReportColumn, ReportLayout, ReportRow, ReportSection, ResultAccumulator, Rgb, RowKind, Slot,
    HEAT_RANGE,
};

use crate::cohort::KITE_FLAG;

/// The raw extract tables of one survey cycle, as read from disk.
pub struct DatasetInputs {
    pub items: Table,
    pub categories: Table,
    pub responses: Table,
    pub responses_past: Table,
    pub roster: Table,
    pub roster_past: Table,
    /// Columns `Unique Item Code` and `Favorable`.
    pub benchmark: Table,
    pub heatmap_colors: Table,
    pub gm_levels: Option<Table>,
    pub current_year: String,
    pub past_year: String,
}

/// The parsed and indexed dataset, shared by every leader run.
#[derive(Debug)]
pub struct SurveyDataset {
    catalog: ItemCatalog,
    responses: ResponseTable,
    responses_past: ResponseTable,
    roster: Roster,
    roster_past: Roster,
    benchmark: HashMap<String, f64>,
    gm_levels: Option<GmLevels>,
    palette: HeatmapPalette,
    current_year: String,
    past_year: String,
}

impl SurveyDataset {
    pub fn catalog(&self) -> &ItemCatalog {
        &self.catalog
    }

    pub fn roster(&self) -> &Roster {
        &self.roster
    }
}

pub fn build_dataset(inputs: DatasetInputs) -> Result<SurveyDataset, ReportError> {
    let item_records = ItemRecord::from_table(&inputs.items)?;
    let category_records = CategoryRecord::from_table(&inputs.categories)?;
    let current_columns: HashSet<String> = inputs.responses.headers.iter().cloned().collect();
    let past_columns: HashSet<String> = inputs.responses_past.headers.iter().cloned().collect();
    let catalog = ItemCatalog::resolve(
        &item_records,
        &category_records,
        &current_columns,
        &past_columns,
    );

    let codes: Vec<String> = catalog.items().iter().map(|i| i.code.clone()).collect();
    let responses = ResponseTable::from_raw(
        &inputs.responses,
        &codes,
        catalog.pair_merges(),
        RecodeScheme::TwoWay,
    )?;
    let past_codes: Vec<String> = codes
        .iter()
        .filter_map(|c| catalog.past_code(c))
        .map(str::to_string)
        .collect();
    let responses_past = ResponseTable::from_raw(
        &inputs.responses_past,
        &past_codes,
        &[],
        RecodeScheme::TwoWay,
    )?;

    let roster = Roster::from_table(inputs.roster)?;
    let roster_past = Roster::from_table(inputs.roster_past)?;

    let code_col = inputs.benchmark.require("Unique Item Code")?;
    let fav_col = inputs.benchmark.require("Favorable")?;
    let mut benchmark = HashMap::new();
    for row in 0..inputs.benchmark.rows.len() {
        let code = inputs.benchmark.cell(row, code_col).display();
        match inputs.benchmark.cell(row, fav_col).as_f64() {
            Some(v) => {
                benchmark.insert(code, v);
            }
            None => warn!("benchmark row for {:?} has no favorable value", code),
        }
    }

    let palette = HeatmapPalette::from_table(&inputs.heatmap_colors)?;
    let gm_levels = match inputs.gm_levels {
        Some(t) => Some(GmLevels::from_table(t)?),
        None => None,
    };

    info!(
        "dataset ready: {} items in {} categories, {} current respondents, {} on the roster",
        catalog.items().len(),
        catalog.categories().len(),
        responses.respondents().len(),
        roster.len()
    );
    Ok(SurveyDataset {
        catalog,
        responses,
        responses_past,
        roster,
        roster_past,
        benchmark,
        gm_levels,
        palette,
        current_year: inputs.current_year,
        past_year: inputs.past_year,
    })
}

fn worker_ids(roster: &Roster, rows: &[usize]) -> Vec<u64> {
    rows.iter().filter_map(|&r| roster.worker_id(r)).collect()
}

fn fill_current(
    acc: &mut ResultAccumulator,
    ds: &SurveyDataset,
    section: usize,
    column: usize,
    ids: &[u64],
) {
    for block in ds.catalog.categories() {
        let agg = aggregate_category(&ds.responses, &block.item_codes, ids);
        acc.set(section, column, &block.name, Slot::Cell(agg.category_cell));
        for (code, cell) in agg.item_cells {
            acc.set(section, column, &code, Slot::Cell(cell));
        }
    }
    let count = ids.iter().filter(|r| ds.responses.contains(**r)).count();
    acc.set_count(section, column, count);
}

fn fill_past(
    acc: &mut ResultAccumulator,
    ds: &SurveyDataset,
    section: usize,
    column: usize,
    past_ids: &[u64],
) {
    for block in ds.catalog.categories() {
        // Only items carried over from the prior cycle take part; the
        // category cell is computed over that translated subset.
        let pairs: Vec<(String, String)> = block
            .item_codes
            .iter()
            .filter_map(|c| ds.catalog.past_code(c).map(|p| (c.clone(), p.to_string())))
            .collect();
        let translated: Vec<String> = pairs.iter().map(|(_, p)| p.clone()).collect();
        let agg = aggregate_category(&ds.responses_past, &translated, past_ids);
        acc.set(section, column, &block.name, Slot::Cell(agg.category_cell));
        for (current, past) in pairs {
            let cell = agg
                .item_cells
                .get(&past)
                .copied()
                .unwrap_or(FavorabilityCell::Na);
            acc.set(section, column, &current, Slot::Cell(cell));
        }
    }
    let count = past_ids
        .iter()
        .filter(|r| ds.responses_past.contains(**r))
        .count();
    acc.set_count(section, column, count);
}

fn fill_benchmark(acc: &mut ResultAccumulator, ds: &SurveyDataset, section: usize, column: usize) {
    for block in ds.catalog.categories() {
        let mut values: Vec<Option<f64>> = Vec::new();
        for code in block.item_codes.iter() {
            let v = ds
                .catalog
                .benchmark_code(code)
                .and_then(|b| ds.benchmark.get(b))
                .copied();
            acc.set(section, column, code, Slot::Raw(v));
            values.push(v);
        }
        // The category reference only exists when every member item has
        // one.
        let category = if !values.is_empty() && values.iter().all(|v| v.is_some()) {
            let sum: f64 = values.iter().flatten().sum();
            Some(sum / values.len() as f64)
        } else {
            None
        };
        acc.set(section, column, &block.name, Slot::Raw(category));
    }
}

fn fill_complement(
    acc: &mut ResultAccumulator,
    ds: &SurveyDataset,
    ctx: &HierarchyContext,
    section: usize,
    column: usize,
    your_ids: &[u64],
    all_ids: &[u64],
) {
    // On the company run the only meaningful complement is the affiliate
    // split; everywhere else the org is compared to the company at large.
    let (a_ids, b_ids): (Vec<u64>, Vec<u64>) = if ctx.logic == 1 {
        let kite: Vec<u64> = worker_ids(
            &ds.roster,
            &ds.roster
                .rows()
                .filter(|&r| ds.roster.invited(r) && ds.roster.flag(r, KITE_FLAG))
                .collect::<Vec<usize>>(),
        );
        let rest: Vec<u64> = worker_ids(
            &ds.roster,
            &ds.roster
                .rows()
                .filter(|&r| ds.roster.invited(r) && !ds.roster.flag(r, KITE_FLAG))
                .collect::<Vec<usize>>(),
        );
        (kite, rest)
    } else {
        (your_ids.to_vec(), all_ids.to_vec())
    };
    for block in ds.catalog.categories() {
        let a = aggregate_category(&ds.responses, &block.item_codes, &a_ids);
        let b = aggregate_category(&ds.responses, &block.item_codes, &b_ids);
        let diff = |x: FavorabilityCell, y: FavorabilityCell| -> Option<f64> {
            Some(x.ratio()? - y.ratio()?)
        };
        acc.set(
            section,
            column,
            &block.name,
            Slot::Raw(diff(a.category_cell, b.category_cell)),
        );
        for code in block.item_codes.iter() {
            let d = match (a.item_cells.get(code), b.item_cells.get(code)) {
                (Some(&x), Some(&y)) => diff(x, y),
                _ => None,
            };
            acc.set(section, column, code, Slot::Raw(d));
        }
    }
}

/// Runs the full report for one leader.
pub fn run_leader_report(
    ds: &SurveyDataset,
    spec: &LeaderSpec,
    opts: &ResolveOptions,
) -> Result<LeaderReport, ReportError> {
    let ctx = resolve(
        &ds.roster,
        &ds.responses,
        &ds.roster_past,
        &ds.responses_past,
        ds.gm_levels.as_ref(),
        spec,
        opts,
    )?;
    let groups = partition(&ctx, &ds.roster, ds.gm_levels.as_ref());
    let layout = ReportLayout::new(&ctx, &groups, &ds.catalog, &ds.past_year);
    let mut acc = ResultAccumulator::new(layout);

    let all_rows: Vec<usize> = ds.roster.rows().filter(|&r| ds.roster.invited(r)).collect();
    let all_ids = worker_ids(&ds.roster, &all_rows);
    let your_ids = worker_ids(&ds.roster, &ctx.your_org);
    let past_ids = worker_ids(&ds.roster_past, &ctx.your_org_past);

    let plans = acc.layout().sections.clone();
    for (si, plan) in plans.iter().enumerate() {
        for (ci, col) in plan.columns.iter().enumerate() {
            match &col.source {
                ColumnSource::Company => fill_current(&mut acc, ds, si, ci, &all_ids),
                ColumnSource::Current(rows) => {
                    let ids = worker_ids(&ds.roster, rows);
                    fill_current(&mut acc, ds, si, ci, &ids);
                }
                ColumnSource::Past => fill_past(&mut acc, ds, si, ci, &past_ids),
                ColumnSource::Benchmark => fill_benchmark(&mut acc, ds, si, ci),
                ColumnSource::Complement => {
                    fill_complement(&mut acc, ds, &ctx, si, ci, &your_ids, &all_ids)
                }
            }
        }
    }

    let invited = ctx.invited;
    let participated = your_ids.len();
    info!(
        "leader {}: {} of {} invited participated, {} sections",
        ctx.leader_id,
        participated,
        invited,
        acc.layout().sections.len()
    );
    Ok(acc.finalize(
        &ctx,
        &ds.palette,
        &ds.current_year,
        &ds.past_year,
        invited,
        participated,
    ))
}

/// A leader that produced no report, with the reason.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SkippedLeader {
    pub leader_id: u64,
    pub reason: ReportError,
}

#[derive(Debug)]
pub struct BatchResult {
    pub reports: Vec<LeaderReport>,
    pub skipped: Vec<SkippedLeader>,
}

/// Runs the report for every requested leader. Per-leader resolution
/// failures are recorded and the batch keeps going; malformed input data
/// aborts the run.
pub fn run_batch(
    ds: &SurveyDataset,
    specs: &[LeaderSpec],
    opts: &ResolveOptions,
) -> Result<BatchResult, ReportError> {
    let mut reports = Vec::new();
    let mut skipped = Vec::new();
    for spec in specs.iter() {
        match run_leader_report(ds, spec, opts) {
            Ok(report) => reports.push(report),
            Err(err) if err.is_fatal() => return Err(err),
            Err(err) => {
                warn!("skipping leader {}: {}", spec.leader_id(), err);
                skipped.push(SkippedLeader {
                    leader_id: spec.leader_id(),
                    reason: err,
                });
            }
        }
    }
    info!(
        "batch done: {} reports, {} leaders skipped",
        reports.len(),
        skipped.len()
    );
    Ok(BatchResult { reports, skipped })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn text_row(values: &[&str]) -> Vec<Cell> {
        values.iter().map(|v| Cell::Text(v.to_string())).collect()
    }

    fn items_table() -> Table {
        let mut t = Table::new(
            "items",
            vec![
                "Unique Item Code".to_string(),
                "Item ID".to_string(),
                "Type ID".to_string(),
                "Short Text".to_string(),
                "AB Code".to_string(),
                "External Benchmark".to_string(),
            ],
        );
        t.push_row(text_row(&["Q1", "I1", "T01", "I like it here", "", "i"]));
        t.push_row(text_row(&["Q2", "I2", "T01", "I am growing", "", "i"]));
        t.push_row(text_row(&["B1", "I1", "T01", "bench", "", "e"]));
        t
    }

    fn categories_table() -> Table {
        let mut t = Table::new(
            "categories",
            vec!["Item ID".to_string(), "Category".to_string()],
        );
        t.push_row(text_row(&["I1", "Engagement"]));
        t.push_row(text_row(&["I2", "Engagement"]));
        t
    }

    fn responses_table(name: &str, answers: &[(u64, i64, i64)]) -> Table {
        let mut t = Table::new(
            name,
            vec![
                EXTERNAL_REFERENCE.to_string(),
                "Q1".to_string(),
                "Q2".to_string(),
            ],
        );
        for _ in 0..METADATA_ROWS {
            t.push_row(text_row(&["meta", "meta", "meta"]));
        }
        for &(r, q1, q2) in answers.iter() {
            t.push_row(vec![
                Cell::Int(r as i64),
                Cell::Int(q1),
                Cell::Int(q2),
            ]);
        }
        t
    }

    fn roster_table() -> Table {
        let mut t = Table::new(
            "roster",
            vec![
                WORKER_ID.to_string(),
                WORKER_NAME.to_string(),
                WORKER_LAST_NAME.to_string(),
                INVITEE_FLAG.to_string(),
                "Supervisor Level 2 ID".to_string(),
            ],
        );
        for id in 10..18 {
            t.push_row(vec![
                Cell::Int(id),
                Cell::Text(format!("First{}", id)),
                Cell::Text(format!("Last{}", id)),
                Cell::Int(1),
                Cell::Int(5),
            ]);
        }
        t
    }

    fn palette_table() -> Table {
        let mut t = Table::new(
            "colors",
            vec![
                "Delta".to_string(),
                "R".to_string(),
                "G".to_string(),
                "B".to_string(),
            ],
        );
        for d in -HEAT_RANGE..=HEAT_RANGE {
            t.push_row(vec![
                Cell::Int(d),
                Cell::Int((d + HEAT_RANGE) as i64),
                Cell::Int(0),
                Cell::Int(0),
            ]);
        }
        t
    }

    fn benchmark_table() -> Table {
        let mut t = Table::new(
            "benchmark",
            vec!["Unique Item Code".to_string(), "Favorable".to_string()],
        );
        t.push_row(vec![Cell::Text("B1".to_string()), Cell::Float(0.75)]);
        t
    }

    fn dataset() -> SurveyDataset {
        let answers: Vec<(u64, i64, i64)> =
            (10..18).map(|r| (r as u64, 5, if r % 2 == 0 { 4 } else { 2 })).collect();
        let past_answers: Vec<(u64, i64, i64)> =
            vec![(10, 5, 4), (11, 2, 4), (12, 2, 4), (13, 2, 4)];
        build_dataset(DatasetInputs {
            items: items_table(),
            categories: categories_table(),
            responses: responses_table("responses", &answers),
            responses_past: responses_table("responses past", &past_answers),
            roster: roster_table(),
            roster_past: roster_table(),
            benchmark: benchmark_table(),
            heatmap_colors: palette_table(),
            gm_levels: None,
            current_year: "2022".to_string(),
            past_year: "2020".to_string(),
        })
        .unwrap()
    }

    #[test]
    fn leader_report_end_to_end() {
        let ds = dataset();
        let report = run_leader_report(
            &ds,
            &LeaderSpec::Worker(5),
            &ResolveOptions::default(),
        )
        .unwrap();

        assert_eq!(report.org_name, "Leader 5");
        assert_eq!(report.invited, 8);
        assert_eq!(report.participated, 8);
        // Category row first, then its items.
        assert_eq!(report.rows[0].kind, RowKind::Category);
        assert_eq!(report.rows.len(), 3);

        let overall = &report.sections[0];
        assert_eq!(overall.dimension, Dimension::Overall);
        // Logic 2: company plus the org itself, which here coincide.
        assert_eq!(overall.columns.len(), 2);
        let q1 = report
            .rows
            .iter()
            .position(|r| r.key == "Q1")
            .unwrap();
        assert_eq!(overall.columns[1].cells[q1].value, Some(1.0));
        let q2 = report.rows.iter().position(|r| r.key == "Q2").unwrap();
        assert_eq!(overall.columns[1].cells[q2].value, Some(0.5));
        // Every respondent answered both items; per-respondent means are
        // 1.0 for the even half and 0.5 for the odd half.
        let cat = report
            .rows
            .iter()
            .position(|r| r.key == "Engagement")
            .unwrap();
        assert_eq!(overall.columns[1].cells[cat].value, Some(0.75));
    }

    #[test]
    fn comparison_block_carries_past_and_benchmark() {
        let ds = dataset();
        let report = run_leader_report(
            &ds,
            &LeaderSpec::Worker(5),
            &ResolveOptions::default(),
        )
        .unwrap();
        let delta = report
            .sections
            .iter()
            .find(|s| s.dimension == Dimension::Delta)
            .unwrap();
        assert_eq!(delta.columns.len(), 3);
        let q1 = report.rows.iter().position(|r| r.key == "Q1").unwrap();
        // Prior cycle: one in four answered Q1 favorably, so the column
        // shows the change, 1.0 - 0.25.
        assert_eq!(delta.columns[0].cells[q1].value, Some(0.75));
        assert_eq!(delta.columns[0].respondents, Some(4));
        // The benchmark maps through the external code B1 and is also
        // published as a difference, 1.0 - 0.75.
        assert_eq!(delta.columns[1].cells[q1].value, Some(0.25));
        let q2 = report.rows.iter().position(|r| r.key == "Q2").unwrap();
        // Everyone answered Q2 favorably last cycle; the org's 0.5 shows
        // as a drop.
        assert_eq!(delta.columns[0].cells[q2].value, Some(-0.5));
        // No benchmark row for Q2's item id.
        assert_eq!(delta.columns[1].cells[q2].value, None);
        // The org is the whole company here, so the complement is zero.
        assert_eq!(delta.columns[2].cells[q1].value, Some(0.0));
    }

    #[test]
    fn batch_records_skips_and_continues() {
        let ds = dataset();
        let specs = vec![
            LeaderSpec::Worker(404),
            LeaderSpec::Worker(5),
        ];
        let batch = run_batch(&ds, &specs, &ResolveOptions::default()).unwrap();
        assert_eq!(batch.reports.len(), 1);
        assert_eq!(batch.skipped.len(), 1);
        assert_eq!(
            batch.skipped[0],
            SkippedLeader {
                leader_id: 404,
                reason: ReportError::HierarchyResolution { leader_id: 404 },
            }
        );
    }

    #[test]
    fn malformed_metadata_aborts_the_batch() {
        let mut items = items_table();
        items.headers[0] = "Code".to_string();
        let err = build_dataset(DatasetInputs {
            items,
            categories: categories_table(),
            responses: responses_table("responses", &[]),
            responses_past: responses_table("responses past", &[]),
            roster: roster_table(),
            roster_past: roster_table(),
            benchmark: benchmark_table(),
            heatmap_colors: palette_table(),
            gm_levels: None,
            current_year: "2022".to_string(),
            past_year: "2020".to_string(),
        })
        .unwrap_err();
        assert!(err.is_fatal());
        assert!(matches!(err, ReportError::DataShape { .. }));
    }
}

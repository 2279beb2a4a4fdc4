use log::{debug, info, warn};

use snafu::{prelude::*, Snafu};
use survey_aggregation::*;

use std::fs;
use std::path::Path;

use indicatif::{ProgressBar, ProgressStyle};
use serde_json::json;
use serde_json::Value as JSValue;
use text_diff::print_diff;

use crate::driver::config_reader::*;

pub mod config_reader;
pub mod io_csv;
pub mod io_excel;

#[derive(Debug, Snafu)]
pub enum DriverError {
    #[snafu(display("Error opening workbook {path}"))]
    OpeningExcel {
        source: calamine::XlsxError,
        path: String,
    },
    #[snafu(display("No usable worksheet in {path}"))]
    EmptyExcel { path: String },
    #[snafu(display("Error reading CSV file {path}"))]
    ReadingCsv { source: csv::Error, path: String },
    #[snafu(display("Error opening {path}"))]
    OpeningJson {
        source: std::io::Error,
        path: String,
    },
    #[snafu(display(""))]
    ParsingJson { source: serde_json::Error },
    #[snafu(display("Error writing {path}"))]
    WritingOutput {
        source: std::io::Error,
        path: String,
    },
    #[snafu(display(""))]
    MissingParentDir {},
    #[snafu(display("Unsupported input extension for {path}"))]
    UnknownExtension { path: String },
    #[snafu(display("Input data cannot be aggregated"))]
    Aggregation { source: ReportError },

    #[snafu(whatever, display("{message}"))]
    Whatever {
        message: String,
        #[snafu(source(from(Box<dyn std::error::Error>, Some)))]
        source: Option<Box<dyn std::error::Error>>,
    },
}

pub type DriverResult<T> = Result<T, DriverError>;

/// Reads one input table, picking the reader from the file extension.
fn read_input(root: &Path, fref: &FileRef, name: &str) -> DriverResult<Table> {
    let p = root.join(&fref.file_path);
    let path = p.as_path().display().to_string();
    info!("Attempting to read input table {:?} from {:?}", name, path);
    match p.extension().and_then(|e| e.to_str()) {
        Some("xlsx") | Some("xlsm") => {
            io_excel::read_table(path, fref.worksheet_name.as_deref(), name)
        }
        Some("csv") => io_csv::read_table(path, name),
        _ => UnknownExtensionSnafu { path }.fail(),
    }
}

fn rgb_hex(c: &Rgb) -> String {
    format!("{:02X}{:02X}{:02X}", c.r, c.g, c.b)
}

pub fn report_to_json(report: &LeaderReport) -> JSValue {
    let rows: Vec<JSValue> = report
        .rows
        .iter()
        .map(|r| {
            json!({
                "kind": match r.kind {
                    RowKind::Category => "category",
                    RowKind::Item => "item",
                },
                "key": r.key,
                "label": r.label,
            })
        })
        .collect();
    let sections: Vec<JSValue> = report
        .sections
        .iter()
        .map(|s| {
            let columns: Vec<JSValue> = s
                .columns
                .iter()
                .map(|c| {
                    let cells: Vec<JSValue> = c
                        .cells
                        .iter()
                        .map(|cell| {
                            json!({
                                "value": cell.value,
                                "color": cell.heat.map(|h| rgb_hex(&h)),
                            })
                        })
                        .collect();
                    json!({
                        "label": c.label,
                        "respondents": c.respondents,
                        "cells": cells,
                    })
                })
                .collect();
            json!({ "title": s.title, "columns": columns })
        })
        .collect();
    json!({
        "leaderId": report.leader_id,
        "orgName": report.org_name,
        "currentYear": report.current_year,
        "pastYear": report.past_year,
        "invited": report.invited,
        "participated": report.participated,
        "rows": rows,
        "sections": sections,
    })
}

fn skipped_to_json(skipped: &[SkippedLeader]) -> Vec<JSValue> {
    skipped
        .iter()
        .map(|s| {
            json!({
                "leaderId": s.leader_id,
                "reason": s.reason.to_string(),
            })
        })
        .collect()
}

fn read_dataset(config: &RunConfig, root: &Path) -> DriverResult<SurveyDataset> {
    let files = &config.input_files;
    let gm_levels = match &files.gm_levels {
        Some(f) => Some(read_input(root, f, "gm levels")?),
        None => None,
    };
    let inputs = DatasetInputs {
        items: read_input(root, &files.items, "items")?,
        categories: read_input(root, &files.categories, "categories")?,
        responses: read_input(root, &files.responses, "responses")?,
        responses_past: read_input(root, &files.responses_past, "responses past")?,
        roster: read_input(root, &files.roster, "roster")?,
        roster_past: read_input(root, &files.roster_past, "roster past")?,
        benchmark: read_input(root, &files.benchmark, "benchmark")?,
        heatmap_colors: read_input(root, &files.heatmap_colors, "heatmap colors")?,
        gm_levels,
        current_year: config.settings.current_year.clone(),
        past_year: config.settings.past_year.clone(),
    };
    build_dataset(inputs).context(AggregationSnafu {})
}

fn resolve_options(settings: &RunSettings) -> DriverResult<ResolveOptions> {
    let affiliate = match settings.affiliate_levels {
        None => None,
        Some(1) => Some(AffiliateMode::OneLevel),
        Some(2) => Some(AffiliateMode::TwoLevels),
        Some(x) => whatever!("affiliateLevels must be 1 or 2, found {:?}", x),
    };
    Ok(ResolveOptions {
        company_sentinel: COMPANY_SENTINEL,
        gm_region_parent: settings.gm_region_parent.unwrap_or(false),
        affiliate,
    })
}

pub fn run_reports(
    config_path: String,
    out_path: Option<String>,
    check_summary_path: Option<String>,
) -> DriverResult<()> {
    let config_p = Path::new(config_path.as_str());
    let config_str = fs::read_to_string(config_path.clone()).context(OpeningJsonSnafu {
        path: config_path.clone(),
    })?;
    let config: RunConfig = serde_json::from_str(&config_str).context(ParsingJsonSnafu {})?;
    info!("config: {:?}", config);

    let root_p = config_p.parent().context(MissingParentDirSnafu {})?;
    let ds = read_dataset(&config, root_p)?;
    let opts = resolve_options(&config.settings)?;

    let specs = config
        .leaders
        .iter()
        .map(|l| l.to_spec())
        .collect::<DriverResult<Vec<LeaderSpec>>>()?;
    if specs.is_empty() {
        whatever!("no leaders listed in the configuration");
    }

    let pb = ProgressBar::new(specs.len() as u64);
    if let Ok(style) = ProgressStyle::with_template("{bar:40} {pos}/{len} {msg}") {
        pb.set_style(style);
    }
    let mut reports: Vec<LeaderReport> = Vec::new();
    let mut skipped: Vec<SkippedLeader> = Vec::new();
    for spec in specs.iter() {
        pb.set_message(format!("leader {}", spec.leader_id()));
        match run_leader_report(&ds, spec, &opts) {
            Ok(report) => reports.push(report),
            Err(err) if err.is_fatal() => {
                pb.abandon();
                return Err(err).context(AggregationSnafu {});
            }
            Err(err) => {
                warn!("skipping leader {}: {}", spec.leader_id(), err);
                skipped.push(SkippedLeader {
                    leader_id: spec.leader_id(),
                    reason: err,
                });
            }
        }
        pb.inc(1);
    }
    pb.finish_and_clear();
    info!(
        "run finished: {} reports, {} leaders skipped",
        reports.len(),
        skipped.len()
    );

    // One file per leader when an output directory is configured, plus the
    // list of leaders that produced nothing.
    if let Some(dir) = &config.settings.output_directory {
        let dir_p = root_p.join(dir);
        fs::create_dir_all(&dir_p).context(WritingOutputSnafu {
            path: dir_p.as_path().display().to_string(),
        })?;
        for report in reports.iter() {
            let file = dir_p.join(format!("{} {}.json", report.file_label, report.current_year));
            let pretty = serde_json::to_string_pretty(&report_to_json(report))
                .context(ParsingJsonSnafu {})?;
            debug!("writing report for leader {} to {:?}", report.leader_id, file);
            fs::write(&file, pretty).context(WritingOutputSnafu {
                path: file.as_path().display().to_string(),
            })?;
        }
        let skipped_file = dir_p.join("skipped.json");
        let pretty = serde_json::to_string_pretty(&JSValue::Array(skipped_to_json(&skipped)))
            .context(ParsingJsonSnafu {})?;
        fs::write(&skipped_file, pretty).context(WritingOutputSnafu {
            path: skipped_file.as_path().display().to_string(),
        })?;
    }

    // Assemble the final json
    let summary_js = json!({
        "currentYear": config.settings.current_year,
        "pastYear": config.settings.past_year,
        "reports": reports.iter().map(report_to_json).collect::<Vec<JSValue>>(),
        "skipped": skipped_to_json(&skipped),
    });
    let pretty_js_summary = serde_json::to_string_pretty(&summary_js).context(ParsingJsonSnafu {})?;
    match out_path.as_deref() {
        Some("stdout") | None => println!("summary:{}", pretty_js_summary),
        Some(p) => fs::write(p, &pretty_js_summary).context(WritingOutputSnafu {
            path: p.to_string(),
        })?,
    }

    // The reference summary, if provided for comparison
    if let Some(summary_p) = check_summary_path {
        let ref_str = fs::read_to_string(summary_p.clone()).context(OpeningJsonSnafu {
            path: summary_p,
        })?;
        let summary_ref: JSValue = serde_json::from_str(&ref_str).context(ParsingJsonSnafu {})?;
        let pretty_js_summary_ref =
            serde_json::to_string_pretty(&summary_ref).context(ParsingJsonSnafu {})?;
        if pretty_js_summary_ref != pretty_js_summary {
            warn!("Found differences with the reference string");
            print_diff(
                pretty_js_summary_ref.as_str(),
                pretty_js_summary.as_ref(),
                "\n",
            );
            whatever!("Difference detected between calculated summary and reference summary");
        }
    }

    Ok(())
}

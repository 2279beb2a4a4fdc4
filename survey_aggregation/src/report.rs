//! Report assembly: column layout, suppression, and heat coloring.
//!
//! The layout is computed up front from the resolved hierarchy and the
//! cohort partition; the accumulator then collects one favorability slot
//! per (section, column, row) and the finalization step applies the two
//! suppression passes and the heat color chain.

use std::collections::HashMap;

use log::debug;

use crate::catalog::ItemCatalog;
use crate::cohort::CohortGroup;
use crate::config::*;
use crate::hierarchy::HierarchyContext;

/// How far a delta reaches into the palette, in favorability points.
pub const HEAT_RANGE: i64 = 25;

#[derive(Eq, PartialEq, Debug, Clone, Copy)]
pub struct Rgb {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

/// The delta-to-color lookup table.
#[derive(Debug, Clone, Default)]
pub struct HeatmapPalette {
    colors: HashMap<i64, Rgb>,
}

impl HeatmapPalette {
    pub fn from_table(table: &Table) -> Result<HeatmapPalette, ReportError> {
        let delta = table.require("Delta")?;
        let r = table.require("R")?;
        let g = table.require("G")?;
        let b = table.require("B")?;
        let mut colors = HashMap::new();
        for row in 0..table.rows.len() {
            let key = table
                .cell(row, delta)
                .as_f64()
                .ok_or_else(|| ReportError::DataShape {
                    table: table.name.clone(),
                    column: "Delta".to_string(),
                })? as i64;
            let channel = |col: usize| -> Result<u8, ReportError> {
                table
                    .cell(row, col)
                    .as_f64()
                    .map(|v| v as u8)
                    .ok_or_else(|| ReportError::DataShape {
                        table: table.name.clone(),
                        column: "R".to_string(),
                    })
            };
            colors.insert(
                key,
                Rgb {
                    r: channel(r)?,
                    g: channel(g)?,
                    b: channel(b)?,
                },
            );
        }
        Ok(HeatmapPalette { colors })
    }

    /// The color for a delta in points, clamped to the palette range.
    pub fn color_for(&self, points: i64) -> Option<Rgb> {
        let clamped = points.max(-HEAT_RANGE).min(HEAT_RANGE);
        self.colors.get(&clamped).copied()
    }
}

/// A delta in whole favorability points. Ties round to the even point.
pub fn delta_points(value: f64, reference: f64) -> i64 {
    ((value - reference) * 100.0).round_ties_even() as i64
}

/// Where a column's numbers come from.
#[derive(Eq, PartialEq, Debug, Clone)]
pub enum ColumnSource {
    /// Aggregate of the whole current-cycle response population.
    Company,
    /// Aggregate over these roster rows of the current cycle.
    Current(Vec<usize>),
    /// The prior-cycle aggregate of the leader's org, via translated codes.
    Past,
    /// The external benchmark values.
    Benchmark,
    /// The org-vs-rest-of-company difference, written as a delta.
    Complement,
}

#[derive(Debug, Clone)]
pub struct ColumnPlan {
    pub label: String,
    pub source: ColumnSource,
}

#[derive(Debug, Clone)]
pub struct SectionPlan {
    pub dimension: Dimension,
    pub title: String,
    pub columns: Vec<ColumnPlan>,
}

#[derive(Eq, PartialEq, Debug, Clone, Copy)]
pub enum RowKind {
    Category,
    Item,
}

/// One row of the report body, shared by every section.
#[derive(Eq, PartialEq, Debug, Clone)]
pub struct ReportRow {
    pub kind: RowKind,
    /// Category name for category rows, item code for item rows.
    pub key: String,
    pub label: String,
}

/// The full column layout of one leader's report.
#[derive(Debug, Clone)]
pub struct ReportLayout {
    pub rows: Vec<ReportRow>,
    pub sections: Vec<SectionPlan>,
}

impl ReportLayout {
    pub fn new(
        ctx: &HierarchyContext,
        groups: &[CohortGroup],
        catalog: &ItemCatalog,
        past_year: &str,
    ) -> ReportLayout {
        let mut rows = Vec::new();
        for block in catalog.categories() {
            rows.push(ReportRow {
                kind: RowKind::Category,
                key: block.name.clone(),
                label: block.name.clone(),
            });
            for code in block.item_codes.iter() {
                if let Some(item) = catalog.item(code) {
                    rows.push(ReportRow {
                        kind: RowKind::Item,
                        key: code.clone(),
                        label: item.text.clone(),
                    });
                }
            }
        }

        let mut overall = vec![ColumnPlan {
            label: "Company Overall".to_string(),
            source: ColumnSource::Company,
        }];
        if ctx.logic >= 3 {
            if let (Some(parent), Some(label)) = (&ctx.parent_org, &ctx.parent_label) {
                overall.push(ColumnPlan {
                    label: format!("{} Org", label),
                    source: ColumnSource::Current(parent.clone()),
                });
            }
        }
        if ctx.logic >= 2 {
            overall.push(ColumnPlan {
                label: format!("{} Org", ctx.org_name),
                source: ColumnSource::Current(ctx.your_org.clone()),
            });
        }

        let delta = SectionPlan {
            dimension: Dimension::Delta,
            title: Dimension::Delta.title().to_string(),
            columns: vec![
                ColumnPlan {
                    label: format!("{} Survey", past_year),
                    source: ColumnSource::Past,
                },
                ColumnPlan {
                    label: "External Benchmark".to_string(),
                    source: ColumnSource::Benchmark,
                },
                ColumnPlan {
                    label: if ctx.logic == 1 {
                        "Kite vs Rest of Company".to_string()
                    } else {
                        "vs Company".to_string()
                    },
                    source: ColumnSource::Complement,
                },
            ],
        };

        let mut sections = vec![SectionPlan {
            dimension: Dimension::Overall,
            title: Dimension::Overall.title().to_string(),
            columns: overall,
        }];
        // The comparison block sits right after the direct-reports section,
        // or right after the overall block when there is none.
        let mut delta_placed = false;
        for group in groups.iter() {
            sections.push(SectionPlan {
                dimension: group.dimension,
                title: group.dimension.title().to_string(),
                columns: group
                    .cohorts
                    .iter()
                    .map(|c| ColumnPlan {
                        label: c.name.clone(),
                        source: ColumnSource::Current(c.rows.clone()),
                    })
                    .collect(),
            });
            if group.dimension == Dimension::DirectReports && !delta_placed {
                sections.push(delta.clone());
                delta_placed = true;
            }
        }
        if !delta_placed {
            sections.insert(1, delta);
        }

        ReportLayout { rows, sections }
    }
}

/// One filled report cell, before or after finalization.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Slot {
    Cell(FavorabilityCell),
    /// A plain ratio with no respondent count behind it (benchmark and
    /// complement columns).
    Raw(Option<f64>),
}

impl Slot {
    fn value(&self) -> Option<f64> {
        match self {
            Slot::Cell(c) => c.ratio(),
            Slot::Raw(v) => *v,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ReportCell {
    pub value: Option<f64>,
    pub heat: Option<Rgb>,
}

#[derive(Debug, Clone)]
pub struct ReportColumn {
    pub label: String,
    /// Respondents behind the column, absent for reference columns.
    pub respondents: Option<usize>,
    pub cells: Vec<ReportCell>,
}

#[derive(Debug, Clone)]
pub struct ReportSection {
    pub dimension: Dimension,
    pub title: String,
    pub columns: Vec<ReportColumn>,
}

/// A finished per-leader report, ready for serialization.
#[derive(Debug, Clone)]
pub struct LeaderReport {
    pub leader_id: u64,
    pub org_name: String,
    pub file_label: String,
    pub current_year: String,
    pub past_year: String,
    pub invited: usize,
    pub participated: usize,
    pub rows: Vec<ReportRow>,
    pub sections: Vec<ReportSection>,
}

/// Collects the computed slots for every (section, column, row) triple.
#[derive(Debug)]
pub struct ResultAccumulator {
    layout: ReportLayout,
    cells: Vec<Vec<HashMap<String, Slot>>>,
    counts: Vec<Vec<Option<usize>>>,
}

impl ResultAccumulator {
    pub fn new(layout: ReportLayout) -> ResultAccumulator {
        let cells = layout
            .sections
            .iter()
            .map(|s| vec![HashMap::new(); s.columns.len()])
            .collect();
        let counts = layout
            .sections
            .iter()
            .map(|s| vec![None; s.columns.len()])
            .collect();
        ResultAccumulator {
            layout,
            cells,
            counts,
        }
    }

    pub fn layout(&self) -> &ReportLayout {
        &self.layout
    }

    pub fn set(&mut self, section: usize, column: usize, key: &str, slot: Slot) {
        self.cells[section][column].insert(key.to_string(), slot);
    }

    pub fn set_count(&mut self, section: usize, column: usize, count: usize) {
        self.counts[section][column] = Some(count);
    }

    fn slot_value(&self, section: usize, column: usize, key: &str) -> Option<f64> {
        self.cells[section][column].get(key).and_then(|s| s.value())
    }

    /// Applies the suppression passes and heat coloring.
    pub fn finalize(
        self,
        ctx: &HierarchyContext,
        palette: &HeatmapPalette,
        current_year: &str,
        past_year: &str,
        invited: usize,
        participated: usize,
    ) -> LeaderReport {
        // The reference column for cohort coloring is the rightmost overall
        // column: the leader's own org (the company itself on logic 1).
        let overall_last = self.layout.sections[0].columns.len() - 1;

        let mut sections: Vec<ReportSection> = Vec::new();
        for (si, plan) in self.layout.sections.iter().enumerate() {
            let mut columns: Vec<ReportColumn> = Vec::new();
            for (ci, col) in plan.columns.iter().enumerate() {
                let respondents = self.counts[si][ci];
                // First suppression pass: outside the overall block, any
                // counted column below the minimum cell size is dropped.
                // Columns without a count (benchmark, complement) are kept.
                if plan.dimension != Dimension::Overall {
                    let below = match respondents {
                        Some(n) => n < MIN_CELL_SIZE,
                        None => plan.dimension != Dimension::Delta,
                    };
                    if below {
                        continue;
                    }
                }

                let cells: Vec<ReportCell> = self
                    .layout
                    .rows
                    .iter()
                    .map(|row| {
                        let slot = self.cells[si][ci].get(&row.key);
                        let value = match &col.source {
                            // Comparison columns publish current minus
                            // baseline; either side missing means N/A.
                            ColumnSource::Past | ColumnSource::Benchmark => {
                                let baseline = slot.and_then(|s| s.value());
                                let current = self.slot_value(0, overall_last, &row.key);
                                match (current, baseline) {
                                    (Some(c), Some(b)) => Some(c - b),
                                    _ => None,
                                }
                            }
                            _ => slot.and_then(|s| s.value()),
                        };
                        let heat = value.and_then(|v| {
                            self.heat_for(palette, si, ci, &col.source, &row.key, v, overall_last)
                        });
                        ReportCell { value, heat }
                    })
                    .collect();
                columns.push(ReportColumn {
                    label: col.label.clone(),
                    respondents,
                    cells,
                });
            }
            sections.push(ReportSection {
                dimension: plan.dimension,
                title: plan.title.clone(),
                columns,
            });
        }

        // Second pass: a section with fewer than two surviving columns says
        // nothing and is dropped. The overall block stays regardless.
        let before = sections.len();
        sections.retain(|s| s.dimension == Dimension::Overall || s.columns.len() >= 2);
        if sections.len() != before {
            debug!(
                "leader {}: dropped {} sections with fewer than two cohorts",
                ctx.leader_id,
                before - sections.len()
            );
        }

        LeaderReport {
            leader_id: ctx.leader_id,
            org_name: ctx.org_name.clone(),
            file_label: ctx.file_label.clone(),
            current_year: current_year.to_string(),
            past_year: past_year.to_string(),
            invited,
            participated,
            rows: self.layout.rows.clone(),
            sections,
        }
    }

    #[allow(clippy::too_many_arguments)]
    fn heat_for(
        &self,
        palette: &HeatmapPalette,
        section: usize,
        column: usize,
        source: &ColumnSource,
        key: &str,
        value: f64,
        overall_last: usize,
    ) -> Option<Rgb> {
        match source {
            // These columns already hold a delta.
            ColumnSource::Past | ColumnSource::Benchmark | ColumnSource::Complement => {
                palette.color_for(delta_points(value, 0.0))
            }
            ColumnSource::Company | ColumnSource::Current(_) if section == 0 => {
                // Inside the overall block each column is colored against
                // its left neighbor: org vs parent, parent vs company.
                if column == 0 {
                    return None;
                }
                let reference = self.slot_value(0, column - 1, key)?;
                palette.color_for(delta_points(value, reference))
            }
            // Cohort columns are colored against the org overall.
            _ => {
                let org = self.slot_value(0, overall_last, key)?;
                palette.color_for(delta_points(value, org))
            }
        }
    }
}

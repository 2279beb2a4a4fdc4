//! Survey item catalog resolution.
//!
//! Filters the raw item metadata down to the items that actually participate
//! in the current survey cycle, collapses A/B paired items into one logical
//! item, and builds the cross-vintage code translations used by the
//! historical and benchmark comparisons.

use std::collections::{HashMap, HashSet};

use log::debug;

use crate::config::*;

/// Item type code that participates in the report. Other types (free-text,
/// administrative) are dropped at resolution time.
pub const REPORT_ITEM_TYPE: &str = "T01";

#[derive(Eq, PartialEq, Debug, Clone, Copy)]
pub enum BenchmarkEligibility {
    /// Participates in the main report and internal comparisons.
    Internal,
    /// Feeds the external benchmark delta only.
    External,
    None,
}

/// One row of the raw item metadata table.
#[derive(Eq, PartialEq, Debug, Clone)]
pub struct ItemRecord {
    /// Unique item code; also the column name in the response tables.
    pub code: String,
    /// Parent item id, stable across survey vintages.
    pub item_id: String,
    pub type_id: String,
    pub text: String,
    /// `A` or `B` for semantically-equivalent item pairs.
    pub ab_code: Option<String>,
    pub benchmark: BenchmarkEligibility,
}

impl ItemRecord {
    pub fn from_table(table: &Table) -> Result<Vec<ItemRecord>, ReportError> {
        let code = table.require("Unique Item Code")?;
        let item_id = table.require("Item ID")?;
        let type_id = table.require("Type ID")?;
        let text = table.require("Short Text")?;
        let ab_code = table.require("AB Code")?;
        let benchmark = table.require("External Benchmark")?;
        let mut res = Vec::new();
        for row in 0..table.rows.len() {
            let ab = match table.cell(row, ab_code) {
                c if c.is_empty() => None,
                c => Some(c.display()),
            };
            let b = match table.cell(row, benchmark).display().as_str() {
                "i" => BenchmarkEligibility::Internal,
                "e" => BenchmarkEligibility::External,
                _ => BenchmarkEligibility::None,
            };
            res.push(ItemRecord {
                code: table.cell(row, code).display(),
                item_id: table.cell(row, item_id).display(),
                type_id: table.cell(row, type_id).display(),
                text: table.cell(row, text).display(),
                ab_code: ab,
                benchmark: b,
            });
        }
        Ok(res)
    }
}

/// One row of the category metadata table: the assignment of a parent item
/// id to a category name.
#[derive(Eq, PartialEq, Debug, Clone)]
pub struct CategoryRecord {
    pub item_id: String,
    pub category: String,
}

impl CategoryRecord {
    pub fn from_table(table: &Table) -> Result<Vec<CategoryRecord>, ReportError> {
        let item_id = table.require("Item ID")?;
        let category = table.require("Category")?;
        Ok((0..table.rows.len())
            .map(|row| CategoryRecord {
                item_id: table.cell(row, item_id).display(),
                category: table.cell(row, category).display(),
            })
            .collect())
    }
}

/// One logical survey item after resolution (pairs already collapsed).
#[derive(Eq, PartialEq, Debug, Clone)]
pub struct SurveyItem {
    pub code: String,
    pub item_id: String,
    pub text: String,
}

/// A category and its member item codes, in catalog order.
#[derive(Eq, PartialEq, Debug, Clone)]
pub struct CategoryBlock {
    pub name: String,
    pub item_codes: Vec<String>,
}

/// Instruction to fold the responses of a dropped pair sibling into the
/// kept item's column.
#[derive(Eq, PartialEq, Debug, Clone)]
pub struct PairMerge {
    pub keep: String,
    pub drop: String,
}

/// The resolved catalog. Built once per dataset and read-only afterward.
#[derive(Eq, PartialEq, Debug, Clone, Default)]
pub struct ItemCatalog {
    items: Vec<SurveyItem>,
    categories: Vec<CategoryBlock>,
    pair_merges: Vec<PairMerge>,
    past_codes: HashMap<String, String>,
    benchmark_codes: HashMap<String, String>,
}

impl ItemCatalog {
    /// Resolves the raw item and category metadata against the columns that
    /// are actually present in the current (and past) response tables.
    pub fn resolve(
        item_records: &[ItemRecord],
        category_records: &[CategoryRecord],
        current_columns: &HashSet<String>,
        past_columns: &HashSet<String>,
    ) -> ItemCatalog {
        let t01: Vec<&ItemRecord> = item_records
            .iter()
            .filter(|r| r.type_id == REPORT_ITEM_TYPE)
            .collect();

        // External-eligible items feed the benchmark delta only; internal
        // items make up the report proper.
        let external: Vec<&ItemRecord> = t01
            .iter()
            .filter(|r| r.benchmark == BenchmarkEligibility::External)
            .cloned()
            .collect();
        let internal: Vec<&ItemRecord> = t01
            .iter()
            .filter(|r| r.benchmark == BenchmarkEligibility::Internal)
            .cloned()
            .collect();

        let present: Vec<&ItemRecord> = internal
            .iter()
            .filter(|r| current_columns.contains(&r.code))
            .cloned()
            .collect();
        // Catalog rows for codes only found in the historical vintage: they
        // carry the past column name for the same parent item id.
        let historical_only: Vec<&ItemRecord> = internal
            .iter()
            .filter(|r| !current_columns.contains(&r.code) && past_columns.contains(&r.code))
            .cloned()
            .collect();
        let in_both: HashSet<&str> = present
            .iter()
            .filter(|r| past_columns.contains(&r.code))
            .map(|r| r.code.as_str())
            .collect();

        let mut items: Vec<SurveyItem> = present
            .iter()
            .map(|r| SurveyItem {
                code: r.code.clone(),
                item_id: r.item_id.clone(),
                text: r.text.clone(),
            })
            .collect();

        // Collapse A/B pairs: keep the first sibling, join the display
        // texts with "/", and remember to fold the dropped column's
        // responses into the kept one.
        let mut pair_merges: Vec<PairMerge> = Vec::new();
        let mut seen_pair_ids: Vec<String> = Vec::new();
        for r in present.iter() {
            let is_pair = matches!(r.ab_code.as_deref(), Some("A") | Some("B"));
            if !is_pair || seen_pair_ids.contains(&r.item_id) {
                continue;
            }
            let group: Vec<&&ItemRecord> = present
                .iter()
                .filter(|p| {
                    p.item_id == r.item_id && matches!(p.ab_code.as_deref(), Some("A") | Some("B"))
                })
                .collect();
            seen_pair_ids.push(r.item_id.clone());
            // Both raw columns must be present for a collapse to happen.
            if group.len() < 2 {
                continue;
            }
            let keep = group[0];
            let drop = group[1];
            let joined = format!("{}/{}", keep.text, drop.text);
            items.retain(|it| it.code != drop.code);
            if let Some(kept) = items.iter_mut().find(|it| it.code == keep.code) {
                kept.text = joined;
            }
            debug!(
                "resolve: collapsed pair {:?} into {:?} (item id {:?})",
                drop.code, keep.code, r.item_id
            );
            pair_merges.push(PairMerge {
                keep: keep.code.clone(),
                drop: drop.code.clone(),
            });
        }

        // Cross-vintage translations, matched on the parent item id. A
        // missing translation is not an error: the affected comparison cell
        // degrades to N/A.
        let mut past_codes: HashMap<String, String> = HashMap::new();
        let mut benchmark_codes: HashMap<String, String> = HashMap::new();
        for item in items.iter() {
            let past = historical_only
                .iter()
                .find(|r| r.item_id == item.item_id)
                .map(|r| r.code.clone())
                .or_else(|| {
                    if in_both.contains(item.code.as_str()) {
                        Some(item.code.clone())
                    } else {
                        None
                    }
                });
            if let Some(p) = past {
                past_codes.insert(item.code.clone(), p);
            }
            if let Some(b) = external.iter().find(|r| r.item_id == item.item_id) {
                benchmark_codes.insert(item.code.clone(), b.code.clone());
            }
        }

        // Category order is first-seen order in the category metadata,
        // restricted to items that survived resolution.
        let ids_present: HashMap<&str, &str> = items
            .iter()
            .map(|it| (it.item_id.as_str(), it.code.as_str()))
            .collect();
        let mut categories: Vec<CategoryBlock> = Vec::new();
        let mut seen_item_ids: HashSet<&str> = HashSet::new();
        for rec in category_records.iter() {
            let code = match ids_present.get(rec.item_id.as_str()) {
                Some(c) => *c,
                None => continue,
            };
            if !seen_item_ids.insert(rec.item_id.as_str()) {
                continue;
            }
            match categories.iter_mut().find(|c| c.name == rec.category) {
                Some(block) => block.item_codes.push(code.to_string()),
                None => categories.push(CategoryBlock {
                    name: rec.category.clone(),
                    item_codes: vec![code.to_string()],
                }),
            }
        }

        debug!(
            "resolve: {} items, {} categories, {} pairs collapsed",
            items.len(),
            categories.len(),
            pair_merges.len()
        );
        ItemCatalog {
            items,
            categories,
            pair_merges,
            past_codes,
            benchmark_codes,
        }
    }

    pub fn items(&self) -> &[SurveyItem] {
        &self.items
    }

    pub fn categories(&self) -> &[CategoryBlock] {
        &self.categories
    }

    pub fn pair_merges(&self) -> &[PairMerge] {
        &self.pair_merges
    }

    pub fn item(&self, code: &str) -> Option<&SurveyItem> {
        self.items.iter().find(|it| it.code == code)
    }

    /// The historical column carrying this item in the prior cycle, if any.
    pub fn past_code(&self, code: &str) -> Option<&str> {
        self.past_codes.get(code).map(|s| s.as_str())
    }

    /// The external-benchmark code for this item, if any.
    pub fn benchmark_code(&self, code: &str) -> Option<&str> {
        self.benchmark_codes.get(code).map(|s| s.as_str())
    }
}

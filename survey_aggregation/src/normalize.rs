//! Response normalization: raw Likert answers into favorable indicators.

use std::collections::HashMap;

use log::{debug, warn};

use crate::catalog::PairMerge;
use crate::config::*;

/// Rows to skip at the top of a raw response extract (question text and
/// item codes repeated under the header row).
pub const METADATA_ROWS: usize = 2;

/// Column holding the respondent id in the response extracts.
pub const EXTERNAL_REFERENCE: &str = "ExternalReference";

/// Which indicator to derive from a raw Likert answer.
#[derive(Eq, PartialEq, Debug, Clone, Copy)]
pub enum Bucket {
    Favorable,
    Neutral,
    Unfavorable,
}

/// The recode applied to raw answers.
///
/// `TwoWay` is the favorability recode used everywhere in the report: 4 and
/// 5 map to 1, anything strictly between 0 and 4 maps to 0, everything else
/// is missing. `ThreeWay` produces the indicator for a single bucket
/// (favorable = {4,5}, neutral = {3}, unfavorable = {1,2}).
#[derive(Eq, PartialEq, Debug, Clone, Copy)]
pub enum RecodeScheme {
    TwoWay,
    ThreeWay(Bucket),
}

impl RecodeScheme {
    pub fn recode(&self, raw: &Cell) -> Option<u8> {
        let v = raw.as_f64()?;
        match self {
            RecodeScheme::TwoWay => {
                if v == 4.0 || v == 5.0 {
                    Some(1)
                } else if v > 0.0 && v < 4.0 {
                    Some(0)
                } else {
                    None
                }
            }
            RecodeScheme::ThreeWay(bucket) => {
                let hit = match bucket {
                    Bucket::Favorable => v == 4.0 || v == 5.0,
                    Bucket::Neutral => v == 3.0,
                    Bucket::Unfavorable => v == 1.0 || v == 2.0,
                };
                if v >= 1.0 && v <= 5.0 {
                    Some(if hit { 1 } else { 0 })
                } else {
                    None
                }
            }
        }
    }
}

/// Recoded responses, column-major. One entry per respondent per item code,
/// `None` where the answer is missing or out of range.
#[derive(Debug, Clone)]
pub struct ResponseTable {
    refs: Vec<u64>,
    index: HashMap<u64, usize>,
    columns: HashMap<String, Vec<Option<u8>>>,
}

impl ResponseTable {
    /// Recodes the raw extract. Only the columns named in `codes` are kept;
    /// pair merges fold the dropped sibling's answers into the kept column,
    /// first valid answer winning.
    pub fn from_raw(
        table: &Table,
        codes: &[String],
        merges: &[PairMerge],
        scheme: RecodeScheme,
    ) -> Result<ResponseTable, ReportError> {
        let ref_col = table.require(EXTERNAL_REFERENCE)?;
        let rows: Vec<usize> = (METADATA_ROWS..table.rows.len()).collect();

        let mut refs = Vec::with_capacity(rows.len());
        let mut index = HashMap::with_capacity(rows.len());
        for &row in rows.iter() {
            let r = table
                .cell(row, ref_col)
                .as_id()
                .ok_or_else(|| ReportError::DataShape {
                    table: table.name.clone(),
                    column: EXTERNAL_REFERENCE.to_string(),
                })?;
            index.insert(r, refs.len());
            refs.push(r);
        }

        let mut columns: HashMap<String, Vec<Option<u8>>> = HashMap::new();
        for code in codes.iter() {
            let col = match table.column(code) {
                Some(c) => c,
                None => continue,
            };
            let values: Vec<Option<u8>> = rows
                .iter()
                .map(|&row| scheme.recode(table.cell(row, col)))
                .collect();
            columns.insert(code.clone(), values);
        }

        for merge in merges.iter() {
            let drop_col = match table.column(&merge.drop) {
                Some(c) => c,
                None => continue,
            };
            let sibling: Vec<Option<u8>> = rows
                .iter()
                .map(|&row| scheme.recode(table.cell(row, drop_col)))
                .collect();
            let kept = columns
                .entry(merge.keep.clone())
                .or_insert_with(|| vec![None; refs.len()]);
            for (i, v) in sibling.into_iter().enumerate() {
                match (kept[i], v) {
                    (None, Some(x)) => kept[i] = Some(x),
                    (Some(a), Some(b)) if a != b => {
                        warn!(
                            "respondent {} answered both {} and {} with conflicting values, keeping {}",
                            refs[i], merge.keep, merge.drop, merge.keep
                        );
                    }
                    _ => {}
                }
            }
        }

        debug!(
            "{}: recoded {} respondents over {} item columns",
            table.name,
            refs.len(),
            columns.len()
        );
        Ok(ResponseTable {
            refs,
            index,
            columns,
        })
    }

    pub fn respondents(&self) -> &[u64] {
        &self.refs
    }

    pub fn contains(&self, respondent: u64) -> bool {
        self.index.contains_key(&respondent)
    }

    pub fn has_column(&self, code: &str) -> bool {
        self.columns.contains_key(code)
    }

    /// The recoded answer of one respondent on one item, `None` when the
    /// respondent is absent, the item column is absent, or the answer is
    /// missing.
    pub fn value(&self, respondent: u64, code: &str) -> Option<u8> {
        let row = *self.index.get(&respondent)?;
        *self.columns.get(code)?.get(row)?
    }
}

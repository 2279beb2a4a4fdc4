//! The two-tier favorability aggregation.
//!
//! Item cells are the mean of the favorable indicator over the respondents
//! who answered that item. The category cell is NOT the mean of the item
//! cells: it is the mean, over the respondents who answered every item in
//! the category, of each respondent's own per-item mean. Both tiers are
//! suppressed below the minimum cell size, and a category whose member
//! items are all suppressed is suppressed too.

use std::collections::HashMap;

use crate::config::*;
use crate::normalize::ResponseTable;

/// The cells of one category for one population of respondents.
#[derive(Debug, Clone)]
pub struct CategoryAggregate {
    pub item_cells: HashMap<String, FavorabilityCell>,
    pub category_cell: FavorabilityCell,
    /// Respondents in the population that appear in the response table at
    /// all, whether or not they answered any item of this category.
    pub respondents: usize,
}

/// Aggregates one category over one population.
pub fn aggregate_category(
    responses: &ResponseTable,
    item_codes: &[String],
    population: &[u64],
) -> CategoryAggregate {
    let members: Vec<u64> = population
        .iter()
        .copied()
        .filter(|r| responses.contains(*r))
        .collect();

    let mut item_cells: HashMap<String, FavorabilityCell> = HashMap::new();
    for code in item_codes.iter() {
        let mut favorable = 0usize;
        let mut answered = 0usize;
        for &r in members.iter() {
            if let Some(v) = responses.value(r, code) {
                answered += 1;
                favorable += v as usize;
            }
        }
        let cell = if answered >= MIN_CELL_SIZE {
            FavorabilityCell::Value {
                ratio: favorable as f64 / answered as f64,
                n: answered,
            }
        } else {
            FavorabilityCell::Na
        };
        item_cells.insert(code.clone(), cell);
    }

    // An N/A member item forces the category cell to N/A.
    let any_na = item_codes.is_empty()
        || item_codes
            .iter()
            .any(|c| item_cells.get(c).map(|cell| cell.is_na()).unwrap_or(true));
    let category_cell = if any_na {
        FavorabilityCell::Na
    } else {
        // Complete rows only: respondents who answered every member item.
        let mut sum = 0.0f64;
        let mut complete = 0usize;
        for &r in members.iter() {
            let answers: Vec<u8> = item_codes
                .iter()
                .filter_map(|c| responses.value(r, c))
                .collect();
            if answers.len() == item_codes.len() {
                complete += 1;
                sum += answers.iter().map(|&v| v as f64).sum::<f64>() / answers.len() as f64;
            }
        }
        if complete >= MIN_CELL_SIZE {
            FavorabilityCell::Value {
                ratio: sum / complete as f64,
                n: complete,
            }
        } else {
            FavorabilityCell::Na
        }
    };

    CategoryAggregate {
        item_cells,
        category_cell,
        respondents: members.len(),
    }
}

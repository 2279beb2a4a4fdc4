//! Demographic partitioning of a leader's org.
//!
//! Each report section is one partition of the org rows. Most sections are
//! plain group-bys over a roster attribute with a canonical cohort order;
//! the direct-reports and affiliate sections follow the hierarchy instead.

use std::collections::BTreeMap;

use crate::config::*;
use crate::hierarchy::{AffiliateMode, GmLevels, HierarchyContext, LeaderKind, Roster};

pub const PAY_GRADE: &str = "Pay Grade Group";
pub const TENURE: &str = "Length of Service Group";
pub const PERFORMANCE: &str = "Performance Rating";
pub const TALENT: &str = "Talent Coordinate";
pub const GENDER: &str = "Gender";
pub const ETHNICITY: &str = "Ethnicity (US)";
pub const AGE: &str = "Age Group";
pub const COUNTRY: &str = "Country";
pub const KITE_FLAG: &str = "Kite Employee Flag";
pub const OFFICE: &str = "Office Type";
pub const REGION: &str = "Location Level 2";
pub const DEPARTMENT: &str = "Department Level 2";

/// The rating labels in report order. Ratings outside this list sort after
/// it, alphabetically.
pub const PERFORMANCE_ORDER: [&str; 6] = [
    "Exceptional",
    "Exceeded",
    "Achieved",
    "Improvement Needed",
    "On Leave",
    "No Rating",
];

const TENURE_LAST: &str = "15+ Years";
const NON_US: &str = "Non-US";

/// One column of a report section: a label and the roster rows behind it.
#[derive(Eq, PartialEq, Debug, Clone)]
pub struct Cohort {
    pub name: String,
    pub rows: Vec<usize>,
}

/// One report section's worth of cohorts, in display order.
#[derive(Eq, PartialEq, Debug, Clone)]
pub struct CohortGroup {
    pub dimension: Dimension,
    pub cohorts: Vec<Cohort>,
}

fn group_by_attr(
    roster: &Roster,
    rows: &[usize],
    column: &str,
    relabel: fn(&str) -> String,
) -> BTreeMap<String, Vec<usize>> {
    let mut groups: BTreeMap<String, Vec<usize>> = BTreeMap::new();
    for &row in rows.iter() {
        if let Some(value) = roster.attr(row, column) {
            groups.entry(relabel(&value)).or_default().push(row);
        }
    }
    groups
}

fn identity(value: &str) -> String {
    value.to_string()
}

fn attr_group(
    roster: &Roster,
    rows: &[usize],
    dimension: Dimension,
    column: &str,
) -> Option<CohortGroup> {
    attr_group_with(roster, rows, dimension, column, identity, |groups| {
        groups
            .into_iter()
            .map(|(name, rows)| Cohort { name, rows })
            .collect()
    })
}

fn attr_group_with(
    roster: &Roster,
    rows: &[usize],
    dimension: Dimension,
    column: &str,
    relabel: fn(&str) -> String,
    order: impl Fn(BTreeMap<String, Vec<usize>>) -> Vec<Cohort>,
) -> Option<CohortGroup> {
    if !roster.has_column(column) {
        return None;
    }
    let groups = group_by_attr(roster, rows, column, relabel);
    if groups.is_empty() {
        return None;
    }
    Some(CohortGroup {
        dimension,
        cohorts: order(groups),
    })
}

/// Moves the cohort named `label` to the end, keeping the rest sorted.
fn label_last(groups: BTreeMap<String, Vec<usize>>, label: &str) -> Vec<Cohort> {
    let mut cohorts: Vec<Cohort> = Vec::new();
    let mut last: Option<Cohort> = None;
    for (name, rows) in groups {
        if name == label {
            last = Some(Cohort { name, rows });
        } else {
            cohorts.push(Cohort { name, rows });
        }
    }
    cohorts.extend(last);
    cohorts
}

fn performance_order(groups: BTreeMap<String, Vec<usize>>) -> Vec<Cohort> {
    let mut cohorts: Vec<Cohort> = Vec::new();
    let mut groups = groups;
    for label in PERFORMANCE_ORDER.iter() {
        if let Some(rows) = groups.remove(*label) {
            cohorts.push(Cohort {
                name: label.to_string(),
                rows,
            });
        }
    }
    for (name, rows) in groups {
        cohorts.push(Cohort { name, rows });
    }
    cohorts
}

fn direct_reports(ctx: &HierarchyContext, roster: &Roster) -> Option<CohortGroup> {
    let below = ctx.level + 1;
    if !roster.has_supervisor_level(below) {
        return None;
    }
    let mut by_sub: BTreeMap<u64, Vec<usize>> = BTreeMap::new();
    for &row in ctx.your_org.iter() {
        // Rows with no supervisor at the next level report to the leader
        // directly and carry no sub-org of their own.
        if let Some(sub) = roster.supervisor_id(row, below) {
            by_sub.entry(sub).or_default().push(row);
        }
    }
    by_sub.remove(&ctx.leader_id);
    if by_sub.is_empty() {
        return None;
    }
    let mut cohorts: Vec<Cohort> = by_sub
        .into_iter()
        .filter_map(|(sub, rows)| {
            // A sub-leader absent from the roster cannot be labeled; the
            // cohort is dropped.
            let r = roster.find(sub)?;
            let name = format!("{} {}", roster.name(r), roster.last_name(r));
            Some(Cohort { name, rows })
        })
        .collect();
    if cohorts.is_empty() {
        return None;
    }
    cohorts.sort_by(|a, b| a.name.cmp(&b.name));
    Some(CohortGroup {
        dimension: Dimension::DirectReports,
        cohorts,
    })
}

fn gender_ethnicity(roster: &Roster, rows: &[usize]) -> Option<CohortGroup> {
    if !roster.has_column(GENDER) || !roster.has_column(ETHNICITY) {
        return None;
    }
    // Keyed for ordering: US ethnicities alphabetical, Non-US last, gender
    // alphabetical within each ethnicity.
    let mut groups: BTreeMap<(bool, String, String), Vec<usize>> = BTreeMap::new();
    for &row in rows.iter() {
        let gender = match roster.attr(row, GENDER) {
            Some(g) => g,
            None => continue,
        };
        let eth = match roster.attr(row, ETHNICITY) {
            Some(e) => e,
            None => continue,
        };
        groups
            .entry((eth == NON_US, eth, gender))
            .or_default()
            .push(row);
    }
    if groups.is_empty() {
        return None;
    }
    let cohorts = groups
        .into_iter()
        .map(|((non_us, eth, gender), rows)| {
            // Ethnicity is only recorded for US workers; elsewhere the
            // split is by gender alone.
            let name = if non_us {
                gender
            } else {
                format!("{} {}", eth, gender)
            };
            Cohort { name, rows }
        })
        .collect();
    Some(CohortGroup {
        dimension: Dimension::GenderEthnicity,
        cohorts,
    })
}

fn affiliates(
    ctx: &HierarchyContext,
    roster: &Roster,
    gm_levels: Option<&GmLevels>,
    mode: AffiliateMode,
) -> Option<CohortGroup> {
    let levels = gm_levels?;
    // The section expands the resolved leader's own GM subtree, never the
    // whole GM table.
    let anchor_row = levels.find(ctx.leader_id)?;
    let anchor_level = levels.own_level(anchor_row)?;
    let anchor = levels.level_org(anchor_row, anchor_level)?;
    // "Kite"-prefixed affiliates sort after the rest.
    let sort_key = |name: &str| (name.starts_with("Kite"), name.to_string());
    let membership = |org: &str| -> Vec<usize> {
        ctx.your_org
            .iter()
            .copied()
            .filter(|&row| roster.flag(row, org))
            .collect()
    };
    // Orgs at `level` under `parent`, paired with their own chain name so
    // they can be expanded a level further.
    let children = |parent: &str, parent_level: u32, level: u32| -> Vec<(String, String)> {
        let mut orgs: Vec<(String, String)> = levels
            .subtree_rows(parent, parent_level, level)
            .into_iter()
            .map(|row| {
                let chain = levels.level_org(row, level).unwrap_or_default();
                (levels.org(row), chain)
            })
            .filter(|(org, _)| roster.has_column(org))
            .collect();
        orgs.sort_by_key(|(o, _)| sort_key(o.as_str()));
        orgs.dedup();
        orgs
    };

    let mut cohorts: Vec<Cohort> = Vec::new();
    match mode {
        AffiliateMode::TwoLevels => {
            for (parent, chain) in children(&anchor, anchor_level, 3) {
                cohorts.push(Cohort {
                    name: parent.clone(),
                    rows: membership(&parent),
                });
                for (child, _) in children(&chain, 3, 4) {
                    cohorts.push(Cohort {
                        name: format!("    {}", child),
                        rows: membership(&child),
                    });
                }
            }
        }
        AffiliateMode::OneLevel => {
            for (child, _) in children(&anchor, anchor_level, 4) {
                cohorts.push(Cohort {
                    name: child.clone(),
                    rows: membership(&child),
                });
            }
        }
    }
    if cohorts.is_empty() {
        return None;
    }
    Some(CohortGroup {
        dimension: Dimension::Affiliate,
        cohorts,
    })
}

fn rating_label(value: &str) -> String {
    if value == "Unspecified" {
        "No Rating".to_string()
    } else {
        value.to_string()
    }
}

fn talent_label(value: &str) -> String {
    if value == "Unspecified" {
        "No Coordinate".to_string()
    } else {
        value.to_string()
    }
}

/// Partitions the leader's org into every report section's cohorts, in
/// section order. Sections whose backing column is absent are omitted.
pub fn partition(
    ctx: &HierarchyContext,
    roster: &Roster,
    gm_levels: Option<&GmLevels>,
) -> Vec<CohortGroup> {
    let rows = &ctx.your_org;
    let mut groups: Vec<CohortGroup> = Vec::new();

    if ctx.kind != LeaderKind::Gm {
        groups.extend(direct_reports(ctx, roster));
    }
    if let Some(mode) = ctx.affiliate {
        groups.extend(affiliates(ctx, roster, gm_levels, mode));
    }
    groups.extend(attr_group(roster, rows, Dimension::GradeGroup, PAY_GRADE));
    groups.extend(attr_group_with(
        roster,
        rows,
        Dimension::TenureGroup,
        TENURE,
        identity,
        |g| label_last(g, TENURE_LAST),
    ));
    groups.extend(attr_group(roster, rows, Dimension::OfficeType, OFFICE));
    groups.extend(attr_group_with(
        roster,
        rows,
        Dimension::PerformanceRating,
        PERFORMANCE,
        rating_label,
        performance_order,
    ));
    groups.extend(attr_group_with(
        roster,
        rows,
        Dimension::TalentCoordinate,
        TALENT,
        talent_label,
        |g| g.into_iter().map(|(name, rows)| Cohort { name, rows }).collect(),
    ));
    groups.extend(attr_group(roster, rows, Dimension::Gender, GENDER));
    groups.extend(attr_group_with(
        roster,
        rows,
        Dimension::Ethnicity,
        ETHNICITY,
        identity,
        |g| label_last(g, NON_US),
    ));
    groups.extend(gender_ethnicity(roster, rows));
    groups.extend(attr_group(roster, rows, Dimension::AgeGroup, AGE));
    groups.extend(attr_group(roster, rows, Dimension::Function, DEPARTMENT));
    groups.extend(attr_group(roster, rows, Dimension::Region, REGION));
    if ctx.affiliate.is_none() {
        groups.extend(attr_group(roster, rows, Dimension::Country, COUNTRY));
    }
    groups.extend(attr_group(roster, rows, Dimension::Kite, KITE_FLAG));
    groups
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hierarchy::{
        resolve, LeaderSpec, ResolveOptions, WORKER_ID, WORKER_LAST_NAME, WORKER_NAME,
    };
    use crate::normalize::{RecodeScheme, ResponseTable, EXTERNAL_REFERENCE, METADATA_ROWS};

    fn all_answered(roster: &Roster) -> ResponseTable {
        let mut t = Table::new("responses", vec![EXTERNAL_REFERENCE.to_string()]);
        for _ in 0..METADATA_ROWS {
            t.push_row(vec![Cell::Text("meta".to_string())]);
        }
        for row in roster.rows() {
            if let Some(id) = roster.worker_id(row) {
                t.push_row(vec![Cell::Int(id as i64)]);
            }
        }
        ResponseTable::from_raw(&t, &[], &[], RecodeScheme::TwoWay).unwrap()
    }

    fn resolve_all(
        roster: &Roster,
        gm: Option<&GmLevels>,
        spec: &LeaderSpec,
        opts: &ResolveOptions,
    ) -> HierarchyContext {
        let responses = all_answered(roster);
        resolve(roster, &responses, roster, &responses, gm, spec, opts).unwrap()
    }

    fn demo_roster() -> Roster {
        let headers: Vec<String> = [
            WORKER_ID,
            WORKER_NAME,
            WORKER_LAST_NAME,
            "Supervisor Level 2 ID",
            "Supervisor Level 3 ID",
            TENURE,
            PERFORMANCE,
            GENDER,
            ETHNICITY,
        ]
        .iter()
        .map(|s| s.to_string())
        .collect();
        let mut t = Table::new("roster", headers);
        let mut push = |id: i64, l3: Option<i64>, tenure: &str, perf: &str, gender: &str, eth: &str| {
            t.push_row(vec![
                Cell::Int(id),
                Cell::Text(format!("First{}", id)),
                Cell::Text(format!("Last{}", id)),
                Cell::Int(1),
                l3.map(Cell::Int).unwrap_or(Cell::Empty),
                Cell::Text(tenure.to_string()),
                Cell::Text(perf.to_string()),
                Cell::Text(gender.to_string()),
                Cell::Text(eth.to_string()),
            ]);
        };
        push(10, Some(2), "15+ Years", "Achieved", "Female", "Asian");
        push(11, Some(2), "1-2 Years", "Exceptional", "Male", "White");
        push(12, Some(2), "3-5 Years", "Unspecified", "Female", "Non-US");
        push(13, Some(3), "1-2 Years", "Achieved", "Male", "Non-US");
        push(14, Some(3), "15+ Years", "Exceeded", "Female", "White");
        push(15, None, "1-2 Years", "Achieved", "Male", "Asian");
        // The sub-leaders' own rows, plus a worker whose sub-leader 9 has
        // no roster row of their own.
        push(2, Some(2), "15+ Years", "Achieved", "Male", "White");
        push(3, Some(3), "3-5 Years", "Exceeded", "Female", "Asian");
        push(16, Some(9), "1-2 Years", "Achieved", "Male", "Non-US");
        Roster::from_table(t).unwrap()
    }

    fn company_ctx(roster: &Roster) -> HierarchyContext {
        resolve_all(
            roster,
            None,
            &LeaderSpec::Worker(COMPANY_SENTINEL),
            &ResolveOptions::default(),
        )
    }

    fn group<'a>(groups: &'a [CohortGroup], dim: Dimension) -> &'a CohortGroup {
        groups.iter().find(|g| g.dimension == dim).unwrap()
    }

    #[test]
    fn cohorts_partition_the_org() {
        let roster = demo_roster();
        let ctx = company_ctx(&roster);
        let groups = partition(&ctx, &roster, None);
        for g in groups.iter().filter(|g| g.dimension != Dimension::DirectReports) {
            let mut seen: Vec<usize> = g.cohorts.iter().flat_map(|c| c.rows.clone()).collect();
            let total = seen.len();
            seen.sort_unstable();
            seen.dedup();
            // Disjoint within a section: no row in two cohorts.
            assert_eq!(seen.len(), total, "overlap in {:?}", g.dimension);
        }
    }

    #[test]
    fn tenure_puts_fifteen_plus_last() {
        let roster = demo_roster();
        let ctx = company_ctx(&roster);
        let groups = partition(&ctx, &roster, None);
        let names: Vec<&str> = group(&groups, Dimension::TenureGroup)
            .cohorts
            .iter()
            .map(|c| c.name.as_str())
            .collect();
        assert_eq!(names, vec!["1-2 Years", "3-5 Years", "15+ Years"]);
    }

    #[test]
    fn performance_follows_the_fixed_order() {
        let roster = demo_roster();
        let ctx = company_ctx(&roster);
        let groups = partition(&ctx, &roster, None);
        let names: Vec<&str> = group(&groups, Dimension::PerformanceRating)
            .cohorts
            .iter()
            .map(|c| c.name.as_str())
            .collect();
        // "Unspecified" relabeled to "No Rating", order from the fixed list.
        assert_eq!(names, vec!["Exceptional", "Exceeded", "Achieved", "No Rating"]);
    }

    #[test]
    fn ethnicity_puts_non_us_last() {
        let roster = demo_roster();
        let ctx = company_ctx(&roster);
        let groups = partition(&ctx, &roster, None);
        let names: Vec<&str> = group(&groups, Dimension::Ethnicity)
            .cohorts
            .iter()
            .map(|c| c.name.as_str())
            .collect();
        assert_eq!(names, vec!["Asian", "White", "Non-US"]);
    }

    #[test]
    fn gender_ethnicity_drops_ethnicity_outside_us() {
        let roster = demo_roster();
        let ctx = company_ctx(&roster);
        let groups = partition(&ctx, &roster, None);
        let names: Vec<&str> = group(&groups, Dimension::GenderEthnicity)
            .cohorts
            .iter()
            .map(|c| c.name.as_str())
            .collect();
        assert_eq!(
            names,
            vec!["Asian Female", "Asian Male", "White Female", "White Male", "Female", "Male"]
        );
    }

    #[test]
    fn direct_reports_label_by_sub_leader_and_skip_orphans() {
        let roster = demo_roster();
        let ctx = resolve_all(
            &roster,
            None,
            &LeaderSpec::Worker(1),
            &ResolveOptions::default(),
        );
        let groups = partition(&ctx, &roster, None);
        let dr = group(&groups, Dimension::DirectReports);
        let names: Vec<&str> = dr.cohorts.iter().map(|c| c.name.as_str()).collect();
        // Workers under sub-leaders 2 and 3. Worker 15 has no level-3
        // supervisor, and worker 16 reports to sub-leader 9 who is not on
        // the roster; neither gets a cohort.
        assert_eq!(names, vec!["First2 Last2", "First3 Last3"]);
        assert_eq!(dr.cohorts[0].rows.len(), 4);
        assert_eq!(dr.cohorts[1].rows.len(), 3);
    }

    fn affiliate_roster() -> Roster {
        let headers: Vec<String> = [
            WORKER_ID,
            WORKER_NAME,
            WORKER_LAST_NAME,
            "Supervisor Level 2 ID",
            "Pharma Org",
            "Onc Org",
            "Cell Org",
            "Kite Org",
        ]
        .iter()
        .map(|s| s.to_string())
        .collect();
        let mut t = Table::new("roster", headers);
        for id in 10..18i64 {
            let onc = (id < 14) as i64;
            let cell = (id < 12) as i64;
            let kite = (id >= 14) as i64;
            t.push_row(vec![
                Cell::Int(id),
                Cell::Text("A".to_string()),
                Cell::Text("B".to_string()),
                Cell::Int(1),
                Cell::Int(1),
                Cell::Int(onc),
                Cell::Int(cell),
                Cell::Int(kite),
            ]);
        }
        Roster::from_table(t).unwrap()
    }

    fn gm_table() -> GmLevels {
        let headers: Vec<String> = [
            "GM ID",
            "GM Org",
            "Parent Level",
            "GM Level 2 Org",
            "GM Level 3 Org",
            "GM Level 4 Org",
        ]
        .iter()
        .map(|s| s.to_string())
        .collect();
        let mut t = Table::new("gm levels", headers);
        let mut push = |id: i64, org: &str, parent: i64, l2: &str, l3: &str, l4: &str| {
            let chain = |v: &str| {
                if v.is_empty() {
                    Cell::Empty
                } else {
                    Cell::Text(v.to_string())
                }
            };
            t.push_row(vec![
                Cell::Int(id),
                Cell::Text(org.to_string()),
                Cell::Int(parent),
                chain(l2),
                chain(l3),
                chain(l4),
            ]);
        };
        push(900, "Pharma Org", 1, "Pharma Org", "", "");
        push(901, "Onc Org", 2, "Pharma Org", "Onc Org", "");
        push(902, "Kite Org", 2, "Pharma Org", "Kite Org", "");
        push(903, "Cell Org", 3, "Pharma Org", "Onc Org", "Cell Org");
        GmLevels::from_table(t).unwrap()
    }

    #[test]
    fn affiliates_expand_the_leaders_own_subtree() {
        let roster = affiliate_roster();
        let gm = gm_table();
        let opts = ResolveOptions {
            affiliate: Some(AffiliateMode::TwoLevels),
            ..ResolveOptions::default()
        };
        let ctx = resolve_all(&roster, Some(&gm), &LeaderSpec::Gm(900), &opts);
        let groups = partition(&ctx, &roster, Some(&gm));
        let aff = group(&groups, Dimension::Affiliate);
        let names: Vec<&str> = aff.cohorts.iter().map(|c| c.name.as_str()).collect();
        // Level-3 orgs under Pharma with their level-4 children indented,
        // Kite last.
        assert_eq!(names, vec!["Onc Org", "    Cell Org", "Kite Org"]);
        let counts: Vec<usize> = aff.cohorts.iter().map(|c| c.rows.len()).collect();
        assert_eq!(counts, vec![4, 2, 4]);
    }

    #[test]
    fn one_level_mode_lists_level_four_children() {
        let roster = affiliate_roster();
        let gm = gm_table();
        let opts = ResolveOptions {
            affiliate: Some(AffiliateMode::OneLevel),
            ..ResolveOptions::default()
        };
        let ctx = resolve_all(&roster, Some(&gm), &LeaderSpec::Gm(901), &opts);
        let groups = partition(&ctx, &roster, Some(&gm));
        let aff = group(&groups, Dimension::Affiliate);
        let names: Vec<&str> = aff.cohorts.iter().map(|c| c.name.as_str()).collect();
        assert_eq!(names, vec!["Cell Org"]);
        assert_eq!(aff.cohorts[0].rows.len(), 2);
    }
}

//! Roster access and leader resolution.
//!
//! The roster is the population table: one row per invited employee, with
//! the supervisor chain flattened into `Supervisor Level {n} ID` columns
//! and the demographic attributes as plain columns. Resolution turns a
//! leader request into the concrete populations (own org, parent org) that
//! the aggregation runs over.

use std::collections::HashMap;

use log::{debug, info};

use crate::config::*;
use crate::normalize::ResponseTable;

pub const WORKER_ID: &str = "Worker ID";
pub const WORKER_NAME: &str = "Worker Name";
pub const WORKER_LAST_NAME: &str = "Worker Last Name";
pub const INVITEE_FLAG: &str = "Invitee Flag";

pub fn supervisor_column(level: u32) -> String {
    format!("Supervisor Level {} ID", level)
}

/// The roster table with its navigation indexes.
#[derive(Debug, Clone)]
pub struct Roster {
    table: Table,
    worker_id: usize,
    name: usize,
    last_name: usize,
    invitee: Option<usize>,
    /// Column index of each `Supervisor Level {n} ID` column present.
    supervisor: HashMap<u32, usize>,
    by_id: HashMap<u64, usize>,
}

impl Roster {
    pub fn from_table(table: Table) -> Result<Roster, ReportError> {
        let worker_id = table.require(WORKER_ID)?;
        let name = table.require(WORKER_NAME)?;
        let last_name = table.require(WORKER_LAST_NAME)?;
        let invitee = table.column(INVITEE_FLAG);
        let mut supervisor = HashMap::new();
        for level in SUPERVISOR_LEVELS {
            if let Some(col) = table.column(&supervisor_column(level)) {
                supervisor.insert(level, col);
            }
        }
        let mut by_id = HashMap::new();
        for row in 0..table.rows.len() {
            if let Some(id) = table.cell(row, worker_id).as_id() {
                by_id.insert(id, row);
            }
        }
        debug!(
            "{}: {} workers, supervisor levels up to {}",
            table.name,
            by_id.len(),
            supervisor.keys().max().copied().unwrap_or(0)
        );
        Ok(Roster {
            table,
            worker_id,
            name,
            last_name,
            invitee,
            supervisor,
            by_id,
        })
    }

    pub fn len(&self) -> usize {
        self.table.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.table.rows.is_empty()
    }

    pub fn rows(&self) -> std::ops::Range<usize> {
        0..self.len()
    }

    pub fn worker_id(&self, row: usize) -> Option<u64> {
        self.table.cell(row, self.worker_id).as_id()
    }

    pub fn name(&self, row: usize) -> String {
        self.table.cell(row, self.name).display()
    }

    pub fn last_name(&self, row: usize) -> String {
        self.table.cell(row, self.last_name).display()
    }

    /// Whether the worker was invited to take the survey. Rosters without
    /// the flag column treat everyone as invited.
    pub fn invited(&self, row: usize) -> bool {
        match self.invitee {
            Some(col) => self.table.cell(row, col).as_f64() == Some(1.0),
            None => true,
        }
    }

    pub fn supervisor_id(&self, row: usize, level: u32) -> Option<u64> {
        let col = *self.supervisor.get(&level)?;
        self.table.cell(row, col).as_id()
    }

    pub fn has_supervisor_level(&self, level: u32) -> bool {
        self.supervisor.contains_key(&level)
    }

    /// A demographic attribute as display text, `None` when the column is
    /// absent or the cell empty.
    pub fn attr(&self, row: usize, column: &str) -> Option<String> {
        let col = self.table.column(column)?;
        let cell = self.table.cell(row, col);
        if cell.is_empty() {
            None
        } else {
            Some(cell.display())
        }
    }

    /// A 0/1 indicator column, false when absent.
    pub fn flag(&self, row: usize, column: &str) -> bool {
        self.table
            .column(column)
            .map(|col| self.table.cell(row, col).as_f64() == Some(1.0))
            .unwrap_or(false)
    }

    pub fn has_column(&self, column: &str) -> bool {
        self.table.has_column(column)
    }

    pub fn find(&self, worker_id: u64) -> Option<usize> {
        self.by_id.get(&worker_id).copied()
    }

    /// The rows whose supervisor at `level` is `leader_id`.
    pub fn org_of(&self, leader_id: u64, level: u32) -> Vec<usize> {
        self.rows()
            .filter(|&row| self.supervisor_id(row, level) == Some(leader_id))
            .collect()
    }

    /// The lowest supervisor level at which `leader_id` appears, if any.
    pub fn leader_level(&self, leader_id: u64) -> Option<u32> {
        let mut levels: Vec<u32> = self.supervisor.keys().copied().collect();
        levels.sort_unstable();
        levels
            .into_iter()
            .find(|&level| self.rows().any(|row| self.supervisor_id(row, level) == Some(leader_id)))
    }
}

/// The cross-functional org table: one row per general-manager org, with
/// the GM chain flattened like the supervisor chain of the roster.
#[derive(Debug, Clone)]
pub struct GmLevels {
    table: Table,
    gm_id: usize,
    gm_org: usize,
    parent_level: usize,
}

impl GmLevels {
    pub fn from_table(table: Table) -> Result<GmLevels, ReportError> {
        let gm_id = table.require("GM ID")?;
        let gm_org = table.require("GM Org")?;
        let parent_level = table.require("Parent Level")?;
        Ok(GmLevels {
            table,
            gm_id,
            gm_org,
            parent_level,
        })
    }

    pub fn find(&self, gm_id: u64) -> Option<usize> {
        (0..self.table.rows.len()).find(|&row| self.table.cell(row, self.gm_id).as_id() == Some(gm_id))
    }

    pub fn org(&self, row: usize) -> String {
        self.table.cell(row, self.gm_org).display()
    }

    pub fn parent_level(&self, row: usize) -> Option<u32> {
        self.table.cell(row, self.parent_level).as_id().map(|v| v as u32)
    }

    /// The org name at a given level of the GM chain for this row.
    pub fn level_org(&self, row: usize, level: u32) -> Option<String> {
        let col = self.table.column(&format!("GM Level {} Org", level))?;
        let cell = self.table.cell(row, col);
        if cell.is_empty() {
            None
        } else {
            Some(cell.display())
        }
    }

    /// The level of the org itself: the deepest filled level of its chain.
    pub fn own_level(&self, row: usize) -> Option<u32> {
        SUPERVISOR_LEVELS
            .filter(|&level| self.level_org(row, level).is_some())
            .max()
    }

    /// Rows of the orgs at `level` whose chain passes through `anchor` at
    /// `anchor_level`.
    pub fn subtree_rows(&self, anchor: &str, anchor_level: u32, level: u32) -> Vec<usize> {
        (0..self.table.rows.len())
            .filter(|&row| {
                self.own_level(row) == Some(level)
                    && self.level_org(row, anchor_level).as_deref() == Some(anchor)
            })
            .collect()
    }
}

/// Which leader a report run is for.
#[derive(Eq, PartialEq, Debug, Clone)]
pub enum LeaderSpec {
    /// A supervisor in the human hierarchy, by worker id.
    Worker(u64),
    /// A general manager of a cross-functional org, by GM id.
    Gm(u64),
    /// A site cut of a supervisor's org. `site` names the indicator column.
    Site { leader: u64, site: String },
}

impl LeaderSpec {
    pub fn leader_id(&self) -> u64 {
        match self {
            LeaderSpec::Worker(id) | LeaderSpec::Gm(id) => *id,
            LeaderSpec::Site { leader, .. } => *leader,
        }
    }
}

#[derive(Eq, PartialEq, Debug, Clone, Copy)]
pub enum LeaderKind {
    Worker,
    Gm,
    Site,
}

/// How the affiliate section expands under the leader's own GM org.
#[derive(Eq, PartialEq, Debug, Clone, Copy)]
pub enum AffiliateMode {
    /// The org's level-3 children with their level-4 children indented.
    TwoLevels,
    /// The org's level-4 children only.
    OneLevel,
}

#[derive(Debug, Clone)]
pub struct ResolveOptions {
    pub company_sentinel: u64,
    /// GM runs keep the human-hierarchy parent instead of the GM chain
    /// parent.
    pub gm_region_parent: bool,
    pub affiliate: Option<AffiliateMode>,
}

impl Default for ResolveOptions {
    fn default() -> Self {
        ResolveOptions {
            company_sentinel: COMPANY_SENTINEL,
            gm_region_parent: false,
            affiliate: None,
        }
    }
}

/// The immutable output of leader resolution: who the report is about and
/// which roster rows each comparison population holds.
#[derive(Debug, Clone)]
pub struct HierarchyContext {
    pub leader_id: u64,
    pub kind: LeaderKind,
    /// Supervisor level at which the leader sits (1 for the company run).
    pub level: u32,
    /// 1 = company overall, 2 = top-level org, 3 = org with a parent org.
    pub logic: u8,
    pub org_name: String,
    /// Label safe for use in output file names.
    pub file_label: String,
    pub parent_label: Option<String>,
    /// Invitee headcount of the org, counted over the full roster.
    pub invited: usize,
    /// Rows of the leader's own org: invited workers who answered the
    /// current cycle.
    pub your_org: Vec<usize>,
    /// Answering rows of the same org in the prior-cycle roster. Empty when
    /// the leader cannot be located there.
    pub your_org_past: Vec<usize>,
    /// Rows of the parent org, present for logic 3 only.
    pub parent_org: Option<Vec<usize>>,
    pub affiliate: Option<AffiliateMode>,
}

fn leader_display_name(roster: &Roster, leader_id: u64) -> Option<String> {
    roster
        .find(leader_id)
        .map(|row| format!("{} {}", roster.name(row), roster.last_name(row)))
}

/// Restricts `rows` to invited workers present in the recoded responses.
fn answered_rows(roster: &Roster, responses: &ResponseTable, rows: &[usize]) -> Vec<usize> {
    rows.iter()
        .copied()
        .filter(|&row| {
            roster.invited(row)
                && roster
                    .worker_id(row)
                    .map(|id| responses.contains(id))
                    .unwrap_or(false)
        })
        .collect()
}

fn invited_count(roster: &Roster, rows: &[usize]) -> usize {
    rows.iter().filter(|&&row| roster.invited(row)).count()
}

fn past_org_of(roster_past: &Roster, responses_past: &ResponseTable, leader_id: u64) -> Vec<usize> {
    match roster_past.leader_level(leader_id) {
        Some(level) => answered_rows(
            roster_past,
            responses_past,
            &roster_past.org_of(leader_id, level),
        ),
        None => Vec::new(),
    }
}

fn resolve_worker(
    roster: &Roster,
    responses: &ResponseTable,
    roster_past: &Roster,
    responses_past: &ResponseTable,
    leader_id: u64,
    opts: &ResolveOptions,
) -> Result<HierarchyContext, ReportError> {
    if leader_id == opts.company_sentinel {
        let all: Vec<usize> = roster.rows().collect();
        let past_all: Vec<usize> = roster_past.rows().collect();
        return Ok(HierarchyContext {
            leader_id,
            kind: LeaderKind::Worker,
            level: 1,
            logic: 1,
            org_name: "Company".to_string(),
            file_label: "Company".to_string(),
            parent_label: None,
            invited: invited_count(roster, &all),
            your_org: answered_rows(roster, responses, &all),
            your_org_past: answered_rows(roster_past, responses_past, &past_all),
            parent_org: None,
            affiliate: opts.affiliate,
        });
    }

    let level = roster
        .leader_level(leader_id)
        .ok_or(ReportError::HierarchyResolution { leader_id })?;
    let full_org = roster.org_of(leader_id, level);
    let your_org = answered_rows(roster, responses, &full_org);
    let org_name =
        leader_display_name(roster, leader_id).unwrap_or_else(|| format!("Leader {}", leader_id));
    if your_org.len() < MIN_CELL_SIZE {
        return Err(ReportError::OrgTooSmall {
            leader_id,
            org: org_name,
        });
    }

    let (logic, parent_org, parent_label) = if level >= 3 {
        // The parent org is everyone under the leader's own boss at the
        // level above, the leader's org included.
        let boss = full_org
            .iter()
            .find_map(|&row| roster.supervisor_id(row, level - 1))
            .ok_or(ReportError::HierarchyResolution { leader_id })?;
        let parent = answered_rows(roster, responses, &roster.org_of(boss, level - 1));
        let label =
            leader_display_name(roster, boss).unwrap_or_else(|| format!("Leader {}", boss));
        (3u8, Some(parent), Some(label))
    } else {
        (2u8, None, None)
    };

    debug!(
        "resolved leader {} at level {} (logic {}): {} answering of {}, parent {:?}",
        leader_id,
        level,
        logic,
        your_org.len(),
        full_org.len(),
        parent_org.as_ref().map(|p| p.len())
    );
    Ok(HierarchyContext {
        leader_id,
        kind: LeaderKind::Worker,
        level,
        logic,
        org_name: org_name.clone(),
        file_label: org_name,
        parent_label,
        invited: invited_count(roster, &full_org),
        your_org,
        your_org_past: past_org_of(roster_past, responses_past, leader_id),
        parent_org,
        affiliate: opts.affiliate,
    })
}

fn resolve_gm(
    roster: &Roster,
    responses: &ResponseTable,
    roster_past: &Roster,
    responses_past: &ResponseTable,
    gm_levels: Option<&GmLevels>,
    gm_id: u64,
    opts: &ResolveOptions,
) -> Result<HierarchyContext, ReportError> {
    let levels = gm_levels.ok_or(ReportError::HierarchyResolution { leader_id: gm_id })?;
    let gm_row = levels
        .find(gm_id)
        .ok_or(ReportError::HierarchyResolution { leader_id: gm_id })?;
    let org = levels.org(gm_row);
    // Membership is the indicator column named after the org.
    let full_org: Vec<usize> = roster.rows().filter(|&row| roster.flag(row, &org)).collect();
    let your_org = answered_rows(roster, responses, &full_org);
    if your_org.len() < MIN_CELL_SIZE {
        return Err(ReportError::OrgTooSmall {
            leader_id: gm_id,
            org,
        });
    }
    let parent_level = levels
        .parent_level(gm_row)
        .ok_or(ReportError::HierarchyResolution { leader_id: gm_id })?;

    let (logic, level, parent_org, parent_label) = if opts.gm_region_parent {
        // Keep the human-hierarchy parent: everyone under the GM's own
        // boss, regardless of the GM chain.
        let gm_level = roster
            .leader_level(gm_id)
            .ok_or(ReportError::HierarchyResolution { leader_id: gm_id })?;
        if gm_level >= 3 {
            let own = roster.org_of(gm_id, gm_level);
            let boss = own
                .iter()
                .find_map(|&row| roster.supervisor_id(row, gm_level - 1))
                .ok_or(ReportError::HierarchyResolution { leader_id: gm_id })?;
            let label =
                leader_display_name(roster, boss).unwrap_or_else(|| format!("Leader {}", boss));
            let parent = answered_rows(roster, responses, &roster.org_of(boss, gm_level - 1));
            (3u8, gm_level, Some(parent), Some(label))
        } else {
            (2u8, gm_level, None, None)
        }
    } else if parent_level <= 1 {
        (2u8, 2, None, None)
    } else {
        let parent_org_name = levels
            .level_org(gm_row, parent_level)
            .ok_or(ReportError::HierarchyResolution { leader_id: gm_id })?;
        let parent_full: Vec<usize> = roster
            .rows()
            .filter(|&row| roster.flag(row, &parent_org_name))
            .collect();
        let parent = answered_rows(roster, responses, &parent_full);
        (3u8, parent_level + 1, Some(parent), Some(parent_org_name))
    };

    let past_full: Vec<usize> = roster_past
        .rows()
        .filter(|&row| roster_past.flag(row, &org))
        .collect();
    let your_org_past = answered_rows(roster_past, responses_past, &past_full);
    let file_label = org.trim_end_matches(" Org").to_string();
    info!("resolved GM {} as {:?} (logic {})", gm_id, org, logic);
    Ok(HierarchyContext {
        leader_id: gm_id,
        kind: LeaderKind::Gm,
        level,
        logic,
        org_name: org,
        file_label,
        parent_label,
        invited: invited_count(roster, &full_org),
        your_org,
        your_org_past,
        parent_org,
        affiliate: opts.affiliate,
    })
}

fn resolve_site(
    roster: &Roster,
    responses: &ResponseTable,
    roster_past: &Roster,
    responses_past: &ResponseTable,
    leader_id: u64,
    site: &str,
    opts: &ResolveOptions,
) -> Result<HierarchyContext, ReportError> {
    let base = resolve_worker(roster, responses, roster_past, responses_past, leader_id, opts)?;
    let your_org: Vec<usize> = base
        .your_org
        .iter()
        .copied()
        .filter(|&row| roster.flag(row, site))
        .collect();
    if your_org.len() < MIN_CELL_SIZE {
        return Err(ReportError::OrgTooSmall {
            leader_id,
            org: site.to_string(),
        });
    }
    let full_site: Vec<usize> = if leader_id == opts.company_sentinel {
        roster.rows().filter(|&row| roster.flag(row, site)).collect()
    } else {
        roster
            .org_of(leader_id, base.level)
            .into_iter()
            .filter(|&row| roster.flag(row, site))
            .collect()
    };
    let your_org_past: Vec<usize> = base
        .your_org_past
        .iter()
        .copied()
        .filter(|&row| roster_past.flag(row, site))
        .collect();
    // The site cut compares against the leader's whole org.
    Ok(HierarchyContext {
        leader_id,
        kind: LeaderKind::Site,
        level: base.level,
        logic: 3,
        org_name: site.to_string(),
        file_label: site.replace(" / ", " "),
        parent_label: Some(base.org_name.clone()),
        invited: invited_count(roster, &full_site),
        your_org,
        your_org_past,
        parent_org: Some(base.your_org),
        affiliate: opts.affiliate,
    })
}

/// Resolves a leader request against the rosters. Org populations hold
/// only invited workers who answered the current cycle.
pub fn resolve(
    roster: &Roster,
    responses: &ResponseTable,
    roster_past: &Roster,
    responses_past: &ResponseTable,
    gm_levels: Option<&GmLevels>,
    spec: &LeaderSpec,
    opts: &ResolveOptions,
) -> Result<HierarchyContext, ReportError> {
    match spec {
        LeaderSpec::Worker(id) => {
            resolve_worker(roster, responses, roster_past, responses_past, *id, opts)
        }
        LeaderSpec::Gm(id) => {
            resolve_gm(roster, responses, roster_past, responses_past, gm_levels, *id, opts)
        }
        LeaderSpec::Site { leader, site } => {
            resolve_site(roster, responses, roster_past, responses_past, *leader, site, opts)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::normalize::{RecodeScheme, EXTERNAL_REFERENCE, METADATA_ROWS};

    // A roster with a three-level hierarchy:
    //   1 (level 2) over workers 10..18, split between
    //   2 (level 3, workers 10..14) and 3 (level 3, workers 15..18).
    fn test_roster() -> Roster {
        let headers: Vec<String> = [
            WORKER_ID,
            WORKER_NAME,
            WORKER_LAST_NAME,
            INVITEE_FLAG,
            "Supervisor Level 2 ID",
            "Supervisor Level 3 ID",
            "Oncology Org",
        ]
        .iter()
        .map(|s| s.to_string())
        .collect();
        let mut t = Table::new("roster", headers);
        let mut push = |id: i64, l2: i64, l3: i64, onc: i64| {
            t.push_row(vec![
                Cell::Int(id),
                Cell::Text(format!("First{}", id)),
                Cell::Text(format!("Last{}", id)),
                Cell::Int(1),
                Cell::Int(l2),
                Cell::Int(l3),
                Cell::Int(onc),
            ]);
        };
        for id in 10..15 {
            push(id, 1, 2, 1);
        }
        for id in 15..19 {
            push(id, 1, 3, 0);
        }
        // The leaders themselves, rolled up under the company head.
        push(1, 1, 0, 0);
        push(2, 1, 2, 1);
        push(3, 1, 3, 0);
        Roster::from_table(t).unwrap()
    }

    fn empty_past() -> Roster {
        let headers: Vec<String> = [WORKER_ID, WORKER_NAME, WORKER_LAST_NAME]
            .iter()
            .map(|s| s.to_string())
            .collect();
        Roster::from_table(Table::new("roster past", headers)).unwrap()
    }

    fn responses_for(ids: &[u64]) -> ResponseTable {
        let mut t = Table::new("responses", vec![EXTERNAL_REFERENCE.to_string()]);
        for _ in 0..METADATA_ROWS {
            t.push_row(vec![Cell::Text("meta".to_string())]);
        }
        for &id in ids {
            t.push_row(vec![Cell::Int(id as i64)]);
        }
        ResponseTable::from_raw(&t, &[], &[], RecodeScheme::TwoWay).unwrap()
    }

    fn all_answered(roster: &Roster) -> ResponseTable {
        let ids: Vec<u64> = roster.rows().filter_map(|r| roster.worker_id(r)).collect();
        responses_for(&ids)
    }

    fn resolve_all(
        roster: &Roster,
        gm: Option<&GmLevels>,
        spec: &LeaderSpec,
    ) -> Result<HierarchyContext, ReportError> {
        resolve(
            roster,
            &all_answered(roster),
            &empty_past(),
            &responses_for(&[]),
            gm,
            spec,
            &ResolveOptions::default(),
        )
    }

    #[test]
    fn company_sentinel_is_logic_one() {
        let roster = test_roster();
        let ctx = resolve_all(&roster, None, &LeaderSpec::Worker(COMPANY_SENTINEL)).unwrap();
        assert_eq!(ctx.logic, 1);
        assert_eq!(ctx.level, 1);
        assert_eq!(ctx.your_org.len(), roster.len());
        assert_eq!(ctx.invited, roster.len());
        assert!(ctx.parent_org.is_none());
    }

    #[test]
    fn level_three_leader_gets_sibling_parent() {
        let roster = test_roster();
        let ctx = resolve_all(&roster, None, &LeaderSpec::Worker(2)).unwrap();
        assert_eq!(ctx.logic, 3);
        assert_eq!(ctx.level, 3);
        assert_eq!(ctx.org_name, "First2 Last2");
        // Workers 10..14 plus leader 2's own row.
        assert_eq!(ctx.your_org.len(), 6);
        // Parent is everyone under 1 at level 2, which is the whole roster.
        assert_eq!(ctx.parent_org.as_ref().unwrap().len(), roster.len());
        assert_eq!(ctx.parent_label.as_deref(), Some("First1 Last1"));
    }

    #[test]
    fn level_two_leader_has_no_parent_org() {
        let roster = test_roster();
        let ctx = resolve_all(&roster, None, &LeaderSpec::Worker(1)).unwrap();
        assert_eq!(ctx.logic, 2);
        assert!(ctx.parent_org.is_none());
    }

    #[test]
    fn unknown_leader_is_a_resolution_error() {
        let roster = test_roster();
        let err = resolve_all(&roster, None, &LeaderSpec::Worker(777)).unwrap_err();
        assert_eq!(err, ReportError::HierarchyResolution { leader_id: 777 });
        assert!(!err.is_fatal());
    }

    fn flat_roster(n: i64) -> Roster {
        let headers: Vec<String> = [
            WORKER_ID,
            WORKER_NAME,
            WORKER_LAST_NAME,
            INVITEE_FLAG,
            "Supervisor Level 2 ID",
        ]
        .iter()
        .map(|s| s.to_string())
        .collect();
        let mut t = Table::new("roster", headers);
        for id in 10..10 + n {
            t.push_row(vec![
                Cell::Int(id),
                Cell::Text("A".to_string()),
                Cell::Text("B".to_string()),
                Cell::Int(1),
                Cell::Int(5),
            ]);
        }
        Roster::from_table(t).unwrap()
    }

    #[test]
    fn small_org_is_skipped() {
        let roster = flat_roster(3);
        let err = resolve_all(&roster, None, &LeaderSpec::Worker(5)).unwrap_err();
        assert!(matches!(err, ReportError::OrgTooSmall { leader_id: 5, .. }));
    }

    #[test]
    fn unanswered_org_members_do_not_count() {
        // Eight on the roster but only three answered, which is below
        // the minimum cell size.
        let roster = flat_roster(8);
        let responses = responses_for(&[10, 11, 12]);
        let err = resolve(
            &roster,
            &responses,
            &empty_past(),
            &responses_for(&[]),
            None,
            &LeaderSpec::Worker(5),
            &ResolveOptions::default(),
        )
        .unwrap_err();
        assert!(matches!(err, ReportError::OrgTooSmall { leader_id: 5, .. }));
    }

    #[test]
    fn non_invitees_are_excluded_from_the_org() {
        let headers: Vec<String> = [
            WORKER_ID,
            WORKER_NAME,
            WORKER_LAST_NAME,
            INVITEE_FLAG,
            "Supervisor Level 2 ID",
        ]
        .iter()
        .map(|s| s.to_string())
        .collect();
        let mut t = Table::new("roster", headers);
        for id in 10..18 {
            let invited = if id < 14 { 1 } else { 0 };
            t.push_row(vec![
                Cell::Int(id),
                Cell::Text("A".to_string()),
                Cell::Text("B".to_string()),
                Cell::Int(invited),
                Cell::Int(5),
            ]);
        }
        let roster = Roster::from_table(t).unwrap();
        let ctx = resolve_all(&roster, None, &LeaderSpec::Worker(5)).unwrap();
        assert_eq!(ctx.your_org.len(), 4);
        assert_eq!(ctx.invited, 4);
    }

    #[test]
    fn gm_membership_comes_from_indicator_column() {
        let roster = test_roster();
        let headers: Vec<String> = ["GM ID", "GM Org", "Parent Level"]
            .iter()
            .map(|s| s.to_string())
            .collect();
        let mut t = Table::new("gm levels", headers);
        t.push_row(vec![
            Cell::Int(900),
            Cell::Text("Oncology Org".to_string()),
            Cell::Int(1),
        ]);
        let gm = GmLevels::from_table(t).unwrap();
        let ctx = resolve_all(&roster, Some(&gm), &LeaderSpec::Gm(900)).unwrap();
        assert_eq!(ctx.kind, LeaderKind::Gm);
        assert_eq!(ctx.logic, 2);
        // Six rows carry the Oncology indicator.
        assert_eq!(ctx.your_org.len(), 6);
        assert_eq!(ctx.invited, 6);
        assert_eq!(ctx.file_label, "Oncology");
    }

    #[test]
    fn site_cut_uses_whole_org_as_parent() {
        let roster = test_roster();
        let ctx = resolve_all(
            &roster,
            None,
            &LeaderSpec::Site {
                leader: 2,
                site: "Oncology Org".to_string(),
            },
        )
        .unwrap();
        assert_eq!(ctx.kind, LeaderKind::Site);
        assert_eq!(ctx.logic, 3);
        // All six org members carry the indicator here.
        assert_eq!(ctx.your_org.len(), 6);
        assert_eq!(ctx.parent_org.as_ref().unwrap().len(), 6);
        assert_eq!(ctx.parent_label.as_deref(), Some("First2 Last2"));
    }
}

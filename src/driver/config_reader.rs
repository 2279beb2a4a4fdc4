use crate::driver::*;

use serde::{Deserialize, Serialize};
use snafu::prelude::*;
use survey_aggregation::LeaderSpec;

#[derive(Eq, PartialEq, Debug, Clone, Serialize, Deserialize)]
pub struct RunSettings {
    #[serde(rename = "currentYear")]
    pub current_year: String,
    #[serde(rename = "pastYear")]
    pub past_year: String,
    #[serde(rename = "outputDirectory")]
    pub output_directory: Option<String>,
    #[serde(rename = "gmRegionParent")]
    pub gm_region_parent: Option<bool>,
    /// Depth of the affiliate section, 1 or 2. Absent means no affiliate
    /// section.
    #[serde(rename = "affiliateLevels")]
    pub affiliate_levels: Option<u32>,
}

#[derive(Eq, PartialEq, Debug, Clone, Serialize, Deserialize)]
pub struct FileRef {
    #[serde(rename = "filePath")]
    pub file_path: String,
    /// For workbook inputs; the first worksheet is used when absent.
    #[serde(rename = "worksheetName")]
    pub worksheet_name: Option<String>,
}

#[derive(Eq, PartialEq, Debug, Clone, Serialize, Deserialize)]
pub struct InputFiles {
    pub items: FileRef,
    pub categories: FileRef,
    pub responses: FileRef,
    #[serde(rename = "responsesPast")]
    pub responses_past: FileRef,
    pub roster: FileRef,
    #[serde(rename = "rosterPast")]
    pub roster_past: FileRef,
    pub benchmark: FileRef,
    #[serde(rename = "heatmapColors")]
    pub heatmap_colors: FileRef,
    #[serde(rename = "gmLevels")]
    pub gm_levels: Option<FileRef>,
}

#[derive(Eq, PartialEq, Debug, Clone, Serialize, Deserialize)]
pub struct LeaderEntry {
    #[serde(rename = "leaderId")]
    pub leader_id: u64,
    /// "worker" (the default), "gm" or "site".
    pub kind: Option<String>,
    /// The site indicator column, for "site" leaders only.
    pub site: Option<String>,
}

impl LeaderEntry {
    pub fn to_spec(&self) -> DriverResult<LeaderSpec> {
        match self.kind.as_deref().unwrap_or("worker") {
            "worker" => Ok(LeaderSpec::Worker(self.leader_id)),
            "gm" => Ok(LeaderSpec::Gm(self.leader_id)),
            "site" => match self.site.clone() {
                Some(site) => Ok(LeaderSpec::Site {
                    leader: self.leader_id,
                    site,
                }),
                None => whatever!("leader {} has kind 'site' but no site name", self.leader_id),
            },
            x => whatever!("unknown leader kind {:?}", x),
        }
    }
}

#[derive(Eq, PartialEq, Debug, Clone, Serialize, Deserialize)]
pub struct RunConfig {
    pub settings: RunSettings,
    #[serde(rename = "inputFiles")]
    pub input_files: InputFiles,
    pub leaders: Vec<LeaderEntry>,
}

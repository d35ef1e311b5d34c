use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::region::{Region, RegionType};
use crate::types::TaskId;

/// A sanitized, queued extraction job.
///
/// Also persisted as `<id>_region.json` once the job completes so clients can
/// redisplay the region and resubmit it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Task {
    pub uuid: TaskId,
    pub sanitized_name: String,
    pub sanitized_region_type: RegionType,
    pub sanitized_region_data: Value,
}

impl Task {
    pub fn new(uuid: TaskId, region: Region) -> Self {
        Self {
            uuid,
            sanitized_name: region.name,
            sanitized_region_type: region.region_type,
            sanitized_region_data: region.data,
        }
    }

    /// File name of the region description handed to the extraction tool.
    pub fn region_file_name(&self) -> String {
        format!("{}.{}", self.uuid, self.sanitized_region_type)
    }

    /// Contents of the region description file.
    ///
    /// GeoJSON is written as-is. A bbox is written as its four bare
    /// comma-separated numbers, without the surrounding brackets.
    pub fn region_file_contents(&self) -> Result<Vec<u8>, serde_json::Error> {
        let json = serde_json::to_string(&self.sanitized_region_data)?;
        let contents = match self.sanitized_region_type {
            RegionType::Geojson => json,
            RegionType::Bbox => json
                .strip_prefix('[')
                .and_then(|s| s.strip_suffix(']'))
                .map(str::to_owned)
                .unwrap_or(json),
        };
        Ok(contents.into_bytes())
    }
}

//! Merging per-platform results into the exported build result

use crate::frontend::gateway::Reference;
use crate::platform::{Platform, TargetPlatform};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

pub const EXPORTER_IMAGE_CONFIG_KEY: &str = "containerimage.config";
pub const EXPORTER_BUILD_INFO_KEY: &str = "containerimage.buildinfo";
/// Index of all exported platforms, only set for multi-platform builds
pub const EXPORTER_PLATFORMS_KEY: &str = "refs.platforms";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExportPlatform {
    #[serde(rename = "ID")]
    pub id: String,
    #[serde(rename = "Platform")]
    pub platform: Platform,
}

impl ExportPlatform {
    pub fn new(platform: Platform) -> Self {
        Self {
            id: platform.id(),
            platform,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExportPlatforms {
    #[serde(rename = "Platforms")]
    pub platforms: Vec<ExportPlatform>,
}

/// Output of one platform build
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuildResult {
    pub reference: Reference,
    pub image_config: Vec<u8>,
    pub build_info: Vec<u8>,
    pub platform: TargetPlatform,
    pub export_platform: ExportPlatform,
}

/// What the frontend hands back to the build client
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FinalResult {
    pub metadata: BTreeMap<String, Vec<u8>>,
    pub refs: BTreeMap<String, Reference>,
    /// Set for single-platform builds only
    pub reference: Option<Reference>,
}

impl FinalResult {
    /// Decodes the platform index entry, if present
    pub fn export_platforms(&self) -> Result<Option<ExportPlatforms>, serde_json::Error> {
        self.metadata
            .get(EXPORTER_PLATFORMS_KEY)
            .map(|bytes| serde_json::from_slice(bytes))
            .transpose()
    }
}

/// Merges results given in request order.
///
/// A single-platform build exports unqualified keys and one reference.
/// Multi-platform builds suffix every key with the export ID, key refs by
/// export ID, and add the platform index.
pub fn aggregate(
    results: Vec<BuildResult>,
    multi_platform: bool,
) -> Result<FinalResult, serde_json::Error> {
    let mut merged = FinalResult::default();
    let mut index = ExportPlatforms::default();

    for result in results {
        if multi_platform {
            let id = &result.export_platform.id;
            merged.metadata.insert(
                format!("{}/{}", EXPORTER_IMAGE_CONFIG_KEY, id),
                result.image_config,
            );
            merged.metadata.insert(
                format!("{}/{}", EXPORTER_BUILD_INFO_KEY, id),
                result.build_info,
            );
            merged.refs.insert(id.clone(), result.reference);
            index.platforms.push(result.export_platform);
        } else {
            merged
                .metadata
                .insert(EXPORTER_IMAGE_CONFIG_KEY.to_string(), result.image_config);
            merged
                .metadata
                .insert(EXPORTER_BUILD_INFO_KEY.to_string(), result.build_info);
            merged.reference = Some(result.reference);
        }
    }

    if multi_platform {
        merged
            .metadata
            .insert(EXPORTER_PLATFORMS_KEY.to_string(), serde_json::to_vec(&index)?);
    }

    Ok(merged)
}

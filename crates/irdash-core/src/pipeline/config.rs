use serde::{Deserialize, Serialize};

use crate::background::BackgroundParams;
use crate::cosmic::{CosmicConfig, DetectorParams};

/// Full configuration of one reduction run. Every section has usable
/// defaults, so a TOML file only needs the knobs it changes.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct ReductionConfig {
    #[serde(default)]
    pub background: BackgroundParams,
    #[serde(default)]
    pub cosmic: CosmicConfig,
    #[serde(default)]
    pub detector: DetectorParams,
}

//! Data-taking campaign metadata.

use serde::{Deserialize, Serialize};

/// A data-taking campaign (era of data plus the matching simulation).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Campaign {
    /// Campaign name, e.g. `run3_2022_preEE_hlep_rare`.
    pub name: String,
    /// Data-taking year.
    pub year: u32,
    /// Centre-of-mass energy (TeV).
    pub ecm: f64,
    /// NanoAOD format version of the campaign's datasets.
    pub nano_version: u32,
    /// Site-specific storage information, when the campaign was produced privately.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub custom: Option<CustomSite>,
}

/// Privately produced campaign storage.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CustomSite {
    /// Producing group (`desy` enables local LFN discovery).
    pub creator: String,
    /// Base location prepended to dataset keys.
    #[serde(default)]
    pub location: Option<String>,
}

/// NanoAOD version class used for column selection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NanoVersion {
    /// NanoAOD v9 (Run 2 ultra-legacy).
    V9,
    /// NanoAOD v10 or newer.
    V11Plus,
    /// Anything older than v9.
    Other(u32),
}

impl From<u32> for NanoVersion {
    fn from(v: u32) -> Self {
        match v {
            9 => NanoVersion::V9,
            v if v >= 10 => NanoVersion::V11Plus,
            v => NanoVersion::Other(v),
        }
    }
}

impl Campaign {
    /// NanoAOD version class of this campaign.
    pub fn nano(&self) -> NanoVersion {
        NanoVersion::from(self.nano_version)
    }

    /// Whether datasets can be located on local storage.
    pub fn is_desy_production(&self) -> bool {
        self.custom.as_ref().is_some_and(|c| c.creator == "desy")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn nano_version_classes() {
        assert_eq!(NanoVersion::from(9), NanoVersion::V9);
        assert_eq!(NanoVersion::from(10), NanoVersion::V11Plus);
        assert_eq!(NanoVersion::from(12), NanoVersion::V11Plus);
        assert_eq!(NanoVersion::from(8), NanoVersion::Other(8));
    }

    #[test]
    fn desy_detection() {
        let mut c = Campaign {
            name: "c".into(),
            year: 2022,
            ecm: 13.6,
            nano_version: 12,
            custom: None,
        };
        assert!(!c.is_desy_production());
        c.custom = Some(CustomSite { creator: "desy".into(), location: None });
        assert!(c.is_desy_production());
    }
}

//! Identification working points: DeepTau discriminants and b-tagging.

use std::collections::BTreeMap;

use httcp_core::{Error, Result};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

/// DeepTau discriminant against one background type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeepTauDiscriminant {
    /// Against electrons.
    VsE,
    /// Against muons.
    VsMu,
    /// Against jets.
    VsJet,
}

impl DeepTauDiscriminant {
    fn suffix(self) -> &'static str {
        match self {
            DeepTauDiscriminant::VsE => "VSe",
            DeepTauDiscriminant::VsMu => "VSmu",
            DeepTauDiscriminant::VsJet => "VSjet",
        }
    }
}

/// DeepTau tagger version, chosen working points and WP name → integer maps.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeepTau {
    /// Tagger name, e.g. `DeepTau2018v2p5`.
    pub tagger: String,
    /// Working point against electrons.
    pub vs_e: String,
    /// Working point against muons.
    pub vs_mu: String,
    /// Working point against jets.
    pub vs_jet: String,
    /// WP name → integer code, shared by the vs-e and vs-jet discriminants.
    pub vs_e_jet_wps: IndexMap<String, u8>,
    /// WP name → integer code of the vs-mu discriminant.
    pub vs_mu_wps: IndexMap<String, u8>,
}

impl DeepTau {
    /// NanoAOD column holding the discriminant, e.g. `idDeepTau2018v2p5VSjet`.
    pub fn column(&self, disc: DeepTauDiscriminant) -> String {
        format!("id{}{}", self.tagger, disc.suffix())
    }

    /// Integer threshold (inclusive) of the configured working point.
    pub fn threshold(&self, disc: DeepTauDiscriminant) -> Result<u8> {
        let (wp, table) = match disc {
            DeepTauDiscriminant::VsE => (&self.vs_e, &self.vs_e_jet_wps),
            DeepTauDiscriminant::VsMu => (&self.vs_mu, &self.vs_mu_wps),
            DeepTauDiscriminant::VsJet => (&self.vs_jet, &self.vs_e_jet_wps),
        };
        table.get(wp.as_str()).copied().ok_or_else(|| {
            Error::Validation(format!(
                "unknown DeepTau {} working point '{}' (known: {})",
                disc.suffix(),
                wp,
                table.keys().cloned().collect::<Vec<_>>().join(", ")
            ))
        })
    }

    /// Threshold of the vs-e working point.
    pub fn vs_e_threshold(&self) -> Result<u8> {
        self.threshold(DeepTauDiscriminant::VsE)
    }

    /// Threshold of the vs-mu working point.
    pub fn vs_mu_threshold(&self) -> Result<u8> {
        self.threshold(DeepTauDiscriminant::VsMu)
    }

    /// Threshold of the vs-jet working point.
    pub fn vs_jet_threshold(&self) -> Result<u8> {
        self.threshold(DeepTauDiscriminant::VsJet)
    }
}

/// b-tagging working point.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BtagWorkingPoint {
    /// Loose.
    Loose,
    /// Medium.
    Medium,
    /// Tight.
    Tight,
}

/// Discriminant cut values of one tagger.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BtagCuts {
    /// Loose WP.
    pub loose: f64,
    /// Medium WP.
    pub medium: f64,
    /// Tight WP.
    pub tight: f64,
}

/// b-tagging cut values by year and tagger.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct BtagWorkingPoints(pub BTreeMap<u32, IndexMap<String, BtagCuts>>);

impl BtagWorkingPoints {
    /// Cut value of `tagger` at `wp` for `year`.
    pub fn get(&self, year: u32, tagger: &str, wp: BtagWorkingPoint) -> Result<f64> {
        let cuts = self.0.get(&year).and_then(|t| t.get(tagger)).ok_or_else(|| {
            Error::Validation(format!("no b-tag working points for tagger '{tagger}' in {year}"))
        })?;
        Ok(match wp {
            BtagWorkingPoint::Loose => cuts.loose,
            BtagWorkingPoint::Medium => cuts.medium,
            BtagWorkingPoint::Tight => cuts.tight,
        })
    }
}

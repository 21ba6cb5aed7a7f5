//! HLT trigger and MET filter declarations.

use httcp_core::{Error, Result};
use serde::{Deserialize, Serialize};

/// Trigger objects of one leg of an HLT path.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TriggerLeg {
    /// Trigger object id (`TrigObj.id`): 11, 13 or 15.
    pub pdg_id: i32,
    /// Minimum offline pt (GeV) of an object matched to this leg.
    #[serde(default)]
    pub min_pt: f64,
}

/// An HLT path.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Trigger {
    /// Path name without version, e.g. `HLT_IsoMu24`.
    pub name: String,
    /// Trigger id.
    pub id: u32,
    /// Legs of the path.
    pub legs: Vec<TriggerLeg>,
    /// Channels the path is used in.
    #[serde(default)]
    pub channels: Vec<String>,
}

impl Trigger {
    /// Whether the path is used in `channel`.
    pub fn applies_to(&self, channel: &str) -> bool {
        self.channels.iter().any(|c| c == channel)
    }

    /// Legs firing on trigger objects with id `pdg_id`.
    pub fn legs_for(&self, pdg_id: i32) -> impl Iterator<Item = &TriggerLeg> + '_ {
        self.legs.iter().filter(move |l| l.pdg_id.abs() == pdg_id.abs())
    }

    pub(crate) fn validate(&self, config: &str) -> Result<()> {
        if self.legs.is_empty() {
            return Err(Error::Validation(format!(
                "config '{config}': trigger '{}' has no legs",
                self.name
            )));
        }
        if let Some(leg) = self.legs.iter().find(|l| !l.min_pt.is_finite() || l.min_pt < 0.0) {
            return Err(Error::Validation(format!(
                "config '{config}': trigger '{}' has invalid leg min_pt {}",
                self.name, leg.min_pt
            )));
        }
        Ok(())
    }
}

/// Run 3 2022 (pre-EE) HLT paths of the etau, mutau and tautau channels.
pub fn triggers_run3_2022_pre_ee() -> Vec<Trigger> {
    let leg = |pdg_id, min_pt| TriggerLeg { pdg_id, min_pt };
    let trigger = |name: &str, id, legs, channels: &[&str]| Trigger {
        name: name.into(),
        id,
        legs,
        channels: channels.iter().map(|c| c.to_string()).collect(),
    };
    vec![
        trigger("HLT_Ele30_WPTight_Gsf", 201, vec![leg(11, 31.0)], &["etau"]),
        trigger(
            "HLT_Ele24_eta2p1_WPTight_Gsf_LooseDeepTauPFTauHPS30_eta2p1_CrossL1",
            202,
            vec![leg(11, 25.0), leg(15, 35.0)],
            &["etau"],
        ),
        trigger("HLT_IsoMu24", 101, vec![leg(13, 25.0)], &["mutau"]),
        trigger(
            "HLT_IsoMu20_eta2p1_LooseDeepTauPFTauHPS27_eta2p1_CrossL1",
            102,
            vec![leg(13, 21.0), leg(15, 32.0)],
            &["mutau"],
        ),
        trigger(
            "HLT_DoubleMediumDeepTauPFTauHPS35_L2NN_eta2p1",
            505,
            vec![leg(15, 40.0), leg(15, 40.0)],
            &["tautau"],
        ),
    ]
}

/// Run 3 MET filter flags; an event passes when all of them are set.
pub fn met_filters_run3() -> Vec<String> {
    [
        "Flag.goodVertices",
        "Flag.globalSuperTightHalo2016Filter",
        "Flag.EcalDeadCellTriggerPrimitiveFilter",
        "Flag.BadPFMuonFilter",
        "Flag.BadPFMuonDzFilter",
        "Flag.hfNoisyHitsFilter",
        "Flag.eeBadScFilter",
        "Flag.ecalBadCalibFilter",
    ]
    .into_iter()
    .map(String::from)
    .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn legs_by_object_id() {
        let triggers = triggers_run3_2022_pre_ee();
        let cross = triggers.iter().find(|t| t.id == 102).unwrap();
        assert!(cross.applies_to("mutau"));
        assert!(!cross.applies_to("etau"));
        let mu: Vec<f64> = cross.legs_for(13).map(|l| l.min_pt).collect();
        assert_eq!(mu, vec![21.0]);
        assert_eq!(cross.legs_for(-15).count(), 1);
        assert_eq!(cross.legs_for(11).count(), 0);
    }

    #[test]
    fn leg_validation() {
        let mut t = Trigger { name: "HLT_X".into(), id: 1, legs: vec![], channels: vec![] };
        assert!(t.validate("c").unwrap_err().to_string().contains("has no legs"));
        t.legs.push(TriggerLeg { pdg_id: 13, min_pt: f64::NAN });
        assert!(t.validate("c").unwrap_err().to_string().contains("invalid leg min_pt"));
        t.legs[0].min_pt = 24.0;
        assert!(t.validate("c").is_ok());
    }

    #[test]
    fn trigger_from_yaml() {
        let yaml = "name: HLT_IsoMu24\nid: 101\nlegs:\n  - {pdg_id: 13, min_pt: 25}\nchannels: [mutau]\n";
        let t: Trigger = serde_yaml_ng::from_str(yaml).unwrap();
        assert_eq!(t.legs, vec![TriggerLeg { pdg_id: 13, min_pt: 25.0 }]);
        assert!(t.applies_to("mutau"));
    }
}

//! Generator-level tau decay-mode classification from the PDG ids of the
//! visible decay products.
//!
//! Hadronic modes follow the usual tau numbering `5 * (n_charged - 1) + n_neutral`
//! (0 = 1 prong, 1 = 1 prong + π⁰, 10 = 3 prongs, …). Leptonic decays and
//! unclassifiable events get negative codes.

use serde::{Deserialize, Serialize};

use crate::jagged::Jagged;

/// Decay to an electron.
pub const DM_ELECTRON: i32 = -1;
/// Decay to a muon.
pub const DM_MUON: i32 = -2;
/// No recognized decay products.
pub const DM_UNKNOWN: i32 = -9;

const PDG_ELECTRON: i32 = 11;
const PDG_MUON: i32 = 13;
const PDG_CHARGED_HADRONS: [i32; 2] = [211, 321];
// Compared with sign: only the listed ids count as neutrals.
const PDG_NEUTRAL_HADRONS: [i32; 4] = [111, 311, 130, 310];

/// Condition under which an event counts as a hadronic decay.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HadronicRule {
    /// At least one charged or one neutral hadron.
    #[default]
    Strict,
    /// At least one charged hadron, or a non-negative neutral count. The
    /// second clause always holds, so events without any recognized product
    /// come out as `5 * (0 - 1) + 0 = -5` instead of [`DM_UNKNOWN`].
    Legacy,
}

/// Decay mode of every event.
///
/// Precedence: electron, muon, hadronic, then [`DM_UNKNOWN`]. All conditions
/// are computed for the whole chunk first and combined by nested selection.
pub fn gen_tau_decay_mode(pdg_ids: &Jagged<i32>, rule: HadronicRule) -> Vec<i32> {
    let count = |pred: fn(i32) -> bool| -> Vec<i32> {
        pdg_ids.iter().map(|ev| ev.iter().filter(|&&id| pred(id)).count() as i32).collect()
    };

    let n_ele = count(|id| id.abs() == PDG_ELECTRON);
    let n_mu = count(|id| id.abs() == PDG_MUON);
    let n_charged = count(|id| PDG_CHARGED_HADRONS.contains(&id.abs()));
    let n_neutral = count(|id| PDG_NEUTRAL_HADRONS.contains(&id));

    let edecay = n_ele.iter().map(|&n| n > 0);
    let mdecay = n_mu.iter().map(|&n| n > 0);
    let hdecay = n_charged.iter().zip(&n_neutral).map(|(&nc, &nn)| match rule {
        HadronicRule::Strict => nc > 0 || nn > 0,
        HadronicRule::Legacy => nc > 0 || nn >= 0,
    });

    edecay
        .zip(mdecay)
        .zip(hdecay)
        .zip(n_charged.iter().zip(&n_neutral))
        .map(|(((e, m), h), (&nc, &nn))| {
            if e {
                DM_ELECTRON
            } else if m {
                DM_MUON
            } else if h {
                5 * (nc - 1) + nn
            } else {
                DM_UNKNOWN
            }
        })
        .collect()
}

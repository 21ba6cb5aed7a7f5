//! Per-channel event selection.

use httcp_columnar::{
    DEFAULT_MATCH_AXIS, FlatSteps, HadronicRule, Jagged, SelectionSteps, StepMask,
    gen_tau_decay_mode, step_extraction, step_flatten, transverse_mass, trigger_object_matching,
};
use httcp_config::{
    ChannelSelection, Collection, Config, MET_FILTER_STEP, ResolvedCut, TRIGGER_MATCH_STEP,
};
use httcp_core::{Error, Result};
use serde::Serialize;

use crate::chunk::{EventChunk, Object};
use crate::cutflow::Cutflow;
use crate::object_cuts::apply_cuts;

/// Cut stage with every cut resolved against the config.
#[derive(Debug, Clone)]
struct ResolvedStage {
    suffix: String,
    cuts: Vec<ResolvedCut>,
}

/// Selection of one channel, resolved once and applied to many chunks.
#[derive(Debug, Clone)]
pub struct ChannelSelector {
    channel: String,
    channel_id: u32,
    lepton: Option<Collection>,
    lepton_stages: Vec<ResolvedStage>,
    tau_cuts: Vec<ResolvedCut>,
    trigger_match: Collection,
    trigger_match_dr: f64,
    trigger_leg_min_pt: f64,
    met_filters: Vec<String>,
    cutflow_steps: Vec<String>,
    hadronic_rule: HadronicRule,
}

/// Per-event columns computed alongside the selection.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DerivedColumns {
    /// Transverse mass of the leading selected lepton and MET; NaN (`null`
    /// in JSON) for events without one. Absent for channels without a light lepton.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mt: Option<Vec<f64>>,
    /// Generator-level tau decay mode, when the chunk carries generator information.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub gen_tau_decay_mode: Option<Vec<i32>>,
}

/// Output of [`ChannelSelector::select`] for one chunk.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SelectionResult {
    /// Channel name.
    pub channel: String,
    /// Channel id.
    pub channel_id: u32,
    /// Number of events in the chunk.
    pub n_events: usize,
    /// Event-level step decisions in production order.
    pub steps: FlatSteps,
    /// Derived columns.
    pub columns: DerivedColumns,
    /// Cutflow over the configured steps.
    pub cutflow: Cutflow,
}

impl ChannelSelector {
    /// Resolve the selection of `channel` from `config`.
    pub fn from_config(config: &Config, channel: &str) -> Result<Self> {
        let ch = config.channel(channel).ok_or_else(|| {
            Error::Validation(format!(
                "config '{}' has no channel '{channel}' (available: {})",
                config.name,
                config.channels.iter().map(|c| c.name.as_str()).collect::<Vec<_>>().join(", ")
            ))
        })?;
        let sel: &ChannelSelection = config.selection_for(channel)?;
        sel.validate(channel, &config.deep_tau)?;

        let resolve = |cuts: &[httcp_config::ObjectCut]| {
            cuts.iter().map(|c| c.resolve(&config.deep_tau)).collect::<Result<Vec<_>>>()
        };
        let lepton_stages = sel
            .lepton_stages
            .iter()
            .map(|s| Ok(ResolvedStage { suffix: s.suffix.clone(), cuts: resolve(&s.cuts)? }))
            .collect::<Result<Vec<_>>>()?;

        // Without declared paths every trigger object of the matched type counts.
        let object_id = sel.trigger_match.pdg_id();
        let n_triggers = config.triggers_for(channel).count();
        let legs = config.trigger_legs(channel, object_id);
        if n_triggers > 0 && legs.is_empty() {
            return Err(Error::Validation(format!(
                "config '{}': no trigger of channel '{channel}' has a {} leg",
                config.name,
                sel.trigger_match.as_str()
            )));
        }
        let trigger_leg_min_pt =
            legs.iter().map(|l| l.min_pt).reduce(f64::min).unwrap_or(0.0);

        let selector = Self {
            channel: ch.name.clone(),
            channel_id: ch.id,
            lepton: sel.lepton,
            lepton_stages,
            tau_cuts: resolve(&sel.tau_cuts)?,
            trigger_match: sel.trigger_match,
            trigger_match_dr: sel.trigger_match_dr,
            trigger_leg_min_pt,
            met_filters: config.met_filters.clone(),
            cutflow_steps: sel.cutflow_steps.clone(),
            hadronic_rule: config.gen_tau.hadronic_rule,
        };
        tracing::debug!(
            channel = %selector.channel,
            lepton_stages = selector.lepton_stages.len(),
            tau_cuts = selector.tau_cuts.len(),
            triggers = n_triggers,
            trigger_leg_min_pt,
            "channel selector ready"
        );
        Ok(selector)
    }

    /// Channel name.
    pub fn channel(&self) -> &str {
        &self.channel
    }

    /// Channel id.
    pub fn channel_id(&self) -> u32 {
        self.channel_id
    }

    /// Steps counted in the cutflow; empty means every produced step.
    pub fn cutflow_steps(&self) -> &[String] {
        &self.cutflow_steps
    }

    /// Run the selection on one chunk.
    ///
    /// MET filters are recorded as [`MET_FILTER_STEP`] when the chunk carries
    /// event flags. Lepton stages are merged with their suffixes
    /// (`muon_pt_26_good`, …), tau cuts keep their names, and the trigger
    /// match of the channel's selected objects is recorded as
    /// [`TRIGGER_MATCH_STEP`].
    pub fn select(&self, chunk: &EventChunk) -> Result<SelectionResult> {
        chunk.validate()?;
        let n_events = chunk.n_events();

        let mut steps = FlatSteps::new();
        let mut good_leptons = None;

        if !self.met_filters.is_empty() && !chunk.flags.is_empty() {
            let mut pass = vec![true; n_events];
            for name in &self.met_filters {
                for (p, &f) in pass.iter_mut().zip(chunk.flag(name)?) {
                    *p &= f;
                }
            }
            steps.insert(MET_FILTER_STEP.to_string(), pass);
        }

        if let Some(lepton) = self.lepton {
            let objects = chunk.collection(lepton);
            let mut stage_steps: Vec<SelectionSteps> = Vec::with_capacity(self.lepton_stages.len());
            for (i, stage) in self.lepton_stages.iter().enumerate() {
                let (s, passing) = apply_cuts(objects, &stage.cuts)?;
                stage_steps.push(s);
                if i == 0 {
                    good_leptons = Some(objects.filter(&passing)?);
                }
            }
            let suffixes: Vec<&str> = self.lepton_stages.iter().map(|s| s.suffix.as_str()).collect();
            let extracted = step_extraction(&stage_steps, &suffixes)?;
            if !extracted.remaining_suffixes.is_empty() {
                tracing::warn!(remaining = ?extracted.remaining_suffixes, "unused stage suffixes");
            }
            insert_unique(&mut steps, extracted.steps)?;
        }

        let (tau_steps, good_taus) = apply_cuts(&chunk.taus, &self.tau_cuts)?;
        insert_unique(&mut steps, step_flatten(&tau_steps))?;

        let candidates = match self.trigger_match {
            Collection::Tau => chunk.taus.filter(&good_taus)?,
            c if Some(c) == self.lepton => match &good_leptons {
                Some(g) => g.clone(),
                None => chunk.collection(c).clone(),
            },
            c => chunk.collection(c).clone(),
        };
        let candidates = candidates.filter(&candidates.map(|o| o.pt >= self.trigger_leg_min_pt))?;
        let object_id = self.trigger_match.pdg_id();
        let of_type = chunk.trigger_objects.map(|o| o.trigger_id().map(i32::abs) == Some(object_id));
        let trigger_objects = chunk.trigger_objects.filter(&of_type)?;
        let matched = trigger_object_matching(
            &candidates,
            &trigger_objects,
            self.trigger_match_dr,
            DEFAULT_MATCH_AXIS,
        )?;
        let mut trigger_step = SelectionSteps::new();
        trigger_step.insert(TRIGGER_MATCH_STEP.to_string(), StepMask::Object(matched));
        insert_unique(&mut steps, step_flatten(&trigger_step))?;

        let mt = good_leptons.as_ref().map(|leptons| leading_transverse_mass(leptons, chunk));
        let gen_tau_decay_mode =
            chunk.gen_tau_products.as_ref().map(|g| gen_tau_decay_mode(g, self.hadronic_rule));

        let cutflow =
            Cutflow::count(n_events, &steps, &self.cutflow_steps, chunk.weights.as_deref())?;

        tracing::debug!(
            channel = %self.channel,
            n_events,
            steps = steps.len(),
            selected = cutflow.steps.last().map_or(0, |s| s.entries),
            "chunk selected"
        );

        Ok(SelectionResult {
            channel: self.channel.clone(),
            channel_id: self.channel_id,
            n_events,
            steps,
            columns: DerivedColumns { mt, gen_tau_decay_mode },
            cutflow,
        })
    }
}

fn insert_unique(steps: &mut FlatSteps, new: FlatSteps) -> Result<()> {
    for (name, mask) in new {
        if steps.contains_key(&name) {
            return Err(Error::DuplicateStep(name));
        }
        steps.insert(name, mask);
    }
    Ok(())
}

/// Transverse mass of the first (leading) lepton of every event with MET.
fn leading_transverse_mass(leptons: &Jagged<Object>, chunk: &EventChunk) -> Vec<f64> {
    leptons
        .firsts()
        .into_iter()
        .zip(&chunk.met)
        .map(|(lep, met)| lep.map_or(f64::NAN, |l| transverse_mass(l, met)))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;
    use httcp_columnar::Met;
    use httcp_config::{Trigger, TriggerLeg, presets};
    use indexmap::IndexMap;

    fn config() -> Config {
        presets::analysis_httcp().unwrap().configs.remove(0)
    }

    fn muon(pt: f64, eta: f64, phi: f64, iso: f64) -> Object {
        Object::new(pt, eta, phi, 0.106)
            .with("mediumId", 1.0)
            .with("pfRelIso04_all", iso)
    }

    fn tau(pt: f64, eta: f64, phi: f64, vs_jet: f64, dm: f64) -> Object {
        Object::new(pt, eta, phi, 1.2)
            .with("idDeepTau2018v2p5VSjet", vs_jet)
            .with("idDeepTau2018v2p5VSe", 8.0)
            .with("idDeepTau2018v2p5VSmu", 4.0)
            .with("decayMode", dm)
    }

    fn chunk() -> EventChunk {
        EventChunk {
            muons: Jagged::from_nested(vec![
                vec![muon(30.0, 0.5, 0.0, 0.1)],
                vec![muon(20.0, 0.1, 0.5, 0.05)],
                vec![],
            ]),
            electrons: Jagged::empty_events(3),
            taus: Jagged::from_nested(vec![
                vec![tau(35.0, -1.0, 2.0, 6.0, 1.0)],
                vec![tau(25.0, 0.3, -2.0, 5.0, 0.0)],
                vec![tau(50.0, 0.0, 1.5, 3.0, 10.0)],
            ]),
            trigger_objects: Jagged::from_nested(vec![
                vec![trig_obj(13, 29.0, 0.52, 0.01)],
                vec![trig_obj(13, 19.0, 0.1, 0.5)],
                vec![],
            ]),
            met: vec![
                Met { pt: 20.0, phi: std::f64::consts::PI },
                Met { pt: 10.0, phi: 0.0 },
                Met { pt: 15.0, phi: 0.3 },
            ],
            gen_tau_products: Some(Jagged::from_nested(vec![vec![211, 111, -16], vec![11], vec![]])),
            weights: None,
            flags: IndexMap::new(),
        }
    }

    fn trig_obj(id: i32, pt: f64, eta: f64, phi: f64) -> Object {
        Object::new(pt, eta, phi, 0.0).with("id", f64::from(id))
    }

    #[test]
    fn mutau_steps_and_columns() {
        let sel = ChannelSelector::from_config(&config(), "mutau").unwrap();
        assert_eq!(sel.channel_id(), 2);
        let res = sel.select(&chunk()).unwrap();

        assert_eq!(res.steps["muon_pt_26_good"], vec![true, false, false]);
        assert_eq!(res.steps["muon_pt_10_single_veto"], vec![true, true, false]);
        assert_eq!(res.steps["DeepTauVSjet"], vec![true, true, false]);
        // the second event's muon matches a trigger object but is not selected
        assert_eq!(res.steps[TRIGGER_MATCH_STEP], vec![true, false, false]);

        let mt = res.columns.mt.as_ref().unwrap();
        assert_abs_diff_eq!(mt[0], 2400f64.sqrt(), epsilon = 1e-9);
        assert!(mt[1].is_nan() && mt[2].is_nan());
        assert_eq!(res.columns.gen_tau_decay_mode, Some(vec![1, -1, -9]));

        assert_eq!(res.cutflow.steps[0].entries, 3);
        assert_eq!(res.cutflow.steps.last().unwrap().name, TRIGGER_MATCH_STEP);
        assert_eq!(res.cutflow.steps.last().unwrap().entries, 1);
    }

    #[test]
    fn tautau_matches_selected_taus() {
        let sel = ChannelSelector::from_config(&config(), "tautau").unwrap();
        let mut c = chunk();
        c.trigger_objects = Jagged::from_nested(vec![
            vec![trig_obj(15, 30.0, -1.0, 2.0)],
            vec![trig_obj(15, 30.0, 0.3, -2.0)],
            vec![trig_obj(15, 45.0, 0.0, 1.5)],
        ]);
        let res = sel.select(&c).unwrap();
        assert!(res.columns.mt.is_none());
        // taus below 40 GeV and the one failing DeepTau are not matched
        assert_eq!(res.steps[TRIGGER_MATCH_STEP], vec![false, false, false]);
        assert!(!res.steps.keys().any(|k| k.starts_with("muon")));
    }

    #[test]
    fn trigger_objects_of_other_type_do_not_match() {
        let sel = ChannelSelector::from_config(&config(), "mutau").unwrap();
        let mut c = chunk();
        // a tau trigger object on top of the selected muon
        c.trigger_objects = Jagged::from_nested(vec![
            vec![trig_obj(15, 29.0, 0.52, 0.01)],
            vec![],
            vec![],
        ]);
        let res = sel.select(&c).unwrap();
        assert_eq!(res.steps[TRIGGER_MATCH_STEP], vec![false, false, false]);

        c.trigger_objects = Jagged::from_nested(vec![
            vec![trig_obj(15, 29.0, 0.52, 0.01), trig_obj(-13, 29.0, 0.5, 0.0)],
            vec![],
            vec![],
        ]);
        let res = sel.select(&c).unwrap();
        assert_eq!(res.steps[TRIGGER_MATCH_STEP], vec![true, false, false]);
    }

    #[test]
    fn trigger_leg_min_pt() {
        let mut cfg = config();
        cfg.triggers.retain(|t| !t.applies_to("mutau"));
        cfg.triggers.push(Trigger {
            name: "HLT_IsoMu27".into(),
            id: 103,
            legs: vec![TriggerLeg { pdg_id: 13, min_pt: 31.0 }],
            channels: vec!["mutau".into()],
        });
        let res = ChannelSelector::from_config(&cfg, "mutau").unwrap().select(&chunk()).unwrap();
        // the selected 30 GeV muon is below the leg threshold
        assert_eq!(res.steps[TRIGGER_MATCH_STEP], vec![false, false, false]);

        cfg.triggers.last_mut().unwrap().legs[0].pdg_id = 15;
        let err = ChannelSelector::from_config(&cfg, "mutau").unwrap_err();
        assert!(err.to_string().contains("has a muon leg"), "{err}");
    }

    #[test]
    fn met_filter_step() {
        let cfg = config();
        let sel = ChannelSelector::from_config(&cfg, "mutau").unwrap();
        let res = sel.select(&chunk()).unwrap();
        assert!(!res.steps.contains_key(MET_FILTER_STEP));

        let mut c = chunk();
        for f in &cfg.met_filters {
            c.flags.insert(f.clone(), vec![true, true, true]);
        }
        c.flags["Flag.eeBadScFilter"] = vec![true, false, true];
        let res = sel.select(&c).unwrap();
        assert_eq!(res.steps.get_index(0).unwrap().0, MET_FILTER_STEP);
        assert_eq!(res.steps[MET_FILTER_STEP], vec![true, false, true]);

        c.flags.shift_remove("Flag.goodVertices");
        let err = sel.select(&c).unwrap_err();
        assert!(err.to_string().contains("no flag 'Flag.goodVertices'"));
    }

    #[test]
    fn legacy_hadronic_rule_from_config() {
        let mut cfg = config();
        cfg.gen_tau.hadronic_rule = HadronicRule::Legacy;
        let res = ChannelSelector::from_config(&cfg, "mutau").unwrap().select(&chunk()).unwrap();
        assert_eq!(res.columns.gen_tau_decay_mode, Some(vec![1, -1, -5]));
    }

    #[test]
    fn unknown_channel() {
        let err = ChannelSelector::from_config(&config(), "emu").unwrap_err();
        assert!(err.to_string().contains("available: etau, mutau, tautau"));
    }

    #[test]
    fn inconsistent_chunk_rejected() {
        let sel = ChannelSelector::from_config(&config(), "mutau").unwrap();
        let mut c = chunk();
        c.met.pop();
        assert!(matches!(sel.select(&c), Err(Error::Shape(_))));
    }
}

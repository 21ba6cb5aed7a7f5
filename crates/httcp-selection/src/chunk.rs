//! Decoded event chunks: reconstructed objects, trigger objects, MET and
//! generator information for a contiguous range of events.

use std::path::Path;

use httcp_columnar::{Azimuthal, Directional, Jagged, Met};
use httcp_config::Collection;
use httcp_core::{Error, Result};
use indexmap::IndexMap;
use serde::{Deserialize, Deserializer, Serialize};

/// A reconstructed or trigger object.
///
/// Fields not covered by the named members (identification scores,
/// isolation, decay mode, trigger bits…) land in `aux`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Object {
    /// Transverse momentum (GeV).
    pub pt: f64,
    /// Pseudorapidity.
    pub eta: f64,
    /// Azimuthal angle.
    pub phi: f64,
    /// Mass (GeV).
    #[serde(default)]
    pub mass: f64,
    /// PDG id (signed).
    #[serde(default, alias = "pdgId")]
    pub pdg_id: i32,
    /// Electric charge.
    #[serde(default)]
    pub charge: i32,
    /// Transverse impact parameter (cm).
    #[serde(default)]
    pub dxy: f64,
    /// Longitudinal impact parameter (cm).
    #[serde(default)]
    pub dz: f64,
    /// Auxiliary scalar fields by name; boolean flags read as 0 or 1.
    #[serde(flatten, deserialize_with = "deserialize_aux")]
    pub aux: IndexMap<String, f64>,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum AuxValue {
    Number(f64),
    Flag(bool),
}

fn deserialize_aux<'de, D>(deserializer: D) -> std::result::Result<IndexMap<String, f64>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = IndexMap::<String, AuxValue>::deserialize(deserializer)?;
    Ok(raw
        .into_iter()
        .map(|(k, v)| {
            let x = match v {
                AuxValue::Number(x) => x,
                AuxValue::Flag(b) => f64::from(u8::from(b)),
            };
            (k, x)
        })
        .collect())
}

impl Object {
    /// Object with kinematics only.
    pub fn new(pt: f64, eta: f64, phi: f64, mass: f64) -> Self {
        Self { pt, eta, phi, mass, pdg_id: 0, charge: 0, dxy: 0.0, dz: 0.0, aux: IndexMap::new() }
    }

    /// Set an auxiliary field.
    pub fn with(mut self, field: impl Into<String>, value: f64) -> Self {
        self.aux.insert(field.into(), value);
        self
    }

    /// Value of a named field; auxiliary fields are looked up last.
    pub fn field(&self, name: &str) -> Result<f64> {
        Ok(match name {
            "pt" => self.pt,
            "eta" => self.eta,
            "phi" => self.phi,
            "mass" => self.mass,
            "pdg_id" | "pdgId" => f64::from(self.pdg_id),
            "charge" => f64::from(self.charge),
            "dxy" => self.dxy,
            "dz" => self.dz,
            other => *self
                .aux
                .get(other)
                .ok_or_else(|| Error::Validation(format!("object has no field '{other}'")))?,
        })
    }

    /// Trigger object id (`TrigObj.id`), when present.
    pub fn trigger_id(&self) -> Option<i32> {
        self.aux.get("id").map(|&x| x as i32)
    }
}

impl Azimuthal for Object {
    fn pt(&self) -> f64 {
        self.pt
    }

    fn phi(&self) -> f64 {
        self.phi
    }
}

impl Directional for Object {
    fn eta(&self) -> f64 {
        self.eta
    }
}

/// Columns of one chunk of events.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EventChunk {
    /// Muons per event.
    pub muons: Jagged<Object>,
    /// Electrons per event.
    pub electrons: Jagged<Object>,
    /// Hadronic taus per event.
    pub taus: Jagged<Object>,
    /// HLT trigger objects per event.
    pub trigger_objects: Jagged<Object>,
    /// Missing transverse energy per event.
    pub met: Vec<Met>,
    /// PDG ids of the generator-level tau decay products (simulation only).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gen_tau_products: Option<Jagged<i32>>,
    /// Event weights; unit weights when absent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub weights: Option<Vec<f64>>,
    /// Event flags by name, e.g. `Flag.goodVertices`.
    #[serde(default, skip_serializing_if = "IndexMap::is_empty")]
    pub flags: IndexMap<String, Vec<bool>>,
}

impl EventChunk {
    /// Read a chunk from a JSON file and check its shape.
    pub fn from_path(path: &Path) -> Result<Self> {
        let bytes = std::fs::read(path)?;
        let chunk: EventChunk = serde_json::from_slice(&bytes)?;
        chunk.validate()?;
        tracing::debug!(path = %path.display(), n_events = chunk.n_events(), "chunk loaded");
        Ok(chunk)
    }

    /// Number of events.
    pub fn n_events(&self) -> usize {
        self.met.len()
    }

    /// Objects of a collection.
    pub fn collection(&self, collection: Collection) -> &Jagged<Object> {
        match collection {
            Collection::Muon => &self.muons,
            Collection::Electron => &self.electrons,
            Collection::Tau => &self.taus,
        }
    }

    /// Every column must cover the same events.
    pub fn validate(&self) -> Result<()> {
        let n = self.n_events();
        let columns = [
            ("muons", self.muons.n_events()),
            ("electrons", self.electrons.n_events()),
            ("taus", self.taus.n_events()),
            ("trigger_objects", self.trigger_objects.n_events()),
        ];
        let optional = [
            ("gen_tau_products", self.gen_tau_products.as_ref().map(|g| g.n_events())),
            ("weights", self.weights.as_ref().map(|w| w.len())),
        ];
        let flags = self.flags.iter().map(|(k, v)| (k.as_str(), v.len()));
        let all = columns
            .into_iter()
            .chain(optional.into_iter().filter_map(|(k, v)| Some((k, v?))))
            .chain(flags);
        for (name, len) in all {
            if len != n {
                return Err(Error::Shape(format!(
                    "chunk column '{name}' has {len} events, met has {n}"
                )));
            }
        }
        Ok(())
    }

    /// Values of an event flag.
    pub fn flag(&self, name: &str) -> Result<&[bool]> {
        self.flags
            .get(name)
            .map(Vec::as_slice)
            .ok_or_else(|| Error::Validation(format!("chunk has no flag '{name}'")))
    }

    /// Event weights, unit weights when the chunk carries none.
    pub fn weights_or_unit(&self) -> Vec<f64> {
        self.weights.clone().unwrap_or_else(|| vec![1.0; self.n_events()])
    }
}

//! Directional vector behaviour shared by reconstructed objects, trigger
//! objects and missing transverse energy.

use std::f64::consts::PI;

use serde::{Deserialize, Serialize};

/// Wrap an azimuthal difference into `[-π, π)`.
#[inline]
pub fn wrap_phi(dphi: f64) -> f64 {
    (dphi + PI).rem_euclid(2.0 * PI) - PI
}

/// Anything with a transverse momentum and an azimuthal angle.
pub trait Azimuthal {
    /// Transverse momentum magnitude.
    fn pt(&self) -> f64;

    /// Azimuthal angle.
    fn phi(&self) -> f64;

    /// Signed azimuthal separation, wrapped into `[-π, π)`.
    fn delta_phi<O: Azimuthal + ?Sized>(&self, other: &O) -> f64 {
        wrap_phi(self.phi() - other.phi())
    }
}

/// An [`Azimuthal`] object that also has a pseudorapidity.
pub trait Directional: Azimuthal {
    /// Pseudorapidity.
    fn eta(&self) -> f64;

    /// Angular distance `sqrt(Δη² + Δφ²)`.
    fn delta_r<O: Directional + ?Sized>(&self, other: &O) -> f64 {
        let deta = self.eta() - other.eta();
        let dphi = self.delta_phi(other);
        deta.hypot(dphi)
    }
}

/// Four-vector in (pt, eta, phi, mass) coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PtEtaPhiM {
    /// Transverse momentum (GeV).
    pub pt: f64,
    /// Pseudorapidity.
    pub eta: f64,
    /// Azimuthal angle.
    pub phi: f64,
    /// Mass (GeV).
    #[serde(default)]
    pub mass: f64,
}

impl PtEtaPhiM {
    /// Create a new four-vector.
    pub fn new(pt: f64, eta: f64, phi: f64, mass: f64) -> Self {
        Self { pt, eta, phi, mass }
    }
}

impl Azimuthal for PtEtaPhiM {
    fn pt(&self) -> f64 {
        self.pt
    }

    fn phi(&self) -> f64 {
        self.phi
    }
}

impl Directional for PtEtaPhiM {
    fn eta(&self) -> f64 {
        self.eta
    }
}

/// Missing transverse energy of one event.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Met {
    /// Magnitude (GeV).
    pub pt: f64,
    /// Azimuthal angle.
    pub phi: f64,
}

impl Azimuthal for Met {
    fn pt(&self) -> f64 {
        self.pt
    }

    fn phi(&self) -> f64 {
        self.phi
    }
}

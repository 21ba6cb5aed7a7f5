//! Derived kinematic quantities.

use httcp_core::{Error, Result};

use crate::jagged::Jagged;
use crate::vector::Azimuthal;

/// Transverse mass of a lepton and the missing transverse energy:
/// `sqrt(2 * pt_l * pt_met * (1 - cos Δφ))`.
///
/// NaN in either input propagates to the result.
#[inline]
pub fn transverse_mass<L, M>(lepton: &L, met: &M) -> f64
where
    L: Azimuthal + ?Sized,
    M: Azimuthal + ?Sized,
{
    let dphi = lepton.delta_phi(met);
    (2.0 * lepton.pt() * met.pt() * (1.0 - dphi.cos())).sqrt()
}

/// Transverse mass for one lepton per event.
pub fn transverse_mass_per_event<L: Azimuthal, M: Azimuthal>(
    leptons: &[L],
    met: &[M],
) -> Result<Vec<f64>> {
    if leptons.len() != met.len() {
        return Err(Error::Shape(format!(
            "transverse mass: {} leptons vs {} MET entries",
            leptons.len(),
            met.len()
        )));
    }
    Ok(leptons.iter().zip(met).map(|(l, m)| transverse_mass(l, m)).collect())
}

/// Transverse mass for every lepton candidate, with the event's MET broadcast
/// over its candidates.
pub fn transverse_mass_jagged<L: Azimuthal, M: Azimuthal>(
    leptons: &Jagged<L>,
    met: &[M],
) -> Result<Jagged<f64>> {
    leptons.broadcast_with(met, |l, m| transverse_mass(l, m))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::vector::{Met, PtEtaPhiM};
    use approx::assert_abs_diff_eq;

    #[test]
    fn zero_when_collinear() {
        let l = PtEtaPhiM::new(40.0, 1.2, 0.7, 0.1);
        let m = Met { pt: 25.0, phi: 0.7 };
        assert_eq!(transverse_mass(&l, &m), 0.0);
    }

    #[test]
    fn back_to_back() {
        // Δφ = π: mt = sqrt(4 pt_l pt_met) = 2 sqrt(pt_l pt_met)
        let l = PtEtaPhiM::new(40.0, 0.0, 0.0, 0.0);
        let m = Met { pt: 10.0, phi: std::f64::consts::PI };
        assert_abs_diff_eq!(transverse_mass(&l, &m), 40.0, epsilon = 1e-9);
    }

    #[test]
    fn non_negative_over_phi_grid() {
        let l = Met { pt: 33.0, phi: 0.0 };
        for i in -40..=40 {
            let m = Met { pt: 17.0, phi: i as f64 * 0.2 };
            let mt = transverse_mass(&l, &m);
            assert!(mt >= 0.0, "mt={mt} for phi={}", m.phi);
        }
    }

    #[test]
    fn nan_propagates() {
        let l = Met { pt: f64::NAN, phi: 0.0 };
        let m = Met { pt: 10.0, phi: 1.0 };
        assert!(transverse_mass(&l, &m).is_nan());
    }

    #[test]
    fn per_event_shape_mismatch() {
        let l = vec![Met { pt: 1.0, phi: 0.0 }];
        let m: Vec<Met> = vec![];
        assert!(matches!(transverse_mass_per_event(&l, &m), Err(Error::Shape(_))));
    }

    #[test]
    fn jagged_broadcast() {
        let leps = Jagged::from_nested(vec![
            vec![PtEtaPhiM::new(40.0, 0.0, 0.0, 0.0), PtEtaPhiM::new(20.0, 0.0, 1.0, 0.0)],
            vec![],
        ]);
        let met = vec![Met { pt: 10.0, phi: 0.0 }, Met { pt: 50.0, phi: 2.0 }];
        let mt = transverse_mass_jagged(&leps, &met).unwrap();
        assert_eq!(mt.counts(), vec![2, 0]);
        assert_eq!(mt.event(0)[0], 0.0);
        let expected = (2.0 * 20.0 * 10.0 * (1.0 - 1.0f64.cos())).sqrt();
        assert_abs_diff_eq!(mt.event(0)[1], expected, epsilon = 1e-12);
    }
}

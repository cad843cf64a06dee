use crate::models::alert::TrustLevel;

const MAX_SCORE: u32 = 100;
const RURAL_POPULATION: usize = 5;
const RURAL_THRESHOLD: u8 = 35;
const NORMAL_THRESHOLD: u8 = 60;

/// Corroboration signals feeding the trust score. Persisted on the alert so
/// a vouch recomputes the full formula instead of patching a delta.
#[derive(Debug, Clone, Copy, Default)]
pub struct TrustInputs {
    pub vouches: u32,
    pub has_photo: bool,
    pub gps_accuracy: Option<f64>,
    pub signal_dbm: Option<f64>,
    pub proxy: bool,
}

/// Deterministic weighted sum, clamped to [0,100]. Each term is computed
/// independently; absent GPS/radio readings contribute nothing.
pub fn score(inputs: &TrustInputs) -> u8 {
    let mut s: u32 = 0;

    s += (inputs.vouches * 15).min(30);

    if inputs.has_photo {
        s += 30;
    }

    match inputs.gps_accuracy {
        Some(acc) if acc <= 30.0 => s += 10,
        Some(acc) if acc <= 100.0 => s += 5,
        _ => {}
    }

    match inputs.signal_dbm {
        Some(dbm) if dbm > -60.0 => s += 30,
        Some(dbm) if dbm > -75.0 => s += 15,
        _ => {}
    }

    if inputs.proxy {
        s = s.saturating_sub(10);
    }

    s.min(MAX_SCORE) as u8
}

/// Verified/unverified split with a population-adaptive threshold: below 5
/// connected devices corroboration is scarce, so the bar drops to 35.
pub fn level(score: u8, population: usize) -> TrustLevel {
    let threshold = if population < RURAL_POPULATION {
        RURAL_THRESHOLD
    } else {
        NORMAL_THRESHOLD
    };
    if score >= threshold {
        TrustLevel::Verified
    } else {
        TrustLevel::Unverified
    }
}

pub fn rural_mode(population: usize) -> bool {
    population < RURAL_POPULATION
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_inputs_score_zero() {
        assert_eq!(score(&TrustInputs::default()), 0);
    }

    #[test]
    fn vouches_cap_at_thirty() {
        let mut inputs = TrustInputs::default();
        inputs.vouches = 1;
        assert_eq!(score(&inputs), 15);
        inputs.vouches = 2;
        assert_eq!(score(&inputs), 30);
        inputs.vouches = 10;
        assert_eq!(score(&inputs), 30);
    }

    #[test]
    fn gps_accuracy_tiers() {
        let base = TrustInputs::default();
        assert_eq!(score(&TrustInputs { gps_accuracy: Some(30.0), ..base }), 10);
        assert_eq!(score(&TrustInputs { gps_accuracy: Some(100.0), ..base }), 5);
        assert_eq!(score(&TrustInputs { gps_accuracy: Some(200.0), ..base }), 0);
        assert_eq!(score(&TrustInputs { gps_accuracy: None, ..base }), 0);
    }

    #[test]
    fn radio_strength_tiers() {
        let base = TrustInputs::default();
        assert_eq!(score(&TrustInputs { signal_dbm: Some(-50.0), ..base }), 30);
        assert_eq!(score(&TrustInputs { signal_dbm: Some(-60.0), ..base }), 15);
        assert_eq!(score(&TrustInputs { signal_dbm: Some(-75.0), ..base }), 0);
        assert_eq!(score(&TrustInputs { signal_dbm: Some(-80.0), ..base }), 0);
    }

    #[test]
    fn proxy_penalty_floors_at_zero() {
        let inputs = TrustInputs { proxy: true, ..TrustInputs::default() };
        assert_eq!(score(&inputs), 0);

        let inputs = TrustInputs {
            has_photo: true,
            proxy: true,
            ..TrustInputs::default()
        };
        assert_eq!(score(&inputs), 20);
    }

    #[test]
    fn score_is_bounded_and_pure() {
        let inputs = TrustInputs {
            vouches: 100,
            has_photo: true,
            gps_accuracy: Some(1.0),
            signal_dbm: Some(-10.0),
            proxy: false,
        };
        let first = score(&inputs);
        assert_eq!(first, 100);
        assert_eq!(score(&inputs), first);
    }

    #[test]
    fn threshold_adapts_to_population() {
        assert_eq!(level(40, 3), TrustLevel::Verified);
        assert_eq!(level(40, 10), TrustLevel::Unverified);
        assert_eq!(level(60, 10), TrustLevel::Verified);
        assert_eq!(level(34, 3), TrustLevel::Unverified);
        // Boundary: population 5 leaves rural mode.
        assert_eq!(level(40, 5), TrustLevel::Unverified);
        assert!(rural_mode(4));
        assert!(!rural_mode(5));
    }
}

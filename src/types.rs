// src/types.rs
use std::fmt;

use serde::Serialize;

/// Canonical EEG sub-bands, in ascending frequency order.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Band {
    Delta,
    Theta,
    Alpha,
    Beta,
    Gamma,
}

impl Band {
    pub const ALL: [Band; 5] = [Band::Delta, Band::Theta, Band::Alpha, Band::Beta, Band::Gamma];

    /// Pass band edges in Hz.
    pub const fn range_hz(self) -> (f64, f64) {
        match self {
            Band::Delta => (0.5, 4.0),
            Band::Theta => (4.0, 8.0),
            Band::Alpha => (8.0, 13.0),
            Band::Beta => (13.0, 30.0),
            Band::Gamma => (30.0, 45.0),
        }
    }

    pub const fn name(self) -> &'static str {
        match self {
            Band::Delta => "delta",
            Band::Theta => "theta",
            Band::Alpha => "alpha",
            Band::Beta => "beta",
            Band::Gamma => "gamma",
        }
    }

    pub fn label(self) -> String {
        let (low, high) = self.range_hz();
        let title = match self {
            Band::Delta => "Delta",
            Band::Theta => "Theta",
            Band::Alpha => "Alpha",
            Band::Beta => "Beta",
            Band::Gamma => "Gamma",
        };
        format!("{title} ({low}-{high} Hz)")
    }
}

impl fmt::Display for Band {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// One value per band. Serializes as `{ "delta": .., "theta": .., ... }`.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize)]
pub struct BandMap<T> {
    pub delta: T,
    pub theta: T,
    pub alpha: T,
    pub beta: T,
    pub gamma: T,
}

impl<T> BandMap<T> {
    pub fn from_fn(mut f: impl FnMut(Band) -> T) -> Self {
        Self {
            delta: f(Band::Delta),
            theta: f(Band::Theta),
            alpha: f(Band::Alpha),
            beta: f(Band::Beta),
            gamma: f(Band::Gamma),
        }
    }

    pub fn get(&self, band: Band) -> &T {
        match band {
            Band::Delta => &self.delta,
            Band::Theta => &self.theta,
            Band::Alpha => &self.alpha,
            Band::Beta => &self.beta,
            Band::Gamma => &self.gamma,
        }
    }

    pub fn map<U>(&self, mut f: impl FnMut(&T) -> U) -> BandMap<U> {
        BandMap::from_fn(|band| f(self.get(band)))
    }

    pub fn iter(&self) -> impl Iterator<Item = (Band, &T)> + '_ {
        Band::ALL.into_iter().map(move |band| (band, self.get(band)))
    }
}

/// Categorical outcome of the criteria engine.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Diagnosis {
    StrongIndication,
    LowModerateIndication,
    Borderline,
    NoIndication,
}

impl Diagnosis {
    /// Maps a pass count onto the fixed lookup table. First match wins.
    pub fn from_passed_count(passed: usize) -> Self {
        if passed >= 6 {
            Diagnosis::StrongIndication
        } else if passed >= 4 {
            Diagnosis::LowModerateIndication
        } else if passed >= 2 {
            Diagnosis::Borderline
        } else {
            Diagnosis::NoIndication
        }
    }

    pub const fn label(self) -> &'static str {
        match self {
            Diagnosis::StrongIndication => "strong dyslexia indication",
            Diagnosis::LowModerateIndication => "low/moderate dyslexia indication",
            Diagnosis::Borderline => "borderline, no indication",
            Diagnosis::NoIndication => "no indication",
        }
    }

    pub const fn confidence(self) -> ConfidenceLevel {
        match self {
            Diagnosis::StrongIndication => ConfidenceLevel::High,
            Diagnosis::LowModerateIndication => ConfidenceLevel::Medium,
            Diagnosis::Borderline => ConfidenceLevel::Low,
            Diagnosis::NoIndication => ConfidenceLevel::High,
        }
    }

    pub const fn recommendation(self) -> &'static str {
        match self {
            Diagnosis::StrongIndication => "strongly recommend professional follow-up evaluation",
            Diagnosis::LowModerateIndication => "recommend further evaluation",
            Diagnosis::Borderline => "recommend monitoring and retest",
            Diagnosis::NoIndication => "pattern within normal range",
        }
    }

    /// Plain-language summary shown above the recommendation in reports.
    pub const fn narrative(self) -> &'static str {
        match self {
            Diagnosis::StrongIndication => {
                "Brain activity shows a strong dominance of slow waves together with \
                 markedly reduced fast activity, a pattern often seen in children who \
                 struggle with reading and processing written information."
            }
            Diagnosis::LowModerateIndication => {
                "Brain activity shows several markers often associated with reading \
                 difficulties, but not all criteria are met. Additional examination and \
                 observation during learning are needed to confirm."
            }
            Diagnosis::Borderline => {
                "Brain activity shows minor variations worth keeping an eye on, but they \
                 do not reach the level of a clear indication. Track reading progress and \
                 retest if concerns arise."
            }
            Diagnosis::NoIndication => {
                "Brain activity shows a normal, balanced distribution across frequency \
                 bands. No processing pattern associated with reading difficulties was found."
            }
        }
    }
}

impl fmt::Display for Diagnosis {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ConfidenceLevel {
    High,
    Medium,
    Low,
}

impl ConfidenceLevel {
    pub const fn label(self) -> &'static str {
        match self {
            ConfidenceLevel::High => "high",
            ConfidenceLevel::Medium => "medium",
            ConfidenceLevel::Low => "low",
        }
    }
}

impl fmt::Display for ConfidenceLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn band_table_is_contiguous() {
        for pair in Band::ALL.windows(2) {
            assert_eq!(pair[0].range_hz().1, pair[1].range_hz().0);
        }
        assert_eq!(Band::Delta.range_hz(), (0.5, 4.0));
        assert_eq!(Band::Gamma.range_hz(), (30.0, 45.0));
    }

    #[test]
    fn diagnosis_boundaries() {
        let expected = [
            (0, Diagnosis::NoIndication),
            (1, Diagnosis::NoIndication),
            (2, Diagnosis::Borderline),
            (3, Diagnosis::Borderline),
            (4, Diagnosis::LowModerateIndication),
            (5, Diagnosis::LowModerateIndication),
            (6, Diagnosis::StrongIndication),
            (7, Diagnosis::StrongIndication),
        ];
        for (passed, diagnosis) in expected {
            assert_eq!(Diagnosis::from_passed_count(passed), diagnosis, "k = {passed}");
        }
        assert_eq!(Diagnosis::NoIndication.confidence(), ConfidenceLevel::High);
        assert_eq!(Diagnosis::Borderline.confidence(), ConfidenceLevel::Low);
    }

    #[test]
    fn band_map_serializes_by_name() {
        let map = BandMap::from_fn(|band| band.range_hz().0);
        let json = serde_json::to_value(map).unwrap();
        assert_eq!(json["delta"], 0.5);
        assert_eq!(json["gamma"], 30.0);
    }
}

use super::tag_analyzer::estimate_mood;
use crate::enrichment::EnrichedFacetSet;
use serde::Serialize;

#[derive(Serialize, Debug, Clone, Default, PartialEq)]
pub struct MoodSummary {
    pub valence: Option<f64>,
    pub energy: Option<f64>,
    pub danceability: Option<f64>,
    pub acousticness: Option<f64>,
    /// Only ever averaged from supplied audio features, never estimated.
    pub tempo: Option<f64>,
    /// Tracks with features measured for the track itself.
    pub real_samples: usize,
    /// Tracks described by artist-level features or by tags and genres.
    pub estimated_samples: usize,
    /// Tracks with nothing to go on.
    pub missing_samples: usize,
}

#[derive(Default)]
struct Mean {
    sum: f64,
    n: usize,
}

impl Mean {
    fn add(&mut self, value: Option<f64>) {
        if let Some(v) = value.filter(|v| v.is_finite()) {
            self.sum += v;
            self.n += 1;
        }
    }

    fn get(&self) -> Option<f64> {
        (self.n > 0).then(|| self.sum / self.n as f64)
    }
}

pub fn aggregate_mood(tracks: &[EnrichedFacetSet]) -> MoodSummary {
    let mut summary = MoodSummary::default();
    let (mut valence, mut energy, mut dance, mut acoustic, mut tempo) = (
        Mean::default(),
        Mean::default(),
        Mean::default(),
        Mean::default(),
        Mean::default(),
    );

    for track in tracks {
        if let Some(features) = track.audio_features.as_ref().filter(|f| !f.is_empty()) {
            if track.feature_source.map_or(false, |s| s.is_track_level()) {
                summary.real_samples += 1;
            } else {
                summary.estimated_samples += 1;
            }
            valence.add(features.valence);
            energy.add(features.energy);
            dance.add(features.danceability);
            acoustic.add(features.acousticness);
            tempo.add(features.tempo);
            continue;
        }

        match estimate_mood(track.tags.iter().chain(track.genres.iter())) {
            Some(estimate) => {
                summary.estimated_samples += 1;
                valence.add(Some(estimate.valence));
                energy.add(Some(estimate.energy));
                dance.add(Some(estimate.danceability));
                acoustic.add(Some(estimate.acousticness));
            }
            None => summary.missing_samples += 1,
        }
    }

    summary.valence = valence.get();
    summary.energy = energy.get();
    summary.danceability = dance.get();
    summary.acousticness = acoustic.get();
    summary.tempo = tempo.get();
    summary
}

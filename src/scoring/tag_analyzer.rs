//! Rough mood estimates from community tags and genres.

/// valence, energy, danceability, acousticness
type MoodVector = [f64; 4];

// Keywords match whole words of lowercased tags. A trailing '*' marks a stem
// that may continue into a longer word ("relax*" covers "relaxing").
const LEXICON: &[(&str, MoodVector)] = &[
    ("happy", [0.85, 0.65, 0.60, 0.40]),
    ("upbeat", [0.80, 0.75, 0.70, 0.30]),
    ("feel good", [0.85, 0.65, 0.65, 0.35]),
    ("party", [0.75, 0.85, 0.85, 0.10]),
    ("dance", [0.70, 0.80, 0.85, 0.10]),
    ("disco", [0.75, 0.75, 0.85, 0.15]),
    ("house", [0.60, 0.80, 0.85, 0.05]),
    ("techno", [0.45, 0.85, 0.80, 0.05]),
    ("edm", [0.60, 0.90, 0.80, 0.05]),
    ("electro*", [0.55, 0.75, 0.75, 0.10]),
    ("hip hop", [0.55, 0.65, 0.80, 0.15]),
    ("hip-hop", [0.55, 0.65, 0.80, 0.15]),
    ("rap", [0.50, 0.70, 0.75, 0.10]),
    ("funk", [0.75, 0.70, 0.80, 0.25]),
    ("reggae", [0.70, 0.55, 0.75, 0.35]),
    ("pop", [0.65, 0.65, 0.65, 0.25]),
    ("rock", [0.50, 0.75, 0.45, 0.15]),
    ("punk", [0.50, 0.90, 0.45, 0.05]),
    ("metal", [0.30, 0.95, 0.35, 0.05]),
    ("energetic", [0.60, 0.90, 0.65, 0.10]),
    ("aggressive", [0.25, 0.90, 0.45, 0.05]),
    ("chill", [0.55, 0.30, 0.50, 0.55]),
    ("ambient", [0.40, 0.15, 0.25, 0.70]),
    ("lo-fi", [0.50, 0.30, 0.60, 0.55]),
    ("lofi", [0.50, 0.30, 0.60, 0.55]),
    ("relax*", [0.55, 0.20, 0.40, 0.65]),
    ("calm", [0.50, 0.15, 0.30, 0.70]),
    ("acoustic", [0.55, 0.30, 0.45, 0.90]),
    ("folk", [0.50, 0.35, 0.45, 0.80]),
    ("singer-songwriter", [0.45, 0.30, 0.40, 0.80]),
    ("classical", [0.40, 0.25, 0.20, 0.90]),
    ("piano", [0.40, 0.20, 0.25, 0.85]),
    ("jazz", [0.55, 0.40, 0.55, 0.65]),
    ("blues", [0.35, 0.45, 0.45, 0.60]),
    ("soul", [0.60, 0.50, 0.60, 0.45]),
    ("sad", [0.15, 0.30, 0.35, 0.60]),
    ("melanchol*", [0.15, 0.30, 0.30, 0.60]),
    ("dark", [0.20, 0.60, 0.40, 0.25]),
    ("emo", [0.25, 0.70, 0.40, 0.20]),
    ("romantic", [0.60, 0.35, 0.45, 0.55]),
];

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EstimatedMood {
    pub valence: f64,
    pub energy: f64,
    pub danceability: f64,
    pub acousticness: f64,
}

/// Average the lexicon entries matched by any tag. `None` if nothing matches.
///
/// Tempo is deliberately absent: tags say nothing reliable about BPM.
pub fn estimate_mood<'a>(tags: impl IntoIterator<Item = &'a String>) -> Option<EstimatedMood> {
    let mut sum: MoodVector = [0.0; 4];
    let mut matches = 0usize;
    for tag in tags {
        let tag = tag.trim().to_lowercase();
        if tag.is_empty() {
            continue;
        }
        for (keyword, vector) in LEXICON {
            if matches_keyword(&tag, keyword) {
                for (acc, v) in sum.iter_mut().zip(vector) {
                    *acc += v;
                }
                matches += 1;
            }
        }
    }
    if matches == 0 {
        return None;
    }
    let n = matches as f64;
    Some(EstimatedMood {
        valence: sum[0] / n,
        energy: sum[1] / n,
        danceability: sum[2] / n,
        acousticness: sum[3] / n,
    })
}

fn matches_keyword(tag: &str, keyword: &str) -> bool {
    let (word, is_stem) = match keyword.strip_suffix('*') {
        Some(stem) => (stem, true),
        None => (keyword, false),
    };
    tag.match_indices(word).any(|(start, _)| {
        let starts_word = !tag[..start]
            .chars()
            .next_back()
            .is_some_and(char::is_alphanumeric);
        let ends_word = is_stem
            || !tag[start + word.len()..]
                .chars()
                .next()
                .is_some_and(char::is_alphanumeric);
        starts_word && ends_word
    })
}

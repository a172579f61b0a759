use super::MergeError;
use crate::archive::track_hash;
use crate::enrichment::{MetadataChange, MetadataChangeNotifier};
use crate::listening::{NewTrack, Track};
use crate::store::EntityStore;
use anyhow::{Context, Result};
use std::sync::Arc;
use tracing::{debug, info, warn};

use super::resolver::MergeOutcome;

/// Track identities keyed by the normalized artist/title hash.
pub struct TrackResolver<S: EntityStore + ?Sized> {
    store: Arc<S>,
    notifier: Option<MetadataChangeNotifier>,
}

impl<S: EntityStore + ?Sized> TrackResolver<S> {
    pub fn new(store: Arc<S>) -> Self {
        Self {
            store,
            notifier: None,
        }
    }

    pub fn with_notifier(mut self, notifier: MetadataChangeNotifier) -> Self {
        self.notifier = Some(notifier);
        self
    }

    pub fn get_or_create_track(
        &self,
        raw_artist_string: &str,
        title: &str,
        album: Option<&str>,
        duration_ms: Option<i64>,
    ) -> Result<Track> {
        let hash = track_hash(raw_artist_string, title);

        if let Some(alias) = self.store.get_track_alias(&hash)? {
            match self.store.get_track(alias.target_id)? {
                Some(track) => return Ok(track),
                None => warn!(
                    "Track alias {} points to missing track {}",
                    hash, alias.target_id
                ),
            }
        }

        if let Some(track) = self.store.find_track_by_hash(&hash)? {
            return Ok(track);
        }

        let new_track = NewTrack {
            title: title.trim().to_string(),
            raw_artist_string: raw_artist_string.trim().to_string(),
            album: album.map(str::trim).filter(|a| !a.is_empty()).map(String::from),
            duration_ms,
            track_hash: hash.clone(),
        };
        let found = match self.store.try_insert_track(&new_track)? {
            Some(id) => {
                debug!("Created track {} ({})", new_track.title, id);
                self.store.get_track(id)?
            }
            None => self.store.find_track_by_hash(&hash)?,
        };
        found.with_context(|| format!("Track {} missing after insert", hash))
    }

    /// Redirect the track identified by `source_hash` to `target_id`.
    pub fn merge_track_into(
        &self,
        source_hash: &str,
        target_id: i64,
    ) -> Result<MergeOutcome, MergeError> {
        let key = source_hash.trim().to_string();
        if key.is_empty() {
            return Err(MergeError::BlankSource);
        }
        let target = self
            .store
            .get_track(target_id)?
            .ok_or(MergeError::UnknownTarget(target_id))?;
        if target.track_hash == key {
            return Err(MergeError::SelfMerge(key));
        }
        if let Some(alias) = self.store.get_track_alias(&target.track_hash)? {
            if alias.target_id != target.id {
                return Err(MergeError::ChainedAlias {
                    target: target.track_hash,
                    redirects_to: alias.target_id,
                });
            }
        }

        let source_id = self.store.find_track_by_hash(&key)?.map(|t| t.id);
        let repointed = self.store.record_track_merge(&key, target.id, source_id)?;
        info!(
            "Merged track {} into {} ({})",
            key, target.title, target.id
        );
        if let Some(notifier) = &self.notifier {
            notifier.notify(MetadataChange::TrackMerged {
                alias: key.clone(),
                target_id: target.id,
            });
        }
        Ok(MergeOutcome {
            alias: key,
            target_id: target.id,
            repointed_aliases: repointed,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::SqliteStatsStore;

    #[test]
    fn test_same_artist_and_title_share_a_track() {
        let tracks = TrackResolver::new(Arc::new(SqliteStatsStore::open_in_memory().unwrap()));
        let a = tracks
            .get_or_create_track("Massive Attack", "Teardrop", Some("Mezzanine"), None)
            .unwrap();
        let b = tracks
            .get_or_create_track(" massive attack", "TEARDROP ", None, Some(330_000))
            .unwrap();
        assert_eq!(a.id, b.id);
        assert_eq!(a.album.as_deref(), Some("Mezzanine"));
    }

    #[test]
    fn test_track_merge_redirects() {
        let tracks = TrackResolver::new(Arc::new(SqliteStatsStore::open_in_memory().unwrap()));
        let live = tracks
            .get_or_create_track("Muse", "Hysteria (Live)", None, None)
            .unwrap();
        let studio = tracks.get_or_create_track("Muse", "Hysteria", None, None).unwrap();

        tracks.merge_track_into(&live.track_hash, studio.id).unwrap();
        let resolved = tracks
            .get_or_create_track("Muse", "Hysteria (Live)", None, None)
            .unwrap();
        assert_eq!(resolved.id, studio.id);

        assert!(matches!(
            tracks.merge_track_into(&studio.track_hash, studio.id),
            Err(MergeError::SelfMerge(_))
        ));
    }
}

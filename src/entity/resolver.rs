use super::models::{
    Artist, CreditRole, ResolvedCredits, TrackArtistCredit, UNKNOWN_ARTIST_NAME,
};
use super::normalize::{clean_display_name, normalize_name};
use super::parser::parse_artist_credits;
use super::MergeError;
use crate::enrichment::{MetadataChange, MetadataChangeNotifier};
use crate::listening::Track;
use crate::store::EntityStore;
use anyhow::{bail, Context, Result};
use serde::Serialize;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Result of a successful merge.
#[derive(Serialize, Debug, Clone, PartialEq, Eq)]
pub struct MergeOutcome {
    pub alias: String,
    pub target_id: i64,
    /// Aliases that pointed at the merged identity and now point at the target.
    pub repointed_aliases: usize,
}

/// Turns free-text artist strings into canonical identities.
pub struct ArtistResolver<S: EntityStore + ?Sized> {
    store: Arc<S>,
    notifier: Option<MetadataChangeNotifier>,
}

impl<S: EntityStore + ?Sized> ArtistResolver<S> {
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

    pub(super) fn store(&self) -> &S {
        &self.store
    }

    /// Identity for `name`, creating it if needed.
    ///
    /// Follows an alias if one exists for the normalized name. Concurrent callers
    /// racing on the same new name all get the single row that won the insert.
    pub fn get_or_create(&self, name: &str) -> Result<Artist> {
        let normalized = normalize_name(name);
        if normalized.is_empty() {
            bail!("Cannot resolve a blank artist name");
        }

        if let Some(alias) = self.store.get_artist_alias(&normalized)? {
            match self.store.get_artist(alias.target_id)? {
                Some(target) => return Ok(target),
                None => warn!(
                    "Alias {} points to missing artist {}, ignoring it",
                    normalized, alias.target_id
                ),
            }
        }

        if let Some(artist) = self.store.find_artist_by_normalized_name(&normalized)? {
            return Ok(artist);
        }

        let canonical = clean_display_name(name);
        match self.store.try_insert_artist(&canonical, &normalized)? {
            Some(id) => {
                debug!("Created artist {} ({})", canonical, id);
                self.store
                    .get_artist(id)?
                    .with_context(|| format!("Artist {} missing right after insert", id))
            }
            None => {
                debug!("Lost insert race for artist {}, re-reading", normalized);
                self.store
                    .find_artist_by_normalized_name(&normalized)?
                    .with_context(|| format!("Artist {} missing after conflict", normalized))
            }
        }
    }

    /// The shared identity for tracks without any resolvable artist.
    pub fn unknown_artist(&self) -> Result<Artist> {
        self.get_or_create(UNKNOWN_ARTIST_NAME)
    }

    /// Split a raw artist string and resolve every credited name.
    ///
    /// Two names resolving to the same identity (e.g. through an alias) are credited
    /// once, in the earliest position.
    pub fn resolve(&self, raw_artist_string: &str) -> Result<ResolvedCredits> {
        let parsed = parse_artist_credits(raw_artist_string);
        let mut resolved = ResolvedCredits::default();
        let mut seen = std::collections::HashSet::new();

        for name in &parsed.primary {
            let artist = self.get_or_create(name)?;
            if seen.insert(artist.id) {
                resolved.primary.push(artist);
            }
        }
        for name in &parsed.featured {
            let artist = self.get_or_create(name)?;
            if seen.insert(artist.id) {
                resolved.featured.push(artist);
            }
        }
        Ok(resolved)
    }

    /// Rebuild the credits of `track` from its raw artist string.
    ///
    /// A track with no resolvable artist is linked to the unknown-artist identity so
    /// it is never picked up as unlinked again.
    pub fn link_track(&self, track: &Track) -> Result<Track> {
        let resolved = self.resolve(&track.raw_artist_string)?;

        let (credits, primary_artist_id) = if resolved.is_empty() {
            let sentinel = self.unknown_artist()?;
            warn!(
                "Track {} has no resolvable artist in {:?}, linking to {}",
                track.id, track.raw_artist_string, UNKNOWN_ARTIST_NAME
            );
            let credit = TrackArtistCredit {
                track_id: track.id,
                artist_id: sentinel.id,
                role: CreditRole::Primary,
                credit_order: 0,
            };
            (vec![credit], sentinel.id)
        } else {
            let credits: Vec<TrackArtistCredit> = resolved
                .primary
                .iter()
                .map(|a| (a, CreditRole::Primary))
                .chain(resolved.featured.iter().map(|a| (a, CreditRole::Featured)))
                .enumerate()
                .map(|(order, (artist, role))| TrackArtistCredit {
                    track_id: track.id,
                    artist_id: artist.id,
                    role,
                    credit_order: order as u32,
                })
                .collect();
            // Only featured names, e.g. "(feat. X)": the first one leads.
            let primary_artist_id = credits[0].artist_id;
            (credits, primary_artist_id)
        };

        self.store
            .replace_track_credits(track.id, &credits, primary_artist_id)?;

        Ok(Track {
            primary_artist_id: Some(primary_artist_id),
            ..track.clone()
        })
    }

    /// Redirect every future resolution of `source_name` to `target_id`.
    ///
    /// Existing credits are not rewritten here; the next backfill run relinks them.
    pub fn merge_into(&self, source_name: &str, target_id: i64) -> Result<MergeOutcome, MergeError> {
        let key = normalize_name(source_name);
        if key.is_empty() {
            return Err(MergeError::BlankSource);
        }

        let target = self
            .store
            .get_artist(target_id)?
            .ok_or(MergeError::UnknownTarget(target_id))?;
        if target.normalized_name == key {
            return Err(MergeError::SelfMerge(key));
        }
        if let Some(alias) = self.store.get_artist_alias(&target.normalized_name)? {
            if alias.target_id != target.id {
                warn!(
                    "Refusing to merge {} into {}: target is itself merged into {}",
                    key, target.normalized_name, alias.target_id
                );
                return Err(MergeError::ChainedAlias {
                    target: target.normalized_name,
                    redirects_to: alias.target_id,
                });
            }
        }

        let source_id = self
            .store
            .find_artist_by_normalized_name(&key)?
            .map(|a| a.id);
        if source_id == Some(target.id) {
            return Err(MergeError::SelfMerge(key));
        }

        let repointed = self.store.record_artist_merge(&key, target.id, source_id)?;
        info!(
            "Merged artist {} into {} ({}), {} aliases re-pointed",
            key, target.canonical_name, target.id, repointed
        );

        if let Some(notifier) = &self.notifier {
            notifier.notify(MetadataChange::ArtistMerged {
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

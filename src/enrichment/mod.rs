//! Reconciles metadata from several external providers into one view per track.

mod image;
mod models;
mod notifier;
mod priority;
pub mod providers;

pub use image::{ArtistImageProvider, ArtistImageResolver, ImageTier, ResolvedImage};
pub use models::{
    AudioFeatures, EnrichedFacetSet, Facet, FacetPayload, FacetValue, FeatureSource,
    GenreSource, ImageSource, MetadataChange,
};
pub use notifier::MetadataChangeNotifier;
pub use priority::{
    arbitrate, should_replace_features, should_replace_genres, should_replace_image,
    ApplyReport, MetadataPriorityResolver,
};
pub use providers::{build_image_providers, ProviderError};

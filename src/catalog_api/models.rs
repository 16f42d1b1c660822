//! Wire types for the streaming API responses.
//!
//! Only the fields the pipeline reads are modelled. Everything is lenient:
//! missing or null fields deserialize to defaults so that one odd entry does
//! not fail a whole page.

use serde::{Deserialize, Deserializer, Serialize};

/// Deserialize an explicit `null` as the type's default.
fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

/// Client-credentials token response.
#[derive(Clone, Debug, Deserialize)]
pub struct TokenResponse {
    pub access_token: String,
    #[serde(default = "default_expires_in")]
    pub expires_in: u64,
}

fn default_expires_in() -> u64 {
    3600
}

/// Playlist metadata, as returned by lookup (`fields=id,name`) and search.
#[derive(Clone, Debug, Default, Deserialize, Serialize)]
pub struct PlaylistSummary {
    #[serde(default, deserialize_with = "null_as_default")]
    pub id: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub name: String,
}

#[derive(Clone, Debug, Default, Deserialize)]
pub struct PlaylistSearchResponse {
    pub playlists: Option<PlaylistSearchPage>,
}

#[derive(Clone, Debug, Default, Deserialize)]
pub struct PlaylistSearchPage {
    // The provider returns null placeholders for unavailable playlists
    #[serde(default, deserialize_with = "null_as_default")]
    pub items: Vec<Option<PlaylistSummary>>,
}

/// One page of playlist entries.
#[derive(Clone, Debug, Default, Deserialize)]
pub struct PlaylistItemsPage {
    #[serde(default, deserialize_with = "null_as_default")]
    pub items: Vec<RawEntry>,
    #[serde(default)]
    pub total: Option<u32>,
}

/// A playlist entry. The wrapped track may be missing entirely.
#[derive(Clone, Debug, Default, Deserialize, Serialize)]
pub struct RawEntry {
    #[serde(default)]
    pub track: Option<RawTrack>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub is_local: bool,
}

#[derive(Clone, Debug, Default, Deserialize, Serialize)]
pub struct RawTrack {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub name: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub artists: Vec<RawArtist>,
    #[serde(default)]
    pub popularity: Option<u32>,
    #[serde(default)]
    pub album: Option<RawAlbum>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub is_local: bool,
}

#[derive(Clone, Debug, Default, Deserialize, Serialize)]
pub struct RawArtist {
    #[serde(default, deserialize_with = "null_as_default")]
    pub name: String,
}

#[derive(Clone, Debug, Default, Deserialize, Serialize)]
pub struct RawAlbum {
    #[serde(default)]
    pub release_date: Option<String>,
}

#[derive(Clone, Debug, Default, Deserialize)]
pub struct AudioFeaturesResponse {
    #[serde(default, deserialize_with = "null_as_default")]
    pub audio_features: Vec<Option<RawAudioFeatures>>,
}

/// Audio features for one track. Positions in the response follow the
/// requested ids, with null for unknown tracks.
#[derive(Clone, Debug, Default, PartialEq, Deserialize, Serialize)]
pub struct RawAudioFeatures {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub tempo: f64,
    #[serde(default, deserialize_with = "null_as_default")]
    pub energy: f64,
    #[serde(default, deserialize_with = "null_as_default")]
    pub danceability: f64,
    #[serde(default, deserialize_with = "null_as_default")]
    pub loudness: f64,
    #[serde(default, deserialize_with = "null_as_default")]
    pub valence: f64,
    #[serde(default, deserialize_with = "null_as_default")]
    pub acousticness: f64,
}

//! Community submission staging.

use crate::error::MetadataResult;
use async_trait::async_trait;
use std::collections::HashSet;

/// Which submission pipeline a request targets. Each kind has its own
/// staging table and its own authoritative dedup source.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SubmissionKind {
    Videos,
    Playlists,
    Channels,
}

impl SubmissionKind {
    /// Authoritative table already ingested by the corpus partitioner.
    pub fn canonical_table(&self) -> &'static str {
        match self {
            Self::Videos => "videos",
            Self::Playlists => "playlists",
            Self::Channels => "channels",
        }
    }

    /// Staging table written by the submission endpoints.
    pub fn staging_table(&self) -> &'static str {
        match self {
            Self::Videos => "user_videos",
            Self::Playlists => "user_playlists",
            Self::Channels => "user_channels",
        }
    }

    /// Identifier column name, shared by both tables.
    pub fn id_column(&self) -> &'static str {
        match self {
            Self::Videos => "video_id",
            Self::Playlists => "playlist_id",
            Self::Channels => "channel_id",
        }
    }
}

/// Repository for the three dedup-and-stage submission tables.
///
/// Identifier values are always bound parameters; only the table and column
/// names above (compile-time constants) are interpolated into SQL.
#[async_trait]
pub trait SubmissionRepo: Send + Sync {
    /// Return the subset of `ids` already present in either the
    /// authoritative or the staging table for `kind`.
    async fn known_identifiers(
        &self,
        kind: SubmissionKind,
        ids: &[String],
    ) -> MetadataResult<HashSet<String>>;

    /// Stage identifiers, ignoring duplicates (`ON CONFLICT DO NOTHING`).
    /// The input is expected to be pre-filtered and deduplicated.
    async fn stage_identifiers(&self, kind: SubmissionKind, ids: &[String]) -> MetadataResult<()>;
}

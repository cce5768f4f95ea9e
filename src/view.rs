//! Deterministic projection of the library into the visible track list.
//!
//! [`recompute`] derives the ordered, UI-visible sequence from a library
//! snapshot, the playlist registry and the current [`FilterSortState`]. It
//! is a pure function of those inputs: identical inputs yield an identical
//! ordered output.

use std::cmp::Ordering;

use chrono::{DateTime, Utc};

use crate::library::{Track, TrackLibrary};
use crate::playlist::PlaylistRegistry;

/// Sort order of the visible list. Title is the default and the universal
/// tiebreaker for every other mode.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Default)]
pub enum SortMode {
    #[default]
    Title,
    Artist,
    Album,
    Duration,
    DateAdded,
}

/// Filter and sort state applied when deriving the visible list.
#[derive(Debug, Clone, Default)]
pub struct FilterSortState {
    /// Free-text query matched as a case-insensitive substring of title,
    /// artist or album. Empty = no-op.
    pub query: String,
    /// Exact artist filter (case-insensitive equality).
    pub artist: Option<String>,
    /// Exact album filter (case-insensitive equality).
    pub album: Option<String>,
    /// Scope the base set to this playlist's tracks, in playlist order.
    pub active_playlist: Option<String>,
    pub sort: SortMode,
}

/// Derive the visible track list.
///
/// Steps, each narrowing the candidate set: playlist scoping (dangling
/// paths silently skipped), artist filter, album filter, free-text filter,
/// then sort.
pub fn recompute(
    library: &TrackLibrary,
    playlists: &PlaylistRegistry,
    state: &FilterSortState,
) -> Vec<Track> {
    let mut entries: Vec<(Track, Option<DateTime<Utc>>)> = match state
        .active_playlist
        .as_deref()
        .and_then(|name| playlists.get(name))
    {
        Some(playlist) => playlist
            .tracks
            .iter()
            .filter_map(|path| {
                library
                    .get(path)
                    .map(|track| (track, library.added_at(path)))
            })
            .collect(),
        None => library.entries(),
    };

    if let Some(artist) = state.artist.as_deref() {
        let needle = artist.to_lowercase();
        entries.retain(|(t, _)| t.artist.to_lowercase() == needle);
    }

    if let Some(album) = state.album.as_deref() {
        let needle = album.to_lowercase();
        entries.retain(|(t, _)| t.album.to_lowercase() == needle);
    }

    let query = state.query.trim().to_lowercase();
    if !query.is_empty() {
        entries.retain(|(t, _)| {
            t.title.to_lowercase().contains(&query)
                || t.artist.to_lowercase().contains(&query)
                || t.album.to_lowercase().contains(&query)
        });
    }

    entries.sort_by(|a, b| compare(state.sort, a, b));
    entries.into_iter().map(|(track, _)| track).collect()
}

fn by_title(a: &Track, b: &Track) -> Ordering {
    a.title.to_lowercase().cmp(&b.title.to_lowercase())
}

fn compare(
    sort: SortMode,
    (a, a_added): &(Track, Option<DateTime<Utc>>),
    (b, b_added): &(Track, Option<DateTime<Utc>>),
) -> Ordering {
    match sort {
        SortMode::Title => by_title(a, b),
        SortMode::Artist => a
            .artist
            .to_lowercase()
            .cmp(&b.artist.to_lowercase())
            .then_with(|| by_title(a, b)),
        SortMode::Album => a
            .album
            .to_lowercase()
            .cmp(&b.album.to_lowercase())
            .then_with(|| by_title(a, b)),
        SortMode::Duration => a.duration.cmp(&b.duration).then_with(|| by_title(a, b)),
        // missing timestamps sort first: None < Some
        SortMode::DateAdded => a_added.cmp(b_added).then_with(|| by_title(a, b)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::library::testing::{track, track_with};
    use std::path::Path;
    use std::sync::Arc;

    fn library_of(tracks: Vec<Track>) -> Arc<TrackLibrary> {
        let library = Arc::new(TrackLibrary::new());
        for t in tracks {
            library.upsert(t);
        }
        library
    }

    fn titles(tracks: &[Track]) -> Vec<&str> {
        tracks.iter().map(|t| t.title.as_str()).collect()
    }

    #[test]
    fn default_sort_is_title_case_insensitive() {
        let library = library_of(vec![
            track("/m/1.mp3", "beta"),
            track("/m/2.mp3", "Alpha"),
            track("/m/3.mp3", "gamma"),
        ]);
        let playlists = PlaylistRegistry::new();

        let visible = recompute(&library, &playlists, &FilterSortState::default());
        assert_eq!(titles(&visible), vec!["Alpha", "beta", "gamma"]);
    }

    #[test]
    fn recompute_is_deterministic() {
        let library = library_of(vec![
            track_with("/m/1.mp3", "Song A", "X", "First", 100),
            track_with("/m/2.mp3", "Song B", "Y", "Second", 90),
            track_with("/m/3.mp3", "Song C", "X", "First", 90),
        ]);
        let playlists = PlaylistRegistry::new();
        let state = FilterSortState {
            sort: SortMode::Duration,
            ..FilterSortState::default()
        };

        let first = recompute(&library, &playlists, &state);
        for _ in 0..5 {
            let again = recompute(&library, &playlists, &state);
            assert_eq!(titles(&first), titles(&again));
        }
    }

    #[test]
    fn equal_primary_keys_fall_back_to_title_order() {
        let library = library_of(vec![
            track_with("/m/1.mp3", "Zeta", "Same", "Same", 120),
            track_with("/m/2.mp3", "Alpha", "Same", "Same", 120),
            track_with("/m/3.mp3", "Mid", "Same", "Same", 120),
        ]);
        let playlists = PlaylistRegistry::new();

        for sort in [
            SortMode::Artist,
            SortMode::Album,
            SortMode::Duration,
            SortMode::DateAdded,
        ] {
            let state = FilterSortState {
                sort,
                ..FilterSortState::default()
            };
            let visible = recompute(&library, &playlists, &state);
            assert_eq!(titles(&visible), vec!["Alpha", "Mid", "Zeta"], "{sort:?}");
        }
    }

    #[test]
    fn duration_sorts_numerically_before_title() {
        let library = library_of(vec![
            track_with("/m/1.mp3", "Long", "A", "A", 300),
            track_with("/m/2.mp3", "Short", "A", "A", 10),
        ]);
        let playlists = PlaylistRegistry::new();
        let state = FilterSortState {
            sort: SortMode::Duration,
            ..FilterSortState::default()
        };
        assert_eq!(
            titles(&recompute(&library, &playlists, &state)),
            vec!["Short", "Long"]
        );
    }

    #[test]
    fn free_text_filter_matches_title_artist_or_album_substring() {
        let library = library_of(vec![
            track_with("/m/a.mp3", "Alpha", "X", "One", 0),
            track_with("/m/b.mp3", "Beta", "Y", "Two", 0),
        ]);
        let playlists = PlaylistRegistry::new();

        let state = FilterSortState {
            query: "alp".into(),
            ..FilterSortState::default()
        };
        assert_eq!(titles(&recompute(&library, &playlists, &state)), vec!["Alpha"]);

        // matches artist too
        let state = FilterSortState {
            query: "y".into(),
            ..FilterSortState::default()
        };
        assert_eq!(titles(&recompute(&library, &playlists, &state)), vec!["Beta"]);

        // blank query is a no-op
        let state = FilterSortState {
            query: "   ".into(),
            ..FilterSortState::default()
        };
        assert_eq!(recompute(&library, &playlists, &state).len(), 2);
    }

    #[test]
    fn artist_and_album_filters_are_exact_case_insensitive() {
        let library = library_of(vec![
            track_with("/m/a.mp3", "Alpha", "The Band", "One", 0),
            track_with("/m/b.mp3", "Beta", "The Bandits", "One", 0),
        ]);
        let playlists = PlaylistRegistry::new();

        let state = FilterSortState {
            artist: Some("the band".into()),
            ..FilterSortState::default()
        };
        assert_eq!(titles(&recompute(&library, &playlists, &state)), vec!["Alpha"]);

        let state = FilterSortState {
            album: Some("ONE".into()),
            ..FilterSortState::default()
        };
        assert_eq!(recompute(&library, &playlists, &state).len(), 2);
    }

    #[test]
    fn active_playlist_scopes_in_playlist_order_and_skips_dangling() {
        let library = library_of(vec![
            track("/m/a.mp3", "Alpha"),
            track("/m/b.mp3", "Beta"),
            track("/m/c.mp3", "Gamma"),
        ]);
        let playlists = PlaylistRegistry::new();
        playlists.add_track("Mix", Path::new("/m/c.mp3")).unwrap();
        playlists.add_track("Mix", Path::new("/m/a.mp3")).unwrap();
        playlists.add_track("Mix", Path::new("/m/ghost.mp3")).unwrap();

        // Title sort still applies after scoping
        let state = FilterSortState {
            active_playlist: Some("mix".into()),
            ..FilterSortState::default()
        };
        let visible = recompute(&library, &playlists, &state);
        assert_eq!(titles(&visible), vec!["Alpha", "Gamma"]);
    }

    #[test]
    fn missing_active_playlist_falls_back_to_whole_library() {
        let library = library_of(vec![track("/m/a.mp3", "Alpha")]);
        let playlists = PlaylistRegistry::new();
        let state = FilterSortState {
            active_playlist: Some("nope".into()),
            ..FilterSortState::default()
        };
        assert_eq!(recompute(&library, &playlists, &state).len(), 1);
    }
}

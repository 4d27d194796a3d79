use std::fmt::Write as _;

use crate::playlist::Track;

#[derive(Debug, Clone, PartialEq)]
pub(crate) struct CueEntry {
    pub(crate) number: usize,
    pub(crate) title: String,
    pub(crate) performer: String,
    pub(crate) preroll: Option<f64>,
    pub(crate) start: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub(crate) struct AlbumHeader {
    pub(crate) genre: String,
    pub(crate) date: String,
    pub(crate) performer: String,
    pub(crate) title: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum TimestampStyle {
    Milliseconds,
    Frames,
}

pub(crate) fn album_header(tracks: &[Track]) -> AlbumHeader {
    let first = &tracks[0];
    let performer = if first.album_artist.is_empty() {
        first.artist.clone()
    } else {
        first.album_artist.clone()
    };
    AlbumHeader {
        genre: first.genre.clone(),
        date: first.date.clone(),
        performer,
        title: first.album.clone(),
    }
}

// The first track starts at the equalizer pre-roll so the split points
// line up with the filter-delayed audio.
pub(crate) fn compute_timeline(tracks: &[Track], preroll: f64) -> Vec<CueEntry> {
    let mut entries = Vec::with_capacity(tracks.len());
    let mut time = preroll;
    for (idx, track) in tracks.iter().enumerate() {
        let performer = if track.artist.is_empty() {
            track.album_artist.clone()
        } else {
            track.artist.clone()
        };
        entries.push(CueEntry {
            number: idx + 1,
            title: track.title.clone(),
            performer,
            preroll: (idx == 0).then_some(preroll),
            start: time,
        });
        time += track.duration;
    }
    entries
}

pub(crate) fn format_timestamp(seconds: f64, style: TimestampStyle) -> String {
    let whole = seconds.floor();
    let minutes = (whole / 60.0) as u64;
    let secs = (whole % 60.0) as u64;
    let frac = seconds - whole;
    match style {
        TimestampStyle::Milliseconds => {
            let millis = ((frac * 1000.0).round() as u64).min(999);
            format!("{:02}:{:02}.{:03}", minutes, secs, millis)
        }
        TimestampStyle::Frames => {
            let frames = ((frac * 75.0).floor() as u64).min(74);
            format!("{:02}:{:02}:{:02}", minutes, secs, frames)
        }
    }
}

pub(crate) fn render(
    header: &AlbumHeader,
    entries: &[CueEntry],
    audio_file: &str,
    style: TimestampStyle,
) -> String {
    let mut text = String::new();
    if !header.genre.is_empty() {
        let _ = writeln!(text, "REM GENRE \"{}\"", header.genre);
    }
    if !header.date.is_empty() {
        let _ = writeln!(text, "REM DATE {}", header.date);
    }
    if !header.performer.is_empty() {
        let _ = writeln!(text, "PERFORMER \"{}\"", header.performer);
    }
    if !header.title.is_empty() {
        let _ = writeln!(text, "TITLE \"{}\"", header.title);
    }
    let _ = writeln!(text, "FILE \"{}\" WAVE", audio_file);

    for entry in entries {
        let _ = writeln!(text, "  TRACK {:02} AUDIO", entry.number);
        if !entry.title.is_empty() {
            let _ = writeln!(text, "    TITLE \"{}\"", entry.title);
        }
        if !entry.performer.is_empty() {
            let _ = writeln!(text, "    PERFORMER \"{}\"", entry.performer);
        }
        if let Some(preroll) = entry.preroll {
            let _ = writeln!(text, "    INDEX 00 {}", format_timestamp(preroll, style));
        }
        let _ = writeln!(text, "    INDEX 01 {}", format_timestamp(entry.start, style));
    }
    text
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::playlist::Track;
    use std::path::PathBuf;

    fn track(title: &str, duration: f64) -> Track {
        Track {
            path: PathBuf::from(format!("{}.flac", title)),
            duration,
            title: title.to_string(),
            artist: "Artist".to_string(),
            album: "Album".to_string(),
            album_artist: String::new(),
            date: "2016".to_string(),
            genre: "Ambient".to_string(),
        }
    }

    #[test]
    fn timeline_matches_track_count_and_is_monotonic() {
        let tracks = vec![track("One", 180.0), track("Two", 200.5), track("Three", 150.25)];
        let entries = compute_timeline(&tracks, 0.2);
        assert_eq!(entries.len(), tracks.len());
        for pair in entries.windows(2) {
            assert!(pair[0].start <= pair[1].start);
        }
    }

    #[test]
    fn only_the_first_track_carries_the_preroll() {
        let tracks = vec![track("One", 180.0), track("Two", 200.5)];
        let entries = compute_timeline(&tracks, 0.2);
        assert_eq!(entries[0].preroll, Some(0.2));
        assert_eq!(entries[1].preroll, None);
    }

    #[test]
    fn timestamp_styles_agree_on_whole_seconds() {
        assert_eq!(format_timestamp(380.7, TimestampStyle::Milliseconds), "06:20.700");
        assert_eq!(format_timestamp(0.2, TimestampStyle::Milliseconds), "00:00.200");
        assert_eq!(format_timestamp(0.2, TimestampStyle::Frames), "00:00:15");
        assert_eq!(format_timestamp(61.0, TimestampStyle::Frames), "01:01:00");
    }

    #[test]
    fn header_omits_empty_fields() {
        let mut tracks = vec![track("One", 1.0)];
        tracks[0].genre = String::new();
        tracks[0].album = String::new();
        let header = album_header(&tracks);
        let text = render(
            &header,
            &compute_timeline(&tracks, 0.2),
            "concat_b.flac",
            TimestampStyle::Milliseconds,
        );
        assert!(!text.contains("REM GENRE"));
        assert!(!text.contains("TITLE \"Album\""));
        assert!(text.contains("REM DATE 2016"));
        assert!(text.contains("PERFORMER \"Artist\""));
        assert!(text.contains("FILE \"concat_b.flac\" WAVE"));
    }

    #[test]
    fn track_performer_falls_back_to_album_artist() {
        let mut tracks = vec![track("One", 1.0)];
        tracks[0].artist = String::new();
        tracks[0].album_artist = "Various".to_string();
        let entries = compute_timeline(&tracks, 0.0);
        assert_eq!(entries[0].performer, "Various");
    }
}

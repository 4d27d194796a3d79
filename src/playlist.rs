use lofty::{AudioFile, ItemKey, TaggedFileExt};
use std::fs;
use std::path::{Path, PathBuf};

use crate::{Error, Result};

#[derive(Debug, Clone, PartialEq)]
pub(crate) struct Track {
    pub(crate) path: PathBuf,
    pub(crate) duration: f64,
    pub(crate) title: String,
    pub(crate) artist: String,
    pub(crate) album: String,
    pub(crate) album_artist: String,
    pub(crate) date: String,
    pub(crate) genre: String,
}

pub(crate) fn scan(dir: &Path, ext: &str) -> Result<Vec<Track>> {
    let read_dir = fs::read_dir(dir).map_err(|err| {
        Error::io(format!("failed to read directory {}", dir.display()), err)
    })?;

    let mut paths = Vec::new();
    for entry in read_dir {
        let entry =
            entry.map_err(|err| Error::io("failed to read directory entry".to_string(), err))?;
        let path = entry.path();
        if !path.is_file() {
            continue;
        }
        let matches = path
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.eq_ignore_ascii_case(ext))
            .unwrap_or(false);
        if matches {
            paths.push(path);
        }
    }
    paths.sort();

    if paths.is_empty() {
        return Err(Error::Input(format!(
            "no .{} files found in {}",
            ext,
            dir.display()
        )));
    }

    paths.into_iter().map(read_track).collect()
}

fn read_track(path: PathBuf) -> Result<Track> {
    let tagged = lofty::read_from_path(&path).map_err(|err| {
        Error::Input(format!(
            "failed to read metadata from {}: {}",
            path.display(),
            err
        ))
    })?;

    let duration = tagged.properties().duration().as_secs_f64();
    let tag = tagged.primary_tag().or_else(|| tagged.first_tag());
    let get = |key: ItemKey| -> String {
        tag.and_then(|tag| tag.get_string(&key))
            .unwrap_or_default()
            .trim()
            .to_string()
    };

    let date = {
        let date = get(ItemKey::RecordingDate);
        if date.is_empty() { get(ItemKey::Year) } else { date }
    };

    Ok(Track {
        duration,
        title: get(ItemKey::TrackTitle),
        artist: get(ItemKey::TrackArtist),
        album: get(ItemKey::AlbumTitle),
        album_artist: get(ItemKey::AlbumArtist),
        genre: get(ItemKey::Genre),
        date,
        path,
    })
}

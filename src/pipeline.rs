use std::ffi::OsString;
use std::fmt::Write as _;
use std::fs;
use std::path::Path;

use crate::config::Config;
use crate::cue::{self, TimestampStyle};
use crate::gain::{self, ConversionPlan, GainState, LineEvent};
use crate::graph::{self, Finish, GraphSpec};
use crate::playlist::{self, Track};
use crate::process::{self, LineAction};
use crate::{Error, Result};

pub(crate) fn run(config: &Config) -> Result<()> {
    let needs_playlist = config.stages.concat || config.stages.cue || config.stages.split;
    let playlist = if needs_playlist {
        playlist::scan(&config.input_dir, &config.file_ext)?
    } else {
        Vec::new()
    };

    let mut state = GainState::new(config);

    if config.stages.concat {
        log::info!("### Concatenating...");
        concat(config, &playlist)?;
        log::info!("### Concatenating - done.");
    }

    if config.stages.cue {
        log::info!("### Making CUE sheet...");
        make_cue(config, &playlist)?;
        log::info!("### Making CUE sheet - done.");
    }

    if config.stages.voldetect && state.detected_gain.is_none() {
        if config.stages.conv && config.conv_file.is_file() && !config.force {
            log::info!("Converted file exists, skipping volume detection.");
        } else {
            log::info!("### Running volume detection...");
            gain::negotiate(config, &mut state)?;
            if let Some(gain) = state.detected_gain {
                log::info!("### Running volume detection - done. (volgain = {:.2})", gain);
            }
        }
    }

    if config.stages.conv {
        log::info!("### Converting...");
        convert(config, &state)?;
        log::info!("### Converting - done.");
    }

    if config.stages.split {
        log::info!("### Splitting...");
        split(config, &playlist)?;
        log::info!("### Splitting - done.");
    }

    log::info!("### Done.");
    Ok(())
}

fn concat(config: &Config, playlist: &[Track]) -> Result<()> {
    if config.list_file.is_file() && !config.force {
        log::info!("List file exists, skipping.");
    } else {
        let text = concat_list_text(playlist);
        fs::write(&config.list_file, text).map_err(|err| {
            Error::io(
                format!("could not create list file {}", config.list_file.display()),
                err,
            )
        })?;
    }

    if config.concat_file.is_file() && !config.force {
        log::info!("Concatenated file exists, skipping.");
        return Ok(());
    }

    let mut args = to_args(["-f", "concat", "-safe", "0", "-i"]);
    args.push(config.list_file.clone().into());
    args.extend(to_args(["-c:a", "flac"]));
    if config.force {
        args.push(OsString::from("-y"));
    }
    args.push(config.concat_file.clone().into());
    run_tool(config, &config.ffmpeg, &args, "concatenating")
}

// ffmpeg concat demuxer list format; single quotes in paths become '\''
pub(crate) fn concat_list_text(playlist: &[Track]) -> String {
    let mut text = String::new();
    for track in playlist {
        let path = track.path.display().to_string().replace('\'', "'\\''");
        let _ = writeln!(text, "file '{}'", path);
        let _ = writeln!(text, "duration {}", track.duration);
    }
    text
}

fn make_cue(config: &Config, playlist: &[Track]) -> Result<()> {
    if config.cue_file.is_file() && !config.force {
        log::info!("Cue sheet exists, skipping.");
        return Ok(());
    }

    let header = cue::album_header(playlist);
    let entries = cue::compute_timeline(playlist, config.eq_delay);
    let standard = cue::render(&header, &entries, &config.conv_name, TimestampStyle::Milliseconds);
    let frames = cue::render(&header, &entries, &config.conv_name, TimestampStyle::Frames);

    write_file(&config.cue_file, &standard)?;
    write_file(&config.cue_file_frames, &frames)
}

fn convert(config: &Config, state: &GainState) -> Result<()> {
    if config.conv_file.is_file() && !config.force {
        log::info!("Converted file exists, skipping.");
        return Ok(());
    }

    let Some(plan) = state.plan(config.normalize) else {
        return Err(Error::Input(
            "no conversion gain available; run volume detection or pass --volgain".to_string(),
        ));
    };

    match plan {
        ConversionPlan::Single { gain_db } => {
            let graph = graph::build(&conversion_spec(config, state.spat_gain, gain_db));
            let args = conversion_args(config, &config.concat_file, &graph, &config.conv_file);
            run_tool(config, &config.ffmpeg, &args, "converting")
        }
        ConversionPlan::Limited {
            peak_gain_db,
            loudness_gain_db,
        } => {
            // the limiter lands in the second pass, after the residual
            // peak of the intermediate has been measured
            let graph = graph::build(&conversion_spec(config, state.spat_gain, peak_gain_db));
            let mut args = to_args(["-i"]);
            args.push(config.concat_file.clone().into());
            args.push(OsString::from("-af"));
            args.push(OsString::from(graph));
            // a leftover intermediate only ever comes from a failed run
            args.push(OsString::from("-y"));
            args.push(config.temp_file.clone().into());
            run_tool(config, &config.ffmpeg, &args, "rendering intermediate")?;

            let correction = measure_residual(config)?;
            let final_gain = loudness_gain_db - peak_gain_db + correction;
            log::info!(
                "Applying {:.2} dB over the intermediate (correction {:.2} dB), limiter engaged.",
                final_gain,
                correction
            );

            let graph = graph::volume_only(final_gain, true);
            let args = conversion_args(config, &config.temp_file, &graph, &config.conv_file);
            run_tool(config, &config.ffmpeg, &args, "converting")?;

            fs::remove_file(&config.temp_file).map_err(|err| {
                Error::io(
                    format!(
                        "could not remove intermediate file {}",
                        config.temp_file.display()
                    ),
                    err,
                )
            })
        }
    }
}

// Dry-run pass over the intermediate: the spatialization chain shifts
// levels slightly, so the remaining headroom is measured and folded
// into the final volume stage.
fn measure_residual(config: &Config) -> Result<f64> {
    let mut residual = None;
    let mut args = to_args(["-i"]);
    args.push(config.temp_file.clone().into());
    args.extend(to_args(["-af", "volumedetect", "-f", "null", "/dev/null"]));
    process::run(
        &config.ffmpeg,
        &args,
        "measuring intermediate",
        config.verbose,
        &[0],
        |line| {
            if let LineEvent::PeakMeasured(value) = gain::classify(line) {
                residual = Some(value);
            }
            LineAction::Continue
        },
    )?;
    Ok(match residual {
        Some(peak) => -peak + config.gain_offset,
        None => 0.0,
    })
}

fn split(config: &Config, playlist: &[Track]) -> Result<()> {
    if !config.force && split_outputs_present(&config.split_out_dir, &config.file_ext, playlist.len())
    {
        log::info!("Split tracks exist, skipping.");
        return Ok(());
    }

    fs::create_dir_all(&config.split_out_dir).map_err(|err| {
        Error::io(
            format!(
                "could not create output directory {}",
                config.split_out_dir.display()
            ),
            err,
        )
    })?;

    let mut args = vec![OsString::from(config.conv_file.clone())];
    args.push(OsString::from("-cue"));
    args.push(config.cue_file.clone().into());
    args.push(OsString::from("-o"));
    args.push(config.split_out_dir.clone().into());
    run_tool(config, &config.splitter, &args, "splitting")
}

pub(crate) fn split_outputs_present(dir: &Path, ext: &str, expected: usize) -> bool {
    if expected == 0 {
        return false;
    }
    let Ok(read_dir) = fs::read_dir(dir) else {
        return false;
    };
    let count = read_dir
        .filter_map(|entry| entry.ok())
        .filter(|entry| {
            let path = entry.path();
            path.is_file()
                && path
                    .extension()
                    .and_then(|e| e.to_str())
                    .map(|e| e.eq_ignore_ascii_case(ext))
                    .unwrap_or(false)
        })
        .count();
    count >= expected
}

// spat_gain comes from the gain state: clip retries during detection
// lower it, and the conversion graph must match the probed one
fn conversion_spec<'a>(config: &'a Config, spat_gain: f64, gain_db: f64) -> GraphSpec<'a> {
    GraphSpec {
        mode: config.mode,
        layout: config.layout,
        sofa: &config.sofa,
        spat_gain,
        eq_delay: config.eq_delay,
        bass_boost: config.bass_boost,
        lfe_regen: config.lfe_regen,
        finish: Finish::Volume {
            gain_db,
            limiter: false,
        },
    }
}

fn conversion_args(config: &Config, input: &Path, graph: &str, output: &Path) -> Vec<OsString> {
    let mut args = to_args(["-i"]);
    args.push(input.to_path_buf().into());
    args.push(OsString::from("-af"));
    args.push(OsString::from(graph));
    if config.force {
        args.push(OsString::from("-y"));
    }
    args.push(output.to_path_buf().into());
    args
}

fn run_tool(config: &Config, tool: &Path, args: &[OsString], label: &str) -> Result<()> {
    process::run(tool, args, label, config.verbose, &[0], |_| {
        LineAction::Continue
    })
    .map(|_| ())
}

fn write_file(path: &Path, contents: &str) -> Result<()> {
    fs::write(path, contents)
        .map_err(|err| Error::io(format!("could not write output to {}", path.display()), err))
}

fn to_args<const N: usize>(parts: [&str; N]) -> Vec<OsString> {
    parts.iter().map(OsString::from).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::playlist::Track;
    use std::fs;
    use std::path::PathBuf;
    use tempfile::tempdir;

    fn track(path: &str, duration: f64) -> Track {
        Track {
            path: PathBuf::from(path),
            duration,
            title: String::new(),
            artist: String::new(),
            album: String::new(),
            album_artist: String::new(),
            date: String::new(),
            genre: String::new(),
        }
    }

    #[test]
    fn list_text_escapes_single_quotes() {
        let playlist = vec![track("/music/don't panic.flac", 180.0)];
        let text = concat_list_text(&playlist);
        assert_eq!(
            text,
            "file '/music/don'\\''t panic.flac'\nduration 180\n"
        );
    }

    #[test]
    fn list_text_keeps_playlist_order() {
        let playlist = vec![track("/a.flac", 1.5), track("/b.flac", 2.0)];
        let text = concat_list_text(&playlist);
        let first = text.find("/a.flac").unwrap();
        let second = text.find("/b.flac").unwrap();
        assert!(first < second);
    }

    #[test]
    fn split_outputs_present_counts_matching_files() {
        let dir = tempdir().unwrap();
        assert!(!split_outputs_present(dir.path(), "flac", 2));

        fs::write(dir.path().join("1.flac"), b"x").unwrap();
        fs::write(dir.path().join("cover.jpg"), b"x").unwrap();
        assert!(!split_outputs_present(dir.path(), "flac", 2));

        fs::write(dir.path().join("2.FLAC"), b"x").unwrap();
        assert!(split_outputs_present(dir.path(), "flac", 2));
    }

    #[test]
    fn split_outputs_present_is_false_for_missing_dir() {
        assert!(!split_outputs_present(Path::new("/nonexistent"), "flac", 1));
    }
}

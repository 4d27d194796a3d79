use std::path::{Path, PathBuf};

use crate::Result;
use crate::cli::Args;

pub(crate) const DEFAULT_EXT: &str = "flac";
pub(crate) const DEFAULT_CONCAT_FILE: &str = "concat.flac";
pub(crate) const DEFAULT_CONV_FILE: &str = "concat_b.flac";
pub(crate) const DEFAULT_TEMP_FILE: &str = "concat_tmp.flac";
pub(crate) const DEFAULT_LIST_FILE: &str = "filelist.txt";
pub(crate) const DEFAULT_CUE_FILE: &str = "cuesheet.cue";
pub(crate) const DEFAULT_LOG_FILE: &str = "binauralconv.log";
pub(crate) const DEFAULT_SPLIT_OUT_DIR: &str = "tracks";

pub(crate) const DEFAULT_SPAT_GAIN: f64 = 20.5;
pub(crate) const DEFAULT_SPAT_GAIN_STEP: f64 = 1.0;
pub(crate) const DEFAULT_GAIN_OFFSET: f64 = -0.05;
pub(crate) const DEFAULT_EQ_DELAY: f64 = 0.2;
pub(crate) const DEFAULT_LFE_REGEN_MULT: f64 = 0.5;
pub(crate) const LOUDNESS_TARGET_LUFS: f64 = -18.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Layout {
    Surround51,
    Quad40,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum SpatMode {
    Sofalizer,
    Crossfeed,
}

#[derive(Debug, Clone, Copy)]
pub(crate) struct Stages {
    pub(crate) concat: bool,
    pub(crate) cue: bool,
    pub(crate) voldetect: bool,
    pub(crate) conv: bool,
    pub(crate) split: bool,
}

impl Stages {
    pub(crate) fn resolve(args: &Args) -> Self {
        let only = |concat, cue, voldetect, conv, split| Self {
            concat,
            cue,
            voldetect,
            conv,
            split,
        };
        if args.concat_only {
            return only(true, false, false, false, false);
        }
        if args.cue_only {
            return only(false, true, false, false, false);
        }
        if args.voldetect_only {
            return only(false, false, true, false, false);
        }
        if args.conv_only {
            return only(false, false, false, true, false);
        }
        if args.split_only {
            return only(false, false, false, false, true);
        }
        Self {
            concat: !args.no_concat,
            cue: !args.no_cue,
            voldetect: true,
            conv: !args.no_conv,
            split: !args.no_split,
        }
    }
}

#[derive(Debug)]
pub(crate) struct Config {
    pub(crate) input_dir: PathBuf,
    pub(crate) work_dir: PathBuf,
    pub(crate) split_out_dir: PathBuf,
    pub(crate) file_ext: String,
    pub(crate) list_file: PathBuf,
    pub(crate) concat_file: PathBuf,
    pub(crate) temp_file: PathBuf,
    pub(crate) conv_file: PathBuf,
    pub(crate) conv_name: String,
    pub(crate) cue_file: PathBuf,
    pub(crate) cue_file_frames: PathBuf,
    pub(crate) ffmpeg: PathBuf,
    pub(crate) splitter: PathBuf,
    pub(crate) sofa: PathBuf,
    pub(crate) layout: Layout,
    pub(crate) mode: SpatMode,
    pub(crate) spat_gain: f64,
    pub(crate) spat_gain_step: f64,
    pub(crate) volgain: Option<f64>,
    pub(crate) gain_offset: f64,
    pub(crate) eq_delay: f64,
    pub(crate) bass_boost: bool,
    pub(crate) lfe_regen: Option<f64>,
    pub(crate) normalize: bool,
    pub(crate) stages: Stages,
    pub(crate) force: bool,
    pub(crate) quiet: bool,
    pub(crate) verbose: bool,
}

impl Config {
    pub(crate) fn from_args(args: Args, input_dir: PathBuf, work_dir: PathBuf) -> Result<Self> {
        let stages = Stages::resolve(&args);

        let file_ext = args
            .ext
            .map(|ext| ext.trim_start_matches('.').to_ascii_lowercase())
            .unwrap_or_else(|| DEFAULT_EXT.to_string());

        let conv_name = args.conv_file.unwrap_or_else(|| DEFAULT_CONV_FILE.to_string());
        let cue_name = args.cue_file.unwrap_or_else(|| DEFAULT_CUE_FILE.to_string());
        let cue_file = work_dir.join(&cue_name);
        let cue_file_frames = work_dir.join(format!("foo_{}", cue_name));

        let split_out_dir = match args.split_out_dir {
            Some(dir) if dir.is_absolute() => dir,
            Some(dir) => work_dir.join(dir),
            None => work_dir.join(DEFAULT_SPLIT_OUT_DIR),
        };

        let sofa = args.sofa.unwrap_or_else(default_sofa_path);

        Ok(Self {
            list_file: work_dir.join(args.list_file.as_deref().unwrap_or(DEFAULT_LIST_FILE)),
            concat_file: work_dir.join(args.concat_file.as_deref().unwrap_or(DEFAULT_CONCAT_FILE)),
            temp_file: work_dir.join(args.temp_file.as_deref().unwrap_or(DEFAULT_TEMP_FILE)),
            conv_file: work_dir.join(&conv_name),
            conv_name,
            cue_file,
            cue_file_frames,
            split_out_dir,
            file_ext,
            ffmpeg: args.ffmpeg.unwrap_or_else(|| PathBuf::from("ffmpeg")),
            splitter: args.splitter.unwrap_or_else(|| PathBuf::from("split2flac")),
            sofa,
            layout: if args.quad {
                Layout::Quad40
            } else {
                Layout::Surround51
            },
            mode: if args.headphone {
                SpatMode::Crossfeed
            } else {
                SpatMode::Sofalizer
            },
            spat_gain: parse_or_default(
                args.spat_gain.as_deref(),
                "spatializer gain",
                DEFAULT_SPAT_GAIN,
            ),
            spat_gain_step: parse_or_default(
                args.spat_gain_step.as_deref(),
                "spatializer gain step",
                DEFAULT_SPAT_GAIN_STEP,
            ),
            volgain: parse_optional(args.volgain.as_deref(), "volume gain"),
            gain_offset: parse_or_default(
                args.gain_offset.as_deref(),
                "gain offset",
                DEFAULT_GAIN_OFFSET,
            ),
            eq_delay: parse_or_default(args.eq_delay.as_deref(), "equalizer delay", DEFAULT_EQ_DELAY),
            bass_boost: !args.flat_bass,
            lfe_regen: args
                .lfe_regen
                .as_deref()
                .map(|raw| parse_or_default(Some(raw), "LFE multiplier", DEFAULT_LFE_REGEN_MULT)),
            normalize: args.normalize,
            stages,
            force: args.force,
            quiet: args.quiet,
            verbose: args.verbose,
            input_dir,
            work_dir,
        })
    }
}

pub(crate) fn default_sofa_path() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_default()
        .join("binauralconv")
        .join("default.sofa")
}

pub(crate) fn work_dir_for(args_dir: Option<&Path>, base: Option<&Path>, input_dir: &Path) -> PathBuf {
    if let Some(dir) = args_dir {
        return dir.to_path_buf();
    }
    let base = base.unwrap_or_else(|| Path::new("."));
    base.join(input_dir.file_name().unwrap_or(input_dir.as_os_str()))
}

fn parse_or_default(raw: Option<&str>, name: &str, default: f64) -> f64 {
    match raw {
        None => default,
        Some(raw) => match raw.trim().parse() {
            Ok(value) => value,
            Err(_) => {
                log::warn!("Invalid value for {} ({:?}), using {}", name, raw, default);
                default
            }
        },
    }
}

fn parse_optional(raw: Option<&str>, name: &str) -> Option<f64> {
    match raw {
        None => None,
        Some(raw) => match raw.trim().parse() {
            Ok(value) => Some(value),
            Err(_) => {
                log::warn!("Invalid value for {}, ignoring", name);
                None
            }
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cli::Args;
    use clap::Parser;

    fn config_from(argv: &[&str]) -> Config {
        let mut full = vec!["binauralconv"];
        full.extend_from_slice(argv);
        let args = Args::try_parse_from(full).unwrap();
        Config::from_args(args, PathBuf::from("/in"), PathBuf::from("/work")).unwrap()
    }

    #[test]
    fn defaults_match_documented_values() {
        let config = config_from(&[]);
        assert_eq!(config.spat_gain, DEFAULT_SPAT_GAIN);
        assert_eq!(config.spat_gain_step, DEFAULT_SPAT_GAIN_STEP);
        assert_eq!(config.gain_offset, DEFAULT_GAIN_OFFSET);
        assert_eq!(config.eq_delay, DEFAULT_EQ_DELAY);
        assert_eq!(config.volgain, None);
        assert_eq!(config.layout, Layout::Surround51);
        assert_eq!(config.mode, SpatMode::Sofalizer);
        assert!(config.bass_boost);
        assert_eq!(config.lfe_regen, None);
        assert_eq!(config.conv_name, DEFAULT_CONV_FILE);
        assert_eq!(config.cue_file_frames, PathBuf::from("/work/foo_cuesheet.cue"));
        assert_eq!(config.split_out_dir, PathBuf::from("/work/tracks"));
    }

    #[test]
    fn invalid_numeric_value_falls_back_to_default() {
        let config = config_from(&["--spat-gain", "loud", "--volgain", "x"]);
        assert_eq!(config.spat_gain, DEFAULT_SPAT_GAIN);
        assert_eq!(config.volgain, None);
    }

    #[test]
    fn valid_numeric_values_are_used() {
        let config = config_from(&["--spat-gain", "12.5", "-g", "-3.5", "--lfe-regen", "0.25"]);
        assert_eq!(config.spat_gain, 12.5);
        assert_eq!(config.volgain, Some(-3.5));
        assert_eq!(config.lfe_regen, Some(0.25));
    }

    #[test]
    fn only_flag_disables_all_other_stages() {
        let config = config_from(&["--cue-only"]);
        assert!(config.stages.cue);
        assert!(!config.stages.concat);
        assert!(!config.stages.voldetect);
        assert!(!config.stages.conv);
        assert!(!config.stages.split);
    }

    #[test]
    fn no_flags_disable_individual_stages() {
        let config = config_from(&["-t", "-s"]);
        assert!(!config.stages.concat);
        assert!(config.stages.cue);
        assert!(config.stages.voldetect);
        assert!(config.stages.conv);
        assert!(!config.stages.split);
    }

    #[test]
    fn ext_flag_is_normalized() {
        let config = config_from(&["-x", ".WV"]);
        assert_eq!(config.file_ext, "wv");
    }

    #[test]
    fn work_dir_defaults_under_base() {
        let dir = work_dir_for(None, Some(Path::new("/base")), Path::new("/music/Album"));
        assert_eq!(dir, PathBuf::from("/base/Album"));
        let explicit = work_dir_for(Some(Path::new("/w")), Some(Path::new("/base")), Path::new("/music/Album"));
        assert_eq!(explicit, PathBuf::from("/w"));
    }
}

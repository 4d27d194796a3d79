use clap::Parser;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(author, version, about)]
pub(crate) struct Args {
    #[arg(value_name = "PATH")]
    pub(crate) path: Option<PathBuf>,

    #[arg(short = 't', long)]
    pub(crate) no_concat: bool,
    #[arg(long, group = "only")]
    pub(crate) concat_only: bool,
    #[arg(short = 'c', long)]
    pub(crate) no_cue: bool,
    #[arg(long, group = "only")]
    pub(crate) cue_only: bool,
    #[arg(long, group = "only")]
    pub(crate) voldetect_only: bool,
    #[arg(short = 'n', long)]
    pub(crate) no_conv: bool,
    #[arg(long, group = "only")]
    pub(crate) conv_only: bool,
    #[arg(short = 's', long)]
    pub(crate) no_split: bool,
    #[arg(long, group = "only")]
    pub(crate) split_only: bool,

    #[arg(short = 'f', long)]
    pub(crate) force: bool,

    #[arg(long, value_name = "DB", allow_negative_numbers = true)]
    pub(crate) spat_gain: Option<String>,
    #[arg(long, value_name = "DB", allow_negative_numbers = true)]
    pub(crate) spat_gain_step: Option<String>,
    #[arg(short = 'g', long, value_name = "DB", allow_negative_numbers = true)]
    pub(crate) volgain: Option<String>,
    #[arg(long, value_name = "DB", allow_negative_numbers = true)]
    pub(crate) gain_offset: Option<String>,
    #[arg(long, value_name = "SECONDS", allow_negative_numbers = true)]
    pub(crate) eq_delay: Option<String>,
    #[arg(long)]
    pub(crate) flat_bass: bool,
    #[arg(long, value_name = "MULT")]
    pub(crate) lfe_regen: Option<String>,
    #[arg(long)]
    pub(crate) normalize: bool,
    #[arg(long)]
    pub(crate) headphone: bool,
    #[arg(short = '4', long)]
    pub(crate) quad: bool,

    #[arg(short = 'x', long, value_name = "EXT")]
    pub(crate) ext: Option<String>,
    #[arg(short = 'd', long, value_name = "DIR")]
    pub(crate) dir: Option<PathBuf>,
    #[arg(long, value_name = "DIR")]
    pub(crate) base_work_dir: Option<PathBuf>,
    #[arg(long, value_name = "DIR")]
    pub(crate) split_out_dir: Option<PathBuf>,
    #[arg(long, value_name = "FILE")]
    pub(crate) concat_file: Option<String>,
    #[arg(long, value_name = "FILE")]
    pub(crate) conv_file: Option<String>,
    #[arg(long, value_name = "FILE")]
    pub(crate) temp_file: Option<String>,
    #[arg(long, value_name = "FILE")]
    pub(crate) list_file: Option<String>,
    #[arg(long, value_name = "FILE")]
    pub(crate) cue_file: Option<String>,
    #[arg(long, value_name = "FILE")]
    pub(crate) log_file: Option<String>,

    #[arg(long, value_name = "PATH")]
    pub(crate) ffmpeg: Option<PathBuf>,
    #[arg(long, value_name = "PATH")]
    pub(crate) splitter: Option<PathBuf>,
    #[arg(long, value_name = "PATH")]
    pub(crate) sofa: Option<PathBuf>,

    #[arg(short = 'l', long)]
    pub(crate) no_log: bool,
    #[arg(short = 'q', long, conflicts_with = "verbose")]
    pub(crate) quiet: bool,
    #[arg(short = 'v', long)]
    pub(crate) verbose: bool,
}

#[cfg(test)]
mod tests {
    use super::Args;
    use clap::Parser;

    #[test]
    fn only_flags_are_mutually_exclusive() {
        assert!(Args::try_parse_from(["binauralconv", "--cue-only", "--conv-only"]).is_err());
        assert!(Args::try_parse_from(["binauralconv", "--cue-only"]).is_ok());
    }

    #[test]
    fn quiet_conflicts_with_verbose() {
        assert!(Args::try_parse_from(["binauralconv", "-q", "-v"]).is_err());
    }

    #[test]
    fn path_defaults_to_none() {
        let args = Args::try_parse_from(["binauralconv"]).unwrap();
        assert!(args.path.is_none());
    }
}

use std::fmt::Write as _;
use std::path::Path;

use crate::config::{Layout, SpatMode};

const SPEAKERS_51: &str = "FL 30 0|FR 330 0|FC 0 0|BL 120 0|BR 240 0|BC 180 0";
const SPEAKERS_40: &str = "FL 45 0|FR 315 0|FC 0 0|BL 135 0|BR 225 0|BC 180 0";

const UPSAMPLE: &str = "aresample=96000:resampler=soxr:precision=28";
const DOWNSAMPLE: &str = "aresample=48000:resampler=soxr:precision=28";

const EQ_BASS_BOOST: &str = "entry(0,0);entry(40,1);entry(55,1);\
entry(75,6);entry(120,2);entry(250,0);entry(400,0);entry(1700,-1);\
entry(2000,-4);entry(4500,-11);entry(7500,-3);entry(9500,-3);\
entry(10000,-4);entry(12000,-4);entry(14000,0);entry(15000,-3);entry(20000,0)";
const EQ_FLAT_BASS: &str = "entry(0,0);entry(40,0);entry(55,0);\
entry(75,0);entry(120,0);entry(250,0);entry(400,0);entry(1700,-1);\
entry(2000,-4);entry(4500,-11);entry(7500,-3);entry(9500,-3);\
entry(10000,-4);entry(12000,-4);entry(14000,0);entry(15000,-3);entry(20000,0)";

const LIMITER: &str = "alimiter=limit=0.994:level=false";

#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) enum Finish {
    Measure { loudness: bool },
    Volume { gain_db: f64, limiter: bool },
}

#[derive(Debug, Clone)]
pub(crate) struct GraphSpec<'a> {
    pub(crate) mode: SpatMode,
    pub(crate) layout: Layout,
    pub(crate) sofa: &'a Path,
    pub(crate) spat_gain: f64,
    pub(crate) eq_delay: f64,
    pub(crate) bass_boost: bool,
    pub(crate) lfe_regen: Option<f64>,
    pub(crate) finish: Finish,
}

pub(crate) fn build(spec: &GraphSpec) -> String {
    let mut graph = String::new();

    match spec.mode {
        SpatMode::Sofalizer => {
            let bc = match spec.lfe_regen {
                Some(mult) => format!("BC<LFE+{}*FL+{}*FR", mult, mult),
                None => "BC=LFE".to_string(),
            };
            let _ = write!(
                graph,
                "pan=hexagonal|FL=FL|FR=FR|FC=FC|{}|BL<SL+BL|BR<SR+BR",
                bc
            );
            graph.push(',');
            graph.push_str(UPSAMPLE);
            let speakers = match spec.layout {
                Layout::Surround51 => SPEAKERS_51,
                Layout::Quad40 => SPEAKERS_40,
            };
            let _ = write!(
                graph,
                ",sofalizer=sofa={}:gain={}:speakers={}",
                spec.sofa.display(),
                spec.spat_gain,
                speakers
            );
        }
        SpatMode::Crossfeed => {
            let pan = match spec.layout {
                Layout::Surround51 => {
                    "pan=stereo|FL<FL+0.707*FC+0.707*BL+0.5*LFE|FR<FR+0.707*FC+0.707*BR+0.5*LFE"
                }
                Layout::Quad40 => "pan=stereo|FL<FL+0.707*BL|FR<FR+0.707*BR",
            };
            graph.push_str(pan);
            graph.push(',');
            graph.push_str(UPSAMPLE);
            graph.push_str(",bs2b=profile=cmoy");
        }
    }

    let entries = if spec.bass_boost {
        EQ_BASS_BOOST
    } else {
        EQ_FLAT_BASS
    };
    let _ = write!(graph, ",firequalizer=delay={}:gain_entry='{}'", spec.eq_delay, entries);
    graph.push(',');
    graph.push_str(DOWNSAMPLE);

    match spec.finish {
        Finish::Volume { gain_db, limiter } => {
            let _ = write!(graph, ",volume={}dB", gain_db);
            if limiter {
                graph.push(',');
                graph.push_str(LIMITER);
            }
        }
        Finish::Measure { loudness } => {
            graph.push_str(",volumedetect");
            if loudness {
                graph.push_str(",ebur128");
            }
        }
    }

    graph
}

pub(crate) fn volume_only(gain_db: f64, limiter: bool) -> String {
    let mut graph = format!("volume={}dB", gain_db);
    if limiter {
        graph.push(',');
        graph.push_str(LIMITER);
    }
    graph
}

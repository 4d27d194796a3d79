use std::ffi::OsString;

use crate::config::{Config, LOUDNESS_TARGET_LUFS};
use crate::graph::{self, Finish, GraphSpec};
use crate::process::{self, LineAction, Outcome};
use crate::{Error, Result};

#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) enum LineEvent {
    Clipped,
    PeakMeasured(f64),
    LoudnessMeasured(f64),
    Other,
}

pub(crate) fn classify(line: &str) -> LineEvent {
    if line.contains("Parsed_sofalizer") && line.contains("samples clipped") {
        return LineEvent::Clipped;
    }
    if line.contains("Parsed_volumedetect") && line.contains("max_volume") {
        if let Some(value) = field_after(line, "max_volume:") {
            return LineEvent::PeakMeasured(value);
        }
    }
    // ebur128 summary block: "    I:         -23.0 LUFS"
    let trimmed = line.trim();
    if let Some(rest) = trimmed.strip_prefix("I:") {
        if let Some(value) = rest.trim().strip_suffix("LUFS") {
            if let Ok(value) = value.trim().parse() {
                return LineEvent::LoudnessMeasured(value);
            }
        }
    }
    LineEvent::Other
}

fn field_after(line: &str, marker: &str) -> Option<f64> {
    let mut tokens = line.split_whitespace();
    while let Some(token) = tokens.next() {
        if token == marker {
            return tokens.next()?.parse().ok();
        }
    }
    None
}

#[derive(Debug, Clone)]
pub(crate) struct GainState {
    pub(crate) spat_gain: f64,
    pub(crate) spat_gain_step: f64,
    pub(crate) detected_gain: Option<f64>,
    pub(crate) loudness_gain: Option<f64>,
    pub(crate) needs_limiter: bool,
}

impl GainState {
    pub(crate) fn new(config: &Config) -> Self {
        Self {
            spat_gain: config.spat_gain,
            spat_gain_step: config.spat_gain_step,
            detected_gain: config.volgain,
            loudness_gain: None,
            needs_limiter: false,
        }
    }

    pub(crate) fn plan(&self, normalize: bool) -> Option<ConversionPlan> {
        let detected = self.detected_gain?;
        if normalize {
            if let Some(loudness) = self.loudness_gain {
                if self.needs_limiter {
                    return Some(ConversionPlan::Limited {
                        peak_gain_db: detected,
                        loudness_gain_db: loudness,
                    });
                }
                return Some(ConversionPlan::Single {
                    gain_db: loudness.min(detected),
                });
            }
        }
        Some(ConversionPlan::Single { gain_db: detected })
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) enum ConversionPlan {
    Single { gain_db: f64 },
    Limited { peak_gain_db: f64, loudness_gain_db: f64 },
}

#[derive(Debug, Default)]
pub(crate) struct ProbeScan {
    pub(crate) clipped: bool,
    pub(crate) peak: Option<f64>,
    pub(crate) loudness: Option<f64>,
}

impl ProbeScan {
    pub(crate) fn observe(&mut self, line: &str) -> LineAction {
        match classify(line) {
            LineEvent::Clipped => {
                self.clipped = true;
                LineAction::Kill
            }
            LineEvent::PeakMeasured(value) => {
                self.peak = Some(value);
                LineAction::Continue
            }
            LineEvent::LoudnessMeasured(value) => {
                self.loudness = Some(value);
                LineAction::Continue
            }
            LineEvent::Other => LineAction::Continue,
        }
    }
}

pub(crate) struct NegotiationParams {
    pub(crate) gain_offset: f64,
    pub(crate) target_lufs: f64,
    pub(crate) normalize: bool,
}

pub(crate) fn negotiate(config: &Config, state: &mut GainState) -> Result<()> {
    let params = NegotiationParams {
        gain_offset: config.gain_offset,
        target_lufs: LOUDNESS_TARGET_LUFS,
        normalize: config.normalize,
    };
    negotiate_with(&params, state, |spat_gain, scan| {
        let graph = graph::build(&GraphSpec {
            mode: config.mode,
            layout: config.layout,
            sofa: &config.sofa,
            spat_gain,
            eq_delay: config.eq_delay,
            bass_boost: config.bass_boost,
            lfe_regen: config.lfe_regen,
            finish: Finish::Measure {
                loudness: config.normalize,
            },
        });
        let args: Vec<OsString> = vec![
            OsString::from("-i"),
            config.concat_file.clone().into(),
            OsString::from("-af"),
            OsString::from(graph),
            OsString::from("-f"),
            OsString::from("null"),
            OsString::from("/dev/null"),
        ];
        process::run(
            &config.ffmpeg,
            &args,
            "detecting safe gain",
            config.verbose,
            &[0],
            |line| scan.observe(line),
        )
    })
}

pub(crate) fn negotiate_with<R>(
    params: &NegotiationParams,
    state: &mut GainState,
    mut run_probe: R,
) -> Result<()>
where
    R: FnMut(f64, &mut ProbeScan) -> Result<Outcome>,
{
    while state.detected_gain.is_none() && state.spat_gain > 0.0 {
        let mut scan = ProbeScan::default();
        run_probe(state.spat_gain, &mut scan)?;

        if scan.clipped {
            state.spat_gain -= state.spat_gain_step;
            log::info!(
                "Spatializer gain too high, trying {} dB...",
                state.spat_gain
            );
            continue;
        }

        match scan.peak {
            Some(peak) => state.detected_gain = Some(-peak + params.gain_offset),
            // a clean probe with no reading cannot improve on retry
            None => break,
        }
        if let Some(measured) = scan.loudness {
            state.loudness_gain = Some(params.target_lufs - measured);
        }
    }

    let Some(detected) = state.detected_gain else {
        return Err(Error::Convergence);
    };
    if params.normalize {
        if let Some(loudness) = state.loudness_gain {
            if loudness > detected {
                state.needs_limiter = true;
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    const CLIP_LINE: &str = "[Parsed_sofalizer_0 @ 0x5555] 128 samples clipped";
    const PEAK_LINE: &str = "[Parsed_volumedetect_0 @ 0x5555] max_volume: -6.0 dB";
    const LOUDNESS_LINE: &str = "    I:         -23.0 LUFS";

    fn params(normalize: bool) -> NegotiationParams {
        NegotiationParams {
            gain_offset: -0.05,
            target_lufs: -18.0,
            normalize,
        }
    }

    fn start_state(spat_gain: f64, step: f64) -> GainState {
        GainState {
            spat_gain,
            spat_gain_step: step,
            detected_gain: None,
            loudness_gain: None,
            needs_limiter: false,
        }
    }

    #[test]
    fn classify_recognizes_all_markers() {
        assert_eq!(classify(CLIP_LINE), LineEvent::Clipped);
        assert_eq!(classify(PEAK_LINE), LineEvent::PeakMeasured(-6.0));
        assert_eq!(classify(LOUDNESS_LINE), LineEvent::LoudnessMeasured(-23.0));
        assert_eq!(
            classify("size=  123kB time=00:00:05.00 bitrate= 200kbits/s"),
            LineEvent::Other
        );
    }

    #[test]
    fn classify_ignores_ebur128_live_updates() {
        let live = "[Parsed_ebur128_0 @ 0x5555] t: 2.6 TARGET:-23 LUFS M: -20.0 I: -19.1 LUFS";
        assert_eq!(classify(live), LineEvent::Other);
    }

    #[test]
    fn clip_retries_decrement_by_exactly_the_step() {
        let mut gains = Vec::new();
        let mut state = start_state(20.5, 1.0);
        negotiate_with(&params(false), &mut state, |gain, scan| {
            gains.push(gain);
            if gains.len() <= 2 {
                scan.observe(CLIP_LINE);
                Ok(Outcome::Killed)
            } else {
                scan.observe(PEAK_LINE);
                Ok(Outcome::Completed)
            }
        })
        .unwrap();

        assert_eq!(gains, vec![20.5, 19.5, 18.5]);
        assert_eq!(state.detected_gain, Some(5.95));
        assert!(!state.needs_limiter);
    }

    #[test]
    fn exhausting_the_gain_floor_fails_with_convergence() {
        let mut attempts = 0;
        let mut state = start_state(3.0, 1.0);
        let err = negotiate_with(&params(false), &mut state, |_, scan| {
            attempts += 1;
            scan.observe(CLIP_LINE);
            Ok(Outcome::Killed)
        })
        .unwrap_err();

        assert!(matches!(err, Error::Convergence));
        assert_eq!(attempts, 3);
        assert!(state.spat_gain <= 0.0);
        assert_eq!(state.detected_gain, None);
    }

    #[test]
    fn reading_free_probe_fails_instead_of_looping() {
        let mut attempts = 0;
        let mut state = start_state(20.5, 1.0);
        let err = negotiate_with(&params(false), &mut state, |_, _| {
            attempts += 1;
            Ok(Outcome::Completed)
        })
        .unwrap_err();
        assert!(matches!(err, Error::Convergence));
        assert_eq!(attempts, 1);
    }

    #[test]
    fn normalization_below_peak_gain_needs_no_limiter() {
        let mut state = start_state(20.5, 1.0);
        negotiate_with(&params(true), &mut state, |_, scan| {
            scan.observe(PEAK_LINE);
            scan.observe("    I:         -10.0 LUFS");
            Ok(Outcome::Completed)
        })
        .unwrap();

        // peak-safe 5.95, loudness -18 - (-10) = -8: quieter, no limiter
        assert_eq!(state.detected_gain, Some(5.95));
        assert_eq!(state.loudness_gain, Some(-8.0));
        assert!(!state.needs_limiter);
        assert_eq!(
            state.plan(true),
            Some(ConversionPlan::Single { gain_db: -8.0 })
        );
    }

    #[test]
    fn normalization_above_peak_gain_flags_the_limiter() {
        let mut state = start_state(20.5, 1.0);
        negotiate_with(&params(true), &mut state, |_, scan| {
            scan.observe(PEAK_LINE);
            scan.observe(LOUDNESS_LINE);
            Ok(Outcome::Completed)
        })
        .unwrap();

        // peak-safe 5.95, loudness -18 - (-23) = 5: no limiter needed
        assert_eq!(state.loudness_gain, Some(5.0));
        assert!(!state.needs_limiter);

        let mut state = start_state(20.5, 1.0);
        negotiate_with(&params(true), &mut state, |_, scan| {
            scan.observe(PEAK_LINE);
            scan.observe("    I:         -30.0 LUFS");
            Ok(Outcome::Completed)
        })
        .unwrap();

        // loudness -18 - (-30) = 12 exceeds peak-safe 5.95
        assert!(state.needs_limiter);
        assert_eq!(
            state.plan(true),
            Some(ConversionPlan::Limited {
                peak_gain_db: 5.95,
                loudness_gain_db: 12.0,
            })
        );
    }

    #[test]
    fn explicit_gain_skips_normalization_entirely() {
        let state = GainState {
            spat_gain: 20.5,
            spat_gain_step: 1.0,
            detected_gain: Some(-3.5),
            loudness_gain: None,
            needs_limiter: false,
        };
        assert_eq!(
            state.plan(true),
            Some(ConversionPlan::Single { gain_db: -3.5 })
        );
        assert_eq!(
            state.plan(false),
            Some(ConversionPlan::Single { gain_db: -3.5 })
        );
    }
}

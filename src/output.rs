use owo_colors::OwoColorize;

use crate::config::{Config, LOUDNESS_TARGET_LUFS, Layout, SpatMode};

pub(crate) fn print_plan(config: &Config) {
    println!("{}", "Plan".bold());
    println!("  {} {}", "Input:".cyan(), config.input_dir.display());
    println!("  {} {}", "Workdir:".cyan(), config.work_dir.display());
    println!(
        "  {} {}",
        "Split into:".cyan(),
        config.split_out_dir.display()
    );

    let mode = match config.mode {
        SpatMode::Sofalizer => format!("sofalizer ({})", config.sofa.display()),
        SpatMode::Crossfeed => "headphone crossfeed".to_string(),
    };
    println!("  {} {}", "Mode:".cyan(), mode.green());

    let layout = match config.layout {
        Layout::Surround51 => "5.1",
        Layout::Quad40 => "4.0",
    };
    println!("  {} {}", "Layout:".cyan(), layout);

    let stages = enabled_stages(config);
    if stages.is_empty() {
        println!("  {} {}", "Stages:".cyan(), "(none)".dimmed());
    } else {
        println!("  {} {}", "Stages:".cyan(), stages.join(", "));
    }

    match config.volgain {
        Some(gain) => println!("  {} {} dB", "Gain:".cyan(), gain.yellow()),
        None => println!("  {} {}", "Gain:".cyan(), "detect".yellow()),
    }
    if config.normalize {
        println!(
            "  {} target {} LUFS",
            "Normalize:".cyan(),
            LOUDNESS_TARGET_LUFS
        );
    }
}

fn enabled_stages(config: &Config) -> Vec<&'static str> {
    let stages = &config.stages;
    let mut enabled = Vec::new();
    if stages.concat {
        enabled.push("concat");
    }
    if stages.cue {
        enabled.push("cue");
    }
    if stages.voldetect && config.volgain.is_none() {
        enabled.push("voldetect");
    }
    if stages.conv {
        enabled.push("convert");
    }
    if stages.split {
        enabled.push("split");
    }
    enabled
}

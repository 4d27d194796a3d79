use clap::Parser;
use std::fs;
use std::path::{Path, PathBuf};

use crate::cli::Args;
use crate::config::{self, Config, SpatMode};
use crate::{Error, Result, logging, output, pipeline};

pub fn run() -> Result<()> {
    let args = Args::parse();

    let input_dir = resolve_input_dir(args.path.as_deref())?;
    let work_dir = config::work_dir_for(
        args.dir.as_deref(),
        args.base_work_dir.as_deref(),
        &input_dir,
    );
    fs::create_dir_all(&work_dir).map_err(|err| {
        Error::io(
            format!("could not create working directory {}", work_dir.display()),
            err,
        )
    })?;
    let work_dir = fs::canonicalize(&work_dir).map_err(|err| {
        Error::io(
            format!("could not resolve working directory {}", work_dir.display()),
            err,
        )
    })?;

    let log_file = if args.no_log {
        None
    } else {
        Some(work_dir.join(args.log_file.as_deref().unwrap_or(config::DEFAULT_LOG_FILE)))
    };
    logging::init(log_file.as_deref(), args.quiet, args.verbose)?;

    let config = Config::from_args(args, input_dir, work_dir)?;
    check_environment(&config)?;

    if !config.quiet {
        output::print_plan(&config);
    }
    log::info!("Path: {}", config.input_dir.display());
    log::info!("Wdir: {}", config.work_dir.display());

    match pipeline::run(&config) {
        Ok(()) => Ok(()),
        Err(err) => {
            log::error!("{}", err);
            Err(err)
        }
    }
}

fn resolve_input_dir(path: Option<&Path>) -> Result<PathBuf> {
    let path = path.unwrap_or_else(|| Path::new("."));
    let resolved = fs::canonicalize(path)
        .map_err(|_| Error::Input(format!("directory not found: {}", path.display())))?;
    if !resolved.is_dir() {
        return Err(Error::Input(format!(
            "not a directory: {}",
            resolved.display()
        )));
    }
    Ok(resolved)
}

fn check_environment(config: &Config) -> Result<()> {
    let uses_ffmpeg = config.stages.concat || config.stages.voldetect || config.stages.conv;
    if uses_ffmpeg {
        check_tool(&config.ffmpeg)?;
    }
    if config.stages.split {
        check_tool(&config.splitter)?;
    }

    let spatializes = config.stages.voldetect || config.stages.conv;
    if config.mode == SpatMode::Sofalizer && spatializes && !config.sofa.is_file() {
        return Err(Error::Environment(format!(
            "SOFA file not found: {} (pass --sofa or use --headphone)",
            config.sofa.display()
        )));
    }

    Ok(())
}

// A bare tool name is resolved through PATH at spawn time; an explicit
// path must already exist.
fn check_tool(path: &Path) -> Result<()> {
    if path.components().count() > 1 && !path.is_file() {
        return Err(Error::Environment(format!(
            "external tool not found: {}",
            path.display()
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::{check_tool, resolve_input_dir};
    use crate::Error;
    use std::path::Path;

    #[test]
    fn missing_input_directory_is_an_input_error() {
        let err = resolve_input_dir(Some(Path::new("/nonexistent/album"))).unwrap_err();
        assert!(matches!(err, Error::Input(_)));
    }

    #[test]
    fn bare_tool_names_pass_the_startup_check() {
        assert!(check_tool(Path::new("ffmpeg")).is_ok());
    }

    #[test]
    fn explicit_tool_paths_must_exist() {
        assert!(matches!(
            check_tool(Path::new("/nonexistent/bin/ffmpeg")).unwrap_err(),
            Error::Environment(_)
        ));
        assert!(check_tool(Path::new("/bin/sh")).is_ok());
    }
}

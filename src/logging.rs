use chrono::Local;
use log::{Level, LevelFilter, Log, Metadata, Record};
use std::fs::{File, OpenOptions};
use std::io::Write;
use std::path::Path;
use std::sync::Mutex;

use crate::{Error, Result};

struct Sink {
    file: Option<Mutex<File>>,
}

impl Log for Sink {
    fn enabled(&self, _metadata: &Metadata) -> bool {
        true
    }

    fn log(&self, record: &Record) {
        // Subprocess output is streamed at debug level and mirrored raw;
        // everything else gets a timestamp.
        let line = match record.level() {
            Level::Debug | Level::Trace => format!("{}", record.args()),
            _ => format!(
                "[{}] {}",
                Local::now().format("%Y-%m-%d %H:%M:%S"),
                record.args()
            ),
        };
        println!("{}", line);
        if let Some(file) = &self.file {
            if let Ok(mut file) = file.lock() {
                let _ = writeln!(file, "{}", line);
            }
        }
    }

    fn flush(&self) {
        let _ = std::io::stdout().flush();
        if let Some(file) = &self.file {
            if let Ok(mut file) = file.lock() {
                let _ = file.flush();
            }
        }
    }
}

pub(crate) fn init(log_file: Option<&Path>, quiet: bool, verbose: bool) -> Result<()> {
    let file = match log_file {
        Some(path) => {
            let file = OpenOptions::new()
                .create(true)
                .append(true)
                .open(path)
                .map_err(|err| {
                    Error::io(format!("could not open log file {}", path.display()), err)
                })?;
            Some(Mutex::new(file))
        }
        None => None,
    };

    log::set_boxed_logger(Box::new(Sink { file }))
        .map_err(|err| Error::Environment(format!("could not install logger: {}", err)))?;
    log::set_max_level(if quiet {
        LevelFilter::Warn
    } else if verbose {
        LevelFilter::Debug
    } else {
        LevelFilter::Info
    });
    Ok(())
}

use std::io;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("{0}")]
    Environment(String),
    #[error("{0}")]
    Input(String),
    #[error("{context}: {source}")]
    Io {
        context: String,
        #[source]
        source: io::Error,
    },
    #[error("{}", process_message(.command, .code, .output))]
    Process {
        command: String,
        code: Option<i32>,
        output: Option<String>,
    },
    #[error("could not find a safe conversion gain")]
    Convergence,
}

impl Error {
    pub(crate) fn io(context: impl Into<String>, source: io::Error) -> Self {
        Error::Io {
            context: context.into(),
            source,
        }
    }
}

fn process_message(command: &str, code: &Option<i32>, output: &Option<String>) -> String {
    let mut message = match code {
        Some(code) => format!("{} ended unexpectedly (return code {})", command, code),
        None => format!("{} was terminated by a signal", command),
    };
    if let Some(output) = output {
        message.push_str(":\n");
        message.push_str(output);
    }
    message
}

use memory_reader::Pointer;
use thiserror::Error;

#[derive(Error)]
pub enum Error {
    #[error("memory_reader::Error{{ {err} }}")]
    MemoryReader {
        #[from]
        err: memory_reader::Error,
    },

    #[error("std::fmt::Error{{ {err} }}")]
    FmtError {
        #[from]
        err: std::fmt::Error,
    },

    #[error("std::io::Error {0}")]
    IOError(#[from] std::io::Error),

    #[error("serde_json::Error {0}")]
    SerdeError(#[from] serde_json::Error),

    #[error(
        "Host debugger provides neither a pretty-printer registry \
         nor a printer list to append to"
    )]
    RegistryUnavailable,

    #[error("Value at {location} is declared as {expected}, but its vtable belongs to {found}")]
    DynamicTypeMismatch {
        location: Pointer,
        expected: String,
        found: String,
    },

    #[error("Layout of {type_name} at {location} is inconsistent: {reason}")]
    LayoutMismatch {
        type_name: String,
        location: Pointer,
        reason: String,
    },

    #[error("Traversal of {0} stopped after reaching the limit of {1} steps")]
    TraversalLimitReached(Pointer, usize),

    #[error("String at {location} has length {length}, exceeding the limit of {limit}")]
    StringTooLong {
        location: Pointer,
        length: usize,
        limit: usize,
    },

    #[error("Invalid date/time {year:04}-{month:02}-{day:02} {hour:02}:{minute:02}:{sec:02}")]
    InvalidDateTime {
        year: i16,
        month: u8,
        day: u8,
        hour: u8,
        minute: u8,
        sec: u8,
    },

    #[error("No symbol \"{0}\" in current context.")]
    NoSuchVariable(String),

    #[error("Cannot parse expression '{0}'")]
    InvalidExpression(String),

    #[error("Invalid value '{value}' for environment variable {name}")]
    InvalidEnvironmentValue { name: &'static str, value: String },
}

impl std::fmt::Debug for Error {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self)
    }
}

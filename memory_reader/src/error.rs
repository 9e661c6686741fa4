use thiserror::Error;

use crate::Pointer;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Error)]
pub enum Error {
    #[error("/proc/{0}/maps not found")]
    MemoryMapNotFound(u32),

    #[error("Process {0} does not exist")]
    ProcessNotFound(u32),

    #[error("Path not convertible to UTF-8")]
    InvalidUTF8InPath,

    #[error(
        "No permissions to read memory.  \
         Consider temporarily disabling ptrace_scope protections \
         with 'echo 0 | sudo tee /proc/sys/kernel/yama/ptrace_scope'"
    )]
    MemoryReadInsufficientPermission,

    #[error("Cannot access memory at address 0x0")]
    MemoryReadNullPointer,

    #[error("Cannot access memory at address {0}")]
    MemoryReadBadAddress(Pointer, usize),

    #[error("Pointer {0} plus offset {1} overflows the address space")]
    PointerOverflow(Pointer, usize),

    #[error(
        "Expected {expected} bytes while unpacking at {start}, \
         but only {provided} were read"
    )]
    InsufficientBytes {
        start: Pointer,
        expected: usize,
        provided: usize,
    },

    #[error("Error {err} reading process memory")]
    MemoryReadOther {
        #[source]
        err: nix::errno::Errno,
    },

    #[error(transparent)]
    Io {
        #[from]
        err: std::io::Error,
    },

    #[error(transparent)]
    InvalidElfFormat {
        #[from]
        err: elf::ParseError,
    },
}

impl std::fmt::Debug for Error {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self)
    }
}

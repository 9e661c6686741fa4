mod error;
pub use error::Error;

mod inspect;
pub use inspect::*;

mod process_inspector;
pub use process_inspector::ProcessInspector;

mod memory_image;
pub use memory_image::MemoryImage;

mod layout;
pub use layout::*;

mod config;
pub use config::{env_var_flag, PrinterConfig};

pub mod type_name;

pub mod libstdcxx;

mod formatter;
pub use formatter::*;

mod printer;
pub use printer::*;

mod registry;
pub use registry::*;

mod render;
pub use render::RenderStyle;

mod session;
pub use session::DebuggerSession;

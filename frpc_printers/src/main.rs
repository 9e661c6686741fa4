use std::path::PathBuf;

use frpc_printers::{
    register_fastrpc_printers, DebuggerSession, Error, PrinterConfig,
    ProcessInspector, RenderStyle, ValueRef,
};
use structopt::StructOpt;

fn parse_address(arg: &str) -> Result<usize, std::num::ParseIntError> {
    match arg.strip_prefix("0x") {
        Some(hex) => usize::from_str_radix(hex, 16),
        None => arg.parse(),
    }
}

/// Print a FastRPC value from the memory of a running process.
#[derive(StructOpt)]
struct Arguments {
    /// Process to inspect.
    #[structopt(long = "--pid")]
    pid: u32,

    /// Address of the value, decimal or 0x-prefixed hexadecimal.
    #[structopt(long = "--address", parse(try_from_str = parse_address))]
    address: usize,

    /// Declared type of the value.  The default resolves the type
    /// from the value's vtable.
    #[structopt(long = "--type", default_value = "FRPC::Value_t")]
    type_name: String,

    /// Only apply the printers to values from this object file.
    #[structopt(long = "--objfile")]
    objfile: Option<String>,

    /// Print without pretty printers.
    #[structopt(long = "--raw")]
    raw: bool,

    /// Print one element per line.
    #[structopt(long = "--tree")]
    tree: bool,

    /// Config file to use instead of the default location.
    #[structopt(long = "--config", parse(from_os_str))]
    config: Option<PathBuf>,
}

fn main() -> Result<(), Error> {
    env_logger::init();
    let args = Arguments::from_args();

    let config = match &args.config {
        Some(path) => PrinterConfig::load(path)?.with_env_overrides()?,
        None => PrinterConfig::load_default()?,
    };

    let inspector = ProcessInspector::attach(args.pid)?;

    let mut session = DebuggerSession::new(config);
    register_fastrpc_printers(&mut session, args.objfile.as_deref())?;
    session.set_pretty_printing(!args.raw);
    if args.tree {
        session.set_style(RenderStyle::Tree);
    }

    session.define_variable("value", ValueRef::new(args.address, args.type_name));
    println!("{}", session.print(&inspector, "value")?);

    Ok(())
}

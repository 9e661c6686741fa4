use std::rc::Rc;

use crate::{build_fastrpc_printer, Error, Printer};

/// What the host debugger offers for installing printers.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct HostCapabilities {
    /// A registration hook that takes a printer and an optional
    /// object file.
    pub printer_registry: bool,

    /// Plain lists of printers, one global and one per object file,
    /// that printers can be appended to.  Older hosts only have these.
    pub legacy_printer_lists: bool,
}

impl Default for HostCapabilities {
    fn default() -> Self {
        Self {
            printer_registry: true,
            legacy_printer_lists: true,
        }
    }
}

/// The printer-installation side of the host debugger's extension
/// interface.
pub trait PrinterRegistry {
    fn capabilities(&self) -> HostCapabilities;

    /// Install `printer` through the registration hook, for values
    /// from `objfile`, or for all values if `objfile` is `None`.
    fn register_pretty_printer(
        &mut self,
        objfile: Option<&str>,
        printer: Rc<Printer>,
    ) -> Result<(), Error>;

    /// The host's list of printers for `objfile`, or its global list if
    /// `objfile` is `None`.
    fn legacy_printers(
        &mut self,
        objfile: Option<&str>,
    ) -> Result<&mut Vec<Rc<Printer>>, Error>;
}

/// Install the FastRPC printers, either for every object file
/// (`objfile` is `None`) or only for values belonging to `objfile`.
///
/// Calling this twice installs the printers twice.  The host does not
/// deduplicate, and neither does this function.
pub fn register_fastrpc_printers(
    registry: &mut dyn PrinterRegistry,
    objfile: Option<&str>,
) -> Result<(), Error> {
    let printer = Rc::new(build_fastrpc_printer());
    let capabilities = registry.capabilities();

    if capabilities.printer_registry {
        log::debug!(
            "Registering '{}' printers for {}",
            printer.name(),
            objfile.unwrap_or("all object files")
        );
        registry.register_pretty_printer(objfile, printer)
    } else if capabilities.legacy_printer_lists {
        log::debug!(
            "Appending '{}' printers to the printer list of {}",
            printer.name(),
            objfile.unwrap_or("all object files")
        );
        registry.legacy_printers(objfile)?.push(printer);
        Ok(())
    } else {
        Err(Error::RegistryUnavailable)
    }
}

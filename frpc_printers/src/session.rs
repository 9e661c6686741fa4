use std::collections::HashMap;
use std::path::Path;
use std::rc::Rc;

use memory_reader::Pointer;

use crate::render::Renderer;
use crate::{
    Error, Formatter, HostCapabilities, Inspect, Printer, PrinterConfig,
    PrinterRegistry, RenderStyle, ValueRef,
};

/// A minimal debugger host: printer chains, a pretty-printing toggle,
/// named values and a `print` command.
pub struct DebuggerSession {
    config: PrinterConfig,
    capabilities: HostCapabilities,
    global_printers: Vec<Rc<Printer>>,
    objfile_printers: Vec<(String, Vec<Rc<Printer>>)>,
    pretty_printing: bool,
    style: RenderStyle,
    variables: HashMap<String, ValueRef>,
    num_printed: usize,
}

/// Whether a value from `objfile` is covered by printers registered
/// for `filter`.  The filter may name the object file by full path or
/// by file name.
fn objfile_matches(filter: &str, objfile: &str) -> bool {
    filter == objfile
        || Path::new(objfile)
            .file_name()
            .and_then(|name| name.to_str())
            .map(|name| name == filter)
            .unwrap_or(false)
}

impl DebuggerSession {
    pub fn new(config: PrinterConfig) -> Self {
        Self {
            config,
            capabilities: HostCapabilities::default(),
            global_printers: Vec::new(),
            objfile_printers: Vec::new(),
            pretty_printing: true,
            style: RenderStyle::default(),
            variables: HashMap::new(),
            num_printed: 0,
        }
    }

    pub fn with_capabilities(mut self, capabilities: HostCapabilities) -> Self {
        self.capabilities = capabilities;
        self
    }

    pub fn config(&self) -> &PrinterConfig {
        &self.config
    }

    pub fn pretty_printing(&self) -> bool {
        self.pretty_printing
    }

    /// The host's "pretty printing on/off" setting.  When off, values
    /// are shown flat, without consulting any printer.
    pub fn set_pretty_printing(&mut self, enabled: bool) {
        self.pretty_printing = enabled;
    }

    pub fn style(&self) -> RenderStyle {
        self.style
    }

    pub fn set_style(&mut self, style: RenderStyle) {
        self.style = style;
    }

    pub fn define_variable(&mut self, name: impl Into<String>, value: ValueRef) {
        self.variables.insert(name.into(), value);
    }

    pub fn global_printers(&self) -> &[Rc<Printer>] {
        &self.global_printers
    }

    pub fn objfile_printers(&self, objfile: &str) -> &[Rc<Printer>] {
        self.objfile_printers
            .iter()
            .find(|(name, _)| name == objfile)
            .map(|(_, printers)| printers.as_slice())
            .unwrap_or(&[])
    }

    fn printer_list(&mut self, objfile: Option<&str>) -> &mut Vec<Rc<Printer>> {
        let Some(objfile) = objfile else {
            return &mut self.global_printers;
        };
        let index = match self
            .objfile_printers
            .iter()
            .position(|(name, _)| name == objfile)
        {
            Some(index) => index,
            None => {
                self.objfile_printers.push((objfile.to_string(), Vec::new()));
                self.objfile_printers.len() - 1
            }
        };
        &mut self.objfile_printers[index].1
    }

    /// Printers to consult for a value, in priority order: those of the
    /// object file containing the value, then the global ones.
    fn candidate_printers<'s>(
        &'s self,
        objfile: Option<&'s str>,
    ) -> impl Iterator<Item = &'s Rc<Printer>> + 's {
        self.objfile_printers
            .iter()
            .filter(move |(filter, _)| {
                objfile
                    .map(|objfile| objfile_matches(filter, objfile))
                    .unwrap_or(false)
            })
            .flat_map(|(_, printers)| printers.iter())
            .chain(self.global_printers.iter())
    }

    /// Find the first installed printer that accepts `value`.
    pub fn find_formatter<'a>(
        &'a self,
        value: &ValueRef,
        inspect: &'a dyn Inspect,
    ) -> Option<Formatter<'a>> {
        if !self.pretty_printing || !self.config.enabled {
            return None;
        }

        let objfile = inspect.objfile_of(value.location);
        let formatter = self
            .candidate_printers(objfile.as_deref())
            .find_map(|printer| printer.formatter_for(value, inspect, &self.config));
        formatter
    }

    /// Resolve a print expression: a variable name, or an explicit
    /// dereference such as `*(FRPC::Struct_t *) 0x7ffd1234`.
    pub fn evaluate(&self, expr: &str) -> Result<ValueRef, Error> {
        let expr = expr.trim();
        let invalid = || Error::InvalidExpression(expr.to_string());

        if let Some(cast) = expr.strip_prefix("*(") {
            let (type_name, address) = cast.split_once(')').ok_or_else(invalid)?;
            let type_name = type_name
                .trim()
                .strip_suffix('*')
                .ok_or_else(invalid)?
                .trim();
            let address = address.trim();
            let address = match address.strip_prefix("0x") {
                Some(hex) => usize::from_str_radix(hex, 16),
                None => address.parse(),
            }
            .map_err(|_| invalid())?;
            if type_name.is_empty() {
                return Err(invalid());
            }
            return Ok(ValueRef::new(Pointer::new(address), type_name));
        }

        let is_identifier = !expr.is_empty()
            && expr
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '_');
        if !is_identifier {
            return Err(invalid());
        }

        self.variables
            .get(expr)
            .cloned()
            .ok_or_else(|| Error::NoSuchVariable(expr.to_string()))
    }

    /// Render a value without recording it in the value history.
    pub fn format_value(&self, inspect: &dyn Inspect, value: &ValueRef) -> String {
        Renderer::new(self, inspect).render(value)
    }

    /// The `print` command: evaluate, render, and number the result
    /// as the next history entry.
    pub fn print(&mut self, inspect: &dyn Inspect, expr: &str) -> Result<String, Error> {
        let value = self.evaluate(expr)?;
        let rendered = self.format_value(inspect, &value);
        self.num_printed += 1;
        Ok(format!("${} = {rendered}", self.num_printed))
    }
}

impl PrinterRegistry for DebuggerSession {
    fn capabilities(&self) -> HostCapabilities {
        self.capabilities
    }

    /// Newly registered printers take priority over existing ones.
    fn register_pretty_printer(
        &mut self,
        objfile: Option<&str>,
        printer: Rc<Printer>,
    ) -> Result<(), Error> {
        if !self.capabilities.printer_registry {
            return Err(Error::RegistryUnavailable);
        }

        let list = self.printer_list(objfile);
        if list.iter().any(|existing| existing.name() == printer.name()) {
            log::warn!(
                "Pretty-printer '{}' is already registered for {}; \
                 both will remain installed",
                printer.name(),
                objfile.unwrap_or("all object files")
            );
        }
        list.insert(0, printer);
        Ok(())
    }

    fn legacy_printers(
        &mut self,
        objfile: Option<&str>,
    ) -> Result<&mut Vec<Rc<Printer>>, Error> {
        if !self.capabilities.legacy_printer_lists {
            return Err(Error::RegistryUnavailable);
        }
        Ok(self.printer_list(objfile))
    }
}

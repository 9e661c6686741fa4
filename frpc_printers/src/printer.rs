use std::cell::Cell;
use std::collections::HashMap;

use crate::formatter::VALUE_BASE_TYPE;
use crate::type_name::{basic_type, dynamic_type, strip_template};
use crate::{
    Formatter, FormatterKind, Inspect, PrimitiveKind, PrinterConfig, ValueRef,
};

/// One entry of a `Printer`: a type name and the formatter used for
/// values of that type.
#[derive(Debug)]
pub struct SubPrinter {
    name: String,
    kind: FormatterKind,
    enabled: Cell<bool>,
}

impl SubPrinter {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn kind(&self) -> FormatterKind {
        self.kind
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled.get()
    }
}

/// A named collection of subprinters, installed into the host as a
/// single lookup function.
///
/// Subprinters are kept in registration order.  Enabling and disabling
/// happens through shared references, since the host holds installed
/// printers behind `Rc`.
#[derive(Debug)]
pub struct Printer {
    name: String,
    subprinters: Vec<SubPrinter>,
    lookup: HashMap<String, usize>,
    enabled: Cell<bool>,
}

impl Printer {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            subprinters: Vec::new(),
            lookup: HashMap::new(),
            enabled: Cell::new(true),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Add a subprinter.  Adding a name that is already present keeps
    /// the earlier entry in `subprinters`, but the lookup table then
    /// refers to the newer one.
    pub fn add(&mut self, name: impl Into<String>, kind: FormatterKind) -> &mut Self {
        let name = name.into();
        self.lookup.insert(name.clone(), self.subprinters.len());
        self.subprinters.push(SubPrinter {
            name,
            kind,
            enabled: Cell::new(true),
        });
        self
    }

    pub fn subprinters(&self) -> &[SubPrinter] {
        &self.subprinters
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled.get()
    }

    pub fn set_enabled(&self, enabled: bool) {
        self.enabled.set(enabled);
    }

    /// Enable or disable one subprinter.  Returns false if no
    /// subprinter has that name.
    pub fn set_subprinter_enabled(&self, name: &str, enabled: bool) -> bool {
        self.lookup
            .get(name)
            .map(|&index| self.subprinters[index].enabled.set(enabled))
            .is_some()
    }

    fn find(&self, type_name: &str) -> Option<&SubPrinter> {
        self.lookup
            .get(type_name)
            .or_else(|| self.lookup.get(strip_template(type_name)))
            .map(|&index| &self.subprinters[index])
    }

    /// The lookup function the host calls for every value it prints.
    /// Returns the matching formatter kind and the type name it
    /// matched, or `None`.  Never fails: anything that goes wrong while
    /// resolving the type counts as no match.
    pub fn lookup(
        &self,
        value: &ValueRef,
        inspect: &dyn Inspect,
        config: &PrinterConfig,
    ) -> Option<(FormatterKind, String)> {
        if !self.is_enabled() {
            return None;
        }

        let mut type_name = basic_type(&value.type_name, inspect)?;

        if type_name == VALUE_BASE_TYPE {
            match dynamic_type(inspect, value.location, &config.layout.frpc) {
                Ok(Some(dynamic)) => type_name = dynamic,
                Ok(None) => {
                    log::debug!("No vtable symbol identifies {value}");
                    return None;
                }
                Err(err) => {
                    log::debug!("Could not resolve dynamic type of {value}: {err}");
                    return None;
                }
            }
        }

        self.find(&type_name)
            .filter(|subprinter| subprinter.is_enabled())
            .map(|subprinter| (subprinter.kind, subprinter.name.clone()))
    }

    /// `lookup`, followed by construction of the formatter.
    pub fn formatter_for<'a>(
        &self,
        value: &ValueRef,
        inspect: &'a dyn Inspect,
        config: &'a PrinterConfig,
    ) -> Option<Formatter<'a>> {
        self.lookup(value, inspect, config).map(|(kind, type_name)| {
            Formatter::new(kind, type_name.clone(), value.cast(type_name), inspect, config)
        })
    }
}

/// The FastRPC printer collection.
pub fn build_fastrpc_printer() -> Printer {
    let mut printer = Printer::new("fastrpc");
    printer
        .add("FRPC::Int_t", FormatterKind::Primitive(PrimitiveKind::Int))
        .add("FRPC::String_t", FormatterKind::Primitive(PrimitiveKind::String))
        .add("FRPC::Bool_t", FormatterKind::Primitive(PrimitiveKind::Bool))
        .add("FRPC::Double_t", FormatterKind::Primitive(PrimitiveKind::Double))
        .add("FRPC::Binary_t", FormatterKind::Primitive(PrimitiveKind::Binary))
        .add("FRPC::DateTime_t", FormatterKind::DateTime)
        .add("FRPC::Null_t", FormatterKind::Null)
        .add("FRPC::Struct_t", FormatterKind::Struct)
        .add("FRPC::Array_t", FormatterKind::Array)
        .add("FRPC::Pool_t", FormatterKind::Pool);
    printer
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::MemoryImage;

    fn lookup(printer: &Printer, type_name: &str) -> Option<FormatterKind> {
        let image = MemoryImage::new();
        let config = PrinterConfig::default();
        printer
            .lookup(&ValueRef::new(0x1000usize, type_name), &image, &config)
            .map(|(kind, _)| kind)
    }

    #[test]
    fn lookup_registered_types() {
        let printer = build_fastrpc_printer();
        assert_eq!(lookup(&printer, "FRPC::Struct_t"), Some(FormatterKind::Struct));
        assert_eq!(lookup(&printer, "const FRPC::Array_t &"), Some(FormatterKind::Array));
        assert_eq!(lookup(&printer, "FRPC::Null_t"), Some(FormatterKind::Null));
    }

    #[test]
    fn lookup_unregistered_type() {
        let printer = build_fastrpc_printer();
        assert_eq!(lookup(&printer, "std::vector<int>"), None);
        assert_eq!(lookup(&printer, "FRPC::Struct_t *"), None);
    }

    #[test]
    fn lookup_template_stripped() {
        let mut printer = Printer::new("test");
        printer.add("ns::Holder", FormatterKind::Struct);
        assert_eq!(lookup(&printer, "ns::Holder<int>"), Some(FormatterKind::Struct));
    }

    #[test]
    fn base_type_without_symbols_does_not_match() {
        // The image has no memory at all, so the vtable read fails.
        let printer = build_fastrpc_printer();
        assert_eq!(lookup(&printer, "FRPC::Value_t"), None);
    }

    #[test]
    fn disabled_printers_do_not_match() {
        let printer = build_fastrpc_printer();
        assert!(printer.set_subprinter_enabled("FRPC::Struct_t", false));
        assert_eq!(lookup(&printer, "FRPC::Struct_t"), None);
        assert_eq!(lookup(&printer, "FRPC::Array_t"), Some(FormatterKind::Array));

        printer.set_enabled(false);
        assert_eq!(lookup(&printer, "FRPC::Array_t"), None);

        assert!(!printer.set_subprinter_enabled("FRPC::Missing_t", false));
    }

    #[test]
    fn later_add_wins_the_name() {
        let mut printer = Printer::new("test");
        printer
            .add("ns::T", FormatterKind::Array)
            .add("ns::T", FormatterKind::Pool);
        assert_eq!(printer.subprinters().len(), 2);
        assert_eq!(lookup(&printer, "ns::T"), Some(FormatterKind::Pool));
    }
}

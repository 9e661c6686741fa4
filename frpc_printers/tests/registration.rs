mod common;

use std::rc::Rc;

use common::{FrpcBuilder, LIBRARY};
use frpc_printers::{
    register_fastrpc_printers, DebuggerSession, Error, FormatterKind, HostCapabilities,
    MemoryImage, Printer, PrinterConfig, PrinterRegistry, ValueRef,
};
use memory_reader::Pointer;

/// A printer that claims `FRPC::Int_t` and shows it as empty.
fn shadowing_printer() -> Rc<Printer> {
    let mut printer = Printer::new("shadow");
    printer.add("FRPC::Int_t", FormatterKind::Null);
    Rc::new(printer)
}

fn int_image(objfile: Option<&str>) -> (MemoryImage, Pointer) {
    let mut builder = FrpcBuilder::new();
    if let Some(objfile) = objfile {
        builder = builder.heap_objfile(objfile);
    }
    let value = builder.int(7);
    (builder.finish(), value)
}

fn print_int(session: &DebuggerSession, image: &MemoryImage, value: Pointer) -> String {
    session.format_value(image, &ValueRef::new(value, "FRPC::Int_t"))
}

#[test]
fn global_registration() {
    let (image, value) = int_image(None);
    let mut session = DebuggerSession::new(PrinterConfig::default());
    assert_eq!(print_int(&session, &image, value), format!("<FRPC::Int_t @ {value}>"));

    register_fastrpc_printers(&mut session, None).unwrap();
    assert_eq!(session.global_printers().len(), 1);
    assert_eq!(session.global_printers()[0].name(), "fastrpc");
    assert_eq!(session.global_printers()[0].subprinters().len(), 10);
    assert_eq!(print_int(&session, &image, value), "7");
}

#[test]
fn registering_twice_installs_twice() {
    let (image, value) = int_image(None);
    let mut session = DebuggerSession::new(PrinterConfig::default());
    register_fastrpc_printers(&mut session, None).unwrap();
    register_fastrpc_printers(&mut session, None).unwrap();

    assert_eq!(session.global_printers().len(), 2);
    assert_eq!(print_int(&session, &image, value), "7");
}

#[test]
fn newest_registration_has_priority() {
    let (image, value) = int_image(None);
    let mut session = DebuggerSession::new(PrinterConfig::default());
    register_fastrpc_printers(&mut session, None).unwrap();
    session
        .register_pretty_printer(None, shadowing_printer())
        .unwrap();

    assert_eq!(print_int(&session, &image, value), "");
}

#[test]
fn legacy_lists_when_registry_is_missing() {
    let (image, value) = int_image(None);
    let mut session = DebuggerSession::new(PrinterConfig::default())
        .with_capabilities(HostCapabilities {
            printer_registry: false,
            legacy_printer_lists: true,
        });

    register_fastrpc_printers(&mut session, None).unwrap();
    assert_eq!(session.global_printers().len(), 1);
    assert_eq!(print_int(&session, &image, value), "7");

    // Appended printers come after those already in the list.
    session
        .legacy_printers(None)
        .unwrap()
        .push(shadowing_printer());
    assert_eq!(print_int(&session, &image, value), "7");

    assert!(matches!(
        session.register_pretty_printer(None, shadowing_printer()),
        Err(Error::RegistryUnavailable)
    ));
}

#[test]
fn no_registration_mechanism() {
    let mut session = DebuggerSession::new(PrinterConfig::default())
        .with_capabilities(HostCapabilities {
            printer_registry: false,
            legacy_printer_lists: false,
        });

    let result = register_fastrpc_printers(&mut session, None);
    assert!(matches!(result, Err(Error::RegistryUnavailable)));
    assert!(session.global_printers().is_empty());
}

#[test]
fn objfile_scoped_registration() {
    let (image, value) = int_image(Some("/opt/service/bin/server"));

    let mut session = DebuggerSession::new(PrinterConfig::default());
    register_fastrpc_printers(&mut session, Some("server")).unwrap();
    assert!(session.global_printers().is_empty());
    assert_eq!(session.objfile_printers("server").len(), 1);
    assert_eq!(print_int(&session, &image, value), "7");

    let mut other = DebuggerSession::new(PrinterConfig::default());
    register_fastrpc_printers(&mut other, Some("client")).unwrap();
    assert_eq!(
        print_int(&other, &image, value),
        format!("<FRPC::Int_t @ {value}>")
    );
}

#[test]
fn objfile_printers_before_global() {
    let (image, value) = int_image(Some(LIBRARY));

    let mut session = DebuggerSession::new(PrinterConfig::default());
    session
        .register_pretty_printer(Some(LIBRARY), shadowing_printer())
        .unwrap();
    register_fastrpc_printers(&mut session, None).unwrap();

    assert_eq!(print_int(&session, &image, value), "");
}

#[test]
fn disabled_subprinter_is_skipped() {
    let (image, value) = int_image(None);
    let mut session = DebuggerSession::new(PrinterConfig::default());
    register_fastrpc_printers(&mut session, None).unwrap();

    let printer = Rc::clone(&session.global_printers()[0]);
    assert!(printer.set_subprinter_enabled("FRPC::Int_t", false));
    assert_eq!(
        print_int(&session, &image, value),
        format!("<FRPC::Int_t @ {value}>")
    );

    assert!(printer.set_subprinter_enabled("FRPC::Int_t", true));
    assert_eq!(print_int(&session, &image, value), "7");
}

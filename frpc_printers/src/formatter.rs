use memory_reader::Pointer;

use crate::libstdcxx::{read_std_string, PointerVector, RbTree, RbTreeIter};
use crate::type_name::{dynamic_type, strip_template};
use crate::{Error, Inspect, PrinterConfig, ValueRef};

/// The declared type of every element stored in a FastRPC container.
/// The formatter for an element is chosen from its dynamic type.
pub const VALUE_BASE_TYPE: &str = "FRPC::Value_t";

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum PrimitiveKind {
    Int,
    Bool,
    Double,
    String,
    Binary,
}

/// Which formatter to construct for a matched type.  The printer
/// lookup table maps type names to one of these.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum FormatterKind {
    Null,
    Primitive(PrimitiveKind),
    DateTime,
    Struct,
    Array,
    Pool,
}

/// How the host should lay out a formatter's children.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DisplayHint {
    Map,
    Array,
    String,
}

impl DisplayHint {
    pub fn as_str(&self) -> &'static str {
        match self {
            DisplayHint::Map => "map",
            DisplayHint::Array => "array",
            DisplayHint::String => "string",
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub enum ChildValue {
    /// Already formatted.
    Text(String),

    /// A value that the host should format in turn, using whichever
    /// printer matches it.
    Value(ValueRef),

    /// The child could not be read.
    Error(String),
}

#[derive(Clone, Debug, PartialEq)]
pub struct Child {
    pub label: String,
    pub value: ChildValue,
}

impl Child {
    fn error(label: impl Into<String>, err: &Error) -> Self {
        Self {
            label: label.into(),
            value: ChildValue::Error(placeholder(err)),
        }
    }
}

/// The text shown in place of a value that could not be formatted.
/// Read failures use the same wording as gdb.
pub fn placeholder(err: &Error) -> String {
    match err {
        Error::MemoryReader { err } => format!("<error reading variable: {err}>"),
        other => format!("<error: {other}>"),
    }
}

/// Quote a byte string the way gdb prints a `char` array.
pub fn quote_bytes(bytes: &[u8]) -> String {
    let mut out = String::with_capacity(bytes.len() + 2);
    out.push('"');
    for chunk in bytes.utf8_chunks() {
        for c in chunk.valid().chars() {
            match c {
                '"' => out.push_str("\\\""),
                '\\' => out.push_str("\\\\"),
                '\n' => out.push_str("\\n"),
                '\t' => out.push_str("\\t"),
                '\r' => out.push_str("\\r"),
                c if c.is_control() => {
                    let mut buf = [0u8; 4];
                    for byte in c.encode_utf8(&mut buf).bytes() {
                        out.push_str(&format!("\\{byte:03o}"));
                    }
                }
                c => out.push(c),
            }
        }
        for byte in chunk.invalid() {
            out.push_str(&format!("\\{byte:03o}"));
        }
    }
    out.push('"');
    out
}

/// A formatter bound to one value for the duration of one display
/// operation.
///
/// Nothing read from the inspected process is retained between calls:
/// `summary` and `children` each read memory afresh.
pub struct Formatter<'a> {
    kind: FormatterKind,
    type_name: String,
    value: ValueRef,
    inspect: &'a dyn Inspect,
    config: &'a PrinterConfig,
}

impl<'a> Formatter<'a> {
    pub fn new(
        kind: FormatterKind,
        type_name: impl Into<String>,
        value: ValueRef,
        inspect: &'a dyn Inspect,
        config: &'a PrinterConfig,
    ) -> Self {
        Self {
            kind,
            type_name: type_name.into(),
            value,
            inspect,
            config,
        }
    }

    pub fn kind(&self) -> FormatterKind {
        self.kind
    }

    pub fn type_name(&self) -> &str {
        &self.type_name
    }

    pub fn value(&self) -> &ValueRef {
        &self.value
    }

    pub fn display_hint(&self) -> Option<DisplayHint> {
        match self.kind {
            FormatterKind::Struct => Some(DisplayHint::Map),
            FormatterKind::Array => Some(DisplayHint::Array),
            FormatterKind::Primitive(PrimitiveKind::String | PrimitiveKind::Binary) => {
                Some(DisplayHint::String)
            }
            _ => None,
        }
    }

    /// A one-line description of the value.  Never fails: errors are
    /// rendered as placeholder text.
    pub fn summary(&self) -> String {
        self.try_summary().unwrap_or_else(|err| {
            log::debug!("Could not summarize {}: {err}", self.value);
            placeholder(&err)
        })
    }

    pub fn try_summary(&self) -> Result<String, Error> {
        self.check_dynamic_type()?;

        let location = self.value.location;
        let frpc = &self.config.layout.frpc;
        let value_location = location.try_add(frpc.primitive_value)?;

        match self.kind {
            FormatterKind::Null => Ok(String::new()),
            FormatterKind::Primitive(PrimitiveKind::Int) => {
                Ok(self.inspect.read_i64(value_location)?.to_string())
            }
            FormatterKind::Primitive(PrimitiveKind::Bool) => {
                let value = self.inspect.read_u8(value_location)? != 0;
                Ok(value.to_string())
            }
            FormatterKind::Primitive(PrimitiveKind::Double) => {
                Ok(self.inspect.read_f64(value_location)?.to_string())
            }
            FormatterKind::Primitive(PrimitiveKind::String | PrimitiveKind::Binary) => {
                let bytes = read_std_string(
                    self.inspect,
                    value_location,
                    &self.config.layout.string,
                    self.config.max_string_length,
                )?;
                Ok(quote_bytes(&bytes))
            }
            FormatterKind::DateTime => self.datetime_summary(),
            FormatterKind::Struct => self.struct_summary(),
            FormatterKind::Array | FormatterKind::Pool => {
                let vector = self.vector()?;
                Ok(format!(
                    "({} of length {}, capacity {})",
                    self.type_name,
                    vector.len(),
                    vector.capacity()
                ))
            }
        }
    }

    /// The elements of a container, produced lazily.  Values that
    /// have no children, and containers whose layout is inconsistent,
    /// produce an empty sequence.
    pub fn children(&self) -> Children<'a> {
        let result = match self.kind {
            FormatterKind::Struct => self.struct_children(),
            FormatterKind::Array => self.sequence_children(false),
            FormatterKind::Pool => self.sequence_children(true),
            _ => Ok(Children::empty()),
        };
        result.unwrap_or_else(|err| {
            log::warn!("No children shown for {}: {err}", self.value);
            Children::empty()
        })
    }

    /// Verify that the vtable agrees with the type the formatter was
    /// chosen for.  Stale debug info, or a pointer to something that
    /// is not an FRPC value, is caught here.
    fn check_dynamic_type(&self) -> Result<(), Error> {
        let found =
            dynamic_type(self.inspect, self.value.location, &self.config.layout.frpc)?;
        match found {
            Some(found)
                if strip_template(&found) != strip_template(&self.type_name) =>
            {
                Err(Error::DynamicTypeMismatch {
                    location: self.value.location,
                    expected: self.type_name.clone(),
                    found,
                })
            }
            _ => Ok(()),
        }
    }

    fn tree(&self) -> Result<RbTree, Error> {
        let location = self
            .value
            .location
            .try_add(self.config.layout.frpc.struct_data)?;
        let tree = RbTree::read(self.inspect, location, &self.config.layout.rb_tree)?;
        tree.validate(self.inspect, &self.config.layout.rb_tree, &self.type_name)?;
        Ok(tree)
    }

    fn vector(&self) -> Result<PointerVector, Error> {
        let frpc = &self.config.layout.frpc;
        let offset = if self.kind == FormatterKind::Pool {
            frpc.pool_storage
        } else {
            frpc.array_data
        };
        let vector = PointerVector::read(
            self.inspect,
            self.value.location.try_add(offset)?,
            &self.config.layout.vector,
        )?;
        vector.validate(&self.type_name, self.config.max_traversal_steps)?;
        Ok(vector)
    }

    fn struct_summary(&self) -> Result<String, Error> {
        let tree = self.tree()?;

        let mut count = 0;
        for node in tree.iter(
            self.inspect,
            &self.config.layout.rb_tree,
            self.config.max_traversal_steps,
        ) {
            match node {
                Ok(_) => count += 1,
                Err(Error::TraversalLimitReached(..)) => {
                    log::warn!(
                        "Traversal of {} stopped after {count} elements",
                        self.value
                    );
                    return Ok(format!(
                        "{} with at least {count} elements (traversal limit reached)",
                        self.type_name
                    ));
                }
                Err(err) => return Err(err),
            }
        }

        if count != tree.recorded_count() {
            log::warn!(
                "{} records {} elements, but {count} were found",
                self.value,
                tree.recorded_count()
            );
        }

        Ok(format!("{} with {count} elements", self.type_name))
    }

    fn struct_children(&self) -> Result<Children<'a>, Error> {
        self.check_dynamic_type()?;
        let tree = self.tree()?;
        let config = self.config;
        Ok(Children {
            inner: ChildrenInner::Struct(StructChildren {
                nodes: tree.iter(
                    self.inspect,
                    &config.layout.rb_tree,
                    config.max_traversal_steps,
                ),
                inspect: self.inspect,
                config,
            }),
        })
    }

    fn sequence_children(&self, label_with_address: bool) -> Result<Children<'a>, Error> {
        self.check_dynamic_type()?;
        let vector = self.vector()?;
        Ok(Children {
            inner: ChildrenInner::Sequence(SequenceChildren {
                vector,
                index: 0,
                label_with_address,
                inspect: self.inspect,
                done: false,
            }),
        })
    }

    fn datetime_summary(&self) -> Result<String, Error> {
        let layout = &self.config.layout.frpc.datetime;
        let location = self.value.location;
        let read_u8 = |offset: usize| -> Result<u8, Error> {
            Ok(self.inspect.read_u8(location.try_add(offset)?)?)
        };

        let year = self.inspect.read_i16(location.try_add(layout.year)?)?;
        let month = read_u8(layout.month)?;
        let day = read_u8(layout.day)?;
        let hour = read_u8(layout.hour)?;
        let minute = read_u8(layout.minute)?;
        let sec = read_u8(layout.sec)?;
        let time_zone = self.inspect.read_i8(location.try_add(layout.time_zone)?)?;

        let valid = (1..=9999).contains(&year)
            && (1..=12).contains(&month)
            && day >= 1
            && day <= days_in_month(year, month)
            && hour < 24
            && minute < 60
            && sec < 60;
        if !valid {
            return Err(Error::InvalidDateTime {
                year,
                month,
                day,
                hour,
                minute,
                sec,
            });
        }

        Ok(format!(
            "{year:04}-{month:02}-{day:02} {hour:02}:{minute:02}:{sec:02} {time_zone}"
        ))
    }
}

fn days_in_month(year: i16, month: u8) -> u8 {
    let is_leap = (year % 4 == 0 && year % 100 != 0) || year % 400 == 0;
    match month {
        1 | 3 | 5 | 7 | 8 | 10 | 12 => 31,
        4 | 6 | 9 | 11 => 30,
        2 if is_leap => 29,
        2 => 28,
        _ => 0,
    }
}

/// A single-pass sequence of the children of one value.
pub struct Children<'a> {
    inner: ChildrenInner<'a>,
}

enum ChildrenInner<'a> {
    Empty,
    Struct(StructChildren<'a>),
    Sequence(SequenceChildren<'a>),
}

impl Children<'_> {
    pub fn empty() -> Self {
        Self {
            inner: ChildrenInner::Empty,
        }
    }
}

impl Iterator for Children<'_> {
    type Item = Child;

    fn next(&mut self) -> Option<Self::Item> {
        match &mut self.inner {
            ChildrenInner::Empty => None,
            ChildrenInner::Struct(iter) => iter.next(),
            ChildrenInner::Sequence(iter) => iter.next(),
        }
    }
}

struct StructChildren<'a> {
    nodes: RbTreeIter<'a>,
    inspect: &'a dyn Inspect,
    config: &'a PrinterConfig,
}

impl StructChildren<'_> {
    fn read_entry(&self, node: Pointer) -> Result<Child, Error> {
        let layout = &self.config.layout;
        let pair = node.try_add(layout.rb_tree.value)?;

        let key = read_std_string(
            self.inspect,
            pair.try_add(layout.frpc.pair_first)?,
            &layout.string,
            self.config.max_string_length,
        )?;
        let element = self
            .inspect
            .read_pointer(pair.try_add(layout.frpc.pair_second)?)?;

        Ok(Child {
            label: quote_bytes(&key),
            value: element_value(element),
        })
    }
}

impl Iterator for StructChildren<'_> {
    type Item = Child;

    fn next(&mut self) -> Option<Self::Item> {
        // An unreadable entry is reported in place; the links that lead
        // past it were read successfully, so the walk continues.
        match self.nodes.next()? {
            Ok(node) => Some(
                self.read_entry(node)
                    .unwrap_or_else(|err| Child::error(format!("<{node}>"), &err)),
            ),
            Err(err) => {
                log::warn!("Struct traversal ended early: {err}");
                Some(Child::error("...", &err))
            }
        }
    }
}

struct SequenceChildren<'a> {
    vector: PointerVector,
    index: usize,
    label_with_address: bool,
    inspect: &'a dyn Inspect,
    done: bool,
}

impl Iterator for SequenceChildren<'_> {
    type Item = Child;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done || self.index >= self.vector.len() {
            return None;
        }

        let index = self.index;
        self.index += 1;

        let slot = self.vector.element_location(index);
        let element = match self.inspect.read_pointer(slot) {
            Ok(element) => element,
            Err(err) => {
                self.done = true;
                return Some(Child::error(format!("[{index}]"), &err.into()));
            }
        };

        let label = if self.label_with_address {
            format!("[{index}]({element})")
        } else {
            format!("[{index}]")
        };
        Some(Child {
            label,
            value: element_value(element),
        })
    }
}

fn element_value(element: Pointer) -> ChildValue {
    if element.is_null() {
        ChildValue::Error(placeholder(&memory_reader::Error::MemoryReadNullPointer.into()))
    } else {
        ChildValue::Value(ValueRef::new(element, VALUE_BASE_TYPE))
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn quoting_matches_debugger_style() {
        assert_eq!(quote_bytes(b"A"), "\"A\"");
        assert_eq!(quote_bytes(b"say \"hi\"\n"), "\"say \\\"hi\\\"\\n\"");
        assert_eq!(quote_bytes(&[0x61, 0xff, 0x01]), "\"a\\377\\001\"");
        assert_eq!(quote_bytes("žluť".as_bytes()), "\"žluť\"");
    }

    #[test]
    fn leap_years() {
        assert_eq!(days_in_month(2024, 2), 29);
        assert_eq!(days_in_month(1900, 2), 28);
        assert_eq!(days_in_month(2000, 2), 29);
        assert_eq!(days_in_month(2023, 13), 0);
    }

    #[test]
    fn read_errors_use_debugger_wording() {
        let err: Error =
            memory_reader::Error::MemoryReadBadAddress(Pointer::new(0x10usize), 8).into();
        assert_eq!(
            placeholder(&err),
            "<error reading variable: Cannot access memory at address 0x10>"
        );
    }
}

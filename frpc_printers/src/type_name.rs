use memory_reader::Pointer;

use crate::{Error, FrpcLayout, Inspect};

/// Bound on typedef chains, which could otherwise be cyclic in broken
/// debug info.
const MAX_TYPEDEF_DEPTH: usize = 16;

fn strip_qualifiers(mut name: &str) -> &str {
    loop {
        let before = name;
        name = name.trim();
        for suffix in ["&&", "&", "const", "volatile"] {
            if let Some(stripped) = name.strip_suffix(suffix) {
                // Only strip whole words, so that `foo_const` is kept.
                let at_boundary = suffix.starts_with('&')
                    || stripped.is_empty()
                    || stripped.ends_with(|c: char| c.is_whitespace() || c == '*');
                if at_boundary {
                    name = stripped.trim_end();
                }
            }
        }
        for prefix in ["const ", "volatile ", "struct ", "class "] {
            if let Some(stripped) = name.strip_prefix(prefix) {
                name = stripped;
            }
        }
        if name == before {
            return name;
        }
    }
}

/// The tag of a type, with references, cv-qualifiers and typedefs
/// removed.  Returns `None` for pointer types, which never have a
/// pretty printer of their own.
pub fn basic_type(type_name: &str, inspect: &dyn Inspect) -> Option<String> {
    let mut current = strip_qualifiers(type_name).to_string();

    for _ in 0..MAX_TYPEDEF_DEPTH {
        match inspect.resolve_typedef(&current) {
            Some(target) => current = strip_qualifiers(&target).to_string(),
            None => break,
        }
    }

    if current.is_empty() || current.ends_with('*') {
        None
    } else {
        Some(current)
    }
}

/// Remove the outermost template argument list, so that
/// `FRPC::Foo<int, bar<x>>` becomes `FRPC::Foo`.
pub fn strip_template(type_name: &str) -> &str {
    if !type_name.ends_with('>') {
        return type_name;
    }

    let mut depth = 0usize;
    for (i, c) in type_name.char_indices() {
        match c {
            '<' => {
                if depth == 0 {
                    return type_name[..i].trim_end();
                }
                depth += 1;
            }
            '>' => depth = depth.saturating_sub(1),
            _ => {}
        }
    }
    type_name
}

/// Extract a class name from the demangled name of a vtable, or of a
/// destructor stored in the vtable's first slot.
///
/// Vtables are accepted both as `cpp_demangle` writes them,
/// `{vtable(FRPC::String_t)}`, and as gdb does, `vtable for
/// FRPC::String_t`.
fn class_from_symbol(symbol: &str) -> Option<&str> {
    let vtable_class = symbol
        .strip_prefix("{vtable(")
        .and_then(|rest| rest.strip_suffix(")}"))
        .or_else(|| symbol.strip_prefix("vtable for "));
    if let Some(class) = vtable_class {
        return Some(class.trim()).filter(|class| !class.is_empty());
    }
    symbol
        .rfind("::~")
        .map(|index| symbol[..index].trim())
        .filter(|class| !class.is_empty())
}

/// Determine the most-derived type of a polymorphic FRPC value from
/// its vtable pointer.
///
/// Returns `Ok(None)` if no symbol identifies the vtable, for example
/// when the inspected binary is stripped.
pub fn dynamic_type(
    inspect: &dyn Inspect,
    location: Pointer,
    layout: &FrpcLayout,
) -> Result<Option<String>, Error> {
    let vptr = inspect.read_pointer(location.try_add(layout.vptr)?)?;
    if vptr.is_null() {
        return Ok(None);
    }

    if let Some(class) = inspect
        .symbol_at(vptr)
        .as_deref()
        .and_then(class_from_symbol)
    {
        return Ok(Some(class.to_string()));
    }

    // The vtable symbol may be missing while the destructor it points
    // to is still named.
    let first_slot = inspect.read_pointer(vptr)?;
    Ok(inspect
        .symbol_at(first_slot)
        .as_deref()
        .and_then(class_from_symbol)
        .map(|class| class.to_string()))
}

use std::cell::{Cell, RefCell};

use memory_reader::Pointer;

use crate::{ChildValue, DebuggerSession, DisplayHint, Formatter, Inspect, ValueRef};

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum RenderStyle {
    /// Everything on one line.
    #[default]
    Inline,

    /// One child per line, indented by nesting depth.
    Tree,
}

/// Renders one value for one `print`.
///
/// Nested values are followed through memory that may be corrupted, so
/// a single render visits at most `max_traversal_steps` values, and a
/// value that contains itself is shown as a cycle rather than expanded.
pub(crate) struct Renderer<'a> {
    session: &'a DebuggerSession,
    inspect: &'a dyn Inspect,
    remaining_values: Cell<usize>,
    open_containers: RefCell<Vec<Pointer>>,
}

impl<'a> Renderer<'a> {
    pub(crate) fn new(session: &'a DebuggerSession, inspect: &'a dyn Inspect) -> Self {
        Self {
            session,
            inspect,
            remaining_values: Cell::new(session.config().max_traversal_steps),
            open_containers: RefCell::new(Vec::new()),
        }
    }

    pub(crate) fn render(&self, value: &ValueRef) -> String {
        let mut out = String::new();
        self.render_value(value, 0, &mut out);
        out
    }

    fn render_value(&self, value: &ValueRef, depth: usize, out: &mut String) {
        if self.open_containers.borrow().contains(&value.location) {
            log::warn!("{value} contains itself");
            out.push_str(&format!("<cycle at {}>", value.location));
            return;
        }

        let remaining = self.remaining_values.get();
        if remaining == 0 {
            out.push_str("...");
            return;
        }
        self.remaining_values.set(remaining - 1);

        match self.session.find_formatter(value, self.inspect) {
            Some(formatter) => {
                self.open_containers.borrow_mut().push(value.location);
                self.render_formatter(&formatter, depth, out);
                self.open_containers.borrow_mut().pop();
            }
            None => out.push_str(&format!("<{} @ {}>", value.type_name, value.location)),
        }
    }

    fn newline(&self, depth: usize, out: &mut String) {
        out.push('\n');
        out.push_str(&"  ".repeat(depth));
    }

    fn render_formatter(&self, formatter: &Formatter, depth: usize, out: &mut String) {
        let config = self.session.config();
        let style = self.session.style();

        let summary = formatter.summary();
        let mut children = formatter.children().peekable();

        out.push_str(&summary);
        if children.peek().is_none() {
            return;
        }
        if !summary.is_empty() {
            out.push_str(" = ");
        }
        if depth >= config.max_depth {
            out.push_str("{...}");
            return;
        }

        let hint = formatter.display_hint();
        out.push('{');
        for (i, child) in children.enumerate() {
            if i > 0 {
                out.push(',');
                if style == RenderStyle::Inline {
                    out.push(' ');
                }
            }
            if style == RenderStyle::Tree {
                self.newline(depth + 1, out);
            }

            let elided = config.print_elements > 0 && i >= config.print_elements;
            if elided || self.remaining_values.get() == 0 {
                out.push_str("...");
                break;
            }

            match hint {
                Some(DisplayHint::Map) => {
                    out.push('[');
                    out.push_str(&child.label);
                    out.push_str("] = ");
                }
                Some(DisplayHint::Array) => {}
                _ => {
                    out.push_str(&child.label);
                    out.push_str(" = ");
                }
            }

            match &child.value {
                ChildValue::Text(text) | ChildValue::Error(text) => out.push_str(text),
                ChildValue::Value(value) => self.render_value(value, depth + 1, out),
            }
        }
        if style == RenderStyle::Tree {
            self.newline(depth, out);
        }
        out.push('}');
    }
}

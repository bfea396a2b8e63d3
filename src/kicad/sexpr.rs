//! KiCad element tree.
//!
//! Every KiCad file (`.kicad_sch`, `.kicad_pcb`, `.kicad_mod`, `.kicad_sym`,
//! library tables) is a single parenthesised tree. This module holds the
//! typed tree, helpers for building and querying it, and the deterministic
//! pretty printer used to turn it into text.
//!
//! # Text Form
//!
//! ```text
//! (footprint "R_0402"
//!   (layer "F.Cu")
//!   (pad "1" smd roundrect (at -0.48 0) (size 0.56 0.62) (layers "F.Cu" "F.Mask"))
//! )
//! ```
//!
//! Lists whose nesting is shallow and whose text is short stay on one line;
//! everything else breaks one child list per line. The same tree always
//! prints to the same bytes, and printing a parsed print is a fixed point.

use std::fmt::{self, Write as _};

/// Maximum inline width before a list is broken over several lines.
const INLINE_WIDTH: usize = 88;

/// A node of a KiCad element tree.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Sexpr {
    /// Bare token: keyword, number, or `yes`/`no` flag.
    Atom(String),
    /// Quoted string.
    Str(String),
    /// Parenthesised list; by convention the first item is the head keyword.
    List(Vec<Self>),
}

impl Sexpr {
    /// Creates a bare atom.
    #[must_use]
    pub fn atom(text: impl Into<String>) -> Self {
        Self::Atom(text.into())
    }

    /// Creates a quoted string.
    #[must_use]
    pub fn string(text: impl Into<String>) -> Self {
        Self::Str(text.into())
    }

    /// Creates a numeric atom using [`format_number`].
    #[must_use]
    pub fn number(value: f64) -> Self {
        Self::Atom(format_number(value))
    }

    /// Creates an integer atom.
    #[must_use]
    pub fn integer(value: impl Into<i64>) -> Self {
        Self::Atom(value.into().to_string())
    }

    /// Creates an empty list with the given head keyword.
    #[must_use]
    pub fn node(head: &str) -> Self {
        Self::List(vec![Self::atom(head)])
    }

    /// Creates a list with the given head keyword and items.
    #[must_use]
    pub fn list(head: &str, items: impl IntoIterator<Item = Self>) -> Self {
        let mut list = vec![Self::atom(head)];
        list.extend(items);
        Self::List(list)
    }

    /// `(head "value")`
    #[must_use]
    pub fn string_field(head: &str, value: impl Into<String>) -> Self {
        Self::list(head, [Self::string(value)])
    }

    /// `(head value)` with a numeric value.
    #[must_use]
    pub fn number_field(head: &str, value: f64) -> Self {
        Self::list(head, [Self::number(value)])
    }

    /// `(head yes)` or `(head no)`.
    #[must_use]
    pub fn yes_no(head: &str, flag: bool) -> Self {
        Self::list(head, [Self::atom(if flag { "yes" } else { "no" })])
    }

    /// `(head x y)`
    #[must_use]
    pub fn xy(head: &str, x: f64, y: f64) -> Self {
        Self::list(head, [Self::number(x), Self::number(y)])
    }

    /// `(head x y z)`
    #[must_use]
    pub fn xyz(head: &str, x: f64, y: f64, z: f64) -> Self {
        Self::list(head, [Self::number(x), Self::number(y), Self::number(z)])
    }

    /// `(at x y angle)`
    #[must_use]
    pub fn at(x: f64, y: f64, angle: f64) -> Self {
        Self::list("at", [Self::number(x), Self::number(y), Self::number(angle)])
    }

    /// Builder form of [`Sexpr::push`].
    #[must_use]
    pub fn with(mut self, item: Self) -> Self {
        self.push(item);
        self
    }

    /// Builder form that appends only when `item` is `Some`.
    #[must_use]
    pub fn with_opt(mut self, item: Option<Self>) -> Self {
        if let Some(item) = item {
            self.push(item);
        }
        self
    }

    /// Appends an item to a list. Does nothing on atoms and strings.
    pub fn push(&mut self, item: Self) {
        if let Self::List(items) = self {
            items.push(item);
        }
    }

    /// Returns the text of an atom or string.
    #[must_use]
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::Atom(s) | Self::Str(s) => Some(s),
            Self::List(_) => None,
        }
    }

    /// Parses an atom or string as a number.
    #[must_use]
    pub fn as_f64(&self) -> Option<f64> {
        self.as_text().and_then(|s| s.parse().ok())
    }

    /// Returns the items of a list, or an empty slice for atoms.
    #[must_use]
    pub fn items(&self) -> &[Self] {
        match self {
            Self::List(items) => items,
            _ => &[],
        }
    }

    /// Returns the items of a list mutably.
    pub fn items_mut(&mut self) -> Option<&mut Vec<Self>> {
        match self {
            Self::List(items) => Some(items),
            _ => None,
        }
    }

    /// Returns the head keyword of a list.
    #[must_use]
    pub fn head(&self) -> Option<&str> {
        match self.items().first() {
            Some(Self::Atom(head)) => Some(head),
            _ => None,
        }
    }

    /// Returns true if this is a list with the given head keyword.
    #[must_use]
    pub fn is(&self, head: &str) -> bool {
        self.head() == Some(head)
    }

    /// Returns the items after the head keyword.
    #[must_use]
    pub fn args(&self) -> &[Self] {
        self.items().get(1..).unwrap_or(&[])
    }

    /// Returns the text of the argument at `index` (0 = first after head).
    #[must_use]
    pub fn arg_text(&self, index: usize) -> Option<&str> {
        self.args().get(index).and_then(Self::as_text)
    }

    /// Returns the argument at `index` parsed as a number.
    #[must_use]
    pub fn arg_f64(&self, index: usize) -> Option<f64> {
        self.args().get(index).and_then(Self::as_f64)
    }

    /// Replaces the argument at `index`. Returns false if it does not exist.
    pub fn set_arg(&mut self, index: usize, value: Self) -> bool {
        match self.items_mut().and_then(|items| items.get_mut(index + 1)) {
            Some(slot) => {
                *slot = value;
                true
            }
            None => false,
        }
    }

    /// Finds the first direct child list with the given head.
    #[must_use]
    pub fn find(&self, head: &str) -> Option<&Self> {
        self.items().iter().find(|item| item.is(head))
    }

    /// Finds the first direct child list with the given head, mutably.
    pub fn find_mut(&mut self, head: &str) -> Option<&mut Self> {
        self.items_mut()?.iter_mut().find(|item| item.is(head))
    }

    /// Iterates over all direct child lists with the given head.
    pub fn find_all<'a>(&'a self, head: &'a str) -> impl Iterator<Item = &'a Self> + 'a {
        self.items().iter().filter(move |item| item.is(head))
    }

    /// Iterates mutably over all direct child lists with the given head.
    pub fn find_all_mut<'a>(&'a mut self, head: &'a str) -> impl Iterator<Item = &'a mut Self> + 'a {
        self.items_mut()
            .into_iter()
            .flat_map(|items| items.iter_mut())
            .filter(move |item| item.is(head))
    }

    /// Removes every direct child list with the given head.
    ///
    /// Returns the number of removed children.
    pub fn remove_all(&mut self, head: &str) -> usize {
        let Some(items) = self.items_mut() else {
            return 0;
        };
        let before = items.len();
        items.retain(|item| !item.is(head));
        before - items.len()
    }

    /// Removes every descendant list with the given head, at any depth.
    pub fn remove_recursive(&mut self, head: &str) {
        if let Some(items) = self.items_mut() {
            items.retain(|item| !item.is(head));
            for item in items {
                item.remove_recursive(head);
            }
        }
    }

    /// Removes bare atom flags (such as `hide` or `locked`) from the arguments.
    pub fn remove_flag(&mut self, flag: &str) {
        if let Some(items) = self.items_mut() {
            let head = items.first().cloned();
            items.retain(|item| !matches!(item, Self::Atom(a) if a == flag));
            if let Some(head) = head {
                if items.first() != Some(&head) {
                    items.insert(0, head);
                }
            }
        }
    }

    /// Visits this node and all descendants in pre-order.
    pub fn walk_mut(&mut self, visit: &mut impl FnMut(&mut Self)) {
        visit(self);
        if let Self::List(items) = self {
            for item in items {
                item.walk_mut(visit);
            }
        }
    }

    /// Finds a `(property "key" "value" ...)` child.
    #[must_use]
    pub fn property(&self, key: &str) -> Option<&Self> {
        self.find_all("property")
            .find(|p| p.arg_text(0) == Some(key))
    }

    /// Returns the value of a `(property "key" "value" ...)` child.
    #[must_use]
    pub fn property_value(&self, key: &str) -> Option<&str> {
        self.property(key).and_then(|p| p.arg_text(1))
    }

    /// Sets the value of an existing property.
    ///
    /// Returns false if the property does not exist.
    pub fn set_property_value(&mut self, key: &str, value: impl Into<String>) -> bool {
        let value = value.into();
        self.find_all_mut("property")
            .find(|p| p.arg_text(0) == Some(key))
            .is_some_and(|p| p.set_arg(1, Self::Str(value)))
    }

    /// Nesting depth: atoms are 0, a flat list is 1.
    fn depth(&self) -> usize {
        match self {
            Self::List(items) => 1 + items.iter().map(Self::depth).max().unwrap_or(0),
            _ => 0,
        }
    }

    fn write_inline(&self, out: &mut String) {
        match self {
            Self::Atom(a) => out.push_str(a),
            Self::Str(s) => write_quoted(out, s),
            Self::List(items) => {
                out.push('(');
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        out.push(' ');
                    }
                    item.write_inline(out);
                }
                out.push(')');
            }
        }
    }

    fn write_pretty(&self, out: &mut String, indent: usize) {
        let Self::List(items) = self else {
            self.write_inline(out);
            return;
        };

        let mut inline = String::new();
        self.write_inline(&mut inline);
        if self.depth() <= 2 && indent * 2 + inline.len() <= INLINE_WIDTH {
            out.push_str(&inline);
            return;
        }

        out.push('(');
        let mut broken = false;
        for (i, item) in items.iter().enumerate() {
            if broken || matches!(item, Self::List(_)) {
                newline(out, indent + 1);
                item.write_pretty(out, indent + 1);
                broken = true;
            } else {
                if i > 0 {
                    out.push(' ');
                }
                item.write_inline(out);
            }
        }
        if broken {
            newline(out, indent);
        }
        out.push(')');
    }
}

impl fmt::Display for Sexpr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut out = String::new();
        self.write_pretty(&mut out, 0);
        f.write_str(&out)
    }
}

fn newline(out: &mut String, indent: usize) {
    out.push('\n');
    for _ in 0..indent {
        out.push_str("  ");
    }
}

fn write_quoted(out: &mut String, text: &str) {
    out.push('"');
    for ch in text.chars() {
        match ch {
            '"' => out.push_str("\\\""),
            '\\' => out.push_str("\\\\"),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            _ => out.push(ch),
        }
    }
    out.push('"');
}

/// Formats a number the way KiCad writes coordinates.
///
/// Values are rounded to 6 decimal places, trailing zeros are dropped, and
/// negative zero prints as `0`.
#[must_use]
pub fn format_number(value: f64) -> String {
    if !value.is_finite() {
        return "0".to_string();
    }
    let rounded = (value * 1_000_000.0).round() / 1_000_000.0;
    if rounded == 0.0 {
        return "0".to_string();
    }
    let mut text = String::new();
    let _ = write!(text, "{rounded:.6}");
    let trimmed = text.trim_end_matches('0').trim_end_matches('.');
    trimmed.to_string()
}

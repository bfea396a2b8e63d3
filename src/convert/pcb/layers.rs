//! Board layer stack.
//!
//! KiCad 9 numbers copper layers `F.Cu = 0`, `B.Cu = 2`, `In<n>.Cu = 2 + 2n`,
//! and technical layers with odd ordinals.
//!
//! Input layer names are `top`, `bottom`, `inner1`, `inner2`, ...; KiCad
//! names (`F.Cu`, `In1.Cu`, ...) are accepted as well.

use crate::kicad::Sexpr;

/// Front copper.
pub const FRONT_COPPER: &str = "F.Cu";

/// Back copper.
pub const BACK_COPPER: &str = "B.Cu";

/// Board outline layer.
pub const EDGE_CUTS: &str = "Edge.Cuts";

/// Technical layers: (ordinal, name, user name).
const TECHNICAL_LAYERS: &[(u32, &str, Option<&str>)] = &[
    (9, "F.Adhes", Some("F.Adhesive")),
    (11, "B.Adhes", Some("B.Adhesive")),
    (13, "F.Paste", None),
    (15, "B.Paste", None),
    (5, "F.SilkS", Some("F.Silkscreen")),
    (7, "B.SilkS", Some("B.Silkscreen")),
    (1, "F.Mask", None),
    (3, "B.Mask", None),
    (17, "Dwgs.User", Some("User.Drawings")),
    (19, "Cmts.User", Some("User.Comments")),
    (25, "Edge.Cuts", None),
    (27, "Margin", None),
    (31, "F.CrtYd", Some("F.Courtyard")),
    (29, "B.CrtYd", Some("B.Courtyard")),
    (35, "F.Fab", None),
    (33, "B.Fab", None),
];

/// Board side of a placed item.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Side {
    /// Front.
    Front,
    /// Back.
    Back,
}

impl Side {
    /// Side for an input layer name; anything but `bottom`/`B.*` is the front.
    #[must_use]
    pub fn from_layer(layer: &str) -> Self {
        let layer = layer.trim();
        if layer.eq_ignore_ascii_case("bottom") || layer.starts_with("B.") {
            Self::Back
        } else {
            Self::Front
        }
    }

    /// `F` or `B`.
    #[must_use]
    pub const fn prefix(self) -> &'static str {
        match self {
            Self::Front => "F",
            Self::Back => "B",
        }
    }

    /// Technical layer on this side, e.g. `layer("SilkS")` → `F.SilkS`.
    #[must_use]
    pub fn layer(self, suffix: &str) -> String {
        format!("{}.{suffix}", self.prefix())
    }

    /// Copper layer of this side.
    #[must_use]
    pub const fn copper(self) -> &'static str {
        match self {
            Self::Front => FRONT_COPPER,
            Self::Back => BACK_COPPER,
        }
    }
}

/// Copper layer names for a board with `count` copper layers, top to bottom.
///
/// Counts below two become two; odd counts round up.
#[must_use]
pub fn copper_layer_names(count: u32) -> Vec<String> {
    let count = count.max(2);
    let count = count + count % 2;
    let mut names = vec![FRONT_COPPER.to_string()];
    names.extend((1..count - 1).map(|n| format!("In{n}.Cu")));
    names.push(BACK_COPPER.to_string());
    names
}

/// Maps an input layer name to a copper layer present on the board.
#[must_use]
pub fn copper_layer(input: &str, copper: &[String]) -> Option<String> {
    let input = input.trim();
    let lower = input.to_ascii_lowercase();
    let name = match lower.as_str() {
        "top" | "f.cu" | "front" => FRONT_COPPER.to_string(),
        "bottom" | "b.cu" | "back" => BACK_COPPER.to_string(),
        _ => {
            let digits = lower
                .strip_prefix("inner")
                .or_else(|| lower.strip_prefix("in"))
                .map(|rest| rest.trim_end_matches(".cu"))?;
            let n: u32 = digits.parse().ok()?;
            format!("In{n}.Cu")
        }
    };
    copper.contains(&name).then_some(name)
}

/// Position of a copper layer in the stack (0 = top).
#[must_use]
pub fn stack_position(layer: &str, copper: &[String]) -> Option<usize> {
    copper.iter().position(|l| l == layer)
}

/// Returns true if a via between `a` and `b` spans the whole stack.
#[must_use]
pub fn is_through(a: &str, b: &str) -> bool {
    (a == FRONT_COPPER && b == BACK_COPPER) || (a == BACK_COPPER && b == FRONT_COPPER)
}

fn copper_ordinal(layer: &str) -> u32 {
    match layer {
        FRONT_COPPER => 0,
        BACK_COPPER => 2,
        _ => layer
            .strip_prefix("In")
            .and_then(|rest| rest.strip_suffix(".Cu"))
            .and_then(|n| n.parse::<u32>().ok())
            .map_or(0, |n| 2 + 2 * n),
    }
}

/// Builds the `(layers ...)` table for a copper stack.
#[must_use]
pub fn layer_table(copper: &[String]) -> Sexpr {
    let mut table = Sexpr::node("layers");
    for layer in copper {
        table.push(Sexpr::List(vec![
            Sexpr::integer(copper_ordinal(layer)),
            Sexpr::string(layer.clone()),
            Sexpr::atom("signal"),
        ]));
    }
    for (ordinal, name, user_name) in TECHNICAL_LAYERS {
        let mut entry = vec![
            Sexpr::integer(*ordinal),
            Sexpr::string(*name),
            Sexpr::atom("user"),
        ];
        if let Some(user_name) = user_name {
            entry.push(Sexpr::string(*user_name));
        }
        table.push(Sexpr::List(entry));
    }
    table
}

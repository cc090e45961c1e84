// THEORY:
// The `vocabulary` module is the only place that knows how an operator names
// things. Shapes and colors are requested in Dutch (`halve cirkel roze`), matched
// case-insensitively, and turned into closed enums as early as possible so the rest
// of the engine never handles free-form strings.
//
// A `Query` is therefore valid by construction: there is no way to build one for a
// shape or color outside the vocabulary, which is what lets `DetectionSession`
// assume a pre-validated query.

use crate::error::{Result, SeekerError};
use std::fmt;
use std::str::FromStr;

/// The shape categories the engine can recognise, in detection order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ShapeKind {
    Triangle,
    Square,
    Rectangle,
    Circle,
    HalfCircle,
}

impl ShapeKind {
    /// Every shape, in the order the shape tests are evaluated.
    pub const ALL: [ShapeKind; 5] = [
        ShapeKind::Triangle,
        ShapeKind::Square,
        ShapeKind::Rectangle,
        ShapeKind::Circle,
        ShapeKind::HalfCircle,
    ];

    /// The lowercase name an operator types.
    pub fn name(self) -> &'static str {
        match self {
            ShapeKind::Triangle => "driehoek",
            ShapeKind::Square => "vierkant",
            ShapeKind::Rectangle => "rechthoek",
            ShapeKind::Circle => "cirkel",
            ShapeKind::HalfCircle => "halve cirkel",
        }
    }

    /// The capitalised name used on annotations.
    pub fn label(self) -> &'static str {
        match self {
            ShapeKind::Triangle => "Driehoek",
            ShapeKind::Square => "Vierkant",
            ShapeKind::Rectangle => "Rechthoek",
            ShapeKind::Circle => "Cirkel",
            ShapeKind::HalfCircle => "Halve Cirkel",
        }
    }

    pub(crate) fn index(self) -> u16 {
        match self {
            ShapeKind::Triangle => 0,
            ShapeKind::Square => 1,
            ShapeKind::Rectangle => 2,
            ShapeKind::Circle => 3,
            ShapeKind::HalfCircle => 4,
        }
    }

    pub(crate) fn from_index(index: u16) -> Option<Self> {
        Self::ALL.get(index as usize).copied()
    }
}

impl fmt::Display for ShapeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for ShapeKind {
    type Err = SeekerError;

    fn from_str(input: &str) -> Result<Self> {
        let folded = input.to_lowercase();
        ShapeKind::ALL
            .into_iter()
            .find(|shape| shape.name() == folded)
            .ok_or(SeekerError::InvalidShape(folded))
    }
}

/// The named color buckets a sampled color can fall into.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ColorKind {
    Pink,
    Orange,
    Green,
    Yellow,
}

impl ColorKind {
    /// Every color, in classification priority order.
    pub const ALL: [ColorKind; 4] = [
        ColorKind::Pink,
        ColorKind::Orange,
        ColorKind::Green,
        ColorKind::Yellow,
    ];

    pub fn name(self) -> &'static str {
        match self {
            ColorKind::Pink => "roze",
            ColorKind::Orange => "oranje",
            ColorKind::Green => "groen",
            ColorKind::Yellow => "geel",
        }
    }

    pub(crate) fn index(self) -> u16 {
        match self {
            ColorKind::Pink => 0,
            ColorKind::Orange => 1,
            ColorKind::Green => 2,
            ColorKind::Yellow => 3,
        }
    }

    pub(crate) fn from_index(index: u16) -> Option<Self> {
        Self::ALL.get(index as usize).copied()
    }
}

impl fmt::Display for ColorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for ColorKind {
    type Err = SeekerError;

    fn from_str(input: &str) -> Result<Self> {
        let folded = input.to_lowercase();
        ColorKind::ALL
            .into_iter()
            .find(|color| color.name() == folded)
            .ok_or(SeekerError::InvalidColor(folded))
    }
}

/// Display name for a possibly unclassified shape.
pub fn shape_label(shape: Option<ShapeKind>) -> &'static str {
    shape.map_or("Unknown", ShapeKind::label)
}

/// Display name for a possibly unclassified color.
pub fn color_label(color: Option<ColorKind>) -> &'static str {
    color.map_or("Unknown", ColorKind::name)
}

/// What the operator is currently looking for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Query {
    pub shape: ShapeKind,
    pub color: ColorKind,
}

impl Query {
    pub fn new(shape: ShapeKind, color: ColorKind) -> Self {
        Self { shape, color }
    }

    /// Validates a (shape, color) pair of free-form names.
    pub fn from_names(shape: &str, color: &str) -> Result<Self> {
        match (shape.parse::<ShapeKind>(), color.parse::<ColorKind>()) {
            (Ok(shape), Ok(color)) => Ok(Self { shape, color }),
            (Err(_), Err(_)) => Err(SeekerError::InvalidQuery {
                shape: shape.to_lowercase(),
                color: color.to_lowercase(),
            }),
            (Err(e), _) | (_, Err(e)) => Err(e),
        }
    }

    /// Parses `<shape tokens...> <color token>`: the last whitespace separated word
    /// is the color, the words before it joined by single spaces are the shape.
    pub fn parse_words(line: &str) -> Result<Self> {
        let (shape, color) =
            split_query_words(line).ok_or_else(|| SeekerError::MalformedQuery(line.to_string()))?;
        Self::from_names(&shape, &color)
    }
}

impl fmt::Display for Query {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.shape.name(), self.color.name())
    }
}

/// Splits a line into (shape, color) candidates, both lowercased.
/// `None` when the line has fewer than two words.
pub(crate) fn split_query_words(line: &str) -> Option<(String, String)> {
    let mut words: Vec<&str> = line.split_whitespace().collect();
    if words.len() < 2 {
        return None;
    }
    let color = words.pop()?.to_lowercase();
    let shape = words.join(" ").to_lowercase();
    Some((shape, color))
}

/// One line typed by the operator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    /// Quit the program.
    Exit,
    /// Stop searching but keep the camera running.
    Stop,
    /// Search for a new (shape, color) pair.
    Search(Query),
}

impl FromStr for Command {
    type Err = SeekerError;

    fn from_str(line: &str) -> Result<Self> {
        let line = line.trim_end_matches(['\r', '\n']);
        match line {
            "exit" => Ok(Command::Exit),
            "stop" => Ok(Command::Stop),
            _ => Query::parse_words(line).map(Command::Search),
        }
    }
}

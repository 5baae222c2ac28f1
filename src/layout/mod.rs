//! Layout specifications
//!
//! A layout describes which properties are drawn where, in exactly three
//! levels: subplots, axis groups within a subplot (primary axis first, then
//! twin axes) and series overlaid on one axis.
//!
//! Layouts are written either as nested lists or in the string mini-language
//! (`,` between subplots, `-` between axis groups, `+` between series), see
//! [`parse`].

mod parser;

use serde::{Deserialize, Serialize};
use std::fmt;

pub use parser::{parse, Abbreviations, PLACEHOLDER_TOKEN};

/// A leaf of the layout: either a property drawn as a series or a reserved slot
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Leaf {
    /// Reserved slot without a series of its own
    Placeholder,
    /// Series bound to a named property
    Series(String),
}

impl Leaf {
    pub fn series(name: impl Into<String>) -> Self {
        Leaf::Series(name.into())
    }

    /// Property name, `None` for placeholders
    pub fn property(&self) -> Option<&str> {
        match self {
            Leaf::Placeholder => None,
            Leaf::Series(name) => Some(name),
        }
    }
}

impl fmt::Display for Leaf {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Leaf::Placeholder => write!(f, "{}", PLACEHOLDER_TOKEN),
            Leaf::Series(name) => write!(f, "{}", name),
        }
    }
}

/// Unnormalized layout input
///
/// Deserializes from a JSON string, `null` or arbitrarily mixed nested arrays
/// of those.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum LayoutSpec {
    Placeholder,
    Text(String),
    List(Vec<LayoutSpec>),
}

impl LayoutSpec {
    /// List nesting depth (0 for strings and placeholders)
    pub fn depth(&self) -> usize {
        match self {
            LayoutSpec::Placeholder | LayoutSpec::Text(_) => 0,
            LayoutSpec::List(items) => 1 + items.iter().map(|i| i.depth()).max().unwrap_or(0),
        }
    }
}

impl fmt::Display for LayoutSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LayoutSpec::Placeholder => write!(f, "{}", PLACEHOLDER_TOKEN),
            LayoutSpec::Text(text) => write!(f, "{:?}", text),
            LayoutSpec::List(items) => {
                write!(f, "[")?;
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}", item)?;
                }
                write!(f, "]")
            }
        }
    }
}

impl From<&str> for LayoutSpec {
    fn from(text: &str) -> Self {
        LayoutSpec::Text(text.to_string())
    }
}

impl From<String> for LayoutSpec {
    fn from(text: String) -> Self {
        LayoutSpec::Text(text)
    }
}

impl From<Leaf> for LayoutSpec {
    fn from(leaf: Leaf) -> Self {
        match leaf {
            Leaf::Placeholder => LayoutSpec::Placeholder,
            Leaf::Series(name) => LayoutSpec::Text(name),
        }
    }
}

impl<T: Into<LayoutSpec>> From<Option<T>> for LayoutSpec {
    fn from(value: Option<T>) -> Self {
        value.map(Into::into).unwrap_or(LayoutSpec::Placeholder)
    }
}

impl<T: Into<LayoutSpec>> From<Vec<T>> for LayoutSpec {
    fn from(items: Vec<T>) -> Self {
        LayoutSpec::List(items.into_iter().map(Into::into).collect())
    }
}

impl From<&Layout> for LayoutSpec {
    fn from(layout: &Layout) -> Self {
        layout.to_spec()
    }
}

/// Position of one leaf in a normalized layout
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Slot {
    pub subplot: usize,
    pub axis: usize,
    pub series: usize,
    pub leaf: Leaf,
}

/// A normalized layout: subplots, axis groups, leaves
///
/// The flat slot list is derived once on construction and iterated in
/// left-to-right, top-to-bottom order by everything that walks the layout.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Layout {
    subplots: Vec<Vec<Vec<Leaf>>>,
    slots: Vec<Slot>,
}

impl Layout {
    pub(crate) fn from_nested(subplots: Vec<Vec<Vec<Leaf>>>) -> Self {
        let slots = subplots
            .iter()
            .enumerate()
            .flat_map(|(i, groups)| {
                groups.iter().enumerate().flat_map(move |(j, leaves)| {
                    leaves.iter().enumerate().map(move |(k, leaf)| Slot {
                        subplot: i,
                        axis: j,
                        series: k,
                        leaf: leaf.clone(),
                    })
                })
            })
            .collect();
        Self { subplots, slots }
    }

    pub fn subplots(&self) -> &[Vec<Vec<Leaf>>] {
        &self.subplots
    }

    pub fn subplot_count(&self) -> usize {
        self.subplots.len()
    }

    /// Axis groups of one subplot
    pub fn axis_groups(&self, subplot: usize) -> Option<&[Vec<Leaf>]> {
        self.subplots.get(subplot).map(|g| g.as_slice())
    }

    /// Total number of axis groups over all subplots
    pub fn axis_count(&self) -> usize {
        self.subplots.iter().map(|groups| groups.len()).sum()
    }

    /// Number of leaves that are series (placeholders excluded)
    pub fn series_count(&self) -> usize {
        self.series().count()
    }

    pub fn slots(&self) -> &[Slot] {
        &self.slots
    }

    /// Slots holding a series, with their property name
    pub fn series(&self) -> impl Iterator<Item = (&Slot, &str)> {
        self.slots
            .iter()
            .filter_map(|slot| slot.leaf.property().map(|p| (slot, p)))
    }

    /// Distinct property names in first-seen order
    pub fn properties(&self) -> Vec<&str> {
        let mut seen = Vec::new();
        for (_, property) in self.series() {
            if !seen.contains(&property) {
                seen.push(property);
            }
        }
        seen
    }

    /// `(subplot, axis)` of every axis group holding `property`
    pub fn axis_groups_with<'a>(
        &'a self,
        property: &'a str,
    ) -> impl Iterator<Item = (usize, usize)> + 'a {
        self.subplots.iter().enumerate().flat_map(move |(i, groups)| {
            groups.iter().enumerate().filter_map(move |(j, leaves)| {
                leaves
                    .iter()
                    .any(|leaf| leaf.property() == Some(property))
                    .then_some((i, j))
            })
        })
    }

    /// Insert a `[[Placeholder]]` subplot at index 0
    pub fn prepend_placeholder(&mut self) {
        let mut subplots = std::mem::take(&mut self.subplots);
        subplots.insert(0, vec![vec![Leaf::Placeholder]]);
        *self = Layout::from_nested(subplots);
    }

    /// The layout as a fully nested specification
    pub fn to_spec(&self) -> LayoutSpec {
        LayoutSpec::List(
            self.subplots
                .iter()
                .map(|groups| {
                    LayoutSpec::List(
                        groups
                            .iter()
                            .map(|leaves| {
                                LayoutSpec::List(
                                    leaves.iter().cloned().map(LayoutSpec::from).collect(),
                                )
                            })
                            .collect(),
                    )
                })
                .collect(),
        )
    }
}

impl fmt::Display for Layout {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = self
            .subplots
            .iter()
            .map(|groups| {
                groups
                    .iter()
                    .map(|leaves| {
                        leaves
                            .iter()
                            .map(|leaf| leaf.to_string())
                            .collect::<Vec<_>>()
                            .join("+")
                    })
                    .collect::<Vec<_>>()
                    .join("-")
            })
            .collect::<Vec<_>>()
            .join(",");
        write!(f, "{}", text)
    }
}

impl Serialize for Layout {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.to_spec().serialize(serializer)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn layout() -> Layout {
        Layout::from_nested(vec![
            vec![
                vec![Leaf::series("betx"), Leaf::series("bety")],
                vec![Leaf::series("dx")],
            ],
            vec![vec![Leaf::series("x"), Leaf::series("y")]],
        ])
    }

    #[test]
    fn test_slots_in_order() {
        let layout = layout();
        let order: Vec<(usize, usize, usize)> = layout
            .slots()
            .iter()
            .map(|s| (s.subplot, s.axis, s.series))
            .collect();
        assert_eq!(
            order,
            vec![(0, 0, 0), (0, 0, 1), (0, 1, 0), (1, 0, 0), (1, 0, 1)]
        );
        assert_eq!(layout.axis_count(), 3);
        assert_eq!(layout.series_count(), 5);
    }

    #[test]
    fn test_display() {
        assert_eq!(layout().to_string(), "betx+bety-dx,x+y");
    }

    #[test]
    fn test_prepend_placeholder() {
        let mut layout = layout();
        layout.prepend_placeholder();
        assert_eq!(layout.subplot_count(), 3);
        assert_eq!(layout.slots()[0].leaf, Leaf::Placeholder);
        assert_eq!(layout.slots()[1].subplot, 1);
        assert_eq!(layout.series_count(), 5);
        assert_eq!(layout.to_string(), "_,betx+bety-dx,x+y");
    }

    #[test]
    fn test_axis_groups_with() {
        let layout = Layout::from_nested(vec![
            vec![vec![Leaf::series("x")], vec![Leaf::series("betx")]],
            vec![vec![Leaf::series("betx"), Leaf::series("bety")]],
        ]);
        let found: Vec<_> = layout.axis_groups_with("betx").collect();
        assert_eq!(found, vec![(0, 1), (1, 0)]);
        assert_eq!(layout.properties(), vec!["x", "betx", "bety"]);
    }

    #[test]
    fn test_spec_from_nested_vectors() {
        let spec = LayoutSpec::from(vec![vec!["betx", "bety"], vec!["dx"]]);
        assert_eq!(spec.depth(), 2);
        assert_eq!(LayoutSpec::from("bet").depth(), 0);
        assert_eq!(LayoutSpec::from(None::<&str>), LayoutSpec::Placeholder);
    }

    #[test]
    fn test_spec_deserializes_untagged() {
        let spec: LayoutSpec = serde_json::from_str(r#"[[null], "x+y"]"#).unwrap();
        assert_eq!(
            spec,
            LayoutSpec::List(vec![
                LayoutSpec::List(vec![LayoutSpec::Placeholder]),
                LayoutSpec::Text("x+y".to_string()),
            ])
        );
    }
}

//! Layout mini-language parser
//!
//! Three separators with fixed precedence:
//!
//! - `,` separates subplots (outermost)
//! - `-` separates axis groups within a subplot
//! - `+` separates series on one axis (innermost)
//!
//! Abbreviations are substituted on whole tokens before splitting, so with
//! `bet = betx+bety` the layout `bet-dx,x+y` reads as `betx+bety-dx,x+y`.

use regex::Regex;
use std::collections::HashMap;
use std::sync::OnceLock;
use tracing::debug;

use super::{Layout, LayoutSpec, Leaf};
use crate::{PlotError, Result};

/// Token reserving a slot without a series
pub const PLACEHOLDER_TOKEN: &str = "_";

const SEPARATORS: [char; 3] = [',', '-', '+'];
const LEVEL_NAMES: [&str; 3] = ["subplots", "axis groups", "series"];

fn token_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"[^,+\-]+").unwrap())
}

/// Abbreviation table for property groups
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Abbreviations {
    table: HashMap<String, String>,
}

impl Abbreviations {
    pub fn new() -> Self {
        Self::default()
    }

    /// `{p}` expands to `{p}x+{p}y` for every given group
    pub fn plane_pairs(groups: &[&str]) -> Self {
        groups
            .iter()
            .map(|p| (p.to_string(), format!("{p}x+{p}y")))
            .collect()
    }

    pub fn with(mut self, token: impl Into<String>, expansion: impl Into<String>) -> Self {
        self.insert(token, expansion);
        self
    }

    pub fn insert(
        &mut self,
        token: impl Into<String>,
        expansion: impl Into<String>,
    ) -> Option<String> {
        self.table.insert(token.into(), expansion.into())
    }

    pub fn get(&self, token: &str) -> Option<&str> {
        self.table.get(token).map(|s| s.as_str())
    }

    pub fn is_empty(&self) -> bool {
        self.table.is_empty()
    }

    /// Substitute every whole token that has an expansion
    ///
    /// Expansions are expanded again; a token reappearing in its own
    /// expansion chain is an error.
    pub fn expand(&self, text: &str) -> Result<String> {
        if self.table.is_empty() {
            return Ok(text.to_string());
        }
        self.expand_chain(text, &mut Vec::new())
    }

    fn expand_chain(&self, text: &str, chain: &mut Vec<String>) -> Result<String> {
        let mut out = String::with_capacity(text.len());
        let mut last = 0;
        for m in token_regex().find_iter(text) {
            out.push_str(&text[last..m.start()]);
            last = m.end();

            let token = m.as_str().trim();
            let Some(expansion) = self.table.get(token) else {
                out.push_str(m.as_str());
                continue;
            };

            let cyclic = chain.iter().any(|t| t == token);
            chain.push(token.to_string());
            if cyclic {
                return Err(PlotError::spec(
                    token,
                    format!("abbreviation cycle {}", chain.join(" -> ")),
                ));
            }
            let expanded = self.expand_chain(expansion, chain)?;
            chain.pop();
            out.push_str(&expanded);
        }
        out.push_str(&text[last..]);
        Ok(out)
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for Abbreviations {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self {
            table: iter
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }
}

/// Normalize a layout specification into exactly three levels
///
/// - Strings are expanded and split on `,`, `-` and `+`.
/// - Lists shallower than three levels are wrapped at the outer levels: a
///   flat list becomes one subplot with one axis group holding the list. A
///   string holding `-` counts as two levels, so `["bet-dx", "x+y"]` is a
///   list of subplots.
/// - Within lists, a string is split only on the separators below its level.
/// - `_` and `null` are kept as placeholders.
///
/// Property names are not validated here.
pub fn parse(spec: &LayoutSpec, abbreviations: &Abbreviations) -> Result<Layout> {
    let parser = Parser { abbreviations };
    let subplots = match spec {
        LayoutSpec::Text(text) => parser.subplots_from_text(text)?,
        LayoutSpec::Placeholder => vec![vec![vec![Leaf::Placeholder]]],
        LayoutSpec::List(items) => {
            let depth = parser.depth(spec)?;
            if depth > 3 {
                return Err(PlotError::spec(
                    spec.to_string(),
                    format!("nested {} levels deep, at most 3 allowed", depth),
                ));
            }
            // Missing levels are added on the outside
            let mut wrapped = items.clone();
            for _ in depth..3 {
                wrapped = vec![LayoutSpec::List(wrapped)];
            }
            parser.subplots_from_list(&wrapped, spec)?
        }
    };

    let layout = Layout::from_nested(subplots);
    debug!(
        layout = %layout,
        subplots = layout.subplot_count(),
        axes = layout.axis_count(),
        series = layout.series_count(),
        "parsed layout"
    );
    Ok(layout)
}

struct Parser<'a> {
    abbreviations: &'a Abbreviations,
}

impl Parser<'_> {
    /// List nesting depth, with strings counting the levels they split into
    ///
    /// A string with `,` counts like one with `-`, so that the subplot list
    /// rejects it with a separator error.
    fn depth(&self, spec: &LayoutSpec) -> Result<usize> {
        match spec {
            LayoutSpec::Placeholder => Ok(0),
            LayoutSpec::Text(text) => {
                let expanded = self.abbreviations.expand(text)?;
                Ok(if expanded.contains(SEPARATORS[0]) || expanded.contains(SEPARATORS[1]) {
                    2
                } else {
                    0
                })
            }
            LayoutSpec::List(items) => {
                let mut depth = 0;
                for item in items {
                    depth = depth.max(self.depth(item)?);
                }
                Ok(depth + 1)
            }
        }
    }

    fn subplots_from_list(
        &self,
        items: &[LayoutSpec],
        node: &LayoutSpec,
    ) -> Result<Vec<Vec<Vec<Leaf>>>> {
        non_empty(items, node, "layout has no subplots")?;
        items
            .iter()
            .map(|item| match item {
                LayoutSpec::List(groups) => self.groups_from_list(groups, item),
                LayoutSpec::Text(text) => {
                    let expanded = self.expand_at(text, 1)?;
                    groups_from_text(&expanded, text)
                }
                LayoutSpec::Placeholder => Ok(vec![vec![Leaf::Placeholder]]),
            })
            .collect()
    }

    fn groups_from_list(&self, items: &[LayoutSpec], node: &LayoutSpec) -> Result<Vec<Vec<Leaf>>> {
        non_empty(items, node, "subplot has no axis groups")?;
        items
            .iter()
            .map(|item| match item {
                LayoutSpec::List(leaves) => self.series_from_list(leaves, item),
                LayoutSpec::Text(text) => {
                    let expanded = self.expand_at(text, 2)?;
                    series_from_text(&expanded, text)
                }
                LayoutSpec::Placeholder => Ok(vec![Leaf::Placeholder]),
            })
            .collect()
    }

    fn series_from_list(&self, items: &[LayoutSpec], node: &LayoutSpec) -> Result<Vec<Leaf>> {
        non_empty(items, node, "axis group has no series")?;
        let mut leaves = Vec::with_capacity(items.len());
        for item in items {
            match item {
                LayoutSpec::Text(text) => {
                    let expanded = self.expand_at(text, 2)?;
                    leaves.extend(series_from_text(&expanded, text)?);
                }
                LayoutSpec::Placeholder => leaves.push(Leaf::Placeholder),
                LayoutSpec::List(_) => {
                    return Err(PlotError::spec(
                        item.to_string(),
                        "list nested below the series level",
                    ))
                }
            }
        }
        Ok(leaves)
    }

    /// Expand a string found at `level` and reject separators of outer levels
    fn expand_at(&self, text: &str, level: usize) -> Result<String> {
        let expanded = self.abbreviations.expand(text)?;
        for (outer, separator) in SEPARATORS.iter().enumerate().take(level) {
            if expanded.contains(*separator) {
                let shown = if expanded == text {
                    text.to_string()
                } else {
                    format!("{} (expanded to {})", text, expanded)
                };
                return Err(PlotError::spec(
                    shown,
                    format!(
                        "'{}' separates {} and cannot appear at the {} level",
                        separator, LEVEL_NAMES[outer], LEVEL_NAMES[level]
                    ),
                ));
            }
        }
        Ok(expanded)
    }

    fn subplots_from_text(&self, text: &str) -> Result<Vec<Vec<Vec<Leaf>>>> {
        let expanded = self.abbreviations.expand(text)?;
        expanded
            .split(SEPARATORS[0])
            .map(|piece| groups_from_text(piece, text))
            .collect()
    }
}

fn groups_from_text(text: &str, original: &str) -> Result<Vec<Vec<Leaf>>> {
    text.split(SEPARATORS[1])
        .map(|piece| series_from_text(piece, original))
        .collect()
}

fn series_from_text(text: &str, original: &str) -> Result<Vec<Leaf>> {
    text.split(SEPARATORS[2])
        .map(|token| leaf_from_token(token, original))
        .collect()
}

fn leaf_from_token(token: &str, original: &str) -> Result<Leaf> {
    let token = token.trim();
    if token.is_empty() {
        return Err(PlotError::spec(original, "empty property name"));
    }
    if token.chars().any(char::is_whitespace) {
        return Err(PlotError::spec(
            token,
            "property names cannot contain whitespace",
        ));
    }
    if token == PLACEHOLDER_TOKEN {
        return Ok(Leaf::Placeholder);
    }
    Ok(Leaf::Series(token.to_string()))
}

fn non_empty(items: &[LayoutSpec], node: &LayoutSpec, message: &str) -> Result<()> {
    if items.is_empty() {
        return Err(PlotError::spec(node.to_string(), message));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn twiss_abbreviations() -> Abbreviations {
        Abbreviations::plane_pairs(&["alf", "bet", "gam", "mu", "d", "dp", "q", "dq"])
    }

    fn nested(layout: &Layout) -> Vec<Vec<Vec<String>>> {
        layout
            .subplots()
            .iter()
            .map(|groups| {
                groups
                    .iter()
                    .map(|leaves| leaves.iter().map(|l| l.to_string()).collect())
                    .collect()
            })
            .collect()
    }

    fn parse_str(text: &str) -> Layout {
        parse(&LayoutSpec::from(text), &twiss_abbreviations()).unwrap()
    }

    #[test]
    fn test_twiss_default_layout() {
        let layout = parse_str("bet-dx,x+y");
        assert_eq!(
            nested(&layout),
            vec![
                vec![vec!["betx", "bety"], vec!["dx"]],
                vec![vec!["x", "y"]],
            ]
        );
        assert_eq!(layout.subplot_count(), 2);
        assert_eq!(layout.axis_groups(0).unwrap().len(), 2);
        assert_eq!(layout.axis_groups(1).unwrap().len(), 1);
        assert_eq!(layout.series_count(), 5);
    }

    #[test]
    fn test_whitespace_is_insignificant() {
        assert_eq!(parse_str(" bet - dx ,  x + y "), parse_str("bet-dx,x+y"));
    }

    #[test]
    fn test_abbreviation_confluence() {
        assert_eq!(parse_str("bet"), parse_str("betx+bety"));
        assert_eq!(parse_str("d-dp"), parse_str("dx+dy-dpx+dpy"));
    }

    #[test]
    fn test_abbreviation_whole_tokens_only() {
        // "dx" must not be read as abbreviation "d" followed by "x"
        let layout = parse_str("dx+dpx");
        assert_eq!(nested(&layout), vec![vec![vec!["dx", "dpx"]]]);
    }

    #[test]
    fn test_nested_abbreviations() {
        let abbr = Abbreviations::new()
            .with("optics", "bet-d")
            .with("bet", "betx+bety")
            .with("d", "dx");
        let layout = parse(&LayoutSpec::from("optics,x"), &abbr).unwrap();
        assert_eq!(
            nested(&layout),
            vec![vec![vec!["betx", "bety"], vec!["dx"]], vec![vec!["x"]]]
        );
    }

    #[test]
    fn test_abbreviation_cycle() {
        let abbr = Abbreviations::new().with("a", "b+c").with("b", "a");
        let err = parse(&LayoutSpec::from("a,x"), &abbr).unwrap_err();
        match err {
            PlotError::SpecificationError { fragment, message } => {
                assert_eq!(fragment, "a");
                assert!(message.contains("a -> b -> a"), "{}", message);
            }
            other => panic!("unexpected error {:?}", other),
        }
    }

    #[test]
    fn test_self_referencing_abbreviation() {
        let abbr = Abbreviations::new().with("x", "x+y");
        assert!(parse(&LayoutSpec::from("x"), &abbr).is_err());
    }

    #[test]
    fn test_bare_leaf_is_wrapped() {
        let layout = parse_str("betx");
        assert_eq!(nested(&layout), vec![vec![vec!["betx"]]]);

        let layout = parse(&LayoutSpec::Placeholder, &Abbreviations::new()).unwrap();
        assert_eq!(layout.subplots(), &[vec![vec![Leaf::Placeholder]]]);
        assert_eq!(layout.series_count(), 0);
    }

    #[test]
    fn test_flat_list_is_one_axis_group() {
        let spec = LayoutSpec::from(vec!["bet", "x+y"]);
        let layout = parse(&spec, &twiss_abbreviations()).unwrap();
        assert_eq!(nested(&layout), vec![vec![vec!["betx", "bety", "x", "y"]]]);
    }

    #[test]
    fn test_list_of_subplot_strings() {
        let spec = LayoutSpec::from(vec!["bet-dx", "x+y"]);
        let layout = parse(&spec, &twiss_abbreviations()).unwrap();
        assert_eq!(
            nested(&layout),
            vec![
                vec![vec!["betx", "bety"], vec!["dx"]],
                vec![vec!["x", "y"]],
            ]
        );
        assert_eq!(layout, parse_str("bet-dx,x+y"));

        // Abbreviations are expanded before the depth is taken
        let abbr = twiss_abbreviations().with("optics", "bet-d");
        let layout = parse(&LayoutSpec::from(vec!["optics", "x"]), &abbr).unwrap();
        assert_eq!(layout.subplot_count(), 2);
        assert_eq!(layout.axis_groups(0).unwrap().len(), 2);

        let err = parse(&LayoutSpec::from(vec!["bet,dx", "x"]), &twiss_abbreviations());
        assert!(matches!(err, Err(PlotError::SpecificationError { .. })));
    }

    #[test]
    fn test_two_level_list_is_one_subplot() {
        let spec = LayoutSpec::from(vec![vec!["betx", "bety"], vec!["dx"]]);
        let layout = parse(&spec, &Abbreviations::new()).unwrap();
        assert_eq!(
            nested(&layout),
            vec![vec![vec!["betx", "bety"], vec!["dx"]]]
        );
    }

    #[test]
    fn test_mixed_lists_and_strings() {
        let spec = LayoutSpec::List(vec![
            LayoutSpec::List(vec![LayoutSpec::from(vec!["betx"]), LayoutSpec::from("dx+dy")]),
            LayoutSpec::from("x-y"),
            LayoutSpec::Placeholder,
        ]);
        let layout = parse(&spec, &Abbreviations::new()).unwrap();
        assert_eq!(
            nested(&layout),
            vec![
                vec![vec!["betx"], vec!["dx", "dy"]],
                vec![vec!["x"], vec!["y"]],
                vec![vec!["_"]],
            ]
        );
    }

    #[test]
    fn test_placeholder_token() {
        let layout = parse_str("_,bet");
        assert_eq!(layout.slots()[0].leaf, Leaf::Placeholder);
        assert_eq!(layout.series_count(), 2);
    }

    #[test]
    fn test_separator_at_wrong_level() {
        let spec = LayoutSpec::from(vec![vec![vec!["betx-bety"]]]);
        let err = parse(&spec, &Abbreviations::new()).unwrap_err();
        match err {
            PlotError::SpecificationError { fragment, message } => {
                assert_eq!(fragment, "betx-bety");
                assert!(message.contains("'-'"));
            }
            other => panic!("unexpected error {:?}", other),
        }

        let spec = LayoutSpec::from(vec![vec!["x,y"]]);
        assert!(parse(&spec, &Abbreviations::new()).is_err());
    }

    #[test]
    fn test_expansion_at_wrong_level() {
        let abbr = Abbreviations::new().with("orbit", "x-y");
        let spec = LayoutSpec::from(vec!["orbit"]);
        let err = parse(&spec, &abbr).unwrap_err();
        assert!(err.to_string().contains("expanded to x-y"), "{}", err);
    }

    #[test]
    fn test_too_deep() {
        let spec = LayoutSpec::from(vec![vec![vec![vec!["x"]]]]);
        assert!(matches!(
            parse(&spec, &Abbreviations::new()),
            Err(PlotError::SpecificationError { .. })
        ));
    }

    #[test]
    fn test_empty_pieces() {
        for text in ["", "x,,y", "x-", "+y", "x, ,y"] {
            assert!(
                parse(&LayoutSpec::from(text), &Abbreviations::new()).is_err(),
                "accepted {:?}",
                text
            );
        }
        assert!(parse(&LayoutSpec::List(vec![]), &Abbreviations::new()).is_err());
        let spec = LayoutSpec::List(vec![LayoutSpec::List(vec![LayoutSpec::List(vec![])])]);
        assert!(parse(&spec, &Abbreviations::new()).is_err());
    }

    #[test]
    fn test_unknown_properties_pass() {
        let layout = parse_str("whatever+nonsense");
        assert_eq!(layout.properties(), vec!["whatever", "nonsense"]);
    }

    fn layout_strategy() -> impl Strategy<Value = Vec<Vec<Vec<String>>>> {
        let name = "[a-z][a-z0-9]{0,5}";
        prop::collection::vec(
            prop::collection::vec(prop::collection::vec(name, 1..4), 1..4),
            1..4,
        )
    }

    fn join(groups: &[Vec<Vec<String>>]) -> String {
        groups
            .iter()
            .map(|g| {
                g.iter()
                    .map(|s| s.join("+"))
                    .collect::<Vec<_>>()
                    .join("-")
            })
            .collect::<Vec<_>>()
            .join(",")
    }

    proptest! {
        #[test]
        fn prop_parse_string_is_three_levels(groups in layout_strategy()) {
            let text = join(&groups);
            let layout = parse(&LayoutSpec::from(text.as_str()), &Abbreviations::new()).unwrap();
            prop_assert_eq!(nested(&layout), groups);
            prop_assert_eq!(layout.to_spec().depth(), 3);
            prop_assert_eq!(layout.to_string(), text);
        }

        #[test]
        fn prop_parse_is_idempotent(groups in layout_strategy()) {
            let abbr = twiss_abbreviations();
            let once = parse(&LayoutSpec::from(join(&groups)), &abbr).unwrap();
            let twice = parse(&once.to_spec(), &abbr).unwrap();
            prop_assert_eq!(once, twice);
        }

        #[test]
        fn prop_nested_list_matches_string(groups in layout_strategy()) {
            let abbr = Abbreviations::new();
            let from_list = parse(&LayoutSpec::from(groups.clone()), &abbr).unwrap();
            let from_text = parse(&LayoutSpec::from(join(&groups)), &abbr).unwrap();
            prop_assert_eq!(from_list, from_text);
        }

        #[test]
        fn prop_abbreviation_confluence(groups in layout_strategy()) {
            let abbr = twiss_abbreviations();
            let text = join(&groups);
            let abbreviated = format!("bet-{}", text);
            let manual = format!("betx+bety-{}", text);
            prop_assert_eq!(
                parse(&LayoutSpec::from(abbreviated), &abbr).unwrap(),
                parse(&LayoutSpec::from(manual), &abbr).unwrap()
            );
        }
    }
}

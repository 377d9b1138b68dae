//! Text outline of a concept tree
//!
//! Rows are numbered in display order so a terminal front end can address
//! nodes without exposing ids. Traversal is iterative.

use crate::config::DisplayConfig;
use crate::store::MindMapState;
use crate::tree::ConceptTree;
use crate::types::NodeId;
use std::fmt::Write;

/// Shown while the root is being generated
pub const GENERATING_MESSAGE: &str = "Building your knowledge map...";

/// Shown when there is no tree yet
pub const EMPTY_MESSAGE: &str = "Enter a concept to generate a mind map.";

struct Glyphs {
    tee: &'static str,
    last: &'static str,
    pipe: &'static str,
    blank: &'static str,
}

const UNICODE: Glyphs = Glyphs {
    tee: "├── ",
    last: "└── ",
    pipe: "│   ",
    blank: "    ",
};

const ASCII: Glyphs = Glyphs {
    tee: "|-- ",
    last: "`-- ",
    pipe: "|   ",
    blank: "    ",
};

/// Rendered outline plus the node behind each numbered row
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Outline {
    /// Display text
    pub text: String,
    /// `rows[n - 1]` is the node on row `n`
    pub rows: Vec<NodeId>,
}

impl Outline {
    /// Node shown on 1-based `row`
    #[must_use]
    pub fn node_at(&self, row: usize) -> Option<NodeId> {
        row.checked_sub(1).and_then(|i| self.rows.get(i)).copied()
    }
}

/// Render the visible part of `tree`
#[must_use]
pub fn render_outline(tree: &ConceptTree, options: &DisplayConfig) -> Outline {
    let glyphs = if options.ascii { &ASCII } else { &UNICODE };
    let mut outline = Outline::default();

    // Each entry carries one "is last sibling" flag per level below the root.
    let mut stack: Vec<(NodeId, Vec<bool>)> = vec![(tree.root_id(), Vec::new())];
    while let Some((id, guides)) = stack.pop() {
        let Some(record) = tree.get(id) else {
            continue;
        };
        outline.rows.push(id);
        let row = outline.rows.len();

        let mut lead = String::new();
        let mut continuation = String::new();
        if let Some((is_last, ancestors)) = guides.split_last() {
            for last in ancestors {
                lead.push_str(if *last { glyphs.blank } else { glyphs.pipe });
            }
            continuation.push_str(&lead);
            continuation.push_str(if *is_last { glyphs.blank } else { glyphs.pipe });
            lead.push_str(if *is_last { glyphs.last } else { glyphs.tee });
        }

        let marker = if record.is_loading {
            "[~]"
        } else if record.is_expanded {
            "[-]"
        } else {
            "[+]"
        };
        let _ = writeln!(outline.text, "{row:>3} {lead}{marker} {}", record.name);

        let visible_kids = if record.is_expanded {
            tree.children(id).filter(|kids| !kids.is_empty())
        } else {
            None
        };

        if options.show_descriptions {
            if let Some(description) = &record.description {
                let rail = if visible_kids.is_some() {
                    glyphs.pipe
                } else {
                    glyphs.blank
                };
                let _ = writeln!(outline.text, "    {continuation}{rail}{description}");
            }
        }

        if let Some(kids) = visible_kids {
            let last_index = kids.len() - 1;
            for (i, kid) in kids.iter().enumerate().rev() {
                let mut kid_guides = guides.clone();
                kid_guides.push(i == last_index);
                stack.push((*kid, kid_guides));
            }
        }
    }

    outline
}

/// Render the whole tree panel: progress, empty state, or outline, plus the error line
#[must_use]
pub fn render_state(state: &MindMapState, options: &DisplayConfig) -> Outline {
    let mut outline = match state.tree() {
        Some(tree) => render_outline(tree, options),
        None if state.is_generating() => Outline {
            text: format!("{GENERATING_MESSAGE}\n"),
            rows: Vec::new(),
        },
        None => Outline {
            text: format!("{EMPTY_MESSAGE}\n"),
            rows: Vec::new(),
        },
    };
    if let Some(error) = state.error() {
        let _ = writeln!(outline.text, "! {error}");
    }
    outline
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::ConceptData;
    use pretty_assertions::assert_eq;

    fn plain() -> DisplayConfig {
        DisplayConfig {
            show_descriptions: false,
            ascii: true,
        }
    }

    fn calculus() -> ConceptTree {
        ConceptTree::with_root(
            "Calculus",
            ConceptData::new("Study of change.", ["Limits", "Derivatives", "Integrals"]),
        )
    }

    #[test]
    fn renders_root_and_children() {
        let tree = calculus();
        let outline = render_outline(&tree, &plain());

        assert_eq!(
            outline.text,
            "  1 [-] Calculus\n  2 |-- [+] Limits\n  3 |-- [+] Derivatives\n  4 `-- [+] Integrals\n"
        );
        assert_eq!(outline.rows.len(), 4);
        assert_eq!(outline.node_at(1), Some(tree.root_id()));
        assert_eq!(outline.node_at(0), None);
        assert_eq!(outline.node_at(5), None);
    }

    #[test]
    fn nested_rows_use_guides() {
        let mut tree = calculus();
        let limits = tree.children(tree.root_id()).unwrap()[0];
        tree.begin_fetch(limits).unwrap();
        tree.complete_fetch(limits, ConceptData::new("Approach.", ["Epsilon-delta", "One-sided"]))
            .unwrap();
        let integrals = tree.children(tree.root_id()).unwrap()[2];
        tree.begin_fetch(integrals).unwrap();

        let outline = render_outline(&tree, &plain());
        assert_eq!(
            outline.text,
            concat!(
                "  1 [-] Calculus\n",
                "  2 |-- [-] Limits\n",
                "  3 |   |-- [+] Epsilon-delta\n",
                "  4 |   `-- [+] One-sided\n",
                "  5 |-- [+] Derivatives\n",
                "  6 `-- [~] Integrals\n",
            )
        );
        assert_eq!(outline.node_at(2), Some(limits));
    }

    #[test]
    fn descriptions_follow_their_node() {
        let tree = ConceptTree::with_root("Sets", ConceptData::new("Collections.", ["Union"]));
        let options = DisplayConfig {
            show_descriptions: true,
            ascii: true,
        };
        let outline = render_outline(&tree, &options);
        assert_eq!(
            outline.text,
            "  1 [-] Sets\n    |   Collections.\n  2 `-- [+] Union\n"
        );
    }

    #[test]
    fn empty_state_message() {
        let state = MindMapState::default();
        let outline = render_state(&state, &plain());
        assert_eq!(outline.text, format!("{EMPTY_MESSAGE}\n"));
        assert!(outline.rows.is_empty());
    }
}

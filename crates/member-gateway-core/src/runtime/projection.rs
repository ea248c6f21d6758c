// crates/member-gateway-core/src/runtime/projection.rs
// ============================================================================
// Module: Member Gateway Query Projection
// Description: Selection-tree flattening and backend document construction.
// Purpose: Forward exactly the fields a client asked for to the backend.
// Dependencies: thiserror
// ============================================================================

//! ## Overview
//! A client selection tree is flattened into dotted field paths in pre-order.
//! [`FieldPaths`] walks the tree lazily with an explicit stack, so arbitrarily
//! deep selections never recurse. [`build_document`] folds the paths back
//! into a backend document: fields with nested selections open a block, leaf
//! fields become one line each, and repeated paths are emitted once in the
//! order they were first requested.
//!
//! Every emitted name is validated against the GraphQL name grammar so
//! client-controlled text cannot inject document syntax.

// ============================================================================
// SECTION: Imports
// ============================================================================

use thiserror::Error;

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Projection errors.
///
/// # Invariants
/// - Variants are stable for programmatic handling.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ProjectionError {
    /// A field or argument name is not a valid GraphQL name.
    #[error("invalid field name: {0:?}")]
    InvalidName(String),
    /// The projection selected no fields.
    #[error("selection set is empty")]
    EmptySelection,
}

// ============================================================================
// SECTION: Selection Tree
// ============================================================================

/// One field in a client selection tree.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SelectionNode {
    /// Field name.
    pub name: String,
    /// Nested selections.
    pub children: Vec<Self>,
}

impl SelectionNode {
    /// Creates a leaf selection.
    #[must_use]
    pub fn leaf(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            children: Vec::new(),
        }
    }

    /// Creates a selection with nested children.
    #[must_use]
    pub fn with_children(name: impl Into<String>, children: Vec<Self>) -> Self {
        Self {
            name: name.into(),
            children,
        }
    }
}

/// Lazy pre-order iterator over dotted field paths.
pub struct FieldPaths<'a> {
    /// Pending nodes paired with their parent path.
    stack: Vec<(Option<String>, &'a SelectionNode)>,
}

impl<'a> FieldPaths<'a> {
    /// Starts a walk over the given root selections.
    #[must_use]
    pub fn new(roots: &'a [SelectionNode]) -> Self {
        Self {
            stack: roots.iter().rev().map(|node| (None, node)).collect(),
        }
    }
}

impl Iterator for FieldPaths<'_> {
    type Item = String;

    fn next(&mut self) -> Option<Self::Item> {
        let (parent, node) = self.stack.pop()?;
        let path = match parent {
            Some(parent) => format!("{parent}.{}", node.name),
            None => node.name.clone(),
        };
        for child in node.children.iter().rev() {
            self.stack.push((Some(path.clone()), child));
        }
        Some(path)
    }
}

// ============================================================================
// SECTION: Projection
// ============================================================================

/// Ordered dotted field paths selected by a client.
///
/// # Invariants
/// - Every segment of every path is a valid GraphQL name.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct FieldProjection {
    /// Paths in pre-order.
    paths: Vec<String>,
}

impl FieldProjection {
    /// Validates and wraps pre-built dotted paths.
    ///
    /// # Errors
    ///
    /// Returns [`ProjectionError::InvalidName`] when any segment is invalid.
    pub fn from_paths(paths: Vec<String>) -> Result<Self, ProjectionError> {
        for path in &paths {
            for segment in path.split('.') {
                validate_name(segment)?;
            }
        }
        Ok(Self {
            paths,
        })
    }

    /// Returns the paths in pre-order.
    #[must_use]
    pub fn paths(&self) -> &[String] {
        &self.paths
    }

    /// Returns true when no fields are selected.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.paths.is_empty()
    }
}

/// Flattens a selection tree into a validated projection.
///
/// # Errors
///
/// Returns [`ProjectionError::InvalidName`] when a field name is invalid.
pub fn project(selections: &[SelectionNode]) -> Result<FieldProjection, ProjectionError> {
    FieldProjection::from_paths(FieldPaths::new(selections).collect())
}

/// Returns an error unless `name` matches `[_A-Za-z][_0-9A-Za-z]*`.
///
/// # Errors
///
/// Returns [`ProjectionError::InvalidName`] for any other text.
pub fn validate_name(name: &str) -> Result<(), ProjectionError> {
    let mut chars = name.chars();
    let valid = chars.next().is_some_and(|first| first == '_' || first.is_ascii_alphabetic())
        && chars.all(|ch| ch == '_' || ch.is_ascii_alphanumeric());
    if valid { Ok(()) } else { Err(ProjectionError::InvalidName(name.to_string())) }
}

// ============================================================================
// SECTION: Document Builder
// ============================================================================

/// GraphQL operation kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OperationKind {
    /// Read operation.
    Query,
    /// Write operation.
    Mutation,
}

impl OperationKind {
    /// Returns the document keyword.
    #[must_use]
    pub const fn keyword(self) -> &'static str {
        match self {
            Self::Query => "query",
            Self::Mutation => "mutation",
        }
    }
}

/// Header and root field of a backend document.
#[derive(Debug, Clone, Copy)]
pub struct DocumentShape<'a> {
    /// Operation kind.
    pub kind: OperationKind,
    /// Variable declarations without parentheses, e.g. `$id: String!`.
    pub variables: &'a str,
    /// Root field with arguments, e.g. `member(firebaseId: $firebaseId)`.
    pub root: &'a str,
}

/// Field in the document being assembled.
struct DocumentField<'a> {
    /// Path segment.
    name: &'a str,
    /// Indices of nested fields in request order.
    children: Vec<usize>,
}

/// Step of the document walk.
enum Emit {
    /// Write the field, opening a block when it has children.
    Field(usize),
    /// Close a nested block.
    Close,
}

/// Builds a backend document selecting the projected fields.
///
/// # Errors
///
/// Returns [`ProjectionError::EmptySelection`] when nothing is selected.
pub fn build_document(shape: DocumentShape<'_>, projection: &FieldProjection) -> Result<String, ProjectionError> {
    if projection.is_empty() {
        return Err(ProjectionError::EmptySelection);
    }
    let mut fields: Vec<DocumentField<'_>> = Vec::new();
    let mut roots: Vec<usize> = Vec::new();
    for path in projection.paths() {
        let mut parent: Option<usize> = None;
        for segment in path.split('.') {
            let siblings = parent.map_or(&roots, |index| &fields[index].children);
            let index = match siblings.iter().copied().find(|&index| fields[index].name == segment) {
                Some(index) => index,
                None => {
                    fields.push(DocumentField {
                        name: segment,
                        children: Vec::new(),
                    });
                    let index = fields.len() - 1;
                    match parent {
                        Some(parent) => fields[parent].children.push(index),
                        None => roots.push(index),
                    }
                    index
                }
            };
            parent = Some(index);
        }
    }

    let mut lines = Vec::with_capacity(fields.len() * 2 + 4);
    if shape.variables.is_empty() {
        lines.push(format!("{} {{", shape.kind.keyword()));
    } else {
        lines.push(format!("{}({}) {{", shape.kind.keyword(), shape.variables));
    }
    lines.push(format!("{} {{", shape.root));
    let mut pending: Vec<Emit> = roots.iter().rev().map(|&index| Emit::Field(index)).collect();
    while let Some(step) = pending.pop() {
        match step {
            Emit::Close => lines.push("}".to_string()),
            Emit::Field(index) => {
                let field = &fields[index];
                if field.children.is_empty() {
                    lines.push(field.name.to_string());
                } else {
                    lines.push(format!("{} {{", field.name));
                    pending.push(Emit::Close);
                    pending.extend(field.children.iter().rev().map(|&child| Emit::Field(child)));
                }
            }
        }
    }
    lines.push("}".to_string());
    lines.push("}".to_string());
    Ok(lines.join("\n"))
}

// ============================================================================
// SECTION: Tests
// ============================================================================

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, reason = "Test-only assertions are permitted.")]

    use super::*;

    #[test]
    fn walks_selections_in_pre_order() {
        let tree = vec![
            SelectionNode::leaf("a"),
            SelectionNode::with_children("b", vec![SelectionNode::leaf("c"), SelectionNode::leaf("d")]),
        ];
        let paths: Vec<String> = FieldPaths::new(&tree).collect();
        assert_eq!(paths, vec!["a", "b", "b.c", "b.d"]);
    }

    #[test]
    fn walk_is_lazy() {
        let tree = vec![SelectionNode::leaf("a"), SelectionNode::leaf("b")];
        let mut walk = FieldPaths::new(&tree);
        assert_eq!(walk.next().as_deref(), Some("a"));
        assert_eq!(walk.stack.len(), 1);
    }

    #[test]
    fn builds_nested_block_for_leaf_paths() {
        let projection =
            FieldProjection::from_paths(vec!["a".into(), "b.c".into(), "b.d".into()]).unwrap();
        let document = build_document(
            DocumentShape {
                kind: OperationKind::Query,
                variables: "$firebaseId: String!",
                root: "member(firebaseId: $firebaseId)",
            },
            &projection,
        )
        .unwrap();
        assert_eq!(
            document,
            "query($firebaseId: String!) {\nmember(firebaseId: $firebaseId) {\na\nb {\nc\nd\n}\n}\n}"
        );
    }

    #[test]
    fn outer_fields_are_deduplicated_in_request_order() {
        let projection =
            FieldProjection::from_paths(vec!["b".into(), "a".into(), "b.c".into(), "a".into()]).unwrap();
        let document = build_document(
            DocumentShape {
                kind: OperationKind::Mutation,
                variables: "",
                root: "deleteMember",
            },
            &projection,
        )
        .unwrap();
        assert_eq!(document, "mutation {\ndeleteMember {\nb {\nc\n}\na\n}\n}");
    }

    #[test]
    fn deep_selections_keep_their_nesting() {
        let projection = FieldProjection::from_paths(vec![
            "profile".into(),
            "profile.address".into(),
            "profile.address.city".into(),
            "profile.nickname".into(),
            "id".into(),
        ])
        .unwrap();
        let document = build_document(
            DocumentShape {
                kind: OperationKind::Query,
                variables: "",
                root: "member",
            },
            &projection,
        )
        .unwrap();
        assert_eq!(document, "query {\nmember {\nprofile {\naddress {\ncity\n}\nnickname\n}\nid\n}\n}");
    }

    #[test]
    fn rejects_invalid_names_and_empty_selection() {
        assert_eq!(
            project(&[SelectionNode::leaf("a}b")]),
            Err(ProjectionError::InvalidName("a}b".to_string()))
        );
        assert!(validate_name("").is_err());
        assert!(validate_name("9lives").is_err());
        assert!(validate_name("_typename2").is_ok());
        let shape = DocumentShape {
            kind: OperationKind::Query,
            variables: "",
            root: "member",
        };
        assert_eq!(
            build_document(shape, &FieldProjection::default()),
            Err(ProjectionError::EmptySelection)
        );
    }
}

use super::{Accumulator, Pass};
use crate::ast::{DeclKind, Node, NodeId, Tree};
use tracing::debug;

/// Adds the accumulator's import when the file refers to its package but
/// does not import it.
pub struct ImportPass {
    accumulator: Accumulator,
}

impl ImportPass {
    pub fn new(accumulator: Accumulator) -> Self {
        Self { accumulator }
    }
}

impl Pass for ImportPass {
    fn name(&self) -> &'static str {
        "import-resolver"
    }

    fn run(&mut self, tree: &mut Tree) -> usize {
        let acc = self.accumulator;
        if !references_package(tree, acc.package) || has_import(tree, acc) {
            return 0;
        }
        add_import(tree, acc.import_path);
        debug!(path = acc.import_path, "added import");
        1
    }
}

/// Any selector `pkg.X` in the file.
pub fn references_package(tree: &Tree, package: &str) -> bool {
    tree.preorder(tree.root()).any(|id| match tree.get(id) {
        Node::Selector { x, .. } => matches!(tree.get(*x), Node::Ident(name) if name == package),
        _ => false,
    })
}

/// An import of the accumulator's path under its own package name.
pub fn has_import(tree: &Tree, acc: Accumulator) -> bool {
    import_specs(tree).into_iter().any(|spec| match tree.get(spec) {
        Node::ImportSpec { name, path } => {
            unquote(path) == acc.import_path
                && name.as_deref().map_or(true, |name| name == acc.package)
        }
        _ => false,
    })
}

fn import_specs(tree: &Tree) -> Vec<NodeId> {
    let Node::File { decls, .. } = tree.get(tree.root()) else {
        return Vec::new();
    };
    decls
        .iter()
        .filter_map(|&decl| match tree.get(decl) {
            Node::GenDecl {
                kind: DeclKind::Import,
                specs,
                ..
            } => Some(specs.clone()),
            _ => None,
        })
        .flatten()
        .collect()
}

fn unquote(path: &str) -> &str {
    path.trim_matches(|c| c == '"' || c == '`')
}

/// Inserts `import "<path>"`. It joins the first import declaration at its
/// sorted position within the first blank-line-separated group; a file
/// without imports gets a new declaration after the package clause.
fn add_import(tree: &mut Tree, path: &str) {
    let root = tree.root();
    let spec = tree.alloc(Node::ImportSpec {
        name: None,
        path: format!("\"{path}\""),
    });

    let first_import = match tree.get(root) {
        Node::File { decls, .. } => decls.iter().copied().find(|&decl| {
            matches!(
                tree.get(decl),
                Node::GenDecl {
                    kind: DeclKind::Import,
                    ..
                }
            )
        }),
        _ => return,
    };

    let Some(decl) = first_import else {
        let decl = tree.alloc(Node::GenDecl {
            kind: DeclKind::Import,
            specs: vec![spec],
            grouped: false,
        });
        if let Node::File { decls, .. } = tree.get_mut(root) {
            decls.insert(0, decl);
        }
        return;
    };

    let position = match tree.get(decl) {
        Node::GenDecl { specs, .. } => {
            let group_end = specs
                .iter()
                .enumerate()
                .skip(1)
                .find(|&(_, &spec)| starts_group(tree, spec))
                .map_or(specs.len(), |(i, _)| i);
            specs[..group_end]
                .iter()
                .position(|&existing| match tree.get(existing) {
                    Node::ImportSpec { path: existing, .. } => unquote(existing) > path,
                    _ => false,
                })
                .unwrap_or(group_end)
        }
        _ => return,
    };
    if let Node::GenDecl { specs, grouped, .. } = tree.get_mut(decl) {
        specs.insert(position, spec);
        *grouped = true;
    }
}

/// A blank line above the spec, or above its first comment, starts a new
/// group.
fn starts_group(tree: &Tree, spec: NodeId) -> bool {
    tree.trivia(spec).is_some_and(|trivia| {
        trivia.blank_before
            || trivia
                .leading
                .first()
                .is_some_and(|comment| comment.blank_before)
    })
}

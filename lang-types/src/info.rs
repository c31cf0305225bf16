#![forbid(unsafe_code)]

use std::collections::HashMap;

use lang_ast::NodeId;
use lang_lex::Pos;

use crate::types::Type;

/// A bound name: the node that declared it, where, and its type.
#[derive(Clone, Debug, PartialEq)]
pub struct Object {
    pub decl: NodeId,
    pub pos: Pos,
    pub ty: Type,
}

/// Side tables produced by the checker and consumed by the translator.
///
/// `types` maps every well-typed expression to its type; `uses` maps every
/// identifier occurrence (including the declaring one) to the object it
/// resolves to. Both are keyed by node identity.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Info {
    pub types: HashMap<NodeId, Object>,
    pub uses: HashMap<NodeId, Object>,
}

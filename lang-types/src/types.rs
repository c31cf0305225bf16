#![forbid(unsafe_code)]

use std::fmt;

/// A semantic type. Distinct from the syntactic type nodes in the AST: the
/// checker resolves syntax into these and the translator sizes stack slots
/// from them.
///
/// Equality is structural: scalars match by kind, functions match when the
/// parameter lists and result match. The derived `PartialEq` gives exactly
/// that.
#[derive(Clone, Debug, PartialEq)]
pub enum Type {
    Bool,
    F64,
    I64,
    String,
    Func(FuncSig),
}

#[derive(Clone, Debug, PartialEq)]
pub struct FuncSig {
    pub params: Vec<Type>,
    pub result: Box<Type>,
}

impl Type {
    /// Operand size in bytes; drives stack-slot reservation and the
    /// store-width selection in the translator.
    pub fn size(&self) -> i64 {
        match self {
            Type::Bool => 1,
            Type::F64 | Type::I64 | Type::String | Type::Func(_) => 8,
        }
    }
}

impl fmt::Display for Type {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Type::Bool => f.write_str("bool"),
            Type::F64 => f.write_str("f64"),
            Type::I64 => f.write_str("i64"),
            Type::String => f.write_str("string"),
            Type::Func(sig) => {
                f.write_str("func(")?;
                for (i, p) in sig.params.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{p}")?;
                }
                write!(f, ") {}", sig.result)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn func(params: Vec<Type>, result: Type) -> Type {
        Type::Func(FuncSig {
            params,
            result: Box::new(result),
        })
    }

    #[test]
    fn sizes() {
        assert_eq!(Type::Bool.size(), 1);
        assert_eq!(Type::I64.size(), 8);
        assert_eq!(Type::F64.size(), 8);
        assert_eq!(Type::String.size(), 8);
        assert_eq!(func(vec![], Type::I64).size(), 8);
    }

    #[test]
    fn equality_is_structural() {
        assert_eq!(Type::Bool, Type::Bool);
        assert_ne!(Type::Bool, Type::I64);
        assert_eq!(
            func(vec![Type::I64, Type::Bool], Type::I64),
            func(vec![Type::I64, Type::Bool], Type::I64)
        );
        // Arity, parameter types and result all participate.
        assert_ne!(func(vec![Type::I64], Type::I64), func(vec![], Type::I64));
        assert_ne!(
            func(vec![Type::I64], Type::I64),
            func(vec![Type::Bool], Type::I64)
        );
        assert_ne!(
            func(vec![Type::I64], Type::I64),
            func(vec![Type::I64], Type::Bool)
        );
    }

    #[test]
    fn display() {
        assert_eq!(Type::String.to_string(), "string");
        assert_eq!(
            func(vec![Type::I64, Type::Bool], Type::String).to_string(),
            "func(i64, bool) string"
        );
    }
}

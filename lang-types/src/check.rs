#![forbid(unsafe_code)]

use std::collections::HashMap;

use lang_ast::{self as ast, Block, Cmd, Expr, FuncLit, Ident};
use lang_diag::Errors;
use lang_lex::Tok;

use crate::info::{Info, Object};
use crate::types::{FuncSig, Type};

/// Check scope and typing rules over a top-level block, producing the side
/// tables the translator needs. Recoverable faults are accumulated; checking
/// continues on siblings.
pub fn check(block: &Block, filename: &str) -> (Info, Errors) {
    let mut c = Checker {
        scopes: vec![Scope::root()],
        info: Info::default(),
        errs: Errors::new(filename),
    };
    c.check_block(block);
    (c.info, c.errs)
}

/// One lexical scope. `func` and `in_for` are inherited by child scopes, so
/// the flags on the innermost scope reflect the whole chain.
struct Scope {
    objects: HashMap<String, Object>,
    func: Option<FuncSig>,
    in_for: bool,
}

impl Scope {
    fn root() -> Self {
        Scope {
            objects: HashMap::new(),
            func: None,
            in_for: false,
        }
    }
}

struct Checker {
    scopes: Vec<Scope>,
    info: Info,
    errs: Errors,
}

impl Checker {
    fn enter(&mut self) {
        let top = self.scope();
        let child = Scope {
            objects: HashMap::new(),
            func: top.func.clone(),
            in_for: top.in_for,
        };
        self.scopes.push(child);
    }

    fn leave(&mut self) {
        self.scopes.pop();
    }

    fn scope(&mut self) -> &mut Scope {
        self.scopes.last_mut().expect("scope stack is never empty")
    }

    fn lookup(&self, name: &str) -> Option<&Object> {
        self.scopes.iter().rev().find_map(|s| s.objects.get(name))
    }

    fn insert(&mut self, ident: &Ident, ty: Type) {
        if let Some(obj) = self.lookup(&ident.name) {
            let msg = format!("{} already defined at {}", ident.name, obj.pos);
            self.errs.append(ident.start, msg);
            return;
        }
        let obj = Object {
            decl: ident.id,
            pos: ident.start,
            ty,
        };
        self.info.uses.insert(ident.id, obj.clone());
        self.scope().objects.insert(ident.name.clone(), obj);
    }

    fn check_block(&mut self, block: &Block) {
        for cmd in &block.cmds {
            self.check_cmd(cmd);
        }
    }

    fn check_cmd(&mut self, cmd: &Cmd) {
        match cmd {
            Cmd::Assert(c) => {
                let Some(t) = self.check_expr(&c.x) else {
                    return;
                };
                if t != Type::Bool {
                    self.errs
                        .append(c.x.pos(), format!("expr must be of type bool, got {t}"));
                }
            }
            Cmd::Assign(c) => {
                let Some(lhs) = self.lookup(&c.ident.name).cloned() else {
                    self.errs.append(
                        c.start,
                        format!("undefined identifier {}", c.ident.name),
                    );
                    return;
                };
                let Some(rhs) = self.check_expr(&c.x) else {
                    return;
                };
                if lhs.ty != rhs {
                    self.errs.append(
                        c.start,
                        format!(
                            "cannot assign expr of type {rhs} to variable of type {}",
                            lhs.ty
                        ),
                    );
                }
                self.info.uses.insert(c.ident.id, lhs);
            }
            Cmd::Block(b) => self.check_block(b),
            Cmd::Break(c) => {
                if !self.scope().in_for {
                    self.errs.append(c.start, "break must be in for loop");
                }
            }
            Cmd::Continue(c) => {
                if !self.scope().in_for {
                    self.errs.append(c.start, "continue must be in for loop");
                }
            }
            Cmd::For(c) => {
                let Some(t) = self.check_expr(&c.x) else {
                    return;
                };
                if t != Type::Bool {
                    self.errs
                        .append(c.x.pos(), format!("expr must be of type bool, got {t}"));
                }
                self.enter();
                self.scope().in_for = true;
                self.check_block(&c.block);
                self.leave();
            }
            Cmd::If(c) => {
                let Some(t) = self.check_expr(&c.x) else {
                    return;
                };
                if t != Type::Bool {
                    self.errs
                        .append(c.x.pos(), format!("expr must be of type bool, got {t}"));
                }
                self.enter();
                self.check_block(&c.block);
                self.leave();
                if let Some(els) = &c.els {
                    self.enter();
                    self.check_cmd(&els.cmd);
                    self.leave();
                }
            }
            Cmd::Return(c) => {
                let Some(sig) = self.scope().func.clone() else {
                    self.errs
                        .append(c.start, "unexpected return cmd outside of func scope");
                    return;
                };
                let Some(t) = self.check_expr(&c.x) else {
                    return;
                };
                if t != *sig.result {
                    self.errs.append(
                        c.start,
                        format!(
                            "cannot return expr of type {t}, expected expr of type {}",
                            sig.result
                        ),
                    );
                }
            }
            Cmd::VarDecl(c) => {
                if let Some(t) = self.check_expr(&c.x) {
                    self.insert(&c.ident, t);
                }
            }
        }
    }

    fn check_expr(&mut self, x: &Expr) -> Option<Type> {
        let t = match x {
            Expr::Binary(b) => self.check_binary_expr(b)?,
            Expr::Unary(u) => self.check_unary_expr(u)?,
            Expr::Paren(p) => self.check_expr(&p.x)?,
            Expr::Ident(id) => match self.lookup(&id.name).cloned() {
                Some(obj) => {
                    self.info.uses.insert(id.id, obj.clone());
                    obj.ty
                }
                None => {
                    self.errs
                        .append(id.start, format!("undefined identifier {}", id.name));
                    return None;
                }
            },
            Expr::Bool(_) => Type::Bool,
            Expr::I64(_) => Type::I64,
            Expr::F64(_) => Type::F64,
            Expr::String(_) => Type::String,
            Expr::Func(f) => self.check_func_lit(f)?,
        };
        self.info.types.insert(
            x.id(),
            Object {
                decl: x.id(),
                pos: x.pos(),
                ty: t.clone(),
            },
        );
        Some(t)
    }

    fn check_binary_expr(&mut self, b: &ast::BinaryExpr) -> Option<Type> {
        let lhs = self.check_expr(&b.lhs)?;
        let rhs = self.check_expr(&b.rhs)?;
        if lhs == rhs {
            match lhs {
                Type::Bool => {
                    if b.op.is_logical_op() || b.op == Tok::Equal || b.op == Tok::NotEqual {
                        return Some(Type::Bool);
                    }
                }
                Type::I64 => {
                    if b.op.is_arith_op() {
                        return Some(Type::I64);
                    }
                    if b.op.is_cmp_op() {
                        return Some(Type::Bool);
                    }
                }
                Type::F64 => {
                    if b.op.is_arith_op() {
                        return Some(Type::F64);
                    }
                    if b.op.is_cmp_op() {
                        return Some(Type::Bool);
                    }
                }
                Type::String => {
                    if b.op == Tok::Plus {
                        return Some(Type::String);
                    }
                    if b.op.is_cmp_op() {
                        return Some(Type::Bool);
                    }
                }
                // No operator applies to function values.
                Type::Func(_) => {}
            }
        }
        self.errs.append(
            b.op_pos,
            format!(
                "cannot apply {} to operands of types {lhs} and {rhs}",
                b.op
            ),
        );
        None
    }

    fn check_unary_expr(&mut self, u: &ast::UnaryExpr) -> Option<Type> {
        let t = self.check_expr(&u.x)?;
        match (&t, u.op) {
            (Type::Bool, Tok::Not) => Some(Type::Bool),
            (Type::I64, Tok::Minus) => Some(Type::I64),
            (Type::F64, Tok::Minus) => Some(Type::F64),
            _ => {
                self.errs.append(
                    u.start,
                    format!("cannot apply {} to expr of type {t}", u.op),
                );
                None
            }
        }
    }

    fn check_func_lit(&mut self, f: &FuncLit) -> Option<Type> {
        self.enter();
        let mut params = Vec::with_capacity(f.params.len());
        for p in &f.params {
            let t = self.check_type(&p.ty);
            params.push(t.clone());
            self.insert(&p.ident, t);
        }
        let result = self.check_type(&f.result);
        let sig = FuncSig {
            params,
            result: Box::new(result),
        };
        self.scope().func = Some(sig.clone());
        self.check_block(&f.block);
        self.leave();
        Some(Type::Func(sig))
    }

    fn check_type(&mut self, t: &ast::Type) -> Type {
        match t {
            ast::Type::Scalar(s) => match s.name.as_str() {
                "bool" => Type::Bool,
                "f64" => Type::F64,
                "i64" => Type::I64,
                "string" => Type::String,
                name => panic!("unexpected type {name}"),
            },
            ast::Type::Func(f) => {
                let params = f.params.iter().map(|p| self.check_type(p)).collect();
                let result = self.check_type(&f.result);
                Type::Func(FuncSig {
                    params,
                    result: Box::new(result),
                })
            }
        }
    }
}

#![forbid(unsafe_code)]

use crate::{Cmd, Else, Expr};

/// Render a command tree as an indented textual dump, one node per line.
/// Used by parser tests to pin down tree shapes.
pub fn dump(cmd: &Cmd) -> String {
    let mut d = Dumper {
        out: String::new(),
        indent: 0,
    };
    d.dump_cmd(cmd);
    d.out
}

struct Dumper {
    out: String,
    indent: usize,
}

impl Dumper {
    fn dump_cmd(&mut self, cmd: &Cmd) {
        match cmd {
            Cmd::Assert(c) => {
                self.enter("Assert(");
                self.dump_expr(&c.x);
                self.exit(")");
            }
            Cmd::Assign(c) => {
                self.enter("Assign(");
                self.print(&format!("Ident: Ident(Name: {})", c.ident.name));
                self.println();
                self.print("X: ");
                self.dump_expr(&c.x);
                self.exit(")");
            }
            Cmd::Block(c) => {
                self.enter("Block(");
                for (i, cmd) in c.cmds.iter().enumerate() {
                    if i > 0 {
                        self.println();
                    }
                    self.dump_cmd(cmd);
                }
                self.exit(")");
            }
            Cmd::Break(_) => self.print("Break()"),
            Cmd::Continue(_) => self.print("Continue()"),
            Cmd::For(c) => {
                self.enter("For(");
                self.print("X: ");
                self.dump_expr(&c.x);
                self.println();
                self.print("Block: ");
                self.dump_cmd(&Cmd::Block(c.block.clone()));
                self.exit(")");
            }
            Cmd::If(c) => {
                self.enter("If(");
                self.print("X: ");
                self.dump_expr(&c.x);
                self.println();
                self.print("Block: ");
                self.dump_cmd(&Cmd::Block(c.block.clone()));
                if let Some(Else { cmd, .. }) = &c.els {
                    self.println();
                    self.print("Else: ");
                    self.dump_cmd(cmd);
                }
                self.exit(")");
            }
            Cmd::Return(c) => {
                self.enter("Return(");
                self.dump_expr(&c.x);
                self.exit(")");
            }
            Cmd::VarDecl(c) => {
                self.enter("VarDecl(");
                self.print(&format!("Ident: Ident(Name: {})", c.ident.name));
                self.println();
                self.print("X: ");
                self.dump_expr(&c.x);
                self.exit(")");
            }
        }
    }

    fn dump_expr(&mut self, x: &Expr) {
        match x {
            Expr::Binary(x) => {
                self.enter("BinaryExpr(");
                self.print("LHS: ");
                self.dump_expr(&x.lhs);
                self.println();
                self.print(&format!("Op: {}", x.op));
                self.println();
                self.print("RHS: ");
                self.dump_expr(&x.rhs);
                self.exit(")");
            }
            Expr::Unary(x) => {
                self.enter("UnaryExpr(");
                self.print(&format!("Op: {}", x.op));
                self.println();
                self.print("X: ");
                self.dump_expr(&x.x);
                self.exit(")");
            }
            Expr::Paren(x) => {
                self.enter("ParenExpr(");
                self.dump_expr(&x.x);
                self.exit(")");
            }
            Expr::Ident(x) => self.print(&format!("Ident(Name: {})", x.name)),
            Expr::Bool(x) => self.print(&format!("Bool(Val: {})", x.val)),
            Expr::I64(x) => self.print(&format!("I64(Val: {})", x.val)),
            Expr::F64(x) => self.print(&format!("F64(Val: {})", x.val)),
            Expr::String(x) => self.print(&format!("String(Val: {})", x.val)),
            Expr::Func(x) => {
                self.enter("FuncLit(");
                let params: Vec<String> = x
                    .params
                    .iter()
                    .map(|f| format!("{} {}", f.ident.name, f.ty))
                    .collect();
                self.print(&format!("Params: ({})", params.join(", ")));
                self.println();
                self.print(&format!("Result: {}", x.result));
                self.println();
                self.print("Block: ");
                self.dump_cmd(&Cmd::Block(x.block.clone()));
                self.exit(")");
            }
        }
    }

    fn enter(&mut self, s: &str) {
        self.print(s);
        self.indent += 1;
        self.println();
    }

    fn exit(&mut self, s: &str) {
        self.indent -= 1;
        self.println();
        self.print(s);
    }

    fn print(&mut self, s: &str) {
        self.out.push_str(s);
    }

    fn println(&mut self) {
        self.out.push('\n');
        for _ in 0..self.indent {
            self.out.push('\t');
        }
    }
}

#[cfg(test)]
mod tests {
    use lang_lex::{Pos, Tok};
    use pretty_assertions::assert_eq;

    use super::*;
    use crate::{Assert, BinaryExpr, I64Lit, NodeId};

    #[test]
    fn dumps_binary_expressions() {
        let lit = |id, val| {
            Expr::I64(I64Lit {
                id: NodeId(id),
                val,
                start: Pos::new(1, 1),
                end: Pos::new(1, 2),
            })
        };
        let cmd = Cmd::Assert(Assert {
            x: Expr::Binary(Box::new(BinaryExpr {
                id: NodeId(2),
                lhs: lit(0, 1),
                op: Tok::Plus,
                op_pos: Pos::new(1, 3),
                rhs: lit(1, 2),
            })),
            start: Pos::new(1, 1),
            end: Pos::new(1, 10),
        });
        assert_eq!(
            dump(&cmd),
            "Assert(\n\tBinaryExpr(\n\t\tLHS: I64(Val: 1)\n\t\tOp: +\n\t\tRHS: I64(Val: 2)\n\t)\n)"
        );
    }
}

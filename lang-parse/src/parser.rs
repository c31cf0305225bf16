#![forbid(unsafe_code)]

use lang_ast::{
    Assert, Assign, BinaryExpr, Block, BoolLit, Break, Cmd, Comment, Continue, Else, Expr, F64Lit,
    Field, For, FuncLit, FuncType, I64Lit, IdGen, Ident, If, ParenExpr, Return, Scalar, StringLit,
    Type, UnaryExpr, VarDecl,
};
use lang_diag::Errors;
use lang_lex::{Lexer, Pos, Tok};

/// Parse a source text into its top-level block.
///
/// Comments are collected as a side output. Faults are accumulated into the
/// returned [`Errors`]; the tree may be partial when errors are present, and
/// callers are expected not to run later phases in that case.
pub fn parse(src: &str, filename: &str) -> (Block, Vec<Comment>, Errors) {
    let mut p = Parser {
        lx: Lexer::new(src),
        errs: Errors::new(filename),
        comments: Vec::new(),
        ids: IdGen::default(),
        tok: Tok::Eof,
        pos: Pos::default(),
        lit: String::new(),
    };
    p.next();
    let block = p.parse_file();
    (block, p.comments, p.errs)
}

/// Marker for an already-reported syntax fault; unwinds to the nearest
/// recovery point.
struct Abort;

type PResult<T> = Result<T, Abort>;

struct Parser<'src> {
    lx: Lexer<'src>,
    errs: Errors,
    comments: Vec<Comment>,
    ids: IdGen,

    // one-token lookahead
    tok: Tok,
    pos: Pos,
    lit: String,
}

const CMD_START: [Tok; 8] = [
    Tok::Assert,
    Tok::Break,
    Tok::Continue,
    Tok::For,
    Tok::If,
    Tok::Let,
    Tok::Return,
    Tok::Set,
];

impl Parser<'_> {
    fn parse_file(&mut self) -> Block {
        self.parse_block().unwrap_or_else(|_| Block {
            cmds: Vec::new(),
            start: Pos::default(),
            end: Pos::default(),
        })
    }

    // Block -> "{" { Cmd } "}" .
    fn parse_block(&mut self) -> PResult<Block> {
        let start = self.expect(Tok::LeftBrace)?;
        let mut cmds = Vec::new();
        loop {
            if CMD_START.contains(&self.tok) {
                match self.parse_cmd() {
                    Ok(cmd) => cmds.push(cmd),
                    Err(Abort) => self.recover(),
                }
            } else if self.tok == Tok::RightBrace || self.tok == Tok::Eof {
                break;
            } else {
                self.errs
                    .append(self.pos, format!("unexpected {}", self.lit));
                self.next();
            }
        }
        let end = self.expect(Tok::RightBrace)?;
        Ok(Block { cmds, start, end })
    }

    // Cmd -> Assert | Break | Continue | For | If | VarDecl | Return | Assign .
    fn parse_cmd(&mut self) -> PResult<Cmd> {
        match self.tok {
            Tok::Assert => {
                let start = self.expect(Tok::Assert)?;
                let x = self.parse_expr()?;
                let end = self.expect(Tok::Semicolon)?;
                Ok(Cmd::Assert(Assert { x, start, end }))
            }
            Tok::Break => {
                let start = self.expect(Tok::Break)?;
                let end = self.expect(Tok::Semicolon)?;
                Ok(Cmd::Break(Break { start, end }))
            }
            Tok::Continue => {
                let start = self.expect(Tok::Continue)?;
                let end = self.expect(Tok::Semicolon)?;
                Ok(Cmd::Continue(Continue { start, end }))
            }
            Tok::For => {
                let start = self.expect(Tok::For)?;
                let x = self.parse_expr()?;
                let block = self.parse_block()?;
                Ok(Cmd::For(For { x, block, start }))
            }
            Tok::If => self.parse_if(),
            Tok::Let => {
                let start = self.expect(Tok::Let)?;
                let ident = self.parse_ident()?;
                self.expect(Tok::Define)?;
                let x = self.parse_expr()?;
                let end = self.expect(Tok::Semicolon)?;
                Ok(Cmd::VarDecl(VarDecl {
                    ident,
                    x,
                    start,
                    end,
                }))
            }
            Tok::Return => {
                let start = self.expect(Tok::Return)?;
                let x = self.parse_expr()?;
                let end = self.expect(Tok::Semicolon)?;
                Ok(Cmd::Return(Return { x, start, end }))
            }
            Tok::Set => {
                let start = self.expect(Tok::Set)?;
                let ident = self.parse_ident()?;
                self.expect(Tok::Assign)?;
                let x = self.parse_expr()?;
                let end = self.expect(Tok::Semicolon)?;
                Ok(Cmd::Assign(Assign {
                    ident,
                    x,
                    start,
                    end,
                }))
            }
            _ => {
                self.errs
                    .append(self.pos, format!("unexpected {}", self.lit));
                Err(Abort)
            }
        }
    }

    // If -> "if" Expr Block [ "else" ( If | Block ) ] .
    fn parse_if(&mut self) -> PResult<Cmd> {
        let start = self.expect(Tok::If)?;
        let x = self.parse_expr()?;
        let block = self.parse_block()?;

        let mut els = None;
        if self.tok == Tok::Else {
            let else_pos = self.expect(Tok::Else)?;
            let cmd = match self.tok {
                Tok::LeftBrace => Cmd::Block(self.parse_block()?),
                Tok::If => self.parse_if()?,
                _ => {
                    self.errs.append(
                        self.pos,
                        format!(
                            "unexpected {}, expected {} or {}",
                            self.lit,
                            Tok::LeftBrace,
                            Tok::If
                        ),
                    );
                    return Err(Abort);
                }
            };
            els = Some(Else {
                cmd: Box::new(cmd),
                start: else_pos,
            });
        }
        Ok(Cmd::If(If {
            x,
            block,
            els,
            start,
        }))
    }

    // Expr -> OrExpr { "⟹" OrExpr } and so on down the precedence ladder;
    // all binary operators are left-associative.
    fn parse_expr(&mut self) -> PResult<Expr> {
        self.parse_binary_expr(Self::parse_or_expr, |t| t == Tok::Implies)
    }

    fn parse_or_expr(&mut self) -> PResult<Expr> {
        self.parse_binary_expr(Self::parse_and_expr, |t| t == Tok::Or)
    }

    fn parse_and_expr(&mut self) -> PResult<Expr> {
        self.parse_binary_expr(Self::parse_rel_expr, |t| t == Tok::And)
    }

    fn parse_rel_expr(&mut self) -> PResult<Expr> {
        self.parse_binary_expr(Self::parse_add_expr, Tok::is_rel_op)
    }

    fn parse_add_expr(&mut self) -> PResult<Expr> {
        self.parse_binary_expr(Self::parse_mul_expr, |t| t == Tok::Plus || t == Tok::Minus)
    }

    fn parse_mul_expr(&mut self) -> PResult<Expr> {
        self.parse_binary_expr(Self::parse_unary_expr, |t| {
            t == Tok::Multiply || t == Tok::Divide
        })
    }

    fn parse_binary_expr(
        &mut self,
        parse: fn(&mut Self) -> PResult<Expr>,
        at_op: fn(Tok) -> bool,
    ) -> PResult<Expr> {
        let mut x = parse(self)?;
        while at_op(self.tok) {
            let op = self.tok;
            let op_pos = self.pos;
            self.next();
            let y = parse(self)?;
            x = Expr::Binary(Box::new(BinaryExpr {
                id: self.ids.fresh(),
                lhs: x,
                op,
                op_pos,
                rhs: y,
            }));
        }
        Ok(x)
    }

    // UnaryExpr -> ( "-" | "¬" ) UnaryExpr | PrimaryExpr .
    fn parse_unary_expr(&mut self) -> PResult<Expr> {
        match self.tok {
            Tok::Minus | Tok::Not => {
                let op = self.tok;
                let start = self.pos;
                self.next();
                let x = self.parse_unary_expr()?;
                Ok(Expr::Unary(Box::new(UnaryExpr {
                    id: self.ids.fresh(),
                    op,
                    x,
                    start,
                })))
            }
            _ => self.parse_primary_expr(),
        }
    }

    // PrimaryExpr -> "(" Expr ")" | F64Lit | I64Lit | Identifier | StringLit
    //              | "true" | "false" | FuncLit .
    fn parse_primary_expr(&mut self) -> PResult<Expr> {
        match self.tok {
            Tok::F64Lit => {
                let lit = self.lit.clone();
                let start = self.expect(Tok::F64Lit)?;
                let end = start.shift(lit.len());
                // The lexer has constrained the shape; only overflow is left,
                // and that is unrecoverable.
                let val = match lit.replace('_', "").parse::<f64>() {
                    Ok(v) => v,
                    Err(err) => panic!("cannot convert f64 literal {lit}: {err}"),
                };
                Ok(Expr::F64(F64Lit {
                    id: self.ids.fresh(),
                    val,
                    start,
                    end,
                }))
            }
            Tok::I64Lit => {
                let lit = self.lit.clone();
                let start = self.expect(Tok::I64Lit)?;
                let end = start.shift(lit.len());
                let val = match lit.replace('_', "").parse::<i64>() {
                    Ok(v) => v,
                    Err(err) => panic!("cannot convert i64 literal {lit}: {err}"),
                };
                Ok(Expr::I64(I64Lit {
                    id: self.ids.fresh(),
                    val,
                    start,
                    end,
                }))
            }
            Tok::Identifier => Ok(Expr::Ident(self.parse_ident()?)),
            Tok::LeftParen => {
                let start = self.expect(Tok::LeftParen)?;
                let x = self.parse_expr()?;
                let end = self.expect(Tok::RightParen)?;
                Ok(Expr::Paren(Box::new(ParenExpr {
                    id: self.ids.fresh(),
                    x,
                    start,
                    end,
                })))
            }
            Tok::StringLit => {
                let lit = self.lit.clone();
                let start = self.expect(Tok::StringLit)?;
                let end = start.shift(lit.len());
                Ok(Expr::String(StringLit {
                    id: self.ids.fresh(),
                    val: lit,
                    start,
                    end,
                }))
            }
            Tok::True | Tok::False => {
                let val = self.tok == Tok::True;
                let lit = self.lit.clone();
                let start = self.pos;
                self.next();
                Ok(Expr::Bool(BoolLit {
                    id: self.ids.fresh(),
                    val,
                    start,
                    end: start.shift(lit.len()),
                }))
            }
            Tok::Func => self.parse_func_lit(),
            _ => {
                self.errs
                    .append(self.pos, format!("unexpected {}", self.lit));
                Err(Abort)
            }
        }
    }

    // FuncLit -> "func" "(" [ Field { "," Field } ] ")" Type Block .
    fn parse_func_lit(&mut self) -> PResult<Expr> {
        let start = self.expect(Tok::Func)?;
        self.expect(Tok::LeftParen)?;
        let mut params = Vec::new();
        if self.tok != Tok::RightParen {
            loop {
                let ident = self.parse_ident()?;
                let ty = self.parse_type()?;
                params.push(Field { ident, ty });
                if !self.got(Tok::Comma) {
                    break;
                }
            }
        }
        self.expect(Tok::RightParen)?;
        let result = self.parse_type()?;
        let block = self.parse_block()?;
        Ok(Expr::Func(Box::new(FuncLit {
            id: self.ids.fresh(),
            params,
            result,
            block,
            start,
        })))
    }

    // Type -> "bool" | "f64" | "i64" | "string" | FuncType .
    // FuncType -> "func" "(" [ Type { "," Type } ] ")" Type .
    fn parse_type(&mut self) -> PResult<Type> {
        match self.tok {
            Tok::Bool | Tok::F64 | Tok::I64 | Tok::String => {
                let t = Scalar {
                    name: self.lit.clone(),
                    start: self.pos,
                };
                self.next();
                Ok(Type::Scalar(t))
            }
            Tok::Func => {
                let start = self.expect(Tok::Func)?;
                self.expect(Tok::LeftParen)?;
                let mut params = Vec::new();
                if self.tok != Tok::RightParen {
                    loop {
                        params.push(self.parse_type()?);
                        if !self.got(Tok::Comma) {
                            break;
                        }
                    }
                }
                self.expect(Tok::RightParen)?;
                let result = self.parse_type()?;
                Ok(Type::Func(Box::new(FuncType {
                    params,
                    result,
                    start,
                })))
            }
            _ => {
                self.errs
                    .append(self.pos, format!("unexpected {}, expected type", self.lit));
                Err(Abort)
            }
        }
    }

    fn parse_ident(&mut self) -> PResult<Ident> {
        let name = self.lit.clone();
        let start = self.expect(Tok::Identifier)?;
        Ok(Ident {
            id: self.ids.fresh(),
            name,
            start,
        })
    }

    /// Advance the lookahead, draining comments into the side list and
    /// reporting illegal tokens as syntax errors without stopping.
    fn next(&mut self) {
        loop {
            let tok = self.lx.read();
            match tok.kind {
                Tok::Illegal => {
                    self.errs
                        .append(tok.pos, format!("syntax error: {}", tok.lit));
                }
                Tok::Comment => {
                    let end = tok.pos.shift(tok.lit.len());
                    self.comments.push(Comment {
                        text: tok.lit,
                        start: tok.pos,
                        end,
                    });
                }
                _ => {
                    self.tok = tok.kind;
                    self.pos = tok.pos;
                    self.lit = tok.lit;
                    return;
                }
            }
        }
    }

    fn got(&mut self, tok: Tok) -> bool {
        if self.tok == tok {
            self.next();
            return true;
        }
        false
    }

    fn expect(&mut self, tok: Tok) -> PResult<Pos> {
        let pos = self.pos;
        if self.got(tok) {
            return Ok(pos);
        }
        self.errs.append(
            pos,
            format!("unexpected {}, expected {}", self.lit, tok),
        );
        Err(Abort)
    }

    /// Skip to the next likely command boundary after a fault: past the next
    /// `;`, or up to (not past) a closing brace or end of input.
    fn recover(&mut self) {
        loop {
            match self.tok {
                Tok::Semicolon => {
                    self.next();
                    return;
                }
                Tok::RightBrace | Tok::Eof => return,
                _ => self.next(),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use lang_ast::dump;
    use pretty_assertions::assert_eq;

    use super::*;

    fn parse_ok(src: &str) -> Block {
        let (block, _, errs) = parse(src, "test.l");
        assert!(errs.is_empty(), "unexpected errors:\n{errs}");
        block
    }

    fn errors(src: &str) -> Vec<String> {
        let (_, _, errs) = parse(src, "test.l");
        errs.iter().map(|d| format!("{}: {}", d.pos, d.message)).collect()
    }

    #[test]
    fn parses_precedence_left_to_right() {
        let block = parse_ok("{ assert 1 + 2 · 3 = 7; }");
        assert_eq!(
            dump(&block.cmds[0]),
            "Assert(
\tBinaryExpr(
\t\tLHS: BinaryExpr(
\t\t\tLHS: I64(Val: 1)
\t\t\tOp: +
\t\t\tRHS: BinaryExpr(
\t\t\t\tLHS: I64(Val: 2)
\t\t\t\tOp: ·
\t\t\t\tRHS: I64(Val: 3)
\t\t\t)
\t\t)
\t\tOp: =
\t\tRHS: I64(Val: 7)
\t)
)"
        );
    }

    #[test]
    fn implication_binds_loosest() {
        let block = parse_ok("{ assert a ∨ b ⟹ c; }");
        let Cmd::Assert(a) = &block.cmds[0] else {
            panic!("expected assert")
        };
        let Expr::Binary(top) = &a.x else {
            panic!("expected binary")
        };
        assert_eq!(top.op, Tok::Implies);
    }

    #[test]
    fn binary_operators_are_left_associative() {
        let block = parse_ok("{ assert 1 - 2 - 3 = -4; }");
        let Cmd::Assert(a) = &block.cmds[0] else {
            panic!("expected assert")
        };
        let Expr::Binary(eq) = &a.x else {
            panic!("expected binary")
        };
        let Expr::Binary(sub) = &eq.lhs else {
            panic!("expected binary lhs")
        };
        assert_eq!(sub.op, Tok::Minus);
        let Expr::Binary(inner) = &sub.lhs else {
            panic!("expected nested lhs")
        };
        assert_eq!(inner.op, Tok::Minus);
    }

    #[test]
    fn parses_commands() {
        let block = parse_ok(
            "{
    let x := 2;
    set x ← x + 3;
    if x = 5 { assert true; } else if x < 5 { assert false; } else { break; }
    for x < 10 { set x ← x + 1; continue; }
    return x;
}",
        );
        assert_eq!(block.cmds.len(), 5);
        assert!(matches!(block.cmds[0], Cmd::VarDecl(_)));
        assert!(matches!(block.cmds[1], Cmd::Assign(_)));
        assert!(matches!(block.cmds[2], Cmd::If(_)));
        assert!(matches!(block.cmds[3], Cmd::For(_)));
        assert!(matches!(block.cmds[4], Cmd::Return(_)));

        let Cmd::If(i) = &block.cmds[2] else {
            panic!("expected if")
        };
        let els = i.els.as_ref().expect("expected else");
        assert!(matches!(*els.cmd, Cmd::If(_)), "else-if chains nest");
    }

    #[test]
    fn membership_and_is_parse_as_relations() {
        let block = parse_ok("{ assert a ∈ b; assert a is b; }");
        for (cmd, op) in block.cmds.iter().zip([Tok::In, Tok::Is]) {
            let Cmd::Assert(a) = cmd else {
                panic!("expected assert")
            };
            let Expr::Binary(b) = &a.x else {
                panic!("expected binary")
            };
            assert_eq!(b.op, op);
        }
    }

    #[test]
    fn parses_func_literals() {
        let block = parse_ok("{ let f := func(x i64, b bool) func(i64) i64 { return g; }; }");
        let Cmd::VarDecl(d) = &block.cmds[0] else {
            panic!("expected decl")
        };
        let Expr::Func(f) = &d.x else {
            panic!("expected func lit")
        };
        assert_eq!(f.params.len(), 2);
        assert_eq!(f.params[0].ident.name, "x");
        assert_eq!(f.params[0].ty.to_string(), "i64");
        assert_eq!(f.result.to_string(), "func(i64) i64");
    }

    #[test]
    fn literal_positions_cover_their_text() {
        let block = parse_ok("{ assert speed ≥ 10; }");
        let Cmd::Assert(a) = &block.cmds[0] else {
            panic!("expected assert")
        };
        let Expr::Binary(b) = &a.x else {
            panic!("expected binary")
        };
        assert_eq!(b.lhs.pos(), Pos::new(1, 10));
        assert_eq!(b.lhs.end(), Pos::new(1, 15));
        // `≥` occupies three bytes.
        assert_eq!(b.op_pos, Pos::new(1, 16));
        assert_eq!(b.rhs.pos(), Pos::new(1, 20));
        assert_eq!(b.rhs.end(), Pos::new(1, 22));
        assert_eq!(a.end, Pos::new(1, 22));
    }

    #[test]
    fn sibling_commands_do_not_overlap() {
        let block = parse_ok("{ let x := 1; set x ← 2; assert x = 2; }");
        for pair in block.cmds.windows(2) {
            assert!(pair[0].end() <= pair[1].pos());
            assert!(pair[0].pos() <= pair[0].end());
        }
    }

    #[test]
    fn collects_comments() {
        let (_, comments, errs) = parse(
            "{
    // first note
    assert true; // trailing
}",
            "test.l",
        );
        assert!(errs.is_empty());
        let texts: Vec<&str> = comments.iter().map(|c| c.text.as_str()).collect();
        assert_eq!(texts, vec!["// first note", "// trailing"]);
        assert_eq!(comments[0].start, Pos::new(2, 5));
        assert_eq!(comments[0].end, Pos::new(2, 5 + "// first note".len() as u32));
    }

    #[test]
    fn reports_unexpected_tokens_and_continues() {
        let errs = errors("{ assert true; , assert false; }");
        assert_eq!(errs, vec!["1:16: unexpected ,".to_string()]);

        let (block, _, errs) = parse("{ assert true; , assert false; }", "test.l");
        assert_eq!(errs.len(), 1);
        assert_eq!(block.cmds.len(), 2, "both asserts survive");
    }

    #[test]
    fn reports_illegal_tokens_as_syntax_errors() {
        let errs = errors("{ assert true @ false; }");
        assert_eq!(errs[0], "1:15: syntax error: @");
    }

    #[test]
    fn reports_missing_semicolon() {
        let errs = errors("{ assert true }");
        assert_eq!(errs, vec!["1:15: unexpected }, expected ;".to_string()]);
    }

    #[test]
    fn recovers_inside_nested_blocks() {
        let (block, _, errs) = parse(
            "{ for true { assert ; break; } assert true; }",
            "test.l",
        );
        assert_eq!(errs.len(), 1);
        assert_eq!(block.cmds.len(), 2);
        let Cmd::For(f) = &block.cmds[0] else {
            panic!("expected for")
        };
        assert_eq!(f.block.cmds.len(), 1, "break survives recovery");
    }

    #[test]
    fn block_end_is_the_closing_brace() {
        let block = parse_ok("{ assert true;\n}");
        assert_eq!(block.start, Pos::new(1, 1));
        assert_eq!(block.end, Pos::new(2, 1));
    }

    #[test]
    fn expression_node_ids_are_unique() {
        let block = parse_ok("{ assert 1 + 2 = 3 ∧ true; let x := 1; set x ← x; }");
        let mut ids = Vec::new();
        fn walk(x: &Expr, ids: &mut Vec<lang_ast::NodeId>) {
            ids.push(x.id());
            match x {
                Expr::Binary(b) => {
                    walk(&b.lhs, ids);
                    walk(&b.rhs, ids);
                }
                Expr::Unary(u) => walk(&u.x, ids),
                Expr::Paren(p) => walk(&p.x, ids),
                _ => {}
            }
        }
        for cmd in &block.cmds {
            match cmd {
                Cmd::Assert(c) => walk(&c.x, &mut ids),
                Cmd::VarDecl(c) => {
                    ids.push(c.ident.id);
                    walk(&c.x, &mut ids);
                }
                Cmd::Assign(c) => {
                    ids.push(c.ident.id);
                    walk(&c.x, &mut ids);
                }
                _ => {}
            }
        }
        let mut sorted = ids.clone();
        sorted.sort();
        sorted.dedup();
        assert_eq!(sorted.len(), ids.len(), "duplicate node id");
    }
}

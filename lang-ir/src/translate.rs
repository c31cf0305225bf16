#![forbid(unsafe_code)]

use std::collections::HashMap;

use lang_ast::{self as ast, Block, Cmd, Expr};
use lang_lex::{Pos, Tok};
use lang_types::{Info, Type};

use crate::ir::{
    Frame, Instr, Label, Mem, Op, Pass, RVal, Reg, RegType, Seq, ASSERT_VIOLATED, BOOL_REG_1,
    BOOL_REG_2, I64_REG_1, I64_REG_2,
};

/// Lower a checked top-level block into the `main` frame, then run the given
/// passes over its instruction sequence.
pub fn translate(block: &Block, info: &Info, passes: &[Pass]) -> Frame {
    let mut t = Translator {
        info,
        labels: 0,
        states: Vec::new(),
    };
    t.translate_frame(block, Label::from("main"), passes)
}

/// The value of a lowered expression: either a plain operand or the
/// instructions that compute it together with the register holding the
/// result. The latter never escapes the translator; consumers splice the
/// prefix into their own sequence, which keeps the public [`Seq`] flat by
/// construction.
enum Value {
    Val(RVal),
    Seq(SeqExpr),
}

struct SeqExpr {
    seq: Seq,
    dst: Reg,
}

fn splice(seq: &mut Seq, v: Value) -> RVal {
    match v {
        Value::Val(r) => r,
        Value::Seq(sx) => {
            seq.extend(sx.seq);
            RVal::Reg(sx.dst)
        }
    }
}

/// Per-frame translation state: running stack usage, name-to-offset map and
/// the label stacks that `break`/`continue` jump to.
struct FrameState {
    stack: i64,
    vars: HashMap<String, i64>,
    for_starts: Vec<Label>,
    for_ends: Vec<Label>,
}

struct Translator<'a> {
    info: &'a Info,
    labels: u32,
    states: Vec<FrameState>,
}

impl Translator<'_> {
    fn translate_frame(&mut self, block: &Block, name: Label, passes: &[Pass]) -> Frame {
        self.states.push(FrameState {
            stack: 0,
            vars: HashMap::new(),
            for_starts: Vec::new(),
            for_ends: Vec::new(),
        });

        let mut seq = self.translate_block(block);
        for pass in passes {
            seq = pass(seq);
        }

        let state = self.states.pop().expect("frame state stack is never empty");
        Frame {
            name,
            stack: -state.stack,
            seq,
        }
    }

    fn state(&mut self) -> &mut FrameState {
        self.states.last_mut().expect("frame state stack is never empty")
    }

    fn label(&mut self) -> Label {
        self.labels += 1;
        Label(format!(".L{}", self.labels))
    }

    fn translate_block(&mut self, block: &Block) -> Seq {
        let mut seq = Seq::new();
        for cmd in &block.cmds {
            seq.extend(self.translate_cmd(cmd));
        }
        seq
    }

    fn translate_cmd(&mut self, cmd: &Cmd) -> Seq {
        match cmd {
            Cmd::Assert(c) => self.translate_assert(c),
            Cmd::Assign(c) => self.translate_assign(c),
            Cmd::Block(b) => self.translate_block(b),
            Cmd::Break(c) => {
                let label = self
                    .state()
                    .for_ends
                    .last()
                    .expect("break outside of for loop")
                    .clone();
                vec![Instr::Jump {
                    label,
                    pos: c.start,
                }]
            }
            Cmd::Continue(c) => {
                let label = self
                    .state()
                    .for_starts
                    .last()
                    .expect("continue outside of for loop")
                    .clone();
                vec![Instr::Jump {
                    label,
                    pos: c.start,
                }]
            }
            Cmd::For(c) => self.translate_for(c),
            Cmd::If(c) => self.translate_if(c),
            Cmd::VarDecl(c) => self.translate_var_decl(c),
            Cmd::Return(c) => panic!("unexpected return at {}", c.start),
        }
    }

    // assert X lowers to a check of X against true; the fall-through path
    // loads the source line and traps.
    fn translate_assert(&mut self, a: &ast::Assert) -> Seq {
        let label = self.label();
        let pos = a.start;
        let mut seq = self.bool_check(&a.x, true);
        seq.push(Instr::CJump {
            label: label.clone(),
            pos,
        });
        seq.push(Instr::Load {
            src: RVal::I64(i64::from(pos.line)),
            dst: I64_REG_2,
            pos,
        });
        seq.push(Instr::Call {
            label: Label::from(ASSERT_VIOLATED),
            pos,
        });
        seq.push(Instr::Label(label));
        seq
    }

    fn translate_assign(&mut self, a: &ast::Assign) -> Seq {
        let mut seq = Seq::new();
        let v = self.translate_rval(&a.x);
        let src = splice(&mut seq, v);
        let size = reg_type(self.info.uses[&a.ident.id].ty.size());
        let off = self.state().vars[&a.ident.name];
        seq.push(Instr::Store {
            src,
            dst: Mem { off },
            size,
            pos: a.start,
        });
        seq
    }

    fn translate_for(&mut self, f: &ast::For) -> Seq {
        let start = self.label();
        let end = self.label();
        self.state().for_starts.push(start.clone());
        self.state().for_ends.push(end.clone());

        let mut seq = vec![Instr::Label(start.clone())];
        seq.extend(self.bool_check(&f.x, false));
        seq.push(Instr::CJump {
            label: end.clone(),
            pos: f.start,
        });
        seq.extend(self.translate_block(&f.block));
        seq.push(Instr::Jump {
            label: start,
            pos: f.start,
        });
        seq.push(Instr::Label(end));

        self.state().for_starts.pop();
        self.state().for_ends.pop();
        seq
    }

    fn translate_if(&mut self, i: &ast::If) -> Seq {
        let mut end = self.label();
        let mut seq = self.bool_check(&i.x, false);
        seq.push(Instr::CJump {
            label: end.clone(),
            pos: i.start,
        });
        seq.extend(self.translate_block(&i.block));
        if let Some(els) = &i.els {
            let end_else = self.label();
            seq.push(Instr::Jump {
                label: end_else.clone(),
                pos: i.start,
            });
            seq.push(Instr::Label(end));
            seq.extend(self.translate_cmd(&els.cmd));
            end = end_else;
        }
        seq.push(Instr::Label(end));
        seq
    }

    fn translate_var_decl(&mut self, d: &ast::VarDecl) -> Seq {
        let mut seq = Seq::new();
        let v = self.translate_rval(&d.x);
        let src = splice(&mut seq, v);
        let sz = self.info.uses[&d.ident.id].ty.size();
        let state = self.state();
        state.stack -= sz;
        let off = state.stack;
        state.vars.insert(d.ident.name.clone(), off);
        seq.push(Instr::Store {
            src,
            dst: Mem { off },
            size: reg_type(sz),
            pos: d.start,
        });
        seq
    }

    /// Load the value of `x` into the first boolean register and compare it
    /// against the expected immediate; a following `CJump` takes the branch
    /// iff they are equal.
    fn bool_check(&mut self, x: &Expr, expect: bool) -> Seq {
        let mut seq = Seq::new();
        let v = self.translate_rval(x);
        let src = splice(&mut seq, v);
        seq.push(Instr::Load {
            src,
            dst: BOOL_REG_1,
            pos: x.pos(),
        });
        seq.push(Instr::Binary {
            lhs: RVal::Bool(expect),
            op: Op::Cmp,
            rhs: BOOL_REG_1,
            pos: x.pos(),
        });
        seq
    }

    fn translate_rval(&mut self, x: &Expr) -> Value {
        match x {
            Expr::Binary(b) => {
                let pos = x.pos();
                let bool_operands = self.info.types[&b.lhs.id()].ty == Type::Bool;
                let (r1, r2) = if bool_operands {
                    (BOOL_REG_1, BOOL_REG_2)
                } else {
                    (I64_REG_1, I64_REG_2)
                };

                let mut seq = Seq::new();
                let rhs = {
                    let v = self.translate_rval(&b.rhs);
                    splice(&mut seq, v)
                };

                // Save the RHS across the LHS lowering; only the 64-bit
                // registers can be pushed.
                let pushed = matches!(rhs, RVal::Reg(_));
                if let RVal::Reg(r) = rhs {
                    let pr = if r.second { I64_REG_2 } else { I64_REG_1 };
                    seq.push(Instr::Unary {
                        op: Op::Push,
                        reg: pr,
                        pos,
                    });
                }

                // a ⟹ b lowers as ¬a ∨ b.
                let lhs = if b.op == Tok::Implies {
                    self.translate_not(&b.lhs, pos)
                } else {
                    self.translate_rval(&b.lhs)
                };
                let lhs = splice(&mut seq, lhs);
                seq.push(Instr::Load {
                    src: lhs,
                    dst: r1,
                    pos,
                });

                if pushed {
                    seq.push(Instr::Unary {
                        op: Op::Pop,
                        reg: I64_REG_2,
                        pos,
                    });
                } else {
                    seq.push(Instr::Load {
                        src: rhs,
                        dst: r2,
                        pos,
                    });
                }

                seq.push(Instr::Binary {
                    lhs: RVal::Reg(r2),
                    op: bin_op(b.op),
                    rhs: r1,
                    pos,
                });

                let mut dst = r1;
                if b.op.is_cmp_op() {
                    dst = BOOL_REG_1;
                    seq.push(Instr::Unary {
                        op: cmp_op(b.op),
                        reg: dst,
                        pos,
                    });
                }
                Value::Seq(SeqExpr { seq, dst })
            }
            Expr::Unary(u) => match u.op {
                Tok::Minus => {
                    let mut seq = Seq::new();
                    let v = self.translate_rval(&u.x);
                    let src = splice(&mut seq, v);
                    seq.push(Instr::Load {
                        src,
                        dst: I64_REG_1,
                        pos: u.start,
                    });
                    seq.push(Instr::Unary {
                        op: Op::Neg,
                        reg: I64_REG_1,
                        pos: u.start,
                    });
                    Value::Seq(SeqExpr {
                        seq,
                        dst: I64_REG_1,
                    })
                }
                Tok::Not => self.translate_not(&u.x, u.start),
                op => panic!("unexpected unary operator {op}"),
            },
            Expr::Paren(p) => self.translate_rval(&p.x),
            Expr::Ident(id) => Value::Val(RVal::Mem(Mem {
                off: self.state().vars[&id.name],
            })),
            Expr::Bool(l) => Value::Val(RVal::Bool(l.val)),
            Expr::I64(l) => Value::Val(RVal::I64(l.val)),
            Expr::F64(l) => Value::Val(RVal::F64(l.val)),
            Expr::String(l) => panic!("unexpected string literal at {}", l.start),
            Expr::Func(f) => panic!("unexpected func literal at {}", f.start),
        }
    }

    /// `¬x`: compare `x` against true, then set the destination byte iff the
    /// comparison did not hold.
    fn translate_not(&mut self, x: &Expr, pos: Pos) -> Value {
        let mut seq = self.bool_check(x, true);
        seq.push(Instr::Unary {
            op: Op::Setne,
            reg: BOOL_REG_1,
            pos,
        });
        Value::Seq(SeqExpr {
            seq,
            dst: BOOL_REG_1,
        })
    }
}

fn reg_type(size: i64) -> RegType {
    match size {
        1 => RegType::Bool,
        8 => RegType::I64,
        n => panic!("unexpected operand size {n}"),
    }
}

fn bin_op(tok: Tok) -> Op {
    match tok {
        Tok::Plus => Op::Add,
        Tok::Minus => Op::Sub,
        Tok::Multiply => Op::Mul,
        Tok::Divide => Op::Div,
        Tok::And => Op::And,
        Tok::Or => Op::Or,
        // Already desugared; the operator that remains is ∨.
        Tok::Implies => Op::Or,
        t if t.is_cmp_op() => Op::Cmp,
        t => panic!("unexpected binary operator {t}"),
    }
}

fn cmp_op(tok: Tok) -> Op {
    match tok {
        Tok::Less => Op::Setl,
        Tok::LessEq => Op::Setle,
        Tok::Equal => Op::Sete,
        Tok::NotEqual => Op::Setne,
        Tok::Greater => Op::Setg,
        Tok::GreaterEq => Op::Setge,
        t => panic!("unexpected comparison operator {t}"),
    }
}

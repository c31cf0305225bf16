#![forbid(unsafe_code)]

use lang_ir::{Frame, Instr, Op, RVal, Reg, RegType};

// Trap macro: printf("%s:%d: assertion violated\n", filename, line) then
// exit(1). The failing line number arrives in %rbx (the second i64 register).
const MACROS: &str = r#".macro AssertViolated
    movq $___fmt_assert, %rdi
    movq $___filename, %rsi
    movq %rbx, %rdx
    movq $0, %rax
    call printf
    movq $1, %rdi
    movq $0, %rax
    call exit
.endm
"#;

const TEXT_HEADER: &str = "\n\t.section .text\n\t.global main\n";

/// Print a frame as GNU-as-compatible AT&T x86-64 assembly, suitable for
/// `gcc -no-pie`. Every instruction carries its source position as a trailing
/// comment.
pub fn emit(filename: &str, frame: &Frame) -> String {
    let mut out = String::new();
    out.push_str(MACROS);
    out.push_str(TEXT_HEADER);
    emit_frame(&mut out, frame);
    out.push_str("\n\t.section .data\n");
    out.push_str("___fmt_assert: .string \"%s:%d: assertion violated\\n\"\n");
    out.push_str(&format!("___filename:   .string {filename:?}\n"));
    out
}

fn emit_frame(out: &mut String, frame: &Frame) {
    out.push_str(&format!("{}:\n", frame.name));
    out.push_str("\tpushq %rbp\n");
    out.push_str("\tmovq %rsp, %rbp\n");
    if frame.stack > 0 {
        out.push_str(&format!("\tsubq ${}, %rsp\n", frame.stack));
    }

    for instr in &frame.seq {
        emit_instr(out, instr);
    }

    out.push_str("\tmovq $0, %rax\n");
    out.push_str("\tleave\n");
    out.push_str("\tret\n");
}

fn emit_instr(out: &mut String, instr: &Instr) {
    match instr {
        Instr::Load { src, dst, pos } => {
            let text = format!("{} {}, {}", mov(dst.ty), rval(*src), reg(*dst));
            out.push_str(&format!("\t{text}  # {pos}\n"));
        }
        Instr::Store { src, dst, size, pos } => {
            let text = format!("{} {}, {}(%rbp)", mov(*size), rval(*src), dst.off);
            out.push_str(&format!("\t{text}  # {pos}\n"));
        }
        Instr::Binary { lhs, op, rhs, pos } => {
            let text = format!("{} {}, {}", mnemonic(*op, rhs.ty), rval(*lhs), reg(*rhs));
            out.push_str(&format!("\t{text}  # {pos}\n"));
        }
        Instr::Unary { op, reg: r, pos } => {
            let text = format!("{} {}", mnemonic(*op, r.ty), reg(*r));
            out.push_str(&format!("\t{text}  # {pos}\n"));
        }
        // The only call target is the trap macro, which GNU as invokes by
        // bare name.
        Instr::Call { label, pos } => out.push_str(&format!("\t{label}  # {pos}\n")),
        Instr::Jump { label, pos } => out.push_str(&format!("\tjmp {label}  # {pos}\n")),
        Instr::CJump { label, pos } => out.push_str(&format!("\tje {label}  # {pos}\n")),
        Instr::Label(label) => out.push_str(&format!("{label}:\n")),
    }
}

fn mov(ty: RegType) -> &'static str {
    match ty {
        RegType::Bool => "movb",
        RegType::I64 => "movq",
        RegType::F64 => panic!("unexpected f64 reg in mov"),
    }
}

fn mnemonic(op: Op, ty: RegType) -> &'static str {
    match (op, ty) {
        (Op::Push, RegType::I64) => "pushq",
        (Op::Pop, RegType::I64) => "popq",
        (Op::Neg, RegType::I64) => "negq",
        (Op::Add, RegType::I64) => "addq",
        (Op::Sub, RegType::I64) => "subq",
        (Op::Mul, RegType::I64) => "imulq",
        (Op::Div, RegType::I64) => "idivq",
        (Op::Cmp, RegType::I64) => "cmpq",
        (Op::Cmp, RegType::Bool) => "cmpb",
        (Op::And, RegType::Bool) => "andb",
        (Op::Or, RegType::Bool) => "orb",
        (Op::Setl, RegType::Bool) => "setl",
        (Op::Setle, RegType::Bool) => "setle",
        (Op::Sete, RegType::Bool) => "sete",
        (Op::Setne, RegType::Bool) => "setne",
        (Op::Setg, RegType::Bool) => "setg",
        (Op::Setge, RegType::Bool) => "setge",
        (op, ty) => panic!("unexpected {ty} reg for op {op}"),
    }
}

fn reg(r: Reg) -> &'static str {
    match (r.ty, r.second) {
        (RegType::Bool, false) => "%al",
        (RegType::Bool, true) => "%bl",
        (RegType::I64, false) => "%rax",
        (RegType::I64, true) => "%rbx",
        (RegType::F64, false) => "%xmm0",
        (RegType::F64, true) => "%xmm1",
    }
}

fn rval(v: RVal) -> String {
    match v {
        RVal::Bool(true) => "$1".to_string(),
        RVal::Bool(false) => "$0".to_string(),
        RVal::I64(n) => format!("${n}"),
        // f64 arithmetic has no dedicated emission yet; immediates render as
        // their IEEE-754 bit pattern so stores and loads stay printable.
        RVal::F64(x) => format!("${:#x}", x.to_bits()),
        RVal::Mem(m) => format!("{}(%rbp)", m.off),
        RVal::Reg(r) => reg(r).to_string(),
    }
}

#![forbid(unsafe_code)]

use crate::ir::{Frame, Instr, Mem, RVal, Reg};

/// Render a frame as one instruction per line. Translator tests pin their
/// expectations against this text form.
pub fn dump(frame: &Frame) -> String {
    let mut out = String::new();
    out.push_str(&frame.name.0);
    out.push('\n');
    for instr in &frame.seq {
        let line = match instr {
            Instr::Load { src, dst, pos } => {
                format!("load {} <- {}  // {pos}", reg(*dst), rval(*src))
            }
            Instr::Store { src, dst, size, pos } => {
                format!("store.{size} {} <- {}  // {pos}", mem(*dst), rval(*src))
            }
            Instr::Binary { lhs, op, rhs, pos } => {
                format!("{op} {} {}  // {pos}", reg(*rhs), rval(*lhs))
            }
            Instr::Unary { op, reg: r, pos } => format!("{op} {}  // {pos}", reg(*r)),
            Instr::Call { label, pos } => format!("call {label}  // {pos}"),
            Instr::Jump { label, pos } => format!("jump {label}  // {pos}"),
            Instr::CJump { label, pos } => format!("cjump {label}  // {pos}"),
            Instr::Label(label) => label.0.clone(),
        };
        out.push_str(&line);
        out.push('\n');
    }
    out
}

fn rval(v: RVal) -> String {
    match v {
        RVal::Bool(b) => format!("bool({b})"),
        RVal::F64(x) => format!("f64({x})"),
        RVal::I64(n) => format!("i64({n})"),
        RVal::Mem(m) => mem(m),
        RVal::Reg(r) => reg(r),
    }
}

fn mem(m: Mem) -> String {
    format!("m[{}]", m.off)
}

fn reg(r: Reg) -> String {
    format!("r{}.{}", r.ty, u8::from(r.second))
}

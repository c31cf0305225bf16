#![forbid(unsafe_code)]

use crate::ir::{Instr, RVal, Seq};

/// Drop register-to-itself loads. Expression lowering routes results through
/// the first register of a pair, which leaves `load r <- r` behind whenever a
/// compound operand already lives in its destination.
pub fn loads(seq: Seq) -> Seq {
    seq.into_iter()
        .filter(|instr| {
            !matches!(
                instr,
                Instr::Load {
                    src: RVal::Reg(src),
                    dst,
                    ..
                } if src == dst
            )
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use lang_lex::Pos;

    use super::*;
    use crate::ir::{BOOL_REG_1, BOOL_REG_2, I64_REG_1};

    #[test]
    fn drops_self_loads_only() {
        let pos = Pos::new(1, 1);
        let seq = vec![
            Instr::Load {
                src: RVal::Reg(BOOL_REG_1),
                dst: BOOL_REG_1,
                pos,
            },
            Instr::Load {
                src: RVal::Reg(BOOL_REG_1),
                dst: BOOL_REG_2,
                pos,
            },
            Instr::Load {
                src: RVal::I64(1),
                dst: I64_REG_1,
                pos,
            },
        ];
        let out = loads(seq);
        assert_eq!(out.len(), 2);
        assert!(out.iter().all(|i| !matches!(
            i,
            Instr::Load { src: RVal::Reg(s), dst, .. } if s == dst
        )));
    }
}

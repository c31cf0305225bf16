use lang_ir::{dump, loads, translate, Frame, Instr, Pass, RVal};
use pretty_assertions::assert_eq;

fn frame(src: &str, passes: &[Pass]) -> Frame {
    let (block, _, errs) = lang_parse::parse(src, "test.l");
    assert!(errs.is_empty(), "parse errors:\n{errs}");
    let (info, errs) = lang_types::check(&block, "test.l");
    assert!(errs.is_empty(), "check errors:\n{errs}");
    translate(&block, &info, passes)
}

fn has_self_load(f: &Frame) -> bool {
    f.seq.iter().any(|i| {
        matches!(i, Instr::Load { src: RVal::Reg(s), dst, .. } if s == dst)
    })
}

#[test]
fn translates_assert() {
    let f = frame("{ assert true; }", &[]);
    assert_eq!(f.stack, 0);
    assert_eq!(
        dump(&f),
        "main
load rbool.0 <- bool(true)  // 1:10
cmp rbool.0 bool(true)  // 1:10
cjump .L1  // 1:3
load ri64.1 <- i64(1)  // 1:3
call AssertViolated  // 1:3
.L1
"
    );
}

#[test]
fn translates_decl_assign_and_comparison() {
    let f = frame("{ let x := 2; set x ← x + 3; assert x = 5; }", &[loads]);
    assert_eq!(f.stack, 8);
    assert_eq!(
        dump(&f),
        "main
store.i64 m[-8] <- i64(2)  // 1:3
load ri64.0 <- m[-8]  // 1:25
load ri64.1 <- i64(3)  // 1:25
add ri64.0 ri64.1  // 1:25
store.i64 m[-8] <- ri64.0  // 1:15
load ri64.0 <- m[-8]  // 1:39
load ri64.1 <- i64(5)  // 1:39
cmp ri64.0 ri64.1  // 1:39
sete rbool.0  // 1:39
cmp rbool.0 bool(true)  // 1:39
cjump .L1  // 1:32
load ri64.1 <- i64(1)  // 1:32
call AssertViolated  // 1:32
.L1
"
    );
}

#[test]
fn implication_desugars_to_negated_disjunction() {
    let f = frame("{ assert true ⟹ false; }", &[loads]);
    assert_eq!(
        dump(&f),
        "main
load rbool.0 <- bool(true)  // 1:10
cmp rbool.0 bool(true)  // 1:10
setne rbool.0  // 1:10
load rbool.1 <- bool(false)  // 1:10
or rbool.0 rbool.1  // 1:10
cmp rbool.0 bool(true)  // 1:10
cjump .L1  // 1:3
load ri64.1 <- i64(1)  // 1:3
call AssertViolated  // 1:3
.L1
"
    );
}

#[test]
fn for_break_jumps_to_the_loop_labels() {
    let f = frame("{ for true { break; } }", &[]);
    assert_eq!(
        dump(&f),
        "main
.L1
load rbool.0 <- bool(true)  // 1:7
cmp rbool.0 bool(false)  // 1:7
cjump .L2  // 1:3
jump .L2  // 1:14
jump .L1  // 1:3
.L2
"
    );
}

#[test]
fn continue_jumps_to_the_loop_start() {
    let f = frame("{ for true { continue; } }", &[]);
    let text = dump(&f);
    assert!(text.contains("jump .L1  // 1:14"), "got:\n{text}");
}

#[test]
fn if_else_lays_out_both_arms() {
    let f = frame(
        "{ if true { assert true; } else { assert false; } }",
        &[loads],
    );
    assert_eq!(
        dump(&f),
        "main
load rbool.0 <- bool(true)  // 1:6
cmp rbool.0 bool(false)  // 1:6
cjump .L1  // 1:3
load rbool.0 <- bool(true)  // 1:20
cmp rbool.0 bool(true)  // 1:20
cjump .L2  // 1:13
load ri64.1 <- i64(1)  // 1:13
call AssertViolated  // 1:13
.L2
jump .L3  // 1:3
.L1
load rbool.0 <- bool(false)  // 1:42
cmp rbool.0 bool(true)  // 1:42
cjump .L4  // 1:35
load ri64.1 <- i64(1)  // 1:35
call AssertViolated  // 1:35
.L4
.L3
"
    );
}

#[test]
fn compound_rhs_is_saved_across_lhs_lowering() {
    let f = frame("{ let x := (1 + 2) · (3 + 4); }", &[loads]);
    assert_eq!(
        dump(&f),
        "main
load ri64.0 <- i64(3)  // 1:24
load ri64.1 <- i64(4)  // 1:24
add ri64.0 ri64.1  // 1:24
push ri64.0  // 1:12
load ri64.0 <- i64(1)  // 1:13
load ri64.1 <- i64(2)  // 1:13
add ri64.0 ri64.1  // 1:13
pop ri64.1  // 1:12
mul ri64.0 ri64.1  // 1:12
store.i64 m[-8] <- ri64.0  // 1:3
"
    );
}

#[test]
fn comparisons_pick_their_set_instruction() {
    let f = frame("{ assert 1 < 2 ∧ 3 ≥ 2; }", &[loads]);
    assert_eq!(
        dump(&f),
        "main
load ri64.0 <- i64(3)  // 1:20
load ri64.1 <- i64(2)  // 1:20
cmp ri64.0 ri64.1  // 1:20
setge rbool.0  // 1:20
push ri64.0  // 1:10
load ri64.0 <- i64(1)  // 1:10
load ri64.1 <- i64(2)  // 1:10
cmp ri64.0 ri64.1  // 1:10
setl rbool.0  // 1:10
pop ri64.1  // 1:10
and rbool.0 rbool.1  // 1:10
cmp rbool.0 bool(true)  // 1:10
cjump .L1  // 1:3
load ri64.1 <- i64(1)  // 1:3
call AssertViolated  // 1:3
.L1
"
    );
}

#[test]
fn unary_minus_negates_in_place() {
    let f = frame("{ let x := -3; }", &[loads]);
    assert_eq!(
        dump(&f),
        "main
load ri64.0 <- i64(3)  // 1:12
neg ri64.0  // 1:12
store.i64 m[-8] <- ri64.0  // 1:3
"
    );
}

#[test]
fn stack_layout_grows_downward_by_size() {
    let f = frame("{ let b := true; let x := 1; set b ← false; }", &[loads]);
    assert_eq!(f.stack, 9);
    assert_eq!(
        dump(&f),
        "main
store.bool m[-1] <- bool(true)  // 1:3
store.i64 m[-9] <- i64(1)  // 1:18
store.bool m[-1] <- bool(false)  // 1:30
"
    );
}

#[test]
fn loads_pass_removes_every_self_load() {
    let src = "{ assert ¬(1 < 2) ∨ (3 < 4) ∧ true; }";
    let without = frame(src, &[]);
    assert!(has_self_load(&without));
    let with = frame(src, &[loads]);
    assert!(!has_self_load(&with));
}

#[test]
fn assert_loads_its_own_line_number() {
    let f = frame("{\n    assert true;\n    assert false;\n}", &[loads]);
    let text = dump(&f);
    assert!(text.contains("load ri64.1 <- i64(2)  // 2:5"), "got:\n{text}");
    assert!(text.contains("load ri64.1 <- i64(3)  // 3:5"), "got:\n{text}");
}

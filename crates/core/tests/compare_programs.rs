use regex::Regex;

use kindred_core::compare::{compare_programs, CompareConfig};
use kindred_core::model::{BasicBlock, Instruction, Method, Program};
use kindred_core::similarity::Oracle;

fn ins(opcode: &str, offset: u64) -> Instruction {
    Instruction::new(opcode, "", offset, 2)
}

fn linear_method(class: &str, name: &str, opcodes: &[&str]) -> Method {
    let instructions: Vec<Instruction> =
        opcodes.iter().enumerate().map(|(i, op)| ins(op, i as u64 * 2)).collect();
    let end = instructions.len() as u64 * 2;
    let blocks = vec![BasicBlock {
        start: 0,
        end,
        instructions: instructions.clone(),
        successors: vec![],
    }];
    Method {
        class_name: class.into(),
        name: name.into(),
        descriptor: "()V".into(),
        instructions,
        blocks,
    }
}

fn sample_pair() -> (Program, Program) {
    let shared = linear_method(
        "Lcom/app/Stable;",
        "init",
        &["const", "move", "invoke-direct", "return-void"],
    );
    let original = linear_method(
        "Lcom/app/Worker;",
        "step",
        &["load", "test", "branch", "work", "work", "ret"],
    );
    let patched = linear_method(
        "Lcom/app/Worker;",
        "step",
        &["load", "test", "branch", "work", "work", "log", "ret"],
    );
    let a = Program {
        methods: vec![shared.clone(), original],
        strings: vec!["shared literal".into(), "only in a".into()],
    };
    let b = Program {
        methods: vec![shared, patched],
        strings: vec!["shared literal".into(), "only in b".into()],
    };
    (a, b)
}

#[test]
fn similar_method_pairs_carry_block_diffs() {
    let oracle = Oracle::new();
    let (a, b) = sample_pair();
    let result = compare_programs(&oracle, &a, &b, &CompareConfig::default()).unwrap();

    assert_eq!(result.methods.identical, vec![(0, 0)]);
    assert_eq!(result.methods.similar.len(), 1);
    assert!(result.methods.new.is_empty());
    assert!(result.methods.deleted.is_empty());

    // One diff entry for the one similar pair; identical pairs carry none.
    assert_eq!(result.diffs.len(), 1);
    let entry = &result.diffs[0];
    assert_eq!((entry.a, entry.b), (1, 1));
    assert!(entry.score > 0.0);
    assert_eq!(entry.diff.diff_blocks(), 1);

    assert!(result.score > 0.0 && result.score < 1.0);
}

#[test]
fn string_tables_are_matched_alongside_methods() {
    let oracle = Oracle::new();
    let (a, b) = sample_pair();
    let result = compare_programs(&oracle, &a, &b, &CompareConfig::default()).unwrap();

    assert_eq!(result.strings.identical, vec![(0, 0)]);
    // "only in a" / "only in b" pair up as the best remaining candidates.
    assert_eq!(result.strings.similar.len(), 1);
}

#[test]
fn empty_programs_compare_cleanly() {
    let oracle = Oracle::new();
    let empty = Program::default();
    let result = compare_programs(&oracle, &empty, &empty, &CompareConfig::default()).unwrap();

    assert!(result.methods.identical.is_empty());
    assert!(result.diffs.is_empty());
    assert_eq!(result.score, 0.0);
}

#[test]
fn unmatched_methods_drive_the_score_to_the_maximum() {
    let oracle = Oracle::new();
    let a = Program {
        methods: vec![linear_method("La;", "m", &["opa", "opb", "opc"])],
        strings: vec![],
    };
    let b = Program::default();
    let result = compare_programs(&oracle, &a, &b, &CompareConfig::default()).unwrap();

    assert_eq!(result.methods.deleted, vec![0]);
    assert_eq!(result.score, 1.0);
}

#[test]
fn excluded_class_names_are_skipped_at_method_level() {
    let oracle = Oracle::new();
    let (a, b) = sample_pair();
    let mut config = CompareConfig::default();
    config.methods.exclude_name = Some(Regex::new(r"^Lcom/app/Worker;").unwrap());

    let result = compare_programs(&oracle, &a, &b, &config).unwrap();
    assert_eq!(result.methods.skipped_a, vec![1]);
    assert_eq!(result.methods.skipped_b, vec![1]);
    assert!(result.diffs.is_empty());
}

#[test]
fn structural_scoring_still_matches_identical_methods() {
    let oracle = Oracle::new();
    let (a, b) = sample_pair();
    let config = CompareConfig { use_structural: true, ..CompareConfig::default() };
    let result = compare_programs(&oracle, &a, &b, &config).unwrap();

    // The exact pass is hash-based and unaffected by the structural metric.
    assert_eq!(result.methods.identical, vec![(0, 0)]);
    assert_eq!(result.methods.matched(), 2);
}

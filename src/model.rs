//! Reference-model equivalence checking.
//!
//! Ops are generated with abstract `u8` operands (via `Arbitrary` for the
//! fuzz target, via proptest strategies for the property tests) and resolved
//! against the pool's current state into well-formed [`Step`]s, the same
//! guarantee the byte decoder provides. Each step is then applied to both the
//! vector pool and a plain `Vec<i32>` pool; the reference applies the exact
//! value semantics, so any divergence in the move forms' storage reuse shows
//! up as a slot mismatch.

use core::mem;

use arbitrary::Arbitrary;
use proptest::strategy::{Just, Strategy};

use crate::{
    apply_step, concat_fits, Action, Step, VarPool, PUSH_MOVE_SENTINEL, PUSH_SENTINEL, VAR_COUNT,
};

/// The twelve operation kinds, without operands.
#[derive(Copy, Clone, Debug, Arbitrary)]
pub enum OpKind {
    PushBack,
    Update,
    Take,
    Drop,
    Concat,
    PushBackMove,
    UpdateMove,
    TakeMove,
    DropMove,
    ConcatMoveLeft,
    ConcatMoveRight,
    ConcatMoveBoth,
}

/// An operation with unresolved operands, as drawn from the fuzzer.
#[derive(Copy, Clone, Debug, Arbitrary)]
pub struct ModelOp {
    pub kind: OpKind,
    pub src: u8,
    pub dst: u8,
    pub src2: u8,
    pub operand: u8,
}

impl ModelOp {
    /// Resolves raw operands into in-range values for the pool's current
    /// sizes.
    ///
    /// Returns `None` for an update against an empty source, the analogue of
    /// the byte decoder failing to produce a valid index. A move-concat whose
    /// second source collides with the first is remapped to the next slot.
    pub(crate) fn finalize(self, pool: &VarPool) -> Option<Step> {
        let src = usize::from(self.src) % VAR_COUNT;
        let dst = usize::from(self.dst) % VAR_COUNT;

        let len = pool.len_of(src);
        let index = (len > 0).then(|| usize::from(self.operand) % len);
        let count = usize::from(self.operand) % (len + 1);

        let src2 = usize::from(self.src2) % VAR_COUNT;
        let src2_distinct = if src2 == src {
            (src2 + 1) % VAR_COUNT
        } else {
            src2
        };

        let action = match self.kind {
            OpKind::PushBack => Action::PushBack,
            OpKind::Update => Action::Update { index: index? },
            OpKind::Take => Action::Take { count },
            OpKind::Drop => Action::Drop { count },
            OpKind::Concat => Action::Concat { src2 },
            OpKind::PushBackMove => Action::PushBackMove,
            OpKind::UpdateMove => Action::UpdateMove { index: index? },
            OpKind::TakeMove => Action::TakeMove { count },
            OpKind::DropMove => Action::DropMove { count },
            OpKind::ConcatMoveLeft => Action::ConcatMoveLeft {
                src2: src2_distinct,
            },
            OpKind::ConcatMoveRight => Action::ConcatMoveRight {
                src2: src2_distinct,
            },
            OpKind::ConcatMoveBoth => Action::ConcatMoveBoth {
                src2: src2_distinct,
            },
        };

        Some(Step { src, dst, action })
    }
}

fn kind_strategy() -> impl Strategy<Value = OpKind> {
    proptest::prop_oneof![
        Just(OpKind::PushBack),
        Just(OpKind::Update),
        Just(OpKind::Take),
        Just(OpKind::Drop),
        Just(OpKind::Concat),
        Just(OpKind::PushBackMove),
        Just(OpKind::UpdateMove),
        Just(OpKind::TakeMove),
        Just(OpKind::DropMove),
        Just(OpKind::ConcatMoveLeft),
        Just(OpKind::ConcatMoveRight),
        Just(OpKind::ConcatMoveBoth),
    ]
}

proptest::prop_compose! {
    pub fn op_strategy()(
        kind in kind_strategy(),
        src in proptest::prelude::any::<u8>(),
        dst in proptest::prelude::any::<u8>(),
        src2 in proptest::prelude::any::<u8>(),
        operand in proptest::prelude::any::<u8>(),
    ) -> ModelOp {
        ModelOp { kind, src, dst, src2, operand }
    }
}

type RefPool = [Vec<i32>; VAR_COUNT];

/// Applies `step` to the reference pool with plain `Vec` semantics.
///
/// Move forms vacate the source slot here too; the pools must track each
/// other slot for slot, not just in the destination.
fn apply_reference(model: &mut RefPool, step: Step) {
    let Step { src, dst, action } = step;

    let guard_ok = |model: &RefPool, src2: usize| {
        concat_fits(model[src].len()) && concat_fits(model[src2].len())
    };

    match action {
        Action::PushBack => {
            let mut out = model[src].clone();
            out.push(PUSH_SENTINEL);
            model[dst] = out;
        }

        Action::Update { index } => {
            let mut out = model[src].clone();
            out[index] += 1;
            model[dst] = out;
        }

        Action::Take { count } => {
            let out = model[src][..count].to_vec();
            model[dst] = out;
        }

        Action::Drop { count } => {
            let out = model[src][count..].to_vec();
            model[dst] = out;
        }

        Action::Concat { src2 } => {
            if guard_ok(model, src2) {
                let mut out = model[src].clone();
                out.extend_from_slice(&model[src2]);
                model[dst] = out;
            }
        }

        Action::PushBackMove => {
            let mut out = mem::take(&mut model[src]);
            out.push(PUSH_MOVE_SENTINEL);
            model[dst] = out;
        }

        Action::UpdateMove { index } => {
            let mut out = mem::take(&mut model[src]);
            out[index] += 1;
            model[dst] = out;
        }

        Action::TakeMove { count } => {
            let mut out = mem::take(&mut model[src]);
            out.truncate(count);
            model[dst] = out;
        }

        Action::DropMove { count } => {
            let out = mem::take(&mut model[src]).split_off(count);
            model[dst] = out;
        }

        Action::ConcatMoveLeft { src2 } => {
            if guard_ok(model, src2) {
                let mut out = mem::take(&mut model[src]);
                out.extend_from_slice(&model[src2]);
                model[dst] = out;
            }
        }

        Action::ConcatMoveRight { src2 } => {
            if guard_ok(model, src2) {
                let mut out = model[src].clone();
                out.append(&mut model[src2]);
                model[dst] = out;
            }
        }

        Action::ConcatMoveBoth { src2 } => {
            if guard_ok(model, src2) {
                let mut out = mem::take(&mut model[src]);
                let mut right = mem::take(&mut model[src2]);
                out.append(&mut right);
                model[dst] = out;
            }
        }
    }
}

/// Runs `ops` against both pools, asserting slot-by-slot equality after
/// every step.
pub fn run_reference_equivalence(ops: Vec<ModelOp>) {
    let mut pool = VarPool::new();
    let mut reference: RefPool = Default::default();

    for (op_id, op) in ops.into_iter().enumerate() {
        let Some(step) = op.finalize(&pool) else {
            continue;
        };

        apply_reference(&mut reference, step);
        apply_step(&mut pool, step);

        for (var, expect) in reference.iter().enumerate() {
            assert!(
                pool.get(var).iter().eq(expect.iter()),
                "ModelOp #{op_id}: {step:?} diverged at var {var}: {:?} != {expect:?}",
                pool.get(var),
            );
        }
    }
}

//! An operation-level fuzzing harness for [`im::Vector`].
//!
//! A fuzz input is interpreted as a little program over a fixed pool of eight
//! vector variables: each iteration decodes a source slot, a destination slot,
//! an opcode byte, and any operands the opcode needs, then applies the
//! operation and stores the result back into the pool. Every operand is
//! range-checked at decode time against the pool's current state, so no
//! out-of-range index or size can ever reach the vector itself. The run ends
//! when the input buffer is exhausted.
//!
//! Each of the six logical operations (push_back, update, take, drop, and
//! concat in three flavors) comes in two forms:
//!
//! - a *value-preserving* form, which clones the source slot (an O(1)
//!   structural share) and mutates the clone, leaving the source untouched;
//! - an *ownership-transferring* form, which vacates the source slot and
//!   mutates the uniquely-owned value in place, letting the vector reuse its
//!   storage.
//!
//! The two forms must produce identical logical values given identical
//! operands. That equivalence, along with the vector's internal consistency,
//! is what the harness exists to break; see [`model`] for the reference-model
//! checks that detect divergence.

use core::mem;

use im::Vector;

use crate::input::Input;

pub mod input;
#[cfg(any(test, feature = "model"))]
pub mod model;

/// The sequence type under test.
pub type Seq = Vector<i32>;

/// Number of variable slots in the pool.
pub const VAR_COUNT: usize = 8;

/// log2 of `im::Vector`'s branching factor (64-way tree nodes).
pub const BRANCH_BITS: u32 = 6;

/// Operands at or above this length are never concatenated.
///
/// Keeps repeated concatenation over a long run well clear of the vector's
/// internal size accounting; below the threshold a concat always completes.
pub const MAX_CONCAT_LEN: usize = usize::MAX >> (BRANCH_BITS * 4);

/// Element appended by the value-preserving push.
pub const PUSH_SENTINEL: i32 = 42;

/// Element appended by the ownership-transferring push.
pub const PUSH_MOVE_SENTINEL: i32 = 21;

/// Opcode byte values; anything above `CONCAT_MOVE_LR` is a no-op.
mod opcode {
    pub const PUSH_BACK: u8 = 0;
    pub const UPDATE: u8 = 1;
    pub const TAKE: u8 = 2;
    pub const DROP: u8 = 3;
    pub const CONCAT: u8 = 4;
    pub const PUSH_BACK_MOVE: u8 = 5;
    pub const UPDATE_MOVE: u8 = 6;
    pub const TAKE_MOVE: u8 = 7;
    pub const DROP_MOVE: u8 = 8;
    pub const CONCAT_MOVE_L: u8 = 9;
    pub const CONCAT_MOVE_R: u8 = 10;
    pub const CONCAT_MOVE_LR: u8 = 11;
}

/// The fixed pool of vector variables a run operates on.
///
/// Slots start empty and are only ever replaced wholesale with an operation's
/// result. The pool lives for a single fuzz case.
pub struct VarPool {
    slots: [Seq; VAR_COUNT],
}

impl VarPool {
    /// Returns a pool with every slot holding the empty vector.
    pub fn new() -> VarPool {
        VarPool {
            slots: Default::default(),
        }
    }

    /// Returns a shared reference to slot `var`.
    pub fn get(&self, var: usize) -> &Seq {
        &self.slots[var]
    }

    /// Replaces slot `var` with `value`.
    pub fn put(&mut self, var: usize, value: Seq) {
        self.slots[var] = value;
    }

    /// Removes and returns the value in slot `var`, leaving it empty.
    ///
    /// The returned value is uniquely owned unless an earlier clone of it is
    /// still live in another slot, which is exactly the situation the move
    /// forms need to exercise.
    pub fn take(&mut self, var: usize) -> Seq {
        mem::take(&mut self.slots[var])
    }

    /// Returns the length of the vector in slot `var`.
    pub fn len_of(&self, var: usize) -> usize {
        self.slots[var].len()
    }
}

impl Default for VarPool {
    fn default() -> VarPool {
        VarPool::new()
    }
}

/// One decoded operation: which slots it touches and what it does.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct Step {
    pub src: usize,
    pub dst: usize,
    pub action: Action,
}

/// The twelve operations, with their decoded operands.
///
/// Operands are guaranteed in range for the pool state they were decoded
/// against: `index < len(src)`, `count <= len(src)`, `src2 < VAR_COUNT`, and
/// `src2 != src` for the move concats.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Action {
    PushBack,
    Update { index: usize },
    Take { count: usize },
    Drop { count: usize },
    Concat { src2: usize },
    PushBackMove,
    UpdateMove { index: usize },
    TakeMove { count: usize },
    DropMove { count: usize },
    ConcatMoveLeft { src2: usize },
    ConcatMoveRight { src2: usize },
    ConcatMoveBoth { src2: usize },
}

/// Whether a single operand's length is below the concatenation threshold.
pub fn concat_fits(len: usize) -> bool {
    len < MAX_CONCAT_LEN
}

/// The overflow guard: concatenation is attempted only when both operands
/// are strictly below [`MAX_CONCAT_LEN`].
pub fn can_concat(left: &Seq, right: &Seq) -> bool {
    concat_fits(left.len()) && concat_fits(right.len())
}

fn is_var(&byte: &u8) -> bool {
    usize::from(byte) < VAR_COUNT
}

fn read_var(input: &mut Input<'_>) -> arbitrary::Result<usize> {
    input.read_where(is_var).map(usize::from)
}

fn read_var_other_than(input: &mut Input<'_>, var: usize) -> arbitrary::Result<usize> {
    input
        .read_where(|&byte: &u8| usize::from(byte) < VAR_COUNT && usize::from(byte) != var)
        .map(usize::from)
}

fn read_index(input: &mut Input<'_>, pool: &VarPool, var: usize) -> arbitrary::Result<usize> {
    let len = pool.len_of(var);
    // An empty source admits no valid index, so this read can only end the
    // run via exhaustion.
    input
        .read_where(|&byte: &u8| usize::from(byte) < len)
        .map(usize::from)
}

fn read_count(input: &mut Input<'_>, pool: &VarPool, var: usize) -> arbitrary::Result<usize> {
    let len = pool.len_of(var);
    input
        .read_where(|&byte: &u8| usize::from(byte) <= len)
        .map(usize::from)
}

/// Decodes one operation from `input`, validating operands against `pool`.
///
/// Returns `Ok(None)` for an unrecognized opcode byte, which the run treats
/// as a no-op. An `Err` means the input ran out mid-operation and the run
/// should stop.
pub fn decode_step(input: &mut Input<'_>, pool: &VarPool) -> arbitrary::Result<Option<Step>> {
    let src = read_var(input)?;
    let dst = read_var(input)?;

    let action = match input.read::<u8>()? {
        opcode::PUSH_BACK => Action::PushBack,
        opcode::UPDATE => Action::Update {
            index: read_index(input, pool, src)?,
        },
        opcode::TAKE => Action::Take {
            count: read_count(input, pool, src)?,
        },
        opcode::DROP => Action::Drop {
            count: read_count(input, pool, src)?,
        },
        opcode::CONCAT => Action::Concat {
            src2: read_var(input)?,
        },
        opcode::PUSH_BACK_MOVE => Action::PushBackMove,
        opcode::UPDATE_MOVE => Action::UpdateMove {
            index: read_index(input, pool, src)?,
        },
        opcode::TAKE_MOVE => Action::TakeMove {
            count: read_count(input, pool, src)?,
        },
        opcode::DROP_MOVE => Action::DropMove {
            count: read_count(input, pool, src)?,
        },
        opcode::CONCAT_MOVE_L => Action::ConcatMoveLeft {
            src2: read_var_other_than(input, src)?,
        },
        opcode::CONCAT_MOVE_R => Action::ConcatMoveRight {
            src2: read_var_other_than(input, src)?,
        },
        opcode::CONCAT_MOVE_LR => Action::ConcatMoveBoth {
            src2: read_var_other_than(input, src)?,
        },
        _ => return Ok(None),
    };

    Ok(Some(Step { src, dst, action }))
}

/// Applies one decoded operation to the pool.
///
/// Results are computed in full before the destination slot is written, so
/// `src == dst` behaves as if the operation ran on a snapshot of the source.
/// Move forms vacate their source slot(s) and never re-read them afterwards.
pub fn apply_step(pool: &mut VarPool, step: Step) {
    let Step { src, dst, action } = step;

    match action {
        Action::PushBack => {
            let mut out = pool.get(src).clone();
            out.push_back(PUSH_SENTINEL);
            pool.put(dst, out);
        }

        Action::Update { index } => {
            let out = pool.get(src).update(index, pool.get(src)[index] + 1);
            pool.put(dst, out);
        }

        Action::Take { count } => {
            let out = pool.get(src).take(count);
            pool.put(dst, out);
        }

        Action::Drop { count } => {
            let out = pool.get(src).skip(count);
            pool.put(dst, out);
        }

        Action::Concat { src2 } => {
            if can_concat(pool.get(src), pool.get(src2)) {
                let mut out = pool.get(src).clone();
                out.append(pool.get(src2).clone());
                pool.put(dst, out);
            }
        }

        Action::PushBackMove => {
            let mut out = pool.take(src);
            out.push_back(PUSH_MOVE_SENTINEL);
            pool.put(dst, out);
        }

        Action::UpdateMove { index } => {
            let mut out = pool.take(src);
            let element = out[index];
            out.set(index, element + 1);
            pool.put(dst, out);
        }

        Action::TakeMove { count } => {
            let mut out = pool.take(src);
            out.truncate(count);
            pool.put(dst, out);
        }

        Action::DropMove { count } => {
            let mut head = pool.take(src);
            let tail = head.split_off(count);
            pool.put(dst, tail);
        }

        Action::ConcatMoveLeft { src2 } => {
            if can_concat(pool.get(src), pool.get(src2)) {
                let mut out = pool.take(src);
                out.append(pool.get(src2).clone());
                pool.put(dst, out);
            }
        }

        Action::ConcatMoveRight { src2 } => {
            if can_concat(pool.get(src), pool.get(src2)) {
                let mut out = pool.get(src).clone();
                out.append(pool.take(src2));
                pool.put(dst, out);
            }
        }

        Action::ConcatMoveBoth { src2 } => {
            if can_concat(pool.get(src), pool.get(src2)) {
                let mut out = pool.take(src);
                out.append(pool.take(src2));
                pool.put(dst, out);
            }
        }
    }
}

/// Decodes and applies operations from `data` against `pool` until the
/// buffer is exhausted.
pub fn run_steps(pool: &mut VarPool, data: &[u8]) -> bool {
    Input::new(data).run(|input| {
        if let Some(step) = decode_step(input, pool)? {
            apply_step(pool, step);
        }
        Ok(())
    })
}

/// The fuzz entry point: runs one input against a fresh pool.
///
/// There is no failure result. The interesting outcomes are a panic or abort
/// from inside the vector, which the fuzzing engine catches.
pub fn run_ops(data: &[u8]) -> bool {
    let mut pool = VarPool::new();
    run_steps(&mut pool, data)
}

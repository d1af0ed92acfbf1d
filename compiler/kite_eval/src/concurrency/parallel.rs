//! `pmap`, `pfilter` and `preduce`: the collection operations spread over
//! a pool of workers.
//!
//! `shares` is the number of workers (the configured default when absent).
//! Each pool thread runs its own evaluator seeded from the caller, so the
//! code sees the same globals as a sequential call would. Results keep the
//! input order. A call that panics leaves an error value in its place
//! instead of tearing down the pool.

use std::panic::{self, AssertUnwindSafe};

use kite_value::{resource_error, CodeValue, ControlAction, Node, Value, ValueKind};
use rayon::prelude::*;
use rayon::ThreadPoolBuilder;

use super::panic_message;
use crate::builtins::{code_arg, items_of};
use crate::evaluator::read;
use crate::registry::{Flow, NativeSpec, OpResult};
use crate::{Evaluator, WorkerSeed};

pub(crate) const OPS: &[NativeSpec] = &[
    NativeSpec::new("pmap", pmap),
    NativeSpec::new("pfilter", pfilter),
    NativeSpec::new("preduce", preduce),
];

fn shares_arg(eval: &mut Evaluator, args: &[Node], index: usize) -> Result<usize, Flow> {
    let default = eval.config().default_shares;
    Ok(eval.count_arg(args, index, default)?.max(1))
}

/// One call on a pool thread.
fn call_one(
    worker: &mut Evaluator,
    code: &CodeValue,
    args: Vec<Value>,
) -> Result<Value, ControlAction> {
    match panic::catch_unwind(AssertUnwindSafe(|| worker.call_code(code, args, None))) {
        Ok(Ok(value)) => Ok(value.materialize()),
        Ok(Err(action)) => Err(action),
        Err(payload) => Ok(Value::error(resource_error(
            "worker-panicked",
            panic_message(&*payload),
        ))),
    }
}

/// Run `jobs` through `f` on `shares` workers, results in job order.
fn spread<J, F>(seed: &WorkerSeed, shares: usize, jobs: Vec<J>, f: F) -> Result<Vec<Value>, Flow>
where
    J: Send,
    F: Fn(&mut Evaluator, J) -> Result<Value, ControlAction> + Send + Sync,
{
    let pool = ThreadPoolBuilder::new()
        .num_threads(shares)
        .thread_name(|index| format!("kite-share-{index}"))
        .build();
    let results: Vec<Result<Value, ControlAction>> = match pool {
        Ok(pool) => pool.install(|| {
            jobs.into_par_iter()
                .map_init(|| seed.evaluator(), |worker, job| f(worker, job))
                .collect()
        }),
        Err(error) => {
            tracing::warn!(%error, "worker pool unavailable, running sequentially");
            let mut worker = seed.evaluator();
            jobs.into_iter().map(|job| f(&mut worker, job)).collect()
        }
    };
    results
        .into_iter()
        .map(|result| result.map_err(Flow::from))
        .collect()
}

/// The sequence argument and copies of its members.
fn sequence(eval: &mut Evaluator, args: &[Node]) -> Result<(Value, Vec<Value>), Flow> {
    let value = eval.arg(args, 0)?;
    let items = items_of(&value)?;
    Ok((value, items))
}

fn rebuild(like: &Value, items: Vec<Value>) -> Result<Value, Flow> {
    Ok(read(like, |v| match &v.kind {
        ValueKind::Array(_) => Value::array(items),
        ValueKind::Tuple(_) => Value::tuple(items),
        _ => Value::list(items),
    })?)
}

/// `pmap(seq, code, shares?)`.
fn pmap(eval: &mut Evaluator, args: &[Node]) -> OpResult {
    eval.expect_args("pmap", args, 2, Some(3))?;
    let (value, items) = sequence(eval, args)?;
    let code = code_arg(eval, args, 1)?;
    let shares = shares_arg(eval, args, 2)?;
    tracing::debug!(items = items.len(), shares, "pmap");
    let results = spread(&eval.seed(), shares, items, |worker, item| {
        call_one(worker, &code, vec![item])
    })?;
    rebuild(&value, results)
}

/// `pfilter(seq, code, shares?)`.
fn pfilter(eval: &mut Evaluator, args: &[Node]) -> OpResult {
    eval.expect_args("pfilter", args, 2, Some(3))?;
    let (value, items) = sequence(eval, args)?;
    let code = code_arg(eval, args, 1)?;
    let shares = shares_arg(eval, args, 2)?;
    let copies = items.iter().map(Value::deep_copy).collect();
    let keep = spread(&eval.seed(), shares, copies, |worker, item| {
        call_one(worker, &code, vec![item])
    })?;
    let kept = items
        .into_iter()
        .zip(keep)
        .filter_map(|(item, keep)| keep.is_truthy().then_some(item))
        .collect();
    rebuild(&value, kept)
}

/// Fold `items` left to right with `code`. The first item seeds.
fn fold(
    worker: &mut Evaluator,
    code: &CodeValue,
    items: Vec<Value>,
) -> Result<Value, ControlAction> {
    let mut items = items.into_iter();
    let Some(mut acc) = items.next() else {
        return Ok(Value::null());
    };
    for item in items {
        worker.checkpoint()?;
        acc = call_one(worker, code, vec![acc, item])?;
        if acc.is_error() {
            break;
        }
    }
    Ok(acc)
}

/// `preduce(seq, code, init?, shares?)`.
///
/// Each worker folds one contiguous chunk; the partial results are then
/// folded in order, after `init` if one was given. The result matches
/// `reduce` whenever `code` is associative.
fn preduce(eval: &mut Evaluator, args: &[Node]) -> OpResult {
    eval.expect_args("preduce", args, 2, Some(4))?;
    let (_, items) = sequence(eval, args)?;
    let code = code_arg(eval, args, 1)?;
    let init = eval.arg_owned(args, 2)?;
    let shares = shares_arg(eval, args, 3)?;
    if items.is_empty() {
        return Ok(init);
    }

    let chunk = items.len().div_ceil(shares);
    let mut chunks = Vec::with_capacity(shares);
    let mut items = items.into_iter().peekable();
    while items.peek().is_some() {
        chunks.push(items.by_ref().take(chunk).collect::<Vec<_>>());
    }
    let partials = spread(&eval.seed(), shares, chunks, |worker, chunk| {
        fold(worker, &code, chunk)
    })?;
    if let Some(failed) = partials.iter().find(|partial| partial.is_error()) {
        return Err(Flow::Fail(failed.deep_copy()));
    }

    let seeded = if init.is_null() {
        partials
    } else {
        std::iter::once(init).chain(partials).collect()
    };
    let result = fold(eval, &code, seeded)?;
    if result.is_error() {
        return Err(Flow::Fail(result));
    }
    Ok(result)
}

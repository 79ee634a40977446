use std::time::Instant;

use lcc::{
    callconv::{
        invoke, invoke_frame, invoke_general, Arity, CallArgs, Frame, ReturnValue, VaList,
    },
    runtime::{object::Closure, value::Value},
    vm::{
        enter,
        options::{BenchOptions, CallPath},
        thread::Thread,
        values::MULTIPLE_VALUES_LIMIT,
    },
};

/// Sums its fixnum arguments. Returns the sum, the argument count, then the
/// indices 2.. up to the number of values captured in the closure.
fn sum(
    thread: &mut Thread,
    closure: &Closure,
    arglist: Option<&mut VaList<'_>>,
    nargs: usize,
    arg0: Value,
    arg1: Value,
    arg2: Value,
) -> ReturnValue {
    let args = CallArgs::new(arglist, nargs, arg0, arg1, arg2);
    let total: i64 = args.iter().filter_map(Value::as_fixnum).sum();
    let nvals = closure.captured()[0].as_fixnum().unwrap_or(2) as usize;

    let mut values = [Value::NIL; MULTIPLE_VALUES_LIMIT];
    values[0] = Value::fixnum(total);
    values[1] = Value::fixnum(nargs as i64);
    for (i, slot) in values.iter_mut().enumerate().take(nvals).skip(2) {
        *slot = Value::fixnum(i as i64);
    }
    thread.values(&values[..nvals])
}

fn main() {
    env_logger::init();

    let opts = match BenchOptions::parse() {
        Ok(opts) => opts,
        Err(err) => {
            eprintln!("Error: {}", err);
            std::process::exit(1);
        }
    };

    let closure = Closure::new("sum", sum, vec![Value::fixnum(opts.values as i64)]);
    let args: Vec<Value> = (1..=opts.nargs as i64).map(Value::fixnum).collect();
    let expected = Value::fixnum((opts.nargs * (opts.nargs + 1) / 2) as i64);
    let mut frame = Frame::from_slice(&args);

    let arity = Arity::of(opts.nargs);
    let uses_cursor =
        arity.needs_cursor() || matches!(opts.path, CallPath::General | CallPath::Frame);
    log::info!(
        "calling {} {} times with {} arguments via {} path ({:?}: {} fixed, cursor: {})",
        closure.name(),
        opts.iterations,
        opts.nargs,
        opts.path.as_ref(),
        arity,
        arity.fixed_count(),
        uses_cursor
    );

    let (mismatches, elapsed) = enter(|thread| {
        let mut mismatches = 0u64;
        let start = Instant::now();
        for _ in 0..opts.iterations {
            let ret = match opts.path {
                CallPath::Auto | CallPath::Fast => invoke(thread, &closure, &args),
                CallPath::General => invoke_general(thread, &closure, &args),
                CallPath::Frame => invoke_frame(thread, &closure, &mut frame),
            };
            let mv = thread.multiple_values();
            if ret.value != expected
                || ret.nvals != opts.values
                || mv.read(1) != Value::fixnum(opts.nargs as i64)
            {
                mismatches += 1;
            }
        }
        (mismatches, start.elapsed())
    });

    let per_call = elapsed.as_nanos() as f64 / opts.iterations.max(1) as f64;
    log::info!("finished in {:?}", elapsed);
    println!(
        "{} calls, {} args, {} path: {:?} ({:.2} ns/call)",
        opts.iterations,
        opts.nargs,
        opts.path.as_ref(),
        elapsed,
        per_call
    );

    if mismatches != 0 {
        eprintln!("Error: {} calls returned unexpected values", mismatches);
        std::process::exit(1);
    }
}

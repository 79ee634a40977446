use lcc::{
    callconv::RegisterSaveArea,
    gc::collect_roots,
    prelude::*,
    vm::threads,
};

/// Returns every argument it sees through a cursor as multiple values.
fn echo(
    thread: &mut Thread,
    closure: &Closure,
    arglist: Option<&mut VaList<'_>>,
    nargs: usize,
    arg0: Value,
    arg1: Value,
    arg2: Value,
) -> ReturnValue {
    let seen = CallArgs::new(arglist, nargs, arg0, arg1, arg2)
        .with_va_list(closure, |va| va.to_vec());
    thread.values(&seen)
}

/// Drops its first argument and applies the rest to the closure it captured.
fn drop_receiver(
    thread: &mut Thread,
    closure: &Closure,
    arglist: Option<&mut VaList<'_>>,
    nargs: usize,
    arg0: Value,
    arg1: Value,
    arg2: Value,
) -> ReturnValue {
    let target = unsafe { closure.captured()[0].as_closure() }.expect("captured closure");
    CallArgs::new(arglist, nargs, arg0, arg1, arg2).with_va_list(closure, |va| {
        va.skip();
        apply_va_list(thread, target, va)
    })
}

/// Copies its arguments into the call-arguments buffer and returns their count.
fn stash(
    thread: &mut Thread,
    _: &Closure,
    arglist: Option<&mut VaList<'_>>,
    nargs: usize,
    arg0: Value,
    arg1: Value,
    arg2: Value,
) -> ReturnValue {
    let copied = CallArgs::new(arglist, nargs, arg0, arg1, arg2).copy_to_call_args(thread);
    ReturnValue::single(Value::fixnum(copied.len() as i64))
}

/// Returns its first argument only, through the fixed slot.
fn first(
    _: &mut Thread,
    _: &Closure,
    _: Option<&mut VaList<'_>>,
    nargs: usize,
    arg0: Value,
    _: Value,
    _: Value,
) -> ReturnValue {
    if nargs == 0 {
        ReturnValue::none()
    } else {
        ReturnValue::single(arg0)
    }
}

fn fixnums(n: usize) -> Vec<Value> {
    (0..n as i64).map(|i| Value::fixnum(i * 3 - 7)).collect()
}

fn spill<'a>(save: &'a mut RegisterSaveArea, args: &[Value], closure: Value) -> VaList<'a> {
    assert!(args.len() <= 3, "only register arguments are spilled here");
    let mut fixed = [Value::NOTHING; 3];
    fixed[..args.len()].copy_from_slice(args);
    VaList::from_registers(save, &[], closure, args.len(), fixed)
}

fn cursor<'a>(save: &'a mut RegisterSaveArea, args: &'a [Value]) -> VaList<'a> {
    let split = args.len().min(3);
    let mut fixed = [Value::NOTHING; 3];
    fixed[..split].copy_from_slice(&args[..split]);
    VaList::from_registers(save, &args[split..], Value::NIL, args.len(), fixed)
}

#[test]
fn fast_and_general_paths_agree() {
    let closure = Closure::new("echo", echo, vec![]);
    let mut thread = Thread::new();
    for n in 0..=3 {
        let args = fixnums(n);

        let fast = invoke(&mut thread, &closure, &args);
        let fast_seen = thread.multiple_values().as_slice().to_vec();

        let general = invoke_general(&mut thread, &closure, &args);
        let general_seen = thread.multiple_values().as_slice().to_vec();

        let mut frame = Frame::from_slice(&args);
        let framed = invoke_frame(&mut thread, &closure, &mut frame);
        let frame_seen = thread.multiple_values().as_slice().to_vec();

        assert_eq!(fast, general);
        assert_eq!(fast, framed);
        assert_eq!(fast_seen, args);
        assert_eq!(general_seen, args);
        assert_eq!(frame_seen, args);
    }
}

#[test]
fn spilled_registers_read_back() {
    let owner = Closure::new("first", first, vec![]);
    let args = [Value::fixnum(1), Value::character('b'), Value::TRUE];
    for n in 0..=3 {
        let mut save = RegisterSaveArea::new();
        let va = spill(&mut save, &args[..n], owner.as_value());
        assert_eq!(va.closure(), owner.as_value());
        for (i, arg) in args[..n].iter().enumerate() {
            assert_eq!(va.at(i), *arg);
        }
    }
}

#[test]
fn skip_advances_index_space() {
    let args = fixnums(9);
    let mut reference_save = RegisterSaveArea::new();
    let reference = cursor(&mut reference_save, &args);
    let expected: Vec<Value> = reference.iter().collect();

    for k in 0..=args.len() {
        let mut save = RegisterSaveArea::new();
        let mut va = cursor(&mut save, &args);
        for _ in 0..k {
            va.skip();
        }
        assert_eq!(va.remaining_count(), args.len() - k);
        if k < args.len() {
            assert_eq!(va.at(0), expected[k]);
        }
    }
}

#[test]
fn tail_slices_reproduce_trailing_arguments() {
    let args = fixnums(7);
    let mut save = RegisterSaveArea::new();
    let mut va = cursor(&mut save, &args);
    for k in 0..=args.len() {
        let tail = va.tail(args.len() - k);
        let seen: Vec<Value> = (0..tail.remaining_count()).map(|i| tail.at(i)).collect();
        assert_eq!(seen, args[k..]);
    }
}

#[test]
fn frame_cursors_expose_frame_slots() {
    for len in [0, 2, 3, 4, 12] {
        let args = fixnums(len);
        let mut frame = Frame::new(len);
        for arg in &args {
            frame.push(*arg);
        }
        let va = VaList::from_frame(&mut frame, Value::NIL);
        assert_eq!(va.remaining_count(), len);
        for (i, arg) in args.iter().enumerate() {
            assert_eq!(va.at(i), *arg);
        }
    }
}

#[test]
fn five_arguments_through_the_general_path() {
    let [a, b, c, d, e] = [
        Value::fixnum(10),
        Value::fixnum(20),
        Value::character('c'),
        Value::TRUE,
        Value::NIL,
    ];
    let args = [a, b, c, d, e];
    let mut save = RegisterSaveArea::new();
    let va = cursor(&mut save, &args);

    // The first three resolve inside the register area, the rest in overflow.
    assert_eq!(va.registers_remaining(), 3);
    assert_eq!(
        [va.at(0), va.at(1), va.at(2), va.at(3), va.at(4)],
        [a, b, c, d, e]
    );
    assert_eq!(save.registers[3..], [a, b, c]);

    let closure = Closure::new("echo", echo, vec![]);
    let mut thread = Thread::new();
    let ret = invoke(&mut thread, &closure, &args);
    assert_eq!(ret.nvals, 5);
    assert_eq!(thread.multiple_values().as_slice(), &args);
}

#[test]
fn multiple_values_survive_until_the_next_call() {
    let closure = Closure::new("echo", echo, vec![]);
    let (x, y, z) = (Value::fixnum(1), Value::fixnum(2), Value::fixnum(3));
    enter(|thread| {
        let ret = thread.call(&closure, (x, y, z));
        assert_eq!(ret.value, x);
        assert_eq!(ret.nvals, 3);
        let mv = thread.multiple_values();
        assert_eq!([mv.read(0), mv.read(1), mv.read(2)], [x, y, z]);

        thread.call(&closure, (Value::TRUE,));
        assert_eq!(thread.multiple_values().size(), 1);
        assert_eq!(thread.multiple_values().as_slice(), &[Value::TRUE]);
    });
}

#[test]
fn receiver_can_be_dropped_and_rest_forwarded() {
    let target = Closure::new("echo", echo, vec![]);
    let forwarder = Closure::new("drop-receiver", drop_receiver, vec![target.as_value()]);
    let mut thread = Thread::new();

    for n in 1..=8 {
        let args = fixnums(n);
        let ret = invoke(&mut thread, &forwarder, &args);
        assert_eq!(ret.nvals, n - 1);
        assert_eq!(thread.multiple_values().as_slice(), &args[1..]);
    }
}

#[test]
fn fixed_slot_callees_ignore_the_cursor() {
    let closure = Closure::new("first", first, vec![]);
    let mut thread = Thread::new();
    assert_eq!(invoke(&mut thread, &closure, &[]), ReturnValue::none());
    for n in 1..=6 {
        let args = fixnums(n);
        assert_eq!(
            invoke(&mut thread, &closure, &args),
            ReturnValue::single(args[0])
        );
    }
}

#[test]
fn argument_regions_are_scannable() {
    let referenced = Closure::new("first", first, vec![]);
    let owner = Closure::new("echo", echo, vec![referenced.as_value()]);
    let reference = referenced.as_value();
    let args = [Value::fixnum(1), reference, Value::NIL, Value::TRUE, reference];

    let mut save = RegisterSaveArea::new();
    let va = cursor(&mut save, &args);
    assert_eq!(collect_roots(&va), vec![reference, reference]);

    let mut frame = Frame::from_slice(&args);
    assert_eq!(collect_roots(&frame), vec![reference, reference]);
    {
        let va = VaList::from_frame(&mut frame, owner.as_value());
        let roots = collect_roots(&va);
        assert!(roots.contains(&owner.as_value()));
        assert_eq!(roots.iter().filter(|v| **v == reference).count(), 2);
    }

    assert_eq!(collect_roots(&owner), vec![reference]);

    enter(|thread| {
        thread.call(&owner, [reference, Value::NIL, Value::TRUE, Value::FALSE]);
        assert_eq!(collect_roots(&*thread), vec![reference]);
        assert!(threads().num() >= 1);
    });
}

#[test]
fn passed_arguments_land_in_the_call_args_buffer() {
    let closure = Closure::new("stash", stash, vec![]);
    let mut thread = Thread::new();
    for n in 0..=9 {
        let args = fixnums(n);
        let ret = invoke(&mut thread, &closure, &args);
        assert_eq!(ret, ReturnValue::single(Value::fixnum(n as i64)));
        assert_eq!(thread.call_args().as_slice(), &args[..]);

        let mut frame = Frame::from_slice(&args);
        invoke_frame(&mut thread, &closure, &mut frame);
        assert_eq!(thread.call_args().as_slice(), &args[..]);
    }
    assert_eq!(thread.multiple_values().size(), 0);
}

// SPDX-License-Identifier: (MIT OR Apache-2.0)
//! Whole programs run through a captured-output interpreter.

use loxpp_interp::Interpreter;
use pretty_assertions::assert_eq;

fn run_with(mut interp: Interpreter, src: &str) -> Result<(), String> {
    let lexed = loxpp_lexer::Lexer::new(src).tokenize();
    assert!(lexed.errors.is_empty(), "lex errors: {:?}", lexed.errors);
    let parsed = loxpp_parser::Parser::new(lexed.tokens).parse();
    assert!(parsed.errors.is_empty(), "parse errors: {:?}", parsed.errors);
    if let Err(errors) = loxpp_resolve::resolve(&parsed.stmts) {
        panic!("resolve errors: {errors:?}");
    }
    interp.run(&parsed.stmts).map_err(|e| e.to_string())
}

/// Run `src` and return everything it printed.
fn output(src: &str) -> String {
    let (interp, out) = Interpreter::with_captured_output();
    if let Err(e) = run_with(interp, src) {
        panic!("runtime error: {e}\noutput so far:\n{}", out.lock());
    }
    let text = out.lock().clone();
    text
}

/// Run `src`, which must fail, and return the error message.
fn failure(src: &str) -> String {
    let (interp, _out) = Interpreter::with_captured_output();
    match run_with(interp, src) {
        Ok(()) => panic!("program succeeded but was expected to fail"),
        Err(e) => e,
    }
}

#[test]
fn block_shadowing_does_not_leak() {
    let out = output(
        "let x = 1; { let x = 2; assert(x == 2); println(x); } assert(x == 1); println(x);",
    );
    assert_eq!(out, "2\n1\n");
}

#[test]
fn counter_class_keeps_state() {
    let out = output(
        r#"
        class Counter {
            fn init(n) { self.n = n; }
            fn inc() { self.n = self.n + 1; }
        }
        let c = Counter(0);
        c.inc();
        c.inc();
        assert(c.n == 2);
        println(c.n);
        "#,
    );
    assert_eq!(out, "2\n");
}

#[test]
fn assignment_targets_evaluate_before_values() {
    let out = output(
        r#"
        let b = {};
        fn obj() { println("obj"); return b; }
        fn val() { println("val"); return 1; }
        obj().x = val();
        println(b.x);
        let items = [0];
        fn arr() { println("arr"); return items; }
        fn idx() { println("idx"); return 0; }
        arr()[idx()] = val();
        "#,
    );
    assert_eq!(out, "obj\nval\n1\narr\nidx\nval\n");
}

#[test]
fn missing_abstract_method_fails_at_definition() {
    let err = failure(
        r#"
        trait Greeter { abstract fn hello(); }
        class Quiet with Greeter {}
        "#,
    );
    assert_eq!(
        err,
        "Class 'Quiet' does not implement abstract method 'hello' from trait 'Greeter'."
    );
}

#[test]
fn abstract_method_may_be_inherited() {
    let out = output(
        r#"
        trait Greeter { abstract fn hello(); }
        class Base { fn hello() -> "hi"; }
        class Child extends Base with Greeter {}
        println(Child().hello());
        "#,
    );
    assert_eq!(out, "hi\n");
}

#[test]
fn negative_indices_wrap_and_overflow_fails() {
    assert_eq!(output("println([1, 2, 3][-1]);"), "3\n");
    assert_eq!(output("let a = [1, 2, 3, 4, 5]; println(a[-1] == a[4]);"), "true\n");
    assert_eq!(
        failure("println([1, 2, 3][3]);"),
        "Index 3 is out of bounds for length 3."
    );
    assert_eq!(failure("println([1, 2, 3][0.5]);"), "Index must be an integer, got 0.5.");
}

#[test]
fn enum_variants() {
    let out = output(
        r#"
        enum Color { Red, Rgb(r, g, b) }
        println(Color.Red);
        let c = Color.Rgb(1, 2, 3);
        println(c.r, c.g, c.b);
        println(c);
        "#,
    );
    assert_eq!(out, "Red\n1 2 3\n{ r: 1, g: 2, b: 3 }\n");
}

#[test]
fn catch_binds_the_thrown_instance() {
    let out = output(
        r#"
        class SomeError(msg) with Throwable {
            fn message() -> self.msg;
        }
        try {
            throw SomeError("boom");
        } catch e {
            assert(e is SomeError);
            println(e.message());
        }
        "#,
    );
    assert_eq!(out, "boom\n");
}

#[test]
fn catch_binds_message_of_internal_errors() {
    let out = output(
        r#"
        class Plain {}
        try { throw Plain(); } catch e { println(e); }
        try { let a = [1][5]; } catch e { println(e); }
        "#,
    );
    assert_eq!(
        out,
        "Class 'Plain' does not implement trait 'Throwable'.\nIndex 5 is out of bounds for length 1.\n"
    );
}

#[test]
fn uncaught_throw_reports_message() {
    assert_eq!(failure("throw Error(\"bad input\");"), "bad input");
}

#[test]
fn lazy_values_evaluate_once() {
    let out = output(
        r#"
        let count = 0;
        fn bump() { count = count + 1; return count; }
        let v = lazy bump();
        println(typeof v);
        println(v + 0);
        println(v + 0);
        println(count);
        println(typeof v);
        "#,
    );
    assert_eq!(out, "Lazy\n1\n1\n1\nNumber\n");
}

#[test]
fn overlapping_traits_conflict_in_either_order() {
    let prelude = "trait A { fn f() -> 1; } trait B { fn f() -> 2; }";
    for classes in ["class C with A, B {}", "class C with B, A {}"] {
        let err = failure(&format!("{prelude} {classes}"));
        assert_eq!(err, "A previously implemented trait already declares method 'f'.");
    }
}

#[test]
fn disjoint_traits_compose_in_any_order() {
    let out = output(
        r#"
        trait A { fn a() -> 1; }
        trait B { fn b() -> 2; }
        class X with A, B {}
        class Y with B, A {}
        println(X().a() + X().b(), Y().a() + Y().b());
        "#,
    );
    assert_eq!(out, "3 3\n");
}

#[test]
fn class_method_overrides_trait_default() {
    let out = output(
        r#"
        trait Named { fn name() -> "trait"; }
        class Thing with Named { fn name() -> "class"; }
        println(Thing().name());
        "#,
    );
    assert_eq!(out, "class\n");
}

#[test]
fn trait_signatures_must_match() {
    let err = failure(
        r#"
        trait Sized { abstract fn resize(width); }
        class Box with Sized { fn resize(height) {} }
        "#,
    );
    assert_eq!(err, "Parameter name mismatch in method 'resize'.");
}

#[test]
fn async_calls_return_awaitable_tasks() {
    let out = output(
        r#"
        fn async double(x) { return x * 2; }
        let task = double(21);
        println(await task);
        println(await task);
        println(typeof task);
        "#,
    );
    assert_eq!(out, "42\n42\nTask\n");
}

#[test]
fn async_errors_reraise_at_await() {
    let out = output(
        r#"
        fn async fail() { throw Error("bad"); }
        try {
            await fail();
        } catch e {
            println(e.message(), e is Error);
        }
        "#,
    );
    assert_eq!(out, "bad true\n");
}

#[test]
fn nested_awaits_do_not_deadlock() {
    let (mut interp, out) = Interpreter::with_captured_output();
    interp.set_worker_count(1);
    let src = r#"
        fn async leaf(n) { return n + 1; }
        fn async middle(n) { return await leaf(n) * 10; }
        println(await middle(1));
    "#;
    run_with(interp, src).unwrap();
    assert_eq!(*out.lock(), "20\n");
}

#[test]
fn iterable_instances_drive_for_in() {
    let out = output(
        r#"
        class Countdown with Iterable {
            fn init(n) { self.n = n; }
            fn has_next() -> self.n > 0;
            fn next() {
                self.n = self.n - 1;
                return self.n + 1;
            }
        }
        let seen = [];
        for x, i in Countdown(3) { seen.insert((i, x)); }
        println(seen);
        "#,
    );
    assert_eq!(out, "[ (0, 3), (1, 2), (2, 1) ]\n");
}

#[test]
fn non_iterable_instance_is_rejected() {
    let err = failure("class Thing {} for x in Thing() {}");
    assert_eq!(err, "Class 'Thing' does not implement trait 'Iterable'.");
}

#[test]
fn ranges() {
    let out = output(
        r#"
        let seen = [];
        for i in 0..3 { seen.insert(i); }
        println(seen);
        println((1..4).len(), (0..5).contains(2), (0..5).contains(5));
        println((2..4).to_array());
        "#,
    );
    assert_eq!(out, "[ 0, 1, 2 ]\n3 true false\n[ 2, 3 ]\n");
}

#[test]
fn for_in_over_collections() {
    let out = output(
        r#"
        for k, v in {a: 1, b: 2} { println(k, v); }
        for c, i in "hi" { println(i, c); }
        for x in (7, 8) { println(x); }
        for x in [1, 2, 3, 4] {
            if x == 2 { continue; }
            if x == 4 { break; }
            println(x);
        }
        "#,
    );
    assert_eq!(out, "a 1\nb 2\n0 h\n1 i\n7\n8\n1\n3\n");
}

#[test]
fn c_style_for_runs_increment_after_continue() {
    let out = output(
        r#"
        for (let i = 0; i < 4; i = i + 1) {
            if i == 1 { continue; }
            print(i, "");
        }
        "#,
    );
    assert_eq!(out, "0 2 3 ");
}

#[test]
fn deep_recursion_is_a_stack_overflow() {
    let (mut interp, _out) = Interpreter::with_captured_output();
    interp.set_max_call_depth(32);
    let err = run_with(interp, "fn f(n) { return f(n + 1); } f(0);").unwrap_err();
    assert_eq!(err, "Stack overflow.");
}

#[test]
fn closures_capture_their_frame() {
    let out = output(
        r#"
        fn counter() {
            let n = 0;
            return fn () { n = n + 1; return n; };
        }
        let next = counter();
        next();
        println(next());
        "#,
    );
    assert_eq!(out, "2\n");
}

#[test]
fn string_methods() {
    let out = output(
        r#"
        let s = "hello";
        s.append(" world");
        println(s);
        println(s.length(), s.to_upper());
        println("a,b,c".split(","));
        println("abc".index_of("c"), "abc".index_of("z"));
        println("ab"[1], "3.5".to_number() + 1);
        "#,
    );
    assert_eq!(out, "hello world\n11 HELLO WORLD\n[ a, b, c ]\n2 -1\nb 4.5\n");
}

#[test]
fn array_methods() {
    let out = output(
        r#"
        let a = [3, 1, 2];
        println(a.map(fn (x) -> x * 2));
        println(a.filter(fn (x) -> x > 1));
        println(a.reduce(fn (acc, x) -> acc + x, 0));
        println(a.pop(), a, a.len());
        println(a.join("-"), a.contains(2));
        "#,
    );
    assert_eq!(out, "[ 6, 2, 4 ]\n[ 3, 2 ]\n6\n3 [ 1, 2 ] 2\n1-2 true\n");
    assert_eq!(
        failure("[1].frobnicate();"),
        "No such method 'frobnicate' on type 'Array'."
    );
}

#[test]
fn namespaces_and_using() {
    let out = output(
        r#"
        namespace geometry {
            let unit = 1;
            fn double(x) -> x * 2;
        }
        println(geometry.double(geometry.unit));
        using {double} from geometry;
        println(double(4));
        "#,
    );
    assert_eq!(out, "2\n8\n");
    assert_eq!(
        failure("namespace n { let a = 1; } using b from n;"),
        "Undefined member 'b' in namespace 'n'."
    );
}

#[test]
fn destructuring() {
    let out = output(
        r#"
        let {a, b} = {a: 1, b: 2, c: 3};
        let [x, _, z] = (7, 8, 9);
        println(a, b, x, z);
        "#,
    );
    assert_eq!(out, "1 2 7 9\n");
    assert_eq!(
        failure("let {missing} = {a: 1};"),
        "Key 'missing' is not present in the dictionary."
    );
}

#[test]
fn match_runs_first_matching_case_only() {
    let out = output(
        r#"
        let x = 2;
        match x {
            case 1 -> println("one");
            case 2 -> println("two");
            case 2 -> println("again");
            case _ -> println("other");
        }
        match "z" { case "a" -> println("a"); case _ -> println("fallback"); }
        "#,
    );
    assert_eq!(out, "two\nfallback\n");
}

#[test]
fn static_methods_bind_self_type() {
    let out = output(
        r#"
        class Point(x, y) {
            static fn origin() -> Self(0, 0);
            fn sum() -> self.x + self.y;
        }
        Point.count = 5;
        println(Point.origin().sum(), Point.count);
        "#,
    );
    assert_eq!(out, "0 5\n");
}

#[test]
fn super_calls_reach_the_parent() {
    let out = output(
        r#"
        class Animal { fn speak() -> "..."; }
        class Dog extends Animal {
            fn speak() -> "woof " + super.speak();
        }
        println(Dog().speak(), Dog() is Animal, Animal() is Dog);
        "#,
    );
    assert_eq!(out, "woof ... true false\n");
}

#[test]
fn operator_protocols() {
    let out = output(
        r#"
        class Vec2(x, y) with Computable, Comparable, Printable {
            fn _add(other) -> Vec2(self.x + other.x, self.y + other.y);
            fn _eq(other) -> self.x == other.x && self.y == other.y;
            fn to_string() -> "(" + self.x + ", " + self.y + ")";
        }
        println(Vec2(1, 2) + Vec2(3, 4));
        println(Vec2(1, 2) == Vec2(1, 2));
        "#,
    );
    assert_eq!(out, "(4, 6)\ntrue\n");
    assert_eq!(
        failure("class P {} println(P() + 1);"),
        "Class 'P' does not implement trait 'Computable'."
    );
}

#[test]
fn indexable_instances() {
    let out = output(
        r#"
        class Grid with Indexable {
            fn init() { self.cells = {}; }
            fn get(index) -> self.cells[index] ?? 0;
            fn set(index, value) { self.cells[index] = value; }
        }
        let g = Grid();
        g["a"] = 5;
        println(g["a"], g["b"]);
        "#,
    );
    assert_eq!(out, "5 0\n");
}

#[test]
fn to_string_requires_printable() {
    assert_eq!(
        failure("class Loud { fn to_string() -> \"!\"; } println(Loud());"),
        "Class must implement trait 'Printable' to declare a 'to_string' method."
    );
}

#[test]
fn stringification() {
    let out = output(
        r#"
        class Thing {}
        fn named() {}
        enum E { A(x) }
        println(Thing(), Thing, named, fn () {}, E, E.A);
        println(1.5, 10, null, true, [], {}, (1, "a"));
        println(Number, clock);
        "#,
    );
    assert_eq!(
        out,
        "<instance Thing> <class Thing> <fn named> <lambda fn> <enum E> <variant E.A>\n\
         1.5 10 null true [] {} (1, a)\n\
         <type Number> <native fn>\n"
    );
}

#[test]
fn dict_literals_see_earlier_keys_and_spread() {
    let out = output(
        r#"
        let base = {a: 1};
        let d = {...base, b: 2, c: b + 1};
        println(d);
        println([0, ...[1, 2], ...d]);
        "#,
    );
    assert_eq!(out, "{ a: 1, b: 2, c: 3 }\n[ 0, 1, 2, 1, 2, 3 ]\n");
}

#[test]
fn silent_mode_suppresses_output() {
    let (mut interp, out) = Interpreter::with_captured_output();
    interp.set_silent(true);
    run_with(interp, "println(\"hidden\"); debug(\"also hidden\");").unwrap();
    assert_eq!(*out.lock(), "");
}

#[test]
fn calling_non_callables() {
    assert_eq!(failure("trait T {} T();"), "Traits cannot be constructed nor instantiated.");
    assert_eq!(
        failure("enum E { A } E();"),
        "Cannot directly call an enum. Call a variant or a method instead."
    );
    assert_eq!(failure("let x = 1; x();"), "Can only call functions and classes.");
    assert_eq!(failure("fn f(a) {} f();"), "Expected 1 arguments but got 0.");
}

#[test]
fn tuples_are_immutable() {
    assert_eq!(failure("let t = (1, 2); t[0] = 5;"), "Tuples are immutable.");
    assert_eq!(output("let t = (1, 2); println(t.1);"), "2\n");
}

#[test]
fn network_natives_round_trip_over_loopback() {
    let out = output(
        r#"
        let server = await server_listen(0);
        let port = server_port(server);
        let accepting = server_accept(server);
        let client = await socket_connect("127.0.0.1", port);
        let peer = await accepting;
        await socket_send(client, "ping");
        println(await socket_receive(peer, 16));
        await socket_close(client);
        await socket_close(peer);
        await server_close(server);
        "#,
    );
    assert_eq!(out, "ping\n");
}

#[test]
fn self_containing_collections_print() {
    let out = output(
        r#"
        let a = [1];
        a.insert(a);
        println(a);
        let d = {};
        d.me = d;
        println(d, d == d);
        "#,
    );
    assert_eq!(out, "[ 1, [...] ]\n{ me: {...} } true\n");
}

#[test]
fn huge_repeat_counts_fail_cleanly() {
    assert_eq!(
        failure("let n = 10 ** 20; let s = \"a\"; s.repeat(n);"),
        "Repeated string would be too long."
    );
}

#[test]
fn tasks_forcing_one_lazy_value_share_its_result() {
    let out = output(
        r#"
        let count = 0;
        fn compute() { sleep(50); count = count + 1; return 7; }
        let slow = lazy compute();
        fn async read() { return slow + 0; }
        let a = read();
        let b = read();
        println(await a, await b, count);
        "#,
    );
    assert_eq!(out, "7 7 1\n");
}

#[test]
fn lazy_self_reference_is_a_cycle() {
    assert_eq!(
        failure("let x = lazy x + 1; println(x);"),
        "Lazy value depends on itself."
    );
}

use pretty_assertions::assert_eq;

use super::*;
use crate::{
    codegen::env::{JavaScript, Ruby},
    util::test_utils::{compile_tests, StubHost},
};

mod ruby {
    use super::*;

    compile_tests! {
        use ruby;

        fn test_application() {
            let source = "(f 1 2) (g) (+ 1 2.5)";
            let fragment_ok = "
                f.(1, 2)
                g.()
                add.(1, 2.5)
            ";
        }

        fn test_atoms() {
            let source = r##"nil true -3 "a#{b}" :ok list?"##;
            let fragment_ok = r#"
                nil
                true
                -3
                "a\#{b}"
                :ok
                list_q
            "#;
        }

        fn test_def_sanitizes_name() {
            let source = "(def my-var? 10)";
            let fragment_ok = "my_var_q = 10";
        }

        fn test_fn() {
            let source = "(fn [a b] (+ a b)) (fn [a & more] more) (fn [] nil)";
            let fragment_ok = "
                ->(a, b) { (add.(a, b)) }
                ->(a, *more) { (more) }
                ->() { (nil) }
            ";
        }

        fn test_if_and_do() {
            let source = "(if (list? x) 1 2) (do (print 1) (print 2)) (do)";
            let fragment_ok = "
                (list_q.(x) ? 1 : 2)
                (print.(1); print.(2))
                ()
            ";
        }

        fn test_quote() {
            let source = r#"'(1 a "s" (b)) 'x"#;
            let fragment_ok = r#"
                [1, :a, "s", [:b]]
                :x
            "#;
        }

        fn test_quasiquote() {
            let source = "`(a ,x ,@ys)";
            let fragment_ok = "cons.(:a, cons.(x, concat.(ys, [])))";
        }

        fn test_apply_and_block() {
            let source = r#"(apply f args) (apply (fn [a] a) xs) (. xs "map" (block inc))"#;
            let fragment_ok = "
                f.(*args)
                (->(a) { (a) }).(*xs)
                xs.map(&inc)
            ";
        }

        fn test_send() {
            let source = r#"(. s "upcase") (. a "+" b) (. obj name 1) (. (f x) "size") (. 1 "succ")"#;
            let fragment_ok = r#"
                s.upcase()
                a.public_send("+", b)
                obj.public_send(name, 1)
                f.(x).size()
                (1).succ()
            "#;
        }

        fn test_call_head_grouping() {
            let source = "((fn [x] x) 1) ((make) 2)";
            let fragment_ok = "
                (->(x) { (x) }).(1)
                make.().(2)
            ";
        }

        fn test_try() {
            let source = r#"(try (risky) (catch e (. e "message")))"#;
            let fragment_ok = "begin; risky.(); rescue => e; e.message(); end";
        }

        fn test_macro_expansion() {
            let source = "
                (defmacro when (fn [c & body] nil))
                (when ready (go) (stop))
            ";
            let fragment_ok = "(ready ? (go.(); stop.()) : nil)";
        }

        fn test_macro_expanding_into_macro() {
            let source = "
                (defmacro when (fn [c & body] nil))
                (defmacro unless (fn [c & body] nil))
                (unless done (go))
            ";
            let fragment_ok = "(not_q.(done) ? (go.()) : nil)";
        }

        fn test_macro_defining_function() {
            let source = "
                (defmacro defn (fn [n p & b] nil))
                (defn inc [x] (+ x 1))
                (inc 2)
            ";
            let fragment_ok = "
                inc = ->(x) { (add.(x, 1)) }
                inc.(2)
            ";
        }

        fn test_special_forms_shadow_macros() {
            let source = "(defmacro if (fn [] nil)) (if a b c)";
            let fragment_ok = "(a ? b : c)";
        }

        fn test_defmacro_positions() {
            let source = "
                (do (defmacro when (fn [c & b] nil)) (when a b))
                (f (defmacro unless (fn [c & b] nil)))
            ";
            let fragment_ok = "
                ((a ? (b) : nil))
                f.(nil)
            ";
        }

        fn test_unquote_outside_quasiquote_is_a_call() {
            let source = "(unquote x)";
            let fragment_ok = "unquote.(x)";
        }

        fn test_arity_errors() {
            let source = "(if 1 2)";
            let expected_errors = &["`if` expects 3 operands, but got 2"];
        }

        fn test_fn_without_params() {
            let source = "(fn)";
            let expected_errors = &["`fn` expects at least 1 operand, but got 0"];
        }

        fn test_send_without_message() {
            let source = "(. x)";
            let expected_errors = &["`.` expects at least 2 operands, but got 1"];
        }

        fn test_empty_list_error() {
            let source = "()";
            let expected_errors = &["can't compile the empty list"];
        }

        fn test_def_expects_symbol() {
            let source = r#"(def "x" 1)"#;
            let expected_errors = &[r#"`def` expects a symbol as name, but got "x""#];
        }

        fn test_invalid_parameters() {
            let source = "(fn [a 1] a)";
            let expected_errors = &["invalid parameter list '(a 1)"];
        }

        fn test_misplaced_rest_marker() {
            let source = "(fn [& a b] a)";
            let expected_errors = &["invalid parameter list '(& a b)"];
        }

        fn test_malformed_catch() {
            let source = "(try 1 2)";
            let expected_errors = &["expected (catch <symbol> <handler>), but got 2"];
        }

        fn test_malformed_unquote() {
            let source = "`(a (unquote b c))";
            let expected_errors = &["`unquote` expects 1 operand, but got 2"];
        }

        fn test_read_error() {
            let source = "(f \"abc)";
            let expected_errors = &["3..8: unclosed string"];
        }

        fn test_unbounded_expansion() {
            let source = "(defmacro forever (fn [] nil)) (forever)";
            let expected_errors = &[
                "maximum macro expansion depth (512) exceeded while expanding `forever`",
            ];
        }

        fn test_macro_built_datum_is_too_deep() {
            let source = "(defmacro nest (fn [] nil)) (nest)";
            let expected_errors = &["expression nested deeper than 256 levels after expansion"];
        }

        fn test_failing_expansion() {
            let source = "(defmacro explode (fn [] nil)) (explode 1)";
            let expected_errors = &["failed to expand macro `explode`: boom"];
        }

        fn test_failing_definition() {
            let source = "(defmacro nope (fn [] nil)) (nope)";
            let expected_errors = &["failed to define macro `nope`: undefined method `nope'"];
        }
    }
}

mod javascript {
    use super::*;

    compile_tests! {
        use javascript;

        fn test_application() {
            let source = "(f 1 2) (g) (- 3 1)";
            let fragment_ok = "
                f(1, 2)
                g()
                sub(3, 1)
            ";
        }

        fn test_atoms() {
            let source = r#"nil false 2.5 "a\"b" :ok"#;
            let fragment_ok = r#"
                null
                false
                2.5
                "a\"b"
                Symbol.for("ok")
            "#;
        }

        fn test_top_level_def_is_declared() {
            let source = "(def x 10) (do (def a 1) (def a 2) (def b a))";
            let fragment_ok = "
                var x; (x = 10)
                var a, b; ((a = 1), (a = 2), (b = a))
            ";
        }

        fn test_fn() {
            let source = "(fn [a b] (+ a b)) (fn [a & more] more)";
            let fragment_ok = "
                ((a, b) => (add(a, b)))
                ((a, ...more) => (more))
            ";
        }

        fn test_fn_locals() {
            let source = "(fn [a] (def b a) b) (fn [a] (def a 1) a)";
            let fragment_ok = "
                ((a) => { let b; return ((b = a), b); })
                ((a) => ((a = 1), a))
            ";
        }

        fn test_nested_fn_locals_stay_in_their_scope() {
            let source = "(fn [] (def x 1) (fn [] (def y 2) y))";
            let fragment_ok = "
                (() => { let x; return ((x = 1), (() => { let y; return ((y = 2), y); })); })
            ";
        }

        fn test_if_and_do() {
            let source = "(if ok 1 2) (do (print 1) (print 2)) (do)";
            let fragment_ok = "
                (ok ? 1 : 2)
                (print(1), print(2))
                (void 0)
            ";
        }

        fn test_quote() {
            let source = "'(1 a (b nil))";
            let fragment_ok = r#"[1, Symbol.for("a"), [Symbol.for("b"), null]]"#;
        }

        fn test_quasiquote() {
            let source = "`(a ,x ,@ys)";
            let fragment_ok = r#"cons(Symbol.for("a"), cons(x, concat(ys, [])))"#;
        }

        fn test_apply_and_block() {
            let source = "(apply f args) (block inc)";
            let fragment_ok = "
                f(...args)
                inc
            ";
        }

        fn test_send() {
            let source = r#"(. s "toUpperCase") (. m "has-key" k) (. obj name 1) (. 1 "toString")"#;
            let fragment_ok = r#"
                s.toUpperCase()
                m["has-key"](k)
                obj[name](1)
                (1).toString()
            "#;
        }

        fn test_try() {
            let source = r#"(try (risky) (catch e (. e "message")))"#;
            let fragment_ok = "
                (() => { try { return risky(); } catch (e) { return e.message(); } })()
            ";
        }

        fn test_macro_defining_function() {
            let source = "
                (defmacro defn (fn [n p & b] nil))
                (defn inc [x] (+ x 1))
            ";
            let fragment_ok = "var inc; (inc = ((x) => (add(x, 1))))";
        }

        fn test_arity_errors() {
            let source = "(quote a b)";
            let expected_errors = &["`quote` expects 1 operand, but got 2"];
        }
    }
}

#[test]
fn test_defmacro_hands_compiled_function_to_host() {
    let mut host = StubHost::new();
    let mut compiler = Compiler::<_, Ruby>::new(&mut host);
    let node = crate::reader::read("(defmacro when (fn [c & body] nil))", &mut Vec::new())
        .unwrap()
        .unwrap();

    assert_eq!(compiler.compile(&node), Ok(None));
    assert!(compiler.macros().contains("when"));
    assert_eq!(compiler.macros().names(), ["when"]);
    drop(compiler);

    assert_eq!(
        host.evaluated,
        [("when".to_string(), "->(c, *body) { (nil) }".to_string())]
    );
    assert!(host.ran.is_empty());
}

#[test]
fn test_load_runs_fragments_in_order() {
    let mut host = StubHost::new();
    let fragments = Compiler::<_, JavaScript>::new(&mut host)
        .load("(def x 1) (defmacro when (fn [c & b] nil)) (when x (f))")
        .unwrap();

    assert_eq!(fragments, ["var x; (x = 1)", "(x ? (f()) : null)"]);
    assert_eq!(host.ran, fragments);
    assert_eq!(host.evaluated.len(), 1);
}

#[test]
fn test_load_reports_read_errors() {
    let mut host = StubHost::new();
    let error = Compiler::<_, Ruby>::new(&mut host)
        .load("(def x 1) (f")
        .unwrap_err();

    assert_eq!(error.to_string(), "10..11: unbalanced parentheses");
    assert!(host.ran.is_empty());
}

#[test]
fn test_macros_survive_into_a_new_session() {
    let mut host = StubHost::new();
    let mut compiler = Compiler::<_, Ruby>::new(&mut host);
    compiler.load("(defmacro when (fn [c & b] nil))").unwrap();
    let macros = compiler.into_macros();

    let mut other = StubHost::new();
    let mut compiler = Compiler::<_, JavaScript>::with_macros(&mut other, macros);
    let node = crate::reader::read("(when a b)", &mut Vec::new()).unwrap().unwrap();
    assert_eq!(compiler.compile(&node), Ok(Some("(a ? (b) : null)".to_string())));
    assert!(other.evaluated.is_empty());
}

#[test]
fn test_long_quasiquote_exceeds_nesting_limit() {
    let mut host = StubHost::new();
    let mut compiler = Compiler::<_, Ruby>::new(&mut host);

    let long = Node::marked(markers::QUASIQUOTE, Node::List(vec![Node::symbol("a"); 1_000]));
    assert_eq!(compiler.compile(&long), Err(Error::NestingTooDeep));

    let short = Node::marked(markers::QUASIQUOTE, Node::List(vec![Node::symbol("a"); 200]));
    let fragment = compiler.compile(&short).unwrap().unwrap();
    assert_eq!(fragment.matches("cons.(:a, ").count(), 200);
}

#[test]
fn test_deepest_readable_form_compiles() {
    let src = format!("{}x{}", "(f ".repeat(255), ")".repeat(255));
    let mut host = StubHost::new();
    let fragments = Compiler::<_, JavaScript>::new(&mut host).load(&src).unwrap();
    assert_eq!(fragments.len(), 1);
    assert!(fragments[0].starts_with("f(f(f("));
}

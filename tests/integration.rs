use csxp::evaluator;
use csxp::interpreter::{eval_str, Error};
use csxp::types::truthy;

fn assert_all_true(cases: &[(&str, &str)]) {
    for (name, src) in cases {
        match eval_str(src) {
            Ok(v) => assert!(truthy(&v), "{}: {} gave {}", name, src, v),
            v => panic!("{}: unexpected result: {:?}", name, v),
        }
    }
}

#[test]
fn basic_eval() {
    assert_all_true(&[
        ("true itself", "true"),
        ("true identity", "(= true true)"),
        ("false identity", "(= false false)"),
        ("not= true", "(not= false true)"),
        ("invert false", "(not false)"),
        ("invert nil", "(not nil)"),
        ("invert eq", "(= (not true) false)"),
        ("number", "1234"),
        ("number neq", "(not= 1234 1235)"),
        ("string", "\"string\""),
        ("string neq", "(not= \"string\" \"strig\")"),
        ("string neq longer", "(not= \"string\" \"stringo\")"),
        ("vec eq", "(= [1 2 5] [1 2 5])"),
        ("vec neq partial", "(not= [1 2 5] [1 2])"),
        ("vec neq longer", "(not= [1 2 5] [1 2 5 6])"),
        ("empty seq", "()"),
        ("empty seq eq empty vec", "(= () [])"),
        ("empty seq neq empty map", "(not= () {})"),
        ("empty seq neq non-empty", "(not= () '(1))"),
        ("hex", "(= 0xFF 255)"),
        ("hex prefix case", "(= 0XFFFF 0xffff)"),
        ("radix", "(= 2r0110 6)"),
    ]);
}

#[test]
fn not_equal_compares_against_first() {
    assert_all_true(&[
        ("all distinct", "(not= 1 2 3)"),
        ("later pair equal", "(not= 1 2 2)"),
        ("one matches first", "(not (not= 1 2 1))"),
        ("all equal", "(= 1 1 1)"),
        ("one differs", "(not (= 1 1 2))"),
    ]);
}

#[test]
fn special_form_def() {
    assert_all_true(&[
        ("def lookup seq", "(def L '(a b c)) (= L '(a b c))"),
        ("def returns symbol", "(= (def M 1) 'M)"),
        ("def then lookup", "(def M 1) (= M 1)"),
    ]);
}

#[test]
fn special_form_if() {
    assert_all_true(&[
        ("if false no else", "(= (if false 3) nil)"),
        ("if true else", "(= (if true 3 4) 3)"),
        ("if nil", "(= (if nil 3 4) 4)"),
        ("if empty seq", "(= (if () 3 4) 3)"),
        ("if empty str", "(= (if \"\" 3 4) 3)"),
        ("if zero", "(= (if 0 3 4) 3)"),
        ("nested if nils", "(= (if (if true nil true) 3 4) 4)"),
        ("if nested in vec", "(= [1 (if true 3 9) 5] [1 3 5])"),
    ]);
}

#[test]
fn special_form_do() {
    assert_all_true(&[
        ("do single item", "(= (do 1) 1)"),
        ("do four items", "(= (do 1 2 3 true) true)"),
        ("do empty", "(= (do) nil)"),
        (
            "do nested if",
            "(= (do 1 (if true 4 5) 3 (if false 9 8)) 8)",
        ),
    ]);
}

#[test]
fn special_form_let() {
    assert_all_true(&[
        ("let with num", "(= (let [a 37] a) 37)"),
        ("sequential bindings", "(= (let [a 1 b (inc a)] b) 2)"),
        (
            "aliasing let",
            r#"
            (= (let [x 7]
                 (let [x (inc x)]
                   (assert (= x 8)))
                 x)
               7)
            "#,
        ),
    ]);
}

#[test]
fn special_form_quote() {
    assert_all_true(&[
        ("quote vec", "(= '(1 2 3 4 5 6) [1 2 3 4 5 6])"),
        ("quote num", "(= '4 4)"),
        ("quote sym", "(= (quote A) 'A)"),
        ("quote map", "(= '{} {})"),
        ("quote multi arg", "(= (quote 1 2 3 4 5 6) 1)"),
        ("quote multi arg map", "(= (quote {} {} {}) {})"),
        ("quote plus", "(= (quote (+ 1 2)) '(+ 1 2))"),
        ("double quote", "(= ''a '(quote a))"),
    ]);
}

#[test]
fn special_form_fn() {
    assert_all_true(&[
        ("inline call fn", "(= ((fn [a] [a a]) 3) [3 3])"),
        ("let fn", "(= (let [f (fn [a] [a a])] (f 4) (f 5)) [5 5])"),
        (
            "multiform let",
            r#"
            (= (let [f (if false 3 (fn [a] [a a]))]
                 (f 6)
                 (if true (f 33) (f 44)))
               [33 33])
            "#,
        ),
        ("variadic", "(= ((fn [a & more] more) 1 2 3) [2 3])"),
        ("defn", "(defn add [a b] (+ a b)) (= (add 2 3) 5)"),
        (
            "recursive defn",
            "(defn fact [n] (if (= n 0) 1 (* n (fact (dec n))))) (= (fact 5) 120)",
        ),
    ]);
}

#[test]
fn destructure_vec() {
    assert_all_true(&[
        ("vec binding 1", "(= (let [[x y] [9 10]] x) 9)"),
        ("vec binding seq", "(= (let [[x y] '(9 10)] y) 10)"),
        ("missing binding", "(= (let [[x y] [9]] y) nil)"),
        (
            "nested let binding",
            r#"
            (= (let [fst (fn [[x y]] x)]
                 (let [[x y] ['(1 2 3) '(9 10 11 12)]]
                   (fst y)))
               9)
            "#,
        ),
        (
            "nested vec with rest",
            r#"
            (= (let [scnd (fn [[x y]] y)]
                 (let [[x & y] '(9 10 11 12)]
                   (scnd y)))
               11)
            "#,
        ),
        (
            "multiple bindings",
            r#"
            (= (let [scnd (fn [[x y]] y)
                     [x & y] [9 10 11 12]]
                 (scnd y))
               11)
            "#,
        ),
        (
            "as",
            r#"
            (= (let [scnd (fn [[x y]] y)]
                 (let [[x :as y] '(9 10 11 12)]
                   (assert (= x 9))
                   (scnd y)))
               10)
            "#,
        ),
        (
            "nested vectors",
            "(= (let [[[x1 y1] [x2 y2]] [[1 2] [3 4]]] [x1 y1 x2 y2]) [1 2 3 4])",
        ),
        (
            "rest and as",
            "(= (let [[a b & c :as v] [5 6 7 8 9 10]] [a b c v]) [5 6 [7 8 9 10] [5 6 7 8 9 10]])",
        ),
    ]);
}

#[test]
fn namespaces() {
    assert_all_true(&[
        ("ns qualifies defs", "(ns my.space) (def x 3) (= my.space/x 3)"),
        (
            "unqualified falls back to internal",
            "(ns my.space) (= (inc 1) 2)",
        ),
    ]);
}

#[test]
fn eval_errors() {
    let cases = [
        "(if)",
        "(if true)",
        "(1 2 3)",
        "(assert false)",
        "(let [x] x)",
        "(fn (a) a)",
        "(def 1 2)",
        "(let [[a] 1] a)",
        "no-such-thing",
        "no.such.ns/thing",
    ];
    for src in cases.iter() {
        match eval_str(src) {
            Err(Error::Eval(e)) => log::debug!("{} failed with {}", src, e),
            v => panic!("{}: unexpected result: {:?}", src, v),
        }
    }
}

#[test]
fn read_errors() {
    for src in ["(+ 1 2", ")", "[1 2)", "\"open", "{:a}"].iter() {
        match eval_str(src) {
            Err(Error::Read(_)) => (),
            v => panic!("{}: unexpected result: {:?}", src, v),
        }
    }
}

#[test]
fn assert_message() {
    match eval_str("(assert (= 1 2) \"sums\")") {
        Err(Error::Eval(e @ evaluator::Error::AssertFailed { .. })) => {
            assert_eq!(e.to_string(), "assert failed: (= 1 2)\n\"sums\"")
        }
        v => panic!("unexpected result: {:?}", v),
    }
}

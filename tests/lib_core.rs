use csxp::environment::{Environment, ModuleMember};
use csxp::evaluator::{self, Args};
use csxp::interpreter::{eval_all, eval_str, standard_environment, Error};
use csxp::types::{truthy, Callable, Value};
use std::cell::Cell;
use std::rc::Rc;

fn assert_all_true(cases: &[(&str, &str)]) {
    for (name, src) in cases {
        match eval_str(src) {
            Ok(v) => assert!(truthy(&v), "{}: {} gave {}", name, src, v),
            v => panic!("{}: unexpected result: {:?}", name, v),
        }
    }
}

fn assert_all_fail(cases: &[(&str, &str)]) {
    for (name, src) in cases {
        match eval_str(src) {
            Err(Error::Eval(_)) => (),
            v => panic!("{}: unexpected result: {:?}", name, v),
        }
    }
}

#[test]
fn when() {
    assert_all_true(&[
        ("when true", "(= (when true 4) 4)"),
        ("when true empty", "(= (when true) nil)"),
        ("when false empty", "(= (when false) nil)"),
        ("when true multiple", "(= (when true (inc 9) 4) 4)"),
        ("when false", "(= (when false 4) nil)"),
    ]);
}

#[test]
fn comment() {
    assert_all_true(&[
        ("comment empty", "(= (comment) nil)"),
        ("comment seq", "(= (comment [1 2 3 4]) nil)"),
        ("comment is form", "(= (if (comment :b) :a :c) :c)"),
        ("unbound inside", "(= (comment (no-such-fn)) nil)"),
    ]);
}

#[test]
fn count() {
    assert_all_true(&[
        ("vec", "(= (count [:a :b 7 \\a]) 4)"),
        ("list", "(= (count '(:a :b 7 \\a)) 4)"),
        ("map", "(= (count {:a 1 :b 2}) 2)"),
        ("nil", "(= (count nil) 0)"),
        ("lazy", "(= (count (take 4 (repeat 1))) 4)"),
    ]);
    assert_all_fail(&[("keyword", "(count :a)"), ("two args", "(count [] [])")]);
}

#[test]
fn some() {
    assert_all_true(&[
        ("truthy", "(= (some (fn [x] x) [false 2]) 2)"),
        ("nothing true", "(= (some (fn [x] x) [false false]) nil)"),
        ("empty seq", "(= (some identity []) nil)"),
        ("eval seq", "(= (some (fn [x] x) ((fn [] [false 3]))) 3)"),
    ]);
    assert_all_fail(&[
        ("no args", "(some)"),
        ("one arg", "(some (fn [x] x))"),
        ("not callable", "(some 1 [])"),
        ("not sequence", "(some (fn [x] x) 1)"),
    ]);
}

#[test]
fn seq_first_rest_next() {
    assert_all_true(&[
        ("seq empty", "(= (seq '()) nil)"),
        ("seq vec", "(= (seq [1 2]) '(1 2))"),
        ("seq nil", "(= (seq nil) nil)"),
        ("first empty", "(= (first []) nil)"),
        ("first", "(= (first '(1 2)) 1)"),
        ("first nil", "(= (first nil) nil)"),
        ("rest empty", "(= (rest []) '())"),
        ("rest one", "(= (rest '(1)) '())"),
        ("rest", "(= (rest [1 2 3]) '(2 3))"),
        ("rest nil", "(= (rest nil) '())"),
        ("next one", "(= (next '(1)) nil)"),
        ("next", "(= (next [1 2]) '(2))"),
        ("next nil", "(= (next nil) nil)"),
        ("second", "(= (second [1 2 3]) 2)"),
    ]);
    assert_all_fail(&[
        ("seq no args", "(seq)"),
        ("seq number", "(seq 2)"),
        ("first number", "(first 2)"),
        ("rest number", "(rest 2)"),
        ("next two args", "(next [] [])"),
    ]);
}

#[test]
fn cons() {
    assert_all_true(&[
        ("empty sequence", "(= (cons 2 '()) '(2))"),
        ("empty vec", "(= (cons 2 []) '(2))"),
        ("nil seq", "(= (cons nil nil) '(nil))"),
        ("vec", "(= (cons 1 [2 3 4 5 6]) '(1 2 3 4 5 6))"),
        ("nested", "(= (cons [3 4] '(1 2)) '([3 4] 1 2))"),
    ]);
    assert_all_fail(&[
        ("no args", "(cons)"),
        ("three args", "(cons 2 [] [])"),
        ("not a seq", "(cons 1 2)"),
    ]);
}

#[test]
fn reduce() {
    assert_all_true(&[
        ("multi item", "(= (reduce + [1 2 3 4 5]) 15)"),
        ("empty seq", "(= (reduce + []) 0)"),
        ("one item", "(= (reduce (fn [_] 3) [1]) 1)"),
        ("empty seq with val", "(= (reduce (fn [_] 3) 2 []) 2)"),
        ("two items with val", "(= (reduce + 1 [2 3]) 6)"),
        ("eval seq with eval val", "(= (reduce + (inc 1) [(+ 2 3) 1]) 8)"),
    ]);
    assert_all_fail(&[
        ("one arg", "(reduce +)"),
        ("non sequence arg", "(reduce + 2)"),
        ("four args", "(reduce + 2 [] [])"),
    ]);
}

#[test]
fn take_and_lazy_sequences() {
    assert_all_true(&[
        ("subset", "(= (take 3 '(1 2 3 4 5 6)) '(1 2 3))"),
        ("more than present", "(= (take 3 [1 2]) '(1 2))"),
        ("from nil", "(= (take 1 nil) '())"),
        ("negative", "(= (take -1 [1]) '())"),
        ("iterate", "(= (take 3 (iterate inc 2)) '(3 4 5))"),
        ("iterate eval func", "(= (take 3 (iterate (identity inc) 2)) '(3 4 5))"),
        ("empty lazy-seq", "(= (lazy-seq) '())"),
        (
            "self-referential lazy-seq",
            r#"
            (defn positive-numbers [n]
              (lazy-seq (cons n (positive-numbers (inc n)))))
            (= (take 3 (positive-numbers 3)) '(3 4 5))
            "#,
        ),
        ("repeat forever", "(= (take 3 (repeat nil)) '(nil nil nil))"),
        ("counted repeat", "(= (repeat 3 8) '(8 8 8))"),
        ("negative repeat", "(= (repeat -2 2) '())"),
        ("repeatedly", "(= (take 2 (repeatedly (fn [] 1))) '(1 1))"),
        ("counted repeatedly", "(= (repeatedly 3 (fn [] :x)) '(:x :x :x))"),
        ("map", "(= (take 3 (map inc (iterate inc 0))) '(2 3 4))"),
        ("filter", "(= (filter (fn [x] (< 2 x)) [1 2 3 4]) '(3 4))"),
        ("range", "(= (range 3) '(0 1 2))"),
        ("range start end step", "(= (range 10 4 -3) '(10 7))"),
        ("infinite range", "(= (take 2 (range)) '(0 1))"),
        ("every?", "(and (every? identity [1 2]) (not (every? identity [1 nil])))"),
    ]);
    assert_all_fail(&[
        ("iterate not callable", "(iterate 2 2)"),
        ("repeat bad count", "(repeat :2 2)"),
        ("take non numeric", "(take [] [])"),
    ]);
}

#[test]
fn long_lazy_sequences() {
    assert_all_true(&[
        ("count range", "(= (count (range 100000)) 100000)"),
        ("count iterate", "(= (count (take 100000 (iterate inc 0))) 100000)"),
        (
            "filter skips a long run",
            "(= (first (seq (filter (fn [x] (< 50000 x)) (range 100000)))) 50001)",
        ),
        (
            "rest of a long skip run",
            "(= (first (rest (filter (fn [x] (< 50000 x)) (range 100000)))) 50002)",
        ),
        ("huge counted repeat", "(= (take 2 (repeat 9223372036854775807 1)) '(1 1))"),
    ]);
}

#[test]
fn collections() {
    assert_all_true(&[
        ("conj vector", "(= (conj [1] 2 3) [1 2 3])"),
        ("conj list", "(= (conj '(1) 2 3) '(3 2 1))"),
        ("conj map", "(= (conj {:a 1} [:b 2]) {:a 1 :b 2})"),
        ("assoc", "(= (assoc {:a 1} :a 2 :b 3) {:b 3 :a 2})"),
        ("assoc nil", "(= (assoc nil :a 1) {:a 1})"),
        ("get", "(= (get {:a 1} :a) 1)"),
        ("get default", "(= (get {:a 1} :b 5) 5)"),
        ("get vector", "(= (get [7 8] 1) 8)"),
        ("hash-map", "(= (hash-map :a 1) {:a 1})"),
        ("list", "(= (list 1 2) '(1 2))"),
        ("vector", "(= (vector 1 2) [1 2])"),
        ("map keys evaluated", "(= {(inc 1) :two} {2 :two})"),
        ("empty?", "(and (empty? []) (empty? nil) (not (empty? [1])))"),
        ("nil?", "(and (nil? nil) (not (nil? false)))"),
    ]);
}

#[test]
fn strings_and_reading() {
    assert_all_true(&[
        ("str", "(= (str \"a\" 1 :b nil \\c) \"a1:bc\")"),
        ("str escapes", "(= (count (str \"a\\nb\")) 3)"),
        ("pr-str", "(= (pr-str \"a\" 1) (str \"\\\"a\\\" 1\"))"),
        ("read-string", "(= (read-string \"(+ 1 2)\") '(+ 1 2))"),
        ("println returns nil", "(= (println) nil)"),
    ]);
}

#[derive(Debug)]
struct Counter {
    calls: Rc<Cell<usize>>,
    result: Value,
}

impl Callable for Counter {
    fn name(&self) -> &str {
        "counter"
    }

    fn invoke(&self, _env: &mut Environment, _args: Args) -> evaluator::Result {
        self.calls.set(self.calls.get() + 1);
        Ok(self.result.clone())
    }
}

fn calls_made(src: &str, result: Value) -> usize {
    let calls = Rc::new(Cell::new(0));
    let mut env = match standard_environment() {
        Ok(env) => env,
        v => panic!("unexpected result: {:?}", v.map(|_| ())),
    };
    env.set_internal(
        "f",
        Value::wrap_callable(Counter {
            calls: calls.clone(),
            result,
        }),
    );
    if let Err(e) = eval_all(src, "test", &mut env) {
        panic!("{} failed: {}", src, e);
    }
    calls.get()
}

#[test]
fn and_or_short_circuit() {
    assert_eq!(calls_made("(and true (f) (f))", Value::Bool(false)), 1);
    assert_eq!(calls_made("(and true (f) (f))", Value::Bool(true)), 2);
    assert_eq!(calls_made("(or false (f) (f))", Value::Integer(1)), 1);
    assert_eq!(calls_made("(or false (f) (f))", Value::Nil), 2);
    assert_eq!(calls_made("(= 1 2 (f))", Value::Nil), 0);
    assert_eq!(calls_made("(def s (lazy-seq (f) nil)) (first s) (first s)", Value::Nil), 1);
}

#[test]
fn and_or_values() {
    assert_all_true(&[
        ("and no args", "(= (and) true)"),
        ("and one arg", "(= (and 2) 2)"),
        ("and stops at nil", "(= (and true 3 nil \"hi\" false 7) nil)"),
        ("and all truthy", "(= (and true 3 \"hi\" \\b :key 7) 7)"),
        ("or no args", "(= (or) nil)"),
        ("or last falsy", "(= (or false nil false) false)"),
        ("or first truthy", "(= (or nil 4 false) 4)"),
    ]);
}

fn init_shapes(env: &mut Environment, ns: &str) {
    env.create_module(ns).add_members(vec![
        ModuleMember {
            name: "sides",
            member: Value::Integer(4),
        },
        ModuleMember {
            name: "name",
            member: Value::String("square".into()),
        },
    ]);
}

#[test]
fn require_registered_module() {
    let mut env = match standard_environment() {
        Ok(env) => env,
        v => panic!("unexpected result: {:?}", v.map(|_| ())),
    };
    env.register_module("geo.shapes", init_shapes);
    let src = r#"
        (ns user)
        (require 'geo.shapes '[geo.shapes :as s])
        (and (= geo.shapes/sides 4)
             (= s/name "square"))
    "#;
    match eval_all(src, "test", &mut env) {
        Ok(v) => assert!(truthy(&v)),
        v => panic!("unexpected result: {:?}", v),
    }
    match eval_all("(require '[geo.shapes :s])", "test", &mut env) {
        Err(Error::Eval(evaluator::Error::Require(_))) => (),
        v => panic!("unexpected result: {:?}", v),
    }
}

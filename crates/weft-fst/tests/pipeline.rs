// End-to-end properties of the compile / determinize / minimize / compose
// pipeline.

use weft_fst::compose::compose;
use weft_fst::determinize::determinize;
use weft_fst::eval::{accepts, apply, shortest_path, words};
use weft_fst::minimize::minimize;
use weft_fst::{builder, compile, Boolean, Fst, Tropical};

fn agree_on(a: &Fst<Boolean>, b: &Fst<Boolean>, samples: &[&str]) {
    for s in samples {
        assert_eq!(accepts(a, s), accepts(b, s), "disagree on {s:?}");
    }
}

const SAMPLES: &[&str] = &[
    "", "a", "b", "c", "ab", "ba", "aa", "bb", "abc", "aab", "abb", "aaa", "abab",
    "baab", "abba",
];

#[test]
fn union_of_patterns_equals_pattern_of_union() {
    let combined: Fst<Boolean> = compile("ab*|ba*").unwrap();
    let left: Fst<Boolean> = compile("ab*").unwrap();
    let right: Fst<Boolean> = compile("ba*").unwrap();
    let built = builder::union(&left, &right);
    agree_on(&combined, &built, SAMPLES);
}

#[test]
fn determinization_preserves_the_language() {
    for pattern in ["a*b", "(a|b)*abb", "a{2,4}(b|c)", "(ab)+|a?"] {
        let fst: Fst<Boolean> = compile(pattern).unwrap();
        let det = determinize(&fst);
        agree_on(&fst, &det, SAMPLES);
        assert!(det.props().epsilon_free);
    }
}

#[test]
fn minimization_preserves_the_language_and_never_grows() {
    for pattern in ["a*b", "(a|b)*abb", "aa|ab|ba|bb", "(abc)|(abd)"] {
        let fst: Fst<Boolean> = compile(pattern).unwrap();
        let det = determinize(&fst);
        let min = minimize(&det).unwrap();
        agree_on(&det, &min, SAMPLES);
        assert!(min.num_states() <= det.num_states());

        let again = minimize(&min).unwrap();
        assert_eq!(again.num_states(), min.num_states());
    }
}

#[test]
fn composition_with_the_identity_is_the_identity() {
    let rel: Fst<Boolean> = compile("(a:x)(b:y)*").unwrap();
    let identity: Fst<Boolean> = compile("(x|y)*").unwrap();
    let composed = compose(&rel, &identity).unwrap();
    for input in ["a", "ab", "abb"] {
        let mut expected: Vec<String> =
            apply(&rel, input, 10_000).map(|(s, _)| s).collect();
        let mut got: Vec<String> =
            apply(&composed, input, 10_000).map(|(s, _)| s).collect();
        expected.sort();
        expected.dedup();
        got.sort();
        got.dedup();
        assert_eq!(got, expected, "input {input:?}");
    }
}

#[test]
fn chained_rewrites_compose() {
    let lower: Fst<Boolean> = compile("(a:x)|(b:x)").unwrap();
    let upper: Fst<Boolean> = compile("x:z").unwrap();
    let chained = compose(&lower, &upper).unwrap();
    for input in ["a", "b"] {
        let outputs: Vec<String> =
            apply(&chained, input, 10_000).map(|(s, _)| s).collect();
        assert_eq!(outputs, vec!["z".to_string()], "input {input:?}");
    }
}

#[test]
fn best_first_search_and_shortest_path_agree() {
    // two analyses of "aa": one direct at cost 3, one in two steps at cost 2
    let fst: Fst<Tropical> = compile("(aa)<3.0>|(a<1.0>)(a<1.0>)").unwrap();
    let results: Vec<(String, Tropical)> = apply(&fst, "aa", 10_000).collect();
    assert_eq!(results.len(), 2);
    assert_eq!(results[0].1, Tropical::new(2.0));
    assert_eq!(results[1].1, Tropical::new(3.0));

    let (path, weight) = shortest_path(&fst).unwrap();
    assert_eq!(path, vec!["a".to_string(), "a".to_string()]);
    assert_eq!(weight, Tropical::new(2.0));
}

#[test]
fn multicharacter_symbols_tokenize_greedily() {
    let fst: Fst<Boolean> = compile("(w'[Pl]'):(ws)").unwrap();
    assert!(accepts(&fst, "w[Pl]"));
    let outputs: Vec<String> =
        apply(&fst, "w[Pl]", 10_000).map(|(s, _)| s).collect();
    assert_eq!(outputs, vec!["ws".to_string()]);
}

#[test]
fn words_enumerates_a_finite_language_completely() {
    let fst: Fst<Boolean> = compile("(a|b)c?").unwrap();
    let mut inputs: Vec<String> =
        words(&fst, 100, 100_000).into_iter().map(|p| p.input).collect();
    inputs.sort();
    assert_eq!(inputs, vec!["a", "ac", "b", "bc"]);
}

#[test]
fn export_is_stable_across_equal_compilations() {
    let a: Fst<Boolean> = compile("(a|b)*abb").unwrap();
    let b: Fst<Boolean> = compile("(a|b)*abb").unwrap();
    assert_eq!(
        minimize(&determinize(&a)).unwrap().export_transitions(),
        minimize(&determinize(&b)).unwrap().export_transitions()
    );
}

//! A miniature morphological cascade: compile a lexicon and a rewrite rule,
//! compose them, and transduce a few surface forms.
//!
//! Run with `cargo run --example cascade`.

use weft_fst::compose::compose;
use weft_fst::determinize::determinize;
use weft_fst::eval::{apply_inverse, words};
use weft_fst::{compile, FstError, Tropical};

fn main() -> Result<(), FstError> {
    // lexical forms: a stem plus an optional plural marker
    let lexicon = compile::<Tropical>("(cat|dog)(('[+Pl]':s)<1.0>)?")?;
    // orthography: nothing to rewrite here, the identity over surface letters
    let surface = compile::<Tropical>("[a-z]*")?;
    let analyzer = compose(&lexicon, &surface)?;

    println!("language of the lexicon:");
    for path in words(&determinize(&lexicon), 10, 10_000) {
        println!("  {} -> {} <{}>", path.input, path.output, path.weight.value());
    }

    // the composed machine reads lexical strings; surface forms are
    // analyzed by running the relation backwards
    for form in ["cat", "cats", "dogs", "cation"] {
        let analyses: Vec<(String, Tropical)> =
            apply_inverse(&analyzer, form, 10_000).collect();
        if analyses.is_empty() {
            println!("{form}: no analysis");
        } else {
            for (output, weight) in analyses {
                println!("{form}: {output} <{}>", weight.value());
            }
        }
    }
    Ok(())
}

// build.rs

//! Generates the `t!` macro from `locales/<lang>.toml`.
//!
//! The language comes from a `lang_*` feature, then `RIT_LANG`, then `en`.
//! Keys missing from the selected language fall back to English, and using a
//! key that exists nowhere is a compile error.

use std::collections::BTreeMap;
use std::env;
use std::fs;
use std::path::Path;

const FALLBACK_LANG: &str = "en";

fn main() {
    let lang = effective_language();
    println!("cargo:rustc-env=RIT_LANG_EFFECTIVE={lang}");
    println!("cargo:rerun-if-env-changed=RIT_LANG");
    println!("cargo:rerun-if-changed=build.rs");
    println!("cargo:rerun-if-changed=locales/");

    let translations = load_translations(&lang);
    let out_dir = env::var("OUT_DIR").expect("cargo always sets OUT_DIR for build scripts");
    fs::write(
        Path::new(&out_dir).join("translations.rs"),
        render_macro(&translations),
    )
    .expect("Failed to write translations.rs");
}

/// Feature flags win over the environment; several features pick the first
/// one alphabetically.
fn effective_language() -> String {
    let mut features: Vec<String> = env::vars()
        .filter_map(|(key, _)| key.strip_prefix("CARGO_FEATURE_LANG_").map(str::to_lowercase))
        .collect();
    features.sort();

    match features.as_slice() {
        [] => env::var("RIT_LANG").unwrap_or_else(|_| FALLBACK_LANG.to_string()),
        [only] => only.clone(),
        [first, ..] => {
            println!(
                "cargo:warning=Several language features enabled ({features:?}), using '{first}'."
            );
            first.clone()
        }
    }
}

fn read_locale(lang: &str) -> Option<BTreeMap<String, String>> {
    let path = format!("locales/{lang}.toml");
    let content = fs::read_to_string(&path).ok()?;
    Some(toml::from_str(&content).unwrap_or_else(|e| panic!("Failed to parse {path}: {e}")))
}

fn load_translations(lang: &str) -> BTreeMap<String, String> {
    let mut translations = read_locale(FALLBACK_LANG)
        .unwrap_or_else(|| panic!("Missing fallback language file locales/{FALLBACK_LANG}.toml"));

    if lang != FALLBACK_LANG {
        match read_locale(lang) {
            Some(specific) => translations.extend(specific),
            None => println!(
                "cargo:warning=Language file 'locales/{lang}.toml' not found. Falling back to '{FALLBACK_LANG}'."
            ),
        }
    }
    translations
}

/// One macro arm per key, each expanding to a string literal so the result
/// can be used as a `format!` string.
fn render_macro(translations: &BTreeMap<String, String>) -> String {
    let mut code = String::from("#[macro_export]\nmacro_rules! t {\n");
    for (key, value) in translations {
        code.push_str(&format!("    ({key:?}) => {{ {value:?} }};\n"));
    }
    code.push_str(
        "    ($key:expr) => {{ compile_error!(concat!(\"Missing translation key: \", $key)) }};\n",
    );
    code.push_str("}\n");
    code
}

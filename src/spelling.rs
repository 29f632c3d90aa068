//! Spelling variants of historical town names.
//!
//! Records written before the 20th century spelling reforms use digraphs that
//! modern gazetteers no longer do (`Czegléd` for `Cegléd`, `Debreczen` for
//! `Debrecen`, a closing `y` where today an `i` is written). Lookups try the
//! name as written first and then these modernized forms.

use lazy_static::lazy_static;
use regex::{Captures, Regex};

lazy_static! {
    static ref SUBSTITUTIONS: Vec<(Regex, &'static str)> = [
        (r"(?i)cz", "c"),
        (r"(?i)ts", "cs"),
        (r"(?i)ch", "cs"),
        (r"(?i)th", "t"),
        (r"(?i)gh", "g"),
        (r"(?i)w", "v"),
        (r"(?i)y\b", "i"),
    ]
    .into_iter()
    .map(|(pattern, to)| (Regex::new(pattern).unwrap(), to))
    .collect();
}

fn capitalize(text: &str) -> String {
    let mut chars = text.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

// keeps the case of the first replaced letter
fn substitute(rule: &Regex, to: &str, name: &str) -> String {
    rule.replace_all(name, |caps: &Captures| {
        if caps[0].starts_with(char::is_uppercase) {
            capitalize(to)
        } else {
            to.to_string()
        }
    })
    .into_owned()
}

/// The name as written, then each single modernization, then all of them at
/// once. Duplicates are dropped, order is kept.
pub fn spelling_variants(name: &str) -> Vec<String> {
    let name = name.trim();
    let mut variants: Vec<String> = Vec::new();
    let mut keep = |variant: String| {
        if !variant.is_empty() && !variants.contains(&variant) {
            variants.push(variant);
        }
    };
    keep(name.to_string());
    if name.starts_with(char::is_lowercase) {
        keep(name.split(' ').map(capitalize).collect::<Vec<_>>().join(" "));
    }
    let mut all = name.to_string();
    for (rule, to) in SUBSTITUTIONS.iter() {
        keep(substitute(rule, to, name));
        all = substitute(rule, to, &all);
    }
    keep(all);
    variants
}

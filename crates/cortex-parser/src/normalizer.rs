use regex::Regex;
use std::sync::LazyLock;

/// Whole-word misspellings fixed before any pattern matching.
///
/// Replacement words never appear as keys, so applying the table twice is a no-op.
const MISSPELLINGS: &[(&str, &str)] = &[
    ("confirmaton", "confirmation"),
    ("confirmtion", "confirmation"),
    ("confimation", "confirmation"),
    ("confirmaiton", "confirmation"),
    ("conformation", "confirmation"),
    ("confrimation", "confirmation"),
    ("adress", "address"),
    ("addres", "address"),
    ("adresss", "address"),
    ("addresss", "address"),
    ("adddress", "address"),
    ("emial", "email"),
    ("emal", "email"),
    ("eamil", "email"),
    ("e-mail", "email"),
    ("emali", "email"),
    ("pasword", "password"),
    ("passwrod", "password"),
    ("passowrd", "password"),
    ("phnoe", "phone"),
    ("fone", "phone"),
    ("telephone", "phone"),
    ("frist", "first"),
    ("fisrt", "first"),
    ("lsat", "last"),
    ("nmae", "name"),
    ("naem", "name"),
    ("zipcode", "zip"),
    ("postcode", "zip"),
    ("buton", "button"),
    ("botton", "button"),
    ("submti", "submit"),
    ("sumbit", "submit"),
];

static MISSPELLING_RES: LazyLock<Vec<(Regex, &'static str)>> = LazyLock::new(|| {
    MISSPELLINGS
        .iter()
        .map(|(typo, fix)| {
            let re = Regex::new(&format!(r"(?i)\b{}\b", regex::escape(typo)))
                .expect("misspelling pattern is a valid regex");
            (re, *fix)
        })
        .collect()
});

/// Normalize a free-text command.
///
/// Trims, collapses whitespace, drops trailing sentence punctuation and fixes the
/// misspellings in [`MISSPELLINGS`]. Case is preserved so literal values survive.
pub fn normalize(input: &str) -> String {
    let collapsed = input.split_whitespace().collect::<Vec<_>>().join(" ");
    let mut out = collapsed
        .trim_end_matches(|c: char| matches!(c, '.' | '!' | '?' | ' '))
        .to_string();

    for (re, fix) in MISSPELLING_RES.iter() {
        if re.is_match(&out) {
            out = re.replace_all(&out, *fix).into_owned();
        }
    }

    out
}

/// Key form of a command for memory lookups: normalized and lowercased.
pub fn command_key(input: &str) -> String {
    normalize(input).to_lowercase()
}

/// Fix a single word against the misspelling table.
pub fn fix_word(word: &str) -> Option<&'static str> {
    let lower = word.to_lowercase();
    MISSPELLINGS
        .iter()
        .find(|(typo, _)| *typo == lower)
        .map(|(_, fix)| *fix)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fixes_known_misspellings() {
        assert_eq!(normalize("fill ssn confirmaton"), "fill ssn confirmation");
        assert_eq!(normalize("fill adress from profile"), "fill address from profile");
        assert_eq!(normalize("fill E-Mail"), "fill email");
    }

    #[test]
    fn collapses_whitespace_and_trailing_punctuation() {
        assert_eq!(normalize("  click   submit !! "), "click submit");
        assert_eq!(normalize("scroll down."), "scroll down");
    }

    #[test]
    fn preserves_value_case() {
        assert_eq!(normalize("write Hello into name"), "write Hello into name");
    }

    #[test]
    fn leaves_verb_typos_alone() {
        assert_eq!(normalize("clikc submit"), "clikc submit");
    }
}

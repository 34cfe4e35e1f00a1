//! Semantic field-kind inference for form controls.

use cortex_common::dom::DomElement;
use cortex_common::protocol::FieldKind;
use cortex_common::text::normalize_text;

/// Infer what a form control asks for from `autocomplete`, `type`, and the words in
/// its name, id, placeholder, aria-label and label.
pub fn infer_field_kind(el: &DomElement) -> Option<FieldKind> {
    if let Some(kind) = el.attr("autocomplete").and_then(kind_for_autocomplete) {
        return Some(kind);
    }
    if el.tag == "input" {
        match el.input_type() {
            "email" => return Some(FieldKind::Email),
            "tel" => return Some(FieldKind::Phone),
            _ => {}
        }
    }

    let haystack = [
        el.attr("name"),
        el.attr("id"),
        el.attr("placeholder"),
        el.attr("aria-label"),
        el.label_text.as_deref(),
    ]
    .into_iter()
    .flatten()
    .collect::<Vec<_>>()
    .join(" ");

    kind_for_phrase(&haystack)
}

/// Field kind named by a free-text phrase ("first name", "zipCode", "e-mail").
pub fn kind_for_phrase(phrase: &str) -> Option<FieldKind> {
    let text = normalize_text(phrase);
    let tokens: Vec<&str> = text.split(' ').filter(|t| !t.is_empty()).collect();
    let has = |words: &[&str]| tokens.iter().any(|t| words.contains(t));
    let has_phrase = |phrases: &[&str]| {
        let padded = format!(" {} ", text);
        phrases.iter().any(|p| padded.contains(&format!(" {} ", p)))
    };

    if has(&["email", "mail"]) || has_phrase(&["e mail"]) {
        return Some(FieldKind::Email);
    }
    if has(&["fname", "firstname", "given"]) || has_phrase(&["first name", "forename"]) {
        return Some(FieldKind::FirstName);
    }
    if has(&["lname", "lastname", "surname", "family"]) || has_phrase(&["last name"]) {
        return Some(FieldKind::LastName);
    }
    if has(&["zip", "zipcode", "postal", "postcode"]) {
        return Some(FieldKind::Zip);
    }
    if has(&["city", "town"]) {
        return Some(FieldKind::City);
    }
    if has(&["state", "province", "region"]) {
        return Some(FieldKind::State);
    }
    if has(&["phone", "tel", "telephone", "mobile", "cell"]) {
        return Some(FieldKind::Phone);
    }
    if has(&["address", "street", "addr"]) {
        return Some(FieldKind::Address);
    }
    let qualified_name = has(&["user", "username", "company", "card", "account", "business"]);
    if has(&["fullname"]) || (has(&["name"]) && !qualified_name) {
        return Some(FieldKind::FullName);
    }
    None
}

fn kind_for_autocomplete(value: &str) -> Option<FieldKind> {
    // autocomplete may carry section/billing prefixes: "shipping postal-code"
    let token = value.split_whitespace().last()?;
    match token {
        "email" => Some(FieldKind::Email),
        "given-name" => Some(FieldKind::FirstName),
        "family-name" => Some(FieldKind::LastName),
        "name" => Some(FieldKind::FullName),
        "tel" | "tel-national" => Some(FieldKind::Phone),
        "street-address" | "address-line1" => Some(FieldKind::Address),
        "address-level2" => Some(FieldKind::City),
        "address-level1" => Some(FieldKind::State),
        "postal-code" => Some(FieldKind::Zip),
        _ => None,
    }
}

use cortex_common::dom::DomElement;

/// Smallest rendered box, in CSS pixels, that still counts as visible.
pub const MIN_BOX_PX: f64 = 2.0;

/// Whether a user could interact with `el` right now: enabled, rendered and not
/// collapsed to a speck.
pub fn is_usable(el: &DomElement) -> bool {
    if el.disabled || el.attributes.contains_key("disabled") {
        return false;
    }
    if el.attr("aria-disabled") == Some("true") {
        return false;
    }
    if el.style.display.as_deref() == Some("none") {
        return false;
    }
    if matches!(el.style.visibility.as_deref(), Some("hidden" | "collapse")) {
        return false;
    }
    el.rect.width >= MIN_BOX_PX && el.rect.height >= MIN_BOX_PX
}

#[cfg(test)]
mod tests {
    use super::*;
    use cortex_common::dom::{ComputedStyle, Rect};

    fn input() -> DomElement {
        DomElement {
            id: 1,
            tag: "input".into(),
            attributes: Default::default(),
            text: None,
            value: None,
            label_text: None,
            parent: None,
            rect: Rect::new(0.0, 0.0, 120.0, 24.0),
            style: ComputedStyle::default(),
            disabled: false,
        }
    }

    #[test]
    fn plain_input_is_usable() {
        assert!(is_usable(&input()));
    }

    #[test]
    fn disabled_hidden_and_tiny_are_not() {
        let mut el = input();
        el.attributes.insert("disabled".into(), String::new());
        assert!(!is_usable(&el));

        let mut el = input();
        el.attributes.insert("aria-disabled".into(), "true".into());
        assert!(!is_usable(&el));

        let mut el = input();
        el.style.display = Some("none".into());
        assert!(!is_usable(&el));

        let mut el = input();
        el.style.visibility = Some("hidden".into());
        assert!(!is_usable(&el));

        let mut el = input();
        el.rect = Rect::new(0.0, 0.0, 1.0, 40.0);
        assert!(!is_usable(&el));
    }
}

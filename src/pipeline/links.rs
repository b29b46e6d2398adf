//! In-game link protection
//!
//! Item, fitting and location links show up in the log as runs of control
//! characters around short identifiers. They are swapped for placeholders so
//! filters, glossary and translators never see them, then put back.

const PLACEHOLDER_PREFIX: &str = "__EVELINK_";
const PLACEHOLDER_SUFFIX: &str = "__";

fn is_control(c: char) -> bool {
    let code = c as u32;
    code < 0x20 || (0x7F..=0x9F).contains(&code)
}

/// Chat text with links replaced by `__EVELINK_n__` placeholders
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LinkedText {
    pub text: String,
    links: Vec<(String, String)>,
}

impl LinkedText {
    pub fn has_links(&self) -> bool {
        !self.links.is_empty()
    }

    pub fn link_count(&self) -> usize {
        self.links.len()
    }

    /// Put the original link bytes back into `text`
    pub fn restore(&self, text: &str) -> String {
        self.links
            .iter()
            .fold(text.to_string(), |acc, (placeholder, raw)| acc.replace(placeholder, raw))
    }

    /// Text with placeholders removed, for filtering and detection
    pub fn without_placeholders(&self) -> String {
        let stripped = self
            .links
            .iter()
            .fold(self.text.clone(), |acc, (placeholder, _)| acc.replace(placeholder, " "));
        stripped.split_whitespace().collect::<Vec<_>>().join(" ")
    }
}

/// Replace each control-character run with a placeholder.
///
/// A printable character inside a run belongs to it only when the next
/// character is a control character again.
pub fn tokenize(message: &str) -> LinkedText {
    let chars: Vec<(usize, char)> = message.char_indices().collect();
    let mut text = String::with_capacity(message.len());
    let mut links = Vec::new();
    let mut copied_to = 0;
    let mut i = 0;

    while i < chars.len() {
        if !is_control(chars[i].1) {
            i += 1;
            continue;
        }

        let start = chars[i].0;
        while i < chars.len() {
            let c = chars[i].1;
            if is_control(c) || chars.get(i + 1).is_some_and(|(_, next)| is_control(*next)) {
                i += 1;
            } else {
                break;
            }
        }
        let end = chars.get(i).map_or(message.len(), |(idx, _)| *idx);

        let placeholder = format!("{}{}{}", PLACEHOLDER_PREFIX, links.len() + 1, PLACEHOLDER_SUFFIX);
        text.push_str(&message[copied_to..start]);
        text.push_str(&placeholder);
        links.push((placeholder, message[start..end].to_string()));
        copied_to = end;
    }
    text.push_str(&message[copied_to..]);

    LinkedText { text, links }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_plain_text_unchanged() {
        let linked = tokenize("毒蜥 锚定");
        assert!(!linked.has_links());
        assert_eq!(linked.text, "毒蜥 锚定");
        assert_eq!(linked.restore("Gila Anchor up"), "Gila Anchor up");
    }

    #[test]
    fn test_link_replaced_and_restored() {
        let raw = "看这个 \u{e}T\u{1a}\u{3} 装配";
        let linked = tokenize(raw);
        assert_eq!(linked.link_count(), 1);
        assert_eq!(linked.text, "看这个 __EVELINK_1__ 装配");
        assert_eq!(linked.without_placeholders(), "看这个 装配");
        assert_eq!(linked.restore(&linked.text), raw);
        assert_eq!(
            linked.restore("look at this __EVELINK_1__ fit"),
            "look at this \u{e}T\u{1a}\u{3} fit"
        );
    }

    #[test]
    fn test_printable_run_ends_link() {
        let linked = tokenize("\u{1a}here\u{1a}");
        assert_eq!(linked.link_count(), 2);
        assert_eq!(linked.text, "__EVELINK_1__here__EVELINK_2__");
        assert_eq!(linked.restore(&linked.text), "\u{1a}here\u{1a}");
    }

    #[test]
    fn test_link_at_end() {
        let linked = tokenize("x\u{7f}\u{85}");
        assert_eq!(linked.text, "x__EVELINK_1__");
    }
}

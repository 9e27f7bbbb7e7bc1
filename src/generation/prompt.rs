// File: src/generation/prompt.rs
use once_cell::sync::Lazy;
use regex::Regex;

const IM_START: &str = "<|im_start|>";
const IM_END: &str = "<|im_end|>";
const ASSISTANT_MARKER: &str = "assistant";

static ROLE_WORDS: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)system|user|assistant").expect("static regex"));

/// ChatML prompt for one request: persona, recent user turns, the utterance
/// and an open assistant turn.
#[derive(Debug, Clone)]
pub struct ChatPrompt<'a> {
    persona: &'a str,
    history: Vec<&'a str>,
    utterance: &'a str,
}

impl<'a> ChatPrompt<'a> {
    /// Keeps the last `turns` entries of `context`.
    pub fn new(persona: &'a str, context: &'a [String], turns: usize, utterance: &'a str) -> Self {
        let skip = context.len().saturating_sub(turns);
        Self {
            persona,
            history: context[skip..].iter().map(String::as_str).collect(),
            utterance,
        }
    }

    pub fn render(&self) -> String {
        let history: Vec<String> = self
            .history
            .iter()
            .map(|turn| format!("{IM_START}user\n{turn}{IM_END}"))
            .collect();
        format!(
            "{IM_START}system\n{}{IM_END}\n{}\n{IM_START}user\n{}{IM_END}\n{IM_START}assistant\n",
            self.persona,
            history.join("\n"),
            self.utterance
        )
    }

    /// Cleans a partial decode for display: drops everything up to the last
    /// assistant marker.
    pub fn clean_partial(&self, decoded: &str) -> String {
        if let Some(rest) = after_last_marker(decoded) {
            return rest.trim_start().to_string();
        }
        if !self.utterance.is_empty() && decoded.contains(self.persona) {
            return decoded
                .rsplit(self.utterance)
                .next()
                .unwrap_or_default()
                .to_string();
        }
        decoded.to_string()
    }

    /// Cleans the final decode. Without an assistant marker the prompt parts
    /// and role words are removed instead.
    pub fn clean_final(&self, decoded: &str) -> String {
        if let Some(rest) = after_last_marker(decoded) {
            return rest.trim().to_string();
        }
        let mut text = decoded.replacen(&self.render(), "", 1);
        for part in [self.persona, self.utterance] {
            if !part.is_empty() {
                text = text.replacen(part, "", 1);
            }
        }
        ROLE_WORDS.replace_all(&text, "").trim().to_string()
    }
}

/// Text following the last case-insensitive assistant marker.
fn after_last_marker(decoded: &str) -> Option<&str> {
    // ASCII lowercasing keeps byte offsets stable.
    decoded
        .to_ascii_lowercase()
        .rfind(ASSISTANT_MARKER)
        .map(|idx| &decoded[idx + ASSISTANT_MARKER.len()..])
}

/// What a tokenizer decode with special tokens skipped would return for a
/// rendered prompt.
pub fn strip_special_tokens(text: &str) -> String {
    text.replace(IM_START, "").replace(IM_END, "")
}

#[cfg(test)]
mod tests {
    use super::*;

    const PERSONA: &str = "You are a helpful assistant.";

    fn context() -> Vec<String> {
        ["one", "two", "three", "four"].iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn renders_chatml_with_last_turns() {
        let ctx = context();
        let prompt = ChatPrompt::new("Be nice.", &ctx, 3, "hello there");
        assert_eq!(
            prompt.render(),
            "<|im_start|>system\nBe nice.<|im_end|>\n\
             <|im_start|>user\ntwo<|im_end|>\n\
             <|im_start|>user\nthree<|im_end|>\n\
             <|im_start|>user\nfour<|im_end|>\n\
             <|im_start|>user\nhello there<|im_end|>\n\
             <|im_start|>assistant\n"
        );
    }

    #[test]
    fn partial_keeps_text_after_last_marker() {
        let ctx = context();
        let prompt = ChatPrompt::new(PERSONA, &ctx, 3, "hi");
        let decoded = strip_special_tokens(&prompt.render()) + "Sure, here";
        assert_eq!(prompt.clean_partial(&decoded), "Sure, here");
    }

    #[test]
    fn marker_search_ignores_case() {
        let prompt = ChatPrompt::new("Be nice.", &[], 3, "hi");
        assert_eq!(prompt.clean_partial("user\nhi\nASSISTANT\n  Hey"), "Hey");
        assert_eq!(prompt.clean_final("Assistant:  Hey there  "), ":  Hey there");
    }

    #[test]
    fn partial_without_marker_falls_back_to_utterance_split() {
        let prompt = ChatPrompt::new("Be nice.", &[], 3, "hi");
        assert_eq!(prompt.clean_partial("system Be nice. hi and more"), " and more");
        assert_eq!(prompt.clean_partial("plain text"), "plain text");
    }

    #[test]
    fn final_without_marker_removes_prompt_parts() {
        let prompt = ChatPrompt::new("Be nice.", &[], 3, "what time");
        assert_eq!(prompt.clean_final("system Be nice. user what time It is noon"), "It is noon");
    }

    #[test]
    fn non_ascii_before_marker_is_safe() {
        let prompt = ChatPrompt::new("Be nice.", &[], 3, "naïve café");
        let decoded = "user naïve café ASSISTANT déjà vu";
        assert_eq!(prompt.clean_final(decoded), "déjà vu");
    }
}

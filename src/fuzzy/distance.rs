// File: src/fuzzy/distance.rs

/// Consonant classes used by [`phonetic_code`]. Vowels, `h`, `w` and `y`
/// have no class.
fn consonant_class(c: char) -> Option<char> {
    match c {
        'b' | 'f' | 'p' | 'v' => Some('1'),
        'c' | 'g' | 'j' | 'k' | 'q' | 's' | 'x' | 'z' => Some('2'),
        'd' | 't' => Some('3'),
        'l' => Some('4'),
        'm' | 'n' => Some('5'),
        'r' => Some('6'),
        _ => None,
    }
}

/// Classic edit distance with unit cost for insertion, deletion and
/// substitution, counted over chars.
pub fn levenshtein(a: &str, b: &str) -> usize {
    strsim::levenshtein(a, b)
}

/// Four character sound code: the first letter uppercased, then up to three
/// consonant-class digits, zero padded. A digit equal to the previous
/// character's class is skipped; classless letters reset that memory.
///
/// Only ASCII letters are considered. Input with none yields `"0000"`.
pub fn phonetic_code(word: &str) -> String {
    let letters: Vec<char> = word
        .chars()
        .filter(|c| c.is_ascii_alphabetic())
        .map(|c| c.to_ascii_lowercase())
        .collect();

    let Some((&first, rest)) = letters.split_first() else {
        return "0000".to_string();
    };

    let mut code = String::with_capacity(4);
    code.push(first.to_ascii_uppercase());
    let mut previous = consonant_class(first);

    for &c in rest {
        if code.len() == 4 {
            break;
        }
        let current = consonant_class(c);
        if let Some(digit) = current {
            if current != previous {
                code.push(digit);
            }
        }
        previous = current;
    }

    while code.len() < 4 {
        code.push('0');
    }
    code
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn levenshtein_basics() {
        assert_eq!(levenshtein("", ""), 0);
        assert_eq!(levenshtein("abc", ""), 3);
        assert_eq!(levenshtein("", "abc"), 3);
        assert_eq!(levenshtein("hello", "hello"), 0);
        assert_eq!(levenshtein("helo", "hello"), 1);
        assert_eq!(levenshtein("kitten", "sitting"), 3);
        assert_eq!(levenshtein("flaw", "lawn"), 2);
    }

    #[test]
    fn levenshtein_is_symmetric() {
        for (a, b) in [("thanks", "thnx"), ("bye", "goodbye"), ("ok", "okay")] {
            assert_eq!(levenshtein(a, b), levenshtein(b, a));
        }
    }

    #[test]
    fn levenshtein_counts_chars_not_bytes() {
        assert_eq!(levenshtein("café", "cafe"), 1);
    }

    #[test]
    fn phonetic_code_samples() {
        assert_eq!(phonetic_code("Robert"), "R163");
        assert_eq!(phonetic_code("rupert"), "R163");
        assert_eq!(phonetic_code("Pfister"), "P236");
        assert_eq!(phonetic_code("Lee"), "L000");
        assert_eq!(phonetic_code("ashcraft"), "A226");
    }

    #[test]
    fn h_and_w_separate_repeated_codes() {
        // s, h, c: both s and c are class 2, but h in between resets.
        assert_eq!(phonetic_code("ashcraft"), "A226");
        assert_eq!(phonetic_code("sws"), "S200");
        assert_eq!(phonetic_code("ss"), "S000");
    }

    #[test]
    fn phonetic_code_without_letters() {
        assert_eq!(phonetic_code(""), "0000");
        assert_eq!(phonetic_code("1234 ?"), "0000");
    }
}

pub mod distance;

pub use distance::{levenshtein, phonetic_code};

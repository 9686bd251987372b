use crate::error::{Result, TorchError};
use std::fmt;
use std::time::Duration;

/// One element of a Morse transmission
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Symbol {
    Dot,
    Dash,
    /// Silence between letters of the same word
    LetterGap,
    /// Silence between words
    WordGap,
}

impl Symbol {
    /// Lit and dark durations in units
    pub fn timing(&self) -> (u32, u32) {
        match self {
            Symbol::Dot => (1, 1),
            Symbol::Dash => (3, 1),
            Symbol::LetterGap => (0, 1),
            Symbol::WordGap => (0, 3),
        }
    }

    pub fn is_gap(&self) -> bool {
        matches!(self, Symbol::LetterGap | Symbol::WordGap)
    }
}

/// International Morse code for a single character
pub fn lookup(ch: char) -> Option<&'static str> {
    let code = match ch.to_ascii_uppercase() {
        'A' => ".-",
        'B' => "-...",
        'C' => "-.-.",
        'D' => "-..",
        'E' => ".",
        'F' => "..-.",
        'G' => "--.",
        'H' => "....",
        'I' => "..",
        'J' => ".---",
        'K' => "-.-",
        'L' => ".-..",
        'M' => "--",
        'N' => "-.",
        'O' => "---",
        'P' => ".--.",
        'Q' => "--.-",
        'R' => ".-.",
        'S' => "...",
        'T' => "-",
        'U' => "..-",
        'V' => "...-",
        'W' => ".--",
        'X' => "-..-",
        'Y' => "-.--",
        'Z' => "--..",
        '0' => "-----",
        '1' => ".----",
        '2' => "..---",
        '3' => "...--",
        '4' => "....-",
        '5' => ".....",
        '6' => "-....",
        '7' => "--...",
        '8' => "---..",
        '9' => "----.",
        '.' => ".-.-.-",
        ',' => "--..--",
        '?' => "..--..",
        '\'' => ".----.",
        '!' => "-.-.--",
        '/' => "-..-.",
        '(' => "-.--.",
        ')' => "-.--.-",
        '&' => ".-...",
        ':' => "---...",
        ';' => "-.-.-.",
        '=' => "-...-",
        '+' => ".-.-.",
        '-' => "-....-",
        '"' => ".-..-.",
        '@' => ".--.-.",
        _ => return None,
    };
    Some(code)
}

/// Ordered symbols of a message, ready for playback
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MorseProgram {
    symbols: Vec<Symbol>,
}

impl MorseProgram {
    /// Encode plain text. Characters without a Morse code are skipped and
    /// runs of whitespace collapse into a single word gap.
    pub fn encode(message: &str) -> Self {
        let mut symbols = Vec::new();
        let mut pending_gap = None;

        for ch in message.chars() {
            if ch.is_whitespace() {
                if !symbols.is_empty() {
                    pending_gap = Some(Symbol::WordGap);
                }
                continue;
            }

            let Some(code) = lookup(ch) else {
                continue;
            };

            if !symbols.is_empty() {
                symbols.push(pending_gap.take().unwrap_or(Symbol::LetterGap));
            }
            pending_gap = None;
            symbols.extend(code.chars().map(|c| if c == '.' { Symbol::Dot } else { Symbol::Dash }));
        }

        Self { symbols }
    }

    /// Parse an already encoded dot/dash string: spaces separate letters,
    /// `/` separates words.
    pub fn parse_code(code: &str) -> Result<Self> {
        let mut symbols = Vec::new();
        let mut pending_gap = None;

        for ch in code.trim().chars() {
            let symbol = match ch {
                '.' | '·' | '•' => Symbol::Dot,
                '-' | '_' | '−' | '–' => Symbol::Dash,
                '/' | '|' => {
                    if !symbols.is_empty() {
                        pending_gap = Some(Symbol::WordGap);
                    }
                    continue;
                }
                c if c.is_whitespace() => {
                    if !symbols.is_empty() && pending_gap.is_none() {
                        pending_gap = Some(Symbol::LetterGap);
                    }
                    continue;
                }
                other => {
                    return Err(TorchError::invalid_input(format!(
                        "'{}' is not a Morse symbol",
                        other
                    )))
                }
            };

            if let Some(gap) = pending_gap.take() {
                symbols.push(gap);
            }
            symbols.push(symbol);
        }

        Ok(Self { symbols })
    }

    pub fn symbols(&self) -> &[Symbol] {
        &self.symbols
    }

    pub fn is_empty(&self) -> bool {
        self.symbols.is_empty()
    }

    pub fn total_units(&self) -> u32 {
        self.symbols
            .iter()
            .map(|symbol| {
                let (lit, dark) = symbol.timing();
                lit + dark
            })
            .sum()
    }

    pub fn duration(&self, unit: Duration) -> Duration {
        unit * self.total_units()
    }
}

impl fmt::Display for MorseProgram {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for symbol in &self.symbols {
            match symbol {
                Symbol::Dot => f.write_str(".")?,
                Symbol::Dash => f.write_str("-")?,
                Symbol::LetterGap => f.write_str(" ")?,
                Symbol::WordGap => f.write_str(" / ")?,
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sos_encoding() {
        let program = MorseProgram::encode("SOS");
        assert_eq!(program.to_string(), "... --- ...");
        assert!(!program.symbols().contains(&Symbol::WordGap));
        assert_eq!(
            &program.symbols()[..4],
            &[Symbol::Dot, Symbol::Dot, Symbol::Dot, Symbol::LetterGap]
        );
    }

    #[test]
    fn test_symbol_timing() {
        assert_eq!(Symbol::Dot.timing(), (1, 1));
        assert_eq!(Symbol::Dash.timing(), (3, 1));
        assert_eq!(Symbol::LetterGap.timing(), (0, 1));
        assert_eq!(Symbol::WordGap.timing(), (0, 3));
    }

    #[test]
    fn test_case_insensitive_and_words() {
        assert_eq!(MorseProgram::encode("sos"), MorseProgram::encode("SOS"));
        assert_eq!(MorseProgram::encode("hi  u").to_string(), ".... .. / ..-");
        assert_eq!(MorseProgram::encode("  e ").to_string(), ".");
    }

    #[test]
    fn test_unknown_characters_skipped() {
        assert_eq!(MorseProgram::encode("e#t").to_string(), ". -");
        assert!(MorseProgram::encode("###").is_empty());
    }

    #[test]
    fn test_digits() {
        assert_eq!(MorseProgram::encode("10").to_string(), ".---- -----");
    }

    #[test]
    fn test_sos_duration() {
        // 3 dots (6) + gap (1) + 3 dashes (12) + gap (1) + 3 dots (6)
        let program = MorseProgram::encode("SOS");
        assert_eq!(program.total_units(), 26);
        assert_eq!(
            program.duration(Duration::from_millis(200)),
            Duration::from_millis(5200)
        );
    }

    #[test]
    fn test_parse_code() {
        let program = MorseProgram::parse_code("... --- ...").unwrap();
        assert_eq!(program, MorseProgram::encode("SOS"));

        let words = MorseProgram::parse_code(".... .. / ..-").unwrap();
        assert_eq!(words, MorseProgram::encode("hi u"));

        let loose = MorseProgram::parse_code("  ....   ..  /  ..-  ").unwrap();
        assert_eq!(loose, words);

        assert!(MorseProgram::parse_code("... hello").is_err());
        assert!(MorseProgram::parse_code("").unwrap().is_empty());
    }
}

//! Parser for KiCad element-tree text.
//!
//! Turns the text produced by [`Sexpr`]'s `Display` impl (or by KiCad itself)
//! back into a tree. Quoted strings become [`Sexpr::Str`], every other token
//! becomes [`Sexpr::Atom`] so numbers keep their exact spelling.

use super::error::ParseError;
use super::sexpr::Sexpr;

/// Parses a single top-level element tree.
///
/// # Errors
///
/// Returns an error on unbalanced parentheses, unterminated strings, an
/// empty input, or trailing content after the first tree.
pub fn parse_sexpr(text: &str) -> Result<Sexpr, ParseError> {
    let mut parser = Parser {
        bytes: text.as_bytes(),
        text,
        pos: 0,
    };
    parser.skip_whitespace();
    if parser.is_eof() {
        return Err(ParseError::new(0, "empty input"));
    }
    let tree = parser.parse_node()?;
    parser.skip_whitespace();
    if !parser.is_eof() {
        return Err(ParseError::new(parser.pos, "trailing content after tree"));
    }
    Ok(tree)
}

struct Parser<'a> {
    bytes: &'a [u8],
    text: &'a str,
    pos: usize,
}

impl Parser<'_> {
    fn is_eof(&self) -> bool {
        self.pos >= self.bytes.len()
    }

    fn peek(&self) -> Option<u8> {
        self.bytes.get(self.pos).copied()
    }

    fn skip_whitespace(&mut self) {
        while let Some(b) = self.peek() {
            if b.is_ascii_whitespace() {
                self.pos += 1;
            } else {
                break;
            }
        }
    }

    fn parse_node(&mut self) -> Result<Sexpr, ParseError> {
        self.skip_whitespace();
        match self.peek() {
            None => Err(ParseError::new(self.pos, "unexpected end of input")),
            Some(b'(') => self.parse_list(),
            Some(b')') => Err(ParseError::new(self.pos, "unexpected ')'")),
            Some(b'"') => self.parse_string(),
            Some(_) => Ok(self.parse_atom()),
        }
    }

    fn parse_list(&mut self) -> Result<Sexpr, ParseError> {
        let start = self.pos;
        self.pos += 1; // '('
        let mut items = Vec::new();
        loop {
            self.skip_whitespace();
            match self.peek() {
                None => return Err(ParseError::new(start, "unclosed '('")),
                Some(b')') => {
                    self.pos += 1;
                    return Ok(Sexpr::List(items));
                }
                Some(_) => items.push(self.parse_node()?),
            }
        }
    }

    fn parse_string(&mut self) -> Result<Sexpr, ParseError> {
        let start = self.pos;
        self.pos += 1; // opening quote
        let mut value = String::new();
        let mut chars = self.text[self.pos..].char_indices();
        while let Some((offset, ch)) = chars.next() {
            match ch {
                '"' => {
                    self.pos += offset + 1;
                    return Ok(Sexpr::Str(value));
                }
                '\\' => match chars.next() {
                    Some((_, 'n')) => value.push('\n'),
                    Some((_, 'r')) => value.push('\r'),
                    Some((_, 't')) => value.push('\t'),
                    Some((_, other)) => value.push(other),
                    None => break,
                },
                _ => value.push(ch),
            }
        }
        Err(ParseError::new(start, "unterminated string"))
    }

    fn parse_atom(&mut self) -> Sexpr {
        let start = self.pos;
        while let Some(b) = self.peek() {
            if b.is_ascii_whitespace() || b == b'(' || b == b')' || b == b'"' {
                break;
            }
            self.pos += 1;
        }
        Sexpr::Atom(self.text[start..self.pos].to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_nested_lists() {
        let tree = parse_sexpr(r#"(footprint "R_0402" (layer "F.Cu") (at 1.5 -2 90))"#).unwrap();
        assert!(tree.is("footprint"));
        assert_eq!(tree.arg_text(0), Some("R_0402"));
        let at = tree.find("at").unwrap();
        assert_eq!(at.arg_f64(0), Some(1.5));
        assert_eq!(at.arg_f64(1), Some(-2.0));
        assert_eq!(at.arg_f64(2), Some(90.0));
    }

    #[test]
    fn parses_escapes() {
        let tree = parse_sexpr(r#"(descr "say \"hi\"\nnext")"#).unwrap();
        assert_eq!(tree.arg_text(0), Some("say \"hi\"\nnext"));
    }

    #[test]
    fn print_parse_is_fixed_point() {
        let text = "(kicad_symbol_lib (version 20241209) (generator \"x\")\n  (symbol \"A\" (property \"Reference\" \"U\" (at 0 0 0) (effects (font (size 1.27 1.27)))))\n)";
        let first = parse_sexpr(text).unwrap().to_string();
        let second = parse_sexpr(&first).unwrap().to_string();
        assert_eq!(first, second);
    }

    #[test]
    fn rejects_unbalanced() {
        let err = parse_sexpr("(a (b c)").unwrap_err();
        assert_eq!(err.offset, 0);
        assert!(parse_sexpr("(a))").is_err());
        assert!(parse_sexpr("   ").is_err());
        assert!(parse_sexpr("(a \"open)").is_err());
    }

    #[test]
    fn non_ascii_strings_survive() {
        let tree = parse_sexpr("(descr \"Ω 10k µF\")").unwrap();
        assert_eq!(tree.arg_text(0), Some("Ω 10k µF"));
    }
}

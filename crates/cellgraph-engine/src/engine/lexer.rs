//! Scans formula text into tokens.

use std::iter::Peekable;
use std::str::Chars;

use super::cell_ref::AnchoredRef;

#[derive(Clone, Debug, PartialEq)]
pub enum Token {
    Number(f64),
    Text(String),
    Bool(bool),
    Ref(AnchoredRef),
    /// A name that is not a coordinate, usually a function name.
    Ident(String),
    /// The `#REF!` literal left behind by deleted rows or columns.
    RefError,
    Plus,
    Minus,
    Star,
    Slash,
    Caret,
    Amp,
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
    LParen,
    RParen,
    Comma,
    Colon,
    Illegal(String),
    Eof,
}

pub struct Lexer<'a> {
    input: Peekable<Chars<'a>>,
}

impl<'a> Lexer<'a> {
    pub fn new(input: &'a str) -> Self {
        Lexer {
            input: input.chars().peekable(),
        }
    }

    pub fn next_token(&mut self) -> Token {
        self.skip_whitespace();

        match self.input.next() {
            Some('+') => Token::Plus,
            Some('-') => Token::Minus,
            Some('*') => Token::Star,
            Some('/') => Token::Slash,
            Some('^') => Token::Caret,
            Some('&') => Token::Amp,
            Some('(') => Token::LParen,
            Some(')') => Token::RParen,
            Some(',') => Token::Comma,
            Some(':') => Token::Colon,
            Some('=') => Token::Eq,
            Some('<') => match self.input.peek() {
                Some('=') => {
                    self.input.next();
                    Token::Le
                }
                Some('>') => {
                    self.input.next();
                    Token::Ne
                }
                _ => Token::Lt,
            },
            Some('>') => match self.input.peek() {
                Some('=') => {
                    self.input.next();
                    Token::Ge
                }
                _ => Token::Gt,
            },
            Some('"') => self.read_string(),
            Some('#') => self.read_error_literal(),
            Some(ch) if ch.is_ascii_digit() || ch == '.' => self.read_number(ch),
            Some(ch) if is_word_start(ch) => self.read_word(ch),
            Some(ch) => Token::Illegal(ch.to_string()),
            None => Token::Eof,
        }
    }

    fn skip_whitespace(&mut self) {
        while self.input.next_if(|ch| ch.is_whitespace()).is_some() {}
    }

    /// Strings use `""` to embed a quote.
    fn read_string(&mut self) -> Token {
        let mut result = String::new();
        while let Some(ch) = self.input.next() {
            if ch == '"' {
                if self.input.next_if_eq(&'"').is_some() {
                    result.push('"');
                    continue;
                }
                return Token::Text(result);
            }
            result.push(ch);
        }
        Token::Illegal(format!("unterminated string \"{}", result))
    }

    fn read_error_literal(&mut self) -> Token {
        let mut word = String::from('#');
        while let Some(ch) = self.input.next_if(|ch| ch.is_ascii_alphanumeric() || *ch == '!') {
            word.push(ch);
        }
        if word.eq_ignore_ascii_case("#REF!") {
            Token::RefError
        } else {
            Token::Illegal(word)
        }
    }

    fn read_number(&mut self, first: char) -> Token {
        let mut text = String::from(first);
        let mut has_dot = first == '.';

        while let Some(&ch) = self.input.peek() {
            if ch.is_ascii_digit() {
                text.push(ch);
            } else if ch == '.' && !has_dot {
                has_dot = true;
                text.push(ch);
            } else if ch == 'e' || ch == 'E' {
                text.push(ch);
                self.input.next();
                if let Some(sign) = self.input.next_if(|c| *c == '+' || *c == '-') {
                    text.push(sign);
                }
                while let Some(d) = self.input.next_if(|c| c.is_ascii_digit()) {
                    text.push(d);
                }
                break;
            } else {
                break;
            }
            self.input.next();
        }

        match text.parse::<f64>() {
            Ok(n) => Token::Number(n),
            Err(_) => Token::Illegal(text),
        }
    }

    fn read_word(&mut self, first: char) -> Token {
        let mut word = String::from(first);
        while let Some(ch) = self.input.next_if(|ch| is_word_char(*ch)) {
            word.push(ch);
        }

        if self.input.peek() == Some(&'(') {
            return Token::Ident(word.to_ascii_lowercase());
        }
        if word.eq_ignore_ascii_case("TRUE") {
            return Token::Bool(true);
        }
        if word.eq_ignore_ascii_case("FALSE") {
            return Token::Bool(false);
        }
        match AnchoredRef::parse(&word) {
            Ok(r) => Token::Ref(r),
            Err(_) => Token::Ident(word.to_ascii_lowercase()),
        }
    }
}

fn is_word_start(ch: char) -> bool {
    ch.is_ascii_alphabetic() || ch == '_' || ch == '$'
}

fn is_word_char(ch: char) -> bool {
    ch.is_ascii_alphanumeric() || ch == '_' || ch == '$' || ch == '.'
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tokens(input: &str) -> Vec<Token> {
        let mut lexer = Lexer::new(input);
        let mut out = Vec::new();
        loop {
            let token = lexer.next_token();
            if token == Token::Eof {
                return out;
            }
            out.push(token);
        }
    }

    #[test]
    fn test_refs_and_calls() {
        let toks = tokens("sum($A1:b$2) + C3");
        assert_eq!(toks[0], Token::Ident("sum".into()));
        assert_eq!(toks[1], Token::LParen);
        assert_eq!(toks[2], Token::Ref(AnchoredRef::parse("$A1").unwrap()));
        assert_eq!(toks[3], Token::Colon);
        assert_eq!(toks[4], Token::Ref(AnchoredRef::parse("B$2").unwrap()));
        assert_eq!(toks[6], Token::Plus);
        assert_eq!(toks[7], Token::Ref(AnchoredRef::parse("C3").unwrap()));
    }

    #[test]
    fn test_strings_numbers_and_operators() {
        assert_eq!(
            tokens(r#""say ""hi""" & 1.5e2 <> 3"#),
            vec![
                Token::Text("say \"hi\"".into()),
                Token::Amp,
                Token::Number(150.0),
                Token::Ne,
                Token::Number(3.0),
            ]
        );
        assert_eq!(tokens("<= >= < >").len(), 4);
    }

    #[test]
    fn test_error_literal_and_illegal() {
        assert_eq!(tokens("#REF! + 1")[0], Token::RefError);
        assert!(matches!(tokens("\"open")[0], Token::Illegal(_)));
        assert!(matches!(tokens("A1 ; 2")[1], Token::Illegal(_)));
    }

    #[test]
    fn test_booleans_and_names() {
        assert_eq!(tokens("true"), vec![Token::Bool(true)]);
        assert_eq!(tokens("pi"), vec![Token::Ident("pi".into())]);
        assert_eq!(tokens("A0"), vec![Token::Ident("a0".into())]);
    }
}

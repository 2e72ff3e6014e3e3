//! SQL Lexer - Tokenizes SQL input text into a stream of tokens

use std::{collections::HashMap, fmt::Display, iter::Peekable, str::CharIndices, sync::LazyLock};

use crate::error::{Error, Result};

/// Represents a single lexical token in the SQL input
#[derive(Debug, Clone, PartialEq)]
pub enum Token {
    /// SQL reserved keyword
    Keyword(Keyword),
    /// Identifier such as table name or column name
    Ident(String),
    /// String literal
    String(String),
    /// Numeric literal, kept as written
    Number(String),
    OpenParen,
    CloseParen,
    Comma,
    Semicolon,
    Asterisk,
    Period,
    Minus,
    Equal,
    NotEqual,
    LessThan,
    GreaterThan,
    LessThanOrEqual,
    GreaterThanOrEqual,
}

impl Display for Token {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if let Token::String(v) = self {
            return write!(f, "'{}'", v);
        }
        f.write_str(match self {
            Token::Keyword(keyword) => keyword.to_str(),
            Token::Ident(ident) | Token::String(ident) => ident,
            Token::Number(n) => n,
            Token::OpenParen => "(",
            Token::CloseParen => ")",
            Token::Comma => ",",
            Token::Semicolon => ";",
            Token::Asterisk => "*",
            Token::Period => ".",
            Token::Minus => "-",
            Token::Equal => "=",
            Token::NotEqual => "!=",
            Token::LessThan => "<",
            Token::GreaterThan => ">",
            Token::LessThanOrEqual => "<=",
            Token::GreaterThanOrEqual => ">=",
        })
    }
}

/// SQL reserved keywords
///
/// Besides the keywords of the supported grammar this also lists words the
/// parser must recognize only to reject them as unsupported.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Keyword {
    // DDL keywords
    Create,
    Table,
    Drop,
    // Data type keywords
    Int,
    Integer,
    Text,
    Boolean,
    Bool,
    // Constraint keywords
    Primary,
    Key,
    Unique,
    Not,
    Null,
    // DML keywords
    Select,
    From,
    Insert,
    Into,
    Values,
    Update,
    Set,
    Delete,
    Where,
    And,
    Join,
    Inner,
    On,
    Explain,
    // Literal keywords
    True,
    False,
    // Recognized only to be rejected
    Or,
    Order,
    Group,
    By,
    Having,
    Limit,
    Offset,
    Distinct,
    Union,
    Left,
    Right,
    Outer,
    Cross,
    Alter,
    As,
    Like,
    In,
    Between,
}

/// Keyword lookup table, built once and shared read-only
static KEYWORDS: LazyLock<HashMap<&'static str, Keyword>> = LazyLock::new(|| {
    use Keyword::*;
    [
        Create, Table, Drop, Int, Integer, Text, Boolean, Bool, Primary, Key, Unique, Not,
        Null, Select, From, Insert, Into, Values, Update, Set, Delete, Where, And, Join,
        Inner, On, Explain, True, False, Or, Order, Group, By, Having, Limit, Offset,
        Distinct, Union, Left, Right, Outer, Cross, Alter, As, Like, In, Between,
    ]
    .into_iter()
    .map(|k| (k.to_str(), k))
    .collect()
});

impl Keyword {
    /// Attempts to parse a string as a keyword (case-insensitive)
    pub fn from_str(ident: &str) -> Option<Keyword> {
        KEYWORDS.get(ident.to_uppercase().as_str()).copied()
    }

    /// Returns the uppercase string representation of the keyword
    pub fn to_str(&self) -> &'static str {
        match self {
            Keyword::Create => "CREATE",
            Keyword::Table => "TABLE",
            Keyword::Drop => "DROP",
            Keyword::Int => "INT",
            Keyword::Integer => "INTEGER",
            Keyword::Text => "TEXT",
            Keyword::Boolean => "BOOLEAN",
            Keyword::Bool => "BOOL",
            Keyword::Primary => "PRIMARY",
            Keyword::Key => "KEY",
            Keyword::Unique => "UNIQUE",
            Keyword::Not => "NOT",
            Keyword::Null => "NULL",
            Keyword::Select => "SELECT",
            Keyword::From => "FROM",
            Keyword::Insert => "INSERT",
            Keyword::Into => "INTO",
            Keyword::Values => "VALUES",
            Keyword::Update => "UPDATE",
            Keyword::Set => "SET",
            Keyword::Delete => "DELETE",
            Keyword::Where => "WHERE",
            Keyword::And => "AND",
            Keyword::Join => "JOIN",
            Keyword::Inner => "INNER",
            Keyword::On => "ON",
            Keyword::Explain => "EXPLAIN",
            Keyword::True => "TRUE",
            Keyword::False => "FALSE",
            Keyword::Or => "OR",
            Keyword::Order => "ORDER",
            Keyword::Group => "GROUP",
            Keyword::By => "BY",
            Keyword::Having => "HAVING",
            Keyword::Limit => "LIMIT",
            Keyword::Offset => "OFFSET",
            Keyword::Distinct => "DISTINCT",
            Keyword::Union => "UNION",
            Keyword::Left => "LEFT",
            Keyword::Right => "RIGHT",
            Keyword::Outer => "OUTER",
            Keyword::Cross => "CROSS",
            Keyword::Alter => "ALTER",
            Keyword::As => "AS",
            Keyword::Like => "LIKE",
            Keyword::In => "IN",
            Keyword::Between => "BETWEEN",
        }
    }

    /// Keywords that introduce constructs outside the supported dialect
    pub fn is_unsupported(&self) -> bool {
        matches!(
            self,
            Keyword::Or
                | Keyword::Order
                | Keyword::Group
                | Keyword::By
                | Keyword::Having
                | Keyword::Limit
                | Keyword::Offset
                | Keyword::Distinct
                | Keyword::Union
                | Keyword::Left
                | Keyword::Right
                | Keyword::Outer
                | Keyword::Cross
                | Keyword::Alter
                | Keyword::As
                | Keyword::Like
                | Keyword::In
                | Keyword::Between
        )
    }
}

impl Display for Keyword {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.to_str())
    }
}

/// A token together with the byte offset where it starts
#[derive(Debug, Clone, PartialEq)]
pub struct Lexeme {
    pub token: Token,
    pub offset: usize,
}

/// SQL lexical analyzer (lexer/tokenizer)
pub struct Lexer<'a> {
    iter: Peekable<CharIndices<'a>>,
}

impl<'a> Iterator for Lexer<'a> {
    type Item = Result<Lexeme>;

    fn next(&mut self) -> Option<Self::Item> {
        match self.scan() {
            Ok(Some(lexeme)) => Some(Ok(lexeme)),
            Ok(None) => self.iter.peek().map(|(pos, c)| {
                Err(Error::Syntax(format!(
                    "unexpected character {} at position {}",
                    c, pos
                )))
            }),
            Err(err) => Some(Err(err)),
        }
    }
}

impl<'a> Lexer<'a> {
    /// Creates a new lexer for the given SQL text
    pub fn new(sql_text: &'a str) -> Self {
        Self {
            iter: sql_text.char_indices().peekable(),
        }
    }

    /// Consumes the next character if it satisfies the predicate
    fn next_if<F: Fn(char) -> bool>(&mut self, predicate: F) -> Option<char> {
        self.iter.next_if(|&(_, c)| predicate(c)).map(|(_, c)| c)
    }

    /// Consumes consecutive characters while they satisfy the predicate
    fn next_while<F: Fn(char) -> bool>(&mut self, predicate: F) -> Option<String> {
        let mut value = String::new();
        while let Some(c) = self.next_if(&predicate) {
            value.push(c);
        }
        Some(value).filter(|v| !v.is_empty())
    }

    /// Removes whitespace from the input stream
    fn erase_whitespace(&mut self) {
        self.next_while(|c| c.is_whitespace());
    }

    /// Scans and returns the next token
    fn scan(&mut self) -> Result<Option<Lexeme>> {
        self.erase_whitespace();
        let Some(&(offset, c)) = self.iter.peek() else {
            return Ok(None);
        };
        let token = match c {
            '\'' | '"' => Some(self.scan_string(c, offset)?),
            c if c.is_ascii_digit() => self.scan_number(),
            c if c.is_alphabetic() || c == '_' => self.scan_ident(),
            _ => self.scan_symbol(),
        };
        Ok(token.map(|token| Lexeme { token, offset }))
    }

    /// Scans a quoted string literal; a doubled quote escapes itself
    fn scan_string(&mut self, quote: char, offset: usize) -> Result<Token> {
        self.iter.next();
        let mut val = String::new();

        loop {
            match self.iter.next() {
                Some((_, c)) if c == quote => {
                    if self.next_if(|c| c == quote).is_none() {
                        break;
                    }
                    val.push(quote);
                }
                Some((_, c)) => val.push(c),
                None => {
                    return Err(Error::Syntax(format!(
                        "unterminated string starting at position {}",
                        offset
                    )))
                }
            }
        }
        Ok(Token::String(val))
    }

    /// Scans a numeric literal (integer or decimal)
    fn scan_number(&mut self) -> Option<Token> {
        let mut val = self.next_while(|c| c.is_ascii_digit())?;
        if let Some(sep) = self.next_if(|c| c == '.') {
            val.push(sep);
            while let Some(c) = self.next_if(|c| c.is_ascii_digit()) {
                val.push(c);
            }
        }
        Some(Token::Number(val))
    }

    /// Scans an identifier or keyword
    fn scan_ident(&mut self) -> Option<Token> {
        let val = self.next_while(|c| c.is_alphanumeric() || c == '_')?;
        // Returns Keyword if matched, otherwise returns as a regular Ident
        Some(Keyword::from_str(&val).map_or(Token::Ident(val.to_lowercase()), Token::Keyword))
    }

    /// Scans a one- or two-character symbol token
    fn scan_symbol(&mut self) -> Option<Token> {
        let (_, c) = *self.iter.peek()?;
        let token = match c {
            '*' => Token::Asterisk,
            '(' => Token::OpenParen,
            ')' => Token::CloseParen,
            ',' => Token::Comma,
            ';' => Token::Semicolon,
            '.' => Token::Period,
            '-' => Token::Minus,
            '=' => Token::Equal,
            '<' | '>' | '!' => return self.scan_comparison(c),
            _ => return None,
        };
        self.iter.next();
        Some(token)
    }

    fn scan_comparison(&mut self, first: char) -> Option<Token> {
        let mut ahead = self.iter.clone();
        ahead.next();
        let second = ahead.peek().map(|&(_, c)| c);
        let (token, width) = match (first, second) {
            ('<', Some('=')) => (Token::LessThanOrEqual, 2),
            ('<', Some('>')) => (Token::NotEqual, 2),
            ('>', Some('=')) => (Token::GreaterThanOrEqual, 2),
            ('!', Some('=')) => (Token::NotEqual, 2),
            ('<', _) => (Token::LessThan, 1),
            ('>', _) => (Token::GreaterThan, 1),
            _ => return None,
        };
        for _ in 0..width {
            self.iter.next();
        }
        Some(token)
    }
}

#[cfg(test)]
mod tests {
    use super::{Keyword, Lexer, Token};
    use crate::error::Result;

    fn tokens(sql: &str) -> Result<Vec<Token>> {
        Lexer::new(sql)
            .map(|lexeme| lexeme.map(|l| l.token))
            .collect::<Result<Vec<_>>>()
    }

    #[test]
    fn test_lexer_create_table() -> Result<()> {
        let tokens1 = tokens(
            "CREATE table tbl
                (
                    id1 int primary key,
                    name text unique not null
                );
                ",
        )?;

        assert_eq!(
            tokens1,
            vec![
                Token::Keyword(Keyword::Create),
                Token::Keyword(Keyword::Table),
                Token::Ident("tbl".to_string()),
                Token::OpenParen,
                Token::Ident("id1".to_string()),
                Token::Keyword(Keyword::Int),
                Token::Keyword(Keyword::Primary),
                Token::Keyword(Keyword::Key),
                Token::Comma,
                Token::Ident("name".to_string()),
                Token::Keyword(Keyword::Text),
                Token::Keyword(Keyword::Unique),
                Token::Keyword(Keyword::Not),
                Token::Keyword(Keyword::Null),
                Token::CloseParen,
                Token::Semicolon
            ]
        );
        Ok(())
    }

    #[test]
    fn test_lexer_insert_into() -> Result<()> {
        let tokens1 = tokens("INSERT INTO   Tbl (id, name) values (-1, 'it''s', \"x\", TRUE);")?;

        assert_eq!(
            tokens1,
            vec![
                Token::Keyword(Keyword::Insert),
                Token::Keyword(Keyword::Into),
                Token::Ident("tbl".to_string()),
                Token::OpenParen,
                Token::Ident("id".to_string()),
                Token::Comma,
                Token::Ident("name".to_string()),
                Token::CloseParen,
                Token::Keyword(Keyword::Values),
                Token::OpenParen,
                Token::Minus,
                Token::Number("1".to_string()),
                Token::Comma,
                Token::String("it's".to_string()),
                Token::Comma,
                Token::String("x".to_string()),
                Token::Comma,
                Token::Keyword(Keyword::True),
                Token::CloseParen,
                Token::Semicolon,
            ]
        );
        Ok(())
    }

    #[test]
    fn test_lexer_comparisons() -> Result<()> {
        assert_eq!(
            tokens("a.b <= 1 AND c<>2 and d!=3 and e>=4 and f<5 and g>6")?,
            vec![
                Token::Ident("a".into()),
                Token::Period,
                Token::Ident("b".into()),
                Token::LessThanOrEqual,
                Token::Number("1".into()),
                Token::Keyword(Keyword::And),
                Token::Ident("c".into()),
                Token::NotEqual,
                Token::Number("2".into()),
                Token::Keyword(Keyword::And),
                Token::Ident("d".into()),
                Token::NotEqual,
                Token::Number("3".into()),
                Token::Keyword(Keyword::And),
                Token::Ident("e".into()),
                Token::GreaterThanOrEqual,
                Token::Number("4".into()),
                Token::Keyword(Keyword::And),
                Token::Ident("f".into()),
                Token::LessThan,
                Token::Number("5".into()),
                Token::Keyword(Keyword::And),
                Token::Ident("g".into()),
                Token::GreaterThan,
                Token::Number("6".into()),
            ]
        );
        Ok(())
    }

    #[test]
    fn test_lexer_errors() {
        assert!(tokens("select 'open").is_err());
        let err = tokens("select # from t").unwrap_err();
        assert!(err.to_string().contains("position 7"));
        assert!(tokens("a ! b").is_err());
    }
}

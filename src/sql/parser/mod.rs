use std::iter::Peekable;

use tracing::debug;

use crate::error::{Error, Result};
use crate::sql::parser::ast::{ColumnRef, Condition, Literal};
use crate::sql::parser::lexer::{Keyword, Lexer, Token};
use super::types::{DataType, Operator};

pub mod ast;
mod lexer;

/// SQL Parser - Converts tokens into Abstract Syntax Tree (AST)
///
/// One parser handles exactly one statement. A trailing semicolon is optional
/// and nothing may follow it.
pub struct Parser<'a> {
    lexer: Peekable<Lexer<'a>>,
    /// Offset of the most recently consumed token, for error messages
    offset: usize,
}

impl<'a> Parser<'a> {
    /// Creates a new parser for the given SQL input
    pub fn new(input: &'a str) -> Self {
        Parser { lexer: Lexer::new(input).peekable(), offset: 0 }
    }

    /// Parses the input SQL statement into an AST
    pub fn parse(&mut self) -> Result<ast::Statement> {
        let stmt = self.parse_statement()?;
        self.next_if_token(Token::Semicolon);
        // No tokens allowed after the statement
        if self.peek()?.is_some() {
            let token = self.next()?;
            return Err(self.unexpected(token));
        }
        debug!(?stmt, "parsed statement");
        Ok(stmt)
    }

    /// Parses a statement based on the first token
    fn parse_statement(&mut self) -> Result<ast::Statement> {
        match self.peek()? {
            Some(Token::Keyword(Keyword::Create)) => self.parse_ddl_create_table(),
            Some(Token::Keyword(Keyword::Drop)) => self.parse_ddl_drop_table(),
            Some(Token::Keyword(Keyword::Select)) => Ok(ast::Statement::Select(self.parse_select()?)),
            Some(Token::Keyword(Keyword::Insert)) => self.parse_insert(),
            Some(Token::Keyword(Keyword::Update)) => self.parse_update(),
            Some(Token::Keyword(Keyword::Delete)) => self.parse_delete(),
            Some(Token::Keyword(Keyword::Explain)) => {
                self.next()?;
                Ok(ast::Statement::Explain(self.parse_select()?))
            }
            Some(Token::Ident(ident)) if ident == "tables" => {
                self.next()?;
                Ok(ast::Statement::ListTables)
            }
            Some(Token::Ident(ident)) if ident == "schema" || ident == "describe" => {
                self.next()?;
                Ok(ast::Statement::DescribeSchema { table_name: self.next_ident()? })
            }
            Some(_) => {
                let token = self.next()?;
                Err(self.unexpected(token))
            }
            None => Err(Error::Syntax("empty statement".into())),
        }
    }

    /// Parses CREATE TABLE statement
    fn parse_ddl_create_table(&mut self) -> Result<ast::Statement> {
        self.next_expect(Token::Keyword(Keyword::Create))?;
        self.next_expect(Token::Keyword(Keyword::Table))?;
        let table_name = self.next_ident()?;
        self.next_expect(Token::OpenParen)?;

        let mut columns = Vec::new();
        loop {
            columns.push(self.parse_ddl_column()?);
            if self.next_if_token(Token::Comma).is_none() {
                break;
            }
        }
        self.next_expect(Token::CloseParen)?;
        Ok(ast::Statement::CreateTable { name: table_name, columns })
    }

    /// Parses column definition in CREATE TABLE
    fn parse_ddl_column(&mut self) -> Result<ast::Column> {
        let mut column = ast::Column {
            name: self.next_ident()?,
            datatype: match self.next()? {
                Token::Keyword(Keyword::Int) | Token::Keyword(Keyword::Integer) => DataType::Integer,
                Token::Keyword(Keyword::Bool) | Token::Keyword(Keyword::Boolean) => DataType::Boolean,
                Token::Keyword(Keyword::Text) => DataType::Text,
                Token::Ident(other) => {
                    return Err(Error::Syntax(format!(
                        "unknown data type {} at position {}",
                        other, self.offset
                    )))
                }
                token => return Err(self.unexpected(token)),
            },
            primary_key: false,
            unique: false,
            not_null: false,
        };

        // Parse column constraints (PRIMARY KEY, UNIQUE, NOT NULL, NULL)
        while let Some(Token::Keyword(keyword)) = self.next_if_keyword() {
            match keyword {
                Keyword::Primary => {
                    self.next_expect(Token::Keyword(Keyword::Key))?;
                    column.primary_key = true;
                }
                Keyword::Unique => column.unique = true,
                Keyword::Not => {
                    self.next_expect(Token::Keyword(Keyword::Null))?;
                    column.not_null = true;
                }
                Keyword::Null => {}
                k => return Err(self.unexpected(Token::Keyword(k))),
            }
        }

        Ok(column)
    }

    /// Parses DROP TABLE statement
    fn parse_ddl_drop_table(&mut self) -> Result<ast::Statement> {
        self.next_expect(Token::Keyword(Keyword::Drop))?;
        self.next_expect(Token::Keyword(Keyword::Table))?;
        Ok(ast::Statement::Drop { table_name: self.next_ident()? })
    }

    /// Parses the body of a SELECT statement
    fn parse_select(&mut self) -> Result<ast::Select> {
        self.next_expect(Token::Keyword(Keyword::Select))?;

        let mut projection = Vec::new();
        if self.next_if_token(Token::Asterisk).is_none() {
            loop {
                projection.push(self.parse_column_ref()?);
                if self.next_if_token(Token::OpenParen).is_some() {
                    return Err(Error::UnsupportedSyntax(format!(
                        "function calls and aggregates are not supported (position {})",
                        self.offset
                    )));
                }
                if self.next_if_token(Token::Comma).is_none() {
                    break;
                }
            }
        }

        self.next_expect(Token::Keyword(Keyword::From))?;
        let from = self.next_table_name()?;

        let join = if self.next_if_token(Token::Keyword(Keyword::Inner)).is_some() {
            self.next_expect(Token::Keyword(Keyword::Join))?;
            Some(self.parse_join()?)
        } else if self.next_if_token(Token::Keyword(Keyword::Join)).is_some() {
            Some(self.parse_join()?)
        } else {
            None
        };

        Ok(ast::Select {
            projection,
            from,
            join,
            where_clause: self.parse_where_clause()?,
        })
    }

    /// Parses `<table> ON <t1.col> = <t2.col>` after the JOIN keyword
    fn parse_join(&mut self) -> Result<ast::Join> {
        let table = self.next_table_name()?;
        self.next_expect(Token::Keyword(Keyword::On))?;
        let left = self.parse_qualified_ref()?;
        match self.next()? {
            Token::Equal => {}
            Token::NotEqual
            | Token::LessThan
            | Token::GreaterThan
            | Token::LessThanOrEqual
            | Token::GreaterThanOrEqual => {
                return Err(Error::UnsupportedSyntax(format!(
                    "only equality joins are supported (position {})",
                    self.offset
                )))
            }
            token => return Err(self.unexpected(token)),
        }
        let right = self.parse_qualified_ref()?;

        if matches!(
            self.peek()?,
            Some(Token::Keyword(Keyword::Join | Keyword::Inner))
        ) {
            return Err(Error::UnsupportedSyntax(
                "joins of more than two tables are not supported".into(),
            ));
        }
        Ok(ast::Join { table, left, right })
    }

    /// Parses INSERT statement
    fn parse_insert(&mut self) -> Result<ast::Statement> {
        self.next_expect(Token::Keyword(Keyword::Insert))?;
        self.next_expect(Token::Keyword(Keyword::Into))?;

        let table_name = self.next_ident()?;

        // Check if specific columns are specified
        let columns = if self.next_if_token(Token::OpenParen).is_some() {
            let mut cols = Vec::new();
            loop {
                cols.push(self.next_ident()?);
                match self.next()? {
                    Token::CloseParen => break,
                    Token::Comma => {}
                    token => return Err(self.unexpected(token)),
                }
            }
            Some(cols)
        } else {
            None
        };

        self.next_expect(Token::Keyword(Keyword::Values))?;
        self.next_expect(Token::OpenParen)?;
        let mut values = Vec::new();
        loop {
            values.push(self.parse_literal()?);
            match self.next()? {
                Token::CloseParen => break,
                Token::Comma => {}
                token => return Err(self.unexpected(token)),
            }
        }
        if self.peek()? == Some(Token::Comma) {
            return Err(Error::UnsupportedSyntax(
                "multi-row VALUES lists are not supported".into(),
            ));
        }

        if let Some(cols) = &columns {
            if cols.len() != values.len() {
                return Err(Error::Syntax(format!(
                    "INSERT lists {} columns but {} values",
                    cols.len(),
                    values.len()
                )));
            }
        }

        Ok(ast::Statement::Insert {
            table_name,
            columns,
            values,
        })
    }

    /// Parses UPDATE statement
    fn parse_update(&mut self) -> Result<ast::Statement> {
        self.next_expect(Token::Keyword(Keyword::Update))?;
        let table_name = self.next_ident()?;
        self.next_expect(Token::Keyword(Keyword::Set))?;

        let mut assignments: Vec<(String, Literal)> = Vec::new();
        loop {
            let col = self.next_ident()?;
            self.next_expect(Token::Equal)?;
            let value = self.parse_literal()?;
            // Assigning the same column twice is an error
            if assignments.iter().any(|(c, _)| *c == col) {
                return Err(Error::Syntax(format!(
                    "duplicate column {} in SET clause",
                    col
                )));
            }
            assignments.push((col, value));
            if self.next_if_token(Token::Comma).is_none() {
                break;
            }
        }
        Ok(ast::Statement::Update {
            table_name,
            assignments,
            where_clause: self.parse_where_clause()?,
        })
    }

    /// Parses DELETE statement
    fn parse_delete(&mut self) -> Result<ast::Statement> {
        self.next_expect(Token::Keyword(Keyword::Delete))?;
        self.next_expect(Token::Keyword(Keyword::From))?;
        Ok(ast::Statement::Delete {
            table_name: self.next_ident()?,
            where_clause: self.parse_where_clause()?,
        })
    }

    /// Parses a literal value, leaving type coercion to execution
    fn parse_literal(&mut self) -> Result<Literal> {
        Ok(match self.next()? {
            Token::Number(n) => Literal::Number(n),
            Token::Minus => match self.next()? {
                Token::Number(n) => Literal::Number(format!("-{}", n)),
                token => return Err(self.unexpected(token)),
            },
            Token::String(s) => Literal::String(s),
            Token::Keyword(Keyword::True) => Literal::Boolean(true),
            Token::Keyword(Keyword::False) => Literal::Boolean(false),
            Token::Keyword(Keyword::Null) => Literal::Null,
            Token::OpenParen => {
                return Err(Error::UnsupportedSyntax(format!(
                    "subqueries and expressions are not supported (position {})",
                    self.offset
                )))
            }
            token => return Err(self.unexpected(token)),
        })
    }

    /// Parses `<column> <op> <literal> [AND ...]`
    fn parse_where_clause(&mut self) -> Result<Vec<Condition>> {
        let mut conditions = Vec::new();
        if self.next_if_token(Token::Keyword(Keyword::Where)).is_none() {
            return Ok(conditions);
        }
        loop {
            let column = self.parse_column_ref()?;
            let op = match self.next()? {
                Token::Equal => Operator::Equal,
                Token::NotEqual => Operator::NotEqual,
                Token::LessThan => Operator::LessThan,
                Token::GreaterThan => Operator::GreaterThan,
                Token::LessThanOrEqual => Operator::LessThanOrEqual,
                Token::GreaterThanOrEqual => Operator::GreaterThanOrEqual,
                token => return Err(self.unexpected(token)),
            };
            let value = self.parse_literal()?;
            conditions.push(Condition { column, op, value });
            if self.next_if_token(Token::Keyword(Keyword::And)).is_none() {
                break;
            }
        }
        Ok(conditions)
    }

    /// Parses `col` or `table.col`
    fn parse_column_ref(&mut self) -> Result<ColumnRef> {
        let first = self.next_ident()?;
        if self.next_if_token(Token::Period).is_some() {
            return Ok(ColumnRef::qualified(first, self.next_ident()?));
        }
        Ok(ColumnRef::bare(first))
    }

    fn parse_qualified_ref(&mut self) -> Result<ColumnRef> {
        let column = self.parse_column_ref()?;
        if column.table.is_none() {
            return Err(Error::Syntax(format!(
                "join column {} must be qualified as table.column (position {})",
                column, self.offset
            )));
        }
        Ok(column)
    }

    /// Table name in FROM/JOIN position; a parenthesis here means a subquery
    fn next_table_name(&mut self) -> Result<String> {
        if self.peek()? == Some(Token::OpenParen) {
            self.next()?;
            return Err(Error::UnsupportedSyntax(format!(
                "subqueries are not supported (position {})",
                self.offset
            )));
        }
        self.next_ident()
    }

    /// Builds the error for an out-of-place token
    fn unexpected(&self, token: Token) -> Error {
        match token {
            Token::Keyword(k) if k.is_unsupported() => Error::UnsupportedSyntax(format!(
                "{} is not supported (position {})",
                k, self.offset
            )),
            token => Error::Syntax(format!(
                "unexpected token {} at position {}",
                token, self.offset
            )),
        }
    }

    /// Peeks at the next token
    fn peek(&mut self) -> Result<Option<Token>> {
        self.lexer
            .peek()
            .cloned()
            .transpose()
            .map(|lexeme| lexeme.map(|l| l.token))
    }

    /// Consumes and returns the next token
    fn next(&mut self) -> Result<Token> {
        let lexeme = self
            .lexer
            .next()
            .unwrap_or_else(|| Err(Error::Syntax("unexpected end of input".into())))?;
        self.offset = lexeme.offset;
        Ok(lexeme.token)
    }

    /// Expects and consumes an identifier
    fn next_ident(&mut self) -> Result<String> {
        match self.next()? {
            Token::Ident(ident) => Ok(ident),
            Token::Keyword(k) if k.is_unsupported() => Err(self.unexpected(Token::Keyword(k))),
            token => Err(Error::Syntax(format!(
                "expected identifier, got {} at position {}",
                token, self.offset
            ))),
        }
    }

    /// Expects a specific token, returns error if different
    fn next_expect(&mut self, expect: Token) -> Result<()> {
        let token = self.next()?;
        if token != expect {
            if let Token::Keyword(k) = &token {
                if k.is_unsupported() {
                    return Err(self.unexpected(token));
                }
            }
            return Err(Error::Syntax(format!(
                "expected {}, got {} at position {}",
                expect, token, self.offset
            )));
        }
        Ok(())
    }

    /// Consumes next token if it satisfies the predicate
    fn next_if<F: Fn(&Token) -> bool>(&mut self, predicate: F) -> Option<Token> {
        self.peek().unwrap_or(None).filter(|t| predicate(t))?;
        self.next().ok()
    }

    /// Consumes next token if it's a keyword
    fn next_if_keyword(&mut self) -> Option<Token> {
        self.next_if(|t| matches!(t, Token::Keyword(_)))
    }

    /// Consumes next token if it matches the given token
    fn next_if_token(&mut self, token: Token) -> Option<Token> {
        self.next_if(|t| t == &token)
    }
}

//! Recursive-descent SQL parser.

use std::iter::Peekable;

use super::ast::{
    AggregateOp, ColumnDef, Direction, Expr, Function, InsertSource, Projection, SelectStatement,
    Statement,
};
use super::{Keyword, Lexer, Token};
use crate::error::{Error, Result};
use crate::types::{Path, PathComponent, Value, ValueKind};

/// Constructor of a binary expression node.
type BinaryBuilder = fn(Box<Expr>, Box<Expr>) -> Expr;

pub struct Parser<'a> {
    lexer: Peekable<Lexer<'a>>,
    /// Offset of the most recently consumed token, for error reporting.
    offset: usize,
    /// Counter assigning indices to `?` placeholders.
    positional_params: usize,
}

impl<'a> Parser<'a> {
    /// Parses the input as exactly one statement, with an optional trailing
    /// semicolon.
    pub fn parse(statement: &str) -> Result<Statement> {
        let mut parser = Parser::new(statement);
        let statement = parser.parse_statement()?;
        parser.skip(Token::Semicolon);
        if let Some(token) = parser.peek()?.cloned() {
            return Err(parser.err(format!("unexpected token {}", token)));
        }
        Ok(statement)
    }

    fn new(input: &'a str) -> Parser<'a> {
        Parser {
            lexer: Lexer::new(input).peekable(),
            offset: 0,
            positional_params: 0,
        }
    }

    fn err(&self, message: impl Into<String>) -> Error {
        Error::Syntax {
            message: message.into(),
            offset: self.offset,
        }
    }

    /// Consumes and returns the next token, or errors at end of input.
    fn next(&mut self) -> Result<Token> {
        match self.lexer.next().transpose()? {
            Some((offset, token)) => {
                self.offset = offset;
                Ok(token)
            }
            None => Err(self.err("unexpected end of input")),
        }
    }

    fn peek(&mut self) -> Result<Option<&Token>> {
        match self.lexer.peek() {
            Some(Ok((_, token))) => Ok(Some(token)),
            Some(Err(err)) => Err(err.clone()),
            None => Ok(None),
        }
    }

    fn next_ident(&mut self) -> Result<String> {
        match self.next()? {
            Token::Ident(ident) => Ok(ident),
            token => Err(self.err(format!("expected identifier, found {}", token))),
        }
    }

    /// Consumes the next token if it equals `token`.
    fn next_is(&mut self, token: Token) -> bool {
        match self.peek() {
            Ok(Some(peeked)) if *peeked == token => {
                let _ = self.next();
                true
            }
            _ => false,
        }
    }

    fn expect(&mut self, expected: Token) -> Result<()> {
        let token = self.next()?;
        if token != expected {
            return Err(self.err(format!("expected {}, found {}", expected, token)));
        }
        Ok(())
    }

    /// Like `next_is`, but expresses that absence is fine.
    fn skip(&mut self, token: Token) {
        self.next_is(token);
    }

    fn parse_statement(&mut self) -> Result<Statement> {
        match self.peek()? {
            Some(Token::Keyword(Keyword::Create)) => self.parse_create(),
            Some(Token::Keyword(Keyword::Drop)) => self.parse_drop(),
            Some(Token::Keyword(Keyword::Insert)) => self.parse_insert(),
            Some(Token::Keyword(Keyword::Select)) => self.parse_select(),
            Some(Token::Keyword(Keyword::Update)) => self.parse_update(),
            Some(Token::Keyword(Keyword::Delete)) => self.parse_delete(),
            Some(token) => {
                let message = format!("unexpected token {}", token);
                let _ = self.next();
                Err(self.err(message))
            }
            None => Err(self.err("empty statement")),
        }
    }

    fn parse_create(&mut self) -> Result<Statement> {
        self.expect(Keyword::Create.into())?;
        if self.next_is(Keyword::Table.into()) {
            return self.parse_create_table();
        }
        let unique = self.next_is(Keyword::Unique.into());
        self.expect(Keyword::Index.into())?;
        let name = self.next_ident()?;
        self.expect(Keyword::On.into())?;
        let table = self.next_ident()?;
        self.expect(Token::OpenParen)?;
        let path = self.parse_path()?;
        self.expect(Token::CloseParen)?;
        Ok(Statement::CreateIndex {
            name,
            table,
            path,
            unique,
        })
    }

    fn parse_create_table(&mut self) -> Result<Statement> {
        let name = self.next_ident()?;
        let mut columns = Vec::new();
        if self.next_is(Token::OpenParen) {
            loop {
                columns.push(self.parse_column_def()?);
                if !self.next_is(Token::Comma) {
                    break;
                }
            }
            self.expect(Token::CloseParen)?;
        }
        if columns.iter().filter(|c| c.primary_key).count() > 1 {
            return Err(self.err("multiple primary keys"));
        }
        Ok(Statement::CreateTable { name, columns })
    }

    fn parse_column_def(&mut self) -> Result<ColumnDef> {
        let path = self.parse_path()?;
        let kind = self.parse_kind()?;
        let mut column = ColumnDef {
            path,
            kind,
            primary_key: false,
            not_null: false,
            default: None,
        };
        loop {
            if self.next_is(Keyword::Primary.into()) {
                self.expect(Keyword::Key.into())?;
                column.primary_key = true;
            } else if self.next_is(Keyword::Not.into()) {
                self.expect(Keyword::Null.into())?;
                column.not_null = true;
            } else if self.next_is(Keyword::Default.into()) {
                column.default = Some(self.parse_literal_value()?);
            } else {
                return Ok(column);
            }
        }
    }

    fn parse_kind(&mut self) -> Result<ValueKind> {
        let kind = match self.next()? {
            Token::Keyword(Keyword::Int) | Token::Keyword(Keyword::Integer) => ValueKind::Int64,
            Token::Keyword(Keyword::Double) | Token::Keyword(Keyword::Float) => ValueKind::Float64,
            Token::Keyword(Keyword::Text) => ValueKind::Text,
            Token::Keyword(Keyword::Blob) => ValueKind::Blob,
            Token::Keyword(Keyword::Bool) | Token::Keyword(Keyword::Boolean) => ValueKind::Bool,
            Token::Keyword(Keyword::Array) => ValueKind::Array,
            Token::Keyword(Keyword::Document) => ValueKind::Document,
            token => return Err(self.err(format!("expected type, found {}", token))),
        };
        Ok(kind)
    }

    /// A constant literal, as allowed in DEFAULT clauses.
    fn parse_literal_value(&mut self) -> Result<Value> {
        match self.parse_expr_unary()? {
            Expr::Literal(value) => Ok(value),
            Expr::Negate(inner) => match *inner {
                Expr::Literal(Value::Int64(i)) => Ok(Value::Int64(-i)),
                Expr::Literal(Value::Float64(f)) => Ok(Value::Float64(-f)),
                _ => Err(self.err("expected literal value")),
            },
            _ => Err(self.err("expected literal value")),
        }
    }

    fn parse_drop(&mut self) -> Result<Statement> {
        self.expect(Keyword::Drop.into())?;
        if self.next_is(Keyword::Table.into()) {
            Ok(Statement::DropTable {
                name: self.next_ident()?,
            })
        } else if self.next_is(Keyword::Index.into()) {
            Ok(Statement::DropIndex {
                name: self.next_ident()?,
            })
        } else {
            let token = self.next()?;
            Err(self.err(format!("expected TABLE or INDEX, found {}", token)))
        }
    }

    fn parse_insert(&mut self) -> Result<Statement> {
        self.expect(Keyword::Insert.into())?;
        self.expect(Keyword::Into.into())?;
        let table = self.next_ident()?;

        if self.next_is(Token::OpenParen) {
            let mut paths = Vec::new();
            loop {
                paths.push(self.parse_path()?);
                if !self.next_is(Token::Comma) {
                    break;
                }
            }
            self.expect(Token::CloseParen)?;
            self.expect(Keyword::Values.into())?;

            let mut rows = Vec::new();
            loop {
                self.expect(Token::OpenParen)?;
                let mut row = Vec::new();
                loop {
                    row.push(self.parse_expression()?);
                    if !self.next_is(Token::Comma) {
                        break;
                    }
                }
                self.expect(Token::CloseParen)?;
                if row.len() != paths.len() {
                    return Err(self.err(format!(
                        "expected {} values, found {}",
                        paths.len(),
                        row.len()
                    )));
                }
                rows.push(row);
                if !self.next_is(Token::Comma) {
                    break;
                }
            }
            return Ok(Statement::Insert {
                table,
                source: InsertSource::Fields { paths, rows },
            });
        }

        self.expect(Keyword::Values.into())?;
        let mut documents = Vec::new();
        loop {
            let expr = self.parse_expression()?;
            if !matches!(expr, Expr::DocumentLiteral(_)) {
                return Err(self.err("expected document literal"));
            }
            documents.push(expr);
            if !self.next_is(Token::Comma) {
                break;
            }
        }
        Ok(Statement::Insert {
            table,
            source: InsertSource::Documents(documents),
        })
    }

    fn parse_select(&mut self) -> Result<Statement> {
        self.expect(Keyword::Select.into())?;

        let mut projections = Vec::new();
        loop {
            if self.next_is(Token::Asterisk) {
                projections.push(Projection::Wildcard);
            } else {
                let expr = self.parse_expression()?;
                let alias = if self.next_is(Keyword::As.into()) {
                    Some(self.next_ident()?)
                } else {
                    None
                };
                projections.push(Projection::Expr { expr, alias });
            }
            if !self.next_is(Token::Comma) {
                break;
            }
        }

        self.expect(Keyword::From.into())?;
        let table = self.next_ident()?;

        let filter = if self.next_is(Keyword::Where.into()) {
            Some(self.parse_expression()?)
        } else {
            None
        };

        let group_by = if self.next_is(Keyword::Group.into()) {
            self.expect(Keyword::By.into())?;
            Some(self.parse_path()?)
        } else {
            None
        };

        let order_by = if self.next_is(Keyword::Order.into()) {
            self.expect(Keyword::By.into())?;
            let path = self.parse_path()?;
            let direction = if self.next_is(Keyword::Desc.into()) {
                Direction::Descending
            } else {
                self.skip(Keyword::Asc.into());
                Direction::Ascending
            };
            Some((path, direction))
        } else {
            None
        };

        let limit = if self.next_is(Keyword::Limit.into()) {
            Some(self.parse_expression()?)
        } else {
            None
        };

        let offset = if self.next_is(Keyword::Offset.into()) {
            Some(self.parse_expression()?)
        } else {
            None
        };

        // LIMIT must precede OFFSET in the text; seeing it here means the
        // clauses were reversed.
        if matches!(self.peek()?, Some(Token::Keyword(Keyword::Limit))) {
            let _ = self.next();
            return Err(self.err("LIMIT must precede OFFSET"));
        }

        Ok(Statement::Select(SelectStatement {
            projections,
            table,
            filter,
            group_by,
            order_by,
            limit,
            offset,
        }))
    }

    fn parse_update(&mut self) -> Result<Statement> {
        self.expect(Keyword::Update.into())?;
        let table = self.next_ident()?;
        self.expect(Keyword::Set.into())?;

        let mut assignments = Vec::new();
        loop {
            let path = self.parse_path()?;
            self.expect(Token::Equal)?;
            let expr = self.parse_expression()?;
            assignments.push((path, expr));
            if !self.next_is(Token::Comma) {
                break;
            }
        }

        let filter = if self.next_is(Keyword::Where.into()) {
            Some(self.parse_expression()?)
        } else {
            None
        };
        Ok(Statement::Update {
            table,
            assignments,
            filter,
        })
    }

    fn parse_delete(&mut self) -> Result<Statement> {
        self.expect(Keyword::Delete.into())?;
        self.expect(Keyword::From.into())?;
        let table = self.next_ident()?;
        let filter = if self.next_is(Keyword::Where.into()) {
            Some(self.parse_expression()?)
        } else {
            None
        };
        Ok(Statement::Delete { table, filter })
    }

    fn parse_path(&mut self) -> Result<Path> {
        let mut components = vec![PathComponent::Field(self.next_ident()?)];
        loop {
            if self.next_is(Token::Period) {
                components.push(PathComponent::Field(self.next_ident()?));
            } else if self.next_is(Token::OpenBracket) {
                let index = match self.next()? {
                    Token::Number(number) => number
                        .parse::<usize>()
                        .map_err(|_| self.err("expected array index"))?,
                    token => return Err(self.err(format!("expected array index, found {}", token))),
                };
                self.expect(Token::CloseBracket)?;
                components.push(PathComponent::Index(index));
            } else {
                return Ok(Path::new(components));
            }
        }
    }

    pub(crate) fn parse_expression(&mut self) -> Result<Expr> {
        self.parse_expr_or()
    }

    fn parse_expr_or(&mut self) -> Result<Expr> {
        let mut lhs = self.parse_expr_and()?;
        while self.next_is(Keyword::Or.into()) {
            let rhs = self.parse_expr_and()?;
            lhs = Expr::Or(Box::new(lhs), Box::new(rhs));
        }
        Ok(lhs)
    }

    fn parse_expr_and(&mut self) -> Result<Expr> {
        let mut lhs = self.parse_expr_not()?;
        while self.next_is(Keyword::And.into()) {
            let rhs = self.parse_expr_not()?;
            lhs = Expr::And(Box::new(lhs), Box::new(rhs));
        }
        Ok(lhs)
    }

    fn parse_expr_not(&mut self) -> Result<Expr> {
        if self.next_is(Keyword::Not.into()) {
            return Ok(Expr::Not(Box::new(self.parse_expr_not()?)));
        }
        self.parse_expr_comparison()
    }

    fn parse_expr_comparison(&mut self) -> Result<Expr> {
        let lhs = self.parse_expr_additive()?;
        let op: BinaryBuilder = match self.peek()? {
            Some(Token::Equal) => Expr::Equal,
            Some(Token::NotEqual) => Expr::NotEqual,
            Some(Token::LessThan) => Expr::LessThan,
            Some(Token::LessOrEqual) => Expr::LessOrEqual,
            Some(Token::GreaterThan) => Expr::GreaterThan,
            Some(Token::GreaterOrEqual) => Expr::GreaterOrEqual,
            _ => return Ok(lhs),
        };
        let _ = self.next();
        let rhs = self.parse_expr_additive()?;
        Ok(op(Box::new(lhs), Box::new(rhs)))
    }

    fn parse_expr_additive(&mut self) -> Result<Expr> {
        let mut lhs = self.parse_expr_multiplicative()?;
        loop {
            let op: BinaryBuilder = match self.peek()? {
                Some(Token::Plus) => Expr::Add,
                Some(Token::Minus) => Expr::Subtract,
                _ => return Ok(lhs),
            };
            let _ = self.next();
            let rhs = self.parse_expr_multiplicative()?;
            lhs = op(Box::new(lhs), Box::new(rhs));
        }
    }

    fn parse_expr_multiplicative(&mut self) -> Result<Expr> {
        let mut lhs = self.parse_expr_unary()?;
        loop {
            let op: BinaryBuilder = match self.peek()? {
                Some(Token::Asterisk) => Expr::Multiply,
                Some(Token::Slash) => Expr::Divide,
                Some(Token::Percent) => Expr::Remainder,
                _ => return Ok(lhs),
            };
            let _ = self.next();
            let rhs = self.parse_expr_unary()?;
            lhs = op(Box::new(lhs), Box::new(rhs));
        }
    }

    fn parse_expr_unary(&mut self) -> Result<Expr> {
        if self.next_is(Token::Minus) {
            return Ok(Expr::Negate(Box::new(self.parse_expr_unary()?)));
        }
        if self.next_is(Token::Plus) {
            return self.parse_expr_unary();
        }
        self.parse_expr_primary()
    }

    fn parse_expr_primary(&mut self) -> Result<Expr> {
        match self.next()? {
            Token::Number(number) => self.parse_number(&number),
            Token::String(s) => Ok(Expr::Literal(Value::Text(s))),
            Token::Keyword(Keyword::True) => Ok(Expr::Literal(Value::Bool(true))),
            Token::Keyword(Keyword::False) => Ok(Expr::Literal(Value::Bool(false))),
            Token::Keyword(Keyword::Null) => Ok(Expr::Literal(Value::Null)),
            Token::Question => {
                let index = self.positional_params;
                self.positional_params += 1;
                Ok(Expr::PositionalParam(index))
            }
            Token::NamedParam(name) => Ok(Expr::NamedParam(name)),
            Token::OpenParen => {
                let expr = self.parse_expression()?;
                self.expect(Token::CloseParen)?;
                Ok(expr)
            }
            Token::OpenBrace => self.parse_document_literal(),
            Token::OpenBracket => self.parse_array_literal(),
            Token::Keyword(Keyword::Key) => {
                self.expect(Token::OpenParen)?;
                self.expect(Token::CloseParen)?;
                Ok(Expr::Function(Function::Key))
            }
            Token::Ident(ident) => {
                if matches!(self.peek()?, Some(Token::OpenParen)) {
                    return self.parse_function(&ident);
                }
                let mut components = vec![PathComponent::Field(ident)];
                loop {
                    if self.next_is(Token::Period) {
                        components.push(PathComponent::Field(self.next_ident()?));
                    } else if self.next_is(Token::OpenBracket) {
                        let index = match self.next()? {
                            Token::Number(number) => number
                                .parse::<usize>()
                                .map_err(|_| self.err("expected array index"))?,
                            token => {
                                return Err(
                                    self.err(format!("expected array index, found {}", token))
                                )
                            }
                        };
                        self.expect(Token::CloseBracket)?;
                        components.push(PathComponent::Index(index));
                    } else {
                        return Ok(Expr::Path(Path::new(components)));
                    }
                }
            }
            token => Err(self.err(format!("expected expression, found {}", token))),
        }
    }

    fn parse_number(&mut self, number: &str) -> Result<Expr> {
        if number.contains('.') {
            let f: f64 = number
                .parse()
                .map_err(|_| self.err(format!("invalid number {}", number)))?;
            Ok(Expr::Literal(Value::Float64(f)))
        } else {
            let i: i64 = number
                .parse()
                .map_err(|_| self.err(format!("invalid number {}", number)))?;
            Ok(Expr::Literal(Value::Int64(i)))
        }
    }

    fn parse_document_literal(&mut self) -> Result<Expr> {
        let mut fields = Vec::new();
        if self.next_is(Token::CloseBrace) {
            return Ok(Expr::DocumentLiteral(fields));
        }
        loop {
            let name = match self.next()? {
                Token::Ident(name) => name,
                Token::String(name) => name,
                token => return Err(self.err(format!("expected field name, found {}", token))),
            };
            self.expect(Token::Colon)?;
            let expr = self.parse_expression()?;
            fields.push((name, expr));
            if !self.next_is(Token::Comma) {
                break;
            }
        }
        self.expect(Token::CloseBrace)?;
        Ok(Expr::DocumentLiteral(fields))
    }

    fn parse_array_literal(&mut self) -> Result<Expr> {
        let mut items = Vec::new();
        if self.next_is(Token::CloseBracket) {
            return Ok(Expr::ArrayLiteral(items));
        }
        loop {
            items.push(self.parse_expression()?);
            if !self.next_is(Token::Comma) {
                break;
            }
        }
        self.expect(Token::CloseBracket)?;
        Ok(Expr::ArrayLiteral(items))
    }

    fn parse_function(&mut self, name: &str) -> Result<Expr> {
        self.expect(Token::OpenParen)?;
        match name.to_ascii_lowercase().as_str() {
            "pk" => {
                self.expect(Token::CloseParen)?;
                Ok(Expr::Function(Function::Pk))
            }
            aggregate @ ("count" | "min" | "max" | "sum" | "avg") => {
                let op = match aggregate {
                    "count" => AggregateOp::Count,
                    "min" => AggregateOp::Min,
                    "max" => AggregateOp::Max,
                    "sum" => AggregateOp::Sum,
                    _ => AggregateOp::Avg,
                };
                if self.next_is(Token::Asterisk) {
                    if op != AggregateOp::Count {
                        return Err(self.err(format!("{} requires an argument", op)));
                    }
                    self.expect(Token::CloseParen)?;
                    return Ok(Expr::Aggregate(op, None));
                }
                let arg = self.parse_expression()?;
                self.expect(Token::CloseParen)?;
                Ok(Expr::Aggregate(op, Some(Box::new(arg))))
            }
            _ => Err(self.err(format!("unknown function {}", name))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(sql: &str) -> Statement {
        Parser::parse(sql).unwrap()
    }

    fn parse_err(sql: &str) -> Error {
        Parser::parse(sql).unwrap_err()
    }

    #[test]
    fn parses_create_table() {
        assert_eq!(
            parse("CREATE TABLE t"),
            Statement::CreateTable {
                name: "t".into(),
                columns: vec![],
            }
        );

        let stmt = parse(
            "CREATE TABLE t (id INTEGER PRIMARY KEY, name TEXT NOT NULL, score DOUBLE DEFAULT 0.5)",
        );
        match stmt {
            Statement::CreateTable { name, columns } => {
                assert_eq!(name, "t");
                assert_eq!(columns.len(), 3);
                assert!(columns[0].primary_key);
                assert_eq!(columns[0].kind, ValueKind::Int64);
                assert!(columns[1].not_null);
                assert_eq!(columns[2].default, Some(Value::Float64(0.5)));
            }
            other => panic!("unexpected statement {:?}", other),
        }

        assert!(matches!(
            parse_err("CREATE TABLE t (a INT PRIMARY KEY, b INT PRIMARY KEY)"),
            Error::Syntax { .. }
        ));
    }

    #[test]
    fn parses_create_index() {
        assert_eq!(
            parse("CREATE UNIQUE INDEX ix ON t (a.b)"),
            Statement::CreateIndex {
                name: "ix".into(),
                table: "t".into(),
                path: Path::new(vec![
                    PathComponent::Field("a".into()),
                    PathComponent::Field("b".into()),
                ]),
                unique: true,
            }
        );
    }

    #[test]
    fn parses_insert_forms() {
        let stmt = parse("INSERT INTO t (a, b) VALUES (1, 'x'), (2, 'y')");
        match stmt {
            Statement::Insert {
                source: InsertSource::Fields { paths, rows },
                ..
            } => {
                assert_eq!(paths.len(), 2);
                assert_eq!(rows.len(), 2);
            }
            other => panic!("unexpected statement {:?}", other),
        }

        let stmt = parse("INSERT INTO t VALUES {a: 1, b: 'x'}");
        match stmt {
            Statement::Insert {
                source: InsertSource::Documents(docs),
                ..
            } => assert_eq!(docs.len(), 1),
            other => panic!("unexpected statement {:?}", other),
        }

        assert!(matches!(
            parse_err("INSERT INTO t (a, b) VALUES (1)"),
            Error::Syntax { .. }
        ));
        assert!(matches!(
            parse_err("INSERT INTO t VALUES (1)"),
            Error::Syntax { .. }
        ));
    }

    #[test]
    fn parses_select() {
        let stmt = parse(
            "SELECT a, b + 1 AS next, count(*) FROM t \
             WHERE a >= 3 AND b != 'x' \
             GROUP BY a ORDER BY b DESC LIMIT 10 OFFSET 5",
        );
        let select = match stmt {
            Statement::Select(select) => select,
            other => panic!("unexpected statement {:?}", other),
        };
        assert_eq!(select.projections.len(), 3);
        assert!(select.filter.is_some());
        assert_eq!(select.group_by, Some(Path::field("a")));
        assert_eq!(
            select.order_by,
            Some((Path::field("b"), Direction::Descending))
        );
        assert_eq!(select.limit, Some(Expr::Literal(Value::Int64(10))));
        assert_eq!(select.offset, Some(Expr::Literal(Value::Int64(5))));
        assert!(Statement::Select(select).is_read_only());
    }

    #[test]
    fn offset_before_limit_is_rejected() {
        assert!(matches!(
            parse_err("SELECT * FROM t OFFSET 5 LIMIT 3"),
            Error::Syntax { .. }
        ));
        // The accepted order still works.
        parse("SELECT * FROM t LIMIT 3 OFFSET 5");
    }

    #[test]
    fn parses_update_and_delete() {
        let stmt = parse("UPDATE t SET a = a + 1, b = 'x' WHERE key() = 1");
        match stmt {
            Statement::Update { assignments, .. } => assert_eq!(assignments.len(), 2),
            other => panic!("unexpected statement {:?}", other),
        }
        assert!(!parse("DELETE FROM t WHERE a = 1").is_read_only());
    }

    #[test]
    fn expression_precedence() {
        let stmt = parse("SELECT * FROM t WHERE a = 1 + 2 * 3 OR NOT b");
        let filter = match stmt {
            Statement::Select(select) => select.filter.unwrap(),
            other => panic!("unexpected statement {:?}", other),
        };
        assert_eq!(filter.to_string(), "a = 1 + 2 * 3 OR NOT b");
        match filter {
            Expr::Or(lhs, _) => match *lhs {
                Expr::Equal(_, rhs) => match *rhs {
                    Expr::Add(_, mul) => assert!(matches!(*mul, Expr::Multiply(..))),
                    other => panic!("unexpected rhs {:?}", other),
                },
                other => panic!("unexpected lhs {:?}", other),
            },
            other => panic!("unexpected filter {:?}", other),
        }
    }

    #[test]
    fn positional_params_are_numbered_in_order() {
        let stmt = parse("SELECT * FROM t WHERE a = ? AND b = ? AND c = $named");
        let filter = match stmt {
            Statement::Select(select) => select.filter.unwrap(),
            other => panic!("unexpected statement {:?}", other),
        };
        let rendered = filter.to_string();
        assert_eq!(rendered, "a = ? AND b = ? AND c = $named");
        match filter {
            Expr::And(lhs, _) => match *lhs {
                Expr::And(first, second) => {
                    assert!(matches!(
                        *first,
                        Expr::Equal(_, ref p) if **p == Expr::PositionalParam(0)
                    ));
                    assert!(matches!(
                        *second,
                        Expr::Equal(_, ref p) if **p == Expr::PositionalParam(1)
                    ));
                }
                other => panic!("unexpected lhs {:?}", other),
            },
            other => panic!("unexpected filter {:?}", other),
        }
    }

    #[test]
    fn trailing_tokens_are_rejected() {
        assert!(matches!(
            parse_err("SELECT * FROM t garbage"),
            Error::Syntax { .. }
        ));
    }
}

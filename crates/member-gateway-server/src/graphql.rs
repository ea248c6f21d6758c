// crates/member-gateway-server/src/graphql.rs
// ============================================================================
// Module: Inbound GraphQL Parser
// Description: Minimal, non-validating parser for member API operations.
// Purpose: Extract the root field, its arguments, and the requested
//          selection tree from an inbound GraphQL document.
// Dependencies: member-gateway-core, serde_json, thiserror
// ============================================================================

//! ## Overview
//! The member API exposes one root field per operation, so the parser only
//! needs the operation keyword, variable definitions, one root field with
//! arguments, and nested field names. Aliases are accepted and ignored below
//! the root. Fragments, directives, subscriptions, and block strings are
//! rejected rather than half-supported.
//!
//! Input is untrusted: the document size and selection depth are bounded.

// ============================================================================
// SECTION: Imports
// ============================================================================

use member_gateway_core::OperationKind;
use member_gateway_core::SelectionNode;
use serde_json::Map;
use serde_json::Number;
use serde_json::Value;
use thiserror::Error;

// ============================================================================
// SECTION: Limits
// ============================================================================

/// Maximum inbound document size in bytes.
pub const MAX_DOCUMENT_BYTES: usize = 64 * 1024;

/// Maximum selection nesting depth.
pub const MAX_SELECTION_DEPTH: usize = 32;

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Document parse errors.
///
/// # Invariants
/// - Variants are stable for programmatic handling.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseError {
    /// Document exceeds [`MAX_DOCUMENT_BYTES`].
    #[error("document exceeds {MAX_DOCUMENT_BYTES} bytes")]
    TooLarge,
    /// Lexical or grammatical error.
    #[error("syntax error at byte {offset}: {message}")]
    Syntax {
        /// Byte offset of the offending token.
        offset: usize,
        /// Description.
        message: String,
    },
    /// Construct outside the supported subset.
    #[error("unsupported construct: {0}")]
    Unsupported(&'static str),
    /// Operation selects zero or several root fields.
    #[error("operation must select exactly one root field")]
    RootCount,
    /// Selection nesting exceeds [`MAX_SELECTION_DEPTH`].
    #[error("selection nesting exceeds {MAX_SELECTION_DEPTH} levels")]
    TooDeep,
    /// Operation selection by name failed.
    #[error("{0}")]
    OperationSelection(String),
    /// Argument references an undeclared variable.
    #[error("variable ${0} is not defined")]
    UndefinedVariable(String),
}

// ============================================================================
// SECTION: Syntax Tree
// ============================================================================

/// Argument value literal.
#[derive(Debug, Clone, PartialEq)]
pub enum InputValue {
    /// `$name` reference.
    Variable(String),
    /// `null`.
    Null,
    /// `true` or `false`.
    Boolean(bool),
    /// Integer literal.
    Int(i64),
    /// Float literal.
    Float(f64),
    /// String literal.
    String(String),
    /// Enum literal, forwarded as a string.
    Enum(String),
    /// List literal.
    List(Vec<Self>),
    /// Input object literal.
    Object(Vec<(String, Self)>),
}

/// Variable definition from the operation header.
#[derive(Debug, Clone, PartialEq)]
pub struct VariableDefinition {
    /// Variable name without `$`.
    pub name: String,
    /// Declared type, e.g. `String!`.
    pub type_ref: String,
    /// Default value.
    pub default: Option<InputValue>,
}

/// The single root field of an operation.
#[derive(Debug, Clone, PartialEq)]
pub struct RootField {
    /// Response alias.
    pub alias: Option<String>,
    /// Field name.
    pub name: String,
    /// Arguments in document order.
    pub arguments: Vec<(String, InputValue)>,
    /// Requested sub-selection.
    pub selection: Vec<SelectionNode>,
}

impl RootField {
    /// Returns the key the field is reported under in the response.
    #[must_use]
    pub fn response_key(&self) -> &str {
        self.alias.as_deref().unwrap_or(&self.name)
    }
}

/// Parsed operation.
#[derive(Debug, Clone, PartialEq)]
pub struct Operation {
    /// Query or mutation.
    pub kind: OperationKind,
    /// Operation name.
    pub name: Option<String>,
    /// Variable definitions.
    pub variables: Vec<VariableDefinition>,
    /// Root field.
    pub root: RootField,
}

impl Operation {
    /// Resolves root arguments to JSON values, substituting variables.
    ///
    /// A declared variable missing from `supplied` takes its default, or
    /// `null` when it has none.
    ///
    /// # Errors
    ///
    /// Returns [`ParseError::UndefinedVariable`] when an argument references
    /// a variable the operation does not declare.
    pub fn resolve_arguments(&self, supplied: &Map<String, Value>) -> Result<Map<String, Value>, ParseError> {
        let mut resolved = Map::new();
        for (name, value) in &self.root.arguments {
            resolved.insert(name.clone(), self.resolve_value(value, supplied)?);
        }
        Ok(resolved)
    }

    /// Converts one literal to JSON.
    fn resolve_value(&self, value: &InputValue, supplied: &Map<String, Value>) -> Result<Value, ParseError> {
        Ok(match value {
            InputValue::Variable(name) => {
                let definition = self
                    .variables
                    .iter()
                    .find(|definition| &definition.name == name)
                    .ok_or_else(|| ParseError::UndefinedVariable(name.clone()))?;
                match (supplied.get(name), &definition.default) {
                    (Some(value), _) => value.clone(),
                    (None, Some(default)) => self.resolve_value(default, supplied)?,
                    (None, None) => Value::Null,
                }
            }
            InputValue::Null => Value::Null,
            InputValue::Boolean(flag) => Value::Bool(*flag),
            InputValue::Int(number) => Value::from(*number),
            InputValue::Float(number) => Number::from_f64(*number).map_or(Value::Null, Value::Number),
            InputValue::String(text) | InputValue::Enum(text) => Value::String(text.clone()),
            InputValue::List(items) => {
                Value::Array(items.iter().map(|item| self.resolve_value(item, supplied)).collect::<Result<_, _>>()?)
            }
            InputValue::Object(fields) => {
                let mut object = Map::new();
                for (key, item) in fields {
                    object.insert(key.clone(), self.resolve_value(item, supplied)?);
                }
                Value::Object(object)
            }
        })
    }
}

// ============================================================================
// SECTION: Entry Point
// ============================================================================

/// Parses `document` and selects the operation named `operation_name`.
///
/// Without a name the document must contain exactly one operation.
///
/// # Errors
///
/// Returns [`ParseError`] when the document is oversized, malformed, outside
/// the supported subset, or the requested operation is absent.
pub fn parse_operation(document: &str, operation_name: Option<&str>) -> Result<Operation, ParseError> {
    if document.len() > MAX_DOCUMENT_BYTES {
        return Err(ParseError::TooLarge);
    }
    let mut parser = Parser::new(document)?;
    let mut operations = Vec::new();
    while parser.current != Token::End {
        operations.push(parser.operation()?);
    }
    match operation_name {
        Some(wanted) => operations
            .into_iter()
            .find(|operation| operation.name.as_deref() == Some(wanted))
            .ok_or_else(|| ParseError::OperationSelection(format!("operation {wanted} not found in document"))),
        None => {
            if operations.len() > 1 {
                return Err(ParseError::OperationSelection("operationName is required for multi-operation documents".to_string()));
            }
            operations.pop().ok_or_else(|| ParseError::OperationSelection("document contains no operation".to_string()))
        }
    }
}

// ============================================================================
// SECTION: Lexer
// ============================================================================

/// Lexical token.
#[derive(Debug, Clone, PartialEq)]
enum Token {
    /// Single punctuator byte.
    Punct(u8),
    /// `...`.
    Spread,
    /// Name.
    Name(String),
    /// Integer literal text.
    Int(String),
    /// Float literal text.
    Float(String),
    /// Decoded string literal.
    Str(String),
    /// End of input.
    End,
}

/// Byte-oriented lexer.
struct Lexer<'a> {
    /// Source bytes.
    bytes: &'a [u8],
    /// Current offset.
    pos: usize,
}

impl<'a> Lexer<'a> {
    /// Creates a lexer over `source`.
    const fn new(source: &'a str) -> Self {
        Self {
            bytes: source.as_bytes(),
            pos: 0,
        }
    }

    /// Builds a syntax error at `offset`.
    fn error(offset: usize, message: impl Into<String>) -> ParseError {
        ParseError::Syntax {
            offset,
            message: message.into(),
        }
    }

    /// Skips whitespace, commas, byte order marks, and comments.
    fn skip_ignored(&mut self) {
        while let Some(&byte) = self.bytes.get(self.pos) {
            match byte {
                b' ' | b'\t' | b'\n' | b'\r' | b',' => self.pos += 1,
                b'#' => {
                    while self.bytes.get(self.pos).is_some_and(|byte| *byte != b'\n' && *byte != b'\r') {
                        self.pos += 1;
                    }
                }
                0xEF if self.bytes.get(self.pos .. self.pos + 3) == Some(&[0xEF, 0xBB, 0xBF][..]) => self.pos += 3,
                _ => break,
            }
        }
    }

    /// Returns the next token and its offset.
    fn next(&mut self) -> Result<(usize, Token), ParseError> {
        self.skip_ignored();
        let start = self.pos;
        let Some(&byte) = self.bytes.get(start) else {
            return Ok((start, Token::End));
        };
        let token = match byte {
            b'{' | b'}' | b'(' | b')' | b'[' | b']' | b':' | b'!' | b'$' | b'=' | b'@' | b'|' | b'&' => {
                self.pos += 1;
                Token::Punct(byte)
            }
            b'.' => {
                if self.bytes.get(start .. start + 3) != Some(&b"..."[..]) {
                    return Err(Self::error(start, "unexpected '.'"));
                }
                self.pos += 3;
                Token::Spread
            }
            b'"' => self.string(start)?,
            b'-' | b'0' ..= b'9' => self.number(start)?,
            b'_' | b'A' ..= b'Z' | b'a' ..= b'z' => {
                while self.bytes.get(self.pos).is_some_and(|byte| byte.is_ascii_alphanumeric() || *byte == b'_') {
                    self.pos += 1;
                }
                Token::Name(self.slice(start)?)
            }
            _ => return Err(Self::error(start, format!("unexpected character 0x{byte:02x}"))),
        };
        Ok((start, token))
    }

    /// Returns the source text from `start` to the current offset.
    fn slice(&self, start: usize) -> Result<String, ParseError> {
        std::str::from_utf8(&self.bytes[start .. self.pos])
            .map(str::to_string)
            .map_err(|_| Self::error(start, "invalid utf-8"))
    }

    /// Consumes ASCII digits, returning how many were read.
    fn digits(&mut self) -> usize {
        let start = self.pos;
        while self.bytes.get(self.pos).is_some_and(u8::is_ascii_digit) {
            self.pos += 1;
        }
        self.pos - start
    }

    /// Lexes an integer or float literal.
    fn number(&mut self, start: usize) -> Result<Token, ParseError> {
        if self.bytes.get(self.pos) == Some(&b'-') {
            self.pos += 1;
        }
        if self.digits() == 0 {
            return Err(Self::error(start, "expected digit"));
        }
        let mut is_float = false;
        if self.bytes.get(self.pos) == Some(&b'.') {
            self.pos += 1;
            is_float = true;
            if self.digits() == 0 {
                return Err(Self::error(start, "expected digit after '.'"));
            }
        }
        if matches!(self.bytes.get(self.pos), Some(b'e' | b'E')) {
            self.pos += 1;
            is_float = true;
            if matches!(self.bytes.get(self.pos), Some(b'+' | b'-')) {
                self.pos += 1;
            }
            if self.digits() == 0 {
                return Err(Self::error(start, "expected exponent digits"));
            }
        }
        let text = self.slice(start)?;
        Ok(if is_float { Token::Float(text) } else { Token::Int(text) })
    }

    /// Lexes a quoted string literal with escapes.
    fn string(&mut self, start: usize) -> Result<Token, ParseError> {
        if self.bytes.get(start .. start + 3) == Some(&b"\"\"\""[..]) {
            return Err(ParseError::Unsupported("block strings"));
        }
        self.pos += 1;
        let mut out = String::new();
        let mut run_start = self.pos;
        loop {
            let Some(&byte) = self.bytes.get(self.pos) else {
                return Err(Self::error(start, "unterminated string"));
            };
            match byte {
                b'"' => {
                    out.push_str(&self.slice(run_start)?);
                    self.pos += 1;
                    return Ok(Token::Str(out));
                }
                b'\n' | b'\r' => return Err(Self::error(start, "unterminated string")),
                b'\\' => {
                    out.push_str(&self.slice(run_start)?);
                    let escape = self.bytes.get(self.pos + 1).copied();
                    self.pos += 2;
                    match escape {
                        Some(b'"') => out.push('"'),
                        Some(b'\\') => out.push('\\'),
                        Some(b'/') => out.push('/'),
                        Some(b'b') => out.push('\u{8}'),
                        Some(b'f') => out.push('\u{c}'),
                        Some(b'n') => out.push('\n'),
                        Some(b'r') => out.push('\r'),
                        Some(b't') => out.push('\t'),
                        Some(b'u') => {
                            let hex = self
                                .bytes
                                .get(self.pos .. self.pos + 4)
                                .and_then(|hex| std::str::from_utf8(hex).ok())
                                .and_then(|hex| u32::from_str_radix(hex, 16).ok())
                                .and_then(char::from_u32)
                                .ok_or_else(|| Self::error(self.pos, "invalid unicode escape"))?;
                            out.push(hex);
                            self.pos += 4;
                        }
                        _ => return Err(Self::error(self.pos - 1, "invalid escape")),
                    }
                    run_start = self.pos;
                }
                _ => self.pos += 1,
            }
        }
    }
}

// ============================================================================
// SECTION: Parser
// ============================================================================

/// Recursive-descent parser with one token of lookahead.
struct Parser<'a> {
    /// Token source.
    lexer: Lexer<'a>,
    /// Offset of the current token.
    offset: usize,
    /// Current token.
    current: Token,
}

impl<'a> Parser<'a> {
    /// Creates a parser positioned at the first token.
    fn new(source: &'a str) -> Result<Self, ParseError> {
        let mut lexer = Lexer::new(source);
        let (offset, current) = lexer.next()?;
        Ok(Self {
            lexer,
            offset,
            current,
        })
    }

    /// Advances and returns the previous token.
    fn advance(&mut self) -> Result<Token, ParseError> {
        let (offset, next) = self.lexer.next()?;
        self.offset = offset;
        Ok(std::mem::replace(&mut self.current, next))
    }

    /// Builds a syntax error at the current token.
    fn error(&self, message: impl Into<String>) -> ParseError {
        Lexer::error(self.offset, message)
    }

    /// Returns true when the current token is the punctuator `byte`.
    fn at(&self, byte: u8) -> bool {
        self.current == Token::Punct(byte)
    }

    /// Consumes the punctuator `byte`.
    fn expect(&mut self, byte: u8) -> Result<(), ParseError> {
        if !self.at(byte) {
            return Err(self.error(format!("expected '{}'", char::from(byte))));
        }
        self.advance()?;
        Ok(())
    }

    /// Consumes a name.
    fn name(&mut self) -> Result<String, ParseError> {
        match self.advance()? {
            Token::Name(name) => Ok(name),
            _ => Err(self.error("expected name")),
        }
    }

    /// Rejects directives at the current position.
    fn reject_directives(&self) -> Result<(), ParseError> {
        if self.at(b'@') { Err(ParseError::Unsupported("directives")) } else { Ok(()) }
    }

    /// Parses one operation definition.
    fn operation(&mut self) -> Result<Operation, ParseError> {
        let (kind, name, variables) = if self.at(b'{') {
            (OperationKind::Query, None, Vec::new())
        } else {
            let kind = match self.name()?.as_str() {
                "query" => OperationKind::Query,
                "mutation" => OperationKind::Mutation,
                "subscription" => return Err(ParseError::Unsupported("subscriptions")),
                "fragment" => return Err(ParseError::Unsupported("fragments")),
                other => return Err(self.error(format!("unknown definition '{other}'"))),
            };
            let name = if matches!(self.current, Token::Name(_)) { Some(self.name()?) } else { None };
            let variables = if self.at(b'(') { self.variable_definitions()? } else { Vec::new() };
            self.reject_directives()?;
            (kind, name, variables)
        };
        let mut fields = self.selection_set(0)?;
        if fields.len() != 1 {
            return Err(ParseError::RootCount);
        }
        let field = fields.remove(0);
        Ok(Operation {
            kind,
            name,
            variables,
            root: RootField {
                alias: field.alias,
                name: field.name,
                arguments: field.arguments,
                selection: field.children.into_iter().map(ParsedField::into_node).collect(),
            },
        })
    }

    /// Parses `( $name: Type = default ... )`.
    fn variable_definitions(&mut self) -> Result<Vec<VariableDefinition>, ParseError> {
        self.expect(b'(')?;
        let mut definitions = Vec::new();
        while !self.at(b')') {
            self.expect(b'$')?;
            let name = self.name()?;
            self.expect(b':')?;
            let type_ref = self.type_ref(0)?;
            let default = if self.at(b'=') {
                self.advance()?;
                Some(self.value(0)?)
            } else {
                None
            };
            self.reject_directives()?;
            definitions.push(VariableDefinition {
                name,
                type_ref,
                default,
            });
        }
        self.advance()?;
        if definitions.is_empty() {
            return Err(self.error("empty variable definitions"));
        }
        Ok(definitions)
    }

    /// Parses a type reference into its source form.
    fn type_ref(&mut self, depth: usize) -> Result<String, ParseError> {
        if depth > MAX_SELECTION_DEPTH {
            return Err(ParseError::TooDeep);
        }
        let mut text = if self.at(b'[') {
            self.advance()?;
            let inner = self.type_ref(depth + 1)?;
            self.expect(b']')?;
            format!("[{inner}]")
        } else {
            self.name()?
        };
        if self.at(b'!') {
            self.advance()?;
            text.push('!');
        }
        Ok(text)
    }

    /// Parses `{ field ... }`.
    fn selection_set(&mut self, depth: usize) -> Result<Vec<ParsedField>, ParseError> {
        if depth >= MAX_SELECTION_DEPTH {
            return Err(ParseError::TooDeep);
        }
        self.expect(b'{')?;
        let mut fields = Vec::new();
        while !self.at(b'}') {
            if self.current == Token::Spread {
                return Err(ParseError::Unsupported("fragments"));
            }
            fields.push(self.field(depth)?);
        }
        self.advance()?;
        if fields.is_empty() {
            return Err(self.error("empty selection set"));
        }
        Ok(fields)
    }

    /// Parses one field with optional alias, arguments, and sub-selection.
    fn field(&mut self, depth: usize) -> Result<ParsedField, ParseError> {
        let first = self.name()?;
        let (alias, name) = if self.at(b':') {
            self.advance()?;
            (Some(first), self.name()?)
        } else {
            (None, first)
        };
        let arguments = if self.at(b'(') { self.arguments()? } else { Vec::new() };
        self.reject_directives()?;
        let children = if self.at(b'{') { self.selection_set(depth + 1)? } else { Vec::new() };
        Ok(ParsedField {
            alias,
            name,
            arguments,
            children,
        })
    }

    /// Parses `( name: value ... )`.
    fn arguments(&mut self) -> Result<Vec<(String, InputValue)>, ParseError> {
        self.expect(b'(')?;
        let mut arguments = Vec::new();
        while !self.at(b')') {
            let name = self.name()?;
            self.expect(b':')?;
            arguments.push((name, self.value(0)?));
        }
        self.advance()?;
        Ok(arguments)
    }

    /// Parses a value literal.
    fn value(&mut self, depth: usize) -> Result<InputValue, ParseError> {
        if depth > MAX_SELECTION_DEPTH {
            return Err(ParseError::TooDeep);
        }
        let offset = self.offset;
        Ok(match self.advance()? {
            Token::Punct(b'$') => InputValue::Variable(self.name()?),
            Token::Int(text) => {
                InputValue::Int(text.parse().map_err(|_| Lexer::error(offset, "integer out of range"))?)
            }
            Token::Float(text) => InputValue::Float(text.parse().map_err(|_| Lexer::error(offset, "invalid float"))?),
            Token::Str(text) => InputValue::String(text),
            Token::Name(name) => match name.as_str() {
                "true" => InputValue::Boolean(true),
                "false" => InputValue::Boolean(false),
                "null" => InputValue::Null,
                _ => InputValue::Enum(name),
            },
            Token::Punct(b'[') => {
                let mut items = Vec::new();
                while !self.at(b']') {
                    items.push(self.value(depth + 1)?);
                }
                self.advance()?;
                InputValue::List(items)
            }
            Token::Punct(b'{') => {
                let mut fields = Vec::new();
                while !self.at(b'}') {
                    let key = self.name()?;
                    self.expect(b':')?;
                    fields.push((key, self.value(depth + 1)?));
                }
                self.advance()?;
                InputValue::Object(fields)
            }
            _ => return Err(Lexer::error(offset, "expected value")),
        })
    }
}

/// Field as parsed, before alias stripping.
struct ParsedField {
    /// Response alias.
    alias: Option<String>,
    /// Field name.
    name: String,
    /// Arguments.
    arguments: Vec<(String, InputValue)>,
    /// Sub-selection.
    children: Vec<Self>,
}

impl ParsedField {
    /// Converts to a projection node, dropping aliases and arguments.
    fn into_node(self) -> SelectionNode {
        if self.children.is_empty() {
            SelectionNode::leaf(self.name)
        } else {
            SelectionNode::with_children(self.name, self.children.into_iter().map(Self::into_node).collect())
        }
    }
}

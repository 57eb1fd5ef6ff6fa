// Recursive-descent pattern parser.
//
// Precedence, lowest to highest: union `|`; intersection `&` and
// difference `-` (left-associative, one level); concatenation; cross
// product `:` (joining two postfix-level operands); postfix `*` `+` `?`
// `{m,n}` and weight annotation `<w>`; atoms. Unescaped whitespace between
// tokens is ignored. Binary operators require an operand on both sides;
// the empty string is spelled `()` or `''`, never implied. On malformed
// input the parser fails with the byte offset of the offending character
// and never returns a partial tree.

use weft_core::error::FstError;

use super::ast::Ast;

/// Characters that must be escaped (or quoted) to be used as symbols.
fn is_reserved(c: char) -> bool {
    matches!(
        c,
        '|' | '&' | '-' | '*' | '+' | '?' | '(' | ')' | '[' | ']' | '{' | '}' | ':' | '<'
            | '>' | '\'' | '\\'
    )
}

fn starts_atom(c: char) -> bool {
    matches!(c, '(' | '[' | '\'' | '\\') || !is_reserved(c)
}

/// Parse a pattern into its syntax tree.
pub fn parse(pattern: &str) -> Result<Ast, FstError> {
    let mut parser = Parser::new(pattern);
    let ast = parser.parse_union()?.unwrap_or(Ast::Epsilon);
    parser.skip_ws();
    match parser.peek() {
        None => Ok(ast),
        Some((offset, ch)) => Err(parse_error(format!("unexpected '{ch}'"), offset)),
    }
}

fn parse_error(message: impl Into<String>, offset: usize) -> FstError {
    FstError::Parse { message: message.into(), offset }
}

struct Parser {
    chars: Vec<(usize, char)>,
    pos: usize,
    /// Byte length of the pattern, reported as the offset of "unexpected
    /// end of pattern" errors.
    end: usize,
}

impl Parser {
    fn new(pattern: &str) -> Self {
        Parser {
            chars: pattern.char_indices().collect(),
            pos: 0,
            end: pattern.len(),
        }
    }

    fn peek(&self) -> Option<(usize, char)> {
        self.chars.get(self.pos).copied()
    }

    fn bump(&mut self) -> Option<(usize, char)> {
        let item = self.peek();
        if item.is_some() {
            self.pos += 1;
        }
        item
    }

    fn eat(&mut self, expected: char) -> bool {
        match self.peek() {
            Some((_, c)) if c == expected => {
                self.pos += 1;
                true
            }
            _ => false,
        }
    }

    fn skip_ws(&mut self) {
        while let Some((_, c)) = self.peek() {
            if c.is_whitespace() {
                self.pos += 1;
            } else {
                break;
            }
        }
    }

    fn offset(&self) -> usize {
        self.peek().map_or(self.end, |(o, _)| o)
    }

    // -- grammar ----------------------------------------------------------

    // The three layers below return `None` when no operand is present so a
    // binary operator with a missing side is reported instead of reading as
    // an implicit epsilon.

    fn parse_union(&mut self) -> Result<Option<Ast>, FstError> {
        let Some(mut node) = self.parse_isect()? else {
            return Ok(None);
        };
        loop {
            self.skip_ws();
            if self.eat('|') {
                let Some(rhs) = self.parse_isect()? else {
                    return Err(parse_error("expected an operand after '|'", self.offset()));
                };
                node = Ast::Union(Box::new(node), Box::new(rhs));
            } else {
                return Ok(Some(node));
            }
        }
    }

    fn parse_isect(&mut self) -> Result<Option<Ast>, FstError> {
        let Some(mut node) = self.parse_concat()? else {
            return Ok(None);
        };
        loop {
            self.skip_ws();
            match self.peek() {
                Some((_, op @ ('&' | '-'))) => {
                    self.pos += 1;
                    let Some(rhs) = self.parse_concat()? else {
                        return Err(parse_error(
                            format!("expected an operand after '{op}'"),
                            self.offset(),
                        ));
                    };
                    node = if op == '&' {
                        Ast::Intersect(Box::new(node), Box::new(rhs))
                    } else {
                        Ast::Difference(Box::new(node), Box::new(rhs))
                    };
                }
                _ => return Ok(Some(node)),
            }
        }
    }

    fn parse_concat(&mut self) -> Result<Option<Ast>, FstError> {
        let mut parts: Vec<Ast> = Vec::new();
        loop {
            self.skip_ws();
            match self.peek() {
                Some((_, c)) if starts_atom(c) => parts.push(self.parse_pair()?),
                _ => break,
            }
        }
        let mut iter = parts.into_iter();
        let Some(first) = iter.next() else {
            return Ok(None);
        };
        Ok(Some(
            iter.fold(first, |acc, part| Ast::Concat(Box::new(acc), Box::new(part))),
        ))
    }

    fn parse_pair(&mut self) -> Result<Ast, FstError> {
        let lhs = self.parse_postfix()?;
        if self.eat(':') {
            let rhs = self.parse_postfix()?;
            return Ok(Ast::Cross(Box::new(lhs), Box::new(rhs)));
        }
        Ok(lhs)
    }

    fn parse_postfix(&mut self) -> Result<Ast, FstError> {
        let mut node = self.parse_atom()?;
        loop {
            self.skip_ws();
            match self.peek() {
                Some((_, '*')) => {
                    self.pos += 1;
                    node = Ast::Star(Box::new(node));
                }
                Some((_, '+')) => {
                    self.pos += 1;
                    node = Ast::Plus(Box::new(node));
                }
                Some((_, '?')) => {
                    self.pos += 1;
                    node = Ast::Optional(Box::new(node));
                }
                Some((offset, '{')) => {
                    self.pos += 1;
                    let (min, max) = self.parse_bounds(offset)?;
                    node = Ast::Repeat { node: Box::new(node), min, max };
                }
                Some((_, '<')) => {
                    self.pos += 1;
                    let value = self.parse_weight()?;
                    node = Ast::Weight(Box::new(node), value);
                }
                _ => return Ok(node),
            }
        }
    }

    /// Bounds after a consumed `{`: `{m}`, `{m,}` or `{m,n}`.
    fn parse_bounds(&mut self, open_offset: usize) -> Result<(u32, Option<u32>), FstError> {
        let min = self.parse_number()?;
        let max = if self.eat(',') {
            match self.peek() {
                Some((_, c)) if c.is_ascii_digit() => Some(self.parse_number()?),
                _ => None,
            }
        } else {
            Some(min)
        };
        if !self.eat('}') {
            return Err(parse_error("expected '}' to close repetition bound", self.offset()));
        }
        if let Some(max_value) = max {
            if min > max_value {
                return Err(parse_error(
                    format!("repetition bound {{{min},{max_value}}} requires min <= max"),
                    open_offset,
                ));
            }
        }
        Ok((min, max))
    }

    fn parse_number(&mut self) -> Result<u32, FstError> {
        let start = self.offset();
        let mut digits = String::new();
        while let Some((_, c)) = self.peek() {
            if c.is_ascii_digit() {
                digits.push(c);
                self.pos += 1;
            } else {
                break;
            }
        }
        if digits.is_empty() {
            return Err(parse_error("expected a repetition bound", start));
        }
        digits
            .parse::<u32>()
            .map_err(|_| parse_error("repetition bound too large", start))
    }

    /// Weight literal after a consumed `<`, up to the closing `>`.
    fn parse_weight(&mut self) -> Result<f64, FstError> {
        let start = self.offset();
        let mut text = String::new();
        loop {
            match self.bump() {
                None => return Err(parse_error("unterminated weight annotation", start)),
                Some((_, '>')) => break,
                Some((_, c)) => text.push(c),
            }
        }
        text.trim()
            .parse::<f64>()
            .map_err(|_| parse_error(format!("invalid weight literal '{}'", text.trim()), start))
    }

    fn parse_atom(&mut self) -> Result<Ast, FstError> {
        self.skip_ws();
        match self.peek() {
            None => Err(parse_error("unexpected end of pattern", self.end)),
            Some((_, '(')) => {
                self.pos += 1;
                self.skip_ws();
                if self.eat(')') {
                    return Ok(Ast::Epsilon);
                }
                let Some(inner) = self.parse_union()? else {
                    return Err(parse_error("expected an operand", self.offset()));
                };
                self.skip_ws();
                if !self.eat(')') {
                    return Err(parse_error("unbalanced parenthesis", self.offset()));
                }
                Ok(inner)
            }
            Some((offset, '[')) => {
                self.pos += 1;
                self.parse_class(offset)
            }
            Some((offset, '\'')) => {
                self.pos += 1;
                self.parse_quoted(offset)
            }
            Some((offset, '\\')) => {
                self.pos += 1;
                match self.bump() {
                    Some((_, c)) => Ok(Ast::Symbol(c.to_string())),
                    None => Err(parse_error("dangling escape", offset)),
                }
            }
            Some((offset, c)) if is_reserved(c) => {
                Err(parse_error(format!("unescaped reserved character '{c}'"), offset))
            }
            Some((_, c)) => {
                self.pos += 1;
                Ok(Ast::Symbol(c.to_string()))
            }
        }
    }

    /// Quoted multi-character symbol after a consumed `'`. Inside quotes a
    /// backslash escapes the next character; `''` is epsilon.
    fn parse_quoted(&mut self, open_offset: usize) -> Result<Ast, FstError> {
        let mut symbol = String::new();
        loop {
            match self.bump() {
                None => return Err(parse_error("unterminated quoted symbol", open_offset)),
                Some((_, '\'')) => {
                    return if symbol.is_empty() {
                        Ok(Ast::Epsilon)
                    } else {
                        Ok(Ast::Symbol(symbol))
                    };
                }
                Some((offset, '\\')) => match self.bump() {
                    Some((_, c)) => symbol.push(c),
                    None => return Err(parse_error("dangling escape", offset)),
                },
                Some((_, c)) => symbol.push(c),
            }
        }
    }

    /// Symbol class after a consumed `[`: single characters and ranges.
    fn parse_class(&mut self, open_offset: usize) -> Result<Ast, FstError> {
        if let Some((offset, '^')) = self.peek() {
            return Err(parse_error("negated classes are not supported", offset));
        }
        let mut members: Vec<String> = Vec::new();
        let mut last_char: Option<char> = None;
        loop {
            match self.bump() {
                None => return Err(parse_error("unterminated symbol class", open_offset)),
                Some((_, ']')) => {
                    if members.is_empty() {
                        return Err(parse_error("empty symbol class", open_offset));
                    }
                    return Ok(Ast::Class(members));
                }
                Some((offset, '-')) => {
                    let lo = match last_char {
                        Some(c) if !matches!(self.peek(), Some((_, ']')) | None) => c,
                        _ => {
                            // literal hyphen at the edge of the class
                            members.push("-".to_string());
                            last_char = Some('-');
                            continue;
                        }
                    };
                    let hi = match self.bump() {
                        Some((_, '\\')) => match self.bump() {
                            Some((_, c)) => c,
                            None => return Err(parse_error("dangling escape", offset)),
                        },
                        Some((_, c)) => c,
                        None => {
                            return Err(parse_error("unterminated symbol class", open_offset));
                        }
                    };
                    if (lo as u32) > (hi as u32) {
                        return Err(parse_error(
                            format!("invalid range {lo}-{hi}"),
                            offset,
                        ));
                    }
                    for code in (lo as u32 + 1)..=(hi as u32) {
                        if let Some(c) = char::from_u32(code) {
                            members.push(c.to_string());
                        }
                    }
                    last_char = None;
                }
                Some((offset, '\\')) => match self.bump() {
                    Some((_, c)) => {
                        members.push(c.to_string());
                        last_char = Some(c);
                    }
                    None => return Err(parse_error("dangling escape", offset)),
                },
                Some((_, c)) => {
                    members.push(c.to_string());
                    last_char = Some(c);
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sym(s: &str) -> Ast {
        Ast::Symbol(s.to_string())
    }

    #[test]
    fn single_symbol() {
        assert_eq!(parse("a").unwrap(), sym("a"));
    }

    #[test]
    fn empty_pattern_is_epsilon() {
        assert_eq!(parse("").unwrap(), Ast::Epsilon);
        assert_eq!(parse("()").unwrap(), Ast::Epsilon);
        assert_eq!(parse("''").unwrap(), Ast::Epsilon);
    }

    #[test]
    fn union_binds_loosest() {
        // ab|c == (ab)|c
        let ast = parse("ab|c").unwrap();
        assert_eq!(
            ast,
            Ast::Union(
                Box::new(Ast::Concat(Box::new(sym("a")), Box::new(sym("b")))),
                Box::new(sym("c")),
            )
        );
    }

    #[test]
    fn intersection_between_union_and_concat() {
        // a|b&c == a|(b&c)
        let ast = parse("a|b&c").unwrap();
        assert_eq!(
            ast,
            Ast::Union(
                Box::new(sym("a")),
                Box::new(Ast::Intersect(Box::new(sym("b")), Box::new(sym("c")))),
            )
        );
    }

    #[test]
    fn postfix_binds_tightest() {
        // ab* == a(b*)
        let ast = parse("ab*").unwrap();
        assert_eq!(
            ast,
            Ast::Concat(Box::new(sym("a")), Box::new(Ast::Star(Box::new(sym("b")))))
        );
    }

    #[test]
    fn cross_product_joins_postfix_operands() {
        // ab:cd == a (b:c) d
        let ast = parse("ab:cd").unwrap();
        assert_eq!(
            ast,
            Ast::Concat(
                Box::new(Ast::Concat(
                    Box::new(sym("a")),
                    Box::new(Ast::Cross(Box::new(sym("b")), Box::new(sym("c")))),
                )),
                Box::new(sym("d")),
            )
        );
    }

    #[test]
    fn cross_product_with_star() {
        // a:b* == a:(b*)
        let ast = parse("a:b*").unwrap();
        assert_eq!(
            ast,
            Ast::Cross(Box::new(sym("a")), Box::new(Ast::Star(Box::new(sym("b")))))
        );
    }

    #[test]
    fn quoted_multichar_symbol() {
        assert_eq!(parse("'[Pl]'").unwrap(), sym("[Pl]"));
        assert_eq!(parse(r"'don\'t'").unwrap(), sym("don't"));
    }

    #[test]
    fn escaped_reserved_character() {
        assert_eq!(parse(r"\*").unwrap(), sym("*"));
        assert_eq!(parse(r"\-").unwrap(), sym("-"));
    }

    #[test]
    fn class_with_range() {
        let ast = parse("[a-c0]").unwrap();
        assert_eq!(
            ast,
            Ast::Class(vec![
                "a".to_string(),
                "b".to_string(),
                "c".to_string(),
                "0".to_string()
            ])
        );
    }

    #[test]
    fn class_with_edge_hyphen() {
        assert_eq!(parse("[-a]").unwrap(), Ast::Class(vec!["-".to_string(), "a".to_string()]));
        assert_eq!(parse("[a-]").unwrap(), Ast::Class(vec!["a".to_string(), "-".to_string()]));
    }

    #[test]
    fn bounded_repetition() {
        assert_eq!(
            parse("a{2,3}").unwrap(),
            Ast::Repeat { node: Box::new(sym("a")), min: 2, max: Some(3) }
        );
        assert_eq!(
            parse("a{2}").unwrap(),
            Ast::Repeat { node: Box::new(sym("a")), min: 2, max: Some(2) }
        );
        assert_eq!(
            parse("a{2,}").unwrap(),
            Ast::Repeat { node: Box::new(sym("a")), min: 2, max: None }
        );
    }

    #[test]
    fn weight_annotation() {
        assert_eq!(parse("a<2.5>").unwrap(), Ast::Weight(Box::new(sym("a")), 2.5));
        assert_eq!(parse("a<-1>").unwrap(), Ast::Weight(Box::new(sym("a")), -1.0));
    }

    #[test]
    fn whitespace_is_ignored() {
        assert_eq!(parse("a b").unwrap(), parse("ab").unwrap());
        assert_eq!(parse(" a | b ").unwrap(), parse("a|b").unwrap());
    }

    #[test]
    fn error_offsets() {
        let err = parse("ab)").unwrap_err();
        assert_eq!(err, FstError::Parse { message: "unexpected ')'".to_string(), offset: 2 });

        let err = parse("a*(b").unwrap_err();
        assert!(matches!(err, FstError::Parse { offset: 4, .. }));

        let err = parse("a{3,2}").unwrap_err();
        assert!(matches!(err, FstError::Parse { offset: 1, .. }));

        let err = parse("[z-a]").unwrap_err();
        assert!(matches!(err, FstError::Parse { offset: 2, .. }));

        let err = parse("a<x>").unwrap_err();
        assert!(matches!(err, FstError::Parse { offset: 2, .. }));
    }

    #[test]
    fn dangling_binary_operators_are_rejected() {
        let err = parse("a|").unwrap_err();
        assert_eq!(
            err,
            FstError::Parse {
                message: "expected an operand after '|'".to_string(),
                offset: 2,
            }
        );
        assert!(matches!(parse("|a").unwrap_err(), FstError::Parse { offset: 0, .. }));
        assert!(matches!(parse("a&").unwrap_err(), FstError::Parse { offset: 2, .. }));
        assert!(matches!(parse("a-").unwrap_err(), FstError::Parse { offset: 2, .. }));
        assert!(matches!(parse("a||b").unwrap_err(), FstError::Parse { offset: 2, .. }));
        assert!(matches!(parse("(a|)").unwrap_err(), FstError::Parse { offset: 3, .. }));
    }

    #[test]
    fn reserved_characters_must_be_escaped() {
        assert!(matches!(parse("*a").unwrap_err(), FstError::Parse { offset: 0, .. }));
        assert!(matches!(parse("{2}").unwrap_err(), FstError::Parse { offset: 0, .. }));
    }

    #[test]
    fn unterminated_constructs() {
        assert!(matches!(parse("'abc").unwrap_err(), FstError::Parse { offset: 0, .. }));
        assert!(matches!(parse("[abc").unwrap_err(), FstError::Parse { offset: 0, .. }));
        assert!(matches!(parse("a<2.5").unwrap_err(), FstError::Parse { .. }));
    }
}

use crate::fuzzy::variable::TermId;

/// Boolean combination of term references. AND is min, OR is max, NOT is `1 - μ`.
#[derive(Debug, Clone, PartialEq)]
pub enum Expr<L> {
    Leaf(L),
    And(Box<Expr<L>>, Box<Expr<L>>),
    Or(Box<Expr<L>>, Box<Expr<L>>),
    Not(Box<Expr<L>>),
}

impl<L> Expr<L> {
    /// Rebuild the expression with every leaf converted by `f`, stopping at the
    /// first failure.
    pub fn try_map<M, E>(self, f: &mut impl FnMut(L) -> Result<M, E>) -> Result<Expr<M>, E> {
        Ok(match self {
            Expr::Leaf(leaf) => Expr::Leaf(f(leaf)?),
            Expr::And(l, r) => Expr::And(Box::new(l.try_map(f)?), Box::new(r.try_map(f)?)),
            Expr::Or(l, r) => Expr::Or(Box::new(l.try_map(f)?), Box::new(r.try_map(f)?)),
            Expr::Not(inner) => Expr::Not(Box::new(inner.try_map(f)?)),
        })
    }

    pub fn map<M>(&self, f: &impl Fn(&L) -> M) -> Expr<M> {
        match self {
            Expr::Leaf(leaf) => Expr::Leaf(f(leaf)),
            Expr::And(l, r) => Expr::And(Box::new(l.map(f)), Box::new(r.map(f))),
            Expr::Or(l, r) => Expr::Or(Box::new(l.map(f)), Box::new(r.map(f))),
            Expr::Not(inner) => Expr::Not(Box::new(inner.map(f))),
        }
    }

    pub fn leaves(&self) -> Vec<&L> {
        let mut out = Vec::new();
        self.collect_leaves(&mut out);
        out
    }

    fn collect_leaves<'a>(&'a self, out: &mut Vec<&'a L>) {
        match self {
            Expr::Leaf(leaf) => out.push(leaf),
            Expr::And(l, r) | Expr::Or(l, r) => {
                l.collect_leaves(out);
                r.collect_leaves(out);
            }
            Expr::Not(inner) => inner.collect_leaves(out),
        }
    }

    /// Degree of truth given each leaf's membership degree.
    pub fn evaluate(&self, degree: &impl Fn(&L) -> f64) -> f64 {
        match self {
            Expr::Leaf(leaf) => degree(leaf),
            Expr::And(l, r) => l.evaluate(degree).min(r.evaluate(degree)),
            Expr::Or(l, r) => l.evaluate(degree).max(r.evaluate(degree)),
            Expr::Not(inner) => 1.0 - inner.evaluate(degree),
        }
    }
}

impl<L: std::fmt::Display> std::fmt::Display for Expr<L> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Expr::Leaf(leaf) => write!(f, "{}", leaf),
            Expr::And(l, r) => write!(f, "({} & {})", l, r),
            Expr::Or(l, r) => write!(f, "({} | {})", l, r),
            Expr::Not(inner) => write!(f, "~{}", inner),
        }
    }
}

/// `variable[term]` as written in a rule.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TermName {
    pub variable: String,
    pub term: String,
}

impl std::fmt::Display for TermName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}[{}]", self.variable, self.term)
    }
}

/// A term reference resolved against a system's variable list.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TermRef {
    pub variable: usize,
    pub term: TermId,
}

/// A resolved rule: antecedent expression and consequent term.
#[derive(Debug, Clone)]
pub struct Rule {
    pub name: Option<String>,
    pub antecedent: Expr<TermRef>,
    pub consequent: TermRef,
}

impl Rule {
    /// Firing strength, clamped to `[0, 1]`.
    pub fn firing_strength(&self, degree: &impl Fn(&TermRef) -> f64) -> f64 {
        let strength = self.antecedent.evaluate(degree);
        if strength.is_nan() {
            0.0
        } else {
            strength.clamp(0.0, 1.0)
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseError {
    /// 1-based character column.
    pub column: usize,
    pub message: String,
}

impl std::fmt::Display for ParseError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "column {}: {}", self.column, self.message)
    }
}

impl std::error::Error for ParseError {}

#[derive(Debug, Clone, PartialEq)]
enum Token {
    Ident(String),
    And,
    Or,
    Not,
    LParen,
    RParen,
    LBracket,
    RBracket,
}

impl std::fmt::Display for Token {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Token::Ident(s) => write!(f, "'{}'", s),
            Token::And => write!(f, "'&'"),
            Token::Or => write!(f, "'|'"),
            Token::Not => write!(f, "'~'"),
            Token::LParen => write!(f, "'('"),
            Token::RParen => write!(f, "')'"),
            Token::LBracket => write!(f, "'['"),
            Token::RBracket => write!(f, "']'"),
        }
    }
}

fn tokenize(text: &str) -> Result<Vec<(Token, usize)>, ParseError> {
    let chars: Vec<char> = text.chars().collect();
    let mut tokens = Vec::new();
    let mut i = 0;
    while i < chars.len() {
        let c = chars[i];
        let column = i + 1;
        let single = match c {
            '&' => Some(Token::And),
            '|' => Some(Token::Or),
            '~' => Some(Token::Not),
            '(' => Some(Token::LParen),
            ')' => Some(Token::RParen),
            '[' => Some(Token::LBracket),
            ']' => Some(Token::RBracket),
            _ => None,
        };
        if let Some(token) = single {
            tokens.push((token, column));
            i += 1;
        } else if c.is_whitespace() {
            i += 1;
        } else if c.is_ascii_alphabetic() || c == '_' {
            let start = i;
            while i < chars.len() && (chars[i].is_ascii_alphanumeric() || chars[i] == '_') {
                i += 1;
            }
            tokens.push((Token::Ident(chars[start..i].iter().collect()), column));
        } else {
            return Err(ParseError {
                column,
                message: format!("unexpected character '{}'", c),
            });
        }
    }
    Ok(tokens)
}

/// Deepest allowed nesting of `~` and parentheses in one antecedent.
pub const MAX_NESTING: usize = 64;

/// Most `variable[term]` leaves allowed in one antecedent.
pub const MAX_TERMS: usize = 256;

struct Parser {
    tokens: Vec<(Token, usize)>,
    pos: usize,
    end_column: usize,
    depth: usize,
    terms: usize,
}

impl Parser {
    fn new(text: &str) -> Result<Self, ParseError> {
        Ok(Parser {
            tokens: tokenize(text)?,
            pos: 0,
            end_column: text.chars().count() + 1,
            depth: 0,
            terms: 0,
        })
    }

    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.pos).map(|(t, _)| t)
    }

    fn column(&self) -> usize {
        self.tokens
            .get(self.pos)
            .map(|&(_, c)| c)
            .unwrap_or(self.end_column)
    }

    fn error(&self, expected: &str) -> ParseError {
        let found = match self.peek() {
            Some(token) => token.to_string(),
            None => "end of input".to_string(),
        };
        ParseError {
            column: self.column(),
            message: format!("expected {}, found {}", expected, found),
        }
    }

    fn eat(&mut self, token: &Token) -> bool {
        if self.peek() == Some(token) {
            self.pos += 1;
            true
        } else {
            false
        }
    }

    fn expect(&mut self, token: Token) -> Result<(), ParseError> {
        if self.eat(&token) {
            Ok(())
        } else {
            Err(self.error(&token.to_string()))
        }
    }

    fn ident(&mut self, what: &str) -> Result<String, ParseError> {
        match self.peek() {
            Some(Token::Ident(name)) => {
                let name = name.clone();
                self.pos += 1;
                Ok(name)
            }
            _ => Err(self.error(what)),
        }
    }

    fn finish(&self) -> Result<(), ParseError> {
        if self.pos < self.tokens.len() {
            Err(self.error("end of input"))
        } else {
            Ok(())
        }
    }

    fn or_expr(&mut self) -> Result<Expr<TermName>, ParseError> {
        let mut lhs = self.and_expr()?;
        while self.eat(&Token::Or) {
            let rhs = self.and_expr()?;
            lhs = Expr::Or(Box::new(lhs), Box::new(rhs));
        }
        Ok(lhs)
    }

    fn and_expr(&mut self) -> Result<Expr<TermName>, ParseError> {
        let mut lhs = self.unary()?;
        while self.eat(&Token::And) {
            let rhs = self.unary()?;
            lhs = Expr::And(Box::new(lhs), Box::new(rhs));
        }
        Ok(lhs)
    }

    fn unary(&mut self) -> Result<Expr<TermName>, ParseError> {
        if matches!(self.peek(), Some(Token::Not | Token::LParen)) {
            if self.depth >= MAX_NESTING {
                return Err(ParseError {
                    column: self.column(),
                    message: format!("expression nested deeper than {} levels", MAX_NESTING),
                });
            }
            self.depth += 1;
            let inner = if self.eat(&Token::Not) {
                self.unary().map(|e| Expr::Not(Box::new(e)))
            } else {
                self.pos += 1;
                self.or_expr()
                    .and_then(|e| self.expect(Token::RParen).map(|_| e))
            };
            self.depth -= 1;
            return inner;
        }
        if self.terms >= MAX_TERMS {
            return Err(ParseError {
                column: self.column(),
                message: format!("expression has more than {} terms", MAX_TERMS),
            });
        }
        self.terms += 1;
        Ok(Expr::Leaf(self.term_name()?))
    }

    fn term_name(&mut self) -> Result<TermName, ParseError> {
        let variable = self.ident("variable name")?;
        self.expect(Token::LBracket)?;
        let term = self.ident("term name")?;
        self.expect(Token::RBracket)?;
        Ok(TermName { variable, term })
    }
}

/// Parse an antecedent such as `air[bad] & (density[high] | ~veg[high])`.
///
/// `&` binds tighter than `|`; `~` binds tightest.
pub fn parse_expression(text: &str) -> Result<Expr<TermName>, ParseError> {
    let mut parser = Parser::new(text)?;
    let expr = parser.or_expr()?;
    parser.finish()?;
    Ok(expr)
}

/// Parse a single `variable[term]` consequent.
pub fn parse_term_name(text: &str) -> Result<TermName, ParseError> {
    let mut parser = Parser::new(text)?;
    let name = parser.term_name()?;
    parser.finish()?;
    Ok(name)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn leaf(v: &str, t: &str) -> Expr<TermName> {
        Expr::Leaf(TermName {
            variable: v.to_string(),
            term: t.to_string(),
        })
    }

    #[test]
    fn single_term() {
        assert_eq!(parse_expression("air[good]").unwrap(), leaf("air", "good"));
    }

    #[test]
    fn and_binds_tighter_than_or() {
        let parsed = parse_expression("a[x] | b[y] & c[z]").unwrap();
        let expected = Expr::Or(
            Box::new(leaf("a", "x")),
            Box::new(Expr::And(Box::new(leaf("b", "y")), Box::new(leaf("c", "z")))),
        );
        assert_eq!(parsed, expected);
    }

    #[test]
    fn parentheses_override_precedence() {
        let parsed = parse_expression("air_pollution[unhealthy] & (density[very_high] | density[high])").unwrap();
        let expected = Expr::And(
            Box::new(leaf("air_pollution", "unhealthy")),
            Box::new(Expr::Or(
                Box::new(leaf("density", "very_high")),
                Box::new(leaf("density", "high")),
            )),
        );
        assert_eq!(parsed, expected);
    }

    #[test]
    fn not_applies_to_following_unary() {
        let parsed = parse_expression("~a[x] & b[y]").unwrap();
        let expected = Expr::And(
            Box::new(Expr::Not(Box::new(leaf("a", "x")))),
            Box::new(leaf("b", "y")),
        );
        assert_eq!(parsed, expected);
    }

    #[test]
    fn display_is_fully_parenthesized() {
        let parsed = parse_expression("a[x]|b[y]&~c[z]").unwrap();
        assert_eq!(parsed.to_string(), "(a[x] | (b[y] & ~c[z]))");
    }

    #[test]
    fn leaves_in_source_order() {
        let parsed = parse_expression("a[x] & (b[y] | c[z])").unwrap();
        let names: Vec<String> = parsed.leaves().iter().map(|l| l.to_string()).collect();
        assert_eq!(names, vec!["a[x]", "b[y]", "c[z]"]);
    }

    #[test]
    fn missing_bracket_reports_column() {
        let err = parse_expression("air[good").unwrap_err();
        assert_eq!(err.column, 9);
        assert!(err.message.contains("']'"), "Error: {}", err);
    }

    #[test]
    fn trailing_operator_rejected() {
        let err = parse_expression("air[good] &").unwrap_err();
        assert!(err.message.contains("end of input"), "Error: {}", err);
    }

    #[test]
    fn unbalanced_paren_rejected() {
        let err = parse_expression("(a[x] | b[y]").unwrap_err();
        assert!(err.message.contains("')'"), "Error: {}", err);
    }

    #[test]
    fn bad_character_rejected() {
        let err = parse_expression("a[x] + b[y]").unwrap_err();
        assert_eq!(err.column, 6);
        assert!(err.to_string().starts_with("column 6:"));
    }

    #[test]
    fn deep_negation_rejected_with_column() {
        let text = format!("{}a[x]", "~".repeat(100_000));
        let err = parse_expression(&text).unwrap_err();
        assert_eq!(err.column, MAX_NESTING + 1);
        assert!(err.message.contains("nested deeper"), "Error: {}", err);
    }

    #[test]
    fn deep_parentheses_rejected_with_column() {
        let text = "(".repeat(100_000);
        let err = parse_expression(&text).unwrap_err();
        assert_eq!(err.column, MAX_NESTING + 1);
        assert!(err.message.contains("nested deeper"), "Error: {}", err);
    }

    #[test]
    fn nesting_at_limit_accepted() {
        let text = format!("{}a[x]{}", "(".repeat(MAX_NESTING), ")".repeat(MAX_NESTING));
        assert_eq!(parse_expression(&text).unwrap(), leaf("a", "x"));
        let text = format!("{}a[x]", "~".repeat(MAX_NESTING));
        assert!(parse_expression(&text).is_ok());
    }

    #[test]
    fn long_conjunction_rejected() {
        let text = vec!["a[x]"; MAX_TERMS + 1].join(" & ");
        let err = parse_expression(&text).unwrap_err();
        // "a[x] & " is 7 columns wide
        assert_eq!(err.column, MAX_TERMS * 7 + 1);
        assert!(err.message.contains("more than"), "Error: {}", err);
        let text = vec!["a[x]"; MAX_TERMS].join(" | ");
        assert!(parse_expression(&text).is_ok());
    }

    #[test]
    fn bare_identifier_rejected() {
        assert!(parse_expression("good").is_err());
    }

    #[test]
    fn consequent_must_be_single_term() {
        assert_eq!(
            parse_term_name(" need_for_action[high] ").unwrap(),
            TermName {
                variable: "need_for_action".to_string(),
                term: "high".to_string()
            }
        );
        let err = parse_term_name("out[high] | out[low]").unwrap_err();
        assert!(err.message.contains("end of input"));
    }

    #[test]
    fn evaluation_uses_min_max_complement() {
        let expr = parse_expression("a[x] & (b[y] | ~c[z])").unwrap();
        let degree = |leaf: &TermName| match leaf.variable.as_str() {
            "a" => 0.7,
            "b" => 0.2,
            "c" => 0.6,
            _ => 0.0,
        };
        // min(0.7, max(0.2, 0.4)) = 0.4
        assert!((expr.evaluate(&degree) - 0.4).abs() < 1e-12);
    }

    #[test]
    fn firing_strength_clamped() {
        let rule = Rule {
            name: None,
            antecedent: Expr::Leaf(TermRef { variable: 0, term: TermId(0) }),
            consequent: TermRef { variable: 1, term: TermId(0) },
        };
        assert_eq!(rule.firing_strength(&|_: &TermRef| 1.5), 1.0);
        assert_eq!(rule.firing_strength(&|_: &TermRef| -0.5), 0.0);
        assert_eq!(rule.firing_strength(&|_: &TermRef| f64::NAN), 0.0);
    }
}

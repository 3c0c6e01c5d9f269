//! Search query parsing

/// Comparison of a field term
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Op {
    Match,
    Lt,
    Le,
    Gt,
    Ge,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Clause {
    /// Free text word or phrase
    Text { term: String, negate: bool },
    /// `field:value`, `field:"some value"` or `field:<N`
    Field {
        field: String,
        op: Op,
        value: String,
        negate: bool,
    },
}

impl Clause {
    pub fn is_negated(&self) -> bool {
        match self {
            Clause::Text { negate, .. } | Clause::Field { negate, .. } => *negate,
        }
    }
}

/// Split on whitespace, keeping double-quoted runs together
fn tokenize(query: &str) -> Vec<String> {
    let mut tokens = Vec::new();
    let mut current = String::new();
    let mut quoted = false;

    for c in query.chars() {
        match c {
            '"' => {
                quoted = !quoted;
                current.push(c);
            }
            c if c.is_whitespace() && !quoted => {
                if !current.is_empty() {
                    tokens.push(std::mem::take(&mut current));
                }
            }
            c => current.push(c),
        }
    }
    if !current.is_empty() {
        tokens.push(current);
    }
    tokens
}

fn unquote(value: &str) -> String {
    value.trim_matches('"').to_string()
}

fn parse_value(raw: &str) -> (Op, String) {
    for (prefix, op) in [(">=", Op::Ge), ("<=", Op::Le), (">", Op::Gt), ("<", Op::Lt)] {
        if let Some(rest) = raw.strip_prefix(prefix) {
            return (op, unquote(rest));
        }
    }
    (Op::Match, unquote(raw))
}

/// Parse a query string into clauses. Unprefixed field terms are required.
pub fn parse_query(query: &str) -> Vec<Clause> {
    let mut clauses = Vec::new();

    for token in tokenize(query) {
        let (negate, body) = if let Some(rest) = token.strip_prefix('-') {
            (true, rest)
        } else if let Some(rest) = token.strip_prefix('+') {
            (false, rest)
        } else {
            (false, token.as_str())
        };
        if body.is_empty() {
            continue;
        }

        let field_split = if body.starts_with('"') {
            None
        } else {
            body.split_once(':')
        };

        match field_split {
            Some((field, raw)) if !field.is_empty() && !raw.is_empty() => {
                let (op, value) = parse_value(raw);
                if value.is_empty() {
                    continue;
                }
                clauses.push(Clause::Field {
                    field: field.to_lowercase(),
                    op,
                    value,
                    negate,
                });
            }
            _ => {
                let term = unquote(body);
                if !term.is_empty() {
                    clauses.push(Clause::Text { term, negate });
                }
            }
        }
    }

    clauses
}

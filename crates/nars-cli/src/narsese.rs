//! Narsese reader – turns one line of REPL input into a [`Task`].
//!
//! Accepted forms:
//!
//! ```text
//! [$p;d;q$] term punctuation [%f;c%]
//!
//! term        := atom | <term copula term> | (connector, term, term, ...)
//! copula      := --> | <-> | ==> | <=>
//! punctuation := .  (judgment)  |  ?  (question)  |  !  (goal)
//! ```
//!
//! The budget prefix may give one, two or three components; missing ones
//! take the default budget's values.  The truth suffix may omit the
//! confidence.  Questions never carry a truth value.

use nars_types::{Budget, COPULAS, NarsError, Punctuation, Sentence, Task, Term, Truth};

/// Parse a single Narsese task.
///
/// # Errors
///
/// Returns [`NarsError::Parse`] describing the first offending column.
pub fn parse(line: &str) -> Result<Task, NarsError> {
    Reader::new(line).task()
}

struct Reader {
    chars: Vec<char>,
    pos: usize,
}

impl Reader {
    fn new(input: &str) -> Self {
        Self {
            chars: input.trim().chars().collect(),
            pos: 0,
        }
    }

    fn task(mut self) -> Result<Task, NarsError> {
        if self.chars.is_empty() {
            return Err(NarsError::Parse("empty input".to_string()));
        }
        let budget = if self.peek() == Some('$') {
            self.budget()?
        } else {
            Budget::default()
        };
        self.skip_ws();
        let content = self.term()?;
        self.skip_ws();
        let punctuation = match self.advance() {
            Some(c) => Punctuation::from_symbol(c)
                .ok_or_else(|| self.error(&format!("expected '.', '?' or '!', found '{c}'")))?,
            None => return Err(self.error("missing punctuation")),
        };
        self.skip_ws();
        let truth = if self.peek() == Some('%') {
            Some(self.truth()?)
        } else {
            None
        };
        self.skip_ws();
        if !self.at_end() {
            return Err(self.error("unexpected trailing input"));
        }

        let sentence = match punctuation {
            Punctuation::Judgment => Sentence::judgment(content, truth.unwrap_or_default()),
            Punctuation::Goal => Sentence::goal(content, truth.unwrap_or_default()),
            Punctuation::Question if truth.is_some() => {
                return Err(self.error("questions carry no truth value"));
            }
            Punctuation::Question => Sentence::question(content),
        };
        Ok(Task::new(sentence, budget))
    }

    // -------------------------------------------------------------------------
    // Terms
    // -------------------------------------------------------------------------

    fn term(&mut self) -> Result<Term, NarsError> {
        match self.peek() {
            Some('<') => self.statement(),
            Some('(') => self.compound(),
            Some(c) if is_atom_char(c) => Ok(Term::atom(self.word())),
            Some(c) => Err(self.error(&format!("unexpected '{c}'"))),
            None => Err(self.error("expected a term")),
        }
    }

    fn statement(&mut self) -> Result<Term, NarsError> {
        self.expect('<')?;
        self.skip_ws();
        let subject = self.term()?;
        self.skip_ws();
        let copula = self.copula()?;
        self.skip_ws();
        let predicate = self.term()?;
        self.skip_ws();
        self.expect('>')?;
        Ok(Term::statement(subject, copula, predicate))
    }

    fn copula(&mut self) -> Result<&'static str, NarsError> {
        for copula in COPULAS {
            let len = copula.len();
            if self.pos + len <= self.chars.len()
                && self.chars[self.pos..self.pos + len].iter().copied().eq(copula.chars())
            {
                self.pos += len;
                return Ok(copula);
            }
        }
        Err(self.error("expected a copula (-->, <->, ==> or <=>)"))
    }

    fn compound(&mut self) -> Result<Term, NarsError> {
        self.expect('(')?;
        self.skip_ws();
        let mut connector = String::new();
        while let Some(c) = self.peek() {
            if c == ',' || c == ')' || c.is_whitespace() {
                break;
            }
            connector.push(c);
            self.pos += 1;
        }
        if connector.is_empty() {
            return Err(self.error("expected a connector"));
        }

        let mut components = Vec::new();
        loop {
            self.skip_ws();
            match self.advance() {
                Some(',') => {
                    self.skip_ws();
                    components.push(self.term()?);
                }
                Some(')') => break,
                _ => return Err(self.error("expected ',' or ')'")),
            }
        }
        if components.is_empty() {
            return Err(self.error("compound needs at least one component"));
        }
        Ok(Term::compound(connector, components))
    }

    fn word(&mut self) -> String {
        let mut word = String::new();
        while let Some(c) = self.peek().filter(|c| is_atom_char(*c)) {
            word.push(c);
            self.pos += 1;
        }
        word
    }

    // -------------------------------------------------------------------------
    // Budget and truth
    // -------------------------------------------------------------------------

    fn budget(&mut self) -> Result<Budget, NarsError> {
        let values = self.delimited('$', 3)?;
        let d = Budget::default();
        Ok(Budget::new(
            values[0],
            values.get(1).copied().unwrap_or(d.durability),
            values.get(2).copied().unwrap_or(d.quality),
        ))
    }

    fn truth(&mut self) -> Result<Truth, NarsError> {
        let values = self.delimited('%', 2)?;
        let d = Truth::default();
        Ok(Truth::new(
            values[0],
            values.get(1).copied().unwrap_or(d.confidence),
        ))
    }

    /// Read `open n1;n2;... open` with between one and `max` numbers in
    /// `[0, 1]`.
    fn delimited(&mut self, open: char, max: usize) -> Result<Vec<f32>, NarsError> {
        self.expect(open)?;
        let start = self.pos;
        while self.peek().is_some_and(|c| c != open) {
            self.pos += 1;
        }
        let body: String = self.chars[start..self.pos].iter().collect();
        self.expect(open)?;

        let values = body
            .split(';')
            .map(|part| {
                part.trim()
                    .parse::<f32>()
                    .ok()
                    .filter(|v| (0.0..=1.0).contains(v))
                    .ok_or_else(|| self.error(&format!("'{part}' is not a number in [0, 1]")))
            })
            .collect::<Result<Vec<_>, _>>()?;
        if values.len() > max {
            return Err(self.error(&format!("expected at most {max} values inside '{open}'")));
        }
        Ok(values)
    }

    // -------------------------------------------------------------------------
    // Cursor
    // -------------------------------------------------------------------------

    fn peek(&self) -> Option<char> {
        self.chars.get(self.pos).copied()
    }

    fn advance(&mut self) -> Option<char> {
        let c = self.peek()?;
        self.pos += 1;
        Some(c)
    }

    fn expect(&mut self, want: char) -> Result<(), NarsError> {
        match self.peek() {
            Some(c) if c == want => {
                self.pos += 1;
                Ok(())
            }
            Some(c) => Err(self.error(&format!("expected '{want}', found '{c}'"))),
            None => Err(self.error(&format!("expected '{want}'"))),
        }
    }

    fn skip_ws(&mut self) {
        while self.peek().is_some_and(char::is_whitespace) {
            self.pos += 1;
        }
    }

    fn at_end(&self) -> bool {
        self.pos >= self.chars.len()
    }

    fn error(&self, message: &str) -> NarsError {
        NarsError::Parse(format!("column {}: {message}", self.pos + 1))
    }
}

fn is_atom_char(c: char) -> bool {
    c.is_alphanumeric() || matches!(c, '_' | '#' | '\'')
}

#[cfg(test)]
mod tests {
    use super::*;

    fn inheritance(s: &str, p: &str) -> Term {
        Term::statement(Term::atom(s), "-->", Term::atom(p))
    }

    /// A bare atom judgment gets the default truth and budget.
    #[test]
    fn atomic_judgment_takes_default_truth_and_budget() {
        let task = parse("bird.").unwrap();
        assert_eq!(task.term(), &Term::atom("bird"));
        assert_eq!(task.sentence.punctuation, Punctuation::Judgment);
        assert_eq!(task.sentence.truth, Some(Truth::default()));
        assert_eq!(task.budget, Budget::default());
        assert!(task.is_input());
    }

    /// A truth suffix sets frequency and confidence.
    #[test]
    fn statement_with_truth() {
        let task = parse("<bird --> animal>. %0.9;0.8%").unwrap();
        assert_eq!(task.term(), &inheritance("bird", "animal"));
        assert_eq!(task.sentence.truth, Some(Truth::new(0.9, 0.8)));
    }

    /// All four copulas parse.
    #[test]
    fn every_copula_is_recognised() {
        for copula in COPULAS {
            let task = parse(&format!("<a {copula} b>.")).unwrap();
            assert_eq!(
                task.term(),
                &Term::statement(Term::atom("a"), copula, Term::atom("b"))
            );
        }
    }

    /// Statements and compounds nest to any depth.
    #[test]
    fn nested_statements_and_compounds() {
        let task = parse("<(&, bird, swimmer) ==> <penguin --> animal>>?").unwrap();
        let expected = Term::statement(
            Term::compound("&", vec![Term::atom("bird"), Term::atom("swimmer")]),
            "==>",
            inheritance("penguin", "animal"),
        );
        assert_eq!(task.term(), &expected);
        assert_eq!(task.sentence.punctuation, Punctuation::Question);
        assert_eq!(task.sentence.truth, None);
    }

    /// A short budget prefix takes the rest from the default budget.
    #[test]
    fn budget_prefix_fills_missing_components() {
        let task = parse("$0.3$ <a --> b>!").unwrap();
        let d = Budget::default();
        assert!((task.budget.priority - 0.3).abs() < 1e-6);
        assert_eq!(task.budget.durability, d.durability);
        assert_eq!(task.sentence.punctuation, Punctuation::Goal);

        let task = parse("$0.3;0.2;0.1$ a.").unwrap();
        assert!((task.budget.quality - 0.1).abs() < 1e-6);
    }

    /// A one-value truth keeps the default confidence.
    #[test]
    fn truth_without_confidence_keeps_default_confidence() {
        let task = parse("a. %0.4%").unwrap();
        let truth = task.sentence.truth.unwrap();
        assert!((truth.frequency - 0.4).abs() < 1e-6);
        assert_eq!(truth.confidence, Truth::default().confidence);
    }

    /// Printed tasks read back as the same sentence.
    #[test]
    fn display_output_parses_back_to_the_same_sentence() {
        let task = parse("$0.50;0.40;0.30$ <(*, a, b) --> rel>. %1.00;0.90%").unwrap();
        let again = parse(&task.to_string()).unwrap();
        assert_eq!(again.sentence, task.sentence);
    }

    /// Every malformed line is a parse error.
    #[test]
    fn malformed_input_is_rejected() {
        for bad in [
            "",
            "bird",
            "<bird animal>.",
            "<bird --> animal.",
            "(&).",
            "bird. extra",
            "bird? %1.0;0.9%",
            "$1.5$ bird.",
            "bird. %0.9;0.8;0.7%",
            "bird;",
        ] {
            assert!(
                matches!(parse(bad), Err(NarsError::Parse(_))),
                "accepted {bad:?}"
            );
        }
    }

    /// Parse errors point at the offending column.
    #[test]
    fn errors_name_the_column() {
        let err = parse("<bird ~~ animal>.").unwrap_err();
        assert!(err.to_string().contains("column 7"), "{err}");
    }
}

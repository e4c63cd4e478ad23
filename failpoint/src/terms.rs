//! The terms DSL: `[count "*"] [probability "%"] action ("->" ...)*`.
//!
//! A terms string is parsed once, at `enable` time, into a [`Terms`]
//! value; evaluating it against a particular call is cheap and does
//! not reparse anything.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use crate::error::ParseError;
use crate::value::Value;

/// One step of a `->`-chained terms string.
#[derive(Debug)]
pub struct Term {
    /// Remaining fire count. `None` means the term never exhausts.
    remaining: Option<AtomicU64>,
    /// Probability in `[0.0, 1.0]` gating whether this term fires on a
    /// given evaluation. `None` means always (subject to `remaining`).
    probability: Option<f64>,
    /// The action to perform when this term is chosen.
    pub action: Action,
}

impl Term {
    fn exhausted(&self) -> bool {
        matches!(&self.remaining, Some(n) if n.load(Ordering::Acquire) == 0)
    }
}

/// The action a fired [`Term`] performs.
#[derive(Debug, Clone, PartialEq)]
pub enum Action {
    /// Return the given value from the injection point.
    Return(Value),
    /// Block the calling thread for the given duration.
    Sleep(Duration),
    /// Block the calling thread until the failpoint is disabled.
    Pause,
    /// Write a line to standard output.
    Print(String),
    /// Panic the calling thread with the given value.
    Panic(Value),
    /// Behave as though disabled for this evaluation, without an error.
    Off,
}

/// The parsed, evaluatable form of a terms string.
#[derive(Debug)]
pub struct Terms {
    /// The exact string this was parsed from, kept for `Status`.
    source: String,
    terms: Vec<Term>,
}

/// The outcome of evaluating a [`Terms`] value once.
pub enum TermOutcome<'a> {
    /// A term fired; here is its action.
    Fired(&'a Action),
    /// The first eligible term's probability gate rejected this call.
    NotFired,
    /// Every term has exhausted its count; this failpoint can never
    /// fire again without a fresh `enable`.
    AllExhausted,
}

impl Terms {
    /// Parses a terms string per the grammar above.
    pub fn parse(source: &str) -> Result<Terms, ParseError> {
        let terms = Parser::new(source).parse_terms()?;
        Ok(Terms {
            source: source.to_string(),
            terms,
        })
    }

    /// The original string this was parsed from.
    pub fn source(&self) -> &str {
        &self.source
    }

    /// Finds the first non-exhausted term, applies its probability
    /// gate, and — if it passes — decrements its count. Never
    /// considers a later term once an earlier eligible one has been
    /// found, even if that term's probability gate rejects the call.
    pub fn evaluate(&self) -> TermOutcome<'_> {
        for term in &self.terms {
            if term.exhausted() {
                continue;
            }
            if let Some(p) = term.probability {
                if !bernoulli(p) {
                    return TermOutcome::NotFired;
                }
            }
            if let Some(remaining) = &term.remaining {
                loop {
                    let cur = remaining.load(Ordering::Acquire);
                    if cur == 0 {
                        // Raced with a concurrent decrement to zero;
                        // this term is exhausted after all — no other
                        // term is considered for this call.
                        return TermOutcome::NotFired;
                    }
                    if remaining
                        .compare_exchange(cur, cur - 1, Ordering::AcqRel, Ordering::Acquire)
                        .is_ok()
                    {
                        break;
                    }
                }
            }
            return TermOutcome::Fired(&term.action);
        }
        TermOutcome::AllExhausted
    }
}

fn bernoulli(p: f64) -> bool {
    rand::random::<f64>() < p
}

struct Parser<'a> {
    src: &'a str,
    pos: usize,
}

impl<'a> Parser<'a> {
    fn new(src: &'a str) -> Self {
        Parser { src, pos: 0 }
    }

    fn err(&self) -> ParseError {
        ParseError::at(self.src, self.pos)
    }

    fn rest(&self) -> &'a str {
        &self.src[self.pos..]
    }

    fn skip_ws(&mut self) {
        let trimmed = self.rest().trim_start();
        self.pos = self.src.len() - trimmed.len();
    }

    fn eat(&mut self, tok: &str) -> bool {
        self.skip_ws();
        if self.rest().starts_with(tok) {
            self.pos += tok.len();
            true
        } else {
            false
        }
    }

    fn parse_terms(&mut self) -> Result<Vec<Term>, ParseError> {
        let mut terms = Vec::new();
        loop {
            terms.push(self.parse_term()?);
            self.skip_ws();
            if !self.eat("->") {
                break;
            }
        }
        self.skip_ws();
        if !self.rest().is_empty() {
            return Err(self.err());
        }
        Ok(terms)
    }

    fn parse_term(&mut self) -> Result<Term, ParseError> {
        self.skip_ws();
        let remaining = self.try_parse_count()?;
        self.skip_ws();
        let probability = self.try_parse_probability()?;
        self.skip_ws();
        let action = self.parse_action()?;
        Ok(Term {
            remaining,
            probability,
            action,
        })
    }

    fn try_parse_count(&mut self) -> Result<Option<AtomicU64>, ParseError> {
        let save = self.pos;
        self.skip_ws();
        let start = self.pos;
        let digits: String = self.rest().chars().take_while(|c| c.is_ascii_digit()).collect();
        if digits.is_empty() {
            self.pos = save;
            return Ok(None);
        }
        self.pos = start + digits.len();
        if self.eat("*") {
            let n: u64 = digits.parse().map_err(|_| self.err())?;
            if n == 0 {
                return Err(ParseError::at(self.src, start));
            }
            Ok(Some(AtomicU64::new(n)))
        } else {
            // Not actually a count — this was the start of something
            // else (e.g. a bare numeric action argument), back out.
            self.pos = save;
            Ok(None)
        }
    }

    fn try_parse_probability(&mut self) -> Result<Option<f64>, ParseError> {
        let save = self.pos;
        self.skip_ws();
        let start = self.pos;
        let mut chars = self.rest().chars();
        let mut len = 0;
        while let Some(c) = chars.next() {
            if c.is_ascii_digit() || c == '.' {
                len += c.len_utf8();
            } else {
                break;
            }
        }
        if len == 0 {
            self.pos = save;
            return Ok(None);
        }
        let text = &self.src[start..start + len];
        self.pos = start + len;
        if self.eat("%") {
            let p: f64 = text.parse().map_err(|_| self.err())?;
            Ok(Some(p / 100.0))
        } else {
            self.pos = save;
            Ok(None)
        }
    }

    fn ident(&mut self) -> Result<&'a str, ParseError> {
        self.skip_ws();
        let start = self.pos;
        let len: usize = self
            .rest()
            .chars()
            .take_while(|c| c.is_ascii_alphabetic())
            .map(char::len_utf8)
            .sum();
        if len == 0 {
            return Err(self.err());
        }
        self.pos = start + len;
        Ok(&self.src[start..start + len])
    }

    fn parse_action(&mut self) -> Result<Action, ParseError> {
        let name = self.ident()?;
        match name {
            "off" => Ok(Action::Off),
            "pause" => Ok(Action::Pause),
            "return" => {
                // the parens are optional; a bare `return` fires with
                // the unit value, matching the grammar's `["(" value ")"]`.
                if !self.eat("(") {
                    return Ok(Action::Return(Value::Unit));
                }
                let v = self.parse_value()?;
                self.expect(")")?;
                Ok(Action::Return(v))
            }
            "sleep" => {
                self.expect("(")?;
                let d = self.parse_duration()?;
                self.expect(")")?;
                Ok(Action::Sleep(d))
            }
            "print" => {
                self.expect("(")?;
                let s = self.parse_string()?;
                self.expect(")")?;
                Ok(Action::Print(s))
            }
            "panic" => {
                // parens and the value itself are both optional, and
                // the value is the same general `value` production
                // `return` uses, not a string specifically.
                if !self.eat("(") {
                    return Ok(Action::Panic(Value::Unit));
                }
                let v = self.parse_value()?;
                self.expect(")")?;
                Ok(Action::Panic(v))
            }
            _ => Err(self.err()),
        }
    }

    fn expect(&mut self, tok: &str) -> Result<(), ParseError> {
        if self.eat(tok) {
            Ok(())
        } else {
            Err(self.err())
        }
    }

    fn parse_value(&mut self) -> Result<Value, ParseError> {
        self.skip_ws();
        if self.rest().starts_with('"') {
            return Ok(Value::Str(self.parse_string()?));
        }
        if self.rest().starts_with("true") {
            self.pos += 4;
            return Ok(Value::Bool(true));
        }
        if self.rest().starts_with("false") {
            self.pos += 5;
            return Ok(Value::Bool(false));
        }
        let start = self.pos;
        let neg = self.eat("-");
        let digits: String = self.rest().chars().take_while(|c| c.is_ascii_digit()).collect();
        if digits.is_empty() {
            self.pos = start;
            return Err(self.err());
        }
        self.pos += digits.len();
        let n: i64 = digits.parse().map_err(|_| self.err())?;
        Ok(Value::Int(if neg { -n } else { n }))
    }

    fn parse_string(&mut self) -> Result<String, ParseError> {
        self.skip_ws();
        if !self.eat("\"") {
            return Err(self.err());
        }
        let start = self.pos;
        let end = self.rest().find('"').ok_or_else(|| self.err())?;
        let s = self.src[start..start + end].to_string();
        self.pos = start + end;
        self.expect("\"")?;
        Ok(s)
    }

    fn parse_duration(&mut self) -> Result<Duration, ParseError> {
        self.skip_ws();
        if self.rest().starts_with('"') {
            let text = self.parse_string()?;
            return parse_duration_str(&text).ok_or_else(|| self.err());
        }
        let start = self.pos;
        let digits: String = self.rest().chars().take_while(|c| c.is_ascii_digit()).collect();
        if digits.is_empty() {
            self.pos = start;
            return Err(self.err());
        }
        self.pos += digits.len();
        let ms: u64 = digits.parse().map_err(|_| self.err())?;
        Ok(Duration::from_millis(ms))
    }
}

fn parse_duration_str(s: &str) -> Option<Duration> {
    let (num, suffix) = s.find(|c: char| !c.is_ascii_digit() && c != '.').map(|i| s.split_at(i))?;
    let n: f64 = num.parse().ok()?;
    match suffix {
        "ns" => Some(Duration::from_nanos(n as u64)),
        "us" => Some(Duration::from_micros(n as u64)),
        "ms" => Some(Duration::from_millis(n as u64)),
        "s" => Some(Duration::from_secs_f64(n)),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_bare_return() {
        let t = Terms::parse("return(5)").unwrap();
        match t.evaluate() {
            TermOutcome::Fired(Action::Return(Value::Int(5))) => {}
            _ => panic!("expected Fired(return(5))"),
        }
    }

    #[test]
    fn counted_term_exhausts() {
        let t = Terms::parse("2*return(1)").unwrap();
        assert!(matches!(t.evaluate(), TermOutcome::Fired(_)));
        assert!(matches!(t.evaluate(), TermOutcome::Fired(_)));
        assert!(matches!(t.evaluate(), TermOutcome::AllExhausted));
    }

    #[test]
    fn chained_terms_exhaust_in_order() {
        let t = Terms::parse("1*return(1)->1*return(2)").unwrap();
        let first = t.evaluate();
        assert!(matches!(first, TermOutcome::Fired(Action::Return(Value::Int(1)))));
        let second = t.evaluate();
        assert!(matches!(second, TermOutcome::Fired(Action::Return(Value::Int(2)))));
        assert!(matches!(t.evaluate(), TermOutcome::AllExhausted));
    }

    #[test]
    fn probability_gate_does_not_consume_count_on_failure() {
        // probability 0 never fires; the count must stay untouched
        // forever, so AllExhausted should never be reached.
        let t = Terms::parse("1*0%return(1)").unwrap();
        for _ in 0..10 {
            assert!(matches!(t.evaluate(), TermOutcome::NotFired));
        }
    }

    #[test]
    fn unconditional_term_never_exhausts() {
        let t = Terms::parse("pause").unwrap();
        for _ in 0..5 {
            assert!(matches!(t.evaluate(), TermOutcome::Fired(Action::Pause)));
        }
    }

    #[test]
    fn parses_sleep_and_print_and_panic_and_off() {
        assert!(matches!(
            Terms::parse("sleep(100)").unwrap().evaluate(),
            TermOutcome::Fired(Action::Sleep(d)) if d == Duration::from_millis(100)
        ));
        assert!(matches!(
            Terms::parse(r#"sleep("10ms")"#).unwrap().evaluate(),
            TermOutcome::Fired(Action::Sleep(d)) if d == Duration::from_millis(10)
        ));
        assert!(matches!(
            Terms::parse(r#"print("hi")"#).unwrap().evaluate(),
            TermOutcome::Fired(Action::Print(ref s)) if s == "hi"
        ));
        assert!(matches!(
            Terms::parse(r#"panic("boom")"#).unwrap().evaluate(),
            TermOutcome::Fired(Action::Panic(Value::Str(ref s))) if s == "boom"
        ));
        assert!(matches!(Terms::parse("off").unwrap().evaluate(), TermOutcome::Fired(Action::Off)));
    }

    #[test]
    fn bare_return_and_panic_carry_unit_value() {
        assert!(matches!(
            Terms::parse("return").unwrap().evaluate(),
            TermOutcome::Fired(Action::Return(Value::Unit))
        ));
        assert!(matches!(
            Terms::parse("panic").unwrap().evaluate(),
            TermOutcome::Fired(Action::Panic(Value::Unit))
        ));
        assert!(matches!(
            Terms::parse(r#"panic(5)"#).unwrap().evaluate(),
            TermOutcome::Fired(Action::Panic(Value::Int(5)))
        ));
    }

    #[test]
    fn rejects_garbage() {
        assert!(Terms::parse("not a term").is_err());
        assert!(Terms::parse("return(").is_err());
    }

    #[test]
    fn rejects_zero_count() {
        assert!(Terms::parse("0*return(1)").is_err());
        assert!(Terms::parse("0*return(1)->1*return(2)").is_err());
    }
}

//! # Node Range Expressions
//!
//! Compact syntax for naming many nodes or groups at once, as used in the
//! configuration file and in the node selection options of the CLI.
//!
//! ```text
//! name  := letter (letter | digit | '_' | '+' | '-')*
//! range := name '[' elem (',' elem)* ']' suffix?
//! elem  := digits | digits '-' digits | digits '-' digits '/' digits
//! ```
//!
//! Leading zeros fix the zero-pad width of the emitted numbers, so
//! `n[007-009]` expands to `n007`, `n008`, `n009`.
//!
//! Three operations live here:
//!
//! - [`expand`] turns one range expression into literal names, and
//!   [`split_nodelist`] / [`expand_list`] handle comma separated lines
//!   mixing plain names and ranges.
//! - [`Sequence`] implements auto-numbering of addresses and host names:
//!   a single `[N]` placeholder is replaced by `N + counter`, where the
//!   counter advances once per emitted name.
//! - [`compress`] is the display inverse of `expand`.
//!
//! ```
//! use nodesync::range;
//!
//! let names = range::expand("web[1-3]").unwrap();
//! assert_eq!(names, vec!["web1", "web2", "web3"]);
//! assert_eq!(range::compress(&names), "web[1-3]");
//! ```

use std::collections::{HashMap, HashSet};
use std::sync::LazyLock;

use regex::Regex;

use crate::error::{Error, Result};

/// Upper bound on the number of names a single expression may produce.
pub const MAX_EXPANSION: usize = 100_000;

static RANGE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^([A-Za-z][A-Za-z0-9_+\-]*)\[([^\[\]]*)\]([A-Za-z0-9_+\-.]*)$")
        .expect("range regex is valid")
});

static ELEMENT_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^([0-9]+)(?:-([0-9]+)(?:/([0-9]+))?)?$").expect("element regex is valid")
});

static PLACEHOLDER_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\[([0-9A-Fa-f]+)\]").expect("placeholder regex is valid"));

static TRAILING_DIGITS_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^([A-Za-z][A-Za-z0-9_+\-]*?)([0-9]+)([A-Za-z_+\-.]*)$")
        .expect("trailing digits regex is valid")
});

/// One comma separated element of a range list.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SubRange {
    pub start: u64,
    /// `None` for a single number.
    pub end: Option<u64>,
    pub step: u64,
    /// Zero-pad width, taken from the literal start value.
    pub width: usize,
}

impl SubRange {
    fn count(&self) -> usize {
        match self.end {
            Some(end) => ((end - self.start) / self.step + 1) as usize,
            None => 1,
        }
    }

    fn values(&self) -> impl Iterator<Item = u64> {
        let end = self.end.unwrap_or(self.start);
        (self.start..=end).step_by(self.step as usize)
    }
}

/// A parsed range expression.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RangeToken {
    pub prefix: String,
    pub ranges: Vec<SubRange>,
    pub suffix: String,
}

impl RangeToken {
    /// Parse `expr` and check the start, step and size limits.
    pub fn parse(expr: &str) -> Result<Self> {
        let caps = RANGE_RE
            .captures(expr)
            .ok_or_else(|| Error::range(expr, "expected name[range]suffix"))?;

        let mut ranges = Vec::new();
        let mut total = 0usize;
        for elem in caps[2].split(',') {
            let sub = parse_element(expr, elem)?;
            total += sub.count();
            if total > MAX_EXPANSION {
                return Err(Error::range(
                    expr,
                    format!("expands to more than {} names", MAX_EXPANSION),
                ));
            }
            ranges.push(sub);
        }

        Ok(Self {
            prefix: caps[1].to_string(),
            ranges,
            suffix: caps[3].to_string(),
        })
    }

    /// The literal names this token denotes, in expression order.
    pub fn names(&self) -> Vec<String> {
        let mut names = Vec::new();
        for sub in &self.ranges {
            for value in sub.values() {
                names.push(format!(
                    "{}{:0width$}{}",
                    self.prefix,
                    value,
                    self.suffix,
                    width = sub.width
                ));
            }
        }
        names
    }
}

fn parse_element(expr: &str, elem: &str) -> Result<SubRange> {
    let caps = ELEMENT_RE
        .captures(elem.trim())
        .ok_or_else(|| Error::range(expr, format!("invalid range element '{}'", elem)))?;

    let number = |s: &str| -> Result<u64> {
        s.parse::<u64>()
            .map_err(|_| Error::range(expr, format!("number '{}' is too large", s)))
    };

    let start_digits = &caps[1];
    let start = number(start_digits)?;
    let end = match caps.get(2) {
        Some(m) => Some(number(m.as_str())?),
        None => None,
    };
    let step = match caps.get(3) {
        Some(m) => number(m.as_str())?,
        None => 1,
    };

    if step == 0 {
        return Err(Error::range(expr, "step must be at least 1"));
    }
    if let Some(end) = end {
        if start > end {
            return Err(Error::range(
                expr,
                format!("start {} is greater than end {}", start, end),
            ));
        }
        if end - start >= MAX_EXPANSION as u64 {
            return Err(Error::range(
                expr,
                format!("expands to more than {} names", MAX_EXPANSION),
            ));
        }
    }

    Ok(SubRange {
        start,
        end,
        step,
        width: start_digits.len(),
    })
}

/// Expand a single name or range expression into literal names.
///
/// A plain name without brackets expands to itself.
pub fn expand(expr: &str) -> Result<Vec<String>> {
    let expr = expr.trim();
    if expr.is_empty() {
        return Err(Error::range(expr, "empty expression"));
    }
    if !expr.contains('[') && !expr.contains(']') {
        return Ok(vec![expr.to_string()]);
    }
    Ok(RangeToken::parse(expr)?.names())
}

/// Split a comma separated node list into tokens without breaking up
/// brackets that contain commas themselves.
///
/// `"n[1,3],web,db[01-02]"` yields `["n[1,3]", "web", "db[01-02]"]`.
pub fn split_nodelist(line: &str) -> Result<Vec<String>> {
    let mut tokens = Vec::new();
    let mut current = String::new();
    let mut in_bracket = false;

    for ch in line.chars() {
        match ch {
            '[' if in_bracket => return Err(Error::range(line, "nested '['")),
            '[' => in_bracket = true,
            ']' if !in_bracket => return Err(Error::range(line, "unbalanced ']'")),
            ']' => in_bracket = false,
            ',' if !in_bracket => {
                push_token(&mut tokens, &mut current);
                continue;
            }
            _ => {}
        }
        current.push(ch);
    }

    if in_bracket {
        return Err(Error::range(line, "missing ']'"));
    }
    push_token(&mut tokens, &mut current);
    Ok(tokens)
}

fn push_token(tokens: &mut Vec<String>, current: &mut String) {
    let token = current.trim();
    if !token.is_empty() {
        tokens.push(token.to_string());
    }
    current.clear();
}

/// Split and expand a comma separated node list. Duplicates are removed,
/// keeping the first occurrence.
pub fn expand_list(line: &str) -> Result<Vec<String>> {
    let mut seen = HashSet::new();
    let mut names = Vec::new();
    for token in split_nodelist(line)? {
        for name in expand(&token)? {
            if seen.insert(name.clone()) {
                names.push(name);
            }
        }
    }
    if names.len() > MAX_EXPANSION {
        return Err(Error::range(
            line,
            format!("expands to more than {} names", MAX_EXPANSION),
        ));
    }
    Ok(names)
}

/// What an auto-numbered string looks like.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Shape {
    Ipv4,
    Ipv6,
    /// IPv6 head and dotted IPv4 tail, split at this byte offset.
    Mixed(usize),
    Generic,
}

fn is_ipv4_like(s: &str) -> bool {
    s.contains('.') && s.chars().all(|c| c.is_ascii_digit() || "[].".contains(c))
}

fn is_ipv6_like(s: &str) -> bool {
    s.contains(':') && s.chars().all(|c| c.is_ascii_hexdigit() || "[]:".contains(c))
}

fn shape_of(arg: &str) -> Shape {
    if is_ipv4_like(arg) {
        return Shape::Ipv4;
    }
    if is_ipv6_like(arg) {
        return Shape::Ipv6;
    }
    if let Some(pos) = arg.rfind(':') {
        let (head, tail) = arg.split_at(pos + 1);
        if is_ipv6_like(head) && is_ipv4_like(tail) {
            return Shape::Mixed(pos + 1);
        }
    }
    Shape::Generic
}

/// Request-scoped auto-numbering counter.
///
/// One `Sequence` is created (or [`reset`](Sequence::reset)) per node
/// directive. Every call to [`expand`](Sequence::expand) on a string with a
/// placeholder consumes the current value and advances the counter by one.
///
/// ```
/// use nodesync::range::Sequence;
///
/// let mut seq = Sequence::new();
/// assert_eq!(seq.expand("10.0.0.[5]").unwrap(), "10.0.0.5");
/// assert_eq!(seq.expand("10.0.0.[5]").unwrap(), "10.0.0.6");
/// ```
#[derive(Debug, Clone, Default)]
pub struct Sequence {
    counter: u64,
}

impl Sequence {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn reset(&mut self) {
        self.counter = 0;
    }

    pub fn current(&self) -> u64 {
        self.counter
    }

    /// Replace the `[N]` placeholders in `arg` with `N + counter`.
    ///
    /// IPv4-shaped strings are decimal and capped at 255 per octet,
    /// IPv6-shaped strings are hexadecimal and capped at `ffff` per
    /// segment, and any other string is decimal without a ceiling.
    /// Strings without a placeholder are returned unchanged and do not
    /// advance the counter.
    ///
    /// Every placeholder in one call is offset by the same counter value
    /// and the counter advances once per call, so `10.[0].0.[10]` numbers
    /// both octets in step for each node.
    pub fn expand(&mut self, arg: &str) -> Result<String> {
        if !arg.contains('[') && !arg.contains(']') {
            return Ok(arg.to_string());
        }

        let expanded = match shape_of(arg) {
            Shape::Ipv4 => self.substitute(arg, arg, 10, false)?,
            Shape::Ipv6 => self.substitute(arg, arg, 16, false)?,
            Shape::Mixed(pos) => {
                let (head, tail) = arg.split_at(pos);
                let mut out = self.substitute(arg, head, 16, false)?;
                out.push_str(&self.substitute(arg, tail, 10, false)?);
                out
            }
            Shape::Generic => self.substitute(arg, arg, 10, true)?,
        };

        self.counter += 1;
        Ok(expanded)
    }

    fn substitute(&self, arg: &str, part: &str, radix: u32, overflow: bool) -> Result<String> {
        let mut out = String::with_capacity(part.len());
        let mut last = 0;

        for caps in PLACEHOLDER_RE.captures_iter(part) {
            let whole = caps.get(0).map_or(0..0, |m| m.range());
            let literal = &caps[1];
            if radix == 10 && !literal.chars().all(|c| c.is_ascii_digit()) {
                return Err(Error::range(
                    arg,
                    format!("'{}' is not a decimal number", literal),
                ));
            }

            let base = u64::from_str_radix(literal, radix)
                .map_err(|_| Error::range(arg, format!("number '{}' is too large", literal)))?;
            let value = base
                .checked_add(self.counter)
                .ok_or_else(|| Error::range(arg, "sequence overflow"))?;

            let ceiling = if radix == 16 { 0xffff } else { 255 };
            if !overflow && value > ceiling {
                return Err(Error::range(
                    arg,
                    format!("value {} exceeds the address limit {}", value, ceiling),
                ));
            }

            out.push_str(&part[last..whole.start]);
            let width = literal.len();
            if radix == 16 {
                out.push_str(&format!("{:0width$x}", value, width = width));
            } else {
                out.push_str(&format!("{:0width$}", value, width = width));
            }
            last = whole.end;
        }
        out.push_str(&part[last..]);

        if out.contains('[') || out.contains(']') {
            return Err(Error::range(arg, "expected a single [N] placeholder"));
        }
        Ok(out)
    }
}

/// A group of names sharing the same prefix and suffix around their
/// trailing number.
struct NumberedGroup {
    prefix: String,
    suffix: String,
    members: Vec<(String, u64)>,
}

impl NumberedGroup {
    fn render(mut self) -> String {
        self.members.sort_by(|a, b| {
            a.0.len()
                .cmp(&b.0.len())
                .then(a.1.cmp(&b.1))
                .then_with(|| a.0.cmp(&b.0))
        });

        if self.members.len() == 1 {
            return format!("{}{}{}", self.prefix, self.members[0].0, self.suffix);
        }

        let mut parts = Vec::new();
        let mut i = 0;
        while i < self.members.len() {
            let width = self.members[i].0.len();
            let mut j = i;
            while j + 1 < self.members.len() && continues_run(&self.members[j], &self.members[j + 1], width)
            {
                j += 1;
            }
            if j > i {
                parts.push(format!("{}-{}", self.members[i].0, self.members[j].0));
            } else {
                parts.push(self.members[i].0.clone());
            }
            i = j + 1;
        }

        format!("{}[{}]{}", self.prefix, parts.join(","), self.suffix)
    }
}

/// `next` extends a run started at `width` digits only if expanding the run
/// would print it exactly as written, so `9 -> 10` joins a run but
/// `8 -> 09` does not.
fn continues_run(prev: &(String, u64), next: &(String, u64), width: usize) -> bool {
    prev.1.checked_add(1) == Some(next.1)
        && next.0.len() <= prev.0.len() + 1
        && next.0 == format!("{:0width$}", next.1, width = width)
}

enum Slot {
    Literal(String),
    Group(usize),
}

/// Compress a list of names into range syntax for display.
///
/// Names are grouped by the text around their trailing number, in the
/// order each group is first seen. Names without a trailing number are
/// emitted as they are. Step notation is never produced.
pub fn compress<S: AsRef<str>>(names: &[S]) -> String {
    let mut seen = HashSet::new();
    let mut slots = Vec::new();
    let mut groups: Vec<NumberedGroup> = Vec::new();
    let mut index: HashMap<(String, String), usize> = HashMap::new();

    for name in names {
        let name = name.as_ref();
        if !seen.insert(name) {
            continue;
        }

        let parsed = TRAILING_DIGITS_RE.captures(name).and_then(|caps| {
            let value = caps[2].parse::<u64>().ok()?;
            Some((
                caps[1].to_string(),
                caps[2].to_string(),
                value,
                caps[3].to_string(),
            ))
        });

        match parsed {
            Some((prefix, digits, value, suffix)) => {
                let key = (prefix.clone(), suffix.clone());
                let slot = *index.entry(key).or_insert_with(|| {
                    groups.push(NumberedGroup {
                        prefix,
                        suffix,
                        members: Vec::new(),
                    });
                    slots.push(Slot::Group(groups.len() - 1));
                    groups.len() - 1
                });
                groups[slot].members.push((digits, value));
            }
            None => slots.push(Slot::Literal(name.to_string())),
        }
    }

    let mut rendered: Vec<Option<String>> = groups.into_iter().map(|g| Some(g.render())).collect();
    slots
        .into_iter()
        .filter_map(|slot| match slot {
            Slot::Literal(name) => Some(name),
            Slot::Group(i) => rendered[i].take(),
        })
        .collect::<Vec<_>>()
        .join(",")
}

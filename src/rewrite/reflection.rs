//! Reflection removal
//!
//! ## Algorithm
//!
//! For every reflection keyword, two passes run over the merged source:
//!
//! 1. **Method pass**: methods are delimited by a signature line that opens a
//!    block and a running brace depth. A method whose `return` references the
//!    term is commented out whole and its name becomes a new term.
//! 2. **Line pass**: every other line referencing the term is commented out.
//!    Placeholder braces keep the block structure intact, and a variable
//!    assigned from the term becomes a new term.
//!
//! New terms go on a worklist that is drained until every name has been
//! processed once. The worklist and processed set live for one call.

use super::{
    brace_delta, is_comment_or_import, join_lines, leading_whitespace, parse_method_signature,
    split_lines, RewriteError,
};
use crate::analysis::detectors::REFLECTION_KEYWORDS;
use crate::analysis::AnalysisLog;
use lazy_static::lazy_static;
use regex::Regex;
use std::collections::BTreeSet;

/// Trailer appended to a commented-out method
pub const METHOD_MARKER: &str =
    "// Unboxer: Method contains reflection in return statement and was commented out";

const LINE_MARKER: &str = "// Unboxer: Line contains reflection and was commented out";
const METHOD_PREFIX: &str = "// Unboxer ";

/// What one removal run did
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RemovalReport {
    /// Methods commented out, in the order they were found
    pub removed_methods: Vec<String>,
    /// Number of individual lines commented out
    pub commented_lines: usize,
    /// Names that became reflective, in the order they were scheduled
    pub tainted: Vec<String>,
    /// Tainted names that were fully processed
    pub processed: BTreeSet<String>,
}

impl RemovalReport {
    /// Total number of reflective sites neutralised
    pub fn hits(&self) -> usize {
        self.removed_methods.len() + self.commented_lines
    }
}

lazy_static! {
    static ref ASSIGNMENT: Regex = Regex::new(r"([A-Za-z0-9_$]+)\s*=[^=]")
        .expect("failed to compile assignment regex");
}

/// Taint-propagating rewrite that comments out reflective code
pub struct ReflectionRemover {
    terms: Vec<String>,
}

impl ReflectionRemover {
    pub fn new() -> Self {
        Self::with_terms(REFLECTION_KEYWORDS.iter().map(|k| k.to_string()).collect())
    }

    pub fn with_terms(terms: Vec<String>) -> Self {
        Self { terms }
    }

    /// Comment out reflective code in `source` until no new names turn up
    pub fn remove(
        &self,
        source: &str,
        log: &mut AnalysisLog,
    ) -> Result<(String, RemovalReport), RewriteError> {
        let mut report = RemovalReport::default();
        let mut worklist: Vec<String> = Vec::new();
        let mut text = source.to_string();

        for term in &self.terms {
            let pattern = term_pattern(term)?;
            text = self.method_pass(&text, &pattern, &mut worklist, &mut report, log);
            text = self.line_pass(&text, term, &pattern, &mut worklist, &mut report, log);
        }

        while let Some(name) = worklist.pop() {
            if report.processed.contains(&name) {
                continue;
            }
            let pattern = term_pattern(&name)?;
            text = self.method_pass(&text, &pattern, &mut worklist, &mut report, log);
            text = self.line_pass(&text, &name, &pattern, &mut worklist, &mut report, log);
            report.processed.insert(name);
        }

        Ok((text, report))
    }

    fn schedule(
        &self,
        name: &str,
        worklist: &mut Vec<String>,
        report: &mut RemovalReport,
    ) {
        if !report.tainted.iter().any(|t| t == name) {
            report.tainted.push(name.to_string());
        }
        worklist.push(name.to_string());
    }

    fn method_pass(
        &self,
        text: &str,
        pattern: &Regex,
        worklist: &mut Vec<String>,
        report: &mut RemovalReport,
        log: &mut AnalysisLog,
    ) -> String {
        let (lines, trailing_newline) = split_lines(text);
        let mut out: Vec<String> = Vec::with_capacity(lines.len());

        let mut method: Vec<&str> = Vec::new();
        let mut method_name = String::new();
        let mut depth: i64 = 0;
        let mut reflective_return = false;

        for line in lines {
            if method.is_empty() {
                let signature = if is_comment_or_import(line) {
                    None
                } else {
                    parse_method_signature(line).filter(|s| s.opens_block)
                };

                match signature {
                    Some(sig) => {
                        method.push(line);
                        method_name = sig.name;
                        depth = brace_delta(line);
                        reflective_return = is_reflective_return(line, pattern);
                    }
                    None => {
                        out.push(line.to_string());
                        continue;
                    }
                }
            } else {
                method.push(line);
                depth += brace_delta(line);
                if !is_comment_or_import(line) && line.trim_start().starts_with("return") {
                    reflective_return |= pattern.is_match(line);
                }
            }

            if depth <= 0 {
                if reflective_return {
                    for body_line in &method {
                        out.push(format!("{}{}", METHOD_PREFIX, body_line));
                    }
                    out.push(METHOD_MARKER.to_string());
                    log.log(format!("Removing reflective method: {}", method_name));
                    report.removed_methods.push(method_name.clone());
                    self.schedule(&method_name, worklist, report);
                } else {
                    out.extend(method.iter().map(|l| l.to_string()));
                }
                method.clear();
                reflective_return = false;
            }
        }

        // Unbalanced tail is left as it was
        out.extend(method.iter().map(|l| l.to_string()));

        join_lines(&out, trailing_newline)
    }

    fn line_pass(
        &self,
        text: &str,
        term: &str,
        pattern: &Regex,
        worklist: &mut Vec<String>,
        report: &mut RemovalReport,
        log: &mut AnalysisLog,
    ) -> String {
        let (lines, trailing_newline) = split_lines(text);
        let mut out: Vec<String> = Vec::with_capacity(lines.len());

        for line in lines {
            if is_comment_or_import(line)
                || !pattern.is_match(line)
                || parse_method_signature(line).is_some()
            {
                out.push(line.to_string());
                continue;
            }

            if let Some(caps) = ASSIGNMENT.captures(line) {
                let variable = &caps[1];
                let rhs = &line[caps.get(0).map(|m| m.end() - 1).unwrap_or(0)..];
                if variable != term && pattern.is_match(rhs) {
                    log.log(format!("Found reflective variable: {}", variable));
                    self.schedule(variable, worklist, report);
                }
            }

            let indent = leading_whitespace(line);
            out.push(format!("// {} {}", line, LINE_MARKER));
            report.commented_lines += 1;
            log.log(format!(
                "Commented out reflective line starting with: {}",
                line.trim_start()
            ));

            let (closes, opens) = unmatched_braces(line);
            for _ in 0..closes {
                out.push(format!("{}}}", indent));
            }
            for _ in 0..opens {
                out.push(format!("{}if (true) {{", indent));
            }
        }

        join_lines(&out, trailing_newline)
    }
}

impl Default for ReflectionRemover {
    fn default() -> Self {
        Self::new()
    }
}

/// Characters that may sit on either side of a term
const TERM_BOUNDARY: &str = r"[\[\]\s.()!=,+;?:]";

/// Bounded match for a term: not part of a longer identifier
fn term_pattern(term: &str) -> Result<Regex, RewriteError> {
    Ok(Regex::new(&format!(
        r"(?:^|{b}){t}(?:{b}|$)",
        b = TERM_BOUNDARY,
        t = regex::escape(term)
    ))?)
}

fn is_reflective_return(line: &str, pattern: &Regex) -> bool {
    match line.find('{') {
        Some(idx) => {
            let body = line[idx + 1..].trim_start();
            body.starts_with("return") && pattern.is_match(body)
        }
        None => false,
    }
}

/// Closing braces without an opener, and openers left unclosed, on one line
fn unmatched_braces(line: &str) -> (usize, usize) {
    let mut depth: i64 = 0;
    let mut lowest: i64 = 0;
    for c in line.chars() {
        match c {
            '{' => depth += 1,
            '}' => {
                depth -= 1;
                lowest = lowest.min(depth);
            }
            _ => {}
        }
    }
    ((-lowest) as usize, (depth - lowest) as usize)
}

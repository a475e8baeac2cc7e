//! Field filters built from `<fields><op><values>` rules.
//!
//! Rules are parsed (and their regexes compiled) before any file is opened.
//! Field names are only resolved against a file's [`FieldIndex`] once its
//! header has been read, producing a [`CompiledFilterSet`] that row
//! processors evaluate concurrently.

use anyhow::{anyhow, Context, Result};
use regex::bytes::Regex;
use std::fmt;

use crate::fields::{Column, FieldIndex, Record};

/// Separator between entries of a rule's field list and value list
pub const LIST_SEPARATOR: char = ',';

/// Comparison operator of a rule
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operator {
    /// `=` literal equality
    Equals,
    /// `!=` literal inequality
    NotEquals,
    /// `~` regex match
    Matches,
    /// `!~` regex non-match
    NotMatches,
}

impl Operator {
    pub fn symbol(self) -> &'static str {
        match self {
            Operator::Equals => "=",
            Operator::NotEquals => "!=",
            Operator::Matches => "~",
            Operator::NotMatches => "!~",
        }
    }

    pub fn is_regex(self) -> bool {
        matches!(self, Operator::Matches | Operator::NotMatches)
    }

    fn is_negated(self) -> bool {
        matches!(self, Operator::NotEquals | Operator::NotMatches)
    }

    /// Find the left-most operator in `rule`, returning its byte offset and width.
    ///
    /// Whatever follows the operator is the value list, even if it contains
    /// further operators: `a=b=c` compares `a` with `b=c`, and `uri~a=b` is a
    /// regex rule. Rules with several operators are therefore never rejected.
    fn locate(rule: &str) -> Option<(usize, Operator, usize)> {
        let bytes = rule.as_bytes();
        for (i, byte) in bytes.iter().enumerate() {
            match byte {
                b'!' => match bytes.get(i + 1) {
                    Some(b'=') => return Some((i, Operator::NotEquals, 2)),
                    Some(b'~') => return Some((i, Operator::NotMatches, 2)),
                    _ => {}
                },
                b'=' => return Some((i, Operator::Equals, 1)),
                b'~' => return Some((i, Operator::Matches, 1)),
                _ => {}
            }
        }
        None
    }
}

impl fmt::Display for Operator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.symbol())
    }
}

/// How a rule's value list combines for each field
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ValueMatch {
    /// Every value must satisfy the operator (`a=x,y` needs `a` to be both)
    #[default]
    All,
    /// At least one value must satisfy the operator
    Any,
}

#[derive(Debug, Clone)]
enum Comparand {
    Literal(String),
    Pattern(Regex),
}

impl Comparand {
    fn matches(&self, value: &[u8]) -> bool {
        match self {
            Comparand::Literal(literal) => value == literal.as_bytes(),
            Comparand::Pattern(regex) => regex.is_match(value),
        }
    }
}

/// A single parsed rule, not yet bound to any file's columns
#[derive(Debug, Clone)]
pub struct Filter {
    rule: String,
    fields: Vec<String>,
    operator: Operator,
    values: Vec<Comparand>,
}

impl Filter {
    /// Parse a rule such as `proto=tcp`, `id.resp_p!=80,443` or `host~^www\.`
    pub fn parse(rule: &str) -> Result<Self> {
        let (offset, operator, width) = Operator::locate(rule)
            .ok_or_else(|| anyhow!("not sure how to parse rule: {}", rule))?;
        let (field_part, value_part) = (&rule[..offset], &rule[offset + width..]);

        if field_part.is_empty() {
            return Err(anyhow!("rule has no field names: {}", rule));
        }
        if value_part.is_empty() {
            return Err(anyhow!("rule has no values: {}", rule));
        }

        let fields: Vec<String> = field_part
            .split(LIST_SEPARATOR)
            .map(str::to_string)
            .collect();
        if fields.iter().any(String::is_empty) {
            return Err(anyhow!("rule has an empty field name: {}", rule));
        }

        let values = value_part
            .split(LIST_SEPARATOR)
            .map(|value| {
                if operator.is_regex() {
                    Regex::new(value)
                        .map(Comparand::Pattern)
                        .with_context(|| format!("unable to compile regex '{}' in rule: {}", value, rule))
                } else {
                    Ok(Comparand::Literal(value.to_string()))
                }
            })
            .collect::<Result<Vec<_>>>()?;

        Ok(Self {
            rule: rule.to_string(),
            fields,
            operator,
            values,
        })
    }

    pub fn rule(&self) -> &str {
        &self.rule
    }

    pub fn fields(&self) -> &[String] {
        &self.fields
    }

    pub fn operator(&self) -> Operator {
        self.operator
    }

    /// Bind this rule's field names to columns of one file
    pub fn compile(&self, index: &FieldIndex, value_match: ValueMatch) -> Result<CompiledFilter> {
        let columns = self
            .fields
            .iter()
            .map(|field| index.resolve(field))
            .collect::<Result<Vec<_>>>()
            .with_context(|| format!("cannot apply rule: {}", self.rule))?;

        Ok(CompiledFilter {
            columns,
            operator: self.operator,
            values: self.values.clone(),
            value_match,
        })
    }
}

/// A rule bound to the columns of one file
#[derive(Debug, Clone)]
pub struct CompiledFilter {
    columns: Vec<Column>,
    operator: Operator,
    values: Vec<Comparand>,
    value_match: ValueMatch,
}

impl CompiledFilter {
    fn holds(&self, comparand: &Comparand, value: &[u8]) -> bool {
        comparand.matches(value) != self.operator.is_negated()
    }

    /// Check every configured field against the value list. A field missing
    /// from the record fails the filter.
    pub fn passes(&self, record: &Record<'_>) -> bool {
        self.columns.iter().all(|column| {
            let Some(value) = record.get(*column) else {
                return false;
            };
            match self.value_match {
                ValueMatch::All => self.values.iter().all(|c| self.holds(c, value)),
                ValueMatch::Any => self.values.iter().any(|c| self.holds(c, value)),
            }
        })
    }

    pub fn columns(&self) -> &[Column] {
        &self.columns
    }
}

/// Ordered rules; a record passes only if it passes all of them
#[derive(Debug, Clone, Default)]
pub struct FilterSet {
    filters: Vec<Filter>,
}

impl FilterSet {
    pub fn parse<S: AsRef<str>>(rules: &[S]) -> Result<Self> {
        let filters = rules
            .iter()
            .map(|rule| Filter::parse(rule.as_ref()))
            .collect::<Result<Vec<_>>>()?;
        Ok(Self { filters })
    }

    pub fn filters(&self) -> &[Filter] {
        &self.filters
    }

    pub fn len(&self) -> usize {
        self.filters.len()
    }

    pub fn is_empty(&self) -> bool {
        self.filters.is_empty()
    }

    pub fn compile(&self, index: &FieldIndex, value_match: ValueMatch) -> Result<CompiledFilterSet> {
        let filters = self
            .filters
            .iter()
            .map(|filter| filter.compile(index, value_match))
            .collect::<Result<Vec<_>>>()?;
        Ok(CompiledFilterSet { filters })
    }
}

/// A [`FilterSet`] bound to one file's columns
#[derive(Debug, Clone, Default)]
pub struct CompiledFilterSet {
    filters: Vec<CompiledFilter>,
}

impl CompiledFilterSet {
    pub fn passes(&self, record: &Record<'_>) -> bool {
        self.filters.iter().all(|filter| filter.passes(record))
    }

    pub fn filters(&self) -> &[CompiledFilter] {
        &self.filters
    }

    /// Smallest record width that holds every referenced column
    pub fn required_width(&self) -> usize {
        self.filters
            .iter()
            .flat_map(|filter| filter.columns.iter())
            .map(|column| column.required_width())
            .max()
            .unwrap_or(0)
    }
}

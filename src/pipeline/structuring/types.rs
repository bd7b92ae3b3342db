//! Field record and candidate ledger.
//!
//! Every extractor writes into a `CandidateLedger`: one entry per attempted
//! strategy, accepted or not. The ledger is the audit trail behind each
//! value in the final `FieldRecord`.

use std::collections::BTreeMap;

use serde::ser::SerializeMap;
use serde::{Deserialize, Serialize, Serializer};

use crate::config::OUTPUT_COLUMNS;

// ═══════════════════════════════════════════
// Field
// ═══════════════════════════════════════════

/// The nine canonical output fields, in column order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Field {
    DeceasedPropertyAddress,
    DeceasedName,
    PetitionerName,
    PetitionerAddress,
    Relationship,
    PropertyValue,
    Attorney,
    PhoneNumber,
    EmailAddress,
}

impl Field {
    pub const ALL: [Field; 9] = [
        Self::DeceasedPropertyAddress,
        Self::DeceasedName,
        Self::PetitionerName,
        Self::PetitionerAddress,
        Self::Relationship,
        Self::PropertyValue,
        Self::Attorney,
        Self::PhoneNumber,
        Self::EmailAddress,
    ];

    /// Name fields subject to the cross-case bleed guard.
    pub const NAMES: [Field; 2] = [Self::DeceasedName, Self::PetitionerName];

    pub fn index(self) -> usize {
        self as usize
    }

    /// Column header for this field.
    pub fn as_str(self) -> &'static str {
        OUTPUT_COLUMNS[self.index()]
    }

    pub fn from_str(s: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|f| f.as_str() == s)
    }
}

impl std::fmt::Display for Field {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

// ═══════════════════════════════════════════
// Field Record
// ═══════════════════════════════════════════

/// Exactly nine string values, one per `Field`. Never absent, possibly empty.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FieldRecord {
    values: [String; 9],
}

impl FieldRecord {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, field: Field) -> &str {
        &self.values[field.index()]
    }

    pub fn set(&mut self, field: Field, value: impl Into<String>) {
        self.values[field.index()] = value.into();
    }

    pub fn clear(&mut self, field: Field) {
        self.values[field.index()].clear();
    }

    pub fn is_blank(&self, field: Field) -> bool {
        self.values[field.index()].is_empty()
    }

    /// Set the field only if it is currently empty.
    pub fn fill(&mut self, field: Field, value: impl Into<String>) {
        if self.is_blank(field) {
            self.set(field, value);
        }
    }

    /// Fields whose value is empty, in column order.
    pub fn missing(&self) -> Vec<Field> {
        Field::ALL.into_iter().filter(|f| self.is_blank(*f)).collect()
    }

    /// Values in column order.
    pub fn to_row(&self) -> Vec<String> {
        self.values.to_vec()
    }

    pub fn iter(&self) -> impl Iterator<Item = (Field, &str)> {
        Field::ALL.into_iter().map(move |f| (f, self.get(f)))
    }

    /// Apply `f` to every value in place.
    pub fn map_values(&mut self, f: impl Fn(&str) -> String) {
        for value in self.values.iter_mut() {
            *value = f(value);
        }
    }
}

impl Serialize for FieldRecord {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(9))?;
        for (field, value) in self.iter() {
            map.serialize_entry(field.as_str(), value)?;
        }
        map.end()
    }
}

// ═══════════════════════════════════════════
// Candidates
// ═══════════════════════════════════════════

/// Disposition of a candidate in the ledger.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CandidateStatus {
    Ok,
    Skip,
    Candidate,
    Adjust,
    Info,
    Warn,
}

impl CandidateStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Ok => "OK",
            Self::Skip => "SKIP",
            Self::Candidate => "CANDIDATE",
            Self::Adjust => "ADJUST",
            Self::Info => "INFO",
            Self::Warn => "WARN",
        }
    }
}

/// One attempted value for a field.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Candidate {
    pub field: Field,
    pub source: String,
    pub value: String,
    /// Ordinal score, typically 0..=125. Only meaningful relative to other
    /// candidates for the same field.
    pub score: i32,
    pub status: CandidateStatus,
    pub reason: String,
}

/// Result of running a single strategy.
#[derive(Debug, Clone, PartialEq)]
pub enum Outcome {
    Found(String),
    Rejected { value: String, reason: &'static str },
    Missing,
}

impl From<Option<String>> for Outcome {
    fn from(value: Option<String>) -> Self {
        match value {
            Some(v) if !v.trim().is_empty() => Outcome::Found(v),
            _ => Outcome::Missing,
        }
    }
}

impl From<String> for Outcome {
    fn from(value: String) -> Self {
        Some(value).into()
    }
}

/// A value together with the strategy that produced it.
#[derive(Debug, Clone, PartialEq)]
pub struct Scored {
    pub value: String,
    pub source: String,
    pub score: i32,
}

impl Scored {
    pub fn new(value: impl Into<String>, source: impl Into<String>, score: i32) -> Self {
        Self {
            value: value.into(),
            source: source.into(),
            score,
        }
    }
}

/// Append-only audit trail of every candidate considered for every field.
#[derive(Debug, Clone, Default, Serialize)]
pub struct CandidateLedger {
    entries: BTreeMap<Field, Vec<Candidate>>,
    warnings: Vec<String>,
}

impl CandidateLedger {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(
        &mut self,
        field: Field,
        source: impl Into<String>,
        value: impl Into<String>,
        score: i32,
        status: CandidateStatus,
        reason: impl Into<String>,
    ) {
        let candidate = Candidate {
            field,
            source: source.into(),
            value: value.into(),
            score,
            status,
            reason: reason.into(),
        };
        tracing::debug!(
            field = field.as_str(),
            source = %candidate.source,
            score = candidate.score,
            status = candidate.status.as_str(),
            "candidate"
        );
        self.entries.entry(field).or_default().push(candidate);
    }

    /// Record an accepted candidate.
    pub fn accept(&mut self, field: Field, source: impl Into<String>, value: impl Into<String>, score: i32) {
        self.push(field, source, value, score, CandidateStatus::Ok, "");
    }

    /// Record a rejected candidate.
    pub fn reject(
        &mut self,
        field: Field,
        source: impl Into<String>,
        value: impl Into<String>,
        reason: impl Into<String>,
    ) {
        self.push(field, source, value, 0, CandidateStatus::Skip, reason);
    }

    pub fn warn(&mut self, message: impl Into<String>) {
        self.warnings.push(message.into());
    }

    pub fn warnings(&self) -> &[String] {
        &self.warnings
    }

    pub fn candidates(&self, field: Field) -> &[Candidate] {
        self.entries.get(&field).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Highest-scoring accepted candidate; ties go to the earliest recorded.
    pub fn best(&self, field: Field) -> Option<&Candidate> {
        let mut best: Option<&Candidate> = None;
        for cand in self.candidates(field) {
            if cand.status != CandidateStatus::Ok {
                continue;
            }
            if best.map_or(true, |b| cand.score > b.score) {
                best = Some(cand);
            }
        }
        best
    }

    /// Record a post-hoc repair of the current winning value. An empty
    /// value clears the field.
    pub fn adjust(
        &mut self,
        field: Field,
        source: impl Into<String>,
        value: impl Into<String>,
        reason: impl Into<String>,
    ) {
        self.push(field, source, value, 0, CandidateStatus::Adjust, reason);
    }

    /// Winning value for a field, or empty. Adjustments recorded after the
    /// winner rewrite it in order.
    pub fn resolve(&self, field: Field) -> String {
        let entries = self.candidates(field);
        let winner = self
            .best(field)
            .and_then(|b| entries.iter().position(|c| std::ptr::eq(c, b)));
        let (mut value, from) = match winner {
            Some(idx) => (entries[idx].value.clone(), idx + 1),
            None => (String::new(), 0),
        };
        for cand in &entries[from..] {
            if cand.status == CandidateStatus::Adjust {
                value = cand.value.clone();
            }
        }
        value
    }

    /// Build a record from the resolved value of every field.
    pub fn to_record(&self) -> FieldRecord {
        let mut rec = FieldRecord::new();
        for field in Field::ALL {
            rec.set(field, self.resolve(field));
        }
        rec
    }

    pub fn has_accepted(&self, field: Field) -> bool {
        self.best(field).is_some()
    }

    /// Winning source label per field, for fields that have one.
    pub fn sources(&self) -> BTreeMap<Field, String> {
        Field::ALL
            .into_iter()
            .filter_map(|f| self.best(f).map(|c| (f, c.source.clone())))
            .collect()
    }

    /// Start a priority cascade for `field`.
    pub fn cascade(&mut self, field: Field) -> Cascade<'_> {
        Cascade {
            ledger: self,
            field,
            settled: false,
        }
    }
}

// ═══════════════════════════════════════════
// Cascade
// ═══════════════════════════════════════════

/// Ordered strategy runner for one field.
///
/// Each `attempt` runs only while no earlier attempt in this cascade has
/// produced an accepted value. Every outcome is written to the ledger.
pub struct Cascade<'a> {
    ledger: &'a mut CandidateLedger,
    field: Field,
    settled: bool,
}

impl Cascade<'_> {
    pub fn attempt<O, F>(&mut self, source: &str, score: i32, strategy: F) -> &mut Self
    where
        O: Into<Outcome>,
        F: FnOnce() -> O,
    {
        if self.settled {
            return self;
        }
        match strategy().into() {
            Outcome::Found(value) => {
                self.ledger.accept(self.field, source, value, score);
                self.settled = true;
            }
            Outcome::Rejected { value, reason } => {
                self.ledger.reject(self.field, source, value, reason);
            }
            Outcome::Missing => {}
        }
        self
    }

    /// Like `attempt`, for strategies that pick their own source label and
    /// score (a block parser that knows whether it found a ZIP, say).
    pub fn attempt_scored<F>(&mut self, strategy: F) -> &mut Self
    where
        F: FnOnce() -> Option<Scored>,
    {
        if self.settled {
            return self;
        }
        if let Some(found) = strategy().filter(|s| !s.value.trim().is_empty()) {
            self.ledger.accept(self.field, found.source, found.value, found.score);
            self.settled = true;
        }
        self
    }

    pub fn is_settled(&self) -> bool {
        self.settled
    }

    /// Value of the best accepted candidate for the field.
    pub fn resolve(&self) -> String {
        self.ledger.resolve(self.field)
    }
}

// ═══════════════════════════════════════════
// Tests
// ═══════════════════════════════════════════

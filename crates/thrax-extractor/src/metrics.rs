//! Extraction statistics
//!
//! Counters for one extraction run: how many records were read, how many
//! produced rules, and why the rest were skipped.

use serde::{Deserialize, Serialize};

use thrax_core::{ExtractionError, SkipReason};

/// Per-run counters
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExtractionStats {
    /// Records read
    pub records: usize,
    /// Records that were extracted from (possibly yielding zero rules)
    pub extracted: usize,
    /// Rules emitted
    pub rules: usize,
    /// Records with fewer than three fields
    pub not_enough_fields: usize,
    /// Records with an empty source or target sentence
    pub empty_sentence: usize,
    /// Records whose alignment had no valid points
    pub empty_alignment: usize,
    /// Records whose alignment indexes past a sentence end
    pub inconsistent_alignment: usize,
}

impl ExtractionStats {
    pub fn record_success(&mut self, rules: usize) {
        self.records += 1;
        self.extracted += 1;
        self.rules += rules;
    }

    pub fn record_failure(&mut self, error: &ExtractionError) {
        self.records += 1;
        *self.counter_mut(error.reason()) += 1;
    }

    /// Records skipped for the given reason
    pub fn count(&self, reason: SkipReason) -> usize {
        match reason {
            SkipReason::NotEnoughFields => self.not_enough_fields,
            SkipReason::EmptySentence => self.empty_sentence,
            SkipReason::EmptyAlignment => self.empty_alignment,
            SkipReason::InconsistentAlignment => self.inconsistent_alignment,
        }
    }

    fn counter_mut(&mut self, reason: SkipReason) -> &mut usize {
        match reason {
            SkipReason::NotEnoughFields => &mut self.not_enough_fields,
            SkipReason::EmptySentence => &mut self.empty_sentence,
            SkipReason::EmptyAlignment => &mut self.empty_alignment,
            SkipReason::InconsistentAlignment => &mut self.inconsistent_alignment,
        }
    }

    pub fn skipped(&self) -> usize {
        self.records - self.extracted
    }

    /// Fraction of records skipped (0.0 for an empty run)
    pub fn skip_rate(&self) -> f32 {
        if self.records == 0 {
            0.0
        } else {
            self.skipped() as f32 / self.records as f32
        }
    }

    /// Average rules per extracted record
    pub fn rules_per_record(&self) -> f32 {
        if self.extracted == 0 {
            0.0
        } else {
            self.rules as f32 / self.extracted as f32
        }
    }

    /// Fold another run's counters into this one
    pub fn merge(&mut self, other: &ExtractionStats) {
        self.records += other.records;
        self.extracted += other.extracted;
        self.rules += other.rules;
        self.not_enough_fields += other.not_enough_fields;
        self.empty_sentence += other.empty_sentence;
        self.empty_alignment += other.empty_alignment;
        self.inconsistent_alignment += other.inconsistent_alignment;
    }

    /// Human-readable summary
    pub fn report(&self) -> String {
        let mut report = String::new();
        report.push_str("=== Extraction Report ===\n\n");
        report.push_str(&format!("Records:   {}\n", self.records));
        report.push_str(&format!("Extracted: {}\n", self.extracted));
        report.push_str(&format!(
            "Rules:     {} ({:.2} per record)\n",
            self.rules,
            self.rules_per_record()
        ));
        report.push_str(&format!(
            "Skipped:   {} ({:.1}%)\n",
            self.skipped(),
            self.skip_rate() * 100.0
        ));

        let reasons = [
            SkipReason::NotEnoughFields,
            SkipReason::EmptySentence,
            SkipReason::EmptyAlignment,
            SkipReason::InconsistentAlignment,
        ];
        for reason in reasons {
            let count = self.count(reason);
            if count > 0 {
                report.push_str(&format!("  {}: {}\n", reason, count));
            }
        }
        report
    }
}

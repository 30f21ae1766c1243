// Composekey Sequence Matcher
// Decides whether a pending sequence is complete, extendable or invalid

use crate::table::{GenericSequences, SequenceTable};
use crate::KeySequence;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MatchOptions {
    pub case_insensitive: bool,
    pub swap_on_invalid: bool,
}

/// Which rule resolved a sequence
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MatchKind {
    Exact,
    Generic,
    Swapped,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MatchOutcome {
    /// Emit `output`; `sequence` is what was matched, which differs from
    /// the typed keys for swapped pairs
    Resolved {
        output: String,
        sequence: KeySequence,
        kind: MatchKind,
    },
    /// Keep collecting keys
    Pending,
    Invalid,
}

/// Evaluate `sequence` once with exact case and, if enabled, once more
/// case-folded. Generic sequences only match with exact case.
pub fn evaluate(
    sequence: &KeySequence,
    table: &SequenceTable,
    generic: &GenericSequences,
    options: MatchOptions,
) -> MatchOutcome {
    let passes: &[bool] = if options.case_insensitive {
        &[false, true]
    } else {
        &[false]
    };

    for &ignore_case in passes {
        if let Some(output) = table.result(sequence, ignore_case) {
            return MatchOutcome::Resolved {
                output: output.to_string(),
                sequence: sequence.clone(),
                kind: MatchKind::Exact,
            };
        }

        if table.is_valid_prefix(sequence, ignore_case) {
            return MatchOutcome::Pending;
        }

        if !ignore_case {
            if generic.is_prefix(sequence) {
                return MatchOutcome::Pending;
            }
            if let Some(output) = generic.resolve(sequence) {
                return MatchOutcome::Resolved {
                    output,
                    sequence: sequence.clone(),
                    kind: MatchKind::Generic,
                };
            }
        }

        if options.swap_on_invalid {
            if let Some(swapped) = sequence.swapped() {
                if let Some(output) = table.result(&swapped, ignore_case) {
                    return MatchOutcome::Resolved {
                        output: output.to_string(),
                        sequence: swapped,
                        kind: MatchKind::Swapped,
                    };
                }
            }
        }
    }

    MatchOutcome::Invalid
}

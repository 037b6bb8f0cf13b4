//! Flat table export of the trial log.

use attend_core::LogRecord;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ExportError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

pub const CSV_COLUMNS: [&str; 19] = [
    "trialIndex",
    "block",
    "condition",
    "cueLabel",
    "correctAnswer",
    "choice",
    "correct",
    "rtMs",
    "cueTimeRelMs",
    "minuteBin",
    "soaMs",
    "eventType",
    "eventSalience",
    "backgroundLevel",
    "trialAfterEvent",
    "anticipatory",
    "perseveration",
    "sameAsPrevChoice",
    "omission",
];

fn flag(value: bool) -> String {
    let cell = if value { "1" } else { "0" };
    cell.to_string()
}

fn opt<T, F: FnOnce(T) -> String>(value: Option<T>, f: F) -> String {
    value.map(f).unwrap_or_default()
}

fn row(record: &LogRecord) -> Vec<String> {
    vec![
        record.trial_index.to_string(),
        record.block.to_string(),
        record.condition.to_string(),
        record.cue_label.to_string(),
        record.correct_answer.to_string(),
        opt(record.choice, |c| c.to_string()),
        opt(record.correct, flag),
        opt(record.rt_ms, |rt| format!("{}", rt.round() as i64)),
        format!("{}", record.cue_time_rel_ms.round() as i64),
        record.minute_bin.to_string(),
        opt(record.soa_ms, |soa| soa.to_string()),
        record.event_type.as_str().to_string(),
        record.event_salience.as_str().to_string(),
        opt(record.background_level, |level| level.to_string()),
        record.trial_after_event.to_string(),
        opt(record.anticipatory, flag),
        opt(record.perseveration, flag),
        opt(record.same_as_prev_choice, flag),
        flag(record.omission),
    ]
}

/// Header plus one line per record, newline-terminated.
pub fn to_csv(records: &[LogRecord]) -> String {
    let mut csv = CSV_COLUMNS.join(",");
    csv.push('\n');
    for record in records {
        let line = row(record)
            .iter()
            .map(|field| escape_csv(field))
            .collect::<Vec<_>>()
            .join(",");
        csv.push_str(&line);
        csv.push('\n');
    }
    csv
}

fn escape_csv(value: &str) -> String {
    let needs_quotes = value.contains(',') || value.contains('"') || value.contains('\n');
    if needs_quotes {
        let escaped = value.replace('"', "\"\"");
        format!("\"{escaped}\"")
    } else {
        value.to_string()
    }
}

pub fn write_csv<P: AsRef<Path>>(path: P, records: &[LogRecord]) -> Result<(), ExportError> {
    let mut writer = BufWriter::new(File::create(path)?);
    writer.write_all(to_csv(records).as_bytes())?;
    writer.flush()?;
    Ok(())
}

pub fn write_json<P: AsRef<Path>>(path: P, records: &[LogRecord]) -> Result<(), ExportError> {
    let file = File::create(path)?;
    serde_json::to_writer_pretty(BufWriter::new(file), records)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use attend_core::{
        Block, Choice, Condition, CueLabel, Outcome, ResponseMetrics, Salience, SideEventType,
        Trial, TrialPhase,
    };

    fn capture_trial() -> Trial {
        Trial {
            index: 2,
            block: Block::C,
            condition: Condition::C1,
            cue_label: CueLabel::Plus,
            opened_ns: 125_000_000_000,
            cue_onset_ns: 125_000_000_000,
            side_event: SideEventType::CaptureSound,
            salience: Salience::Familiar,
            soa_ms: Some(300),
            side_event_ns: Some(125_300_000_000),
            background: None,
            trial_after_event: 0,
            phase: TrialPhase::Closed(Outcome::Responded),
        }
    }

    #[test]
    fn answered_row_fills_every_column() {
        let metrics = ResponseMetrics {
            choice: Choice::Minus,
            correct: false,
            rt_ms: 412.6,
            anticipatory: false,
            perseveration: true,
            same_as_prev_choice: true,
        };
        let record = LogRecord::from_trial(&capture_trial(), 0, Some(metrics));
        let csv = to_csv(&[record]);
        let mut lines = csv.lines();
        assert_eq!(lines.next().unwrap().split(',').count(), CSV_COLUMNS.len());
        assert_eq!(
            lines.next().unwrap(),
            "2,C,C1,PLUS,+,-,0,413,125000,2,300,capture_sound,familiar,,0,0,1,1,0"
        );
        assert!(lines.next().is_none());
    }

    #[test]
    fn omission_row_leaves_response_cells_blank() {
        let mut trial = capture_trial();
        trial.phase = TrialPhase::Closed(Outcome::Omitted);
        let record = LogRecord::from_trial(&trial, 0, None);
        let csv = to_csv(&[record]);
        let row = csv.lines().nth(1).unwrap();
        let cells: Vec<_> = row.split(',').collect();
        for column in ["choice", "correct", "rtMs", "anticipatory", "perseveration", "sameAsPrevChoice"] {
            let idx = CSV_COLUMNS.iter().position(|c| *c == column).unwrap();
            assert_eq!(cells[idx], "", "{column} should be blank");
        }
        assert_eq!(cells[18], "1");
    }

    #[test]
    fn escape_quotes_fields_with_separators() {
        assert_eq!(escape_csv("a,b"), "\"a,b\"");
        assert_eq!(escape_csv("say \"hi\""), "\"say \"\"hi\"\"\"");
        assert_eq!(escape_csv("B1_low"), "B1_low");
    }
}

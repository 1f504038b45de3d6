use retrocue_core::TrialRecord;
use std::fs::{File, OpenOptions};
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};
use tracing::debug;

/// Destination of trial rows. Each appended row must survive a crash of the
/// process right after `append` returns.
pub trait RecordSink {
    fn append(&mut self, record: &TrialRecord) -> io::Result<()>;
    fn flush(&mut self) -> io::Result<()>;
}

/// One JSON object per line, flushed per row.
#[derive(Debug)]
pub struct JsonLinesWriter {
    path: PathBuf,
    out: BufWriter<File>,
    rows: usize,
}

impl JsonLinesWriter {
    /// Opens `path` for appending, creating parent directories as needed.
    pub fn open(path: impl AsRef<Path>) -> io::Result<Self> {
        let path = path.as_ref().to_path_buf();
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let file = OpenOptions::new().create(true).append(true).open(&path)?;
        debug!(path = %path.display(), "opened record file");
        Ok(Self {
            path,
            out: BufWriter::new(file),
            rows: 0,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn rows(&self) -> usize {
        self.rows
    }
}

impl RecordSink for JsonLinesWriter {
    fn append(&mut self, record: &TrialRecord) -> io::Result<()> {
        serde_json::to_writer(&mut self.out, record)?;
        self.out.write_all(b"\n")?;
        self.out.flush()?;
        self.rows += 1;
        Ok(())
    }

    fn flush(&mut self) -> io::Result<()> {
        self.out.flush()?;
        self.out.get_ref().sync_data()
    }
}

impl RecordSink for Vec<TrialRecord> {
    fn append(&mut self, record: &TrialRecord) -> io::Result<()> {
        self.push(record.clone());
        Ok(())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl<W: RecordSink + ?Sized> RecordSink for &mut W {
    fn append(&mut self, record: &TrialRecord) -> io::Result<()> {
        (**self).append(record)
    }

    fn flush(&mut self) -> io::Result<()> {
        (**self).flush()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand::rngs::StdRng;
    use retrocue_core::scoring::score;
    use retrocue_core::trigger::encode;
    use retrocue_core::{
        Condition, FrameLabel, Position, ResponseRecord, TargetItem, TrialOutcome, TrialSpec,
    };

    fn record(trial_number: usize) -> TrialRecord {
        let condition = Condition {
            target_item: TargetItem::Second,
            cue_informative: true,
            locations: [Position::Left, Position::Right],
        };
        let spec = TrialSpec::draw(&condition, (500, 800), &mut StdRng::seed_from_u64(8));
        let outcome = TrialOutcome {
            condition_code: encode(
                FrameLabel::StimulusOnset1,
                spec.locations,
                spec.target_item,
                spec.retrocue,
            ),
            response: ResponseRecord::new(
                300.0,
                700.0,
                spec.target_hue,
                0,
                score(spec.target_hue, spec.target_hue),
            ),
            timing_faults: Vec::new(),
        };
        TrialRecord::new(trial_number, 1, (0.0, 4000.0), &spec, &outcome)
    }

    #[test]
    fn rows_are_on_disk_after_append() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested/data.jsonl");
        let mut writer = JsonLinesWriter::open(&path).unwrap();
        writer.append(&record(1)).unwrap();
        writer.append(&record(2)).unwrap();

        // Read back without dropping or flushing the writer.
        let text = std::fs::read_to_string(&path).unwrap();
        let rows: Vec<serde_json::Value> = text
            .lines()
            .map(|line| serde_json::from_str(line).unwrap())
            .collect();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[1]["trial_number"], 2);
        assert_eq!(rows[0]["condition_code"], "14");
        assert_eq!(writer.rows(), 2);
    }

    #[test]
    fn reopening_appends() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("data.jsonl");
        JsonLinesWriter::open(&path)
            .unwrap()
            .append(&record(1))
            .unwrap();
        let mut writer = JsonLinesWriter::open(&path).unwrap();
        writer.append(&record(2)).unwrap();
        writer.flush().unwrap();
        assert_eq!(std::fs::read_to_string(&path).unwrap().lines().count(), 2);
    }
}

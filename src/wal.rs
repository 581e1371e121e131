use std::fs::{self, File, OpenOptions};
use std::io::{self, BufReader, BufWriter, Read, Write};
use std::path::{Path, PathBuf};

use crate::limits::MAX_RECORD_BYTES;
use crate::model::Event;

/// Bytes of framing around each payload: length prefix plus CRC.
const FRAME_OVERHEAD: u64 = 8;

/// Encode a single event to [len][bincode][crc32] format.
fn encode_event(writer: &mut impl Write, event: &Event) -> io::Result<()> {
    let payload =
        bincode::serialize(event).map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))?;
    if payload.len() > MAX_RECORD_BYTES {
        return Err(io::Error::new(io::ErrorKind::InvalidData, "journal record too large"));
    }
    let len = u32::try_from(payload.len())
        .map_err(|_| io::Error::new(io::ErrorKind::InvalidData, "journal record too large"))?;
    let crc = crc32fast::hash(&payload);
    writer.write_all(&len.to_le_bytes())?;
    writer.write_all(&payload)?;
    writer.write_all(&crc.to_le_bytes())?;
    Ok(())
}

/// Result of scanning a journal file.
#[derive(Debug)]
pub struct Replay {
    pub events: Vec<Event>,
    /// Byte length of the valid prefix; anything after it is a torn or
    /// corrupt tail.
    pub valid_len: u64,
}

/// Append-only booking journal.
///
/// Format per record: `[u32: len][bincode: Event][u32: crc32]`
/// - `len` is the byte length of the bincode payload (not including the CRC).
/// - Replay stops at the first truncated or corrupt record.
/// - Every append is fsynced before it returns.
/// - If a failed append cannot be rolled back, the journal refuses every
///   later append until it is reopened.
pub struct Journal {
    file: File,
    path: PathBuf,
    /// Bytes known to be durable and valid.
    committed: u64,
    records: u64,
    /// Set when the file may hold a partial frame past `committed`.
    poisoned: bool,
}

impl Journal {
    /// Open (or create) the journal at `path` and return the events it holds.
    /// A torn tail left by a crash is cut off so later appends stay readable.
    pub fn open(path: &Path) -> io::Result<(Self, Vec<Event>)> {
        let Replay { events, valid_len } = Self::replay(path)?;
        let file = OpenOptions::new().create(true).append(true).open(path)?;
        if file.metadata()?.len() > valid_len {
            tracing::warn!(path = %path.display(), valid_len, "truncating torn journal tail");
            file.set_len(valid_len)?;
            file.sync_all()?;
        }
        let journal = Self {
            file,
            path: path.to_path_buf(),
            committed: valid_len,
            records: events.len() as u64,
            poisoned: false,
        };
        Ok((journal, events))
    }

    /// Append one event and fsync. On failure the file is cut back to the
    /// last committed record, so a failed append never leaves a partial frame.
    pub fn append(&mut self, event: &Event) -> io::Result<()> {
        if self.poisoned {
            return Err(io::Error::other(
                "journal has an unrecovered partial record; reopen to repair",
            ));
        }
        let mut frame = Vec::new();
        encode_event(&mut frame, event)?;
        let written = self
            .file
            .write_all(&frame)
            .and_then(|()| self.file.sync_data());
        if let Err(e) = written {
            let rollback = self.file.set_len(self.committed);
            return Err(self.settle_rollback(e, rollback));
        }
        self.committed += frame.len() as u64;
        self.records += 1;
        Ok(())
    }

    /// Record the outcome of cutting a failed append back to `committed`.
    /// A rollback that itself fails poisons the journal: anything appended
    /// after the partial frame would be dropped on the next replay.
    fn settle_rollback(&mut self, cause: io::Error, rollback: io::Result<()>) -> io::Error {
        if let Err(e) = rollback {
            tracing::error!(
                path = %self.path.display(),
                committed = self.committed,
                error = %e,
                "journal rollback failed, refusing further appends"
            );
            self.poisoned = true;
        }
        cause
    }

    pub fn is_poisoned(&self) -> bool {
        self.poisoned
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Valid records currently in the file.
    pub fn records(&self) -> u64 {
        self.records
    }

    /// Replace the journal with `events`: write a temp file, fsync, rename
    /// over the journal, reopen. The whole file is rewritten; the last writer
    /// wins.
    pub fn compact(&mut self, events: &[Event]) -> io::Result<()> {
        let tmp_path = self.path.with_extension("journal.tmp");
        let file = File::create(&tmp_path)?;
        let mut writer = BufWriter::new(file);
        for event in events {
            encode_event(&mut writer, event)?;
        }
        writer.flush()?;
        writer.get_ref().sync_all()?;
        drop(writer);

        fs::rename(&tmp_path, &self.path)?;
        self.file = OpenOptions::new().create(true).append(true).open(&self.path)?;
        self.committed = self.file.metadata()?.len();
        self.records = events.len() as u64;
        self.poisoned = false;
        Ok(())
    }

    /// Read every valid event from disk. A missing file is an empty journal.
    pub fn replay(path: &Path) -> io::Result<Replay> {
        let file = match File::open(path) {
            Ok(f) => f,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                return Ok(Replay {
                    events: Vec::new(),
                    valid_len: 0,
                });
            }
            Err(e) => return Err(e),
        };
        let mut reader = BufReader::new(file);
        let mut events = Vec::new();
        let mut valid_len = 0u64;

        loop {
            let mut len_buf = [0u8; 4];
            match reader.read_exact(&mut len_buf) {
                Ok(()) => {}
                Err(e) if e.kind() == io::ErrorKind::UnexpectedEof => break,
                Err(e) => return Err(e),
            }
            let len = u32::from_le_bytes(len_buf) as usize;
            if len > MAX_RECORD_BYTES {
                tracing::warn!(path = %path.display(), len, valid_len, "oversized journal record length");
                break;
            }

            let mut payload = vec![0u8; len];
            match reader.read_exact(&mut payload) {
                Ok(()) => {}
                Err(e) if e.kind() == io::ErrorKind::UnexpectedEof => break, // truncated
                Err(e) => return Err(e),
            }

            let mut crc_buf = [0u8; 4];
            match reader.read_exact(&mut crc_buf) {
                Ok(()) => {}
                Err(e) if e.kind() == io::ErrorKind::UnexpectedEof => break, // truncated
                Err(e) => return Err(e),
            }
            if u32::from_le_bytes(crc_buf) != crc32fast::hash(&payload) {
                break;
            }

            match bincode::deserialize::<Event>(&payload) {
                Ok(event) => events.push(event),
                Err(_) => break,
            }
            valid_len += len as u64 + FRAME_OVERHEAD;
        }

        Ok(Replay { events, valid_len })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Category, LedgerEntry, Reservation, ReservationStatus, Span, hm};
    use chrono::NaiveDate;
    use rust_decimal::Decimal;
    use ulid::Ulid;

    fn tmp_path(name: &str) -> PathBuf {
        let dir = std::env::temp_dir().join("deskbook_test_journal");
        fs::create_dir_all(&dir).unwrap();
        let path = dir.join(name);
        let _ = fs::remove_file(&path);
        path
    }

    fn created(start: u16, end: u16) -> Event {
        Event::ReservationCreated {
            reservation: Reservation {
                id: Ulid::new(),
                owner_id: "u1".into(),
                resource_id: "A-01-01".into(),
                date: NaiveDate::from_ymd_opt(2024, 3, 4).unwrap(),
                span: Span::new(start, end),
                status: ReservationStatus::Active,
                price_basis: Decimal::new(1500, 2),
            },
        }
    }

    fn charge() -> Event {
        Event::LedgerAppended {
            entry: LedgerEntry {
                id: Ulid::new(),
                owner_id: "u1".into(),
                category: Category::ResourceUsage,
                amount: Decimal::new(3000, 2),
                date: NaiveDate::from_ymd_opt(2024, 3, 4).unwrap(),
                note: "desk".into(),
                correlation_id: None,
            },
        }
    }

    #[test]
    fn append_and_replay() {
        let path = tmp_path("append_and_replay.journal");
        let events = vec![
            created(hm(9, 0), hm(11, 0)),
            Event::ReservationReleased { id: Ulid::new() },
            charge(),
        ];

        {
            let (mut journal, replayed) = Journal::open(&path).unwrap();
            assert!(replayed.is_empty());
            for e in &events {
                journal.append(e).unwrap();
            }
            assert_eq!(journal.records(), 3);
        }

        let replay = Journal::replay(&path).unwrap();
        assert_eq!(replay.events, events);
        assert_eq!(replay.valid_len, fs::metadata(&path).unwrap().len());

        let _ = fs::remove_file(&path);
    }

    #[test]
    fn replay_handles_truncation() {
        let path = tmp_path("truncation.journal");
        let event = created(hm(9, 0), hm(9, 30));

        {
            let (mut journal, _) = Journal::open(&path).unwrap();
            journal.append(&event).unwrap();
        }
        {
            let mut f = OpenOptions::new().append(true).open(&path).unwrap();
            f.write_all(&[0u8; 6]).unwrap(); // partial length + some bytes
        }

        let replay = Journal::replay(&path).unwrap();
        assert_eq!(replay.events, vec![event]);
        assert!(replay.valid_len < fs::metadata(&path).unwrap().len());

        let _ = fs::remove_file(&path);
    }

    #[test]
    fn open_cuts_torn_tail_so_new_appends_survive() {
        let path = tmp_path("torn_tail.journal");
        let first = created(hm(8, 0), hm(9, 0));
        let second = created(hm(10, 0), hm(11, 0));

        {
            let (mut journal, _) = Journal::open(&path).unwrap();
            journal.append(&first).unwrap();
        }
        {
            let mut f = OpenOptions::new().append(true).open(&path).unwrap();
            f.write_all(&[0xFF; 3]).unwrap();
        }
        {
            let (mut journal, replayed) = Journal::open(&path).unwrap();
            assert_eq!(replayed, vec![first.clone()]);
            journal.append(&second).unwrap();
        }

        let replay = Journal::replay(&path).unwrap();
        assert_eq!(replay.events, vec![first, second]);

        let _ = fs::remove_file(&path);
    }

    #[test]
    fn replay_nonexistent_file() {
        let path = tmp_path("nonexistent.journal");
        let replay = Journal::replay(&path).unwrap();
        assert!(replay.events.is_empty());
        assert_eq!(replay.valid_len, 0);
    }

    #[test]
    fn replay_corrupt_crc() {
        let path = tmp_path("corrupt_crc.journal");
        let event = Event::ReservationReleased { id: Ulid::new() };

        {
            let payload = bincode::serialize(&event).unwrap();
            let len = payload.len() as u32;
            let bad_crc: u32 = 0xDEADBEEF;

            let mut f = File::create(&path).unwrap();
            f.write_all(&len.to_le_bytes()).unwrap();
            f.write_all(&payload).unwrap();
            f.write_all(&bad_crc.to_le_bytes()).unwrap();
        }

        let replay = Journal::replay(&path).unwrap();
        assert!(replay.events.is_empty());
        assert_eq!(replay.valid_len, 0);

        let _ = fs::remove_file(&path);
    }

    #[test]
    fn compact_shrinks_journal() {
        let path = tmp_path("compact_shrink.journal");
        let keep = created(hm(9, 0), hm(10, 0));

        {
            let (mut journal, _) = Journal::open(&path).unwrap();
            journal.append(&keep).unwrap();
            for _ in 0..10 {
                let churn = created(hm(12, 0), hm(13, 0));
                let Event::ReservationCreated { reservation } = &churn else {
                    unreachable!()
                };
                let id = reservation.id;
                journal.append(&churn).unwrap();
                journal.append(&Event::ReservationReleased { id }).unwrap();
            }
        }

        let before = fs::metadata(&path).unwrap().len();
        {
            let (mut journal, replayed) = Journal::open(&path).unwrap();
            assert_eq!(replayed.len(), 21);
            assert_eq!(journal.records(), 21);
            journal.compact(std::slice::from_ref(&keep)).unwrap();
            assert_eq!(journal.records(), 1);
        }
        let after = fs::metadata(&path).unwrap().len();
        assert!(after < before, "compacted journal should be smaller: {after} < {before}");

        let replay = Journal::replay(&path).unwrap();
        assert_eq!(replay.events, vec![keep]);

        let _ = fs::remove_file(&path);
    }

    #[test]
    fn compact_then_append() {
        let path = tmp_path("compact_append.journal");
        let snapshot = vec![created(hm(9, 0), hm(10, 0))];
        let next = charge();

        {
            let (mut journal, _) = Journal::open(&path).unwrap();
            journal.append(&snapshot[0]).unwrap();
            journal.compact(&snapshot).unwrap();
            journal.append(&next).unwrap();
            assert_eq!(journal.records(), 2);
        }

        let replay = Journal::replay(&path).unwrap();
        assert_eq!(replay.events, vec![snapshot[0].clone(), next]);

        let _ = fs::remove_file(&path);
    }

    #[test]
    fn failed_rollback_poisons_appends() {
        let path = tmp_path("poisoned.journal");
        let first = created(hm(9, 0), hm(10, 0));
        {
            let (mut journal, _) = Journal::open(&path).unwrap();
            journal.append(&first).unwrap();
            let len = fs::metadata(&path).unwrap().len();

            let err = journal.settle_rollback(
                io::Error::other("disk full"),
                Err(io::Error::other("read-only filesystem")),
            );
            assert_eq!(err.to_string(), "disk full");
            assert!(journal.is_poisoned());

            assert!(journal.append(&charge()).is_err());
            assert_eq!(journal.records(), 1);
            assert_eq!(fs::metadata(&path).unwrap().len(), len);
        }

        // reopening repairs the tail and clears the flag
        let (mut journal, replayed) = Journal::open(&path).unwrap();
        assert_eq!(replayed, vec![first]);
        assert!(!journal.is_poisoned());
        journal.append(&charge()).unwrap();
        assert_eq!(Journal::replay(&path).unwrap().events.len(), 2);

        let _ = fs::remove_file(&path);
    }

    #[test]
    fn successful_rollback_keeps_journal_usable() {
        let path = tmp_path("rolled_back.journal");
        let (mut journal, _) = Journal::open(&path).unwrap();
        journal.settle_rollback(io::Error::other("disk full"), Ok(()));
        assert!(!journal.is_poisoned());
        journal.append(&charge()).unwrap();
        assert_eq!(journal.records(), 1);

        let _ = fs::remove_file(&path);
    }

    #[test]
    fn compaction_clears_poison() {
        let path = tmp_path("poison_compact.journal");
        let keep = created(hm(9, 0), hm(10, 0));
        let (mut journal, _) = Journal::open(&path).unwrap();
        journal.append(&keep).unwrap();
        journal.settle_rollback(io::Error::other("disk full"), Err(io::Error::other("eio")));
        assert!(journal.is_poisoned());

        journal.compact(std::slice::from_ref(&keep)).unwrap();
        assert!(!journal.is_poisoned());
        journal.append(&charge()).unwrap();
        assert_eq!(Journal::replay(&path).unwrap().events.len(), 2);

        let _ = fs::remove_file(&path);
    }

    #[test]
    fn oversized_length_prefix_is_a_torn_tail() {
        let path = tmp_path("oversized_prefix.journal");
        let first = created(hm(9, 0), hm(9, 30));
        let good_len = {
            let (mut journal, _) = Journal::open(&path).unwrap();
            journal.append(&first).unwrap();
            fs::metadata(&path).unwrap().len()
        };
        {
            let mut f = OpenOptions::new().append(true).open(&path).unwrap();
            f.write_all(&u32::MAX.to_le_bytes()).unwrap();
            f.write_all(&[0xAB; 16]).unwrap();
        }

        let replay = Journal::replay(&path).unwrap();
        assert_eq!(replay.events, vec![first.clone()]);
        assert_eq!(replay.valid_len, good_len);

        let (mut journal, replayed) = Journal::open(&path).unwrap();
        assert_eq!(replayed, vec![first]);
        assert_eq!(fs::metadata(&path).unwrap().len(), good_len);
        journal.append(&charge()).unwrap();
        assert_eq!(Journal::replay(&path).unwrap().events.len(), 2);

        let _ = fs::remove_file(&path);
    }

    #[test]
    fn oversized_event_is_rejected_before_writing() {
        let path = tmp_path("oversized_event.journal");
        let (mut journal, _) = Journal::open(&path).unwrap();
        let Event::LedgerAppended { mut entry } = charge() else {
            unreachable!()
        };
        entry.note = "x".repeat(MAX_RECORD_BYTES + 1);

        let err = journal.append(&Event::LedgerAppended { entry }).unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::InvalidData);
        assert!(!journal.is_poisoned());
        assert_eq!(journal.records(), 0);
        assert_eq!(fs::metadata(&path).unwrap().len(), 0);

        let _ = fs::remove_file(&path);
    }
}

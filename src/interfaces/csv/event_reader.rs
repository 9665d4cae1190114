use crate::domain::event::{Event, UserInput};
use crate::domain::order::{Decision, UserId};
use crate::error::{DeskError, Result};
use serde::Deserialize;
use std::io::Read;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
enum EventKind {
    Text,
    Photo,
    File,
    Approve,
    Reject,
}

/// One row of an events file: `user,username,kind,payload`.
///
/// For `photo` the payload is a path to the image, for `approve`/`reject` it
/// is the review request id (the user column is ignored there).
#[derive(Debug, Deserialize)]
struct EventRecord {
    user: UserId,
    username: Option<String>,
    kind: EventKind,
    payload: Option<String>,
}

/// Reads a scripted stream of inbound events from a CSV source.
pub struct EventReader<R: Read> {
    reader: csv::Reader<R>,
    base_dir: PathBuf,
}

impl<R: Read> EventReader<R> {
    pub fn new(source: R) -> Self {
        let reader = csv::ReaderBuilder::new()
            .trim(csv::Trim::All)
            .flexible(true)
            .from_reader(source);
        Self {
            reader,
            base_dir: PathBuf::from("."),
        }
    }

    /// Directory relative photo paths are resolved against.
    pub fn with_base_dir<P: AsRef<Path>>(mut self, base_dir: P) -> Self {
        self.base_dir = base_dir.as_ref().to_path_buf();
        self
    }

    /// Lazily reads and converts events. A bad row yields an error and the
    /// iterator carries on with the next one.
    pub fn events(self) -> impl Iterator<Item = Result<Event>> {
        let base_dir = self.base_dir;
        self.reader
            .into_deserialize::<EventRecord>()
            .map(move |result| {
                result
                    .map_err(DeskError::from)
                    .and_then(|record| into_event(record, &base_dir))
            })
    }
}

fn into_event(record: EventRecord, base_dir: &Path) -> Result<Event> {
    let username = record.username.filter(|u| !u.is_empty());
    let payload = record.payload.unwrap_or_default();
    let message = |input| Event::Message {
        user: record.user,
        username: username.clone(),
        input,
    };

    match record.kind {
        EventKind::Text => Ok(message(UserInput::Text(payload))),
        EventKind::File => Ok(message(UserInput::Other)),
        EventKind::Photo => {
            let path = base_dir.join(&payload);
            let bytes = std::fs::read(&path).map_err(|e| {
                DeskError::ValidationError(format!("Cannot read photo {:?}: {}", path, e))
            })?;
            Ok(message(UserInput::Image(bytes)))
        }
        EventKind::Approve | EventKind::Reject => {
            let request_id = payload.parse().map_err(|_| {
                DeskError::ValidationError(format!("Bad request id {:?}", payload))
            })?;
            let decision = if record.kind == EventKind::Approve {
                Decision::Approve
            } else {
                Decision::Reject
            };
            Ok(Event::Decision {
                request_id,
                decision,
            })
        }
    }
}

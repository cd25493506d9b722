//! Persistent "already downloaded" flags.
//!
//! Flags live in a small JSON object keyed `download_<id>_<TYPE>`. Nothing
//! in decoding or assembly consults them; they only drive what a front end
//! shows next to a book.

use std::collections::BTreeMap;
use std::fs;
use std::io::{self, Write};
use std::ops::Deref;
use std::path::{Path, PathBuf};
use std::sync::mpsc::{self, Receiver, Sender};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};

use crate::error::{Error, Result};
use crate::model::BookType;
use crate::pipeline::persist_atomically;

/// Download flags backed by a JSON file.
pub struct DownloadTracker {
    path: PathBuf,
    state: Mutex<State>,
}

#[derive(Default)]
struct State {
    flags: BTreeMap<String, bool>,
    observers: Vec<Observer>,
}

struct Observer {
    key: String,
    last: bool,
    tx: Sender<bool>,
    alive: Weak<()>,
}

impl Observer {
    fn is_alive(&self) -> bool {
        self.alive.strong_count() > 0
    }
}

/// Updates for one flag. Dropping it unsubscribes.
pub struct FlagWatch {
    rx: Receiver<bool>,
    _alive: Arc<()>,
}

impl Deref for FlagWatch {
    type Target = Receiver<bool>;

    fn deref(&self) -> &Receiver<bool> {
        &self.rx
    }
}

/// Storage key of a book rendition's flag.
pub fn status_key(book: BookType) -> String {
    format!("download_{}_{}", book.book_id(), book.name())
}

impl DownloadTracker {
    /// Open the tracker stored at `path`. A missing file means no flags set.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        let flags = match fs::read(&path) {
            Ok(bytes) if bytes.iter().all(u8::is_ascii_whitespace) => BTreeMap::new(),
            Ok(bytes) => serde_json::from_slice(&bytes).map_err(|source| Error::Tracker {
                path: path.clone(),
                source,
            })?,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                log::debug!("No status file at {}, starting empty", path.display());
                BTreeMap::new()
            }
            Err(source) => return Err(Error::ResourceUnavailable { path, source }),
        };

        Ok(Self {
            path,
            state: Mutex::new(State {
                flags,
                observers: Vec::new(),
            }),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn is_downloaded(&self, book: BookType) -> bool {
        self.lock().flags.get(&status_key(book)).copied().unwrap_or(false)
    }

    /// Set the flag for `book`, persist it, and notify observers if it
    /// changed.
    pub fn mark_downloaded(&self, book: BookType, downloaded: bool) -> Result<()> {
        let key = status_key(book);
        let mut state = self.lock();

        let previous = state.flags.insert(key.clone(), downloaded);
        if previous == Some(downloaded) {
            return Ok(());
        }

        let json = match serde_json::to_vec_pretty(&state.flags) {
            Ok(json) => json,
            Err(e) => {
                // Keep memory and disk in agreement
                restore(&mut state.flags, &key, previous);
                return Err(Error::Sink(e.into()));
            }
        };
        if let Err(e) = persist_atomically(&self.path, |file| file.write_all(&json)) {
            restore(&mut state.flags, &key, previous);
            return Err(e);
        }
        log::debug!("Marked {key} = {downloaded}");

        state.observers.retain_mut(|observer| {
            if !observer.is_alive() {
                return false;
            }
            if observer.key != key || observer.last == downloaded {
                return true;
            }
            observer.last = downloaded;
            observer.tx.send(downloaded).is_ok()
        });
        Ok(())
    }

    /// Watch the flag for `book`.
    ///
    /// The current value arrives immediately; afterwards a value is sent
    /// only when the flag actually changes.
    pub fn observe(&self, book: BookType) -> FlagWatch {
        let key = status_key(book);
        let (tx, rx) = mpsc::channel();
        let alive = Arc::new(());
        let mut state = self.lock();
        state.observers.retain(Observer::is_alive);
        let current = state.flags.get(&key).copied().unwrap_or(false);

        if tx.send(current).is_ok() {
            state.observers.push(Observer {
                key,
                last: current,
                tx,
                alive: Arc::downgrade(&alive),
            });
        }
        FlagWatch { rx, _alive: alive }
    }

    fn lock(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

fn restore(flags: &mut BTreeMap<String, bool>, key: &str, previous: Option<bool>) {
    match previous {
        Some(value) => {
            flags.insert(key.to_string(), value);
        }
        None => {
            flags.remove(key);
        }
    }
}

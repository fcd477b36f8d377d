use std::fs::{File, OpenOptions};
use std::io::{BufRead, BufReader, BufWriter, Lines, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::BagError;
use crate::record::Record;

const FORMAT: &str = "vive-bag";
const VERSION: u32 = 1;

/// Заголовок — первая строка каждого bag-файла.
#[derive(Serialize, Deserialize)]
struct Header {
    format: String,
    version: u32,
}

impl Header {
    fn current() -> Self {
        Self { format: FORMAT.to_string(), version: VERSION }
    }

    fn check(line: &str) -> Result<(), String> {
        let header: Header = serde_json::from_str(line).map_err(|e| format!("bad header: {e}"))?;
        if header.format != FORMAT {
            return Err(format!("unknown format '{}'", header.format));
        }
        if header.version != VERSION {
            return Err(format!("unsupported version {}", header.version));
        }
        Ok(())
    }
}

// ════════════════════════════════════════════════════════════════
//  OpenMode
// ════════════════════════════════════════════════════════════════

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OpenMode {
    /// Создать или обрезать файл.
    Write,
    /// Сохранить существующие записи, дописывать после них.
    Append,
    /// Только чтение, для воспроизведения.
    Read,
}

enum Handle {
    Writer(BufWriter<File>),
    Reader(Lines<BufReader<File>>),
    Closed,
}

// ════════════════════════════════════════════════════════════════
//  LogStore
// ════════════════════════════════════════════════════════════════

/// Файловый лог записей с append-only семантикой.
///
/// Владеет файлом эксклюзивно. Файл освобождается в `close()` или в `Drop`,
/// так что любой путь выхода (ошибка, ранний break) закрывает его.
pub struct LogStore {
    path: PathBuf,
    mode: OpenMode,
    handle: Handle,
    iterated: bool,
}

impl LogStore {
    pub fn open(path: impl AsRef<Path>, mode: OpenMode) -> Result<Self, BagError> {
        match mode {
            OpenMode::Write => Self::open_for_write(path),
            OpenMode::Append => Self::open_for_append(path),
            OpenMode::Read => Self::open_for_read(path),
        }
    }

    pub fn open_for_write(path: impl AsRef<Path>) -> Result<Self, BagError> {
        let path = path.as_ref();
        let file = File::create(path).map_err(|e| BagError::storage(path, e))?;
        let mut writer = BufWriter::new(file);
        write_header(&mut writer).map_err(|e| BagError::storage(path, e))?;
        tracing::debug!(path = %path.display(), "bag opened for write");
        Ok(Self::with_handle(path, OpenMode::Write, Handle::Writer(writer)))
    }

    pub fn open_for_append(path: impl AsRef<Path>) -> Result<Self, BagError> {
        let path = path.as_ref();
        let meta = match std::fs::metadata(path) {
            Ok(m) => m,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Self::open_for_write(path),
            Err(e) => return Err(BagError::storage(path, e)),
        };
        if meta.is_dir() {
            return Err(BagError::storage(path, "is a directory"));
        }

        let file = OpenOptions::new()
            .read(true)
            .append(true)
            .open(path)
            .map_err(|e| BagError::storage(path, e))?;
        let mut writer = BufWriter::new(file);

        if meta.len() == 0 {
            write_header(&mut writer).map_err(|e| BagError::storage(path, e))?;
        } else {
            match check_existing(writer.get_mut(), path)? {
                Tail::Clean => {}
                Tail::MissingNewline => {
                    // Целая последняя запись без перевода строки: не склеивать с новой.
                    writer
                        .write_all(b"\n")
                        .and_then(|_| writer.flush())
                        .map_err(|e| BagError::storage(path, e))?;
                }
                Tail::Torn { keep } => {
                    // Запись оборвана на середине: отрезать хвост до последней целой строки.
                    tracing::warn!(
                        path = %path.display(),
                        dropped = meta.len() - keep,
                        "dropping torn record at end of bag"
                    );
                    writer.get_mut().set_len(keep).map_err(|e| BagError::storage(path, e))?;
                }
            }
        }

        tracing::debug!(path = %path.display(), bytes = meta.len(), "bag opened for append");
        Ok(Self::with_handle(path, OpenMode::Append, Handle::Writer(writer)))
    }

    pub fn open_for_read(path: impl AsRef<Path>) -> Result<Self, BagError> {
        let path = path.as_ref();
        if !path.is_file() {
            if path.exists() {
                return Err(BagError::storage(path, "not a regular file"));
            }
            return Err(BagError::NotFound { path: path.to_path_buf() });
        }

        let file = File::open(path).map_err(|e| BagError::storage(path, e))?;
        let mut lines = BufReader::new(file).lines();
        match lines.next() {
            Some(Ok(line)) => Header::check(&line).map_err(|e| BagError::storage(path, e))?,
            Some(Err(e)) => return Err(BagError::storage(path, e)),
            None => return Err(BagError::storage(path, "empty file")),
        }

        tracing::debug!(path = %path.display(), "bag opened for read");
        Ok(Self::with_handle(path, OpenMode::Read, Handle::Reader(lines)))
    }

    fn with_handle(path: &Path, mode: OpenMode, handle: Handle) -> Self {
        Self { path: path.to_path_buf(), mode, handle, iterated: false }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn mode(&self) -> OpenMode {
        self.mode
    }

    pub fn is_closed(&self) -> bool {
        matches!(self.handle, Handle::Closed)
    }

    /// Записать одну запись и сбросить её в ОС.
    ///
    /// Ошибка не портит store: вызывающий решает, продолжать ли запись.
    pub fn append(&mut self, record: &Record) -> Result<(), BagError> {
        let write_err = |source| BagError::Write { payload: record.payload.clone(), source };

        let Handle::Writer(writer) = &mut self.handle else {
            return Err(write_err(std::io::Error::other("bag is not open for writing")));
        };

        let mut line = serde_json::to_string(record).map_err(|e| write_err(e.into()))?;
        line.push('\n');
        writer
            .write_all(line.as_bytes())
            .and_then(|_| writer.flush())
            .map_err(write_err)
    }

    /// Ленивый проход по записям топика в порядке хранения.
    ///
    /// Повторно не запускается: второй вызов на том же handle ничего не
    /// вернёт, для нового прохода файл нужно открыть заново.
    pub fn messages(&mut self, topic: &str) -> Messages<'_> {
        let done = self.iterated;
        self.iterated = true;
        Messages { store: self, topic: topic.to_string(), line_no: 1, done }
    }

    /// Освободить файл. Повторный вызов ничего не делает.
    pub fn close(&mut self) {
        match std::mem::replace(&mut self.handle, Handle::Closed) {
            Handle::Writer(mut writer) => {
                if let Err(e) = writer.flush() {
                    tracing::warn!(path = %self.path.display(), error = %e, "flush on close failed");
                }
                tracing::debug!(path = %self.path.display(), "bag closed");
            }
            Handle::Reader(_) => tracing::debug!(path = %self.path.display(), "bag closed"),
            Handle::Closed => {}
        }
    }
}

impl Drop for LogStore {
    fn drop(&mut self) {
        self.close();
    }
}

impl std::fmt::Debug for LogStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LogStore")
            .field("path", &self.path)
            .field("mode", &self.mode)
            .field("closed", &self.is_closed())
            .finish()
    }
}

fn write_header(writer: &mut BufWriter<File>) -> std::io::Result<()> {
    let line = serde_json::to_string(&Header::current())?;
    writeln!(writer, "{line}")?;
    writer.flush()
}

/// Состояние конца существующего bag перед дозаписью.
#[derive(Debug, PartialEq, Eq)]
enum Tail {
    Clean,
    /// Последняя строка — целая запись без `\n`.
    MissingNewline,
    /// Последняя строка оборвана; `keep` — длина файла до неё.
    Torn { keep: u64 },
}

/// Проверить весь существующий файл перед дозаписью.
///
/// Битая строка в середине — ошибка: после неё дописанные записи были бы
/// недостижимы при чтении. Битой может быть только последняя строка без
/// `\n` (обрыв при записи), её отрезаем.
fn check_existing(file: &mut File, path: &Path) -> Result<Tail, BagError> {
    file.seek(SeekFrom::Start(0)).map_err(|e| BagError::storage(path, e))?;
    let mut reader = BufReader::new(&mut *file);
    let mut buf = Vec::new();
    let mut offset = 0u64;
    let mut line_no = 0usize;

    loop {
        buf.clear();
        let n = reader.read_until(b'\n', &mut buf).map_err(|e| BagError::storage(path, e))?;
        if n == 0 {
            return Ok(Tail::Clean);
        }
        line_no += 1;
        let terminated = buf.last() == Some(&b'\n');

        let checked = std::str::from_utf8(&buf)
            .map_err(|e| e.to_string())
            .and_then(|text| {
                let text = text.trim_end_matches(['\n', '\r']);
                if line_no == 1 {
                    Header::check(text)
                } else if text.trim().is_empty() {
                    Ok(())
                } else {
                    serde_json::from_str::<Record>(text).map(|_| ()).map_err(|e| e.to_string())
                }
            });

        match (checked, terminated) {
            (Ok(()), true) => {}
            (Ok(()), false) => return Ok(Tail::MissingNewline),
            (Err(_), false) if line_no > 1 => return Ok(Tail::Torn { keep: offset }),
            (Err(detail), _) if line_no == 1 => return Err(BagError::storage(path, detail)),
            (Err(detail), _) => return Err(BagError::corrupt(path, line_no, detail)),
        }
        offset += n as u64;
    }
}

// ════════════════════════════════════════════════════════════════
//  Messages
// ════════════════════════════════════════════════════════════════

/// Итератор записей одного топика. Первая ошибка разбора завершает проход.
pub struct Messages<'a> {
    store: &'a mut LogStore,
    topic: String,
    line_no: usize,
    done: bool,
}

impl Iterator for Messages<'_> {
    type Item = Result<Record, BagError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }
        let store = &mut *self.store;
        let Handle::Reader(lines) = &mut store.handle else {
            self.done = true;
            return None;
        };

        loop {
            let line = match lines.next() {
                Some(Ok(line)) => line,
                Some(Err(e)) => {
                    self.done = true;
                    return Some(Err(BagError::corrupt(&store.path, self.line_no + 1, e)));
                }
                None => {
                    self.done = true;
                    return None;
                }
            };
            self.line_no += 1;

            if line.trim().is_empty() {
                continue;
            }
            let record: Record = match serde_json::from_str(&line) {
                Ok(r) => r,
                Err(e) => {
                    self.done = true;
                    return Some(Err(BagError::corrupt(&store.path, self.line_no, e)));
                }
            };
            if record.topic != self.topic {
                continue;
            }
            return Some(Ok(record));
        }
    }
}

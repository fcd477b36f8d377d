use std::path::PathBuf;

#[derive(Debug, thiserror::Error)]
pub enum BagError {
    #[error(".bag file \"{}\" does not exist", path.display())]
    NotFound { path: PathBuf },

    #[error("could not open .bag file \"{}\": {detail}", path.display())]
    Storage { path: PathBuf, detail: String },

    /// Битая запись внутри файла; номер строки считается с 1, заголовок — строка 1.
    #[error("corrupt .bag file \"{}\" at line {line}: {detail}", path.display())]
    Corrupt { path: PathBuf, line: usize, detail: String },

    #[error("could not write message \"{payload}\" to bag: {source}")]
    Write {
        payload: String,
        #[source]
        source: std::io::Error,
    },
}

impl BagError {
    pub(crate) fn storage(path: &std::path::Path, detail: impl std::fmt::Display) -> Self {
        BagError::Storage { path: path.to_path_buf(), detail: detail.to_string() }
    }

    pub(crate) fn corrupt(path: &std::path::Path, line: usize, detail: impl std::fmt::Display) -> Self {
        BagError::Corrupt { path: path.to_path_buf(), line, detail: detail.to_string() }
    }

    /// Ошибка одной записи: сессию можно продолжать.
    pub fn is_recoverable(&self) -> bool {
        matches!(self, BagError::Write { .. })
    }
}

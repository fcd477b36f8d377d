use std::io::{BufRead, Write};
use std::path::Path;

use bag::OpenMode;

use crate::config::ExistingBag;
use crate::error::AppError;

const QUESTION: &str = ".bag file already exists. Would you like to clear it? ";

/// Спрашивать, пока ответ не станет одним из yes/y/no/n.
/// `true` — очистить файл.
pub fn ask_clear<R: BufRead, W: Write>(input: &mut R, output: &mut W) -> Result<bool, AppError> {
    loop {
        write!(output, "{QUESTION}")?;
        output.flush()?;

        let mut line = String::new();
        if input.read_line(&mut line)? == 0 {
            return Err(AppError::Config(
                "no answer on stdin; pass --overwrite or --append".into(),
            ));
        }
        match line.trim().to_lowercase().as_str() {
            "yes" | "y" => return Ok(true),
            "no" | "n" => return Ok(false),
            _ => continue,
        }
    }
}

/// Режим открытия bag для записи и сообщение оператору.
///
/// `ask` вызывается только если файл существует, а флагами решение не
/// задано.
pub fn resolve_open_mode(
    path: &Path,
    existing: Option<ExistingBag>,
    ask: impl FnOnce() -> Result<bool, AppError>,
) -> Result<(OpenMode, &'static str), AppError> {
    if !path.exists() {
        return Ok((OpenMode::Write, ".bag file created. Now recording..."));
    }
    let clear = match existing {
        Some(ExistingBag::Overwrite) => true,
        Some(ExistingBag::Append) => false,
        None => ask()?,
    };
    if clear {
        Ok((OpenMode::Write, "File cleared. Now recording..."))
    } else {
        Ok((OpenMode::Append, "Appending new data to file..."))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn answer(input: &str) -> (Result<bool, AppError>, String) {
        let mut out = Vec::new();
        let res = ask_clear(&mut input.as_bytes(), &mut out);
        (res, String::from_utf8(out).unwrap())
    }

    #[test]
    fn accepts_yes_and_no_variants() {
        assert!(answer("yes\n").0.unwrap());
        assert!(answer("  Y \n").0.unwrap());
        assert!(!answer("no\n").0.unwrap());
        assert!(!answer("N").0.unwrap());
    }

    #[test]
    fn repeats_until_valid_answer() {
        let (res, out) = answer("maybe\n\nsure\nn\n");
        assert!(!res.unwrap());
        assert_eq!(out.matches(QUESTION).count(), 4);
    }

    #[test]
    fn eof_is_config_error() {
        let (res, _) = answer("whatever\n");
        assert!(matches!(res, Err(AppError::Config(_))));
    }

    #[test]
    fn missing_file_is_created_without_asking() {
        let dir = tempfile::tempdir().unwrap();
        let (mode, _) = resolve_open_mode(&dir.path().join("new.bag"), None, || {
            panic!("must not ask for a missing file")
        })
        .unwrap();
        assert_eq!(mode, OpenMode::Write);
    }

    #[test]
    fn existing_file_follows_flags_or_answer() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("old.bag");
        std::fs::write(&path, "x").unwrap();
        let never = || -> Result<bool, AppError> { panic!("flag must win") };

        assert_eq!(resolve_open_mode(&path, Some(ExistingBag::Overwrite), never).unwrap().0, OpenMode::Write);
        assert_eq!(resolve_open_mode(&path, Some(ExistingBag::Append), never).unwrap().0, OpenMode::Append);
        assert_eq!(resolve_open_mode(&path, None, || Ok(true)).unwrap().0, OpenMode::Write);
        assert_eq!(resolve_open_mode(&path, None, || Ok(false)).unwrap().0, OpenMode::Append);
    }
}

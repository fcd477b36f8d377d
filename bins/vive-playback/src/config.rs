use std::path::PathBuf;

use clap::{Args, Parser, ValueEnum};
use serde::Deserialize;

use crate::error::AppError;

const AFTER_HELP: &str = "\
You may run this program as a stand-alone command or through a config file.
If a config file is used, you may specify a number of parameters there,
otherwise default values will be used.

The mode parameter should be one of \"record\" or \"play\".";

// ═══════════════════════════════════════════════════════════════
//  CLI args
// ═══════════════════════════════════════════════════════════════

#[derive(Parser, Debug)]
#[command(
    name = "vive-playback",
    about = "Запись потока vive_input в bag и воспроизведение в UDP",
    after_help = AFTER_HELP
)]
pub struct Cli {
    /// Режим: record — записывать поток в bag, play — воспроизводить bag
    #[arg(value_enum)]
    pub mode: Mode,

    #[command(flatten)]
    pub args: PlaybackArgs,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum Mode {
    Record,
    Play,
}

#[derive(Args, Clone, Debug)]
pub struct PlaybackArgs {
    /// Путь к config.toml (необязателен)
    #[arg(long, default_value = "vive-playback.toml", env = "VIVE_PLAYBACK_CONFIG")]
    pub config: String,

    /// Bag-файл для записи/воспроизведения
    #[arg(long, env = "VIVE_BAG_FILE")]
    pub bag_file: Option<String>,

    /// Топик записей в bag
    #[arg(long, env = "VIVE_INPUT_TOPIC")]
    pub input_topic: Option<String>,

    /// Хост получателя UDP при воспроизведении
    #[arg(long, env = "VIVE_OUT_HOST")]
    pub out_host: Option<String>,

    /// Порт получателя UDP при воспроизведении
    #[arg(long, env = "VIVE_OUT_PORT")]
    pub out_port: Option<u16>,

    /// UDP-порт живого потока при записи
    #[arg(long, env = "VIVE_IN_PORT")]
    pub in_port: Option<u16>,

    /// Очистить существующий bag без вопроса
    #[arg(long, conflicts_with = "append")]
    pub overwrite: bool,

    /// Дописать в существующий bag без вопроса
    #[arg(long)]
    pub append: bool,

    /// Не печатать воспроизводимые payload'ы
    #[arg(long, short)]
    pub quiet: bool,
}

// ═══════════════════════════════════════════════════════════════
//  Config file (TOML)
// ═══════════════════════════════════════════════════════════════

#[derive(Debug, Default, Deserialize)]
pub struct Config {
    pub bag_file: Option<String>,
    pub input_topic: Option<String>,
    pub out_host: Option<String>,
    pub out_port: Option<u16>,
    pub in_port: Option<u16>,
    pub echo: Option<bool>,
}

pub fn load_config(path: &str) -> Result<Config, AppError> {
    let content =
        std::fs::read_to_string(path).map_err(|e| AppError::Config(format!("cannot read config {path}: {e}")))?;
    toml::from_str(&content).map_err(|e| AppError::Config(format!("bad config {path}: {e}")))
}

// ═══════════════════════════════════════════════════════════════
//  Effective — merged config
// ═══════════════════════════════════════════════════════════════

/// Что делать с уже существующим bag при записи.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExistingBag {
    Overwrite,
    Append,
}

/// Итоговая конфигурация после мержа: config.toml < env/CLI
#[derive(Debug)]
pub struct Effective {
    pub mode: Mode,
    pub bag_file: PathBuf,
    pub input_topic: String,
    pub out_host: String,
    pub out_port: u16,
    pub in_port: u16,
    /// `None` — спросить у пользователя.
    pub existing: Option<ExistingBag>,
    pub echo: bool,
}

impl Effective {
    pub fn new(mode: Mode, args: &PlaybackArgs) -> Result<Self, AppError> {
        let cfg = match load_config(&args.config) {
            Ok(c) => c,
            Err(e) => {
                if std::path::Path::new(&args.config).exists() {
                    return Err(e);
                }
                Config::default()
            }
        };

        let eff = Self {
            mode,
            bag_file: PathBuf::from(
                args.bag_file.clone().or(cfg.bag_file).unwrap_or_else(|| "vive_input.bag".into()),
            ),
            input_topic: args
                .input_topic
                .clone()
                .or(cfg.input_topic)
                .unwrap_or_else(|| "/vive_input/raw_string".into()),
            out_host: args.out_host.clone().or(cfg.out_host).unwrap_or_else(|| "127.0.0.1".into()),
            out_port: args.out_port.or(cfg.out_port).unwrap_or(8081),
            in_port: args.in_port.or(cfg.in_port).unwrap_or(8080),
            existing: match (args.overwrite, args.append) {
                (true, _) => Some(ExistingBag::Overwrite),
                (_, true) => Some(ExistingBag::Append),
                _ => None,
            },
            echo: !args.quiet && cfg.echo.unwrap_or(true),
        };
        eff.validate()?;
        Ok(eff)
    }

    fn validate(&self) -> Result<(), AppError> {
        if self.bag_file.as_os_str().is_empty() {
            return Err(AppError::Config("bag_file must not be empty".into()));
        }
        if self.input_topic.trim().is_empty() {
            return Err(AppError::Config("input_topic must not be empty".into()));
        }
        match self.mode {
            Mode::Play if self.out_port == 0 => Err(AppError::Config("out_port must be non-zero".into())),
            Mode::Record if self.in_port == 0 => Err(AppError::Config("in_port must be non-zero".into())),
            _ => Ok(()),
        }
    }
}

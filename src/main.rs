mod logger;

use std::{
    fs,
    io::{self, Write},
    path::{Path, PathBuf},
};

use anyhow::{Context, Result};
use clap::{ArgAction, Parser, Subcommand};
use tracing::{debug, info, warn};

use spl_processor::{
    ParseOptions, ParsedSpl, Timestamp, active_word_at, parse_spl_bytes, plain_lyrics,
    serialize_spl, shift_all,
};

#[derive(Parser, Debug)]
#[command(name = "splfmt", version, about = "检查、格式化与查询 SPL 歌词文件")]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// TOML 格式的解析选项文件
    #[arg(long, global = true, value_name = "TOML")]
    config: Option<PathBuf>,

    /// 覆盖配置中的警告数量上限
    #[arg(long, global = true, value_name = "N")]
    max_warnings: Option<usize>,

    /// 行内时间戳倒退时直接报错
    #[arg(long, global = true)]
    strict: bool,

    /// 输出更多日志，可重复使用
    #[arg(short, long, global = true, action = ArgAction::Count)]
    verbose: u8,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// 解析文件并列出所有警告
    Check {
        #[arg(value_name = "FILE")]
        file: PathBuf,
    },

    /// 解析后重新生成
    Fmt {
        #[arg(value_name = "FILE")]
        file: PathBuf,

        /// 输出文件，缺省时写到标准输出
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// 把所有时间整体偏移
    Shift {
        #[arg(value_name = "FILE")]
        file: PathBuf,

        /// 偏移量（毫秒），可以为负
        #[arg(long, allow_hyphen_values = true)]
        by: i64,

        /// 输出文件，缺省时写到标准输出
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// 输出去掉时间标记的纯文本歌词
    Plain {
        #[arg(value_name = "FILE")]
        file: PathBuf,
    },

    /// 以 JSON 输出解析得到的文档与警告
    Dump {
        #[arg(value_name = "FILE")]
        file: PathBuf,
    },

    /// 查询某个时间点正在演唱的单词
    At {
        #[arg(value_name = "FILE")]
        file: PathBuf,

        /// 时间戳字面量，例如 `01:23.45`
        #[arg(value_name = "TIME")]
        time: String,
    },
}

impl Cli {
    fn parse_options(&self) -> Result<ParseOptions> {
        let mut options = match &self.config {
            Some(path) => ParseOptions::from_toml_file(path)
                .with_context(|| format!("读取配置文件 {} 失败", path.display()))?,
            None => ParseOptions::default(),
        };
        if let Some(limit) = self.max_warnings {
            options.max_warnings = limit;
        }
        if self.strict {
            options.strict_monotonicity = true;
        }
        debug!(?options, "解析选项");
        Ok(options)
    }
}

fn load(path: &Path, options: &ParseOptions) -> Result<ParsedSpl> {
    let bytes = fs::read(path).with_context(|| format!("读取 {} 失败", path.display()))?;
    let parsed =
        parse_spl_bytes(&bytes, options).with_context(|| format!("解析 {} 失败", path.display()))?;
    info!(
        "已解析 {}：{} 个标签，{} 个歌词行，{} 条警告",
        path.display(),
        parsed.timeline.tags.len(),
        parsed.timeline.lyric_lines().count(),
        parsed.warnings.len()
    );
    Ok(parsed)
}

fn write_output(output: Option<&Path>, text: &str) -> Result<()> {
    match output {
        Some(path) => {
            fs::write(path, text).with_context(|| format!("写入 {} 失败", path.display()))
        }
        None => {
            io::stdout().lock().write_all(text.as_bytes())?;
            Ok(())
        }
    }
}

fn report_warnings(path: &Path, parsed: &ParsedSpl) {
    for warning in &parsed.warnings {
        warn!("{}: {warning}", path.display());
    }
}

fn run(cli: &Cli) -> Result<()> {
    let options = cli.parse_options()?;

    match &cli.command {
        Commands::Check { file } => {
            let parsed = load(file, &options)?;
            let mut stdout = io::stdout().lock();
            for warning in &parsed.warnings {
                writeln!(stdout, "{}: {warning}", file.display())?;
            }
            writeln!(
                stdout,
                "{}: {} 条警告",
                file.display(),
                parsed.warnings.len()
            )?;
        }
        Commands::Fmt { file, output } => {
            let parsed = load(file, &options)?;
            report_warnings(file, &parsed);
            write_output(output.as_deref(), &serialize_spl(&parsed.timeline)?)?;
        }
        Commands::Shift { file, by, output } => {
            let parsed = load(file, &options)?;
            report_warnings(file, &parsed);
            let shifted = shift_all(&parsed.timeline, *by)?;
            write_output(output.as_deref(), &serialize_spl(&shifted)?)?;
        }
        Commands::Plain { file } => {
            let parsed = load(file, &options)?;
            report_warnings(file, &parsed);
            let mut stdout = io::stdout().lock();
            for line in plain_lyrics(&parsed.timeline) {
                writeln!(stdout, "{line}")?;
            }
        }
        Commands::Dump { file } => {
            let parsed = load(file, &options)?;
            let json = serde_json::to_string_pretty(&parsed).context("序列化为 JSON 失败")?;
            writeln!(io::stdout().lock(), "{json}")?;
        }
        Commands::At { file, time } => {
            let at: Timestamp = time
                .parse()
                .with_context(|| format!("无法解析时间 {time:?}"))?;
            let parsed = load(file, &options)?;
            report_warnings(file, &parsed);
            let mut stdout = io::stdout().lock();
            match active_word_at(&parsed.timeline, at) {
                Some((line, word)) => {
                    let end = word
                        .span
                        .end
                        .map_or_else(|| "…".to_string(), |end| end.to_string());
                    writeln!(
                        stdout,
                        "{}\t{} - {}\t{}",
                        word.text, word.span.start, end, line.raw_text
                    )?;
                }
                None => writeln!(stdout, "{at} 没有正在演唱的单词")?,
            }
        }
    }
    Ok(())
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    logger::init_tracing(cli.verbose);
    run(&cli)
}

#[cfg(test)]
mod tests {
    use super::*;

    const WORD_TIMED: &str = concat!(env!("CARGO_MANIFEST_DIR"), "/tests/test_data/word_timed.spl");
    const MESSY: &str = concat!(env!("CARGO_MANIFEST_DIR"), "/tests/test_data/messy.spl");

    fn cli(args: &[&str]) -> Cli {
        Cli::try_parse_from(std::iter::once("splfmt").chain(args.iter().copied())).unwrap()
    }

    fn path_str(path: &Path) -> &str {
        path.to_str().unwrap()
    }

    #[test]
    fn test_command_line_overrides_config_file() {
        let dir = tempfile::tempdir().unwrap();
        let config = dir.path().join("options.toml");
        fs::write(&config, "max_warnings = 7\ntranslation_tag_keys = [\"lang\"]\n").unwrap();

        let from_file = cli(&["--config", path_str(&config), "check", WORD_TIMED]);
        let options = from_file.parse_options().unwrap();
        assert_eq!(options.max_warnings, 7);
        assert!(!options.strict_monotonicity);
        assert!(options.is_translation_key("lang"));
        assert!(!options.is_translation_key("tr"));

        let overridden = cli(&[
            "--max-warnings",
            "3",
            "fmt",
            WORD_TIMED,
            "--config",
            path_str(&config),
            "--strict",
        ]);
        let options = overridden.parse_options().unwrap();
        assert_eq!(options.max_warnings, 3);
        assert!(options.strict_monotonicity);
        assert!(options.is_translation_key("lang"));
    }

    #[test]
    fn test_missing_config_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("missing.toml");
        let args = cli(&["--config", path_str(&missing), "check", WORD_TIMED]);
        assert!(args.parse_options().is_err());
    }

    #[test]
    fn test_fmt_writes_canonical_output() {
        let dir = tempfile::tempdir().unwrap();
        let output = dir.path().join("out.spl");
        run(&cli(&["fmt", WORD_TIMED, "-o", path_str(&output)])).unwrap();
        assert_eq!(
            fs::read_to_string(&output).unwrap(),
            fs::read_to_string(WORD_TIMED).unwrap()
        );
    }

    #[test]
    fn test_shift_accepts_negative_offset() {
        let dir = tempfile::tempdir().unwrap();
        let output = dir.path().join("shifted.spl");
        run(&cli(&["shift", WORD_TIMED, "--by", "-250", "-o", path_str(&output)])).unwrap();
        let shifted = fs::read_to_string(&output).unwrap();
        assert!(
            shifted.contains("[00:00.75]<00:00.75>Hello <00:01.25>world[00:02.75]\n"),
            "{shifted}"
        );
        assert!(shifted.starts_with("[ti:Example Song]\n"));

        let too_far = dir.path().join("too_far.spl");
        assert!(run(&cli(&["shift", WORD_TIMED, "--by", "-1500", "-o", path_str(&too_far)])).is_err());
        assert!(!too_far.exists());
    }

    #[test]
    fn test_max_warnings_flag_limits_messy_file() {
        let dir = tempfile::tempdir().unwrap();
        let output = dir.path().join("out.spl");
        run(&cli(&["fmt", MESSY, "-o", path_str(&output)])).unwrap();
        assert!(output.exists());

        let err = run(&cli(&["--max-warnings", "2", "fmt", MESSY])).unwrap_err();
        assert!(format!("{err:#}").contains("messy.spl"), "{err:#}");
    }

    #[test]
    fn test_at_rejects_bad_time_literal() {
        assert!(run(&cli(&["at", WORD_TIMED, "soon"])).is_err());
    }
}

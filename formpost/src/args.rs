use std::{path::PathBuf, str::FromStr};

use clap::{Args, Parser};
use faststr::FastStr;

#[derive(Parser, Debug)]
#[command(name = "formpost")]
#[command(author, version, about, long_about = None)]
pub struct Opts {
    #[command(flatten)]
    pub log: LogOptions,
    #[command(flatten)]
    pub upload: UploadOptions,
}

#[derive(Args, Debug, Clone)]
pub struct UploadOptions {
    /// absolute http(s) url to post to
    #[arg(long)]
    pub url: FastStr,
    /// text field, `name=value`
    #[arg(long = "field")]
    pub fields: Vec<FieldArg>,
    /// file field, `name=path[;type=mime][;filename=name]`
    #[arg(long = "file")]
    pub files: Vec<FileArg>,
    /// extra request header, `Name: value`
    #[arg(long = "header")]
    pub headers: Vec<HeaderArg>,
    /// timeout in milliseconds, counted from request start
    #[arg(long, default_value_t = formpost_common::DEFAULT_TIMEOUT_MS)]
    pub timeout_ms: u64,
}

#[derive(Args, Debug, Clone)]
pub struct LogOptions {
    #[arg(long, default_value("./target/logs"))]
    pub log_path: FastStr,
    #[arg(long, default_value_t = false)]
    pub debug: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldArg {
    pub name: String,
    pub value: String,
}

impl FromStr for FieldArg {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (name, value) = s
            .split_once('=')
            .ok_or_else(|| format!("expect `name=value`, got `{s}`"))?;
        Ok(Self {
            name: name.to_string(),
            value: value.to_string(),
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileArg {
    pub name: String,
    pub path: PathBuf,
    pub content_type: Option<String>,
    pub filename: Option<String>,
}

impl FromStr for FileArg {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (name, rest) = s
            .split_once('=')
            .ok_or_else(|| format!("expect `name=path`, got `{s}`"))?;
        let mut options = rest.split(';');
        let path = options.next().unwrap_or_default();
        if path.is_empty() {
            return Err(format!("missing path in `{s}`"));
        }

        let mut file = FileArg {
            name: name.to_string(),
            path: PathBuf::from(path),
            content_type: None,
            filename: None,
        };
        for option in options {
            match option.split_once('=') {
                Some(("type", value)) => file.content_type = Some(value.to_string()),
                Some(("filename", value)) => file.filename = Some(value.to_string()),
                _ => return Err(format!("unknown file option `{option}`")),
            }
        }
        Ok(file)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HeaderArg {
    pub name: String,
    pub value: String,
}

impl FromStr for HeaderArg {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (name, value) = s
            .split_once(':')
            .ok_or_else(|| format!("expect `Name: value`, got `{s}`"))?;
        Ok(Self {
            name: name.trim().to_string(),
            value: value.trim().to_string(),
        })
    }
}

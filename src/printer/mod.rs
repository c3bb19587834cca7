//! Output printers for new releases
//!
//! Each printer takes the engine's result (one list of releases per
//! repository) and writes it to a sink without modifying it.
//!
//! - [`plain`]: human readable text (default)
//! - [`template`]: user supplied `{{placeholder}}` template
//! - JSON and YAML dumps of the release lists

pub mod plain;
pub mod template;

use anyhow::{anyhow, bail, Context, Result};
use std::io::Write;
use std::str::FromStr;

use crate::release::ReleaseList;

pub use plain::PlainPrinter;
pub use template::TemplatePrinter;

/// Something that displays release lists
pub trait Printer {
    fn print(&self, releases: &[ReleaseList], out: &mut dyn Write) -> Result<()>;
}

/// When the template printer emits ANSI colors
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ColorMode {
    /// Only when stdout is a terminal
    #[default]
    Auto,
    On,
    Off,
}

impl FromStr for ColorMode {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "" | "auto" => Ok(ColorMode::Auto),
            "on" | "true" => Ok(ColorMode::On),
            "off" | "false" => Ok(ColorMode::Off),
            other => Err(anyhow!("Unknown color mode '{}' (expected auto, on or off)", other)),
        }
    }
}

/// Printer selection with the options that apply to it
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OutputFormat {
    Plain { show_body: bool },
    Json,
    Yaml,
    Template { template: String, color: ColorMode },
}

impl Default for OutputFormat {
    fn default() -> Self {
        OutputFormat::Plain { show_body: false }
    }
}

impl OutputFormat {
    /// Build a format from its name and the options collected from flags and config
    pub fn from_name(
        name: &str,
        show_body: bool,
        template: Option<String>,
        color: ColorMode,
    ) -> Result<Self> {
        match name {
            "" | "plain" => Ok(OutputFormat::Plain { show_body }),
            "json" => Ok(OutputFormat::Json),
            "yaml" => Ok(OutputFormat::Yaml),
            "template" => {
                let template = template
                    .filter(|t| !t.is_empty())
                    .ok_or_else(|| anyhow!("empty template"))?;
                Ok(OutputFormat::Template { template, color })
            }
            other => bail!("unknown printer '{}'", other),
        }
    }
}

/// Create the printer for `format`
pub fn new_printer(format: &OutputFormat) -> Result<Box<dyn Printer>> {
    let printer: Box<dyn Printer> = match format {
        OutputFormat::Plain { show_body } => Box::new(PlainPrinter::new(*show_body)),
        OutputFormat::Json => Box::new(JsonPrinter),
        OutputFormat::Yaml => Box::new(YamlPrinter),
        OutputFormat::Template { template, color } => {
            Box::new(TemplatePrinter::new(template, *color).context("Invalid output template")?)
        }
    };
    Ok(printer)
}

/// Pretty-printed JSON array of release lists
pub struct JsonPrinter;

impl Printer for JsonPrinter {
    fn print(&self, releases: &[ReleaseList], out: &mut dyn Write) -> Result<()> {
        serde_json::to_writer_pretty(&mut *out, releases).context("Failed to encode releases")?;
        writeln!(out)?;
        Ok(())
    }
}

/// YAML sequence of release lists; prints nothing when there are none
pub struct YamlPrinter;

impl Printer for YamlPrinter {
    fn print(&self, releases: &[ReleaseList], out: &mut dyn Write) -> Result<()> {
        if releases.is_empty() {
            return Ok(());
        }
        serde_yaml::to_writer(&mut *out, releases).context("Failed to encode releases")?;
        Ok(())
    }
}

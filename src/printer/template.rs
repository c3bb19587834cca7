//! Template printer
//!
//! Templates are plain text with `{{placeholder}}` markers, rendered once per
//! release. Available placeholders: `repo`, `version`, `tag`, `prerelease`,
//! `publish_date` (RFC 3339), `date` (local time), `body` (trimmed),
//! `color NAME` and `reset`.
//!
//! `{{wrap "INDENT" WIDTH FIELD}}` word-wraps a field (usually `body`) to
//! `WIDTH` columns including the indent, never narrower than 10 columns of
//! text, and indents every line.

use anyhow::{anyhow, bail, Result};
use chrono::{Local, SecondsFormat};
use crossterm::style::{Color, ResetColor, SetForegroundColor};
use regex::Regex;
use std::io::{IsTerminal, Write};

use super::{ColorMode, Printer};
use crate::release::{Release, ReleaseList};

#[derive(Debug, Clone, PartialEq)]
enum Segment {
    Text(String),
    Field(Field),
    Color(Color),
    Reset,
    Wrap {
        indent: String,
        width: usize,
        field: Field,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Field {
    Repo,
    Version,
    Tag,
    Prerelease,
    PublishDate,
    Date,
    Body,
}

/// Narrowest text column `wrap` will produce
const MIN_WRAP_WIDTH: usize = 10;

/// Printer driven by a user template
pub struct TemplatePrinter {
    segments: Vec<Segment>,
    colors: bool,
}

impl TemplatePrinter {
    pub fn new(template: &str, color: ColorMode) -> Result<Self> {
        if template.is_empty() {
            bail!("empty template");
        }

        let colors = match color {
            ColorMode::On => true,
            ColorMode::Off => false,
            ColorMode::Auto => std::io::stdout().is_terminal(),
        };

        Ok(Self {
            segments: parse(template)?,
            colors,
        })
    }

    fn render(&self, release: &Release, out: &mut dyn Write) -> Result<()> {
        for segment in &self.segments {
            match segment {
                Segment::Text(text) => write!(out, "{}", text)?,
                Segment::Field(field) => write!(out, "{}", field_value(*field, release))?,
                Segment::Wrap {
                    indent,
                    width,
                    field,
                } => write!(out, "{}", wrap(indent, *width, &field_value(*field, release)))?,
                Segment::Color(color) if self.colors => {
                    write!(out, "{}", SetForegroundColor(*color))?
                }
                Segment::Reset if self.colors => write!(out, "{}", ResetColor)?,
                Segment::Color(_) | Segment::Reset => {}
            }
        }

        Ok(())
    }
}

impl Printer for TemplatePrinter {
    fn print(&self, releases: &[ReleaseList], out: &mut dyn Write) -> Result<()> {
        for release in releases.iter().flatten() {
            self.render(release, out)?;
        }
        Ok(())
    }
}

fn field_value(field: Field, release: &Release) -> String {
    let state = &release.state;
    match field {
        Field::Repo => state.repo.clone(),
        Field::Version => state.version.clone(),
        Field::Tag => state.tag.clone().unwrap_or_default(),
        Field::Prerelease => release.is_prerelease().to_string(),
        Field::PublishDate => state
            .publish_date
            .map(|date| date.to_rfc3339_opts(SecondsFormat::Secs, true))
            .unwrap_or_default(),
        Field::Date => state
            .publish_date
            .map(|date| {
                date.with_timezone(&Local)
                    .format("%Y-%m-%d %H:%M:%S %z %Z")
                    .to_string()
            })
            .unwrap_or_default(),
        Field::Body => release
            .body
            .as_deref()
            .unwrap_or_default()
            .trim()
            .to_string(),
    }
}

/// Greedy word wrap; each input line is wrapped on its own and blank lines are kept
fn wrap(indent: &str, line_length: usize, text: &str) -> String {
    let width = line_length
        .saturating_sub(indent.chars().count())
        .max(MIN_WRAP_WIDTH);

    text.split('\n')
        .map(|line| {
            let mut lines = Vec::new();
            let mut current = String::new();
            for word in line.split_whitespace() {
                let len = current.chars().count();
                if len > 0 && len + 1 + word.chars().count() > width {
                    lines.push(format!("{}{}", indent, current));
                    current.clear();
                }
                if !current.is_empty() {
                    current.push(' ');
                }
                current.push_str(word);
            }
            if !current.is_empty() {
                lines.push(format!("{}{}", indent, current));
            }
            lines.join("\n")
        })
        .collect::<Vec<_>>()
        .join("\n")
}

fn parse_field(name: &str) -> Option<Field> {
    let field = match name {
        "repo" => Field::Repo,
        "version" => Field::Version,
        "tag" => Field::Tag,
        "prerelease" => Field::Prerelease,
        "publish_date" => Field::PublishDate,
        "date" => Field::Date,
        "body" => Field::Body,
        _ => return None,
    };
    Some(field)
}

fn parse(template: &str) -> Result<Vec<Segment>> {
    let placeholder = Regex::new(r"\{\{(.*?)\}\}")?;
    let token = Regex::new(r#""([^"]*)"|(\S+)"#)?;

    let mut segments = Vec::new();
    let mut last = 0;

    for caps in placeholder.captures_iter(template) {
        let (Some(whole), Some(inner)) = (caps.get(0), caps.get(1)) else {
            continue;
        };
        if whole.start() > last {
            segments.push(Segment::Text(template[last..whole.start()].to_string()));
        }
        last = whole.end();

        let tokens: Vec<&str> = token
            .captures_iter(inner.as_str())
            .filter_map(|t| t.get(1).or_else(|| t.get(2)))
            .map(|m| m.as_str())
            .collect();

        let segment = match tokens.as_slice() {
            ["reset"] => Segment::Reset,
            ["color", color] => Segment::Color(parse_color(color)?),
            ["wrap", indent, width, name] => {
                let width = width
                    .parse()
                    .map_err(|_| anyhow!("invalid wrap width '{}' in '{}'", width, whole.as_str()))?;
                let field = parse_field(name)
                    .ok_or_else(|| anyhow!("unknown field '{}' in '{}'", name, whole.as_str()))?;
                Segment::Wrap {
                    indent: indent.to_string(),
                    width,
                    field,
                }
            }
            [name] => match parse_field(name) {
                Some(field) => Segment::Field(field),
                None => bail!("unknown template placeholder '{}'", whole.as_str()),
            },
            _ => bail!("unknown template placeholder '{}'", whole.as_str()),
        };
        segments.push(segment);
    }

    if last < template.len() {
        segments.push(Segment::Text(template[last..].to_string()));
    }

    Ok(segments)
}

fn parse_color(name: &str) -> Result<Color> {
    let color = match name {
        "black" => Color::Black,
        "red" => Color::DarkRed,
        "green" => Color::DarkGreen,
        "yellow" => Color::DarkYellow,
        "blue" => Color::DarkBlue,
        "magenta" => Color::DarkMagenta,
        "cyan" => Color::DarkCyan,
        "white" => Color::Grey,
        "grey" | "gray" => Color::DarkGrey,
        "bright_red" => Color::Red,
        "bright_green" => Color::Green,
        "bright_yellow" => Color::Yellow,
        "bright_blue" => Color::Blue,
        "bright_magenta" => Color::Magenta,
        "bright_cyan" => Color::Cyan,
        "bright_white" => Color::White,
        other => bail!("unknown color '{}'", other),
    };
    Ok(color)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::printer::tests::sample_releases;

    fn render(template: &str, color: ColorMode) -> String {
        let printer = TemplatePrinter::new(template, color).unwrap();
        let mut out = Vec::new();
        printer.print(&sample_releases(), &mut out).unwrap();
        String::from_utf8(out).unwrap()
    }

    #[test]
    fn test_fields() {
        let output = render(
            "{{repo}} {{ version }} [{{tag}}] {{prerelease}} {{publish_date}}\n",
            ColorMode::Off,
        );

        assert_eq!(
            output,
            "tokio-rs/tokio Tokio v1.38.0 [tokio-1.38.0] false 2024-05-30T14:00:00Z\n\
             owner/tool v0.2.0-rc.1 [v0.2.0-rc.1] true \n"
        );
    }

    #[test]
    fn test_body_is_trimmed() {
        let output = render("<{{body}}>", ColorMode::Off);
        assert!(output.starts_with("<Fixed a bug.\nAdded a feature.>"));
    }

    #[test]
    fn test_colors() {
        let output = render("{{color \"red\"}}{{repo}}{{reset}}\n", ColorMode::On);
        assert!(output.starts_with("\x1b["));
        assert!(output.contains("tokio-rs/tokio\x1b[0m\n"));

        let output = render("{{color red}}{{repo}}{{reset}}\n", ColorMode::Off);
        assert_eq!(output, "tokio-rs/tokio\nowner/tool\n");
    }

    #[test]
    fn test_wrap_helper() {
        assert_eq!(
            wrap("  ", 20, "one two three four five six"),
            "  one two three four\n  five six"
        );
        // Width never drops below ten columns of text
        assert_eq!(wrap(">", 5, "alpha beta gamma"), ">alpha beta\n>gamma");
        assert_eq!(wrap("  ", 80, "first\n\n  second"), "  first\n\n  second");
        assert_eq!(wrap("  ", 80, ""), "");
    }

    #[test]
    fn test_wrap_placeholder() {
        let output = render("{{wrap \"    \" 16 body}}|", ColorMode::Off);
        assert_eq!(output, "    Fixed a bug.\n    Added a\n    feature.||");
    }

    #[test]
    fn test_rejects_bad_templates() {
        assert!(TemplatePrinter::new("", ColorMode::Off).is_err());
        assert!(TemplatePrinter::new("{{author}}", ColorMode::Off).is_err());
        assert!(TemplatePrinter::new("{{Repo}}", ColorMode::Off).is_err());
        assert!(TemplatePrinter::new("{{color chartreuse}}", ColorMode::Off).is_err());
        assert!(TemplatePrinter::new("{{color}}", ColorMode::Off).is_err());
        assert!(TemplatePrinter::new("{{}}", ColorMode::Off).is_err());
        assert!(TemplatePrinter::new("{{wrap \"  \" wide body}}", ColorMode::Off).is_err());
        assert!(TemplatePrinter::new("{{wrap \"  \" 80 author}}", ColorMode::Off).is_err());
    }
}

use anyhow::Result;
use chrono::Local;
use std::io::Write;

use super::Printer;
use crate::release::ReleaseList;

/// Plain text printer (the default one)
pub struct PlainPrinter {
    show_body: bool,
}

impl PlainPrinter {
    pub fn new(show_body: bool) -> Self {
        Self { show_body }
    }
}

impl Printer for PlainPrinter {
    fn print(&self, releases: &[ReleaseList], out: &mut dyn Write) -> Result<()> {
        for release in releases.iter().flatten() {
            let pre = if release.is_prerelease() { "pre-" } else { "" };
            writeln!(
                out,
                "New {}release for {}: {}",
                pre,
                release.repo(),
                release.state.version
            )?;

            if let Some(tag) = &release.state.tag {
                writeln!(out, "  Tag: {}", tag)?;
            }
            if let Some(date) = release.state.publish_date {
                writeln!(
                    out,
                    "  Date: {}",
                    date.with_timezone(&Local).format("%Y-%m-%d %H:%M:%S %z %Z")
                )?;
            }

            if let (true, Some(body)) = (self.show_body, &release.body) {
                writeln!(out, "  Release body:")?;
                for line in body.trim().lines() {
                    if line.is_empty() {
                        writeln!(out)?;
                    } else {
                        writeln!(out, "    {}", line)?;
                    }
                }
            }

            writeln!(out)?;
        }

        Ok(())
    }
}

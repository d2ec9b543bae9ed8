//! Resolver backed by the `streamlink` command-line tool.
//!
//! Runs `streamlink --json [options] <url>` and maps its JSON report. The
//! process is blocking; the pipeline calls this from `spawn_blocking`.

use std::collections::BTreeMap;
use std::path::PathBuf;
use std::process::Command;

use serde::Deserialize;

use crate::resolver::{OptionValue, ResolveError, Resolver, ResolverSession, StreamMetadata, StreamVariant};

/// Shells out to a `streamlink` executable.
#[derive(Debug, Clone)]
pub struct StreamlinkCli {
    executable: PathBuf,
}

impl StreamlinkCli {
    pub fn new(executable: impl Into<PathBuf>) -> Self {
        Self {
            executable: executable.into(),
        }
    }

    fn command(&self, session: &ResolverSession, url: &str) -> Command {
        let mut command = Command::new(&self.executable);
        command.arg("--json");

        for (name, value) in session.headers() {
            command.arg("--http-header").arg(format!("{}={}", name, value));
        }
        for (name, value) in session.options() {
            match value {
                OptionValue::Flag(true) => {
                    command.arg(format!("--{}", name));
                }
                OptionValue::Flag(false) => {}
                OptionValue::Text(text) => {
                    command.arg(format!("--{}", name)).arg(text);
                }
            }
        }

        command.arg(url);
        command
    }
}

impl Resolver for StreamlinkCli {
    fn resolve(&self, session: &ResolverSession, url: &str) -> Result<StreamMetadata, ResolveError> {
        let output = self.command(session, url).output().map_err(|e| {
            ResolveError::Unexpected(format!(
                "failed to run {}: {}",
                self.executable.display(),
                e
            ))
        })?;

        parse_report(url, &output.stdout, &String::from_utf8_lossy(&output.stderr))
    }
}

#[derive(Debug, Deserialize)]
struct Report {
    plugin: Option<String>,
    #[serde(default)]
    metadata: ReportMetadata,
    #[serde(default)]
    streams: BTreeMap<String, ReportStream>,
    error: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct ReportMetadata {
    id: Option<String>,
    author: Option<String>,
    category: Option<String>,
    title: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ReportStream {
    #[serde(rename = "type")]
    kind: String,
    url: Option<String>,
}

/// Map streamlink's `--json` output to a resolution result.
pub(crate) fn parse_report(url: &str, stdout: &[u8], stderr: &str) -> Result<StreamMetadata, ResolveError> {
    let report: Report = serde_json::from_slice(stdout).map_err(|e| {
        let detail = stderr.trim();
        if detail.is_empty() {
            ResolveError::Unexpected(format!("unreadable resolver output: {}", e))
        } else {
            ResolveError::Unexpected(detail.to_string())
        }
    })?;

    if let Some(error) = report.error {
        return Err(if error.starts_with("No plugin can handle URL") {
            ResolveError::NoHandler(url.to_string())
        } else if error.starts_with("No playable streams found") {
            ResolveError::NoContent
        } else {
            ResolveError::Handler(error)
        });
    }

    let streams = report
        .streams
        .into_iter()
        .filter_map(|(name, stream)| {
            stream.url.map(|url| {
                (
                    name,
                    StreamVariant {
                        kind: stream.kind,
                        url,
                    },
                )
            })
        })
        .collect();

    Ok(StreamMetadata {
        handler: report.plugin.unwrap_or_default(),
        title: report.metadata.title,
        author: report.metadata.author,
        category: report.metadata.category,
        id: report.metadata.id,
        thumbnail: None,
        streams,
    })
}

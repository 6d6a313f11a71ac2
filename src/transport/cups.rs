//! # CUPS Command-Line Transport
//!
//! Talks to a CUPS server through its command-line clients instead of
//! linking libcups:
//!
//! | Query | Command |
//! |-------|---------|
//! | printers | `lpstat -e` |
//! | default printer | `lpstat -d` |
//! | media, resolution | `lpoptions -p NAME -l` |
//! | submission | `lp -d NAME -n COPIES [-o media=...] FILE` |
//!
//! Every command runs with `-h SERVER` when a server is configured and is
//! killed when its timeout expires. Output parsing lives in pure functions
//! so it can be tested without a CUPS installation.
//!
//! ## lpoptions
//!
//! ```text
//! PageSize/Media Size: w288h432 *w144h72 Custom.WIDTHxHEIGHT
//! Resolution/Resolution: *203dpi 300dpi
//! ```
//!
//! The starred choice is the default. `wXhY` choices are sizes in points
//! (1/72 in) and double as exact dimensions.

use std::path::PathBuf;
use std::process::Stdio;
use std::sync::OnceLock;
use std::time::Duration;

use async_trait::async_trait;
use regex::Regex;
use tokio::process::Command;

use crate::error::{EtiquetaError, SubmissionError};
use crate::printer::{JobId, JobSubmitter, MetadataSource, PrinterAttributes, SubmitRequest};

/// CUPS client over `lpstat`, `lpoptions` and `lp`.
#[derive(Debug, Clone)]
pub struct CupsCli {
    server: Option<String>,
    query_timeout: Duration,
    submit_timeout: Duration,
    spool_dir: PathBuf,
}

impl CupsCli {
    pub fn new(server: Option<String>) -> Self {
        Self {
            server: server.filter(|s| !s.trim().is_empty()),
            query_timeout: Duration::from_secs(5),
            submit_timeout: Duration::from_secs(30),
            spool_dir: std::env::temp_dir(),
        }
    }

    pub fn with_timeouts(mut self, query: Duration, submit: Duration) -> Self {
        self.query_timeout = query;
        self.submit_timeout = submit;
        self
    }

    fn command(&self, program: &str) -> Command {
        let mut cmd = Command::new(program);
        if let Some(server) = &self.server {
            cmd.arg("-h").arg(server);
        }
        cmd.stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        cmd
    }

    /// Run a query command and return its stdout.
    async fn query(&self, mut cmd: Command) -> Result<String, EtiquetaError> {
        let output = tokio::time::timeout(self.query_timeout, cmd.output())
            .await
            .map_err(|_| {
                EtiquetaError::Connectivity(format!(
                    "CUPS query timed out after {}ms",
                    self.query_timeout.as_millis()
                ))
            })?
            .map_err(|e| EtiquetaError::Connectivity(format!("cannot run CUPS client: {}", e)))?;

        let stdout = String::from_utf8_lossy(&output.stdout).into_owned();
        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            // lpstat -d exits non-zero when there is no default
            if stdout.trim().is_empty() && stderr.contains("no system default") {
                return Ok(String::new());
            }
            return Err(EtiquetaError::Connectivity(format!(
                "CUPS client failed ({}): {}",
                output.status,
                stderr.trim()
            )));
        }
        Ok(stdout)
    }
}

#[async_trait]
impl MetadataSource for CupsCli {
    async fn list_printers(&self) -> Result<Vec<String>, EtiquetaError> {
        let mut cmd = self.command("lpstat");
        cmd.arg("-e");
        Ok(parse_printer_list(&self.query(cmd).await?))
    }

    async fn default_printer(&self) -> Result<Option<String>, EtiquetaError> {
        let mut cmd = self.command("lpstat");
        cmd.arg("-d");
        Ok(parse_default_printer(&self.query(cmd).await?))
    }

    async fn printer_attributes(&self, printer: &str) -> Result<PrinterAttributes, EtiquetaError> {
        let mut cmd = self.command("lpoptions");
        cmd.arg("-p").arg(printer).arg("-l");
        Ok(parse_printer_options(&self.query(cmd).await?))
    }
}

#[async_trait]
impl JobSubmitter for CupsCli {
    fn supports_native_copies(&self) -> bool {
        true
    }

    async fn submit(&self, request: &SubmitRequest) -> Result<JobId, SubmissionError> {
        let path = self
            .spool_dir
            .join(format!("etiqueta-{}.png", uuid::Uuid::new_v4()));
        tokio::fs::write(&path, &request.document)
            .await
            .map_err(|e| SubmissionError::Rejected(format!("cannot spool label: {}", e)))?;

        let mut cmd = self.command("lp");
        cmd.arg("-d")
            .arg(&request.printer)
            .arg("-n")
            .arg(request.copies.max(1).to_string())
            .arg("-t")
            .arg(&request.title);
        if let Some(media) = &request.media {
            cmd.arg("-o").arg(format!("media={}", media));
        }
        cmd.arg(&path);

        let result = tokio::time::timeout(self.submit_timeout, cmd.output()).await;
        if let Err(e) = tokio::fs::remove_file(&path).await {
            tracing::debug!(path = %path.display(), error = %e, "could not remove spool file");
        }

        let output = result
            .map_err(|_| SubmissionError::Timeout(self.submit_timeout))?
            .map_err(|e| SubmissionError::Unreachable(format!("cannot run lp: {}", e)))?;

        if !output.status.success() {
            return Err(classify_lp_failure(&String::from_utf8_lossy(&output.stderr)));
        }

        let stdout = String::from_utf8_lossy(&output.stdout);
        let job = parse_job_id(&stdout).unwrap_or_else(|| JobId(stdout.trim().to_string()));
        tracing::info!(printer = %request.printer, job = %job, copies = request.copies, "job submitted");
        Ok(job)
    }
}

// ============================================================================
// OUTPUT PARSING
// ============================================================================

/// `lpstat -e`: one destination per line.
pub fn parse_printer_list(output: &str) -> Vec<String> {
    output
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(str::to_string)
        .collect()
}

/// `lpstat -d`: `system default destination: NAME`.
pub fn parse_default_printer(output: &str) -> Option<String> {
    output
        .lines()
        .find_map(|line| line.trim().strip_prefix("system default destination:"))
        .map(|name| name.trim().to_string())
        .filter(|name| !name.is_empty())
}

fn point_size_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"^w(\d+(?:\.\d+)?)h(\d+(?:\.\d+)?)$").expect("point size pattern is a valid regex")
    })
}

fn resolution_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"^(\d+)(?:x\d+)?dpi$").expect("resolution pattern is a valid regex")
    })
}

/// Points to hundredths of a millimetre.
fn points_to_hundredths_mm(points: f64) -> u32 {
    (points * 2540.0 / 72.0).round() as u32
}

/// `lpoptions -p NAME -l`.
pub fn parse_printer_options(output: &str) -> PrinterAttributes {
    let mut attrs = PrinterAttributes::default();

    for line in output.lines() {
        let Some((name, choices)) = line.split_once(':') else {
            continue;
        };
        let option = name.split('/').next().unwrap_or(name).trim();

        match option {
            "PageSize" | "media" if attrs.media_supported.is_empty() => {
                for choice in choices.split_whitespace() {
                    let (is_default, key) = match choice.strip_prefix('*') {
                        Some(key) => (true, key),
                        None => (false, choice),
                    };
                    // placeholder for custom sizes, not a real size
                    if key.starts_with("Custom.") && key.contains("WIDTH") {
                        continue;
                    }
                    if let Some(caps) = point_size_pattern().captures(key) {
                        let w: f64 = caps[1].parse().unwrap_or(0.0);
                        let h: f64 = caps[2].parse().unwrap_or(0.0);
                        attrs.media_sizes.insert(
                            key.to_string(),
                            (points_to_hundredths_mm(w), points_to_hundredths_mm(h)),
                        );
                    }
                    if is_default {
                        attrs.media_default = Some(key.to_string());
                    }
                    attrs.media_supported.push(key.to_string());
                }
            }
            "Resolution" => {
                attrs.resolution_default = choices
                    .split_whitespace()
                    .find_map(|c| c.strip_prefix('*'))
                    .and_then(|c| resolution_pattern().captures(c))
                    .and_then(|caps| caps[1].parse().ok());
            }
            _ => {}
        }
    }

    attrs
}

/// `lp`: `request id is NAME-42 (1 file(s))`.
pub fn parse_job_id(output: &str) -> Option<JobId> {
    output
        .lines()
        .find_map(|line| line.trim().strip_prefix("request id is "))
        .and_then(|rest| rest.split_whitespace().next())
        .map(|id| JobId(id.to_string()))
}

/// Map `lp` stderr to a submission error.
pub fn classify_lp_failure(stderr: &str) -> SubmissionError {
    let message = stderr.trim().to_string();
    let lower = message.to_lowercase();
    if lower.contains("unable to connect") || lower.contains("connection refused") || lower.contains("scheduler is not running") {
        SubmissionError::Unreachable(message)
    } else if lower.contains("out of paper") || lower.contains("media-empty") || lower.contains("out of media") {
        SubmissionError::OutOfMedia(message)
    } else {
        SubmissionError::Rejected(message)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_parse_printer_list() {
        assert_eq!(
            parse_printer_list("Zebra_ZD420\nBrother_QL_800\n\n"),
            vec!["Zebra_ZD420".to_string(), "Brother_QL_800".to_string()]
        );
        assert!(parse_printer_list("").is_empty());
    }

    #[test]
    fn test_parse_default_printer() {
        assert_eq!(
            parse_default_printer("system default destination: Zebra_ZD420\n"),
            Some("Zebra_ZD420".to_string())
        );
        assert_eq!(parse_default_printer("no system default destination\n"), None);
    }

    #[test]
    fn test_parse_printer_options() {
        let output = "\
PageSize/Media Size: w288h432 *w144h72 na_index-4x6_4x6in Custom.WIDTHxHEIGHT
Resolution/Resolution: 300dpi *203dpi
Darkness/Darkness: *Default 1 2 3
";
        let attrs = parse_printer_options(output);
        assert_eq!(
            attrs.media_supported,
            vec!["w288h432", "w144h72", "na_index-4x6_4x6in"]
        );
        assert_eq!(attrs.media_default.as_deref(), Some("w144h72"));
        assert_eq!(attrs.media_sizes.get("w288h432"), Some(&(10160, 15240)));
        assert_eq!(attrs.media_sizes.get("w144h72"), Some(&(5080, 2540)));
        assert_eq!(attrs.resolution_default, Some(203));
    }

    #[test]
    fn test_parse_printer_options_without_sizes() {
        let attrs = parse_printer_options("Resolution/Resolution: *300x300dpi\n");
        assert!(attrs.media_supported.is_empty());
        assert_eq!(attrs.resolution_default, Some(300));
    }

    #[test]
    fn test_parse_job_id() {
        assert_eq!(
            parse_job_id("request id is Zebra_ZD420-42 (1 file(s))\n"),
            Some(JobId("Zebra_ZD420-42".into()))
        );
        assert_eq!(parse_job_id("garbage"), None);
    }

    #[test]
    fn test_classify_lp_failure() {
        assert!(matches!(
            classify_lp_failure("lp: Unable to connect to server"),
            SubmissionError::Unreachable(_)
        ));
        assert!(matches!(
            classify_lp_failure("lp: printer out of paper"),
            SubmissionError::OutOfMedia(_)
        ));
        assert!(matches!(
            classify_lp_failure("lp: The printer or class does not exist."),
            SubmissionError::Rejected(_)
        ));
    }
}

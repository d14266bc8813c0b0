use anyhow::Result;
use chrono::Local;
use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::PathBuf;

/// Append-only session log, one file per relay run.
pub struct Logger {
    log_file: PathBuf,
}

/// Counters for one relay run.
#[derive(Debug, Default)]
pub struct RelayMetrics {
    pub connections_opened: usize,
    pub connections_closed: usize,
    pub messages_relayed: usize,
    pub decode_errors: usize,
    pub ignored_payloads: usize,
}

impl RelayMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    /// Share of inbound frames that made it into a broadcast, as a percentage.
    pub fn relay_rate(&self) -> f64 {
        let total = self.messages_relayed + self.decode_errors + self.ignored_payloads;
        if total == 0 {
            return 0.0;
        }
        (self.messages_relayed as f64 / total as f64) * 100.0
    }

    pub fn display(&self) {
        use colored::Colorize;
        println!("\n{}", "━━━━━━━━━ Relay Statistics ━━━━━━━━━".bright_cyan().bold());
        println!("Connections opened: {}", self.connections_opened);
        println!("Connections closed: {}", self.connections_closed);
        println!("Messages relayed: {}", self.messages_relayed.to_string().green());
        println!("Decode errors: {}", self.decode_errors.to_string().red());
        println!("Ignored payloads: {}", self.ignored_payloads.to_string().yellow());
        println!("Relay rate: {:.1}%", self.relay_rate());
        println!("{}", "━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━".bright_cyan());
    }
}

impl Logger {
    pub fn new(log_dir: &str) -> Result<Self> {
        let dir = PathBuf::from(log_dir);
        if !dir.exists() {
            fs::create_dir_all(&dir)?;
        }

        let timestamp = Local::now().format("%Y%m%d_%H%M%S");
        let log_file = dir.join(format!("relay_{}.log", timestamp));

        Ok(Self { log_file })
    }

    pub fn log(&self, message: &str) -> Result<()> {
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.log_file)?;

        let timestamp = Local::now().format("%Y-%m-%d %H:%M:%S");
        writeln!(file, "[{}] {}", timestamp, message)?;
        Ok(())
    }

    pub fn log_inbound(&self, label: &str, raw: &str) -> Result<()> {
        let preview = if raw.len() > 200 {
            format!("{}...", &raw[..find_char_boundary(raw, 200)])
        } else {
            raw.to_string()
        };
        self.log(&format!("{} sent: {}", label, preview))
    }

    pub fn log_error(&self, error: &str) -> Result<()> {
        self.log(&format!("ERROR: {}", error))
    }
}

/// Find the largest char boundary in `s` that is <= `max_bytes`.
/// Safe for slicing: `&s[..find_char_boundary(s, max_bytes)]` never panics.
fn find_char_boundary(s: &str, max_bytes: usize) -> usize {
    if max_bytes >= s.len() {
        return s.len();
    }
    let mut boundary = max_bytes;
    while boundary > 0 && !s.is_char_boundary(boundary) {
        boundary -= 1;
    }
    boundary
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn test_relay_metrics_new() {
        let metrics = RelayMetrics::new();
        assert_eq!(metrics.connections_opened, 0);
        assert_eq!(metrics.connections_closed, 0);
        assert_eq!(metrics.messages_relayed, 0);
        assert_eq!(metrics.decode_errors, 0);
        assert_eq!(metrics.ignored_payloads, 0);
    }

    #[test]
    fn test_relay_rate_zero_frames() {
        let metrics = RelayMetrics::new();
        assert_eq!(metrics.relay_rate(), 0.0);
    }

    #[test]
    fn test_relay_rate_calculation() {
        let mut metrics = RelayMetrics::new();
        metrics.messages_relayed = 8;
        metrics.decode_errors = 1;
        metrics.ignored_payloads = 1;
        assert_eq!(metrics.relay_rate(), 80.0);
    }

    #[test]
    fn test_logger_creation() {
        let test_log_dir = "test_logs_temp";
        let logger = Logger::new(test_log_dir);
        assert!(logger.is_ok());

        let logger = logger.unwrap();
        // Check that the parent directory exists
        assert!(logger.log_file.parent().unwrap().exists());

        // Clean up
        let _ = fs::remove_dir_all(test_log_dir);
    }

    #[test]
    fn test_logger_basic_log() {
        let test_log_dir = "test_logs_temp2";
        let logger = Logger::new(test_log_dir).unwrap();

        let result = logger.log("Test message");
        assert!(result.is_ok());

        // Verify log file has content
        let content = fs::read_to_string(&logger.log_file).unwrap();
        assert!(content.contains("Test message"));

        // Clean up
        let _ = fs::remove_dir_all(test_log_dir);
    }

    #[test]
    fn test_logger_inbound_preview_truncates() {
        let test_log_dir = "test_logs_temp3";
        let logger = Logger::new(test_log_dir).unwrap();

        let long = "x".repeat(500);
        logger.log_inbound("Client 1", &long).unwrap();

        let content = fs::read_to_string(&logger.log_file).unwrap();
        assert!(content.contains("Client 1 sent:"));
        assert!(content.contains("..."));
        assert!(!content.contains(&long));

        // Clean up
        let _ = fs::remove_dir_all(test_log_dir);
    }

    #[test]
    fn test_logger_multiple_entries() {
        let test_log_dir = "test_logs_temp4";
        let logger = Logger::new(test_log_dir).unwrap();

        let _ = logger.log("Entry 1");
        let _ = logger.log("Entry 2");
        let _ = logger.log("Entry 3");

        let content = fs::read_to_string(&logger.log_file).unwrap();
        assert!(content.contains("Entry 1"));
        assert!(content.contains("Entry 2"));
        assert!(content.contains("Entry 3"));

        // Clean up
        let _ = fs::remove_dir_all(test_log_dir);
    }

    #[test]
    fn test_find_char_boundary_multibyte() {
        // "é" is two bytes; byte 201 falls inside the char following byte 200
        let s = format!("{}{}", "x".repeat(199), "ééé");
        let boundary = find_char_boundary(&s, 200);
        assert!(s.is_char_boundary(boundary));
        assert!(boundary <= 200);
    }
}

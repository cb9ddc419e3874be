//! Operator controls
//!
//! Line commands read from stdin while the dashboard polls in the background:
//! switch sources, stop, force a refresh, or quit.

use telemetry_core::{CycleOutcome, Poller, PollerState, RowSource};
use tokio::io::{AsyncBufRead, AsyncBufReadExt};

/// One parsed operator command
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// (Re)start polling, optionally on a new URL
    Start(Option<String>),
    Stop,
    /// Fetch once right now, optionally from a new URL
    Reload(Option<String>),
    Status,
    Help,
    Quit,
}

impl Command {
    /// Parse one input line; blank lines yield `Ok(None)`
    pub fn parse(line: &str) -> Result<Option<Command>, String> {
        let mut parts = line.split_whitespace();
        let Some(verb) = parts.next() else {
            return Ok(None);
        };
        let url = parts.next().map(str::to_string);
        if let Some(extra) = parts.next() {
            return Err(format!("unexpected argument: {}", extra));
        }

        let command = match (verb.to_lowercase().as_str(), url) {
            ("start", url) => Command::Start(url),
            ("reload" | "refresh", url) => Command::Reload(url),
            ("stop", None) => Command::Stop,
            ("status", None) => Command::Status,
            ("help" | "?", None) => Command::Help,
            ("quit" | "exit", None) => Command::Quit,
            (verb @ ("stop" | "status" | "help" | "?" | "quit" | "exit"), Some(_)) => {
                return Err(format!("'{}' takes no arguments", verb));
            }
            (other, _) => return Err(format!("unknown command: {} (try 'help')", other)),
        };
        Ok(Some(command))
    }
}

/// Why the control loop returned
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ControlExit {
    Quit,
    InputClosed,
}

pub const HELP: &str = "\
Commands:
  start [url]    (re)start polling, optionally switching source
  stop           stop polling
  reload [url]   fetch once now
  status         show polling state
  help           show this help
  quit           exit";

/// Read commands until `quit` or end of input
///
/// `url` is the source currently selected; `start`/`reload` with an argument
/// replace it for later commands.
pub async fn run<S, R>(poller: &mut Poller<S>, input: R, url: &mut String) -> ControlExit
where
    S: RowSource + 'static,
    R: AsyncBufRead + Unpin,
{
    let mut lines = input.lines();

    loop {
        let line = match lines.next_line().await {
            Ok(Some(line)) => line,
            Ok(None) => return ControlExit::InputClosed,
            Err(e) => {
                log::error!("Failed to read command: {}", e);
                return ControlExit::InputClosed;
            }
        };

        let command = match Command::parse(&line) {
            Ok(Some(command)) => command,
            Ok(None) => continue,
            Err(message) => {
                println!("{}", message);
                continue;
            }
        };
        log::debug!("Command: {:?}", command);

        match command {
            Command::Start(new_url) => {
                if let Some(new_url) = new_url {
                    *url = new_url;
                }
                poller.start_polling(url.clone());
            }
            Command::Stop => {
                if !poller.stop_polling() {
                    println!("Not polling");
                }
            }
            Command::Reload(new_url) => {
                if let Some(new_url) = new_url {
                    *url = new_url;
                }
                match poller.fetch_once(url).await {
                    Ok(CycleOutcome::Published { records }) => println!("Reloaded {} records", records),
                    Ok(CycleOutcome::Empty) => println!("Source returned no rows"),
                    Ok(CycleOutcome::Stale) => println!("Reload superseded by a newer fetch"),
                    Err(e) => log::warn!("Reload from {} failed: {}", url, e),
                }
            }
            Command::Status => println!("{}", status_line(poller, url)),
            Command::Help => println!("{}", HELP),
            Command::Quit => return ControlExit::Quit,
        }
    }
}

/// One-line summary of the session
pub fn status_line<S: RowSource + 'static>(poller: &Poller<S>, url: &str) -> String {
    let state = match poller.state() {
        PollerState::Polling => format!(
            "polling {} every {}ms",
            poller.current_url().unwrap_or(url),
            poller.config().interval_ms
        ),
        PollerState::Idle => format!("idle (source {})", url),
    };
    let latest = poller
        .latest()
        .map(|r| format!("latest at {}", r.timestamp))
        .unwrap_or_else(|| "no readings yet".to_string());

    format!("{}, {} records, {}", state, poller.history().len(), latest)
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use parking_lot::Mutex;
    use std::sync::Arc;
    use telemetry_core::{parse_batch, PollerConfig, RawRow, Result};

    #[derive(Default)]
    struct FixedSource {
        calls: Arc<Mutex<Vec<String>>>,
    }

    #[async_trait]
    impl RowSource for FixedSource {
        async fn fetch_rows(&self, url: &str) -> Result<Vec<RawRow>> {
            self.calls.lock().push(url.to_string());
            parse_batch(r#"[{"ph":"7.2","ts":"12:00:00"}]"#)
        }
    }

    #[test]
    fn test_parse_commands() {
        assert_eq!(Command::parse(""), Ok(None));
        assert_eq!(Command::parse("   "), Ok(None));
        assert_eq!(Command::parse("start"), Ok(Some(Command::Start(None))));
        assert_eq!(
            Command::parse("START http://a/rows"),
            Ok(Some(Command::Start(Some("http://a/rows".to_string()))))
        );
        assert_eq!(Command::parse("refresh"), Ok(Some(Command::Reload(None))));
        assert_eq!(Command::parse(" stop "), Ok(Some(Command::Stop)));
        assert_eq!(Command::parse("exit"), Ok(Some(Command::Quit)));
    }

    #[test]
    fn test_parse_errors() {
        assert!(Command::parse("jump").unwrap_err().contains("unknown command"));
        assert!(Command::parse("stop now").unwrap_err().contains("takes no arguments"));
        assert!(Command::parse("start a b").unwrap_err().contains("unexpected argument"));
    }

    #[tokio::test]
    async fn test_control_session() {
        let source = FixedSource::default();
        let calls = Arc::clone(&source.calls);
        let mut poller = Poller::new(source, PollerConfig::new().with_interval_ms(60_000));
        let mut url = "http://first/rows".to_string();

        let script: &[u8] = b"reload\nreload http://second/rows\nbogus\nstatus\nquit\nreload\n";
        let exit = run(&mut poller, script, &mut url).await;

        assert_eq!(exit, ControlExit::Quit);
        assert_eq!(url, "http://second/rows");
        assert_eq!(*calls.lock(), vec!["http://first/rows", "http://second/rows"]);
        assert_eq!(poller.latest().unwrap().ph, Some(7.2));
        assert_eq!(poller.state(), PollerState::Idle);
    }

    #[tokio::test]
    async fn test_start_and_stop_commands() {
        let mut poller = Poller::new(FixedSource::default(), PollerConfig::new().with_interval_ms(60_000));
        let mut url = "http://first/rows".to_string();

        let exit = run(&mut poller, &b"start http://other/rows\n"[..], &mut url).await;
        assert_eq!(exit, ControlExit::InputClosed);
        assert_eq!(poller.state(), PollerState::Polling);
        assert_eq!(poller.current_url(), Some("http://other/rows"));
        assert!(status_line(&poller, &url).starts_with("polling http://other/rows every 60000ms"));

        run(&mut poller, &b"stop\n"[..], &mut url).await;
        assert_eq!(poller.state(), PollerState::Idle);
        assert!(status_line(&poller, &url).starts_with("idle (source http://other/rows)"));
    }
}
